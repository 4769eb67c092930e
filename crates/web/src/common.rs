use axum::{
    extract::{OriginalUri, Request},
    http::{Method, StatusCode, Uri},
    response::IntoResponse,
    routing::MethodFilter,
    Json,
};
use gbfs::GbfsError;
use mobility::{geofence::GeofenceError, MobilityError};
use schemars::{schema_for, JsonSchema};
use serde::{Deserialize, Serialize};

use crate::hateoas;

pub type RouteResult<O> = Result<O, RouteErrorResponse>;
pub type HateoasResult<O> = RouteResult<Json<hateoas::Response<O>>>;

/// A `MethodFilter` that matches all http methods.
pub(crate) const METHOD_FILTER_ALL: MethodFilter = MethodFilter::GET
    .or(MethodFilter::POST)
    .or(MethodFilter::PATCH)
    .or(MethodFilter::PUT)
    .or(MethodFilter::DELETE);

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VecResponse<T> {
    pub data: Vec<T>,
}

impl<T> VecResponse<T> {
    pub fn new(data: Vec<T>) -> Self {
        Self { data }
    }

    pub fn hateoas(self) -> hateoas::Response<Self> {
        hateoas::Response::new(self)
    }

    pub fn json(self) -> Json<Self> {
        Json(self)
    }
}

// - Services returning commonly used responses -

pub(crate) async fn schema<T: JsonSchema + Serialize>() -> impl IntoResponse {
    Json(schema_for!(T))
}

/// Adds the request method and path to an error on its way out.
pub(crate) fn in_request<E>(method: Method, uri: &Uri) -> impl FnOnce(E) -> RouteErrorResponse
where
    E: Into<RouteErrorResponse>,
{
    let path = uri.path().to_owned();
    move |why| why.into().with_method(&method).with_uri(path)
}

pub(crate) async fn route_not_found(
    OriginalUri(original_uri): OriginalUri,
    req: Request,
) -> impl IntoResponse {
    RouteErrorResponse::not_found(req.method(), original_uri.path())
}

// - Commonly used responeses -

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RouteErrorResponse {
    #[serde(skip)]
    pub status_code: StatusCode,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub http_method: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub requested_uri: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub detailed_information: Option<String>,
}

impl RouteErrorResponse {
    pub fn new(status_code: StatusCode) -> Self {
        Self {
            status_code,
            http_method: None,
            requested_uri: None,
            message: None,
            detailed_information: None,
        }
    }

    pub fn not_found(method: &Method, uri: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND)
            .with_method(method)
            .with_uri(uri)
            .with_default_message()
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST).with_message(message)
    }

    pub fn with_method(mut self, method: &Method) -> Self {
        self.http_method = Some(method.to_string());
        self
    }

    pub fn with_uri(mut self, uri: impl Into<String>) -> Self {
        self.requested_uri = Some(uri.into());
        self
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    pub fn with_default_message(self) -> Self {
        let message = self
            .status_code
            .canonical_reason()
            .unwrap_or("i dunno what happened here :/");
        self.with_message(message)
    }

    pub fn with_detailed_information(mut self, message: impl Into<String>) -> Self {
        self.detailed_information = Some(message.into());
        self
    }
}

impl From<MobilityError> for RouteErrorResponse {
    fn from(value: MobilityError) -> Self {
        let status_code = match &value {
            MobilityError::InvalidTransition(_) => StatusCode::CONFLICT,
            MobilityError::PermissionDenied => StatusCode::FORBIDDEN,
            MobilityError::LocationUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            MobilityError::NotFound => {
                return Self::new(StatusCode::NOT_FOUND)
                    .with_message("The requested item does not exist.")
            }
            MobilityError::InvalidInput(_) => StatusCode::BAD_REQUEST,
            MobilityError::Persistence(_)
            | MobilityError::Unavailable(_)
            | MobilityError::Other(_) => {
                log::error!("Request failed: {}", value);
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };
        Self::new(status_code)
            .with_default_message()
            .with_detailed_information(value.to_string())
    }
}

impl From<GeofenceError> for RouteErrorResponse {
    fn from(value: GeofenceError) -> Self {
        Self::bad_request(value.to_string())
    }
}

impl From<GbfsError> for RouteErrorResponse {
    fn from(value: GbfsError) -> Self {
        log::warn!("Vehicle feed unavailable: {}", value);
        Self::new(StatusCode::BAD_GATEWAY)
            .with_message("The vehicle feed could not be loaded.")
            .with_detailed_information(value.to_string())
    }
}

impl IntoResponse for RouteErrorResponse {
    fn into_response(self) -> axum::response::Response {
        (self.status_code, Json(self)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use mobility::session::InvalidTransition;
    use model::ride::{RideAction, RideStatus};

    use super::*;

    #[test]
    fn mobility_errors_map_to_status_codes() {
        let cases = [
            (
                MobilityError::InvalidTransition(InvalidTransition::new(
                    RideStatus::Idle,
                    RideAction::Pause,
                )),
                StatusCode::CONFLICT,
            ),
            (MobilityError::PermissionDenied, StatusCode::FORBIDDEN),
            (
                MobilityError::LocationUnavailable("no fix".to_owned()),
                StatusCode::SERVICE_UNAVAILABLE,
            ),
            (MobilityError::NotFound, StatusCode::NOT_FOUND),
            (
                MobilityError::invalid_input("rating"),
                StatusCode::BAD_REQUEST,
            ),
            (
                MobilityError::unavailable("tracker stopped"),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        ];
        for (error, expected) in cases {
            assert_eq!(RouteErrorResponse::from(error).status_code, expected);
        }
    }
}
