use std::sync::Arc;

use axum::{
    extract::{OriginalUri, Path, State},
    http::{Method, StatusCode},
    response::IntoResponse,
    routing::{delete, get, on, post},
    Extension, Json, Router,
};
use mobility::services::payments::PaymentMethods;
use model::payment::{NewPaymentMethod, PaymentMethod};
use schemars::JsonSchema;
use serde::Serialize;
use utility::id::Id;

use crate::{
    common::{
        in_request, route_not_found, schema, HateoasResult, RouteResult, VecResponse,
        METHOD_FILTER_ALL,
    },
    hateoas,
    middleware::base_url::{base_url_middleware, BaseUrl},
    WebState,
};

macro_rules! resource {
    ($($arg:tt)*) => {
        crate::api::v1::resource!("/payment-methods{}", format_args!($($arg)*))
    };
}
pub(crate) use resource;

pub(crate) fn routes(state: WebState) -> Router {
    Router::new()
        .route("/schema", get(schema::<PaymentMethodDto>))
        .route("/:id/default", post(set_default))
        .route("/:id", delete(remove_method))
        .route("/", get(get_methods).post(add_method))
        .layer(axum::middleware::from_fn(base_url_middleware))
        .with_state(state)
        .fallback_service(on(METHOD_FILTER_ALL, route_not_found))
}

/// A payment method with the label shown to the rider.
#[derive(Debug, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
struct PaymentMethodDto {
    #[serde(flatten)]
    method: PaymentMethod,
    display_name: String,
}

impl From<PaymentMethod> for PaymentMethodDto {
    fn from(method: PaymentMethod) -> Self {
        Self {
            display_name: method.display_name(),
            method,
        }
    }
}

async fn get_methods(
    OriginalUri(original_uri): OriginalUri,
    State(payments): State<PaymentMethods>,
    Extension(base_url): Extension<Arc<BaseUrl>>,
) -> HateoasResult<VecResponse<hateoas::Response<PaymentMethodDto>>> {
    payments
        .list()
        .await
        .map(|methods| {
            methods
                .into_iter()
                .map(|method| payment_method_hateoas(method, base_url.clone()))
                .collect::<Vec<_>>()
        })
        .map(|data| VecResponse::new(data).hateoas().json())
        .map_err(in_request(Method::GET, &original_uri))
}

async fn add_method(
    OriginalUri(original_uri): OriginalUri,
    State(payments): State<PaymentMethods>,
    Extension(base_url): Extension<Arc<BaseUrl>>,
    Json(method): Json<NewPaymentMethod>,
) -> RouteResult<impl IntoResponse> {
    payments
        .add(method)
        .await
        .map(|method| (StatusCode::CREATED, payment_method_hateoas(method, base_url).json()))
        .map_err(in_request(Method::POST, &original_uri))
}

async fn set_default(
    OriginalUri(original_uri): OriginalUri,
    Path(id): Path<String>,
    State(payments): State<PaymentMethods>,
    Extension(base_url): Extension<Arc<BaseUrl>>,
) -> HateoasResult<PaymentMethodDto> {
    payments
        .set_default(&Id::new(id))
        .await
        .map(|method| payment_method_hateoas(method, base_url).json())
        .map_err(in_request(Method::POST, &original_uri))
}

async fn remove_method(
    OriginalUri(original_uri): OriginalUri,
    Path(id): Path<String>,
    State(payments): State<PaymentMethods>,
) -> RouteResult<StatusCode> {
    payments
        .remove(&Id::new(id))
        .await
        .map(|_| StatusCode::NO_CONTENT)
        .map_err(in_request(Method::DELETE, &original_uri))
}

fn payment_method_hateoas(
    method: PaymentMethod,
    base_url: Arc<BaseUrl>,
) -> hateoas::Response<PaymentMethodDto> {
    let id = method.id.raw();
    let is_default = method.is_default;
    hateoas::Response::builder(PaymentMethodDto::from(method), base_url)
        .link("self", resource!("/{}", id))
        .link_if(!is_default, "makeDefault", resource!("/{}/default", id))
        .build()
}
