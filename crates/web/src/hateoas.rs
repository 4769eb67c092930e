use std::sync::Arc;

use axum::Json;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::middleware::base_url::BaseUrl;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct Link {
    pub rel: String,
    pub href: String,
}

/// A resource together with links to what can be done with it next.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Response<T> {
    #[serde(flatten)]
    pub content: T,
    pub links: Vec<Link>,
}

impl<T> Response<T> {
    /// A response without links.
    pub fn new(content: T) -> Self {
        Self {
            content,
            links: Vec::new(),
        }
    }

    pub fn builder(content: T, base_url: Arc<BaseUrl>) -> ResponseBuilder<T> {
        ResponseBuilder {
            response: Self::new(content),
            base_url,
        }
    }

    pub fn json(self) -> Json<Self> {
        Json(self)
    }
}

/// Collects links relative to the request's base url.
pub struct ResponseBuilder<T> {
    response: Response<T>,
    base_url: Arc<BaseUrl>,
}

impl<T> ResponseBuilder<T> {
    pub fn link(mut self, rel: impl Into<String>, path: impl Into<String>) -> Self {
        let href = self.base_url.full_url(path);
        self.response.links.push(Link {
            rel: rel.into(),
            href,
        });
        self
    }

    /// Only links actions that are currently allowed.
    pub fn link_if(self, allowed: bool, rel: impl Into<String>, path: impl Into<String>) -> Self {
        match allowed {
            true => self.link(rel, path),
            false => self,
        }
    }

    pub fn build(self) -> Response<T> {
        self.response
    }
}
