use std::sync::Arc;

use futures::future::{self, FutureExt};
use http::StatusCode;
use tracing::warn;

use crate::error::HandlerError;
use crate::handler::{Handler, HandlerFuture};
use crate::outcome::Reply;
use crate::request::RequestContext;
use crate::response::Response;

/// Static token check on the `authorization` header.
///
/// Continues when the header equals the configured token, otherwise
/// answers `401 {"error":"Unauthorized"}`.
#[derive(Debug, Clone)]
pub struct TokenAuth {
    token: String,
}

impl TokenAuth {
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
        }
    }

    fn check(&self, ctx: &RequestContext) -> Result<Reply, HandlerError> {
        match ctx.header("authorization") {
            Some(h) if h == self.token => Ok(Reply::Nothing),
            presented => {
                warn!(
                    request_id = %ctx.request_id(),
                    path = %ctx.path(),
                    header_present = presented.is_some(),
                    "Rejected unauthorized request"
                );
                Ok(Reply::Response(Response::error(
                    StatusCode::UNAUTHORIZED,
                    "Unauthorized",
                )))
            }
        }
    }
}

impl Handler for TokenAuth {
    fn call(&self, ctx: Arc<RequestContext>) -> HandlerFuture {
        future::ready(self.check(&ctx)).boxed()
    }

    fn name(&self) -> &str {
        "token_auth"
    }
}
