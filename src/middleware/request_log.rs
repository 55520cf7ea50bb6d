use std::sync::Arc;

use futures::future::{self, FutureExt};
use tracing::info;

use crate::handler::{Handler, HandlerFuture};
use crate::outcome::Reply;
use crate::request::RequestContext;

/// Logs every request at `info` and continues.
#[derive(Debug, Clone, Copy, Default)]
pub struct RequestLog;

impl Handler for RequestLog {
    fn call(&self, ctx: Arc<RequestContext>) -> HandlerFuture {
        info!(
            request_id = %ctx.request_id(),
            method = %ctx.method(),
            path = %ctx.original_path(),
            route = ctx.route_pattern().unwrap_or("<none>"),
            user_agent = ctx.header("user-agent").unwrap_or("-"),
            "Request received"
        );
        future::ready(Ok(Reply::Nothing)).boxed()
    }

    fn name(&self) -> &str {
        "request_log"
    }
}
