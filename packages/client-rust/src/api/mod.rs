//! Directory API collaborators and the middleware stacked around them.

pub mod http;
pub mod memory;
pub mod middleware;

use std::sync::Arc;

use memberdir_core::MemberApi;
use tower::ServiceBuilder;

pub use http::HttpMemberApi;
pub use memory::{ApiCall, InMemoryMemberApi};
pub use middleware::{TimeoutApi, TimeoutLayer, TracedApi, TracingLayer};

use crate::config::ClientConfig;

/// Wraps a directory client in the standard middleware stack (outermost first):
///
/// 1. [`TracingLayer`]: span, log line and metrics per call
/// 2. [`TimeoutLayer`]: per-call timeout from `config.request_timeout_ms`
///
/// The result is type-erased so sessions hold one concrete handle type.
pub fn layered<A>(api: A, config: &ClientConfig) -> Arc<dyn MemberApi>
where
    A: MemberApi + 'static,
{
    Arc::new(
        ServiceBuilder::new()
            .layer(TracingLayer)
            .layer(TimeoutLayer::new(config.request_timeout_ms))
            .service(api),
    )
}
