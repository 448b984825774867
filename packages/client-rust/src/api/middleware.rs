//! Middleware for directory API clients.
//!
//! Both wrappers are `tower` layers over any [`MemberApi`]:
//!
//! - [`TimeoutLayer`] bounds every call with `tokio::time::timeout`, turning
//!   an expired call into [`ApiError::Timeout`].
//! - [`TracingLayer`] runs every call inside an `info_span!` carrying the
//!   endpoint, duration and outcome, and feeds the `metrics` facade.

use std::future::Future;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use memberdir_core::{
    ApiEndpoint, ApiError, ApiResponse, EnumOptions, MemberApi, MemberRoute, PermissionSet,
    Record, RecordId, SchemaRegistry,
};
use tower::Layer;
use tracing::{info_span, Instrument};

// ---------------------------------------------------------------------------
// TimeoutLayer
// ---------------------------------------------------------------------------

/// Tower layer that wraps a directory client with a per-call timeout.
#[derive(Debug, Clone, Copy)]
pub struct TimeoutLayer {
    timeout_ms: u64,
}

impl TimeoutLayer {
    #[must_use]
    pub fn new(timeout_ms: u64) -> Self {
        Self { timeout_ms }
    }
}

impl<A> Layer<A> for TimeoutLayer {
    type Service = TimeoutApi<A>;

    fn layer(&self, inner: A) -> Self::Service {
        TimeoutApi {
            inner,
            timeout_ms: self.timeout_ms,
        }
    }
}

/// Directory client wrapper that enforces a per-call timeout.
#[derive(Debug, Clone)]
pub struct TimeoutApi<A> {
    inner: A,
    timeout_ms: u64,
}

impl<A> TimeoutApi<A> {
    async fn bounded<T, F>(&self, call: F) -> ApiResponse<T>
    where
        F: Future<Output = ApiResponse<T>>,
    {
        let timeout_ms = self.timeout_ms;
        match tokio::time::timeout(Duration::from_millis(timeout_ms), call).await {
            Ok(result) => result,
            Err(_elapsed) => Err(ApiError::Timeout { timeout_ms }),
        }
    }
}

#[async_trait]
impl<A: MemberApi> MemberApi for TimeoutApi<A> {
    async fn fetch_record(&self, id: &RecordId) -> ApiResponse<Record> {
        self.bounded(self.inner.fetch_record(id)).await
    }

    async fn fetch_permissions(&self, route: &MemberRoute) -> ApiResponse<PermissionSet> {
        self.bounded(self.inner.fetch_permissions(route)).await
    }

    async fn fetch_schema_kinds(&self) -> ApiResponse<SchemaRegistry> {
        self.bounded(self.inner.fetch_schema_kinds()).await
    }

    async fn fetch_enum_options(&self) -> ApiResponse<EnumOptions> {
        self.bounded(self.inner.fetch_enum_options()).await
    }

    async fn create_record(&self, fields: &Record) -> ApiResponse<Record> {
        self.bounded(self.inner.create_record(fields)).await
    }

    async fn update_record(&self, fields: &Record, id: &RecordId) -> ApiResponse<Record> {
        self.bounded(self.inner.update_record(fields, id)).await
    }
}

// ---------------------------------------------------------------------------
// TracingLayer
// ---------------------------------------------------------------------------

/// Tower layer that instruments directory calls with spans and metrics.
#[derive(Debug, Clone, Copy)]
pub struct TracingLayer;

impl<A> Layer<A> for TracingLayer {
    type Service = TracedApi<A>;

    fn layer(&self, inner: A) -> Self::Service {
        TracedApi { inner }
    }
}

/// Directory client wrapper that records call duration and outcome.
#[derive(Debug, Clone)]
pub struct TracedApi<A> {
    inner: A,
}

/// Outcome label of a finished call.
fn outcome_of<T>(result: &ApiResponse<T>) -> &'static str {
    match result {
        Ok(envelope) if envelope.success => "ok",
        Ok(_) => "rejected",
        Err(ApiError::Timeout { .. }) => "timeout",
        Err(_) => "error",
    }
}

impl<A> TracedApi<A> {
    async fn observe<T, F>(&self, endpoint: ApiEndpoint, call: F) -> ApiResponse<T>
    where
        F: Future<Output = ApiResponse<T>>,
    {
        let span = info_span!(
            "member_api",
            endpoint = endpoint.as_str(),
            duration_ms = tracing::field::Empty,
            outcome = tracing::field::Empty,
        );

        async move {
            let start = Instant::now();
            let result = call.await;
            let duration_ms = u64::try_from(start.elapsed().as_millis()).unwrap_or(u64::MAX);
            let outcome = outcome_of(&result);

            tracing::Span::current().record("duration_ms", duration_ms);
            tracing::Span::current().record("outcome", outcome);
            if let Err(error) = &result {
                tracing::warn!(error = %error, "directory call failed");
            } else {
                tracing::debug!("directory call completed");
            }

            metrics::counter!(
                "memberdir_api_calls_total",
                "endpoint" => endpoint.as_str(),
                "outcome" => outcome
            )
            .increment(1);
            #[allow(clippy::cast_precision_loss)]
            let duration = duration_ms as f64;
            metrics::histogram!("memberdir_api_call_duration_ms", "endpoint" => endpoint.as_str())
                .record(duration);

            result
        }
        .instrument(span)
        .await
    }
}

#[async_trait]
impl<A: MemberApi> MemberApi for TracedApi<A> {
    async fn fetch_record(&self, id: &RecordId) -> ApiResponse<Record> {
        self.observe(ApiEndpoint::FetchRecord, self.inner.fetch_record(id))
            .await
    }

    async fn fetch_permissions(&self, route: &MemberRoute) -> ApiResponse<PermissionSet> {
        self.observe(
            ApiEndpoint::FetchPermissions,
            self.inner.fetch_permissions(route),
        )
        .await
    }

    async fn fetch_schema_kinds(&self) -> ApiResponse<SchemaRegistry> {
        self.observe(ApiEndpoint::FetchSchemaKinds, self.inner.fetch_schema_kinds())
            .await
    }

    async fn fetch_enum_options(&self) -> ApiResponse<EnumOptions> {
        self.observe(ApiEndpoint::FetchEnumOptions, self.inner.fetch_enum_options())
            .await
    }

    async fn create_record(&self, fields: &Record) -> ApiResponse<Record> {
        self.observe(ApiEndpoint::CreateRecord, self.inner.create_record(fields))
            .await
    }

    async fn update_record(&self, fields: &Record, id: &RecordId) -> ApiResponse<Record> {
        self.observe(ApiEndpoint::UpdateRecord, self.inner.update_record(fields, id))
            .await
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use memberdir_core::{settle, Envelope, Value};
    use tower::ServiceBuilder;

    use super::*;
    use crate::api::memory::InMemoryMemberApi;

    /// Directory whose schema call never answers.
    struct StalledApi;

    #[async_trait]
    impl MemberApi for StalledApi {
        async fn fetch_record(&self, _id: &RecordId) -> ApiResponse<Record> {
            Ok(Envelope::ok(Record::new()))
        }
        async fn fetch_permissions(&self, _route: &MemberRoute) -> ApiResponse<PermissionSet> {
            Ok(Envelope::ok(PermissionSet::default()))
        }
        async fn fetch_schema_kinds(&self) -> ApiResponse<SchemaRegistry> {
            std::future::pending().await
        }
        async fn fetch_enum_options(&self) -> ApiResponse<EnumOptions> {
            Ok(Envelope::ok(EnumOptions::new()))
        }
        async fn create_record(&self, fields: &Record) -> ApiResponse<Record> {
            Ok(Envelope::ok(fields.clone()))
        }
        async fn update_record(&self, fields: &Record, _id: &RecordId) -> ApiResponse<Record> {
            Ok(Envelope::ok(fields.clone()))
        }
    }

    #[tokio::test(start_paused = true)]
    async fn timeout_turns_stalled_call_into_error() {
        let api = TimeoutLayer::new(100).layer(StalledApi);

        let result = api.fetch_schema_kinds().await;
        assert_eq!(result.unwrap_err(), ApiError::Timeout { timeout_ms: 100 });

        // Calls that answer in time pass through untouched.
        assert!(api.fetch_enum_options().await.is_ok());
    }

    #[tokio::test]
    async fn stacked_layers_delegate_to_inner_api() {
        let api = ServiceBuilder::new()
            .layer(TracingLayer)
            .layer(TimeoutLayer::new(1_000))
            .service(InMemoryMemberApi::new());

        let fields: Record = [("name", Value::from("Ada"))].into_iter().collect();
        let created = settle(api.create_record(&fields).await).unwrap();
        assert_eq!(created.get("name"), Some(&Value::from("Ada")));
        assert!(created.id().is_some());
    }

    #[test]
    fn outcome_labels() {
        let ok: ApiResponse<u8> = Ok(Envelope::ok(1));
        let rejected: ApiResponse<u8> = Ok(Envelope::failure(None));
        let timeout: ApiResponse<u8> = Err(ApiError::Timeout { timeout_ms: 1 });
        let failed: ApiResponse<u8> = Err(ApiError::Decode {
            reason: "x".to_string(),
        });
        assert_eq!(outcome_of(&ok), "ok");
        assert_eq!(outcome_of(&rejected), "rejected");
        assert_eq!(outcome_of(&timeout), "timeout");
        assert_eq!(outcome_of(&failed), "error");
    }
}
