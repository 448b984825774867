//! HTTP [`MemberApi`] implementation over the directory's JSON API.
//!
//! Endpoints, relative to the configured base URL:
//!
//! | call | request |
//! |---|---|
//! | `fetch_record` | `GET /members/{id}` |
//! | `fetch_permissions` | `GET /members/{id or new}/permissions` |
//! | `fetch_schema_kinds` | `GET /members/schema` |
//! | `fetch_enum_options` | `GET /members/options` |
//! | `create_record` | `POST /members` |
//! | `update_record` | `PUT /members/{id}` |
//!
//! Every 2xx body is an [`Envelope`]. Non-2xx answers become
//! [`ApiError::Status`] carrying the body's `message`, when present.

use std::time::Duration;

use async_trait::async_trait;
use memberdir_core::{
    ApiError, ApiResponse, EnumOptions, Envelope, MemberApi, MemberRoute, PermissionSet, Record,
    RecordId, SchemaRegistry,
};
use reqwest::{Client, RequestBuilder};
use serde::de::DeserializeOwned;
use serde::Deserialize;

use crate::config::ClientConfig;

/// Error body the directory sends with non-2xx answers.
#[derive(Debug, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    message: Option<String>,
}

/// Directory API client speaking JSON over HTTP.
#[derive(Debug, Clone)]
pub struct HttpMemberApi {
    client: Client,
    base_url: String,
    timeout_ms: u64,
}

impl HttpMemberApi {
    /// Creates a client for `config.base_url` with the configured timeout.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::Transport`] if the HTTP client cannot be built
    /// (e.g. the TLS backend fails to initialize).
    pub fn new(config: &ClientConfig) -> Result<Self, ApiError> {
        let client = Client::builder()
            .timeout(Duration::from_millis(config.request_timeout_ms))
            .build()
            .map_err(|e| ApiError::Transport {
                reason: e.to_string(),
            })?;
        Ok(Self::with_client(
            client,
            &config.base_url,
            config.request_timeout_ms,
        ))
    }

    /// Wraps an existing `reqwest` client.
    #[must_use]
    pub fn with_client(client: Client, base_url: &str, timeout_ms: u64) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            timeout_ms,
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}/members{path}", self.base_url)
    }

    fn transport_error(&self, error: &reqwest::Error) -> ApiError {
        if error.is_timeout() {
            ApiError::Timeout {
                timeout_ms: self.timeout_ms,
            }
        } else {
            ApiError::Transport {
                reason: error.to_string(),
            }
        }
    }

    async fn send<T: DeserializeOwned>(&self, request: RequestBuilder) -> ApiResponse<T> {
        let response = request
            .send()
            .await
            .map_err(|e| self.transport_error(&e))?;
        let status = response.status();
        let body = response
            .bytes()
            .await
            .map_err(|e| self.transport_error(&e))?;

        if !status.is_success() {
            let message = serde_json::from_slice::<ErrorBody>(&body)
                .ok()
                .and_then(|b| b.message);
            return Err(ApiError::Status {
                status: status.as_u16(),
                message,
            });
        }

        serde_json::from_slice::<Envelope<T>>(&body).map_err(|e| ApiError::Decode {
            reason: e.to_string(),
        })
    }
}

#[async_trait]
impl MemberApi for HttpMemberApi {
    async fn fetch_record(&self, id: &RecordId) -> ApiResponse<Record> {
        self.send(self.client.get(self.url(&format!("/{id}")))).await
    }

    async fn fetch_permissions(&self, route: &MemberRoute) -> ApiResponse<PermissionSet> {
        let url = self.url(&format!("/{}/permissions", route.segment()));
        self.send(self.client.get(url)).await
    }

    async fn fetch_schema_kinds(&self) -> ApiResponse<SchemaRegistry> {
        self.send(self.client.get(self.url("/schema"))).await
    }

    async fn fetch_enum_options(&self) -> ApiResponse<EnumOptions> {
        self.send(self.client.get(self.url("/options"))).await
    }

    async fn create_record(&self, fields: &Record) -> ApiResponse<Record> {
        self.send(self.client.post(self.url("")).json(fields)).await
    }

    async fn update_record(&self, fields: &Record, id: &RecordId) -> ApiResponse<Record> {
        self.send(self.client.put(self.url(&format!("/{id}"))).json(fields))
            .await
    }
}

#[cfg(test)]
mod tests {
    use axum::extract::Path;
    use axum::http::StatusCode;
    use axum::routing::{get, post};
    use axum::{Json, Router};
    use memberdir_core::{settle, SchemaKind, Value};
    use serde_json::json;

    use super::*;

    /// Serves a tiny fake directory on an OS-assigned port and returns its base URL.
    async fn serve_directory() -> String {
        let app = Router::new()
            .route(
                "/api/members/schema",
                get(|| async {
                    let schema = json!({"String": ["firstName"], "Number": ["age"]});
                    Json(json!({"success": true, "result": schema}))
                }),
            )
            .route(
                "/api/members/options",
                get(|| async {
                    Json(json!({"success": true, "result": {"status": ["Active"]}}))
                }),
            )
            .route(
                "/api/members/{id}/permissions",
                get(|Path(id): Path<String>| async move {
                    let permissions = json!({"view": ["firstName", id], "edit": ["firstName"]});
                    Json(json!({"success": true, "result": permissions}))
                }),
            )
            .route(
                "/api/members/{id}",
                get(|Path(id): Path<String>| async move {
                    if id == "missing" {
                        let body = json!({"message": "no such member"});
                        (StatusCode::NOT_FOUND, Json(body))
                    } else {
                        let record = json!({"_id": id, "firstName": "Bob"});
                        (StatusCode::OK, Json(json!({"success": true, "result": record})))
                    }
                })
                .put(|Path(id): Path<String>, Json(mut body): Json<serde_json::Value>| async move {
                    body["_id"] = json!(id);
                    Json(json!({"success": true, "result": body}))
                }),
            )
            .route(
                "/api/members",
                post(|| async {
                    Json(json!({"success": false, "message": "directory is read-only"}))
                }),
            );

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{addr}/api/")
    }

    fn api(base_url: &str) -> HttpMemberApi {
        HttpMemberApi::new(&ClientConfig {
            base_url: base_url.to_string(),
            request_timeout_ms: 5_000,
            ..ClientConfig::default()
        })
        .unwrap()
    }

    #[tokio::test]
    async fn fetches_decode_envelopes() {
        let api = api(&serve_directory().await);

        let schema = settle(api.fetch_schema_kinds().await).unwrap();
        assert_eq!(schema.kind_of("age"), Some(SchemaKind::Number));

        let options = settle(api.fetch_enum_options().await).unwrap();
        assert_eq!(options.options_for("status"), ["Active"]);

        let permissions = settle(api.fetch_permissions(&MemberRoute::New).await).unwrap();
        assert_eq!(permissions.viewable().collect::<Vec<_>>(), ["firstName", "new"]);

        let record = settle(api.fetch_record(&RecordId::new("m1")).await).unwrap();
        assert_eq!(record.id(), Some(RecordId::new("m1")));
    }

    #[tokio::test]
    async fn update_sends_json_body() {
        let api = api(&serve_directory().await);
        let fields: Record = [("firstName", Value::from("Bobby"))].into_iter().collect();

        let updated = settle(api.update_record(&fields, &RecordId::new("m1")).await).unwrap();
        assert_eq!(updated.get("firstName"), Some(&Value::from("Bobby")));
        assert_eq!(updated.id(), Some(RecordId::new("m1")));
    }

    #[tokio::test]
    async fn error_status_carries_body_message() {
        let api = api(&serve_directory().await);
        let err = api
            .fetch_record(&RecordId::new("missing"))
            .await
            .unwrap_err();
        assert_eq!(
            err,
            ApiError::Status {
                status: 404,
                message: Some("no such member".to_string()),
            }
        );
    }

    #[tokio::test]
    async fn reported_failure_is_unsuccessful() {
        let api = api(&serve_directory().await);
        let envelope = api.create_record(&Record::new()).await.unwrap();
        assert!(!envelope.success);
        assert_eq!(
            settle(Ok(envelope)).unwrap_err().detail(),
            Some("directory is read-only")
        );
    }

    #[tokio::test]
    async fn unreachable_directory_is_transport_error() {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let api = api(&format!("http://{addr}/api"));
        let err = api.fetch_schema_kinds().await.unwrap_err();
        assert!(matches!(err, ApiError::Transport { .. }));
        assert_eq!(err.detail(), None);
    }
}
