//! HTTP execution of columnar data queries.
//!
//! Sends [`QueryRequest`]s to the analytics backend and unwraps its response
//! envelope into a [`ColumnarResponse`]. Whole-session fetches issue the
//! trace, log and exception queries concurrently.

use std::fmt;
use std::time::Duration;

use serde::Deserialize;
use thiserror::Error;
use tl_core::{
    ColumnarResponse, QueryError, QueryRequest, Scenario, SpanTree, TimeRange, Timeline,
    assemble_timeline, build_span_tree, exceptions_query, logs_query, traces_query,
};

/// Default request timeout for query calls.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Path of the query endpoint, relative to the API base URL.
pub const QUERY_PATH: &str = "/v1/interactions/performance-metric/distribution";

/// Query client errors.
#[derive(Debug, Error)]
pub enum ClientError {
    /// The configured base URL could not be parsed.
    #[error("invalid base URL {url:?}: {reason}")]
    InvalidBaseUrl { url: String, reason: String },
    /// Failed to build HTTP client.
    #[error("failed to build HTTP client: {0}")]
    ClientBuild(#[source] reqwest::Error),
    /// The request was rejected before sending.
    #[error("invalid query: {0}")]
    InvalidQuery(#[from] QueryError),
    /// HTTP request failed.
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),
    /// Backend returned an error payload or a non-success status.
    #[error("API error: {message}")]
    Api {
        message: String,
        cause: Option<String>,
        status: Option<u16>,
    },
    /// Failed to parse response.
    #[error("invalid response: {0}")]
    InvalidResponse(String),
}

/// Query API client.
///
/// Cloning is cheap; clones share the underlying connection pool.
#[derive(Clone)]
pub struct Client {
    http: reqwest::Client,
    endpoint: String,
    token: Option<String>,
}

impl fmt::Debug for Client {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Client")
            .field("endpoint", &self.endpoint)
            .field("token", &self.token.as_ref().map(|_| "[REDACTED]"))
            .finish_non_exhaustive()
    }
}

impl Client {
    /// Creates a client for the API rooted at `base_url`.
    ///
    /// A blank token is treated as no token.
    pub fn new(
        base_url: &str,
        token: Option<String>,
        timeout: Duration,
    ) -> Result<Self, ClientError> {
        let base_url = base_url.trim().trim_end_matches('/');
        reqwest::Url::parse(base_url).map_err(|err| ClientError::InvalidBaseUrl {
            url: base_url.to_string(),
            reason: err.to_string(),
        })?;

        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(ClientError::ClientBuild)?;

        Ok(Self {
            http,
            endpoint: format!("{base_url}{QUERY_PATH}"),
            token: token.filter(|token| !token.trim().is_empty()),
        })
    }

    /// Full URL queries are posted to.
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Executes one query and returns its columnar result.
    ///
    /// A successful response without data is an empty result, not an error.
    pub async fn execute(&self, request: &QueryRequest) -> Result<ColumnarResponse, ClientError> {
        request.validate()?;
        tracing::debug!(
            data_type = ?request.data_type,
            filters = request.filters.len(),
            endpoint = %self.endpoint,
            "executing query"
        );

        let mut builder = self.http.post(&self.endpoint).json(request);
        if let Some(token) = &self.token {
            builder = builder.bearer_auth(token);
        }
        let response = builder.send().await?;

        let status = response.status().as_u16();
        let body = response.text().await?;
        let result = decode_body(status, &body)?;
        tracing::debug!(rows = result.rows.len(), "query returned");
        Ok(result)
    }

    /// Fetches traces, logs and exceptions for a scenario concurrently.
    ///
    /// Trace and log failures are returned. An exception failure is logged
    /// and yields `None`, since the timeline is still usable without it.
    pub async fn fetch_session(
        &self,
        scenario: &Scenario,
        time_range: &TimeRange,
    ) -> Result<SessionData, ClientError> {
        let traces = traces_query(scenario, time_range.clone());
        let logs = logs_query(scenario, time_range.clone());
        let exceptions = exceptions_query(scenario.session_id(), time_range.clone());

        let (traces, logs, exceptions) = tokio::join!(
            self.execute(&traces),
            self.execute(&logs),
            self.execute(&exceptions),
        );

        let exceptions = match exceptions {
            Ok(exceptions) => Some(exceptions),
            Err(err) => {
                tracing::warn!(error = %err, "exceptions query failed, continuing without");
                None
            }
        };

        Ok(SessionData {
            traces: traces?,
            logs: logs?,
            exceptions,
        })
    }
}

/// Raw results of a whole-session fetch, one per record family.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SessionData {
    pub traces: ColumnarResponse,
    pub logs: ColumnarResponse,
    pub exceptions: Option<ColumnarResponse>,
}

impl SessionData {
    /// Timeline of the session's spans.
    pub fn trace_timeline(&self, session_id: &str) -> Timeline {
        assemble_timeline(&self.traces, session_id)
    }

    /// Spans, logs and exceptions nested per trace.
    pub fn span_tree(&self) -> SpanTree {
        build_span_tree(&self.traces, &self.logs, self.exceptions.as_ref())
    }
}

#[derive(Debug, Deserialize)]
struct Envelope {
    #[serde(default)]
    data: Option<ColumnarResponse>,
    #[serde(default)]
    error: Option<ErrorDetails>,
    #[serde(default)]
    status: Option<u16>,
}

#[derive(Debug, Deserialize)]
struct ErrorDetails {
    #[serde(default)]
    message: String,
    #[serde(default)]
    cause: Option<String>,
}

/// Unwraps a response body.
///
/// Accepts the `{data: {fields, rows}, error, status}` envelope and the bare
/// `{fields, rows}` form.
pub fn decode_body(status: u16, body: &str) -> Result<ColumnarResponse, ClientError> {
    let success = (200..300).contains(&status);
    let status_error = || ClientError::Api {
        message: format!("status {status}: {body}"),
        cause: None,
        status: Some(status),
    };

    let Ok(value) = serde_json::from_str::<serde_json::Value>(body) else {
        return Err(if success {
            ClientError::InvalidResponse("body is not JSON".to_string())
        } else {
            status_error()
        });
    };

    if value.get("fields").is_some() || value.get("rows").is_some() {
        if !success {
            return Err(status_error());
        }
        return serde_json::from_value(value)
            .map_err(|err| ClientError::InvalidResponse(err.to_string()));
    }

    let envelope: Envelope = serde_json::from_value(value)
        .map_err(|err| ClientError::InvalidResponse(err.to_string()))?;
    if let Some(error) = envelope.error {
        return Err(ClientError::Api {
            message: error.message,
            cause: error.cause,
            status: envelope.status.or(Some(status)),
        });
    }
    if !success {
        return Err(status_error());
    }
    Ok(envelope.data.unwrap_or_default())
}

#[cfg(test)]
mod tests {
    use super::*;

    use tl_core::Cell;

    #[test]
    fn client_builds_endpoint_from_base_url() {
        let client = Client::new("https://pulse.example.com/api/", None, DEFAULT_TIMEOUT).unwrap();
        assert_eq!(
            client.endpoint(),
            "https://pulse.example.com/api/v1/interactions/performance-metric/distribution"
        );
    }

    #[test]
    fn client_rejects_invalid_base_url() {
        assert!(matches!(
            Client::new("not a url", None, DEFAULT_TIMEOUT),
            Err(ClientError::InvalidBaseUrl { .. })
        ));
    }

    #[test]
    fn client_debug_redacts_token() {
        let client = Client::new(
            "http://localhost:8080",
            Some("secret-token".to_string()),
            DEFAULT_TIMEOUT,
        )
        .unwrap();
        let debug = format!("{client:?}");
        assert!(!debug.contains("secret-token"));
        assert!(debug.contains("[REDACTED]"));
    }

    #[test]
    fn blank_token_is_dropped() {
        let client =
            Client::new("http://localhost:8080", Some("  ".to_string()), DEFAULT_TIMEOUT).unwrap();
        assert!(client.token.is_none());
    }

    #[test]
    fn parses_enveloped_success() {
        let body = r#"{"data":{"fields":["spanid","timestamp"],"rows":[["a","2025-01-01T00:00:00Z"]]},"error":null,"status":200}"#;
        let response = decode_body(200, body).unwrap();
        assert_eq!(response.fields, vec!["spanid", "timestamp"]);
        assert_eq!(response.rows[0][0], Cell::from("a"));
    }

    #[test]
    fn parses_bare_success() {
        let response = decode_body(200, r#"{"fields":["a"],"rows":[]}"#).unwrap();
        assert_eq!(response.fields, vec!["a"]);
        assert!(response.is_empty());
    }

    #[test]
    fn null_data_is_empty_result() {
        let response = decode_body(200, r#"{"data":null,"status":200}"#).unwrap();
        assert_eq!(response, ColumnarResponse::default());
    }

    #[test]
    fn error_payload_carries_message_and_cause() {
        let body = r#"{"error":{"message":"bad filter","cause":"unknown column"},"data":null,"status":400}"#;
        let err = decode_body(400, body).unwrap_err();
        match err {
            ClientError::Api {
                message,
                cause,
                status,
            } => {
                assert_eq!(message, "bad filter");
                assert_eq!(cause.as_deref(), Some("unknown column"));
                assert_eq!(status, Some(400));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn error_payload_wins_even_with_success_status() {
        let body = r#"{"error":{"message":"quota"},"data":null}"#;
        let err = decode_body(200, body).unwrap_err();
        assert!(matches!(err, ClientError::Api { status: Some(200), .. }));
    }

    #[test]
    fn non_json_failure_reports_status() {
        let err = decode_body(502, "Bad Gateway").unwrap_err();
        assert_eq!(err.to_string(), "API error: status 502: Bad Gateway");
    }

    #[test]
    fn non_json_success_is_invalid_response() {
        assert!(matches!(
            decode_body(200, "<html>"),
            Err(ClientError::InvalidResponse(_))
        ));
    }

    #[test]
    fn session_data_assembles_trace_timeline() {
        let data = SessionData {
            traces: ColumnarResponse {
                fields: vec!["spanid".to_string(), "spanname".to_string()],
                rows: vec![vec![Cell::from("s1"), Cell::from("AppStart")]],
            },
            ..SessionData::default()
        };
        let timeline = data.trace_timeline("sess");
        assert_eq!(timeline.summary.total_events, 1);
        assert_eq!(timeline.events[0].name, "AppStart");
        assert_eq!(data.span_tree().roots[0].name, "AppStart");
    }

    #[test]
    fn session_data_nests_logs_and_exceptions_under_spans() {
        let data = SessionData {
            traces: ColumnarResponse {
                fields: vec!["traceid".to_string(), "spanid".to_string()],
                rows: vec![vec![Cell::from("t1"), Cell::from("s1")]],
            },
            logs: ColumnarResponse {
                fields: vec!["spanid".to_string(), "body".to_string()],
                rows: vec![
                    vec![Cell::from("s1"), Cell::from("tapped pay")],
                    vec![Cell::from("other"), Cell::from("stray")],
                ],
            },
            exceptions: Some(ColumnarResponse {
                fields: vec!["spanid".to_string(), "title".to_string()],
                rows: vec![vec![Cell::from("s1"), Cell::from("Timeout")]],
            }),
        };

        let tree = data.span_tree();
        assert_eq!(tree.roots.len(), 2);
        let names: Vec<&str> = tree.roots[0]
            .children
            .iter()
            .map(|node| node.name.as_str())
            .collect();
        assert_eq!(names, vec!["tapped pay", "Timeout"]);
        assert_eq!(tree.orphans().count(), 1);
        assert_eq!(tree.depth, 2);
    }
}
