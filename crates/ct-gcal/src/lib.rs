//! Google Calendar integration for the calendar tracker.
//!
//! Provides:
//! - A client for the Calendar v3 `events.list` endpoint
//! - A JSON file cache of retrieved events

pub mod cache;

use std::fmt;
use std::time::Duration;

use chrono::{DateTime, SecondsFormat, Utc};
use ct_core::{Event, EventList};
use reqwest::Url;
use serde::Deserialize;
use thiserror::Error;

/// Default request timeout for API calls.
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);
const CALENDAR_API_URL: &str = "https://www.googleapis.com/calendar/v3";
/// Largest page size `events.list` accepts.
const PAGE_SIZE: &str = "2500";

/// Calendar client errors.
#[derive(Debug, Error)]
pub enum GcalError {
    /// The provided access token was invalid.
    #[error("invalid access token: {reason}")]
    InvalidToken { reason: &'static str },
    /// Failed to build HTTP client.
    #[error("failed to build HTTP client: {0}")]
    ClientBuild(#[source] reqwest::Error),
    /// The calendar ID could not be turned into a request URL.
    #[error("invalid calendar id: {0}")]
    InvalidCalendar(String),
    /// HTTP request failed.
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),
    /// API returned an error response.
    #[error("API error: {message}")]
    Api { message: String },
    /// Failed to parse response.
    #[error("invalid response: {0}")]
    InvalidResponse(String),
}

/// Google Calendar API client.
///
/// Authenticates with an OAuth 2.0 bearer access token. Obtaining and
/// refreshing the token is left to the caller.
pub struct Client {
    http: reqwest::Client,
    access_token: String,
    base_url: String,
}

impl fmt::Debug for Client {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Client")
            .field("access_token", &"[REDACTED]")
            .field("base_url", &self.base_url)
            .finish_non_exhaustive()
    }
}

impl Client {
    /// Creates a new client with the given access token.
    ///
    /// # Errors
    ///
    /// Returns an error if the token is empty or whitespace-only, or if the
    /// HTTP client fails to build.
    pub fn new(access_token: impl Into<String>) -> Result<Self, GcalError> {
        let access_token = access_token.into();

        if access_token.is_empty() {
            return Err(GcalError::InvalidToken {
                reason: "access token cannot be empty",
            });
        }
        if access_token.trim().is_empty() {
            return Err(GcalError::InvalidToken {
                reason: "access token cannot be whitespace-only",
            });
        }

        let http = reqwest::Client::builder()
            .timeout(DEFAULT_TIMEOUT)
            .build()
            .map_err(GcalError::ClientBuild)?;

        Ok(Self {
            http,
            access_token,
            base_url: CALENDAR_API_URL.to_string(),
        })
    }

    /// Points the client at a different API root.
    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Lists events overlapping `[time_min, time_max)`, following pagination.
    ///
    /// Recurring events are expanded into single instances and ordered by
    /// start time.
    pub async fn list_events(
        &self,
        calendar_id: &str,
        time_min: DateTime<Utc>,
        time_max: DateTime<Utc>,
    ) -> Result<EventList, GcalError> {
        let url = events_url(&self.base_url, calendar_id)?;
        let time_min = time_min.to_rfc3339_opts(SecondsFormat::Secs, true);
        let time_max = time_max.to_rfc3339_opts(SecondsFormat::Secs, true);

        let mut items = Vec::new();
        let mut page_token: Option<String> = None;
        loop {
            let mut query = vec![
                ("singleEvents", "true"),
                ("orderBy", "startTime"),
                ("maxResults", PAGE_SIZE),
                ("timeMin", time_min.as_str()),
                ("timeMax", time_max.as_str()),
            ];
            if let Some(token) = page_token.as_deref() {
                query.push(("pageToken", token));
            }

            let response = self
                .http
                .get(url.clone())
                .bearer_auth(&self.access_token)
                .query(&query)
                .send()
                .await?;

            let status = response.status();
            let body = response.text().await?;
            if !status.is_success() {
                return Err(parse_api_error(&body).unwrap_or_else(|| GcalError::Api {
                    message: format!("status {status}: {body}"),
                }));
            }

            let page = parse_page(&body)?;
            tracing::debug!(
                calendar = calendar_id,
                events = page.items.len(),
                more = page.next_page_token.is_some(),
                "fetched events page"
            );
            items.extend(page.items);

            match page.next_page_token {
                Some(next) if Some(&next) != page_token.as_ref() => page_token = Some(next),
                _ => break,
            }
        }

        Ok(EventList::new(items))
    }
}

/// One page of an `events.list` response.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct EventsPage {
    #[serde(default)]
    items: Vec<Event>,
    #[serde(default)]
    next_page_token: Option<String>,
}

fn parse_page(body: &str) -> Result<EventsPage, GcalError> {
    serde_json::from_str(body).map_err(|err| GcalError::InvalidResponse(err.to_string()))
}

fn events_url(base_url: &str, calendar_id: &str) -> Result<Url, GcalError> {
    if calendar_id.trim().is_empty() {
        return Err(GcalError::InvalidCalendar(
            "calendar id cannot be empty".to_string(),
        ));
    }
    let mut url =
        Url::parse(base_url).map_err(|err| GcalError::InvalidCalendar(err.to_string()))?;
    url.path_segments_mut()
        .map_err(|()| GcalError::InvalidCalendar(format!("cannot extend {base_url}")))?
        .pop_if_empty()
        .extend(["calendars", calendar_id, "events"]);
    Ok(url)
}

fn parse_api_error(body: &str) -> Option<GcalError> {
    #[derive(Deserialize)]
    struct ErrorPayload {
        error: ErrorDetails,
    }

    #[derive(Deserialize)]
    struct ErrorDetails {
        #[serde(default)]
        code: Option<u16>,
        message: String,
    }

    let payload: ErrorPayload = serde_json::from_str(body).ok()?;
    let message = match payload.error.code {
        Some(code) => format!("{code}: {}", payload.error.message),
        None => payload.error.message,
    };
    Some(GcalError::Api { message })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use wiremock::matchers::{header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[test]
    fn client_rejects_empty_token() {
        let err = Client::new("").unwrap_err();
        assert!(matches!(err, GcalError::InvalidToken { .. }));

        let err = Client::new("   ").unwrap_err();
        assert_eq!(
            err.to_string(),
            "invalid access token: access token cannot be whitespace-only"
        );
    }

    #[test]
    fn client_debug_redacts_token() {
        let client = Client::new("ya29.secret").unwrap();
        let debug = format!("{client:?}");
        assert!(!debug.contains("ya29.secret"));
        assert!(debug.contains("[REDACTED]"));
    }

    #[test]
    fn events_url_encodes_calendar_id() {
        let url = events_url(CALENDAR_API_URL, "me@example.com").unwrap();
        assert_eq!(
            url.as_str(),
            "https://www.googleapis.com/calendar/v3/calendars/me@example.com/events"
        );

        let url = events_url("http://localhost:8080/v3/", "team/shared").unwrap();
        assert_eq!(
            url.as_str(),
            "http://localhost:8080/v3/calendars/team%2Fshared/events"
        );
    }

    #[test]
    fn events_url_rejects_empty_calendar() {
        assert!(matches!(
            events_url(CALENDAR_API_URL, " "),
            Err(GcalError::InvalidCalendar(_))
        ));
    }

    #[test]
    fn parses_events_page() {
        let body = r#"{
            "kind": "calendar#events",
            "nextPageToken": "abc",
            "items": [
                {"id": "1", "summary": "Standup",
                 "start": {"dateTime": "2024-01-01T09:00:00Z"},
                 "end": {"dateTime": "2024-01-01T09:15:00Z"}},
                {"id": "2", "summary": "Holiday",
                 "start": {"date": "2024-01-02"}, "end": {"date": "2024-01-03"}}
            ]
        }"#;
        let page = parse_page(body).unwrap();
        assert_eq!(page.items.len(), 2);
        assert_eq!(page.next_page_token.as_deref(), Some("abc"));
        assert_eq!(page.items[1].summary, "Holiday");
    }

    #[test]
    fn parses_last_page_without_token() {
        let page = parse_page(r#"{"items": []}"#).unwrap();
        assert!(page.items.is_empty());
        assert!(page.next_page_token.is_none());
    }

    #[test]
    fn invalid_page_is_reported() {
        let err = parse_page("<html>").unwrap_err();
        assert!(matches!(err, GcalError::InvalidResponse(_)));
    }

    #[test]
    fn parses_api_error_payload() {
        let body = r#"{"error": {"code": 401, "message": "Invalid Credentials", "errors": []}}"#;
        let err = parse_api_error(body).unwrap();
        assert_eq!(err.to_string(), "API error: 401: Invalid Credentials");

        assert!(parse_api_error("not json").is_none());
    }

    // ── events.list against a mock server ────────────────────────────

    const EVENTS_PATH: &str = "/calendars/primary/events";

    fn week() -> (DateTime<Utc>, DateTime<Utc>) {
        (
            Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
            Utc.with_ymd_and_hms(2024, 1, 8, 0, 0, 0).unwrap(),
        )
    }

    fn timed_item(id: &str, summary: &str) -> serde_json::Value {
        serde_json::json!({
            "id": id,
            "summary": summary,
            "start": {"dateTime": "2024-01-01T09:00:00Z"},
            "end": {"dateTime": "2024-01-01T10:00:00Z"}
        })
    }

    async fn list(server: &MockServer) -> Result<EventList, GcalError> {
        let (start, end) = week();
        Client::new("ya29.test")
            .unwrap()
            .with_base_url(server.uri())
            .list_events("primary", start, end)
            .await
    }

    #[tokio::test]
    async fn list_events_follows_next_page_token() {
        let server = MockServer::start().await;

        // Mounted first so the pageToken request matches it before the
        // catch-all first page.
        Mock::given(method("GET"))
            .and(path(EVENTS_PATH))
            .and(query_param("pageToken", "page-2"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "items": [timed_item("2", "Retro")]
            })))
            .expect(1)
            .mount(&server)
            .await;

        Mock::given(method("GET"))
            .and(path(EVENTS_PATH))
            .and(header("authorization", "Bearer ya29.test"))
            .and(query_param("singleEvents", "true"))
            .and(query_param("orderBy", "startTime"))
            .and(query_param("timeMin", "2024-01-01T00:00:00Z"))
            .and(query_param("timeMax", "2024-01-08T00:00:00Z"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "items": [timed_item("1", "Standup")],
                "nextPageToken": "page-2"
            })))
            .expect(1)
            .mount(&server)
            .await;

        let events = list(&server).await.unwrap();
        let summaries: Vec<&str> = events.items.iter().map(|e| e.summary.as_str()).collect();
        assert_eq!(summaries, vec!["Standup", "Retro"]);
    }

    #[tokio::test]
    async fn list_events_stops_on_repeated_page_token() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path(EVENTS_PATH))
            .and(query_param("pageToken", "stuck"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "items": [timed_item("2", "Retro")],
                "nextPageToken": "stuck"
            })))
            .expect(1)
            .mount(&server)
            .await;

        Mock::given(method("GET"))
            .and(path(EVENTS_PATH))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "items": [timed_item("1", "Standup")],
                "nextPageToken": "stuck"
            })))
            .expect(1)
            .mount(&server)
            .await;

        let events = list(&server).await.unwrap();
        assert_eq!(events.items.len(), 2);
    }

    #[tokio::test]
    async fn list_events_surfaces_api_error_payload() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path(EVENTS_PATH))
            .respond_with(ResponseTemplate::new(401).set_body_json(serde_json::json!({
                "error": {
                    "code": 401,
                    "message": "Request had invalid authentication credentials.",
                    "status": "UNAUTHENTICATED"
                }
            })))
            .mount(&server)
            .await;

        let err = list(&server).await.unwrap_err();
        assert!(matches!(err, GcalError::Api { .. }));
        assert_eq!(
            err.to_string(),
            "API error: 401: Request had invalid authentication credentials."
        );
    }

    #[tokio::test]
    async fn list_events_reports_status_for_unstructured_error() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(503).set_body_string("backend unavailable"))
            .mount(&server)
            .await;

        let err = list(&server).await.unwrap_err();
        assert_eq!(
            err.to_string(),
            "API error: status 503 Service Unavailable: backend unavailable"
        );
    }

    #[tokio::test]
    async fn list_events_rejects_malformed_page() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>"))
            .mount(&server)
            .await;

        let err = list(&server).await.unwrap_err();
        assert!(matches!(err, GcalError::InvalidResponse(_)));
    }
}
