//! Google Calendar API client.
//!
//! Only event insertion is needed; see [`CalendarApi`].

use tracing::{debug, info};

use crate::calendar::{CalendarApi, CreatedEvent, NewEvent};
use crate::error::{ProviderError, ProviderResult};

use super::config::GoogleConfig;

/// Google Calendar API v3 client.
#[derive(Debug)]
pub struct GoogleCalendarClient {
    http_client: reqwest::blocking::Client,
    api_base: String,
}

impl GoogleCalendarClient {
    /// Creates a client for the configured API base.
    pub fn new(config: &GoogleConfig) -> ProviderResult<Self> {
        let http_client = reqwest::blocking::Client::builder()
            .timeout(config.timeout)
            .user_agent(config.user_agent.clone())
            .build()
            .map_err(|e| ProviderError::internal("failed to create HTTP client").with_source(e))?;

        Ok(Self {
            http_client,
            api_base: config.api_base.trim_end_matches('/').to_string(),
        })
    }

    fn events_url(&self, calendar_id: &str) -> String {
        format!(
            "{}/calendars/{}/events",
            self.api_base,
            urlencoding::encode(calendar_id)
        )
    }
}

impl CalendarApi for GoogleCalendarClient {
    fn insert_event(
        &self,
        access_token: &str,
        calendar_id: &str,
        event: &NewEvent,
    ) -> ProviderResult<CreatedEvent> {
        let url = self.events_url(calendar_id);
        debug!(calendar_id, "inserting calendar event");

        let response = self
            .http_client
            .post(&url)
            .bearer_auth(access_token)
            .json(event)
            .send()
            .map_err(|e| ProviderError::from_transport("create event", e))?;

        let status = response.status();
        let body = response.text().map_err(|e| {
            ProviderError::network("create event: failed to read response").with_source(e)
        })?;

        if !status.is_success() {
            return Err(ProviderError::calendar(format!(
                "create event failed ({status}): {}",
                body.trim()
            )));
        }

        let created: CreatedEvent = serde_json::from_str(&body).map_err(|e| {
            ProviderError::invalid_response("invalid create event response").with_source(e)
        })?;

        info!(event_id = %created.id, calendar_id, "created calendar event");
        Ok(created)
    }
}
