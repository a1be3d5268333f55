//! Fire-and-forget interaction tracking.

use serde_json::{json, Value};
use tracing::{debug, warn};
use uuid::Uuid;

const COLLECT_URL: &str = "https://www.google-analytics.com/mp/collect";

pub const EVENT_START_CHAT: &str = "start_chat";
pub const EVENT_SEND_MESSAGE: &str = "send_message";
pub const EVENT_SUBMIT_EMAIL: &str = "submit_email";

/// The analytics collaborator. Implementations must return immediately.
pub trait Analytics: Send + Sync {
    fn track_event(&self, name: &str, params: Option<Value>);
}

/// Logs events instead of sending them anywhere.
#[derive(Clone, Copy, Default)]
pub struct LogAnalytics;

impl Analytics for LogAnalytics {
    fn track_event(&self, name: &str, params: Option<Value>) {
        debug!(event = name, params = ?params, "Analytics event");
    }
}

/// Sends events to GA4 through the Measurement Protocol.
#[derive(Clone)]
pub struct MeasurementProtocol {
    http: reqwest::Client,
    measurement_id: String,
    api_secret: String,
    client_id: String,
}

impl MeasurementProtocol {
    pub fn new(measurement_id: impl Into<String>, api_secret: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            measurement_id: measurement_id.into(),
            api_secret: api_secret.into(),
            client_id: Uuid::new_v4().to_string(),
        }
    }

    fn payload(&self, name: &str, params: Option<Value>) -> Value {
        json!({
            "client_id": self.client_id,
            "events": [{
                "name": name,
                "params": params.unwrap_or_else(|| json!({})),
            }],
        })
    }
}

impl Analytics for MeasurementProtocol {
    fn track_event(&self, name: &str, params: Option<Value>) {
        let body = self.payload(name, params);
        let request = self
            .http
            .post(COLLECT_URL)
            .query(&[
                ("measurement_id", self.measurement_id.as_str()),
                ("api_secret", self.api_secret.as_str()),
            ])
            .json(&body);
        let name = name.to_string();

        tokio::spawn(async move {
            match request.send().await {
                Ok(resp) if resp.status().is_success() => debug!(event = %name, "Analytics event sent"),
                Ok(resp) => warn!(event = %name, status = %resp.status(), "Analytics endpoint rejected event"),
                Err(e) => warn!(event = %name, "Failed to send analytics event: {e}"),
            }
        });
    }
}
