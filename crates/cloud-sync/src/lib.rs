//! Cloud Synchronization Module
//!
//! Publishes completed session summaries and located event points over
//! MQTT. Publishing is never anonymous: a summary without an owner id is
//! refused.

use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use chrono::{DateTime, Utc};
use event_classifier::EventKind;
use rumqttc::{AsyncClient, Event, MqttOptions, QoS};
use serde::{Deserialize, Serialize};
use session::{DrivingEvent, SessionSummary};
use thiserror::Error;
use tracing::{debug, error, info};
use uuid::Uuid;

/// Cloud sync error types
#[derive(Error, Debug)]
pub enum CloudError {
    #[error("Connection failed: {0}")]
    Connection(String),

    #[error("Publish failed: {0}")]
    Publish(String),

    #[error("Refusing to publish session {0} without an owner id")]
    MissingOwner(Uuid),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

/// Cloud sync configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CloudConfig {
    /// Publish at all; when off a [`DisabledPublisher`] is used
    pub enabled: bool,
    /// MQTT broker host
    pub broker_url: String,
    pub broker_port: u16,
    /// Device identifier used in topics and the client id
    pub device_id: String,
    pub keep_alive_secs: u64,
}

impl Default for CloudConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            broker_url: "localhost".to_string(),
            broker_port: 1883,
            device_id: "unknown".to_string(),
            keep_alive_secs: 30,
        }
    }
}

impl CloudConfig {
    pub fn sessions_topic(&self) -> String {
        format!("devices/{}/sessions", self.device_id)
    }

    pub fn events_topic(&self) -> String {
        format!("devices/{}/events", self.device_id)
    }
}

/// Summary message for the cloud
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionMessage {
    pub message_type: String,
    pub device_id: String,
    pub published_at: DateTime<Utc>,
    pub summary: SessionSummary,
}

/// One located event for the shared hotspot collection
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EventPoint {
    pub ts: i64,
    #[serde(rename = "type")]
    pub kind: EventKind,
    pub lat: f64,
    pub lng: f64,
}

/// Batch of event points from one session
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventPointMessage {
    pub message_type: String,
    pub device_id: String,
    pub session_id: Uuid,
    pub owner_id: String,
    pub points: Vec<EventPoint>,
}

/// Build the summary message, refusing anonymous sessions
pub fn session_message(device_id: &str, summary: &SessionSummary) -> Result<SessionMessage, CloudError> {
    if summary.owner_id.is_none() {
        return Err(CloudError::MissingOwner(summary.session_id));
    }
    Ok(SessionMessage {
        message_type: "session".to_string(),
        device_id: device_id.to_string(),
        published_at: Utc::now(),
        summary: summary.clone(),
    })
}

/// Build the event point message. Events still at the `(0, 0)`
/// placeholder are left out; `None` when nothing is located.
pub fn event_point_message(
    device_id: &str,
    summary: &SessionSummary,
    events: &[DrivingEvent],
) -> Result<Option<EventPointMessage>, CloudError> {
    let owner_id = summary
        .owner_id
        .clone()
        .ok_or(CloudError::MissingOwner(summary.session_id))?;

    let points: Vec<EventPoint> = events
        .iter()
        .filter(|e| e.has_fix())
        .map(|e| EventPoint {
            ts: e.ts,
            kind: e.kind,
            lat: e.lat,
            lng: e.lng,
        })
        .collect();
    if points.is_empty() {
        return Ok(None);
    }

    Ok(Some(EventPointMessage {
        message_type: "event_points".to_string(),
        device_id: device_id.to_string(),
        session_id: summary.session_id,
        owner_id,
        points,
    }))
}

/// Destination for completed sessions
pub trait SummaryPublisher: Send + Sync {
    fn publish_summary(&self, summary: &SessionSummary) -> impl Future<Output = Result<(), CloudError>> + Send;

    /// Push the session's located events to the shared event point collection
    fn publish_event_points(
        &self,
        summary: &SessionSummary,
        events: &[DrivingEvent],
    ) -> impl Future<Output = Result<usize, CloudError>> + Send;
}

/// MQTT publisher
pub struct MqttPublisher {
    config: CloudConfig,
    client: Option<AsyncClient>,
    published: AtomicU64,
}

impl MqttPublisher {
    pub fn new(config: CloudConfig) -> Self {
        Self {
            config,
            client: None,
            published: AtomicU64::new(0),
        }
    }

    /// Connect to MQTT broker
    pub async fn connect(&mut self) -> Result<(), CloudError> {
        let mut options = MqttOptions::new(
            format!("telemetry-{}", self.config.device_id),
            &self.config.broker_url,
            self.config.broker_port,
        );
        options.set_keep_alive(Duration::from_secs(self.config.keep_alive_secs.max(5)));

        let (client, mut eventloop) = AsyncClient::new(options, 10);

        tokio::spawn(async move {
            loop {
                match eventloop.poll().await {
                    Ok(Event::Incoming(incoming)) => {
                        debug!("MQTT incoming: {:?}", incoming);
                    }
                    Err(e) => {
                        error!("MQTT error: {}", e);
                        tokio::time::sleep(Duration::from_secs(5)).await;
                    }
                    _ => {}
                }
            }
        });

        self.client = Some(client);
        info!("Connected to MQTT broker: {}:{}", self.config.broker_url, self.config.broker_port);
        Ok(())
    }

    pub fn config(&self) -> &CloudConfig {
        &self.config
    }

    /// Messages handed to the broker so far
    pub fn published_count(&self) -> u64 {
        self.published.load(Ordering::Relaxed)
    }

    async fn send<T: Serialize>(&self, topic: String, message: &T) -> Result<(), CloudError> {
        let client = self
            .client
            .as_ref()
            .ok_or_else(|| CloudError::Connection("Not connected".to_string()))?;

        let payload = serde_json::to_vec(message).map_err(|e| CloudError::Serialization(e.to_string()))?;

        client
            .publish(&topic, QoS::AtLeastOnce, false, payload)
            .await
            .map_err(|e| CloudError::Publish(e.to_string()))?;

        self.published.fetch_add(1, Ordering::Relaxed);
        debug!("Published to {}", topic);
        Ok(())
    }
}

impl SummaryPublisher for MqttPublisher {
    async fn publish_summary(&self, summary: &SessionSummary) -> Result<(), CloudError> {
        let message = session_message(&self.config.device_id, summary)?;
        self.send(self.config.sessions_topic(), &message).await?;
        info!("Published summary for session {}", summary.session_id);
        Ok(())
    }

    async fn publish_event_points(&self, summary: &SessionSummary, events: &[DrivingEvent]) -> Result<usize, CloudError> {
        match event_point_message(&self.config.device_id, summary, events)? {
            Some(message) => {
                let count = message.points.len();
                self.send(self.config.events_topic(), &message).await?;
                Ok(count)
            }
            None => Ok(0),
        }
    }
}

/// Publisher for offline operation. Still refuses anonymous sessions so
/// callers see the same contract either way.
#[derive(Debug, Default)]
pub struct DisabledPublisher;

impl SummaryPublisher for DisabledPublisher {
    async fn publish_summary(&self, summary: &SessionSummary) -> Result<(), CloudError> {
        session_message("offline", summary)?;
        debug!("Cloud sync disabled, summary {} kept local", summary.session_id);
        Ok(())
    }

    async fn publish_event_points(&self, summary: &SessionSummary, events: &[DrivingEvent]) -> Result<usize, CloudError> {
        Ok(event_point_message("offline", summary, events)?.map_or(0, |m| m.points.len()))
    }
}
