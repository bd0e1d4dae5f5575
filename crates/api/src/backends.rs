//! Concrete storage and publish backends selected by configuration

use std::sync::Arc;

use cloud_sync::{CloudConfig, CloudError, DisabledPublisher, MqttPublisher, SummaryPublisher};
use event_classifier::Sample;
use geo_track::{BoundingBox, LatLng, TrackPoint};
use hotspot::{EventPointSource, HotspotError};
use session::{CompletedSession, DrivingEvent, SessionSummary};
use storage::{CommitCounts, Repository, SessionLog, SqliteRepository, StorageError, TimeRange};
use tracing::info;
use uuid::Uuid;

use crate::config::StorageConfig;

/// Session log backend
#[derive(Clone)]
pub enum Store {
    Memory(Arc<Repository>),
    Sqlite(SqliteRepository),
}

impl Store {
    pub async fn open(config: &StorageConfig) -> Result<Self, StorageError> {
        if config.is_memory() {
            info!("Using in-memory session log");
            return Ok(Store::Memory(Arc::new(Repository::with_retention(
                config.memory_retention_sessions,
            ))));
        }
        Ok(Store::Sqlite(SqliteRepository::connect(&config.url).await?))
    }

    pub fn backend_name(&self) -> &'static str {
        match self {
            Store::Memory(_) => "memory",
            Store::Sqlite(_) => "sqlite",
        }
    }
}

impl SessionLog for Store {
    async fn append_samples(&self, session_id: Uuid, samples: &[Sample]) -> Result<usize, StorageError> {
        match self {
            Store::Memory(r) => r.append_samples(session_id, samples).await,
            Store::Sqlite(r) => r.append_samples(session_id, samples).await,
        }
    }

    async fn append_events(&self, session_id: Uuid, events: &[DrivingEvent]) -> Result<usize, StorageError> {
        match self {
            Store::Memory(r) => r.append_events(session_id, events).await,
            Store::Sqlite(r) => r.append_events(session_id, events).await,
        }
    }

    async fn append_track(&self, session_id: Uuid, points: &[TrackPoint]) -> Result<usize, StorageError> {
        match self {
            Store::Memory(r) => r.append_track(session_id, points).await,
            Store::Sqlite(r) => r.append_track(session_id, points).await,
        }
    }

    async fn save_summary(&self, summary: &SessionSummary) -> Result<(), StorageError> {
        match self {
            Store::Memory(r) => r.save_summary(summary).await,
            Store::Sqlite(r) => r.save_summary(summary).await,
        }
    }

    async fn commit_session(&self, session: &CompletedSession) -> Result<CommitCounts, StorageError> {
        match self {
            Store::Memory(r) => r.commit_session(session).await,
            Store::Sqlite(r) => r.commit_session(session).await,
        }
    }

    async fn samples_in(&self, session_id: Uuid, range: TimeRange) -> Result<Vec<Sample>, StorageError> {
        match self {
            Store::Memory(r) => r.samples_in(session_id, range).await,
            Store::Sqlite(r) => r.samples_in(session_id, range).await,
        }
    }

    async fn events_in(&self, session_id: Uuid, range: TimeRange) -> Result<Vec<DrivingEvent>, StorageError> {
        match self {
            Store::Memory(r) => r.events_in(session_id, range).await,
            Store::Sqlite(r) => r.events_in(session_id, range).await,
        }
    }

    async fn track_in(&self, session_id: Uuid, range: TimeRange) -> Result<Vec<TrackPoint>, StorageError> {
        match self {
            Store::Memory(r) => r.track_in(session_id, range).await,
            Store::Sqlite(r) => r.track_in(session_id, range).await,
        }
    }

    async fn event_points_in(&self, bbox: BoundingBox) -> Result<Vec<LatLng>, StorageError> {
        match self {
            Store::Memory(r) => r.event_points_in(bbox).await,
            Store::Sqlite(r) => r.event_points_in(bbox).await,
        }
    }

    async fn summaries(&self, owner_id: Option<&str>) -> Result<Vec<SessionSummary>, StorageError> {
        match self {
            Store::Memory(r) => r.summaries(owner_id).await,
            Store::Sqlite(r) => r.summaries(owner_id).await,
        }
    }
}

impl EventPointSource for Store {
    async fn event_points(&self, bbox: BoundingBox) -> Result<Vec<LatLng>, HotspotError> {
        self.event_points_in(bbox)
            .await
            .map_err(|e| HotspotError::Fetch(e.to_string()))
    }
}

/// Summary publish backend
pub enum Publisher {
    Mqtt(MqttPublisher),
    Disabled(DisabledPublisher),
}

impl Publisher {
    /// Connect to the broker when cloud sync is enabled
    pub async fn from_config(config: &CloudConfig) -> Result<Self, CloudError> {
        if !config.enabled {
            info!("Cloud sync disabled");
            return Ok(Publisher::Disabled(DisabledPublisher));
        }
        let mut publisher = MqttPublisher::new(config.clone());
        publisher.connect().await?;
        Ok(Publisher::Mqtt(publisher))
    }
}

impl SummaryPublisher for Publisher {
    async fn publish_summary(&self, summary: &SessionSummary) -> Result<(), CloudError> {
        match self {
            Publisher::Mqtt(p) => p.publish_summary(summary).await,
            Publisher::Disabled(p) => p.publish_summary(summary).await,
        }
    }

    async fn publish_event_points(&self, summary: &SessionSummary, events: &[DrivingEvent]) -> Result<usize, CloudError> {
        match self {
            Publisher::Mqtt(p) => p.publish_event_points(summary, events).await,
            Publisher::Disabled(p) => p.publish_event_points(summary, events).await,
        }
    }
}
