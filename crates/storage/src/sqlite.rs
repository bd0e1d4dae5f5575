//! SQLite session log
//!
//! One transaction per batch, and one per finished session. A failed insert
//! drops the transaction, which rolls back every row written under it.

use std::str::FromStr;

use event_classifier::{EventKind, Rotation, Sample};
use geo_track::{BoundingBox, LatLng, TrackPoint};
use session::{CompletedSession, DrivingEvent, SessionSummary};
use sqlx::sqlite::{SqliteConnectOptions, SqliteConnection, SqliteJournalMode, SqlitePool, SqlitePoolOptions};
use tracing::{debug, info};
use uuid::Uuid;

use crate::{check_events, check_samples, check_session, check_track, CommitCounts, SessionLog, StorageError, TimeRange};

const SCHEMA: &[&str] = &[
    "CREATE TABLE IF NOT EXISTS samples (
        session_id TEXT NOT NULL,
        ts INTEGER NOT NULL,
        ax REAL NOT NULL,
        ay REAL NOT NULL,
        az REAL NOT NULL,
        speed REAL NOT NULL,
        rotation_rate_z REAL NOT NULL,
        alpha REAL NOT NULL,
        beta REAL NOT NULL,
        gamma REAL NOT NULL
    )",
    "CREATE TABLE IF NOT EXISTS events (
        session_id TEXT NOT NULL,
        ts INTEGER NOT NULL,
        type TEXT NOT NULL,
        value REAL NOT NULL,
        lat REAL NOT NULL,
        lng REAL NOT NULL
    )",
    "CREATE TABLE IF NOT EXISTS track (
        session_id TEXT NOT NULL,
        ts INTEGER NOT NULL,
        lat REAL NOT NULL,
        lng REAL NOT NULL
    )",
    "CREATE TABLE IF NOT EXISTS summaries (
        session_id TEXT PRIMARY KEY,
        owner_id TEXT,
        started_at INTEGER NOT NULL,
        body TEXT NOT NULL
    )",
    "CREATE INDEX IF NOT EXISTS idx_samples_session_ts ON samples (session_id, ts)",
    "CREATE INDEX IF NOT EXISTS idx_events_session_ts ON events (session_id, ts)",
    "CREATE INDEX IF NOT EXISTS idx_events_position ON events (lat, lng)",
    "CREATE INDEX IF NOT EXISTS idx_track_session_ts ON track (session_id, ts)",
    "CREATE INDEX IF NOT EXISTS idx_summaries_owner ON summaries (owner_id, started_at)",
];

type SampleRow = (i64, f64, f64, f64, f64, f64, f64, f64, f64);
type EventRow = (i64, String, f64, f64, f64);

/// Session log backed by a SQLite database file
#[derive(Clone)]
pub struct SqliteRepository {
    pool: SqlitePool,
}

impl SqliteRepository {
    /// Open (or create) the database at `url` and apply the schema.
    /// `sqlite::memory:` gives a private in-memory database.
    pub async fn connect(url: &str) -> Result<Self, StorageError> {
        let in_memory = url.contains(":memory:");
        let mut options = SqliteConnectOptions::from_str(url)?.create_if_missing(true);
        if !in_memory {
            options = options.journal_mode(SqliteJournalMode::Wal);
        }

        // Each in-memory connection is its own database
        let max_connections = if in_memory { 1 } else { 5 };
        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections)
            .connect_with(options)
            .await?;

        for statement in SCHEMA {
            sqlx::query(statement).execute(&pool).await?;
        }

        info!("SQLite session log ready at {}", url);
        Ok(Self { pool })
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

fn event_from_row(row: EventRow) -> Result<DrivingEvent, StorageError> {
    let (ts, kind, value, lat, lng) = row;
    let kind = EventKind::parse(&kind)
        .ok_or_else(|| StorageError::SerializationError(format!("unknown event type '{}'", kind)))?;
    Ok(DrivingEvent {
        ts,
        kind,
        value,
        lat,
        lng,
    })
}

async fn insert_samples(conn: &mut SqliteConnection, id: &str, samples: &[Sample]) -> Result<(), sqlx::Error> {
    for s in samples {
        sqlx::query(
            "INSERT INTO samples (session_id, ts, ax, ay, az, speed, rotation_rate_z, alpha, beta, gamma)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(id)
        .bind(s.ts)
        .bind(s.ax)
        .bind(s.ay)
        .bind(s.az)
        .bind(s.effective_speed())
        .bind(s.effective_yaw_rate())
        .bind(s.rotation.alpha)
        .bind(s.rotation.beta)
        .bind(s.rotation.gamma)
        .execute(&mut *conn)
        .await?;
    }
    Ok(())
}

async fn insert_events(conn: &mut SqliteConnection, id: &str, events: &[DrivingEvent]) -> Result<(), sqlx::Error> {
    for e in events {
        sqlx::query("INSERT INTO events (session_id, ts, type, value, lat, lng) VALUES (?, ?, ?, ?, ?, ?)")
            .bind(id)
            .bind(e.ts)
            .bind(e.kind.as_str())
            .bind(e.value)
            .bind(e.lat)
            .bind(e.lng)
            .execute(&mut *conn)
            .await?;
    }
    Ok(())
}

async fn insert_track(conn: &mut SqliteConnection, id: &str, points: &[TrackPoint]) -> Result<(), sqlx::Error> {
    for p in points {
        sqlx::query("INSERT INTO track (session_id, ts, lat, lng) VALUES (?, ?, ?, ?)")
            .bind(id)
            .bind(p.ts)
            .bind(p.lat)
            .bind(p.lng)
            .execute(&mut *conn)
            .await?;
    }
    Ok(())
}

async fn upsert_summary(conn: &mut SqliteConnection, summary: &SessionSummary) -> Result<(), StorageError> {
    let body = serde_json::to_string(summary)?;
    sqlx::query("INSERT OR REPLACE INTO summaries (session_id, owner_id, started_at, body) VALUES (?, ?, ?, ?)")
        .bind(summary.session_id.to_string())
        .bind(summary.owner_id.as_deref())
        .bind(summary.started_at.timestamp_millis())
        .bind(body)
        .execute(&mut *conn)
        .await?;
    Ok(())
}

impl SessionLog for SqliteRepository {
    async fn append_samples(&self, session_id: Uuid, samples: &[Sample]) -> Result<usize, StorageError> {
        check_samples(samples)?;
        let mut tx = self.pool.begin().await?;
        insert_samples(&mut tx, &session_id.to_string(), samples).await?;
        tx.commit().await?;
        debug!("Committed {} samples for {}", samples.len(), session_id);
        Ok(samples.len())
    }

    async fn append_events(&self, session_id: Uuid, events: &[DrivingEvent]) -> Result<usize, StorageError> {
        check_events(events)?;
        let mut tx = self.pool.begin().await?;
        insert_events(&mut tx, &session_id.to_string(), events).await?;
        tx.commit().await?;
        debug!("Committed {} events for {}", events.len(), session_id);
        Ok(events.len())
    }

    async fn append_track(&self, session_id: Uuid, points: &[TrackPoint]) -> Result<usize, StorageError> {
        check_track(points)?;
        let mut tx = self.pool.begin().await?;
        insert_track(&mut tx, &session_id.to_string(), points).await?;
        tx.commit().await?;
        debug!("Committed {} track points for {}", points.len(), session_id);
        Ok(points.len())
    }

    async fn save_summary(&self, summary: &SessionSummary) -> Result<(), StorageError> {
        let mut conn = self.pool.acquire().await?;
        upsert_summary(&mut conn, summary).await
    }

    async fn commit_session(&self, session: &CompletedSession) -> Result<CommitCounts, StorageError> {
        check_session(session)?;
        let id = session.id.to_string();
        let mut tx = self.pool.begin().await?;
        insert_samples(&mut tx, &id, &session.samples).await?;
        insert_events(&mut tx, &id, &session.events).await?;
        insert_track(&mut tx, &id, &session.track).await?;
        upsert_summary(&mut tx, &session.summary).await?;
        tx.commit().await?;

        let counts = CommitCounts {
            samples: session.samples.len(),
            events: session.events.len(),
            track_points: session.track.len(),
        };
        debug!("Committed session {}: {:?}", session.id, counts);
        Ok(counts)
    }

    async fn samples_in(&self, session_id: Uuid, range: TimeRange) -> Result<Vec<Sample>, StorageError> {
        let rows: Vec<SampleRow> = sqlx::query_as(
            "SELECT ts, ax, ay, az, speed, rotation_rate_z, alpha, beta, gamma FROM samples
             WHERE session_id = ? AND ts BETWEEN ? AND ? ORDER BY ts, rowid",
        )
        .bind(session_id.to_string())
        .bind(range.from_ts)
        .bind(range.to_ts)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|(ts, ax, ay, az, speed, rotation_rate_z, alpha, beta, gamma)| Sample {
                ts,
                ax,
                ay,
                az,
                speed,
                rotation_rate_z,
                rotation: Rotation { alpha, beta, gamma },
            })
            .collect())
    }

    async fn events_in(&self, session_id: Uuid, range: TimeRange) -> Result<Vec<DrivingEvent>, StorageError> {
        let rows: Vec<EventRow> = sqlx::query_as(
            "SELECT ts, type, value, lat, lng FROM events
             WHERE session_id = ? AND ts BETWEEN ? AND ? ORDER BY ts, rowid",
        )
        .bind(session_id.to_string())
        .bind(range.from_ts)
        .bind(range.to_ts)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(event_from_row).collect()
    }

    async fn track_in(&self, session_id: Uuid, range: TimeRange) -> Result<Vec<TrackPoint>, StorageError> {
        let rows: Vec<(i64, f64, f64)> = sqlx::query_as(
            "SELECT ts, lat, lng FROM track WHERE session_id = ? AND ts BETWEEN ? AND ? ORDER BY ts, rowid",
        )
        .bind(session_id.to_string())
        .bind(range.from_ts)
        .bind(range.to_ts)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(|(ts, lat, lng)| TrackPoint::new(ts, lat, lng)).collect())
    }

    async fn event_points_in(&self, bbox: BoundingBox) -> Result<Vec<LatLng>, StorageError> {
        let rows: Vec<(f64, f64)> = sqlx::query_as(
            "SELECT lat, lng FROM events
             WHERE lat BETWEEN ? AND ? AND lng BETWEEN ? AND ? AND NOT (lat = 0 AND lng = 0)
             ORDER BY ts",
        )
        .bind(bbox.min_lat)
        .bind(bbox.max_lat)
        .bind(bbox.min_lng)
        .bind(bbox.max_lng)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(|(lat, lng)| LatLng::new(lat, lng)).collect())
    }

    async fn summaries(&self, owner_id: Option<&str>) -> Result<Vec<SessionSummary>, StorageError> {
        let rows: Vec<(String,)> = match owner_id {
            Some(owner) => {
                sqlx::query_as("SELECT body FROM summaries WHERE owner_id = ? ORDER BY started_at DESC")
                    .bind(owner)
                    .fetch_all(&self.pool)
                    .await?
            }
            None => {
                sqlx::query_as("SELECT body FROM summaries ORDER BY started_at DESC")
                    .fetch_all(&self.pool)
                    .await?
            }
        };

        rows.into_iter()
            .map(|(body,)| serde_json::from_str(&body).map_err(StorageError::from))
            .collect()
    }
}
