//! libSQL backend — async `Database` trait implementation.
//!
//! Supports local file and in-memory databases. The two-column follow-up
//! patch is a single UPDATE statement, which is all the atomicity the
//! mutation protocol relies on.

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use libsql::{Connection, Database as LibSqlDatabase, params};
use tracing::{debug, info};
use uuid::Uuid;

use crate::clients::model::{Client, ClientEvent, EventOperation, NewClient};
use crate::error::DatabaseError;
use crate::followup::{FollowUp, FollowUpField, OnboardingStatus};
use crate::store::migrations;
use crate::store::traits::Database;

/// libSQL database backend.
///
/// Stores a single connection that is reused for all operations.
/// `libsql::Connection` is `Send + Sync` and safe for concurrent async use.
pub struct LibSqlBackend {
    #[allow(dead_code)]
    db: Arc<LibSqlDatabase>,
    conn: Connection,
}

impl LibSqlBackend {
    /// Open (or create) a local database file and run migrations.
    pub async fn new_local(path: &Path) -> Result<Self, DatabaseError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                DatabaseError::Pool(format!("Failed to create database directory: {e}"))
            })?;
        }

        let db = libsql::Builder::new_local(path)
            .build()
            .await
            .map_err(|e| DatabaseError::Pool(format!("Failed to open libSQL database: {e}")))?;

        let conn = db
            .connect()
            .map_err(|e| DatabaseError::Pool(format!("Failed to create connection: {e}")))?;

        let backend = Self {
            db: Arc::new(db),
            conn,
        };
        backend.run_migrations().await?;
        info!(path = %path.display(), "Database opened");
        Ok(backend)
    }

    /// Create an in-memory database (for tests).
    pub async fn new_memory() -> Result<Self, DatabaseError> {
        let db = libsql::Builder::new_local(":memory:")
            .build()
            .await
            .map_err(|e| {
                DatabaseError::Pool(format!("Failed to create in-memory database: {e}"))
            })?;

        let conn = db
            .connect()
            .map_err(|e| DatabaseError::Pool(format!("Failed to create connection: {e}")))?;

        let backend = Self {
            db: Arc::new(db),
            conn,
        };
        backend.run_migrations().await?;
        Ok(backend)
    }

    /// Get the connection.
    fn conn(&self) -> &Connection {
        &self.conn
    }
}

// ── Helper functions ────────────────────────────────────────────────

/// Parse an RFC 3339 or SQLite datetime string into DateTime<Utc>.
fn parse_datetime(s: &str) -> DateTime<Utc> {
    // RFC 3339 is our canonical write format
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return dt.with_timezone(&Utc);
    }
    // SQLite datetime() output with and without fractional seconds
    if let Ok(ndt) = chrono::NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S%.f") {
        return ndt.and_utc();
    }
    if let Ok(ndt) = chrono::NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S") {
        return ndt.and_utc();
    }
    DateTime::<Utc>::MIN_UTC
}

/// Convert `Option<&str>` to libsql Value.
fn opt_text(s: Option<&str>) -> libsql::Value {
    match s {
        Some(s) => libsql::Value::Text(s.to_string()),
        None => libsql::Value::Null,
    }
}

const CLIENT_COLUMNS: &str = "id, first_name, last_name, email, phone, referral_source, class_id, follow_up, onboarding_status, created_at, updated_at";

const EVENT_COLUMNS: &str =
    "id, client_id, operation, previous_follow_up, new_follow_up, recorded_at";

/// Map a libsql Row to a Client. Column order matches CLIENT_COLUMNS.
fn row_to_client(row: &libsql::Row) -> Result<Client, libsql::Error> {
    let id_str: String = row.get(0)?;
    let class_id: Option<String> = row.get::<String>(6).ok();
    let follow_up: Option<String> = row.get::<String>(7).ok();
    let status_str: String = row.get(8)?;
    let created_str: String = row.get(9)?;
    let updated_str: String = row.get(10)?;

    Ok(Client {
        id: Uuid::parse_str(&id_str).unwrap_or_else(|_| Uuid::nil()),
        first_name: row.get(1)?,
        last_name: row.get(2)?,
        email: row.get(3)?,
        phone: row.get(4)?,
        referral_source: row.get(5)?,
        class_id,
        follow_up: FollowUpField::from_stored(follow_up.as_deref()),
        onboarding_status: OnboardingStatus::from_label(&status_str).unwrap_or_default(),
        created_at: parse_datetime(&created_str),
        updated_at: parse_datetime(&updated_str),
    })
}

/// Map a libsql Row to a ClientEvent. Column order matches EVENT_COLUMNS.
fn row_to_event(row: &libsql::Row) -> Result<ClientEvent, libsql::Error> {
    let id_str: String = row.get(0)?;
    let client_id_str: String = row.get(1)?;
    let operation_str: String = row.get(2)?;
    let recorded_str: String = row.get(5)?;

    Ok(ClientEvent {
        id: Uuid::parse_str(&id_str).unwrap_or_else(|_| Uuid::nil()),
        client_id: Uuid::parse_str(&client_id_str).unwrap_or_else(|_| Uuid::nil()),
        operation: EventOperation::from_str(&operation_str)
            .unwrap_or(EventOperation::TaskOverridden),
        previous_follow_up: row.get::<String>(3).ok(),
        new_follow_up: row.get::<String>(4).ok(),
        recorded_at: parse_datetime(&recorded_str),
    })
}

// ── Trait implementation ────────────────────────────────────────────

#[async_trait]
impl Database for LibSqlBackend {
    async fn run_migrations(&self) -> Result<(), DatabaseError> {
        migrations::run_migrations(self.conn()).await
    }

    // ── Clients ─────────────────────────────────────────────────────

    async fn insert_client(&self, new: &NewClient) -> Result<Client, DatabaseError> {
        let id = Uuid::new_v4();
        let now = Utc::now();
        let conn = self.conn();

        conn.execute(
            "INSERT INTO clients (id, first_name, last_name, email, phone, referral_source,
                follow_up, onboarding_status, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, NULL, ?7, ?8, ?8)",
            params![
                id.to_string(),
                new.first_name.clone(),
                new.last_name.clone(),
                new.email.clone(),
                new.phone.clone(),
                new.referral_source.clone(),
                OnboardingStatus::Initiation.label(),
                now.to_rfc3339(),
            ],
        )
        .await
        .map_err(|e| DatabaseError::Query(format!("insert_client: {e}")))?;

        debug!(client_id = %id, "Client inserted into DB");
        Ok(Client {
            id,
            first_name: new.first_name.clone(),
            last_name: new.last_name.clone(),
            email: new.email.clone(),
            phone: new.phone.clone(),
            referral_source: new.referral_source.clone(),
            class_id: None,
            follow_up: FollowUpField::Unset,
            onboarding_status: OnboardingStatus::Initiation,
            created_at: now,
            updated_at: now,
        })
    }

    async fn get_client(&self, id: Uuid) -> Result<Option<Client>, DatabaseError> {
        let conn = self.conn();
        let mut rows = conn
            .query(
                &format!("SELECT {CLIENT_COLUMNS} FROM clients WHERE id = ?1"),
                params![id.to_string()],
            )
            .await
            .map_err(|e| DatabaseError::Query(format!("get_client: {e}")))?;

        match rows.next().await {
            Ok(Some(row)) => {
                let client = row_to_client(&row)
                    .map_err(|e| DatabaseError::Query(format!("get_client row parse: {e}")))?;
                Ok(Some(client))
            }
            Ok(None) => Ok(None),
            Err(e) => Err(DatabaseError::Query(format!("get_client: {e}"))),
        }
    }

    async fn get_client_by_email(&self, email: &str) -> Result<Option<Client>, DatabaseError> {
        let conn = self.conn();
        let mut rows = conn
            .query(
                &format!(
                    "SELECT {CLIENT_COLUMNS} FROM clients WHERE email = ?1 ORDER BY created_at ASC LIMIT 1"
                ),
                params![email],
            )
            .await
            .map_err(|e| DatabaseError::Query(format!("get_client_by_email: {e}")))?;

        match rows.next().await {
            Ok(Some(row)) => {
                let client = row_to_client(&row).map_err(|e| {
                    DatabaseError::Query(format!("get_client_by_email row parse: {e}"))
                })?;
                Ok(Some(client))
            }
            Ok(None) => Ok(None),
            Err(e) => Err(DatabaseError::Query(format!("get_client_by_email: {e}"))),
        }
    }

    async fn list_clients(&self) -> Result<Vec<Client>, DatabaseError> {
        let conn = self.conn();
        let mut rows = conn
            .query(
                &format!("SELECT {CLIENT_COLUMNS} FROM clients ORDER BY created_at DESC"),
                (),
            )
            .await
            .map_err(|e| DatabaseError::Query(format!("list_clients: {e}")))?;

        let mut clients = Vec::new();
        while let Ok(Some(row)) = rows.next().await {
            match row_to_client(&row) {
                Ok(client) => clients.push(client),
                Err(e) => {
                    tracing::warn!("Skipping client row: {e}");
                }
            }
        }
        Ok(clients)
    }

    async fn update_follow_up(
        &self,
        id: Uuid,
        follow_up: FollowUp,
        status: OnboardingStatus,
    ) -> Result<bool, DatabaseError> {
        let conn = self.conn();
        let now = Utc::now().to_rfc3339();
        let stored = FollowUpField::from(follow_up);

        let count = conn
            .execute(
                "UPDATE clients SET follow_up = ?1, onboarding_status = ?2, updated_at = ?3
                 WHERE id = ?4",
                params![
                    opt_text(stored.stored_label()),
                    status.label(),
                    now,
                    id.to_string(),
                ],
            )
            .await
            .map_err(|e| DatabaseError::Query(format!("update_follow_up: {e}")))?;

        debug!(client_id = %id, status = %status, "Follow-up pair updated in DB");
        Ok(count > 0)
    }

    async fn update_contact(&self, id: Uuid, new: &NewClient) -> Result<bool, DatabaseError> {
        let conn = self.conn();
        let now = Utc::now().to_rfc3339();

        let count = conn
            .execute(
                "UPDATE clients SET
                    first_name = COALESCE(NULLIF(?1, ''), first_name),
                    last_name = COALESCE(NULLIF(?2, ''), last_name),
                    phone = COALESCE(NULLIF(?3, ''), phone),
                    referral_source = COALESCE(NULLIF(?4, ''), referral_source),
                    updated_at = ?5
                 WHERE id = ?6",
                params![
                    new.first_name.clone(),
                    new.last_name.clone(),
                    new.phone.clone(),
                    new.referral_source.clone(),
                    now,
                    id.to_string(),
                ],
            )
            .await
            .map_err(|e| DatabaseError::Query(format!("update_contact: {e}")))?;

        Ok(count > 0)
    }

    async fn delete_client(&self, id: Uuid) -> Result<bool, DatabaseError> {
        let conn = self.conn();

        // Not every deployment has foreign keys enforced, so clear the
        // trail explicitly before the row.
        conn.execute(
            "DELETE FROM client_events WHERE client_id = ?1",
            params![id.to_string()],
        )
        .await
        .map_err(|e| DatabaseError::Query(format!("delete_client events: {e}")))?;

        let count = conn
            .execute(
                "DELETE FROM clients WHERE id = ?1",
                params![id.to_string()],
            )
            .await
            .map_err(|e| DatabaseError::Query(format!("delete_client: {e}")))?;

        Ok(count > 0)
    }

    // ── Audit trail ─────────────────────────────────────────────────

    async fn append_event(
        &self,
        client_id: Uuid,
        operation: EventOperation,
        previous: Option<&str>,
        new: Option<&str>,
    ) -> Result<(), DatabaseError> {
        let conn = self.conn();
        let id = Uuid::new_v4();
        let now = Utc::now().to_rfc3339();

        conn.execute(
            "INSERT INTO client_events (id, client_id, operation, previous_follow_up,
                new_follow_up, recorded_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                id.to_string(),
                client_id.to_string(),
                operation.as_str(),
                opt_text(previous),
                opt_text(new),
                now,
            ],
        )
        .await
        .map_err(|e| DatabaseError::Query(format!("append_event: {e}")))?;

        Ok(())
    }

    async fn list_events(&self, client_id: Uuid) -> Result<Vec<ClientEvent>, DatabaseError> {
        let conn = self.conn();
        let mut rows = conn
            .query(
                &format!(
                    "SELECT {EVENT_COLUMNS} FROM client_events WHERE client_id = ?1 ORDER BY recorded_at ASC, id ASC"
                ),
                params![client_id.to_string()],
            )
            .await
            .map_err(|e| DatabaseError::Query(format!("list_events: {e}")))?;

        let mut events = Vec::new();
        while let Ok(Some(row)) = rows.next().await {
            match row_to_event(&row) {
                Ok(event) => events.push(event),
                Err(e) => {
                    tracing::warn!("Skipping event row: {e}");
                }
            }
        }
        Ok(events)
    }
}
