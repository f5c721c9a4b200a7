//! Backend-agnostic `Database` trait — single async interface for all
//! persistence.

use async_trait::async_trait;
use uuid::Uuid;

use crate::clients::model::{Client, ClientEvent, EventOperation, NewClient};
use crate::error::DatabaseError;
use crate::followup::{FollowUp, OnboardingStatus};

#[async_trait]
pub trait Database: Send + Sync {
    /// Run all pending schema migrations.
    async fn run_migrations(&self) -> Result<(), DatabaseError>;

    // ── Clients ─────────────────────────────────────────────────────

    /// Insert a new client with no follow-up assigned and status
    /// Initiation. Returns the stored record.
    async fn insert_client(&self, new: &NewClient) -> Result<Client, DatabaseError>;

    /// Get a client by id.
    async fn get_client(&self, id: Uuid) -> Result<Option<Client>, DatabaseError>;

    /// Look up a client by email (intake dedup).
    async fn get_client_by_email(&self, email: &str) -> Result<Option<Client>, DatabaseError>;

    /// All clients, most recently created first.
    async fn list_clients(&self) -> Result<Vec<Client>, DatabaseError>;

    /// Patch the follow-up pair on one row. Both columns are written by a
    /// single statement so a reader never sees them out of sync. Returns
    /// false when no row has this id.
    async fn update_follow_up(
        &self,
        id: Uuid,
        follow_up: FollowUp,
        status: OnboardingStatus,
    ) -> Result<bool, DatabaseError>;

    /// Refresh contact fields on an existing row; empty incoming fields
    /// leave the stored values untouched. Returns false when no row has
    /// this id.
    async fn update_contact(&self, id: Uuid, new: &NewClient) -> Result<bool, DatabaseError>;

    /// Delete a row and its audit trail. Returns false when the row was
    /// already gone.
    async fn delete_client(&self, id: Uuid) -> Result<bool, DatabaseError>;

    // ── Audit trail ─────────────────────────────────────────────────

    /// Append a follow-up change event.
    async fn append_event(
        &self,
        client_id: Uuid,
        operation: EventOperation,
        previous: Option<&str>,
        new: Option<&str>,
    ) -> Result<(), DatabaseError>;

    /// Events for one client, oldest first.
    async fn list_events(&self, client_id: Uuid) -> Result<Vec<ClientEvent>, DatabaseError>;
}
