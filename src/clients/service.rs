//! Client mutation protocol — the operations behind the dashboard.
//!
//! Each mutation fetches the current row, decides, then applies a single
//! two-column patch so `onboarding_status` can never be observed out of sync
//! with `follow_up`. There is no compare-and-swap around the read+patch;
//! concurrent edits to the same client are last-write-wins.

use std::sync::Arc;

use tracing::{info, warn};
use uuid::Uuid;

use crate::error::{DatabaseError, MutationError};
use crate::followup::{FollowUp, FollowUpField, OnboardingStatus, next_task};
use crate::store::Database;

use super::model::{Client, ClientEvent, EventOperation, NewClient};

/// Outcome of a successful follow-up mutation: the new stored pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TaskUpdate {
    pub follow_up: FollowUp,
    pub status: OnboardingStatus,
}

/// Outcome of a delete.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeleteOutcome {
    Deleted,
    AlreadyDeleted,
}

/// Coordinates client reads and the follow-up mutation protocol.
pub struct ClientService {
    db: Arc<dyn Database>,
}

impl ClientService {
    pub fn new(db: Arc<dyn Database>) -> Self {
        Self { db }
    }

    pub async fn get(&self, id: Uuid) -> Result<Option<Client>, DatabaseError> {
        self.db.get_client(id).await
    }

    pub async fn list(&self) -> Result<Vec<Client>, DatabaseError> {
        self.db.list_clients().await
    }

    pub async fn find_by_email(&self, email: &str) -> Result<Option<Client>, DatabaseError> {
        self.db.get_client_by_email(email).await
    }

    pub async fn events(&self, id: Uuid) -> Result<Vec<ClientEvent>, MutationError> {
        match self.db.get_client(id).await? {
            Some(_) => Ok(self.db.list_events(id).await?),
            None => Err(MutationError::NotFound),
        }
    }

    /// Create a client with no follow-up assigned yet.
    pub async fn create(&self, new: &NewClient) -> Result<Client, DatabaseError> {
        let client = self.db.insert_client(new).await?;
        self.record_event(client.id, EventOperation::Created, None, None)
            .await;
        info!(client_id = %client.id, "Client created");
        Ok(client)
    }

    /// Refresh contact fields on an existing client (intake dedup path).
    /// Empty payload fields leave the stored values alone.
    pub async fn update_contact(&self, id: Uuid, new: &NewClient) -> Result<(), MutationError> {
        if self.db.update_contact(id, new).await? {
            Ok(())
        } else {
            Err(MutationError::NotFound)
        }
    }

    /// Check off the current manual task and advance the pipeline.
    pub async fn complete_current_task(&self, id: Uuid) -> Result<TaskUpdate, MutationError> {
        let client = self.db.get_client(id).await?.ok_or(MutationError::NotFound)?;

        match &client.follow_up {
            FollowUpField::Current(FollowUp::Done) => {
                return Err(MutationError::AlreadyComplete);
            }
            FollowUpField::Current(FollowUp::Task(task)) if task.is_automatic() => {
                return Err(MutationError::AutomaticTask(task.label()));
            }
            _ => {}
        }

        let next = next_task(&client.follow_up);
        let status = next.status();
        self.apply_patch(id, next, status).await?;

        let new_field = FollowUpField::from(next);
        self.record_event(
            id,
            EventOperation::TaskCompleted,
            client.follow_up.stored_label(),
            new_field.stored_label(),
        )
        .await;

        info!(
            client_id = %id,
            next = next.label().unwrap_or("none"),
            status = %status,
            "Follow-up task completed"
        );
        Ok(TaskUpdate { follow_up: next, status })
    }

    /// Operator override: move the client to any pipeline position,
    /// forward, backward, or straight to done.
    pub async fn set_task(&self, id: Uuid, task: FollowUp) -> Result<TaskUpdate, MutationError> {
        let client = self.db.get_client(id).await?.ok_or(MutationError::NotFound)?;

        let status = task.status();
        self.apply_patch(id, task, status).await?;

        let new_field = FollowUpField::from(task);
        self.record_event(
            id,
            EventOperation::TaskOverridden,
            client.follow_up.stored_label(),
            new_field.stored_label(),
        )
        .await;

        info!(
            client_id = %id,
            task = task.label().unwrap_or("none"),
            status = %status,
            "Follow-up task overridden"
        );
        Ok(TaskUpdate { follow_up: task, status })
    }

    /// Delete a client. Deleting an already-absent record is still success.
    pub async fn delete(&self, id: Uuid) -> Result<DeleteOutcome, MutationError> {
        if self.db.delete_client(id).await? {
            info!(client_id = %id, "Client deleted");
            Ok(DeleteOutcome::Deleted)
        } else {
            Ok(DeleteOutcome::AlreadyDeleted)
        }
    }

    async fn apply_patch(
        &self,
        id: Uuid,
        follow_up: FollowUp,
        status: OnboardingStatus,
    ) -> Result<(), MutationError> {
        if self.db.update_follow_up(id, follow_up, status).await? {
            Ok(())
        } else {
            // Row vanished between the read and the patch.
            Err(MutationError::NotFound)
        }
    }

    /// Append to the audit trail. Failures are logged, never surfaced: the
    /// mutation itself already committed.
    async fn record_event(
        &self,
        client_id: Uuid,
        operation: EventOperation,
        previous: Option<&str>,
        new: Option<&str>,
    ) {
        if let Err(e) = self.db.append_event(client_id, operation, previous, new).await {
            warn!(client_id = %client_id, error = %e, "Failed to record client event");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::followup::FollowUpTask;
    use crate::store::LibSqlBackend;

    async fn service() -> ClientService {
        let db: Arc<dyn Database> = Arc::new(LibSqlBackend::new_memory().await.unwrap());
        ClientService::new(db)
    }

    async fn seed(service: &ClientService) -> Uuid {
        let client = service
            .create(&NewClient {
                first_name: "Test".into(),
                last_name: "Client".into(),
                email: "test@example.com".into(),
                ..Default::default()
            })
            .await
            .unwrap();
        client.id
    }

    async fn stored_pair(service: &ClientService, id: Uuid) -> (FollowUpField, OnboardingStatus) {
        let client = service.get(id).await.unwrap().unwrap();
        (client.follow_up, client.onboarding_status)
    }

    #[tokio::test]
    async fn complete_on_fresh_client_starts_pipeline() {
        let service = service().await;
        let id = seed(&service).await;

        let update = service.complete_current_task(id).await.unwrap();
        assert_eq!(
            update.follow_up,
            FollowUp::Task(FollowUpTask::CallClientForOnboarding)
        );
        assert_eq!(update.status, OnboardingStatus::Initiation);

        let (field, status) = stored_pair(&service, id).await;
        assert_eq!(field, FollowUpField::from(update.follow_up));
        assert_eq!(status, update.status);
    }

    #[tokio::test]
    async fn complete_missing_client_is_not_found() {
        let service = service().await;
        let err = service
            .complete_current_task(Uuid::new_v4())
            .await
            .unwrap_err();
        assert!(matches!(err, MutationError::NotFound));
        assert_eq!(err.to_string(), "Client not found.");
    }

    #[tokio::test]
    async fn complete_on_automatic_task_fails_and_leaves_record_alone() {
        let service = service().await;
        let id = seed(&service).await;
        service
            .set_task(id, FollowUp::Task(FollowUpTask::ConfirmPayment))
            .await
            .unwrap();

        let err = service.complete_current_task(id).await.unwrap_err();
        assert!(matches!(err, MutationError::AutomaticTask(_)));

        let (field, status) = stored_pair(&service, id).await;
        assert_eq!(
            field,
            FollowUpField::Current(FollowUp::Task(FollowUpTask::ConfirmPayment))
        );
        assert_eq!(status, OnboardingStatus::PaymentPending);
    }

    #[tokio::test]
    async fn complete_on_done_client_fails() {
        let service = service().await;
        let id = seed(&service).await;
        service.set_task(id, FollowUp::Done).await.unwrap();

        let err = service.complete_current_task(id).await.unwrap_err();
        assert!(matches!(err, MutationError::AlreadyComplete));
    }

    #[tokio::test]
    async fn completing_payment_link_reaches_automatic_confirm() {
        let service = service().await;
        let id = seed(&service).await;
        service
            .set_task(id, FollowUp::Task(FollowUpTask::SendPaymentLinkSms))
            .await
            .unwrap();

        let update = service.complete_current_task(id).await.unwrap();
        assert_eq!(update.follow_up, FollowUp::Task(FollowUpTask::ConfirmPayment));
        assert_eq!(update.status, OnboardingStatus::PaymentPending);

        let (field, status) = stored_pair(&service, id).await;
        assert_eq!(field, FollowUpField::from(update.follow_up));
        assert_eq!(status, OnboardingStatus::PaymentPending);
    }

    #[tokio::test]
    async fn manual_path_from_admin_call_finishes_onboarding() {
        let service = service().await;
        let id = seed(&service).await;
        service
            .set_task(id, FollowUp::Task(FollowUpTask::AdminCall))
            .await
            .unwrap();

        let update = service.complete_current_task(id).await.unwrap();
        assert_eq!(update.follow_up, FollowUp::Done);
        assert_eq!(update.status, OnboardingStatus::Complete);
    }

    #[tokio::test]
    async fn set_task_to_done_completes_regardless_of_position() {
        let service = service().await;
        let id = seed(&service).await;
        service
            .set_task(id, FollowUp::Task(FollowUpTask::SendValentSignupSms))
            .await
            .unwrap();

        let update = service.set_task(id, FollowUp::Done).await.unwrap();
        assert_eq!(update.follow_up, FollowUp::Done);
        assert_eq!(update.status, OnboardingStatus::Complete);

        let (field, status) = stored_pair(&service, id).await;
        assert_eq!(field, FollowUpField::Current(FollowUp::Done));
        assert_eq!(status, OnboardingStatus::Complete);
    }

    #[tokio::test]
    async fn set_task_can_move_backward() {
        let service = service().await;
        let id = seed(&service).await;
        service
            .set_task(id, FollowUp::Task(FollowUpTask::AdminCall))
            .await
            .unwrap();

        let update = service
            .set_task(id, FollowUp::Task(FollowUpTask::CallClientForOnboarding))
            .await
            .unwrap();
        assert_eq!(update.status, OnboardingStatus::Initiation);
    }

    #[tokio::test]
    async fn set_task_on_missing_client_is_not_found() {
        let service = service().await;
        let err = service
            .set_task(Uuid::new_v4(), FollowUp::Done)
            .await
            .unwrap_err();
        assert!(matches!(err, MutationError::NotFound));
    }

    #[tokio::test]
    async fn delete_is_idempotent() {
        let service = service().await;
        let id = seed(&service).await;

        assert_eq!(service.delete(id).await.unwrap(), DeleteOutcome::Deleted);
        assert_eq!(
            service.delete(id).await.unwrap(),
            DeleteOutcome::AlreadyDeleted
        );
        assert!(service.get(id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn mutations_append_to_the_audit_trail() {
        let service = service().await;
        let id = seed(&service).await;
        service.complete_current_task(id).await.unwrap();
        service.set_task(id, FollowUp::Done).await.unwrap();

        let events = service.events(id).await.unwrap();
        let operations: Vec<_> = events.iter().map(|e| e.operation).collect();
        assert_eq!(
            operations,
            vec![
                EventOperation::Created,
                EventOperation::TaskCompleted,
                EventOperation::TaskOverridden,
            ]
        );
        assert_eq!(
            events[1].new_follow_up.as_deref(),
            Some("Call Client for Onboarding")
        );
        assert_eq!(events[2].new_follow_up.as_deref(), Some("None"));
    }

    #[tokio::test]
    async fn events_for_missing_client_is_not_found() {
        let service = service().await;
        let err = service.events(Uuid::new_v4()).await.unwrap_err();
        assert!(matches!(err, MutationError::NotFound));
    }
}
