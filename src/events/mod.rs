use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use tokio::sync::broadcast;
use tokio::sync::broadcast::error::RecvError;
use uuid::Uuid;

pub mod loggable;
pub use loggable::{ActivityAction, Loggable};

/// One audit entry on its way to the `activity_logs` table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActivityEvent {
    pub id: Uuid,
    pub user_id: Uuid,
    pub action: ActivityAction,
    pub resource: &'static str,
    pub resource_id: Uuid,
    pub details: String,
    pub occurred_at: DateTime<Utc>,
}

pub type EventBus = broadcast::Sender<ActivityEvent>;

pub fn init_event_bus() -> (EventBus, broadcast::Receiver<ActivityEvent>) {
    broadcast::channel(1024)
}

/// Publishes an activity entry for `entity`.
///
/// Fire and forget: a missing listener or a failed insert never fails the
/// request that produced the entry.
pub fn log_activity<T: Loggable>(
    event_bus: &EventBus,
    action: ActivityAction,
    actor_id: Uuid,
    entity: &T,
    details: impl Into<String>,
) {
    let event = ActivityEvent {
        id: Uuid::new_v4(),
        user_id: actor_id,
        action,
        resource: T::resource(),
        resource_id: entity.subject_id(),
        details: details.into(),
        occurred_at: Utc::now(),
    };

    if let Err(err) = event_bus.send(event) {
        tracing::warn!(
            resource = err.0.resource,
            action = err.0.action.as_str(),
            "activity event dropped: no listener"
        );
    }
}

pub async fn start_activity_listener(mut rx: broadcast::Receiver<ActivityEvent>, pool: SqlitePool) {
    tracing::info!("Activity listener started");
    loop {
        let event = match rx.recv().await {
            Ok(event) => event,
            Err(RecvError::Lagged(skipped)) => {
                tracing::error!(skipped, "activity listener lagged, events lost");
                continue;
            }
            Err(RecvError::Closed) => break,
        };

        if let Err(err) = persist(&pool, &event).await {
            tracing::error!(
                error = %err,
                resource = event.resource,
                resource_id = %event.resource_id,
                "Failed to save activity log"
            );
        }
    }
    tracing::info!("Activity listener stopped");
}

async fn persist(pool: &SqlitePool, event: &ActivityEvent) -> Result<(), sqlx::Error> {
    sqlx::query(
        "INSERT INTO activity_logs (id, user_id, action, resource, resource_id, details, timestamp) VALUES (?, ?, ?, ?, ?, ?, ?)",
    )
    .bind(event.id.to_string())
    .bind(event.user_id.to_string())
    .bind(event.action.as_str())
    .bind(event.resource)
    .bind(event.resource_id.to_string())
    .bind(&event.details)
    .bind(event.occurred_at)
    .execute(pool)
    .await?;

    Ok(())
}
