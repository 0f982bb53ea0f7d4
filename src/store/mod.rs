pub mod actor;
pub mod storage;

use std::sync::Arc;

use tokio::sync::{mpsc, oneshot};
use uuid::Uuid;

use crate::engine::lifecycle::{self, Actor, BookingEvent};
use crate::error::AppError;
use crate::models::booking::{Booking, BookingDraft, BookingStatus};
use crate::observability::metrics::Metrics;
use crate::store::actor::{Reply, StoreActor, StoreCommand};
use crate::store::storage::Storage;

/// Cloneable handle to the booking collection. Every call is a request to the
/// [`StoreActor`], which must be spawned for calls to complete.
#[derive(Clone)]
pub struct BookingStore {
    tx: mpsc::Sender<StoreCommand>,
    metrics: Metrics,
}

impl BookingStore {
    pub fn new(storage: Arc<dyn Storage>, queue_size: usize, metrics: Metrics) -> (Self, StoreActor) {
        let (tx, rx) = mpsc::channel(queue_size);
        let actor = StoreActor::new(storage, rx, metrics.clone());
        (Self { tx, metrics }, actor)
    }

    pub async fn create(&self, draft: BookingDraft) -> Result<Booking, AppError> {
        draft.validate()?;

        let kind = if draft.is_emergency { "emergency" } else { "standard" };
        let booking = self
            .request(|reply| StoreCommand::Create { draft, reply })
            .await?;

        self.metrics
            .bookings_created_total
            .with_label_values(&[kind])
            .inc();
        Ok(booking)
    }

    /// Applies `mutation` to the latest stored copy of booking `id`. A failing
    /// mutation leaves the record untouched.
    pub async fn update<F>(&self, id: Uuid, mutation: F) -> Result<Booking, AppError>
    where
        F: FnOnce(&Booking) -> Result<Booking, AppError> + Send + 'static,
    {
        self.request(|reply| StoreCommand::Update {
            id,
            mutation: Box::new(mutation),
            reply,
        })
        .await
    }

    pub async fn transition(
        &self,
        id: Uuid,
        actor: Actor,
        event: BookingEvent,
    ) -> Result<Booking, AppError> {
        let result = self
            .update(id, move |booking| {
                lifecycle::authorize(&actor, booking, &event)?;
                lifecycle::apply(booking, event)
            })
            .await;
        self.record_transition(&result);
        result
    }

    /// Moves booking `id` to `target`, picking the event from the stored status.
    pub async fn transition_to(
        &self,
        id: Uuid,
        actor: Actor,
        target: BookingStatus,
    ) -> Result<Booking, AppError> {
        let result = self
            .update(id, move |booking| {
                let event = lifecycle::event_for_target(&actor, booking.status, target)?;
                lifecycle::authorize(&actor, booking, &event)?;
                lifecycle::apply(booking, event)
            })
            .await;
        self.record_transition(&result);
        result
    }

    pub async fn get(&self, id: Uuid) -> Result<Booking, AppError> {
        self.list_all()
            .await?
            .into_iter()
            .find(|b| b.id == id)
            .ok_or_else(|| AppError::NotFound(format!("booking {id} not found")))
    }

    /// Every booking in insertion order.
    pub async fn list_all(&self) -> Result<Vec<Booking>, AppError> {
        self.request(|reply| StoreCommand::List { reply }).await
    }

    pub async fn list_for_user(&self, user_id: Uuid) -> Result<Vec<Booking>, AppError> {
        let mut bookings = self.list_all().await?;
        bookings.retain(|b| b.user_id == user_id);
        Ok(bookings)
    }

    async fn request<T>(
        &self,
        command: impl FnOnce(Reply<T>) -> StoreCommand,
    ) -> Result<T, AppError> {
        let (reply, rx) = oneshot::channel();
        self.tx
            .send(command(reply))
            .await
            .map_err(|_| AppError::Internal("booking store is not running".to_string()))?;

        rx.await
            .map_err(|_| AppError::Internal("booking store dropped the request".to_string()))?
    }

    fn record_transition(&self, result: &Result<Booking, AppError>) {
        let outcome = match result {
            Ok(_) => "success",
            Err(err) => err.code(),
        };
        self.metrics
            .booking_transitions_total
            .with_label_values(&[outcome])
            .inc();
    }
}
