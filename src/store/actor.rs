use std::sync::Arc;
use std::time::Instant;

use chrono::Utc;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::error::AppError;
use crate::models::booking::{Booking, BookingDraft};
use crate::observability::metrics::Metrics;
use crate::store::storage::{load_collection, save_collection, Storage, BOOKINGS_KEY};

pub(crate) type Reply<T> = oneshot::Sender<Result<T, AppError>>;
pub(crate) type Mutation = Box<dyn FnOnce(&Booking) -> Result<Booking, AppError> + Send>;

pub(crate) enum StoreCommand {
    Create {
        draft: BookingDraft,
        reply: Reply<Booking>,
    },
    Update {
        id: Uuid,
        mutation: Mutation,
        reply: Reply<Booking>,
    },
    List {
        reply: Reply<Vec<Booking>>,
    },
}

impl StoreCommand {
    fn op(&self) -> &'static str {
        match self {
            StoreCommand::Create { .. } => "create",
            StoreCommand::Update { .. } => "update",
            StoreCommand::List { .. } => "list",
        }
    }
}

/// Sole owner of the persisted booking collection. Commands are handled one at
/// a time, so every read-modify-write cycle sees the previous one's result.
pub struct StoreActor {
    storage: Arc<dyn Storage>,
    rx: mpsc::Receiver<StoreCommand>,
    metrics: Metrics,
}

impl StoreActor {
    pub(crate) fn new(
        storage: Arc<dyn Storage>,
        rx: mpsc::Receiver<StoreCommand>,
        metrics: Metrics,
    ) -> Self {
        Self {
            storage,
            rx,
            metrics,
        }
    }

    pub async fn run(mut self) {
        info!("booking store started");

        while let Some(command) = self.rx.recv().await {
            let op = command.op();
            let start = Instant::now();

            match command {
                StoreCommand::Create { draft, reply } => {
                    let result = self.create(draft).await;
                    match &result {
                        Ok(booking) => info!(
                            booking_id = %booking.id,
                            user_id = %booking.user_id,
                            emergency = booking.is_emergency,
                            "booking created"
                        ),
                        Err(err) => warn!(error = %err, "booking creation rejected"),
                    }
                    let _ = reply.send(result);
                }
                StoreCommand::Update { id, mutation, reply } => {
                    let result = self.update(id, mutation).await;
                    match &result {
                        Ok(booking) => info!(
                            booking_id = %booking.id,
                            status = %booking.status,
                            "booking updated"
                        ),
                        Err(err) => warn!(booking_id = %id, error = %err, "booking update rejected"),
                    }
                    let _ = reply.send(result);
                }
                StoreCommand::List { reply } => {
                    let result = self.load().await;
                    if let Ok(bookings) = &result {
                        debug!(count = bookings.len(), "bookings listed");
                    }
                    let _ = reply.send(result);
                }
            }

            self.metrics
                .store_op_latency_seconds
                .with_label_values(&[op])
                .observe(start.elapsed().as_secs_f64());
        }

        warn!("booking store stopped: command channel closed");
    }

    async fn load(&self) -> Result<Vec<Booking>, AppError> {
        load_collection(self.storage.as_ref(), BOOKINGS_KEY).await
    }

    async fn create(&self, draft: BookingDraft) -> Result<Booking, AppError> {
        let mut bookings = self.load().await?;

        if let Some(active) = bookings
            .iter()
            .find(|b| b.user_id == draft.user_id && b.status.is_active())
        {
            return Err(AppError::ConflictingActiveBooking {
                user_id: draft.user_id,
                booking_id: active.id,
            });
        }

        let mut id = Uuid::new_v4();
        while bookings.iter().any(|b| b.id == id) {
            id = Uuid::new_v4();
        }

        let booking = Booking::from_draft(draft, id, Utc::now());
        bookings.push(booking.clone());
        save_collection(self.storage.as_ref(), BOOKINGS_KEY, &bookings).await?;

        Ok(booking)
    }

    async fn update(&self, id: Uuid, mutation: Mutation) -> Result<Booking, AppError> {
        let mut bookings = self.load().await?;

        let slot = bookings
            .iter_mut()
            .find(|b| b.id == id)
            .ok_or_else(|| AppError::NotFound(format!("booking {id} not found")))?;

        let updated = mutation(&*slot)?;
        check_immutable_fields(slot, &updated)?;
        *slot = updated.clone();

        save_collection(self.storage.as_ref(), BOOKINGS_KEY, &bookings).await?;
        Ok(updated)
    }
}

fn check_immutable_fields(before: &Booking, after: &Booking) -> Result<(), AppError> {
    let driver_rebound = before.driver_id.is_some() && before.driver_id != after.driver_id;

    if before.id != after.id
        || before.user_id != after.user_id
        || before.booking_time != after.booking_time
        || before.is_emergency != after.is_emergency
        || driver_rebound
    {
        return Err(AppError::Internal(format!(
            "mutation of booking {} touched an immutable field",
            before.id
        )));
    }

    Ok(())
}
