use std::time::Duration;

use serde::Serialize;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_stream::wrappers::WatchStream;
use tokio_stream::StreamExt;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::models::booking::{Booking, BookingStatus};
use crate::models::user::{User, UserRole};
use crate::observability::metrics::Metrics;
use crate::store::BookingStore;

/// Whose view of the collection a poller publishes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Viewer {
    Patient(Uuid),
    Driver(Uuid),
    /// Operations console: the whole collection, nobody's assignments.
    Dispatch,
}

impl Viewer {
    pub fn from_user(user: &User) -> Self {
        match user.role {
            UserRole::Patient => Viewer::Patient(user.id),
            UserRole::Driver => Viewer::Driver(user.id),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BookingView {
    pub bookings: Vec<Booking>,
    pub active: Option<Booking>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub pending_requests: Vec<Booking>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub assigned: Vec<Booking>,
}

/// First booking in store order that is neither completed nor cancelled.
pub fn active_booking(bookings: &[Booking]) -> Option<&Booking> {
    bookings.iter().find(|b| b.status.is_active())
}

pub fn scope_view(viewer: &Viewer, all: Vec<Booking>) -> BookingView {
    match viewer {
        Viewer::Patient(user_id) => {
            let bookings: Vec<Booking> = all.into_iter().filter(|b| b.user_id == *user_id).collect();
            BookingView {
                active: active_booking(&bookings).cloned(),
                bookings,
                ..BookingView::default()
            }
        }
        Viewer::Driver(driver_id) => {
            let pending_requests = pending(&all);
            let assigned: Vec<Booking> = all
                .iter()
                .filter(|b| b.driver_id == Some(*driver_id) && b.status.is_in_service())
                .cloned()
                .collect();
            BookingView {
                active: assigned.first().cloned(),
                pending_requests,
                assigned,
                bookings: all,
            }
        }
        Viewer::Dispatch => BookingView {
            pending_requests: pending(&all),
            bookings: all,
            ..BookingView::default()
        },
    }
}

fn pending(all: &[Booking]) -> Vec<Booking> {
    all.iter()
        .filter(|b| b.status == BookingStatus::Pending)
        .cloned()
        .collect()
}

/// Re-reads the store every `interval` and republishes the viewer's scoped
/// view. Subscribers are only woken when the view changes. The task ends once
/// the poller and every subscriber are dropped.
pub struct SyncPoller {
    rx: watch::Receiver<BookingView>,
    handle: JoinHandle<()>,
}

impl SyncPoller {
    pub fn spawn(store: BookingStore, viewer: Viewer, interval: Duration) -> Self {
        let (tx, rx) = watch::channel(BookingView::default());
        let handle = tokio::spawn(run_poller(store, viewer, interval, tx));
        Self { rx, handle }
    }

    pub fn subscribe(&self) -> watch::Receiver<BookingView> {
        self.rx.clone()
    }

    pub fn stream(&self) -> WatchStream<BookingView> {
        WatchStream::new(self.rx.clone())
    }

    pub fn latest(&self) -> BookingView {
        self.rx.borrow().clone()
    }

    pub fn stop(self) {
        self.handle.abort();
    }
}

async fn run_poller(
    store: BookingStore,
    viewer: Viewer,
    interval: Duration,
    tx: watch::Sender<BookingView>,
) {
    info!(viewer = ?viewer, interval_ms = interval.as_millis() as u64, "sync poller started");

    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = tx.closed() => break,
            _ = ticker.tick() => {}
        }

        match store.list_all().await {
            Ok(all) => {
                let view = scope_view(&viewer, all);
                let changed = tx.send_if_modified(|current| {
                    if *current == view {
                        return false;
                    }
                    *current = view;
                    true
                });
                if changed {
                    debug!(viewer = ?viewer, "booking view refreshed");
                }
            }
            Err(err) => warn!(viewer = ?viewer, error = %err, "poll failed; keeping previous view"),
        }
    }

    info!(viewer = ?viewer, "sync poller stopped: no subscribers");
}

/// Keeps the `active_bookings` gauge in step with a dispatch-wide poller.
pub async fn run_dispatch_board(store: BookingStore, metrics: Metrics, interval: Duration) {
    let poller = SyncPoller::spawn(store, Viewer::Dispatch, interval);
    let mut views = poller.stream();

    while let Some(view) = views.next().await {
        let active = view.bookings.iter().filter(|b| b.status.is_active()).count();
        metrics.active_bookings.set(active as i64);
        info!(
            pending = view.pending_requests.len(),
            active,
            total = view.bookings.len(),
            "dispatch board refreshed"
        );
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use chrono::Utc;
    use tokio_stream::StreamExt;
    use uuid::Uuid;

    use super::{active_booking, run_dispatch_board, scope_view, SyncPoller, Viewer};
    use crate::engine::lifecycle::{Actor, BookingEvent};
    use crate::models::booking::fixtures::draft;
    use crate::models::booking::{Booking, BookingStatus, DriverSnapshot};
    use crate::observability::metrics::Metrics;
    use crate::store::storage::MemoryStorage;
    use crate::store::BookingStore;

    fn booking(user_id: Uuid, status: BookingStatus) -> Booking {
        let mut b = Booking::from_draft(draft(user_id), Uuid::new_v4(), Utc::now());
        b.status = status;
        b
    }

    fn spawn_store() -> BookingStore {
        let (store, actor) = BookingStore::new(Arc::new(MemoryStorage::new()), 64, Metrics::new());
        tokio::spawn(actor.run());
        store
    }

    #[test]
    fn active_booking_is_first_non_terminal_in_store_order() {
        let user = Uuid::new_v4();
        let all = vec![
            booking(user, BookingStatus::Completed),
            booking(user, BookingStatus::OnTheWay),
            booking(user, BookingStatus::Pending),
        ];

        assert_eq!(active_booking(&all).map(|b| b.id), Some(all[1].id));
        assert!(active_booking(&all[..1]).is_none());
    }

    #[test]
    fn patient_sees_only_own_bookings() {
        let me = Uuid::new_v4();
        let other = Uuid::new_v4();
        let all = vec![
            booking(other, BookingStatus::Pending),
            booking(me, BookingStatus::Cancelled),
            booking(me, BookingStatus::Accepted),
        ];

        let view = scope_view(&Viewer::Patient(me), all.clone());

        assert_eq!(view.bookings.len(), 2);
        assert!(view.bookings.iter().all(|b| b.user_id == me));
        assert_eq!(view.active.map(|b| b.id), Some(all[2].id));
        assert!(view.pending_requests.is_empty());
    }

    #[test]
    fn driver_sees_everything_plus_assignments() {
        let driver = Uuid::new_v4();
        let mut mine = booking(Uuid::new_v4(), BookingStatus::Arrived);
        mine.driver_id = Some(driver);
        let mut done = booking(Uuid::new_v4(), BookingStatus::Completed);
        done.driver_id = Some(driver);
        let open = booking(Uuid::new_v4(), BookingStatus::Pending);

        let view = scope_view(
            &Viewer::Driver(driver),
            vec![open.clone(), done, mine.clone()],
        );

        assert_eq!(view.bookings.len(), 3);
        assert_eq!(view.pending_requests, vec![open]);
        assert_eq!(view.assigned, vec![mine.clone()]);
        assert_eq!(view.active, Some(mine));
    }

    #[tokio::test]
    async fn poller_republishes_after_store_changes() {
        let store = spawn_store();
        let patient = Uuid::new_v4();
        let poller = SyncPoller::spawn(
            store.clone(),
            Viewer::Patient(patient),
            Duration::from_millis(20),
        );
        let mut views = poller.stream();

        let created = store.create(draft(patient)).await.unwrap();

        let seen = tokio::time::timeout(Duration::from_secs(2), async {
            while let Some(view) = views.next().await {
                if view.active.as_ref().map(|b| b.id) == Some(created.id) {
                    return view;
                }
            }
            panic!("poller stream ended");
        })
        .await
        .expect("view refreshed within timeout");
        assert_eq!(seen.bookings.len(), 1);

        let driver = DriverSnapshot {
            driver_id: Uuid::new_v4(),
            name: "Morgan".to_string(),
            phone: "+1-555-0142".to_string(),
            vehicle_number: None,
        };
        store
            .transition(created.id, Actor::Driver(driver.clone()), BookingEvent::Accept(driver))
            .await
            .unwrap();

        let accepted = tokio::time::timeout(Duration::from_secs(2), async {
            while let Some(view) = views.next().await {
                if let Some(active) = view.active {
                    if active.status == BookingStatus::Accepted {
                        return active;
                    }
                }
            }
            panic!("poller stream ended");
        })
        .await
        .expect("accepted status observed within timeout");
        assert_eq!(accepted.driver_name.as_deref(), Some("Morgan"));

        poller.stop();
    }

    #[tokio::test]
    async fn poller_never_shows_other_patients_bookings() {
        let store = spawn_store();
        let me = Uuid::new_v4();
        store.create(draft(Uuid::new_v4())).await.unwrap();

        let poller = SyncPoller::spawn(store.clone(), Viewer::Patient(me), Duration::from_millis(10));
        tokio::time::sleep(Duration::from_millis(60)).await;

        assert!(poller.latest().bookings.is_empty());
        assert!(poller.subscribe().borrow().active.is_none());
    }

    #[tokio::test]
    async fn dispatch_board_tracks_active_bookings() {
        let store = spawn_store();
        let metrics = Metrics::new();
        store.create(draft(Uuid::new_v4())).await.unwrap();
        store.create(draft(Uuid::new_v4())).await.unwrap();

        let board = tokio::spawn(run_dispatch_board(
            store.clone(),
            metrics.clone(),
            Duration::from_millis(10),
        ));

        let observed = tokio::time::timeout(Duration::from_secs(2), async {
            while metrics.active_bookings.get() != 2 {
                tokio::time::sleep(Duration::from_millis(10)).await;
            }
        })
        .await;
        board.abort();

        assert!(observed.is_ok());
    }
}
