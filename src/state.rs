use std::sync::Arc;

use crate::fleet::FleetRegistry;
use crate::notify::Notifier;
use crate::observability::metrics::Metrics;
use crate::store::actor::StoreActor;
use crate::store::storage::Storage;
use crate::store::BookingStore;
use crate::users::UserDirectory;

pub struct AppState {
    pub bookings: BookingStore,
    pub users: UserDirectory,
    pub fleet: FleetRegistry,
    pub notifier: Arc<dyn Notifier>,
    pub metrics: Metrics,
    pub sos_search_limit: usize,
}

impl AppState {
    /// The returned actor owns the booking collection and must be spawned.
    pub fn new(
        storage: Arc<dyn Storage>,
        notifier: Arc<dyn Notifier>,
        store_queue_size: usize,
        sos_search_limit: usize,
    ) -> (Self, StoreActor) {
        let metrics = Metrics::new();
        let (bookings, store_actor) =
            BookingStore::new(storage.clone(), store_queue_size, metrics.clone());

        (
            Self {
                bookings,
                users: UserDirectory::new(storage),
                fleet: FleetRegistry::new(),
                notifier,
                metrics,
                sos_search_limit,
            },
            store_actor,
        )
    }
}
