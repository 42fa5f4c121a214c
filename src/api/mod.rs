pub mod beacon;
pub mod dashboard;
pub mod domains;
pub mod errors;
pub mod script;

use crate::store::Store;
use std::sync::atomic::AtomicU64;

/// Shared application state, constructed once in `main` and injected into
/// every handler through the router.
pub struct AppState {
    pub store: Store,
    /// Secret folded into the daily fingerprint salt.
    pub secret: String,
    /// Shared admin key; when presented, detail views include raw client
    /// addresses. `None` disables the capability entirely.
    pub admin_key: Option<String>,
    pub beacons_accepted: AtomicU64,
    pub beacons_rejected: AtomicU64,
}

impl AppState {
    pub fn new(store: Store, secret: String, admin_key: Option<String>) -> Self {
        Self {
            store,
            secret,
            admin_key,
            beacons_accepted: AtomicU64::new(0),
            beacons_rejected: AtomicU64::new(0),
        }
    }
}
