//! HTTP surface: REST endpoints over the flow catalog and live sessions.

pub mod routes;
pub mod store;

pub use routes::{AppState, intake_routes};
pub use store::{SessionStore, spawn_expiry_task};
