// crates/server/src/lib.rs
//! Genview server: watches generation jobs and delivers artifacts live.

pub mod error;
pub mod launcher;
pub mod routes;
pub mod state;
pub mod watch;

pub use routes::api_routes;
pub use state::AppState;
