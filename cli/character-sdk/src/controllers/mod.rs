//! Controllers turn user intents into repository requests
//! and publish the resulting view state.
//!
//! Both controllers are driven from synchronous methods that spawn their
//! work onto the current tokio runtime, and expose their state through a
//! [tokio::sync::watch] channel. Only the most recently started fetch of a
//! controller may commit its result.

pub mod detail;
pub mod list;

pub use detail::{DetailController, DetailViewState};
pub use list::{DEFAULT_DEBOUNCE, ListController, ListSnapshot, ListViewState};
