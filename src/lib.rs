//! Three-lane work-item board: lane classification, drag reordering and
//! sequential store sync with rollback.

pub mod app;
pub mod board;
pub mod config;
pub mod input;
pub mod store;
