//! Per-symbol series storage.

pub mod store;

pub use store::{SeriesSpec, SeriesStore};
