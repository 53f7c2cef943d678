//! Pipeline entry points for the supporter cache.
//!
//! - `run_bulk_load`: Rebuild the store from the full remote listing
//! - `QueryView`: Sorted read snapshots
//! - `calculate_diff`: Changes between two snapshots
//! - `SupporterService`: The shared handle tying them together

pub mod diff;
pub mod load;
pub mod query;
pub mod service;

pub use diff::{SupporterDiff, calculate_diff};
pub use load::{LoadReport, run_bulk_load};
pub use query::{QueryView, Snapshot, SortKey, sort_supporters};
pub use service::SupporterService;
