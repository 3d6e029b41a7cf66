//! Public types for the Hamstr API.

mod progress;
mod record;

pub use progress::{CollectionOutcome, CollectionState, Progress, RunStatus};
pub use record::Record;

pub(crate) use record::RawItem;
