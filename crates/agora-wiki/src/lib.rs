pub mod markdown;
pub mod search;
pub mod store;

pub use search::{Candidate, SearchOutcome, search};
pub use store::{EntryStore, StoreError};
