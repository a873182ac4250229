mod filter_store;

pub use filter_store::{FilterSelection, FilterStore};
