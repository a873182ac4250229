pub mod query;
pub mod search;
pub mod slideshow;
pub mod viewmodels;

pub use query::{Condition, Query, RemoteRequest, compose, compose_category};
pub use search::{FetchState, apply_search, filter_files};
pub use slideshow::{Slideshow, SlideshowPhase, SlideshowState, Transition};
