mod client;
mod errors;

pub use client::FileServerClient;
pub use errors::ApiError;
