pub mod file_server;
pub mod traits;

pub use file_server::{ApiError, FileServerClient};
pub use traits::FileServer;
