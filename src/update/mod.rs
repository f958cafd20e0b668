pub mod asset;
pub mod download;
pub mod error;
pub mod http;
pub mod launcher;
pub mod release;
pub mod service;
pub mod traits;

pub use error::UpdateError;
pub use http::HttpClient;
pub use service::UpdateLauncher;
pub use traits::AppRunner;
