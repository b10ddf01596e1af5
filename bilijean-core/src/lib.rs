pub mod config;
pub mod logging;
pub mod streaming;

pub use config::Config;
pub use streaming::{StreamingError, StreamingService};
