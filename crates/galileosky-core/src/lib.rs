pub mod config;
pub mod error;

pub use config::Config;
pub use error::{Error, Result};

/// Version info
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
