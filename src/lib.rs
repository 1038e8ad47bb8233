pub mod capture;
pub mod config;
pub mod correlate;
pub mod error;
pub mod har;
pub mod metadata;
pub mod output;
pub mod pipeline;
pub mod reassembly;

pub use error::{Error, Result};

/// Extension of rebuilt audio files (the streams are AAC in MP4)
pub const DEFAULT_EXTENSION: &str = "m4a";

/// Application name for XDG paths
pub const APP_NAME: &str = "harmux";
