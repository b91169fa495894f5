pub mod config;
pub mod error;
pub mod instrument;
pub mod traits;
pub mod types;

pub use config::ConfigError;
pub use error::*;
pub use instrument::*;
pub use traits::*;
pub use types::*;

/// Number of future days every forecast extends past the last observed date.
pub const HORIZON_DAYS: u32 = 365;
