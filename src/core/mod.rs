pub mod config;
pub mod config_loader;
pub mod error;
pub mod report;
pub mod traits;

pub use config::*;
pub use config_loader::{ConfigLoadOptions, ConfigLoader, ConfigValidationResult};
pub use error::*;
pub use report::*;
pub use traits::*;
