pub mod catalog;
pub mod config;
pub mod error;
pub mod types;

pub use catalog::ResponseCatalog;
pub use config::HuddleConfig;
pub use error::{HuddleError, Result};
pub use types::*;
