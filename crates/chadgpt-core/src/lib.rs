pub mod config;
pub mod error;
pub mod types;

pub use config::ChadConfig;
pub use error::{ChadError, Result};
pub use types::Role;
