pub mod chart;
pub mod comparison;
pub mod config;
pub mod error;
pub mod export;
pub mod importer;
pub mod loader;
pub mod logging;
pub mod output;
pub mod session;
pub mod store;
pub mod types;
pub mod util;

pub use error::{AppError, Result};
