pub mod config;
pub mod error;
pub mod lanbox;
pub mod logging;

pub use error::{AppError, Result};
