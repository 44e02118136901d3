pub mod config;
pub mod event;
pub mod monitoring;
pub mod shutdown;
pub mod utils;

pub use utils::AppError;
