pub mod benchmark;
pub mod engine;
pub mod metrics;
pub mod models;


pub use benchmark::compare_to_benchmark;
pub use engine::backtest;
pub use metrics::{compute_metrics, TRADING_DAYS_PER_YEAR};
pub use models::*;
