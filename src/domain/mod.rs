//! Core domain types and logic.

pub mod price_series;
pub mod strategy;
pub mod engine;
pub mod execution;
pub mod portfolio;
pub mod backtest;
pub mod metrics;
pub mod leveraged;
pub mod config_validation;
pub mod error;
