//! Configuration validation and construction.
//!
//! Every numeric key is optional and falls back to its default, but a key
//! that is present must parse.

use crate::domain::backtest::BacktestConfig;
use crate::domain::error::LadderError;
use crate::domain::leveraged::LeverageParams;
use crate::domain::price_series::DATE_FORMAT;
use crate::domain::strategy::StrategyConfig;
use crate::ports::config_port::ConfigPort;
use chrono::NaiveDate;

const STRATEGY_NUMERIC_KEYS: [&str; 3] = ["initial_buy_amount", "buy_multiple", "sell_fraction"];
const LEVERAGE_NUMERIC_KEYS: [&str; 4] =
    ["initial_price", "leverage", "expense_ratio", "annual_drag"];

pub fn build_strategy_config(config: &dyn ConfigPort) -> Result<StrategyConfig, LadderError> {
    validate_numeric(config, "strategy", &STRATEGY_NUMERIC_KEYS)?;
    let defaults = StrategyConfig::default();

    let drop_levels = match config.get_string("strategy", "drop_levels") {
        Some(s) => parse_list("strategy", "drop_levels", &s)?,
        None => defaults.drop_levels,
    };
    let sell_multipliers = match config.get_string("strategy", "sell_multipliers") {
        Some(s) => parse_list("strategy", "sell_multipliers", &s)?,
        None => defaults.sell_multipliers,
    };

    let strategy = StrategyConfig {
        initial_buy_amount: config.get_double(
            "strategy",
            "initial_buy_amount",
            defaults.initial_buy_amount,
        ),
        buy_multiple: config.get_double("strategy", "buy_multiple", defaults.buy_multiple),
        sell_fraction: config.get_double("strategy", "sell_fraction", defaults.sell_fraction),
        drop_levels,
        sell_multipliers,
    };
    strategy.validate()?;
    Ok(strategy)
}

pub fn build_backtest_config(config: &dyn ConfigPort) -> Result<BacktestConfig, LadderError> {
    let start_date = parse_optional_date(config, "backtest", "start_date")?;
    let end_date = parse_optional_date(config, "backtest", "end_date")?;
    let window = BacktestConfig {
        start_date,
        end_date,
    };
    validate_window(&window)?;
    Ok(window)
}

pub fn validate_window(window: &BacktestConfig) -> Result<(), LadderError> {
    if let (Some(start), Some(end)) = (window.start_date, window.end_date) {
        if start > end {
            return Err(LadderError::invalid(
                "backtest",
                "start_date",
                "start_date must not be after end_date",
            ));
        }
    }
    Ok(())
}

pub fn build_leverage_params(config: &dyn ConfigPort) -> Result<LeverageParams, LadderError> {
    validate_numeric(config, "leverage", &LEVERAGE_NUMERIC_KEYS)?;
    let defaults = LeverageParams::default();
    let params = LeverageParams {
        initial_price: config.get_double("leverage", "initial_price", defaults.initial_price),
        leverage: config.get_double("leverage", "leverage", defaults.leverage),
        expense_ratio: config.get_double("leverage", "expense_ratio", defaults.expense_ratio),
        annual_drag: config.get_double("leverage", "annual_drag", defaults.annual_drag),
        trading_days: defaults.trading_days,
    };
    params.validate()?;
    Ok(params)
}

/// Parse a comma-separated list of numbers. Empty input is an empty list.
pub fn parse_list(section: &str, key: &str, value: &str) -> Result<Vec<f64>, LadderError> {
    value
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| {
            s.parse::<f64>().map_err(|_| {
                LadderError::invalid(section, key, format!("{s:?} is not a number"))
            })
        })
        .collect()
}

pub fn parse_date(section: &str, key: &str, value: &str) -> Result<NaiveDate, LadderError> {
    NaiveDate::parse_from_str(value.trim(), DATE_FORMAT).map_err(|_| {
        LadderError::invalid(
            section,
            key,
            format!("invalid {key} format, expected YYYY-MM-DD"),
        )
    })
}

fn parse_optional_date(
    config: &dyn ConfigPort,
    section: &str,
    key: &str,
) -> Result<Option<NaiveDate>, LadderError> {
    match config.get_string(section, key) {
        Some(s) if !s.trim().is_empty() => parse_date(section, key, &s).map(Some),
        _ => Ok(None),
    }
}

fn validate_numeric(config: &dyn ConfigPort, section: &str, keys: &[&str]) -> Result<(), LadderError> {
    for key in keys {
        if let Some(s) = config.get_string(section, key) {
            if s.trim().parse::<f64>().is_err() {
                return Err(LadderError::invalid(
                    section,
                    key,
                    format!("{} must be a number", key),
                ));
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    struct MapConfig(HashMap<(String, String), String>);

    impl MapConfig {
        fn new(entries: &[(&str, &str, &str)]) -> Self {
            MapConfig(
                entries
                    .iter()
                    .map(|(s, k, v)| ((s.to_string(), k.to_string()), v.to_string()))
                    .collect(),
            )
        }
    }

    impl ConfigPort for MapConfig {
        fn get_string(&self, section: &str, key: &str) -> Option<String> {
            self.0.get(&(section.to_string(), key.to_string())).cloned()
        }

        fn get_double(&self, section: &str, key: &str, default: f64) -> f64 {
            self.get_string(section, key)
                .and_then(|s| s.trim().parse().ok())
                .unwrap_or(default)
        }
    }

    #[test]
    fn empty_config_uses_defaults() {
        let config = MapConfig::new(&[]);
        assert_eq!(build_strategy_config(&config).unwrap(), StrategyConfig::default());
        assert_eq!(build_backtest_config(&config).unwrap(), BacktestConfig::default());
        assert_eq!(build_leverage_params(&config).unwrap(), LeverageParams::default());
    }

    #[test]
    fn strategy_values_are_read() {
        let config = MapConfig::new(&[
            ("strategy", "initial_buy_amount", "500"),
            ("strategy", "buy_multiple", "1.618"),
            ("strategy", "sell_fraction", "0.382"),
            ("strategy", "drop_levels", "0.382, 0.5,0.618"),
            ("strategy", "sell_multipliers", "1.618, 2.618"),
        ]);
        let strategy = build_strategy_config(&config).unwrap();
        assert_eq!(strategy.initial_buy_amount, 500.0);
        assert_eq!(strategy.buy_multiple, 1.618);
        assert_eq!(strategy.sell_fraction, 0.382);
        assert_eq!(strategy.drop_levels, vec![0.382, 0.5, 0.618]);
        assert_eq!(strategy.sell_multipliers, vec![1.618, 2.618]);
    }

    #[test]
    fn empty_list_is_allowed() {
        let config = MapConfig::new(&[("strategy", "sell_multipliers", "")]);
        let strategy = build_strategy_config(&config).unwrap();
        assert!(strategy.sell_multipliers.is_empty());
        assert!(!strategy.is_tradable());
    }

    #[test]
    fn non_numeric_list_entry_rejected() {
        let config = MapConfig::new(&[("strategy", "drop_levels", "0.25, half")]);
        let err = build_strategy_config(&config).unwrap_err();
        assert!(matches!(err, LadderError::ConfigInvalid { key, .. } if key == "drop_levels"));
    }

    #[test]
    fn non_numeric_scalar_rejected() {
        let config = MapConfig::new(&[("strategy", "sell_fraction", "twenty")]);
        let err = build_strategy_config(&config).unwrap_err();
        assert!(matches!(err, LadderError::ConfigInvalid { key, .. } if key == "sell_fraction"));
    }

    #[test]
    fn out_of_range_strategy_rejected() {
        let config = MapConfig::new(&[("strategy", "buy_multiple", "0.5")]);
        assert!(build_strategy_config(&config).is_err());
    }

    #[test]
    fn dates_are_parsed() {
        let config = MapConfig::new(&[
            ("backtest", "start_date", "2007-10-31"),
            ("backtest", "end_date", "2025-04-22"),
        ]);
        let window = build_backtest_config(&config).unwrap();
        assert_eq!(window.start_date, NaiveDate::from_ymd_opt(2007, 10, 31));
        assert_eq!(window.end_date, NaiveDate::from_ymd_opt(2025, 4, 22));
    }

    #[test]
    fn bad_date_rejected() {
        let config = MapConfig::new(&[("backtest", "end_date", "2025/04/22")]);
        let err = build_backtest_config(&config).unwrap_err();
        assert!(matches!(err, LadderError::ConfigInvalid { key, .. } if key == "end_date"));
    }

    #[test]
    fn reversed_window_rejected() {
        let config = MapConfig::new(&[
            ("backtest", "start_date", "2025-01-01"),
            ("backtest", "end_date", "2024-01-01"),
        ]);
        assert!(build_backtest_config(&config).is_err());
    }

    #[test]
    fn single_day_window_allowed() {
        let config = MapConfig::new(&[
            ("backtest", "start_date", "2024-01-01"),
            ("backtest", "end_date", "2024-01-01"),
        ]);
        assert!(build_backtest_config(&config).is_ok());
    }

    #[test]
    fn leverage_values_are_read() {
        let config = MapConfig::new(&[("leverage", "leverage", "2"), ("leverage", "initial_price", "40")]);
        let params = build_leverage_params(&config).unwrap();
        assert_eq!(params.leverage, 2.0);
        assert_eq!(params.initial_price, 40.0);
        assert_eq!(params.expense_ratio, 0.0095);
    }
}
