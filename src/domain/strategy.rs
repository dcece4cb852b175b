//! Staged buy/sell ladder parameters.

use super::error::LadderError;

/// Parameters of the staged dollar-cost-averaging ladder.
#[derive(Debug, Clone, PartialEq)]
pub struct StrategyConfig {
    /// Dollar size of the first buy in a cycle.
    pub initial_buy_amount: f64,
    /// Growth factor applied to the buy size at each successive drop level.
    pub buy_multiple: f64,
    /// Fraction of current holdings sold at each sell target.
    pub sell_fraction: f64,
    /// Drawdowns from the cycle peak that trigger successive buys.
    pub drop_levels: Vec<f64>,
    /// Multiples of the anchor price that trigger successive sells.
    pub sell_multipliers: Vec<f64>,
}

/// One rung of the sell ladder, resolved against an anchor price.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SellTarget {
    pub multiplier: f64,
    pub price: f64,
}

impl Default for StrategyConfig {
    fn default() -> Self {
        StrategyConfig {
            initial_buy_amount: 10_000.0,
            buy_multiple: 2.0,
            sell_fraction: 0.2,
            drop_levels: vec![
                0.25, 0.5, 0.75, 0.875, 0.9375, 0.96875, 0.984375, 0.9921875,
            ],
            sell_multipliers: vec![2.0, 4.0, 8.0, 16.0, 32.0, 64.0, 128.0, 256.0],
        }
    }
}

impl StrategyConfig {
    /// Dollar amount of the buy at ladder `level` (0 = cycle entry).
    pub fn buy_amount(&self, level: usize) -> f64 {
        self.initial_buy_amount * self.buy_multiple.powi(level as i32)
    }

    /// Sell target for ladder index `index`, if the ladder has one.
    pub fn sell_target(&self, anchor: f64, index: usize) -> Option<SellTarget> {
        self.sell_multipliers.get(index).map(|&multiplier| SellTarget {
            multiplier,
            price: anchor * multiplier,
        })
    }

    /// An empty ladder on either side makes the run a no-trade run.
    pub fn is_tradable(&self) -> bool {
        !self.drop_levels.is_empty() && !self.sell_multipliers.is_empty()
    }

    pub fn validate(&self) -> Result<(), LadderError> {
        if !(self.initial_buy_amount.is_finite() && self.initial_buy_amount > 0.0) {
            return Err(LadderError::invalid(
                "strategy",
                "initial_buy_amount",
                "initial_buy_amount must be positive",
            ));
        }
        if !(self.buy_multiple.is_finite() && self.buy_multiple > 1.0) {
            return Err(LadderError::invalid(
                "strategy",
                "buy_multiple",
                "buy_multiple must be greater than 1",
            ));
        }
        if !(self.sell_fraction > 0.0 && self.sell_fraction < 1.0) {
            return Err(LadderError::invalid(
                "strategy",
                "sell_fraction",
                "sell_fraction must be between 0 and 1 (exclusive)",
            ));
        }
        if self.drop_levels.iter().any(|&d| !(d > 0.0 && d < 1.0)) {
            return Err(LadderError::invalid(
                "strategy",
                "drop_levels",
                "each drop level must be between 0 and 1 (exclusive)",
            ));
        }
        if !strictly_increasing(&self.drop_levels) {
            return Err(LadderError::invalid(
                "strategy",
                "drop_levels",
                "drop levels must be strictly increasing",
            ));
        }
        if self
            .sell_multipliers
            .iter()
            .any(|&m| !(m.is_finite() && m > 1.0))
        {
            return Err(LadderError::invalid(
                "strategy",
                "sell_multipliers",
                "each sell multiplier must be greater than 1",
            ));
        }
        if !strictly_increasing(&self.sell_multipliers) {
            return Err(LadderError::invalid(
                "strategy",
                "sell_multipliers",
                "sell multipliers must be strictly increasing",
            ));
        }
        Ok(())
    }
}

fn strictly_increasing(values: &[f64]) -> bool {
    values.windows(2).all(|w| w[0] < w[1])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_is_valid() {
        assert!(StrategyConfig::default().validate().is_ok());
    }

    #[test]
    fn buy_amount_grows_geometrically() {
        let config = StrategyConfig {
            initial_buy_amount: 1000.0,
            buy_multiple: 1.5,
            ..StrategyConfig::default()
        };
        assert!((config.buy_amount(0) - 1000.0).abs() < 1e-9);
        assert!((config.buy_amount(1) - 1500.0).abs() < 1e-9);
        assert!((config.buy_amount(3) - 3375.0).abs() < 1e-9);
    }

    #[test]
    fn sell_target_past_ladder_end() {
        let config = StrategyConfig {
            sell_multipliers: vec![2.0, 4.0],
            ..StrategyConfig::default()
        };
        assert_eq!(
            config.sell_target(50.0, 1),
            Some(SellTarget {
                multiplier: 4.0,
                price: 200.0
            })
        );
        assert_eq!(config.sell_target(50.0, 2), None);
    }

    #[test]
    fn empty_ladders_are_valid_but_not_tradable() {
        let config = StrategyConfig {
            drop_levels: vec![],
            ..StrategyConfig::default()
        };
        assert!(config.validate().is_ok());
        assert!(!config.is_tradable());

        let config = StrategyConfig {
            sell_multipliers: vec![],
            ..StrategyConfig::default()
        };
        assert!(!config.is_tradable());
    }

    #[test]
    fn rejects_non_increasing_drop_levels() {
        let config = StrategyConfig {
            drop_levels: vec![0.25, 0.25, 0.5],
            ..StrategyConfig::default()
        };
        let err = config.validate().unwrap_err();
        assert!(matches!(err, LadderError::ConfigInvalid { key, .. } if key == "drop_levels"));
    }

    #[test]
    fn rejects_drop_level_out_of_range() {
        let config = StrategyConfig {
            drop_levels: vec![0.5, 1.0],
            ..StrategyConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn rejects_sell_multiplier_at_one() {
        let config = StrategyConfig {
            sell_multipliers: vec![1.0, 2.0],
            ..StrategyConfig::default()
        };
        let err = config.validate().unwrap_err();
        assert!(matches!(err, LadderError::ConfigInvalid { key, .. } if key == "sell_multipliers"));
    }

    #[test]
    fn rejects_bad_scalars() {
        let bad = [
            StrategyConfig {
                initial_buy_amount: 0.0,
                ..StrategyConfig::default()
            },
            StrategyConfig {
                buy_multiple: 1.0,
                ..StrategyConfig::default()
            },
            StrategyConfig {
                sell_fraction: 1.0,
                ..StrategyConfig::default()
            },
            StrategyConfig {
                sell_fraction: 0.0,
                ..StrategyConfig::default()
            },
        ];
        for config in bad {
            assert!(config.validate().is_err());
        }
    }
}
