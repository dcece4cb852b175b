//! Per-day ladder state machine.
//!
//! The engine is FLAT until the close falls `drop_levels[0]` below the cycle
//! peak, IN_CYCLE from that entry buy until the close recovers to the cycle
//! peak, then FLAT again. Sells are gated by `has_recovered`, which outlives
//! the cycle and is only cleared by the next entry buy.

use chrono::NaiveDate;

use super::execution::{execute_buy, execute_sell, BuyFill, SellFill, Transaction};
use super::price_series::DailyRecord;
use super::strategy::StrategyConfig;

/// Mutable state of one simulation run.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct EngineState {
    /// Highest close seen so far.
    pub global_peak_price: f64,
    /// Peak the current cycle's drop levels are measured from.
    pub cycle_peak_price: f64,
    pub in_cycle: bool,
    pub has_recovered: bool,
    /// Buys executed in the current cycle; also the next ladder level.
    pub current_drop_level: usize,
    /// Sells executed since the anchor was set.
    pub next_sell_index: usize,
    /// Price of the current cycle's first buy.
    pub anchored_sell_price: Option<f64>,
    pub holding_shares: f64,
    pub cumulative_invested: f64,
    pub cumulative_sold: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Flat,
    InCycle,
}

impl EngineState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn phase(&self) -> Phase {
        if self.in_cycle {
            Phase::InCycle
        } else {
            Phase::Flat
        }
    }
}

/// Something that happened while advancing one day.
#[derive(Debug, Clone, PartialEq)]
pub enum DayEvent {
    Buy {
        fill: BuyFill,
        cycle_peak: f64,
        drop_from_peak: f64,
    },
    Sell(SellFill),
    Recovered {
        date: NaiveDate,
        price: f64,
    },
}

impl DayEvent {
    pub fn transaction(&self) -> Option<&Transaction> {
        match self {
            DayEvent::Buy { fill, .. } => Some(&fill.transaction),
            DayEvent::Sell(fill) => Some(&fill.transaction),
            DayEvent::Recovered { .. } => None,
        }
    }
}

/// Apply one trading day to `state`.
///
/// Order: peak update, entry check, staged buy check, sell loop, recovery
/// check. The staged check also runs on the entry day, so a single close
/// that gaps through the first two drop levels buys twice. Sells never run
/// on a day with a buy.
pub fn advance_one_day(
    state: EngineState,
    record: &DailyRecord,
    config: &StrategyConfig,
) -> (EngineState, Vec<DayEvent>) {
    let mut next = state;
    let mut events = Vec::new();
    let close = record.close;
    let date = record.date;

    if close > next.global_peak_price {
        next.global_peak_price = close;
        if !next.in_cycle {
            next.cycle_peak_price = next.global_peak_price;
        }
    }

    if !config.is_tradable() {
        return (next, events);
    }

    let mut bought_today = false;

    if !next.in_cycle && close <= next.cycle_peak_price * (1.0 - config.drop_levels[0]) {
        events.push(buy(&mut next, close, date, config));
        next.in_cycle = true;
        next.has_recovered = false;
        bought_today = true;
    }

    if next.in_cycle {
        if let Some(&level) = config.drop_levels.get(next.current_drop_level) {
            let drop_from_peak = (next.cycle_peak_price - close) / next.cycle_peak_price;
            if drop_from_peak >= level {
                events.push(buy(&mut next, close, date, config));
                bought_today = true;
            }
        }
    }

    if next.has_recovered && next.holding_shares > 0.0 && !bought_today {
        if let Some(anchor) = next.anchored_sell_price {
            while let Some(target) = config.sell_target(anchor, next.next_sell_index) {
                if close < target.price {
                    break;
                }
                events.push(DayEvent::Sell(execute_sell(
                    &mut next,
                    close,
                    date,
                    anchor,
                    target.multiplier,
                    config,
                )));
            }
        }
    }

    if next.in_cycle && close >= next.cycle_peak_price {
        next.in_cycle = false;
        next.has_recovered = true;
        next.current_drop_level = 0;
        next.cycle_peak_price = next.global_peak_price;
        events.push(DayEvent::Recovered { date, price: close });
    }

    (next, events)
}

fn buy(state: &mut EngineState, price: f64, date: NaiveDate, config: &StrategyConfig) -> DayEvent {
    let cycle_peak = state.cycle_peak_price;
    let drop_from_peak = (cycle_peak - price) / cycle_peak;
    DayEvent::Buy {
        fill: execute_buy(state, price, date, config),
        cycle_peak,
        drop_from_peak,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(day: u32, close: f64) -> DailyRecord {
        DailyRecord::new(NaiveDate::from_ymd_opt(2024, 1, day).unwrap(), close)
    }

    fn config() -> StrategyConfig {
        StrategyConfig {
            initial_buy_amount: 1000.0,
            buy_multiple: 2.0,
            sell_fraction: 0.5,
            drop_levels: vec![0.1, 0.5],
            sell_multipliers: vec![2.0, 4.0],
        }
    }

    fn step(state: EngineState, day: u32, close: f64) -> (EngineState, Vec<DayEvent>) {
        advance_one_day(state, &record(day, close), &config())
    }

    #[test]
    fn first_day_sets_both_peaks() {
        let (state, events) = step(EngineState::new(), 1, 100.0);
        assert!(events.is_empty());
        assert_eq!(state.global_peak_price, 100.0);
        assert_eq!(state.cycle_peak_price, 100.0);
        assert_eq!(state.phase(), Phase::Flat);
    }

    #[test]
    fn entry_buy_on_first_drop_level() {
        let (state, _) = step(EngineState::new(), 1, 100.0);
        let (state, events) = step(state, 2, 90.0);

        assert_eq!(events.len(), 1);
        assert!(matches!(&events[0], DayEvent::Buy { fill, .. } if fill.level == 0));
        assert_eq!(state.phase(), Phase::InCycle);
        assert!(!state.has_recovered);
        assert_eq!(state.anchored_sell_price, Some(90.0));
        assert_eq!(state.current_drop_level, 1);
    }

    #[test]
    fn no_entry_just_above_threshold() {
        let (state, _) = step(EngineState::new(), 1, 100.0);
        let (state, events) = step(state, 2, 90.01);
        assert!(events.is_empty());
        assert_eq!(state.phase(), Phase::Flat);
    }

    #[test]
    fn gap_through_two_levels_buys_twice() {
        let (state, _) = step(EngineState::new(), 1, 100.0);
        let (state, events) = step(state, 2, 40.0);

        let levels: Vec<usize> = events
            .iter()
            .filter_map(|e| match e {
                DayEvent::Buy { fill, .. } => Some(fill.level),
                _ => None,
            })
            .collect();
        assert_eq!(levels, vec![0, 1]);
        assert_eq!(state.cumulative_invested, 3000.0);
    }

    #[test]
    fn cycle_peak_frozen_while_in_cycle() {
        let (state, _) = step(EngineState::new(), 1, 100.0);
        let (state, _) = step(state, 2, 85.0);
        let (state, _) = step(state, 3, 95.0);
        assert_eq!(state.cycle_peak_price, 100.0);
        assert_eq!(state.phase(), Phase::InCycle);
    }

    #[test]
    fn recovery_resets_buy_ladder_only() {
        let (state, _) = step(EngineState::new(), 1, 100.0);
        let (state, _) = step(state, 2, 85.0);
        let (state, events) = step(state, 3, 105.0);

        assert!(matches!(events.last(), Some(DayEvent::Recovered { price, .. }) if *price == 105.0));
        assert_eq!(state.phase(), Phase::Flat);
        assert!(state.has_recovered);
        assert_eq!(state.current_drop_level, 0);
        assert_eq!(state.cycle_peak_price, 105.0);
        assert_eq!(state.anchored_sell_price, Some(85.0));
        assert!(state.holding_shares > 0.0);
    }

    #[test]
    fn no_sell_before_recovery() {
        let config = StrategyConfig {
            drop_levels: vec![0.1],
            sell_multipliers: vec![1.1],
            ..config()
        };
        let (state, _) = advance_one_day(EngineState::new(), &record(1, 100.0), &config);
        let (state, _) = advance_one_day(state, &record(2, 80.0), &config);
        // target is 88, but the close is still under the cycle peak
        let (state, events) = advance_one_day(state, &record(3, 95.0), &config);
        assert!(events.is_empty());
        assert_eq!(state.next_sell_index, 0);
    }

    #[test]
    fn sells_after_recovery_then_stop_at_ladder_end() {
        let (state, _) = step(EngineState::new(), 1, 100.0);
        let (state, _) = step(state, 2, 50.0);
        let (state, _) = step(state, 3, 100.0);
        assert!(state.has_recovered);
        let before = state.holding_shares;

        let (state, events) = step(state, 4, 250.0);
        assert_eq!(events.len(), 2);
        let reached: Vec<(f64, f64)> = events
            .iter()
            .filter_map(|e| match e {
                DayEvent::Sell(fill) => Some((fill.anchor, fill.multiplier)),
                _ => None,
            })
            .collect();
        assert_eq!(reached, vec![(50.0, 2.0), (50.0, 4.0)]);
        assert!((state.holding_shares - before * 0.25).abs() < 1e-12);
        assert_eq!(state.next_sell_index, 2);

        let (state, events) = step(state, 5, 1000.0);
        assert!(events.is_empty());
        assert_eq!(state.next_sell_index, 2);
    }

    #[test]
    fn new_entry_clears_recovered_flag_and_reanchors() {
        let (state, _) = step(EngineState::new(), 1, 100.0);
        let (state, _) = step(state, 2, 85.0);
        let (state, _) = step(state, 3, 120.0);
        let (state, _) = step(state, 4, 250.0);
        assert_eq!(state.next_sell_index, 1);

        let (state, events) = step(state, 5, 200.0);
        assert!(matches!(&events[0], DayEvent::Buy { fill, .. } if fill.level == 0));
        assert!(!state.has_recovered);
        assert_eq!(state.anchored_sell_price, Some(200.0));
        assert_eq!(state.next_sell_index, 0);
    }

    #[test]
    fn empty_ladder_never_trades() {
        let config = StrategyConfig {
            sell_multipliers: vec![],
            ..config()
        };
        let (state, _) = advance_one_day(EngineState::new(), &record(1, 100.0), &config);
        let (state, events) = advance_one_day(state, &record(2, 10.0), &config);
        assert!(events.is_empty());
        assert_eq!(state.holding_shares, 0.0);
        assert_eq!(state.global_peak_price, 100.0);
    }

    #[test]
    fn event_transaction_accessor() {
        let (state, _) = step(EngineState::new(), 1, 100.0);
        let (_, events) = step(state, 2, 80.0);
        let t = events[0].transaction().unwrap();
        assert_eq!(t.price, 80.0);
        assert!(DayEvent::Recovered {
            date: record(1, 1.0).date,
            price: 1.0
        }
        .transaction()
        .is_none());
    }
}
