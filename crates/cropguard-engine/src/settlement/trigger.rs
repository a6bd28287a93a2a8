//! Trigger evaluation
//!
//! Pure function from (coverage, reading, thresholds) to a payout decision.
//! Rules are checked in a fixed order and the first match wins; triggers
//! never stack even when several conditions hold.
//!
//! 1. drought:  rainfall_30d <  drought_rainfall_30d
//! 2. flood:    rainfall_24h >  flood_rainfall_24h
//! 3. heatwave: temperature  >  heatwave_temperature
//! 4. none

use cropguard_common::{TriggerType, WeatherReading, BPS_DENOMINATOR};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::config::TriggerThresholds;
use crate::pricing::apply_bps;

/// Result of evaluating one reading against one policy's coverage
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SettlementOutcome {
    pub trigger: TriggerType,
    /// Payout fraction in basis points (10000 = full coverage)
    pub payout_bps: u32,
    /// floor(coverage × payout_bps / 10000)
    pub payout_amount: Decimal,
}

impl SettlementOutcome {
    fn none() -> Self {
        Self {
            trigger: TriggerType::None,
            payout_bps: 0,
            payout_amount: Decimal::ZERO,
        }
    }

    /// A zero fraction means "no trigger" regardless of which rule matched
    pub fn is_triggered(&self) -> bool {
        self.payout_bps > 0
    }

    /// Payout fraction as a decimal (1.0 = full coverage)
    pub fn payout_fraction(&self) -> Decimal {
        Decimal::from(self.payout_bps) / Decimal::from(BPS_DENOMINATOR)
    }
}

/// Evaluate `reading` for a policy with the given coverage
pub fn evaluate(
    coverage: Decimal,
    reading: &WeatherReading,
    thresholds: &TriggerThresholds,
) -> SettlementOutcome {
    let (trigger, payout_bps) = if reading.rainfall_30d < thresholds.drought_rainfall_30d {
        (TriggerType::Drought, thresholds.drought_payout_bps)
    } else if reading.rainfall_24h > thresholds.flood_rainfall_24h {
        (TriggerType::Flood, thresholds.flood_payout_bps)
    } else if reading.temperature > thresholds.heatwave_temperature {
        (TriggerType::Heatwave, thresholds.heatwave_payout_bps)
    } else {
        return SettlementOutcome::none();
    };

    SettlementOutcome {
        trigger,
        payout_bps,
        payout_amount: apply_bps(coverage, payout_bps),
    }
}

/// Evaluator bound to one threshold set
#[derive(Debug, Clone)]
pub struct TriggerEvaluator {
    thresholds: TriggerThresholds,
}

impl TriggerEvaluator {
    pub fn new(thresholds: TriggerThresholds) -> Self {
        Self { thresholds }
    }

    pub fn thresholds(&self) -> &TriggerThresholds {
        &self.thresholds
    }

    pub fn evaluate(&self, coverage: Decimal, reading: &WeatherReading) -> SettlementOutcome {
        evaluate(coverage, reading, &self.thresholds)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use rust_decimal_macros::dec;

    fn evaluator() -> TriggerEvaluator {
        TriggerEvaluator::new(TriggerThresholds {
            drought_rainfall_30d: 50,
            flood_rainfall_24h: 100,
            heatwave_temperature: 38,
            drought_payout_bps: 10_000,
            flood_payout_bps: 10_000,
            heatwave_payout_bps: 7_500,
        })
    }

    #[test]
    fn test_drought_wins_when_all_conditions_hold() {
        let outcome = evaluator().evaluate(dec!(1000), &WeatherReading::new(3, 150, 60));
        assert_eq!(outcome.trigger, TriggerType::Drought);
        assert_eq!(outcome.payout_fraction(), dec!(1));
        assert_eq!(outcome.payout_amount, dec!(1000));
    }

    #[test]
    fn test_flood_beats_heatwave() {
        let outcome = evaluator().evaluate(dec!(1000), &WeatherReading::new(300, 150, 60));
        assert_eq!(outcome.trigger, TriggerType::Flood);
        assert_eq!(outcome.payout_amount, dec!(1000));
    }

    #[test]
    fn test_heatwave_pays_three_quarters() {
        let outcome = evaluator().evaluate(dec!(999), &WeatherReading::new(300, 20, 39));
        assert_eq!(outcome.trigger, TriggerType::Heatwave);
        assert_eq!(outcome.payout_fraction(), dec!(0.75));
        assert_eq!(outcome.payout_amount, dec!(749));
    }

    #[test]
    fn test_thresholds_are_strict() {
        // Exactly at each threshold: nothing fires
        let outcome = evaluator().evaluate(dec!(1000), &WeatherReading::new(50, 100, 38));
        assert_eq!(outcome.trigger, TriggerType::None);
        assert!(!outcome.is_triggered());
        assert_eq!(outcome.payout_amount, dec!(0));
    }

    #[test]
    fn test_zero_fraction_is_not_a_trigger() {
        let mut thresholds = evaluator().thresholds().clone();
        thresholds.heatwave_payout_bps = 0;
        let outcome = evaluate(dec!(1000), &WeatherReading::new(300, 20, 45), &thresholds);
        assert_eq!(outcome.trigger, TriggerType::Heatwave);
        assert!(!outcome.is_triggered());
    }

    proptest! {
        #[test]
        fn prop_priority_order(r30 in 0u32..400, r24 in 0u32..400, temp in -50i32..80) {
            let outcome = evaluator().evaluate(dec!(1000), &WeatherReading::new(r30, r24, temp));
            let expected = if r30 < 50 {
                TriggerType::Drought
            } else if r24 > 100 {
                TriggerType::Flood
            } else if temp > 38 {
                TriggerType::Heatwave
            } else {
                TriggerType::None
            };
            prop_assert_eq!(outcome.trigger, expected);
            prop_assert!(outcome.payout_amount <= dec!(1000));
        }
    }
}
