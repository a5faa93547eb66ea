//! Payer claim adjustment strategies
//!
//! An adjustment is a negotiated discount removed from the billed cost of a
//! claim line. It is paid by nobody. Each payer carries one strategy.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::warn;

use core_kernel::{Money, Rate, SimRng};

/// How a payer reduces the billed cost of a claim line
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(tag = "behavior", rename_all = "snake_case")]
pub enum AdjustmentStrategy {
    /// Never adjusts
    #[default]
    None,
    /// Always adjusts by a fixed share of the cost
    Fixed { rate: Rate },
    /// Adjusts half of the time, by a uniform share in `[0, max_rate]`
    Random { max_rate: Rate },
}

impl AdjustmentStrategy {
    /// Fixed-rate strategy; the rate is clamped to [0, 1]
    pub fn fixed(rate: Decimal) -> Self {
        AdjustmentStrategy::Fixed {
            rate: Rate::clamped(rate),
        }
    }

    /// Random strategy; the maximum rate is clamped to [0, 1]
    pub fn random(max_rate: Decimal) -> Self {
        AdjustmentStrategy::Random {
            max_rate: Rate::clamped(max_rate),
        }
    }

    /// Resolves a configured behavior name. Unknown names fall back to
    /// [`AdjustmentStrategy::None`] with a warning.
    pub fn from_behavior(behavior: &str, rate: Decimal) -> Self {
        match behavior.trim().to_ascii_lowercase().as_str() {
            "" | "none" => AdjustmentStrategy::None,
            "fixed" => Self::fixed(rate),
            "random" => Self::random(rate),
            other => {
                warn!(behavior = %other, "Unknown payer adjustment behavior, using none");
                AdjustmentStrategy::None
            }
        }
    }

    /// Amount of `cost` forgiven
    pub fn adjust(&self, cost: Money, rng: &mut SimRng) -> Money {
        match self {
            AdjustmentStrategy::None => Money::zero(cost.currency()),
            AdjustmentStrategy::Fixed { rate } => rate.apply(&cost),
            AdjustmentStrategy::Random { max_rate } => {
                if rng.rand_bool() {
                    let rate = rng.rand_decimal(Decimal::ZERO, max_rate.as_decimal());
                    cost.multiply(rate)
                } else {
                    Money::zero(cost.currency())
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_none_is_zero() {
        let mut rng = SimRng::seed_from(1);
        let adj = AdjustmentStrategy::None.adjust(Money::usd(dec!(250)), &mut rng);
        assert!(adj.is_zero());
    }

    #[test]
    fn test_fixed_rates() {
        let mut rng = SimRng::seed_from(1);
        let cost = Money::usd(dec!(200));

        assert_eq!(AdjustmentStrategy::fixed(dec!(0.5)).adjust(cost, &mut rng), Money::usd(dec!(100)));
        assert_eq!(AdjustmentStrategy::fixed(dec!(1.0)).adjust(cost, &mut rng), cost);
        assert!(AdjustmentStrategy::fixed(dec!(0)).adjust(cost, &mut rng).is_zero());
    }

    #[test]
    fn test_rate_bounds() {
        assert_eq!(
            AdjustmentStrategy::fixed(dec!(-1)),
            AdjustmentStrategy::Fixed { rate: Rate::zero() }
        );
        assert_eq!(
            AdjustmentStrategy::random(dec!(2)),
            AdjustmentStrategy::Random { max_rate: Rate::new(dec!(1)) }
        );
    }

    #[test]
    fn test_random_stays_below_max() {
        let mut rng = SimRng::seed_from(99);
        let strategy = AdjustmentStrategy::random(dec!(0.5));
        let cost = Money::usd(dec!(1000));
        let mut adjusted = 0;
        for _ in 0..500 {
            let adj = strategy.adjust(cost, &mut rng);
            assert!(adj.amount() >= dec!(0) && adj.amount() <= dec!(500));
            if adj.is_positive() {
                adjusted += 1;
            }
        }
        // roughly half the draws adjust
        assert!(adjusted > 150 && adjusted < 350, "adjusted {} of 500", adjusted);
    }

    #[test]
    fn test_from_behavior() {
        assert_eq!(AdjustmentStrategy::from_behavior("none", dec!(0.1)), AdjustmentStrategy::None);
        assert_eq!(
            AdjustmentStrategy::from_behavior("Fixed", dec!(0.1)),
            AdjustmentStrategy::fixed(dec!(0.1))
        );
        assert_eq!(
            AdjustmentStrategy::from_behavior("random", dec!(0.05)),
            AdjustmentStrategy::random(dec!(0.05))
        );
        assert_eq!(AdjustmentStrategy::from_behavior("haggle", dec!(0.1)), AdjustmentStrategy::None);
    }
}
