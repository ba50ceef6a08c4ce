//! Pure trigger decisions. Both functions are total, side-effect-free, and
//! carry no registry state, so they can be re-run safely at scan time and
//! again under the commit lock.

use alloy::primitives::U256;

use crate::types::Strategy;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TriggerDecision {
    Met,
    NotMet,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CooldownDecision {
    Eligible,
    CoolingDown { remaining: u64 },
}

/// Compare a normalized price against the strategy threshold.
/// Equality counts as met in both directions.
pub fn evaluate(strategy: &Strategy, normalized_price: U256) -> TriggerDecision {
    let met = if strategy.trigger_above {
        normalized_price >= strategy.trigger_price
    } else {
        normalized_price <= strategy.trigger_price
    };
    if met {
        TriggerDecision::Met
    } else {
        TriggerDecision::NotMet
    }
}

/// Cooldown gate: eligible iff `now >= last_executed + cooldown_period`.
/// A never-executed agent has `last_executed = 0` and is always eligible.
pub fn eligible(strategy: &Strategy, now: u64) -> CooldownDecision {
    let ready_at = strategy.last_executed.saturating_add(strategy.cooldown_period);
    if now >= ready_at {
        CooldownDecision::Eligible
    } else {
        CooldownDecision::CoolingDown {
            remaining: ready_at - now,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy::primitives::{Address, B256};

    fn strategy(trigger_price: u64, trigger_above: bool) -> Strategy {
        Strategy {
            price_feed_id: B256::repeat_byte(1),
            trigger_price: U256::from(trigger_price),
            trigger_above,
            token_in: Address::repeat_byte(2),
            token_out: Address::repeat_byte(3),
            amount_in: U256::from(100u64),
            min_return_amount: U256::ZERO,
            is_active: true,
            last_executed: 0,
            cooldown_period: 0,
        }
    }

    #[test]
    fn test_trigger_above_at_threshold() {
        // Observed price exactly at the threshold fires.
        let s = strategy(3000_00000000, true);
        assert_eq!(evaluate(&s, U256::from(3000_00000000u64)), TriggerDecision::Met);
    }

    #[test]
    fn test_trigger_above_one_below_threshold() {
        let s = strategy(3000_00000000, true);
        assert_eq!(evaluate(&s, U256::from(2999_99999999u64)), TriggerDecision::NotMet);
    }

    #[test]
    fn test_trigger_below_at_threshold() {
        let s = strategy(3000_00000000, false);
        assert_eq!(evaluate(&s, U256::from(3000_00000000u64)), TriggerDecision::Met);
    }

    #[test]
    fn test_trigger_below_one_above_threshold() {
        let s = strategy(3000_00000000, false);
        assert_eq!(evaluate(&s, U256::from(3000_00000001u64)), TriggerDecision::NotMet);
    }

    #[test]
    fn test_evaluate_monotonic() {
        // Raising the price can only flip trigger_above from NotMet to Met.
        let above = strategy(500, true);
        let below = strategy(500, false);
        let mut prev_above = TriggerDecision::NotMet;
        let mut prev_below = TriggerDecision::Met;
        for p in 0u64..1000 {
            let a = evaluate(&above, U256::from(p));
            let b = evaluate(&below, U256::from(p));
            if prev_above == TriggerDecision::Met {
                assert_eq!(a, TriggerDecision::Met);
            }
            if prev_below == TriggerDecision::NotMet {
                assert_eq!(b, TriggerDecision::NotMet);
            }
            prev_above = a;
            prev_below = b;
        }
    }

    #[test]
    fn test_cooldown_boundary() {
        let mut s = strategy(1, true);
        s.last_executed = 10_000;
        s.cooldown_period = 3600;
        assert_eq!(
            eligible(&s, 10_000 + 3599),
            CooldownDecision::CoolingDown { remaining: 1 }
        );
        assert_eq!(eligible(&s, 10_000 + 3600), CooldownDecision::Eligible);
    }

    #[test]
    fn test_never_executed_always_eligible() {
        let mut s = strategy(1, true);
        s.cooldown_period = 86_400;
        assert_eq!(eligible(&s, 0), CooldownDecision::Eligible);
        assert_eq!(eligible(&s, 1), CooldownDecision::Eligible);
    }

    #[test]
    fn test_cooldown_saturates_near_u64_max() {
        let mut s = strategy(1, true);
        s.last_executed = u64::MAX - 10;
        s.cooldown_period = 100;
        assert!(matches!(
            eligible(&s, u64::MAX - 5),
            CooldownDecision::CoolingDown { .. }
        ));
        assert_eq!(eligible(&s, u64::MAX), CooldownDecision::Eligible);
    }
}
