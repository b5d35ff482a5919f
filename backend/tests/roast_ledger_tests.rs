//! Roast batch ledger tests
//!
//! Covers the availability invariants:
//! - 0 <= available <= roasted at every point in time
//! - roasted - available equals the sum of recorded uses
//! - reserve fails on shortfall with no effect; release never pushes
//!   availability above the roasted weight

use proptest::prelude::*;
use rust_decimal::Decimal;
use std::str::FromStr;

// Helper to create Decimal from string
fn dec(s: &str) -> Decimal {
    Decimal::from_str(s).unwrap()
}

/// In-memory model of one batch's availability counter with the same
/// guarded check-then-apply semantics as the ledger.
#[derive(Debug, Clone)]
struct BatchModel {
    roasted_g: Decimal,
    available_g: Decimal,
    uses: Vec<Decimal>,
}

impl BatchModel {
    fn new(roasted_g: Decimal) -> Self {
        Self {
            roasted_g,
            available_g: roasted_g,
            uses: Vec::new(),
        }
    }

    fn reserve(&mut self, mass_g: Decimal) -> Result<(), &'static str> {
        if mass_g <= Decimal::ZERO {
            return Err("Mass must be positive");
        }
        if mass_g > self.available_g {
            return Err("Insufficient stock");
        }
        self.available_g -= mass_g;
        self.uses.push(mass_g);
        Ok(())
    }

    fn release(&mut self, mass_g: Decimal) -> Result<(), &'static str> {
        if mass_g <= Decimal::ZERO {
            return Err("Mass must be positive");
        }
        if self.available_g + mass_g > self.roasted_g {
            return Err("Over-restoration");
        }
        self.available_g += mass_g;
        // the matching use is no longer outstanding
        if let Some(pos) = self.uses.iter().position(|u| *u == mass_g) {
            self.uses.remove(pos);
        }
        Ok(())
    }

    fn consumed(&self) -> Decimal {
        self.uses.iter().copied().sum()
    }
}

// ============================================================================
// Unit Tests
// ============================================================================

#[cfg(test)]
mod unit_tests {
    use super::*;

    #[test]
    fn test_new_batch_is_fully_available() {
        let batch = BatchModel::new(dec("750"));
        assert_eq!(batch.available_g, dec("750"));
        assert_eq!(batch.consumed(), Decimal::ZERO);
    }

    #[test]
    fn test_reserve_decrements() {
        let mut batch = BatchModel::new(dec("750"));
        batch.reserve(dec("250")).unwrap();
        assert_eq!(batch.available_g, dec("500"));
        assert_eq!(batch.consumed(), dec("250"));
    }

    #[test]
    fn test_reserve_fails_on_shortfall_without_effect() {
        let mut batch = BatchModel::new(dec("100"));
        batch.reserve(dec("80")).unwrap();

        let result = batch.reserve(dec("30"));
        assert!(result.is_err());
        // the failed reservation left the counter untouched
        assert_eq!(batch.available_g, dec("20"));
    }

    #[test]
    fn test_reserve_exact_remainder_succeeds() {
        let mut batch = BatchModel::new(dec("100"));
        batch.reserve(dec("100")).unwrap();
        assert_eq!(batch.available_g, Decimal::ZERO);
    }

    #[test]
    fn test_release_restores() {
        let mut batch = BatchModel::new(dec("500"));
        batch.reserve(dec("200")).unwrap();
        batch.release(dec("200")).unwrap();
        assert_eq!(batch.available_g, dec("500"));
        assert_eq!(batch.consumed(), Decimal::ZERO);
    }

    #[test]
    fn test_release_never_exceeds_roasted_weight() {
        let mut batch = BatchModel::new(dec("500"));
        batch.reserve(dec("100")).unwrap();

        // duplicate restore: the second one must error, not clamp
        batch.release(dec("100")).unwrap();
        let result = batch.release(dec("100"));
        assert!(result.is_err());
        assert_eq!(batch.available_g, dec("500"));
    }

    #[test]
    fn test_non_positive_masses_rejected() {
        let mut batch = BatchModel::new(dec("500"));
        assert!(batch.reserve(Decimal::ZERO).is_err());
        assert!(batch.reserve(dec("-10")).is_err());
        assert!(batch.release(Decimal::ZERO).is_err());
    }

    /// Weight loss formula: ((green - roasted) / green) x 100
    #[test]
    fn test_weight_loss_formula() {
        let green = dec("888");
        let roasted = dec("750");
        let loss = (green - roasted) / green * Decimal::from(100);

        // 138/888 = 15.54%
        assert!(loss > dec("15.5") && loss < dec("15.6"));
    }

    /// Merging a same-day re-roast grows all three weights together
    #[test]
    fn test_merge_keeps_the_invariant() {
        let mut batch = BatchModel::new(dec("750"));
        batch.reserve(dec("200")).unwrap();

        // merge: roasted and available both grow by the new roasted mass
        batch.roasted_g += dec("700");
        batch.available_g += dec("700");

        assert_eq!(batch.roasted_g - batch.available_g, batch.consumed());
        assert!(batch.available_g <= batch.roasted_g);
    }
}

// ============================================================================
// Property-Based Tests
// ============================================================================

#[cfg(test)]
mod property_tests {
    use super::*;

    fn mass_strategy() -> impl Strategy<Value = Decimal> {
        (1i64..=5000i64).prop_map(|n| Decimal::new(n, 1)) // 0.1 to 500.0
    }

    #[derive(Debug, Clone)]
    enum Op {
        Reserve(Decimal),
        Release(Decimal),
    }

    fn op_strategy() -> impl Strategy<Value = Op> {
        prop_oneof![
            mass_strategy().prop_map(Op::Reserve),
            mass_strategy().prop_map(Op::Release),
        ]
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(200))]

        /// 0 <= available <= roasted after any operation sequence
        #[test]
        fn prop_availability_bounded(
            roasted in (1000i64..=100000i64).prop_map(|n| Decimal::new(n, 1)),
            ops in prop::collection::vec(op_strategy(), 0..40)
        ) {
            let mut batch = BatchModel::new(roasted);

            for op in ops {
                // failures are allowed; the invariant must hold either way
                let _ = match op {
                    Op::Reserve(m) => batch.reserve(m),
                    Op::Release(m) => batch.release(m),
                };

                prop_assert!(batch.available_g >= Decimal::ZERO);
                prop_assert!(batch.available_g <= batch.roasted_g);
            }
        }

        /// roasted - available always equals the outstanding uses
        #[test]
        fn prop_conservation_of_mass(
            roasted in (1000i64..=100000i64).prop_map(|n| Decimal::new(n, 1)),
            masses in prop::collection::vec(mass_strategy(), 1..30)
        ) {
            let mut batch = BatchModel::new(roasted);

            for mass in masses {
                let _ = batch.reserve(mass);
                prop_assert_eq!(
                    batch.roasted_g - batch.available_g,
                    batch.consumed()
                );
            }
        }

        /// A reserve/release pair is a no-op on the counter
        #[test]
        fn prop_release_inverts_reserve(
            roasted in (1000i64..=100000i64).prop_map(|n| Decimal::new(n, 1)),
            mass in mass_strategy()
        ) {
            let mut batch = BatchModel::new(roasted);

            if batch.reserve(mass).is_ok() {
                batch.release(mass).unwrap();
                prop_assert_eq!(batch.available_g, roasted);
            }
        }

        /// Availability decreases monotonically under reserves alone
        #[test]
        fn prop_monotonic_decrease_under_reserves(
            roasted in (1000i64..=100000i64).prop_map(|n| Decimal::new(n, 1)),
            masses in prop::collection::vec(mass_strategy(), 1..30)
        ) {
            let mut batch = BatchModel::new(roasted);
            let mut last = batch.available_g;

            for mass in masses {
                let _ = batch.reserve(mass);
                prop_assert!(batch.available_g <= last);
                last = batch.available_g;
            }
        }
    }
}
