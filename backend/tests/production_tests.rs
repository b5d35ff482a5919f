//! Production allocation tests
//!
//! Covers the all-or-nothing multi-source allocation, the fixed-size
//! package totals, advent day rules and the whole-bean lot reuse rule.

use proptest::prelude::*;
use rust_decimal::Decimal;
use std::str::FromStr;

use shared::lot::ProductionType;
use shared::validation::{sum_source_masses, validate_advent_days, validate_sized_total};

fn dec(s: &str) -> Decimal {
    Decimal::from_str(s).unwrap()
}

/// In-memory model of the allocation transaction: reserve every source in
/// order, and roll every reservation back if any of them falls short.
fn allocate(
    batches: &mut [Decimal],
    sources: &[(usize, Decimal)],
) -> Result<Decimal, &'static str> {
    let snapshot: Vec<Decimal> = batches.to_vec();
    let mut total = Decimal::ZERO;

    for &(batch_idx, mass) in sources {
        if mass <= Decimal::ZERO {
            batches.copy_from_slice(&snapshot);
            return Err("Source masses must be positive");
        }
        if mass > batches[batch_idx] {
            batches.copy_from_slice(&snapshot);
            return Err("Insufficient stock");
        }
        batches[batch_idx] -= mass;
        total += mass;
    }

    Ok(total)
}

// ============================================================================
// Unit Tests
// ============================================================================

#[cfg(test)]
mod unit_tests {
    use super::*;

    #[test]
    fn test_single_source_allocation() {
        let mut batches = vec![dec("750")];
        let total = allocate(&mut batches, &[(0, dec("250"))]).unwrap();

        assert_eq!(total, dec("250"));
        assert_eq!(batches[0], dec("500"));
    }

    #[test]
    fn test_multi_source_allocation_preserves_order() {
        let mut batches = vec![dec("100"), dec("200")];
        let total = allocate(&mut batches, &[(0, dec("40")), (1, dec("60"))]).unwrap();

        assert_eq!(total, dec("100"));
        assert_eq!(batches, vec![dec("60"), dec("140")]);
    }

    /// Spec example: sources [(batch1, 40g), (batch2, 60g)] with batch1
    /// holding 30g must fail entirely, leaving batch2 untouched.
    #[test]
    fn test_all_or_nothing_on_first_source() {
        let mut batches = vec![dec("30"), dec("500")];
        let result = allocate(&mut batches, &[(0, dec("40")), (1, dec("60"))]);

        assert!(result.is_err());
        assert_eq!(batches, vec![dec("30"), dec("500")]);
    }

    /// A shortfall on the last source rolls back the earlier reservations
    #[test]
    fn test_all_or_nothing_on_last_source() {
        let mut batches = vec![dec("500"), dec("30")];
        let result = allocate(&mut batches, &[(0, dec("40")), (1, dec("60"))]);

        assert!(result.is_err());
        assert_eq!(batches, vec![dec("500"), dec("30")]);
    }

    #[test]
    fn test_sized_kind_totals() {
        // 4 x 250g bags consume exactly 1000g
        assert!(validate_sized_total(ProductionType::WholeBean250, 4, dec("1000")).is_ok());
        assert!(validate_sized_total(ProductionType::WholeBean250, 4, dec("1001")).is_err());

        // 10 x 11g drip pouches
        assert!(validate_sized_total(ProductionType::Drip11, 10, dec("110")).is_ok());

        // variable kinds take whatever the sources sum to
        assert!(validate_sized_total(ProductionType::Market, 1, dec("1234.5")).is_ok());
    }

    #[test]
    fn test_source_sum_rejects_empty_and_non_positive() {
        assert!(sum_source_masses(&[]).is_err());
        assert!(sum_source_masses(&[dec("10"), dec("-1")]).is_err());
        assert_eq!(sum_source_masses(&[dec("40"), dec("60")]).unwrap(), dec("100"));
    }

    #[test]
    fn test_advent_day_rules() {
        // eight slots, light and medium mix, all distinct
        assert!(validate_advent_days(&[1, 2, 3, 4, 5, 6, 7, 8]).is_ok());
        // duplicate day
        assert!(validate_advent_days(&[1, 2, 2]).is_err());
        // out of the 1-24 window
        assert!(validate_advent_days(&[0, 1]).is_err());
        assert!(validate_advent_days(&[24]).is_ok());
        assert!(validate_advent_days(&[25]).is_err());
    }

    /// Whole-bean production copies the roast lot verbatim
    #[test]
    fn test_whole_bean_production_lot_is_the_roast_lot() {
        let roast_lot = "V/2025NOV05/1";
        let production_lot = if ProductionType::WholeBean250.reuses_roast_lot() {
            roast_lot.to_string()
        } else {
            unreachable!()
        };

        assert_eq!(production_lot, roast_lot);
    }
}

// ============================================================================
// Property-Based Tests
// ============================================================================

#[cfg(test)]
mod property_tests {
    use super::*;

    fn mass_strategy() -> impl Strategy<Value = Decimal> {
        (1i64..=3000i64).prop_map(|n| Decimal::new(n, 1))
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(150))]

        /// A failed allocation leaves every batch byte-for-byte unchanged
        #[test]
        fn prop_failed_allocation_has_no_effect(
            stocks in prop::collection::vec(mass_strategy(), 1..6),
            draws in prop::collection::vec((0usize..6, mass_strategy()), 1..8)
        ) {
            let mut batches: Vec<Decimal> = stocks.clone();
            let sources: Vec<(usize, Decimal)> = draws
                .into_iter()
                .map(|(i, m)| (i % batches.len(), m))
                .collect();

            let before = batches.clone();
            if allocate(&mut batches, &sources).is_err() {
                prop_assert_eq!(batches, before);
            }
        }

        /// A successful allocation consumes exactly the sum of its sources
        #[test]
        fn prop_successful_allocation_conserves_mass(
            stocks in prop::collection::vec(mass_strategy(), 1..6),
            draws in prop::collection::vec((0usize..6, mass_strategy()), 1..8)
        ) {
            let mut batches: Vec<Decimal> = stocks.clone();
            let sources: Vec<(usize, Decimal)> = draws
                .into_iter()
                .map(|(i, m)| (i % batches.len(), m))
                .collect();

            let before: Decimal = batches.iter().copied().sum();
            if let Ok(total) = allocate(&mut batches, &sources) {
                let after: Decimal = batches.iter().copied().sum();
                let expected: Decimal = sources.iter().map(|(_, m)| *m).sum();

                prop_assert_eq!(total, expected);
                prop_assert_eq!(before - after, total);
            }
        }

        /// No batch ever goes negative, success or failure
        #[test]
        fn prop_no_negative_batches(
            stocks in prop::collection::vec(mass_strategy(), 1..6),
            draws in prop::collection::vec((0usize..6, mass_strategy()), 1..8)
        ) {
            let mut batches: Vec<Decimal> = stocks.clone();
            let sources: Vec<(usize, Decimal)> = draws
                .into_iter()
                .map(|(i, m)| (i % batches.len(), m))
                .collect();

            let _ = allocate(&mut batches, &sources);
            for stock in batches {
                prop_assert!(stock >= Decimal::ZERO);
            }
        }

        /// Advent day validation accepts any permutation of distinct days
        #[test]
        fn prop_distinct_advent_days_accepted(
            days in prop::collection::hash_set(1i32..=24, 1..=24)
        ) {
            let days: Vec<i32> = days.into_iter().collect();
            prop_assert!(validate_advent_days(&days).is_ok());
        }
    }
}
