//! Market stock ledger tests
//!
//! Covers the per-session stock rules:
//! - 0 <= remaining <= prepared for every item
//! - carts are all-or-nothing: one short line rejects the whole sale
//! - restore never exceeds the prepared ceiling
//! - closing is terminal and freezes the numbers
//! - carry-forward seeds prepared = remaining at close

use proptest::prelude::*;

/// In-memory model of one session item with the ledger's guarded updates.
#[derive(Debug, Clone, PartialEq, Eq)]
struct ItemModel {
    prepared: i32,
    remaining: i32,
}

/// In-memory model of a session, mirroring the check-then-apply sale.
#[derive(Debug, Clone)]
struct SessionModel {
    closed: bool,
    items: Vec<ItemModel>,
}

impl SessionModel {
    fn new(quantities: &[i32]) -> Self {
        Self {
            closed: false,
            items: quantities
                .iter()
                .map(|&q| ItemModel {
                    prepared: q,
                    remaining: q,
                })
                .collect(),
        }
    }

    /// All-or-nothing cart sale: validate every line before touching any.
    fn sell(&mut self, cart: &[(usize, i32)]) -> Result<i32, &'static str> {
        if self.closed {
            return Err("Session closed");
        }
        if cart.is_empty() {
            return Err("Cart is empty");
        }

        // fold duplicate lines per item before validating
        let mut wanted = std::collections::BTreeMap::new();
        for &(item_idx, quantity) in cart {
            if quantity <= 0 {
                return Err("Line quantities must be positive");
            }
            *wanted.entry(item_idx).or_insert(0) += quantity;
        }

        for (&item_idx, &quantity) in &wanted {
            let item = self.items.get(item_idx).ok_or("Item not found")?;
            if quantity > item.remaining {
                return Err("Insufficient stock");
            }
        }

        let mut total = 0;
        for (&item_idx, &quantity) in &wanted {
            self.items[item_idx].remaining -= quantity;
            total += quantity;
        }
        Ok(total)
    }

    fn restore(&mut self, item_idx: usize, quantity: i32) -> Result<(), &'static str> {
        if self.closed {
            return Err("Session closed");
        }
        if quantity <= 0 {
            return Err("Quantity must be positive");
        }
        let item = self.items.get_mut(item_idx).ok_or("Item not found")?;
        if item.remaining + quantity > item.prepared {
            return Err("Over-restoration");
        }
        item.remaining += quantity;
        Ok(())
    }

    fn close(&mut self) -> Result<(), &'static str> {
        if self.closed {
            return Err("Session closed");
        }
        self.closed = true;
        Ok(())
    }

    /// Seed a new session from this one's closing state.
    fn carry_forward(&self) -> Result<SessionModel, &'static str> {
        if !self.closed {
            return Err("Source session still open");
        }
        Ok(SessionModel {
            closed: false,
            items: self
                .items
                .iter()
                .filter(|i| i.remaining > 0)
                .map(|i| ItemModel {
                    prepared: i.remaining,
                    remaining: i.remaining,
                })
                .collect(),
        })
    }
}

// ============================================================================
// Unit Tests
// ============================================================================

#[cfg(test)]
mod unit_tests {
    use super::*;

    #[test]
    fn test_sell_decrements_remaining() {
        let mut session = SessionModel::new(&[10, 5]);
        let total = session.sell(&[(0, 3), (1, 2)]).unwrap();

        assert_eq!(total, 5);
        assert_eq!(session.items[0].remaining, 7);
        assert_eq!(session.items[1].remaining, 3);
    }

    /// A cart of two items where the second is short must leave the
    /// first item's remaining quantity unchanged.
    #[test]
    fn test_all_or_nothing_cart() {
        let mut session = SessionModel::new(&[10, 1]);
        let result = session.sell(&[(0, 3), (1, 2)]);

        assert!(result.is_err());
        assert_eq!(session.items[0].remaining, 10);
        assert_eq!(session.items[1].remaining, 1);
    }

    /// Duplicate cart lines for the same item are folded before the
    /// check, so two lines of 3 against 4 remaining must fail.
    #[test]
    fn test_duplicate_lines_fold_before_validation() {
        let mut session = SessionModel::new(&[4]);
        let result = session.sell(&[(0, 3), (0, 3)]);

        assert!(result.is_err());
        assert_eq!(session.items[0].remaining, 4);
    }

    #[test]
    fn test_sell_exact_remainder() {
        let mut session = SessionModel::new(&[4]);
        session.sell(&[(0, 4)]).unwrap();
        assert_eq!(session.items[0].remaining, 0);

        assert!(session.sell(&[(0, 1)]).is_err());
    }

    #[test]
    fn test_restore_reverses_a_cancelled_sale() {
        let mut session = SessionModel::new(&[10]);
        session.sell(&[(0, 4)]).unwrap();
        session.restore(0, 4).unwrap();

        assert_eq!(session.items[0].remaining, 10);
    }

    /// A duplicate restore is a caller bug and must error, never clamp
    #[test]
    fn test_restore_never_exceeds_prepared() {
        let mut session = SessionModel::new(&[10]);
        session.sell(&[(0, 4)]).unwrap();
        session.restore(0, 4).unwrap();

        assert!(session.restore(0, 4).is_err());
        assert_eq!(session.items[0].remaining, 10);
    }

    #[test]
    fn test_closed_session_rejects_mutation() {
        let mut session = SessionModel::new(&[10]);
        session.sell(&[(0, 2)]).unwrap();
        session.close().unwrap();

        assert!(session.sell(&[(0, 1)]).is_err());
        assert!(session.restore(0, 1).is_err());
        assert!(session.close().is_err());

        // numbers freeze at their closing state
        assert_eq!(session.items[0].remaining, 8);
    }

    #[test]
    fn test_carry_forward_seeds_from_closing_state() {
        let mut session = SessionModel::new(&[10, 3]);
        session.sell(&[(0, 6), (1, 3)]).unwrap();

        // still open: carrying forward is not allowed yet
        assert!(session.carry_forward().is_err());

        session.close().unwrap();
        let next = session.carry_forward().unwrap();

        // sold-out rows are skipped; unsold stock re-opens as prepared
        assert_eq!(next.items.len(), 1);
        assert_eq!(next.items[0], ItemModel { prepared: 4, remaining: 4 });
    }

    /// N sellers each taking one unit from a stock of Q: exactly
    /// min(N, Q) sales succeed and remaining ends at Q - min(N, Q).
    #[test]
    fn test_competing_single_unit_sales() {
        for (n, q) in [(3, 10), (10, 10), (25, 10), (10, 0_i32)] {
            let mut session = SessionModel::new(&[q.max(1)]);
            // model an emptied item for the q = 0 case
            session.items[0].remaining = q;

            let mut successes = 0;
            for _ in 0..n {
                if session.sell(&[(0, 1)]).is_ok() {
                    successes += 1;
                }
            }

            let expected = n.min(q);
            assert_eq!(successes, expected, "n={n} q={q}");
            assert_eq!(session.items[0].remaining, q - expected);
        }
    }
}

// ============================================================================
// Property-Based Tests
// ============================================================================

#[cfg(test)]
mod property_tests {
    use super::*;

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(200))]

        /// 0 <= remaining <= prepared after any operation sequence
        #[test]
        fn prop_remaining_bounded(
            prepared in prop::collection::vec(1i32..50, 1..5),
            ops in prop::collection::vec((0usize..5, 1i32..20, prop::bool::ANY), 0..40)
        ) {
            let mut session = SessionModel::new(&prepared);

            for (idx, quantity, is_sale) in ops {
                let idx = idx % session.items.len();
                let _ = if is_sale {
                    session.sell(&[(idx, quantity)]).map(|_| ())
                } else {
                    session.restore(idx, quantity)
                };

                for item in &session.items {
                    prop_assert!(item.remaining >= 0);
                    prop_assert!(item.remaining <= item.prepared);
                }
            }
        }

        /// Competing single-unit sales: exactly min(N, Q) succeed
        #[test]
        fn prop_competing_sales_min_n_q(q in 0i32..40, n in 1i32..60) {
            let mut session = SessionModel::new(&[q.max(1)]);
            session.items[0].remaining = q;

            let mut successes = 0;
            let mut failures = 0;
            for _ in 0..n {
                match session.sell(&[(0, 1)]) {
                    Ok(_) => successes += 1,
                    Err(_) => failures += 1,
                }
            }

            prop_assert_eq!(successes, n.min(q));
            prop_assert_eq!(failures, n - n.min(q));
            prop_assert_eq!(session.items[0].remaining, q - n.min(q));
        }

        /// A failed cart leaves every item untouched
        #[test]
        fn prop_failed_cart_has_no_effect(
            prepared in prop::collection::vec(1i32..30, 1..5),
            cart in prop::collection::vec((0usize..5, 1i32..40), 1..6)
        ) {
            let mut session = SessionModel::new(&prepared);
            let cart: Vec<(usize, i32)> = cart
                .into_iter()
                .map(|(i, q)| (i % session.items.len(), q))
                .collect();

            let before = session.items.clone();
            if session.sell(&cart).is_err() {
                prop_assert_eq!(session.items, before);
            }
        }

        /// Units sold plus units remaining always equals units prepared
        #[test]
        fn prop_sold_plus_remaining_is_prepared(
            prepared in prop::collection::vec(1i32..30, 1..4),
            carts in prop::collection::vec(
                prop::collection::vec((0usize..4, 1i32..5), 1..3),
                0..15
            )
        ) {
            let mut session = SessionModel::new(&prepared);
            let mut sold = 0;

            for cart in carts {
                let cart: Vec<(usize, i32)> = cart
                    .into_iter()
                    .map(|(i, q)| (i % session.items.len(), q))
                    .collect();
                if let Ok(total) = session.sell(&cart) {
                    sold += total;
                }
            }

            let total_prepared: i32 = session.items.iter().map(|i| i.prepared).sum();
            let total_remaining: i32 = session.items.iter().map(|i| i.remaining).sum();
            prop_assert_eq!(total_prepared - total_remaining, sold);
        }
    }
}
