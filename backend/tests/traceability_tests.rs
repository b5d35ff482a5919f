//! Traceability tests
//!
//! Walks an in-memory provenance graph the same shape as the ledger
//! tables: green coffee -> roast batches -> production sources.

use shared::lot::{parse_lot, ParsedLot, RoastLevel};

/// Minimal provenance graph mirroring the ledger's foreign keys.
struct Graph {
    /// (roast lot, green coffee index)
    roasts: Vec<(&'static str, usize)>,
    greens: Vec<&'static str>,
    /// (production lot, roast index, weight used)
    sources: Vec<(&'static str, usize, i64)>,
}

impl Graph {
    /// Backward: production lot -> (roast lot, weight, green origin)
    fn trace_production(&self, production_lot: &str) -> Vec<(&'static str, i64, &'static str)> {
        self.sources
            .iter()
            .filter(|(lot, _, _)| *lot == production_lot)
            .map(|&(_, roast_idx, weight)| {
                let (roast_lot, green_idx) = self.roasts[roast_idx];
                (roast_lot, weight, self.greens[green_idx])
            })
            .collect()
    }

    /// Forward: roast lot -> every production lot that drew from it
    fn trace_lot(&self, roast_lot: &str) -> Vec<(&'static str, i64)> {
        let Some(roast_idx) = self.roasts.iter().position(|(lot, _)| *lot == roast_lot) else {
            return Vec::new();
        };
        self.sources
            .iter()
            .filter(|(_, idx, _)| *idx == roast_idx)
            .map(|&(lot, _, weight)| (lot, weight))
            .collect()
    }
}

fn fixture() -> Graph {
    Graph {
        greens: vec!["Ethiopia Guji", "Colombia Huila"],
        roasts: vec![
            ("V/2025NOV05/1", 0),
            ("V/2025NOV05/2", 1),
            ("K/2025NOV05/1", 1),
        ],
        sources: vec![
            // advent calendar draws from several roasts
            ("AK/2025NOV10/1", 0, 48),
            ("AK/2025NOV10/1", 1, 48),
            ("AK/2025NOV10/1", 2, 48),
            // whole bean reuses the roast lot verbatim
            ("V/2025NOV05/1", 0, 500),
            // drip from the medium roast
            ("TG/K/2025NOV12/1", 2, 110),
        ],
    }
}

#[cfg(test)]
mod unit_tests {
    use super::*;

    /// A sold advent unit walks back to every contributing green coffee
    #[test]
    fn test_backward_trace_reaches_green_origin() {
        let graph = fixture();
        let sources = graph.trace_production("AK/2025NOV10/1");

        assert_eq!(sources.len(), 3);
        assert_eq!(sources[0], ("V/2025NOV05/1", 48, "Ethiopia Guji"));
        assert_eq!(sources[1], ("V/2025NOV05/2", 48, "Colombia Huila"));
        assert_eq!(sources[2], ("K/2025NOV05/1", 48, "Colombia Huila"));
    }

    /// A roast lot lists every production run that consumed it
    #[test]
    fn test_forward_trace_lists_production_uses() {
        let graph = fixture();
        let uses = graph.trace_lot("V/2025NOV05/1");

        assert_eq!(uses, vec![("AK/2025NOV10/1", 48), ("V/2025NOV05/1", 500)]);
    }

    #[test]
    fn test_unknown_lot_traces_to_nothing() {
        let graph = fixture();
        assert!(graph.trace_lot("S/2025NOV05/9").is_empty());
        assert!(graph.trace_production("CB/2025NOV05/9").is_empty());
    }

    /// Whole-bean lot strings classify as roast lots when parsed, which
    /// is how a scanned bag resolves to the roast batch first.
    #[test]
    fn test_whole_bean_lot_parses_as_roast() {
        let parsed = parse_lot("V/2025NOV05/1").unwrap();
        assert!(matches!(
            parsed,
            ParsedLot::Roast {
                level: RoastLevel::Light,
                ..
            }
        ));
    }

    #[test]
    fn test_production_lot_kinds_classify() {
        assert!(matches!(parse_lot("AK/2025NOV10/1").unwrap(), ParsedLot::Advent { .. }));
        assert!(matches!(parse_lot("TG/K/2025NOV12/1").unwrap(), ParsedLot::Drip { .. }));
        assert!(matches!(parse_lot("CB/2025DEC01/1").unwrap(), ParsedLot::ColdBrew { .. }));
    }

    /// The weight drawn per production never exceeds what the batch held;
    /// summed per roast, the graph conserves mass.
    #[test]
    fn test_weights_sum_per_roast() {
        let graph = fixture();

        let total_from_first: i64 = graph
            .sources
            .iter()
            .filter(|(_, idx, _)| *idx == 0)
            .map(|(_, _, w)| w)
            .sum();

        assert_eq!(total_from_first, 548);
    }
}
