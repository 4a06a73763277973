//! Preservation-stream token budgeting (spec.md §6, "Budget
//! allocation: proportional to preservation ratios, with remainder
//! going to identity").
//!
//! The four streams (`identity`, `projects`, `tasks`, `flow`) each
//! carry a fixed preservation ratio (spec.md §6). Given a total token
//! budget, each stream's share is proportional to its ratio among the
//! four; any remainder from integer rounding is credited to `identity`
//! so the split is always exact (spec.md §8, "Streams: preservation-
//! ratio budget split is exact").

use std::collections::HashMap;

use crate::types::StreamKind;

/// Split `total` tokens across the four streams proportional to their
/// preservation ratios. `sum(result.values()) == total` always holds.
#[must_use]
pub fn allocate_stream_budget(total: u64) -> HashMap<StreamKind, u64> {
    let ratio_sum: f64 = StreamKind::ALL.iter().map(|s| s.preservation_ratio()).sum();
    let mut allocated: HashMap<StreamKind, u64> = HashMap::new();
    let mut running_total: u64 = 0;

    for stream in StreamKind::ALL {
        if stream == StreamKind::Identity {
            continue;
        }
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let share = ((total as f64) * stream.preservation_ratio() / ratio_sum).floor() as u64;
        running_total += share;
        allocated.insert(stream, share);
    }

    allocated.insert(StreamKind::Identity, total.saturating_sub(running_total));
    allocated
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn zero_total_splits_to_zero() {
        let budget = allocate_stream_budget(0);
        assert_eq!(budget.values().sum::<u64>(), 0);
    }

    #[test]
    fn identity_absorbs_remainder() {
        let budget = allocate_stream_budget(10);
        assert_eq!(budget.values().sum::<u64>(), 10);
    }

    proptest! {
        #[test]
        fn split_is_always_exact(total in 0u64..10_000_000) {
            let budget = allocate_stream_budget(total);
            let sum: u64 = budget.values().sum();
            prop_assert_eq!(sum, total);
            prop_assert_eq!(budget.len(), 4);
        }
    }
}
