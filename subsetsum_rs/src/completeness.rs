use crate::sumset::{SumsBitVector, SumsetEngine, WORD_BITS};

/// Inclusive range of sums that must all be achievable. `low > high`
/// describes an empty window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Window {
    pub low: u64,
    pub high: u64,
}

impl Window {
    pub fn is_empty(&self) -> bool {
        self.low > self.high
    }
}

/// Outcome of testing one subset.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Verdict {
    pub window: Window,
    pub passed: bool,
}

/// True iff every value in `[low, high]` is an achievable sum.
///
/// An empty range is vacuously covered. Value 0 has no bit, so `low` is
/// raised to 1. Values beyond the vector's capacity count as missing.
pub fn all_covered(bits: &SumsBitVector, low: u64, high: u64) -> bool {
    let low = low.max(1);
    if low > high {
        return true;
    }
    let (first, last) = (low - 1, high - 1);
    if last >= bits.bit_len() {
        return false;
    }

    let words = bits.words();
    for k in (first / WORD_BITS)..=(last / WORD_BITS) {
        let word_start = k * WORD_BITS;
        let from = first.max(word_start) - word_start;
        let to = last.min(word_start + WORD_BITS - 1) - word_start;
        let mask = (u64::MAX >> (WORD_BITS - 1 - to)) & (u64::MAX << from);
        let word = words[words.len() - 1 - k as usize];
        if word & mask != mask {
            return false;
        }
    }
    true
}

/// The window tested for a subset: from its maximum element up to its
/// total minus that maximum.
pub fn conjecture_window(subset: &[u32]) -> Window {
    let max = subset.last().copied().map(u64::from).unwrap_or(0);
    let total: u64 = subset.iter().copied().map(u64::from).sum();
    Window {
        low: max,
        high: total.saturating_sub(max),
    }
}

/// Run the sums engine over `subset` and test its window.
pub fn check_subset(engine: &mut SumsetEngine, subset: &[u32]) -> Verdict {
    let window = conjecture_window(subset);
    let sums = engine.accumulate(subset);
    Verdict {
        window,
        passed: all_covered(sums, window.low, window.high),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn covered_bit_by_bit(bits: &SumsBitVector, low: u64, high: u64) -> bool {
        (low.max(1)..=high).all(|value| bits.contains_sum(value))
    }

    fn bits_with_sums(word_count: usize, sums: impl IntoIterator<Item = u64>) -> SumsBitVector {
        let mut bits = SumsBitVector::zeroed(word_count);
        for value in sums {
            bits.set_bit(value - 1);
        }
        bits
    }

    #[test]
    fn empty_window_is_vacuously_covered() {
        let bits = SumsBitVector::zeroed(1);
        assert!(all_covered(&bits, 6, 3));
        assert!(all_covered(&bits, 0, 0));
    }

    #[test]
    fn single_gap_fails() {
        let bits = bits_with_sums(3, (1..=150).filter(|&v| v != 97));
        assert!(all_covered(&bits, 1, 96));
        assert!(all_covered(&bits, 98, 150));
        assert!(!all_covered(&bits, 90, 100));
        assert!(!all_covered(&bits, 97, 97));
    }

    #[test]
    fn range_past_capacity_is_not_covered() {
        let bits = bits_with_sums(1, 1..=64);
        assert!(all_covered(&bits, 1, 64));
        assert!(!all_covered(&bits, 60, 65));
    }

    #[test]
    fn word_masks_match_bit_by_bit_scan() {
        // Every third value missing in the middle word, full elsewhere.
        let bits = bits_with_sums(3, (1..=192).filter(|&v| !(70..=120).contains(&v) || v % 3 != 0));
        let bounds = [1u64, 2, 63, 64, 65, 66, 68, 69, 72, 121, 122, 127, 128, 129, 191, 192];
        for &low in &bounds {
            for &high in &bounds {
                assert_eq!(
                    all_covered(&bits, low, high),
                    covered_bit_by_bit(&bits, low, high),
                    "low={} high={}",
                    low,
                    high
                );
            }
        }
    }

    #[test]
    fn window_for_three_element_subset() {
        assert_eq!(conjecture_window(&[1, 2, 6]), Window { low: 6, high: 3 });
        assert!(conjecture_window(&[3, 4]).is_empty());
        assert_eq!(conjecture_window(&[3, 5, 6]), Window { low: 6, high: 8 });
    }

    #[test]
    fn check_subset_detects_missing_middle_sum() {
        let mut engine = SumsetEngine::new(6, 3);
        // {3, 5, 6} reaches 6 and 8 but not 7.
        let verdict = check_subset(&mut engine, &[3, 5, 6]);
        assert!(!verdict.passed);
        // {2, 5, 6} reaches 6 and 7.
        assert!(check_subset(&mut engine, &[2, 5, 6]).passed);
        // Empty window.
        assert!(check_subset(&mut engine, &[1, 2, 6]).passed);
    }
}
