use std::iter;

use serde::{Deserialize, Serialize};

use crate::error::PrecisionMismatch;

/// A candidate set: `subset_size` strictly increasing values whose last
/// element is pinned to the max value. Only the first `subset_size - 1`
/// positions ("free" positions) vary during enumeration.
pub type Subset = Vec<u32>;

/// Compute C(n, k) exactly.
/// Returns 0 for invalid inputs (k > n). Returns 1 for k == 0.
///
/// Each intermediate value is itself a binomial coefficient, so the
/// division is always exact. Saturates instead of overflowing for inputs far
/// outside the range a sweep can enumerate.
pub fn binomial(n: u64, k: u64) -> u128 {
    if k > n {
        return 0;
    }
    if k == 0 {
        return 1;
    }
    // Use symmetry: C(n, k) = C(n, n-k) to minimize iterations
    let k = k.min(n - k);
    let mut result = 1u128;
    for i in 0..k {
        result = result.saturating_mul((n - i) as u128) / (i + 1) as u128;
    }
    result
}

fn factorial_estimate(n: u64) -> f64 {
    (1..=n).fold(1.0f64, |acc, i| acc * i as f64)
}

/// Floating-point C(n, k) computed as a factorial ratio.
///
/// Loses precision long before [`binomial`] does and becomes NaN once the
/// factorials overflow; it exists for the informational cross-check only.
pub fn binomial_estimate(n: u64, k: u64) -> f64 {
    if k > n {
        return 0.0;
    }
    factorial_estimate(n) / (factorial_estimate(k) * factorial_estimate(n - k))
}

/// Number of qualifying subsets: every choice of the free positions from
/// {1, ..., max_value - 1}.
pub fn total_subsets(max_value: u32, subset_size: usize) -> u128 {
    if subset_size == 0 || subset_size as u64 > u64::from(max_value) {
        return 0;
    }
    binomial(u64::from(max_value) - 1, subset_size as u64 - 1)
}

const F64_EXACT_INTEGER_LIMIT: u128 = 1 << 53;

/// Both figures for the size of a full sweep.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ExpectedTotal {
    pub exact: u128,
    pub estimate: f64,
}

impl ExpectedTotal {
    /// Counts above 2^53 have no exact f64 representation and always count
    /// as a mismatch.
    pub fn mismatch(&self) -> Option<PrecisionMismatch> {
        let agrees = self.exact <= F64_EXACT_INTEGER_LIMIT
            && self.estimate.is_finite()
            && (self.estimate - self.exact as f64).abs() < 0.5;
        if agrees {
            None
        } else {
            Some(PrecisionMismatch {
                exact: self.exact,
                estimate: self.estimate,
            })
        }
    }
}

pub fn expected_total(max_value: u32, subset_size: usize) -> ExpectedTotal {
    let n = u64::from(max_value.saturating_sub(1));
    let k = (subset_size as u64).saturating_sub(1);
    ExpectedTotal {
        exact: total_subsets(max_value, subset_size),
        estimate: binomial_estimate(n, k),
    }
}

// =============================================================================
// Successor strategies
// =============================================================================

/// Which successor algorithm drives enumeration. Both visit subsets in the
/// same order; keeping both allows one to cross-check the other.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SuccessorStrategy {
    /// Increment the last free position, carrying leftwards on overflow.
    #[default]
    Positional,
    /// Redistribute gap units between neighbouring elements.
    Bubble,
}

/// The first subset in enumeration order: `[1, 2, ..., N-1, M]`.
pub fn initial(max_value: u32, subset_size: usize) -> Subset {
    (1..subset_size as u32)
        .chain(iter::once(max_value))
        .collect()
}

/// Advance `subset` to its lexicographic successor over the free positions.
///
/// Returns false, leaving `subset` untouched, when it was the last one.
pub fn positional_successor(subset: &mut [u32], max_value: u32) -> bool {
    let n = subset.len();
    if n < 2 {
        return false;
    }
    let free = n - 1;
    // Largest value position `p` may hold while leaving room for the free
    // positions to its right.
    let max_at = |p: usize| max_value - 1 - (free - 1 - p) as u32;

    // Free positions are strictly increasing, so position 0 at its maximum
    // pins every other free position to its maximum as well.
    if subset[0] >= max_at(0) {
        return false;
    }

    let mut current = free - 1;
    subset[current] += 1;
    while current > 0 && subset[current] > max_at(current) {
        subset[current - 1] += 1;
        current -= 1;
    }

    for p in (current + 1)..free {
        subset[p] = subset[p - 1] + 1;
    }
    subset[n - 1] = max_value;
    true
}

/// Gap bookkeeping for the bubble successor.
///
/// Holds `subset_size + 1` entries. Entries `0..subset_size` are the
/// structural gaps between neighbouring free elements, counted from the
/// pinned maximum downwards: entry 0 is the gap below `M`, entry `N-1` the
/// gap above zero. The final entry is a sentinel that only receives mass
/// once enumeration is exhausted. The entries always sum to `M - N`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BubbleState {
    bubbles: Vec<u32>,
    max_value: u32,
    exhausted: bool,
}

impl BubbleState {
    /// State matching [`initial`]: all gap mass sits directly below `M`.
    pub fn new(max_value: u32, subset_size: usize) -> Self {
        let mut bubbles = vec![0u32; subset_size + 1];
        bubbles[0] = max_value - subset_size as u32;
        Self {
            bubbles,
            max_value,
            exhausted: false,
        }
    }

    /// Rebuild the gaps of an arbitrary valid subset, e.g. one produced by
    /// [`rank_to_subset`].
    pub fn from_subset(subset: &[u32], max_value: u32) -> Self {
        let n = subset.len();
        let mut bubbles = vec![0u32; n + 1];
        for j in 0..n.saturating_sub(1) {
            bubbles[j] = subset[n - 1 - j] - subset[n - 2 - j] - 1;
        }
        if n > 0 {
            bubbles[n - 1] = subset[0] - 1;
        }
        Self {
            bubbles,
            max_value,
            exhausted: false,
        }
    }

    pub fn bubbles(&self) -> &[u32] {
        &self.bubbles
    }

    /// True once every structural unit has drained into the sentinel.
    pub fn is_exhausted(&self) -> bool {
        self.exhausted
    }

    /// Move one gap unit and rewrite `subset` accordingly. Returns false
    /// when no structural bubble can move.
    pub fn advance(&mut self, subset: &mut [u32]) -> bool {
        if self.exhausted {
            return false;
        }
        let n = subset.len();
        let last = n - 1;

        match (0..last).find(|&m| self.bubbles[m] > 0) {
            Some(m) => {
                self.bubbles[m] -= 1;
                self.bubbles[m + 1] += 1;
                if m > 0 {
                    // Positions between the pinned end and the moved gap
                    // collapse back to consecutive values.
                    self.bubbles[0] += self.bubbles[m];
                    self.bubbles[m] = 0;
                }
                self.write_subset(subset);
                true
            }
            None => {
                self.bubbles[n] += self.bubbles[last];
                self.bubbles[last] = 0;
                self.exhausted = true;
                false
            }
        }
    }

    fn write_subset(&self, subset: &mut [u32]) {
        let n = subset.len();
        subset[n - 1] = self.max_value;
        for j in 0..n - 1 {
            subset[n - 2 - j] = subset[n - 1 - j] - 1 - self.bubbles[j];
        }
    }
}

// =============================================================================
// Combinatorial Unranking
// =============================================================================

/// Return the `index`-th subset (0-based) in enumeration order.
///
/// Walks candidate values for each free position and skips whole blocks of
/// completions using the combinatorial number system, so the cost is
/// O(M) binomials rather than O(index) successor steps.
/// Returns None if the index exceeds total subsets.
pub fn rank_to_subset(index: u128, max_value: u32, subset_size: usize) -> Option<Subset> {
    if index >= total_subsets(max_value, subset_size) {
        return None;
    }

    let free = subset_size - 1;
    let mut subset = Vec::with_capacity(subset_size);
    let mut remaining = index;
    let mut value = 1u32;

    for pos in 0..free {
        loop {
            let completions = binomial(
                u64::from(max_value - 1 - value),
                (free - pos - 1) as u64,
            );
            value += 1;
            if remaining < completions {
                subset.push(value - 1);
                break;
            }
            remaining -= completions;
        }
    }
    subset.push(max_value);
    Some(subset)
}

/// Compute the enumeration index of a subset (inverse of
/// [`rank_to_subset`]).
pub fn subset_to_rank(subset: &[u32], max_value: u32) -> u128 {
    let free = subset.len().saturating_sub(1);
    let mut rank = 0u128;
    let mut value = 1u32;

    for (pos, &element) in subset[..free].iter().enumerate() {
        while value < element {
            rank += binomial(
                u64::from(max_value - 1 - value),
                (free - pos - 1) as u64,
            );
            value += 1;
        }
        value = element + 1;
    }
    rank
}

// =============================================================================
// Seekable enumerator
// =============================================================================

/// Enumerates subsets in order, starting from any index.
///
/// Unranking positions the enumerator directly, so a slice that starts deep
/// into the sequence costs the same to open as one starting at zero.
#[derive(Debug, Clone)]
pub struct SubsetEnumerator {
    max_value: u32,
    strategy: SuccessorStrategy,
    current: Subset,
    bubbles: Option<BubbleState>,
    exhausted: bool,
}

impl SubsetEnumerator {
    pub fn new(max_value: u32, subset_size: usize, strategy: SuccessorStrategy) -> Self {
        Self::starting_at(max_value, subset_size, 0, strategy)
    }

    pub fn starting_at(
        max_value: u32,
        subset_size: usize,
        start_index: u128,
        strategy: SuccessorStrategy,
    ) -> Self {
        let current = if start_index == 0 && total_subsets(max_value, subset_size) > 0 {
            Some(initial(max_value, subset_size))
        } else {
            rank_to_subset(start_index, max_value, subset_size)
        };

        match current {
            Some(current) => {
                let bubbles = match strategy {
                    SuccessorStrategy::Bubble => {
                        Some(BubbleState::from_subset(&current, max_value))
                    }
                    SuccessorStrategy::Positional => None,
                };
                Self {
                    max_value,
                    strategy,
                    current,
                    bubbles,
                    exhausted: false,
                }
            }
            // Start index beyond total - enumerator is exhausted
            None => Self {
                max_value,
                strategy,
                current: Vec::new(),
                bubbles: None,
                exhausted: true,
            },
        }
    }

    pub fn strategy(&self) -> SuccessorStrategy {
        self.strategy
    }

    /// The subset the enumerator is positioned on, if any remain.
    pub fn current(&self) -> Option<&[u32]> {
        if self.exhausted {
            None
        } else {
            Some(&self.current)
        }
    }

    /// Gap state of the bubble strategy (None for positional).
    pub fn bubbles(&self) -> Option<&[u32]> {
        self.bubbles.as_ref().map(BubbleState::bubbles)
    }

    /// Step to the next subset. Returns false once exhausted.
    pub fn advance(&mut self) -> bool {
        if self.exhausted {
            return false;
        }
        let advanced = match self.bubbles.as_mut() {
            Some(state) => state.advance(&mut self.current),
            None => positional_successor(&mut self.current, self.max_value),
        };
        self.exhausted = !advanced;
        advanced
    }
}

impl Iterator for SubsetEnumerator {
    type Item = Subset;

    fn next(&mut self) -> Option<Self::Item> {
        let subset = self.current()?.to_vec();
        self.advance();
        Some(subset)
    }
}

// =============================================================================
// Slice planning
// =============================================================================

/// A contiguous range of enumeration indices `[start, start + count)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Slice {
    pub start: u64,
    pub count: u64,
}

impl Slice {
    pub fn new(start: u64, count: u64) -> Self {
        Self { start, count }
    }

    /// One past the last index covered by this slice.
    pub fn end(&self) -> u64 {
        self.start.saturating_add(self.count)
    }
}

/// Split `range` into at most `parts` contiguous, disjoint, near-equal
/// slices. Earlier slices absorb the remainder; empty slices are omitted.
pub fn plan_slices(range: Slice, parts: usize) -> Vec<Slice> {
    let parts = parts.max(1) as u64;
    let base = range.count / parts;
    let extra = range.count % parts;

    let mut slices = Vec::with_capacity(parts as usize);
    let mut start = range.start;
    for i in 0..parts {
        let count = base + u64::from(i < extra);
        if count == 0 {
            continue;
        }
        slices.push(Slice { start, count });
        start += count;
    }
    slices
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn collect_positional(max_value: u32, subset_size: usize) -> Vec<Subset> {
        SubsetEnumerator::new(max_value, subset_size, SuccessorStrategy::Positional).collect()
    }

    // -------------------------------------------------------------------------
    // binomial tests
    // -------------------------------------------------------------------------

    #[test]
    fn binomial_basic() {
        assert_eq!(binomial(5, 1), 5);
        assert_eq!(binomial(5, 2), 10);
        assert_eq!(binomial(5, 3), 10);
        assert_eq!(binomial(5, 5), 1);
        assert_eq!(binomial(100, 3), 161_700);
    }

    #[test]
    fn binomial_edge_cases() {
        assert_eq!(binomial(5, 0), 1);
        assert_eq!(binomial(0, 0), 1);
        assert_eq!(binomial(5, 6), 0);
        assert_eq!(binomial(0, 1), 0);
    }

    #[test]
    fn binomial_symmetry() {
        for n in 1..=30 {
            for k in 0..=n {
                assert_eq!(
                    binomial(n, k),
                    binomial(n, n - k),
                    "Symmetry failed for C({}, {})",
                    n,
                    k
                );
            }
        }
    }

    #[test]
    fn binomial_stays_exact_where_floats_drift() {
        // C(100, 50) needs 97 bits; the factorial ratio cannot represent it.
        assert_eq!(binomial(100, 50), 100_891_344_545_564_193_334_812_497_256);
        let expected = ExpectedTotal {
            exact: binomial(100, 50),
            estimate: binomial_estimate(100, 50),
        };
        assert!(expected.mismatch().is_some());
    }

    #[test]
    fn expected_total_agrees_for_small_sweeps() {
        let expected = expected_total(6, 3);
        assert_eq!(expected.exact, 10);
        assert!((expected.estimate - 10.0).abs() < 1e-9);
        assert!(expected.mismatch().is_none());
    }

    #[test]
    fn total_subsets_rejects_invalid_shapes() {
        assert_eq!(total_subsets(5, 0), 0);
        assert_eq!(total_subsets(5, 6), 0);
        assert_eq!(total_subsets(5, 5), 1);
        assert_eq!(total_subsets(7, 1), 1);
    }

    // -------------------------------------------------------------------------
    // successor tests
    // -------------------------------------------------------------------------

    #[test]
    fn initial_pins_max_value() {
        assert_eq!(initial(6, 3), vec![1, 2, 6]);
        assert_eq!(initial(9, 1), vec![9]);
        assert_eq!(initial(4, 4), vec![1, 2, 3, 4]);
    }

    #[test]
    fn positional_order_m5_n3() {
        let expected: Vec<Subset> = vec![
            vec![1, 2, 5],
            vec![1, 3, 5],
            vec![1, 4, 5],
            vec![2, 3, 5],
            vec![2, 4, 5],
            vec![3, 4, 5],
        ];
        assert_eq!(collect_positional(5, 3), expected);
    }

    #[test]
    fn positional_successor_reports_exhaustion() {
        let mut subset = vec![3, 4, 5];
        assert!(!positional_successor(&mut subset, 5));
        assert_eq!(subset, vec![3, 4, 5]);

        let mut last = vec![5, 6, 7, 8, 9];
        assert!(!positional_successor(&mut last, 9));
        assert_eq!(last, vec![5, 6, 7, 8, 9]);

        let mut two = vec![6, 7];
        assert!(!positional_successor(&mut two, 7));
        assert_eq!(two, vec![6, 7]);

        let mut single = vec![7];
        assert!(!positional_successor(&mut single, 7));
    }

    #[test]
    fn bubble_initial_state_holds_all_gap_mass_first() {
        let state = BubbleState::new(10, 4);
        assert_eq!(state.bubbles(), &[6, 0, 0, 0, 0]);
        assert_eq!(BubbleState::from_subset(&initial(10, 4), 10), state);
    }

    #[test]
    fn bubble_exhaustion_moves_mass_into_sentinel() {
        let mut subset = vec![3, 4, 5];
        let mut state = BubbleState::from_subset(&subset, 5);
        assert_eq!(state.bubbles(), &[0, 0, 2, 0]);

        assert!(!state.advance(&mut subset));
        assert!(state.is_exhausted());
        assert_eq!(state.bubbles(), &[0, 0, 0, 2]);
        assert_eq!(state.bubbles().iter().sum::<u32>(), 2);
    }

    #[test]
    fn bubble_matches_positional_for_small_ranges() {
        for max_value in 1..=11u32 {
            for subset_size in 1..=max_value as usize {
                let positional = collect_positional(max_value, subset_size);
                let bubble: Vec<_> =
                    SubsetEnumerator::new(max_value, subset_size, SuccessorStrategy::Bubble)
                        .collect();
                assert_eq!(
                    bubble, positional,
                    "Strategies diverge for M={}, N={}",
                    max_value, subset_size
                );
            }
        }
    }

    #[test]
    fn bubble_invariant_sum_is_preserved() {
        let (max_value, subset_size) = (9u32, 4usize);
        let mut enumerator =
            SubsetEnumerator::new(max_value, subset_size, SuccessorStrategy::Bubble);
        loop {
            let bubbles = enumerator.bubbles().expect("bubble strategy").to_vec();
            assert_eq!(bubbles.len(), subset_size + 1);
            assert_eq!(bubbles.iter().sum::<u32>(), max_value - subset_size as u32);
            if !enumerator.advance() {
                break;
            }
        }
    }

    #[test]
    fn single_subset_when_m_equals_n() {
        for strategy in [SuccessorStrategy::Positional, SuccessorStrategy::Bubble] {
            let all: Vec<_> = SubsetEnumerator::new(4, 4, strategy).collect();
            assert_eq!(all, vec![vec![1, 2, 3, 4]]);
        }
    }

    // -------------------------------------------------------------------------
    // unrank tests
    // -------------------------------------------------------------------------

    #[test]
    fn unrank_m5_n3() {
        assert_eq!(rank_to_subset(0, 5, 3), Some(vec![1, 2, 5]));
        assert_eq!(rank_to_subset(3, 5, 3), Some(vec![2, 3, 5]));
        assert_eq!(rank_to_subset(5, 5, 3), Some(vec![3, 4, 5]));
        assert_eq!(rank_to_subset(6, 5, 3), None);
    }

    #[test]
    fn unrank_matches_successor_iteration() {
        for max_value in 1..=10u32 {
            for subset_size in 1..=max_value as usize {
                for (index, subset) in collect_positional(max_value, subset_size)
                    .into_iter()
                    .enumerate()
                {
                    assert_eq!(
                        rank_to_subset(index as u128, max_value, subset_size),
                        Some(subset),
                        "Mismatch at M={}, N={}, index={}",
                        max_value,
                        subset_size,
                        index
                    );
                }
            }
        }
    }

    #[test]
    fn rank_unrank_roundtrip_large() {
        let cases = [(40u32, 6usize, 0u128), (40, 6, 500_000), (60, 5, 455_000)];
        for (max_value, subset_size, index) in cases {
            let subset = rank_to_subset(index, max_value, subset_size).expect("in range");
            assert_eq!(subset.len(), subset_size);
            assert!(subset.windows(2).all(|pair| pair[0] < pair[1]));
            assert_eq!(subset_to_rank(&subset, max_value), index);
        }
    }

    #[test]
    fn unrank_single_element_subset() {
        assert_eq!(rank_to_subset(0, 7, 1), Some(vec![7]));
        assert_eq!(rank_to_subset(1, 7, 1), None);
    }

    // -------------------------------------------------------------------------
    // SubsetEnumerator tests
    // -------------------------------------------------------------------------

    #[test]
    fn seekable_matches_sequential_suffix() {
        let sequential = collect_positional(8, 4);
        for strategy in [SuccessorStrategy::Positional, SuccessorStrategy::Bubble] {
            for offset in 0..=sequential.len() {
                let seekable: Vec<_> =
                    SubsetEnumerator::starting_at(8, 4, offset as u128, strategy).collect();
                assert_eq!(
                    seekable,
                    sequential[offset..].to_vec(),
                    "Mismatch at offset {} with {:?}",
                    offset,
                    strategy
                );
            }
        }
    }

    #[test]
    fn seekable_beyond_end_is_empty() {
        let mut enumerator = SubsetEnumerator::starting_at(6, 3, 10, SuccessorStrategy::Positional);
        assert!(enumerator.current().is_none());
        assert!(enumerator.next().is_none());
        assert!(!enumerator.advance());
    }

    // -------------------------------------------------------------------------
    // plan_slices tests
    // -------------------------------------------------------------------------

    #[test]
    fn plan_slices_covers_range_exactly() {
        let range = Slice::new(5, 23);
        let slices = plan_slices(range, 4);
        assert_eq!(
            slices,
            vec![
                Slice::new(5, 6),
                Slice::new(11, 6),
                Slice::new(17, 6),
                Slice::new(23, 5),
            ]
        );
        assert_eq!(slices.last().map(Slice::end), Some(range.end()));
    }

    #[test]
    fn plan_slices_skips_empty_parts() {
        let slices = plan_slices(Slice::new(0, 2), 5);
        assert_eq!(slices, vec![Slice::new(0, 1), Slice::new(1, 1)]);
        assert!(plan_slices(Slice::new(0, 0), 3).is_empty());
    }
}
