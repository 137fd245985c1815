//! Word-packed bit-vector of achievable sub-selection sums.
//!
//! The words of a [`SumsBitVector`] are stored most-significant-word-first
//! and read as one unsigned integer of `words.len() * 64` bits. Bit `b`
//! (0 = least significant) is set when the value `b + 1` is the sum of some
//! non-empty selection of the subset's elements. Value 0 (the empty
//! selection) has no bit.

/// Bits per storage word.
pub const WORD_BITS: u64 = u64::BITS as u64;

/// Largest possible element total for a subset of the given shape:
/// `M + (M-1) + ... + (M-N+1)`.
pub fn max_subset_total(max_value: u32, subset_size: usize) -> u64 {
    (0..subset_size as u64)
        .map(|i| u64::from(max_value).saturating_sub(i))
        .sum()
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SumsBitVector {
    words: Vec<u64>,
}

impl SumsBitVector {
    pub fn zeroed(word_count: usize) -> Self {
        Self {
            words: vec![0; word_count.max(1)],
        }
    }

    /// Smallest word count able to hold every sum of a subset of this shape.
    pub fn word_count_for(max_value: u32, subset_size: usize) -> usize {
        (max_subset_total(max_value, subset_size) / WORD_BITS) as usize + 1
    }

    pub fn for_subsets(max_value: u32, subset_size: usize) -> Self {
        Self::zeroed(Self::word_count_for(max_value, subset_size))
    }

    /// Build from raw words (most significant first).
    pub fn from_words(words: Vec<u64>) -> Self {
        if words.is_empty() {
            return Self::zeroed(1);
        }
        Self { words }
    }

    pub fn words(&self) -> &[u64] {
        &self.words
    }

    pub fn bit_len(&self) -> u64 {
        self.words.len() as u64 * WORD_BITS
    }

    pub fn clear(&mut self) {
        self.words.fill(0);
    }

    fn word_index(&self, bit: u64) -> usize {
        self.words.len() - 1 - (bit / WORD_BITS) as usize
    }

    /// Write `self << shift` into `dest`. Bits pushed past the top word are
    /// dropped.
    pub fn shift_left_into(&self, dest: &mut SumsBitVector, shift: u64) {
        debug_assert_eq!(self.words.len(), dest.words.len());
        let len = self.words.len();
        let full = shift / WORD_BITS;
        if full >= len as u64 {
            dest.clear();
            return;
        }
        let full = full as usize;
        let sub = (shift % WORD_BITS) as u32;

        for d in 0..len {
            let hi = self.words.get(d + full).copied().unwrap_or(0);
            dest.words[d] = if sub == 0 {
                hi
            } else {
                // Top bits of the next less significant word carry in.
                let lo = self.words.get(d + full + 1).copied().unwrap_or(0);
                (hi << sub) | (lo >> (WORD_BITS as u32 - sub))
            };
        }
    }

    pub fn or_assign(&mut self, other: &SumsBitVector) {
        debug_assert_eq!(self.words.len(), other.words.len());
        for (dest, src) in self.words.iter_mut().zip(&other.words) {
            *dest |= *src;
        }
    }

    /// Set bit `bit`; out-of-range bits are ignored.
    pub fn set_bit(&mut self, bit: u64) {
        if bit >= self.bit_len() {
            return;
        }
        let idx = self.word_index(bit);
        self.words[idx] |= 1u64 << (bit % WORD_BITS);
    }

    pub fn bit(&self, bit: u64) -> bool {
        if bit >= self.bit_len() {
            return false;
        }
        self.words[self.word_index(bit)] & (1u64 << (bit % WORD_BITS)) != 0
    }

    /// Whether `value` is an achievable non-empty sub-selection sum.
    pub fn contains_sum(&self, value: u64) -> bool {
        value > 0 && self.bit(value - 1)
    }

    /// All achievable sums, ascending.
    pub fn achievable_sums(&self) -> impl Iterator<Item = u64> + '_ {
        (0..self.bit_len())
            .filter(|&bit| self.bit(bit))
            .map(|bit| bit + 1)
    }

    pub fn count_ones(&self) -> u32 {
        self.words.iter().map(|word| word.count_ones()).sum()
    }
}

/// One element's contribution while accumulating, kept for diagnostics.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TraceStep {
    pub element: u32,
    /// Accumulator shifted left by the element.
    pub shifted: SumsBitVector,
    /// Accumulator after OR-ing in the shifted copy.
    pub combined: SumsBitVector,
    /// Accumulator after seeding the element on its own.
    pub seeded: SumsBitVector,
}

/// Bitset subset-sum dynamic program over a subset's own elements.
///
/// Owns the accumulator and the scratch buffer for the shifted term; both
/// are cleared at the start of every evaluation. One engine per thread.
#[derive(Debug, Clone)]
pub struct SumsetEngine {
    sums: SumsBitVector,
    scratch: SumsBitVector,
}

impl SumsetEngine {
    pub fn new(max_value: u32, subset_size: usize) -> Self {
        Self::with_word_count(SumsBitVector::word_count_for(max_value, subset_size))
    }

    pub fn with_word_count(word_count: usize) -> Self {
        Self {
            sums: SumsBitVector::zeroed(word_count),
            scratch: SumsBitVector::zeroed(word_count),
        }
    }

    pub fn word_count(&self) -> usize {
        self.sums.words.len()
    }

    /// Result of the most recent evaluation.
    pub fn sums(&self) -> &SumsBitVector {
        &self.sums
    }

    pub fn accumulate(&mut self, subset: &[u32]) -> &SumsBitVector {
        self.sums.clear();
        self.scratch.clear();
        for &element in subset {
            self.step(element);
        }
        &self.sums
    }

    /// Same as [`accumulate`](Self::accumulate), recording every
    /// intermediate vector.
    pub fn accumulate_traced(&mut self, subset: &[u32]) -> Vec<TraceStep> {
        self.sums.clear();
        self.scratch.clear();
        let mut steps = Vec::with_capacity(subset.len());
        for &element in subset {
            let (shifted, combined) = self.step(element);
            steps.push(TraceStep {
                element,
                shifted,
                combined,
                seeded: self.sums.clone(),
            });
        }
        steps
    }

    fn step(&mut self, element: u32) -> (SumsBitVector, SumsBitVector) {
        let element = u64::from(element);
        self.sums.shift_left_into(&mut self.scratch, element);
        self.sums.or_assign(&self.scratch);
        let combined = self.sums.clone();
        if let Some(bit) = element.checked_sub(1) {
            self.sums.set_bit(bit);
        }
        (self.scratch.clone(), combined)
    }
}
