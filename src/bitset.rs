//! Compact bitset for small integer sets.
//!
//! # Overview
//! Two places need a dense "have I seen this value?" set:
//! - drawing per-taxon fingerprint codes without replacement, where values
//!   range over `[0, 10 * table_size)`;
//! - checking that a tree covers every taxon index exactly once.
//!
//! # Example
//! For taxa [A, B, C, D] mapped to indices [0, 1, 2, 3]:
//! - Leaf set {A, C} → bitset `0b0101` (bits 0 and 2 set)
//! - Leaf set {B, C, D} → bitset `0b1110` (bits 1, 2, 3 set)

/// A compact bitset backed by `Vec<u64>` words.
///
/// Each u64 word holds 64 indices. The set never grows on its own: callers
/// size it once with [`Bitset::with_bits`] or [`Bitset::zeros`].
#[derive(Clone, Debug, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct Bitset(pub Vec<u64>);

impl Bitset {
    /// Creates a new bitset with all bits set to 0.
    ///
    /// # Parameters
    /// - `words`: Number of u64 words needed. Calculate as `bits.div_ceil(64)`
    ///
    /// # Example
    /// ```
    /// # use tree_set_consensus::bitset::Bitset;
    /// // 100 values need 2 words (128 bits)
    /// let bs = Bitset::zeros(2);
    /// assert_eq!(bs.0.len(), 2);
    /// ```
    pub fn zeros(words: usize) -> Self {
        Bitset(vec![0u64; words])
    }

    /// Creates an empty bitset able to hold indices `0..bits`.
    ///
    /// # Example
    /// ```
    /// # use tree_set_consensus::bitset::Bitset;
    /// let bs = Bitset::with_bits(65);
    /// assert_eq!(bs.0.len(), 2);
    /// ```
    pub fn with_bits(bits: usize) -> Self {
        Self::zeros(bits.div_ceil(64))
    }

    /// Sets the bit at the given index to 1.
    ///
    /// # Example
    /// ```
    /// # use tree_set_consensus::bitset::Bitset;
    /// let mut bs = Bitset::zeros(1);
    /// bs.set(0);
    /// bs.set(5);
    /// assert_eq!(bs.0[0], 0b00100001);
    /// ```
    #[inline]
    pub fn set(&mut self, idx: usize) {
        let word = idx >> 6;     // Equivalent to idx / 64
        let bit = idx & 63;      // Equivalent to idx % 64
        self.0[word] |= 1u64 << bit;
    }

    /// Returns whether the bit at `idx` is set.
    ///
    /// Indices beyond the capacity read as unset.
    #[inline]
    pub fn contains(&self, idx: usize) -> bool {
        self.0
            .get(idx >> 6)
            .is_some_and(|word| word & (1u64 << (idx & 63)) != 0)
    }

    /// Sets `idx` and reports whether it was newly inserted.
    ///
    /// # Example
    /// ```
    /// # use tree_set_consensus::bitset::Bitset;
    /// let mut seen = Bitset::with_bits(10);
    /// assert!(seen.insert(3));
    /// assert!(!seen.insert(3));
    /// ```
    #[inline]
    pub fn insert(&mut self, idx: usize) -> bool {
        let fresh = !self.contains(idx);
        self.set(idx);
        fresh
    }

    /// Resets every bit to 0 while keeping the allocation.
    pub fn clear(&mut self) {
        self.0.fill(0);
    }

    /// Counts the number of set bits (population count).
    #[inline]
    pub fn count_ones(&self) -> usize {
        self.0.iter().map(|w| w.count_ones() as usize).sum()
    }

}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bitset_basic() {
        let mut bs = Bitset::zeros(1);
        bs.set(0);
        bs.set(2);
        assert_eq!(bs.0[0], 0b0101);
        assert!(bs.contains(2));
        assert!(!bs.contains(1));
    }

    #[test]
    fn test_contains_out_of_range() {
        let bs = Bitset::with_bits(10);
        assert!(!bs.contains(640));
    }

    #[test]
    fn test_insert_and_clear() {
        let mut bs = Bitset::with_bits(200);
        assert!(bs.insert(150));
        assert!(!bs.insert(150));
        assert_eq!(bs.count_ones(), 1);

        bs.clear();
        assert_eq!(bs.count_ones(), 0);
        assert_eq!(bs.0.len(), 4);
        assert!(bs.insert(150));
    }

    #[test]
    fn test_bits_across_words() {
        let mut bs = Bitset::zeros(2);
        bs.set(0);    // First word
        bs.set(63);   // Last bit of first word
        bs.set(64);   // First bit of second word
        bs.set(127);  // Last bit of second word

        assert_eq!(bs.count_ones(), 4);
        assert_eq!(bs.0, vec![1 | 1 << 63, 1 | 1 << 63]);
    }
}
