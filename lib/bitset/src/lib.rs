//! A fixed-size dense bitset keyed by typed indices.
//!
//! `BitSet<T>` stores one bit per element of a domain `0..domain_size`. Elements are any type
//! that converts to and from `usize` (the entity handles created with `typed_index_collections`
//! in mind), so a `BitSet<Inst>` can not accidentally be queried with a `Value`.

use std::fmt;
use std::hash::{Hash, Hasher};
use std::marker::PhantomData;

#[cfg(test)]
mod tests;

type Word = u64;
const WORD_BITS: usize = Word::BITS as usize;

#[inline]
fn num_words(domain_size: usize) -> usize {
    (domain_size + WORD_BITS - 1) / WORD_BITS
}

#[inline]
fn word_index_and_mask(elem: usize) -> (usize, Word) {
    (elem / WORD_BITS, 1 << (elem % WORD_BITS))
}

pub struct BitSet<T> {
    domain_size: usize,
    words: Vec<Word>,
    marker: PhantomData<fn(T) -> T>,
}

impl<T> Clone for BitSet<T> {
    fn clone(&self) -> Self {
        Self { domain_size: self.domain_size, words: self.words.clone(), marker: PhantomData }
    }

    fn clone_from(&mut self, source: &Self) {
        self.domain_size = source.domain_size;
        self.words.clone_from(&source.words);
    }
}

impl<T> PartialEq for BitSet<T> {
    fn eq(&self, other: &Self) -> bool {
        self.domain_size == other.domain_size && self.words == other.words
    }
}

impl<T> Eq for BitSet<T> {}

impl<T> Hash for BitSet<T> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.domain_size.hash(state);
        self.words.hash(state);
    }
}

impl<T> Default for BitSet<T> {
    fn default() -> Self {
        Self::new_empty(0)
    }
}

impl<T> BitSet<T> {
    /// Creates a new, empty bitset with a given `domain_size`.
    pub fn new_empty(domain_size: usize) -> BitSet<T> {
        BitSet { domain_size, words: vec![0; num_words(domain_size)], marker: PhantomData }
    }

    /// Creates a new, filled bitset with a given `domain_size`.
    pub fn new_filled(domain_size: usize) -> BitSet<T> {
        let mut res =
            BitSet { domain_size, words: vec![!0; num_words(domain_size)], marker: PhantomData };
        res.clear_excess_bits();
        res
    }

    pub fn domain_size(&self) -> usize {
        self.domain_size
    }

    /// Grows the domain to at least `min_domain_size`. Existing elements are kept.
    pub fn ensure(&mut self, min_domain_size: usize) {
        if self.domain_size < min_domain_size {
            self.domain_size = min_domain_size;
            self.words.resize(num_words(min_domain_size), 0);
        }
    }

    pub fn clear(&mut self) {
        self.words.iter_mut().for_each(|word| *word = 0);
    }

    /// Count the number of set bits in the set.
    pub fn count(&self) -> usize {
        self.words.iter().map(|word| word.count_ones() as usize).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.words.iter().all(|&word| word == 0)
    }

    /// Sets `self = self | other` and returns `true` if `self` changed.
    pub fn union(&mut self, other: &BitSet<T>) -> bool {
        debug_assert!(other.domain_size <= self.domain_size);
        let mut changed = false;
        for (out, &elem) in self.words.iter_mut().zip(&other.words) {
            let new = *out | elem;
            changed |= *out != new;
            *out = new;
        }
        changed
    }

    /// Sets `self = self - other` and returns `true` if `self` changed.
    pub fn subtract(&mut self, other: &BitSet<T>) -> bool {
        let mut changed = false;
        for (out, &elem) in self.words.iter_mut().zip(&other.words) {
            let new = *out & !elem;
            changed |= *out != new;
            *out = new;
        }
        changed
    }

    /// Sets `self = self & other` and returns `true` if `self` changed.
    pub fn intersect(&mut self, other: &BitSet<T>) -> bool {
        let mut changed = false;
        for (i, out) in self.words.iter_mut().enumerate() {
            let new = *out & other.words.get(i).copied().unwrap_or(0);
            changed |= *out != new;
            *out = new;
        }
        changed
    }

    /// Is `self` a superset of `other`?
    pub fn superset(&self, other: &BitSet<T>) -> bool {
        other
            .words
            .iter()
            .enumerate()
            .all(|(i, &b)| self.words.get(i).copied().unwrap_or(0) & b == b)
    }

    /// Returns `true` if `self` and `other` have at least one element in common.
    pub fn intersects(&self, other: &BitSet<T>) -> bool {
        self.words.iter().zip(&other.words).any(|(&a, &b)| a & b != 0)
    }

    /// Clear excess bits in the final word.
    fn clear_excess_bits(&mut self) {
        let num_bits_in_final_word = self.domain_size % WORD_BITS;
        if num_bits_in_final_word > 0 {
            let mask = (1 << num_bits_in_final_word) - 1;
            if let Some(last) = self.words.last_mut() {
                *last &= mask;
            }
        }
    }
}

impl<T: Into<usize>> BitSet<T> {
    /// Returns `true` if `self` contains `elem`.
    #[inline]
    pub fn contains(&self, elem: T) -> bool {
        let elem = elem.into();
        if elem >= self.domain_size {
            return false;
        }
        let (word_index, mask) = word_index_and_mask(elem);
        (self.words[word_index] & mask) != 0
    }

    /// Insert `elem`. Returns whether the set has changed.
    #[inline]
    pub fn insert(&mut self, elem: T) -> bool {
        let elem = elem.into();
        assert!(elem < self.domain_size, "{elem} is outside of the domain 0..{}", self.domain_size);
        let (word_index, mask) = word_index_and_mask(elem);
        let word_ref = &mut self.words[word_index];
        let word = *word_ref;
        let new_word = word | mask;
        *word_ref = new_word;
        new_word != word
    }

    /// Insert `elem`, growing the domain if necessary. Returns whether the set has changed.
    pub fn insert_growable(&mut self, elem: T) -> bool {
        let elem = elem.into();
        self.ensure(elem + 1);
        let (word_index, mask) = word_index_and_mask(elem);
        let word = self.words[word_index];
        self.words[word_index] = word | mask;
        word & mask == 0
    }

    /// Returns `true` if `elem` was present before.
    #[inline]
    pub fn remove(&mut self, elem: T) -> bool {
        let elem = elem.into();
        if elem >= self.domain_size {
            return false;
        }
        let (word_index, mask) = word_index_and_mask(elem);
        let word_ref = &mut self.words[word_index];
        let word = *word_ref;
        let new_word = word & !mask;
        *word_ref = new_word;
        new_word != word
    }
}

impl<T: From<usize>> BitSet<T> {
    /// Iterates over the indices of set bits in a sorted order.
    #[inline]
    pub fn iter(&self) -> BitIter<'_, T> {
        BitIter::new(&self.words)
    }

    /// Returns the smallest element in the set, if any.
    #[inline]
    pub fn first(&self) -> Option<T> {
        self.iter().next()
    }
}

impl<T: From<usize> + fmt::Debug> fmt::Debug for BitSet<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.iter()).finish()
    }
}

impl<T: Into<usize>> Extend<T> for BitSet<T> {
    fn extend<I: IntoIterator<Item = T>>(&mut self, iter: I) {
        for elem in iter {
            self.insert_growable(elem);
        }
    }
}

impl<'a, T: From<usize>> IntoIterator for &'a BitSet<T> {
    type Item = T;
    type IntoIter = BitIter<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

pub struct BitIter<'a, T> {
    /// A copy of the current word, but with any already-visited bits cleared.
    /// (This lets us use `trailing_zeros()` to find the next set bit.) When it
    /// is reduced to 0, we move onto the next word.
    word: Word,

    /// The offset (measured in bits) of the current word.
    offset: usize,

    /// Underlying iterator over the words.
    iter: std::slice::Iter<'a, Word>,

    marker: PhantomData<T>,
}

impl<T: From<usize>> Iterator for BitIter<'_, T> {
    type Item = T;

    fn next(&mut self) -> Option<T> {
        loop {
            if self.word != 0 {
                // Get the position of the next set bit in the current word,
                // then clear the bit.
                let bit_pos = self.word.trailing_zeros() as usize;
                let bit = 1 << bit_pos;
                self.word ^= bit;
                return Some(T::from(bit_pos + self.offset));
            }

            // Move onto the next word. `wrapping_add()` is needed to handle
            // the degenerate initial value given to `offset` in `new()`.
            let word = self.iter.next()?;
            self.word = *word;
            self.offset = self.offset.wrapping_add(WORD_BITS);
        }
    }
}

impl<'a, T> BitIter<'a, T> {
    fn new(words: &'a [Word]) -> BitIter<'a, T> {
        BitIter {
            word: 0,
            offset: usize::MAX - (WORD_BITS - 1),
            iter: words.iter(),
            marker: PhantomData,
        }
    }
}
