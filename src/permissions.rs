//! Arbitrary-width permission bit vectors.
//!
//! A [`Permissions`] value is an immutable set of flag bits with no upper
//! bound on the bit position. Every operation that looks like a mutation
//! returns a fresh value, so a vector can be shared freely between tasks.
//!
//! The canonical external form is a base-10 digit string, which is how
//! permission columns are persisted:
//!
//! ```
//! use warden::Permissions;
//!
//! let perms = Permissions::builder().add_flag(0).add_flag(70).build();
//! let stored = perms.to_string();
//! assert_eq!(stored.parse::<Permissions>().unwrap(), perms);
//! ```

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::{Error, Result};

const WORD_BITS: usize = u64::BITS as usize;

/// Exclusive upper bound on the bit positions [`Permissions::set_flag`] and
/// [`Builder::add_flag`] accept. Setting bit `n` allocates `n / 64 + 1`
/// words, so positions are capped well below what would exhaust memory.
pub const MAX_BITS: usize = 1 << 20;

/// Largest power of ten that fits in a word (10^19).
const DECIMAL_CHUNK: u64 = 10_000_000_000_000_000_000;
const DECIMAL_CHUNK_DIGITS: usize = 19;

/// Immutable, growable set of permission bits.
///
/// Stored as little-endian 64-bit words with no trailing zero words, so the
/// derived equality and hashing compare values rather than representations.
#[derive(Clone, Default, PartialEq, Eq, Hash)]
pub struct Permissions {
    words: Vec<u64>,
}

impl Permissions {
    /// The vector with no bits set.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Start a [`Builder`] for a literal permission set.
    pub fn builder() -> Builder {
        Builder::new()
    }

    fn from_words(mut words: Vec<u64>) -> Self {
        trim(&mut words);
        Self { words }
    }

    /// True when no bit is set.
    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }

    /// Check whether a single bit is set.
    pub fn check_flag(&self, bit: usize) -> bool {
        let (word, mask) = locate(bit);
        self.words.get(word).is_some_and(|w| w & mask != 0)
    }

    /// Check whether every listed bit is set.
    ///
    /// An empty list is vacuously satisfied.
    pub fn check_flags(&self, bits: &[usize]) -> bool {
        bits.iter().all(|&bit| self.check_flag(bit))
    }

    /// Bitwise union.
    pub fn or(&self, other: &Self) -> Self {
        let (long, short) = if self.words.len() >= other.words.len() {
            (&self.words, &other.words)
        } else {
            (&other.words, &self.words)
        };
        let mut words = long.clone();
        for (w, o) in words.iter_mut().zip(short) {
            *w |= o;
        }
        Self { words }
    }

    /// Bits of `self` that are not set in `other`.
    pub fn and_not(&self, other: &Self) -> Self {
        let words = self
            .words
            .iter()
            .enumerate()
            .map(|(i, w)| w & !other.words.get(i).copied().unwrap_or(0))
            .collect();
        Self::from_words(words)
    }

    /// Copy of `self` with `bit` set.
    ///
    /// # Panics
    ///
    /// Panics if `bit` is not below [`MAX_BITS`].
    pub fn set_flag(&self, bit: usize) -> Self {
        let mut words = self.words.clone();
        insert(&mut words, bit);
        Self { words }
    }

    /// Copy of `self` with `bit` cleared.
    pub fn unset_flag(&self, bit: usize) -> Self {
        let (word, mask) = locate(bit);
        if word >= self.words.len() {
            return self.clone();
        }
        let mut words = self.words.clone();
        words[word] &= !mask;
        Self::from_words(words)
    }

    /// Apply a deny override: every bit present in `overrides` is cleared.
    pub fn compute_deny_overrides(&self, overrides: &str) -> Result<Self> {
        let deny: Permissions = overrides.parse()?;
        Ok(self.and_not(&deny))
    }

    /// Apply an allow override: every bit present in `overrides` is set,
    /// including bits a preceding deny just cleared.
    pub fn compute_allow_overrides(&self, overrides: &str) -> Result<Self> {
        let allow: Permissions = overrides.parse()?;
        Ok(self.or(&allow))
    }

    /// Positions of all set bits, lowest first.
    pub fn flags(&self) -> impl Iterator<Item = usize> + '_ {
        self.words.iter().enumerate().flat_map(|(i, &word)| {
            (0..WORD_BITS)
                .filter(move |offset| word & (1u64 << offset) != 0)
                .map(move |offset| i * WORD_BITS + offset)
        })
    }
}

fn locate(bit: usize) -> (usize, u64) {
    (bit / WORD_BITS, 1u64 << (bit % WORD_BITS))
}

fn insert(words: &mut Vec<u64>, bit: usize) {
    assert!(
        bit < MAX_BITS,
        "permission bit {bit} is out of range (limit {MAX_BITS})"
    );
    let (word, mask) = locate(bit);
    if words.len() <= word {
        words.resize(word + 1, 0);
    }
    words[word] |= mask;
}

fn trim(words: &mut Vec<u64>) {
    while words.last() == Some(&0) {
        words.pop();
    }
}

/// `words = words * mul + add`
fn mul_add(words: &mut Vec<u64>, mul: u64, add: u64) {
    let mut carry = add as u128;
    for w in words.iter_mut() {
        let v = (*w as u128) * (mul as u128) + carry;
        *w = v as u64;
        carry = v >> WORD_BITS;
    }
    if carry != 0 {
        words.push(carry as u64);
    }
}

/// `words = words / divisor`, returning the remainder.
fn div_rem(words: &mut Vec<u64>, divisor: u64) -> u64 {
    let divisor = divisor as u128;
    let mut rem: u128 = 0;
    for w in words.iter_mut().rev() {
        let cur = (rem << WORD_BITS) | (*w as u128);
        *w = (cur / divisor) as u64;
        rem = cur % divisor;
    }
    trim(words);
    rem as u64
}

impl FromStr for Permissions {
    type Err = Error;

    /// Parse a non-negative base-10 integer. Leading zeros are accepted and
    /// dropped; signs, whitespace and separators are rejected.
    fn from_str(s: &str) -> Result<Self> {
        if s.is_empty() {
            return Err(Error::parse(s, "empty string"));
        }
        if !s.bytes().all(|b| b.is_ascii_digit()) {
            return Err(Error::parse(s, "expected only base-10 digits"));
        }

        let mut words = Vec::with_capacity(s.len() / DECIMAL_CHUNK_DIGITS + 1);
        let head = match s.len() % DECIMAL_CHUNK_DIGITS {
            0 => DECIMAL_CHUNK_DIGITS,
            n => n,
        };
        let (first, mut rest) = s.split_at(head);
        mul_add(&mut words, 1, decimal_chunk(first));
        while !rest.is_empty() {
            let (chunk, tail) = rest.split_at(DECIMAL_CHUNK_DIGITS);
            mul_add(&mut words, DECIMAL_CHUNK, decimal_chunk(chunk));
            rest = tail;
        }

        Ok(Self::from_words(words))
    }
}

/// Value of at most 19 ASCII digits; always fits a u64.
fn decimal_chunk(digits: &str) -> u64 {
    digits
        .bytes()
        .fold(0u64, |acc, b| acc * 10 + u64::from(b - b'0'))
}

impl fmt::Display for Permissions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.words.is_empty() {
            return f.write_str("0");
        }

        let mut words = self.words.clone();
        let mut chunks = Vec::new();
        while !words.is_empty() {
            chunks.push(div_rem(&mut words, DECIMAL_CHUNK));
        }

        let mut chunks = chunks.iter().rev();
        if let Some(most_significant) = chunks.next() {
            write!(f, "{most_significant}")?;
        }
        for chunk in chunks {
            write!(f, "{chunk:0width$}", width = DECIMAL_CHUNK_DIGITS)?;
        }
        Ok(())
    }
}

impl fmt::Debug for Permissions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Permissions")
            .field(&format_args!("{self}"))
            .finish()
    }
}

impl Serialize for Permissions {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Permissions {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// Fluent builder for literal permission sets.
#[derive(Debug, Clone, Default)]
pub struct Builder {
    words: Vec<u64>,
}

impl Builder {
    pub fn new() -> Self {
        Self::default()
    }

    /// # Panics
    ///
    /// Panics if `bit` is not below [`MAX_BITS`].
    pub fn add_flag(mut self, bit: usize) -> Self {
        insert(&mut self.words, bit);
        self
    }

    pub fn add_flags(self, bits: impl IntoIterator<Item = usize>) -> Self {
        bits.into_iter().fold(self, Builder::add_flag)
    }

    pub fn build(self) -> Permissions {
        Permissions::from_words(self.words)
    }
}
