//! Sortable, URL-safe key generation
//!
//! Keys are a fixed-width Crockford base-32 rendering of a numeric seed
//! (usually the current time in milliseconds). The alphabet is ordered by
//! ASCII value, so sorting keys as strings sorts them by seed.

use chrono::Utc;
use std::sync::atomic::{AtomicU64, Ordering};

const ALPHABET: &[u8; 32] = b"0123456789ABCDEFGHJKMNPQRSTVWXYZ";

/// Length of every generated key (13 * 5 bits covers a full `u64`)
pub const KEY_LENGTH: usize = 13;

/// Errors produced when decoding a key
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum KeyError {
    #[error("key must be 13 characters, got {0}")]
    Length(usize),

    #[error("invalid key character '{0}'")]
    Character(char),

    #[error("key exceeds the 64-bit seed range")]
    Overflow,
}

/// Encode `seed` as a key
///
/// Deterministic: the same seed always yields the same key.
pub fn generate(seed: u64) -> String {
    let mut out = [b'0'; KEY_LENGTH];
    let mut rest = seed;
    for slot in out.iter_mut().rev() {
        *slot = ALPHABET[(rest & 0x1f) as usize];
        rest >>= 5;
    }
    // ALPHABET is pure ASCII
    out.iter().map(|&b| b as char).collect()
}

/// Recover the seed a key was generated from
///
/// Lowercase input is accepted, as are the Crockford substitutions
/// `O -> 0` and `I`/`L -> 1`.
pub fn decode(key: &str) -> Result<u64, KeyError> {
    let count = key.chars().count();
    if count != KEY_LENGTH {
        return Err(KeyError::Length(count));
    }
    let mut seed: u64 = 0;
    for (i, c) in key.chars().enumerate() {
        let digit = digit_value(c).ok_or(KeyError::Character(c))?;
        // The leading digit only has room for the top 4 bits
        if i == 0 && digit > 0x0f {
            return Err(KeyError::Overflow);
        }
        seed = (seed << 5) | u64::from(digit);
    }
    Ok(seed)
}

fn digit_value(c: char) -> Option<u8> {
    let c = match c.to_ascii_uppercase() {
        'O' => '0',
        'I' | 'L' => '1',
        other => other,
    };
    ALPHABET.iter().position(|&b| b as char == c).map(|p| p as u8)
}

/// Clock-seeded key source
///
/// Hands out keys seeded from the wall clock in milliseconds. Two calls on
/// the same generator never share a seed: when the clock has not advanced
/// (or went backwards) the previous seed is bumped by one. Generators in
/// different processes can still collide, so writes keyed by these values
/// must be upserts.
#[derive(Debug, Default)]
pub struct KeyGenerator {
    last: AtomicU64,
}

impl KeyGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Next key from the current time
    pub fn next_key(&self) -> String {
        let now = u64::try_from(Utc::now().timestamp_millis()).unwrap_or(0);
        generate(self.next_seed(now))
    }

    /// Reserve a seed no smaller than `candidate` and greater than any seed
    /// previously reserved by this generator
    pub fn next_seed(&self, candidate: u64) -> u64 {
        let mut last = self.last.load(Ordering::Relaxed);
        loop {
            let seed = candidate.max(last.saturating_add(1));
            match self
                .last
                .compare_exchange_weak(last, seed, Ordering::AcqRel, Ordering::Relaxed)
            {
                Ok(_) => return seed,
                Err(actual) => last = actual,
            }
        }
    }
}
