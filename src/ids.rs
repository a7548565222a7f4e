//! Task id generation.
//!
//! Ids start with as much of the normalized title as fits, so they are easy
//! to guess and type. When that candidate is taken the title part shrinks one
//! character at a time and the random suffix fills the gap.

use tracing::warn;
use uuid::Uuid;

use crate::error::{Error, Result};

/// Default id length.
pub const DEFAULT_ID_LEN: usize = 8;
/// Shortest id length the generator accepts.
pub const MIN_ID_LEN: usize = 8;
/// Longest id length the generator accepts.
pub const MAX_ID_LEN: usize = 12;

/// Fresh random draws tried once the title part is exhausted.
const RANDOM_ATTEMPTS: usize = 16;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IdGenerator {
    len: usize,
}

impl Default for IdGenerator {
    fn default() -> Self {
        Self {
            len: DEFAULT_ID_LEN,
        }
    }
}

impl IdGenerator {
    pub fn new(len: usize) -> Result<Self> {
        if !(MIN_ID_LEN..=MAX_ID_LEN).contains(&len) {
            return Err(Error::InvalidConfig(format!(
                "id length must be between {MIN_ID_LEN} and {MAX_ID_LEN}, got {len}"
            )));
        }
        Ok(Self { len })
    }

    pub fn len(&self) -> usize {
        self.len
    }

    /// Generate an id for `title` that `is_taken` reports as free.
    ///
    /// If `is_taken` fails the generator stops checking and returns a purely
    /// random id.
    pub fn generate<F>(&self, title: &str, mut is_taken: F) -> String
    where
        F: FnMut(&str) -> Result<bool>,
    {
        let mut stem = normalize_title(title);
        stem.truncate(self.len);
        let suffix = random_suffix();

        // Shrinking the stem can rebuild a candidate that was already refused.
        let mut tried: Vec<String> = Vec::new();
        loop {
            let candidate = self.compose(&stem, &suffix);
            if !tried.contains(&candidate) {
                match is_taken(&candidate) {
                    Ok(false) => return candidate,
                    Ok(true) => tried.push(candidate),
                    Err(err) => {
                        warn!(error = %err, "id uniqueness check failed; using a random id");
                        return suffix[..self.len].to_string();
                    }
                }
            }
            if stem.pop().is_none() {
                break;
            }
        }

        self.random_fallback(suffix, &tried, &mut is_taken)
    }

    fn random_fallback<F>(&self, first: String, tried: &[String], is_taken: &mut F) -> String
    where
        F: FnMut(&str) -> Result<bool>,
    {
        let mut candidate = first[..self.len].to_string();
        for _ in 0..RANDOM_ATTEMPTS {
            if !tried.contains(&candidate) {
                match is_taken(&candidate) {
                    Ok(false) => return candidate,
                    Ok(true) => {}
                    Err(err) => {
                        warn!(error = %err, "id uniqueness check failed; using a random id");
                        return candidate;
                    }
                }
            }
            candidate = random_suffix()[..self.len].to_string();
        }
        candidate
    }

    fn compose(&self, stem: &str, suffix: &str) -> String {
        let mut id = String::with_capacity(stem.len() + suffix.len());
        id.push_str(stem);
        id.push_str(suffix);
        id.truncate(self.len);
        id
    }
}

/// Lowercased ASCII alphanumerics of `title`.
pub fn normalize_title(title: &str) -> String {
    title
        .chars()
        .filter(|ch| ch.is_ascii_alphanumeric())
        .map(|ch| ch.to_ascii_lowercase())
        .collect()
}

/// 32 lowercase hex characters.
fn random_suffix() -> String {
    Uuid::new_v4().simple().to_string()
}
