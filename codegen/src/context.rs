use std::collections::{HashMap, HashSet};

use super::error::Error;

pub const MAX_PREFIX_ATTEMPTS: u32 = 10;

const RESERVED_PREFIXES: [&str; 3] = ["soap", "props", "headers"];

const BASE36: &[u8; 36] = b"0123456789abcdefghijklmnopqrstuvwxyz";

fn hash36(uri: &str, seed: u32) -> String {
    // FNV-1a, folded down to three base-36 digits.
    let mut hash: u32 = 0x811c_9dc5;

    for byte in seed.to_le_bytes().iter().chain(uri.as_bytes()) {
        hash ^= u32::from(*byte);
        hash = hash.wrapping_mul(0x0100_0193);
    }

    let mut value = hash % (36 * 36 * 36);
    let mut digits = [b'0'; 3];

    for digit in digits.iter_mut().rev() {
        *digit = BASE36[(value % 36) as usize];
        value /= 36;
    }

    digits.iter().map(|&digit| char::from(digit)).collect()
}

/// Up to six lowercase alphanumerics from the last segment of `uri`, followed
/// by a three-character hash of the URI and `seed`.
pub fn derive_prefix(uri: &str, seed: u32) -> String {
    let is_separator = |c: char| c == '/' || c == ':' || c == '#';

    let segment = uri
        .trim_end_matches(is_separator)
        .rsplit(is_separator)
        .next()
        .unwrap_or_default();

    let mut stem = segment
        .chars()
        .filter(char::is_ascii_alphanumeric)
        .take(6)
        .map(|c| c.to_ascii_lowercase())
        .collect::<String>();

    if stem.is_empty() {
        stem.push_str("ns");
    } else if stem.starts_with(|c: char| c.is_ascii_digit()) {
        stem.insert(0, 'n');
        stem.truncate(6);
    }

    stem + &hash36(uri, seed)
}

/// Prefix assignments for a whole run. Each URI gets one prefix, and no
/// prefix is ever handed to a second URI.
#[derive(Debug, Clone)]
pub struct PrefixTable {
    by_uri: HashMap<String, String>,
    by_prefix: HashMap<String, String>,
    reserved: HashSet<String>,
}

impl Default for PrefixTable {
    fn default() -> Self {
        Self {
            by_uri: Default::default(),
            by_prefix: Default::default(),
            reserved: RESERVED_PREFIXES.iter().map(|&prefix| prefix.to_owned()).collect(),
        }
    }
}

impl PrefixTable {
    pub fn prefix_for(&mut self, uri: &str) -> Result<String, Error> {
        if let Some(prefix) = self.by_uri.get(uri) {
            return Ok(prefix.clone());
        }

        for seed in 0..MAX_PREFIX_ATTEMPTS {
            let prefix = derive_prefix(uri, seed);

            if self.reserved.contains(&prefix) || self.by_prefix.contains_key(&prefix) {
                log::debug!("Prefix {} is taken, retrying for {}", prefix, uri);
                continue;
            }

            self.assign(&prefix, uri);
            return Ok(prefix);
        }

        Err(Error::PrefixExhausted {
            uri: uri.to_owned(),
            attempts: MAX_PREFIX_ATTEMPTS,
        })
    }

    pub fn assign(&mut self, prefix: &str, uri: &str) -> bool {
        if self.by_prefix.contains_key(prefix) || self.by_uri.contains_key(uri) {
            return false;
        }

        self.by_prefix.insert(prefix.to_owned(), uri.to_owned());
        self.by_uri.insert(uri.to_owned(), prefix.to_owned());
        true
    }

    pub fn get(&self, uri: &str) -> Option<&str> {
        self.by_uri.get(uri).map(String::as_str)
    }

    pub fn uri_for(&self, prefix: &str) -> Option<&str> {
        self.by_prefix.get(prefix).map(String::as_str)
    }
}

#[derive(Debug, Default)]
pub struct RunContext {
    pub prefixes: PrefixTable,
}
