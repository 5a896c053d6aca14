//! ID generation and permission list helpers.

use std::sync::atomic::{AtomicU64, Ordering};

use chrono::{DateTime, Utc};
use sha2::{Digest, Sha256};

/// Length of generated ids and generated names.
pub const ID_LENGTH: usize = 26;

static ID_COUNTER: AtomicU64 = AtomicU64::new(0);

// ============================================================================
// ID Generation
// ============================================================================

/// Generate a unique id for a new record.
///
/// Hashes `kind`, `seed`, the timestamp and a process-wide counter with
/// SHA256 and encodes the result in base36. The `exists` closure checks
/// for collisions; a colliding candidate is retried with the next nonce.
pub fn generate_id<F>(kind: &str, seed: &str, created_at: DateTime<Utc>, exists: F) -> String
where
    F: Fn(&str) -> bool,
{
    let counter = ID_COUNTER.fetch_add(1, Ordering::Relaxed);
    let mut nonce = 0u32;
    loop {
        let input = format!(
            "{kind}|{seed}|{}|{counter}|{nonce}",
            created_at.timestamp_nanos_opt().unwrap_or(0)
        );
        let id = compute_id_hash(&input, ID_LENGTH);
        if !exists(&id) {
            return id;
        }
        nonce += 1;
    }
}

/// Generate a fresh id with no collision check.
#[must_use]
pub fn new_id(kind: &str) -> String {
    generate_id(kind, "", Utc::now(), |_| false)
}

fn compute_id_hash(input: &str, length: usize) -> String {
    let mut hasher = Sha256::new();
    hasher.update(input.as_bytes());
    let result = hasher.finalize();

    let mut encoded = String::with_capacity(length);
    for chunk in result.chunks(8) {
        let mut num = 0u64;
        for &byte in chunk {
            num = (num << 8) | u64::from(byte);
        }
        encoded.push_str(&base36_encode(num));
        if encoded.len() >= length {
            break;
        }
    }
    if encoded.len() < length {
        encoded = format!("{encoded:0>length$}");
    }
    encoded.chars().take(length).collect()
}

fn base36_encode(mut num: u64) -> String {
    const ALPHABET: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyz";
    if num == 0 {
        return "0".to_string();
    }
    let mut chars = Vec::new();
    while num > 0 {
        chars.push(ALPHABET[(num % 36) as usize] as char);
        num /= 36;
    }
    chars.into_iter().rev().collect()
}

// ============================================================================
// Permission Lists
// ============================================================================

/// Split a space-separated permission list, dropping blanks and duplicates.
#[must_use]
pub fn parse_permission_list(raw: &str) -> std::collections::BTreeSet<String> {
    raw.split_whitespace().map(str::to_string).collect()
}

/// Join permissions into the space-separated storage form.
#[must_use]
pub fn join_permission_list<'a>(permissions: impl IntoIterator<Item = &'a String>) -> String {
    permissions
        .into_iter()
        .map(String::as_str)
        .collect::<Vec<_>>()
        .join(" ")
}
