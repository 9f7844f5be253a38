//! Common utilities shared by the engine, backends and CLI

pub mod config;
pub mod error;
pub mod logging;
pub mod paths;

use std::sync::atomic::{AtomicU64, Ordering};

pub use config::{Config, SessionOptions};
pub use error::{Error, ErrorKind, Result};

/// Unique-per-run suffix for generated test accounts
///
/// Base-36 wall clock in milliseconds, process id and a counter, so
/// parallel scenarios and concurrent runs never collide. Lowercase
/// alphanumeric and at most 16 characters for any Linux pid.
pub fn unique_suffix() -> String {
    static COUNTER: AtomicU64 = AtomicU64::new(0);
    let n = COUNTER.fetch_add(1, Ordering::Relaxed);
    let millis = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or_default();
    suffix_from(millis, std::process::id(), n)
}

fn suffix_from(millis: u64, pid: u32, counter: u64) -> String {
    format!(
        "{}{}{}",
        base36(millis),
        base36(u64::from(pid)),
        base36(counter % 36)
    )
}

fn base36(mut n: u64) -> String {
    const DIGITS: &[u8; 36] = b"0123456789abcdefghijklmnopqrstuvwxyz";
    let mut out = Vec::new();
    loop {
        out.push(DIGITS[(n % 36) as usize]);
        n /= 36;
        if n == 0 {
            break;
        }
    }
    out.reverse();
    String::from_utf8_lossy(&out).into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_base36() {
        assert_eq!(base36(0), "0");
        assert_eq!(base36(35), "z");
        assert_eq!(base36(36), "10");
    }

    #[test]
    fn test_suffix_stays_short_for_large_pids() {
        // 2^22 is the largest pid Linux hands out
        let suffix = suffix_from(1_792_241_849_527, 4_194_304, 1_000_000);
        assert!(suffix.len() <= 16, "suffix too long: {}", suffix);
        assert!(suffix.chars().all(|c| c.is_ascii_digit() || c.is_ascii_lowercase()));
    }

    #[test]
    fn test_suffixes_differ_within_a_process() {
        assert_ne!(unique_suffix(), unique_suffix());
    }
}
