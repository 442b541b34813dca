//! # Code Format
//!
//! Coupons and redemption codes share one format:
//!
//! ```text
//!   XXXX-XXXX-XXXX-XXXX      X ∈ [A-Z0-9], 19 characters total
//!   └┬─┘ └┬─┘ └┬─┘ └┬─┘
//!    4    4    4    4        16 random symbols, 36^16 ≈ 7.9e24 codes
//! ```
//!
//! Generation only produces a candidate. Uniqueness is checked against the
//! store by the issuer (bounded by [`crate::MAX_CODE_ATTEMPTS`]) and finally
//! guaranteed by a `UNIQUE` index on insert.

use rand::Rng;

/// Which family of one-shot codes a value belongs to.
///
/// Uniqueness is per kind: a coupon and a redemption code may in principle
/// share a string.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CodeKind {
    Coupon,
    RedemptionCode,
}

impl CodeKind {
    pub fn label(&self) -> &'static str {
        match self {
            CodeKind::Coupon => "Coupon",
            CodeKind::RedemptionCode => "Redemption code",
        }
    }
}

/// Symbols a code is drawn from.
pub const CODE_ALPHABET: &[u8; 36] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";

const SEGMENTS: usize = 4;
const SEGMENT_LEN: usize = 4;

/// Length of a formatted code including dashes.
pub const CODE_LEN: usize = SEGMENTS * SEGMENT_LEN + (SEGMENTS - 1);

/// Draws a fresh candidate code.
///
/// Pass `rand::rng()` in production. `random_range` samples uniformly, so
/// every symbol is equally likely.
pub fn generate_code<R: Rng + ?Sized>(rng: &mut R) -> String {
    let mut code = String::with_capacity(CODE_LEN);
    for segment in 0..SEGMENTS {
        if segment > 0 {
            code.push('-');
        }
        for _ in 0..SEGMENT_LEN {
            let idx = rng.random_range(0..CODE_ALPHABET.len());
            code.push(CODE_ALPHABET[idx] as char);
        }
    }
    code
}

/// Canonicalises user input before lookup.
///
/// Trims and uppercases, then drops everything that is not ASCII
/// alphanumeric. If exactly 16 symbols remain they are re-dashed into the
/// canonical format. Anything else comes back trimmed and uppercased so the
/// lookup simply misses.
pub fn normalize_code(input: &str) -> String {
    let upper = input.trim().to_uppercase();
    let symbols: Vec<char> = upper.chars().filter(|c| c.is_ascii_alphanumeric()).collect();

    if symbols.len() != SEGMENTS * SEGMENT_LEN {
        return upper;
    }

    symbols
        .chunks(SEGMENT_LEN)
        .map(|chunk| chunk.iter().collect::<String>())
        .collect::<Vec<_>>()
        .join("-")
}

/// Whether `code` is exactly `^[A-Z0-9]{4}(-[A-Z0-9]{4}){3}$`.
pub fn is_well_formed(code: &str) -> bool {
    let bytes = code.as_bytes();
    if bytes.len() != CODE_LEN {
        return false;
    }
    bytes.iter().enumerate().all(|(i, b)| {
        if i % (SEGMENT_LEN + 1) == SEGMENT_LEN {
            *b == b'-'
        } else {
            b.is_ascii_uppercase() || b.is_ascii_digit()
        }
    })
}

/// Shortened form for `info`-level logs: `ABCD-****-****-MNOP`.
pub fn mask_code(code: &str) -> String {
    if !is_well_formed(code) {
        return "****".to_string();
    }
    format!("{}-****-****-{}", &code[..4], &code[CODE_LEN - 4..])
}

// =============================================================================
// Unit Tests
// =============================================================================
