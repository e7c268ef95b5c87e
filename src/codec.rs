//! Byte quantization codecs
//!
//! Scores are stored one byte per cell. Two codecs cover the stored quantities:
//!
//! * probabilities in `[0, 1]` are scaled to `0..=255` (`round(255 * v)`), and
//! * allele depths are stored exactly up to [`MAX_EXACT_DEPTH`] and on a log scale above it,
//!   saturating at [`MAX_DEPTH`].
//!
//! Decoding goes through 256-entry lookup tables built on first use.

use std::sync::LazyLock;

use crate::error::{DomainError, Result};

/// Largest depth that survives an encode/decode round trip unchanged.
pub const MAX_EXACT_DEPTH: u32 = 127;

/// Depth represented by the largest byte; anything deeper saturates to it.
pub const MAX_DEPTH: u32 = 10_000;

/// Number of log-scaled codes above [`MAX_EXACT_DEPTH`].
const LOG_CODES: f64 = 128.0;

/// `LOG_BASE^128 * 127 == 10_000`
static LOG_BASE: LazyLock<f64> =
    LazyLock::new(|| (f64::from(MAX_DEPTH) / f64::from(MAX_EXACT_DEPTH)).powf(1.0 / LOG_CODES));

static PROBABILITY_TABLE: LazyLock<[f32; 256]> = LazyLock::new(|| {
    let mut table = [0.0; 256];
    for (byte, value) in table.iter_mut().enumerate() {
        *value = byte as f32 / 255.0;
    }
    table
});

static DEPTH_TABLE: LazyLock<[u32; 256]> = LazyLock::new(|| {
    let mut table = [0; 256];
    for (byte, value) in table.iter_mut().enumerate() {
        *value = depth_from_code(byte as u8);
    }
    table
});

fn depth_from_code(code: u8) -> u32 {
    let code = u32::from(code);
    if code <= MAX_EXACT_DEPTH {
        code
    } else {
        let steps = f64::from(code - MAX_EXACT_DEPTH);
        (f64::from(MAX_EXACT_DEPTH) * LOG_BASE.powf(steps)).round() as u32
    }
}

/// Encodes a probability as a byte.
///
/// # Errors
///
/// Returns [`DomainError::ProbabilityOutOfRange`] if `value` is outside `[0, 1]` (or NaN).
/// Values are never clamped.
pub fn encode_probability(value: f32) -> Result<u8> {
    if !(0.0..=1.0).contains(&value) {
        return Err(DomainError::ProbabilityOutOfRange(value).into());
    }
    Ok((value * 255.0).round() as u8)
}

/// Decodes a byte into a probability
#[inline]
#[must_use]
pub fn decode_probability(byte: u8) -> f32 {
    PROBABILITY_TABLE[byte as usize]
}

/// Encodes each probability in `values`, failing on the first out-of-range value.
pub fn encode_probabilities(values: &[f32]) -> Result<Vec<u8>> {
    values.iter().map(|&v| encode_probability(v)).collect()
}

#[must_use]
pub fn decode_probabilities(bytes: &[u8]) -> Vec<f32> {
    bytes.iter().map(|&b| decode_probability(b)).collect()
}

/// Encodes a read depth as a byte.
///
/// Depths up to [`MAX_EXACT_DEPTH`] are stored as-is. Larger depths are stored on a log
/// scale and lose precision; depths of [`MAX_DEPTH`] and beyond saturate to `255`.
#[must_use]
pub fn encode_depth(depth: u32) -> u8 {
    if depth <= MAX_EXACT_DEPTH {
        return depth as u8;
    }
    if depth >= MAX_DEPTH {
        return u8::MAX;
    }
    let steps = (f64::from(depth) / f64::from(MAX_EXACT_DEPTH)).ln() / LOG_BASE.ln();
    let code = f64::from(MAX_EXACT_DEPTH) + steps.round();
    code.clamp(f64::from(MAX_EXACT_DEPTH + 1), 255.0) as u8
}

/// Decodes a byte into a read depth
#[inline]
#[must_use]
pub fn decode_depth(byte: u8) -> u32 {
    DEPTH_TABLE[byte as usize]
}

#[must_use]
pub fn encode_depths(depths: &[u32]) -> Vec<u8> {
    depths.iter().map(|&d| encode_depth(d)).collect()
}

#[must_use]
pub fn decode_depths(bytes: &[u8]) -> Vec<u32> {
    bytes.iter().map(|&b| decode_depth(b)).collect()
}
