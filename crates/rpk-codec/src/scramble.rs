//! Pattern walk
//!
//! Cycles an ordered pattern list over a buffer, slicing one segment per
//! step and concatenating the transformed segments. The walk stops as soon
//! as the buffer is exhausted, whether that happens at the end of a cycle,
//! in the middle of one, or through a terminal (length 0) step.

use crate::error::CodecError;
use crate::pattern::EncodingPattern;
use std::ops::Range;

/// Transform direction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// Logical bytes to scrambled bytes
    Encode,
    /// Scrambled bytes to logical bytes
    Decode,
}

/// One slice of the input and the pattern step applied to it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Segment {
    /// Index into the pattern list
    pub pattern: usize,

    /// Input byte range
    pub range: Range<usize>,
}

/// Split `data_len` bytes into segments by cycling `patterns`
///
/// # Errors
/// Returns [`CodecError::EmptyPattern`] if `patterns` is empty and there is
/// data to walk.
pub fn segments(data_len: usize, patterns: &[EncodingPattern]) -> Result<Vec<Segment>, CodecError> {
    if data_len == 0 {
        return Ok(Vec::new());
    }
    if patterns.is_empty() {
        return Err(CodecError::EmptyPattern { data_len });
    }

    let mut out = Vec::new();
    let mut cursor = 0;
    for (index, pattern) in patterns.iter().enumerate().cycle() {
        if cursor >= data_len {
            break;
        }
        let take = pattern.take(data_len - cursor);
        out.push(Segment {
            pattern: index,
            range: cursor..cursor + take,
        });
        cursor += take;
    }
    Ok(out)
}

/// Apply `patterns` to `data` in the given direction
///
/// # Errors
/// [`CodecError::EmptyPattern`] or any error raised by an algorithm.
pub fn transform(
    data: &[u8],
    patterns: &[EncodingPattern],
    direction: Direction,
) -> Result<Vec<u8>, CodecError> {
    let mut out = Vec::with_capacity(data.len());
    for segment in segments(data.len(), patterns)? {
        let pattern = &patterns[segment.pattern];
        let payload = &data[segment.range];
        let encoded = match direction {
            Direction::Encode => pattern.algorithm().encode(payload, pattern.key())?,
            Direction::Decode => pattern.algorithm().decode(payload, pattern.key())?,
        };
        out.extend_from_slice(&encoded);
    }
    Ok(out)
}

/// Encode logical bytes
///
/// # Errors
/// See [`transform`].
#[inline]
pub fn scramble(data: &[u8], patterns: &[EncodingPattern]) -> Result<Vec<u8>, CodecError> {
    transform(data, patterns, Direction::Encode)
}

/// Decode scrambled bytes
///
/// # Errors
/// See [`transform`].
#[inline]
pub fn descramble(data: &[u8], patterns: &[EncodingPattern]) -> Result<Vec<u8>, CodecError> {
    transform(data, patterns, Direction::Decode)
}
