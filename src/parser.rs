//! Record parser for the pose data stream
//!
//! # Wire Format
//!
//! Plain text, one record per message:
//!
//! ```text
//! <px>,<py>,<pz>\n<rx>,<ry>,<rz>
//! └── ignored ──┘  └─ rotation ─┘
//! ```
//!
//! The first line is conventionally a position triple; it is never parsed or
//! validated. The rotation line must start with three comma-separated
//! floating-point numbers. Anything after the third number is ignored.
//!
//! # Framing
//!
//! [`FramingMode::PerChunk`] parses every received chunk on its own and looks
//! at the first record boundary only. A chunk that does not contain a newline
//! is dropped, and bytes are never carried over to the next chunk, so a
//! record split across two reads is lost.
//!
//! [`FramingMode::Buffered`] accumulates bytes across reads and parses a
//! record once its rotation line is newline-terminated. Senders must then
//! terminate every rotation line with `\n`.

use crate::config::FramingMode;
use crate::pose::RotationSample;
use thiserror::Error;

/// Upper bound on bytes held while waiting for a complete record
pub const MAX_PENDING_BYTES: usize = 4096;

/// Why a chunk or record produced no sample
#[derive(Debug, Clone, PartialEq, Error)]
pub enum FrameError {
    #[error("no record delimiter in chunk")]
    MissingDelimiter,

    #[error("failed to parse rotation data ({fields} of 3 fields): {tail:?}")]
    MalformedRotation {
        /// Number of fields converted before the failure
        fields: usize,
        /// Text after the record delimiter
        tail: String,
    },

    #[error("pending record exceeded {limit} bytes, discarded {discarded} bytes")]
    Overflow { limit: usize, discarded: usize },
}

/// Parse one received chunk into a rotation sample.
///
/// Only the first newline is considered; the text after it is scanned as
/// `float,float,float`.
pub fn parse_chunk(chunk: &[u8]) -> Result<RotationSample, FrameError> {
    let Some(newline) = chunk.iter().position(|&b| b == b'\n') else {
        return Err(FrameError::MissingDelimiter);
    };

    let tail = String::from_utf8_lossy(&chunk[newline + 1..]);
    parse_rotation(&tail)
}

/// Scan `x,y,z` from the start of `text`.
pub fn parse_rotation(text: &str) -> Result<RotationSample, FrameError> {
    let mut values = [0.0f32; 3];
    let mut fields = 0;
    let mut pos = 0;

    for (index, value) in values.iter_mut().enumerate() {
        if index > 0 {
            if text[pos..].starts_with(',') {
                pos += 1;
            } else {
                break;
            }
        }
        match scan_float(&text[pos..]) {
            Some((v, consumed)) => {
                *value = v;
                pos += consumed;
                fields += 1;
            }
            None => break,
        }
    }

    if fields == 3 {
        Ok(RotationSample::new(values[0], values[1], values[2]))
    } else {
        Err(FrameError::MalformedRotation {
            fields,
            tail: text.to_string(),
        })
    }
}

/// Scan the longest floating-point prefix of `text`.
///
/// Follows C `%f` conversion rules: leading whitespace is skipped, then an
/// optional sign followed by either a decimal number (digits with optional
/// fraction and exponent) or `inf`, `infinity`, `nan` in any case.
/// Returns the value and the number of bytes consumed.
fn scan_float(text: &str) -> Option<(f32, usize)> {
    let bytes = text.as_bytes();
    let mut i = 0;

    // C isspace: space, \t, \n, \v, \f, \r
    while i < bytes.len() && matches!(bytes[i], b' ' | b'\t'..=b'\r') {
        i += 1;
    }
    let start = i;

    let negative = match bytes.get(i) {
        Some(b'-') => {
            i += 1;
            true
        }
        Some(b'+') => {
            i += 1;
            false
        }
        _ => false,
    };

    let rest = &bytes[i..];
    for (word, value) in [
        ("infinity", f32::INFINITY),
        ("inf", f32::INFINITY),
        ("nan", f32::NAN),
    ] {
        if rest.len() >= word.len() && rest[..word.len()].eq_ignore_ascii_case(word.as_bytes()) {
            let v = if negative { -value } else { value };
            return Some((v, i + word.len()));
        }
    }

    let digits = |from: usize| bytes[from..].iter().take_while(|b| b.is_ascii_digit()).count();

    let int_digits = digits(i);
    i += int_digits;

    let mut frac_digits = 0;
    if bytes.get(i) == Some(&b'.') {
        frac_digits = digits(i + 1);
        if int_digits + frac_digits > 0 {
            i += 1 + frac_digits;
        }
    }

    if int_digits + frac_digits == 0 {
        return None;
    }

    if matches!(bytes.get(i), Some(b'e' | b'E')) {
        let mut j = i + 1;
        if matches!(bytes.get(j), Some(b'+' | b'-')) {
            j += 1;
        }
        let exp_digits = digits(j);
        if exp_digits > 0 {
            i = j + exp_digits;
        }
    }

    text[start..i].parse::<f32>().ok().map(|v| (v, i))
}

/// Accumulates bytes across reads and yields complete records.
///
/// A record is complete once two newlines have been seen: the end of the
/// ignored line and the end of the rotation line.
#[derive(Debug, Default)]
pub struct LineAssembler {
    pending: Vec<u8>,
}

impl LineAssembler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bytes waiting for the rest of their record
    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    /// Append a chunk and parse every record it completes.
    pub fn push(&mut self, chunk: &[u8]) -> Vec<Result<RotationSample, FrameError>> {
        self.pending.extend_from_slice(chunk);

        let mut results = Vec::new();
        while let Some(end) = self.record_end() {
            let record: Vec<u8> = self.pending.drain(..=end).collect();
            // Strip the terminating newline so the rotation tail ends cleanly
            results.push(parse_chunk(&record[..record.len() - 1]));
        }

        if self.pending.len() > MAX_PENDING_BYTES {
            let discarded = self.pending.len();
            self.pending.clear();
            results.push(Err(FrameError::Overflow {
                limit: MAX_PENDING_BYTES,
                discarded,
            }));
        }

        results
    }

    /// Index of the newline terminating the first complete record
    fn record_end(&self) -> Option<usize> {
        let first = self.pending.iter().position(|&b| b == b'\n')?;
        let second = self.pending[first + 1..].iter().position(|&b| b == b'\n')?;
        Some(first + 1 + second)
    }
}

/// Turns received chunks into rotation samples according to the framing mode
#[derive(Debug)]
pub struct FrameParser {
    mode: FramingMode,
    assembler: LineAssembler,
}

impl FrameParser {
    pub fn new(mode: FramingMode) -> Self {
        Self {
            mode,
            assembler: LineAssembler::new(),
        }
    }

    /// Feed one received chunk.
    ///
    /// In per-chunk mode this always yields exactly one result. In buffered
    /// mode it yields one result per completed record, possibly none.
    pub fn feed(&mut self, chunk: &[u8]) -> Vec<Result<RotationSample, FrameError>> {
        match self.mode {
            FramingMode::PerChunk => vec![parse_chunk(chunk)],
            FramingMode::Buffered => self.assembler.push(chunk),
        }
    }
}

impl Default for FrameParser {
    fn default() -> Self {
        Self::new(FramingMode::PerChunk)
    }
}
