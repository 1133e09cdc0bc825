//! Telemetry text codec
//!
//! Wire format: six decimal numbers separated by single spaces, in the order
//! `phi theta psi latitude longitude altitude`, no terminator:
//!
//! ```text
//! 11.123456 -10.123456 90.123456 47.26045 11.34712 914.4
//! ```
//!
//! Decoding treats any run of ASCII whitespace as one separator and ignores
//! leading/trailing whitespace. A payload is cut at its first NUL byte.
//! What happens with bad or surplus tokens depends on [`DecodePolicy`].

use super::{until_nul, DatagramCodec};
use crate::constants::{DEFAULT_MAX_DATAGRAM_LEN, DEFAULT_PRECISION, FIELD_COUNT, MAX_PRECISION};
use crate::error::MalformedDatagram;
use crate::record::{Field, TelemetryRecord};
use serde::{Deserialize, Serialize};
use std::fmt::Write;

/// How the decoder treats tokens it cannot use
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum DecodePolicy {
    /// Exactly six numeric tokens
    Strict,
    /// Six numeric tokens, anything after the sixth is ignored
    #[default]
    Lenient,
    /// `atof` behaviour: numeric prefix of each token, `0.0` when there is
    /// none; anything after the sixth token is ignored
    Compat,
}

/// Codec for the six-field telemetry text format
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TelemetryCodec {
    policy: DecodePolicy,
    precision: usize,
    max_len: usize,
}

impl TelemetryCodec {
    /// `precision` is clamped to [`MAX_PRECISION`] fractional digits
    pub fn new(policy: DecodePolicy, precision: usize, max_len: usize) -> Self {
        Self {
            policy,
            precision: precision.min(MAX_PRECISION),
            max_len,
        }
    }

    pub fn with_policy(policy: DecodePolicy) -> Self {
        Self {
            policy,
            ..Self::default()
        }
    }

    pub fn policy(&self) -> DecodePolicy {
        self.policy
    }

    pub fn precision(&self) -> usize {
        self.precision
    }

    pub fn max_len(&self) -> usize {
        self.max_len
    }

    /// Encode a record into a fresh buffer
    pub fn encode_to_vec(&self, record: &TelemetryRecord) -> Vec<u8> {
        let mut out = Vec::with_capacity(FIELD_COUNT * (self.precision + 8));
        self.encode(record, &mut out);
        out
    }

    fn parse_token(&self, field: Field, token: &[u8]) -> Result<f64, MalformedDatagram> {
        if self.policy == DecodePolicy::Compat {
            return Ok(parse_numeric_prefix(token));
        }

        std::str::from_utf8(token)
            .ok()
            .and_then(|s| s.parse::<f64>().ok())
            .ok_or_else(|| MalformedDatagram::InvalidNumber {
                field,
                token: String::from_utf8_lossy(token).into_owned(),
            })
    }
}

impl Default for TelemetryCodec {
    fn default() -> Self {
        Self::new(
            DecodePolicy::default(),
            DEFAULT_PRECISION,
            DEFAULT_MAX_DATAGRAM_LEN,
        )
    }
}

impl DatagramCodec for TelemetryCodec {
    type Item = TelemetryRecord;

    fn decode(&self, payload: &[u8]) -> Result<TelemetryRecord, MalformedDatagram> {
        if payload.len() > self.max_len {
            return Err(MalformedDatagram::Oversized {
                len: payload.len(),
                max: self.max_len,
            });
        }

        let mut tokens = tokenize(until_nul(payload));
        let mut values = [0.0f64; FIELD_COUNT];

        for (i, field) in Field::ALL.iter().enumerate() {
            let token = tokens
                .next()
                .ok_or(MalformedDatagram::TooFewTokens { found: i })?;
            values[i] = self.parse_token(*field, token)?;
        }

        if self.policy == DecodePolicy::Strict {
            let surplus = tokens.count();
            if surplus > 0 {
                return Err(MalformedDatagram::TooManyTokens {
                    found: FIELD_COUNT + surplus,
                });
            }
        }

        Ok(TelemetryRecord::from_fields(values))
    }

    fn encode(&self, record: &TelemetryRecord, output: &mut Vec<u8>) {
        let mut text = String::with_capacity(FIELD_COUNT * (self.precision + 8));
        for (i, value) in record.fields().iter().enumerate() {
            if i > 0 {
                text.push(' ');
            }
            // Writing into a String cannot fail
            let _ = write!(text, "{:.*}", self.precision, value);
        }
        output.extend_from_slice(text.as_bytes());
    }
}

/// Non-empty tokens separated by runs of ASCII whitespace
fn tokenize(payload: &[u8]) -> impl Iterator<Item = &[u8]> {
    payload
        .split(|b| b.is_ascii_whitespace())
        .filter(|t| !t.is_empty())
}

/// Parse the longest numeric prefix of `token`, `0.0` if there is none
///
/// Accepts `[+-]digits[.digits][(e|E)[+-]digits]`, `.digits`, hexadecimal
/// `0x` forms with an optional binary exponent, and the case-insensitive
/// words `inf`, `infinity` and `nan`.
fn parse_numeric_prefix(token: &[u8]) -> f64 {
    let mut i = 0;
    if matches!(token.first(), Some(b'+') | Some(b'-')) {
        i += 1;
    }
    let negate = |v: f64| if token.first() == Some(&b'-') { -v } else { v };

    if let Some(value) = parse_hex_prefix(&token[i..]) {
        return negate(value);
    }

    let int_start = i;
    while token.get(i).is_some_and(u8::is_ascii_digit) {
        i += 1;
    }
    let mut mantissa_digits = i - int_start;

    if token.get(i) == Some(&b'.') {
        let frac_start = i + 1;
        let mut j = frac_start;
        while token.get(j).is_some_and(u8::is_ascii_digit) {
            j += 1;
        }
        if mantissa_digits > 0 || j > frac_start {
            mantissa_digits += j - frac_start;
            i = j;
        }
    }

    if mantissa_digits == 0 {
        return parse_special(&token[int_start..])
            .map(negate)
            .unwrap_or(0.0);
    }

    if matches!(token.get(i), Some(b'e') | Some(b'E')) {
        let mut j = i + 1;
        if matches!(token.get(j), Some(b'+') | Some(b'-')) {
            j += 1;
        }
        let exp_start = j;
        while token.get(j).is_some_and(u8::is_ascii_digit) {
            j += 1;
        }
        if j > exp_start {
            i = j;
        }
    }

    std::str::from_utf8(&token[..i])
        .ok()
        .and_then(|s| s.parse::<f64>().ok())
        .unwrap_or(0.0)
}

/// `0x[hex][.hex][(p|P)[+-]digits]`, `None` without a hex digit after `0x`
fn parse_hex_prefix(rest: &[u8]) -> Option<f64> {
    if !(rest.len() > 2 && rest[0] == b'0' && matches!(rest[1], b'x' | b'X')) {
        return None;
    }
    let hex_digit = |i: usize| rest.get(i).and_then(|b| char::from(*b).to_digit(16));

    let mut i = 2;
    let mut value = 0.0f64;
    let mut digits = 0usize;
    while let Some(d) = hex_digit(i) {
        value = value * 16.0 + f64::from(d);
        digits += 1;
        i += 1;
    }

    if rest.get(i) == Some(&b'.') {
        let mut j = i + 1;
        let mut scale = 1.0 / 16.0;
        let mut fraction = 0.0f64;
        while let Some(d) = hex_digit(j) {
            fraction += f64::from(d) * scale;
            scale /= 16.0;
            j += 1;
        }
        if digits > 0 || j > i + 1 {
            digits += j - (i + 1);
            value += fraction;
            i = j;
        }
    }

    if digits == 0 {
        return None;
    }

    if matches!(rest.get(i), Some(b'p') | Some(b'P')) {
        let mut j = i + 1;
        let negative = rest.get(j) == Some(&b'-');
        if matches!(rest.get(j), Some(b'+') | Some(b'-')) {
            j += 1;
        }
        let exp_start = j;
        let mut exponent = 0i32;
        while let Some(d) = rest.get(j).filter(|b| b.is_ascii_digit()) {
            exponent = exponent.saturating_mul(10).saturating_add(i32::from(d - b'0'));
            j += 1;
        }
        if j > exp_start {
            value *= 2f64.powi(if negative { -exponent } else { exponent });
        }
    }

    Some(value)
}

fn parse_special(rest: &[u8]) -> Option<f64> {
    let starts_with = |word: &[u8]| {
        rest.len() >= word.len() && rest[..word.len()].eq_ignore_ascii_case(word)
    };
    if starts_with(b"inf") {
        Some(f64::INFINITY)
    } else if starts_with(b"nan") {
        Some(f64::NAN)
    } else {
        None
    }
}
