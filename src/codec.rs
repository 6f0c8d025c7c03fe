//! Domain string <-> label path encoding.
//!
//! `"sub.example"` becomes `b"example\0sub\0"`: labels reversed so the
//! root-most label comes first, each one terminated by a zero byte. Because
//! every label ends in the sentinel, the encoding of a parent domain is a
//! byte prefix of the encoding of any of its subdomains, and of nothing else.

use std::{fmt, ops::Deref};

use num_bigint::BigUint;

use crate::dictionary::{BitKey, MAX_KEY_BITS};
use crate::error::{DnsError, Result};

pub const SENTINEL: u8 = 0;

#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct LabelPath(Vec<u8>);

impl Deref for LabelPath {
    type Target = [u8];
    fn deref(&self) -> &[u8] {
        let LabelPath(bytes) = self;
        return bytes;
    }
}

impl fmt::Debug for LabelPath {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "LabelPath({:?})", String::from_utf8_lossy(self))
    }
}

impl LabelPath {
    pub fn from_raw(bytes: Vec<u8>) -> LabelPath {
        LabelPath(bytes)
    }

    pub fn bit_len(&self) -> usize {
        self.len() * 8
    }

    pub fn to_key(&self) -> BitKey {
        BitKey::from_bytes(self)
    }

    pub fn into_bytes(self) -> Vec<u8> {
        let LabelPath(bytes) = self;
        return bytes;
    }
}

pub fn encode(domain: &str) -> Result<LabelPath> {
    let mut out = Vec::with_capacity(domain.len() + 1);
    if domain.is_empty() {
        return Ok(LabelPath(out));
    }
    for label in domain.split('.').rev() {
        if label.trim().is_empty() {
            return Err(invalid(domain, "empty label"));
        }
        if label.as_bytes().contains(&SENTINEL) {
            return Err(invalid(domain, "label contains the zero byte"));
        }
        out.extend_from_slice(label.as_bytes());
        out.push(SENTINEL);
    }
    return Ok(LabelPath(out));
}

pub fn decode(bytes: &[u8]) -> Result<String> {
    let mut labels: Vec<&[u8]> = bytes.split(|b| *b == SENTINEL).collect();
    while labels.last().map_or(false, |l| l.is_empty()) {
        labels.pop();
    }
    let mut out = Vec::with_capacity(labels.len());
    for label in labels.iter().rev() {
        match std::str::from_utf8(label) {
            Ok(s) => out.push(s),
            Err(_) => {
                let lossy = String::from_utf8_lossy(bytes).into_owned();
                return Err(DnsError::InvalidLabel { domain: lossy, reason: "label is not UTF-8" });
            }
        }
    }
    return Ok(out.join("."));
}

pub fn decode_uint(key: &BigUint) -> Result<String> {
    let bytes = key.to_bytes_be();
    let width = MAX_KEY_BITS / 8;
    if bytes.len() > width {
        return Err(DnsError::KeyTooLong { bits: bytes.len() * 8 });
    }
    let mut padded = vec![0u8; width - bytes.len()];
    padded.extend_from_slice(&bytes);
    return decode(&padded);
}

fn invalid(domain: &str, reason: &'static str) -> DnsError {
    DnsError::InvalidLabel { domain: domain.to_string(), reason }
}
