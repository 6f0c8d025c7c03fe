use std::{collections::BTreeMap, fmt};

use num_bigint::BigUint;
use serde::{Deserialize, Serialize};

use crate::category::CategoryId;
use crate::error::{DnsError, Result};

pub const MAX_KEY_BITS: usize = 256;

/// Bit string, most significant bit of each byte first. Padding bits in the
/// last byte are always zero.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
pub struct BitKey {
    bytes: Vec<u8>,
    len: usize,
}

impl BitKey {
    pub fn new() -> BitKey {
        BitKey::default()
    }

    pub fn from_bytes(bytes: &[u8]) -> BitKey {
        BitKey { bytes: bytes.to_vec(), len: bytes.len() * 8 }
    }

    pub fn from_bits(bytes: &[u8], len: usize) -> BitKey {
        let len = len.min(bytes.len() * 8);
        let mut out = bytes[..(len + 7) / 8].to_vec();
        if len % 8 != 0 {
            if let Some(last) = out.last_mut() {
                *last &= 0xffu8 << (8 - len % 8);
            }
        }
        return BitKey { bytes: out, len };
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn is_byte_aligned(&self) -> bool {
        self.len % 8 == 0
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn bit(&self, i: usize) -> bool {
        (self.bytes[i / 8] >> (7 - i % 8)) & 1 == 1
    }

    pub fn push(&mut self, bit: bool) {
        if self.len % 8 == 0 {
            self.bytes.push(0);
        }
        if bit {
            self.bytes[self.len / 8] |= 0x80u8 >> (self.len % 8);
        }
        self.len += 1;
    }

    pub fn pop(&mut self) -> Option<bool> {
        if self.len == 0 {
            return None;
        }
        self.len -= 1;
        let bit = self.bit(self.len);
        self.bytes[self.len / 8] &= !(0x80u8 >> (self.len % 8));
        if self.len % 8 == 0 {
            self.bytes.pop();
        }
        return Some(bit);
    }

    pub fn prefix(&self, len: usize) -> BitKey {
        BitKey::from_bits(&self.bytes, len.min(self.len))
    }

    pub fn suffix(&self, from: usize) -> BitKey {
        if from % 8 == 0 {
            let start = (from / 8).min(self.bytes.len());
            return BitKey::from_bits(&self.bytes[start..], self.len.saturating_sub(from));
        }
        let mut out = BitKey::new();
        for i in from..self.len {
            out.push(self.bit(i));
        }
        return out;
    }

    pub fn starts_with(&self, other: &BitKey) -> bool {
        other.len <= self.len && self.prefix(other.len) == *other
    }

    /// Key as the host dictionary stores it: left aligned in a 256-bit
    /// unsigned integer, zero padded.
    pub fn to_uint(&self) -> Option<BigUint> {
        if self.len > MAX_KEY_BITS {
            return None;
        }
        let mut buf = self.bytes.clone();
        buf.resize(MAX_KEY_BITS / 8, 0);
        return Some(BigUint::from_bytes_be(&buf));
    }
}

impl fmt::Debug for BitKey {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "BitKey({}/{})", hex::encode(&self.bytes), self.len)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Bundle {
    records: BTreeMap<CategoryId, Vec<u8>>,
}

impl Bundle {
    pub fn new() -> Bundle {
        Bundle::default()
    }

    pub fn get(&self, category: &CategoryId) -> Option<&[u8]> {
        self.records.get(category).map(|v| v.as_slice())
    }

    pub fn contains(&self, category: &CategoryId) -> bool {
        self.records.contains_key(category)
    }

    pub fn insert(&mut self, category: CategoryId, payload: Vec<u8>) -> Option<Vec<u8>> {
        self.records.insert(category, payload)
    }

    pub fn remove(&mut self, category: &CategoryId) -> Option<Vec<u8>> {
        self.records.remove(category)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&CategoryId, &Vec<u8>)> {
        self.records.iter()
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        Ok(bincode::serialize(self)?)
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Bundle> {
        Ok(bincode::deserialize(bytes)?)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
struct Node {
    bundle: Option<Bundle>,
    children: [Option<Box<Node>>; 2],
}

impl Node {
    fn is_vacant(&self) -> bool {
        self.bundle.is_none() && self.children.iter().all(|c| c.is_none())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct PrefixDict {
    root: Node,
    len: usize,
}

impl PrefixDict {
    pub fn new() -> PrefixDict {
        PrefixDict::default()
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    fn node(&self, key: &BitKey) -> Option<&Node> {
        let mut node = &self.root;
        for i in 0..key.len() {
            node = node.children[key.bit(i) as usize].as_deref()?;
        }
        return Some(node);
    }

    pub fn get(&self, key: &BitKey) -> Option<&Bundle> {
        self.node(key).and_then(|n| n.bundle.as_ref())
    }

    /// Stores `bundle` under exactly `key`. An empty bundle removes the key.
    pub fn set(&mut self, key: &BitKey, bundle: Bundle) -> Result<Option<Bundle>> {
        if key.len() > MAX_KEY_BITS {
            return Err(DnsError::KeyTooLong { bits: key.len() });
        }
        if bundle.is_empty() {
            return Ok(self.remove(key));
        }
        let mut node = &mut self.root;
        for i in 0..key.len() {
            node = &mut **node.children[key.bit(i) as usize].get_or_insert_with(Box::default);
        }
        let old = node.bundle.replace(bundle);
        if old.is_none() {
            self.len += 1;
        }
        return Ok(old);
    }

    pub fn remove(&mut self, key: &BitKey) -> Option<Bundle> {
        let removed = PrefixDict::remove_at(&mut self.root, key, 0);
        if removed.is_some() {
            self.len -= 1;
        }
        return removed;
    }

    fn remove_at(node: &mut Node, key: &BitKey, depth: usize) -> Option<Bundle> {
        if depth == key.len() {
            return node.bundle.take();
        }
        let b = key.bit(depth) as usize;
        let removed = match node.children[b].as_mut() {
            Some(child) => PrefixDict::remove_at(child, key, depth + 1),
            None => return None,
        };
        if node.children[b].as_ref().map_or(false, |c| c.is_vacant()) {
            node.children[b] = None;
        }
        return removed;
    }

    /// Stored entry whose key is the longest bit prefix of `query`, with the
    /// matched length in bits.
    pub fn longest_prefix(&self, query: &BitKey) -> Option<(BitKey, usize, &Bundle)> {
        return self
            .prefixes(query)
            .pop()
            .map(|(len, bundle)| (query.prefix(len), len, bundle));
    }

    /// Every stored entry whose key is a bit prefix of `query`, shortest first.
    pub fn prefixes(&self, query: &BitKey) -> Vec<(usize, &Bundle)> {
        let mut out = Vec::new();
        let mut node = &self.root;
        if let Some(bundle) = node.bundle.as_ref() {
            out.push((0, bundle));
        }
        for i in 0..query.len() {
            node = match node.children[query.bit(i) as usize].as_deref() {
                Some(child) => child,
                None => break,
            };
            if let Some(bundle) = node.bundle.as_ref() {
                out.push((i + 1, bundle));
            }
        }
        return out;
    }

    pub fn iter(&self) -> Vec<(BitKey, &Bundle)> {
        let mut out = Vec::with_capacity(self.len);
        let mut key = BitKey::new();
        PrefixDict::collect(&self.root, &mut key, &mut out);
        return out;
    }

    fn collect<'a>(node: &'a Node, key: &mut BitKey, out: &mut Vec<(BitKey, &'a Bundle)>) {
        if let Some(bundle) = node.bundle.as_ref() {
            out.push((key.clone(), bundle));
        }
        for (bit, child) in node.children.iter().enumerate() {
            if let Some(child) = child.as_deref() {
                key.push(bit == 1);
                PrefixDict::collect(child, key, out);
                key.pop();
            }
        }
    }
}
