use std::collections::{BTreeMap, HashMap, HashSet};

use tracing::debug;

use crate::account::AccountRef;
use crate::category::{CategoryId, Record};
use crate::codec;
use crate::dictionary::{BitKey, Bundle, PrefixDict};
use crate::error::{DnsError, Result};

/// Outcome of one `dnsresolve` query.
///
/// `bits` is how much of the query this resolver consumed. Zero means
/// nothing matched here. When `delegated` is set the payload is a
/// next-resolver record and the caller should ask that resolver about the
/// remaining bits.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolution {
    pub bits: u32,
    pub payload: Option<Vec<u8>>,
    pub delegated: bool,
}

impl Resolution {
    pub fn unresolved() -> Resolution {
        Resolution { bits: 0, payload: None, delegated: false }
    }

    pub fn is_resolved(&self) -> bool {
        self.bits > 0 || self.payload.is_some()
    }

    pub fn next_resolver(&self) -> Result<Option<AccountRef>> {
        if !self.delegated {
            return Ok(None);
        }
        let payload = match &self.payload {
            Some(p) => p,
            None => return Ok(None),
        };
        return match Record::parse(CategoryId::NEXT_RESOLVER, payload)? {
            Some(Record::NextResolver(account)) => Ok(Some(account)),
            _ => Ok(None),
        };
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct DnsData {
    pub wallet: Option<AccountRef>,
    pub next_resolver: Option<AccountRef>,
    pub site: Option<[u8; 32]>,
    pub storage: Option<[u8; 32]>,
    /// Categories present but not decoded: unknown ids or malformed payloads.
    pub other: Vec<CategoryId>,
}

impl DnsData {
    pub fn from_bundle(bundle: &Bundle) -> DnsData {
        let mut data = DnsData::default();
        for (category, payload) in bundle.iter() {
            match Record::parse(*category, payload) {
                Ok(Some(Record::Wallet(account))) => data.wallet = Some(account),
                Ok(Some(Record::NextResolver(account))) => data.next_resolver = Some(account),
                Ok(Some(Record::Site(adnl))) => data.site = Some(adnl),
                Ok(Some(Record::Storage(bag_id))) => data.storage = Some(bag_id),
                _ => data.other.push(*category),
            }
        }
        return data;
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolver {
    pub(crate) administrator: AccountRef,
    pub(crate) dict: PrefixDict,
}

impl Resolver {
    pub fn new(administrator: AccountRef, dict: PrefixDict) -> Resolver {
        Resolver { administrator, dict }
    }

    pub fn administrator(&self) -> &AccountRef {
        &self.administrator
    }

    pub fn dictionary(&self) -> &PrefixDict {
        &self.dict
    }

    pub fn resolve(&self, domain: &str, category: CategoryId) -> Result<Resolution> {
        let path = codec::encode(domain)?;
        return self.resolve_bits(&path.to_key(), category);
    }

    pub fn dnsresolve(&self, subdomain: &[u8], category: CategoryId) -> Result<Resolution> {
        self.resolve_bits(&BitKey::from_bytes(subdomain), category)
    }

    pub fn resolve_bits(&self, query: &BitKey, category: CategoryId) -> Result<Resolution> {
        let prefixes = self.dict.prefixes(query);
        let (len, bundle) = match prefixes.last() {
            Some(found) => *found,
            None => {
                debug!(query = ?query, category = %category, "no matching prefix");
                return Ok(Resolution::unresolved());
            }
        };
        let bits = len as u32;

        if category.is_all() {
            return Ok(Resolution { bits, payload: Some(bundle.to_bytes()?), delegated: false });
        }
        if let Some(payload) = bundle.get(&category) {
            debug!(bits, category = %category, "resolved");
            return Ok(Resolution { bits, payload: Some(payload.to_vec()), delegated: false });
        }
        for (len, bundle) in prefixes.iter().rev() {
            if let Some(payload) = bundle.get(&CategoryId::NEXT_RESOLVER) {
                debug!(bits = *len, category = %category, "delegating");
                return Ok(Resolution {
                    bits: *len as u32,
                    payload: Some(payload.to_vec()),
                    delegated: true,
                });
            }
        }
        debug!(bits, category = %category, "prefix matched, category not set");
        return Ok(Resolution { bits, payload: None, delegated: false });
    }

    /// Every stored path with its decoded records. Keys that are not the
    /// canonical encoding of their decoded name are listed as `0x<hex>/<bits>`.
    pub fn enumerate(&self) -> BTreeMap<String, DnsData> {
        let mut out = BTreeMap::new();
        for (key, bundle) in self.dict.iter() {
            let name = match codec::decode(key.as_bytes()) {
                Ok(name) if Resolver::is_canonical(&name, &key) => name,
                _ => format!("0x{}/{}", hex::encode(key.as_bytes()), key.len()),
            };
            out.insert(name, DnsData::from_bundle(bundle));
        }
        return out;
    }

    fn is_canonical(name: &str, key: &BitKey) -> bool {
        match codec::encode(name) {
            Ok(path) => path.to_key() == *key,
            Err(_) => false,
        }
    }
}

pub trait ResolverDirectory {
    fn lookup(&self, account: &AccountRef) -> Option<&Resolver>;
}

impl ResolverDirectory for HashMap<AccountRef, Resolver> {
    fn lookup(&self, account: &AccountRef) -> Option<&Resolver> {
        self.get(account)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChainResolution {
    pub bits: u32,
    pub payload: Option<Vec<u8>>,
    pub hops: usize,
    pub resolver: AccountRef,
}

pub const DEFAULT_MAX_HOPS: usize = 8;

/// Resolves `domain` starting at `start`, following next-resolver records
/// through `directory` until some resolver answers without delegating.
pub fn follow_chain<D: ResolverDirectory>(
    directory: &D,
    start: AccountRef,
    domain: &str,
    category: CategoryId,
    max_hops: usize,
) -> Result<ChainResolution> {
    let mut query = codec::encode(domain)?.to_key();
    let mut current = start;
    let mut visited = HashSet::new();
    visited.insert(current);
    let mut consumed: u32 = 0;
    let mut hops = 0;

    loop {
        let resolver = match directory.lookup(&current) {
            Some(r) => r,
            None => return Err(DnsError::UnknownResolver(current)),
        };
        let resolution = resolver.resolve_bits(&query, category)?;
        let next = match resolution.next_resolver()? {
            Some(next) => next,
            None => {
                return Ok(ChainResolution {
                    bits: consumed + resolution.bits,
                    payload: resolution.payload,
                    hops,
                    resolver: current,
                });
            }
        };

        hops += 1;
        if hops > max_hops {
            return Err(DnsError::HopLimitExceeded(max_hops));
        }
        if !visited.insert(next) {
            return Err(DnsError::DelegationCycle(next));
        }
        debug!(from = %current, to = %next, bits = resolution.bits, "following next resolver");
        consumed += resolution.bits;
        query = query.suffix(resolution.bits as usize);
        current = next;
    }
}
