use std::{fmt, str::FromStr};

use nom::{
    bytes::complete::take,
    combinator::{all_consuming, opt},
    error::{Error, ErrorKind},
    number::complete::{be_u16, be_u8},
    IResult,
};
use num_bigint::BigUint;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::account::AccountRef;
use crate::error::{DnsError, Result};

#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CategoryId(pub [u8; 32]);

impl CategoryId {
    /// Zero id: asks for every category at the matched path.
    pub const ALL: CategoryId = CategoryId([0; 32]);

    pub const WALLET: CategoryId = CategoryId([
        0xe8, 0xd4, 0x40, 0x50, 0x87, 0x3d, 0xba, 0x86,
        0x5a, 0xa7, 0xc1, 0x70, 0xab, 0x4c, 0xce, 0x64,
        0xd9, 0x08, 0x39, 0xa3, 0x4d, 0xcf, 0xd6, 0xcf,
        0x71, 0xd1, 0x4e, 0x02, 0x05, 0x44, 0x3b, 0x1b,
    ]);
    pub const NEXT_RESOLVER: CategoryId = CategoryId([
        0x19, 0xf0, 0x24, 0x41, 0xee, 0x58, 0x8f, 0xdb,
        0x26, 0xee, 0x24, 0xb2, 0x56, 0x8d, 0xd0, 0x35,
        0xc3, 0xc9, 0x20, 0x6e, 0x11, 0xab, 0x97, 0x9b,
        0xe6, 0x2e, 0x55, 0x55, 0x8a, 0x1d, 0x17, 0xff,
    ]);
    pub const SITE: CategoryId = CategoryId([
        0xfb, 0xae, 0x04, 0x1b, 0x02, 0xc4, 0x1e, 0xd0,
        0xfd, 0x8a, 0x4e, 0xfb, 0x03, 0x9b, 0xc7, 0x80,
        0xdd, 0x6a, 0xf4, 0xa1, 0xf0, 0xc4, 0x20, 0xf4,
        0x25, 0x61, 0xae, 0x70, 0x5d, 0xda, 0x43, 0xfe,
    ]);
    pub const STORAGE: CategoryId = CategoryId([
        0x49, 0xa2, 0x5f, 0x9f, 0xee, 0xfa, 0xff, 0xec,
        0xad, 0x0f, 0xcd, 0x30, 0xc5, 0x0d, 0xc9, 0x33,
        0x1c, 0xff, 0x8b, 0x55, 0xec, 0xe5, 0x3d, 0xef,
        0x62, 0x85, 0xc0, 0x9e, 0x17, 0xe6, 0xf5, 0xd7,
    ]);

    pub fn from_name(name: &str) -> CategoryId {
        let digest = Sha256::digest(name.as_bytes());
        let mut id = [0u8; 32];
        id.copy_from_slice(&digest);
        return CategoryId(id);
    }

    pub fn from_uint(n: &BigUint) -> Option<CategoryId> {
        let bytes = n.to_bytes_be();
        if bytes.len() > 32 {
            return None;
        }
        let mut id = [0u8; 32];
        id[32 - bytes.len()..].copy_from_slice(&bytes);
        return Some(CategoryId(id));
    }

    pub fn to_uint(&self) -> BigUint {
        BigUint::from_bytes_be(&self.0)
    }

    pub fn is_all(&self) -> bool {
        *self == CategoryId::ALL
    }

    pub fn name(&self) -> Option<&'static str> {
        match *self {
            CategoryId::WALLET => Some("wallet"),
            CategoryId::NEXT_RESOLVER => Some("dns_next_resolver"),
            CategoryId::SITE => Some("site"),
            CategoryId::STORAGE => Some("storage"),
            _ => None,
        }
    }
}

impl fmt::Display for CategoryId {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self.name() {
            Some(name) => write!(f, "{}", name),
            None => write!(f, "0x{}", hex::encode(self.0)),
        }
    }
}

impl fmt::Debug for CategoryId {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "CategoryId({})", self)
    }
}

impl FromStr for CategoryId {
    type Err = DnsError;

    fn from_str(s: &str) -> Result<CategoryId> {
        let known = [
            CategoryId::WALLET,
            CategoryId::NEXT_RESOLVER,
            CategoryId::SITE,
            CategoryId::STORAGE,
        ];
        if let Some(id) = known.iter().find(|id| id.name() == Some(s)) {
            return Ok(*id);
        }
        let digits = s.trim_start_matches("0x");
        return BigUint::parse_bytes(digits.as_bytes(), 16)
            .and_then(|n| CategoryId::from_uint(&n))
            .ok_or_else(|| DnsError::Config(format!("bad category id {:?}", s)));
    }
}

pub const TAG_WALLET: u16 = 0x9fd3;
pub const TAG_NEXT_RESOLVER: u16 = 0xba93;
pub const TAG_SITE: u16 = 0xad01;
pub const TAG_STORAGE: u16 = 0x7473;

#[derive(Debug, PartialEq, Eq, Clone)]
pub enum Record {
    Wallet(AccountRef),
    NextResolver(AccountRef),
    Site([u8; 32]),
    Storage([u8; 32]),
}

impl Record {
    pub fn category(&self) -> CategoryId {
        match self {
            Record::Wallet(_) => CategoryId::WALLET,
            Record::NextResolver(_) => CategoryId::NEXT_RESOLVER,
            Record::Site(_) => CategoryId::SITE,
            Record::Storage(_) => CategoryId::STORAGE,
        }
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(36);
        match self {
            Record::Wallet(account) => {
                out.extend_from_slice(&TAG_WALLET.to_be_bytes());
                out.extend_from_slice(&account.to_bytes());
                out.push(0);
            }
            Record::NextResolver(account) => {
                out.extend_from_slice(&TAG_NEXT_RESOLVER.to_be_bytes());
                out.extend_from_slice(&account.to_bytes());
            }
            Record::Site(adnl) => {
                out.extend_from_slice(&TAG_SITE.to_be_bytes());
                out.extend_from_slice(adnl);
                out.push(0);
            }
            Record::Storage(bag_id) => {
                out.extend_from_slice(&TAG_STORAGE.to_be_bytes());
                out.extend_from_slice(bag_id);
                out.push(0);
            }
        }
        return out;
    }

    pub fn parse(category: CategoryId, payload: &[u8]) -> Result<Option<Record>> {
        let parsed = match category {
            CategoryId::WALLET => all_consuming(Record::parse_wallet)(payload),
            CategoryId::NEXT_RESOLVER => all_consuming(Record::parse_next_resolver)(payload),
            CategoryId::SITE => all_consuming(Record::parse_site)(payload),
            CategoryId::STORAGE => all_consuming(Record::parse_storage)(payload),
            _ => return Ok(None),
        };
        return match parsed {
            Ok((_, record)) => Ok(Some(record)),
            Err(e) => Err(DnsError::MalformedPayload {
                category: category.to_string(),
                reason: format!("{} byte payload does not fit layout ({:?})", payload.len(), e),
            }),
        };
    }

    fn expect_tag(input: &[u8], expected: u16) -> IResult<&[u8], u16> {
        let (rest, tag) = be_u16(input)?;
        if tag != expected {
            return Err(nom::Err::Error(Error::new(input, ErrorKind::Tag)));
        }
        return Ok((rest, tag));
    }

    fn parse_wallet(input: &[u8]) -> IResult<&[u8], Record> {
        let (input, _) = Record::expect_tag(input, TAG_WALLET)?;
        let (input, account) = AccountRef::parse(input)?;
        let (input, _) = opt(be_u8)(input)?;
        return Ok((input, Record::Wallet(account)));
    }

    fn parse_next_resolver(input: &[u8]) -> IResult<&[u8], Record> {
        let (input, _) = Record::expect_tag(input, TAG_NEXT_RESOLVER)?;
        let (input, account) = AccountRef::parse(input)?;
        return Ok((input, Record::NextResolver(account)));
    }

    fn parse_site(input: &[u8]) -> IResult<&[u8], Record> {
        let (input, _) = Record::expect_tag(input, TAG_SITE)?;
        let (input, adnl) = Record::parse_bytes32(input)?;
        let (input, _) = opt(be_u8)(input)?;
        return Ok((input, Record::Site(adnl)));
    }

    fn parse_storage(input: &[u8]) -> IResult<&[u8], Record> {
        let (input, _) = Record::expect_tag(input, TAG_STORAGE)?;
        let (input, bag_id) = Record::parse_bytes32(input)?;
        let (input, _) = opt(be_u8)(input)?;
        return Ok((input, Record::Storage(bag_id)));
    }

    fn parse_bytes32(input: &[u8]) -> IResult<&[u8], [u8; 32]> {
        let (input, raw) = take(32usize)(input)?;
        let mut out = [0u8; 32];
        out.copy_from_slice(raw);
        return Ok((input, out));
    }
}
