use std::{convert::TryFrom, fmt, str::FromStr};

use nom::{bytes::complete::take, number::complete::be_i8, IResult};
use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct AccountRef {
    pub workchain: i8,
    pub hash: [u8; 32],
}

pub const ACCOUNT_BYTES: usize = 33;

#[derive(Debug, PartialEq, Eq, Clone)]
pub struct AccountParseError(String);

impl fmt::Display for AccountParseError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "failed to parse account {:?}", self.0)
    }
}

impl std::error::Error for AccountParseError {}

impl AccountRef {
    pub fn new(workchain: i8, hash: [u8; 32]) -> AccountRef {
        AccountRef { workchain, hash }
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(ACCOUNT_BYTES);
        out.push(self.workchain as u8);
        out.extend_from_slice(&self.hash);
        return out;
    }

    pub(crate) fn parse(input: &[u8]) -> IResult<&[u8], AccountRef> {
        let (input, workchain) = be_i8(input)?;
        let (input, raw) = take(32usize)(input)?;
        let mut hash = [0u8; 32];
        hash.copy_from_slice(raw);
        return Ok((input, AccountRef { workchain, hash }));
    }
}

impl fmt::Display for AccountRef {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}:{}", self.workchain, hex::encode(self.hash))
    }
}

impl fmt::Debug for AccountRef {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "AccountRef({})", self)
    }
}

impl FromStr for AccountRef {
    type Err = AccountParseError;

    fn from_str(s: &str) -> Result<AccountRef, AccountParseError> {
        let err = || AccountParseError(s.to_string());
        let mut parts = s.splitn(2, ':');
        let workchain = match parts.next().map(i8::from_str) {
            Some(Ok(v)) => v,
            _ => return Err(err()),
        };
        let raw = match parts.next().map(hex::decode) {
            Some(Ok(v)) => v,
            _ => return Err(err()),
        };
        if raw.len() != 32 {
            return Err(err());
        }
        let mut hash = [0u8; 32];
        hash.copy_from_slice(&raw);
        return Ok(AccountRef { workchain, hash });
    }
}

impl TryFrom<String> for AccountRef {
    type Error = AccountParseError;

    fn try_from(s: String) -> Result<AccountRef, AccountParseError> {
        AccountRef::from_str(&s)
    }
}

impl From<AccountRef> for String {
    fn from(account: AccountRef) -> String {
        account.to_string()
    }
}
