//! Binary bodies of the messages a resolver instance accepts and sends.
//!
//! ```text
//! deploy:  op:u32
//! update:  op:u32 domain:bytes 0x00 category:[u8; 32] flag:u8 (len:u16 payload)?
//! delete:  op:u32 domain:bytes 0x00
//! confirm: OP_EXCESSES:u32 op:u32
//! ```
//! Integers are big-endian. `flag` is 0 for "clear", 1 when a payload follows.

use nom::{
    bytes::complete::{tag, take, take_while},
    combinator::map_res,
    error::{Error, ErrorKind},
    multi::length_data,
    number::complete::{be_u16, be_u32, be_u8},
    IResult,
};

use crate::account::AccountRef;
use crate::category::{CategoryId, Record};
use crate::codec::SENTINEL;
use crate::error::{DnsError, Result};

pub const OP_DEPLOY: u32 = 0x12345678;
pub const OP_UPDATE: u32 = 0x537a3491;
pub const OP_DELETE: u32 = 0x537a3492;
pub const OP_EXCESSES: u32 = 0xd53276db;

#[derive(Debug, PartialEq, Eq, Clone)]
pub enum Command {
    Deploy,
    Update {
        domain: String,
        category: CategoryId,
        payload: Option<Vec<u8>>,
    },
    Delete {
        domain: String,
    },
}

impl Command {
    pub fn op(&self) -> u32 {
        match self {
            Command::Deploy => OP_DEPLOY,
            Command::Update { .. } => OP_UPDATE,
            Command::Delete { .. } => OP_DELETE,
        }
    }

    pub fn set_next_resolver(domain: &str, resolver: AccountRef) -> Command {
        Command::record(domain, Record::NextResolver(resolver))
    }

    pub fn set_wallet(domain: &str, wallet: Option<AccountRef>) -> Command {
        Command::Update {
            domain: domain.to_string(),
            category: CategoryId::WALLET,
            payload: wallet.map(|w| Record::Wallet(w).to_bytes()),
        }
    }

    pub fn set_site(domain: &str, adnl: [u8; 32]) -> Command {
        Command::record(domain, Record::Site(adnl))
    }

    pub fn set_storage(domain: &str, bag_id: [u8; 32]) -> Command {
        Command::record(domain, Record::Storage(bag_id))
    }

    fn record(domain: &str, record: Record) -> Command {
        Command::Update {
            domain: domain.to_string(),
            category: record.category(),
            payload: Some(record.to_bytes()),
        }
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        let mut out = Vec::new();
        out.extend_from_slice(&self.op().to_be_bytes());
        match self {
            Command::Deploy => (),
            Command::Update { domain, category, payload } => {
                out.extend_from_slice(domain.as_bytes());
                out.push(SENTINEL);
                out.extend_from_slice(&category.0);
                match payload {
                    None => out.push(0),
                    Some(payload) => {
                        if payload.len() > u16::MAX as usize {
                            return Err(DnsError::MalformedPayload {
                                category: category.to_string(),
                                reason: format!("{} bytes does not fit a message", payload.len()),
                            });
                        }
                        out.push(1);
                        out.extend_from_slice(&(payload.len() as u16).to_be_bytes());
                        out.extend_from_slice(payload);
                    }
                }
            }
            Command::Delete { domain } => {
                out.extend_from_slice(domain.as_bytes());
                out.push(SENTINEL);
            }
        }
        return Ok(out);
    }

    pub fn from_slice(input: &[u8]) -> Result<Command> {
        let (rest, op) = match Command::parse_op(input) {
            Ok(v) => v,
            Err(_) => return Err(DnsError::MalformedMessage("body shorter than an op".to_string())),
        };
        let parsed = match op {
            OP_DEPLOY => Ok((rest, Command::Deploy)),
            OP_UPDATE => Command::parse_update(rest),
            OP_DELETE => Command::parse_delete(rest),
            other => return Err(DnsError::UnknownOp(other)),
        };
        return match parsed {
            Ok((leftovers, command)) => match leftovers.is_empty() {
                true => Ok(command),
                false => Err(DnsError::MalformedMessage(format!(
                    "{} trailing bytes after op 0x{:08x}",
                    leftovers.len(),
                    op
                ))),
            },
            Err(e) => Err(DnsError::MalformedMessage(format!("op 0x{:08x}: {:?}", op, e))),
        };
    }

    fn parse_op(input: &[u8]) -> IResult<&[u8], u32> {
        be_u32(input)
    }

    fn parse_domain(input: &[u8]) -> IResult<&[u8], String> {
        let (input, domain) =
            map_res(take_while(|b: u8| b != SENTINEL), std::str::from_utf8)(input)?;
        let (input, _) = tag(&[SENTINEL][..])(input)?;
        return Ok((input, domain.to_string()));
    }

    fn parse_category(input: &[u8]) -> IResult<&[u8], CategoryId> {
        let (input, raw) = take(32usize)(input)?;
        let mut id = [0u8; 32];
        id.copy_from_slice(raw);
        return Ok((input, CategoryId(id)));
    }

    fn parse_maybe_payload(input: &[u8]) -> IResult<&[u8], Option<Vec<u8>>> {
        let (rest, flag) = be_u8(input)?;
        return match flag {
            0 => Ok((rest, None)),
            1 => {
                let (rest, payload) = length_data(be_u16)(rest)?;
                Ok((rest, Some(payload.to_vec())))
            }
            _ => Err(nom::Err::Error(Error::new(input, ErrorKind::Switch))),
        };
    }

    fn parse_update(input: &[u8]) -> IResult<&[u8], Command> {
        let (input, domain) = Command::parse_domain(input)?;
        let (input, category) = Command::parse_category(input)?;
        let (input, payload) = Command::parse_maybe_payload(input)?;
        return Ok((input, Command::Update { domain, category, payload }));
    }

    fn parse_delete(input: &[u8]) -> IResult<&[u8], Command> {
        let (input, domain) = Command::parse_domain(input)?;
        return Ok((input, Command::Delete { domain }));
    }
}

#[derive(Debug, PartialEq, Eq, Clone)]
pub struct Outbound {
    pub destination: AccountRef,
    pub body: Vec<u8>,
}

impl Outbound {
    pub fn confirmation(destination: AccountRef, op: u32) -> Outbound {
        let mut body = Vec::with_capacity(8);
        body.extend_from_slice(&OP_EXCESSES.to_be_bytes());
        body.extend_from_slice(&op.to_be_bytes());
        return Outbound { destination, body };
    }

    pub fn confirmed_op(&self) -> Option<u32> {
        let parsed: IResult<&[u8], (u32, u32)> =
            nom::sequence::tuple((be_u32, be_u32))(&self.body[..]);
        return match parsed {
            Ok((rest, (OP_EXCESSES, op))) if rest.is_empty() => Some(op),
            _ => None,
        };
    }
}
