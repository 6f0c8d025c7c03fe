use thiserror::Error;

use crate::account::AccountRef;

#[derive(Debug, Error)]
pub enum DnsError {
    #[error("caller {0} is not the administrator")]
    Unauthorized(AccountRef),

    #[error("invalid label in domain {domain:?}: {reason}")]
    InvalidLabel { domain: String, reason: &'static str },

    #[error("malformed payload for category {category}: {reason}")]
    MalformedPayload { category: String, reason: String },

    #[error("dictionary key is {bits} bits long, at most 256 allowed")]
    KeyTooLong { bits: usize },

    #[error("malformed message: {0}")]
    MalformedMessage(String),

    #[error("unknown op 0x{0:08x}")]
    UnknownOp(u32),

    #[error("no resolver known at {0}")]
    UnknownResolver(AccountRef),

    #[error("delegation cycle through {0}")]
    DelegationCycle(AccountRef),

    #[error("delegation chain exceeded {0} hops")]
    HopLimitExceeded(usize),

    #[error("config error: {0}")]
    Config(String),

    #[error("serialization error: {0}")]
    Serialization(#[from] bincode::Error),

    #[cfg(feature = "rocksdb")]
    #[error("storage error: {0}")]
    Storage(#[from] rocksdb::Error),

    #[cfg(feature = "rocksdb")]
    #[error("corrupt snapshot: {0}")]
    CorruptSnapshot(String),
}

pub type Result<T> = std::result::Result<T, DnsError>;
