pub mod account;
pub mod admin;
pub mod category;
pub mod codec;
pub mod config;
pub mod contract;
pub mod dictionary;
pub mod dns;
pub mod error;
pub mod message;
#[cfg(feature = "rocksdb")]
pub mod store;

pub use account::AccountRef;
pub use category::{CategoryId, Record};
pub use codec::{decode, encode, LabelPath};
pub use config::ResolverConfig;
pub use contract::SubdomainManager;
pub use dictionary::{BitKey, Bundle, PrefixDict};
pub use dns::{follow_chain, ChainResolution, DnsData, Resolution, Resolver, ResolverDirectory};
pub use error::{DnsError, Result};
pub use message::{Command, Outbound};
#[cfg(feature = "rocksdb")]
pub use store::SnapshotStore;
