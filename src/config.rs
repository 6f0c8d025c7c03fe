use std::{fs, path::Path};

use serde::Deserialize;

use crate::account::AccountRef;
use crate::dns::DEFAULT_MAX_HOPS;
use crate::error::{DnsError, Result};

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ResolverConfig {
    pub administrator: AccountRef,
    #[serde(default)]
    pub nonce: u64,
    #[serde(default = "default_max_hops")]
    pub max_delegation_hops: usize,
}

fn default_max_hops() -> usize {
    DEFAULT_MAX_HOPS
}

impl ResolverConfig {
    pub fn new(administrator: AccountRef) -> ResolverConfig {
        ResolverConfig { administrator, nonce: 0, max_delegation_hops: DEFAULT_MAX_HOPS }
    }

    pub fn from_toml_str(s: &str) -> Result<ResolverConfig> {
        let config: ResolverConfig = match toml::from_str(s) {
            Ok(c) => c,
            Err(e) => return Err(DnsError::Config(e.to_string())),
        };
        config.validate()?;
        return Ok(config);
    }

    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<ResolverConfig> {
        let path = path.as_ref();
        let text = match fs::read_to_string(path) {
            Ok(t) => t,
            Err(e) => return Err(DnsError::Config(format!("{}: {}", path.display(), e))),
        };
        ResolverConfig::from_toml_str(&text)
    }

    pub fn validate(&self) -> Result<()> {
        if self.max_delegation_hops == 0 {
            return Err(DnsError::Config("max_delegation_hops must be at least 1".to_string()));
        }
        return Ok(());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn admin_str() -> String {
        format!("0:{}", "ad".repeat(32))
    }

    #[test]
    fn test_from_toml_defaults() {
        let text = format!("administrator = \"{}\"", admin_str());
        let config = ResolverConfig::from_toml_str(&text).unwrap();
        assert_eq!(ResolverConfig::new(AccountRef::new(0, [0xad; 32])), config);
    }

    #[test]
    fn test_from_toml_full() {
        let text = format!(
            "administrator = \"{}\"\nnonce = 42\nmax_delegation_hops = 3\n",
            admin_str()
        );
        let config = ResolverConfig::from_toml_str(&text).unwrap();
        assert_eq!(42, config.nonce);
        assert_eq!(3, config.max_delegation_hops);
    }

    #[test]
    fn test_from_toml_rejects() {
        let cases = vec![
            String::new(),
            "administrator = \"nope\"".to_string(),
            format!("administrator = \"{}\"\nmax_delegation_hops = 0", admin_str()),
            format!("administrator = \"{}\"\nowner = 1", admin_str()),
        ];
        for case in cases.iter() {
            match ResolverConfig::from_toml_str(case) {
                Err(DnsError::Config(_)) => (),
                other => panic!("{:?} -> {:?}", case, other),
            }
        }
    }

    #[test]
    fn test_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "administrator = \"{}\"\nnonce = 7\n", admin_str()).unwrap();
        assert_eq!(7, ResolverConfig::from_file(file.path()).unwrap().nonce);
        assert!(ResolverConfig::from_file("/nonexistent/resolver.toml").is_err());
    }
}
