use std::collections::{BTreeMap, HashMap};

use num_bigint::BigUint;
use tracing::{debug, info, warn};

use crate::account::AccountRef;
use crate::category::CategoryId;
use crate::config::ResolverConfig;
use crate::dictionary::PrefixDict;
use crate::dns::{DnsData, Resolution, Resolver, ResolverDirectory};
use crate::error::Result;
use crate::message::{Command, Outbound};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubdomainManager {
    resolver: Resolver,
    nonce: u64,
    max_delegation_hops: usize,
}

impl SubdomainManager {
    pub fn construct(
        config: ResolverConfig,
        initial: Option<PrefixDict>,
    ) -> Result<SubdomainManager> {
        config.validate()?;
        let dict = initial.unwrap_or_default();
        info!(
            administrator = %config.administrator,
            nonce = config.nonce,
            entries = dict.len(),
            "constructed resolver"
        );
        return Ok(SubdomainManager {
            resolver: Resolver::new(config.administrator, dict),
            nonce: config.nonce,
            max_delegation_hops: config.max_delegation_hops,
        });
    }

    pub fn resolver(&self) -> &Resolver {
        &self.resolver
    }

    pub fn nonce(&self) -> u64 {
        self.nonce
    }

    pub fn max_delegation_hops(&self) -> usize {
        self.max_delegation_hops
    }

    /// Runs one inbound message. On success returns the confirmation to
    /// deliver back to `sender`; on failure nothing changed and nothing is
    /// sent.
    pub fn handle_message(&mut self, sender: AccountRef, body: &[u8]) -> Result<Vec<Outbound>> {
        let command = match Command::from_slice(body) {
            Ok(c) => c,
            Err(e) => {
                warn!(sender = %sender, error = %e, "rejected message");
                return Err(e);
            }
        };
        return self.execute(sender, command);
    }

    pub fn execute(&mut self, sender: AccountRef, command: Command) -> Result<Vec<Outbound>> {
        let op = command.op();
        match command {
            Command::Deploy => debug!(sender = %sender, "deploy message"),
            Command::Update { domain, category, payload } => {
                self.resolver.update(&sender, &domain, category, payload)?
            }
            Command::Delete { domain } => {
                self.resolver.delete(&sender, &domain)?;
            }
        }
        return Ok(vec![Outbound::confirmation(sender, op)]);
    }

    pub fn resolve(&self, domain: &str, category: CategoryId) -> Result<Resolution> {
        self.resolver.resolve(domain, category)
    }

    pub fn dnsresolve(&self, subdomain: &[u8], category: CategoryId) -> Result<Resolution> {
        self.resolver.dnsresolve(subdomain, category)
    }

    pub fn all(&self) -> BTreeMap<String, DnsData> {
        self.resolver.enumerate()
    }

    pub fn all_keys(&self) -> Vec<BigUint> {
        self.resolver
            .dictionary()
            .iter()
            .into_iter()
            .filter_map(|(key, _)| key.to_uint())
            .collect()
    }
}

impl ResolverDirectory for HashMap<AccountRef, SubdomainManager> {
    fn lookup(&self, account: &AccountRef) -> Option<&Resolver> {
        self.get(account).map(|m| m.resolver())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::category::Record;
    use crate::codec;
    use crate::dns::follow_chain;
    use crate::error::DnsError;
    use crate::message::OP_UPDATE;

    fn owner() -> AccountRef {
        AccountRef::new(0, [0x01; 32])
    }

    fn deployed() -> SubdomainManager {
        let mut manager = SubdomainManager::construct(ResolverConfig::new(owner()), None).unwrap();
        let out = manager.handle_message(owner(), &Command::Deploy.to_bytes().unwrap()).unwrap();
        assert_eq!(1, out.len());
        return manager;
    }

    fn send(
        manager: &mut SubdomainManager,
        sender: AccountRef,
        command: Command,
    ) -> Result<Vec<Outbound>> {
        let body = command.to_bytes().unwrap();
        manager.handle_message(sender, &body)
    }

    #[test]
    fn test_construct_rejects_bad_config() {
        let mut config = ResolverConfig::new(owner());
        config.max_delegation_hops = 0;
        assert!(SubdomainManager::construct(config, None).is_err());
    }

    #[test]
    fn test_construct_with_initial_dictionary() {
        let mut source = deployed();
        send(&mut source, owner(), Command::set_site("test", [4; 32])).unwrap();
        let dict = source.resolver().dictionary().clone();
        let mut config = ResolverConfig::new(owner());
        config.nonce = 99;
        let manager = SubdomainManager::construct(config, Some(dict)).unwrap();
        assert_eq!(99, manager.nonce());
        assert_eq!(40, manager.resolve("test", CategoryId::SITE).unwrap().bits);
    }

    #[test]
    fn test_update_is_confirmed() {
        let mut manager = deployed();
        let wallet = AccountRef::new(0, [0x77; 32]);
        let out = send(&mut manager, owner(), Command::set_wallet("test", Some(wallet))).unwrap();
        assert_eq!(vec![Outbound::confirmation(owner(), OP_UPDATE)], out);
        assert_eq!(Some(OP_UPDATE), out[0].confirmed_op());

        let res = manager.resolve("test", CategoryId::WALLET).unwrap();
        assert_eq!(40, res.bits);
        assert_eq!(Some(Record::Wallet(wallet).to_bytes()), res.payload);
        let res = manager.resolve("nonexistent", CategoryId::WALLET).unwrap();
        assert_eq!(Resolution::unresolved(), res);
    }

    #[test]
    fn test_foreign_sender_rejected() {
        let mut manager = deployed();
        send(&mut manager, owner(), Command::set_site("test", [4; 32])).unwrap();
        let before = manager.clone();
        let stranger = AccountRef::new(0, [0x99; 32]);
        let commands = vec![
            Command::Update {
                domain: "test".to_string(),
                category: CategoryId::from_name("x"),
                payload: Some(vec![1, 2, 3]),
            },
            Command::set_next_resolver("test", stranger),
            Command::set_wallet("test", Some(stranger)),
            Command::set_site("test", [1; 32]),
            Command::set_storage("test", [1; 32]),
            Command::Delete { domain: "test".to_string() },
        ];
        for command in commands {
            match send(&mut manager, stranger, command) {
                Err(DnsError::Unauthorized(_)) => (),
                other => panic!("{:?}", other),
            }
        }
        assert_eq!(before, manager);
    }

    #[test]
    fn test_malformed_message_changes_nothing() {
        let mut manager = deployed();
        let before = manager.clone();
        let mut body = Command::set_site("test", [1; 32]).to_bytes().unwrap();
        body.truncate(body.len() - 5);
        match manager.handle_message(owner(), &body) {
            Err(DnsError::MalformedMessage(_)) => (),
            other => panic!("{:?}", other),
        }
        assert_eq!(before, manager);
    }

    #[test]
    fn test_delete_nonexistent_is_noop() {
        let mut manager = deployed();
        send(&mut manager, owner(), Command::set_site("test", [4; 32])).unwrap();
        let delete = Command::Delete { domain: "other".to_string() };
        let out = send(&mut manager, owner(), delete).unwrap();
        assert_eq!(1, out.len());
        assert_eq!(1, manager.all().len());
    }

    #[test]
    fn test_all_reports_partial_records() {
        let mut manager = deployed();
        send(&mut manager, owner(), Command::set_wallet("test", Some(owner()))).unwrap();
        send(&mut manager, owner(), Command::set_site("test", [4; 32])).unwrap();
        send(&mut manager, owner(), Command::set_storage("files.test", [5; 32])).unwrap();
        send(&mut manager, owner(), Command::set_wallet("test", None)).unwrap();

        let all = manager.all();
        assert_eq!(2, all.len());
        assert_eq!(None, all["test"].wallet);
        assert_eq!(Some([4; 32]), all["test"].site);
        assert_eq!(Some([5; 32]), all["files.test"].storage);

        let mut names: Vec<String> = manager
            .all_keys()
            .iter()
            .map(|k| codec::decode_uint(k).unwrap())
            .collect();
        names.sort();
        assert_eq!(all.keys().cloned().collect::<Vec<_>>(), names);
    }

    #[test]
    fn test_three_prefix_labels() {
        let mut manager = deployed();
        for name in ["test", "testtest", "testab"].iter() {
            send(&mut manager, owner(), Command::set_site(name, [1; 32])).unwrap();
        }
        assert_eq!(3, manager.all().len());
    }

    #[test]
    fn test_next_resolver_end_to_end() {
        let delegate_account = AccountRef::new(0, [0xde; 32]);
        let root_account = AccountRef::new(0, [0x0f; 32]);

        let mut root = deployed();
        send(&mut root, owner(), Command::set_next_resolver("test", delegate_account)).unwrap();
        let mut delegate = deployed();
        send(&mut delegate, owner(), Command::set_site("www", [8; 32])).unwrap();

        let res = root.resolve("www.test", CategoryId::SITE).unwrap();
        assert!(res.delegated);
        assert_eq!(40, res.bits);
        assert_eq!(Some(delegate_account), res.next_resolver().unwrap());

        let mut directory = HashMap::new();
        directory.insert(root_account, root);
        directory.insert(delegate_account, delegate);
        let hops = directory[&root_account].max_delegation_hops();
        let chained =
            follow_chain(&directory, root_account, "www.test", CategoryId::SITE, hops).unwrap();
        assert_eq!(72, chained.bits);
        assert_eq!(1, chained.hops);
        assert_eq!(Some(Record::Site([8; 32]).to_bytes()), chained.payload);
    }
}
