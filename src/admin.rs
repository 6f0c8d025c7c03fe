use tracing::{info, warn};

use crate::account::AccountRef;
use crate::category::{CategoryId, Record};
use crate::codec;
use crate::dns::Resolver;
use crate::error::{DnsError, Result};

impl Resolver {
    fn authorize(&self, caller: &AccountRef) -> Result<()> {
        if *caller != self.administrator {
            warn!(caller = %caller, "rejected command from non-administrator");
            return Err(DnsError::Unauthorized(*caller));
        }
        return Ok(());
    }

    /// Sets one category at `domain`, or clears it when `payload` is `None`.
    /// Clearing the last category removes the path.
    pub fn update(
        &mut self,
        caller: &AccountRef,
        domain: &str,
        category: CategoryId,
        payload: Option<Vec<u8>>,
    ) -> Result<()> {
        self.authorize(caller)?;
        if category.is_all() {
            return Err(DnsError::MalformedPayload {
                category: category.to_string(),
                reason: "category zero cannot hold a record".to_string(),
            });
        }
        let key = codec::encode(domain)?.to_key();
        if let Some(payload) = payload.as_ref() {
            Record::parse(category, payload)?;
        }

        let mut bundle = self.dict.get(&key).cloned().unwrap_or_default();
        match payload {
            Some(payload) => {
                bundle.insert(category, payload);
            }
            None => {
                bundle.remove(&category);
            }
        }
        let remaining = bundle.len();
        self.dict.set(&key, bundle)?;
        info!(domain = %domain, category = %category, remaining, "updated record");
        return Ok(());
    }

    pub fn delete(&mut self, caller: &AccountRef, domain: &str) -> Result<bool> {
        self.authorize(caller)?;
        let key = codec::encode(domain)?.to_key();
        let removed = self.dict.remove(&key).is_some();
        info!(domain = %domain, removed, "deleted path");
        return Ok(removed);
    }

    pub fn set_next_resolver(
        &mut self,
        caller: &AccountRef,
        domain: &str,
        resolver: AccountRef,
    ) -> Result<()> {
        let record = Record::NextResolver(resolver);
        self.update(caller, domain, record.category(), Some(record.to_bytes()))
    }

    pub fn set_wallet(
        &mut self,
        caller: &AccountRef,
        domain: &str,
        wallet: Option<AccountRef>,
    ) -> Result<()> {
        let payload = wallet.map(|w| Record::Wallet(w).to_bytes());
        self.update(caller, domain, CategoryId::WALLET, payload)
    }

    pub fn set_site(&mut self, caller: &AccountRef, domain: &str, adnl: [u8; 32]) -> Result<()> {
        self.update(caller, domain, CategoryId::SITE, Some(Record::Site(adnl).to_bytes()))
    }

    pub fn set_storage(
        &mut self,
        caller: &AccountRef,
        domain: &str,
        bag_id: [u8; 32],
    ) -> Result<()> {
        self.update(caller, domain, CategoryId::STORAGE, Some(Record::Storage(bag_id).to_bytes()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dictionary::PrefixDict;

    fn admin() -> AccountRef {
        AccountRef::new(0, [0xad; 32])
    }

    fn fresh() -> Resolver {
        Resolver::new(admin(), PrefixDict::new())
    }

    #[test]
    fn test_update_and_resolve() {
        let mut r = fresh();
        let wallet = Record::Wallet(AccountRef::new(0, [1; 32])).to_bytes();
        r.update(&admin(), "test", CategoryId::WALLET, Some(wallet.clone())).unwrap();
        let res = r.resolve("test", CategoryId::WALLET).unwrap();
        assert_eq!(40, res.bits);
        assert_eq!(Some(wallet), res.payload);
    }

    #[test]
    fn test_non_admin_changes_nothing() {
        let mut r = fresh();
        r.set_site(&admin(), "test", [1; 32]).unwrap();
        let before = r.clone();
        let intruder = AccountRef::new(0, [0x66; 32]);
        let results = vec![
            r.update(&intruder, "test", CategoryId::from_name("x"), Some(vec![1])),
            r.update(&intruder, "test", CategoryId::SITE, None),
            r.delete(&intruder, "test").map(|_| ()),
            r.set_wallet(&intruder, "test", Some(intruder)),
            r.set_next_resolver(&intruder, "other", intruder),
            r.set_site(&intruder, "test", [2; 32]),
            r.set_storage(&intruder, "test", [3; 32]),
        ];
        for result in results.iter() {
            match result {
                Err(DnsError::Unauthorized(a)) => assert_eq!(intruder, *a),
                other => panic!("{:?}", other),
            }
        }
        assert_eq!(before, r);
    }

    #[test]
    fn test_clear_one_category() {
        let mut r = fresh();
        r.set_wallet(&admin(), "test", Some(AccountRef::new(0, [1; 32]))).unwrap();
        r.set_site(&admin(), "test", [2; 32]).unwrap();
        r.set_wallet(&admin(), "test", None).unwrap();
        let all = r.enumerate();
        assert_eq!(1, all.len());
        assert_eq!(None, all["test"].wallet);
        assert_eq!(Some([2; 32]), all["test"].site);
    }

    #[test]
    fn test_clearing_last_category_removes_path() {
        let mut r = fresh();
        r.set_storage(&admin(), "test", [2; 32]).unwrap();
        r.update(&admin(), "test", CategoryId::STORAGE, None).unwrap();
        assert!(r.dictionary().is_empty());
        r.update(&admin(), "never", CategoryId::STORAGE, None).unwrap();
        assert!(r.dictionary().is_empty());
    }

    #[test]
    fn test_delete_whole_path() {
        let mut r = fresh();
        r.set_site(&admin(), "test", [2; 32]).unwrap();
        r.set_storage(&admin(), "test", [3; 32]).unwrap();
        r.set_site(&admin(), "sub.test", [4; 32]).unwrap();
        assert_eq!(true, r.delete(&admin(), "test").unwrap());
        assert_eq!(false, r.delete(&admin(), "test").unwrap());
        assert_eq!(false, r.delete(&admin(), "nonexistent").unwrap());
        assert_eq!(vec!["sub.test"], r.enumerate().keys().collect::<Vec<_>>());
    }

    #[test]
    fn test_prefix_labels_stay_distinct() {
        let mut r = fresh();
        for (i, name) in ["test", "testtest", "testab"].iter().enumerate() {
            r.set_site(&admin(), name, [i as u8; 32]).unwrap();
        }
        assert_eq!(3, r.dictionary().len());
        assert_eq!(Some([2; 32]), r.enumerate()["testab"].site);
    }

    #[test]
    fn test_rejected_updates_are_atomic() {
        let mut r = fresh();
        r.set_site(&admin(), "test", [1; 32]).unwrap();
        let before = r.clone();
        let long = "a".repeat(40);
        let cases = vec![
            r.update(&admin(), "test", CategoryId::WALLET, Some(vec![0x9f, 0xd3, 0])),
            r.update(&admin(), "test", CategoryId::SITE, Some(vec![0xff; 35])),
            r.update(&admin(), "test", CategoryId::ALL, Some(vec![1])),
            r.update(&admin(), "a..b", CategoryId::SITE, None),
            r.set_site(&admin(), &long, [1; 32]),
        ];
        for case in cases.iter() {
            match case {
                Err(DnsError::MalformedPayload { .. })
                | Err(DnsError::InvalidLabel { .. })
                | Err(DnsError::KeyTooLong { .. }) => (),
                other => panic!("{:?}", other),
            }
        }
        assert_eq!(before, r);
    }

    #[test]
    fn test_opaque_categories_accept_any_payload() {
        let mut r = fresh();
        let custom = CategoryId::from_name("avatar");
        r.update(&admin(), "test", custom, Some(vec![])).unwrap();
        let res = r.resolve("test", custom).unwrap();
        assert_eq!(Some(vec![]), res.payload);
        assert_eq!(vec![custom], r.enumerate()["test"].other);
    }
}
