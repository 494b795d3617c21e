// /////////////////////////////////////////////////////////////////////////////
// Secret Sync RS
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # In-Memory Store Adapters
//!
//! Process-local implementations of all four store ports. They back the
//! integration tests and the local dry-run mode, and they model the same
//! behaviors the provider-backed adapters must exhibit: directory markers
//! in source listings, pagination in target listings, the name/handle
//! cache refresh discipline, and `AccessDenied` on protected subtrees.
//!
//! All adapters are safe for concurrent use; shared maps sit behind
//! `parking_lot` read-write locks and no lock is held across an await
//! point.

use async_trait::async_trait;
use parking_lot::RwLock;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Arc;

use secret_sync_domain::entities::AccountInfo;
use secret_sync_domain::stores::{
    AccountDirectory, ChildEntry, ListPage, MergeStore, SourceStore, TargetEntry, TargetStore,
};
use secret_sync_domain::value_objects::{AccountId, Secret, SecretPath};
use secret_sync_domain::SyncError;

/// Default page size for target-store listings
const DEFAULT_PAGE_SIZE: usize = 50;

/// In-memory hierarchical source store.
#[derive(Default)]
pub struct MemorySourceStore {
    secrets: RwLock<BTreeMap<String, Secret>>,
    denied_prefixes: RwLock<HashSet<String>>,
}

impl MemorySourceStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores a secret at a leaf path
    pub fn insert(&self, path: &SecretPath, secret: Secret) {
        self.secrets.write().insert(path.as_str().to_string(), secret);
    }

    /// Marks a prefix as permission-denied for listing and reading
    pub fn deny(&self, prefix: &SecretPath) {
        self.denied_prefixes.write().insert(prefix.as_str().to_string());
    }

    fn check_access(&self, path: &str) -> Result<(), SyncError> {
        let denied = self.denied_prefixes.read();
        if denied
            .iter()
            .any(|p| path == p || path.starts_with(&format!("{p}/")))
        {
            return Err(SyncError::access_denied(format!("prefix {path:?} is protected")));
        }
        Ok(())
    }
}

#[async_trait]
impl SourceStore for MemorySourceStore {
    async fn list(&self, prefix: &SecretPath) -> Result<Vec<ChildEntry>, SyncError> {
        self.check_access(prefix.as_str())?;

        let secrets = self.secrets.read();
        let needle = format!("{}/", prefix.as_str());
        let mut children: Vec<ChildEntry> = Vec::new();
        let mut seen_dirs: HashSet<&str> = HashSet::new();

        for key in secrets.keys() {
            if let Some(rest) = key.strip_prefix(&needle) {
                match rest.split_once('/') {
                    Some((dir, _)) => {
                        if seen_dirs.insert(dir) {
                            children.push(ChildEntry::Directory(dir.to_string()));
                        }
                    }
                    None => children.push(ChildEntry::Leaf(rest.to_string())),
                }
            }
        }
        Ok(children)
    }

    async fn get(&self, path: &SecretPath) -> Result<Secret, SyncError> {
        self.check_access(path.as_str())?;
        self.secrets
            .read()
            .get(path.as_str())
            .cloned()
            .ok_or_else(|| SyncError::not_found(format!("secret {path} does not exist")))
    }
}

/// In-memory flat target store for one account/region.
///
/// Keeps the per-account name → handle cache the provider-backed adapters
/// maintain: lookups take the read lock, and a full `list` swaps the map
/// wholesale under the write lock.
pub struct MemoryTargetStore {
    secrets: RwLock<BTreeMap<String, Vec<u8>>>,
    name_cache: RwLock<HashMap<String, String>>,
    page_size: usize,
}

impl Default for MemoryTargetStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryTargetStore {
    pub fn new() -> Self {
        Self::with_page_size(DEFAULT_PAGE_SIZE)
    }

    pub fn with_page_size(page_size: usize) -> Self {
        Self {
            secrets: RwLock::new(BTreeMap::new()),
            name_cache: RwLock::new(HashMap::new()),
            page_size: page_size.max(1),
        }
    }

    /// Returns the stored names, for assertions in tests
    pub fn names(&self) -> Vec<String> {
        self.secrets.read().keys().cloned().collect()
    }

    fn handle_for(name: &str) -> String {
        format!("handle::{name}")
    }

    fn resolve_name(&self, name_or_handle: &str) -> String {
        match name_or_handle.strip_prefix("handle::") {
            Some(name) => name.to_string(),
            None => {
                // Fall back to the cache: callers may hold a handle
                // obtained from a listing.
                let cache = self.name_cache.read();
                cache
                    .iter()
                    .find(|(_, handle)| handle.as_str() == name_or_handle)
                    .map(|(name, _)| name.clone())
                    .unwrap_or_else(|| name_or_handle.to_string())
            }
        }
    }
}

#[async_trait]
impl TargetStore for MemoryTargetStore {
    async fn list_page(&self, prefix: Option<&str>, page: Option<String>) -> Result<ListPage, SyncError> {
        let offset: usize = page
            .as_deref()
            .map(str::parse)
            .transpose()
            .map_err(|_| SyncError::internal_error("bad continuation token"))?
            .unwrap_or(0);

        let secrets = self.secrets.read();
        let matching: Vec<&String> = secrets
            .keys()
            .filter(|name| prefix.is_none_or(|p| name.starts_with(p)))
            .collect();

        let entries: Vec<TargetEntry> = matching
            .iter()
            .skip(offset)
            .take(self.page_size)
            .map(|name| TargetEntry {
                name: (*name).clone(),
                handle: Self::handle_for(name),
            })
            .collect();

        let next = if offset + entries.len() < matching.len() {
            Some((offset + entries.len()).to_string())
        } else {
            None
        };

        // Final page: refresh the name cache wholesale, the way the
        // provider adapters do after a completed list.
        if next.is_none() {
            let refreshed: HashMap<String, String> = matching
                .iter()
                .map(|name| ((*name).clone(), Self::handle_for(name)))
                .collect();
            drop(secrets);
            *self.name_cache.write() = refreshed;
        }

        Ok(ListPage { entries, next })
    }

    async fn get(&self, name_or_handle: &str) -> Result<Vec<u8>, SyncError> {
        let name = self.resolve_name(name_or_handle);
        self.secrets
            .read()
            .get(&name)
            .cloned()
            .ok_or_else(|| SyncError::not_found(format!("target secret {name:?} does not exist")))
    }

    async fn put(&self, name: &str, payload: &[u8], _tags: Option<&HashMap<String, String>>)
        -> Result<(), SyncError> {
        self.secrets.write().insert(name.to_string(), payload.to_vec());
        self.name_cache
            .write()
            .insert(name.to_string(), Self::handle_for(name));
        Ok(())
    }

    async fn delete(&self, name: &str) -> Result<(), SyncError> {
        self.secrets.write().remove(name);
        self.name_cache.write().remove(name);
        Ok(())
    }
}

/// In-memory merge store: a flat key/value map.
#[derive(Default)]
pub struct MemoryMergeStore {
    objects: RwLock<BTreeMap<String, Vec<u8>>>,
}

impl MemoryMergeStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the stored keys, for assertions in tests
    pub fn keys(&self) -> Vec<String> {
        self.objects.read().keys().cloned().collect()
    }
}

#[async_trait]
impl MergeStore for MemoryMergeStore {
    async fn list(&self, prefix: &str) -> Result<Vec<String>, SyncError> {
        Ok(self
            .objects
            .read()
            .keys()
            .filter(|key| key.starts_with(prefix))
            .cloned()
            .collect())
    }

    async fn read(&self, key: &str) -> Result<Vec<u8>, SyncError> {
        self.objects
            .read()
            .get(key)
            .cloned()
            .ok_or_else(|| SyncError::not_found(format!("merge-store key {key:?} does not exist")))
    }

    async fn write(&self, key: &str, payload: &[u8]) -> Result<(), SyncError> {
        self.objects.write().insert(key.to_string(), payload.to_vec());
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<(), SyncError> {
        self.objects.write().remove(key);
        Ok(())
    }
}

/// In-memory account directory with a fixed OU hierarchy.
#[derive(Default)]
pub struct MemoryAccountDirectory {
    accounts: RwLock<Vec<AccountInfo>>,
    ou_accounts: RwLock<HashMap<String, Vec<AccountId>>>,
    ou_children: RwLock<HashMap<String, Vec<String>>>,
    parameters: RwLock<HashMap<String, String>>,
    broken_ous: RwLock<HashSet<String>>,
}

impl MemoryAccountDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers an account, optionally placing it inside an OU
    pub fn add_account(&self, account: AccountInfo, ou_id: Option<&str>) {
        if let Some(ou) = ou_id {
            self.ou_accounts
                .write()
                .entry(ou.to_string())
                .or_default()
                .push(account.id.clone());
        }
        self.accounts.write().push(account);
    }

    /// Declares a parent → child OU relationship
    pub fn add_child_ou(&self, parent: &str, child: &str) {
        self.ou_children
            .write()
            .entry(parent.to_string())
            .or_default()
            .push(child.to_string());
    }

    /// Stores an opaque parameter value
    pub fn set_parameter(&self, name: &str, value: &str) {
        self.parameters.write().insert(name.to_string(), value.to_string());
    }

    /// Makes `list_child_ous` fail for one OU, for error-path tests
    pub fn break_ou(&self, ou_id: &str) {
        self.broken_ous.write().insert(ou_id.to_string());
    }
}

#[async_trait]
impl AccountDirectory for MemoryAccountDirectory {
    async fn list_all(&self) -> Result<Vec<AccountInfo>, SyncError> {
        Ok(self.accounts.read().clone())
    }

    async fn list_in_ou(&self, ou_id: &str) -> Result<Vec<AccountInfo>, SyncError> {
        let ids = self.ou_accounts.read().get(ou_id).cloned().unwrap_or_default();
        let accounts = self.accounts.read();
        Ok(accounts
            .iter()
            .filter(|a| ids.contains(&a.id))
            .cloned()
            .collect())
    }

    async fn list_child_ous(&self, ou_id: &str) -> Result<Vec<String>, SyncError> {
        if self.broken_ous.read().contains(ou_id) {
            return Err(SyncError::access_denied(format!("cannot list children of {ou_id:?}")));
        }
        Ok(self.ou_children.read().get(ou_id).cloned().unwrap_or_default())
    }

    async fn get_tags(&self, account_id: &AccountId) -> Result<HashMap<String, String>, SyncError> {
        let accounts = self.accounts.read();
        accounts
            .iter()
            .find(|a| &a.id == account_id)
            .map(|a| a.tags.clone().unwrap_or_default())
            .ok_or_else(|| SyncError::not_found(format!("account {account_id} does not exist")))
    }

    async fn get_parameter(&self, name: &str) -> Result<String, SyncError> {
        self.parameters
            .read()
            .get(name)
            .cloned()
            .ok_or_else(|| SyncError::not_found(format!("parameter {name:?} does not exist")))
    }
}

/// Provider handing out one shared in-memory target store per
/// account/region pair, created on first use.
#[derive(Default)]
pub struct MemoryTargetStoreProvider {
    stores: RwLock<HashMap<String, Arc<MemoryTargetStore>>>,
}

impl MemoryTargetStoreProvider {
    pub fn new() -> Self {
        Self::default()
    }

    fn key(account_id: &str, region: Option<&str>) -> String {
        format!("{account_id}/{}", region.unwrap_or("default"))
    }

    /// Direct access to one account's store, for seeding and assertions
    pub fn store(&self, account_id: &str, region: Option<&str>) -> Arc<MemoryTargetStore> {
        let key = Self::key(account_id, region);
        if let Some(existing) = self.stores.read().get(&key) {
            return Arc::clone(existing);
        }
        let mut stores = self.stores.write();
        Arc::clone(stores.entry(key).or_insert_with(|| Arc::new(MemoryTargetStore::new())))
    }
}

impl super::TargetStoreProvider for MemoryTargetStoreProvider {
    fn store_for(&self, target: &secret_sync_domain::entities::Target) -> Result<Arc<dyn TargetStore>, SyncError> {
        Ok(self.store(target.account_id.as_str(), target.region.as_deref()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn path(raw: &str) -> SecretPath {
        SecretPath::parse(raw).unwrap()
    }

    fn secret(json: &str) -> Secret {
        Secret::from_json_bytes(json.as_bytes()).unwrap()
    }

    #[tokio::test]
    async fn test_source_listing_marks_directories() {
        let store = MemorySourceStore::new();
        store.insert(&path("kv/app/db"), secret(r#"{"a":1}"#));
        store.insert(&path("kv/app/nested/api"), secret(r#"{"b":2}"#));

        let children = store.list(&path("kv/app")).await.unwrap();
        assert!(children.contains(&ChildEntry::Leaf("db".to_string())));
        assert!(children.contains(&ChildEntry::Directory("nested".to_string())));
    }

    #[tokio::test]
    async fn test_source_denied_prefix() {
        let store = MemorySourceStore::new();
        store.insert(&path("kv/locked/x"), secret(r#"{"a":1}"#));
        store.deny(&path("kv/locked"));
        assert!(matches!(
            store.list(&path("kv/locked")).await,
            Err(SyncError::AccessDenied(_))
        ));
        assert!(matches!(
            store.get(&path("kv/locked/x")).await,
            Err(SyncError::AccessDenied(_))
        ));
    }

    #[tokio::test]
    async fn test_target_store_pagination_aggregates() {
        let store = MemoryTargetStore::with_page_size(2);
        for i in 0..5 {
            store.put(&format!("s{i}"), b"{}", None).await.unwrap();
        }
        let all = store.list_all(None).await.unwrap();
        assert_eq!(all.len(), 5);

        let first_page = store.list_page(None, None).await.unwrap();
        assert_eq!(first_page.entries.len(), 2);
        assert!(first_page.next.is_some());
    }

    #[tokio::test]
    async fn test_target_store_get_by_handle() {
        let store = MemoryTargetStore::new();
        store.put("db", br#"{"k":1}"#, None).await.unwrap();
        let listed = store.list_all(None).await.unwrap();
        let payload = store.get(&listed[0].handle).await.unwrap();
        assert_eq!(payload, br#"{"k":1}"#.to_vec());
    }

    #[tokio::test]
    async fn test_merge_store_roundtrip() {
        let store = MemoryMergeStore::new();
        store.write("sync/bundles/t/abc.json", b"{}").await.unwrap();
        assert_eq!(store.read("sync/bundles/t/abc.json").await.unwrap(), b"{}".to_vec());
        assert_eq!(store.list("sync/bundles/t/").await.unwrap().len(), 1);
        store.delete("sync/bundles/t/abc.json").await.unwrap();
        assert!(store.read("sync/bundles/t/abc.json").await.is_err());
    }
}
