use crate::persistence::SlotStore;
use crate::slots::category::{CategoryRecord, SlotCategory};
use crate::slots::error::StoreError;
use crate::slots::id::HolderId;
use lru::LruCache;
use serde::{Deserialize, Serialize};
use std::cell::RefCell;
use std::collections::BTreeMap;
use std::fs;
use std::num::NonZeroUsize;
use std::path::{Path, PathBuf};

const EXTENSION: &str = "yml";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
struct HolderRecord {
    #[serde(default)]
    categories: BTreeMap<String, CategoryRecord>,
}

/// Cache counters, mostly for the audit summary and tests.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
}

/// `<root>/<holder>.yml` per holder, previous version kept as `.yml.bak`.
#[derive(Debug)]
pub struct FileStore {
    root: PathBuf,
    cache: RefCell<LruCache<HolderId, HolderRecord>>,
    stats: RefCell<CacheStats>,
}

impl FileStore {
    pub fn from_root(root: &Path, cache_holders: usize) -> Self {
        Self::new(root.join("slots"), cache_holders)
    }

    pub fn new(root: impl Into<PathBuf>, cache_holders: usize) -> Self {
        let capacity = NonZeroUsize::new(cache_holders.max(1)).unwrap_or(NonZeroUsize::MIN);
        Self {
            root: root.into(),
            cache: RefCell::new(LruCache::new(capacity)),
            stats: RefCell::new(CacheStats::default()),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn stats(&self) -> CacheStats {
        *self.stats.borrow()
    }

    fn holder_path(&self, holder: HolderId) -> PathBuf {
        self.root.join(format!("{}.{}", holder.0, EXTENSION))
    }

    fn holder_backup_path(&self, holder: HolderId) -> PathBuf {
        self.root.join(format!("{}.{}.bak", holder.0, EXTENSION))
    }

    fn load(&self, holder: HolderId) -> Result<HolderRecord, StoreError> {
        if let Some(record) = self.cache.borrow_mut().get(&holder) {
            self.stats.borrow_mut().hits += 1;
            return Ok(record.clone());
        }
        self.stats.borrow_mut().misses += 1;

        let path = self.holder_path(holder);
        let record = match fs::read_to_string(&path) {
            Ok(data) => serde_yaml::from_str::<HolderRecord>(&data).map_err(|err| {
                StoreError::Corrupt {
                    path: path.clone(),
                    message: err.to_string(),
                }
            })?,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => HolderRecord::default(),
            Err(err) => {
                return Err(StoreError::Io {
                    path,
                    message: err.to_string(),
                })
            }
        };
        self.cache.borrow_mut().put(holder, record.clone());
        Ok(record)
    }

    fn store(&self, holder: HolderId, record: HolderRecord) -> Result<(), StoreError> {
        let path = self.holder_path(holder);
        let backup_path = self.holder_backup_path(holder);
        fs::create_dir_all(&self.root).map_err(|err| StoreError::Io {
            path: self.root.clone(),
            message: err.to_string(),
        })?;
        if path.exists() {
            fs::copy(&path, &backup_path).map_err(|err| StoreError::Io {
                path: backup_path.clone(),
                message: err.to_string(),
            })?;
        }
        if record.categories.is_empty() {
            if path.exists() {
                fs::remove_file(&path).map_err(|err| StoreError::Io {
                    path: path.clone(),
                    message: err.to_string(),
                })?;
            }
        } else {
            let data = serde_yaml::to_string(&record)
                .map_err(|err| StoreError::Encode(err.to_string()))?;
            fs::write(&path, data).map_err(|err| StoreError::Io {
                path: path.clone(),
                message: err.to_string(),
            })?;
        }
        self.cache.borrow_mut().put(holder, record);
        Ok(())
    }

    fn decode(
        &self,
        holder: HolderId,
        name: &str,
        record: CategoryRecord,
    ) -> Result<SlotCategory, StoreError> {
        SlotCategory::from_record(name, record).map_err(|message| StoreError::Corrupt {
            path: self.holder_path(holder),
            message,
        })
    }
}

impl SlotStore for FileStore {
    fn holders(&self) -> Result<Vec<HolderId>, StoreError> {
        let entries = match fs::read_dir(&self.root) {
            Ok(entries) => entries,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(err) => {
                return Err(StoreError::Io {
                    path: self.root.clone(),
                    message: err.to_string(),
                })
            }
        };
        let mut holders = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|err| StoreError::Io {
                path: self.root.clone(),
                message: err.to_string(),
            })?;
            let path = entry.path();
            if path.extension().and_then(|ext| ext.to_str()) != Some(EXTENSION) {
                continue;
            }
            if let Some(id) = path
                .file_stem()
                .and_then(|stem| stem.to_str())
                .and_then(|stem| stem.parse::<u64>().ok())
            {
                holders.push(HolderId(id));
            }
        }
        holders.sort();
        Ok(holders)
    }

    fn category_names(&self, holder: HolderId) -> Result<Vec<String>, StoreError> {
        Ok(self.load(holder)?.categories.into_keys().collect())
    }

    fn get_category(
        &self,
        holder: HolderId,
        name: &str,
    ) -> Result<Option<SlotCategory>, StoreError> {
        let mut record = self.load(holder)?;
        record
            .categories
            .remove(name)
            .map(|category| self.decode(holder, name, category))
            .transpose()
    }

    fn set_category(&mut self, holder: HolderId, category: &SlotCategory) -> Result<(), StoreError> {
        self.commit(holder, std::slice::from_ref(category), &[])
    }

    fn remove_category(
        &mut self,
        holder: HolderId,
        name: &str,
    ) -> Result<Option<SlotCategory>, StoreError> {
        let mut record = self.load(holder)?;
        let Some(removed) = record.categories.remove(name) else {
            return Ok(None);
        };
        let removed = self.decode(holder, name, removed)?;
        self.store(holder, record)?;
        Ok(Some(removed))
    }

    fn get_categories(&self, holder: HolderId) -> Result<BTreeMap<String, SlotCategory>, StoreError> {
        self.load(holder)?
            .categories
            .into_iter()
            .map(|(name, record)| {
                let category = self.decode(holder, &name, record)?;
                Ok((name, category))
            })
            .collect()
    }

    fn commit(
        &mut self,
        holder: HolderId,
        updated: &[SlotCategory],
        removed: &[String],
    ) -> Result<(), StoreError> {
        if updated.is_empty() && removed.is_empty() {
            return Ok(());
        }
        let mut record = self.load(holder)?;
        for category in updated {
            record
                .categories
                .insert(category.name().to_string(), category.to_record());
        }
        for name in removed {
            record.categories.remove(name);
        }
        self.store(holder, record)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::slots::id::{OccupantRef, SlotId};
    use std::time::{SystemTime, UNIX_EPOCH};

    fn temp_store(label: &str) -> FileStore {
        let suffix = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .expect("time")
            .as_nanos();
        let root = std::env::temp_dir().join(format!(
            "slotkeeper-{}-test-{}-{}",
            label,
            std::process::id(),
            suffix
        ));
        FileStore::new(root, 4)
    }

    fn addons() -> SlotCategory {
        let mut category = SlotCategory::new("addons");
        category.declare(["left", "right"], 2);
        category.bind(&SlotId::named("left"), OccupantRef(7));
        category.bind(&SlotId::Anonymous(1), OccupantRef(8));
        category
    }

    #[test]
    fn save_and_load_category_roundtrip() {
        let mut store = temp_store("roundtrip");
        let holder = HolderId(3);
        store.set_category(holder, &addons()).expect("save");

        let reopened = FileStore::new(store.root().to_path_buf(), 4);
        assert_eq!(reopened.holders(), Ok(vec![HolderId(3)]));
        assert_eq!(reopened.get_category(holder, "addons"), Ok(Some(addons())));
        assert_eq!(reopened.get_category(holder, "body"), Ok(None));

        let _ = fs::remove_dir_all(store.root());
    }

    #[test]
    fn writes_keep_a_backup_and_empty_holders_are_removed() {
        let mut store = temp_store("backup");
        let holder = HolderId(4);
        store.set_category(holder, &addons()).expect("save");
        store
            .set_category(holder, &SlotCategory::new("body"))
            .expect("save again");
        assert!(store.holder_backup_path(holder).exists());

        let removed = store
            .remove_category(holder, "addons")
            .expect("remove")
            .expect("present");
        assert_eq!(removed, addons());
        store.remove_category(holder, "body").expect("remove");
        assert!(!store.holder_path(holder).exists());
        assert_eq!(store.holders(), Ok(Vec::new()));

        let _ = fs::remove_dir_all(store.root());
    }

    #[test]
    fn repeated_reads_hit_the_cache() {
        let mut store = temp_store("cache");
        let holder = HolderId(5);
        store.set_category(holder, &addons()).expect("save");
        let before = store.stats();
        store.get_category(holder, "addons").expect("read");
        store.category_names(holder).expect("names");
        let after = store.stats();
        assert_eq!(after.hits, before.hits + 2);
        assert_eq!(after.misses, before.misses);

        let _ = fs::remove_dir_all(store.root());
    }

    #[test]
    fn gaps_in_stored_numbers_are_corrupt() {
        let store = temp_store("corrupt");
        fs::create_dir_all(store.root()).expect("dir");
        fs::write(
            store.holder_path(HolderId(6)),
            "categories:\n  addons:\n    anonymous:\n      1: ~\n      3: 9\n",
        )
        .expect("write");
        let err = store
            .get_category(HolderId(6), "addons")
            .expect_err("gap");
        assert!(matches!(err, StoreError::Corrupt { .. }), "{err}");

        fs::write(store.holder_path(HolderId(7)), "categories: [oops").expect("write");
        assert!(matches!(
            store.get_categories(HolderId(7)),
            Err(StoreError::Corrupt { .. })
        ));

        let _ = fs::remove_dir_all(store.root());
    }
}
