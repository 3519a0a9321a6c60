use async_trait::async_trait;
use burrow_core::error::Result;
use burrow_core::{
    DeletionRequest, KeyedUrl, OwnerId, Repository, Resolution, ShortCode, Stats, StorageError,
};
use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

#[derive(Debug, Clone)]
struct Row {
    code: ShortCode,
    original_url: String,
    owner: OwnerId,
    deleted: bool,
}

/// Repository double with soft deletion, recording every applied
/// deletion request.
#[derive(Debug, Default)]
pub(crate) struct StubRepository {
    rows: Mutex<Vec<Row>>,
    deletions: Mutex<Vec<DeletionRequest>>,
    fail_deletes_for: Option<OwnerId>,
    unavailable: AtomicBool,
}

impl StubRepository {
    pub(crate) fn failing_deletes_for(owner: OwnerId) -> Self {
        Self {
            fail_deletes_for: Some(owner),
            ..Self::default()
        }
    }

    pub(crate) fn deletions(&self) -> Vec<DeletionRequest> {
        self.deletions.lock().unwrap().clone()
    }

    pub(crate) fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    fn check_available(&self) -> Result<()> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(StorageError::Unavailable("stub is down".into()));
        }
        Ok(())
    }

    fn check(rows: &[Row], code: &ShortCode, original_url: &str) -> Result<()> {
        if rows.iter().any(|r| r.original_url == original_url) {
            return Err(StorageError::DuplicateUrl(original_url.to_owned()));
        }
        if rows.iter().any(|r| &r.code == code) {
            return Err(StorageError::KeyConflict(code.to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl Repository for StubRepository {
    async fn add_url(&self, code: &ShortCode, original_url: &str, owner: OwnerId) -> Result<()> {
        self.check_available()?;
        let mut rows = self.rows.lock().unwrap();
        Self::check(&rows, code, original_url)?;
        rows.push(Row {
            code: code.clone(),
            original_url: original_url.to_owned(),
            owner,
            deleted: false,
        });
        Ok(())
    }

    async fn add_batch(&self, entries: &[KeyedUrl], owner: OwnerId) -> Result<()> {
        self.check_available()?;
        let mut rows = self.rows.lock().unwrap();
        let mut staged = rows.clone();
        for entry in entries {
            Self::check(&staged, &entry.code, &entry.original_url)?;
            staged.push(Row {
                code: entry.code.clone(),
                original_url: entry.original_url.clone(),
                owner,
                deleted: false,
            });
        }
        *rows = staged;
        Ok(())
    }

    async fn get_url(&self, code: &ShortCode) -> Result<Resolution> {
        self.check_available()?;
        let rows = self.rows.lock().unwrap();
        Ok(match rows.iter().find(|r| &r.code == code) {
            None => Resolution::NotFound,
            Some(row) if row.deleted => Resolution::Deleted,
            Some(row) => Resolution::Active(row.original_url.clone()),
        })
    }

    async fn get_short_url(&self, original_url: &str) -> Result<Option<ShortCode>> {
        self.check_available()?;
        let rows = self.rows.lock().unwrap();
        Ok(rows
            .iter()
            .find(|r| r.original_url == original_url)
            .map(|r| r.code.clone()))
    }

    async fn get_all_urls(&self, owner: OwnerId) -> Result<Vec<KeyedUrl>> {
        self.check_available()?;
        let rows = self.rows.lock().unwrap();
        Ok(rows
            .iter()
            .filter(|r| r.owner == owner && !r.deleted)
            .map(|r| KeyedUrl::new(r.code.clone(), r.original_url.clone()))
            .collect())
    }

    async fn delete_batch(&self, codes: &[ShortCode], owner: OwnerId) -> Result<u64> {
        self.check_available()?;
        if self.fail_deletes_for == Some(owner) {
            return Err(StorageError::Query("delete rejected".into()));
        }

        let mut affected = 0;
        let mut rows = self.rows.lock().unwrap();
        for row in rows
            .iter_mut()
            .filter(|r| r.owner == owner && !r.deleted && codes.contains(&r.code))
        {
            row.deleted = true;
            affected += 1;
        }
        self.deletions.lock().unwrap().push(DeletionRequest {
            owner,
            codes: codes.to_vec(),
        });
        Ok(affected)
    }

    async fn stats(&self) -> Result<Stats> {
        self.check_available()?;
        let rows = self.rows.lock().unwrap();
        let users: HashSet<OwnerId> = rows.iter().map(|r| r.owner).collect();
        Ok(Stats {
            urls: rows.len() as u64,
            users: users.len() as u64,
        })
    }

    async fn ping(&self) -> Result<()> {
        self.check_available()
    }
}
