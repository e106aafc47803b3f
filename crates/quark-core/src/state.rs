//! Prefix ownership store.
//!
//! Ownership records and values are read from and written to whatever store
//! the caller hands in: the live database for queries, an [`Overlay`] while a
//! block is simulated. Each mutation checks everything before writing, so a
//! failed operation leaves the store untouched.
//!
//! [`Overlay`]: quark_storage::Overlay

use crate::error::ChainError;
use crate::keys;
use quark_storage::{KeyValueRead, KeyValueWrite};
use quark_types::{
    parse_key, validate_prefix, Address, Codec, Genesis, KeyValue, PrefixInfo, DELIMITER,
};
use std::collections::VecDeque;
use std::sync::Arc;

/// Rows fetched from the backend per range page.
pub const RANGE_PAGE_SIZE: usize = 256;

fn show(bytes: &[u8]) -> String {
    String::from_utf8_lossy(bytes).into_owned()
}

/// Prefix ownership ledger.
#[derive(Debug, Clone)]
pub struct PrefixStore {
    codec: Arc<Codec>,
    genesis: Genesis,
}

impl PrefixStore {
    pub fn new(codec: Arc<Codec>, genesis: Genesis) -> Self {
        Self { codec, genesis }
    }

    pub fn genesis(&self) -> &Genesis {
        &self.genesis
    }

    /// Ownership record of `prefix`, expired or not.
    pub fn info<R: KeyValueRead + ?Sized>(
        &self,
        db: &R,
        prefix: &[u8],
    ) -> Result<PrefixInfo, ChainError> {
        self.lookup(db, prefix)?
            .ok_or_else(|| ChainError::NotFound(format!("prefix {:?}", show(prefix))))
    }

    fn lookup<R: KeyValueRead + ?Sized>(
        &self,
        db: &R,
        prefix: &[u8],
    ) -> Result<Option<PrefixInfo>, ChainError> {
        match db.get(&keys::prefix_info_key(prefix))? {
            Some(raw) => Ok(Some(self.codec.unmarshal(&raw)?)),
            None => Ok(None),
        }
    }

    fn store_info<W: KeyValueWrite + ?Sized>(
        &self,
        db: &mut W,
        prefix: &[u8],
        info: &PrefixInfo,
    ) -> Result<(), ChainError> {
        db.put(&keys::prefix_info_key(prefix), &self.codec.marshal(info)?)?;
        Ok(())
    }

    fn live<R: KeyValueRead + ?Sized>(
        &self,
        db: &R,
        prefix: &[u8],
        now: u64,
    ) -> Result<bool, ChainError> {
        Ok(self.lookup(db, prefix)?.is_some_and(|info| !info.is_expired(now)))
    }

    /// Info of a prefix `owner` may write to at `now`.
    fn owned<R: KeyValueRead + ?Sized>(
        &self,
        db: &R,
        prefix: &[u8],
        owner: Address,
        now: u64,
    ) -> Result<PrefixInfo, ChainError> {
        let info = self.info(db, prefix)?;
        if info.is_expired(now) {
            return Err(ChainError::Ownership(format!(
                "prefix {:?} expired at {}",
                show(prefix),
                info.expiry
            )));
        }
        if info.owner != owner {
            return Err(ChainError::Ownership(format!(
                "prefix {:?} is owned by {}",
                show(prefix),
                info.owner
            )));
        }
        Ok(info)
    }

    /// Claim `prefix` for `owner` for the default lifeline.
    ///
    /// Reclaiming an expired prefix deletes every value stored under it. A
    /// live prefix can only be reclaimed by its owner, which restarts its
    /// lifeline at `now` and keeps its values.
    pub fn claim<W: KeyValueWrite + ?Sized>(
        &self,
        db: &mut W,
        prefix: &[u8],
        owner: Address,
        now: u64,
    ) -> Result<PrefixInfo, ChainError> {
        validate_prefix(prefix, &self.genesis)?;
        let lifeline = self.genesis.default_lifeline_secs;

        let info = match self.lookup(&*db, prefix)? {
            None => PrefixInfo::new(owner, now, lifeline),
            Some(previous) if previous.is_expired(now) => {
                let removed = self.wipe(db, prefix)?;
                tracing::debug!(prefix = %show(prefix), removed, "Cleared expired prefix");
                PrefixInfo::new(owner, now, lifeline)
            }
            Some(previous) if previous.owner == owner => PrefixInfo::new(owner, now, lifeline),
            Some(previous) => {
                return Err(ChainError::Ownership(format!(
                    "prefix {:?} is owned by {} until {}",
                    show(prefix),
                    previous.owner,
                    previous.expiry
                )))
            }
        };

        self.store_info(db, prefix, &info)?;
        Ok(info)
    }

    fn wipe<W: KeyValueWrite + ?Sized>(&self, db: &mut W, prefix: &[u8]) -> Result<usize, ChainError> {
        let (lower, upper) = keys::value_range(prefix, b"", b"");
        let rows = db.scan(&lower, Some(upper.as_slice()), 0)?;
        for (key, _) in &rows {
            db.delete(key)?;
        }
        Ok(rows.len())
    }

    /// Write `value` under `prefix/key`. An empty value deletes the key.
    pub fn set<W: KeyValueWrite + ?Sized>(
        &self,
        db: &mut W,
        prefix: &[u8],
        key: &[u8],
        value: &[u8],
        owner: Address,
        now: u64,
    ) -> Result<(), ChainError> {
        validate_prefix(prefix, &self.genesis)?;
        if key.is_empty() || key.contains(&DELIMITER) {
            return Err(ChainError::Validation(format!("invalid key {:?}", show(key))));
        }
        if key.len() as u64 > self.genesis.max_key_len {
            return Err(ChainError::Validation(format!(
                "key of {} bytes exceeds {}",
                key.len(),
                self.genesis.max_key_len
            )));
        }
        if value.len() as u64 > self.genesis.max_value_size {
            return Err(ChainError::Validation(format!(
                "value of {} bytes exceeds {}",
                value.len(),
                self.genesis.max_value_size
            )));
        }
        self.owned(&*db, prefix, owner, now)?;

        let db_key = keys::value_key(prefix, key);
        if value.is_empty() {
            db.delete(&db_key)?;
        } else {
            db.put(&db_key, value)?;
        }
        Ok(())
    }

    /// Extend the claim on `prefix` by `extension` seconds.
    pub fn lifeline<W: KeyValueWrite + ?Sized>(
        &self,
        db: &mut W,
        prefix: &[u8],
        owner: Address,
        now: u64,
        extension: u64,
    ) -> Result<PrefixInfo, ChainError> {
        validate_prefix(prefix, &self.genesis)?;
        if extension == 0 {
            return Err(ChainError::Validation("lifeline extension must be > 0".into()));
        }
        let mut info = self.owned(&*db, prefix, owner, now)?;

        info.expiry = info.expiry.max(now).saturating_add(extension);
        info.last_renewed = now;
        self.store_info(db, prefix, &info)?;
        Ok(info)
    }

    /// Value stored at a full `prefix/key` path. Nothing is visible under
    /// an unclaimed or expired prefix.
    pub fn get<R: KeyValueRead + ?Sized>(
        &self,
        db: &R,
        path: &[u8],
        now: u64,
    ) -> Result<Option<Vec<u8>>, ChainError> {
        let (prefix, key, _) = parse_key(path, &self.genesis)?;
        if key.is_empty() || !self.live(db, &prefix, now)? {
            return Ok(None);
        }
        Ok(db.get(&keys::value_key(&prefix, &key))?)
    }

    /// Values of `prefix` with `start <= key < end` in ascending key order.
    ///
    /// An empty `end` is unbounded within the prefix; `limit = 0` means no
    /// limit. The iterator pages through the backend and holds no lock
    /// between items. An unclaimed or expired prefix yields nothing.
    pub fn range<'a, R: KeyValueRead + ?Sized>(
        &self,
        db: &'a R,
        prefix: &[u8],
        start: &[u8],
        end: &[u8],
        limit: usize,
        now: u64,
    ) -> Result<RangeIter<'a, R>, ChainError> {
        validate_prefix(prefix, &self.genesis)?;
        let live = self.live(db, prefix, now)?;
        let (lower, upper) = keys::value_range(prefix, start, end);
        Ok(RangeIter {
            db,
            next_start: lower,
            end: upper,
            remaining: (limit > 0).then_some(limit),
            page: VecDeque::new(),
            exhausted: !live,
        })
    }
}

/// Lazy range over prefix values. Yields full `prefix/key` paths.
pub struct RangeIter<'a, R: ?Sized> {
    db: &'a R,
    next_start: Vec<u8>,
    end: Vec<u8>,
    remaining: Option<usize>,
    page: VecDeque<(Vec<u8>, Vec<u8>)>,
    exhausted: bool,
}

impl<R: KeyValueRead + ?Sized> RangeIter<'_, R> {
    fn fill(&mut self) -> Result<(), ChainError> {
        let page_size = match self.remaining {
            Some(n) => n.min(RANGE_PAGE_SIZE),
            None => RANGE_PAGE_SIZE,
        };
        let rows = self.db.scan(&self.next_start, Some(self.end.as_slice()), page_size)?;
        if rows.len() < page_size {
            self.exhausted = true;
        }
        if let Some((last, _)) = rows.last() {
            // Smallest key strictly after `last`.
            let mut next = last.clone();
            next.push(0);
            self.next_start = next;
        }
        self.page.extend(rows);
        Ok(())
    }
}

impl<R: KeyValueRead + ?Sized> Iterator for RangeIter<'_, R> {
    type Item = Result<KeyValue, ChainError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.remaining == Some(0) {
            return None;
        }
        if self.page.is_empty() && !self.exhausted {
            if let Err(e) = self.fill() {
                self.exhausted = true;
                return Some(Err(e));
            }
        }
        let (key, value) = self.page.pop_front()?;
        if let Some(n) = self.remaining.as_mut() {
            *n -= 1;
        }
        Some(Ok(KeyValue {
            key: keys::value_path(&key).to_vec(),
            value,
        }))
    }
}
