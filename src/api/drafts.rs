//! Server-held drafts with idle expiry.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use uuid::Uuid;

use crate::backend::CatalogBackend;
use crate::composer::SessionComposer;

pub type DraftComposer = SessionComposer<CatalogBackend>;

/// Idle time after which an abandoned draft is dropped.
pub const DEFAULT_DRAFT_TTL: Duration = Duration::from_secs(12 * 60 * 60);

struct Entry {
    composer: DraftComposer,
    last_used: Instant,
}

/// In-progress session builds keyed by draft id.
///
/// Every lookup refreshes a draft's idle clock. Drafts idle for longer than
/// the TTL are treated as gone and removed by [`DraftStore::sweep`], which
/// also runs on every insert.
pub struct DraftStore {
    entries: HashMap<Uuid, Entry>,
    ttl: Duration,
}

impl DraftStore {
    pub fn new(ttl: Duration) -> Self {
        Self {
            entries: HashMap::new(),
            ttl,
        }
    }

    pub fn insert(&mut self, composer: DraftComposer) -> Uuid {
        self.insert_at(composer, Instant::now())
    }

    /// Look up a live draft and mark it as used.
    pub fn get_mut(&mut self, id: &Uuid) -> Option<&mut DraftComposer> {
        self.get_mut_at(id, Instant::now())
    }

    pub fn remove(&mut self, id: &Uuid) -> Option<DraftComposer> {
        let now = Instant::now();
        let entry = self.entries.remove(id)?;
        (!self.is_expired(&entry, now)).then_some(entry.composer)
    }

    /// Drop every expired draft. Returns how many were removed.
    pub fn sweep(&mut self) -> usize {
        self.sweep_at(Instant::now())
    }

    fn insert_at(&mut self, composer: DraftComposer, now: Instant) -> Uuid {
        self.sweep_at(now);
        let id = Uuid::new_v4();
        self.entries.insert(
            id,
            Entry {
                composer,
                last_used: now,
            },
        );
        tracing::info!(draft_id = %id, open = self.entries.len(), "Created draft");
        id
    }

    fn get_mut_at(&mut self, id: &Uuid, now: Instant) -> Option<&mut DraftComposer> {
        let expired = self.is_expired(self.entries.get(id)?, now);
        if expired {
            self.entries.remove(id);
            tracing::debug!(draft_id = %id, "Dropped expired draft");
            return None;
        }

        let entry = self.entries.get_mut(id)?;
        entry.last_used = now;
        Some(&mut entry.composer)
    }

    fn sweep_at(&mut self, now: Instant) -> usize {
        let ttl = self.ttl;
        let before = self.entries.len();
        self.entries
            .retain(|_, entry| now.saturating_duration_since(entry.last_used) <= ttl);

        let removed = before - self.entries.len();
        if removed > 0 {
            tracing::info!(removed, "Expired idle drafts");
        }
        removed
    }

    fn is_expired(&self, entry: &Entry, now: Instant) -> bool {
        now.saturating_duration_since(entry.last_used) > self.ttl
    }
}

impl Default for DraftStore {
    fn default() -> Self {
        Self::new(DEFAULT_DRAFT_TTL)
    }
}
