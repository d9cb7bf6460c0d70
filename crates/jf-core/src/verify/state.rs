//! Verifier state: Training Pool, Training Queue, Buggy Pool and the
//! Commit Index that ties them together.

use jf_common::{ChangeRecord, CommitId, Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

/// How labels become known to the learner.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VerifierMode {
    /// Stream labels are trusted once the verification window elapses.
    Simple,
    /// A change is only buggy once a fix links back to it.
    RealLatency,
}

impl std::fmt::Display for VerifierMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            VerifierMode::Simple => write!(f, "simple"),
            VerifierMode::RealLatency => write!(f, "real_latency"),
        }
    }
}

/// Where an indexed commit currently lives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Slot {
    /// Training Queue, provisionally clean.
    Queued,
    /// Buggy Pool, suspected but unconfirmed.
    Suspected,
    /// Training Pool, label final until consumed.
    Pooled,
    /// Consumed by a training cycle that changed the model.
    Consumed,
}

/// A record with the label the learner will see.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LabeledChange {
    pub record: ChangeRecord,
    pub label: bool,
}

impl LabeledChange {
    pub fn new(record: ChangeRecord, label: bool) -> Self {
        Self { record, label }
    }
}

/// Admission bookkeeping. Moves between structures leave it unchanged.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ledger {
    pub admitted: u64,
    pub consumed: u64,
    pub dropped: u64,
}

impl Ledger {
    /// Records that should currently be held across pool, queue and buggy pool.
    pub fn expected_live(&self) -> u64 {
        self.admitted
            .saturating_sub(self.consumed)
            .saturating_sub(self.dropped)
    }
}

pub(crate) type Key = (i64, u64);

#[derive(Debug, Clone)]
pub(crate) struct IndexEntry {
    pub record: ChangeRecord,
    pub label: bool,
    pub slot: Slot,
    /// Ordering key inside the queue or buggy pool.
    pub key: Key,
}

/// All mutable verification state of one simulation.
#[derive(Debug, Clone)]
pub struct VerifierState {
    pub(crate) mode: VerifierMode,
    pub(crate) window_secs: i64,
    pub(crate) index: HashMap<CommitId, IndexEntry>,
    pub(crate) pool: Vec<CommitId>,
    pub(crate) queue: BTreeMap<Key, CommitId>,
    pub(crate) buggy: BTreeMap<Key, CommitId>,
    pub(crate) late_fixes: BTreeMap<Key, CommitId>,
    pub(crate) clock: Option<i64>,
    pub(crate) seq: u64,
    pub(crate) ledger: Ledger,
}

impl VerifierState {
    /// Fresh state with verification window `window_secs`.
    pub fn new(mode: VerifierMode, window_secs: i64) -> Self {
        Self {
            mode,
            window_secs,
            index: HashMap::new(),
            pool: Vec::new(),
            queue: BTreeMap::new(),
            buggy: BTreeMap::new(),
            late_fixes: BTreeMap::new(),
            clock: None,
            seq: 0,
            ledger: Ledger::default(),
        }
    }

    pub fn mode(&self) -> VerifierMode {
        self.mode
    }

    pub fn window_secs(&self) -> i64 {
        self.window_secs
    }

    pub fn pool_len(&self) -> usize {
        self.pool.len()
    }

    pub fn queue_len(&self) -> usize {
        self.queue.len()
    }

    pub fn buggy_len(&self) -> usize {
        self.buggy.len()
    }

    pub fn late_fix_len(&self) -> usize {
        self.late_fixes.len()
    }

    pub fn ledger(&self) -> Ledger {
        self.ledger
    }

    /// Timestamp of the last applied record.
    pub fn clock(&self) -> Option<i64> {
        self.clock
    }

    pub fn slot_of(&self, id: &CommitId) -> Option<Slot> {
        self.index.get(id).map(|e| e.slot)
    }

    pub fn label_of(&self, id: &CommitId) -> Option<bool> {
        self.index.get(id).map(|e| e.label)
    }

    /// Pool contents in admission order.
    pub fn pool_snapshot(&self) -> Vec<LabeledChange> {
        self.pool
            .iter()
            .filter_map(|id| self.index.get(id))
            .map(|e| LabeledChange::new(e.record.clone(), e.label))
            .collect()
    }

    /// Queue ids in leave order.
    pub fn queued_ids(&self) -> Vec<CommitId> {
        self.queue.values().cloned().collect()
    }

    pub fn buggy_ids(&self) -> Vec<CommitId> {
        self.buggy.values().cloned().collect()
    }

    /// Mark every pooled record consumed and empty the pool.
    ///
    /// Returns how many records were consumed.
    pub fn consume_pool(&mut self) -> usize {
        let n = self.pool.len();
        for id in self.pool.drain(..) {
            if let Some(entry) = self.index.get_mut(&id) {
                entry.slot = Slot::Consumed;
            }
        }
        self.ledger.consumed += n as u64;
        n
    }

    /// Forget queued and suspected records ahead of a cumulative replay.
    ///
    /// Pooled and consumed records keep their index entries so the replay
    /// reconciles against them instead of admitting duplicates. Their
    /// scheduled late fixes stay too and fire again as the replayed clock
    /// reaches them.
    pub fn reset_for_replay(&mut self) {
        let dropped = self.queue.len() + self.buggy.len();
        for id in self.queue.values().chain(self.buggy.values()) {
            self.index.remove(id);
        }
        self.queue.clear();
        self.buggy.clear();
        let index = &self.index;
        self.late_fixes.retain(|_, id| index.contains_key(id));
        self.clock = None;
        self.ledger.dropped += dropped as u64;
    }

    pub(crate) fn next_seq(&mut self) -> u64 {
        self.seq += 1;
        self.seq
    }

    /// Check the conservation ledger against the live structures.
    pub fn check_ledger(&self) -> Result<()> {
        let live = (self.pool.len() + self.queue.len() + self.buggy.len()) as u64;
        if live != self.ledger.expected_live() {
            return Err(Error::PreconditionViolation(format!(
                "ledger mismatch: pool {} + queue {} + buggy {} != admitted {} - consumed {} - dropped {}",
                self.pool.len(),
                self.queue.len(),
                self.buggy.len(),
                self.ledger.admitted,
                self.ledger.consumed,
                self.ledger.dropped
            )));
        }
        Ok(())
    }

    // --- structure moves --------------------------------------------------

    /// Admit a new record (or re-admit a consumed one) into the pool.
    pub(crate) fn admit_to_pool(&mut self, record: ChangeRecord, label: bool) {
        let id = record.commit_id.clone();
        self.index.insert(
            id.clone(),
            IndexEntry {
                record,
                label,
                slot: Slot::Pooled,
                key: (0, 0),
            },
        );
        self.pool.push(id);
        self.ledger.admitted += 1;
    }

    pub(crate) fn admit_to_queue(&mut self, record: ChangeRecord, label: bool) {
        let key = (record.timestamp, self.next_seq());
        let id = record.commit_id.clone();
        self.index.insert(
            id.clone(),
            IndexEntry {
                record,
                label,
                slot: Slot::Queued,
                key,
            },
        );
        self.queue.insert(key, id);
        self.ledger.admitted += 1;
    }

    pub(crate) fn admit_to_buggy(&mut self, record: ChangeRecord) {
        let key = (record.timestamp, self.next_seq());
        let id = record.commit_id.clone();
        self.index.insert(
            id.clone(),
            IndexEntry {
                record,
                label: true,
                slot: Slot::Suspected,
                key,
            },
        );
        self.buggy.insert(key, id);
        self.ledger.admitted += 1;
    }

    /// Move a queued or suspected entry into the pool with `label`.
    pub(crate) fn finalize(&mut self, id: &CommitId, label: bool) {
        let Some(entry) = self.index.get_mut(id) else {
            return;
        };
        match entry.slot {
            Slot::Queued => {
                self.queue.remove(&entry.key);
            }
            Slot::Suspected => {
                self.buggy.remove(&entry.key);
            }
            Slot::Pooled | Slot::Consumed => return,
        }
        entry.slot = Slot::Pooled;
        entry.label = label;
        self.pool.push(id.clone());
    }

    /// Move a queued entry into the buggy pool, keeping its timestamp order.
    pub(crate) fn queue_to_buggy(&mut self, id: &CommitId) {
        let Some(entry) = self.index.get_mut(id) else {
            return;
        };
        if entry.slot != Slot::Queued {
            return;
        }
        self.queue.remove(&entry.key);
        entry.slot = Slot::Suspected;
        entry.label = true;
        self.buggy.insert(entry.key, id.clone());
    }

    /// Correct a pooled entry's label in place.
    pub(crate) fn relabel_pooled(&mut self, id: &CommitId, label: bool) {
        if let Some(entry) = self.index.get_mut(id) {
            if entry.slot == Slot::Pooled {
                entry.label = label;
            }
        }
    }

    /// Put a consumed record back into the pool for the next cycle.
    pub(crate) fn readmit(&mut self, id: &CommitId, label: bool) {
        let Some(entry) = self.index.get_mut(id) else {
            return;
        };
        if entry.slot != Slot::Consumed {
            return;
        }
        entry.slot = Slot::Pooled;
        entry.label = label;
        self.pool.push(id.clone());
        self.ledger.admitted += 1;
    }

    /// At most one pending late fix per commit.
    pub(crate) fn schedule_late_fix(&mut self, id: &CommitId, fix_date: i64) {
        if self.late_fixes.values().any(|pending| pending == id) {
            return;
        }
        let key = (fix_date, self.next_seq());
        self.late_fixes.insert(key, id.clone());
    }
}
