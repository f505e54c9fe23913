//! Cross-crate integration test helpers.
//!
//! [`SyncHarness`] drives the full cycle the core is built for: merge a
//! current collection against a baseline, recall the persisted state, and
//! keep the recalled collection as the next baseline.

use recsync_core::{
    diff, merge, recall, Diff, MergeOptions, MergeReport, Page, RecordCollection, RecordType,
};
use recsync_store::MemoryStore;
use std::sync::Arc;

use crate::fixtures::TestStore;

/// A test harness for merge/recall cycles over one record type.
pub struct SyncHarness {
    /// The backing store.
    pub store: TestStore,
    item_type: Arc<RecordType>,
    baseline: RecordCollection,
    options: MergeOptions,
}

impl SyncHarness {
    /// Creates a harness with an empty store and an empty baseline.
    pub fn new(item_type: &Arc<RecordType>) -> Self {
        Self::with_options(item_type, MergeOptions::default())
    }

    /// Creates a harness using the given merge options.
    pub fn with_options(item_type: &Arc<RecordType>, options: MergeOptions) -> Self {
        Self {
            store: TestStore::for_types(&[item_type]),
            item_type: Arc::clone(item_type),
            baseline: RecordCollection::new(item_type),
            options,
        }
    }

    /// The current baseline.
    pub fn baseline(&self) -> &RecordCollection {
        &self.baseline
    }

    /// The diff a commit of `current` would apply.
    pub fn pending(&self, current: &RecordCollection) -> Diff {
        diff(current, &self.baseline).expect("current matches the harness type")
    }

    /// Merges `current` against the baseline, then recalls the new baseline.
    pub fn commit(&mut self, current: &mut RecordCollection) -> MergeReport {
        let report = merge(
            &mut self.store.store,
            current,
            &self.baseline,
            self.options.clone(),
        )
        .expect("merge succeeds");
        self.baseline = self.recall();
        report
    }

    /// Reads every persisted record of the harness type.
    pub fn recall(&mut self) -> RecordCollection {
        let shell = RecordCollection::new(&self.item_type);
        recall(&mut self.store.store, &shell, &Page::new()).expect("recall succeeds")
    }

    /// Asserts the store holds exactly what `current` holds.
    pub fn verify(&mut self, current: &RecordCollection) {
        let persisted = self.recall();
        let remaining = diff(current, &persisted).expect("same type");
        assert!(remaining.is_empty(), "store differs from collection:\n{remaining}");
    }

    /// The raw store.
    pub fn memory(&self) -> &MemoryStore {
        &self.store.store
    }
}
