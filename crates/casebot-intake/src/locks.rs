// SPDX-FileCopyrightText: 2026 Casebot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Per-case async locks.
//!
//! Pipelines for the same case run one at a time; distinct cases never wait
//! on each other. Entries are pruned once no pipeline holds or waits on them.

use std::sync::Arc;

use casebot_core::CaseId;
use dashmap::DashMap;
use tokio::sync::{Mutex, OwnedMutexGuard};

/// Table of per-case mutexes keyed by case id.
#[derive(Debug, Default)]
pub struct CaseLocks {
    locks: DashMap<CaseId, Arc<Mutex<()>>>,
}

impl CaseLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Waits for exclusive access to `case_id`.
    pub async fn lock(&self, case_id: &CaseId) -> OwnedMutexGuard<()> {
        // Clone the Arc out so the shard lock is released before awaiting.
        let mutex = self
            .locks
            .entry(case_id.clone())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone();
        mutex.lock_owned().await
    }

    /// Drops the entry for `case_id` if nobody holds or awaits it.
    pub fn prune(&self, case_id: &CaseId) {
        self.locks
            .remove_if(case_id, |_, mutex| Arc::strong_count(mutex) == 1);
    }

    /// Number of cases with a live lock entry.
    pub fn len(&self) -> usize {
        self.locks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.locks.is_empty()
    }
}
