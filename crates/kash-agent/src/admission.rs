// SPDX-FileCopyrightText: 2026 Kash Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Per-user single-flight admission.
//!
//! At most one conversation turn per user is in flight. A second attempt
//! is rejected immediately, never queued. Membership is held by an
//! [`AdmissionPermit`] and released when the permit drops, so every exit
//! path (including an unwinding task) gives the slot back.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use kash_core::UserId;
use tracing::debug;

/// Grant/release counters, for tests and status logging.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AdmissionStats {
    pub granted: u64,
    pub released: u64,
    pub denied: u64,
}

#[derive(Debug, Default)]
struct Inner {
    /// Admitted users, each with the ticket of the permit that holds it.
    members: Mutex<HashMap<UserId, u64>>,
    next_ticket: AtomicU64,
    granted: AtomicU64,
    released: AtomicU64,
    denied: AtomicU64,
}

/// The set of users currently holding the single-flight lock.
///
/// Cheap to clone; clones share the same set.
#[derive(Debug, Clone, Default)]
pub struct AdmissionGuard {
    inner: Arc<Inner>,
}

impl AdmissionGuard {
    pub fn new() -> Self {
        Self::default()
    }

    fn members(&self) -> MutexGuard<'_, HashMap<UserId, u64>> {
        // The map is only touched by short non-panicking sections.
        self.inner
            .members
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    /// Grants admission if `user_id` is not already admitted.
    ///
    /// Returns `None` without changing any state when the user already holds
    /// a permit.
    pub fn try_admit(&self, user_id: &UserId) -> Option<AdmissionPermit> {
        let mut members = self.members();
        if members.contains_key(user_id) {
            drop(members);
            self.inner.denied.fetch_add(1, Ordering::Relaxed);
            debug!(user_id = %user_id, "admission denied");
            return None;
        }

        let ticket = self.inner.next_ticket.fetch_add(1, Ordering::Relaxed);
        members.insert(user_id.clone(), ticket);
        drop(members);

        self.inner.granted.fetch_add(1, Ordering::Relaxed);
        debug!(user_id = %user_id, "admission granted");
        Some(AdmissionPermit {
            guard: self.clone(),
            user_id: user_id.clone(),
            ticket,
        })
    }

    /// Removes `user_id` from the admitted set. No-op when not a member.
    pub fn release(&self, user_id: &UserId) {
        if self.members().remove(user_id).is_some() {
            self.note_released(user_id);
        }
    }

    fn release_ticket(&self, user_id: &UserId, ticket: u64) {
        let mut members = self.members();
        // A permit outlived by an explicit release must not evict a newer grant.
        if members.get(user_id) == Some(&ticket) {
            members.remove(user_id);
            drop(members);
            self.note_released(user_id);
        }
    }

    fn note_released(&self, user_id: &UserId) {
        self.inner.released.fetch_add(1, Ordering::Relaxed);
        debug!(user_id = %user_id, "admission released");
    }

    pub fn is_admitted(&self, user_id: &UserId) -> bool {
        self.members().contains_key(user_id)
    }

    /// Number of users currently admitted.
    pub fn in_flight(&self) -> usize {
        self.members().len()
    }

    pub fn stats(&self) -> AdmissionStats {
        AdmissionStats {
            granted: self.inner.granted.load(Ordering::Relaxed),
            released: self.inner.released.load(Ordering::Relaxed),
            denied: self.inner.denied.load(Ordering::Relaxed),
        }
    }
}

/// Proof of admission for one user. Dropping it releases the user.
#[derive(Debug)]
#[must_use = "dropping the permit releases admission immediately"]
pub struct AdmissionPermit {
    guard: AdmissionGuard,
    user_id: UserId,
    ticket: u64,
}

impl AdmissionPermit {
    pub fn user_id(&self) -> &UserId {
        &self.user_id
    }
}

impl Drop for AdmissionPermit {
    fn drop(&mut self) {
        self.guard.release_ticket(&self.user_id, self.ticket);
    }
}
