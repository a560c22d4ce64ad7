use std::{
    collections::{BTreeMap, BTreeSet, HashMap},
    sync::Arc,
};

use tokio::sync::Mutex;

use crate::db::{Location, NewWatch, OwnerId, WatchFilters, WatchId};

use super::filters::Param;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LocationSlot {
    Resolved(Location),
    /// Several lookup hits; one has to be picked before filters are accepted.
    Candidates(Vec<Location>),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PendingChoice {
    Location,
    Deletion(Vec<WatchId>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IntakeStage {
    AwaitingFilters,
    AwaitingDisambiguation,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IntakeSession {
    pub owner_id: OwnerId,
    pub location: Option<LocationSlot>,
    pub values: BTreeMap<Param, u64>,
    pub pending: Option<PendingChoice>,
}

impl IntakeSession {
    /// Session for an `add`. A single candidate is selected right away.
    pub fn with_candidates(owner_id: OwnerId, mut candidates: Vec<Location>) -> Self {
        let (location, pending) = if candidates.len() == 1 {
            (candidates.pop().map(LocationSlot::Resolved), None)
        } else {
            (
                Some(LocationSlot::Candidates(candidates)),
                Some(PendingChoice::Location),
            )
        };

        Self {
            owner_id,
            location,
            values: BTreeMap::new(),
            pending,
        }
    }

    pub fn for_deletion(owner_id: OwnerId, offered: Vec<WatchId>) -> Self {
        Self {
            owner_id,
            location: None,
            values: BTreeMap::new(),
            pending: Some(PendingChoice::Deletion(offered)),
        }
    }

    pub fn stage(&self) -> IntakeStage {
        match self.pending {
            Some(_) => IntakeStage::AwaitingDisambiguation,
            None => IntakeStage::AwaitingFilters,
        }
    }

    pub fn resolved_location(&self) -> Option<&Location> {
        match &self.location {
            Some(LocationSlot::Resolved(location)) => Some(location),
            _ => None,
        }
    }

    /// Binds the candidate whose id equals `token`. Returns `None` and leaves
    /// the session untouched if no location choice is pending or the token
    /// is unknown.
    pub fn select_location(&mut self, token: &str) -> Option<Location> {
        if self.pending != Some(PendingChoice::Location) {
            return None;
        }

        let chosen = match &self.location {
            Some(LocationSlot::Candidates(candidates)) => candidates
                .iter()
                .find(|candidate| candidate.id == token)
                .cloned()?,
            _ => return None,
        };

        self.location = Some(LocationSlot::Resolved(chosen.clone()));
        self.pending = None;
        Some(chosen)
    }

    /// Later values overwrite earlier ones.
    pub fn set_filter(&mut self, param: Param, value: u64) {
        self.values.insert(param, value);
    }

    pub fn collected_keys(&self) -> BTreeSet<Param> {
        let mut keys: BTreeSet<Param> = self.values.keys().copied().collect();
        if self.location.is_some() {
            keys.insert(Param::Location);
        }
        keys
    }

    pub fn missing_params(&self) -> Vec<Param> {
        missing_params(&self.collected_keys())
    }

    pub fn filters(&self) -> WatchFilters {
        let value = |param: Param| self.values.get(&param).copied();
        WatchFilters {
            price: value(Param::Price),
            rooms: value(Param::Rooms),
            area: value(Param::Area),
            radius: value(Param::Radius),
        }
    }

    /// The entry to persist, once a location is resolved.
    pub fn to_new_watch(&self) -> Option<NewWatch> {
        Some(NewWatch {
            owner_id: self.owner_id,
            location: self.resolved_location()?.clone(),
            filters: self.filters(),
        })
    }
}

/// The fixed parameter universe minus whatever has been collected.
pub fn missing_params(collected: &BTreeSet<Param>) -> Vec<Param> {
    Param::ALL
        .iter()
        .copied()
        .filter(|param| !collected.contains(param))
        .collect()
}

/// In-memory intake sessions, at most one per owner.
#[derive(Clone, Default)]
pub struct SessionStore {
    inner: Arc<Mutex<HashMap<OwnerId, IntakeSession>>>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces any session the owner already had.
    pub async fn create(&self, session: IntakeSession) {
        self.inner.lock().await.insert(session.owner_id, session);
    }

    pub async fn get(&self, owner_id: OwnerId) -> Option<IntakeSession> {
        self.inner.lock().await.get(&owner_id).cloned()
    }

    pub async fn update<F, T>(&self, owner_id: OwnerId, mutate: F) -> Option<T>
    where
        F: FnOnce(&mut IntakeSession) -> T,
    {
        self.inner.lock().await.get_mut(&owner_id).map(mutate)
    }

    pub async fn destroy(&self, owner_id: OwnerId) -> Option<IntakeSession> {
        self.inner.lock().await.remove(&owner_id)
    }

    pub async fn len(&self) -> usize {
        self.inner.lock().await.len()
    }
}
