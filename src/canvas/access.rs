//! Authorization gate — the owner-curated set of identities allowed to draw.
//!
//! An empty set means everyone may draw; that is the bootstrap state before
//! an owner starts curating. Checks are always made against the gate at the
//! moment of the event, never against a flag captured at join time, since
//! the owner may grant or revoke while the target is connected.

use std::collections::HashSet;

use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum AccessError {
    #[error("only the room owner may change access")]
    NotOwner,
    #[error("the owner cannot change their own access")]
    SelfTarget,
    #[error("target is not in the room")]
    TargetAbsent,
    #[error("target is already authorized")]
    AlreadyAuthorized,
    #[error("target is not authorized")]
    NotAuthorized,
}

#[derive(Debug, Clone, Default)]
pub struct AccessGate {
    owner_id: Option<Uuid>,
    authorized: HashSet<Uuid>,
}

impl AccessGate {
    #[must_use]
    pub fn new(owner_id: Option<Uuid>, authorized: impl IntoIterator<Item = Uuid>) -> Self {
        Self { owner_id, authorized: authorized.into_iter().collect() }
    }

    #[must_use]
    pub fn owner_id(&self) -> Option<Uuid> {
        self.owner_id
    }

    #[must_use]
    pub fn is_owner(&self, identity_id: Uuid) -> bool {
        self.owner_id == Some(identity_id)
    }

    #[must_use]
    pub fn is_authorized(&self, identity_id: Uuid) -> bool {
        self.authorized.is_empty() || self.authorized.contains(&identity_id)
    }

    /// Grant `target` drawing rights.
    ///
    /// # Errors
    ///
    /// Fails unless `requestor` owns the room, targets someone else who is
    /// currently present and not yet authorized.
    pub fn authorize(&mut self, requestor: Uuid, target: Uuid, target_present: bool) -> Result<(), AccessError> {
        self.check(requestor, target, target_present)?;
        if self.authorized.contains(&target) {
            return Err(AccessError::AlreadyAuthorized);
        }
        self.authorized.insert(target);
        Ok(())
    }

    /// Revoke `target`'s drawing rights.
    ///
    /// # Errors
    ///
    /// Fails unless `requestor` owns the room, targets someone else who is
    /// currently present and explicitly authorized.
    pub fn deauthorize(&mut self, requestor: Uuid, target: Uuid, target_present: bool) -> Result<(), AccessError> {
        self.check(requestor, target, target_present)?;
        if !self.authorized.remove(&target) {
            return Err(AccessError::NotAuthorized);
        }
        Ok(())
    }

    /// Authorized ids in a stable order for persistence.
    #[must_use]
    pub fn authorized_ids(&self) -> Vec<Uuid> {
        let mut ids: Vec<Uuid> = self.authorized.iter().copied().collect();
        ids.sort();
        ids
    }

    fn check(&self, requestor: Uuid, target: Uuid, target_present: bool) -> Result<(), AccessError> {
        if !self.is_owner(requestor) {
            return Err(AccessError::NotOwner);
        }
        if requestor == target {
            return Err(AccessError::SelfTarget);
        }
        if !target_present {
            return Err(AccessError::TargetAbsent);
        }
        Ok(())
    }
}

#[cfg(test)]
#[path = "access_test.rs"]
mod tests;
