use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use labflow_core::{DomainError, DomainResult, UserId};

use crate::capability::Capability;

/// A fully resolved actor for authorization decisions.
///
/// Construction is decoupled from storage and transport: the request layer
/// derives the capability set from claims/memberships before calling into
/// the domain. Checks here are pure (no IO, no panics, no business logic).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Actor {
    user_id: UserId,
    capabilities: BTreeSet<Capability>,
}

impl Actor {
    pub fn new(user_id: UserId, capabilities: impl IntoIterator<Item = Capability>) -> Self {
        Self {
            user_id,
            capabilities: capabilities.into_iter().collect(),
        }
    }

    pub fn user_id(&self) -> UserId {
        self.user_id
    }

    pub fn capabilities(&self) -> impl Iterator<Item = Capability> + '_ {
        self.capabilities.iter().copied()
    }

    pub fn can(&self, capability: Capability) -> bool {
        self.capabilities.contains(&capability)
    }

    /// Require a capability, failing with `Forbidden` naming what is missing.
    pub fn require(&self, capability: Capability) -> DomainResult<()> {
        if self.can(capability) {
            Ok(())
        } else {
            Err(DomainError::forbidden(capability.as_str()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn require_passes_for_granted_capability() {
        let actor = Actor::new(UserId::new(), [Capability::Review]);
        assert!(actor.require(Capability::Review).is_ok());
    }

    #[test]
    fn require_names_missing_capability() {
        let actor = Actor::new(UserId::new(), [Capability::Edit]);
        let err = actor.require(Capability::Review).unwrap_err();
        assert_eq!(
            err,
            DomainError::Forbidden {
                capability: "review".to_string()
            }
        );
    }

    #[test]
    fn empty_capability_set_can_do_nothing() {
        let actor = Actor::new(UserId::new(), []);
        assert!(!actor.can(Capability::Edit));
        assert!(!actor.can(Capability::Review));
        assert!(!actor.can(Capability::AdminBilling));
    }
}
