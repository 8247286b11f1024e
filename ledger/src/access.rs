//! Role membership for ledger writers.
//!
//! Registrars may append records; officers may mark records suspect. A
//! caller may hold both roles. Ledger implementations consult an
//! [`AccessControl`] before every write.

use crate::LedgerError;
use haven_types::{Actor, Role};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessControl {
    #[serde(default)]
    registrars: BTreeSet<Actor>,
    #[serde(default)]
    officers: BTreeSet<Actor>,
}

impl AccessControl {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style grant, for wiring fixtures.
    pub fn with(mut self, actor: Actor, role: Role) -> Self {
        self.grant(actor, role);
        self
    }

    pub fn grant(&mut self, actor: Actor, role: Role) {
        tracing::debug!(%actor, %role, "role granted");
        self.members_mut(role).insert(actor);
    }

    pub fn revoke(&mut self, actor: &Actor, role: Role) -> bool {
        self.members_mut(role).remove(actor)
    }

    pub fn has_role(&self, actor: &Actor, role: Role) -> bool {
        self.members(role).contains(actor)
    }

    /// `Ok(())` if `actor` holds `role`, otherwise `Unauthorized`.
    pub fn require(&self, actor: &Actor, role: Role) -> Result<(), LedgerError> {
        if self.has_role(actor, role) {
            Ok(())
        } else {
            Err(LedgerError::Unauthorized {
                caller: actor.clone(),
                role,
            })
        }
    }

    fn members(&self, role: Role) -> &BTreeSet<Actor> {
        match role {
            Role::Registrar => &self.registrars,
            Role::Officer => &self.officers,
        }
    }

    fn members_mut(&mut self, role: Role) -> &mut BTreeSet<Actor> {
        match role {
            Role::Registrar => &mut self.registrars,
            Role::Officer => &mut self.officers,
        }
    }
}
