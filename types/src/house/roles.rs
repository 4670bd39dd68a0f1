use commonware_cryptography::ed25519::PublicKey;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use super::HouseError;

/// Privilege levels gating administrative entry points.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// Manages reward distribution and the pool's credit lines.
    PoolAdmin,
    /// Opens and closes matches.
    MarketOperator,
    /// Tunes market risk parameters; also acts as an operator.
    MarketOwner,
}

impl Role {
    /// Whether holding `self` grants `required`.
    pub fn satisfies(self, required: Role) -> bool {
        self == required || (self == Role::MarketOwner && required == Role::MarketOperator)
    }
}

/// Allow-list of privileged accounts.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Roles {
    grants: BTreeSet<(PublicKey, Role)>,
}

impl Roles {
    pub fn new(grants: impl IntoIterator<Item = (PublicKey, Role)>) -> Self {
        Self {
            grants: grants.into_iter().collect(),
        }
    }

    pub fn grant(&mut self, account: PublicKey, role: Role) {
        self.grants.insert((account, role));
    }

    pub fn has_role(&self, account: &PublicKey, role: Role) -> bool {
        self.grants
            .iter()
            .any(|(granted, held)| granted == account && held.satisfies(role))
    }

    /// Single authorization gate for every privileged operation.
    pub fn authorize(&self, caller: &PublicKey, required: Role) -> Result<(), HouseError> {
        if self.has_role(caller, required) {
            Ok(())
        } else {
            Err(HouseError::Unauthorized)
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = &(PublicKey, Role)> {
        self.grants.iter()
    }
}
