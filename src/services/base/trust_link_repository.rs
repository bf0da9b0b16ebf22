use crate::contracts::role::Role;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};

/// Storage identifier of a role of the local cell.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RoleRef(pub String);

/// Storage identifier of a relation of the local cell.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RelationRef(pub String);

/// Storage identifier of an external role, i.e. a role declared by another cell.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ExtRoleRef(pub String);

#[async_trait]
/// Read-only queries over the trust links administered in a cell.
/// `cell` is the URL of the local cell owning the links. Missing links are reported as empty results.
pub trait TrustLinkRepository: Send + Sync {
    type Error;

    /// Roles linked directly to the external cell
    async fn find_ext_cell_roles(&self, cell: &str, ext_cell_url: &str) -> Result<Vec<RoleRef>, Self::Error>;

    /// Relations linked to the external cell
    async fn find_relations_for_ext_cell(&self, cell: &str, ext_cell_url: &str)
    -> Result<Vec<RelationRef>, Self::Error>;

    /// Roles linked to the relation
    async fn find_roles_for_relation(&self, cell: &str, relation: &RelationRef) -> Result<Vec<RoleRef>, Self::Error>;

    /// External roles linked to the relation, each with the role URL it stands for
    async fn find_ext_roles_for_relation(
        &self,
        cell: &str,
        relation: &RelationRef,
    ) -> Result<Vec<(ExtRoleRef, String)>, Self::Error>;

    /// Roles linked to the external role
    async fn find_roles_for_ext_role(&self, cell: &str, ext_role: &ExtRoleRef) -> Result<Vec<RoleRef>, Self::Error>;

    /// Loads a role; `None` when the reference points nowhere
    async fn resolve_role(&self, cell: &str, role: &RoleRef) -> Result<Option<Role>, Self::Error>;
}

impl Display for RoleRef {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl Display for RelationRef {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl Display for ExtRoleRef {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}
