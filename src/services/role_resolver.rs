
use crate::contracts::role::Role;
use crate::contracts::token::now_millis;
use crate::contracts::token::trans_cell_access_token::TransCellAccessToken;
use crate::contracts::token::trans_cell_refresh_token::TransCellRefreshToken;
use crate::services::audit::AuditService;
use crate::services::audit::events::role_resolution_event::RoleResolutionEvent;
use crate::services::base::trust_link_repository::{RelationRef, RoleRef, TrustLinkRepository};
use futures::future::try_join_all;
use log::{debug, error, warn};
use std::collections::HashSet;
use std::sync::Arc;

/// A principal of another cell together with what that cell asserts about it.
pub trait AssertedIdentity {
    /// The cell vouching for the principal.
    fn ext_cell_url(&self) -> &str;

    fn subject(&self) -> &str;

    /// Roles the vouching cell grants the principal in its own namespace.
    fn asserted_roles(&self) -> &[Role];

    fn is_expired_at(&self, now: u64) -> bool;

    fn subject_cell_url(&self) -> &str {
        let subject = self.subject();
        subject.split_once('#').map_or(subject, |(cell, _)| cell)
    }
}

impl AssertedIdentity for TransCellAccessToken {
    fn ext_cell_url(&self) -> &str {
        &self.claims.issuer
    }

    fn subject(&self) -> &str {
        &self.claims.subject
    }

    fn asserted_roles(&self) -> &[Role] {
        &self.roles
    }

    fn is_expired_at(&self, now: u64) -> bool {
        self.claims.is_expired_at(now)
    }
}

/// A refresh token replays the assertion it was minted from.
impl AssertedIdentity for TransCellRefreshToken {
    fn ext_cell_url(&self) -> &str {
        &self.original_issuer
    }

    fn subject(&self) -> &str {
        &self.claims.subject
    }

    fn asserted_roles(&self) -> &[Role] {
        &self.original_roles
    }

    fn is_expired_at(&self, now: u64) -> bool {
        self.claims.is_expired_at(now)
    }
}

/// Computes the roles a principal of another cell holds in this cell by walking the trust links:
/// roles linked to the external cell, roles linked to its relations, and roles linked to external
/// roles of those relations that the external cell asserts for the principal.
pub struct RoleResolver<R: ?Sized> {
    cell: String,
    repository: Arc<R>,
    audit_service: Arc<dyn AuditService>,
}

impl<R> RoleResolver<R>
where
    R: TrustLinkRepository + ?Sized,
{
    pub fn new(cell: &str, repository: Arc<R>, audit_service: Arc<dyn AuditService>) -> Self {
        Self {
            cell: cell.to_string(),
            repository,
            audit_service,
        }
    }

    /// Roles of `identity` inside this cell, without duplicates and in discovery order.
    /// Expired identities and identities whose subject belongs to a cell other than the vouching one
    /// get no roles. Storage errors are returned as they are.
    pub async fn resolve<T>(&self, identity: &T) -> Result<Vec<Role>, R::Error>
    where
        T: AssertedIdentity + Sync + ?Sized,
    {
        self.resolve_at(identity, now_millis()).await
    }

    /// Same as [`RoleResolver::resolve`], checking expiry at `now` in epoch milliseconds.
    pub async fn resolve_at<T>(&self, identity: &T, now: u64) -> Result<Vec<Role>, R::Error>
    where
        T: AssertedIdentity + Sync + ?Sized,
    {
        let ext_cell = identity.ext_cell_url();
        if identity.is_expired_at(now) {
            warn!(ext_cell = ext_cell, subject = identity.subject(); "Expired identity gets no roles");
            return Ok(Vec::new());
        }
        if !same_cell(ext_cell, identity.subject_cell_url()) {
            warn!(ext_cell = ext_cell, subject = identity.subject(); "Subject is not a principal of the asserting cell");
            return Ok(Vec::new());
        }

        let asserted: HashSet<String> = identity.asserted_roles().iter().map(Role::create_url).collect();

        let mut role_refs = self.repository.find_ext_cell_roles(&self.cell, ext_cell).await?;
        let relations = self.repository.find_relations_for_ext_cell(&self.cell, ext_cell).await?;
        let per_relation = try_join_all(
            relations
                .iter()
                .map(|relation| self.relation_role_refs(relation, &asserted)),
        )
        .await?;
        role_refs.extend(per_relation.into_iter().flatten());

        let roles = self.load_roles(role_refs).await?;

        let event = RoleResolutionEvent::new(&self.cell, ext_cell, identity.subject(), &roles);
        if let Err(e) = self.audit_service.record_role_resolution(event) {
            error!(error:% = e; "Failed to record the role resolution");
        }
        Ok(roles)
    }

    async fn relation_role_refs(
        &self,
        relation: &RelationRef,
        asserted: &HashSet<String>,
    ) -> Result<Vec<RoleRef>, R::Error> {
        let mut role_refs = self.repository.find_roles_for_relation(&self.cell, relation).await?;
        for (ext_role, role_url) in self.repository.find_ext_roles_for_relation(&self.cell, relation).await? {
            if asserted.contains(&canonical_role_url(&role_url)) {
                role_refs.extend(self.repository.find_roles_for_ext_role(&self.cell, &ext_role).await?);
            }
        }
        Ok(role_refs)
    }

    async fn load_roles(&self, role_refs: Vec<RoleRef>) -> Result<Vec<Role>, R::Error> {
        let mut seen = HashSet::new();
        let mut roles = Vec::new();
        for role_ref in role_refs {
            let Some(role) = self.repository.resolve_role(&self.cell, &role_ref).await? else {
                debug!(role = role_ref.0.as_str(); "Linked role does not exist");
                continue;
            };
            let role = Role {
                base_url: role.base_url.or_else(|| Some(self.cell.clone())),
                ..role
            };
            if seen.insert(role.create_url()) {
                roles.push(role);
            }
        }
        Ok(roles)
    }
}

fn same_cell(left: &str, right: &str) -> bool {
    left.trim_end_matches('/') == right.trim_end_matches('/')
}

/// External role URLs are compared in canonical form when they parse as role URLs.
fn canonical_role_url(url: &str) -> String {
    Role::from_url(url).map_or_else(|| url.to_string(), |role| role.create_url())
}
