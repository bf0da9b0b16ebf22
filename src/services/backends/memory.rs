
use crate::contracts::role::Role;
use crate::services::base::trust_link_repository::{ExtRoleRef, RelationRef, RoleRef, TrustLinkRepository};
use crate::services::base::upsert_repository::{ReadOnlyRepository, UpsertRepository};
use anyhow::bail;
use async_trait::async_trait;
use std::collections::HashMap;
use std::fmt::Debug;
use std::hash::Hash;
use tokio::sync::RwLock;

/// Trust links of one cell, keyed by cell URL in [`InMemoryTrustLinkRepository`].
#[derive(Debug, Clone, Default)]
pub struct CellTrustLinks {
    roles: HashMap<RoleRef, Role>,
    ext_cell_roles: HashMap<String, Vec<RoleRef>>,
    ext_cell_relations: HashMap<String, Vec<RelationRef>>,
    relation_roles: HashMap<RelationRef, Vec<RoleRef>>,
    relation_ext_roles: HashMap<RelationRef, Vec<(ExtRoleRef, String)>>,
    ext_role_roles: HashMap<ExtRoleRef, Vec<RoleRef>>,
}

impl CellTrustLinks {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_role(mut self, id: &str, role: Role) -> Self {
        self.roles.insert(RoleRef(id.to_string()), role);
        self
    }

    pub fn with_ext_cell_role(mut self, ext_cell_url: &str, role: &str) -> Self {
        push(&mut self.ext_cell_roles, ext_cell_url.to_string(), RoleRef(role.to_string()));
        self
    }

    pub fn with_ext_cell_relation(mut self, ext_cell_url: &str, relation: &str) -> Self {
        push(
            &mut self.ext_cell_relations,
            ext_cell_url.to_string(),
            RelationRef(relation.to_string()),
        );
        self
    }

    pub fn with_relation_role(mut self, relation: &str, role: &str) -> Self {
        push(
            &mut self.relation_roles,
            RelationRef(relation.to_string()),
            RoleRef(role.to_string()),
        );
        self
    }

    /// Links an external role, standing for `role_url` in its own cell, to the relation.
    pub fn with_relation_ext_role(mut self, relation: &str, ext_role: &str, role_url: &str) -> Self {
        push(
            &mut self.relation_ext_roles,
            RelationRef(relation.to_string()),
            (ExtRoleRef(ext_role.to_string()), role_url.to_string()),
        );
        self
    }

    pub fn with_ext_role_role(mut self, ext_role: &str, role: &str) -> Self {
        push(
            &mut self.ext_role_roles,
            ExtRoleRef(ext_role.to_string()),
            RoleRef(role.to_string()),
        );
        self
    }
}

fn push<Key: Eq + Hash, Value>(map: &mut HashMap<Key, Vec<Value>>, key: Key, value: Value) {
    map.entry(key).or_default().push(value);
}

/// Trust links of any number of cells held in memory.
pub type InMemoryTrustLinkRepository = RwLock<HashMap<String, CellTrustLinks>>;

#[async_trait]
impl<Key, Entity> ReadOnlyRepository<Key, Entity> for RwLock<HashMap<Key, Entity>>
where
    Entity: Clone + Send + Sync,
    Key: Debug + Eq + Hash + Send + Sync,
{
    type ReadError = anyhow::Error;

    async fn get(&self, key: Key) -> Result<Entity, Self::ReadError> {
        let read_guard = self.read().await;
        match (*read_guard).get(&key) {
            Some(entity) => Ok(entity.clone()),
            None => bail!("Entity {:?} not found", key),
        }
    }
}

#[async_trait]
impl<Key, Entity> UpsertRepository<Key, Entity> for RwLock<HashMap<Key, Entity>>
where
    Entity: Send + Sync + Clone,
    Key: Send + Sync + Eq + Hash + Debug,
{
    type Error = anyhow::Error;

    async fn upsert(&self, key: Key, entity: Entity) -> Result<Entity, Self::Error> {
        let mut write_guard = self.write().await;
        (*write_guard).insert(key, entity.clone());
        Ok(entity)
    }

    async fn exists(&self, key: Key) -> Result<bool, Self::Error> {
        let read_guard = self.read().await;
        Ok((*read_guard).contains_key(&key))
    }
}

#[async_trait]
impl TrustLinkRepository for InMemoryTrustLinkRepository {
    type Error = anyhow::Error;

    async fn find_ext_cell_roles(&self, cell: &str, ext_cell_url: &str) -> Result<Vec<RoleRef>, Self::Error> {
        Ok(find_links(self, cell, |links| links.ext_cell_roles.get(ext_cell_url)).await)
    }

    async fn find_relations_for_ext_cell(
        &self,
        cell: &str,
        ext_cell_url: &str,
    ) -> Result<Vec<RelationRef>, Self::Error> {
        Ok(find_links(self, cell, |links| links.ext_cell_relations.get(ext_cell_url)).await)
    }

    async fn find_roles_for_relation(&self, cell: &str, relation: &RelationRef) -> Result<Vec<RoleRef>, Self::Error> {
        Ok(find_links(self, cell, |links| links.relation_roles.get(relation)).await)
    }

    async fn find_ext_roles_for_relation(
        &self,
        cell: &str,
        relation: &RelationRef,
    ) -> Result<Vec<(ExtRoleRef, String)>, Self::Error> {
        Ok(find_links(self, cell, |links| links.relation_ext_roles.get(relation)).await)
    }

    async fn find_roles_for_ext_role(&self, cell: &str, ext_role: &ExtRoleRef) -> Result<Vec<RoleRef>, Self::Error> {
        Ok(find_links(self, cell, |links| links.ext_role_roles.get(ext_role)).await)
    }

    async fn resolve_role(&self, cell: &str, role: &RoleRef) -> Result<Option<Role>, Self::Error> {
        let read_guard = self.read().await;
        Ok((*read_guard)
            .get(cell)
            .and_then(|links| links.roles.get(role))
            .cloned())
    }
}

async fn find_links<T, F>(store: &InMemoryTrustLinkRepository, cell: &str, select: F) -> Vec<T>
where
    T: Clone,
    F: FnOnce(&CellTrustLinks) -> Option<&Vec<T>>,
{
    let read_guard = store.read().await;
    (*read_guard)
        .get(cell)
        .and_then(select)
        .cloned()
        .unwrap_or_default()
}
