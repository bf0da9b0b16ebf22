use async_trait::async_trait;

#[async_trait]
/// Represents a keyed store whose entries can be created or replaced
pub trait UpsertRepository<Key, Entity>: ReadOnlyRepository<Key, Entity> + Send + Sync {
    type Error;

    /// Inserts the entity or replaces the one stored under the key
    async fn upsert(&self, key: Key, entity: Entity) -> Result<Entity, Self::Error>;

    /// Checks if an entry exists
    async fn exists(&self, key: Key) -> Result<bool, Self::Error>;
}

#[async_trait]
/// Represents a keyed store that can only be read
pub trait ReadOnlyRepository<Key, Entity>: Send + Sync {
    type ReadError;

    /// Retrieves an entity by key
    async fn get(&self, key: Key) -> Result<Entity, Self::ReadError>;
}
