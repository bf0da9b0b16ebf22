pub mod trust_link_repository;
pub mod types;
pub mod upsert_repository;
