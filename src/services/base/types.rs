use crate::services::base::trust_link_repository::TrustLinkRepository;

/// Trust-link storage shared behind an `Arc`, as produced by the backends of this crate
pub type SharedTrustLinkRepository = dyn TrustLinkRepository<Error = anyhow::Error>;
