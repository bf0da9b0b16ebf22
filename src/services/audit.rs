pub mod events;
pub mod log_audit_service;

use crate::services::audit::events::role_resolution_event::RoleResolutionEvent;
use crate::services::audit::events::token_validation_event::TokenValidationEvent;
use anyhow::Result;

/// Sink for security-relevant decisions taken by the token services.
pub trait AuditService: Send + Sync {
    fn record_token_validation(&self, event: TokenValidationEvent) -> Result<()>;
    fn record_role_resolution(&self, event: RoleResolutionEvent) -> Result<()>;
}
