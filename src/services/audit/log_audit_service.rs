
use crate::services::audit::AuditService;
use crate::services::audit::events::role_resolution_event::RoleResolutionEvent;
use crate::services::audit::events::token_validation_event::TokenValidationEvent;
use anyhow::Result;

/// Writes audit events to the log facade.
pub struct LogAuditService;

impl LogAuditService {
    pub fn new() -> Self {
        Self {}
    }
}

impl Default for LogAuditService {
    fn default() -> Self {
        Self::new()
    }
}

impl AuditService for LogAuditService {
    fn record_token_validation(&self, event: TokenValidationEvent) -> Result<()> {
        log::info!(
            // Indicates the audit events for easier filtering in log aggregation systems
            log_type = "audit",

            // The event decomposition for structured logging
            token_kind = event.token_kind.as_str(),
            expected_issuer = event.expected_issuer.as_str(),
            subject:? = event.subject,
            result:serde = event.result,
            reason_error:? = event.reason_error;

            // The log message
            "Token validation: {}", event.token_kind);

        Ok(())
    }

    fn record_role_resolution(&self, event: RoleResolutionEvent) -> Result<()> {
        log::info!(
            // Indicates the audit events for easier filtering in log aggregation systems
            log_type = "audit",

            // The event decomposition for structured logging
            cell = event.cell.as_str(),
            ext_cell = event.ext_cell.as_str(),
            subject = event.subject.as_str(),
            roles:serde = event.roles;

            // The log message
            "Roles resolved for {:?} from {:?}", event.subject, event.ext_cell);

        Ok(())
    }
}
