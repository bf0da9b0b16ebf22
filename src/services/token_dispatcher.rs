
use crate::contracts::token::account_access_token::AccountAccessToken;
use crate::contracts::token::cell_local_access_token::CellLocalAccessToken;
use crate::contracts::token::cell_local_refresh_token::CellLocalRefreshToken;
use crate::contracts::token::trans_cell_refresh_token::TransCellRefreshToken;
use crate::contracts::token::unit_local_unit_user_token::UnitLocalUnitUserToken;
use crate::contracts::token::{Token, TokenKind};
use crate::contracts::token_error::TokenError;
use crate::services::audit::AuditService;
use crate::services::audit::events::token_validation_event::TokenValidationEvent;
use crate::services::codecs::local_token_codec::{LocalToken, LocalTokenCodec};
use crate::services::codecs::signed_assertion_codec::SignedAssertionCodec;
use crate::services::key_material::KeyMaterial;
use log::{debug, error};
use std::sync::Arc;
use std::time::SystemTime;

/// Prefixes in the order they are tried.
const PREFIXES: [(&str, TokenKind); 5] = [
    (AccountAccessToken::PREFIX, TokenKind::AccountAccess),
    (CellLocalAccessToken::PREFIX, TokenKind::CellLocalAccess),
    (CellLocalRefreshToken::PREFIX, TokenKind::CellLocalRefresh),
    (TransCellRefreshToken::PREFIX, TokenKind::TransCellRefresh),
    (UnitLocalUnitUserToken::PREFIX, TokenKind::UnitLocalUnitUser),
];

/// The kind a token string claims to be. Strings without a known prefix are signed assertions.
pub fn detect_kind(token: &str) -> TokenKind {
    PREFIXES
        .iter()
        .find(|(prefix, _)| token.starts_with(prefix))
        .map_or(TokenKind::TransCellAccess, |(_, kind)| *kind)
}

/// Parses any token presented to this cell and records the outcome with the audit service.
/// Expiry is not checked here; callers check the returned token before granting access.
pub struct TokenDispatcher {
    key_material: Arc<KeyMaterial>,
    audit_service: Arc<dyn AuditService>,
}

impl TokenDispatcher {
    pub fn new(key_material: Arc<KeyMaterial>, audit_service: Arc<dyn AuditService>) -> Self {
        Self {
            key_material,
            audit_service,
        }
    }

    /// Parses `token` as issued by `issuer`.
    /// Unit-user tokens are bound to `host` instead, or to `issuer` when no host is given.
    pub fn parse(&self, token: &str, issuer: &str, host: Option<&str>) -> Result<Token, TokenError> {
        self.parse_at(token, issuer, host, SystemTime::now())
    }

    /// Same as [`TokenDispatcher::parse`], checking signing certificates at `at`.
    pub fn parse_at(&self, token: &str, issuer: &str, host: Option<&str>, at: SystemTime) -> Result<Token, TokenError> {
        let kind = detect_kind(token);
        debug!(kind = kind.as_str(), issuer = issuer; "Dispatching token");

        let result = self.decode(kind, token, issuer, host, at);
        let event = match &result {
            Ok(token) => TokenValidationEvent::accepted(issuer, token),
            Err(e) => TokenValidationEvent::rejected(issuer, kind, e),
        };
        if let Err(e) = self.audit_service.record_token_validation(event) {
            error!(error:% = e; "Failed to record the token validation");
        }
        result
    }

    fn decode(
        &self,
        kind: TokenKind,
        token: &str,
        issuer: &str,
        host: Option<&str>,
        at: SystemTime,
    ) -> Result<Token, TokenError> {
        let codec = LocalTokenCodec::new(self.key_material.symmetric_key());
        match kind {
            TokenKind::AccountAccess => codec.decode(token, issuer).map(Token::AccountAccess),
            TokenKind::CellLocalAccess => codec.decode(token, issuer).map(Token::CellLocalAccess),
            TokenKind::CellLocalRefresh => codec.decode(token, issuer).map(Token::CellLocalRefresh),
            TokenKind::TransCellRefresh => codec.decode(token, issuer).map(Token::TransCellRefresh),
            TokenKind::UnitLocalUnitUser => codec
                .decode(token, host.unwrap_or(issuer))
                .map(Token::UnitLocalUnitUser),
            TokenKind::TransCellAccess => SignedAssertionCodec::new(&self.key_material)
                .decode(token, at)
                .map(Token::TransCellAccess),
        }
    }
}
