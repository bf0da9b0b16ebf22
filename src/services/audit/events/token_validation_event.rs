use crate::contracts::token::{Token, TokenKind};
use crate::contracts::token_error::TokenError;
use serde::Serialize;

/// Outcome of one attempt to parse a presented token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenValidationEvent {
    pub token_kind: TokenKind,
    pub expected_issuer: String,
    pub subject: Option<String>,
    pub result: TokenValidationResult,
    pub reason_error: Option<String>,
}

impl TokenValidationEvent {
    pub fn accepted(expected_issuer: &str, token: &Token) -> Self {
        Self {
            token_kind: token.kind(),
            expected_issuer: expected_issuer.to_string(),
            subject: Some(token.subject().to_string()),
            result: TokenValidationResult::Allow,
            reason_error: None,
        }
    }

    pub fn rejected(expected_issuer: &str, token_kind: TokenKind, error: &TokenError) -> Self {
        Self {
            token_kind,
            expected_issuer: expected_issuer.to_string(),
            subject: None,
            result: TokenValidationResult::Deny,
            reason_error: Some(error.kind().to_string()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum TokenValidationResult {
    Allow,
    Deny,
}
