pub mod trans_cell_access_token_builder;

use crate::contracts::role::Role;
use crate::contracts::token::trans_cell_access_token::trans_cell_access_token_builder::TransCellAccessTokenBuilder;
use crate::contracts::token::{TRANS_CELL_TOKEN_LIFESPAN_MILLIS, TokenClaims, now_millis};
use crate::contracts::token_error::TokenError;
use crate::services::codecs::signed_assertion_codec::SignedAssertionCodec;
use crate::services::key_material::KeyMaterial;
use std::time::SystemTime;
use uuid::Uuid;

/// Identity and roles asserted by one cell for use inside another.
/// `target` is the cell the assertion is addressed to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransCellAccessToken {
    pub id: String,
    pub claims: TokenClaims,
    pub target: String,
    pub roles: Vec<Role>,
}

impl TransCellAccessToken {
    pub fn new(
        issued_at: u64,
        issuer: &str,
        subject: &str,
        target: &str,
        roles: Vec<Role>,
        schema: Option<String>,
    ) -> Self {
        Self {
            id: new_assertion_id(),
            claims: TokenClaims::new(issued_at, TRANS_CELL_TOKEN_LIFESPAN_MILLIS, issuer, subject, schema),
            target: target.to_string(),
            roles: roles.into_iter().map(|role| role.with_default_base_url(issuer)).collect(),
        }
    }

    pub fn mint(issuer: &str, subject: &str, target: &str, roles: Vec<Role>, schema: Option<String>) -> Self {
        Self::new(now_millis(), issuer, subject, target, roles, schema)
    }

    pub fn builder() -> TransCellAccessTokenBuilder {
        TransCellAccessTokenBuilder::new()
    }

    /// Parses and verifies a signed assertion, checking the signing certificate at the current time.
    pub fn parse(token: &str, key_material: &KeyMaterial) -> Result<Self, TokenError> {
        SignedAssertionCodec::new(key_material).decode(token, SystemTime::now())
    }

    pub fn to_token_string(&self, key_material: &KeyMaterial) -> Result<String, TokenError> {
        SignedAssertionCodec::new(key_material).encode(self)
    }

    /// Whether the assertion is addressed to `cell_url`. Trailing slashes are not significant.
    pub fn is_audience(&self, cell_url: &str) -> bool {
        self.target.trim_end_matches('/') == cell_url.trim_end_matches('/')
    }
}

/// SAML IDs must not start with a digit.
pub(crate) fn new_assertion_id() -> String {
    format!("A{}", Uuid::new_v4().simple())
}
