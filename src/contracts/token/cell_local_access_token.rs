use crate::contracts::role::Role;
use crate::contracts::token::{ACCESS_TOKEN_LIFESPAN_MILLIS, TokenClaims, now_millis};
use crate::contracts::token_error::TokenError;
use crate::services::codecs::local_token_codec::{LocalToken, LocalTokenCodec, join_roles, split_roles};
use crate::services::key_material::SymmetricKey;

/// Access token valid only inside the issuing cell, carrying the roles granted there.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CellLocalAccessToken {
    pub claims: TokenClaims,
    pub roles: Vec<Role>,
}

impl CellLocalAccessToken {
    pub fn new(issued_at: u64, issuer: &str, subject: &str, roles: Vec<Role>, schema: Option<String>) -> Self {
        Self {
            claims: TokenClaims::new(issued_at, ACCESS_TOKEN_LIFESPAN_MILLIS, issuer, subject, schema),
            roles: roles.into_iter().map(|role| role.with_default_base_url(issuer)).collect(),
        }
    }

    pub fn mint(issuer: &str, subject: &str, roles: Vec<Role>, schema: Option<String>) -> Self {
        Self::new(now_millis(), issuer, subject, roles, schema)
    }

    pub fn parse(token: &str, issuer: &str, key: &SymmetricKey) -> Result<Self, TokenError> {
        LocalTokenCodec::new(key).decode(token, issuer)
    }

    pub fn to_token_string(&self, key: &SymmetricKey) -> Result<String, TokenError> {
        LocalTokenCodec::new(key).encode(self)
    }
}

impl LocalToken for CellLocalAccessToken {
    const PREFIX: &'static str = "AL~";
    const CONTENT_FIELDS: usize = 1;

    fn claims(&self) -> &TokenClaims {
        &self.claims
    }

    fn contents(&self) -> Vec<String> {
        vec![join_roles(&self.roles, &self.claims.issuer)]
    }

    fn from_parts(claims: TokenClaims, contents: Vec<String>) -> Option<Self> {
        let roles = split_roles(contents.first()?)?;
        Some(Self { claims, roles })
    }
}
