use crate::contracts::token::{ACCESS_TOKEN_LIFESPAN_MILLIS, TokenClaims, now_millis};
use crate::contracts::token_error::TokenError;
use crate::services::codecs::local_token_codec::{LocalToken, LocalTokenCodec};
use crate::services::key_material::SymmetricKey;

/// Access token of an account of this cell. Carries no roles; they are looked up per request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccountAccessToken {
    pub claims: TokenClaims,
}

impl AccountAccessToken {
    pub fn new(issued_at: u64, issuer: &str, subject: &str, schema: Option<String>) -> Self {
        Self {
            claims: TokenClaims::new(issued_at, ACCESS_TOKEN_LIFESPAN_MILLIS, issuer, subject, schema),
        }
    }

    pub fn mint(issuer: &str, subject: &str, schema: Option<String>) -> Self {
        Self::new(now_millis(), issuer, subject, schema)
    }

    pub fn parse(token: &str, issuer: &str, key: &SymmetricKey) -> Result<Self, TokenError> {
        LocalTokenCodec::new(key).decode(token, issuer)
    }

    pub fn to_token_string(&self, key: &SymmetricKey) -> Result<String, TokenError> {
        LocalTokenCodec::new(key).encode(self)
    }
}

impl LocalToken for AccountAccessToken {
    const PREFIX: &'static str = "AA~";
    const CONTENT_FIELDS: usize = 0;

    fn claims(&self) -> &TokenClaims {
        &self.claims
    }

    fn contents(&self) -> Vec<String> {
        Vec::new()
    }

    fn from_parts(claims: TokenClaims, _contents: Vec<String>) -> Option<Self> {
        Some(Self { claims })
    }
}
