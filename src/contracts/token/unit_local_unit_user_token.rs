use crate::contracts::token::{ACCESS_TOKEN_LIFESPAN_MILLIS, TokenClaims, now_millis};
use crate::contracts::token_error::TokenError;
use crate::services::codecs::local_token_codec::{IvScheme, LocalToken, LocalTokenCodec};
use crate::services::key_material::SymmetricKey;

/// Token of a unit user, issued by the unit itself; the issuer is the unit host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnitLocalUnitUserToken {
    pub claims: TokenClaims,
}

impl UnitLocalUnitUserToken {
    pub fn new(issued_at: u64, lifespan: u64, subject: &str, schema: Option<String>, unit_host: &str) -> Self {
        Self {
            claims: TokenClaims::new(issued_at, lifespan, unit_host, subject, schema),
        }
    }

    pub fn mint(subject: &str, schema: Option<String>, unit_host: &str) -> Self {
        Self::new(now_millis(), ACCESS_TOKEN_LIFESPAN_MILLIS, subject, schema, unit_host)
    }

    pub fn parse(token: &str, unit_host: &str, key: &SymmetricKey) -> Result<Self, TokenError> {
        LocalTokenCodec::new(key).decode(token, unit_host)
    }

    pub fn to_token_string(&self, key: &SymmetricKey) -> Result<String, TokenError> {
        LocalTokenCodec::new(key).encode(self)
    }
}

impl LocalToken for UnitLocalUnitUserToken {
    const PREFIX: &'static str = "AU~";
    const CONTENT_FIELDS: usize = 0;
    const IV_SCHEME: IvScheme = IvScheme::IssuerSeed;

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
