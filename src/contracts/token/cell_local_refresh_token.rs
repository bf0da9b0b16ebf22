use crate::contracts::role::Role;
use crate::contracts::token::account_access_token::AccountAccessToken;
use crate::contracts::token::trans_cell_access_token::TransCellAccessToken;
use crate::contracts::token::{REFRESH_TOKEN_LIFESPAN_MILLIS, Token, TokenClaims, now_millis};
use crate::contracts::token_error::TokenError;
use crate::services::codecs::local_token_codec::{LocalToken, LocalTokenCodec};
use crate::services::key_material::SymmetricKey;
use log::debug;

/// Refresh token of an account of this cell.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CellLocalRefreshToken {
    pub claims: TokenClaims,
}

impl CellLocalRefreshToken {
    pub fn new(issued_at: u64, issuer: &str, subject: &str, schema: Option<String>) -> Self {
        Self {
            claims: TokenClaims::new(issued_at, REFRESH_TOKEN_LIFESPAN_MILLIS, issuer, subject, schema),
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

    /// Issues a new access token at `now`.
    /// Without a target this is an account access token of the issuing cell. With a target it is a
    /// freshly signed trans-cell token for that cell whose subject is `{issuer}#{subject}`;
    /// `roles` are only embedded in that case.
    pub fn refresh_access_token(&self, now: u64, target: Option<&str>, roles: Vec<Role>) -> Result<Token, TokenError> {
        self.ensure_not_expired(now)?;
        let claims = &self.claims;
        let token = match target {
            None => Token::AccountAccess(AccountAccessToken::new(
                now,
                &claims.issuer,
                &claims.subject,
                claims.schema.clone(),
            )),
            Some(target) => Token::TransCellAccess(TransCellAccessToken::new(
                now,
                &claims.issuer,
                &format!("{}#{}", claims.issuer, claims.subject),
                target,
                roles,
                claims.schema.clone(),
            )),
        };
        debug!(subject = claims.subject.as_str(), kind = token.kind().as_str(); "Access token refreshed");
        Ok(token)
    }

    /// Issues a new refresh token with the same subject, issuer and schema.
    pub fn refresh_refresh_token(&self, now: u64) -> Result<Self, TokenError> {
        self.ensure_not_expired(now)?;
        Ok(Self::new(now, &self.claims.issuer, &self.claims.subject, self.claims.schema.clone()))
    }

    fn ensure_not_expired(&self, now: u64) -> Result<(), TokenError> {
        if self.claims.is_expired_at(now) {
            return Err(TokenError::Expired {
                expired_at: self.claims.expires_at(),
            });
        }
        Ok(())
    }
}

impl LocalToken for CellLocalRefreshToken {
    const PREFIX: &'static str = "RA~";
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
