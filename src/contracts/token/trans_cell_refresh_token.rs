use crate::contracts::role::Role;
use crate::contracts::token::cell_local_access_token::CellLocalAccessToken;
use crate::contracts::token::trans_cell_access_token::TransCellAccessToken;
use crate::contracts::token::{REFRESH_TOKEN_LIFESPAN_MILLIS, Token, TokenClaims, now_millis};
use crate::contracts::token_error::TokenError;
use crate::services::codecs::local_token_codec::{LocalToken, LocalTokenCodec, join_roles, split_roles};
use crate::services::key_material::SymmetricKey;
use log::debug;

/// Refresh token minted for the principal of a trans-cell token.
/// It keeps the issuer and roles of the original assertion so that later generations can
/// resolve roles again without the signed document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransCellRefreshToken {
    pub claims: TokenClaims,
    pub original_issuer: String,
    pub original_roles: Vec<Role>,
}

impl TransCellRefreshToken {
    pub fn new(
        issued_at: u64,
        issuer: &str,
        subject: &str,
        original_issuer: &str,
        original_roles: Vec<Role>,
        schema: Option<String>,
    ) -> Self {
        Self {
            claims: TokenClaims::new(issued_at, REFRESH_TOKEN_LIFESPAN_MILLIS, issuer, subject, schema),
            original_issuer: original_issuer.to_string(),
            original_roles: original_roles
                .into_iter()
                .map(|role| role.with_default_base_url(original_issuer))
                .collect(),
        }
    }

    /// Mints a refresh token of the cell `issuer` for the principal asserted by `token`.
    pub fn from_trans_cell_token(issued_at: u64, issuer: &str, token: &TransCellAccessToken) -> Self {
        Self::new(
            issued_at,
            issuer,
            &token.claims.subject,
            &token.claims.issuer,
            token.roles.clone(),
            token.claims.schema.clone(),
        )
    }

    pub fn mint(issuer: &str, token: &TransCellAccessToken) -> Self {
        Self::from_trans_cell_token(now_millis(), issuer, token)
    }

    pub fn parse(token: &str, issuer: &str, key: &SymmetricKey) -> Result<Self, TokenError> {
        LocalTokenCodec::new(key).decode(token, issuer)
    }

    pub fn to_token_string(&self, key: &SymmetricKey) -> Result<String, TokenError> {
        LocalTokenCodec::new(key).encode(self)
    }

    /// Issues a new access token at `now` carrying `roles`, usually resolved from this token.
    /// Without a target this is a cell-local access token of the issuing cell, with a target a
    /// freshly signed trans-cell token for that cell.
    pub fn refresh_access_token(&self, now: u64, target: Option<&str>, roles: Vec<Role>) -> Result<Token, TokenError> {
        self.ensure_not_expired(now)?;
        let claims = &self.claims;
        let token = match target {
            None => Token::CellLocalAccess(CellLocalAccessToken::new(
                now,
                &claims.issuer,
                &claims.subject,
                roles,
                claims.schema.clone(),
            )),
            Some(target) => Token::TransCellAccess(TransCellAccessToken::new(
                now,
                &claims.issuer,
                &claims.subject,
                target,
                roles,
                claims.schema.clone(),
            )),
        };
        debug!(subject = claims.subject.as_str(), kind = token.kind().as_str(); "Access token refreshed");
        Ok(token)
    }

    /// Issues the next generation of this refresh token; the original issuer and roles are kept.
    pub fn refresh_refresh_token(&self, now: u64) -> Result<Self, TokenError> {
        self.ensure_not_expired(now)?;
        Ok(Self::new(
            now,
            &self.claims.issuer,
            &self.claims.subject,
            &self.original_issuer,
            self.original_roles.clone(),
            self.claims.schema.clone(),
        ))
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

impl LocalToken for TransCellRefreshToken {
    const PREFIX: &'static str = "RT~";
    const CONTENT_FIELDS: usize = 2;

    fn claims(&self) -> &TokenClaims {
        &self.claims
    }

    fn contents(&self) -> Vec<String> {
        vec![self.original_issuer.clone(), join_roles(&self.original_roles, &self.original_issuer)]
    }

    fn from_parts(claims: TokenClaims, contents: Vec<String>) -> Option<Self> {
        let [original_issuer, roles]: [String; 2] = contents.try_into().ok()?;
        Some(Self {
            claims,
            original_roles: split_roles(&roles)?,
            original_issuer,
        })
    }
}
