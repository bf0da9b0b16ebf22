
pub mod account_access_token;
pub mod cell_local_access_token;
pub mod cell_local_refresh_token;
pub mod trans_cell_access_token;
pub mod trans_cell_refresh_token;
pub mod unit_local_unit_user_token;

use crate::contracts::role::Role;
use crate::contracts::token::account_access_token::AccountAccessToken;
use crate::contracts::token::cell_local_access_token::CellLocalAccessToken;
use crate::contracts::token::cell_local_refresh_token::CellLocalRefreshToken;
use crate::contracts::token::trans_cell_access_token::TransCellAccessToken;
use crate::contracts::token::trans_cell_refresh_token::TransCellRefreshToken;
use crate::contracts::token::unit_local_unit_user_token::UnitLocalUnitUserToken;
use crate::contracts::token_error::TokenError;
use crate::services::codecs::local_token_codec::LocalTokenCodec;
use crate::services::codecs::signed_assertion_codec::SignedAssertionCodec;
use crate::services::key_material::KeyMaterial;
use std::fmt::{Display, Formatter};
use std::time::{SystemTime, UNIX_EPOCH};

pub const ACCESS_TOKEN_LIFESPAN_MILLIS: u64 = 60 * 60 * 1000;
pub const REFRESH_TOKEN_LIFESPAN_MILLIS: u64 = 24 * 60 * 60 * 1000;
pub const TRANS_CELL_TOKEN_LIFESPAN_MILLIS: u64 = 60 * 60 * 1000;

/// Fields carried by every token kind.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenClaims {
    /// Milliseconds since the epoch.
    pub issued_at: u64,
    /// Milliseconds until expiry.
    pub lifespan: u64,
    pub issuer: String,
    pub subject: String,
    pub schema: Option<String>,
}

impl TokenClaims {
    pub fn new(
        issued_at: u64,
        lifespan: u64,
        issuer: impl Into<String>,
        subject: impl Into<String>,
        schema: Option<String>,
    ) -> Self {
        TokenClaims {
            issued_at,
            lifespan,
            issuer: issuer.into(),
            subject: subject.into(),
            schema: schema.filter(|schema| !schema.is_empty()),
        }
    }

    pub fn expires_at(&self) -> u64 {
        self.issued_at.saturating_add(self.lifespan)
    }

    /// A token is expired strictly after `issued_at + lifespan`; there is no grace period.
    pub fn is_expired_at(&self, now: u64) -> bool {
        now > self.expires_at()
    }

    pub fn is_expired(&self) -> bool {
        self.is_expired_at(now_millis())
    }

    /// Whole seconds left before expiry at `now`, zero once expired.
    pub fn expires_in_at(&self, now: u64) -> u64 {
        self.expires_at().saturating_sub(now) / 1000
    }

    pub fn expires_in(&self) -> u64 {
        self.expires_in_at(now_millis())
    }

    /// The cell part of the subject, everything before the `#` that marks a cell-relative identity.
    pub fn subject_cell_url(&self) -> &str {
        match self.subject.split_once('#') {
            Some((cell, _)) => cell,
            None => &self.subject,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenKind {
    AccountAccess,
    CellLocalAccess,
    CellLocalRefresh,
    TransCellAccess,
    TransCellRefresh,
    UnitLocalUnitUser,
}

impl TokenKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            TokenKind::AccountAccess => "account_access",
            TokenKind::CellLocalAccess => "cell_local_access",
            TokenKind::CellLocalRefresh => "cell_local_refresh",
            TokenKind::TransCellAccess => "trans_cell_access",
            TokenKind::TransCellRefresh => "trans_cell_refresh",
            TokenKind::UnitLocalUnitUser => "unit_local_unit_user",
        }
    }

    pub fn is_refresh(&self) -> bool {
        matches!(self, TokenKind::CellLocalRefresh | TokenKind::TransCellRefresh)
    }
}

impl Display for TokenKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Every token understood by a cell.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Token {
    AccountAccess(AccountAccessToken),
    CellLocalAccess(CellLocalAccessToken),
    CellLocalRefresh(CellLocalRefreshToken),
    TransCellAccess(TransCellAccessToken),
    TransCellRefresh(TransCellRefreshToken),
    UnitLocalUnitUser(UnitLocalUnitUserToken),
}

impl Token {
    pub fn kind(&self) -> TokenKind {
        match self {
            Token::AccountAccess(_) => TokenKind::AccountAccess,
            Token::CellLocalAccess(_) => TokenKind::CellLocalAccess,
            Token::CellLocalRefresh(_) => TokenKind::CellLocalRefresh,
            Token::TransCellAccess(_) => TokenKind::TransCellAccess,
            Token::TransCellRefresh(_) => TokenKind::TransCellRefresh,
            Token::UnitLocalUnitUser(_) => TokenKind::UnitLocalUnitUser,
        }
    }

    pub fn claims(&self) -> &TokenClaims {
        match self {
            Token::AccountAccess(token) => &token.claims,
            Token::CellLocalAccess(token) => &token.claims,
            Token::CellLocalRefresh(token) => &token.claims,
            Token::TransCellAccess(token) => &token.claims,
            Token::TransCellRefresh(token) => &token.claims,
            Token::UnitLocalUnitUser(token) => &token.claims,
        }
    }

    /// The roles carried by the token; empty for kinds that do not carry authorization.
    pub fn roles(&self) -> &[Role] {
        match self {
            Token::CellLocalAccess(token) => &token.roles,
            Token::TransCellAccess(token) => &token.roles,
            Token::TransCellRefresh(token) => &token.original_roles,
            Token::AccountAccess(_) | Token::CellLocalRefresh(_) | Token::UnitLocalUnitUser(_) => &[],
        }
    }

    pub fn issuer(&self) -> &str {
        &self.claims().issuer
    }

    pub fn subject(&self) -> &str {
        &self.claims().subject
    }

    pub fn schema(&self) -> Option<&str> {
        self.claims().schema.as_deref()
    }

    pub fn is_expired(&self) -> bool {
        self.claims().is_expired()
    }

    pub fn is_expired_at(&self, now: u64) -> bool {
        self.claims().is_expired_at(now)
    }

    /// Serializes the token to its wire format.
    pub fn to_token_string(&self, key_material: &KeyMaterial) -> Result<String, TokenError> {
        let codec = LocalTokenCodec::new(key_material.symmetric_key());
        match self {
            Token::AccountAccess(token) => codec.encode(token),
            Token::CellLocalAccess(token) => codec.encode(token),
            Token::CellLocalRefresh(token) => codec.encode(token),
            Token::TransCellRefresh(token) => codec.encode(token),
            Token::UnitLocalUnitUser(token) => codec.encode(token),
            Token::TransCellAccess(token) => SignedAssertionCodec::new(key_material).encode(token),
        }
    }
}

pub fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_millis() as u64)
        .unwrap_or_default()
}
