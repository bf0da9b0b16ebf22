pub mod root_certificate_failure;
pub mod signature_failure;

use crate::contracts::token_error::root_certificate_failure::RootCertificateFailure;
use crate::contracts::token_error::signature_failure::SignatureFailure;
use std::error::Error;
use std::fmt::{Display, Formatter};

/// The error type for every token parse, verification and minting operation.
/// Each variant is a separate failure class so that configuration problems,
/// tampering and routine mismatches can be told apart by the caller and in logs.
#[derive(Debug)]
pub enum TokenError {
    /// The token string could not be decoded into a token of any kind.
    Parse(ParseFailure),

    /// The certificate embedded in a signed assertion does not belong to the asserted issuer.
    CertificateMismatch {
        issuer_host: String,
        certificate_cn: Option<String>,
    },

    /// The signing certificate is outside of its validity window.
    CertificateValidity(String),

    /// The signing certificate does not chain to a trusted root.
    RootCertificate(RootCertificateFailure),

    /// The XML signature is present but cryptographically invalid.
    Signature(SignatureFailure),

    /// A token could not be signed while minting.
    Signing(String),

    /// An expired token was presented to a refresh operation.
    Expired { expired_at: u64 },

    /// A field holds a character reserved by the local token layout.
    UnencodableField(&'static str),
}

/// Sub-causes of a parse failure.
/// Local tokens always report `Malformed`: decryption and format failures must not be distinguishable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParseFailure {
    Malformed,
    Encoding,
    Xml(String),
    MissingElement(&'static str),
    MissingSignature,
    UnsupportedAlgorithm(String),
}

impl TokenError {
    /// Short, stable label of the failure class for structured logs and audit records.
    pub fn kind(&self) -> &'static str {
        match self {
            TokenError::Parse(_) => "parse",
            TokenError::CertificateMismatch { .. } => "certificate_mismatch",
            TokenError::CertificateValidity(_) => "certificate_validity",
            TokenError::RootCertificate(_) => "root_certificate",
            TokenError::Signature(_) => "signature",
            TokenError::Signing(_) => "signing",
            TokenError::Expired { .. } => "expired",
            TokenError::UnencodableField(_) => "unencodable_field",
        }
    }

    pub fn is_parse(&self) -> bool {
        matches!(self, TokenError::Parse(_))
    }

    pub(crate) fn malformed() -> Self {
        TokenError::Parse(ParseFailure::Malformed)
    }

    pub(crate) fn xml(cause: impl Display) -> Self {
        TokenError::Parse(ParseFailure::Xml(cause.to_string()))
    }

    pub(crate) fn missing(element: &'static str) -> Self {
        TokenError::Parse(ParseFailure::MissingElement(element))
    }
}

impl From<ParseFailure> for TokenError {
    fn from(failure: ParseFailure) -> Self {
        TokenError::Parse(failure)
    }
}

impl From<RootCertificateFailure> for TokenError {
    fn from(failure: RootCertificateFailure) -> Self {
        TokenError::RootCertificate(failure)
    }
}

impl From<SignatureFailure> for TokenError {
    fn from(failure: SignatureFailure) -> Self {
        TokenError::Signature(failure)
    }
}

impl Display for ParseFailure {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            ParseFailure::Malformed => write!(f, "malformed token"),
            ParseFailure::Encoding => write!(f, "token is not valid base64url"),
            ParseFailure::Xml(cause) => write!(f, "assertion is not well-formed XML: {}", cause),
            ParseFailure::MissingElement(name) => write!(f, "assertion element '{}' is missing", name),
            ParseFailure::MissingSignature => write!(f, "assertion is not signed"),
            ParseFailure::UnsupportedAlgorithm(uri) => write!(f, "unsupported algorithm: {}", uri),
        }
    }
}

impl Display for TokenError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            TokenError::Parse(failure) => write!(f, "Token parse error: {}", failure),
            TokenError::CertificateMismatch {
                issuer_host,
                certificate_cn,
            } => write!(
                f,
                "Certificate subject '{}' does not match issuer host '{}'",
                certificate_cn.as_deref().unwrap_or("<none>"),
                issuer_host
            ),
            TokenError::CertificateValidity(details) => write!(f, "Certificate is not valid: {}", details),
            TokenError::RootCertificate(failure) => write!(f, "Root certificate error: {}", failure),
            TokenError::Signature(failure) => write!(f, "Signature invalid: {}", failure),
            TokenError::Signing(details) => write!(f, "Token signing failed: {}", details),
            TokenError::Expired { expired_at } => write!(f, "Token expired at {}", expired_at),
            TokenError::UnencodableField(field) => write!(f, "Token field '{}' contains a tab character", field),
        }
    }
}

impl Error for TokenError {}
