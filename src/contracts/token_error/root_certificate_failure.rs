use std::fmt::{Display, Formatter};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RootCertificateFailure {
    /// No trusted root carries a subject equal to the certificate issuer.
    NotFound { issuer: String },

    /// A root with a matching name exists but did not sign the certificate.
    ChainSignature { issuer: String },
}

impl Display for RootCertificateFailure {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            RootCertificateFailure::NotFound { issuer } => write!(f, "no trusted root for issuer '{}'", issuer),
            RootCertificateFailure::ChainSignature { issuer } => {
                write!(f, "certificate signature does not verify against root '{}'", issuer)
            }
        }
    }
}
