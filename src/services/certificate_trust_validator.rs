#[cfg(test)]
mod tests;

use crate::contracts::token_error::TokenError;
use crate::contracts::token_error::root_certificate_failure::RootCertificateFailure;
use log::{debug, warn};
use rsa::RsaPublicKey;
use rsa::pkcs1v15::{Signature, VerifyingKey};
use rsa::pkcs8::DecodePublicKey;
use rsa::signature::Verifier;
use sha1::Sha1;
use sha2::{Sha256, Sha384, Sha512};
use std::time::SystemTime;
use x509_cert::Certificate;
use x509_cert::der::Encode;
use x509_cert::der::asn1::ObjectIdentifier;
use x509_cert::name::Name;

const COMMON_NAME: ObjectIdentifier = ObjectIdentifier::new_unwrap("2.5.4.3");
const SHA1_WITH_RSA: ObjectIdentifier = ObjectIdentifier::new_unwrap("1.2.840.113549.1.1.5");
const SHA256_WITH_RSA: ObjectIdentifier = ObjectIdentifier::new_unwrap("1.2.840.113549.1.1.11");
const SHA384_WITH_RSA: ObjectIdentifier = ObjectIdentifier::new_unwrap("1.2.840.113549.1.1.12");
const SHA512_WITH_RSA: ObjectIdentifier = ObjectIdentifier::new_unwrap("1.2.840.113549.1.1.13");

/// Validates the certificate that signed a trans-cell assertion against the trusted roots of this cell.
pub struct CertificateTrustValidator<'a> {
    trusted_roots: &'a [Certificate],
}

impl<'a> CertificateTrustValidator<'a> {
    pub fn new(trusted_roots: &'a [Certificate]) -> Self {
        Self { trusted_roots }
    }

    /// Runs the issuer-name, validity and root checks in order and stops at the first failure.
    pub fn validate(&self, certificate: &Certificate, issuer_url: &str, at: SystemTime) -> Result<(), TokenError> {
        self.check_issuer(certificate, issuer_url)?;
        self.check_validity(certificate, at)?;
        self.check_root(certificate)
    }

    /// The certificate subject CN must be the host of the asserted issuer URL.
    pub fn check_issuer(&self, certificate: &Certificate, issuer_url: &str) -> Result<(), TokenError> {
        let issuer_host = url::Url::parse(issuer_url)
            .ok()
            .and_then(|url| url.host_str().map(str::to_string));
        let certificate_cn = common_name(&certificate.tbs_certificate.subject);

        match (issuer_host, certificate_cn) {
            (Some(host), Some(cn)) if host.eq_ignore_ascii_case(&cn) => Ok(()),
            (host, cn) => Err(TokenError::CertificateMismatch {
                issuer_host: host.unwrap_or_else(|| issuer_url.to_string()),
                certificate_cn: cn,
            }),
        }
    }

    pub fn check_validity(&self, certificate: &Certificate, at: SystemTime) -> Result<(), TokenError> {
        if is_valid_at(certificate, at) {
            Ok(())
        } else {
            let validity = &certificate.tbs_certificate.validity;
            Err(TokenError::CertificateValidity(format!(
                "valid from {} until {}",
                validity.not_before, validity.not_after
            )))
        }
    }

    /// Finds the root by exact issuer name and verifies the certificate signature with its key.
    pub fn check_root(&self, certificate: &Certificate) -> Result<(), TokenError> {
        let issuer = &certificate.tbs_certificate.issuer;
        let root = self
            .trusted_roots
            .iter()
            .find(|root| &root.tbs_certificate.subject == issuer)
            .ok_or_else(|| RootCertificateFailure::NotFound {
                issuer: issuer.to_string(),
            })?;

        if verify_issued_by(certificate, root) {
            debug!(root:% = issuer; "Certificate chains to a trusted root");
            Ok(())
        } else {
            warn!(root:% = issuer; "Certificate signature does not verify against the trusted root");
            Err(RootCertificateFailure::ChainSignature {
                issuer: issuer.to_string(),
            }
            .into())
        }
    }
}

pub(crate) fn common_name(name: &Name) -> Option<String> {
    name.0
        .iter()
        .flat_map(|rdn| rdn.0.iter())
        .find(|attribute| attribute.oid == COMMON_NAME)
        .and_then(|attribute| std::str::from_utf8(attribute.value.value()).ok())
        .map(str::to_string)
}

pub(crate) fn public_key(certificate: &Certificate) -> Result<RsaPublicKey, String> {
    let spki = certificate
        .tbs_certificate
        .subject_public_key_info
        .to_der()
        .map_err(|e| e.to_string())?;
    RsaPublicKey::from_public_key_der(&spki).map_err(|e| e.to_string())
}

pub(crate) fn is_valid_at(certificate: &Certificate, at: SystemTime) -> bool {
    let validity = &certificate.tbs_certificate.validity;
    let not_before = SystemTime::UNIX_EPOCH + validity.not_before.to_unix_duration();
    let not_after = SystemTime::UNIX_EPOCH + validity.not_after.to_unix_duration();
    not_before <= at && at <= not_after
}

/// Verifies the certificate signature with the public key of `issuer`.
pub(crate) fn verify_issued_by(certificate: &Certificate, issuer: &Certificate) -> bool {
    let Ok(key) = public_key(issuer) else {
        return false;
    };
    let Ok(tbs) = certificate.tbs_certificate.to_der() else {
        return false;
    };
    let Ok(signature) = Signature::try_from(certificate.signature.raw_bytes()) else {
        return false;
    };

    let algorithm = certificate.signature_algorithm.oid;
    if algorithm == SHA1_WITH_RSA {
        VerifyingKey::<Sha1>::new(key).verify(&tbs, &signature).is_ok()
    } else if algorithm == SHA256_WITH_RSA {
        VerifyingKey::<Sha256>::new(key).verify(&tbs, &signature).is_ok()
    } else if algorithm == SHA384_WITH_RSA {
        VerifyingKey::<Sha384>::new(key).verify(&tbs, &signature).is_ok()
    } else if algorithm == SHA512_WITH_RSA {
        VerifyingKey::<Sha512>::new(key).verify(&tbs, &signature).is_ok()
    } else {
        warn!(algorithm:% = algorithm; "Unsupported certificate signature algorithm");
        false
    }
}
