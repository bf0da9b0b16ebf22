
use crate::configuration::configuration_error::ConfigurationError;
use crate::configuration::models::key_material_settings::KeyMaterialSettings;
use crate::services::certificate_trust_validator::{is_valid_at, public_key};
use log::info;
use rsa::pkcs1::DecodeRsaPrivateKey;
use rsa::pkcs8::DecodePrivateKey;
use rsa::{RsaPrivateKey, RsaPublicKey};
use std::fmt::{Debug, Formatter};
use std::path::Path;
use std::sync::{Arc, OnceLock};
use std::time::SystemTime;
use x509_cert::Certificate;
use x509_cert::der::{DecodePem, Encode};

const DEFAULT_ROOT_CA: &str = include_str!("../../resources/default_root_ca.pem");

static SHARED: OnceLock<Arc<KeyMaterial>> = OnceLock::new();

/// Raw AES key; the length selects AES-128, AES-192 or AES-256.
#[derive(Clone)]
pub enum SymmetricKey {
    Aes128([u8; 16]),
    Aes192([u8; 24]),
    Aes256([u8; 32]),
}

impl SymmetricKey {
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, ConfigurationError> {
        match bytes.len() {
            16 => Ok(SymmetricKey::Aes128(copy_key(bytes))),
            24 => Ok(SymmetricKey::Aes192(copy_key(bytes))),
            32 => Ok(SymmetricKey::Aes256(copy_key(bytes))),
            length => Err(ConfigurationError::SymmetricKeyLength(length)),
        }
    }
}

fn copy_key<const N: usize>(bytes: &[u8]) -> [u8; N] {
    let mut key = [0u8; N];
    key.copy_from_slice(bytes);
    key
}

/// The keys and certificates of this cell. Built once at start-up and read-only afterwards.
pub struct KeyMaterial {
    symmetric_key: SymmetricKey,
    signing_key: RsaPrivateKey,
    certificate: Certificate,
    certificate_der: Vec<u8>,
    trusted_roots: Vec<Certificate>,
}

impl KeyMaterial {
    /// Builds the key material from in-memory PEM documents.
    /// An empty `trusted_roots_pem` falls back to the bundled default root.
    pub fn from_pem(
        symmetric_key: &[u8],
        private_key_pem: &str,
        certificate_pem: &str,
        trusted_roots_pem: &[String],
    ) -> Result<Self, ConfigurationError> {
        let symmetric_key = SymmetricKey::from_bytes(symmetric_key)?;
        let signing_key = parse_private_key(private_key_pem)?;

        let certificate =
            Certificate::from_pem(certificate_pem).map_err(|e| ConfigurationError::Certificate(e.to_string()))?;
        let certificate_key = public_key(&certificate).map_err(ConfigurationError::Certificate)?;
        if certificate_key != RsaPublicKey::from(&signing_key) {
            return Err(ConfigurationError::Certificate(
                "certificate does not match the private key".to_string(),
            ));
        }
        let certificate_der = certificate
            .to_der()
            .map_err(|e| ConfigurationError::Certificate(e.to_string()))?;

        let trusted_roots = if trusted_roots_pem.is_empty() {
            info!("No trusted root certificates configured, using the bundled default root");
            load_roots(&[DEFAULT_ROOT_CA.to_string()])?
        } else {
            load_roots(trusted_roots_pem)?
        };

        Ok(KeyMaterial {
            symmetric_key,
            signing_key,
            certificate,
            certificate_der,
            trusted_roots,
        })
    }

    /// Reads every configured file eagerly so that a broken configuration fails at start-up.
    pub fn from_settings(settings: &KeyMaterialSettings) -> Result<Self, ConfigurationError> {
        let symmetric_key = match (&settings.symmetric_key, &settings.symmetric_key_path) {
            (Some(key), None) => key.as_bytes().to_vec(),
            (None, Some(path)) => read_symmetric_key(path)?,
            _ => {
                return Err(ConfigurationError::Settings(
                    "exactly one of symmetric_key and symmetric_key_path must be set".to_string(),
                ));
            }
        };
        let private_key = read_file(&settings.private_key_path)?;
        let certificate = read_file(&settings.certificate_path)?;
        let roots = settings
            .trusted_root_paths
            .iter()
            .map(|path| read_file(path))
            .collect::<Result<Vec<_>, _>>()?;

        info!(
            certificate:? = settings.certificate_path,
            roots = roots.len();
            "Loading key material");
        Self::from_pem(&symmetric_key, &private_key, &certificate, &roots)
    }

    /// Publishes the key material process-wide. Only the first call succeeds.
    pub fn install(self) -> Result<Arc<KeyMaterial>, ConfigurationError> {
        let shared = Arc::new(self);
        SHARED
            .set(shared.clone())
            .map_err(|_| ConfigurationError::AlreadyInitialized)?;
        Ok(shared)
    }

    pub fn shared() -> Option<Arc<KeyMaterial>> {
        SHARED.get().cloned()
    }

    pub fn symmetric_key(&self) -> &SymmetricKey {
        &self.symmetric_key
    }

    pub fn signing_key(&self) -> &RsaPrivateKey {
        &self.signing_key
    }

    pub fn certificate(&self) -> &Certificate {
        &self.certificate
    }

    pub fn certificate_der(&self) -> &[u8] {
        &self.certificate_der
    }

    pub fn trusted_roots(&self) -> &[Certificate] {
        &self.trusted_roots
    }
}

impl Debug for KeyMaterial {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KeyMaterial")
            .field("certificate", &self.certificate.tbs_certificate.subject.to_string())
            .field("trusted_roots", &self.trusted_roots.len())
            .finish_non_exhaustive()
    }
}

fn parse_private_key(pem: &str) -> Result<RsaPrivateKey, ConfigurationError> {
    RsaPrivateKey::from_pkcs8_pem(pem)
        .or_else(|_| RsaPrivateKey::from_pkcs1_pem(pem))
        .map_err(|e| ConfigurationError::PrivateKey(e.to_string()))
}

fn load_roots(documents: &[String]) -> Result<Vec<Certificate>, ConfigurationError> {
    let now = SystemTime::now();
    let mut roots: Vec<Certificate> = Vec::new();
    for document in documents {
        let chain = Certificate::load_pem_chain(document.as_bytes())
            .map_err(|e| ConfigurationError::RootCertificate(e.to_string()))?;
        if chain.is_empty() {
            return Err(ConfigurationError::RootCertificate(
                "no certificate found in PEM document".to_string(),
            ));
        }
        for root in chain {
            let subject = root.tbs_certificate.subject.to_string();
            if !is_valid_at(&root, now) {
                return Err(ConfigurationError::RootCertificate(format!("'{}' is expired", subject)));
            }
            if roots
                .iter()
                .any(|known| known.tbs_certificate.subject == root.tbs_certificate.subject)
            {
                return Err(ConfigurationError::RootCertificate(format!("'{}' is duplicated", subject)));
            }
            info!(subject = subject.as_str(); "Trusted root certificate loaded");
            roots.push(root);
        }
    }
    Ok(roots)
}

fn read_file(path: &Path) -> Result<String, ConfigurationError> {
    std::fs::read_to_string(path).map_err(|source| ConfigurationError::Io {
        path: path.to_path_buf(),
        source,
    })
}

fn read_symmetric_key(path: &Path) -> Result<Vec<u8>, ConfigurationError> {
    let bytes = std::fs::read(path).map_err(|source| ConfigurationError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    match bytes.len() {
        16 | 24 | 32 => Ok(bytes),
        // key files written by editors usually end with a newline
        _ => Ok(bytes.trim_ascii_end().to_vec()),
    }
}
