//! Fixtures and test doubles shared by the unit tests.
//! The certificates were generated offline and are valid from 2025 until 2036.

use crate::services::audit::AuditService;
use crate::services::audit::events::role_resolution_event::RoleResolutionEvent;
use crate::services::audit::events::token_validation_event::TokenValidationEvent;
use crate::services::key_material::KeyMaterial;
use std::sync::Mutex;

pub const SYMMETRIC_KEY: &[u8] = b"0123456789abcdef";

pub const HOME_CELL: &str = "https://home.example/";
pub const PARTNER_CELL: &str = "https://partner.example/";

pub const TEST_ROOT: &str = include_str!("testing/fixtures/test_root.pem");
pub const ROGUE_ROOT: &str = include_str!("testing/fixtures/rogue_root.pem");
pub const IMPOSTOR_ROOT: &str = include_str!("testing/fixtures/impostor_root.pem");

/// Issued to `partner.example` by the test root.
pub const PARTNER_CERTIFICATE: &str = include_str!("testing/fixtures/partner.pem");
/// Issued to `partner.example` by the rogue root, same key pair.
pub const PARTNER_ROGUE_CERTIFICATE: &str = include_str!("testing/fixtures/partner_rogue.pem");
/// Issued to `partner.example` by a root that copies the test root name, same key pair.
pub const PARTNER_IMPOSTOR_CERTIFICATE: &str = include_str!("testing/fixtures/partner_impostor.pem");

pub const PARTNER_KEY_PKCS8: &str = include_str!("testing/fixtures/partner_pkcs8.key");
pub const PARTNER_KEY_PKCS1: &str = include_str!("testing/fixtures/partner_pkcs1.key");

/// Assertions of `partner.example` signed with the partner key by the JDK XML-DSig implementation.
/// The first uses an unprefixed `Signature`, `URI=""`, RSA-SHA1 and a five minute validity window;
/// the second a `ds:` prefix, `URI="#_b7e2d3f5a6"`, RSA-SHA256 and SHA-256 digests.
pub const STANDARD_SIGNED_ASSERTION_SHA1: &str = include_str!("testing/fixtures/standard_signed_assertion_sha1.xml");
pub const STANDARD_SIGNED_ASSERTION_SHA256: &str =
    include_str!("testing/fixtures/standard_signed_assertion_sha256.xml");

/// Examples of the W3C Canonical XML 1.0 recommendation, section 3, without their DTDs.
pub const C14N_WHITESPACE_IN_CONTENT: &str = include_str!("testing/fixtures/c14n/whitespace_in_content.xml");
pub const C14N_START_AND_END_TAGS: &str = include_str!("testing/fixtures/c14n/start_and_end_tags.xml");
pub const C14N_START_AND_END_TAGS_CANONICAL: &str =
    include_str!("testing/fixtures/c14n/start_and_end_tags.canonical.xml");
pub const C14N_CHARACTER_REFERENCES: &str = include_str!("testing/fixtures/c14n/character_references.xml");
pub const C14N_CHARACTER_REFERENCES_CANONICAL: &str =
    include_str!("testing/fixtures/c14n/character_references.canonical.xml");

/// COVERAGE: disabled since this is a testing helper
#[cfg_attr(coverage, coverage(off))]
pub fn key_material(certificate: &str, roots: &[&str]) -> KeyMaterial {
    let roots: Vec<String> = roots.iter().map(|root| root.to_string()).collect();
    KeyMaterial::from_pem(SYMMETRIC_KEY, PARTNER_KEY_PKCS8, certificate, &roots).expect("fixture key material")
}

/// Key material of `partner.example` trusting only the test root.
pub fn partner_key_material() -> KeyMaterial {
    key_material(PARTNER_CERTIFICATE, &[TEST_ROOT])
}

/// Keeps every audit event in memory.
#[derive(Default)]
pub struct RecordingAuditService {
    pub token_validations: Mutex<Vec<TokenValidationEvent>>,
    pub role_resolutions: Mutex<Vec<RoleResolutionEvent>>,
}

/// COVERAGE: disabled since this is a testing helper
#[cfg_attr(coverage, coverage(off))]
impl AuditService for RecordingAuditService {
    fn record_token_validation(&self, event: TokenValidationEvent) -> anyhow::Result<()> {
        self.token_validations.lock().expect("audit lock").push(event);
        Ok(())
    }

    fn record_role_resolution(&self, event: RoleResolutionEvent) -> anyhow::Result<()> {
        self.role_resolutions.lock().expect("audit lock").push(event);
        Ok(())
    }
}
