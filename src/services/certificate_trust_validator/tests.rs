use super::*;
use crate::testing::{
    IMPOSTOR_ROOT, PARTNER_CERTIFICATE, PARTNER_IMPOSTOR_CERTIFICATE, PARTNER_ROGUE_CERTIFICATE, ROGUE_ROOT, TEST_ROOT,
};
use pretty_assertions::assert_eq;
use std::time::Duration;
use x509_cert::der::DecodePem;

fn certificate(pem: &str) -> Certificate {
    Certificate::from_pem(pem).unwrap()
}

fn now() -> SystemTime {
    SystemTime::now()
}

#[test]
fn partner_certificate_is_trusted() {
    let roots = vec![certificate(TEST_ROOT)];
    let validator = CertificateTrustValidator::new(&roots);

    validator
        .validate(&certificate(PARTNER_CERTIFICATE), "https://partner.example/", now())
        .unwrap();
}

#[test]
fn host_comparison_ignores_case_port_and_path() {
    let roots = vec![certificate(TEST_ROOT)];
    let validator = CertificateTrustValidator::new(&roots);
    let partner = certificate(PARTNER_CERTIFICATE);

    validator.check_issuer(&partner, "https://PARTNER.example:8443/cell/").unwrap();
}

#[test]
fn issuer_host_must_match_common_name() {
    let roots = vec![certificate(TEST_ROOT)];
    let validator = CertificateTrustValidator::new(&roots);

    match validator.check_issuer(&certificate(PARTNER_CERTIFICATE), "https://home.example/") {
        Err(TokenError::CertificateMismatch {
            issuer_host,
            certificate_cn,
        }) => {
            assert_eq!(issuer_host, "home.example");
            assert_eq!(certificate_cn, Some("partner.example".to_string()));
        }
        other => panic!("expected a certificate mismatch, got {:?}", other),
    }
}

#[test]
fn issuer_that_is_not_a_url_is_a_mismatch() {
    let roots = vec![certificate(TEST_ROOT)];
    let validator = CertificateTrustValidator::new(&roots);

    let error = validator
        .check_issuer(&certificate(PARTNER_CERTIFICATE), "partner.example")
        .unwrap_err();
    assert_eq!(error.kind(), "certificate_mismatch");
}

#[test]
fn validity_window_is_enforced() {
    let roots = vec![certificate(TEST_ROOT)];
    let validator = CertificateTrustValidator::new(&roots);
    let partner = certificate(PARTNER_CERTIFICATE);

    let before = SystemTime::UNIX_EPOCH + Duration::from_secs(1_700_000_000);
    let after = SystemTime::UNIX_EPOCH + Duration::from_secs(2_200_000_000);

    assert!(validator.check_validity(&partner, now()).is_ok());
    assert_eq!(validator.check_validity(&partner, before).unwrap_err().kind(), "certificate_validity");
    assert_eq!(validator.check_validity(&partner, after).unwrap_err().kind(), "certificate_validity");
}

#[test]
fn unknown_root_is_not_found() {
    let roots = vec![certificate(TEST_ROOT)];
    let validator = CertificateTrustValidator::new(&roots);

    match validator.check_root(&certificate(PARTNER_ROGUE_CERTIFICATE)) {
        Err(TokenError::RootCertificate(RootCertificateFailure::NotFound { issuer })) => {
            assert!(issuer.contains("Rogue Root CA"));
        }
        other => panic!("expected a missing root, got {:?}", other),
    }
}

#[test]
fn root_name_without_its_key_fails_the_chain_signature() {
    let roots = vec![certificate(TEST_ROOT)];
    let validator = CertificateTrustValidator::new(&roots);

    match validator.check_root(&certificate(PARTNER_IMPOSTOR_CERTIFICATE)) {
        Err(TokenError::RootCertificate(RootCertificateFailure::ChainSignature { .. })) => {}
        other => panic!("expected a chain signature failure, got {:?}", other),
    }
}

#[test]
fn any_of_several_roots_may_issue() {
    let roots = vec![certificate(ROGUE_ROOT), certificate(TEST_ROOT)];
    let validator = CertificateTrustValidator::new(&roots);

    validator.check_root(&certificate(PARTNER_CERTIFICATE)).unwrap();
    validator.check_root(&certificate(PARTNER_ROGUE_CERTIFICATE)).unwrap();
}

#[test]
fn first_root_with_the_issuer_name_is_used() {
    let roots = vec![certificate(IMPOSTOR_ROOT), certificate(TEST_ROOT)];
    let validator = CertificateTrustValidator::new(&roots);

    assert_eq!(
        validator.check_root(&certificate(PARTNER_CERTIFICATE)).unwrap_err().kind(),
        "root_certificate"
    );
}

#[test]
fn common_name_is_read_from_the_subject() {
    let partner = certificate(PARTNER_CERTIFICATE);
    let root = certificate(TEST_ROOT);

    assert_eq!(common_name(&partner.tbs_certificate.subject).as_deref(), Some("partner.example"));
    assert_eq!(
        common_name(&partner.tbs_certificate.issuer).as_deref(),
        Some("Cell Trust Test Root CA")
    );
    assert!(verify_issued_by(&root, &root));
    assert!(!verify_issued_by(&partner, &partner));
}
