use super::*;
use crate::contracts::token_error::root_certificate_failure::RootCertificateFailure;
use crate::services::codecs::signed_assertion_codec::xml_document::{Namespaces, canonicalize};
use crate::testing::{
    C14N_CHARACTER_REFERENCES, C14N_CHARACTER_REFERENCES_CANONICAL, C14N_START_AND_END_TAGS,
    C14N_START_AND_END_TAGS_CANONICAL, C14N_WHITESPACE_IN_CONTENT, HOME_CELL, IMPOSTOR_ROOT, PARTNER_CELL,
    PARTNER_IMPOSTOR_CERTIFICATE, PARTNER_ROGUE_CERTIFICATE, ROGUE_ROOT, STANDARD_SIGNED_ASSERTION_SHA1,
    STANDARD_SIGNED_ASSERTION_SHA256, key_material, partner_key_material,
};
use pretty_assertions::assert_eq;
use std::time::Duration;

const ISSUED_AT: u64 = 1_760_000_000_123;
const SCHEMA: &str = "https://app.example/";

fn token() -> TransCellAccessToken {
    TransCellAccessToken::builder()
        .issued_at(ISSUED_AT)
        .issuer(PARTNER_CELL)
        .subject("https://partner.example/#alice")
        .target(HOME_CELL)
        .schema(SCHEMA)
        .role(Role::new("member").with_base_url(PARTNER_CELL))
        .role(Role::new("reader").with_box("photos", None).with_base_url(PARTNER_CELL))
        .build()
        .unwrap()
}

fn document(token: &str) -> String {
    String::from_utf8(URL_SAFE_NO_PAD.decode(token).unwrap()).unwrap()
}

fn encoded(document: &str) -> String {
    URL_SAFE_NO_PAD.encode(document)
}

fn decode(token: &str) -> Result<TransCellAccessToken, TokenError> {
    SignedAssertionCodec::new(&partner_key_material()).decode(token, SystemTime::now())
}

fn sign(token: &TransCellAccessToken) -> String {
    SignedAssertionCodec::new(&partner_key_material()).encode(token).unwrap()
}

fn signed() -> String {
    sign(&token())
}

#[test]
fn signed_assertion_round_trips() {
    let token = token();
    let decoded = decode(&sign(&token)).unwrap();

    assert_eq!(decoded, token);
    assert_eq!(decoded.claims.schema.as_deref(), Some(SCHEMA));
    assert_eq!(decoded.roles.len(), 2);
}

#[test]
fn token_is_unpadded_base64url_without_prefix() {
    let signed = signed();
    assert!(!signed.contains(['=', '+', '/', '\n']));
    assert!(!signed.contains('~'));
}

#[test]
fn assertion_has_saml_shape() {
    let assertion = parse(&document(&signed())).unwrap();

    assert_eq!(assertion.name, "saml:Assertion");
    assert_eq!(assertion.attribute("Version"), Some("2.0"));
    assert_eq!(assertion.attribute("IssueInstant"), Some("2025-10-09T08:53:20.123Z"));

    let children: Vec<&str> = assertion.elements().map(XmlElement::local_name).collect();
    assert_eq!(
        children,
        vec![
            "Issuer",
            "Signature",
            "Subject",
            "Conditions",
            "AuthnStatement",
            "AttributeStatement"
        ]
    );

    let mut values = Vec::new();
    assertion.descendants("AttributeValue", &mut values);
    let values: Vec<String> = values.into_iter().map(XmlElement::text).collect();
    assert_eq!(
        values,
        vec![
            "https://partner.example/__role/__/member",
            "https://partner.example/__role/photos/reader"
        ]
    );
}

#[test]
fn absent_schema_is_an_empty_audience() {
    let mut token = token();
    token.claims.schema = None;
    let signed = SignedAssertionCodec::new(&partner_key_material()).encode(&token).unwrap();

    assert!(document(&signed).contains("<saml:Audience></saml:Audience>"));
    assert_eq!(decode(&signed).unwrap().claims.schema, None);
}

#[test]
fn tampered_body_fails_signature_validation() {
    let tampered = document(&signed()).replace("#alice", "#mallory");

    match decode(&encoded(&tampered)) {
        Err(TokenError::Signature(failure)) => {
            assert!(failure.signature_value_valid);
            assert_eq!(failure.invalid_references, vec![String::new()]);
        }
        other => panic!("expected a signature error, got {:?}", other),
    }
}

#[test]
fn tampered_sibling_fails_signature_validation() {
    let tampered = document(&signed()).replace("PasswordProtectedTransport", "PasswordProtectedTransporT");

    let error = decode(&encoded(&tampered)).unwrap_err();
    assert_eq!(error.kind(), "signature");
}

#[test]
fn tampered_signed_info_invalidates_the_signature_value() {
    let original = document(&signed());
    let tampered = original.replace(
        "<ds:DigestMethod Algorithm=\"http://www.w3.org/2000/09/xmldsig#sha1\"></ds:DigestMethod>",
        "<ds:DigestMethod Algorithm=\"http://www.w3.org/2001/04/xmlenc#sha256\"></ds:DigestMethod>",
    );
    assert_ne!(tampered, original);

    match decode(&encoded(&tampered)) {
        Err(TokenError::Signature(failure)) => {
            assert!(!failure.signature_value_valid);
            assert_eq!(failure.invalid_references.len(), 1);
        }
        other => panic!("expected a signature error, got {:?}", other),
    }
}

#[test]
fn missing_signature_is_a_parse_error() {
    let document = document(&signed());
    let start = document.find("<ds:Signature").unwrap();
    let end = document.find("</ds:Signature>").unwrap() + "</ds:Signature>".len();
    let unsigned = format!("{}{}", &document[..start], &document[end..]);

    match decode(&encoded(&unsigned)) {
        Err(TokenError::Parse(ParseFailure::MissingSignature)) => {}
        other => panic!("expected a missing signature error, got {:?}", other),
    }
}

#[test]
fn untrusted_root_is_a_root_certificate_error() {
    let rogue = key_material(PARTNER_ROGUE_CERTIFICATE, &[ROGUE_ROOT]);
    let signed = SignedAssertionCodec::new(&rogue).encode(&token()).unwrap();

    match decode(&signed) {
        Err(TokenError::RootCertificate(RootCertificateFailure::NotFound { .. })) => {}
        other => panic!("expected a root certificate error, got {:?}", other),
    }
}

#[test]
fn root_with_copied_name_fails_the_chain_signature() {
    let impostor = key_material(PARTNER_IMPOSTOR_CERTIFICATE, &[IMPOSTOR_ROOT]);
    let signed = SignedAssertionCodec::new(&impostor).encode(&token()).unwrap();

    match decode(&signed) {
        Err(TokenError::RootCertificate(RootCertificateFailure::ChainSignature { .. })) => {}
        other => panic!("expected a chain signature error, got {:?}", other),
    }
}

#[test]
fn certificate_of_another_cell_is_a_mismatch() {
    let mut token = token();
    token.claims.issuer = HOME_CELL.to_string();
    let signed = SignedAssertionCodec::new(&partner_key_material()).encode(&token).unwrap();

    match decode(&signed) {
        Err(TokenError::CertificateMismatch {
            issuer_host,
            certificate_cn,
        }) => {
            assert_eq!(issuer_host, "home.example");
            assert_eq!(certificate_cn.as_deref(), Some("partner.example"));
        }
        other => panic!("expected a certificate mismatch, got {:?}", other),
    }
}

#[test]
fn expired_certificate_is_a_validity_error() {
    let codec_material = partner_key_material();
    let codec = SignedAssertionCodec::new(&codec_material);
    let signed = codec.encode(&token()).unwrap();

    let far_future = SystemTime::UNIX_EPOCH + Duration::from_secs(2_500_000_000);
    let distant_past = SystemTime::UNIX_EPOCH + Duration::from_secs(1_000_000_000);

    assert_eq!(codec.decode(&signed, far_future).unwrap_err().kind(), "certificate_validity");
    assert_eq!(codec.decode(&signed, distant_past).unwrap_err().kind(), "certificate_validity");
}

#[test]
fn invalid_encodings_are_parse_errors() {
    assert!(matches!(
        decode("not base64 at all"),
        Err(TokenError::Parse(ParseFailure::Encoding))
    ));
    assert!(matches!(
        decode(&encoded("<saml:Assertion>")),
        Err(TokenError::Parse(ParseFailure::Xml(_)))
    ));
    assert!(matches!(
        decode(&encoded("<Envelope></Envelope>")),
        Err(TokenError::Parse(ParseFailure::MissingElement("Assertion")))
    ));
}

#[test]
fn document_type_declarations_are_refused() {
    let document = format!("<!DOCTYPE x [<!ENTITY e \"e\">]>{}", document(&signed()));
    assert!(matches!(
        decode(&encoded(&document)),
        Err(TokenError::Parse(ParseFailure::Xml(_)))
    ));
}

#[test]
fn canonical_form_sorts_attributes_and_expands_empty_elements() {
    let root = parse(
        "<?xml version=\"1.0\"?><a:root z=\"1\" xmlns:b=\"urn:b\" b=\"2\" xmlns:a=\"urn:a\"><!-- note --><a:child b:x=\"3\" y=\"4\"/></a:root>",
    )
    .unwrap();

    assert_eq!(
        canonicalize(&root, &Namespaces::new(), None),
        "<a:root xmlns:a=\"urn:a\" xmlns:b=\"urn:b\" b=\"2\" z=\"1\"><a:child y=\"4\" b:x=\"3\"></a:child></a:root>"
    );
}

#[test]
fn canonical_subtree_renders_inherited_namespaces() {
    let root = parse("<r xmlns=\"urn:r\" xmlns:a=\"urn:a\"><a:c xmlns:a=\"urn:a\"><d/></a:c></r>").unwrap();
    let child = root.child("c").unwrap();

    assert_eq!(
        canonicalize(&root, &Namespaces::new(), None),
        "<r xmlns=\"urn:r\" xmlns:a=\"urn:a\"><a:c><d></d></a:c></r>"
    );
    assert_eq!(
        canonicalize(child, &root.scope(&Namespaces::new()), None),
        "<a:c xmlns=\"urn:r\" xmlns:a=\"urn:a\"><d></d></a:c>"
    );
}

#[test]
fn canonical_form_escapes_text_and_attributes() {
    let root = parse("<r a=\"&quot;x&quot;&#9;\">1 &lt; 2 &amp;&amp; 3 &gt; 2</r>").unwrap();

    assert_eq!(
        canonicalize(&root, &Namespaces::new(), None),
        "<r a=\"&quot;x&quot;&#x9;\">1 &lt; 2 &amp;&amp; 3 &gt; 2</r>"
    );
}

#[test]
fn lifespan_is_read_from_the_validity_window() {
    let mut token = token();
    token.claims.lifespan = 5 * 60 * 1000;

    let decoded = decode(&sign(&token)).unwrap();

    assert_eq!(decoded.claims.lifespan, 5 * 60 * 1000);
    assert!(decoded.claims.is_expired_at(ISSUED_AT + 5 * 60 * 1000 + 1));
}

fn decode_at_issue(document: &str) -> Result<TransCellAccessToken, TokenError> {
    SignedAssertionCodec::new(&partner_key_material())
        .decode(&encoded(document), SystemTime::UNIX_EPOCH + Duration::from_millis(ISSUED_AT))
}

#[test]
fn assertion_signed_by_a_standard_implementation_verifies() {
    let decoded = decode_at_issue(STANDARD_SIGNED_ASSERTION_SHA1).unwrap();

    assert_eq!(decoded.id, "_a6f1c2d4e5");
    assert_eq!(decoded.claims.issued_at, ISSUED_AT);
    assert_eq!(decoded.claims.lifespan, 5 * 60 * 1000);
    assert_eq!(decoded.claims.issuer, PARTNER_CELL);
    assert_eq!(decoded.claims.subject, "https://partner.example/#alice");
    assert_eq!(decoded.claims.schema.as_deref(), Some(SCHEMA));
    assert_eq!(decoded.target, HOME_CELL);
    assert_eq!(
        decoded.roles.iter().map(Role::create_url).collect::<Vec<_>>(),
        vec![
            "https://partner.example/__role/__/member",
            "https://app.example/__role/__/reader"
        ]
    );
}

#[test]
fn id_reference_with_sha256_from_a_standard_implementation_verifies() {
    let decoded = decode_at_issue(STANDARD_SIGNED_ASSERTION_SHA256).unwrap();

    assert_eq!(decoded.id, "_b7e2d3f5a6");
    assert_eq!(decoded.claims.lifespan, 60 * 60 * 1000);
    assert_eq!(decoded.roles.len(), 2);
}

#[test]
fn standard_signed_assertion_detects_tampering() {
    for document in [STANDARD_SIGNED_ASSERTION_SHA1, STANDARD_SIGNED_ASSERTION_SHA256] {
        let tampered = document.replace("#alice", "#mallory");
        match decode_at_issue(&tampered) {
            Err(TokenError::Signature(failure)) => {
                assert!(failure.signature_value_valid);
                assert_eq!(failure.invalid_references.len(), 1);
            }
            other => panic!("expected a signature error, got {:?}", other),
        }
    }
}

#[test]
fn canonical_form_matches_the_recommendation_examples() {
    let canonical = |document: &str| canonicalize(&parse(document).unwrap(), &Namespaces::new(), None);

    assert_eq!(
        canonical(C14N_WHITESPACE_IN_CONTENT),
        C14N_WHITESPACE_IN_CONTENT.trim_end()
    );
    assert_eq!(
        canonical(C14N_START_AND_END_TAGS),
        C14N_START_AND_END_TAGS_CANONICAL.trim_end()
    );
    assert_eq!(
        canonical(C14N_CHARACTER_REFERENCES),
        C14N_CHARACTER_REFERENCES_CANONICAL.trim_end()
    );
}

#[test]
fn literal_line_breaks_and_attribute_whitespace_are_normalized() {
    let root = parse("<r a=\"x\ty\r\nz\" b=\"&#9;&#13;\">1\r\n2\r3&#13;</r>").unwrap();

    assert_eq!(
        canonicalize(&root, &Namespaces::new(), None),
        "<r a=\"x y z\" b=\"&#x9;&#xD;\">1\n2\n3&#xD;</r>"
    );
}

#[test]
fn child_outlives_the_name_it_was_found_by() {
    let root = parse("<r><Conditions NotOnOrAfter=\"x\"/></r>").unwrap();
    let conditions = {
        let name = String::from("Conditions");
        root.child(&name)
    };

    assert_eq!(conditions.and_then(|element| element.attribute("NotOnOrAfter")), Some("x"));
}
