#[cfg(test)]
mod tests;

pub(crate) mod xml_document;
pub(crate) mod xml_signature;

use crate::contracts::role::Role;
use crate::contracts::token::trans_cell_access_token::TransCellAccessToken;
use crate::contracts::token::{TRANS_CELL_TOKEN_LIFESPAN_MILLIS, TokenClaims};
use crate::contracts::token_error::{ParseFailure, TokenError};
use crate::services::certificate_trust_validator::{CertificateTrustValidator, public_key};
use crate::services::codecs::local_token_codec::URL_SAFE_LENIENT;
use crate::services::codecs::signed_assertion_codec::xml_document::{XmlElement, parse, serialize};
use crate::services::key_material::KeyMaterial;
use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use chrono::{DateTime, SecondsFormat, Utc};
use log::{debug, warn};
use std::time::SystemTime;
use x509_cert::Certificate;
use x509_cert::der::Decode;

pub const SAML_NAMESPACE: &str = "urn:oasis:names:tc:SAML:2.0:assertion";

const SAML: &str = "saml";
const SAML_VERSION: &str = "2.0";
const BEARER: &str = "urn:oasis:names:tc:SAML:2.0:cm:bearer";
const PASSWORD_PROTECTED_TRANSPORT: &str = "urn:oasis:names:tc:SAML:2.0:ac:classes:PasswordProtectedTransport";
const ROLES_ATTRIBUTE: &str = "Roles";

/// The signature goes right after `Issuer`, where SAML schema places it.
const SIGNATURE_POSITION: usize = 1;

/// Builds and verifies the signed SAML 2.0 assertions carried by trans-cell tokens.
pub struct SignedAssertionCodec<'a> {
    key_material: &'a KeyMaterial,
}

impl<'a> SignedAssertionCodec<'a> {
    pub fn new(key_material: &'a KeyMaterial) -> Self {
        Self { key_material }
    }

    pub fn encode(&self, token: &TransCellAccessToken) -> Result<String, TokenError> {
        let mut assertion = build_assertion(token)?;
        xml_signature::sign(
            &mut assertion,
            SIGNATURE_POSITION,
            self.key_material.signing_key(),
            self.key_material.certificate_der(),
        )?;
        Ok(URL_SAFE_NO_PAD.encode(serialize(&assertion)))
    }

    /// Decodes the assertion and validates its signature.
    /// The checks run in a fixed order: signature presence, certificate subject against the issuer,
    /// certificate validity at `at`, trusted root, then the XML signature itself.
    pub fn decode(&self, token: &str, at: SystemTime) -> Result<TransCellAccessToken, TokenError> {
        let document = URL_SAFE_LENIENT
            .decode(token.trim())
            .ok()
            .and_then(|bytes| String::from_utf8(bytes).ok())
            .ok_or(TokenError::Parse(ParseFailure::Encoding))?;
        let assertion = parse(&document)?;
        let parsed = read_assertion(&assertion)?;

        let signature = xml_signature::find_signature(&assertion).ok_or(ParseFailure::MissingSignature)?;
        let certificate = Certificate::from_der(&xml_signature::embedded_certificate(signature)?)
            .map_err(|e| TokenError::CertificateValidity(format!("unreadable certificate: {}", e)))?;

        CertificateTrustValidator::new(self.key_material.trusted_roots()).validate(
            &certificate,
            &parsed.claims.issuer,
            at,
        )?;
        let key = public_key(&certificate).map_err(TokenError::CertificateValidity)?;
        xml_signature::verify(&assertion, signature, &key)?;

        debug!(id = parsed.id.as_str(), issuer = parsed.claims.issuer.as_str(); "Assertion signature verified");
        Ok(parsed)
    }
}

fn build_assertion(token: &TransCellAccessToken) -> Result<XmlElement, TokenError> {
    let issue_instant = format_instant(token.claims.issued_at)?;
    let not_on_or_after = format_instant(token.claims.expires_at())?;

    let attribute = token.roles.iter().fold(
        saml("Attribute").with_attribute("Name", ROLES_ATTRIBUTE),
        |attribute, role| {
            attribute.with_child(
                saml("AttributeValue").with_text(role.scheme_create_url_for_trans_cell(&token.claims.issuer)),
            )
        },
    );

    Ok(saml("Assertion")
        .with_attribute(format!("xmlns:{}", SAML), SAML_NAMESPACE)
        .with_attribute("ID", token.id.as_str())
        .with_attribute("IssueInstant", issue_instant.as_str())
        .with_attribute("Version", SAML_VERSION)
        .with_child(saml("Issuer").with_text(token.claims.issuer.as_str()))
        .with_child(
            saml("Subject")
                .with_child(saml("NameID").with_text(token.claims.subject.as_str()))
                .with_child(saml("SubjectConfirmation").with_attribute("Method", BEARER)),
        )
        .with_child(
            saml("Conditions")
                .with_attribute("NotBefore", issue_instant.as_str())
                .with_attribute("NotOnOrAfter", not_on_or_after)
                .with_child(
                    saml("AudienceRestriction")
                        .with_child(saml("Audience").with_text(token.target.as_str()))
                        .with_child(saml("Audience").with_text(token.claims.schema.as_deref().unwrap_or_default())),
                ),
        )
        .with_child(
            saml("AuthnStatement")
                .with_attribute("AuthnInstant", issue_instant.as_str())
                .with_child(
                    saml("AuthnContext")
                        .with_child(saml("AuthnContextClassRef").with_text(PASSWORD_PROTECTED_TRANSPORT)),
                ),
        )
        .with_child(saml("AttributeStatement").with_child(attribute)))
}

fn read_assertion(assertion: &XmlElement) -> Result<TransCellAccessToken, TokenError> {
    if assertion.local_name() != "Assertion" {
        return Err(TokenError::missing("Assertion"));
    }
    let id = assertion.attribute("ID").ok_or_else(|| TokenError::missing("ID"))?;
    let issued_at = assertion
        .attribute("IssueInstant")
        .ok_or_else(|| TokenError::missing("IssueInstant"))
        .and_then(|value| parse_instant("IssueInstant", value))?;
    // Assertions without a validity window get the default trans-cell lifespan.
    let not_on_or_after = assertion
        .child("Conditions")
        .and_then(|conditions| conditions.attribute("NotOnOrAfter"));
    let lifespan = match not_on_or_after {
        Some(value) => parse_instant("NotOnOrAfter", value)?.saturating_sub(issued_at),
        None => TRANS_CELL_TOKEN_LIFESPAN_MILLIS,
    };
    let issuer = assertion
        .child("Issuer")
        .map(XmlElement::text)
        .ok_or_else(|| TokenError::missing("Issuer"))?;
    let subject = assertion
        .path(&["Subject", "NameID"])
        .map(XmlElement::text)
        .ok_or_else(|| TokenError::missing("NameID"))?;

    let mut audiences = Vec::new();
    assertion.descendants("Audience", &mut audiences);
    let mut audiences = audiences.into_iter().map(XmlElement::text);
    let target = audiences.next().ok_or_else(|| TokenError::missing("Audience"))?;
    let schema = audiences.next();

    let mut values = Vec::new();
    assertion.descendants("AttributeValue", &mut values);
    let roles = values
        .into_iter()
        .map(XmlElement::text)
        .filter_map(|url| {
            let role = Role::from_url(url.trim());
            if role.is_none() {
                warn!(role_url = url.as_str(); "Asserted role URL is not a role and was ignored");
            }
            role
        })
        .collect();

    Ok(TransCellAccessToken {
        id: id.to_string(),
        claims: TokenClaims::new(issued_at, lifespan, issuer, subject, schema),
        target,
        roles,
    })
}

fn format_instant(millis: u64) -> Result<String, TokenError> {
    i64::try_from(millis)
        .ok()
        .and_then(DateTime::<Utc>::from_timestamp_millis)
        .map(|instant| instant.to_rfc3339_opts(SecondsFormat::Millis, true))
        .ok_or_else(|| TokenError::Signing(format!("instant out of range: {}", millis)))
}

fn parse_instant(attribute: &str, value: &str) -> Result<u64, TokenError> {
    DateTime::parse_from_rfc3339(value)
        .ok()
        .and_then(|instant| u64::try_from(instant.timestamp_millis()).ok())
        .ok_or_else(|| TokenError::xml(format!("invalid {} '{}'", attribute, value)))
}

fn saml(local_name: &str) -> XmlElement {
    XmlElement::new(format!("{}:{}", SAML, local_name))
}
