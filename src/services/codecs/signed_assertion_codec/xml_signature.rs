use crate::contracts::token_error::signature_failure::SignatureFailure;
use crate::contracts::token_error::{ParseFailure, TokenError};
use crate::services::codecs::signed_assertion_codec::xml_document::{Namespaces, XmlElement, XmlNode, canonicalize};
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use log::warn;
use rsa::pkcs1v15::{Signature, SigningKey, VerifyingKey};
use rsa::signature::{SignatureEncoding, Signer, Verifier};
use rsa::{RsaPrivateKey, RsaPublicKey};
use sha1::{Digest, Sha1};
use sha2::Sha256;

pub const DSIG_NAMESPACE: &str = "http://www.w3.org/2000/09/xmldsig#";
pub const INCLUSIVE_C14N: &str = "http://www.w3.org/TR/2001/REC-xml-c14n-20010315";
pub const ENVELOPED_SIGNATURE: &str = "http://www.w3.org/2000/09/xmldsig#enveloped-signature";

const RSA_SHA1: &str = "http://www.w3.org/2000/09/xmldsig#rsa-sha1";
const RSA_SHA256: &str = "http://www.w3.org/2001/04/xmldsig-more#rsa-sha256";
const SHA1_DIGEST: &str = "http://www.w3.org/2000/09/xmldsig#sha1";
const SHA256_DIGEST: &str = "http://www.w3.org/2001/04/xmlenc#sha256";

const DS: &str = "ds";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DigestMethod {
    Sha1,
    Sha256,
}

impl DigestMethod {
    fn from_uri(uri: &str) -> Result<Self, TokenError> {
        match uri {
            SHA1_DIGEST => Ok(DigestMethod::Sha1),
            SHA256_DIGEST => Ok(DigestMethod::Sha256),
            other => Err(ParseFailure::UnsupportedAlgorithm(other.to_string()).into()),
        }
    }

    fn digest(&self, data: &[u8]) -> Vec<u8> {
        match self {
            DigestMethod::Sha1 => Sha1::digest(data).to_vec(),
            DigestMethod::Sha256 => Sha256::digest(data).to_vec(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SignatureMethod {
    RsaSha1,
    RsaSha256,
}

impl SignatureMethod {
    fn from_uri(uri: &str) -> Result<Self, TokenError> {
        match uri {
            RSA_SHA1 => Ok(SignatureMethod::RsaSha1),
            RSA_SHA256 => Ok(SignatureMethod::RsaSha256),
            other => Err(ParseFailure::UnsupportedAlgorithm(other.to_string()).into()),
        }
    }

    fn verify(&self, key: &RsaPublicKey, data: &[u8], signature: &Signature) -> bool {
        match self {
            SignatureMethod::RsaSha1 => VerifyingKey::<Sha1>::new(key.clone()).verify(data, signature).is_ok(),
            SignatureMethod::RsaSha256 => VerifyingKey::<Sha256>::new(key.clone()).verify(data, signature).is_ok(),
        }
    }
}

/// Signs `root` with an enveloped RSA-SHA1 signature over the SHA-1 digest of the whole document.
/// The `ds:Signature` element is inserted as the child at `position`.
pub(crate) fn sign(
    root: &mut XmlElement,
    position: usize,
    signing_key: &RsaPrivateKey,
    certificate_der: &[u8],
) -> Result<(), TokenError> {
    let digest = Sha1::digest(canonicalize(root, &Namespaces::new(), None).as_bytes());

    let signed_info = ds("SignedInfo")
        .with_child(ds("CanonicalizationMethod").with_attribute("Algorithm", INCLUSIVE_C14N))
        .with_child(ds("SignatureMethod").with_attribute("Algorithm", RSA_SHA1))
        .with_child(
            ds("Reference")
                .with_attribute("URI", "")
                .with_child(
                    ds("Transforms")
                        .with_child(ds("Transform").with_attribute("Algorithm", ENVELOPED_SIGNATURE)),
                )
                .with_child(ds("DigestMethod").with_attribute("Algorithm", SHA1_DIGEST))
                .with_child(ds("DigestValue").with_text(STANDARD.encode(digest))),
        );

    let signature = ds("Signature").with_attribute(format!("xmlns:{}", DS), DSIG_NAMESPACE);
    let scope = signature.scope(&root.scope(&Namespaces::new()));
    let signed_info_c14n = canonicalize(&signed_info, &scope, None);
    let signature_value = SigningKey::<Sha1>::new(signing_key.clone())
        .try_sign(signed_info_c14n.as_bytes())
        .map_err(|e| TokenError::Signing(e.to_string()))?;

    let signature = signature
        .with_child(signed_info)
        .with_child(ds("SignatureValue").with_text(STANDARD.encode(signature_value.to_vec())))
        .with_child(
            ds("KeyInfo").with_child(
                ds("X509Data").with_child(ds("X509Certificate").with_text(STANDARD.encode(certificate_der))),
            ),
        );

    let position = position.min(root.children.len());
    root.children.insert(position, XmlNode::Element(signature));
    Ok(())
}

/// The `Signature` element enveloped directly in `root`.
pub(crate) fn find_signature(root: &XmlElement) -> Option<&XmlElement> {
    root.child("Signature")
}

/// DER bytes of the first certificate in the signature's `KeyInfo`.
pub(crate) fn embedded_certificate(signature: &XmlElement) -> Result<Vec<u8>, TokenError> {
    let certificate = signature
        .path(&["KeyInfo", "X509Data", "X509Certificate"])
        .ok_or_else(|| TokenError::missing("X509Certificate"))?;
    decode_base64_text(certificate)
}

/// Core validation of the enveloped `signature` of `root` with `key`.
/// On failure the signature value and every reference are checked separately for the diagnostic.
pub(crate) fn verify(root: &XmlElement, signature: &XmlElement, key: &RsaPublicKey) -> Result<(), TokenError> {
    let signed_info = signature
        .child("SignedInfo")
        .ok_or_else(|| TokenError::missing("SignedInfo"))?;

    let canonicalization = signed_info
        .child("CanonicalizationMethod")
        .and_then(|method| method.attribute("Algorithm"))
        .ok_or_else(|| TokenError::missing("CanonicalizationMethod"))?;
    if canonicalization != INCLUSIVE_C14N {
        return Err(ParseFailure::UnsupportedAlgorithm(canonicalization.to_string()).into());
    }
    let method = signed_info
        .child("SignatureMethod")
        .and_then(|method| method.attribute("Algorithm"))
        .ok_or_else(|| TokenError::missing("SignatureMethod"))
        .and_then(SignatureMethod::from_uri)?;

    let references: Vec<&XmlElement> = signed_info.children_named("Reference").collect();
    if references.is_empty() {
        return Err(TokenError::missing("Reference"));
    }

    let mut invalid_references = Vec::new();
    for reference in references {
        let uri = reference.attribute("URI").unwrap_or_default();
        if !verify_reference(root, signature, reference)? {
            invalid_references.push(uri.to_string());
        }
    }

    let signature_value = decode_base64_text(
        signature
            .child("SignatureValue")
            .ok_or_else(|| TokenError::missing("SignatureValue"))?,
    )?;
    let scope = signature.scope(&root.scope(&Namespaces::new()));
    let signed_info_c14n = canonicalize(signed_info, &scope, None);
    let signature_value_valid = Signature::try_from(signature_value.as_slice())
        .map(|value| method.verify(key, signed_info_c14n.as_bytes(), &value))
        .unwrap_or(false);

    if signature_value_valid && invalid_references.is_empty() {
        return Ok(());
    }

    let failure = SignatureFailure::new(signature_value_valid, invalid_references);
    warn!(
        signature_value_valid = failure.signature_value_valid,
        invalid_references:? = failure.invalid_references;
        "Assertion signature core validation failed"
    );
    Err(failure.into())
}

/// Recomputes the digest of one reference. Only same-document references to the root are resolvable.
fn verify_reference(root: &XmlElement, signature: &XmlElement, reference: &XmlElement) -> Result<bool, TokenError> {
    let uri = reference.attribute("URI").unwrap_or_default();
    let resolvable = uri.is_empty()
        || uri
            .strip_prefix('#')
            .is_some_and(|id| root.attribute("ID") == Some(id));
    if !resolvable {
        return Ok(false);
    }

    let mut enveloped = false;
    if let Some(transforms) = reference.child("Transforms") {
        for transform in transforms.children_named("Transform") {
            match transform.attribute("Algorithm").unwrap_or_default() {
                ENVELOPED_SIGNATURE => enveloped = true,
                INCLUSIVE_C14N => {}
                other => return Err(ParseFailure::UnsupportedAlgorithm(other.to_string()).into()),
            }
        }
    }

    let digest_method = reference
        .child("DigestMethod")
        .and_then(|method| method.attribute("Algorithm"))
        .ok_or_else(|| TokenError::missing("DigestMethod"))
        .and_then(DigestMethod::from_uri)?;
    let expected = decode_base64_text(
        reference
            .child("DigestValue")
            .ok_or_else(|| TokenError::missing("DigestValue"))?,
    )?;

    let omit = enveloped.then_some(signature);
    let actual = digest_method.digest(canonicalize(root, &Namespaces::new(), omit).as_bytes());
    Ok(actual == expected)
}

fn decode_base64_text(element: &XmlElement) -> Result<Vec<u8>, TokenError> {
    let text: String = element.text().chars().filter(|c| !c.is_ascii_whitespace()).collect();
    STANDARD
        .decode(text)
        .map_err(|_| TokenError::Parse(ParseFailure::Encoding))
}

fn ds(local_name: &str) -> XmlElement {
    XmlElement::new(format!("{}:{}", DS, local_name))
}
