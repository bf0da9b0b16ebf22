#[cfg(test)]
mod tests;

use crate::contracts::role::Role;
use crate::contracts::token::TokenClaims;
use crate::contracts::token_error::TokenError;
use crate::services::key_material::SymmetricKey;
use aes::{Aes128, Aes192, Aes256};
use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::engine::{DecodePaddingMode, GeneralPurpose, GeneralPurposeConfig};
use cbc::cipher::block_padding::Pkcs7;
use cbc::cipher::{BlockCipher, BlockDecryptMut, BlockEncryptMut, KeyInit, KeyIvInit};
use log::debug;

pub const SEPARATOR: char = '\t';

const IV_SEED: &str = "123456789abcdefg";
const IV_LENGTH: usize = 16;
const HEAD_FIELDS: usize = 4;

/// Accepts base64url with or without trailing padding.
pub(crate) const URL_SAFE_LENIENT: GeneralPurpose = GeneralPurpose::new(
    &base64::alphabet::URL_SAFE,
    GeneralPurposeConfig::new().with_decode_padding_mode(DecodePaddingMode::Indifferent),
);

/// How the initialization vector is derived from the issuer.
/// Both derivations are part of the wire format.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IvScheme {
    /// First 16 bytes of `reverse(seed + issuer)`.
    ReversedSeedIssuer,
    /// First 16 bytes of `issuer + seed`.
    IssuerSeed,
}

impl IvScheme {
    pub fn derive(&self, issuer: &str) -> [u8; IV_LENGTH] {
        let material: String = match self {
            IvScheme::ReversedSeedIssuer => format!("{}{}", IV_SEED, issuer).chars().rev().collect(),
            IvScheme::IssuerSeed => format!("{}{}", issuer, IV_SEED),
        };
        let mut iv = [0u8; IV_LENGTH];
        iv.copy_from_slice(&material.as_bytes()[..IV_LENGTH]);
        iv
    }
}

/// Wire layout of a symmetric token kind.
/// The record is `reversed(issued_at) \t lifespan \t subject \t schema [\t contents...] \t issuer`.
pub trait LocalToken: Sized {
    const PREFIX: &'static str;
    /// Number of fields between the schema and the trailing issuer.
    const CONTENT_FIELDS: usize;
    const IV_SCHEME: IvScheme = IvScheme::ReversedSeedIssuer;

    fn claims(&self) -> &TokenClaims;

    fn contents(&self) -> Vec<String>;

    /// Rebuilds the token from decoded claims and content fields; `None` rejects the record.
    fn from_parts(claims: TokenClaims, contents: Vec<String>) -> Option<Self>;

    fn field_count() -> usize {
        HEAD_FIELDS + Self::CONTENT_FIELDS + 1
    }
}

/// Compact symmetric codec shared by every local token kind.
pub struct LocalTokenCodec<'a> {
    key: &'a SymmetricKey,
}

impl<'a> LocalTokenCodec<'a> {
    pub fn new(key: &'a SymmetricKey) -> Self {
        Self { key }
    }

    pub fn encode<T: LocalToken>(&self, token: &T) -> Result<String, TokenError> {
        let claims = token.claims();
        let issued_at: String = claims.issued_at.to_string().chars().rev().collect();
        let lifespan = claims.lifespan.to_string();

        let mut fields: Vec<(&'static str, &str)> = vec![
            ("issued_at", issued_at.as_str()),
            ("lifespan", lifespan.as_str()),
            ("subject", claims.subject.as_str()),
            ("schema", claims.schema.as_deref().unwrap_or_default()),
        ];
        let contents = token.contents();
        fields.extend(contents.iter().map(|content| ("contents", content.as_str())));
        fields.push(("issuer", claims.issuer.as_str()));

        // A separator inside a field would shift every later field.
        if let Some((name, _)) = fields.iter().find(|(_, value)| value.contains(SEPARATOR)) {
            return Err(TokenError::UnencodableField(*name));
        }

        let record = fields
            .iter()
            .map(|(_, value)| *value)
            .collect::<Vec<_>>()
            .join(&SEPARATOR.to_string());
        let iv = T::IV_SCHEME.derive(&claims.issuer);
        let ciphertext = encrypt(self.key, &iv, record.as_bytes()).ok_or_else(TokenError::malformed)?;

        Ok(format!("{}{}", T::PREFIX, URL_SAFE_NO_PAD.encode(ciphertext)))
    }

    /// Every failure below collapses into the same parse error so that crypto and
    /// format failures cannot be told apart by the caller.
    pub fn decode<T: LocalToken>(&self, token: &str, expected_issuer: &str) -> Result<T, TokenError> {
        self.try_decode(token, expected_issuer).ok_or_else(|| {
            debug!(prefix = T::PREFIX; "Local token rejected");
            TokenError::malformed()
        })
    }

    fn try_decode<T: LocalToken>(&self, token: &str, expected_issuer: &str) -> Option<T> {
        let body = token.strip_prefix(T::PREFIX)?;
        let ciphertext = URL_SAFE_LENIENT.decode(body).ok()?;
        let iv = T::IV_SCHEME.derive(expected_issuer);
        let plaintext = decrypt(self.key, &iv, &ciphertext)?;
        let record = String::from_utf8(plaintext).ok()?;

        let mut fields: Vec<String> = record.split(SEPARATOR).map(str::to_string).collect();
        if fields.len() != T::field_count() {
            return None;
        }
        let issuer = fields.pop()?;
        if issuer != expected_issuer {
            return None;
        }

        let contents = fields.split_off(HEAD_FIELDS);
        let mut head = fields.into_iter();
        let issued_at: String = head.next()?.chars().rev().collect();
        let issued_at = issued_at.parse::<u64>().ok()?;
        let lifespan = head.next()?.parse::<u64>().ok()?;
        let subject = head.next()?;
        let schema = head.next().filter(|schema| !schema.is_empty());

        T::from_parts(TokenClaims::new(issued_at, lifespan, issuer, subject, schema), contents)
    }
}

/// Serializes roles as their canonical URLs joined by a single space.
/// Roles without a base are written as roles of `cell_url`.
pub fn join_roles(roles: &[Role], cell_url: &str) -> String {
    roles
        .iter()
        .map(|role| role.clone().with_default_base_url(cell_url).create_url())
        .collect::<Vec<_>>()
        .join(" ")
}

/// Parses a role field; an empty field yields an empty list.
pub fn split_roles(field: &str) -> Option<Vec<Role>> {
    field.split(' ').filter(|url| !url.is_empty()).map(Role::from_url).collect()
}

fn encrypt(key: &SymmetricKey, iv: &[u8], plaintext: &[u8]) -> Option<Vec<u8>> {
    match key {
        SymmetricKey::Aes128(key) => encrypt_with::<Aes128>(key, iv, plaintext),
        SymmetricKey::Aes192(key) => encrypt_with::<Aes192>(key, iv, plaintext),
        SymmetricKey::Aes256(key) => encrypt_with::<Aes256>(key, iv, plaintext),
    }
}

fn decrypt(key: &SymmetricKey, iv: &[u8], ciphertext: &[u8]) -> Option<Vec<u8>> {
    match key {
        SymmetricKey::Aes128(key) => decrypt_with::<Aes128>(key, iv, ciphertext),
        SymmetricKey::Aes192(key) => decrypt_with::<Aes192>(key, iv, ciphertext),
        SymmetricKey::Aes256(key) => decrypt_with::<Aes256>(key, iv, ciphertext),
    }
}

fn encrypt_with<C>(key: &[u8], iv: &[u8], plaintext: &[u8]) -> Option<Vec<u8>>
where
    C: BlockEncryptMut + BlockCipher + KeyInit,
{
    let encryptor = cbc::Encryptor::<C>::new_from_slices(key, iv).ok()?;
    Some(encryptor.encrypt_padded_vec_mut::<Pkcs7>(plaintext))
}

fn decrypt_with<C>(key: &[u8], iv: &[u8], ciphertext: &[u8]) -> Option<Vec<u8>>
where
    C: BlockDecryptMut + BlockCipher + KeyInit,
{
    let decryptor = cbc::Decryptor::<C>::new_from_slices(key, iv).ok()?;
    decryptor.decrypt_padded_vec_mut::<Pkcs7>(ciphertext).ok()
}
