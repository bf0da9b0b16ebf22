use super::*;
use crate::contracts::token::account_access_token::AccountAccessToken;
use crate::contracts::token::cell_local_access_token::CellLocalAccessToken;
use crate::contracts::token::cell_local_refresh_token::CellLocalRefreshToken;
use crate::contracts::token::trans_cell_refresh_token::TransCellRefreshToken;
use crate::contracts::token::unit_local_unit_user_token::UnitLocalUnitUserToken;
use crate::contracts::token_error::ParseFailure;
use crate::testing::{HOME_CELL, PARTNER_CELL, SYMMETRIC_KEY};
use pretty_assertions::assert_eq;

const ISSUED_AT: u64 = 1_760_000_000_123;
const SCHEMA: &str = "https://app.example/";
const ACCESS_LIFESPAN: u64 = crate::contracts::token::ACCESS_TOKEN_LIFESPAN_MILLIS;

fn key() -> SymmetricKey {
    SymmetricKey::from_bytes(SYMMETRIC_KEY).unwrap()
}

fn roles() -> Vec<Role> {
    vec![
        Role::new("guest").with_base_url(HOME_CELL),
        Role::new("editor")
            .with_box("photos", None)
            .with_base_url(HOME_CELL),
    ]
}

fn assert_malformed<T: std::fmt::Debug>(result: Result<T, TokenError>) {
    match result {
        Err(TokenError::Parse(ParseFailure::Malformed)) => {}
        other => panic!("expected a malformed token error, got {:?}", other),
    }
}

#[test]
fn account_access_token_round_trips() {
    let key = key();
    let token = AccountAccessToken::new(ISSUED_AT, HOME_CELL, "https://home.example/#alice", Some(SCHEMA.into()));
    let encoded = token.to_token_string(&key).unwrap();

    assert!(encoded.starts_with("AA~"));
    assert_eq!(AccountAccessToken::parse(&encoded, HOME_CELL, &key).unwrap(), token);
}

#[test]
fn absent_schema_round_trips_as_absent() {
    let key = key();
    let token = AccountAccessToken::new(ISSUED_AT, HOME_CELL, "alice", None);
    let decoded = AccountAccessToken::parse(&token.to_token_string(&key).unwrap(), HOME_CELL, &key).unwrap();
    assert_eq!(decoded.claims.schema, None);
}

#[test]
fn cell_local_access_token_round_trips_with_roles() {
    let key = key();
    let token = CellLocalAccessToken::new(ISSUED_AT, HOME_CELL, "alice", roles(), Some(SCHEMA.into()));
    let encoded = token.to_token_string(&key).unwrap();

    assert!(encoded.starts_with("AL~"));
    let decoded = CellLocalAccessToken::parse(&encoded, HOME_CELL, &key).unwrap();
    assert_eq!(decoded, token);
    assert_eq!(decoded.roles, roles());
}

#[test]
fn empty_role_list_round_trips_as_empty() {
    let key = key();
    let token = CellLocalAccessToken::new(ISSUED_AT, HOME_CELL, "alice", Vec::new(), None);
    let decoded = CellLocalAccessToken::parse(&token.to_token_string(&key).unwrap(), HOME_CELL, &key).unwrap();
    assert_eq!(decoded.roles, Vec::<Role>::new());
}

#[test]
fn refresh_tokens_round_trip() {
    let key = key();
    let local = CellLocalRefreshToken::new(ISSUED_AT, HOME_CELL, "alice", Some(SCHEMA.into()));
    let trans = TransCellRefreshToken::new(
        ISSUED_AT,
        HOME_CELL,
        "https://partner.example/#bob",
        PARTNER_CELL,
        roles(),
        None,
    );

    let local_encoded = local.to_token_string(&key).unwrap();
    let trans_encoded = trans.to_token_string(&key).unwrap();

    assert!(local_encoded.starts_with("RA~"));
    assert!(trans_encoded.starts_with("RT~"));
    assert_eq!(CellLocalRefreshToken::parse(&local_encoded, HOME_CELL, &key).unwrap(), local);
    assert_eq!(TransCellRefreshToken::parse(&trans_encoded, HOME_CELL, &key).unwrap(), trans);
}

#[test]
fn unit_user_token_round_trips() {
    let key = key();
    let token = UnitLocalUnitUserToken::new(ISSUED_AT, 3_600_000, "https://home.example/", None, "unit.example");
    let encoded = token.to_token_string(&key).unwrap();

    assert!(encoded.starts_with("AU~"));
    assert_eq!(UnitLocalUnitUserToken::parse(&encoded, "unit.example", &key).unwrap(), token);
}

#[test]
fn issued_at_is_reversed_in_the_record() {
    let key = key();
    let token = AccountAccessToken::new(ISSUED_AT, HOME_CELL, "alice", None);
    let encoded = token.to_token_string(&key).unwrap();

    let ciphertext = URL_SAFE_NO_PAD.decode(&encoded[3..]).unwrap();
    let iv = IvScheme::ReversedSeedIssuer.derive(HOME_CELL);
    let record = String::from_utf8(decrypt(&key, &iv, &ciphertext).unwrap()).unwrap();

    assert_eq!(record, format!("3210000000671\t{}\talice\t\t{}", ACCESS_LIFESPAN, HOME_CELL));
}

#[test]
fn token_is_bound_to_its_issuer() {
    let key = key();
    let token = CellLocalAccessToken::new(ISSUED_AT, HOME_CELL, "alice", roles(), None);
    let encoded = token.to_token_string(&key).unwrap();

    assert_malformed(CellLocalAccessToken::parse(&encoded, PARTNER_CELL, &key));
    assert_malformed(CellLocalAccessToken::parse(&encoded, "https://home.example", &key));
}

#[test]
fn issuer_sharing_the_iv_is_still_rejected_by_the_trailing_field() {
    // Both issuers end with the same 16 characters and therefore derive the same IV.
    let key = key();
    let token = AccountAccessToken::new(ISSUED_AT, "https://a.cells.example.org/", "alice", None);
    let encoded = token.to_token_string(&key).unwrap();

    assert_eq!(
        IvScheme::ReversedSeedIssuer.derive("https://a.cells.example.org/"),
        IvScheme::ReversedSeedIssuer.derive("https://b.cells.example.org/")
    );
    assert_malformed(AccountAccessToken::parse(&encoded, "https://b.cells.example.org/", &key));
}

#[test]
fn wrong_key_is_a_malformed_token() {
    let token = AccountAccessToken::new(ISSUED_AT, HOME_CELL, "alice", None);
    let encoded = token.to_token_string(&key()).unwrap();
    let other = SymmetricKey::from_bytes(b"fedcba9876543210").unwrap();

    assert_malformed(AccountAccessToken::parse(&encoded, HOME_CELL, &other));
}

#[test]
fn prefix_of_another_kind_is_rejected() {
    let key = key();
    let token = CellLocalAccessToken::new(ISSUED_AT, HOME_CELL, "alice", roles(), None);
    let encoded = token.to_token_string(&key).unwrap();
    let relabelled = encoded.replacen("AL~", "AA~", 1);

    assert_malformed(CellLocalRefreshToken::parse(&encoded, HOME_CELL, &key));
    // Same ciphertext under the account prefix fails on the field count.
    assert_malformed(AccountAccessToken::parse(&relabelled, HOME_CELL, &key));
}

#[test]
fn garbage_is_a_malformed_token() {
    let key = key();
    assert_malformed(AccountAccessToken::parse("AA~", HOME_CELL, &key));
    assert_malformed(AccountAccessToken::parse("AA~!!not-base64!!", HOME_CELL, &key));
    assert_malformed(AccountAccessToken::parse("AA~AAAA", HOME_CELL, &key));
    assert_malformed(AccountAccessToken::parse("AA~AAAAAAAAAAAAAAAAAAAAAA", HOME_CELL, &key));
    assert_malformed(AccountAccessToken::parse("", HOME_CELL, &key));
}

#[test]
fn padded_base64_is_accepted() {
    let key = key();
    let token = AccountAccessToken::new(ISSUED_AT, HOME_CELL, "alice", None);
    let encoded = token.to_token_string(&key).unwrap();
    let body = URL_SAFE_NO_PAD.decode(&encoded[3..]).unwrap();
    let padded = format!("AA~{}", base64::engine::general_purpose::URL_SAFE.encode(body));

    assert_eq!(AccountAccessToken::parse(&padded, HOME_CELL, &key).unwrap(), token);
}

#[test]
fn longer_keys_select_wider_ciphers() {
    for raw in [&b"0123456789abcdef01234567"[..], &b"0123456789abcdef0123456789abcdef"[..]] {
        let key = SymmetricKey::from_bytes(raw).unwrap();
        let token = CellLocalAccessToken::new(ISSUED_AT, HOME_CELL, "alice", roles(), None);
        let encoded = token.to_token_string(&key).unwrap();

        assert_eq!(CellLocalAccessToken::parse(&encoded, HOME_CELL, &key).unwrap(), token);
        assert_malformed(CellLocalAccessToken::parse(&encoded, HOME_CELL, &self::key()));
    }
}

#[test]
fn iv_derivations_differ_per_scheme() {
    assert_eq!(
        &IvScheme::ReversedSeedIssuer.derive("https://home.example/"),
        b"/elpmaxe.emoh//:"
    );
    assert_eq!(&IvScheme::IssuerSeed.derive("unit.example"), b"unit.example1234");
    assert_eq!(&IvScheme::IssuerSeed.derive(""), b"123456789abcdefg");
}

#[test]
fn unit_user_token_is_not_readable_with_the_reversed_iv() {
    let key = key();
    let token = UnitLocalUnitUserToken::new(ISSUED_AT, 3_600_000, "https://home.example/", None, "unit.example");
    let encoded = token.to_token_string(&key).unwrap();
    let as_account = encoded.replacen("AU~", "AA~", 1);

    // Same field count, different IV: the first block decrypts to garbage.
    match AccountAccessToken::parse(&as_account, "unit.example", &key) {
        Ok(decoded) => assert_ne!(decoded.claims, token.claims),
        Err(error) => assert!(error.is_parse()),
    }
}

#[test]
fn roles_serialize_as_space_separated_urls() {
    assert_eq!(
        join_roles(&roles(), HOME_CELL),
        "https://home.example/__role/__/guest https://home.example/__role/photos/editor"
    );
    assert_eq!(join_roles(&[], HOME_CELL), "");
    assert_eq!(split_roles("").unwrap(), Vec::<Role>::new());
    assert_eq!(split_roles(&join_roles(&roles(), HOME_CELL)).unwrap(), roles());
    assert!(split_roles("not-a-role").is_none());
}

#[test]
fn roles_without_base_are_written_as_roles_of_the_cell() {
    let roles = vec![Role::new("member"), Role::new("viewer").with_box("photos", None)];

    assert_eq!(
        join_roles(&roles, HOME_CELL),
        "https://home.example/__role/__/member https://home.example/__role/photos/viewer"
    );
}

#[test]
fn roles_without_base_round_trip() {
    let key = key();
    let token = CellLocalAccessToken::mint(HOME_CELL, "alice", vec![Role::new("member")], None);
    let encoded = token.to_token_string(&key).unwrap();

    let decoded = CellLocalAccessToken::parse(&encoded, HOME_CELL, &key).unwrap();
    assert_eq!(decoded, token);
    assert_eq!(decoded.roles[0].create_url(), "https://home.example/__role/__/member");
}

#[test]
fn unqualified_original_roles_belong_to_the_original_issuer() {
    let key = key();
    let token = TransCellRefreshToken::new(
        ISSUED_AT,
        HOME_CELL,
        "https://partner.example/#alice",
        PARTNER_CELL,
        vec![Role::new("admin")],
        None,
    );

    let decoded = TransCellRefreshToken::parse(&token.to_token_string(&key).unwrap(), HOME_CELL, &key).unwrap();
    assert_eq!(decoded, token);
    assert_eq!(
        decoded.original_roles[0].create_url(),
        "https://partner.example/__role/__/admin"
    );
}

#[test]
fn fields_with_a_tab_are_refused() {
    let key = key();

    let subject = AccountAccessToken::new(ISSUED_AT, HOME_CELL, "ali\tce", None);
    let schema = AccountAccessToken::new(ISSUED_AT, HOME_CELL, "alice", Some("https://app\t.example/".into()));
    let issuer = UnitLocalUnitUserToken::new(ISSUED_AT, ACCESS_LIFESPAN, "alice", None, "unit\t.example");

    for (result, field) in [
        (subject.to_token_string(&key), "subject"),
        (schema.to_token_string(&key), "schema"),
        (issuer.to_token_string(&key), "issuer"),
    ] {
        match result {
            Err(TokenError::UnencodableField(name)) => assert_eq!(name, field),
            other => panic!("expected an unencodable field error, got {:?}", other),
        }
    }
}
