pub mod local_token_codec;
pub mod signed_assertion_codec;
