pub mod audit;
pub mod backends;
pub mod base;
pub mod certificate_trust_validator;
pub mod codecs;
pub mod key_material;
pub mod role_resolver;
pub mod token_dispatcher;
