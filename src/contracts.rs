pub mod role;
pub mod token;
pub mod token_error;
