pub mod configuration_error;
pub mod models;
