pub mod role_resolution_event;
pub mod token_validation_event;
