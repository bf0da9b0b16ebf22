use std::fmt::{Display, Formatter};

/// Drill-down of a failed XML signature core validation.
/// The details are kept for diagnostics only, callers branch on `TokenError::Signature`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignatureFailure {
    pub signature_value_valid: bool,
    pub invalid_references: Vec<String>,
    pub details: Option<String>,
}

impl SignatureFailure {
    pub fn new(signature_value_valid: bool, invalid_references: Vec<String>) -> Self {
        SignatureFailure {
            signature_value_valid,
            invalid_references,
            details: None,
        }
    }

    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }
}

impl Display for SignatureFailure {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "signature value valid: {}, invalid references: {:?}",
            self.signature_value_valid, self.invalid_references
        )?;
        if let Some(details) = &self.details {
            write!(f, " ({})", details)?;
        }
        Ok(())
    }
}
