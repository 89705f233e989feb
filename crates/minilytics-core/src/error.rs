use thiserror::Error;

/// Rejection reasons for an inbound pageview report.
///
/// `MissingField` maps to 400 at the HTTP boundary, `DomainNotAllowed`
/// to 403. Validation never has side effects, so a rejected payload
/// leaves no trace in the store.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValidateError {
    #[error("missing or empty field: {0}")]
    MissingField(&'static str),

    #[error("domain not allowed: {0}")]
    DomainNotAllowed(String),
}
