//! Structured payloads attached to root errors

use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;

/// A named violation: the request field or precondition subject that caused
/// the error, and what was wrong with it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Field {
    pub name: String,
    pub description: String,
}

impl Field {
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
        }
    }
}

impl<N: Into<String>, D: Into<String>> From<(N, D)> for Field {
    fn from((name, description): (N, D)) -> Self {
        Field::new(name, description)
    }
}

/// Describes the cause of an error for machine consumers.
///
/// Rendered on the wire as a `google.rpc.ErrorInfo`. Example, when creating
/// an account whose email is taken:
///
/// ```rust
/// use helpers_error::ErrorDetail;
///
/// let detail = ErrorDetail::new("EMAIL_ALREADY_EXISTS")
///     .with_metadata("email", "email is already in use");
///
/// assert_eq!(
///     detail.to_string(),
///     "reason: EMAIL_ALREADY_EXISTS, metadata: {email: email is already in use}"
/// );
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ErrorDetail {
    reason: String,
    domain: String,
    metadata: BTreeMap<String, String>,
}

impl ErrorDetail {
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
            ..Default::default()
        }
    }

    /// Set the logical grouping the reason belongs to (usually a service name).
    pub fn with_domain(mut self, domain: impl Into<String>) -> Self {
        self.domain = domain.into();
        self
    }

    /// Add a metadata entry. A repeated key replaces the earlier value.
    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    pub fn reason(&self) -> &str {
        &self.reason
    }

    pub fn domain(&self) -> &str {
        &self.domain
    }

    pub fn metadata(&self) -> &BTreeMap<String, String> {
        &self.metadata
    }

    pub(crate) fn to_error_info(&self) -> tonic_types::ErrorInfo {
        tonic_types::ErrorInfo::new(
            self.reason.clone(),
            self.domain.clone(),
            self.metadata
                .iter()
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect::<std::collections::HashMap<_, _>>(),
        )
    }
}

impl fmt::Display for ErrorDetail {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "reason: {}", self.reason)?;

        if !self.domain.is_empty() {
            write!(f, ", domain: {}", self.domain)?;
        }

        if !self.metadata.is_empty() {
            write!(f, ", metadata: {{")?;
            for (i, (key, value)) in self.metadata.iter().enumerate() {
                if i > 0 {
                    write!(f, ", ")?;
                }
                write!(f, "{}: {}", key, value)?;
            }
            write!(f, "}}")?;
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_field_from_tuple() {
        let field: Field = ("email", "required").into();
        assert_eq!(field, Field::new("email", "required"));
    }

    #[test]
    fn test_detail_display() {
        let detail = ErrorDetail::new("MARKET_CLOSED")
            .with_domain("trading")
            .with_metadata("info", "Market is closed.")
            .with_metadata("exchange", "TSX");

        assert_eq!(
            detail.to_string(),
            "reason: MARKET_CLOSED, domain: trading, metadata: {exchange: TSX, info: Market is closed.}"
        );
    }

    #[test]
    fn test_detail_reason_only() {
        assert_eq!(ErrorDetail::new("QUOTA").to_string(), "reason: QUOTA");
    }

    #[test]
    fn test_metadata_key_replaced() {
        let detail = ErrorDetail::new("R")
            .with_metadata("k", "first")
            .with_metadata("k", "second");
        assert_eq!(detail.metadata().len(), 1);
        assert_eq!(detail.metadata()["k"], "second");
    }

    #[test]
    fn test_error_info_conversion() {
        let info = ErrorDetail::new("EMAIL_ALREADY_EXISTS")
            .with_domain("accounts")
            .with_metadata("email", "taken")
            .to_error_info();

        assert_eq!(info.reason, "EMAIL_ALREADY_EXISTS");
        assert_eq!(info.domain, "accounts");
        assert_eq!(info.metadata.get("email").map(String::as_str), Some("taken"));
    }
}
