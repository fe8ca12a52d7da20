use std::fmt;

/// Category of a gateway error. Each kind maps to exactly one response status
/// at the HTTP boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Missing or invalid caller-supplied fields.
    Input,
    /// Bad or missing bearer credential, failed token exchange.
    Auth,
    /// Dataset exists but is not served for this kind of request.
    Forbidden,
    /// Unknown dataset, empty sheet, no record matching the constraints.
    NotFound,
    /// Remote table store or token endpoint unreachable / non-success.
    Upstream,
    /// Malformed key material, unencodable record set.
    Encoding,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorKind::Input => f.write_str("input"),
            ErrorKind::Auth => f.write_str("auth"),
            ErrorKind::Forbidden => f.write_str("forbidden"),
            ErrorKind::NotFound => f.write_str("not_found"),
            ErrorKind::Upstream => f.write_str("upstream"),
            ErrorKind::Encoding => f.write_str("encoding"),
        }
    }
}

/// Error returned by every core and client operation.
///
/// Carries an `ErrorKind` for the boundary to pick a status code and a short
/// human-readable message that is safe to send back to the caller.
#[derive(Clone, PartialEq, Eq)]
pub struct SheetError {
    kind: ErrorKind,
    message: String,
}

impl SheetError {
    pub fn input(msg: impl Into<String>) -> Self {
        Self { kind: ErrorKind::Input, message: msg.into() }
    }

    pub fn auth(msg: impl Into<String>) -> Self {
        Self { kind: ErrorKind::Auth, message: msg.into() }
    }

    pub fn forbidden(msg: impl Into<String>) -> Self {
        Self { kind: ErrorKind::Forbidden, message: msg.into() }
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        Self { kind: ErrorKind::NotFound, message: msg.into() }
    }

    pub fn upstream(msg: impl Into<String>) -> Self {
        Self { kind: ErrorKind::Upstream, message: msg.into() }
    }

    pub fn encoding(msg: impl Into<String>) -> Self {
        Self { kind: ErrorKind::Encoding, message: msg.into() }
    }

    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    /// Add context to the error, keeping its ErrorKind.
    ///
    /// Produces: `"context: message"`.
    pub fn with_context(self, ctx: impl fmt::Display) -> Self {
        Self {
            kind: self.kind,
            message: format!("{ctx}: {}", self.message),
        }
    }
}

impl fmt::Debug for SheetError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.kind, self.message)
    }
}

impl fmt::Display for SheetError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

impl std::error::Error for SheetError {}

impl From<serde_json::Error> for SheetError {
    fn from(e: serde_json::Error) -> Self {
        Self::encoding(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn context_keeps_kind() {
        let err = SheetError::upstream("HTTP 503").with_context("read table");
        assert_eq!(err.kind(), ErrorKind::Upstream);
        assert_eq!(err.message(), "read table: HTTP 503");
        assert_eq!(format!("{err:?}"), "[upstream] read table: HTTP 503");
    }
}
