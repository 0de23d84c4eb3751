use std::fmt;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

/// Errors surfaced by [`JsepSession`](crate::session::JsepSession).
///
/// The set is closed: every negotiation failure maps onto one of the four
/// DOMException-style classes used by JSEP, plus a parse failure of the SDP
/// document itself, which is reported before any negotiation logic runs.
#[derive(Error, Debug, PartialEq, Eq, Clone)]
pub enum Error {
    /// Malformed but structurally acceptable SDP content (unknown codec,
    /// invalid or duplicate extmap id, ...).
    #[error("OperationError: {0}")]
    ErrOperation(String),

    /// Negotiation rule violations (DTLS role conflicts, extension remap,
    /// bad fingerprint algorithm, bad ICE credentials, ...).
    #[error("InvalidAccessError: {0}")]
    ErrInvalidAccess(String),

    /// The call is not legal in the current signaling state.
    #[error("InvalidStateError: {0}")]
    ErrInvalidState(String),

    /// SetLocalDescription content differs from what CreateOffer/CreateAnswer produced.
    #[error("InvalidModificationError: {0}")]
    ErrInvalidModification(String),

    /// The SDP text could not be parsed into a document.
    #[error("SdpParseError: {0}")]
    ErrSdpParse(String),
}

/// Coarse classification of [`Error`].
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum ErrorKind {
    OperationError,
    InvalidAccessError,
    InvalidStateError,
    InvalidModificationError,
    SdpParseError,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match *self {
            ErrorKind::OperationError => "OperationError",
            ErrorKind::InvalidAccessError => "InvalidAccessError",
            ErrorKind::InvalidStateError => "InvalidStateError",
            ErrorKind::InvalidModificationError => "InvalidModificationError",
            ErrorKind::SdpParseError => "SdpParseError",
        };
        write!(f, "{s}")
    }
}

impl Error {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::ErrOperation(_) => ErrorKind::OperationError,
            Error::ErrInvalidAccess(_) => ErrorKind::InvalidAccessError,
            Error::ErrInvalidState(_) => ErrorKind::InvalidStateError,
            Error::ErrInvalidModification(_) => ErrorKind::InvalidModificationError,
            Error::ErrSdpParse(_) => ErrorKind::SdpParseError,
        }
    }

    pub(crate) fn operation(msg: impl Into<String>) -> Self {
        Error::ErrOperation(msg.into())
    }

    pub(crate) fn invalid_access(msg: impl Into<String>) -> Self {
        Error::ErrInvalidAccess(msg.into())
    }

    pub(crate) fn invalid_state(msg: impl Into<String>) -> Self {
        Error::ErrInvalidState(msg.into())
    }

    pub(crate) fn invalid_modification(msg: impl Into<String>) -> Self {
        Error::ErrInvalidModification(msg.into())
    }
}

impl From<sdp::Error> for Error {
    fn from(e: sdp::Error) -> Self {
        Error::ErrSdpParse(e.to_string())
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_error_kind() {
        let tests = vec![
            (Error::operation("x"), ErrorKind::OperationError),
            (Error::invalid_access("x"), ErrorKind::InvalidAccessError),
            (Error::invalid_state("x"), ErrorKind::InvalidStateError),
            (
                Error::invalid_modification("x"),
                ErrorKind::InvalidModificationError,
            ),
            (
                Error::from(sdp::Error::SdpEmptyTimeDescription),
                ErrorKind::SdpParseError,
            ),
        ];

        for (err, expected_kind) in tests {
            assert_eq!(err.kind(), expected_kind, "{err}");
        }
    }

    #[test]
    fn test_error_string() {
        assert_eq!(
            Error::invalid_access("attempted to remap").to_string(),
            "InvalidAccessError: attempted to remap"
        );
        assert_eq!(ErrorKind::InvalidStateError.to_string(), "InvalidStateError");
    }
}
