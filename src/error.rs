use std::backtrace::Backtrace;
use std::error::Error as StdError;
use std::fmt;

#[non_exhaustive]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Kind {
    /// Error related to invalid configuration or endpoint, surfaced at construction
    Validation,
    /// Error related to the WebSocket connection
    WebSocket,
    /// A received payload did not decode into the expected message type
    Decode,
    /// An outgoing message could not be encoded for transmission
    Encode,
}

#[derive(Debug)]
pub struct Error {
    kind: Kind,
    source: Option<Box<dyn StdError + Send + Sync + 'static>>,
    backtrace: Backtrace,
}

impl Error {
    pub fn with_source<S: StdError + Send + Sync + 'static>(kind: Kind, source: S) -> Self {
        Self {
            kind,
            source: Some(Box::new(source)),
            backtrace: Backtrace::capture(),
        }
    }

    pub fn kind(&self) -> Kind {
        self.kind
    }

    pub fn backtrace(&self) -> &Backtrace {
        &self.backtrace
    }

    pub fn inner(&self) -> Option<&(dyn StdError + Send + Sync + 'static)> {
        self.source.as_deref()
    }

    pub fn downcast_ref<E: StdError + 'static>(&self) -> Option<&E> {
        let e = self.source.as_deref()?;
        e.downcast_ref::<E>()
    }

    pub fn validation<S: Into<String>>(message: S) -> Self {
        Validation {
            reason: message.into(),
        }
        .into()
    }

    #[must_use]
    pub fn decode() -> Self {
        DecodeFailed.into()
    }

    #[must_use]
    pub fn encode() -> Self {
        EncodeFailed.into()
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.source {
            Some(src) => write!(f, "{:?}: {}", self.kind, src),
            None => write!(f, "{:?}", self.kind),
        }
    }
}

impl StdError for Error {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        self.source
            .as_deref()
            .map(|e| e as &(dyn StdError + 'static))
    }
}

#[non_exhaustive]
#[derive(Debug)]
pub struct Validation {
    pub reason: String,
}

impl fmt::Display for Validation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid: {}", self.reason)
    }
}

impl StdError for Validation {}

/// A received payload did not parse into the expected message shape.
///
/// Local to a single message; later messages on the same stream are
/// unaffected.
#[non_exhaustive]
#[derive(Debug, Clone, Copy)]
pub struct DecodeFailed;

impl fmt::Display for DecodeFailed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "message payload did not decode into the expected type")
    }
}

impl StdError for DecodeFailed {}

/// An outgoing message could not be serialized.
///
/// Detected before any transport interaction; nothing was sent.
#[non_exhaustive]
#[derive(Debug, Clone, Copy)]
pub struct EncodeFailed;

impl fmt::Display for EncodeFailed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "message could not be encoded for transmission")
    }
}

impl StdError for EncodeFailed {}

impl From<Validation> for Error {
    fn from(err: Validation) -> Self {
        Error::with_source(Kind::Validation, err)
    }
}

impl From<DecodeFailed> for Error {
    fn from(err: DecodeFailed) -> Self {
        Error::with_source(Kind::Decode, err)
    }
}

impl From<EncodeFailed> for Error {
    fn from(err: EncodeFailed) -> Self {
        Error::with_source(Kind::Encode, err)
    }
}

impl From<url::ParseError> for Error {
    fn from(e: url::ParseError) -> Self {
        Error::with_source(Kind::Validation, e)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validation_display_should_succeed() {
        let error = Error::validation("endpoint must use the ws or wss scheme");

        assert_eq!(error.kind(), Kind::Validation);
        assert_eq!(
            error.to_string(),
            "Validation: invalid: endpoint must use the ws or wss scheme"
        );
    }

    #[test]
    fn decode_into_error_should_succeed() {
        let error = Error::decode();

        assert_eq!(error.kind(), Kind::Decode);
        assert!(error.downcast_ref::<DecodeFailed>().is_some());
    }

    #[test]
    fn encode_into_error_should_succeed() {
        let error = Error::encode();

        assert_eq!(error.kind(), Kind::Encode);
        assert!(error.downcast_ref::<EncodeFailed>().is_some());
    }
}
