//! Handlers and the errors they raise.

use chainer::MetaData;
use thiserror::Error;

/// Failure raised by a [`Handler`].
///
/// Not fatal to the run: the core module records it under
/// [`EXCEPTION`](crate::keys::EXCEPTION) and jumps to `EXCEPTION_OCCURRED`,
/// where the exception module turns it into a response.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HandlerError {
    #[error("bad request: {0}")]
    BadRequest(String),

    #[error("unauthorized: {0}")]
    Unauthorized(String),

    #[error("forbidden: {0}")]
    Forbidden(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("internal error: {0}")]
    Internal(String),
}

impl HandlerError {
    /// The conventional status code for this error.
    #[must_use]
    pub fn status(&self) -> u16 {
        match self {
            Self::BadRequest(_) => 400,
            Self::Unauthorized(_) => 401,
            Self::Forbidden(_) => 403,
            Self::NotFound(_) => 404,
            Self::Internal(_) => 500,
        }
    }
}

/// Application code selected by routing and run in `INVOKE_HANDLER`.
///
/// Reads request keys from the context and writes response keys back.
/// Implemented for every `Fn(&mut MetaData) -> Result<(), HandlerError>`.
pub trait Handler: Send + Sync {
    /// Serve the request.
    ///
    /// # Errors
    ///
    /// Any [`HandlerError`]; the pipeline maps it to a response.
    fn handle(&self, md: &mut MetaData) -> Result<(), HandlerError>;
}

impl<C> Handler for C
where
    C: Fn(&mut MetaData) -> Result<(), HandlerError> + Send + Sync,
{
    fn handle(&self, md: &mut MetaData) -> Result<(), HandlerError> {
        self(md)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_per_kind() {
        assert_eq!(HandlerError::BadRequest("x".into()).status(), 400);
        assert_eq!(HandlerError::NotFound("x".into()).status(), 404);
        assert_eq!(HandlerError::Internal("x".into()).status(), 500);
        assert_eq!(
            HandlerError::Forbidden("nope".into()).to_string(),
            "forbidden: nope"
        );
    }
}
