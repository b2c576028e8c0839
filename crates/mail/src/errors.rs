/*
 * vSMTP mail transfer agent
 *
 * Copyright (C) 2003 - viridIT SAS
 * Licensed under the Elastic License 2.0
 *
 * You should have received a copy of the Elastic License 2.0 along with
 * this program. If not, see https://www.elastic.co/licensing/elastic-license.
 *
 */

/// Errors raised while building or writing an email.
#[allow(clippy::module_name_repetitions)]
#[derive(Debug, thiserror::Error)]
pub enum MailError {
    /// The byte sink refused the output.
    #[error("{0}")]
    Io(#[from] std::io::Error),
    /// A boundary token is found inside the encoded output of one of its parts.
    #[error("boundary `{boundary}` collides with the content of one of its parts")]
    BoundaryCollision {
        /// The offending boundary.
        boundary: String,
    },
    /// Two multipart containers of the same tree share a boundary token.
    #[error("boundary `{boundary}` is used by more than one multipart container")]
    DuplicateBoundary {
        /// The offending boundary.
        boundary: String,
    },
    /// A boundary must be 1 to 70 characters long, without whitespace at its end.
    /// <https://www.rfc-editor.org/rfc/rfc2046#section-5.1.1>
    #[error("invalid boundary `{boundary}`")]
    InvalidBoundary {
        /// The offending boundary.
        boundary: String,
    },
    ///
    #[error("failed to format date: {0}")]
    Date(#[from] time::error::Format),
    /// A header name is not printable ASCII, or a value holds a line break
    /// that is not a fold.
    /// <https://www.rfc-editor.org/rfc/rfc5322#section-2.2>
    #[error("header `{name}` holds a line break that is not a fold")]
    InvalidHeader {
        /// Name of the offending header.
        name: String,
    },
    /// The raw message could not be split into headers and body.
    #[error("parsing email failed: {0}")]
    InvalidMail(String),
}

/// Result emitted by the mail builder.
pub type MailResult<T> = Result<T, MailError>;
