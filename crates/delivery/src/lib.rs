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

//! Sign messages and hand them to a transport.

#![doc(html_no_source)]
#![deny(missing_docs)]
#![forbid(unsafe_code)]

mod send;
mod signing;

pub use send::{send, send_at, Closer, SendFn, Sender, WriterSender};
pub use signing::{
    sign_message, sign_message_at, verify_message, with_date, DkimHeader, DkimMail,
};

use mailsign_mail::MailError;

/// Errors of the signing and dispatch pipeline.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The signing parameters are invalid.
    #[error("invalid dkim configuration: {0}")]
    Config(#[from] mailsign_auth::dkim::ConfigError),
    /// The body tree of the message cannot be produced.
    #[error("cannot produce the message: {0}")]
    Canonicalization(MailError),
    /// The byte sink refused the message.
    #[error("cannot write the message: {0}")]
    Serialization(MailError),
    ///
    #[error("cannot sign the message: {0}")]
    Signing(#[from] mailsign_auth::dkim::SigningError),
    /// Neither `Sender` nor `From` hold an address.
    #[error("the message has no sender address")]
    MissingMailFrom,
    /// `To`, `Cc` and `Bcc` are all empty.
    #[error("the message has no recipient")]
    MissingRcptTo,
    /// The transport failed on a message of the batch.
    #[error("failed to send message #{index}: {source}")]
    Send {
        /// Position of the message in the batch.
        index: usize,
        /// Error of the transport.
        source: Box<dyn std::error::Error + Send + Sync>,
    },
    /// The message carries no `DKIM-Signature` header.
    #[error("the message is not signed")]
    MissingSignature,
    /// The `DKIM-Signature` header or the public key record is malformed.
    #[error("{0}")]
    Parse(#[from] mailsign_auth::ParseError),
    ///
    #[error("dkim verification failed: {0}")]
    Verification(#[from] mailsign_auth::dkim::VerifierError),
}

impl From<MailError> for Error {
    fn from(value: MailError) -> Self {
        match value {
            MailError::Io(_) => Self::Serialization(value),
            otherwise => Self::Canonicalization(otherwise),
        }
    }
}
