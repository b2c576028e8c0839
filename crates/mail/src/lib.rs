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

//! A library to build emails and write them on the wire.

#![doc(html_no_source)]
#![deny(missing_docs)]
#![forbid(unsafe_code)]
//
#![warn(rust_2018_idioms)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]
#![warn(clippy::cargo)]

/// Formatting and extraction of mailbox addresses.
pub mod address;
/// Errors raised while building or writing an email.
pub mod errors;
/// Rust representation of an email.
pub mod mail;
/// MIME parts, multipart containers and transfer encodings.
pub mod mime;
/// Split raw bytes back into headers and body.
pub mod parsing;

pub use address::format_address;
pub use errors::{MailError, MailResult};
pub use mail::{
    body::Body,
    headers::{Header, Headers},
    Boundaries, Message, WireMessage,
};
pub use mime::{encoding::TransferEncoding, Multipart, MultipartKind, Part};
