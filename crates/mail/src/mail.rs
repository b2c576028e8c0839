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

/// The body tree of an email.
pub mod body;
/// Ordered headers of an email.
pub mod headers;

use crate::{
    address::extract_addresses,
    errors::MailResult,
    mime::{encoding::TransferEncoding, Multipart, MultipartKind, Part},
};
use body::Body;
use headers::{Header, Headers};
use rand::Rng;

/// Headers never written on the wire.
const HIDDEN_HEADERS: &[&str] = &["Bcc"];

/// Boundary tokens of the multipart containers a message can need.
///
/// They are drawn once when the message is created, so that writing the
/// same message twice produces the same bytes.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Boundaries {
    /// Body and attachments.
    pub mixed: String,
    /// Body and embedded files.
    pub related: String,
    /// Alternative versions of the body.
    pub alternative: String,
}

impl Boundaries {
    /// Draw three random boundaries.
    #[must_use]
    pub fn random() -> Self {
        fn draw() -> String {
            rand::thread_rng()
                .sample_iter(&rand::distributions::Alphanumeric)
                .take(30)
                .map(char::from)
                .collect()
        }

        Self {
            mixed: draw(),
            related: draw(),
            alternative: draw(),
        }
    }
}

/// An email being built.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Message {
    headers: Headers,
    parts: Vec<Part>,
    embedded: Vec<Part>,
    attachments: Vec<Part>,
    charset: String,
    encoding: TransferEncoding,
    /// Boundaries used when the body needs multipart containers.
    pub boundaries: Boundaries,
}

impl Default for Message {
    fn default() -> Self {
        Self {
            headers: Headers::new(),
            parts: vec![],
            embedded: vec![],
            attachments: vec![],
            charset: "UTF-8".to_string(),
            encoding: TransferEncoding::default(),
            boundaries: Boundaries::random(),
        }
    }
}

impl Message {
    /// Create an empty message, text is encoded in quoted-printable with the
    /// UTF-8 charset.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Encoding used for the text bodies added afterward.
    #[must_use]
    pub fn with_encoding(mut self, encoding: TransferEncoding) -> Self {
        self.encoding = encoding;
        self
    }

    /// Charset declared by the text bodies added afterward.
    #[must_use]
    pub fn with_charset(mut self, charset: impl Into<String>) -> Self {
        self.charset = charset.into();
        self
    }

    /// Headers set by the caller, and the `DKIM-Signature` once signed.
    #[must_use]
    pub const fn headers(&self) -> &Headers {
        &self.headers
    }

    /// Get the value of the first header named `name`.
    #[must_use]
    pub fn get_header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).map(|header| header.value.as_str())
    }

    /// Set a header, replacing any previous one with the same name.
    /// Multiple values are joined with a comma.
    pub fn set_header<V: AsRef<str>>(&mut self, name: &str, values: impl IntoIterator<Item = V>) {
        let value = values
            .into_iter()
            .map(|v| v.as_ref().to_string())
            .collect::<Vec<_>>()
            .join(", ");
        self.headers.set(Header::new(name, value));
    }

    /// Append a header, even if one with the same name exists.
    pub fn add_header(&mut self, name: &str, value: impl Into<String>) {
        self.headers.push(Header::new(name, value));
    }

    /// Set an address header, see [`crate::format_address`].
    pub fn set_address_header(&mut self, name: &str, address: &str, display_name: &str) {
        self.set_header(name, [crate::format_address(address, display_name)]);
    }

    /// Set a date header, formatted as in RFC 5322.
    ///
    /// # Errors
    ///
    /// * the date cannot be represented, for example a year after 9999
    pub fn set_date_header(&mut self, name: &str, date: time::OffsetDateTime) -> MailResult<()> {
        let value = date.format(&time::format_description::well_known::Rfc2822)?;
        self.set_header(name, [value]);
        Ok(())
    }

    /// Insert a header at the top of the message.
    pub fn prepend_header(&mut self, header: Header) {
        self.headers.prepend(header);
    }

    /// Set the body, dropping the alternatives previously added.
    pub fn set_body(&mut self, content_type: &str, text: impl Into<String>) {
        self.parts = vec![Part::text(content_type, &self.charset, self.encoding, text)];
    }

    /// Add an alternative version of the body, the preferred one last.
    pub fn add_alternative(&mut self, content_type: &str, text: impl Into<String>) {
        self.parts
            .push(Part::text(content_type, &self.charset, self.encoding, text));
    }

    /// Attach a file to the message.
    pub fn attach(&mut self, filename: &str, content_type: &str, content: impl Into<Vec<u8>>) {
        self.attachments
            .push(Part::attachment(filename, content_type, content));
    }

    /// Embed a file in the message, to be referenced as `cid:<filename>`.
    pub fn embed(&mut self, filename: &str, content_type: &str, content: impl Into<Vec<u8>>) {
        self.embedded
            .push(Part::inline(filename, content_type, content));
    }

    /// The body tree, built from the bodies and files added so far.
    #[must_use]
    pub fn body(&self) -> Body {
        fn wrap(kind: MultipartKind, boundary: &str, inner: Body, extra: &[Part]) -> Body {
            let mut multipart = Multipart::new(kind, boundary);
            if inner != Body::Empty {
                multipart.parts.push(inner);
            }
            multipart
                .parts
                .extend(extra.iter().cloned().map(Body::Leaf));
            Body::Multipart(multipart)
        }

        let mut body = match self.parts.as_slice() {
            [] => Body::Empty,
            [part] => Body::Leaf(part.clone()),
            parts => Body::Multipart(Multipart {
                kind: MultipartKind::Alternative,
                boundary: self.boundaries.alternative.clone(),
                parts: parts.iter().cloned().map(Body::Leaf).collect(),
            }),
        };
        if !self.embedded.is_empty() {
            body = wrap(
                MultipartKind::Related,
                &self.boundaries.related,
                body,
                &self.embedded,
            );
        }
        if !self.attachments.is_empty() {
            body = wrap(
                MultipartKind::Mixed,
                &self.boundaries.mixed,
                body,
                &self.attachments,
            );
        }
        body
    }

    /// The envelope sender: the `Sender` header if any, else `From`.
    #[must_use]
    pub fn sender(&self) -> Option<String> {
        self.get_header("Sender")
            .or_else(|| self.get_header("From"))
            .and_then(|value| extract_addresses(value).into_iter().next())
    }

    /// The envelope recipients: `To`, `Cc` then `Bcc`, without duplicates.
    #[must_use]
    pub fn recipients(&self) -> Vec<String> {
        let mut recipients = Vec::<String>::new();
        for name in ["To", "Cc", "Bcc"] {
            for header in self.headers.get_all(name) {
                for address in extract_addresses(&header.value) {
                    if !recipients.contains(&address) {
                        recipients.push(address);
                    }
                }
            }
        }
        recipients
    }

    /// Produce the headers and the body exactly as they will be written.
    ///
    /// `MIME-Version` and the content headers of the top-level body are
    /// appended to the headers, `Bcc` is removed.
    ///
    /// # Errors
    ///
    /// * the body tree is malformed, see [`Body::to_bytes`]
    /// * a header would break the header section, see [`Header::validate`]
    pub fn to_wire(&self) -> MailResult<WireMessage> {
        let tree = self.body();
        let body = tree.to_bytes()?;

        let mut headers = self
            .headers
            .iter()
            .filter(|header| !HIDDEN_HEADERS.iter().any(|hidden| header.is(hidden)))
            .cloned()
            .collect::<Headers>();

        if tree != Body::Empty {
            if headers.get("MIME-Version").is_none() {
                headers.push(Header::new("MIME-Version", "1.0"));
            }
            for header in tree.mime_headers() {
                if headers.get(&header.name).is_none() {
                    headers.push(header);
                }
            }
        }

        for header in headers.iter() {
            header.validate()?;
        }

        Ok(WireMessage { headers, body })
    }

    /// Write the message to `out`.
    ///
    /// # Errors
    ///
    /// * the body tree is malformed, see [`Body::to_bytes`]
    /// * `out` failed
    pub fn write_to(&self, out: &mut impl std::io::Write) -> MailResult<u64> {
        self.to_wire()?.write_to(out)
    }

    /// Produce the message as bytes.
    ///
    /// # Errors
    ///
    /// * the body tree is malformed, see [`Body::to_bytes`]
    pub fn to_bytes(&self) -> MailResult<Vec<u8>> {
        let mut out = Vec::new();
        self.write_to(&mut out)?;
        Ok(out)
    }
}

/// A message ready to be written: folded headers and encoded body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WireMessage {
    /// Headers in wire order.
    pub headers: Headers,
    /// Encoded body.
    pub body: Vec<u8>,
}

impl WireMessage {
    /// Write the headers, an empty line, then the body.
    ///
    /// # Errors
    ///
    /// * a header would break the header section, see [`Header::validate`]
    /// * `out` failed
    pub fn write_to(&self, out: &mut impl std::io::Write) -> MailResult<u64> {
        for header in self.headers.iter() {
            header.validate()?;
        }

        let headers = self.headers.to_string();
        out.write_all(headers.as_bytes())?;
        out.write_all(b"\r\n")?;
        out.write_all(&self.body)?;
        out.flush()?;

        let written = headers.len() + 2 + self.body.len();
        tracing::trace!(headers = self.headers.len(), written, "Message serialized.");
        Ok(written as u64)
    }
}
