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

/// `Content-Transfer-Encoding` values and their encoders.
pub mod encoding;

use crate::mail::{body::Body, headers::Header};
use encoding::TransferEncoding;

/// A leaf of the MIME tree.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Part {
    /// Value of the `Content-Type` header, parameters included.
    pub content_type: String,
    /// How `content` is encoded on the wire.
    pub encoding: TransferEncoding,
    /// Raw content, before transfer encoding.
    pub content: Vec<u8>,
    /// Extra headers of the part (`Content-Disposition`, `Content-ID`, ...).
    pub headers: Vec<Header>,
}

impl Part {
    /// Create a part without extra headers.
    pub fn new(
        content_type: impl Into<String>,
        encoding: TransferEncoding,
        content: impl Into<Vec<u8>>,
    ) -> Self {
        Self {
            content_type: content_type.into(),
            encoding,
            content: content.into(),
            headers: vec![],
        }
    }

    /// Create a text part, the charset is added to the content type.
    pub fn text(
        content_type: &str,
        charset: &str,
        encoding: TransferEncoding,
        text: impl Into<String>,
    ) -> Self {
        Self::new(
            format!("{content_type}; charset={charset}"),
            encoding,
            text.into(),
        )
    }

    /// Create a file attached to the message.
    pub fn attachment(filename: &str, content_type: &str, content: impl Into<Vec<u8>>) -> Self {
        Self::new(content_type, TransferEncoding::Base64, content).with_header(Header::new(
            "Content-Disposition",
            format!("attachment; filename=\"{}\"", escape_quoted(filename)),
        ))
    }

    /// Create a file embedded in the message, referenced by `cid:<filename>`.
    pub fn inline(filename: &str, content_type: &str, content: impl Into<Vec<u8>>) -> Self {
        Self::new(content_type, TransferEncoding::Base64, content)
            .with_header(Header::new(
                "Content-Disposition",
                format!("inline; filename=\"{}\"", escape_quoted(filename)),
            ))
            .with_header(Header::new("Content-ID", format!("<{filename}>")))
    }

    /// Add an extra header to the part.
    #[must_use]
    pub fn with_header(mut self, header: Header) -> Self {
        self.headers.push(header);
        self
    }

    /// Headers describing the part.
    #[must_use]
    pub fn mime_headers(&self) -> Vec<Header> {
        [
            Header::new("Content-Type", self.content_type.clone()),
            Header::new("Content-Transfer-Encoding", self.encoding.to_string()),
        ]
        .into_iter()
        .chain(self.headers.iter().cloned())
        .collect()
    }

    /// The content as written on the wire.
    #[must_use]
    pub fn encoded(&self) -> Vec<u8> {
        self.encoding.encode(&self.content)
    }
}

fn escape_quoted(value: &str) -> String {
    value.replace('\\', "\\\\").replace('"', "\\\"")
}

/// Subtype of a multipart container.
/// <https://www.rfc-editor.org/rfc/rfc2046#section-5.1>
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    strum::EnumString,
    strum::Display,
    serde_with::SerializeDisplay,
    serde_with::DeserializeFromStr,
)]
#[strum(serialize_all = "lowercase")]
pub enum MultipartKind {
    /// Independent parts, typically a body and its attachments.
    Mixed,
    /// Parts referencing each other, typically html and its images.
    Related,
    /// Several versions of the same content.
    Alternative,
}

/// An internal node of the MIME tree.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Multipart {
    /// Subtype of the container.
    pub kind: MultipartKind,
    /// Delimiter written before each part.
    pub boundary: String,
    /// Children, in order.
    pub parts: Vec<Body>,
}

impl Multipart {
    /// Create an empty container.
    pub fn new(kind: MultipartKind, boundary: impl Into<String>) -> Self {
        Self {
            kind,
            boundary: boundary.into(),
            parts: vec![],
        }
    }

    /// Append a child to the container.
    #[must_use]
    pub fn with_part(mut self, part: Body) -> Self {
        self.parts.push(part);
        self
    }

    /// Value of the `Content-Type` header of the container.
    #[must_use]
    pub fn content_type(&self) -> String {
        if !self.boundary.is_empty()
            && self
                .boundary
                .bytes()
                .all(|c| c.is_ascii_alphanumeric() || matches!(c, b'-' | b'_' | b'.'))
        {
            format!("multipart/{}; boundary={}", self.kind, self.boundary)
        } else {
            format!("multipart/{}; boundary=\"{}\"", self.kind, self.boundary)
        }
    }

    /// Is the boundary usable as a delimiter.
    /// <https://www.rfc-editor.org/rfc/rfc2046#section-5.1.1>
    #[must_use]
    pub fn has_valid_boundary(&self) -> bool {
        (1..=70).contains(&self.boundary.len())
            && !self.boundary.ends_with(' ')
            && self.boundary.bytes().all(|c| {
                c.is_ascii_alphanumeric() || b"'()+_,-./:=? ".contains(&c)
            })
    }
}
