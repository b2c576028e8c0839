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

use base64::{engine::general_purpose::STANDARD, Engine};

/// Maximum length of an encoded line, CRLF excluded.
/// <https://www.rfc-editor.org/rfc/rfc2045#section-6.8>
pub const ENCODED_LINE_LENGTH: usize = 76;

/// Value of the `Content-Transfer-Encoding` header.
/// <https://www.rfc-editor.org/rfc/rfc2045#section-6>
#[derive(
    Debug,
    Default,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    strum::EnumString,
    strum::Display,
    serde_with::SerializeDisplay,
    serde_with::DeserializeFromStr,
)]
#[strum(ascii_case_insensitive)]
pub enum TransferEncoding {
    /// Mostly readable text, with escapes for everything else.
    #[default]
    #[strum(serialize = "quoted-printable")]
    QuotedPrintable,
    /// Binary content, wrapped at 76 columns.
    #[strum(serialize = "base64")]
    Base64,
    /// US-ASCII lines, written unchanged.
    #[strum(serialize = "7bit")]
    SevenBit,
    /// Lines of any octet, written unchanged.
    #[strum(serialize = "8bit")]
    EightBit,
}

impl TransferEncoding {
    /// Encode `content`. Text encodings normalize line endings to CRLF first.
    #[must_use]
    pub fn encode(self, content: &[u8]) -> Vec<u8> {
        match self {
            Self::QuotedPrintable => quoted_printable::encode(normalize_line_endings(content)),
            Self::Base64 => {
                let encoded = STANDARD.encode(content);
                let mut out = Vec::with_capacity(encoded.len() + encoded.len() / 38);
                for (idx, line) in encoded.as_bytes().chunks(ENCODED_LINE_LENGTH).enumerate() {
                    if idx != 0 {
                        out.extend_from_slice(b"\r\n");
                    }
                    out.extend_from_slice(line);
                }
                out
            }
            Self::SevenBit | Self::EightBit => normalize_line_endings(content),
        }
    }
}

/// Replace every bare CR and bare LF by CRLF.
#[must_use]
pub fn normalize_line_endings(content: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(content.len());
    let mut bytes = content.iter().peekable();
    while let Some(&byte) = bytes.next() {
        match byte {
            b'\r' => {
                out.extend_from_slice(b"\r\n");
                if bytes.peek() == Some(&&b'\n') {
                    bytes.next();
                }
            }
            b'\n' => out.extend_from_slice(b"\r\n"),
            _ => out.push(byte),
        }
    }
    out
}
