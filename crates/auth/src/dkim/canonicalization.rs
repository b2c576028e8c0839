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

use crate::ParseError;

/// Algorithm used to canonicalize a header or a body.
/// <https://www.rfc-editor.org/rfc/rfc6376#section-3.4>
#[allow(clippy::module_name_repetitions)]
#[derive(
    Debug,
    Default,
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
pub enum CanonicalizationAlgorithm {
    /// Tolerates almost no modification.
    #[default]
    Simple,
    /// Tolerates common modifications such as whitespace replacement and
    /// header field line rewrapping.
    Relaxed,
}

const fn is_wsp(byte: u8) -> bool {
    byte == b' ' || byte == b'\t'
}

/// Reduce every sequence of WSP to a single SP, and drop the trailing ones.
fn compress_wsp(line: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(line.len());
    let mut pending = false;
    for &byte in line {
        if is_wsp(byte) {
            pending = true;
        } else {
            if pending {
                out.push(b' ');
                pending = false;
            }
            out.push(byte);
        }
    }
    out
}

fn normalize_crlf(input: &str) -> String {
    if !input.contains('\n') {
        return input.to_string();
    }
    input
        .split('\n')
        .map(|line| line.strip_suffix('\r').unwrap_or(line))
        .collect::<Vec<_>>()
        .join("\r\n")
}

impl CanonicalizationAlgorithm {
    /// Canonicalize a body.
    ///
    /// Line endings are normalized to CRLF and trailing empty lines removed.
    /// An empty body is a single CRLF in `simple`, and stays empty in `relaxed`.
    #[must_use]
    pub fn canonicalize_body(self, body: &[u8]) -> Vec<u8> {
        let mut lines = body
            .split(|byte| *byte == b'\n')
            .map(|line| {
                let line = line.strip_suffix(b"\r").unwrap_or(line);
                match self {
                    Self::Simple => line.to_vec(),
                    Self::Relaxed => compress_wsp(line),
                }
            })
            .collect::<Vec<_>>();

        while lines.last().map_or(false, Vec::is_empty) {
            lines.pop();
        }

        if lines.is_empty() {
            return match self {
                Self::Simple => b"\r\n".to_vec(),
                Self::Relaxed => vec![],
            };
        }

        let mut out = Vec::with_capacity(body.len() + 2);
        for line in lines {
            out.extend(line);
            out.extend_from_slice(b"\r\n");
        }
        out
    }

    /// Canonicalize a complete header: name, colon, value and the final CRLF.
    #[must_use]
    pub fn canonicalize_header(self, header: &str) -> String {
        match self {
            Self::Simple => normalize_crlf(header),
            Self::Relaxed => {
                let (name, value) = header.split_once(':').unwrap_or((header, ""));
                let value = value.replace(['\r', '\n'], "");
                let value = String::from_utf8_lossy(&compress_wsp(value.as_bytes())).into_owned();

                format!(
                    "{}:{}\r\n",
                    name.trim().to_lowercase(),
                    value.trim_start_matches(' ')
                )
            }
        }
    }

    /// Canonicalize and concatenate several headers, in order.
    #[must_use]
    pub fn canonicalize_headers(self, headers: &[String]) -> String {
        headers
            .iter()
            .map(|header| self.canonicalize_header(header))
            .collect()
    }
}

/// Canonicalization of the headers and of the body, the "c=" tag.
#[derive(
    Debug,
    Default,
    Clone,
    Copy,
    PartialEq,
    Eq,
    serde_with::SerializeDisplay,
    serde_with::DeserializeFromStr,
)]
pub struct Canonicalization {
    /// Algorithm for the headers.
    pub header: CanonicalizationAlgorithm,
    /// Algorithm for the body.
    pub body: CanonicalizationAlgorithm,
}

impl Canonicalization {
    /// Create a pair of algorithms.
    #[must_use]
    pub const fn new(header: CanonicalizationAlgorithm, body: CanonicalizationAlgorithm) -> Self {
        Self { header, body }
    }

    /// See [`CanonicalizationAlgorithm::canonicalize_body`].
    #[must_use]
    pub fn canonicalize_body(&self, body: &[u8]) -> Vec<u8> {
        self.body.canonicalize_body(body)
    }

    /// See [`CanonicalizationAlgorithm::canonicalize_headers`].
    #[must_use]
    pub fn canonicalize_headers(&self, headers: &[String]) -> String {
        self.header.canonicalize_headers(headers)
    }
}

impl std::fmt::Display for Canonicalization {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.header, self.body)
    }
}

impl std::str::FromStr for Canonicalization {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parse = |algorithm: &str| {
            algorithm
                .trim()
                .parse::<CanonicalizationAlgorithm>()
                .map_err(|_| ParseError::InvalidArgument {
                    reason: format!("unknown canonicalization algorithm `{algorithm}`"),
                })
        };

        // "If only one algorithm is named, that algorithm is used for the
        // header and "simple" is used for the body."
        match s.split_once('/') {
            Some((header, body)) => Ok(Self::new(parse(header)?, parse(body)?)),
            None => Ok(Self::new(parse(s)?, CanonicalizationAlgorithm::Simple)),
        }
    }
}
