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

use super::{
    tag_list, unfold, Canonicalization, CanonicalizationAlgorithm, Header, Mail, SigningAlgorithm,
};
use crate::ParseError;

/// Name of the header produced by the signer.
pub const HEADER_NAME: &str = "DKIM-Signature";

/// Width of the lines of the "b=" value.
const SIGNATURE_LINE_WIDTH: usize = 72;

/// Method used to retrieve the public key, the "q=" tag.
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
pub enum QueryMethod {
    ///
    #[default]
    #[strum(serialize = "dns/txt")]
    DnsTxt,
}

/// Representation of the `DKIM-Signature` header.
/// <https://www.rfc-editor.org/rfc/rfc6376#section-3.5>
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Signature {
    pub(super) version: usize,
    pub(super) signing_algorithm: SigningAlgorithm,
    pub(super) sdid: String,
    pub(super) selector: String,
    pub(super) canonicalization: Canonicalization,
    pub(super) query_method: QueryMethod,
    pub(super) signature_timestamp: Option<u64>,
    pub(super) expire_time: Option<u64>,
    pub(super) headers_field: Vec<String>,
    pub(super) body_hash: String,
    pub(super) signature: String,
    /// The complete header, without the final CRLF.
    pub(super) raw: String,
}

impl Signature {
    /// The "a=" tag.
    #[must_use]
    pub const fn signing_algorithm(&self) -> SigningAlgorithm {
        self.signing_algorithm
    }

    /// The signing domain, "d=" tag.
    #[must_use]
    pub fn sdid(&self) -> &str {
        &self.sdid
    }

    /// The "s=" tag.
    #[must_use]
    pub fn selector(&self) -> &str {
        &self.selector
    }

    /// The "c=" tag.
    #[must_use]
    pub const fn canonicalization(&self) -> Canonicalization {
        self.canonicalization
    }

    /// The "t=" tag.
    #[must_use]
    pub const fn signature_timestamp(&self) -> Option<u64> {
        self.signature_timestamp
    }

    /// The "x=" tag.
    #[must_use]
    pub const fn expire_time(&self) -> Option<u64> {
        self.expire_time
    }

    /// The names of the signed headers, "h=" tag.
    #[must_use]
    pub fn headers_field(&self) -> &[String] {
        &self.headers_field
    }

    /// The base64 hash of the canonicalized body, "bh=" tag.
    #[must_use]
    pub fn body_hash(&self) -> &str {
        &self.body_hash
    }

    /// The base64 signature, "b=" tag.
    #[must_use]
    pub fn signature(&self) -> &str {
        &self.signature
    }

    /// Domain name to query to fetch the public key.
    #[must_use]
    pub fn get_dns_query(&self) -> String {
        format!("{}._domainkey.{}", self.selector, self.sdid)
    }

    /// Is the "x=" tag in the past of `now` (seconds since the epoch).
    #[must_use]
    pub fn has_expired(&self, now: u64) -> bool {
        self.expire_time.map_or(false, |expire_time| expire_time < now)
    }

    /// The header value with an empty "b=" tag.
    ///
    /// The value is already folded, so that the folding of the header never
    /// depends on the content of the signature.
    pub(super) fn unsigned_value(&self) -> String {
        let mut value = format!(
            "v={}; a={}; q={}; c={};\r\n\td={}; s={};",
            self.version,
            self.signing_algorithm,
            self.query_method,
            self.canonicalization,
            self.sdid,
            self.selector,
        );
        if let Some(timestamp) = self.signature_timestamp {
            value.push_str(&format!(" t={timestamp};"));
        }
        if let Some(expire_time) = self.expire_time {
            value.push_str(&format!(" x={expire_time};"));
        }
        value.push_str(&format!(
            "\r\n\th={};\r\n\tbh={};\r\n\tb=",
            self.headers_field.join(":"),
            self.body_hash
        ));
        value
    }

    /// Fold the base64 signature to be appended after "b=".
    pub(super) fn wrap_signature(signature: &str) -> String {
        signature
            .as_bytes()
            .chunks(SIGNATURE_LINE_WIDTH)
            .map(String::from_utf8_lossy)
            .collect::<Vec<_>>()
            .join("\r\n\t")
    }

    /// Select the headers covered by the "h=" tag.
    ///
    /// Each name is searched from the bottom of the header section, a name listed
    /// twice takes the next instance upward. Missing instances are skipped.
    pub(super) fn select_headers(message: &impl Mail, names: &[String]) -> Vec<(String, String)> {
        let headers = message
            .get_headers()
            .iter()
            .map(|header| (header.field_name(), header.get()))
            .collect::<Vec<_>>();
        let mut consumed = std::collections::HashMap::<String, usize>::new();

        names
            .iter()
            .filter_map(|name| {
                let skip = consumed.entry(name.to_lowercase()).or_default();
                let found = headers
                    .iter()
                    .rev()
                    .filter(|(field_name, _)| field_name.eq_ignore_ascii_case(name))
                    .nth(*skip)
                    .cloned();
                *skip += 1;

                if found.is_none() {
                    tracing::debug!(header = %name, "Header not found, skipped.");
                }
                found
            })
            .collect()
    }

    /// The data covered by the "b=" tag: the selected headers and the
    /// `DKIM-Signature` header itself, with an empty "b=" and no final CRLF.
    #[must_use]
    pub fn get_header_for_hash(&self, message: &impl Mail) -> String {
        let selected = Self::select_headers(message, &self.headers_field)
            .into_iter()
            .map(|(_, raw)| raw)
            .collect::<Vec<_>>();

        let mut data = self.canonicalization.canonicalize_headers(&selected);

        let own_header = self
            .canonicalization
            .header
            .canonicalize_header(&format!("{}\r\n", strip_signature_value(&self.raw)));
        data.push_str(own_header.strip_suffix("\r\n").unwrap_or(&own_header));

        data
    }

    /// Hash of [`Signature::get_header_for_hash`].
    #[must_use]
    pub fn get_header_hash(&self, message: &impl Mail) -> Vec<u8> {
        let data = self.get_header_for_hash(message);
        tracing::trace!(data = %data.escape_debug(), "Canonicalized headers.");

        self.signing_algorithm.hash_algorithm().hash(data)
    }

    /// The names written in the "h=" tag for the selected headers.
    pub(super) fn field_names(
        header_algorithm: CanonicalizationAlgorithm,
        selected: &[(String, String)],
    ) -> Vec<String> {
        selected
            .iter()
            .map(|(name, _)| match header_algorithm {
                CanonicalizationAlgorithm::Simple => name.clone(),
                CanonicalizationAlgorithm::Relaxed => name.to_lowercase(),
            })
            .collect()
    }
}

/// Remove the content of the "b=" tag of a complete header, keeping every
/// other byte, folding included.
fn strip_signature_value(raw: &str) -> String {
    let Some((name, value)) = raw.split_once(':') else {
        return raw.to_string();
    };

    let mut offset = 0;
    for tag in value.split_inclusive(';') {
        if let Some((tag_name, _)) = tag.split_once('=') {
            if tag_name.trim() == "b" {
                let start = offset + tag_name.len() + 1;
                let end = offset + tag.trim_end_matches(';').len();
                return format!("{name}:{}{}", &value[..start], &value[end..]);
            }
        }
        offset += tag.len();
    }

    raw.to_string()
}

impl std::fmt::Display for Signature {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let value = self.raw.split_once(':').map_or("", |(_, value)| value);
        f.write_str(value.strip_prefix(' ').unwrap_or(value))
    }
}

impl std::str::FromStr for Signature {
    type Err = ParseError;

    /// Parse either the complete header or only its value.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.strip_suffix("\r\n").unwrap_or(s);
        let raw = match s.split_once(':') {
            Some((name, _)) if name.trim().eq_ignore_ascii_case(HEADER_NAME) => s.to_string(),
            _ => format!("{HEADER_NAME}: {s}"),
        };
        let value = raw.split_once(':').map_or("", |(_, value)| value);

        let tags = tag_list(value)?;
        let get = |field: &str| {
            tags.iter()
                .find(|(name, _)| *name == field)
                .map(|(_, value)| *value)
        };
        let required = |field: &str| {
            get(field).ok_or_else(|| ParseError::MissingRequiredField {
                field: field.to_string(),
            })
        };
        let invalid = |field: &str, value: &str| ParseError::InvalidArgument {
            reason: format!("`{field}={value}`"),
        };
        let timestamp = |field: &str| {
            get(field)
                .map(|value| value.parse::<u64>().map_err(|_| invalid(field, value)))
                .transpose()
        };

        let version = required("v")?;
        if version != "1" {
            return Err(invalid("v", version));
        }

        let signing_algorithm = required("a")?;
        let signing_algorithm = signing_algorithm
            .parse::<SigningAlgorithm>()
            .map_err(|_| invalid("a", signing_algorithm))?;

        let headers_field = unfold(required("h")?)
            .split(':')
            .filter(|name| !name.is_empty())
            .map(str::to_string)
            .collect::<Vec<_>>();
        if headers_field.is_empty() {
            return Err(invalid("h", ""));
        }

        Ok(Self {
            version: 1,
            signing_algorithm,
            sdid: required("d")?.to_string(),
            selector: required("s")?.to_string(),
            canonicalization: get("c").map_or_else(|| Ok(Canonicalization::default()), str::parse)?,
            query_method: match get("q") {
                Some(q) => q.parse().map_err(|_| invalid("q", q))?,
                None => QueryMethod::default(),
            },
            signature_timestamp: timestamp("t")?,
            expire_time: timestamp("x")?,
            headers_field,
            body_hash: unfold(required("bh")?),
            signature: unfold(required("b")?),
            raw,
        })
    }
}
