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

mod algorithm;
mod canonicalization;
mod config;
mod mail;
mod private_key;
mod public_key;
mod sign;
mod signature;
mod verify;


pub use algorithm::{BackendError, HashAlgorithm, SignatureBackend, SigningAlgorithm};
pub use canonicalization::{Canonicalization, CanonicalizationAlgorithm};
pub use config::{ConfigError, SigningConfig};
pub use mail::{Header, Mail};
pub use private_key::{PrivateKey, PrivateKeyError, RSA_MINIMUM_ACCEPTABLE_KEY_SIZE};
pub use public_key::PublicKey;
pub use sign::{sign, sign_at, SigningError};
pub use signature::{QueryMethod, Signature, HEADER_NAME};
pub use verify::{verify, VerifierError};

use crate::ParseError;

/// Split a `tag=value` list, as found in a `DKIM-Signature` header or a key record.
///
/// Whitespace around the tags and the values is dropped, an empty trailing tag is allowed.
/// <https://www.rfc-editor.org/rfc/rfc6376#section-3.2>
pub(crate) fn tag_list(input: &str) -> Result<Vec<(&str, &str)>, ParseError> {
    let mut tags = Vec::<(&str, &str)>::new();

    for tag in input.split(';') {
        if tag.trim().is_empty() {
            continue;
        }

        let (name, value) = tag.split_once('=').ok_or_else(|| ParseError::SyntaxError {
            reason: format!("tag without value: `{}`", tag.trim()),
        })?;
        let name = name.trim();

        if name.is_empty() || !name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
            return Err(ParseError::SyntaxError {
                reason: format!("invalid tag name: `{name}`"),
            });
        }
        if tags.iter().any(|(existing, _)| *existing == name) {
            return Err(ParseError::SyntaxError {
                reason: format!("duplicated tag: `{name}`"),
            });
        }

        tags.push((name, value.trim()));
    }

    Ok(tags)
}

/// Remove every whitespace, including folding, of a tag value.
pub(crate) fn unfold(value: &str) -> String {
    value.chars().filter(|c| !c.is_whitespace()).collect()
}

#[cfg(test)]
mod tag_list_tests {
    use super::*;

    #[test]
    fn parse() {
        assert_eq!(
            tag_list("v=1; a=rsa-sha256;\r\n\tb=abc\r\n\t def;").unwrap(),
            [("v", "1"), ("a", "rsa-sha256"), ("b", "abc\r\n\t def")]
        );
        assert_eq!(unfold("abc\r\n\t def"), "abcdef");
    }

    #[test]
    fn invalid() {
        assert!(tag_list("v=1; v=2").is_err());
        assert!(tag_list("v=1; novalue").is_err());
        assert!(tag_list("=1").is_err());
    }
}
