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

use super::{tag_list, unfold, BackendError, HashAlgorithm, PrivateKey, SigningAlgorithm};
use crate::ParseError;
use base64::{engine::general_purpose::STANDARD, Engine};

/// Public key published in the `DKIM record` of the signing domain.
/// <https://www.rfc-editor.org/rfc/rfc6376#section-3.6.1>
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublicKey {
    /// Hash algorithms the key may be used with, "h=" tag. Empty means all.
    pub acceptable_hash_algorithms: Vec<HashAlgorithm>,
    inner: rsa::RsaPublicKey,
}

impl PublicKey {
    /// Can this key verify a signature produced with `signing_algorithm`.
    #[must_use]
    pub fn support(&self, signing_algorithm: SigningAlgorithm) -> bool {
        self.acceptable_hash_algorithms.is_empty()
            || self
                .acceptable_hash_algorithms
                .contains(&signing_algorithm.hash_algorithm())
    }

    /// Verify `signature` of the `digest`.
    ///
    /// # Errors
    ///
    /// * the signature does not match
    pub fn verify(
        &self,
        signing_algorithm: SigningAlgorithm,
        digest: &[u8],
        signature: &[u8],
    ) -> Result<(), BackendError> {
        match signing_algorithm {
            SigningAlgorithm::RsaSha256 => self
                .inner
                .verify(rsa::Pkcs1v15Sign::new::<sha2::Sha256>(), digest, signature)
                .map_err(Into::into),
        }
    }
}

impl From<&PrivateKey> for PublicKey {
    fn from(value: &PrivateKey) -> Self {
        match value {
            PrivateKey::Rsa(rsa) => Self {
                acceptable_hash_algorithms: vec![],
                inner: rsa.to_public_key(),
            },
        }
    }
}

impl std::str::FromStr for PublicKey {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let tags = tag_list(s)?;
        let get = |field: &str| {
            tags.iter()
                .find(|(name, _)| *name == field)
                .map(|(_, value)| *value)
        };

        if let Some(version) = get("v") {
            if version != "DKIM1" {
                return Err(ParseError::InvalidArgument {
                    reason: format!("unsupported record version `{version}`"),
                });
            }
        }

        if let Some(key_type) = get("k") {
            if key_type != "rsa" {
                return Err(ParseError::InvalidArgument {
                    reason: format!("unsupported key type `{key_type}`"),
                });
            }
        }

        let acceptable_hash_algorithms = match get("h") {
            Some(algorithms) => {
                let supported = unfold(algorithms)
                    .split(':')
                    .filter_map(|algorithm| algorithm.parse::<HashAlgorithm>().ok())
                    .collect::<Vec<_>>();
                if supported.is_empty() {
                    return Err(ParseError::InvalidArgument {
                        reason: format!("no supported hash algorithm in `h={algorithms}`"),
                    });
                }
                supported
            }
            None => vec![],
        };

        let key = unfold(get("p").ok_or_else(|| ParseError::MissingRequiredField {
            field: "p".to_string(),
        })?);
        if key.is_empty() {
            return Err(ParseError::InvalidArgument {
                reason: "the key has been revoked".to_string(),
            });
        }

        let der = STANDARD
            .decode(key)
            .map_err(|error| ParseError::SyntaxError {
                reason: format!("p= is not base64: {error}"),
            })?;

        let inner = <rsa::RsaPublicKey as rsa::pkcs8::DecodePublicKey>::from_public_key_der(&der)
            .or_else(|_| <rsa::RsaPublicKey as rsa::pkcs1::DecodeRsaPublicKey>::from_pkcs1_der(&der))
            .map_err(|error| ParseError::InvalidArgument {
                reason: format!("p= is not a rsa public key: {error}"),
            })?;

        Ok(Self {
            acceptable_hash_algorithms,
            inner,
        })
    }
}

impl std::fmt::Display for PublicKey {
    /// Format the key as the content of a DNS TXT record.
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let der = <rsa::RsaPublicKey as rsa::pkcs8::EncodePublicKey>::to_public_key_der(&self.inner)
            .map_err(|_| std::fmt::Error)?;

        write!(f, "v=DKIM1; k=rsa;")?;
        if !self.acceptable_hash_algorithms.is_empty() {
            write!(
                f,
                " h={};",
                self.acceptable_hash_algorithms
                    .iter()
                    .map(ToString::to_string)
                    .collect::<Vec<_>>()
                    .join(":")
            )?;
        }
        write!(f, " p={}", STANDARD.encode(der.as_bytes()))
    }
}
