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

use super::sign::SigningError;

/// Hash & sign algorithm exposed in a `DKIM-Signature` header.
#[allow(clippy::module_name_repetitions)]
#[derive(
    Debug,
    PartialEq,
    Eq,
    Copy,
    Clone,
    Hash,
    strum::EnumString,
    strum::Display,
    serde_with::SerializeDisplay,
    serde_with::DeserializeFromStr,
)]
pub enum SigningAlgorithm {
    /// See the implementation <https://docs.rs/sha2> and <https://docs.rs/rsa>
    #[strum(serialize = "rsa-sha256")]
    RsaSha256,
}

impl SigningAlgorithm {
    /// The hash algorithm feeding the signature.
    #[must_use]
    pub const fn hash_algorithm(self) -> HashAlgorithm {
        match self {
            Self::RsaSha256 => HashAlgorithm::Sha256,
        }
    }
}

/// Hash algorithms exposed in the `DKIM record`,
/// used to describe the content of the "p=" tag in the record.
#[allow(clippy::module_name_repetitions)]
#[derive(Debug, PartialEq, Eq, Copy, Clone, Hash, strum::EnumString, strum::Display)]
#[strum(serialize_all = "lowercase")]
pub enum HashAlgorithm {
    /// See the implementation <https://docs.rs/sha2>
    Sha256,
}

impl HashAlgorithm {
    /// Return the hashed `data` using the algorithm.
    #[must_use]
    pub fn hash<T: AsRef<[u8]>>(self, data: T) -> Vec<u8> {
        match self {
            Self::Sha256 => {
                let mut digest = <sha2::Sha256 as sha2::Digest>::new();
                sha2::Digest::update(&mut digest, data);
                sha2::Digest::finalize(digest).to_vec()
            }
        }
    }
}

/// Error of the underlying cryptographic library.
#[derive(Debug, thiserror::Error)]
pub enum BackendError {
    ///
    #[error("{0}")]
    Rsa(#[from] rsa::Error),
}

/// The cryptographic capabilities needed to sign a message.
///
/// The canonicalization and the construction of the header never depend on
/// the implementation, a new algorithm only needs a new implementor.
pub trait SignatureBackend {
    /// The algorithm written in the "a=" tag.
    fn algorithm(&self) -> SigningAlgorithm;

    /// Digest `data` with the hash function of the algorithm.
    fn hash(&self, data: &[u8]) -> Vec<u8> {
        self.algorithm().hash_algorithm().hash(data)
    }

    /// Sign a digest produced by [`SignatureBackend::hash`].
    ///
    /// # Errors
    ///
    /// * the key is not usable
    /// * the underlying library failed
    fn sign(&self, digest: &[u8]) -> Result<Vec<u8>, SigningError>;
}
