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

use super::{sign::SigningError, BackendError, SignatureBackend, SigningAlgorithm};

/// Minimum size of a RSA key, in bits.
/// <https://www.rfc-editor.org/rfc/rfc8301#section-3.2>
pub const RSA_MINIMUM_ACCEPTABLE_KEY_SIZE: usize = 1024;

/// Errors raised while loading a private key.
#[derive(Debug, thiserror::Error)]
pub enum PrivateKeyError {
    ///
    #[error("{0}")]
    Io(#[from] std::io::Error),
    ///
    #[error("{0}")]
    Pkcs1(#[from] rsa::pkcs1::Error),
    ///
    #[error("{0}")]
    Pkcs8(#[from] rsa::pkcs8::Error),
    /// The key is parsed but is too weak to produce an acceptable signature.
    #[error(
        "invalid key size: {0} bits, was expecting at least {} bits",
        RSA_MINIMUM_ACCEPTABLE_KEY_SIZE
    )]
    InvalidSize(usize),
    ///
    #[error("the private key is not in a supported format (pem+rsa+pkcs1, pem+rsa+pkcs8)")]
    CannotParse,
}

/// Private key used for the signature of a message
#[derive(PartialEq, Eq)]
pub enum PrivateKey {
    /// RSA private key
    Rsa(Box<rsa::RsaPrivateKey>),
}

impl std::fmt::Debug for PrivateKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Rsa(_) => f.debug_struct("Rsa").finish_non_exhaustive(),
        }
    }
}

impl PrivateKey {
    fn load_pem_rsa_pkcs1(source: &str) -> Result<Self, PrivateKeyError> {
        let private_key =
            <rsa::RsaPrivateKey as rsa::pkcs1::DecodeRsaPrivateKey>::from_pkcs1_pem(source)?;
        Ok(Self::Rsa(Box::new(private_key)))
    }

    fn load_pem_rsa_pkcs8(source: &str) -> Result<Self, PrivateKeyError> {
        let private_key =
            <rsa::RsaPrivateKey as rsa::pkcs8::DecodePrivateKey>::from_pkcs8_pem(source)?;
        Ok(Self::Rsa(Box::new(private_key)))
    }

    /// Parse a PEM encoded key, PKCS#8 or PKCS#1.
    ///
    /// # Errors
    ///
    /// * the content is not a supported key
    /// * the key is smaller than [`RSA_MINIMUM_ACCEPTABLE_KEY_SIZE`]
    pub fn from_pem(source: &str) -> Result<Self, PrivateKeyError> {
        let key = Self::load_pem_rsa_pkcs8(source)
            .or_else(|_| Self::load_pem_rsa_pkcs1(source))
            .map_err(|_| PrivateKeyError::CannotParse)?;

        let size = key.size();
        if size < RSA_MINIMUM_ACCEPTABLE_KEY_SIZE {
            return Err(PrivateKeyError::InvalidSize(size));
        }
        Ok(key)
    }

    /// Read and parse a PEM file, see [`PrivateKey::from_pem`].
    ///
    /// # Errors
    ///
    /// * the file cannot be read
    /// * see [`PrivateKey::from_pem`]
    pub fn from_pem_file(filepath: impl AsRef<std::path::Path>) -> Result<Self, PrivateKeyError> {
        let source = std::fs::read_to_string(filepath)?;
        Self::from_pem(&source)
    }

    /// Size of the key in bits.
    #[must_use]
    pub fn size(&self) -> usize {
        match self {
            Self::Rsa(rsa) => rsa::traits::PublicKeyParts::size(rsa.as_ref()) * 8,
        }
    }
}

impl SignatureBackend for PrivateKey {
    fn algorithm(&self) -> SigningAlgorithm {
        match self {
            Self::Rsa(_) => SigningAlgorithm::RsaSha256,
        }
    }

    fn sign(&self, digest: &[u8]) -> Result<Vec<u8>, SigningError> {
        match self {
            Self::Rsa(rsa) => {
                let size = self.size();
                if size < RSA_MINIMUM_ACCEPTABLE_KEY_SIZE {
                    return Err(SigningError::InvalidKey {
                        reason: format!(
                            "{size} bits, was expecting at least {RSA_MINIMUM_ACCEPTABLE_KEY_SIZE} bits"
                        ),
                    });
                }
                rsa.sign(rsa::Pkcs1v15Sign::new::<sha2::Sha256>(), digest)
                    .map_err(Into::<BackendError>::into)
                    .map_err(Into::into)
            }
        }
    }
}
