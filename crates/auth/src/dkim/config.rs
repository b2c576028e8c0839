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

use super::{Canonicalization, PrivateKey, PrivateKeyError, SigningAlgorithm};

/// Errors raised while building a [`SigningConfig`].
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    ///
    #[error("the signing domain (d=) cannot be empty")]
    EmptyDomain,
    ///
    #[error("the selector (s=) cannot be empty")]
    EmptySelector,
    ///
    #[error("the list of headers to sign (h=) cannot be empty")]
    NoHeaders,
    ///
    #[error("invalid private key: {0}")]
    PrivateKey(#[from] PrivateKeyError),
}

/// Everything needed to sign a message, immutable once built.
#[derive(Debug)]
pub struct SigningConfig {
    sdid: String,
    selector: String,
    private_key: PrivateKey,
    canonicalization: Canonicalization,
    headers_field: Vec<String>,
    signing_algorithm: Option<SigningAlgorithm>,
    timestamp: bool,
    expiration: Option<std::time::Duration>,
}

impl SigningConfig {
    /// Create a configuration with a `simple/simple` canonicalization and no "t=" or "x=" tags.
    ///
    /// # Errors
    ///
    /// * the domain or the selector is empty
    /// * the list of headers is empty
    pub fn new(
        sdid: impl Into<String>,
        selector: impl Into<String>,
        private_key: PrivateKey,
        headers_field: Vec<String>,
    ) -> Result<Self, ConfigError> {
        let sdid = sdid.into();
        let selector = selector.into();

        if sdid.trim().is_empty() {
            return Err(ConfigError::EmptyDomain);
        }
        if selector.trim().is_empty() {
            return Err(ConfigError::EmptySelector);
        }
        if headers_field.iter().all(|name| name.trim().is_empty()) {
            return Err(ConfigError::NoHeaders);
        }

        Ok(Self {
            sdid,
            selector,
            private_key,
            canonicalization: Canonicalization::default(),
            headers_field: headers_field
                .into_iter()
                .map(|name| name.trim().to_string())
                .filter(|name| !name.is_empty())
                .collect(),
            signing_algorithm: None,
            timestamp: false,
            expiration: None,
        })
    }

    ///
    #[must_use]
    pub fn with_canonicalization(mut self, canonicalization: Canonicalization) -> Self {
        self.canonicalization = canonicalization;
        self
    }

    /// Require a specific algorithm instead of the one of the key.
    #[must_use]
    pub fn with_algorithm(mut self, signing_algorithm: SigningAlgorithm) -> Self {
        self.signing_algorithm = Some(signing_algorithm);
        self
    }

    /// Add the "t=" tag.
    #[must_use]
    pub fn with_timestamp(mut self, timestamp: bool) -> Self {
        self.timestamp = timestamp;
        self
    }

    /// Add the "x=" tag, `expiration` after the signature.
    #[must_use]
    pub fn with_expiration(mut self, expiration: std::time::Duration) -> Self {
        self.expiration = Some(expiration);
        self
    }

    ///
    #[must_use]
    pub fn sdid(&self) -> &str {
        &self.sdid
    }

    ///
    #[must_use]
    pub fn selector(&self) -> &str {
        &self.selector
    }

    ///
    #[must_use]
    pub const fn private_key(&self) -> &PrivateKey {
        &self.private_key
    }

    ///
    #[must_use]
    pub const fn canonicalization(&self) -> Canonicalization {
        self.canonicalization
    }

    /// The names of the headers to sign, as configured.
    #[must_use]
    pub fn headers_field(&self) -> &[String] {
        &self.headers_field
    }

    ///
    #[must_use]
    pub const fn signing_algorithm(&self) -> Option<SigningAlgorithm> {
        self.signing_algorithm
    }

    ///
    #[must_use]
    pub const fn timestamp(&self) -> bool {
        self.timestamp
    }

    ///
    #[must_use]
    pub const fn expiration(&self) -> Option<std::time::Duration> {
        self.expiration
    }
}
