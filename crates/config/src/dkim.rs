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

use mailsign_auth::dkim::{Canonicalization, PrivateKey, SigningConfig};

/// DKIM parameters, as written in the `on_config` script.
#[derive(Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DkimConfig {
    /// Signing domain, "d=" tag.
    pub domain: String,
    /// Selector of the public key, "s=" tag.
    pub selector: String,
    /// Path of the PEM private key, relative to the configuration script.
    pub private_key: std::path::PathBuf,
    /// "c=" tag.
    #[serde(default)]
    pub canonicalization: Canonicalization,
    /// Headers to sign, in order.
    #[serde(default = "DkimConfig::default_headers")]
    pub headers: Vec<String>,
    /// Add the "t=" tag.
    #[serde(default)]
    pub timestamp: bool,
    /// Validity of the signature in seconds, "x=" tag.
    #[serde(default)]
    pub expiration: Option<u64>,
}

impl DkimConfig {
    fn default_headers() -> Vec<String> {
        ["From", "Subject", "Date", "Message-ID"]
            .into_iter()
            .map(str::to_string)
            .collect()
    }

    /// Read the private key and build the signing configuration.
    ///
    /// # Errors
    ///
    /// * the key cannot be read or is invalid
    /// * see [`SigningConfig::new`]
    pub fn build(
        &self,
        base: &std::path::Path,
    ) -> Result<SigningConfig, mailsign_auth::dkim::ConfigError> {
        let private_key = PrivateKey::from_pem_file(base.join(&self.private_key))?;

        let config = SigningConfig::new(
            self.domain.clone(),
            self.selector.clone(),
            private_key,
            self.headers.clone(),
        )?
        .with_canonicalization(self.canonicalization)
        .with_timestamp(self.timestamp);

        Ok(match self.expiration {
            Some(seconds) => config.with_expiration(std::time::Duration::from_secs(seconds)),
            None => config,
        })
    }
}
