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
    signature::{QueryMethod, HEADER_NAME},
    BackendError, Mail, Signature, SignatureBackend, SigningAlgorithm, SigningConfig,
};
use base64::{engine::general_purpose::STANDARD, Engine};

/// Error that can occur during the signature of a message
#[must_use]
#[derive(Debug, thiserror::Error)]
pub enum SigningError {
    /// The key cannot be used, for instance a RSA key smaller than 1024 bits.
    #[error("invalid key: {reason}")]
    InvalidKey {
        ///
        reason: String,
    },
    /// The key cannot produce the requested algorithm
    #[error("the key cannot produce a `{signing_algorithm}` signature")]
    HashAlgorithmUnsupported {
        /// The signing algorithm requested
        signing_algorithm: SigningAlgorithm,
    },
    /// The underlying backend returned an error
    #[error("signature failed: {0}")]
    SignFailed(#[from] BackendError),
    /// None of the headers to sign is in the message.
    #[error("none of the headers to sign is present in the message")]
    NoHeadersToSign,
}

/// Sign `message`, see [`sign_at`].
///
/// # Errors
///
/// * see [`SigningError`]
pub fn sign(message: &impl Mail, config: &SigningConfig) -> Result<Signature, SigningError> {
    sign_at(message, config, std::time::SystemTime::now())
}

/// Produce the `DKIM-Signature` of `message`, `now` being the time of the signature
/// written in the "t=" and "x=" tags if configured.
///
/// The message is not modified, the caller is in charge of prepending the header.
///
/// # Errors
///
/// * see [`SigningError`]
pub fn sign_at(
    message: &impl Mail,
    config: &SigningConfig,
    now: std::time::SystemTime,
) -> Result<Signature, SigningError> {
    sign_with(message, config, config.private_key(), now)
}

pub(super) fn sign_with(
    message: &impl Mail,
    config: &SigningConfig,
    backend: &impl SignatureBackend,
    now: std::time::SystemTime,
) -> Result<Signature, SigningError> {
    let signing_algorithm = backend.algorithm();
    if let Some(requested) = config.signing_algorithm() {
        if requested != signing_algorithm {
            return Err(SigningError::HashAlgorithmUnsupported {
                signing_algorithm: requested,
            });
        }
    }

    let canonicalization = config.canonicalization();

    let selected = Signature::select_headers(message, config.headers_field());
    if selected.is_empty() {
        return Err(SigningError::NoHeadersToSign);
    }

    let body_hash =
        STANDARD.encode(backend.hash(&canonicalization.canonicalize_body(message.get_body())));

    let now = now
        .duration_since(std::time::UNIX_EPOCH)
        .map_or(0, |elapsed| elapsed.as_secs());

    let mut signature = Signature {
        version: 1,
        signing_algorithm,
        sdid: config.sdid().to_string(),
        selector: config.selector().to_string(),
        canonicalization,
        query_method: QueryMethod::default(),
        signature_timestamp: config.timestamp().then_some(now),
        expire_time: config
            .expiration()
            .map(|expiration| now.saturating_add(expiration.as_secs())),
        headers_field: Signature::field_names(canonicalization.header, &selected),
        body_hash,
        signature: String::default(),
        raw: String::default(),
    };
    signature.raw = format!("{HEADER_NAME}: {}", signature.unsigned_value());

    let headers_hash = backend.hash(signature.get_header_for_hash(message).as_bytes());
    tracing::trace!(headers_hash = %STANDARD.encode(&headers_hash), "Headers hashed.");

    signature.signature = STANDARD.encode(backend.sign(&headers_hash)?);
    signature
        .raw
        .push_str(&Signature::wrap_signature(&signature.signature));

    tracing::debug!(
        sdid = %signature.sdid,
        selector = %signature.selector,
        h = %signature.headers_field.join(":"),
        "Message signed."
    );

    Ok(signature)
}
