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

use crate::Error;
use mailsign_auth::dkim::{self, PublicKey, Signature, SigningConfig};
use mailsign_mail::{
    parsing::{split_message, RawHeader},
    Header, Message, WireMessage,
};

/// A header as handed to the signer or the verifier: its wire form, folded
/// and terminated by CRLF.
#[derive(Debug, Clone)]
pub struct DkimHeader<'a> {
    name: &'a str,
    raw: std::borrow::Cow<'a, str>,
}

impl dkim::Header for DkimHeader<'_> {
    fn field_name(&self) -> String {
        self.name.to_string()
    }

    fn get(&self) -> String {
        self.raw.to_string()
    }
}

/// A message as seen by DKIM: the headers and body exactly as written.
#[derive(Debug)]
pub struct DkimMail<'a> {
    headers: Vec<DkimHeader<'a>>,
    body: &'a [u8],
}

impl<'a> DkimMail<'a> {
    /// View of a message about to be written.
    #[must_use]
    pub fn from_wire(wire: &'a WireMessage) -> Self {
        Self {
            headers: wire
                .headers
                .iter()
                .map(|header| DkimHeader {
                    name: &header.name,
                    raw: header.to_string().into(),
                })
                .collect(),
            body: &wire.body,
        }
    }

    /// View of a message read back from its bytes.
    #[must_use]
    pub fn from_raw(headers: &'a [RawHeader], body: &'a [u8]) -> Self {
        Self {
            headers: headers
                .iter()
                .map(|header| DkimHeader {
                    name: &header.name,
                    raw: header.raw.as_str().into(),
                })
                .collect(),
            body,
        }
    }
}

impl<'a> dkim::Mail for DkimMail<'a> {
    type H = DkimHeader<'a>;

    fn get_body(&self) -> &[u8] {
        self.body
    }

    fn get_headers(&self) -> Vec<Self::H> {
        self.headers.clone()
    }
}

/// The message with a `Date` header set to `now` when it has none.
/// <https://www.rfc-editor.org/rfc/rfc5322#section-3.6>
///
/// # Errors
///
/// * `now` cannot be formatted
pub fn with_date(
    message: &Message,
    now: time::OffsetDateTime,
) -> Result<std::borrow::Cow<'_, Message>, Error> {
    if message.get_header("Date").is_some() {
        return Ok(std::borrow::Cow::Borrowed(message));
    }

    let mut dated = message.clone();
    dated.set_date_header("Date", now)?;
    tracing::debug!(date = dated.get_header("Date"), "Date header added.");

    Ok(std::borrow::Cow::Owned(dated))
}

/// Sign the message as it will be written, and return a copy of it with the
/// `DKIM-Signature` header in first position.
///
/// A `Date` header is added first if the message has none.
///
/// # Errors
///
/// * see [`sign_message_at`]
pub fn sign_message(message: &Message, config: &SigningConfig) -> Result<Message, Error> {
    sign_message_at(message, config, time::OffsetDateTime::now_utc())
}

/// Same as [`sign_message`], `now` being the time of the signature and of the
/// added `Date` header.
///
/// # Errors
///
/// * the body tree of the message is malformed, or a header is invalid
/// * see [`dkim::SigningError`]
pub fn sign_message_at(
    message: &Message,
    config: &SigningConfig,
    now: time::OffsetDateTime,
) -> Result<Message, Error> {
    let message = with_date(message, now)?;
    let wire = message.to_wire()?;
    let signature = dkim::sign_at(&DkimMail::from_wire(&wire), config, now.into())?;

    let mut signed = message.into_owned();
    signed.prepend_header(Header::new(dkim::HEADER_NAME, signature.to_string()));

    tracing::info!(
        sdid = signature.sdid(),
        selector = signature.selector(),
        headers = ?signature.headers_field(),
        "Message signed."
    );

    Ok(signed)
}

/// Read a serialized message back and verify its first `DKIM-Signature`.
///
/// # Errors
///
/// * the bytes are not a message
/// * the message is not signed, or the signature is malformed
/// * see [`dkim::VerifierError`]
pub fn verify_message(message: &[u8], public_key: &PublicKey) -> Result<Signature, Error> {
    let (headers, body) = split_message(message)?;

    let signature = headers
        .iter()
        .find(|header| header.name.eq_ignore_ascii_case(dkim::HEADER_NAME))
        .ok_or(Error::MissingSignature)?
        .raw
        .parse::<Signature>()?;

    dkim::verify(&signature, &DkimMail::from_raw(&headers, body), public_key)?;

    tracing::info!(
        sdid = signature.sdid(),
        selector = signature.selector(),
        "Signature verified."
    );

    Ok(signature)
}

#[cfg(test)]
mod tests {
    use super::*;
    use mailsign_auth::dkim::{Canonicalization, PrivateKey};
    use mailsign_mail::MailError;
    use pretty_assertions::assert_eq;

    const NOW: time::OffsetDateTime = time::macros::datetime!(2014-06-25 17:46:00 UTC);

    fn config(headers: &[&str], canonicalization: &str) -> SigningConfig {
        SigningConfig::new(
            "example.com",
            "1592040826",
            PrivateKey::from_pem(include_str!("../fixtures/dkim_1024.pem")).unwrap(),
            headers.iter().map(ToString::to_string).collect(),
        )
        .unwrap()
        .with_canonicalization(canonicalization.parse::<Canonicalization>().unwrap())
    }

    fn message() -> Message {
        let mut message = Message::new();
        message.set_header("From", ["from@example.com"]);
        message.set_header("To", ["to1@example.com", "to2@example.com"]);
        message.set_body("text/plain", "Test message");
        message
    }

    #[test_log::test]
    fn end_to_end() {
        let signed =
            sign_message_at(&message(), &config(&["From"], "relaxed/relaxed"), NOW).unwrap();
        let bytes = String::from_utf8(signed.to_bytes().unwrap()).unwrap();

        assert_eq!(
            bytes,
            concat!(
                "DKIM-Signature: v=1; a=rsa-sha256; q=dns/txt; c=relaxed/relaxed;\r\n",
                "\td=example.com; s=1592040826;\r\n",
                "\th=from;\r\n",
                "\tbh=PkbvdhgKiEAAhc+GiwM2ZnxMu+StJ76lWGj3Y9phfFA=;\r\n",
                "\tb=Cy5MjicsOZ7KmIRA/zpEEbf+bYZ9wkZJVIDWkgo/cv9bvCP98DJ+MTxaYifaifhuSALUh4Eg\r\n",
                "\tUTkQTQsAsSkzblxqxk938QD0znbekeqdnqQx/d2gYri89q7Pf5WwlVDfv+KqYMQMp559cDjd\r\n",
                "\tSXH5n/sqjmGemTiHbMPRzo+bUZY=\r\n",
                "From: from@example.com\r\n",
                "To: to1@example.com, to2@example.com\r\n",
                "Date: Wed, 25 Jun 2014 17:46:00 +0000\r\n",
                "MIME-Version: 1.0\r\n",
                "Content-Type: text/plain; charset=UTF-8\r\n",
                "Content-Transfer-Encoding: quoted-printable\r\n",
                "\r\n",
                "Test message",
            )
        );
    }

    #[test]
    fn original_is_untouched() {
        let message = message();
        let signed = sign_message(&message, &config(&["From"], "simple/simple")).unwrap();

        assert!(message.get_header("DKIM-Signature").is_none());
        assert!(signed.get_header("DKIM-Signature").is_some());
    }

    #[test]
    fn deterministic() {
        let config = config(&["From", "To", "Subject"], "relaxed/simple");

        assert_eq!(
            sign_message_at(&message(), &config, NOW)
                .unwrap()
                .to_bytes()
                .unwrap(),
            sign_message_at(&message(), &config, NOW)
                .unwrap()
                .to_bytes()
                .unwrap()
        );
    }

    #[test]
    fn date_is_added_and_signed() {
        let config = config(&["From", "Date"], "simple/simple");
        let signed = sign_message_at(&message(), &config, NOW).unwrap();

        assert_eq!(
            signed.get_header("Date"),
            Some("Wed, 25 Jun 2014 17:46:00 +0000")
        );
        let signature = signed
            .get_header("DKIM-Signature")
            .unwrap()
            .parse::<Signature>()
            .unwrap();
        assert_eq!(signature.headers_field(), ["From", "Date"]);

        let mut dated = message();
        dated.set_header("Date", ["Mon, 1 Jan 2001 00:00:00 +0000"]);
        let signed = sign_message_at(&dated, &config, NOW).unwrap();
        assert_eq!(
            signed.get_header("Date"),
            Some("Mon, 1 Jan 2001 00:00:00 +0000")
        );
    }

    #[test]
    fn line_break_in_a_header_is_refused() {
        let config = config(&["From", "Subject"], "relaxed/relaxed");

        let mut injected = message();
        injected.set_header("Subject", ["hi\r\nBcc: leaked@example.com"]);
        assert!(matches!(
            sign_message(&injected, &config),
            Err(Error::Canonicalization(MailError::InvalidHeader { name })) if name == "Subject"
        ));

        let mut bare_lf = message();
        bare_lf.set_header("Subject", ["hi\nthere"]);
        assert!(matches!(
            sign_message(&bare_lf, &config),
            Err(Error::Canonicalization(MailError::InvalidHeader { .. }))
        ));
    }

    #[test_log::test]
    fn round_trip() {
        let mut message = message();
        message.set_header(
            "Subject",
            ["a subject long enough to be folded when the header is written on the wire"],
        );
        message.attach("report.txt", "text/plain", b"one\ntwo\n".to_vec());

        for canonicalization in ["simple/simple", "relaxed/relaxed"] {
            let config = config(&["From", "To", "Subject"], canonicalization);
            let signed = sign_message(&message, &config).unwrap();
            let bytes = signed.to_bytes().unwrap();

            let signature =
                verify_message(&bytes, &PublicKey::from(config.private_key())).unwrap();

            let expected = dkim::sign(
                &DkimMail::from_wire(&message.to_wire().unwrap()),
                &config,
            )
            .unwrap();
            assert_eq!(signature.body_hash(), expected.body_hash());
            assert_eq!(signature.headers_field(), expected.headers_field());
        }
    }

    #[test]
    fn tampered_body() {
        let config = config(&["From"], "relaxed/relaxed");
        let bytes = sign_message(&message(), &config)
            .unwrap()
            .to_bytes()
            .unwrap();
        let tampered = String::from_utf8(bytes)
            .unwrap()
            .replace("Test message", "Test massage");

        assert!(matches!(
            verify_message(tampered.as_bytes(), &PublicKey::from(config.private_key())),
            Err(Error::Verification(
                dkim::VerifierError::BodyHashMismatch { .. }
            ))
        ));
    }

    #[test]
    fn unsigned() {
        let config = config(&["From"], "relaxed/relaxed");

        assert!(matches!(
            verify_message(
                &message().to_bytes().unwrap(),
                &PublicKey::from(config.private_key())
            ),
            Err(Error::MissingSignature)
        ));
        assert!(matches!(
            verify_message(b"not a message", &PublicKey::from(config.private_key())),
            Err(Error::Canonicalization(_))
        ));
    }
}
