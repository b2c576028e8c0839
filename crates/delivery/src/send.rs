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

use crate::{sign_message_at, with_date, Error};
use mailsign_auth::dkim::SigningConfig;
use mailsign_mail::{MailError, Message};

/// Transmit a message to its recipients.
#[async_trait::async_trait]
pub trait Sender {
    /// Error of the transport.
    type Error: std::error::Error + Send + Sync + 'static;

    /// Send one message.
    ///
    /// `message` is already signed when `dkim` is set.
    async fn send(
        &mut self,
        from: &str,
        to: &[String],
        dkim: Option<&SigningConfig>,
        message: &Message,
    ) -> Result<(), Self::Error>;
}

/// Release the resources of a transport.
///
/// [`send`] never closes the sender it is given, it is up to the owner.
#[async_trait::async_trait]
pub trait Closer {
    /// Error raised while closing.
    type Error: std::error::Error + Send + Sync + 'static;

    /// Close the transport.
    async fn close(&mut self) -> Result<(), Self::Error>;
}

/// Use a closure as a [`Sender`].
pub struct SendFn<F>(pub F);

#[async_trait::async_trait]
impl<F, E> Sender for SendFn<F>
where
    F: FnMut(&str, &[String], Option<&SigningConfig>, &Message) -> Result<(), E> + Send,
    E: std::error::Error + Send + Sync + 'static,
{
    type Error = E;

    async fn send(
        &mut self,
        from: &str,
        to: &[String],
        dkim: Option<&SigningConfig>,
        message: &Message,
    ) -> Result<(), E> {
        (self.0)(from, to, dkim, message)
    }
}

/// Write the messages one after the other on a byte sink.
pub struct WriterSender<W> {
    writer: W,
    sent: usize,
}

impl<W> WriterSender<W> {
    ///
    pub const fn new(writer: W) -> Self {
        Self { writer, sent: 0 }
    }

    /// Number of messages written so far.
    pub const fn sent(&self) -> usize {
        self.sent
    }

    ///
    pub fn into_inner(self) -> W {
        self.writer
    }
}

#[async_trait::async_trait]
impl<W: std::io::Write + Send> Sender for WriterSender<W> {
    type Error = MailError;

    async fn send(
        &mut self,
        from: &str,
        to: &[String],
        _: Option<&SigningConfig>,
        message: &Message,
    ) -> Result<(), MailError> {
        let written = message.write_to(&mut self.writer)?;
        self.sent += 1;

        tracing::debug!(from, ?to, written, "Message written.");
        Ok(())
    }
}

#[async_trait::async_trait]
impl<W: std::io::Write + Send> Closer for WriterSender<W> {
    type Error = std::io::Error;

    async fn close(&mut self) -> Result<(), std::io::Error> {
        self.writer.flush()
    }
}

/// Sign each message if `dkim` is set, then hand it to `sender` with its
/// envelope.
///
/// A message without `Date` gets one set to the current time, signed or not.
///
/// The envelope sender is the address of `Sender`, or else `From`. The
/// recipients are the addresses of `To`, `Cc` and `Bcc`.
///
/// Stop at the first message that fails.
///
/// # Errors
///
/// * a message has no sender or no recipient
/// * see [`send_at`]
pub async fn send<S: Sender + ?Sized>(
    sender: &mut S,
    dkim: Option<&SigningConfig>,
    messages: &[Message],
) -> Result<(), Error> {
    send_at(sender, dkim, messages, time::OffsetDateTime::now_utc()).await
}

/// Same as [`send`], `now` being the time of the signatures and of the added
/// `Date` headers.
///
/// # Errors
///
/// * a message has no sender or no recipient
/// * see [`sign_message_at`]
/// * the sender failed, see [`Error::Send`]
pub async fn send_at<S: Sender + ?Sized>(
    sender: &mut S,
    dkim: Option<&SigningConfig>,
    messages: &[Message],
    now: time::OffsetDateTime,
) -> Result<(), Error> {
    for (index, message) in messages.iter().enumerate() {
        let from = message.sender().ok_or(Error::MissingMailFrom)?;
        let to = message.recipients();
        if to.is_empty() {
            return Err(Error::MissingRcptTo);
        }
        tracing::debug!(index, %from, ?to, "Envelope extracted.");

        let message = match dkim {
            Some(config) => std::borrow::Cow::Owned(sign_message_at(message, config, now)?),
            None => with_date(message, now)?,
        };

        sender
            .send(&from, &to, dkim, &message)
            .await
            .map_err(|source| Error::Send {
                index,
                source: Box::new(source),
            })?;

        tracing::info!(index, %from, "Message sent.");
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use mailsign_auth::dkim::PrivateKey;
    use pretty_assertions::assert_eq;

    #[derive(Default)]
    struct Recorder {
        envelopes: Vec<(String, Vec<String>)>,
        signed: Vec<bool>,
        dates: Vec<Option<String>>,
        closed: bool,
        fail_at: Option<usize>,
    }

    #[async_trait::async_trait]
    impl Sender for Recorder {
        type Error = std::io::Error;

        async fn send(
            &mut self,
            from: &str,
            to: &[String],
            dkim: Option<&SigningConfig>,
            message: &Message,
        ) -> Result<(), std::io::Error> {
            if self.fail_at == Some(self.envelopes.len()) {
                return Err(std::io::ErrorKind::ConnectionRefused.into());
            }
            self.envelopes.push((from.to_string(), to.to_vec()));
            self.signed
                .push(dkim.is_some() && message.get_header("DKIM-Signature").is_some());
            self.dates
                .push(message.get_header("Date").map(ToString::to_string));
            Ok(())
        }
    }

    #[async_trait::async_trait]
    impl Closer for Recorder {
        type Error = std::io::Error;

        async fn close(&mut self) -> Result<(), std::io::Error> {
            self.closed = true;
            Ok(())
        }
    }

    fn message() -> Message {
        let mut message = Message::new();
        message.set_header("From", ["from@example.com"]);
        message.set_header("To", ["to1@example.com", "to2@example.com"]);
        message.set_body("text/plain", "Test message");
        message
    }

    fn dkim() -> SigningConfig {
        SigningConfig::new(
            "example.com",
            "1592040826",
            PrivateKey::from_pem(include_str!("../fixtures/dkim_1024.pem")).unwrap(),
            vec!["From".to_string()],
        )
        .unwrap()
    }

    #[test_log::test(tokio::test)]
    async fn envelope() {
        let mut sender = Recorder::default();
        send(&mut sender, None, &[message()]).await.unwrap();

        assert_eq!(
            sender.envelopes,
            [(
                "from@example.com".to_string(),
                vec!["to1@example.com".to_string(), "to2@example.com".to_string()]
            )]
        );
        assert_eq!(sender.signed, [false]);
        assert!(!sender.closed);
    }

    #[test_log::test(tokio::test)]
    async fn envelope_from_sender_and_bcc() {
        let mut message = message();
        message.set_address_header("Sender", "bounce@example.com", "Bounces");
        message.set_header("Cc", ["to2@example.com", "cc@example.com"]);
        message.set_header("Bcc", ["hidden@example.com"]);

        let mut sender = Recorder::default();
        send(&mut sender, None, &[message]).await.unwrap();

        assert_eq!(
            sender.envelopes,
            [(
                "bounce@example.com".to_string(),
                ["to1", "to2", "cc", "hidden"]
                    .map(|local| format!("{local}@example.com"))
                    .to_vec()
            )]
        );
    }

    #[tokio::test]
    async fn signed() {
        let dkim = dkim();
        let mut sender = Recorder::default();
        send(&mut sender, Some(&dkim), &[message(), message()])
            .await
            .unwrap();

        assert_eq!(sender.signed, [true, true]);
        assert!(!sender.closed);
    }

    #[test_log::test(tokio::test)]
    async fn date_is_added_when_absent() {
        let now = time::macros::datetime!(2014-06-25 17:46:00 UTC);
        let mut dated = message();
        dated.set_header("Date", ["Mon, 1 Jan 2001 00:00:00 +0000"]);

        for dkim in [None, Some(dkim())] {
            let mut sender = Recorder::default();
            send_at(&mut sender, dkim.as_ref(), &[message(), dated.clone()], now)
                .await
                .unwrap();

            assert_eq!(
                sender.dates,
                [
                    Some("Wed, 25 Jun 2014 17:46:00 +0000".to_string()),
                    Some("Mon, 1 Jan 2001 00:00:00 +0000".to_string())
                ]
            );
        }
    }

    #[tokio::test]
    async fn missing_envelope() {
        let mut no_from = message();
        no_from.set_header("From", Vec::<String>::new());
        let mut no_to = message();
        no_to.set_header("To", Vec::<String>::new());

        let mut sender = Recorder::default();
        assert!(matches!(
            send(&mut sender, None, &[no_from]).await,
            Err(Error::MissingMailFrom)
        ));
        assert!(matches!(
            send(&mut sender, None, &[no_to]).await,
            Err(Error::MissingRcptTo)
        ));
        assert!(sender.envelopes.is_empty());
    }

    #[tokio::test]
    async fn stops_at_first_failure() {
        let mut sender = Recorder {
            fail_at: Some(1),
            ..Recorder::default()
        };

        let Err(Error::Send { index, source }) =
            send(&mut sender, None, &[message(), message(), message()]).await
        else {
            panic!("the second message must fail");
        };
        assert_eq!(index, 1);
        assert_eq!(
            source.to_string(),
            std::io::Error::from(std::io::ErrorKind::ConnectionRefused).to_string()
        );
        assert_eq!(sender.envelopes.len(), 1);
    }

    #[tokio::test]
    async fn closure() {
        let mut seen = vec![];
        let mut sender = SendFn(
            |from: &str, to: &[String], _: Option<&SigningConfig>, _: &Message| {
                seen.push(format!("{from} -> {}", to.join(", ")));
                Ok::<(), std::io::Error>(())
            },
        );
        send(&mut sender, None, &[message()]).await.unwrap();
        drop(sender);

        assert_eq!(seen, ["from@example.com -> to1@example.com, to2@example.com"]);
    }

    #[tokio::test]
    async fn writer() {
        let dkim = dkim();
        let mut sender = WriterSender::new(Vec::new());
        send(&mut sender, Some(&dkim), &[message()]).await.unwrap();
        sender.close().await.unwrap();

        assert_eq!(sender.sent(), 1);
        let written = String::from_utf8(sender.into_inner()).unwrap();
        assert!(written.starts_with("DKIM-Signature: v=1; a=rsa-sha256;"));
        assert!(written.ends_with("\r\n\r\nTest message"));
    }
}
