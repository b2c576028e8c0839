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

use mailsign_auth::dkim::{PublicKey, SigningConfig};
use mailsign_config::{init_logs, Config, MailsignConfig};
use mailsign_delivery::{send, verify_message, Closer, WriterSender};
use mailsign_mail::Message;
use std::io::Read;

#[derive(clap::Parser)]
#[command(author, version, about)]
struct Args {
    /// Path to the rhai configuration file.
    #[arg(short, long, default_value_t = String::from("/etc/mailsign/config.rhai"))]
    pub config: String,
    #[command(subcommand)]
    pub command: Command,
}

#[derive(clap::Subcommand)]
enum Command {
    /// Build a text message, sign it and write it on stdout.
    Sign {
        #[arg(long)]
        from: String,
        /// Recipient, can be repeated.
        #[arg(long, required = true)]
        to: Vec<String>,
        #[arg(long, default_value_t = String::new())]
        subject: String,
        /// Text of the message, read from stdin if absent.
        #[arg(long)]
        body: Option<String>,
    },
    /// Verify the DKIM-Signature of the message read on stdin.
    Verify {
        /// DNS TXT record of the public key, derived from the configured
        /// private key if absent.
        #[arg(long)]
        record: Option<String>,
    },
    /// Print the DNS TXT record of the configured key.
    Record,
}

type BoxError = Box<dyn std::error::Error + Send + Sync>;

fn read_stdin() -> std::io::Result<Vec<u8>> {
    let mut input = vec![];
    std::io::stdin().read_to_end(&mut input)?;
    Ok(input)
}

fn require(dkim: Option<&SigningConfig>) -> Result<&SigningConfig, BoxError> {
    dkim.ok_or_else(|| "no dkim parameters in the configuration".into())
}

async fn run(command: Command, dkim: Option<&SigningConfig>) -> Result<(), BoxError> {
    match command {
        Command::Sign {
            from,
            to,
            subject,
            body,
        } => {
            let body = match body {
                Some(body) => body,
                None => String::from_utf8(read_stdin()?)?,
            };

            let mut message = Message::new();
            message.set_header("From", [from]);
            message.set_header("To", &to);
            message.set_header("Subject", [subject]);
            message.set_body("text/plain", body);

            let mut sender = WriterSender::new(std::io::stdout());
            send(&mut sender, dkim, std::slice::from_ref(&message)).await?;
            sender.close().await?;
        }
        Command::Verify { record } => {
            let public_key = match record {
                Some(record) => record.parse::<PublicKey>()?,
                None => PublicKey::from(require(dkim)?.private_key()),
            };

            let signature = verify_message(&read_stdin()?, &public_key)?;
            println!("pass: d={} s={}", signature.sdid(), signature.selector());
        }
        Command::Record => {
            let dkim = require(dkim)?;
            println!(
                "{}._domainkey.{} IN TXT \"{}\"",
                dkim.selector(),
                dkim.sdid(),
                PublicKey::from(dkim.private_key())
            );
        }
    }

    Ok(())
}

#[tokio::main]
async fn main() -> std::process::ExitCode {
    let Args { config, command } = <Args as clap::Parser>::parse();

    let config = match MailsignConfig::from_rhai_file(&config) {
        Ok(config) => config,
        Err(error) => {
            eprintln!("Failed to initialize mailsign configuration: {error}");
            return std::process::ExitCode::FAILURE;
        }
    };

    if let Err(error) = init_logs(config.logs()) {
        eprintln!("Failed to initialize logs: {error}");
        return std::process::ExitCode::FAILURE;
    }

    let dkim = match config.signing_config() {
        Ok(dkim) => dkim,
        Err(error) => {
            tracing::error!("Failed to load the dkim key: {error}");
            return std::process::ExitCode::FAILURE;
        }
    };

    match run(command, dkim.as_ref()).await {
        Ok(()) => std::process::ExitCode::SUCCESS,
        Err(error) => {
            tracing::error!("{error}");
            eprintln!("{error}");
            std::process::ExitCode::FAILURE
        }
    }
}
