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

use crate::errors::{MailError, MailResult};

/// A header exactly as received.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawHeader {
    /// Field name, without surrounding whitespace.
    pub name: String,
    /// The complete header: name, colon, folded value and final CRLF.
    pub raw: String,
}

/// Read the current line and its folded continuations, and extract a header
/// if there is any.
///
/// # Arguments
///
/// * `content` - The lines to parse, CRLF included. The slice is advanced
///               past the continuation lines consumed.
pub fn read_header<'a, C: AsRef<str>>(content: &mut &'a [C]) -> Option<RawHeader> {
    let lines: &'a [C] = *content;
    let (name, _) = lines.first()?.as_ref().split_once(':')?;

    let folded = lines[1..]
        .iter()
        .take_while(|line| line.as_ref().starts_with(|c| c == ' ' || c == '\t'))
        .count();
    let raw = lines[..=folded]
        .iter()
        .map(|line| line.as_ref())
        .collect::<String>();
    *content = &lines[folded..];

    Some(RawHeader {
        name: name.trim().to_string(),
        raw,
    })
}

/// Split a raw message into its headers and its body.
///
/// # Errors
///
/// * the message has no empty line after its headers
/// * the headers are not valid UTF-8
/// * a line of the header section is not a header
pub fn split_message(message: &[u8]) -> MailResult<(Vec<RawHeader>, &[u8])> {
    let (head, body) = if message.starts_with(b"\r\n") {
        (&message[..0], &message[2..])
    } else {
        let end = message
            .windows(4)
            .position(|window| window == b"\r\n\r\n")
            .ok_or_else(|| MailError::InvalidMail("missing end of headers".to_string()))?;
        (&message[..end + 2], &message[end + 4..])
    };

    let head = std::str::from_utf8(head)
        .map_err(|error| MailError::InvalidMail(format!("headers are not utf-8: {error}")))?;
    let lines = head.split_inclusive("\r\n").collect::<Vec<_>>();

    let mut headers = vec![];
    let mut cursor = lines.as_slice();
    while !cursor.is_empty() {
        let header = read_header(&mut cursor).ok_or_else(|| {
            MailError::InvalidMail(format!("invalid header line: {:?}", cursor[0]))
        })?;
        headers.push(header);
        cursor = &cursor[1..];
    }

    Ok((headers, body))
}
