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
use std::collections::HashMap;

/// Maximum length of a header line before it gets folded.
/// <https://www.rfc-editor.org/rfc/rfc5322#section-2.1.1>
pub const FOLDING_WIDTH: usize = 78;

/// Header of an email.
/// <https://www.rfc-editor.org/rfc/rfc5322#section-2.2>
#[derive(Debug, Default, Clone, PartialEq, Eq, serde::Deserialize, serde::Serialize)]
pub struct Header {
    /// Field name, case preserved.
    pub name: String,
    /// Unfolded value, without the leading space and the trailing CRLF.
    ///
    /// A value already containing CRLF is considered folded by the caller
    /// and is written as is.
    pub value: String,
}

impl Header {
    /// Create a new header.
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }

    /// Does the header have this name, compared case-insensitively.
    #[must_use]
    pub fn is(&self, name: &str) -> bool {
        self.name.eq_ignore_ascii_case(name)
    }

    /// Check the header can be written without adding a line to the header
    /// section: the name is printable ASCII without colon, and the value only
    /// holds CR and LF as a fold, CRLF followed by a space or a tab.
    ///
    /// # Errors
    ///
    /// * [`MailError::InvalidHeader`]
    pub fn validate(&self) -> MailResult<()> {
        let name = !self.name.is_empty()
            && self
                .name
                .bytes()
                .all(|byte| byte.is_ascii_graphic() && byte != b':');

        let value = self.value.as_bytes();
        let folds = value.iter().enumerate().all(|(idx, byte)| match byte {
            b'\r' => value.get(idx + 1) == Some(&b'\n') && is_fold_continuation(value, idx + 2),
            b'\n' => idx > 0 && value[idx - 1] == b'\r' && is_fold_continuation(value, idx + 1),
            _ => true,
        });

        if name && folds {
            Ok(())
        } else {
            Err(MailError::InvalidHeader {
                name: self.name.clone(),
            })
        }
    }
}

fn is_fold_continuation(value: &[u8], idx: usize) -> bool {
    value.get(idx).copied().map_or(false, is_wsp)
}

const fn is_wsp(byte: u8) -> bool {
    byte == b' ' || byte == b'\t'
}

/// Position of the next folding point of `rest`, knowing the current line
/// already holds `line_len` characters.
///
/// A fold is always placed before a whitespace that follows a visible
/// character, so that a token is never split and a continuation line is never
/// made of whitespace only.
fn next_fold(rest: &str, line_len: usize) -> Option<usize> {
    let bytes = rest.as_bytes();
    let candidates = (1..bytes.len()).filter(|i| is_wsp(bytes[*i]) && !is_wsp(bytes[i - 1]));

    let room = FOLDING_WIDTH.saturating_sub(line_len);
    let mut fitting = None;
    let mut first = None;
    for i in candidates {
        first.get_or_insert(i);
        if i > room {
            break;
        }
        fitting = Some(i);
    }
    fitting.or(first)
}

impl std::fmt::Display for Header {
    /// Write the header as it appears on the wire, folded and terminated by CRLF.
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.name)?;
        f.write_str(":")?;

        if self.value.is_empty() {
            return f.write_str("\r\n");
        }
        f.write_str(" ")?;

        if self.value.contains("\r\n") {
            f.write_str(&self.value)?;
            return f.write_str("\r\n");
        }

        let mut line_len = self.name.len() + 2;
        let mut rest = self.value.as_str();
        while line_len + rest.len() > FOLDING_WIDTH {
            let Some(idx) = next_fold(rest, line_len) else {
                break;
            };
            f.write_str(&rest[..idx])?;
            f.write_str("\r\n")?;
            rest = &rest[idx..];
            line_len = 0;
        }
        f.write_str(rest)?;
        f.write_str("\r\n")
    }
}

/// List of top-level headers.
///
/// Header ordering is mandatory, so the headers live in a `Vec`, with an
/// index from lowercased name to positions for case-insensitive lookups.
/// <https://www.rfc-editor.org/rfc/rfc5322#section-3.6>
#[derive(Debug, Default, Clone, PartialEq, Eq, serde::Deserialize, serde::Serialize)]
#[serde(from = "Vec<Header>", into = "Vec<Header>")]
pub struct Headers {
    inner: Vec<Header>,
    index: HashMap<String, Vec<usize>>,
}

impl Headers {
    /// Create an empty list.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn reindex(&mut self) {
        self.index.clear();
        for (position, header) in self.inner.iter().enumerate() {
            self.index
                .entry(header.name.to_ascii_lowercase())
                .or_default()
                .push(position);
        }
    }

    /// Positions of the headers named `name`, top to bottom.
    #[must_use]
    pub fn positions(&self, name: &str) -> &[usize] {
        self.index
            .get(&name.to_ascii_lowercase())
            .map_or(&[][..], Vec::as_slice)
    }

    /// Append a header at the end of the list.
    pub fn push(&mut self, header: Header) {
        self.index
            .entry(header.name.to_ascii_lowercase())
            .or_default()
            .push(self.inner.len());
        self.inner.push(header);
    }

    /// Insert a header at the top of the list.
    pub fn prepend(&mut self, header: Header) {
        self.inner.insert(0, header);
        self.reindex();
    }

    /// Replace every header named `header.name` by `header`, keeping the
    /// position of the first occurrence. Append it if there is none.
    pub fn set(&mut self, header: Header) {
        let Some(&first) = self.positions(&header.name).first() else {
            self.push(header);
            return;
        };

        let mut position = 0;
        self.inner.retain(|i| {
            let keep = position == first || !i.is(&header.name);
            position += 1;
            keep
        });
        self.inner[first] = header;
        self.reindex();
    }

    /// Get the first header named `name`.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Header> {
        self.positions(name).first().map(|i| &self.inner[*i])
    }

    /// Get the last header named `name`.
    #[must_use]
    pub fn get_rev(&self, name: &str) -> Option<&Header> {
        self.positions(name).last().map(|i| &self.inner[*i])
    }

    /// Every header named `name`, top to bottom.
    pub fn get_all<'a>(&'a self, name: &str) -> impl Iterator<Item = &'a Header> + 'a {
        self.positions(name).iter().map(|i| &self.inner[*i])
    }

    /// Number of headers named `name`.
    #[must_use]
    pub fn count(&self, name: &str) -> usize {
        self.positions(name).len()
    }
}

impl From<Vec<Header>> for Headers {
    fn from(inner: Vec<Header>) -> Self {
        let mut headers = Self {
            inner,
            index: HashMap::new(),
        };
        headers.reindex();
        headers
    }
}

impl From<Headers> for Vec<Header> {
    fn from(value: Headers) -> Self {
        value.inner
    }
}

impl FromIterator<Header> for Headers {
    fn from_iter<T: IntoIterator<Item = Header>>(iter: T) -> Self {
        iter.into_iter().collect::<Vec<_>>().into()
    }
}

impl std::ops::Deref for Headers {
    type Target = [Header];

    fn deref(&self) -> &Self::Target {
        &self.inner
    }
}

impl std::fmt::Display for Headers {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for header in &self.inner {
            write!(f, "{header}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn sample() -> Headers {
        vec![
            Header::new("Received", "from a"),
            Header::new("From", "john@doe.com"),
            Header::new("received", "from b"),
        ]
        .into()
    }

    #[test]
    fn lookup_is_case_insensitive() {
        let headers = sample();

        assert_eq!(headers.get("RECEIVED").unwrap().value, "from a");
        assert_eq!(headers.get_rev("Received").unwrap().value, "from b");
        assert_eq!(headers.count("received"), 2);
        assert_eq!(headers.positions("from"), &[1]);
        assert!(headers.get("To").is_none());
    }

    #[test]
    fn prepend_shifts_the_index() {
        let mut headers = sample();
        headers.prepend(Header::new("DKIM-Signature", "v=1"));

        assert_eq!(headers[0].name, "DKIM-Signature");
        assert_eq!(headers.positions("received"), &[1, 3]);
        assert_eq!(headers.get("from").unwrap().value, "john@doe.com");
    }

    #[test]
    fn set_replaces_all_occurrences() {
        let mut headers = sample();
        headers.set(Header::new("Received", "from c"));

        assert_eq!(
            headers.iter().map(ToString::to_string).collect::<String>(),
            "Received: from c\r\nFrom: john@doe.com\r\n"
        );

        headers.set(Header::new("Subject", "hello"));
        assert_eq!(headers.positions("subject"), &[2]);
    }

    #[test]
    fn serde_keeps_the_index() {
        let headers = sample();
        let json = serde_json::to_string(&headers).unwrap();
        let back: Headers = serde_json::from_str(&json).unwrap();

        assert_eq!(back, headers);
        assert_eq!(back.count("received"), 2);
    }

    #[test]
    fn short_header_is_not_folded() {
        assert_eq!(
            Header::new("Subject", "hello world").to_string(),
            "Subject: hello world\r\n"
        );
        assert_eq!(Header::new("X-Empty", "").to_string(), "X-Empty:\r\n");
    }

    #[test]
    fn long_header_is_folded_at_whitespace() {
        let value = "word ".repeat(30);
        let value = value.trim_end();
        let folded = Header::new("Subject", value).to_string();

        for line in folded.split_terminator("\r\n") {
            assert!(line.len() <= FOLDING_WIDTH, "{line:?} is too long");
        }
        assert!(folded.lines().skip(1).all(|l| l.starts_with(' ')));
        assert_eq!(
            folded.replace("\r\n", ""),
            format!("Subject: {value}"),
            "unfolding gives the original value back"
        );
    }

    #[test]
    fn unbreakable_token_is_kept_whole() {
        let token = "a".repeat(120);
        let folded = Header::new("X-Token", format!("{token} b")).to_string();

        assert_eq!(folded, format!("X-Token: {token}\r\n b\r\n"));
    }

    #[rstest::rstest]
    #[case::plain("Subject", "hello world")]
    #[case::folded("DKIM-Signature", "v=1;\r\n\td=example.com;\r\n b=")]
    #[case::empty("X-Empty", "")]
    fn valid_header(#[case] name: &str, #[case] value: &str) {
        assert!(Header::new(name, value).validate().is_ok());
    }

    #[rstest::rstest]
    #[case::injected_header("Subject", "hi\r\nBcc: leaked@example.com")]
    #[case::bare_lf("Subject", "hi\nthere")]
    #[case::bare_cr("Subject", "hi\rthere")]
    #[case::trailing_crlf("Subject", "hi\r\n")]
    #[case::empty_continuation("Subject", "hi\r\n\r\n there")]
    #[case::name_with_colon("X-A:B", "value")]
    #[case::name_with_crlf("X-A\r\nBcc", "value")]
    #[case::empty_name("", "value")]
    fn invalid_header(#[case] name: &str, #[case] value: &str) {
        assert!(matches!(
            Header::new(name, value).validate(),
            Err(MailError::InvalidHeader { name: offending }) if offending == name
        ));
    }

    #[test]
    fn prefolded_value_is_written_as_is() {
        assert_eq!(
            Header::new("X-Folded", "a;\r\n\tb").to_string(),
            "X-Folded: a;\r\n\tb\r\n"
        );
    }
}
