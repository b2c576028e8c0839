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

use base64::{engine::general_purpose::STANDARD, Engine};

/// Characters forcing a display name to be quoted.
/// <https://www.rfc-editor.org/rfc/rfc5322#section-3.2.3>
const SPECIALS: &[char] = &[
    '(', ')', '<', '>', '[', ']', ':', ';', '@', '\\', ',', '.', '"',
];

/// Format a mailbox as `name <address>`.
///
/// The name is quoted when it contains special characters, and encoded as a
/// MIME encoded-word when it is not ASCII.
/// <https://www.rfc-editor.org/rfc/rfc2047#section-2>
#[must_use]
pub fn format_address(address: &str, name: &str) -> String {
    if name.is_empty() {
        address.to_string()
    } else if !name.is_ascii() {
        format!("=?UTF-8?b?{}?= <{address}>", STANDARD.encode(name))
    } else if name.contains(SPECIALS) {
        format!(
            "\"{}\" <{address}>",
            name.replace('\\', "\\\\").replace('"', "\\\"")
        )
    } else {
        format!("{name} <{address}>")
    }
}

/// Extract the addresses of a comma separated list of mailboxes.
///
/// Only the part between angle brackets is kept when there is one. Commas
/// inside a quoted display name do not split the list.
#[must_use]
pub fn extract_addresses(value: &str) -> Vec<String> {
    let mut mailboxes = vec![];
    let mut current = String::new();
    let mut quoted = false;
    let mut escaped = false;

    for c in value.chars() {
        match c {
            _ if escaped => escaped = false,
            '\\' if quoted => escaped = true,
            '"' => quoted = !quoted,
            ',' if !quoted => {
                mailboxes.push(std::mem::take(&mut current));
                continue;
            }
            _ => {}
        }
        current.push(c);
    }
    mailboxes.push(current);

    mailboxes
        .iter()
        .filter_map(|mailbox| {
            let mailbox = mailbox.trim();
            let address = match (mailbox.rfind('<'), mailbox.rfind('>')) {
                (Some(start), Some(end)) if start < end => mailbox[start + 1..end].trim(),
                _ => mailbox,
            };
            (!address.is_empty()).then(|| address.to_string())
        })
        .collect()
}
