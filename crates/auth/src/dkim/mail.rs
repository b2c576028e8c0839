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

/// The representation of a header for a DKIM algorithm.
pub trait Header {
    /// Get the name of the header.
    fn field_name(&self) -> String;

    /// Get the *complete* header, name and value and final CRLF, exactly as written on the wire.
    fn get(&self) -> String;
}

/// The representation of an email for a DKIM algorithm.
pub trait Mail {
    /// The type of the header, respecting the constraints of the trait [`Header`].
    type H: Header;

    /// Get the body of the email, as written on the wire.
    fn get_body(&self) -> &[u8];

    /// Get the headers of the email, in order.
    fn get_headers(&self) -> Vec<Self::H>;
}
