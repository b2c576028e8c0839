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

use crate::dkim::{Canonicalization, CanonicalizationAlgorithm, HashAlgorithm};
use pretty_assertions::assert_eq;

const HEADERS: [&str; 2] = ["A: X\r\n", "B : Y\t\r\n\tZ  \r\n"];
const BODY: &str = " C \r\nD \t E\r\n\r\n\r\n";

#[rstest::rstest]
#[case::simple(
    CanonicalizationAlgorithm::Simple,
    "",
    "frcCV1k9oG9oKj3dpUqdJg1PxRT2RSN/XKdLCPjaYaY="
)]
#[case::relaxed(
    CanonicalizationAlgorithm::Relaxed,
    "",
    "47DEQpj8HBSa+/TImW+5JCeuQeRkm5NMpJWZG3hSuFU="
)]
#[case::simple_only_empty_lines(
    CanonicalizationAlgorithm::Simple,
    "\r\n\r\n\r\n",
    "frcCV1k9oG9oKj3dpUqdJg1PxRT2RSN/XKdLCPjaYaY="
)]
#[case::relaxed_only_whitespaces(
    CanonicalizationAlgorithm::Relaxed,
    " \r\n\t\r\n",
    "47DEQpj8HBSa+/TImW+5JCeuQeRkm5NMpJWZG3hSuFU="
)]
fn empty_body(
    #[case] algorithm: CanonicalizationAlgorithm,
    #[case] body: &str,
    #[case] expected: &str,
) {
    assert_eq!(
        base64::Engine::encode(
            &base64::engine::general_purpose::STANDARD,
            HashAlgorithm::Sha256.hash(algorithm.canonicalize_body(body.as_bytes()))
        ),
        expected
    );
}

#[test]
fn empty_body_bytes() {
    assert_eq!(CanonicalizationAlgorithm::Simple.canonicalize_body(b""), b"\r\n");
    assert_eq!(CanonicalizationAlgorithm::Relaxed.canonicalize_body(b""), b"");
}

// <https://www.rfc-editor.org/rfc/rfc6376#section-3.4.5>
#[test]
fn rfc_example_relaxed() {
    let headers = HEADERS.map(str::to_string);

    assert_eq!(
        CanonicalizationAlgorithm::Relaxed.canonicalize_headers(&headers),
        concat!("a:X\r\n", "b:Y Z\r\n")
    );
    assert_eq!(
        CanonicalizationAlgorithm::Relaxed.canonicalize_body(BODY.as_bytes()),
        b" C\r\nD E\r\n"
    );
}

#[test]
fn rfc_example_simple() {
    let headers = HEADERS.map(str::to_string);

    assert_eq!(
        CanonicalizationAlgorithm::Simple.canonicalize_headers(&headers),
        concat!("A: X\r\n", "B : Y\t\r\n", "\tZ  \r\n")
    );
    assert_eq!(
        CanonicalizationAlgorithm::Simple.canonicalize_body(BODY.as_bytes()),
        b" C \r\nD \t E\r\n"
    );
}

#[rstest::rstest]
#[case::bare_lf(CanonicalizationAlgorithm::Simple, "a\nb\n\n", "a\r\nb\r\n")]
#[case::missing_final_crlf(CanonicalizationAlgorithm::Simple, "a\r\nb", "a\r\nb\r\n")]
#[case::inner_empty_lines(
    CanonicalizationAlgorithm::Relaxed,
    " C \r\nD \t E\r\n\r\n\r\nok",
    " C\r\nD E\r\n\r\n\r\nok\r\n"
)]
#[case::trailing_whitespace(CanonicalizationAlgorithm::Relaxed, "a \t\r\n \r\n", "a\r\n")]
fn canonical_body(
    #[case] algorithm: CanonicalizationAlgorithm,
    #[case] body: &str,
    #[case] expected: &str,
) {
    assert_eq!(
        String::from_utf8(algorithm.canonicalize_body(body.as_bytes())).unwrap(),
        expected
    );
}

#[rstest::rstest]
#[case("Test message")]
#[case("line 1\nline 2\r\n\r\n")]
#[case("")]
#[case(" \t leading\r\ntrailing \t\r\n")]
fn simple_body_is_idempotent(#[case] body: &str) {
    let once = CanonicalizationAlgorithm::Simple.canonicalize_body(body.as_bytes());
    let twice = CanonicalizationAlgorithm::Simple.canonicalize_body(&once);

    assert_eq!(once, twice);
}

#[test]
fn folded_header() {
    let header = "Subject: a very\r\n long\r\n\t subject  \r\n";

    assert_eq!(
        CanonicalizationAlgorithm::Relaxed.canonicalize_header(header),
        "subject:a very long subject\r\n"
    );
    assert_eq!(
        CanonicalizationAlgorithm::Simple.canonicalize_header(header),
        header
    );
}

#[rstest::rstest]
#[case("simple/simple", CanonicalizationAlgorithm::Simple, CanonicalizationAlgorithm::Simple)]
#[case("relaxed/simple", CanonicalizationAlgorithm::Relaxed, CanonicalizationAlgorithm::Simple)]
#[case("relaxed/relaxed", CanonicalizationAlgorithm::Relaxed, CanonicalizationAlgorithm::Relaxed)]
#[case("relaxed", CanonicalizationAlgorithm::Relaxed, CanonicalizationAlgorithm::Simple)]
fn parse(
    #[case] input: &str,
    #[case] header: CanonicalizationAlgorithm,
    #[case] body: CanonicalizationAlgorithm,
) {
    let canonicalization = input.parse::<Canonicalization>().unwrap();

    assert_eq!(canonicalization, Canonicalization::new(header, body));
    assert_eq!(
        canonicalization.to_string(),
        format!("{header}/{body}"),
        "always displayed with both algorithms"
    );
}

#[test]
fn parse_invalid() {
    assert!("nofws".parse::<Canonicalization>().is_err());
    assert!("relaxed/".parse::<Canonicalization>().is_err());
}
