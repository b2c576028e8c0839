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

use super::headers::Header;
use crate::{
    errors::{MailError, MailResult},
    mime::{Multipart, Part},
};

/// Body of an email, a tree of MIME parts.
#[derive(Debug, Default, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum Body {
    /// No body at all.
    #[default]
    Empty,
    /// A single part.
    Leaf(Part),
    /// A container of parts.
    Multipart(Multipart),
}

/// Does a line of `content` start with the delimiter of `boundary`.
/// <https://www.rfc-editor.org/rfc/rfc2046#section-5.1.1>
fn has_delimiter(content: &[u8], boundary: &[u8]) -> bool {
    content.split(|byte| *byte == b'\n').any(|line| {
        line.strip_prefix(b"--")
            .map_or(false, |rest| rest.starts_with(boundary))
    })
}

impl Body {
    /// Headers describing the content of this node.
    #[must_use]
    pub fn mime_headers(&self) -> Vec<Header> {
        match self {
            Self::Empty => vec![],
            Self::Leaf(part) => part.mime_headers(),
            Self::Multipart(multipart) => {
                vec![Header::new("Content-Type", multipart.content_type())]
            }
        }
    }

    /// Check that every boundary of the tree is valid and unique.
    ///
    /// # Errors
    ///
    /// * [`MailError::InvalidBoundary`]
    /// * [`MailError::DuplicateBoundary`]
    pub fn validate(&self) -> MailResult<()> {
        fn walk<'a>(
            body: &'a Body,
            seen: &mut std::collections::HashSet<&'a str>,
        ) -> MailResult<()> {
            let Body::Multipart(multipart) = body else {
                return Ok(());
            };
            if !multipart.has_valid_boundary() {
                return Err(MailError::InvalidBoundary {
                    boundary: multipart.boundary.clone(),
                });
            }
            if !seen.insert(&multipart.boundary) {
                return Err(MailError::DuplicateBoundary {
                    boundary: multipart.boundary.clone(),
                });
            }
            multipart.parts.iter().try_for_each(|part| walk(part, seen))
        }

        walk(self, &mut std::collections::HashSet::new())
    }

    /// Produce the body as written on the wire.
    ///
    /// # Errors
    ///
    /// * the boundaries of the tree are not valid, see [`Body::validate`]
    /// * [`MailError::BoundaryCollision`]
    pub fn to_bytes(&self) -> MailResult<Vec<u8>> {
        self.validate()?;
        self.render()
    }

    fn render(&self) -> MailResult<Vec<u8>> {
        match self {
            Self::Empty => Ok(vec![]),
            Self::Leaf(part) => Ok(part.encoded()),
            Self::Multipart(multipart) => {
                let boundary = multipart.boundary.as_bytes();
                let mut out = Vec::new();

                for part in &multipart.parts {
                    let mut child = part
                        .mime_headers()
                        .iter()
                        .map(ToString::to_string)
                        .collect::<String>()
                        .into_bytes();
                    child.extend_from_slice(b"\r\n");
                    child.extend(part.render()?);

                    if has_delimiter(&child, boundary) {
                        return Err(MailError::BoundaryCollision {
                            boundary: multipart.boundary.clone(),
                        });
                    }

                    out.extend_from_slice(b"--");
                    out.extend_from_slice(boundary);
                    out.extend_from_slice(b"\r\n");
                    out.extend(child);
                    out.extend_from_slice(b"\r\n");
                }

                out.extend_from_slice(b"--");
                out.extend_from_slice(boundary);
                out.extend_from_slice(b"--\r\n");
                Ok(out)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mime::{encoding::TransferEncoding, MultipartKind};
    use pretty_assertions::assert_eq;

    fn text(content: &str) -> Body {
        Body::Leaf(Part::text(
            "text/plain",
            "UTF-8",
            TransferEncoding::SevenBit,
            content,
        ))
    }

    #[test]
    fn leaf_is_encoded() {
        assert_eq!(text("a\nb").to_bytes().unwrap(), b"a\r\nb");
        assert_eq!(Body::Empty.to_bytes().unwrap(), b"");
    }

    #[test]
    fn multipart_delimiters() {
        let body = Body::Multipart(
            Multipart::new(MultipartKind::Alternative, "BOUNDARY")
                .with_part(text("one"))
                .with_part(text("two")),
        );

        assert_eq!(
            String::from_utf8(body.to_bytes().unwrap()).unwrap(),
            concat!(
                "--BOUNDARY\r\n",
                "Content-Type: text/plain; charset=UTF-8\r\n",
                "Content-Transfer-Encoding: 7bit\r\n",
                "\r\n",
                "one\r\n",
                "--BOUNDARY\r\n",
                "Content-Type: text/plain; charset=UTF-8\r\n",
                "Content-Transfer-Encoding: 7bit\r\n",
                "\r\n",
                "two\r\n",
                "--BOUNDARY--\r\n",
            )
        );
    }

    #[test]
    fn nested_multipart() {
        let body = Body::Multipart(
            Multipart::new(MultipartKind::Mixed, "outer")
                .with_part(Body::Multipart(
                    Multipart::new(MultipartKind::Alternative, "inner").with_part(text("x")),
                ))
                .with_part(text("y")),
        );

        assert_eq!(
            String::from_utf8(body.to_bytes().unwrap()).unwrap(),
            concat!(
                "--outer\r\n",
                "Content-Type: multipart/alternative; boundary=inner\r\n",
                "\r\n",
                "--inner\r\n",
                "Content-Type: text/plain; charset=UTF-8\r\n",
                "Content-Transfer-Encoding: 7bit\r\n",
                "\r\n",
                "x\r\n",
                "--inner--\r\n",
                "\r\n",
                "--outer\r\n",
                "Content-Type: text/plain; charset=UTF-8\r\n",
                "Content-Transfer-Encoding: 7bit\r\n",
                "\r\n",
                "y\r\n",
                "--outer--\r\n",
            )
        );
    }

    #[test]
    fn boundary_collision_is_fatal() {
        let body = Body::Multipart(
            Multipart::new(MultipartKind::Mixed, "frontier").with_part(text("--frontier\r\n")),
        );

        assert!(matches!(
            body.to_bytes(),
            Err(MailError::BoundaryCollision { boundary }) if boundary == "frontier"
        ));
    }

    #[test]
    fn boundary_inside_a_line_is_allowed() {
        let body = Body::Multipart(
            Multipart::new(MultipartKind::Mixed, "text")
                .with_part(text("plain text, not --text at the start"))
                .with_part(Body::Multipart(
                    Multipart::new(MultipartKind::Alternative, "part").with_part(text("x")),
                )),
        );

        let bytes = String::from_utf8(body.to_bytes().unwrap()).unwrap();
        assert!(bytes.starts_with("--text\r\nContent-Type: text/plain;"));
        assert!(bytes.ends_with("--text--\r\n"));
    }

    #[test]
    fn nested_boundary_sharing_a_prefix_collides() {
        let body = Body::Multipart(Multipart::new(MultipartKind::Mixed, "abc").with_part(
            Body::Multipart(Multipart::new(MultipartKind::Alternative, "abcd").with_part(text("x"))),
        ));

        assert!(matches!(
            body.to_bytes(),
            Err(MailError::BoundaryCollision { .. })
        ));
    }

    #[test]
    fn duplicate_boundary_is_fatal() {
        let body = Body::Multipart(
            Multipart::new(MultipartKind::Mixed, "same").with_part(Body::Multipart(
                Multipart::new(MultipartKind::Alternative, "same").with_part(text("x")),
            )),
        );

        assert!(matches!(
            body.validate(),
            Err(MailError::DuplicateBoundary { boundary }) if boundary == "same"
        ));
    }

    #[test]
    fn invalid_boundary_is_fatal() {
        let body = Body::Multipart(Multipart::new(MultipartKind::Mixed, ""));

        assert!(matches!(
            body.to_bytes(),
            Err(MailError::InvalidBoundary { .. })
        ));
    }
}
