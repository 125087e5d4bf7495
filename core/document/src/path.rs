//! Path grammar for addressing document fields.
//!
//! Three forms are accepted:
//! 1. `businessName` — a top-level document field.
//! 2. `<kind>.<field>` — a schema field on the first section of `kind`.
//! 3. `sections.<id>.content.<seg>[.<seg>…]` — a nested update inside a
//!    section's content, addressed by section id.
//!
//! Anything else is rejected as [`Error::UnaddressablePath`].

use sitecanvas_common::{Error, Result};

use crate::kind::SectionKind;
use crate::schema;

/// Top-level document fields addressable by the single-segment form.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentField {
    BusinessName,
}

/// A parsed document path.
#[derive(Debug, Clone, PartialEq)]
pub enum DocumentPath {
    /// Form 1: a top-level document field.
    Field(DocumentField),
    /// Form 2: `<kind>.<field>`, resolving to the first section of `kind`.
    SectionField { kind: SectionKind, field: String },
    /// Form 3: `sections.<id>.content.<seg>…`.
    Nested { id: String, segments: Vec<String> },
}

impl DocumentPath {
    /// Parse a path string against the grammar.
    ///
    /// # Errors
    /// - `UnaddressablePath` for anything outside the three forms,
    ///   including unknown kinds and fields outside the kind's schema.
    pub fn parse(path: &str) -> Result<Self> {
        let tokens: Vec<&str> = path.split('.').collect();
        if tokens.iter().any(|token| token.is_empty()) {
            return Err(unaddressable(path, "empty path segment"));
        }

        match tokens.as_slice() {
            ["businessName"] => Ok(Self::Field(DocumentField::BusinessName)),
            ["sections", id, "content", rest @ ..] if !rest.is_empty() => Ok(Self::Nested {
                id: (*id).to_string(),
                segments: rest.iter().map(|segment| (*segment).to_string()).collect(),
            }),
            [kind_name, field] => {
                let kind = SectionKind::parse(kind_name)
                    .ok_or_else(|| unaddressable(path, "unknown section kind"))?;
                if !schema::is_known_field(kind, field) {
                    return Err(unaddressable(path, "field not in section schema"));
                }
                Ok(Self::SectionField {
                    kind,
                    field: (*field).to_string(),
                })
            }
            _ => Err(unaddressable(path, "path matches no grammar form")),
        }
    }
}

fn unaddressable(path: &str, reason: &str) -> Error {
    Error::UnaddressablePath(format!("{}: {}", path, reason))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_top_level_field() {
        let path = DocumentPath::parse("businessName").unwrap();
        assert_eq!(path, DocumentPath::Field(DocumentField::BusinessName));
    }

    #[test]
    fn test_parse_section_field() {
        let path = DocumentPath::parse("hero.title").unwrap();
        assert_eq!(
            path,
            DocumentPath::SectionField {
                kind: SectionKind::Hero,
                field: "title".to_string(),
            }
        );
    }

    #[test]
    fn test_parse_nested() {
        let path = DocumentPath::parse("sections.hero-1.content.styles.title.color").unwrap();
        assert_eq!(
            path,
            DocumentPath::Nested {
                id: "hero-1".to_string(),
                segments: vec![
                    "styles".to_string(),
                    "title".to_string(),
                    "color".to_string(),
                ],
            }
        );
    }

    #[test]
    fn test_unknown_kind_rejected() {
        assert!(DocumentPath::parse("carousel.title").is_err());
    }

    #[test]
    fn test_field_outside_schema_rejected() {
        assert!(DocumentPath::parse("hero.quotes").is_err());
    }

    #[test]
    fn test_malformed_paths_rejected() {
        for path in [
            "",
            ".",
            "hero.",
            ".title",
            "unknownTopLevel",
            "sections.hero-1",
            "sections.hero-1.content",
            "sections.hero-1.title.color",
            "hero.title.extra.depth",
        ] {
            let result = DocumentPath::parse(path);
            assert!(result.is_err(), "expected rejection for {:?}", path);
            assert!(matches!(
                result.unwrap_err(),
                Error::UnaddressablePath(_)
            ));
        }
    }
}
