//! Per-kind content schemas and default field values.
//!
//! The two-segment path form (`<kind>.<field>`) validates its field name
//! against these schemas; bootstrap loads and `add_section` seed content
//! from the defaults. Nested updates addressed by section id are not
//! schema-checked: `content` stays an open map and per-field style
//! sub-objects are opaque to this layer.

use serde_json::{json, Map, Value};

use crate::kind::SectionKind;

/// Known content fields for a section kind.
pub fn known_fields(kind: SectionKind) -> &'static [&'static str] {
    match kind {
        SectionKind::Hero => &["title", "subtitle", "ctaLabel", "ctaLink", "backgroundImage"],
        SectionKind::About => &["heading", "body", "image"],
        SectionKind::Services => &["heading", "items"],
        SectionKind::Gallery => &["heading", "images"],
        SectionKind::Testimonials => &["heading", "quotes"],
        SectionKind::Contact => &["heading", "email", "phone", "address"],
    }
}

/// Check whether `field` belongs to the kind's schema.
pub fn is_known_field(kind: SectionKind, field: &str) -> bool {
    known_fields(kind).contains(&field)
}

/// Default content map for a freshly created section of `kind`.
pub fn default_content(kind: SectionKind) -> Map<String, Value> {
    let mut content = Map::new();
    for field in known_fields(kind) {
        content.insert((*field).to_string(), default_field_value(kind, field));
    }
    content
}

fn default_field_value(kind: SectionKind, field: &str) -> Value {
    match (kind, field) {
        (SectionKind::Hero, "title") => json!("Welcome"),
        (SectionKind::Hero, "ctaLabel") => json!("Get in touch"),
        (SectionKind::Hero, "ctaLink") => json!("#contact"),
        (SectionKind::About, "heading") => json!("About us"),
        (SectionKind::Services, "heading") => json!("Our services"),
        (SectionKind::Gallery, "heading") => json!("Gallery"),
        (SectionKind::Testimonials, "heading") => json!("What our clients say"),
        (SectionKind::Contact, "heading") => json!("Contact"),
        (SectionKind::Services, "items")
        | (SectionKind::Gallery, "images")
        | (SectionKind::Testimonials, "quotes") => json!([]),
        _ => json!(""),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_cover_every_known_field() {
        for kind in SectionKind::CANONICAL_ORDER {
            let content = default_content(kind);
            for field in known_fields(kind) {
                assert!(content.contains_key(*field), "{} missing {}", kind, field);
            }
            assert_eq!(content.len(), known_fields(kind).len());
        }
    }

    #[test]
    fn test_field_membership() {
        assert!(is_known_field(SectionKind::Hero, "title"));
        assert!(!is_known_field(SectionKind::Hero, "quotes"));
        assert!(is_known_field(SectionKind::Testimonials, "quotes"));
    }

    #[test]
    fn test_collection_fields_default_to_empty_arrays() {
        let services = default_content(SectionKind::Services);
        assert_eq!(services["items"], json!([]));
        let gallery = default_content(SectionKind::Gallery);
        assert_eq!(gallery["images"], json!([]));
    }
}
