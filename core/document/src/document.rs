//! In-memory content document model.
//!
//! A document is the single editable page of a site: a business name plus an
//! ordered list of sections. Section `order` fields always form the dense
//! zero-based sequence matching list position; every structural operation
//! renumbers.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

use sitecanvas_common::{Error, Result};

use crate::kind::SectionKind;
use crate::path::{DocumentField, DocumentPath};
use crate::schema;

/// Variant assigned when the caller does not pick one.
pub const DEFAULT_VARIANT: &str = "default";

/// A single page section.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Section {
    /// Unique id, stable for the lifetime of the session.
    pub id: String,
    /// Section kind. Serialized as `type` on the wire.
    #[serde(rename = "type")]
    pub kind: SectionKind,
    /// Visual template selector. Opaque to this layer.
    pub variant: String,
    /// Position index; equals the section's list position at all times.
    pub order: u32,
    pub visible: bool,
    /// Open field map. Value shapes are unconstrained.
    pub content: Map<String, Value>,
}

impl Section {
    /// Create a section with schema defaults and a fresh unique id.
    pub fn new(kind: SectionKind, variant: impl Into<String>) -> Self {
        Self {
            id: fresh_section_id(kind),
            kind,
            variant: variant.into(),
            order: 0,
            visible: true,
            content: schema::default_content(kind),
        }
    }
}

/// Generate a fresh section id. Never collides with the deterministic ids
/// a bootstrap load hands out.
fn fresh_section_id(kind: SectionKind) -> String {
    format!("{}-{}", kind.as_str(), Uuid::new_v4())
}

/// Bootstrap input produced by the template wizard.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BootstrapDocument {
    #[serde(default)]
    pub business_name: Option<String>,
    /// Per-kind field values chosen during the wizard. This is the primary
    /// customization payload; loading fails without it.
    #[serde(default)]
    pub customization: Option<Map<String, Value>>,
    /// Per-kind variant selections.
    #[serde(default)]
    pub variants: Option<Map<String, Value>>,
}

/// The whole editable page.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContentDocument {
    pub business_name: String,
    pub sections: Vec<Section>,
}

impl ContentDocument {
    /// Create an empty document for a fresh session.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a document from a bootstrap payload.
    ///
    /// Sections are materialized in canonical kind order for each kind
    /// present in the customization payload, with deterministic ids
    /// (`<kind>-1`), merging bootstrap values over schema defaults.
    ///
    /// # Errors
    /// - `LoadFailure` if the bootstrap lacks its customization payload
    pub fn from_bootstrap(bootstrap: &BootstrapDocument) -> Result<Self> {
        let customization = bootstrap.customization.as_ref().ok_or_else(|| {
            Error::LoadFailure("bootstrap document has no customization payload".to_string())
        })?;

        let mut sections = Vec::new();
        for kind in SectionKind::CANONICAL_ORDER {
            let Some(values) = customization.get(kind.as_str()) else {
                continue;
            };

            let mut content = schema::default_content(kind);
            if let Value::Object(map) = values {
                for (field, value) in map {
                    content.insert(field.clone(), value.clone());
                }
            }

            let variant = bootstrap
                .variants
                .as_ref()
                .and_then(|variants| variants.get(kind.as_str()))
                .and_then(Value::as_str)
                .unwrap_or(DEFAULT_VARIANT)
                .to_string();

            sections.push(Section {
                id: kind.bootstrap_id(),
                kind,
                variant,
                order: 0,
                visible: true,
                content,
            });
        }

        let mut document = Self {
            business_name: bootstrap.business_name.clone().unwrap_or_default(),
            sections,
        };
        document.renumber();
        Ok(document)
    }

    /// Mutate the document according to the path grammar.
    ///
    /// The two-segment form resolves the first section of its kind; when
    /// several sections share a kind the others are reachable only through
    /// the `sections.<id>` form.
    ///
    /// # Errors
    /// - `UnaddressablePath` when the path matches no grammar form or does
    ///   not resolve; the document is left unchanged
    /// - `InvalidInput` when a top-level field is given a value of the
    ///   wrong type
    pub fn set_path(&mut self, path: &str, value: Value) -> Result<()> {
        match DocumentPath::parse(path)? {
            DocumentPath::Field(DocumentField::BusinessName) => match value {
                Value::String(name) => {
                    self.business_name = name;
                    Ok(())
                }
                other => Err(Error::InvalidInput(format!(
                    "businessName expects a string, got {}",
                    json_type_name(&other)
                ))),
            },
            DocumentPath::SectionField { kind, field } => {
                let section = self.section_of_kind_mut(kind).ok_or_else(|| {
                    Error::UnaddressablePath(format!("{}: no section of kind {}", path, kind))
                })?;
                section.content.insert(field, value);
                Ok(())
            }
            DocumentPath::Nested { id, segments } => {
                let section = self.section_mut(&id).ok_or_else(|| {
                    Error::UnaddressablePath(format!("{}: no section with id {}", path, id))
                })?;
                set_nested(&mut section.content, &segments, value)
                    .map_err(|reason| Error::UnaddressablePath(format!("{}: {}", path, reason)))
            }
        }
    }

    /// Insert a new section of `kind` after `after_id`, or at the end when
    /// `after_id` is absent or unknown. Returns the new section's id.
    pub fn add_section(
        &mut self,
        kind: SectionKind,
        variant: impl Into<String>,
        after_id: Option<&str>,
    ) -> String {
        let section = Section::new(kind, variant);
        let id = section.id.clone();
        let index = after_id
            .and_then(|after| self.index_of(after).map(|index| index + 1))
            .unwrap_or(self.sections.len());
        self.sections.insert(index, section);
        self.renumber();
        id
    }

    /// Remove the section with `id`. No-op when absent.
    pub fn remove_section(&mut self, id: &str) -> bool {
        let before = self.sections.len();
        self.sections.retain(|section| section.id != id);
        let removed = self.sections.len() != before;
        if removed {
            self.renumber();
        }
        removed
    }

    /// Duplicate the section with `id`, inserting the copy right after it.
    ///
    /// The copy carries a fresh id, the source's kind/variant/visible, and
    /// a deep clone of `content`: no nested value is shared with the
    /// source. Returns the new id, or `None` when `id` does not exist.
    pub fn duplicate_section(&mut self, id: &str) -> Option<String> {
        let index = self.index_of(id)?;
        let source = &self.sections[index];
        let copy = Section {
            id: fresh_section_id(source.kind),
            kind: source.kind,
            variant: source.variant.clone(),
            order: 0,
            visible: source.visible,
            // Value::clone copies the whole JSON tree.
            content: source.content.clone(),
        };
        let copy_id = copy.id.clone();
        self.sections.insert(index + 1, copy);
        self.renumber();
        Some(copy_id)
    }

    /// Reorder sections to match the given id sequence. Unknown ids are
    /// ignored; sections not mentioned keep their relative order after the
    /// mentioned ones.
    pub fn reorder_sections(&mut self, ids: &[String]) {
        let mut reordered = Vec::with_capacity(self.sections.len());
        for id in ids {
            if let Some(index) = self.sections.iter().position(|section| &section.id == id) {
                reordered.push(self.sections.remove(index));
            }
        }
        reordered.append(&mut self.sections);
        self.sections = reordered;
        self.renumber();
    }

    /// Flip the `visible` flag of the section with `id`.
    pub fn toggle_visibility(&mut self, id: &str) -> bool {
        match self.section_mut(id) {
            Some(section) => {
                section.visible = !section.visible;
                true
            }
            None => false,
        }
    }

    /// First section of the given kind, if any.
    pub fn section_of_kind(&self, kind: SectionKind) -> Option<&Section> {
        self.sections.iter().find(|section| section.kind == kind)
    }

    fn section_of_kind_mut(&mut self, kind: SectionKind) -> Option<&mut Section> {
        self.sections
            .iter_mut()
            .find(|section| section.kind == kind)
    }

    /// Section by id, if any.
    pub fn section(&self, id: &str) -> Option<&Section> {
        self.sections.iter().find(|section| section.id == id)
    }

    fn section_mut(&mut self, id: &str) -> Option<&mut Section> {
        self.sections
            .iter_mut()
            .find(|section| section.id == id)
    }

    fn index_of(&self, id: &str) -> Option<usize> {
        self.sections.iter().position(|section| section.id == id)
    }

    /// Renumber `order` to the dense zero-based list position.
    fn renumber(&mut self) {
        for (index, section) in self.sections.iter_mut().enumerate() {
            section.order = index as u32;
        }
    }
}

/// Walk `segments` into a content map and replace the leaf.
///
/// Missing intermediate map keys are created as empty objects. Numeric
/// segments index arrays and are rejected out of range; walking through a
/// scalar is rejected. Rejections happen before anything is written.
fn set_nested(
    content: &mut Map<String, Value>,
    segments: &[String],
    value: Value,
) -> std::result::Result<(), String> {
    let Some((first, rest)) = segments.split_first() else {
        return Err("empty nested path".to_string());
    };

    if rest.is_empty() {
        content.insert(first.clone(), value);
        return Ok(());
    }

    let next = content
        .entry(first.clone())
        .or_insert_with(|| Value::Object(Map::new()));
    set_in_value(next, rest, value)
}

fn set_in_value(
    cursor: &mut Value,
    segments: &[String],
    value: Value,
) -> std::result::Result<(), String> {
    let Some((segment, rest)) = segments.split_first() else {
        return Err("empty nested path".to_string());
    };

    match cursor {
        Value::Object(map) => {
            if rest.is_empty() {
                map.insert(segment.clone(), value);
                Ok(())
            } else {
                let next = map
                    .entry(segment.clone())
                    .or_insert_with(|| Value::Object(Map::new()));
                set_in_value(next, rest, value)
            }
        }
        Value::Array(items) => {
            let index: usize = segment
                .parse()
                .map_err(|_| format!("'{}' is not an array index", segment))?;
            let len = items.len();
            let next = items
                .get_mut(index)
                .ok_or_else(|| format!("index {} out of bounds (len {})", index, len))?;
            if rest.is_empty() {
                *next = value;
                Ok(())
            } else {
                set_in_value(next, rest, value)
            }
        }
        _ => Err(format!("'{}' walks through a scalar value", segment)),
    }
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
