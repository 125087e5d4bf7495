//! Section kinds and their canonical ordering.

use serde::{Deserialize, Serialize};
use std::fmt;

/// The closed set of page section kinds the editor understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SectionKind {
    Hero,
    About,
    Services,
    Gallery,
    Testimonials,
    Contact,
}

impl SectionKind {
    /// Canonical ordering used when materializing a bootstrap document.
    pub const CANONICAL_ORDER: [SectionKind; 6] = [
        SectionKind::Hero,
        SectionKind::About,
        SectionKind::Services,
        SectionKind::Gallery,
        SectionKind::Testimonials,
        SectionKind::Contact,
    ];

    /// Wire name of the kind.
    pub fn as_str(&self) -> &'static str {
        match self {
            SectionKind::Hero => "hero",
            SectionKind::About => "about",
            SectionKind::Services => "services",
            SectionKind::Gallery => "gallery",
            SectionKind::Testimonials => "testimonials",
            SectionKind::Contact => "contact",
        }
    }

    /// Parse a wire name into a kind.
    pub fn parse(name: &str) -> Option<Self> {
        Self::CANONICAL_ORDER
            .iter()
            .copied()
            .find(|kind| kind.as_str() == name)
    }

    /// Deterministic id assigned to this kind's section by a bootstrap
    /// load. Fresh sections added later never reuse it.
    pub fn bootstrap_id(&self) -> String {
        format!("{}-1", self.as_str())
    }
}

impl fmt::Display for SectionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
