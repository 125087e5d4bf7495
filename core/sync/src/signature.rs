//! Canonical payload signatures.

use sitecanvas_client::SavePayload;
use sitecanvas_common::{Error, Result};

/// Canonical serialization of a save payload, used to skip no-op writes.
///
/// `serde_json`'s default map representation keeps object keys sorted, so
/// deep-equal payloads always produce identical signatures regardless of
/// field insertion order. The send-time `updatedAt` stamp is not part of
/// the payload and therefore never perturbs the signature.
pub fn payload_signature(payload: &SavePayload) -> Result<String> {
    serde_json::to_string(payload).map_err(|e| Error::Serialization(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use sitecanvas_client::SiteProfile;
    use sitecanvas_common::SiteId;
    use sitecanvas_document::{BootstrapDocument, ContentDocument};

    fn profile() -> SiteProfile {
        SiteProfile {
            site_id: SiteId::new("acme").unwrap(),
            site_name: "Acme Plumbing".to_string(),
            template: "trades".to_string(),
        }
    }

    fn bootstrapped() -> ContentDocument {
        let bootstrap: BootstrapDocument = serde_json::from_value(json!({
            "businessName": "Acme Plumbing",
            "customization": { "hero": { "title": "Fast fixes" } }
        }))
        .unwrap();
        ContentDocument::from_bootstrap(&bootstrap).unwrap()
    }

    #[test]
    fn test_equal_payloads_share_a_signature() {
        let first = SavePayload::new(profile(), bootstrapped());
        let second = SavePayload::new(profile(), bootstrapped());
        assert_eq!(
            payload_signature(&first).unwrap(),
            payload_signature(&second).unwrap()
        );
    }

    #[test]
    fn test_different_content_differs() {
        let first = SavePayload::new(profile(), bootstrapped());
        let mut changed = bootstrapped();
        changed.set_path("hero.title", json!("Slow fixes")).unwrap();
        let second = SavePayload::new(profile(), changed);
        assert_ne!(
            payload_signature(&first).unwrap(),
            payload_signature(&second).unwrap()
        );
    }

    #[test]
    fn test_signature_ignores_field_insertion_order() {
        let mut first = bootstrapped();
        first
            .set_path("sections.hero-1.content.styles.align", json!("left"))
            .unwrap();
        first
            .set_path("sections.hero-1.content.styles.color", json!("#fff"))
            .unwrap();

        let mut second = bootstrapped();
        second
            .set_path("sections.hero-1.content.styles.color", json!("#fff"))
            .unwrap();
        second
            .set_path("sections.hero-1.content.styles.align", json!("left"))
            .unwrap();

        assert_eq!(
            payload_signature(&SavePayload::new(profile(), first)).unwrap(),
            payload_signature(&SavePayload::new(profile(), second)).unwrap()
        );
    }
}
