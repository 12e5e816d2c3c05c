use std::collections::BTreeMap;
use serde::{Deserialize, Serialize};
use crate::api::error::ConfigError;
use crate::components::feel::ImageSlot;

/// Image asset manifest: well-known slot key -> image source.
/// Loaded from a JSON file at runtime.
///
/// ```json
/// { "base_path": "/img/", "images": { "good": "good.png", "default": "ball.png" } }
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageManifest {
    /// Prefix joined to every relative source.
    #[serde(default)]
    pub base_path: String,
    /// Slot key (`very-bad`, `bad`, `normal`, `good`, `very-good`, `default`) -> path.
    #[serde(default)]
    pub images: BTreeMap<String, String>,
}

impl Default for ImageManifest {
    fn default() -> Self {
        Self {
            base_path: String::new(),
            images: ImageSlot::ALL
                .iter()
                .map(|slot| (slot.key().to_string(), format!("{}.png", slot.key())))
                .collect(),
        }
    }
}

impl ImageManifest {
    /// Parse a manifest from a JSON string. Unknown keys are kept but logged.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let manifest: Self = serde_json::from_str(json)?;
        for key in manifest.images.keys() {
            if !ImageSlot::ALL.iter().any(|slot| slot.key() == key) {
                log::warn!("image manifest: unknown slot `{}` ignored", key);
            }
        }
        Ok(manifest)
    }

    /// Full source for a slot, if the manifest lists one.
    pub fn src(&self, slot: ImageSlot) -> Option<String> {
        let path = self.images.get(slot.key())?;
        if self.base_path.is_empty() || path.contains("://") || path.starts_with('/') {
            Some(path.clone())
        } else {
            Some(format!("{}/{}", self.base_path.trim_end_matches('/'), path))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_manifest_covers_every_slot() {
        let manifest = ImageManifest::default();
        for slot in ImageSlot::ALL {
            assert_eq!(manifest.src(slot), Some(format!("{}.png", slot.key())));
        }
    }

    #[test]
    fn parse_with_base_path() {
        let json = r#"{
            "base_path": "/img/feel/",
            "images": { "very-good": "vg.png", "default": "https://cdn/x.png", "sparkly": "s.png" }
        }"#;
        let manifest = ImageManifest::from_json(json).unwrap();
        assert_eq!(manifest.src(ImageSlot::VeryGood).as_deref(), Some("/img/feel/vg.png"));
        assert_eq!(manifest.src(ImageSlot::Default).as_deref(), Some("https://cdn/x.png"));
        assert_eq!(manifest.src(ImageSlot::Bad), None);
    }
}
