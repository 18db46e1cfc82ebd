//! Serde shapes of the two VRM extension blocks.
//!
//! `VrmcVrm` mirrors the VRM 1.0 `VRMC_vrm` extension and doubles as the
//! normalized representation every consumer reads. `LegacyVrm` mirrors the
//! VRM 0.x `VRM` extension and is only ever read by the migrator.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Root extension key of the current schema.
pub const CURRENT_EXTENSION: &str = "VRMC_vrm";
/// Root extension key of the legacy schema.
pub const LEGACY_EXTENSION: &str = "VRM";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SchemaVersion {
    Current,
    Legacy,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VrmcVrm {
    pub spec_version: String,
    pub meta: CurrentMeta,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub humanoid: Option<CurrentHumanoid>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CurrentMeta {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub authors: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub license_url: Option<String>,
    /// Index into the glTF `images` array.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thumbnail_image: Option<usize>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CurrentHumanoid {
    #[serde(default)]
    pub human_bones: IndexMap<String, HumanBone>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct HumanBone {
    pub node: usize,
}

#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LegacyVrm {
    #[serde(default)]
    pub exporter_version: Option<String>,
    #[serde(default)]
    pub spec_version: Option<String>,
    #[serde(default)]
    pub meta: Option<LegacyMeta>,
    #[serde(default)]
    pub humanoid: Option<LegacyHumanoid>,
}

#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LegacyMeta {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub version: Option<String>,
    #[serde(default)]
    pub author: Option<String>,
    /// Index into the glTF `textures` array, `-1` when unset.
    #[serde(default)]
    pub texture: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LegacyHumanoid {
    #[serde(default)]
    pub human_bones: Vec<LegacyHumanBone>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct LegacyHumanBone {
    pub bone: String,
    pub node: i64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn current_requires_spec_version_and_name() {
        let ok = json!({ "specVersion": "1.0", "meta": { "name": "Alicia" } });
        let parsed: VrmcVrm = serde_json::from_value(ok).unwrap();
        assert_eq!(parsed.meta.name, "Alicia");
        assert_eq!(parsed.meta.thumbnail_image, None);

        let missing_name = json!({ "specVersion": "1.0", "meta": {} });
        assert!(serde_json::from_value::<VrmcVrm>(missing_name).is_err());

        let missing_spec = json!({ "meta": { "name": "Alicia" } });
        assert!(serde_json::from_value::<VrmcVrm>(missing_spec).is_err());
    }

    #[test]
    fn current_humanoid_keeps_declared_order() {
        let value = json!({
            "specVersion": "1.0",
            "meta": { "name": "A", "thumbnailImage": 2 },
            "humanoid": { "humanBones": { "hips": { "node": 3 }, "spine": { "node": 4 }, "head": { "node": 9 } } }
        });
        let parsed: VrmcVrm = serde_json::from_value(value).unwrap();
        let bones: Vec<_> = parsed.humanoid.unwrap().human_bones.into_keys().collect();
        assert_eq!(bones, ["hips", "spine", "head"]);
        assert_eq!(parsed.meta.thumbnail_image, Some(2));
    }

    #[test]
    fn legacy_is_lenient() {
        let parsed: LegacyVrm = serde_json::from_value(json!({})).unwrap();
        assert_eq!(parsed, LegacyVrm::default());

        let parsed: LegacyVrm = serde_json::from_value(json!({
            "exporterVersion": "UniVRM-0.61.1",
            "meta": { "title": "Old", "texture": -1 },
            "humanoid": { "humanBones": [{ "bone": "hips", "node": 1 }] }
        })).unwrap();
        let meta = parsed.meta.unwrap();
        assert_eq!(meta.title.as_deref(), Some("Old"));
        assert_eq!(meta.texture, Some(-1));
        assert_eq!(parsed.humanoid.unwrap().human_bones.len(), 1);
    }
}
