use indexmap::IndexMap;
use tracing::debug;

use super::schema::{CurrentHumanoid, CurrentMeta, HumanBone, LegacyMeta, LegacyVrm, VrmcVrm};

/// Spec version written into migrated metadata.
pub const MIGRATED_SPEC_VERSION: &str = "1.0";

/// Legacy-only metadata preserved across migration. The normalized shape has
/// no slot for the thumbnail texture reference, so extraction reads it here.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct LegacySnapshot {
    pub title: Option<String>,
    pub author: Option<String>,
    pub version: Option<String>,
    pub exporter_version: Option<String>,
    /// Index into the glTF `textures` array.
    pub thumbnail_texture: Option<usize>,
}

impl LegacySnapshot {
    pub fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.author.is_none()
            && self.version.is_none()
            && self.exporter_version.is_none()
            && self.thumbnail_texture.is_none()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct MigrationResult {
    pub normalized: VrmcVrm,
    pub legacy_original: Option<LegacySnapshot>,
}

/// Migrates a legacy extension block into the current shape. The source
/// container is never modified.
pub fn migrate(legacy: &LegacyVrm) -> MigrationResult {
    let meta = legacy.meta.clone().unwrap_or_default();
    let snapshot = snapshot_of(&meta, legacy.exporter_version.clone());

    let normalized = VrmcVrm {
        spec_version: MIGRATED_SPEC_VERSION.to_string(),
        meta: CurrentMeta {
            name: non_empty(meta.title).unwrap_or_default(),
            version: non_empty(meta.version),
            authors: non_empty(meta.author).into_iter().collect(),
            license_url: None,
            // Legacy thumbnails reference a texture, not an image; see `LegacySnapshot`.
            thumbnail_image: None,
        },
        humanoid: legacy.humanoid.as_ref().map(|humanoid| {
            let mut human_bones = IndexMap::new();
            for bone in &humanoid.human_bones {
                // Negative node indices mark unassigned bones in legacy files.
                if bone.node < 0 {
                    continue;
                }
                human_bones.insert(bone.bone.clone(), HumanBone { node: bone.node as usize });
            }
            CurrentHumanoid { human_bones }
        }),
    };

    debug!(
        title = ?snapshot.title,
        exporter = ?snapshot.exporter_version,
        "migrated legacy VRM metadata"
    );

    MigrationResult {
        normalized,
        legacy_original: (!snapshot.is_empty()).then_some(snapshot),
    }
}

fn snapshot_of(meta: &LegacyMeta, exporter_version: Option<String>) -> LegacySnapshot {
    LegacySnapshot {
        title: non_empty(meta.title.clone()),
        author: non_empty(meta.author.clone()),
        version: non_empty(meta.version.clone()),
        exporter_version: non_empty(exporter_version),
        thumbnail_texture: meta.texture.and_then(|texture| usize::try_from(texture).ok()),
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|s| !s.trim().is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::vrm::schema::{LegacyHumanBone, LegacyHumanoid};

    fn legacy(title: Option<&str>, texture: Option<i64>) -> LegacyVrm {
        LegacyVrm {
            exporter_version: None,
            spec_version: Some("0.0".to_string()),
            meta: Some(LegacyMeta {
                title: title.map(str::to_string),
                version: Some("1.2".to_string()),
                author: Some("someone".to_string()),
                texture,
            }),
            humanoid: Some(LegacyHumanoid {
                human_bones: vec![
                    LegacyHumanBone { bone: "hips".to_string(), node: 2 },
                    LegacyHumanBone { bone: "jaw".to_string(), node: -1 },
                    LegacyHumanBone { bone: "head".to_string(), node: 7 },
                ],
            }),
        }
    }

    #[test]
    fn normalizes_into_current_shape() {
        let result = migrate(&legacy(Some("Old Mascot"), Some(0)));

        assert_eq!(result.normalized.spec_version, MIGRATED_SPEC_VERSION);
        assert_eq!(result.normalized.meta.name, "Old Mascot");
        assert_eq!(result.normalized.meta.authors, ["someone"]);
        assert_eq!(result.normalized.meta.version.as_deref(), Some("1.2"));
        assert_eq!(result.normalized.meta.thumbnail_image, None);

        let bones = result.normalized.humanoid.unwrap().human_bones;
        assert_eq!(bones.len(), 2);
        assert_eq!(bones["hips"].node, 2);
        assert_eq!(bones["head"].node, 7);
        assert!(!bones.contains_key("jaw"));
    }

    #[test]
    fn keeps_legacy_only_fields() {
        let result = migrate(&legacy(Some("Old Mascot"), Some(3)));
        let snapshot = result.legacy_original.unwrap();
        assert_eq!(snapshot.title.as_deref(), Some("Old Mascot"));
        assert_eq!(snapshot.thumbnail_texture, Some(3));
    }

    #[test]
    fn unset_texture_is_dropped() {
        let result = migrate(&legacy(None, Some(-1)));
        let snapshot = result.legacy_original.unwrap();
        assert_eq!(snapshot.thumbnail_texture, None);
        assert_eq!(snapshot.title, None);
        assert_eq!(result.normalized.meta.name, "");
    }

    #[test]
    fn empty_legacy_block_has_no_snapshot() {
        let result = migrate(&LegacyVrm::default());
        assert_eq!(result.legacy_original, None);
        assert_eq!(result.normalized.humanoid, None);
    }

    #[test]
    fn blank_title_is_treated_as_missing() {
        let result = migrate(&legacy(Some("   "), None));
        assert_eq!(result.normalized.meta.name, "");
        assert_eq!(result.legacy_original.unwrap().title, None);
    }
}
