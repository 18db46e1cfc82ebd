//! VRM schema resolution.
//!
//! A container is classified exactly once: the current `VRMC_vrm` block is
//! tried first and the legacy `VRM` block is only consulted, and migrated,
//! when the current block is absent or does not parse.

pub mod migrate;
pub mod schema;

use serde_json::Value;
use tracing::{debug, warn};

use crate::io::glb::Container;
pub use migrate::{migrate, LegacySnapshot, MigrationResult};
pub use schema::{SchemaVersion, VrmcVrm, CURRENT_EXTENSION, LEGACY_EXTENSION};
use schema::LegacyVrm;

#[derive(Debug, Clone, thiserror::Error)]
pub enum Err {
    #[error("Schema mismatch: {0}")]
    SchemaMismatch(String),
}

/// Outcome of schema resolution for one container.
#[derive(Debug, Clone, PartialEq)]
pub enum ResolvedSchema {
    Current(VrmcVrm),
    Legacy(MigrationResult),
    /// Plain glTF without any VRM block. Only produced when the schema is optional.
    Plain,
}

impl ResolvedSchema {
    pub fn version(&self) -> Option<SchemaVersion> {
        match self {
            ResolvedSchema::Current(_) => Some(SchemaVersion::Current),
            ResolvedSchema::Legacy(_) => Some(SchemaVersion::Legacy),
            ResolvedSchema::Plain => None,
        }
    }

    /// Metadata in the current shape, regardless of the source schema.
    pub fn normalized(&self) -> Option<&VrmcVrm> {
        match self {
            ResolvedSchema::Current(vrm) => Some(vrm),
            ResolvedSchema::Legacy(migration) => Some(&migration.normalized),
            ResolvedSchema::Plain => None,
        }
    }

    pub fn legacy_original(&self) -> Option<&LegacySnapshot> {
        match self {
            ResolvedSchema::Legacy(migration) => migration.legacy_original.as_ref(),
            _ => None,
        }
    }
}

/// Resolves the VRM schema of `container`.
///
/// When `require` is set, a container carrying neither a valid current nor a
/// valid legacy block is a `SchemaMismatch`; otherwise it resolves to `Plain`.
pub fn resolve_schema(container: &Container, require: bool) -> Result<ResolvedSchema, Err> {
    let current_failure = match container.root_extension(CURRENT_EXTENSION) {
        None => format!("no {} extension", CURRENT_EXTENSION),
        Some(block) => match serde_json::from_value::<VrmcVrm>(block.clone()) {
            Ok(vrm) => {
                debug!(spec_version = %vrm.spec_version, "resolved current VRM schema");
                return Ok(ResolvedSchema::Current(vrm));
            }
            Err(e) => {
                warn!(error = %e, "{} extension is present but invalid, trying legacy schema", CURRENT_EXTENSION);
                format!("invalid {} extension: {}", CURRENT_EXTENSION, e)
            }
        },
    };

    let legacy_failure = match container.root_extension(LEGACY_EXTENSION) {
        None => format!("no {} extension", LEGACY_EXTENSION),
        Some(block) => match parse_legacy(block) {
            Ok(legacy) => return Ok(ResolvedSchema::Legacy(migrate(&legacy))),
            Err(e) => format!("invalid {} extension: {}", LEGACY_EXTENSION, e),
        },
    };

    if require {
        Err(Err::SchemaMismatch(format!("{}; {}", current_failure, legacy_failure)))
    } else {
        debug!("container carries no VRM schema, treating it as plain glTF");
        Ok(ResolvedSchema::Plain)
    }
}

fn parse_legacy(block: &Value) -> Result<LegacyVrm, String> {
    if !block.is_object() {
        return Err("extension block is not an object".to_string());
    }
    serde_json::from_value::<LegacyVrm>(block.clone()).map_err(|e| e.to_string())
}
