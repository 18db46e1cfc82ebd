use std::path::Path;

/// Container kinds that share the GLB/glTF container parser.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ContainerKind {
    /// Binary container that must carry a VRM schema block.
    Vrm,
    /// Binary glTF container.
    Glb,
    /// JSON text glTF container with external or embedded buffers.
    Gltf,
}

impl ContainerKind {
    /// Returns true if the container is stored as a binary GLB stream.
    pub fn is_binary(&self) -> bool {
        matches!(self, ContainerKind::Vrm | ContainerKind::Glb)
    }

    /// Returns true if a VRM schema block is mandatory for this kind.
    pub fn requires_schema(&self) -> bool {
        matches!(self, ContainerKind::Vrm)
    }
}

/// Supported model file formats
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ModelFormat {
    /// Plain-text skeleton and motion hierarchy.
    LegacyRig,
    Container(ContainerKind),
    Unknown,
}

impl std::fmt::Display for ModelFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            ModelFormat::LegacyRig => "bvh",
            ModelFormat::Container(ContainerKind::Vrm) => "vrm",
            ModelFormat::Container(ContainerKind::Glb) => "glb",
            ModelFormat::Container(ContainerKind::Gltf) => "gltf",
            ModelFormat::Unknown => "unknown",
        };
        f.write_str(name)
    }
}

/// Determines the model file format based on the file extension.
/// Matching is case-insensitive and no content sniffing is performed.
pub fn resolve_format(path: impl AsRef<Path>) -> ModelFormat {
    let extension = match path.as_ref().extension().and_then(|ext| ext.to_str()) {
        Some(ext) => ext.to_ascii_lowercase(),
        None => return ModelFormat::Unknown,
    };

    match extension.as_str() {
        "bvh" => ModelFormat::LegacyRig,
        "vrm" => ModelFormat::Container(ContainerKind::Vrm),
        "glb" => ModelFormat::Container(ContainerKind::Glb),
        "gltf" => ModelFormat::Container(ContainerKind::Gltf),
        _ => ModelFormat::Unknown,
    }
}
