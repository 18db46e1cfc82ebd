//! The bundled fallback model.

use std::borrow::Cow;
use std::fmt;
use std::path::Path;

/// Logical name of the model shipped with the crate.
pub const DEFAULT_ASSET_NAME: &str = "default_model.vrm";

static DEFAULT_MODEL: &[u8] = include_bytes!("../../assets/default_model.vrm");

/// Read-only store of assets addressed by logical name.
pub trait AssetBundle: Send + Sync + fmt::Debug {
    fn get(&self, name: &str) -> Option<Cow<'static, [u8]>>;
}

/// Assets compiled into the binary.
#[derive(Debug, Clone, Copy, Default)]
pub struct EmbeddedAssets;

impl AssetBundle for EmbeddedAssets {
    fn get(&self, name: &str) -> Option<Cow<'static, [u8]>> {
        match name {
            DEFAULT_ASSET_NAME => Some(Cow::Borrowed(DEFAULT_MODEL)),
            _ => None,
        }
    }
}

/// Where the fallback model comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum DefaultAssetSource<'a> {
    Bundled(&'a str),
    File(&'a Path),
}

impl fmt::Display for DefaultAssetSource<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DefaultAssetSource::Bundled(name) => write!(f, "bundled asset '{}'", name),
            DefaultAssetSource::File(path) => write!(f, "file '{}'", path.display()),
        }
    }
}
