//! Model loading facade.
//!
//! A load request runs the stages of `LoadStage` strictly in order. Any
//! failure, except cancellation, is logged and replaced by the default model;
//! only a broken default model is reported back to the caller.

pub mod config;
pub mod default_asset;
pub mod descriptor;
pub mod stage;

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{debug, error, info, info_span, warn, Instrument, Span};

use crate::core::scene::builder::{self, build_from_bvh, build_from_container};
use crate::io::bvh::{self, parse_bvh};
use crate::io::format::{resolve_format, ContainerKind, ModelFormat};
use crate::io::glb::{self, Container};
use crate::io::metadata::{extract_metadata, ModelMetadata};
use crate::io::texture_io;
use crate::io::vrm::{self, resolve_schema};

pub use crate::core::cancel::CancelToken;
pub use config::LoaderConfig;
pub use default_asset::{AssetBundle, EmbeddedAssets, DEFAULT_ASSET_NAME};
pub use descriptor::{LoadedModel, ModelDescriptor, ModelListing, ModelOrigin};
pub use stage::{LoadStage, StageObserver};

use default_asset::DefaultAssetSource;
use stage::StageTracker;

#[derive(Debug, Clone, thiserror::Error)]
pub enum Err {
    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),
    #[error("Malformed container: {0}")]
    MalformedContainer(String),
    #[error("Truncated buffer: {0}")]
    TruncatedBuffer(String),
    #[error("Schema mismatch: {0}")]
    SchemaMismatch(String),
    #[error("Decode failure: {0}")]
    DecodeFailure(String),
    #[error("Load canceled")]
    Canceled,
    #[error("Default asset unavailable: {0}")]
    DefaultAssetUnavailable(String),
    #[error("IO Error: {0}")]
    IoError(String),
    #[error("Worker task failed: {0}")]
    WorkerError(String),
}

impl From<glb::Err> for Err {
    fn from(err: glb::Err) -> Self {
        match err {
            glb::Err::TruncatedView { .. } | glb::Err::TruncatedBuffer { .. } => Err::TruncatedBuffer(err.to_string()),
            glb::Err::IoError(_) => Err::IoError(err.to_string()),
            _ => Err::MalformedContainer(err.to_string()),
        }
    }
}

impl From<vrm::Err> for Err {
    fn from(err: vrm::Err) -> Self {
        match err {
            vrm::Err::SchemaMismatch(reason) => Err::SchemaMismatch(reason),
        }
    }
}

impl From<builder::Err> for Err {
    fn from(err: builder::Err) -> Self {
        match err {
            builder::Err::Canceled => Err::Canceled,
            _ => Err::MalformedContainer(err.to_string()),
        }
    }
}

impl From<bvh::Err> for Err {
    fn from(err: bvh::Err) -> Self {
        Err::MalformedContainer(err.to_string())
    }
}

impl From<texture_io::Err> for Err {
    fn from(err: texture_io::Err) -> Self {
        Err::DecodeFailure(err.to_string())
    }
}

/// Entry point for loading models, their metadata, and the default model.
///
/// Cheap to clone; concurrent loads share nothing but the read-only asset
/// bundle.
#[derive(Clone)]
pub struct ModelLoader {
    config: LoaderConfig,
    bundle: Arc<dyn AssetBundle>,
    observer: Option<StageObserver>,
}

impl fmt::Debug for ModelLoader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModelLoader")
            .field("config", &self.config)
            .field("bundle", &self.bundle)
            .field("observer", &self.observer.is_some())
            .finish()
    }
}

impl Default for ModelLoader {
    fn default() -> Self {
        Self::new(LoaderConfig::default())
    }
}

impl ModelLoader {
    pub fn new(config: LoaderConfig) -> Self {
        Self {
            config,
            bundle: Arc::new(EmbeddedAssets),
            observer: None,
        }
    }

    /// Replaces the bundle the default model is read from.
    pub fn with_bundle(mut self, bundle: Arc<dyn AssetBundle>) -> Self {
        self.bundle = bundle;
        self
    }

    /// Registers a callback for every stage transition of `load_model`.
    pub fn with_stage_observer<F>(mut self, observer: F) -> Self
    where
        F: Fn(LoadStage) + Send + Sync + 'static,
    {
        self.observer = Some(Arc::new(observer));
        self
    }

    pub fn get_config(&self) -> &LoaderConfig {
        &self.config
    }

    /// Loads the model at `path`, falling back to the default model on failure.
    ///
    /// Only `Err::Canceled` and `Err::DefaultAssetUnavailable` are returned.
    pub async fn load_model(&self, path: impl AsRef<Path>, cancel: &CancelToken) -> Result<LoadedModel, Err> {
        let path = self.config.resolve_path(path.as_ref());
        let span = info_span!("load_model", path = %path.display());
        self.load_model_with_fallback(path, cancel).instrument(span).await
    }

    /// Reads the title and thumbnail of the model at `path` without building
    /// its scene. Failures are returned as is.
    pub async fn load_metadata_only(&self, path: impl AsRef<Path>) -> Result<ModelMetadata, Err> {
        let path = self.config.resolve_path(path.as_ref());
        let span = info_span!("load_metadata_only", path = %path.display());
        self.metadata_for(&path).instrument(span).await
    }

    /// Lists the models under `dir` with their metadata.
    ///
    /// Files that fail to load are skipped with a warning. The scan yields to
    /// the runtime between files.
    pub async fn scan_models(&self, dir: impl AsRef<Path>, cancel: &CancelToken) -> Result<Vec<ModelListing>, Err> {
        let dir = self.config.resolve_path(dir.as_ref());
        let span = info_span!("scan_models", path = %dir.display());
        self.scan_dir(&dir, cancel).instrument(span).await
    }

    /// Loads the default model.
    pub async fn load_default(&self) -> Result<LoadedModel, Err> {
        let descriptor = self.load_default_descriptor(&CancelToken::new())
            .instrument(info_span!("load_default"))
            .await?;
        Ok(LoadedModel {
            descriptor,
            origin: ModelOrigin::Default,
            fallback_reason: None,
        })
    }

    async fn load_model_with_fallback(&self, path: PathBuf, cancel: &CancelToken) -> Result<LoadedModel, Err> {
        let mut stages = StageTracker::new(self.observer.clone());

        let failure = match self.load_requested(&path, cancel, &mut stages).await {
            Ok(descriptor) => {
                stages.advance(LoadStage::Done);
                info!(name = ?descriptor.get_display_name(), format = %descriptor.get_format(), "model loaded");
                return Ok(LoadedModel {
                    descriptor,
                    origin: ModelOrigin::Requested(path),
                    fallback_reason: None,
                });
            }
            Err(Err::Canceled) => {
                info!(stage = %stages.current(), "model load canceled");
                return Err(Err::Canceled);
            }
            Err(e) => e,
        };

        warn!(stage = %stages.current(), error = %failure, "model load failed, loading the default model");
        stages.advance(LoadStage::UsingDefault);
        check_canceled(cancel)?;

        let descriptor = self.load_default_descriptor(cancel).await?;
        Ok(LoadedModel {
            descriptor,
            origin: ModelOrigin::Default,
            fallback_reason: Some(failure),
        })
    }

    async fn load_requested(&self, path: &Path, cancel: &CancelToken, stages: &mut StageTracker) -> Result<ModelDescriptor, Err> {
        check_canceled(cancel)?;
        stages.advance(LoadStage::ResolvingFormat);
        let format = resolve_format(path);
        debug!(format = %format, "resolved model format");

        match format {
            ModelFormat::Unknown => Err(Err::UnsupportedFormat(path.display().to_string())),
            ModelFormat::LegacyRig => {
                stages.advance(LoadStage::Parsing);
                let bytes = read_file(path).await?;
                check_canceled(cancel)?;
                let document = run_blocking(move || {
                    let text = String::from_utf8_lossy(&bytes);
                    parse_bvh(&text)
                }).await??;
                check_canceled(cancel)?;

                stages.advance(LoadStage::BuildingScene);
                let name = model_name(path);
                let token = cancel.clone();
                let scene = run_blocking(move || build_from_bvh(&document, &name, &token)).await??;
                check_canceled(cancel)?;
                Ok(ModelDescriptor::new(scene, format, ModelMetadata::default()))
            }
            ModelFormat::Container(kind) => {
                stages.advance(LoadStage::Parsing);
                let bytes = read_file(path).await?;
                check_canceled(cancel)?;
                let base_dir = path.parent().map(Path::to_path_buf);
                self.load_container(bytes, kind, base_dir, model_name(path), cancel, stages).await
            }
        }
    }

    /// Runs the container stages from parsing onward. The caller has already
    /// entered `LoadStage::Parsing`.
    async fn load_container(
        &self,
        bytes: Vec<u8>,
        kind: ContainerKind,
        base_dir: Option<PathBuf>,
        fallback_name: String,
        cancel: &CancelToken,
        stages: &mut StageTracker,
    ) -> Result<ModelDescriptor, Err> {
        let container = run_blocking(move || parse_container(kind, &bytes, base_dir.as_deref())).await??;
        let container = Arc::new(container);
        check_canceled(cancel)?;

        stages.advance(LoadStage::ResolvingSchema);
        let schema = Arc::new(resolve_schema(&container, kind.requires_schema())?);
        debug!(schema = ?schema.version(), "resolved schema");
        check_canceled(cancel)?;

        stages.advance(LoadStage::ExtractingMetadata);
        let metadata = {
            let container = container.clone();
            run_blocking(move || extract_metadata(&container, &schema)).await?
        };
        check_canceled(cancel)?;

        stages.advance(LoadStage::BuildingScene);
        let name = metadata.title.clone().unwrap_or(fallback_name);
        let token = cancel.clone();
        let scene = run_blocking(move || build_from_container(&container, &name, &token)).await??;
        check_canceled(cancel)?;

        Ok(ModelDescriptor::new(scene, ModelFormat::Container(kind), metadata))
    }

    async fn load_default_descriptor(&self, cancel: &CancelToken) -> Result<ModelDescriptor, Err> {
        let source = match &self.config.default_asset_override {
            Some(path) => DefaultAssetSource::File(path),
            None => DefaultAssetSource::Bundled(&self.config.default_asset),
        };

        match self.try_load_default(&source, cancel).await {
            Ok(descriptor) => {
                info!(source = %source, "default model loaded");
                Ok(descriptor)
            }
            Err(Err::Canceled) => Err(Err::Canceled),
            Err(e) => {
                error!(source = %source, error = %e, "default model is unavailable");
                Err(Err::DefaultAssetUnavailable(format!("{}: {}", source, e)))
            }
        }
    }

    async fn try_load_default(&self, source: &DefaultAssetSource<'_>, cancel: &CancelToken) -> Result<ModelDescriptor, Err> {
        // The default load is not observed; its stages run on a private tracker.
        let mut stages = StageTracker::new(None);
        stages.advance(LoadStage::Parsing);
        let (bytes, base_dir) = match source {
            DefaultAssetSource::Bundled(name) => {
                let bytes = self.bundle.get(name)
                    .ok_or_else(|| Err::IoError(format!("no bundled asset named '{}'", name)))?;
                (bytes.into_owned(), None)
            }
            DefaultAssetSource::File(path) => (read_file(path).await?, path.parent().map(Path::to_path_buf)),
        };
        self.load_container(bytes, ContainerKind::Vrm, base_dir, "default".to_string(), cancel, &mut stages).await
    }

    async fn metadata_for(&self, path: &Path) -> Result<ModelMetadata, Err> {
        let kind = match resolve_format(path) {
            ModelFormat::Container(kind) => kind,
            // A skeleton carries no title or thumbnail.
            ModelFormat::LegacyRig => return Ok(ModelMetadata::default()),
            ModelFormat::Unknown => return Err(Err::UnsupportedFormat(path.display().to_string())),
        };
        let bytes = read_file(path).await?;
        let base_dir = path.parent().map(Path::to_path_buf);
        run_blocking(move || read_metadata(kind, &bytes, base_dir.as_deref())).await?
    }

    async fn scan_dir(&self, dir: &Path, cancel: &CancelToken) -> Result<Vec<ModelListing>, Err> {
        let candidates = self.collect_candidates(dir, cancel).await?;
        debug!(candidates = candidates.len(), "collected scan candidates");

        let mut listings = Vec::with_capacity(candidates.len());
        for path in candidates {
            check_canceled(cancel)?;
            match self.metadata_for(&path).await {
                Ok(metadata) => listings.push(ModelListing { path, metadata }),
                Err(e) => warn!(path = %path.display(), error = %e, "skipping model that failed to load"),
            }
            tokio::task::yield_now().await;
        }

        info!(models = listings.len(), "scan finished");
        Ok(listings)
    }

    async fn collect_candidates(&self, root: &Path, cancel: &CancelToken) -> Result<Vec<PathBuf>, Err> {
        let mut pending = vec![root.to_path_buf()];
        let mut files = Vec::new();

        while let Some(dir) = pending.pop() {
            check_canceled(cancel)?;
            let mut entries = tokio::fs::read_dir(&dir).await.map_err(|e| io_err(&dir, e))?;
            while let Some(entry) = entries.next_entry().await.map_err(|e| io_err(&dir, e))? {
                let path = entry.path();
                let file_type = entry.file_type().await.map_err(|e| io_err(&path, e))?;
                if file_type.is_dir() {
                    if self.config.recursive_scan {
                        pending.push(path);
                    }
                } else if self.config.is_scan_candidate(&path) {
                    files.push(path);
                }
            }
        }

        files.sort();
        Ok(files)
    }
}

fn parse_container(kind: ContainerKind, bytes: &[u8], base_dir: Option<&Path>) -> Result<Container, glb::Err> {
    if kind.is_binary() {
        Container::from_glb_bytes(bytes, base_dir)
    } else {
        Container::from_gltf_text(bytes, base_dir)
    }
}

fn read_metadata(kind: ContainerKind, bytes: &[u8], base_dir: Option<&Path>) -> Result<ModelMetadata, Err> {
    let container = parse_container(kind, bytes, base_dir)?;
    let schema = resolve_schema(&container, kind.requires_schema())?;
    Ok(extract_metadata(&container, &schema))
}

fn check_canceled(cancel: &CancelToken) -> Result<(), Err> {
    if cancel.is_canceled() {
        Err(Err::Canceled)
    } else {
        Ok(())
    }
}

fn model_name(path: &Path) -> String {
    path.file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .filter(|stem| !stem.is_empty())
        .unwrap_or_else(|| "model".to_string())
}

fn io_err(path: &Path, err: std::io::Error) -> Err {
    Err::IoError(format!("{}: {}", path.display(), err))
}

async fn read_file(path: &Path) -> Result<Vec<u8>, Err> {
    tokio::fs::read(path).await.map_err(|e| io_err(path, e))
}

/// Runs CPU-bound work off the async workers, inside the caller's span.
async fn run_blocking<T, F>(f: F) -> Result<T, Err>
where
    F: FnOnce() -> T + Send + 'static,
    T: Send + 'static,
{
    let span = Span::current();
    tokio::task::spawn_blocking(move || span.in_scope(f))
        .await
        .map_err(|e| Err::WorkerError(e.to_string()))
}
