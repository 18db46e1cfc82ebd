use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use mascot_loader::prelude::*;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "mascot-cli")]
#[command(about = "Inspect avatar models the way the mascot loader sees them")]
struct Cli {
    /// Loader configuration file (JSON)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Load a model and print its scene tree
    Load {
        path: PathBuf,
    },
    /// Print the title and thumbnail of a model without building its scene
    Meta {
        path: PathBuf,
    },
    /// List the models found under a directory
    Scan {
        dir: PathBuf,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => LoaderConfig::from_file(path)
            .with_context(|| format!("Failed to read config '{}'", path.display()))?,
        None => LoaderConfig::default(),
    };
    let loader = ModelLoader::new(config);

    match cli.command {
        Command::Load { path } => load(&loader, path).await,
        Command::Meta { path } => meta(&loader, path).await,
        Command::Scan { dir } => scan(&loader, dir).await,
    }
}

async fn load(loader: &ModelLoader, path: PathBuf) -> Result<()> {
    let loaded = loader
        .load_model(&path, &CancelToken::new())
        .await
        .with_context(|| format!("Failed to load '{}'", path.display()))?;

    if let Some(reason) = &loaded.fallback_reason {
        println!("using default model: {}", reason);
    }

    let descriptor = &loaded.descriptor;
    println!("name:   {}", descriptor.get_display_name().unwrap_or("<untitled>"));
    println!("format: {}", descriptor.get_format());
    match descriptor.get_schema() {
        Some(schema) => println!("schema: {:?}", schema),
        None => println!("schema: none"),
    }
    if let Some(thumbnail) = descriptor.get_thumbnail() {
        println!("thumbnail: {}x{}", thumbnail.width(), thumbnail.height());
    }
    println!("nodes:  {}", descriptor.get_scene_root().num_nodes());
    descriptor.get_scene_root().walk(&mut print_node);
    Ok(())
}

async fn meta(loader: &ModelLoader, path: PathBuf) -> Result<()> {
    let metadata = loader
        .load_metadata_only(&path)
        .await
        .with_context(|| format!("Failed to read metadata of '{}'", path.display()))?;
    print_metadata(&metadata);
    Ok(())
}

async fn scan(loader: &ModelLoader, dir: PathBuf) -> Result<()> {
    let listings = loader
        .scan_models(&dir, &CancelToken::new())
        .await
        .with_context(|| format!("Failed to scan '{}'", dir.display()))?;

    if listings.is_empty() {
        println!("no models found under '{}'", dir.display());
    }
    for listing in &listings {
        println!("{}", listing.path.display());
        print_metadata(&listing.metadata);
    }
    Ok(())
}

fn print_metadata(metadata: &ModelMetadata) {
    println!("  title:     {}", metadata.get_title().unwrap_or("<untitled>"));
    match metadata.get_thumbnail() {
        Some(thumbnail) => println!("  thumbnail: {}x{} {:?}", thumbnail.width(), thumbnail.height(), thumbnail.format()),
        None => println!("  thumbnail: none"),
    }
}

fn print_node(node: &SceneNode, depth: usize) {
    let mesh = match node.get_mesh() {
        Some(mesh) => format!(" [mesh {}]", mesh.index),
        None => String::new(),
    };
    println!("{:indent$}{}{}", "", node.get_name(), mesh, indent = depth * 2);
}
