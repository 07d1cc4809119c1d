//! Atelier - headless compositing driver for the editor core.
//!
//! Imports each input image as a layer, composites the visible stack, and
//! exports the result as PNG. Stands in for the GUI shell: it exercises
//! the same store, notifier, compositor, and import/export contracts.

use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

use compositor::bounding_rect;
use document::LayerStore;
use imageio::{export_png, ImageImporter};

/// Atelier - compose image files into a single PNG
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Input images, bottom-most first
    #[arg(required = true)]
    inputs: Vec<PathBuf>,

    /// Output PNG path
    #[arg(short, long, default_value = "composite.png")]
    output: PathBuf,

    /// Target width (defaults to the composite bounding box)
    #[arg(long)]
    width: Option<u32>,

    /// Target height (defaults to the composite bounding box)
    #[arg(long)]
    height: Option<u32>,

    /// Uniform scale applied to the whole composite
    #[arg(long, default_value = "1.0")]
    scale: f32,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();

    let log_level = if args.verbose { Level::DEBUG } else { Level::INFO };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let mut store = LayerStore::new();

    // Where a GUI would wire its view adapters, the CLI wires a logger.
    store.subscribe(|event| tracing::debug!(?event, "document event"));

    let importer = ImageImporter::new();
    for input in &args.inputs {
        let layer = importer
            .import_file(input)
            .with_context(|| format!("importing {}", input.display()))?;
        store.append(layer);
    }

    // Imported layers land at the origin, so the bounding box right/bottom
    // edges give the tightest target covering every visible layer.
    let bounds = bounding_rect(store.iter_visible());
    let width = args
        .width
        .unwrap_or_else(|| (bounds.right().max(0.0) * args.scale).ceil() as u32);
    let height = args
        .height
        .unwrap_or_else(|| (bounds.bottom().max(0.0) * args.scale).ceil() as u32);

    info!(
        layers = store.len(),
        width,
        height,
        scale = f64::from(args.scale),
        "rendering composite"
    );

    export_png(
        store.iter_visible(),
        (width, height),
        args.scale,
        &args.output,
    )
    .with_context(|| format!("exporting {}", args.output.display()))?;

    info!(path = %args.output.display(), "done");
    Ok(())
}
