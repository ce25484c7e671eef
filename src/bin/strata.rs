use std::path::PathBuf;
use std::str::FromStr;

use anyhow::Context as _;
use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(name = "strata", version)]
struct Cli {
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Stack PNG files as layers and write the composite as a PNG.
    Composite(CompositeArgs),
    /// List the available blend modes.
    BlendModes,
}

#[derive(Parser, Debug)]
struct CompositeArgs {
    /// Layer as `path[:opacity][:blend]`, bottom first. Repeat for each layer.
    #[arg(long = "layer", required = true)]
    layers: Vec<LayerSpec>,

    /// Output PNG path.
    #[arg(short, long)]
    out: PathBuf,

    /// Worker threads (defaults to `STRATA_THREADS`, then the logical CPU count).
    #[arg(long)]
    threads: Option<usize>,
}

#[derive(Clone, Debug)]
struct LayerSpec {
    path: PathBuf,
    opacity: u8,
    blend: strata::BlendMode,
}

impl FromStr for LayerSpec {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut parts: Vec<&str> = s.split(':').collect();
        let mut blend = strata::BlendMode::default();
        let mut opacity = 255;

        if parts.len() > 1
            && let Some(mode) = parts.last().and_then(|p| p.parse::<strata::BlendMode>().ok())
        {
            blend = mode;
            parts.pop();
        }
        if parts.len() > 1
            && let Some(o) = parts.last().and_then(|p| p.parse::<u8>().ok())
        {
            opacity = o;
            parts.pop();
        }

        let path = parts.join(":");
        if path.is_empty() {
            return Err(format!("layer '{s}' has no path"));
        }
        Ok(Self {
            path: PathBuf::from(path),
            opacity,
            blend,
        })
    }
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();
    let cli = Cli::parse();
    match cli.cmd {
        Command::Composite(args) => cmd_composite(args),
        Command::BlendModes => {
            for mode in strata::BlendMode::ALL {
                println!("{mode}");
            }
            Ok(())
        }
    }
}

fn load_layer(spec: &LayerSpec) -> anyhow::Result<strata::Layer> {
    let img = image::open(&spec.path)
        .with_context(|| format!("open layer '{}'", spec.path.display()))?
        .to_rgba8();
    let mut layer = strata::Layer::from_buffer(strata::PixelBuffer::from_rgba_image(&img)?);
    if let Some(stem) = spec.path.file_stem() {
        layer.set_name(stem.to_string_lossy())?;
    }
    layer.set_opacity(spec.opacity)?;
    layer.set_blend_mode(spec.blend)?;
    Ok(layer)
}

fn cmd_composite(args: CompositeArgs) -> anyhow::Result<()> {
    let layers = args
        .layers
        .iter()
        .map(load_layer)
        .collect::<anyhow::Result<Vec<_>>>()?;
    let (width, height) = layers
        .first()
        .map(|l| (l.width(), l.height()))
        .context("at least one layer is required")?;

    let mut opts = strata::CompositorOpts::from_env();
    if args.threads.is_some() {
        opts.threads = args.threads;
    }

    let mut doc = strata::Document::with_opts(width, height, &opts)?;
    {
        let mut stack = doc.layers_mut()?;
        for (spec, layer) in args.layers.iter().zip(layers) {
            stack
                .add(layer)
                .with_context(|| format!("add layer '{}'", spec.path.display()))?;
        }
    }

    let frame = doc.composite(true)?;
    let img = frame.to_rgba_image();

    if let Some(parent) = args.out.parent()
        && !parent.as_os_str().is_empty()
    {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("create output dir '{}'", parent.display()))?;
    }

    image::save_buffer_with_format(
        &args.out,
        img.as_raw(),
        img.width(),
        img.height(),
        image::ColorType::Rgba8,
        image::ImageFormat::Png,
    )
    .with_context(|| format!("write png '{}'", args.out.display()))?;

    eprintln!(
        "wrote {} ({}x{}, {} layers, {} workers)",
        args.out.display(),
        width,
        height,
        doc.layers().len(),
        doc.workers()
    );
    Ok(())
}
