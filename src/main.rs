use clap::{Parser, Subcommand};
use futures::executor::block_on;
use kurbo::Vec2;
use std::path::{Path, PathBuf};
use tracing::Level;
use twibbon::config::{self, CompositorConfig};
use twibbon::layer::LayerName;
use twibbon::loader::{BlobStore, ImageLoader, ImageSource};
use twibbon::output::{self, CheckReport};
use twibbon::responsive::{Breakpoint, ResponsivePolicy};
use twibbon::session::{SessionParams, SessionStore};
use twibbon::surface::{CanvasSurface, FrameBuffer, LoadOutcome};
use twibbon::validator;

#[derive(Parser)]
#[command(name = "twibbon")]
#[command(about = "Composite a photo with a twibbon frame")]
#[command(long_about = "\
Composite a photo with a twibbon frame

The frame is the background layer and the photo is drawn above it, both
stretched to cover the canvas. The photo can be zoomed and moved;
the result is exported at a fixed multiple of the canvas size (2000x2000 for the default wide canvas).

Sources can be http(s) URLs (with the `http` feature), data: URIs, file://
URLs or plain paths.

Frames are remembered per --slug, so a later run with the same slug may
omit --frame. --remember-frame keeps a fallback frame for runs with neither.

Run 'twibbon gen-config' to generate a documented twibbon.toml.")]
#[command(version)]
struct Cli {
    /// Config file (stock defaults when omitted or missing)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Directory holding the remembered-session file
    #[arg(long, default_value = ".", global = true)]
    session_dir: PathBuf,

    /// Log debug detail to stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(clap::Args)]
struct ComposeArgs {
    /// Photo placed as the movable overlay
    #[arg(long)]
    photo: String,

    /// Frame image used as the background (falls back to the slug's remembered frame)
    #[arg(long)]
    frame: Option<String>,

    /// Photo zoom relative to the canvas
    #[arg(long, default_value_t = 1.0)]
    scale: f64,

    /// Move the photo by DX,DY canvas pixels
    #[arg(long, value_parser = parse_offset, allow_hyphen_values = true)]
    offset: Option<Vec2>,

    /// Viewport width used to pick the canvas preset
    #[arg(long, conflicts_with = "narrow")]
    viewport_width: Option<u32>,

    /// Use the narrow canvas preset
    #[arg(long)]
    narrow: bool,

    /// Output file (defaults to "Twibbon <title>.<ext>")
    #[arg(long, short)]
    output: Option<PathBuf>,

    /// Title used in the default output name
    #[arg(long)]
    title: Option<String>,

    /// Caption remembered with the slug
    #[arg(long)]
    caption: Option<String>,

    /// Remember (or recall) the frame under this slug
    #[arg(long)]
    slug: Option<String>,

    /// Blur the frame as a placeholder background
    #[arg(long)]
    placeholder: bool,

    /// Remember the frame as the fallback for runs without --frame or --slug
    #[arg(long)]
    remember_frame: bool,
}

#[derive(Subcommand)]
enum Command {
    /// Compose a photo and a frame and write the export
    Compose(ComposeArgs),
    /// Check that a source looks like an image URL and can be loaded
    Check {
        /// URL, data URI or path
        source: String,
    },
    /// Print a stock twibbon.toml with all options documented
    GenConfig,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match cli.command {
        Command::Compose(args) => {
            let config = config::load_config(cli.config.as_deref())?;
            compose(config, &cli.session_dir, args)?;
        }
        Command::Check { source } => {
            let loader = ImageLoader::with_blobs(BlobStore::new());
            let header = match block_on(loader.identify(&source)) {
                Ok(dims) => Some(dims),
                Err(err) => {
                    tracing::debug!(error = %err, "header unreadable");
                    None
                }
            };
            let loaded = block_on(loader.load(&source))
                .map(|decoded| decoded.dimensions())
                .map_err(|err| err.to_string());
            let failed = loaded.is_err();
            let report = CheckReport {
                url_shape_ok: validator::is_valid_image_url(&source),
                source,
                header,
                loaded,
            };
            output::print_check_output(&report);
            if failed {
                return Err("source could not be loaded".into());
            }
        }
        Command::GenConfig => {
            print!("{}", config::stock_config_toml());
        }
    }

    Ok(())
}

fn compose(
    config: CompositorConfig,
    session_dir: &Path,
    args: ComposeArgs,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut session = SessionStore::load(session_dir);
    let frame = session.resolve_frame(args.frame.as_deref(), args.slug.as_deref())?;

    // A local photo goes through a blob reference, like a picked file would.
    let blobs = BlobStore::new();
    let photo = match ImageSource::parse(&args.photo) {
        ImageSource::File(path) => blobs.create_object_url(std::fs::read(&path)?),
        _ => args.photo.clone(),
    };

    let breakpoint = if args.narrow {
        Breakpoint::Narrow
    } else {
        match args.viewport_width {
            Some(width) => ResponsivePolicy::from_config(&config.canvas).breakpoint_for_width(width),
            None => Breakpoint::Wide,
        }
    };

    if config.scale.clamp_to_ui(args.scale) != args.scale {
        tracing::warn!(scale = args.scale, "zoom is outside the slider range");
    }

    let surface = CanvasSurface::new(config, ImageLoader::with_blobs(blobs.clone()));
    surface.create(FrameBuffer::default(), breakpoint);

    let background = if args.placeholder {
        surface.add_placeholder_background(&frame)
    } else {
        surface.add_background(&frame)
    };
    let overlay = surface.add_frame(&photo);
    let (bg_outcome, photo_outcome) = block_on(futures::future::join(background, overlay));
    blobs.revoke_object_url(&photo);

    eprintln!("{}", output::format_load_outcome(LayerName::Background, &frame, bg_outcome));
    eprintln!("{}", output::format_load_outcome(LayerName::Overlay, &args.photo, photo_outcome));
    if bg_outcome != LoadOutcome::Committed {
        return Err(format!("frame could not be loaded: {frame}").into());
    }

    surface.set_scale(args.scale)?;
    if let Some(offset) = args.offset {
        surface.move_overlay(offset);
    }

    let encoded = surface.export_image().ok_or("nothing to export")?;
    let output_path = args.output.clone().unwrap_or_else(|| {
        PathBuf::from(surface.export_settings().download_name(args.title.as_deref()))
    });
    std::fs::write(&output_path, &encoded.bytes)?;
    output::print_compose_output(&surface.scene_record(), &encoded, &output_path);
    surface.dispose();

    let remember = args.remember_frame || args.slug.is_some();
    if args.remember_frame {
        session.set_custom_frame(frame.clone());
    }
    if let Some(slug) = args.slug {
        session.insert(SessionParams {
            slug,
            title: args.title,
            frame_url: Some(frame),
            caption: args.caption,
        });
    }
    if remember {
        session.save(session_dir)?;
    }
    Ok(())
}

/// Parse `DX,DY` into a canvas-space offset.
fn parse_offset(s: &str) -> Result<Vec2, String> {
    let (dx, dy) = s
        .split_once(',')
        .ok_or_else(|| format!("expected DX,DY, got {s:?}"))?;
    let parse = |v: &str| {
        v.trim()
            .parse::<f64>()
            .map_err(|err| format!("invalid offset {v:?}: {err}"))
    };
    Ok(Vec2::new(parse(dx)?, parse(dy)?))
}

/// Install the stderr log subscriber. Quiet unless `--verbose`.
fn init_tracing(verbose: bool) {
    let level = if verbose { Level::DEBUG } else { Level::WARN };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}
