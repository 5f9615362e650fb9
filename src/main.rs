use clap::{Parser, Subcommand};
use serde::Serialize;
use stache_stash::detect::{Detector, LandmarkFile};
use stache_stash::editor::{Editor, EditorSettings, Overlay};
use stache_stash::imaging::{Dimensions, RustBackend, decode_photo, load_graphic};
use stache_stash::types::{DetectedFace, Placement};
use stache_stash::{batch, catalog, config, output, placement};
use std::path::{Path, PathBuf};

/// Shared flags for commands that run face detection.
#[derive(clap::Args, Clone)]
struct DetectArgs {
    /// Landmark JSON exported by an external detector (overrides [detection])
    #[arg(long, value_name = "JSON")]
    faces: Option<PathBuf>,
}

fn version_string() -> &'static str {
    let on_tag = env!("ON_RELEASE_TAG");
    if on_tag == "true" {
        env!("CARGO_PKG_VERSION")
    } else {
        let hash = env!("GIT_HASH");
        if hash.is_empty() {
            "dev@unknown"
        } else {
            // Leaked once at startup, called exactly once
            Box::leak(format!("dev@{hash}").into_boxed_str())
        }
    }
}

#[derive(Parser)]
#[command(name = "stache-stash")]
#[command(about = "Overlay distinguished mustaches and accessories onto faces in a photo")]
#[command(long_about = "\
Overlay distinguished mustaches and accessories onto faces in a photo

Faces are found by a pluggable detector (landmark JSON, or SeetaFace when
built with the `rustface` feature). Each mouth gets an overlay sized to the
face; with no faces, one overlay is placed below the middle of the photo.

Typical round trip for hand-tuned placements:

  stache-stash detect photo.jpg --faces faces.json > placements.json
  $EDITOR placements.json
  stache-stash apply photo.jpg --style walrus --placements placements.json

Run 'stache-stash styles' to list styles and 'stache-stash gen-config' to
generate a documented stache.toml.")]
#[command(version = version_string())]
struct Cli {
    /// Config file (default: ./stache.toml when present)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// More log output (-v info, -vv debug). RUST_LOG overrides.
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Detect, place, composite and write a PNG
    Apply {
        /// Photo to decorate (JPEG, PNG or WebP)
        image: PathBuf,
        /// Style id (see `styles`); defaults to [output] default_style
        #[arg(long)]
        style: Option<String>,
        /// Use this SVG or raster file as the overlay instead of a style
        #[arg(long, value_name = "FILE", conflicts_with = "style")]
        overlay_file: Option<PathBuf>,
        /// Output file; defaults to [output] filename
        #[arg(long, short)]
        output: Option<PathBuf>,
        /// Placements JSON (as printed by `detect`), clamped into the photo
        #[arg(long, value_name = "JSON")]
        placements: Option<PathBuf>,
        /// Rotate every placement by this many degrees
        #[arg(long, allow_negative_numbers = true)]
        rotate: Option<f64>,
        #[command(flatten)]
        detect: DetectArgs,
    },
    /// Print detected faces and initial placements as JSON
    Detect {
        image: PathBuf,
        #[command(flatten)]
        detect: DetectArgs,
    },
    /// List mustache and accessory styles
    Styles,
    /// Decorate every photo under a directory
    Batch {
        dir: PathBuf,
        /// Style id; defaults to [output] default_style
        #[arg(long)]
        style: Option<String>,
        /// Where decorated copies are written
        #[arg(long, default_value = "distinguished")]
        output_dir: PathBuf,
        #[command(flatten)]
        detect: DetectArgs,
    },
    /// Print a stock stache.toml with all options documented
    GenConfig,
}

/// JSON printed by `detect`.
#[derive(Serialize)]
struct DetectReport {
    width: u32,
    height: u32,
    faces: Vec<DetectedFace>,
    placements: Vec<Placement>,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    // gen-config must work even when the existing file is broken
    let load = || match &cli.config {
        Some(path) => config::load_config_file(path),
        None => config::load_config(Path::new(".")),
    };

    match cli.command {
        Command::Apply {
            image,
            style,
            overlay_file,
            output: destination,
            placements,
            rotate,
            detect,
        } => {
            let config = load()?;
            let detector = build_detector(&config.detection, detect.faces.as_deref());
            let mut editor = Editor::new(
                RustBackend::new(),
                detector,
                EditorSettings::from_config(&config),
            );
            if let Err(e) = editor.init_detection() {
                log::debug!("Continuing without detection: {e}");
            }

            let bytes = std::fs::read(&image)?;
            let dims = match editor.upload(&bytes, None) {
                Ok(dims) => dims,
                Err(e) => {
                    output::print_notices(&editor.take_notices());
                    return Err(e.into());
                }
            };

            match overlay_file {
                Some(path) => {
                    let graphic = load_graphic(editor.backend(), &path)?;
                    let name = path
                        .file_stem()
                        .map(|s| s.to_string_lossy().into_owned())
                        .unwrap_or_else(|| "overlay".to_string());
                    editor.select_overlay(Overlay::Custom { name, graphic });
                }
                None => {
                    let id = style.unwrap_or_else(|| config.output.default_style.clone());
                    editor.select_style(&id)?;
                }
            }

            if placements.is_some() || rotate.is_some() {
                editor.set_manual_mode(true);
            }
            if let Some(path) = placements {
                let list: Vec<Placement> =
                    serde_json::from_str(&std::fs::read_to_string(&path)?)?;
                editor.set_placements(list)?;
            }
            if let Some(degrees) = rotate {
                for index in 0..editor.placements().len() {
                    editor.rotate_by(index, degrees)?;
                }
            }

            let out = destination.unwrap_or_else(|| PathBuf::from(&config.output.filename));
            let saved = editor.save_png(&out);
            output::print_notices(&editor.take_notices());
            saved?;
            output::print_apply_output(
                dims.as_tuple(),
                editor.faces().len(),
                editor.placements(),
                &out,
            );
        }
        Command::Detect { image, detect } => {
            let config = load()?;
            let mut detector = build_detector(&config.detection, detect.faces.as_deref());
            detector.load_models()?;
            let bytes = std::fs::read(&image)?;
            let (photo, dims) = decode_photo(&RustBackend::new(), &bytes)?;
            let faces = detector.detect_faces(&photo)?;
            let placements = placement::initial_placements(
                &faces,
                dims.as_tuple(),
                &config.placement.ratios(),
            );
            let Dimensions { width, height } = dims;
            let report = DetectReport {
                width,
                height,
                faces,
                placements,
            };
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
        Command::Styles => {
            output::print_styles(catalog::MUSTACHES, catalog::ACCESSORIES);
        }
        Command::Batch {
            dir,
            style,
            output_dir,
            detect,
        } => {
            let config = load()?;
            let id = style.unwrap_or_else(|| config.output.default_style.clone());
            let chosen = catalog::find_style(&id).ok_or_else(|| format!("unknown style '{id}'"))?;

            let mut detector = build_detector(&config.detection, detect.faces.as_deref());
            if let Err(e) = detector.load_models() {
                eprintln!("! Face detection unavailable - {e}");
            }
            init_thread_pool(&config.processing);

            let options = batch::BatchOptions {
                graphic: chosen.graphic(),
                ratios: config.placement.ratios(),
                output_dir: output_dir.clone(),
            };
            let (tx, rx) = std::sync::mpsc::channel();
            let printer_dir = output_dir.clone();
            let printer = std::thread::spawn(move || {
                for event in rx {
                    for line in output::format_batch_event(&event, &printer_dir) {
                        println!("{}", line);
                    }
                }
            });
            let summary =
                batch::run_batch(&RustBackend::new(), &detector, &options, &dir, Some(tx))?;
            printer.join().map_err(|_| "output thread panicked")?;
            println!("{}", output::format_batch_summary(&summary));
        }
        Command::GenConfig => {
            print!("{}", config::stock_config_toml());
        }
    }

    Ok(())
}

/// Route `log` output through env_logger. `-v` raises the default level;
/// an explicit `RUST_LOG` wins.
fn init_logging(verbose: u8) {
    let default = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default)).init();
}

/// Pick the detector: `--faces` wins over the config file.
fn build_detector(detection: &config::DetectionConfig, faces: Option<&Path>) -> Detector {
    match faces {
        Some(path) => Detector::new(Box::new(LandmarkFile::new(path))),
        None => Detector::from_config(detection),
    }
}

/// Initialize the rayon thread pool based on processing config.
///
/// Caps at the number of available CPU cores; user can constrain down, not up.
fn init_thread_pool(processing: &config::ProcessingConfig) {
    let threads = config::effective_threads(processing);
    rayon::ThreadPoolBuilder::new()
        .num_threads(threads)
        .build_global()
        .ok();
}
