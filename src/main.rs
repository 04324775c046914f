use clap::{Parser, Subcommand};
use folio_crop::config::{self, ToolConfig};
use folio_crop::imaging::geometry::plan_extraction;
use folio_crop::imaging::{AspectRatio, RegionUpdate, RustBackend, unix_millis_now};
use folio_crop::naming::object_key_from_url;
use folio_crop::storage::{AssetSaver, Bucket, LocalStore, ObjectStore, StorageError};
use folio_crop::types::{AssetRecord, DisplaySettings, ObjectFit};
use folio_crop::workflow::EditSession;
use folio_crop::{output, render};
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "folio-crop")]
#[command(about = "Crop, encode and store portfolio images")]
#[command(long_about = "\
Crop, encode and store portfolio images

A local image is shown inside the editor box (800x500 by default), framed
with an optional fixed aspect ratio, and the committed region is cut from
the full-resolution bitmap. The result is stored as JPEG in a bucket and the
asset it replaces is removed.

Storage layout:

  storage/
  ├── profile-images/        # --bucket profile
  ├── project-images/        # --bucket project
  ├── company-logos/         # --bucket logo
  └── resumes/               # --bucket resume

Aspect presets: free, 1:1, 16:9, 4:5 (any W:H or decimal ratio works too).
Regions are x,y,width,height in displayed pixels, or percent with --percent.

Run 'folio-crop gen-config' to generate a documented config.toml.")]
#[command(version)]
struct Cli {
    /// Directory containing config.toml
    #[arg(long, default_value = ".", global = true)]
    config_dir: PathBuf,

    #[command(subcommand)]
    command: Command,
}

/// Where an asset is stored and how its reference is persisted.
#[derive(clap::Args, Clone)]
struct AssetArgs {
    /// Target bucket: profile, project, logo or resume
    #[arg(long, default_value = "project")]
    bucket: Bucket,

    /// JSON file holding the current asset reference; updated after a save
    #[arg(long)]
    record: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Command {
    /// Crop an image and store the result, replacing the previous asset
    Crop {
        /// Image file to crop
        file: PathBuf,

        #[command(flatten)]
        asset: AssetArgs,

        /// Aspect ratio constraint (free, 1:1, 16:9, 4:5, W:H or a decimal)
        #[arg(long, default_value = "free")]
        aspect: AspectRatio,

        /// Crop region as x,y,width,height
        #[arg(long, value_parser = parse_region)]
        region: Option<[f64; 4]>,

        /// Interpret --region as percent of the displayed image
        #[arg(long)]
        percent: bool,

        /// How the stored image fills its frame (cover or contain)
        #[arg(long)]
        fit: Option<ObjectFit>,

        /// File name prefix (overrides upload.file_prefix)
        #[arg(long)]
        prefix: Option<String>,

        /// Declared MIME type of the file (default: from its extension)
        #[arg(long)]
        mime: Option<String>,
    },
    /// Delete a stored asset by key or public URL
    Delete {
        /// Object key or public URL
        target: String,

        /// Bucket the asset lives in
        #[arg(long, default_value = "project")]
        bucket: Bucket,
    },
    /// Render an HTML preview of a stored asset reference
    Preview {
        /// Asset reference JSON (renders the empty placeholder when missing)
        #[arg(long)]
        record: PathBuf,

        /// Output HTML file
        #[arg(long, default_value = "preview.html")]
        output: PathBuf,

        /// Page title
        #[arg(long, default_value = "Asset preview")]
        title: String,
    },
    /// Validate config.toml and show the effective settings
    Check,
    /// Print a stock config.toml with all options documented
    GenConfig,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();
    let cli = Cli::parse();

    match cli.command {
        Command::Crop {
            file,
            asset,
            aspect,
            region,
            percent,
            fit,
            prefix,
            mime,
        } => {
            let config = config::load_config(&cli.config_dir)?;
            let request = CropRequest {
                file: &file,
                aspect,
                region,
                percent,
                fit,
                prefix,
                mime,
            };
            run_crop(&config, &asset, request)?;
        }
        Command::Delete { target, bucket } => {
            let config = config::load_config(&cli.config_dir)?;
            let store = LocalStore::from_config(&config.storage);
            let bucket_name = config.storage.buckets.name(bucket);
            let key = object_key_from_url(&target)
                .ok_or_else(|| StorageError::InvalidKey(target.clone()))?;
            store.delete(bucket_name, key)?;
            output::print_delete_output(bucket_name, key);
        }
        Command::Preview {
            record,
            output: out_path,
            title,
        } => {
            let current = load_record(&record)?;
            let html = render::render_preview_page(current.as_ref(), &title);
            std::fs::write(&out_path, html.into_string())?;
            println!("Preview → {}", out_path.display());
        }
        Command::Check => {
            let config = config::load_config(&cli.config_dir)?;
            output::print_check_output(&config, &cli.config_dir);
            println!("==> Config is valid");
        }
        Command::GenConfig => {
            print!("{}", config::stock_config_toml());
        }
    }

    Ok(())
}

struct CropRequest<'a> {
    file: &'a Path,
    aspect: AspectRatio,
    region: Option<[f64; 4]>,
    percent: bool,
    fit: Option<ObjectFit>,
    prefix: Option<String>,
    mime: Option<String>,
}

fn run_crop(
    config: &ToolConfig,
    asset: &AssetArgs,
    request: CropRequest<'_>,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut settings = config.session_settings();
    if let Some(prefix) = request.prefix {
        settings.file_prefix = prefix;
    }
    let mut session = EditSession::new(RustBackend::new(), settings);

    match request.mime.as_deref() {
        Some(mime) => {
            let bytes = std::fs::read(request.file)?;
            session.select_file(&bytes, Some(mime))?;
        }
        None => {
            session.select_path(request.file)?;
        }
    }

    session.set_aspect_ratio(request.aspect)?;
    if let Some([x, y, width, height]) = request.region {
        let update = if request.percent {
            RegionUpdate::percent()
        } else {
            RegionUpdate::pixels()
        };
        session.update_region(update.with_position(x, y).with_width(width).with_height(height))?;
    }
    let crop = session.commit()?;

    if let Some(source) = session.source() {
        let extract = plan_extraction(&crop, source.display, source.natural).ok();
        let label = request
            .file
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| request.file.display().to_string());
        output::print_crop_output(&label, source, request.aspect, &crop, extract.as_ref());
    }

    let store = LocalStore::from_config(&config.storage);
    let bucket_name = config.storage.buckets.name(asset.bucket);
    let previous = match &asset.record {
        Some(path) => load_record(path)?,
        None => None,
    };
    let mut saver = AssetSaver::new(
        &store,
        bucket_name,
        &config.storage.placeholder_hosts,
        previous.clone(),
    );
    let display = DisplaySettings {
        object_fit: request.fit.unwrap_or(config.editor.default_fit),
    };

    let payload = session.save(&mut saver, display, unix_millis_now())?;

    if let Some(stored) = saver.into_current() {
        if let Some(path) = &asset.record {
            stored.save(path)?;
        }
        output::print_upload_output(&stored, &payload, previous.as_ref());
    }
    Ok(())
}

/// Load an asset reference, treating a missing file as "no asset".
fn load_record(path: &Path) -> Result<Option<AssetRecord>, std::io::Error> {
    if !path.exists() {
        return Ok(None);
    }
    AssetRecord::load(path).map(Some)
}

/// Parse `x,y,width,height`.
fn parse_region(s: &str) -> Result<[f64; 4], String> {
    let parts: Vec<f64> = s
        .split(',')
        .map(|p| {
            p.trim()
                .parse::<f64>()
                .map_err(|e| format!("invalid number '{}': {e}", p.trim()))
        })
        .collect::<Result<_, _>>()?;
    match parts.as_slice() {
        [x, y, w, h] if parts.iter().all(|v| v.is_finite()) => Ok([*x, *y, *w, *h]),
        [_, _, _, _] => Err("region values must be finite".into()),
        _ => Err(format!(
            "expected x,y,width,height, got {} values",
            parts.len()
        )),
    }
}
