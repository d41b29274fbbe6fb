// ============================================================================
// beadgrid CLI: headless project creation, inspection and export
// ============================================================================
//
// Usage examples:
//   beadgrid new "Summer cuff" --width 72 --height 9
//   beadgrid info designs/*.dpct
//   beadgrid export cuff.dpct --output cuff.png --zoom 8 --grid
//   beadgrid export "designs/*.dpct" --output-dir previews/ --format jpeg
//   beadgrid calc --length-cm 18 --bead-width 25
//
// All work runs synchronously on the current thread.

use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::Instant;

use clap::{Args, Parser, Subcommand};
use image::DynamicImage;
use tracing::{info, warn};

use crate::error::ProjectError;
use crate::io::{ExportFormat, FileStore, ProjectFile, ProjectKind, ProjectStore, export_raster};
use crate::project::{NewProjectRequest, bracelet_length_px, default_project_path};
use crate::render::render;
use crate::settings::{EditorSettings, GridSettings};

// ============================================================================
// CLI argument definition (clap Derive)
// ============================================================================

/// beadgrid headless tools.
#[derive(Parser, Debug)]
#[command(
    name = "beadgrid",
    version,
    about = "Bead-pattern pixel editor: headless project tools",
    long_about = "Create, inspect and export .dpct bead-pattern projects without\n\
                  opening the editor.\n\n\
                  Example:\n  \
                  beadgrid new \"Summer cuff\" --width 72 --height 9\n  \
                  beadgrid export \"designs/*.dpct\" --output-dir previews/ --zoom 8"
)]
pub struct Cli {
    /// Settings file to use instead of the platform default.
    #[arg(long, global = true, value_name = "FILE")]
    pub settings: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Create an empty project filled with the default color.
    New(NewArgs),
    /// Print a project's name, type, size and format version.
    Info(InfoArgs),
    /// Render projects to PNG, JPEG, BMP, TGA, TIFF or GIF.
    Export(ExportArgs),
    /// Bead count for a bracelet length (the new-project resolution calculator).
    Calc(CalcArgs),
}

#[derive(Args, Debug)]
pub struct NewArgs {
    /// Project name, stored in the file.
    pub name: String,

    #[arg(long, value_name = "PX")]
    pub width: u32,

    #[arg(long, value_name = "PX")]
    pub height: u32,

    /// Project type.
    #[arg(long, default_value = "bracelet")]
    pub kind: String,

    /// Destination. Defaults to `<default_save_location>/<name>.dpct`.
    #[arg(short, long, value_name = "FILE")]
    pub output: Option<PathBuf>,
}

#[derive(Args, Debug)]
pub struct InfoArgs {
    /// Project file(s). Glob patterns accepted (e.g. "designs/*.dpct").
    #[arg(required = true, num_args = 1..)]
    pub input: Vec<String>,
}

#[derive(Args, Debug)]
pub struct ExportArgs {
    /// Project file(s). Glob patterns accepted.
    #[arg(required = true, num_args = 1..)]
    pub input: Vec<String>,

    /// Output file path. Only valid for single-file input.
    #[arg(short, long, value_name = "FILE")]
    pub output: Option<PathBuf>,

    /// Output directory for batch export.
    #[arg(long, value_name = "DIR")]
    pub output_dir: Option<PathBuf>,

    /// png, jpeg, bmp, tga, tiff or gif. Inferred from --output, else png.
    #[arg(short, long, value_name = "FORMAT")]
    pub format: Option<String>,

    /// Scale factor applied with nearest-neighbor sampling.
    #[arg(short, long, default_value_t = 1.0)]
    pub zoom: f32,

    /// Draw pixel grid lines (visible from the configured zoom threshold).
    #[arg(long)]
    pub grid: bool,

    /// Print per-file timing.
    #[arg(short, long)]
    pub verbose: bool,
}

#[derive(Args, Debug)]
pub struct CalcArgs {
    /// Bracelet length in centimetres.
    #[arg(long)]
    pub length_cm: f64,

    /// Bead width in tenths of a millimetre (25 = 2.5 mm).
    #[arg(long, value_name = "TENTHS_MM")]
    pub bead_width: u32,
}

// ============================================================================
// Public entry point
// ============================================================================

/// Run a subcommand and return an OS exit code.
/// `0` = everything succeeded, `1` = one or more failures.
pub fn run(cli: Cli) -> ExitCode {
    let settings = match &cli.settings {
        Some(path) => match EditorSettings::load_from(path) {
            Ok(s) => s,
            Err(e) => {
                eprintln!("error: {}", e);
                return ExitCode::FAILURE;
            }
        },
        None => EditorSettings::load(),
    };

    let result = match cli.command {
        Commands::New(args) => run_new(args, &settings),
        Commands::Info(args) => run_info(args),
        Commands::Export(args) => run_export(args, &settings),
        Commands::Calc(args) => run_calc(args),
    };

    match result {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(e) => {
            eprintln!("error: {}", e);
            ExitCode::FAILURE
        }
    }
}

fn run_new(args: NewArgs, settings: &EditorSettings) -> Result<bool, ProjectError> {
    let kind: ProjectKind = args.kind.parse()?;
    let mut request = NewProjectRequest::new(args.name, args.width, args.height);
    request.kind = kind;
    request.validate()?;

    let path = args
        .output
        .unwrap_or_else(|| default_project_path(settings, &request.name));
    let project = crate::project::Project::new(request.with_path(&path), settings.clone())?;
    FileStore.save(&project.to_file(), &path)?;
    println!("{}", path.display());
    Ok(true)
}

fn run_info(args: InfoArgs) -> Result<bool, ProjectError> {
    let inputs = resolve_inputs(&args.input);
    if inputs.is_empty() {
        return Err(ProjectError::InvalidRequest(
            "no input files matched the given pattern(s)".into(),
        ));
    }

    let mut ok = true;
    for path in &inputs {
        match FileStore.load(path) {
            Ok(loaded) => {
                println!("{}", path.display());
                print_info(&loaded.file);
                if let Some(w) = loaded.warning {
                    println!("  warning: {}", w);
                }
            }
            Err(e) => {
                eprintln!("{}: {}", path.display(), e);
                ok = false;
            }
        }
    }
    Ok(ok)
}

fn print_info(file: &ProjectFile) {
    println!("  name:    {}", file.name);
    println!("  type:    {}", file.kind.as_str());
    println!("  size:    {}x{}", file.size.0, file.size.1);
    println!("  version: {}", file.version);
}

fn run_export(args: ExportArgs, settings: &EditorSettings) -> Result<bool, ProjectError> {
    let inputs = resolve_inputs(&args.input);
    if inputs.is_empty() {
        return Err(ProjectError::InvalidRequest(
            "no input files matched the given pattern(s)".into(),
        ));
    }
    if inputs.len() > 1 && args.output.is_some() && args.output_dir.is_none() {
        return Err(ProjectError::InvalidRequest(format!(
            "{} input files given but --output only accepts a single file path; \
             use --output-dir for batch export",
            inputs.len()
        )));
    }
    if !args.zoom.is_finite() || args.zoom <= 0.0 {
        return Err(ProjectError::InvalidRequest(format!("invalid zoom {}", args.zoom)));
    }

    let format = parse_format(args.format.as_deref(), args.output.as_deref())?;
    if let Some(dir) = &args.output_dir {
        std::fs::create_dir_all(dir).map_err(|e| ProjectError::WriteFailure {
            path: dir.clone(),
            reason: e.to_string(),
        })?;
    }

    let grid = GridSettings {
        enabled: args.grid,
        ..settings.grid.clone()
    };

    let total = inputs.len();
    let multi = total > 1;
    let mut ok = true;

    for (idx, input) in inputs.iter().enumerate() {
        if multi || args.verbose {
            println!("[{}/{}] {}", idx + 1, total, input.display());
        }
        let file_start = Instant::now();

        let Some(output) =
            build_output_path(input, args.output.as_deref(), args.output_dir.as_deref(), format)
        else {
            eprintln!("  error: cannot determine output path for '{}'.", input.display());
            ok = false;
            continue;
        };

        match export_one(input, &output, format, args.zoom, &grid) {
            Ok(()) => {
                if args.verbose || multi {
                    println!(
                        "  -> {} ({:.0}ms)",
                        output.display(),
                        file_start.elapsed().as_secs_f64() * 1000.0
                    );
                }
            }
            Err(e) => {
                eprintln!("  error: {}", e);
                ok = false;
            }
        }
    }
    Ok(ok)
}

fn export_one(
    input: &Path,
    output: &Path,
    format: ExportFormat,
    zoom: f32,
    grid: &GridSettings,
) -> Result<(), ProjectError> {
    let loaded = FileStore.load(input)?;
    if let Some(w) = &loaded.warning {
        warn!("{}: {}", input.display(), w);
    }
    let image = render(&loaded.canvas, zoom, grid);
    export_raster(DynamicImage::ImageRgba8(image), output, format)?;
    info!("cli export {} -> {}", input.display(), output.display());
    Ok(())
}

fn run_calc(args: CalcArgs) -> Result<bool, ProjectError> {
    let px = bracelet_length_px(args.length_cm, args.bead_width)?;
    println!("{}", px);
    Ok(true)
}

// ============================================================================
// Helpers
// ============================================================================

/// Expand glob patterns and literal paths into a deduplicated, ordered list.
fn resolve_inputs(patterns: &[String]) -> Vec<PathBuf> {
    let mut result: Vec<PathBuf> = Vec::new();

    for pattern in patterns {
        let as_path = Path::new(pattern);
        if as_path.exists() {
            if !result.iter().any(|p| p.as_path() == as_path) {
                result.push(as_path.to_path_buf());
            }
            continue;
        }

        match glob::glob(pattern) {
            Ok(entries) => {
                let mut matched = false;
                for entry in entries.flatten() {
                    if !result.contains(&entry) {
                        result.push(entry);
                    }
                    matched = true;
                }
                if !matched {
                    eprintln!("warning: pattern '{}' matched no files.", pattern);
                }
            }
            Err(e) => {
                eprintln!("warning: invalid glob '{}': {}", pattern, e);
            }
        }
    }

    result
}

/// `--format` wins; otherwise the output extension; otherwise PNG.
fn parse_format(format_arg: Option<&str>, output: Option<&Path>) -> Result<ExportFormat, ProjectError> {
    if let Some(f) = format_arg {
        return f.parse();
    }
    Ok(output.and_then(ExportFormat::from_path).unwrap_or_default())
}

/// Priority: `--output`, then `--output-dir/<stem>.<ext>`, then next to the input.
fn build_output_path(
    input: &Path,
    output: Option<&Path>,
    output_dir: Option<&Path>,
    format: ExportFormat,
) -> Option<PathBuf> {
    if let Some(out) = output {
        return Some(out.to_path_buf());
    }

    let ext = format.extension();
    let stem = input.file_stem()?.to_string_lossy().into_owned();

    if let Some(dir) = output_dir {
        return Some(dir.join(format!("{}.{}", stem, ext)));
    }

    let parent = input.parent().unwrap_or(Path::new("."));
    Some(parent.join(format!("{}.{}", stem, ext)))
}
