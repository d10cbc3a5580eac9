use clap::{Args, Parser, Subcommand};
use image_desk::batch::{self, BatchOptions};
use image_desk::config::{self, EditorConfig};
use image_desk::export::{DirectorySink, ExportTarget, Exporter, deliver};
use image_desk::imaging::operations::merge_sources;
use image_desk::imaging::rust_backend::is_supported_input;
use image_desk::imaging::{
    Layout, Orientation, OutputFormat, PageSize, PdfPage, Quality, RustBackend, SourceFile,
};
use image_desk::output;
use image_desk::recent::{JsonFileStore, RecentFiles, RecentStore};
use image_desk::session::ImageSession;
use image_desk::steps::{Step, StepSpec};
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

#[derive(Parser)]
#[command(name = "image-desk")]
#[command(about = "Edit, convert, merge and batch-process raster images")]
#[command(long_about = "\
Edit, convert, merge and batch-process raster images

Reads JPEG, PNG, WebP, GIF and BMP. Writes JPEG, PNG, WebP, BMP and
single-page PDF. Output files are named <prefix>_<stem>.<ext>, e.g.
compressed_holiday.jpg or edited_scan.pdf.

Steps (for edit and batch):

  resize=800x600 | resize=800 | resize=x600
  thumbnail | thumbnail=200x200
  crop=x,y,width,height[@16:9]
  filter=grayscale|sepia|invert|brightness|contrast|blur[:intensity]
  text=WORDS | logo=FILE           watermark, placed per config
  compress=0.8 | convert=webp | strip
  undo | redo | reset              edit only

Run 'image-desk gen-config' to generate a documented config.toml.")]
#[command(version)]
struct Cli {
    /// Directory holding config.toml and the recent-files store
    #[arg(long, default_value = ".", global = true)]
    config_dir: PathBuf,

    #[command(subcommand)]
    command: Command,
}

/// Where and how to write results.
#[derive(Args, Clone)]
struct ExportArgs {
    /// Output directory
    #[arg(short, long, default_value = "out")]
    output: PathBuf,

    /// Output format (jpeg, png, webp, bmp, pdf). Defaults to config.
    #[arg(long)]
    format: Option<OutputFormat>,

    /// Encoder quality 0.0-1.0. Defaults to config.
    #[arg(long)]
    quality: Option<f32>,
}

impl ExportArgs {
    fn quality(&self) -> Option<Quality> {
        self.quality.map(Quality::new)
    }
}

#[derive(Subcommand)]
enum Command {
    /// Apply steps to one image and export the result
    Edit {
        /// Source image
        input: PathBuf,

        /// Step to apply, in order (repeatable)
        #[arg(long = "step", value_name = "STEP")]
        steps: Vec<StepSpec>,

        #[command(flatten)]
        export: ExportArgs,
    },
    /// Apply one operation to many images
    Batch {
        /// Operation to apply to every image
        #[arg(long = "step", value_name = "STEP")]
        step: StepSpec,

        /// Files or directories (walked recursively)
        #[arg(required = true)]
        inputs: Vec<PathBuf>,

        /// Output directory
        #[arg(short, long, default_value = "out")]
        output: PathBuf,

        /// Quality for operations that keep the source format
        #[arg(long)]
        quality: Option<f32>,
    },
    /// Combine images into one canvas
    Merge {
        /// Images in placement order (at least two)
        #[arg(required = true, num_args = 2..)]
        inputs: Vec<PathBuf>,

        /// grid, horizontal or vertical. Defaults to config.
        #[arg(long)]
        layout: Option<Layout>,

        /// Grid cell width in pixels. Defaults to config.
        #[arg(long)]
        cell_width: Option<u32>,

        #[command(flatten)]
        export: ExportArgs,
    },
    /// Export one image as a single-page PDF
    Pdf {
        input: PathBuf,

        /// a4, letter, legal or fit. Defaults to config.
        #[arg(long)]
        size: Option<PageSize>,

        /// portrait or landscape. Defaults to config.
        #[arg(long)]
        orientation: Option<Orientation>,

        /// Margin in points. Defaults to config.
        #[arg(long)]
        margin: Option<f32>,

        /// JPEG quality inside the PDF, 0.0-1.0
        #[arg(long)]
        quality: Option<f32>,

        /// Output directory
        #[arg(short, long, default_value = "out")]
        output: PathBuf,
    },
    /// List recently opened and exported files
    Recent,
    /// Print a stock config.toml with all options documented
    GenConfig,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // gen-config must work even when the existing config.toml is broken.
    let config = match cli.command {
        Command::GenConfig => EditorConfig::default(),
        _ => config::load_config(&cli.config_dir)?,
    };
    init_thread_pool(&config.processing);
    let backend = RustBackend::new();

    match cli.command {
        Command::Edit {
            input,
            steps,
            export,
        } => {
            let steps = steps
                .iter()
                .map(|s| s.resolve(&config, export.quality(), &backend))
                .collect::<Result<Vec<_>, _>>()?;
            let format = export.format.unwrap_or(config.export.format);
            let quality = export.quality().unwrap_or(config.export.quality);
            let sink = DirectorySink::new(&export.output);
            run_session(
                &cli.config_dir,
                &config,
                Exporter::new(config.pdf),
                &input,
                |session| {
                    for step in &steps {
                        match step {
                            Step::Apply(op) => {
                                session.apply(op)?;
                            }
                            Step::Undo => {
                                session.undo()?;
                            }
                            Step::Redo => {
                                session.redo()?;
                            }
                            Step::Reset => {
                                session.reset()?;
                            }
                        }
                    }
                    session.export(format, quality, ExportTarget::Download(&sink))?;
                    Ok(())
                },
            )?;
        }
        Command::Batch {
            step,
            inputs,
            output: out_dir,
            quality,
        } => {
            let operation = step
                .resolve(&config, quality.map(Quality::new), &backend)?
                .into_operation()
                .ok_or("undo, redo and reset only make sense in edit")?;
            let sources = collect_inputs(&inputs)?
                .iter()
                .map(|p| SourceFile::read(p))
                .collect::<Result<Vec<_>, _>>()?;
            let options = BatchOptions {
                default_quality: quality.map(Quality::new).unwrap_or(config.export.quality),
                cancel: None,
            };
            let sink = DirectorySink::new(&out_dir);
            let exporter = Exporter::new(config.pdf);

            let (tx, rx) = std::sync::mpsc::channel();
            let printer = std::thread::spawn(move || {
                for event in rx {
                    for line in output::format_batch_event(&event) {
                        println!("{}", line);
                    }
                }
            });
            let report = batch::run(
                &backend,
                &exporter,
                &sources,
                &operation,
                &options,
                ExportTarget::Download(&sink),
                Some(tx),
            );
            printer.join().unwrap();
            output::print_batch_summary(&report);
            if report.failed() > 0 {
                std::process::exit(1);
            }
        }
        Command::Merge {
            inputs,
            layout,
            cell_width,
            export,
        } => {
            let sources = inputs
                .iter()
                .map(|p| SourceFile::read(p))
                .collect::<Result<Vec<_>, _>>()?;
            let mut options = config.merge_options();
            if let Some(width) = cell_width {
                options.cell_width = width;
            }
            let layout = layout.unwrap_or(config.merge.layout);
            let merged = merge_sources(&backend, &sources, layout, &options)?;

            let format = export.format.unwrap_or(config.export.format);
            let quality = export.quality().unwrap_or(config.export.quality);
            let artifact = Exporter::new(config.pdf).artifact(
                &backend,
                &merged,
                format,
                quality,
                "merged",
                &sources[0].name,
            )?;
            let sink = DirectorySink::new(&export.output);
            let artifact = deliver(artifact, ExportTarget::Download(&sink))?;
            println!(
                "Merged {} images ({}\u{d7}{}) \u{2192} {} ({})",
                sources.len(),
                merged.width(),
                merged.height(),
                artifact.file_name,
                output::format_size(artifact.bytes.len())
            );
        }
        Command::Pdf {
            input,
            size,
            orientation,
            margin,
            quality,
            output: out_dir,
        } => {
            let page = PdfPage {
                size: size.unwrap_or(config.pdf.size),
                orientation: orientation.unwrap_or(config.pdf.orientation),
                margin: margin.unwrap_or(config.pdf.margin),
            };
            let quality = quality.map(Quality::new).unwrap_or(config.export.quality);
            let sink = DirectorySink::new(&out_dir);
            run_session(
                &cli.config_dir,
                &config,
                Exporter::new(page),
                &input,
                |session| {
                    session.export(OutputFormat::Pdf, quality, ExportTarget::Download(&sink))?;
                    Ok(())
                },
            )?;
        }
        Command::Recent => {
            let store = JsonFileStore::new(cli.config_dir.join(&config.recent.path));
            let recent = RecentFiles::from_entries(store.load(), config.recent.capacity);
            output::print_recent(&recent);
        }
        Command::GenConfig => {
            print!("{}", config::stock_config_toml());
        }
    }

    Ok(())
}

type SessionResult = Result<(), Box<dyn std::error::Error>>;

/// Load `input` into a session wired to the recent store and a printer
/// thread, then hand it to `work`.
fn run_session(
    config_dir: &Path,
    config: &EditorConfig,
    exporter: Exporter,
    input: &Path,
    work: impl FnOnce(&mut ImageSession<RustBackend>) -> SessionResult,
) -> SessionResult {
    let source = SourceFile::read(input)?;
    let store = JsonFileStore::new(config_dir.join(&config.recent.path));

    let (tx, rx) = std::sync::mpsc::channel();
    let printer = std::thread::spawn(move || {
        for event in rx {
            for line in output::format_session_event(&event) {
                println!("{}", line);
            }
        }
    });

    let result = {
        let mut session = ImageSession::new(RustBackend::new(), config.session_settings())
            .with_exporter(exporter)
            .with_recent_store(Box::new(store), config.recent.capacity)
            .with_events(tx);
        match session.load(&source.name, &source.bytes) {
            Ok(_) => work(&mut session),
            Err(e) => Err(e.into()),
        }
    };
    printer.join().unwrap();
    result
}

/// Expand directories into the supported images below them, sorted by path.
///
/// Files named explicitly are kept whatever their extension, so a bad input
/// shows up as a failed item instead of vanishing.
fn collect_inputs(paths: &[PathBuf]) -> Result<Vec<PathBuf>, walkdir::Error> {
    let mut files = Vec::new();
    for path in paths {
        if !path.is_dir() {
            files.push(path.clone());
            continue;
        }
        let mut found = Vec::new();
        for entry in WalkDir::new(path).follow_links(false) {
            let entry = entry?;
            if entry.file_type().is_file() && is_supported_input(entry.path()) {
                found.push(entry.into_path());
            }
        }
        found.sort();
        files.extend(found);
    }
    Ok(files)
}

/// Initialize the rayon thread pool based on processing config.
///
/// Caps at the number of available CPU cores. User can constrain down, not up.
fn init_thread_pool(processing: &config::ProcessingConfig) {
    let threads = config::effective_threads(processing);
    rayon::ThreadPoolBuilder::new()
        .num_threads(threads)
        .build_global()
        .ok();
}
