use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use pdfedit::config::EditorConfig;
use pdfedit::params::{parse_edits_json, parse_page_list};
use pdfedit::parallel;
use pdfedit::pdf_ops::PdfEditor;
use std::path::{Path, PathBuf};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

#[derive(Parser)]
#[command(name = "pdfedit")]
#[command(about = "Merge, split, rotate, prune, annotate and watermark PDF documents")]
struct Cli {
    #[arg(long, global = true, help = "Editor configuration file (JSON)")]
    config: Option<PathBuf>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    #[command(about = "Concatenate PDFs in argument order")]
    Merge {
        #[arg(help = "Output PDF file")]
        output: PathBuf,
        #[arg(help = "Input PDF files")]
        inputs: Vec<PathBuf>,
    },
    #[command(about = "Write each page in a range to its own PDF")]
    Split {
        #[arg(help = "Input PDF file")]
        input: PathBuf,
        #[arg(help = "Output prefix; pages are written to <prefix>_page_<n>.pdf")]
        output_prefix: String,
        #[arg(long, help = "First page (0-indexed, inclusive)")]
        start: Option<usize>,
        #[arg(long, help = "Last page (0-indexed, exclusive)")]
        end: Option<usize>,
    },
    #[command(about = "Rotate all pages clockwise")]
    Rotate {
        #[arg(help = "Input PDF file")]
        input: PathBuf,
        #[arg(help = "Output PDF file")]
        output: PathBuf,
        #[arg(long, help = "Rotation angle (multiple of 90)", default_value = "90", allow_negative_numbers = true)]
        angle: i32,
    },
    #[command(about = "Remove pages by 0-based index")]
    Remove {
        #[arg(help = "Input PDF file")]
        input: PathBuf,
        #[arg(help = "Output PDF file")]
        output: PathBuf,
        #[arg(help = "Page indices or ranges, e.g. 0 2 4-6", required = true)]
        pages: Vec<String>,
    },
    #[command(about = "Draw a line of text on one page")]
    AddText {
        #[arg(help = "Input PDF file")]
        input: PathBuf,
        #[arg(help = "Output PDF file")]
        output: PathBuf,
        #[arg(help = "Text to draw")]
        text: String,
        #[arg(long, help = "X position in points", default_value = "100")]
        x: f32,
        #[arg(long, help = "Y position in points", default_value = "750")]
        y: f32,
        #[arg(long, help = "Target page (0-indexed)", default_value = "0")]
        page: usize,
    },
    #[command(about = "Apply a JSON list of text edits")]
    ApplyEdits {
        #[arg(help = "Input PDF file")]
        input: PathBuf,
        #[arg(help = "Output PDF file")]
        output: PathBuf,
        #[arg(help = "Edits file: [{\"page\":0,\"text\":\"...\",\"x\":100,\"y\":750}]")]
        edits: PathBuf,
    },
    #[command(about = "Stamp the first page of a PDF onto every page")]
    Watermark {
        #[arg(help = "Input PDF file")]
        input: PathBuf,
        #[arg(help = "Watermark PDF file")]
        watermark: PathBuf,
        #[arg(help = "Output PDF file")]
        output: PathBuf,
    },
    #[command(about = "Rotate many PDFs in parallel")]
    BatchRotate {
        #[arg(help = "Input PDF files", required = true)]
        inputs: Vec<PathBuf>,
        #[arg(long, help = "Output directory")]
        out_dir: PathBuf,
        #[arg(long, help = "Rotation angle (multiple of 90)", default_value = "90", allow_negative_numbers = true)]
        angle: i32,
    },
    #[command(about = "Watermark many PDFs in parallel")]
    BatchWatermark {
        #[arg(help = "Input PDF files", required = true)]
        inputs: Vec<PathBuf>,
        #[arg(long, help = "Watermark PDF file")]
        watermark: PathBuf,
        #[arg(long, help = "Output directory")]
        out_dir: PathBuf,
    },
}

fn main() {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| "pdfedit=info".into()))
        .with(fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    match run(cli) {
        Ok(summary) => println!("{}", summary),
        Err(e) => {
            eprintln!("Error: {:#}", e);
            std::process::exit(1);
        }
    }
}

fn load_config(path: Option<&Path>) -> Result<EditorConfig> {
    match path {
        Some(path) => EditorConfig::from_json_file(path)
            .with_context(|| format!("loading config {}", path.display())),
        None => Ok(EditorConfig::default()),
    }
}

fn read(path: &Path) -> Result<Vec<u8>> {
    std::fs::read(path).with_context(|| format!("reading {}", path.display()))
}

fn write(path: &Path, bytes: &[u8]) -> Result<()> {
    std::fs::write(path, bytes).with_context(|| format!("writing {}", path.display()))
}

/// Runs one command and returns the line printed on success.
fn run(cli: Cli) -> Result<String> {
    let config = load_config(cli.config.as_deref())?;
    let editor = PdfEditor::from_config(&config);

    match cli.command {
        Commands::Merge { output, inputs } => {
            let buffers = inputs.iter().map(|p| read(p)).collect::<Result<Vec<_>>>()?;
            let slices: Vec<&[u8]> = buffers.iter().map(Vec::as_slice).collect();
            let merged = editor.merge(&slices).context("merging PDFs")?;
            write(&output, &merged)?;
            Ok(format!("Successfully merged {} files into {}", inputs.len(), output.display()))
        }
        Commands::Split { input, output_prefix, start, end } => {
            let bytes = read(&input)?;
            let outputs = editor
                .split(&bytes, start, end, &output_prefix)
                .with_context(|| format!("splitting {}", input.display()))?;
            if let Some(parent) = Path::new(&output_prefix).parent() {
                if !parent.as_os_str().is_empty() {
                    std::fs::create_dir_all(parent)
                        .with_context(|| format!("creating {}", parent.display()))?;
                }
            }
            for out in &outputs {
                write(Path::new(&out.name), &out.bytes)?;
            }
            Ok(format!(
                "Successfully split {} into {} files",
                input.display(),
                outputs.len()
            ))
        }
        Commands::Rotate { input, output, angle } => {
            let rotated = editor
                .rotate(&read(&input)?, angle)
                .with_context(|| format!("rotating {}", input.display()))?;
            write(&output, &rotated)?;
            Ok(format!("Successfully rotated {} into {}", input.display(), output.display()))
        }
        Commands::Remove { input, output, pages } => {
            let pages = parse_page_list(&pages.join(",")).context("parsing page list")?;
            let kept = editor
                .remove_pages(&read(&input)?, &pages)
                .with_context(|| format!("removing pages from {}", input.display()))?;
            write(&output, &kept)?;
            Ok(format!("Successfully removed pages into {}", output.display()))
        }
        Commands::AddText { input, output, text, x, y, page } => {
            let edited = editor
                .add_text(&read(&input)?, page, &text, x, y)
                .with_context(|| format!("adding text to {}", input.display()))?;
            write(&output, &edited)?;
            Ok(format!("Successfully added text into {}", output.display()))
        }
        Commands::ApplyEdits { input, output, edits } => {
            let json = std::fs::read_to_string(&edits)
                .with_context(|| format!("reading {}", edits.display()))?;
            let edits = parse_edits_json(&json)?;
            let edited = editor
                .apply_edits(&read(&input)?, &edits)
                .with_context(|| format!("editing {}", input.display()))?;
            write(&output, &edited)?;
            Ok(format!("Successfully applied {} edits into {}", edits.len(), output.display()))
        }
        Commands::Watermark { input, watermark, output } => {
            let stamped = editor
                .watermark(&read(&input)?, &read(&watermark)?)
                .with_context(|| format!("watermarking {}", input.display()))?;
            write(&output, &stamped)?;
            Ok(format!("Successfully watermarked into {}", output.display()))
        }
        Commands::BatchRotate { inputs, out_dir, angle } => {
            let written = parallel::process_files(&inputs, &out_dir, |bytes| editor.rotate(bytes, angle))
                .context("batch rotate")?;
            Ok(format!("Successfully rotated {} files into {}", written.len(), out_dir.display()))
        }
        Commands::BatchWatermark { inputs, watermark, out_dir } => {
            let stamp = read(&watermark)?;
            let written = parallel::process_files(&inputs, &out_dir, |bytes| editor.watermark(bytes, &stamp))
                .context("batch watermark")?;
            Ok(format!(
                "Successfully watermarked {} files into {}",
                written.len(),
                out_dir.display()
            ))
        }
    }
}
