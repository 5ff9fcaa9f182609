use std::fs;
use std::io::{self, IsTerminal, Read, Write};
use std::path::PathBuf;

use anyhow::{Context, Result, anyhow};
use clap::Parser;

#[derive(Parser, Debug)]
#[command(
    name = "pdf-overlay",
    version,
    about = "Lay translated text out over the pages of a document"
)]
struct Cli {
    /// Original document (PDF pages are reused; other files start a new PDF)
    #[arg(short = 's', long = "source")]
    source: Option<PathBuf>,

    /// Translated text, with **bold** markup (default: stdin)
    #[arg(short = 't', long = "text")]
    text: Option<PathBuf>,

    /// Mime type of --source (auto, pdf, txt, png, jpg, gif, webp, bmp, tiff or type/subtype)
    #[arg(short = 'M', long = "mime", default_value = "auto")]
    mime: String,

    /// Where to write the PDF (default: stdout)
    #[arg(short = 'o', long = "output")]
    output: Option<PathBuf>,

    /// Font size in points; the line height scales with it
    #[arg(long = "font-size")]
    font_size: Option<f32>,

    /// Read extra settings from a local TOML file
    #[arg(short = 'r', long = "read-settings")]
    read_settings: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(long = "verbose")]
    verbose: bool,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    pdf_overlay::logging::init(cli.verbose)?;

    let mut settings = pdf_overlay::settings::load_settings(cli.read_settings.as_deref())?;
    if let Some(size) = cli.font_size {
        if !size.is_finite() || size <= 0.0 {
            return Err(anyhow!("--font-size must be positive"));
        }
        let line_height = settings.effective_line_height() * size / settings.font_size;
        settings.font_size = size;
        settings.line_height = Some(line_height);
    }
    let options = settings.layout_options()?;

    if cli.output.is_none() && io::stdout().is_terminal() {
        return Err(anyhow!("refusing to write a PDF to the terminal; use --output"));
    }

    let text = read_text(&cli)?;
    let source = match cli.source.as_deref() {
        Some(path) => Some(
            fs::read(path).with_context(|| format!("failed to read source: {}", path.display()))?,
        ),
        None => None,
    };
    let mime = pdf_overlay::mime::resolve_mime(
        &cli.mime,
        source.as_deref().unwrap_or_default(),
        cli.source.as_deref(),
    )?;

    let pdf = pdf_overlay::layout(source.as_deref(), &text, &mime, &options)
        .with_context(|| "failed to render document")?;

    match cli.output {
        Some(path) => fs::write(&path, &pdf)
            .with_context(|| format!("failed to write output: {}", path.display()))?,
        None => {
            let mut stdout = io::stdout().lock();
            stdout.write_all(&pdf)?;
            stdout.flush()?;
        }
    }
    Ok(())
}

fn read_text(cli: &Cli) -> Result<String> {
    if let Some(path) = &cli.text {
        return fs::read_to_string(path)
            .with_context(|| format!("failed to read text: {}", path.display()));
    }
    if io::stdin().is_terminal() {
        return Err(anyhow!("no text given; pass --text or pipe it on stdin"));
    }
    let mut buffer = Vec::new();
    io::stdin().read_to_end(&mut buffer)?;
    String::from_utf8(buffer).map_err(|_| anyhow!("stdin must be UTF-8 text"))
}
