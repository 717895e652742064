use std::error::Error;
use std::fs;
use std::io::{self, Read};
use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use store_report::{GenerateRequest, ReportModule, ReportService, Settings};

/// Turns generated store-analysis reports into single-page PDFs.
///
/// Upstream access and rendering are configured through environment variables
/// (`UPSTREAM_API_KEY`, `UPSTREAM_BASE_URL`, `REPORT_FONTS_DIR`, ...). Fonts are also looked up
/// under `assets/fonts` next to the binary.
#[derive(Parser)]
#[command(author, version, about = "Compile generated store reports into PDF")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Render a previously generated response. Invalid JSON is repaired once via the upstream.
    Render {
        /// Report module: brand, market, store-activity or data-statistics.
        #[arg(short, long)]
        module: String,
        /// File holding the generated text; `-` reads standard input.
        #[arg(short, long, default_value = "-")]
        input: String,
        /// Output path; defaults to `<store>_<module name>.pdf`.
        #[arg(short, long)]
        output: Option<PathBuf>,
        /// Fixed page height in millimetres.
        #[arg(long)]
        page_height: Option<f64>,
    },

    /// Generate a new report from form fields and render it.
    Generate {
        #[arg(short, long)]
        module: ReportModule,
        /// JSON file with the form fields.
        #[arg(short, long)]
        payload: PathBuf,
        /// Screenshot for market reports, as a `data:` URL.
        #[arg(long)]
        image_url: Option<String>,
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Print the page height a generated response would be rendered at.
    Estimate {
        #[arg(short, long)]
        module: String,
        #[arg(short, long, default_value = "-")]
        input: String,
    },
}

#[tokio::main]
async fn main() {
    env_logger::init();
    let cli = Cli::parse();

    if let Err(err) = run(cli).await {
        eprintln!("Error: {}", err);
        print_error_sources(err.as_ref());
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), Box<dyn Error>> {
    let mut settings = Settings::from_env();

    match cli.command {
        Commands::Render {
            module,
            input,
            output,
            page_height,
        } => {
            if page_height.is_some() {
                settings.page_height_override = page_height;
            }
            let service = ReportService::from_settings(settings)?;
            let raw = read_input(&input)?;
            let report = service.compile_response(&module, &raw).await?;
            write_report(output, &report.filename, &report.bytes, report.page_height_mm)
        }
        Commands::Generate {
            module,
            payload,
            image_url,
            output,
        } => {
            let service = ReportService::from_settings(settings)?;
            let payload: serde_json::Value = serde_json::from_str(&fs::read_to_string(&payload)?)?;
            let request = GenerateRequest {
                module,
                payload,
                image_data_url: image_url,
            };
            let report = service.generate(&request).await?;
            write_report(output, &report.filename, &report.bytes, report.page_height_mm)
        }
        Commands::Estimate { module, input } => {
            let service = ReportService::from_settings(settings)?;
            let raw = read_input(&input)?;
            let timeout = service.settings().request_timeout;
            let structure = service.resolve_structure(&module, &raw, timeout).await?;
            println!("{:.1}", service.estimate(&module, structure));
            Ok(())
        }
    }
}

fn read_input(input: &str) -> io::Result<String> {
    if input == "-" {
        let mut text = String::new();
        io::stdin().read_to_string(&mut text)?;
        Ok(text)
    } else {
        fs::read_to_string(input)
    }
}

fn write_report(
    output: Option<PathBuf>,
    filename: &str,
    bytes: &[u8],
    page_height: f64,
) -> Result<(), Box<dyn Error>> {
    let path = output.unwrap_or_else(|| Path::new(filename).to_path_buf());
    fs::write(&path, bytes)?;
    println!(
        "Wrote {} ({} bytes, page height {:.1} mm)",
        path.display(),
        bytes.len(),
        page_height
    );
    Ok(())
}

fn print_error_sources(mut error: &(dyn Error + 'static)) {
    while let Some(source) = error.source() {
        eprintln!("  caused by: {}", source);
        error = source;
    }
}
