//! CLI binary for the wiki-library exporter.
//!
//! A thin shim over `wikidocx_engine` that maps CLI flags to
//! `PipelineOptions`, prompts for a password when one was not supplied,
//! and turns any pipeline failure into exit code 1.

use std::io::{self, BufRead, Write};
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use log::LevelFilter;
use wikidocx_engine::{Credentials, FetchSettings, MhtDocxConverter, PipelineOptions};

#[derive(Parser, Debug)]
#[command(
    name = "wikidocx",
    version,
    about = "Export a SharePoint wiki library to a single DOCX file"
)]
struct Cli {
    /// The site URL, e.g. https://contoso.sharepoint.com/sites/docs
    #[arg(short, long)]
    site: String,

    /// The name of the library (no spaces), e.g. "GeneralGuides"
    #[arg(short, long)]
    library: String,

    /// SharePoint Online username, e.g. jane.doe@contoso.com
    #[arg(short, long)]
    username: String,

    /// SharePoint Online password (prompted when omitted)
    #[arg(short, long)]
    password: Option<String>,

    /// The file to save the DOCX output to
    #[arg(short, long, default_value = "output.docx")]
    output: PathBuf,

    /// The file to save the combined HTML output to
    #[arg(short = 'c', long)]
    combined_html: Option<PathBuf>,

    /// Image library whose contents are matched against page images
    /// instead of fetching each image on demand
    #[arg(short = 'i', long)]
    image_library: Option<String>,

    /// Enable verbose logging
    #[arg(long)]
    verbose: bool,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    let level = if cli.verbose {
        LevelFilter::Debug
    } else {
        LevelFilter::Info
    };
    exporter_logging::initialize_terminal(level);

    if let Err(err) = run(cli).await {
        log::error!("{err:#}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<()> {
    let password = match cli.password {
        Some(password) => password,
        None => prompt_password()?,
    };

    let options = PipelineOptions {
        site: cli.site,
        library: cli.library,
        image_library: cli.image_library,
        output: cli.output,
        combined_html: cli.combined_html,
        fetch: FetchSettings::default(),
    };
    let credentials = Credentials {
        username: cli.username,
        password,
    };

    let report = wikidocx_engine::run(&options, &credentials, &MhtDocxConverter).await?;
    log::info!(
        "wrote {} pages to {}",
        report.page_count,
        report.output_path.display()
    );
    Ok(())
}

fn prompt_password() -> Result<String> {
    let mut stdout = io::stdout();
    writeln!(stdout, "Please enter your password")?;
    stdout.flush()?;
    let mut line = String::new();
    io::stdin()
        .lock()
        .read_line(&mut line)
        .context("reading password from stdin")?;
    Ok(line.trim_end_matches(['\r', '\n']).to_string())
}
