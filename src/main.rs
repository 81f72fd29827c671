use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Args, Parser, Subcommand};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, Lines, Stdin};
use tracing_subscriber::EnvFilter;

use chapter_harvest::{Config, Error, Pipeline, WebDriverSource, release_source};

/// Pull chapter images out of the book editor
#[derive(Parser, Debug)]
#[command(name = "chapter-harvest", version, about)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    #[command(flatten)]
    common: CommonArgs,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Assemble every chapter's images into one graphics bundle document
    Bundle,
    /// Download every chapter's images into `<book>/Chapter N/`
    Images {
        /// Book identifier, used as the root directory and file name prefix
        #[arg(short, long)]
        book: Option<String>,
    },
}

#[derive(Args, Debug)]
struct CommonArgs {
    /// Chapter list URL of the book; prompted for when omitted
    #[arg(short, long, global = true)]
    url: Option<String>,

    /// Directory the output is written into
    #[arg(short, long, global = true, default_value = ".")]
    out: PathBuf,

    /// JSON configuration file; unset fields keep their defaults
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// WebDriver endpoint, overriding the configuration
    #[arg(long, global = true)]
    webdriver: Option<String>,

    /// Print the run report as JSON instead of a summary
    #[arg(long, global = true, default_value_t = false)]
    json: bool,

    /// More log output (-v info, -vv debug, -vvv trace)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.common.verbose);

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            match &e {
                Error::StructuralUnavailable { element, .. } => {
                    eprintln!("Failed to find {element}. Are we on the right page?");
                }
                other => eprintln!("Error: {other}"),
            }
            ExitCode::FAILURE
        }
    }
}

fn init_tracing(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("{level},hyper=warn,reqwest=warn")));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

async fn run(cli: Cli) -> chapter_harvest::Result<()> {
    let Cli { command, common } = cli;

    let mut config = match &common.config {
        Some(path) => Config::from_file(path)?,
        None => Config::default(),
    };
    if let Some(endpoint) = common.webdriver {
        config.webdriver.endpoint = endpoint;
    }
    if common.json {
        config.show_progress = false;
    }
    let pipeline = Pipeline::new(config)?;

    let mut stdin = BufReader::new(tokio::io::stdin()).lines();
    match &command {
        Command::Bundle => say("Welcome to Graphics Bundle Creator...").await?,
        Command::Images { .. } => say("Welcome to Image Downloader...").await?,
    }

    let book = match &command {
        Command::Images { book: Some(book) } => Some(book.clone()),
        Command::Images { book: None } => {
            Some(prompt(&mut stdin, "Please enter the book code (e.g. B01234)").await?)
        }
        Command::Bundle => None,
    };
    let url = match common.url {
        Some(url) => url,
        None => prompt(&mut stdin, "Please enter the Chapter list URL for your book").await?,
    };
    url::Url::parse(&url).map_err(|e| Error::InvalidUrl {
        url: url.clone(),
        reason: e.to_string(),
    })?;

    let mut source = WebDriverSource::connect(pipeline.config()).await?;
    let login = async {
        source.open(&url).await?;
        say("I cannot log in by myself, please log in in the browser window.").await?;
        say("If you are already logged in, just press Enter.").await?;
        prompt(&mut stdin, "Press Enter when you are done...").await
    };
    if let Err(e) = login.await {
        release_source(&mut source).await;
        return Err(e);
    }

    match book {
        None => {
            let report = pipeline.run_bundle(&mut source, &url, &common.out).await?;
            if common.json {
                say(&serde_json::to_string_pretty(&report)?).await?;
            } else {
                let failed = report.failures().len();
                say(&format!(
                    "Graphics bundle for {} chapters written to {}{}",
                    report.units.len(),
                    report.path.display(),
                    failure_note(failed)
                ))
                .await?;
            }
        }
        Some(book) => {
            let report = pipeline
                .run_download(&mut source, &url, &book, &common.out)
                .await?;
            if common.json {
                say(&serde_json::to_string_pretty(&report)?).await?;
            } else {
                for failure in report.failures() {
                    say(&format!(
                        "Chapter #{} image {}: {}",
                        failure.unit, failure.ordinal, failure.cause
                    ))
                    .await?;
                }
                for unit in report.failed_units() {
                    if let Some(error) = &unit.error {
                        say(&format!("Chapter #{} skipped: {error}", unit.ordinal)).await?;
                    }
                }
                say(&format!(
                    "{} images written to {} folder{}",
                    report.files_written(),
                    report.root.display(),
                    failure_note(report.failures().len())
                ))
                .await?;
            }
        }
    }
    Ok(())
}

fn failure_note(failed: usize) -> String {
    match failed {
        0 => String::new(),
        1 => " (1 image failed)".to_string(),
        n => format!(" ({n} images failed)"),
    }
}

async fn say(line: &str) -> chapter_harvest::Result<()> {
    let mut stdout = tokio::io::stdout();
    stdout.write_all(line.as_bytes()).await?;
    stdout.write_all(b"\n").await?;
    stdout.flush().await?;
    Ok(())
}

async fn prompt(stdin: &mut Lines<BufReader<Stdin>>, question: &str) -> chapter_harvest::Result<String> {
    say(question).await?;
    let line = stdin.next_line().await?.unwrap_or_default();
    Ok(line.trim().to_string())
}
