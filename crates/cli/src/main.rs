use std::fs;
use std::io::{self, Read};
use std::path::PathBuf;
use std::str::FromStr;
use std::time::{Duration, Instant};

use anyhow::{Context, bail};
use clap::Parser;
use juscrape_core::{
    CancelToken, Case, CourtAdapter, CourtSystem, FetchConfig, FrameSnapshot, HttpFetcher, Pje1gTjba, Pje1gTrt5,
    ProjudiTjba, ScrapeConfig, ScriptedPage, try_fetch_case_info,
};
use owo_colors::OwoColorize;
use tracing_subscriber::EnvFilter;
use url::Url;

mod echo;
mod render;

use echo::{format_size, print_banner, print_case_summary, print_detail, print_info, print_step, print_success};

const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Output format for the case record
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum OutputFormat {
    Json,
    Text,
}

impl FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "json" => Ok(Self::Json),
            "text" | "txt" => Ok(Self::Text),
            _ => Err(format!("Invalid format: {}. Valid options: json, text", s)),
        }
    }
}

/// Court system named on the command line
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct SystemArg(CourtSystem);

impl FromStr for SystemArg {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "projudi" | "projudi-tjba" => Ok(Self(CourtSystem::ProjudiTjba)),
            "pje-tjba" | "pje1g-tjba" => Ok(Self(CourtSystem::Pje1gTjba)),
            "pje-trt5" | "pje1g-trt5" => Ok(Self(CourtSystem::Pje1gTrt5)),
            _ => Err(format!("Invalid system: {}. Valid options: projudi, pje-tjba, pje-trt5", s)),
        }
    }
}

/// A nested frame snapshot given as `SELECTOR=FILE`
#[derive(Debug, Clone)]
struct FrameArg {
    selector: String,
    path: PathBuf,
}

impl FromStr for FrameArg {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.rsplit_once('=') {
            Some((selector, path)) if !selector.trim().is_empty() && !path.trim().is_empty() => {
                Ok(Self { selector: selector.trim().to_string(), path: PathBuf::from(path.trim()) })
            }
            _ => Err(format!("Invalid frame: {}. Expected SELECTOR=FILE", s)),
        }
    }
}

/// Extract the case record shown on a saved court-system page
#[derive(Parser, Debug)]
#[command(name = "juscrape")]
#[command(version = "0.1.0")]
#[command(about = "Extract case records from saved court-system pages", long_about = None)]
struct Args {
    /// Saved HTML snapshot of the case page, or "-" for stdin
    #[arg(value_name = "INPUT")]
    input: String,

    /// Court system (projudi, pje-tjba, pje-trt5); inferred from --url when omitted
    #[arg(short, long, value_name = "SYSTEM")]
    system: Option<SystemArg>,

    /// URL the snapshot was taken from
    #[arg(long, value_name = "URL")]
    url: Option<String>,

    /// Nested frame snapshot, as SELECTOR=FILE (repeatable)
    #[arg(long, value_name = "SELECTOR=FILE")]
    frame: Vec<FrameArg>,

    /// Output format (json, text)
    #[arg(short, long, default_value = "json", value_name = "FORMAT")]
    format: OutputFormat,

    /// Readiness and HTTP timeout in seconds
    #[arg(long, default_value = "30", value_name = "SECS")]
    timeout: u64,

    /// Do not open docket documents
    #[arg(long)]
    skip_documents: bool,

    /// Output file (default: stdout)
    #[arg(short, long, value_name = "FILE")]
    output: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long)]
    verbose: bool,
}

fn init_logging(verbose: bool) {
    let fallback = if verbose { "juscrape_core=debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(fallback)))
        .with_writer(io::stderr)
        .init();
}

/// Picks the court system from `--system`, or from the host of `--url`.
fn resolve_system(system: Option<SystemArg>, url: Option<&str>) -> anyhow::Result<CourtSystem> {
    if let Some(SystemArg(system)) = system {
        return Ok(system);
    }
    let Some(url) = url else {
        bail!("Either --system or --url is required");
    };

    let parsed = Url::parse(url).with_context(|| format!("Invalid URL: {}", url))?;
    let host = parsed.host_str().with_context(|| format!("URL has no host: {}", url))?;
    CourtSystem::from_host(host).with_context(|| format!("Unknown court system host: {}", host))
}

fn load_frames(frames: &[FrameArg]) -> anyhow::Result<Vec<(String, FrameSnapshot)>> {
    frames
        .iter()
        .map(|frame| {
            let html = fs::read_to_string(&frame.path)
                .with_context(|| format!("Failed to read frame file: {}", frame.path.display()))?;
            Ok((frame.selector.clone(), FrameSnapshot::complete(html)))
        })
        .collect()
}

/// Runs `adapter` over the snapshot.
///
/// Without a URL the page pretends to sit at the system's case path, so
/// that the homepage guard accepts it.
async fn extract<A: CourtAdapter>(
    adapter: &A, url: Option<&str>, html: &str, frames: Vec<(String, FrameSnapshot)>, config: &ScrapeConfig,
    cancel: &CancelToken,
) -> anyhow::Result<Case> {
    let url = match url {
        Some(url) => url.to_string(),
        None => format!("https://{}{}", adapter.system().host(), adapter.homepage_rules().required_path),
    };

    let mut page = ScriptedPage::new(url, html);
    for (selector, frame) in frames {
        page = page.with_frame(selector, frame);
    }

    try_fetch_case_info(adapter, &page, config, cancel)
        .await
        .context("No case record could be extracted")
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    init_logging(args.verbose);

    if args.verbose {
        print_banner();
        print_info("Debug logging enabled");
        eprintln!();
    }

    let html = if args.input == "-" {
        if args.verbose {
            print_step(1, 4, "Reading from stdin");
        }
        let mut buffer = String::new();
        io::stdin()
            .read_to_string(&mut buffer)
            .context("Failed to read from stdin")?;
        buffer
    } else {
        if args.verbose {
            print_step(1, 4, &format!("Reading from file {}", args.input.bright_white()));
        }
        fs::read_to_string(&args.input).with_context(|| format!("Failed to read file: {}", args.input))?
    };

    if args.verbose {
        print_detail("Size", &format_size(html.len()));
        eprintln!();
        print_step(2, 4, "Resolving court system");
    }

    let system = resolve_system(args.system, args.url.as_deref())?;
    let frames = load_frames(&args.frame)?;

    if args.verbose {
        print_detail("System", system.id());
        for (selector, _) in &frames {
            print_detail("Frame", selector);
        }
        eprintln!();
        print_step(3, 4, "Extracting case record");
    }

    let timeout = Duration::from_secs(args.timeout);
    let config = ScrapeConfig::builder()
        .wait_timeout(timeout)
        .fetch_documents(!args.skip_documents)
        .fetch(FetchConfig { timeout: args.timeout, ..Default::default() })
        .build();

    let cancel = CancelToken::new();
    let on_interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            on_interrupt.cancel();
        }
    });

    let started = Instant::now();
    let url = args.url.as_deref();
    let case = match system {
        CourtSystem::ProjudiTjba => {
            let fetcher = HttpFetcher::new(config.fetch.clone()).context("Failed to build HTTP client")?;
            extract(&ProjudiTjba::new(fetcher), url, &html, frames, &config, &cancel).await?
        }
        CourtSystem::Pje1gTjba => extract(&Pje1gTjba::new(), url, &html, frames, &config, &cancel).await?,
        CourtSystem::Pje1gTrt5 => extract(&Pje1gTrt5::new(), url, &html, frames, &config, &cancel).await?,
    };

    if args.verbose {
        print_case_summary(&case, started.elapsed());
        print_step(4, 4, "Writing output");
        print_detail("Format", &format!("{:?}", args.format));
        eprintln!();
    }

    let output = match args.format {
        OutputFormat::Json => format!("{:#}\n", case.to_json().context("Failed to serialize case")?),
        OutputFormat::Text => render::render_text(&case).context("Failed to render case")?,
    };

    match args.output {
        Some(path) => {
            fs::write(&path, output).with_context(|| format!("Failed to write to file: {}", path.display()))?;
            print_success(&format!("Output written to {}", path.display().bright_white()));
        }
        None => {
            print!("{}", output);
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frame_arg() {
        let frame: FrameArg = "iframe[name=frameHtml]=doc.html".parse().unwrap();
        assert_eq!(frame.selector, "iframe[name=frameHtml]");
        assert_eq!(frame.path, PathBuf::from("doc.html"));

        assert!("doc.html".parse::<FrameArg>().is_err());
        assert!("#frameHtml=".parse::<FrameArg>().is_err());
    }

    #[test]
    fn test_resolve_system() {
        let url = "https://pje.trt5.jus.br/pjekz/processo/1/detalhe";
        assert_eq!(resolve_system(None, Some(url)).unwrap(), CourtSystem::Pje1gTrt5);
        assert_eq!(
            resolve_system(Some(SystemArg(CourtSystem::ProjudiTjba)), Some(url)).unwrap(),
            CourtSystem::ProjudiTjba
        );
        assert!(resolve_system(None, Some("https://example.com/processo")).is_err());
        assert!(resolve_system(None, None).is_err());
    }
}
