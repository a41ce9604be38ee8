use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use indicatif::{ProgressBar, ProgressStyle};
use std::io::{self, BufRead, IsTerminal, Write};
use std::time::Duration;
use tracing::{error, info, warn};

use unpop::dashboard::{self, Selection, Series, Summary};
use unpop::output::{self, TableRow};
use unpop::{Client, ClientConfig, Indicator, SIGNUP_URL, Session};

#[derive(Parser, Debug)]
#[command(
    name = "unpop",
    version,
    about = "Browse UN Population Division indicators from the terminal"
)]
struct Cli {
    /// Base API URL [env: UNPOP_API_URL]
    #[arg(long, global = true)]
    url: Option<String>,

    /// API token [env: UN_POPULATION_API_KEY]
    #[arg(long, global = true)]
    key: Option<String>,

    /// Skip TLS certificate verification
    #[arg(long, global = true)]
    insecure: bool,

    /// Request timeout in seconds
    #[arg(long, global = true)]
    timeout: Option<u64>,

    /// Never ask for a token on stdin
    #[arg(long, global = true)]
    no_prompt: bool,

    /// Hide the progress spinner
    #[arg(long, global = true)]
    no_progress: bool,

    #[arg(long, global = true, value_enum, default_value_t = Format::Table)]
    format: Format,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// List indicators, optionally filtered by name
    Indicators {
        #[arg(short, long, default_value = "")]
        search: String,
    },
    /// List available targets (countries, regions, groupings)
    Targets,
    /// Show location ids found in the total population series
    Locations {
        #[arg(short, long, default_value_t = 10)]
        limit: usize,
    },
    /// Fetch indicator series; defaults to the first three search matches
    Fetch {
        /// Indicator names
        indicators: Vec<String>,
        #[arg(short, long, default_value = "")]
        search: String,
        /// Location ids (default: 900, World)
        #[arg(short, long = "location", value_delimiter = ',')]
        locations: Vec<i64>,
        /// Also print the combined table with normalized values
        #[arg(long)]
        compare: bool,
    },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum Format {
    Table,
    Csv,
    Json,
}

/// Reads a token from stdin when attached to a terminal.
struct StdinPrompt;

impl unpop::CredentialPrompt for StdinPrompt {
    fn request_token(&mut self) -> Option<String> {
        if !io::stdin().is_terminal() {
            return None;
        }
        eprintln!("UN Population API requires an API key for authentication.");
        eprintln!("You need to register for an API key at: {}", SIGNUP_URL);
        eprint!("Enter your UN Population API key: ");
        io::stderr().flush().ok();

        let mut line = String::new();
        io::stdin().lock().read_line(&mut line).ok()?;
        let token = line.trim();
        if token.is_empty() {
            None
        } else {
            Some(token.to_string())
        }
    }
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::WARN.into()),
        )
        .with_writer(io::stderr)
        .init();

    if let Err(e) = run(Cli::parse()) {
        error!("{:#}", e);
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> Result<()> {
    let verify = cli.insecure.then_some(false);
    let mut cfg = ClientConfig::load(cli.url.clone(), cli.key.clone(), verify)?;
    if let Some(secs) = cli.timeout {
        cfg = cfg.with_timeout(Duration::from_secs(secs))?;
    }

    let client = Client::new(&cfg)?;
    let mut session = Session::new(cfg.key.clone());
    if !cli.no_prompt {
        session = session.with_prompt(StdinPrompt);
    }

    let stdout = io::stdout();
    let out = stdout.lock();

    match cli.command {
        Commands::Indicators { search } => {
            let catalog = client.load_catalog(&mut session)?;
            if catalog.is_empty() {
                warn!("no indicators loaded; check your API key");
            }
            let wanted = dashboard::filter_indicators(catalog, &search);
            let rows: Vec<Indicator> = catalog
                .iter()
                .filter(|i| wanted.contains(&i.name.as_str()))
                .cloned()
                .collect();
            emit(cli.format, out, &rows)
        }
        Commands::Targets => {
            require_token(&mut session);
            let targets = client.targets(&mut session)?;
            if targets.is_empty() {
                warn!("no targets loaded; check your API key");
            }
            emit(cli.format, out, &targets)
        }
        Commands::Locations { limit } => {
            require_token(&mut session);
            let ids = client.top_populated_locations(&mut session, limit);
            let mut out = out;
            match cli.format {
                Format::Json => output::write_json(out, &ids),
                _ => {
                    for id in ids {
                        writeln!(out, "{}", id)?;
                    }
                    Ok(())
                }
            }
        }
        Commands::Fetch {
            indicators,
            search,
            locations,
            compare,
        } => {
            let catalog = match client.load_catalog(&mut session) {
                Ok(c) => c.clone(),
                Err(e) => {
                    error!("error loading indicators: {}", e);
                    Default::default()
                }
            };
            let selection = Selection::resolve(&catalog, &search, indicators, locations);
            if selection.indicators.is_empty() {
                warn!("please select at least one indicator to fetch");
                return Ok(());
            }
            let opts = FetchOptions {
                format: cli.format,
                progress: !cli.no_progress,
                compare,
            };
            fetch(opts, &client, &mut session, &selection, out)
        }
    }
}

fn require_token(session: &mut Session) {
    if !session.sign_in() {
        warn!("no API key available; results will fall back to defaults");
    }
}

struct FetchOptions {
    format: Format,
    progress: bool,
    compare: bool,
}

fn fetch<W: Write>(
    opts: FetchOptions,
    client: &Client,
    session: &mut Session,
    selection: &Selection,
    mut out: W,
) -> Result<()> {
    let spinner = spinner(opts.progress);
    let results = dashboard::fetch_selection(client, session, selection, |indicator| {
        if let Some(pb) = &spinner {
            pb.set_message(format!("Fetching data for {}...", indicator));
        }
    });
    if let Some(pb) = &spinner {
        pb.finish_and_clear();
    }

    let mut fetched = Vec::new();
    for (indicator, result) in results {
        match result {
            Ok(rows) if rows.is_empty() => warn!("no data available for {}", indicator),
            Ok(rows) => {
                info!(indicator = indicator.as_str(), rows = rows.len(), "fetched");
                fetched.push(Series {
                    indicator,
                    observations: rows,
                });
            }
            Err(e) => error!("{}", e),
        }
    }

    match (opts.format, fetched.as_slice()) {
        (Format::Table, _) => {
            for series in &fetched {
                writeln!(out, "## {}", series.indicator)?;
                output::write_table(&mut out, &series.observations)?;
                if let Some(summary) = Summary::of(&series.observations) {
                    write_summary(&mut out, &summary)?;
                }
                writeln!(out)?;
            }
        }
        // A single series keeps the plain four-column shape.
        (format, [series]) if !opts.compare => emit(format, &mut out, &series.observations)?,
        (format, _) if !opts.compare => emit(format, &mut out, &dashboard::compare(&fetched))?,
        _ => {}
    }

    if opts.compare {
        if fetched.len() < 2 {
            warn!("select at least two indicators to see a comparative view");
        } else {
            if opts.format == Format::Table {
                writeln!(out, "## Comparison of selected indicators")?;
            }
            emit(opts.format, &mut out, &dashboard::compare(&fetched))?;
        }
    }

    out.flush().context("failed to write output")
}

fn write_summary<W: Write>(out: &mut W, summary: &Summary) -> Result<()> {
    writeln!(out, "latest year: {}", summary.latest_year)?;
    match summary.latest_value {
        Some(v) => writeln!(out, "latest value: {:.2}", v)?,
        None => writeln!(out, "latest value: N/A")?,
    }
    if let Some(change) = summary.change {
        writeln!(
            out,
            "overall change: {:.2} ({:+.1}%)",
            change.absolute, change.percent
        )?;
    }
    Ok(())
}

fn emit<W, R>(format: Format, out: W, rows: &[R]) -> Result<()>
where
    W: Write,
    R: TableRow + serde::Serialize,
{
    match format {
        Format::Table => output::write_table(out, rows),
        Format::Csv => output::write_csv(out, rows),
        Format::Json => output::write_json(out, rows),
    }
}

fn spinner(enabled: bool) -> Option<ProgressBar> {
    if !enabled {
        return None;
    }
    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::with_template("{spinner:.green} {msg} [{elapsed}]")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    pb.enable_steady_tick(Duration::from_millis(120));
    Some(pb)
}
