//! runreport: test run report CLI

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use colored::Colorize;
use runreport::aggregate::{AggregatedReport, Status};
use runreport::collector::ReportSession;
use runreport::config::{self, load_config, CliOverrides, Config};
use runreport::events;
use runreport::history::{self, ManifestEntry};
use runreport::logging::init_logging;
use runreport::reporter::{render_documents, ConsoleReporter, JsonReporter, ReportView};
use runreport::writer::RunWriter;
use runreport::{Environment, RunStatus};
use std::fs::File;
use std::io::{self, BufReader};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

/// runreport: aggregate end-to-end test runs into interactive reports
#[derive(Parser, Debug)]
#[command(name = "runreport")]
#[command(author, version, about, long_about = None)]
struct Args {
    #[command(subcommand)]
    command: Commands,

    /// Path to config file (default: search .runreportrc.json in current dir and parents)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Report root directory (overrides outputDir from config)
    #[arg(long, short = 'o', global = true)]
    output_dir: Option<PathBuf>,

    /// Verbose logging
    #[arg(long, short, global = true)]
    verbose: bool,

    /// Quiet mode (minimal output)
    #[arg(long, short, global = true)]
    quiet: bool,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Replay a JSON Lines event stream and write the run report
    Ingest {
        /// Event stream file, or "-" for stdin
        events: PathBuf,

        /// Print a machine-readable summary instead of the console summary
        #[arg(long, short)]
        json: bool,

        /// Pretty-print JSON output
        #[arg(long)]
        pretty: bool,

        /// Exit 1 when any topic is classified as fail
        #[arg(long)]
        fail_on_blocking: bool,

        /// Report title
        #[arg(long)]
        title: Option<String>,

        /// Site under test
        #[arg(long)]
        site: Option<String>,

        /// Check profile name
        #[arg(long)]
        profile: Option<String>,

        /// Panel shown on open: summary, tests, or a topic base name
        #[arg(long)]
        initial_view: Option<String>,

        /// Use this run id instead of a generated one
        #[arg(long)]
        run_id: Option<String>,

        /// Disable colored console output
        #[arg(long)]
        no_color: bool,
    },

    /// Print the path of the latest (or a named) report
    Show {
        /// Run id or unique prefix (default: latest run)
        run_id: Option<String>,

        /// Open the report with the platform opener
        #[arg(long)]
        open: bool,
    },

    /// List recorded runs, newest first
    List {
        /// Show at most N runs
        #[arg(long, short = 'n')]
        limit: Option<usize>,

        /// Print the manifest entries as JSON
        #[arg(long, short)]
        json: bool,
    },

    /// Rebuild the manifest and latest pointer from run directories
    Reindex,

    /// Create .runreportrc.json with sensible defaults
    Init {
        /// Overwrite an existing config file
        #[arg(long)]
        force: bool,

        /// Directory in which to create config (default: current)
        #[arg(long)]
        dir: Option<PathBuf>,
    },
}

fn main() -> ExitCode {
    let args = Args::parse();
    init_logging(args.verbose, args.quiet);
    match run(args) {
        Ok(code) => code,
        Err(e) => {
            eprintln!("{}: {:#}", "Error".red().bold(), e);
            ExitCode::from(2)
        }
    }
}

fn run(args: Args) -> Result<ExitCode> {
    let cwd = std::env::current_dir().context("Failed to get current directory")?;

    let load = || load_config(&cwd, args.config.as_deref());
    match args.command {
        Commands::Ingest {
            events,
            json,
            pretty,
            fail_on_blocking,
            title,
            site,
            profile,
            initial_view,
            run_id,
            no_color,
        } => {
            let config = load()?.merge_with_cli(CliOverrides {
                output_dir: args.output_dir.clone(),
                title,
                site,
                profile,
                initial_view,
            });
            let opts = IngestOptions {
                json,
                pretty,
                fail_on_blocking,
                run_id,
                no_color,
                verbose: args.verbose,
                quiet: args.quiet,
            };
            run_ingest(&config, &events, &opts)
        }
        Commands::Show { run_id, open } => {
            let root = output_root(load()?, args.output_dir.clone());
            run_show(&root, run_id.as_deref(), open, args.quiet)
        }
        Commands::List { limit, json } => {
            let root = output_root(load()?, args.output_dir.clone());
            run_list(&root, limit, json)
        }
        Commands::Reindex => {
            let root = output_root(load()?, args.output_dir.clone());
            run_reindex(&root, args.quiet)
        }
        Commands::Init { force, dir } => run_init(dir.as_deref().unwrap_or(&cwd), force, args.quiet),
    }
}

fn output_root(config: Config, cli: Option<PathBuf>) -> PathBuf {
    config
        .merge_with_cli(CliOverrides {
            output_dir: cli,
            ..CliOverrides::default()
        })
        .output_dir()
}

struct IngestOptions {
    json: bool,
    pretty: bool,
    fail_on_blocking: bool,
    run_id: Option<String>,
    no_color: bool,
    verbose: bool,
    quiet: bool,
}

fn run_ingest(config: &Config, events_path: &Path, opts: &IngestOptions) -> Result<ExitCode> {
    let aggregate_options = config::aggregate_options(config)?;

    let mut session = ReportSession::new(config.inline_limits())
        .with_title(config.title.clone())
        .with_environment(Environment::detect(config.site.clone(), config.profile.clone()));
    if let Some(id) = &opts.run_id {
        session = session.with_run_id(id.clone());
    }

    let run = if events_path == Path::new("-") {
        let cwd = std::env::current_dir().context("Failed to get current directory")?;
        events::replay(io::stdin().lock(), &cwd, session)?
    } else {
        let file = File::open(events_path)
            .with_context(|| format!("Failed to open event stream: {}", events_path.display()))?;
        let base_dir = events_path.parent().unwrap_or(Path::new("."));
        events::replay(BufReader::new(file), base_dir, session)?
    };

    let report = AggregatedReport::from_run(&run, &aggregate_options);
    let view = ReportView::new(&report, config.initial_view.as_deref());
    let docs = render_documents(&run, &report, &view);
    let written = RunWriter::new(config.output_dir())
        .write(&run, &report, &docs)
        .context("Failed to write run report")?;
    let report_path = written.report_path.display().to_string();

    if opts.json {
        let reporter = if opts.pretty {
            JsonReporter::new().pretty()
        } else {
            JsonReporter::new()
        };
        println!("{}", reporter.report(&run, &report, Some(report_path)));
    } else if opts.quiet {
        println!("{}", report_path);
    } else {
        let mut reporter = ConsoleReporter::new();
        if opts.no_color {
            reporter = reporter.without_colors();
        }
        if opts.verbose {
            reporter = reporter.verbose();
        }
        reporter.report(&run, &report, Some(&report_path));
    }

    if opts.fail_on_blocking && report.overall_status() == Status::Fail {
        return Ok(ExitCode::from(1));
    }
    Ok(ExitCode::SUCCESS)
}

fn run_show(root: &Path, run_id: Option<&str>, open: bool, quiet: bool) -> Result<ExitCode> {
    let relative = match run_id {
        Some(id) => {
            let manifest = history::load_manifest(root);
            match history::find_entry(&manifest, id) {
                Some(entry) => entry.report_path.clone(),
                None => anyhow::bail!("No run matching '{}' in {}", id, root.display()),
            }
        }
        None => match history::load_latest(root) {
            Some(latest) => latest.entry.report_path,
            None => anyhow::bail!(
                "No reports found in {} (run `runreport ingest` or `runreport reindex`)",
                root.display()
            ),
        },
    };

    let path = root.join(relative);
    if !path.exists() {
        anyhow::bail!("Report file is missing: {}", path.display());
    }
    println!("{}", path.display());

    if open {
        open_in_browser(&path)?;
        if !quiet {
            eprintln!("{}: Opened {}", "Info".blue(), path.display());
        }
    }
    Ok(ExitCode::SUCCESS)
}

fn open_in_browser(path: &Path) -> Result<()> {
    let mut cmd = if cfg!(target_os = "macos") {
        std::process::Command::new("open")
    } else if cfg!(target_os = "windows") {
        let mut c = std::process::Command::new("cmd");
        c.args(["/C", "start", ""]);
        c
    } else {
        std::process::Command::new("xdg-open")
    };
    let status = cmd
        .arg(path)
        .status()
        .with_context(|| format!("Failed to launch opener for {}", path.display()))?;
    if !status.success() {
        anyhow::bail!("Opener exited with {} for {}", status, path.display());
    }
    Ok(())
}

fn run_list(root: &Path, limit: Option<usize>, json: bool) -> Result<ExitCode> {
    let manifest = history::load_manifest(root);
    let shown: Vec<&ManifestEntry> = manifest.iter().take(limit.unwrap_or(usize::MAX)).collect();

    if json {
        println!(
            "{}",
            serde_json::to_string_pretty(&shown).context("Failed to serialize manifest")?
        );
        return Ok(ExitCode::SUCCESS);
    }
    if shown.is_empty() {
        eprintln!("{}: No runs recorded in {}", "Info".blue(), root.display());
        return Ok(ExitCode::SUCCESS);
    }

    for entry in shown {
        let status = match entry.status {
            RunStatus::Passed => entry.status.to_string().green(),
            RunStatus::Failed => entry.status.to_string().red(),
            RunStatus::Interrupted => entry.status.to_string().yellow(),
        };
        let topics = match entry.topic_status {
            Some(Status::Pass) => "pass".green(),
            Some(Status::Warn) => "warn".yellow(),
            Some(Status::Fail) => "fail".red(),
            None => "-".dimmed(),
        };
        let c = &entry.counts;
        println!(
            "{}  {}  {:<11}  topics {:<4}  {} passed, {} failed, {} flaky, {} skipped  {}",
            entry.run_id.bold(),
            entry.started_at.format("%Y-%m-%d %H:%M"),
            status,
            topics,
            c.passed,
            c.failed + c.timed_out,
            c.flaky,
            c.skipped,
            entry.title.as_deref().unwrap_or("").dimmed()
        );
    }
    Ok(ExitCode::SUCCESS)
}

fn run_reindex(root: &Path, quiet: bool) -> Result<ExitCode> {
    let manifest = history::rebuild(root)?;
    if !quiet {
        println!(
            "{}: Indexed {} run(s) in {}",
            "Done".green().bold(),
            manifest.len(),
            root.display()
        );
    }
    Ok(ExitCode::SUCCESS)
}

fn run_init(dir: &Path, force: bool, quiet: bool) -> Result<ExitCode> {
    let path = config::write_default_config(dir, force)?;
    if !quiet {
        println!("{}: Created {}", "Done".green().bold(), path.display());
    }
    Ok(ExitCode::SUCCESS)
}
