use std::path::PathBuf;
use std::process::ExitCode;

use camino::Utf8PathBuf;
use clap::{Parser, ValueEnum};
use miette::IntoDiagnostic;
use tracing::{info, warn};

use birdcall_harvester::config::{ConfigLoader, SearchCriteria};
use birdcall_harvester::error::BirdcallError;
use birdcall_harvester::http::ReqwestHttpClient;
use birdcall_harvester::logging::{LogTarget, init_logging};
use birdcall_harvester::output::{JsonOutput, OutputMode, render_summary};
use birdcall_harvester::pipeline::{DownloadOrchestrator, DownloadSummary, RunPlan};
use birdcall_harvester::progress::NoProgress;
use birdcall_harvester::tui::Tui;

#[derive(Parser)]
#[command(name = "birdcall")]
#[command(about = "Download bird-call recordings from Xeno-Canto and the Macaulay Library")]
#[command(version, author)]
struct Cli {
    /// Config file (defaults to ./birdcall.json)
    #[arg(long)]
    config: Option<String>,

    #[arg(long)]
    download_dir: Option<Utf8PathBuf>,

    /// Replace files that already exist
    #[arg(long)]
    overwrite: bool,

    #[arg(long, value_enum, default_value_t = SourceArg::All)]
    source: SourceArg,

    #[arg(long)]
    non_interactive: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum SourceArg {
    Xeno,
    Ebird,
    All,
}

fn main() -> ExitCode {
    if let Err(report) = run() {
        eprintln!("{report:?}");
        if let Some(err) = report.downcast_ref::<BirdcallError>() {
            return ExitCode::from(map_exit_code(err));
        }
        return ExitCode::from(1);
    }
    ExitCode::SUCCESS
}

fn map_exit_code(error: &BirdcallError) -> u8 {
    match error {
        BirdcallError::ConfigRead(_)
        | BirdcallError::ConfigParse(_)
        | BirdcallError::ConfigWrite(_)
        | BirdcallError::InvalidQuality(_)
        | BirdcallError::InvalidRegionCode(_)
        | BirdcallError::MissingSearchScope(_) => 2,
        BirdcallError::UpstreamUnavailable { .. }
        | BirdcallError::UpstreamStatus { .. }
        | BirdcallError::ParseAnomaly { .. } => 3,
        _ => 1,
    }
}

fn run() -> miette::Result<()> {
    let cli = Cli::parse();
    let output_mode = if cli.non_interactive {
        OutputMode::NonInteractive
    } else {
        OutputMode::Interactive
    };

    let resolved = ConfigLoader::resolve(cli.config.as_deref())?;
    let log_target = match output_mode {
        OutputMode::Interactive => LogTarget::Directory(PathBuf::from("logs")),
        OutputMode::NonInteractive => LogTarget::Stderr,
    };
    init_logging(resolved.verbosity, log_target)?;

    let mut criteria = resolved.criteria;
    if let Some(dir) = cli.download_dir {
        criteria.download_root = dir;
    }
    criteria.overwrite |= cli.overwrite;

    let plan = plan_run(&criteria, cli.source);
    info!("download directory: {}", criteria.download_root);
    let http = ReqwestHttpClient::new()?;

    let summary = match output_mode {
        OutputMode::Interactive => {
            let mut tui = Tui::new(plan);
            tui.run(move |xeno_sink, macaulay_sink| {
                DownloadOrchestrator::new(&http).run_all(&criteria, plan, xeno_sink, macaulay_sink)
            })?
        }
        OutputMode::NonInteractive => {
            DownloadOrchestrator::new(&http).run_all(&criteria, plan, &NoProgress, &NoProgress)
        }
    };

    report(output_mode, &summary)
}

fn plan_run(criteria: &SearchCriteria, source: SourceArg) -> RunPlan {
    let mut plan = RunPlan::both();
    if source == SourceArg::Ebird {
        plan.xeno_canto = false;
    }
    if source == SourceArg::Xeno {
        plan.macaulay = false;
    }

    if plan.xeno_canto && !criteria.xeno.is_runnable() {
        warn!("skipping Xeno-Canto: set xeno.location or xeno.country");
        plan.xeno_canto = false;
    }
    if plan.macaulay && !criteria.macaulay.is_runnable() {
        warn!("skipping eBird/ML: set ebird.api_key and ebird.region_code");
        plan.macaulay = false;
    }
    if !plan.xeno_canto && !plan.macaulay {
        warn!("nothing to download with the current configuration");
    }
    plan
}

fn report(mode: OutputMode, summary: &DownloadSummary) -> miette::Result<()> {
    match mode {
        OutputMode::NonInteractive => JsonOutput::print_summary(summary).into_diagnostic(),
        OutputMode::Interactive => {
            print!("{}", render_summary(summary));
            Ok(())
        }
    }
}
