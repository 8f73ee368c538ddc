mod logging;

use std::fs;
use std::path::{Path, PathBuf};
use std::process;
use std::time::Instant;

use anyhow::{Context, Result};
use chrono::Local;
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use tracing::{error, info};

use importpics::config::{self, Settings};
use importpics::executor::Executor;
use importpics::naming::DEFAULT_DATE_FORMAT;
use importpics::plan::{CopyPlan, DEFAULT_LOOKBACK_DAYS, PlanOptions};
use importpics::prompt::Prompter;
use importpics::scan::{self, PICTURE_EXTENSIONS};
use importpics::volumes::{self, VolumeProbe};
use importpics::{CopyLedger, Exiftool, ImportError, Metrics, group_shots, human_readable};

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Import from this folder instead of choosing a removable volume
    #[arg(long)]
    source: Option<PathBuf>,
    /// Archive folder to copy into (remembered for next time)
    #[arg(long)]
    dest: Option<PathBuf>,
    /// Only import shots taken within this many days
    #[arg(short, long, default_value_t = DEFAULT_LOOKBACK_DAYS)]
    days: i64,
    /// Copy shots even if the copy log says they were imported before
    #[arg(short, long)]
    force: bool,
    /// Import at most this many shots
    #[arg(short, long)]
    max: Option<usize>,
    /// Answer yes to every question
    #[arg(short, long)]
    yes: bool,
    /// Log every decision
    #[arg(short, long)]
    verbose: bool,
    /// Print planned destinations without copying files
    #[arg(short, long)]
    info: bool,
    /// Command printing the mounted volumes, one per line
    #[arg(long)]
    volume_command: Option<String>,
    /// strftime format of the date part of destination folders
    #[arg(long, default_value = DEFAULT_DATE_FORMAT)]
    date_format: String,
}

fn progress_bar(len: u64, template: &str) -> ProgressBar {
    let pb = ProgressBar::new(len);
    match ProgressStyle::default_bar().template(template) {
        Ok(style) => pb.set_style(style),
        Err(err) => error!("bad progress template: {}", err),
    }
    pb
}

fn resolve_destination(
    args: &Args,
    app_dir: &Path,
    prompter: &mut Prompter<impl std::io::BufRead, impl std::io::Write>,
) -> Result<PathBuf> {
    let mut settings = Settings::load(app_dir)?;
    let chosen = match &args.dest {
        Some(dest) => dest.clone(),
        None => {
            let saved = settings.destpath.as_ref().map(|p| p.display().to_string());
            let answer = prompter.ask("Enter path to copy files to", saved.as_deref())?;
            config::expand_tilde(&answer)
        }
    };
    let chosen = std::path::absolute(&chosen)
        .with_context(|| format!("failed to resolve {}", chosen.display()))?;

    if !chosen.exists() && config::is_in_home(&chosen) {
        let question = format!("{} does not exist. Should I create it?", chosen.display());
        if !prompter.confirm(&question, Some(false))? {
            return Err(ImportError::Aborted.into());
        }
        fs::create_dir_all(&chosen)
            .with_context(|| format!("failed to create {}", chosen.display()))?;
    }
    let chosen = config::validate_destination(&chosen)?;

    if settings.destpath.as_ref() != Some(&chosen) {
        settings.destpath = Some(chosen.clone());
        settings.save(app_dir)?;
    }
    Ok(chosen)
}

fn print_plan(plan: &CopyPlan) -> Result<()> {
    for shot in plan.shots() {
        let dest = plan.destination(shot)?;
        for file in shot.files() {
            println!("{} -> {}", file.display(), dest.display());
        }
    }
    println!(
        "{} shots, {} to copy",
        plan.shots().len(),
        human_readable(plan.total_bytes())
    );
    Ok(())
}

fn run(args: &Args) -> Result<Metrics> {
    let started = Local::now().naive_local();
    let clock = Instant::now();
    let mut prompter = Prompter::stdio(args.yes);

    let source = match &args.source {
        Some(path) => path.clone(),
        None => {
            let probe = match &args.volume_command {
                Some(cmd) => VolumeProbe::Command(cmd.clone()),
                None => VolumeProbe::Removable,
            };
            let volumes = probe.list()?;
            PathBuf::from(prompter.choose(&volumes)?)
        }
    };

    let app_dir = config::app_dir()?;
    let destpath = resolve_destination(args, &app_dir, &mut prompter)?;
    println!("chosen path is: {}", destpath.display());

    let ledger = CopyLedger::load(&config::ledger_dir(&app_dir))?;
    let mut log = ledger.acquire()?;

    let pictures = scan::all_pictures(&source, PICTURE_EXTENSIONS)
        .with_context(|| format!("failed to scan {}", source.display()))?;
    let groups = group_shots(pictures)?;
    info!("{} shots found on {}", groups.len(), source.display());

    let mut options = PlanOptions::new(&destpath, started);
    options.lookback_days = args.days;
    options.max_shots = args.max;
    options.force = args.force;
    options.date_format = args.date_format.clone();
    let mut plan = CopyPlan::new(options);
    let mut metrics = Metrics::default();
    let extractor = Exiftool::default();

    let pb = progress_bar(
        groups.len() as u64,
        "{spinner:.green} [{elapsed_precise}] [{wide_bar:.cyan/blue}] {pos}/{len} ({eta}) Planning...",
    );
    for shot in groups.into_values() {
        plan.schedule(&ledger, &extractor, &mut metrics, shot)?;
        pb.inc(1);
    }
    pb.finish_and_clear();

    if args.info {
        print_plan(&plan)?;
        metrics.elapsed = clock.elapsed();
        return Ok(metrics);
    }

    if plan.is_empty() {
        println!("nothing to copy");
    } else {
        let question = format!(
            "Copy {} shots ({}) to {}?",
            plan.shots().len(),
            human_readable(plan.total_bytes()),
            destpath.display()
        );
        if !prompter.confirm(&question, Some(true))? {
            return Err(ImportError::Aborted.into());
        }

        metrics.space_before = volumes::available_space(&destpath);
        let pb = progress_bar(
            plan.total_bytes(),
            "{spinner:.green} [{elapsed_precise}] [{wide_bar:.cyan/blue}] {bytes}/{total_bytes} ({eta}) Copying files...",
        );
        let mut executor = Executor::new();
        for shot in plan.shots() {
            executor.execute(&plan, &mut log, &mut metrics, shot)?;
            pb.inc(shot.known_size().unwrap_or_default());
        }
        pb.finish_with_message("File copying complete");
        metrics.space_after = volumes::available_space(&destpath);
    }

    log.close()?;
    metrics.elapsed = clock.elapsed();
    Ok(metrics)
}

fn main() {
    let args = Args::parse();
    logging::init_logger(args.verbose);

    match run(&args) {
        Ok(metrics) => println!("{}", metrics),
        Err(err) => {
            if matches!(err.downcast_ref::<ImportError>(), Some(ImportError::Aborted)) {
                println!("exiting");
            } else {
                error!("{:#}", err);
            }
            process::exit(1);
        }
    }
}
