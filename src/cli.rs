use crate::{
    archive::{archive_project, discover_documents, verify_nonzero_file_sizes, ArchivePlan},
    batch::BatchOrchestrator,
    bridge::{osascript::OsaScriptBridge, script, Bridge},
    classify::classify,
    config::Config,
    fonts::{prepare_fonts, FontManager, ScriptedFontManager},
    machine::package_dir,
    util::{ensure_dir, expand_tilde},
};
use anyhow::{anyhow, Context, Result};
use clap::{ArgGroup, Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{info, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

#[derive(Parser, Debug)]
#[command(name = "archival-automation")]
#[command(about = "Archive a project folder and batch-package its InDesign documents")]
pub struct Args {
    #[command(subcommand)]
    pub cmd: Command,

    /// Path to config TOML. If omitted, uses ./archival-automation.toml if present.
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Override log level (trace/debug/info/warn/error).
    #[arg(long)]
    pub log_level: Option<String>,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Check that the automation host answers and what is running.
    Doctor {},
    /// Classify dialog text the way the batch would.
    #[command(group(ArgGroup::new("source").required(true).args(["text", "file"])))]
    Classify {
        #[arg(long)]
        text: Option<String>,
        #[arg(long)]
        file: Option<PathBuf>,
    },
    /// Show where a project would be archived and which documents would be packaged.
    Plan {
        #[arg(long)]
        project_dir: PathBuf,
        #[arg(long)]
        layout_dir: Option<PathBuf>,
    },
    /// Archive step only.
    Archive {
        #[arg(long)]
        project_dir: PathBuf,
    },
    Run {
        #[arg(long)]
        project_dir: PathBuf,
        /// Package documents from here instead of the project's layout folder.
        #[arg(long)]
        layout_dir: Option<PathBuf>,
        #[arg(long)]
        skip_archive: bool,
        #[arg(long)]
        skip_fonts: bool,
    },
}

pub fn dispatch(args: Args) -> Result<()> {
    let cfg_path = resolve_config_path(args.config.as_deref())?;
    let cfg = Config::load(&cfg_path)?;

    match &args.cmd {
        Command::Doctor {} => {
            let log_path = resolve_log_path(&cfg, None);
            let _guard = init_logging(&args, &cfg, log_path.as_deref())?;
            doctor(&cfg)
        }
        Command::Classify { text, file } => {
            let log_path = resolve_log_path(&cfg, None);
            let _guard = init_logging(&args, &cfg, log_path.as_deref())?;
            classify_cmd(text.as_deref(), file.as_deref())
        }
        Command::Plan {
            project_dir,
            layout_dir,
        } => {
            let log_path = resolve_log_path(&cfg, None);
            let _guard = init_logging(&args, &cfg, log_path.as_deref())?;
            plan(&cfg, project_dir, layout_dir.as_deref())
        }
        Command::Archive { project_dir } => {
            let log_path = resolve_log_path(&cfg, None);
            let _guard = init_logging(&args, &cfg, log_path.as_deref())?;
            archive(&cfg, project_dir)
        }
        Command::Run {
            project_dir,
            layout_dir,
            skip_archive,
            skip_fonts,
        } => run(
            &args,
            &cfg,
            project_dir,
            layout_dir.as_deref(),
            *skip_archive,
            *skip_fonts,
        ),
    }
}

fn resolve_config_path(user: Option<&Path>) -> Result<PathBuf> {
    if let Some(p) = user {
        return Ok(p.to_path_buf());
    }
    let default = PathBuf::from("archival-automation.toml");
    if default.exists() {
        Ok(default)
    } else {
        Ok(PathBuf::from("archival-automation.example.toml"))
    }
}

fn init_logging(args: &Args, cfg: &Config, file_path: Option<&Path>) -> Result<Option<WorkerGuard>> {
    let level = args
        .log_level
        .as_deref()
        .unwrap_or(cfg.logging.level.as_str());

    let filter = if args.log_level.is_some() {
        EnvFilter::new(level)
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level))
    };

    let console_layer = if cfg.logging.json {
        tracing_subscriber::fmt::layer()
            .json()
            .with_target(true)
            .with_writer(std::io::stderr)
            .boxed()
    } else {
        tracing_subscriber::fmt::layer()
            .with_target(true)
            .with_writer(std::io::stderr)
            .boxed()
    };

    let (file_layer, guard) = if let Some(path) = file_path {
        let parent = path.parent().unwrap_or_else(|| Path::new("."));
        ensure_dir(parent)?;
        let file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .with_context(|| format!("open log file: {}", path.display()))?;
        let (non_blocking, guard) = tracing_appender::non_blocking(file);
        let layer = tracing_subscriber::fmt::layer()
            .with_writer(non_blocking)
            .with_ansi(false)
            .with_target(true)
            .boxed();
        (Some(layer), Some(guard))
    } else {
        (None, None)
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(console_layer)
        .with(file_layer)
        .try_init()
        .map_err(|e| anyhow!("failed to init logging: {e}"))?;

    Ok(guard)
}

fn doctor(cfg: &Config) -> Result<()> {
    let bridge = OsaScriptBridge::new(cfg);
    let timeout = Duration::from_secs(cfg.bridge.call_timeout_seconds);
    let ping = bridge.execute(&script::ping(), timeout);
    let app_running = bridge
        .execute(&script::is_running(&cfg.application.name), timeout)
        .map(|o| o.is_true());
    let fonts_running = ScriptedFontManager::new(cfg, &bridge).is_running();

    println!(
        "{}",
        serde_json::to_string_pretty(&serde_json::json!({
            "osascript_exe": cfg.bridge.osascript_exe,
            "bridge_ok": ping.as_ref().is_ok_and(|o| o.value() == "pong"),
            "bridge_error": ping.as_ref().err().map(|e| e.to_string()),
            "application": cfg.application.name,
            "application_running": app_running.as_ref().ok(),
            "font_manager": cfg.fonts.app_name,
            "font_manager_running": fonts_running,
            "archive_root": cfg.archive_root(),
        }))?
    );
    Ok(())
}

fn classify_cmd(text: Option<&str>, file: Option<&Path>) -> Result<()> {
    let raw = match (text, file) {
        (Some(t), _) => t.to_string(),
        (None, Some(p)) => std::fs::read_to_string(p)
            .with_context(|| format!("reading dialog text: {}", p.display()))?,
        (None, None) => return Err(anyhow!("either --text or --file is required")),
    };
    println!("{}", serde_json::to_string_pretty(&classify(&raw))?);
    Ok(())
}

fn plan(cfg: &Config, project_dir: &Path, layout_override: Option<&Path>) -> Result<()> {
    let plan = ArchivePlan::new(cfg, project_dir)?;
    let layout_dir = layout_override.unwrap_or(plan.source_layout_dir.as_path());
    let jobs = if layout_dir.is_dir() {
        discover_documents(layout_dir, &cfg.application.document_extension)?
    } else {
        warn!("layout directory does not exist: {}", layout_dir.display());
        Vec::new()
    };

    let documents: Vec<_> = jobs
        .iter()
        .map(|j| {
            serde_json::json!({
                "document": j.path(),
                "package_dir": package_dir(cfg, &plan.archived_layout_dir, j),
            })
        })
        .collect();

    println!(
        "{}",
        serde_json::to_string_pretty(&serde_json::json!({
            "plan": plan,
            "copy_pattern": plan.copy_pattern(cfg)?.as_str(),
            "layout_dir": layout_dir,
            "documents": documents,
        }))?
    );
    Ok(())
}

fn archive(cfg: &Config, project_dir: &Path) -> Result<()> {
    let plan = ArchivePlan::new(cfg, project_dir)?;
    let outcome = archive_project(cfg, &plan)?;
    println!(
        "{}",
        serde_json::to_string_pretty(&serde_json::json!({
            "archived_project_dir": plan.archived_project_dir,
            "archive": outcome,
        }))?
    );
    Ok(())
}

fn run(
    args: &Args,
    cfg: &Config,
    project_dir: &Path,
    layout_override: Option<&Path>,
    skip_archive: bool,
    skip_fonts: bool,
) -> Result<()> {
    if !project_dir.is_dir() {
        return Err(anyhow!("project dir does not exist: {}", project_dir.display()));
    }
    let plan = ArchivePlan::new(cfg, project_dir)?;
    ensure_dir(&plan.archived_project_dir)?;

    let log_path = resolve_log_path(cfg, Some(&plan.archived_project_dir));
    let _guard = init_logging(args, cfg, log_path.as_deref())?;

    info!(
        "project {} -> {}",
        plan.project.id,
        plan.archived_project_dir.display()
    );

    if cfg.debug.dump_effective_config {
        let raw = toml::to_string(cfg).unwrap_or_default();
        std::fs::write(plan.archived_project_dir.join("effective-config.toml"), raw)?;
    }

    let archived = if skip_archive {
        info!("archive step skipped");
        None
    } else {
        Some(archive_project(cfg, &plan)?)
    };

    let bridge = OsaScriptBridge::new(cfg);
    let fonts_ready = if skip_fonts {
        None
    } else {
        Some(prepare_fonts(cfg, &ScriptedFontManager::new(cfg, &bridge)))
    };

    let layout_dir = layout_override.unwrap_or(plan.source_layout_dir.as_path());
    if !layout_dir.is_dir() {
        return Err(anyhow!("layout dir does not exist: {}", layout_dir.display()));
    }
    let jobs = discover_documents(layout_dir, &cfg.application.document_extension)?;
    if jobs.is_empty() {
        warn!("no .{} files in {}", cfg.application.document_extension, layout_dir.display());
        println!(
            "No {} documents found in {}; nothing to package.",
            cfg.application.document_extension,
            layout_dir.display()
        );
        return Ok(());
    }
    info!("{} documents to package", jobs.len());

    ensure_dir(&plan.archived_layout_dir)?;
    let log_dir = if cfg.paths.log_dir.is_empty() {
        plan.archived_project_dir.clone()
    } else {
        expand_tilde(&cfg.paths.log_dir)
    };

    let report = BatchOrchestrator::new(cfg, &bridge, &plan.archived_layout_dir)
        .with_log_dir(log_dir)
        .run_batch(jobs);

    let verification: Vec<_> = if cfg.global.verify_packages {
        report
            .results()
            .iter()
            .filter_map(|r| r.package_path.as_deref())
            .map(verify_package)
            .collect()
    } else {
        Vec::new()
    };

    if cfg.global.print_summary {
        println!(
            "{}",
            serde_json::to_string_pretty(&serde_json::json!({
                "batch_id": report.batch_id,
                "archived_project_dir": plan.archived_project_dir,
                "archive": archived,
                "fonts_refreshed": fonts_ready,
                "summary": report.summary(),
                "log": report.log_path,
                "package_checks": verification,
            }))?
        );
    }

    Ok(())
}

fn verify_package(path: &Path) -> serde_json::Value {
    match verify_nonzero_file_sizes(path) {
        Ok(check) => {
            if !check.ok() {
                warn!("{}: {} empty files", path.display(), check.empty_files.len());
            }
            serde_json::json!({ "package": path, "check": check })
        }
        Err(e) => {
            warn!("verify {}: {e:#}", path.display());
            serde_json::json!({ "package": path, "error": format!("{e:#}") })
        }
    }
}

fn resolve_log_path(cfg: &Config, project_dir: Option<&Path>) -> Option<PathBuf> {
    if !cfg.logging.write_to_file {
        return None;
    }

    if !cfg.logging.file_path.is_empty() {
        return Some(expand_tilde(&cfg.logging.file_path));
    }

    if let Some(dir) = project_dir {
        return Some(dir.join("archival-automation.log"));
    }

    Some(cfg.archive_root().join("archival-automation.log"))
}
