use clap::ArgMatches;
use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};
use linkcard_core::commands::{enrich_all, enrich_selection, enrich_single};
use linkcard_core::config::ProviderKind;
use linkcard_core::error::{ConfigError, WatchError};
use linkcard_core::provider::create_provider;
use linkcard_core::view::CanvasSelection;
use linkcard_core::watch::{CanvasWatcher, WatchSession, is_canvas_path};
use linkcard_core::{
    BatchReport, Enricher, EnrichmentResult, EnrichmentStatus, EnrichOptions, FsDocumentStore,
    Settings,
};
use linkcard_scanner::{Extractor, HttpFetcher};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc::UnboundedReceiver;
use tracing::{debug, warn};
use tracing_subscriber::EnvFilter;
use url::Url;

// Helper functions shared by the handlers

/// Install the fmt subscriber. `RUST_LOG` wins; otherwise `--verbose` selects debug.
pub fn init_logging(verbose: bool) {
    let default_level = if verbose { "debug" } else { "warn" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

/// Apply `--provider` / `--model` on top of the loaded settings.
pub fn apply_overrides(
    settings: &mut Settings,
    provider: Option<&str>,
    model: Option<&str>,
) -> Result<(), ConfigError> {
    if let Some(name) = provider {
        settings.provider = name.parse::<ProviderKind>()?;
    }
    if let Some(model) = model {
        let kind = settings.provider;
        settings.backend_mut(kind).model = Some(model.to_string());
    }
    Ok(())
}

/// Load the config file named by `--config` and apply the global overrides.
pub fn load_settings(args: &ArgMatches) -> Result<Settings, String> {
    let config_path = args
        .get_one::<String>("config")
        .map(String::as_str)
        .unwrap_or(linkcard_core::config::DEFAULT_CONFIG_PATH);
    let mut settings = Settings::load(config_path).map_err(|e| e.to_string())?;
    apply_overrides(
        &mut settings,
        args.get_one::<String>("provider").map(String::as_str),
        args.get_one::<String>("model").map(String::as_str),
    )
    .map_err(|e| e.to_string())?;

    if args.get_flag("quiet") {
        settings.notifications = false;
    }
    Ok(settings)
}

fn expand_path(raw: &str) -> PathBuf {
    PathBuf::from(shellexpand::tilde(raw).as_ref())
}

/// Resolve `canvas` against the vault root (the canvas folder when no vault is given).
/// Returns the canonical vault root and the canvas path relative to it.
pub fn locate_canvas(canvas: &Path, vault: Option<&Path>) -> Result<(PathBuf, String), String> {
    if !is_canvas_path(canvas) {
        return Err(format!("{} is not a .canvas file", canvas.display()));
    }
    let canvas = canvas
        .canonicalize()
        .map_err(|e| format!("Cannot open {}: {}", canvas.display(), e))?;
    let root = match vault {
        Some(vault) => vault
            .canonicalize()
            .map_err(|e| format!("Cannot open vault {}: {}", vault.display(), e))?,
        None => canvas
            .parent()
            .map(Path::to_path_buf)
            .ok_or_else(|| format!("{} has no parent folder", canvas.display()))?,
    };

    let relative = canvas.strip_prefix(&root).map_err(|_| {
        format!(
            "{} is not inside the vault {}",
            canvas.display(),
            root.display()
        )
    })?;
    let document = relative
        .components()
        .map(|c| c.as_os_str().to_string_lossy().into_owned())
        .collect::<Vec<_>>()
        .join("/");
    Ok((root, document))
}

/// Every `.canvas` file below `root`, skipping hidden folders such as `.obsidian`.
pub fn find_canvas_files(root: &Path) -> Vec<PathBuf> {
    let mut found = Vec::new();
    let mut pending = vec![root.to_path_buf()];

    while let Some(dir) = pending.pop() {
        let entries = match fs::read_dir(&dir) {
            Ok(entries) => entries,
            Err(e) => {
                warn!("Skipping {}: {}", dir.display(), e);
                continue;
            }
        };
        for entry in entries.flatten() {
            let path = entry.path();
            let hidden = entry.file_name().to_string_lossy().starts_with('.');
            if path.is_dir() {
                if !hidden {
                    pending.push(path);
                }
            } else if is_canvas_path(&path) {
                found.push(path);
            }
        }
    }

    found.sort();
    found
}

/// Subscribe to `root`, then baseline every existing canvas so only cards
/// added from now on count as new. Edits made while the baseline runs still
/// arrive on the returned channel. Returns the number of canvases baselined.
pub async fn start_watching(
    root: &Path,
    store: &FsDocumentStore,
    session: &mut WatchSession,
) -> Result<(CanvasWatcher, UnboundedReceiver<PathBuf>, usize), WatchError> {
    let (watcher, changes) = CanvasWatcher::start(root)?;

    let existing = find_canvas_files(root);
    for path in &existing {
        if let Some(document) = store.relative_path(path) {
            session.handle_change(&document).await;
        }
    }
    Ok((watcher, changes, existing.len()))
}

/// One-line plain-text account of an enrichment result.
pub fn describe_result(result: &EnrichmentResult) -> String {
    match result.status {
        EnrichmentStatus::Enriched => match &result.artifact {
            Some(note) => format!("{} enriched -> {}", result.node_id, note),
            None => format!("{} enriched", result.node_id),
        },
        EnrichmentStatus::AlreadyInProgress => {
            format!("{} is already being enriched", result.node_id)
        }
        EnrichmentStatus::Failed => format!(
            "{} failed: {}",
            result.node_id,
            result.error.as_deref().unwrap_or("unknown error")
        ),
    }
}

/// Totals line for a batch run.
pub fn summarize_report(report: &BatchReport) -> String {
    let mut summary = format!(
        "{} enriched, {} failed",
        report.enriched(),
        report.failed()
    );
    if report.in_progress() > 0 {
        summary.push_str(&format!(", {} already in progress", report.in_progress()));
    }
    if report.invalid_targets > 0 {
        summary.push_str(&format!(
            ", {} skipped (not a web URL)",
            report.invalid_targets
        ));
    }
    summary
}

pub fn print_banner() {
    print_divider();
    println!(
        "{} {}",
        "  LINKCARD".bright_white().bold(),
        env!("CARGO_PKG_VERSION").bright_black()
    );
    print_divider();
    println!();
}

fn print_divider() {
    println!("{}", "═".repeat(60).bright_blue().bold());
}

fn spinner(message: String) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    let style = ProgressStyle::default_spinner()
        .template("{spinner:.cyan} {msg}")
        .unwrap_or_else(|_| ProgressStyle::default_spinner());
    pb.set_style(style);
    pb.enable_steady_tick(Duration::from_millis(100));
    pb.set_message(message);
    pb
}

fn fail(message: impl std::fmt::Display) -> ! {
    eprintln!("{} {}", "✗".red().bold(), message);
    std::process::exit(1);
}

/// Failures always reach stderr; successes only when notifications are on.
fn notify_result(settings: &Settings, result: &EnrichmentResult) {
    let line = describe_result(result);
    match result.status {
        EnrichmentStatus::Enriched if settings.notifications => {
            println!("{} {}", "✓".green().bold(), line);
        }
        EnrichmentStatus::AlreadyInProgress if settings.notifications => {
            println!("{} {}", "→".yellow().bold(), line);
        }
        EnrichmentStatus::Failed => eprintln!("{} {}", "✗".red().bold(), line),
        _ => {}
    }
}

fn notify_report(settings: &Settings, report: &BatchReport) {
    for result in &report.results {
        notify_result(settings, result);
    }
    if settings.notifications {
        println!();
        println!("{} {}", "ℹ".blue(), summarize_report(report));
    }
}

fn build_enricher(settings: &Settings, root: &Path) -> (Arc<FsDocumentStore>, Arc<Enricher>) {
    let fetcher = match HttpFetcher::with_timeout(settings.request_timeout_secs) {
        Ok(fetcher) => Arc::new(fetcher),
        Err(e) => fail(e),
    };
    let extractor =
        Arc::new(Extractor::new(fetcher).with_social_api_base(settings.social_api_base.clone()));
    let provider = match create_provider(settings) {
        Ok(provider) => provider,
        Err(e) => fail(e),
    };
    debug!(
        "Using {} ({}) for summaries",
        provider.name(),
        provider.model()
    );

    let store = Arc::new(FsDocumentStore::new(root));
    let enricher = Arc::new(Enricher::new(
        store.clone(),
        extractor,
        provider,
        EnrichOptions::from(settings),
    ));
    (store, enricher)
}

fn canvas_selection(args: &ArgMatches, settings: &Settings) -> (Arc<Enricher>, CanvasSelection) {
    let canvas = args
        .get_one::<String>("canvas")
        .map(|raw| expand_path(raw))
        .unwrap_or_default();
    let vault = args.get_one::<String>("vault").map(|raw| expand_path(raw));

    let (root, document) = match locate_canvas(&canvas, vault.as_deref()) {
        Ok(located) => located,
        Err(e) => fail(e),
    };
    let (store, enricher) = build_enricher(settings, &root);
    let selected: Vec<String> = args
        .get_many::<String>("node")
        .map(|ids| ids.cloned().collect())
        .unwrap_or_default();

    let view = CanvasSelection::new(store, Some(document)).with_selection(selected);
    (enricher, view)
}

pub async fn handle_enrich(args: &ArgMatches, settings: &Settings) {
    let (enricher, view) = canvas_selection(args, settings);

    let pb = spinner("Enriching link card...".to_string());
    let outcome = enrich_single(&enricher, &view).await;
    pb.finish_and_clear();

    match outcome {
        Ok(result) => {
            notify_result(settings, &result);
            if result.status == EnrichmentStatus::Failed {
                std::process::exit(1);
            }
        }
        Err(e) => fail(e),
    }
}

pub async fn handle_enrich_selection(args: &ArgMatches, settings: &Settings) {
    let (enricher, view) = canvas_selection(args, settings);

    let pb = spinner("Enriching selected link cards...".to_string());
    let outcome = enrich_selection(&enricher, &view).await;
    pb.finish_and_clear();

    match outcome {
        Ok(report) => {
            notify_report(settings, &report);
            if report.failed() > 0 {
                std::process::exit(1);
            }
        }
        Err(e) => fail(e),
    }
}

pub async fn handle_enrich_all(args: &ArgMatches, settings: &Settings) {
    let (enricher, view) = canvas_selection(args, settings);

    let pb = spinner("Enriching every link card...".to_string());
    let outcome = enrich_all(&enricher, &view).await;
    pb.finish_and_clear();

    match outcome {
        Ok(report) => {
            notify_report(settings, &report);
            if report.failed() > 0 {
                std::process::exit(1);
            }
        }
        Err(e) => fail(e),
    }
}

pub async fn handle_watch(args: &ArgMatches, settings: &Settings) {
    let vault = args
        .get_one::<String>("vault")
        .map(|raw| expand_path(raw))
        .unwrap_or_default();
    let root = match vault.canonicalize() {
        Ok(root) => root,
        Err(e) => fail(format!("Cannot open vault {}: {}", vault.display(), e)),
    };
    let auto_enrich = settings.auto_enrich && !args.get_flag("no-auto");

    let (store, enricher) = build_enricher(settings, &root);
    let mut session = WatchSession::new(store.clone(), enricher, auto_enrich);

    let (mut watcher, mut changes, existing) =
        match start_watching(&root, &store, &mut session).await {
            Ok(started) => started,
            Err(e) => fail(e),
        };

    if settings.notifications {
        println!(
            "{} Watching {} ({} canvas file(s), auto enrich {})",
            "→".blue(),
            root.display().to_string().bright_white(),
            existing.to_string().cyan(),
            if auto_enrich { "on".green() } else { "off".yellow() }
        );
        println!("{} Press Ctrl-C to stop", "ℹ".blue());
    }

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => break,
            changed = changes.recv() => {
                let Some(path) = changed else { break };
                let Some(document) = store.relative_path(&path) else {
                    debug!("Ignoring change outside the vault: {}", path.display());
                    continue;
                };
                for result in session.handle_change(&document).await {
                    notify_result(settings, &result);
                }
            }
        }
    }

    watcher.stop();
    session.stop();
    if settings.notifications {
        println!();
        println!("{} Stopped watching", "✓".green().bold());
    }
}

pub async fn handle_scrape(args: &ArgMatches, settings: &Settings) {
    let Some(url) = args.get_one::<Url>("URL") else {
        fail("A URL is required");
    };
    let fetcher = match HttpFetcher::with_timeout(settings.request_timeout_secs) {
        Ok(fetcher) => Arc::new(fetcher),
        Err(e) => fail(e),
    };
    let extractor = Extractor::new(fetcher).with_social_api_base(settings.social_api_base.clone());

    let metadata = match extractor.scrape(url.as_str()).await {
        Ok(metadata) => metadata,
        Err(e) => fail(format!("Fetch failed: {}", e)),
    };
    match serde_json::to_string_pretty(&metadata) {
        Ok(json) => println!("{}", json),
        Err(e) => fail(e),
    }
}

pub async fn handle_providers_check(settings: &Settings) {
    let provider = match create_provider(settings) {
        Ok(provider) => provider,
        Err(e) => fail(e),
    };
    let backend = settings.resolve_backend(settings.provider);

    let pb = spinner(format!("Contacting {} at {}...", provider.name(), backend.endpoint));
    let reachable = provider.check_connection().await;
    pb.finish_and_clear();

    if reachable {
        println!(
            "{} {} reachable at {} (model {})",
            "✓".green().bold(),
            provider.name().bright_white(),
            backend.endpoint,
            provider.model().cyan()
        );
    } else {
        let hint = match backend.kind.credential_env() {
            Some(var) if backend.api_key.is_none() => {
                format!(" (no API key configured; set {} or the config file)", var)
            }
            _ => String::new(),
        };
        fail(format!(
            "{} is not reachable at {}{}",
            provider.name(),
            backend.endpoint,
            hint
        ));
    }
}

pub async fn handle_providers_models(settings: &Settings) {
    let provider = match create_provider(settings) {
        Ok(provider) => provider,
        Err(e) => fail(e),
    };

    let pb = spinner(format!("Listing {} models...", provider.name()));
    let models = provider.list_models().await;
    pb.finish_and_clear();

    println!("{}", provider.name().bright_blue().bold());
    for model in models {
        if model == provider.model() {
            println!("  {} {}", "•".green(), model.bright_white().bold());
        } else {
            println!("  {} {}", "•".blue(), model);
        }
    }
}
