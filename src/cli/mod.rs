use std::io;
use std::io::IsTerminal;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Args, CommandFactory, Parser, Subcommand};
use serde::Serialize;

use crate::core::{ResultSet, ScanRecord};
use crate::dom::Document;
use crate::engine::{Engine, EngineOptions, RuleFailure, ScanMode};
use crate::filters::VisualFilter;
use crate::messages::{BackgroundContext, ContentContext, Router};
use crate::overlay::{HighlightFilter, Overlay};
use crate::report::{ReportFormat, ReportOptions};
use crate::rules::RuleOptions;
use crate::store::{Settings, Store, track_event};
use crate::ui::{PageRow, UiConfig};

#[derive(Debug, Parser)]
#[command(
    name = "a11y-inspector",
    version,
    about = "Scan HTML pages for accessibility problems, highlight them and export reports"
)]
pub struct Cli {
    #[arg(long, global = true)]
    pub json: bool,
    #[arg(long = "no-color", global = true)]
    pub no_color: bool,
    #[arg(long, global = true)]
    pub verbose: bool,
    #[arg(long, global = true)]
    pub quiet: bool,
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Scan a page, a directory of pages, or `-` for stdin.
    Scan(ScanArgs),
    /// Render a report for one page.
    Report(ReportArgs),
    /// Write the page back out with findings highlighted.
    Highlight(HighlightArgs),
    /// Write the page back out with a visual simulation mode applied.
    Filter(FilterArgs),
    History(HistoryArgs),
    Settings(SettingsArgs),
    /// Export settings and scan history as JSON.
    Export(ExportArgs),
    /// Import a previously exported bundle.
    Import(ImportArgs),
    /// Reset settings and empty the scan history.
    ClearData,
    CheckUpdate,
    /// Answer JSON requests on stdin, one per line.
    Serve(ServeArgs),
    /// Interactive sidebar for one page.
    Ui(UiArgs),
    Completion(CompletionArgs),
    Config(ConfigArgs),
}

#[derive(Debug, Args)]
pub struct ScanArgs {
    pub target: String,
    #[arg(long)]
    pub detailed: bool,
    /// Scan only the subtree of the first element matching this selector.
    #[arg(long)]
    pub element: Option<String>,
    /// Name recorded in the history instead of the file path.
    #[arg(long)]
    pub url: Option<String>,
    #[arg(long)]
    pub no_save: bool,
    #[arg(long)]
    pub fail_on_issues: bool,
    #[arg(long)]
    pub exclude: Vec<String>,
}

#[derive(Debug, Args)]
pub struct ReportArgs {
    pub target: String,
    #[arg(long)]
    pub detailed: bool,
    #[arg(long)]
    pub format: Option<ReportFormat>,
    #[arg(long)]
    pub output: Option<PathBuf>,
}

#[derive(Debug, Args)]
pub struct HighlightArgs {
    pub file: PathBuf,
    #[arg(long = "type", default_value = "all")]
    pub filter: HighlightFilter,
    #[arg(long)]
    pub detailed: bool,
    /// Remove highlights left by an earlier run instead of drawing new ones.
    #[arg(long)]
    pub clear: bool,
    #[arg(long)]
    pub output: PathBuf,
}

#[derive(Debug, Args)]
pub struct FilterArgs {
    pub file: PathBuf,
    #[arg(long, required_unless_present = "clear")]
    pub mode: Option<VisualFilter>,
    #[arg(long, conflicts_with = "mode")]
    pub clear: bool,
    #[arg(long)]
    pub output: PathBuf,
}

#[derive(Debug, Args)]
pub struct HistoryArgs {
    #[arg(long)]
    pub limit: Option<usize>,
}

#[derive(Debug, Args)]
pub struct SettingsArgs {
    #[command(subcommand)]
    pub command: SettingsCommand,
}

#[derive(Debug, Subcommand)]
pub enum SettingsCommand {
    Show,
    /// Set one field, e.g. `complianceLevel AAA` or `colors.error #ff0000`.
    Set { key: String, value: String },
    Reset,
}

#[derive(Debug, Args)]
pub struct ExportArgs {
    #[arg(long)]
    pub output: Option<PathBuf>,
}

#[derive(Debug, Args)]
pub struct ImportArgs {
    pub file: PathBuf,
}

#[derive(Debug, Args)]
pub struct ServeArgs {
    #[arg(long)]
    pub page: Option<PathBuf>,
}

#[derive(Debug, Args)]
pub struct UiArgs {
    pub target: PathBuf,
    #[arg(long)]
    pub detailed: bool,
}

#[derive(Debug, Args)]
pub struct CompletionArgs {
    pub shell: String,
}

#[derive(Debug, Args)]
pub struct ConfigArgs {
    #[arg(long)]
    pub show: bool,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct PageOutput<'a> {
    page: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    results: Option<&'a ResultSet>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
    failed_rules: &'a [RuleFailure],
}

pub fn run() -> Result<()> {
    let cli = Cli::parse();

    let stdin_is_tty = io::stdin().is_terminal();
    let stdout_is_tty = io::stdout().is_terminal();
    let stderr_is_tty = io::stderr().is_terminal();

    crate::logging::init(cli.verbose, cli.quiet, stderr_is_tty && !cli.no_color);

    let home_dir = crate::config::home_dir().map_err(crate::exit::invalid_args_err)?;
    let cfg = crate::config::load(cli.config.as_deref(), &home_dir)
        .map_err(crate::exit::invalid_args_err)?;

    let color = stdout_is_tty && cfg.ui.color && !cli.no_color;

    let ui_cfg = UiConfig {
        color,
        stdin_is_tty,
        stdout_is_tty,
        stderr_is_tty,
        max_table_rows: cfg.ui.max_table_rows,
        quiet: cli.quiet,
        verbose: cli.verbose,
    };

    let store = Store::open(cfg.store_path(&home_dir));
    tracing::debug!(store = %store.path().display(), "using store");

    let is_ui_mode = matches!(&cli.command, Commands::Ui(_));
    let engine_for = |settings: &Settings| {
        Engine::new(EngineOptions {
            rules: RuleOptions {
                formula: cfg.contrast.formula,
                contrast_threshold: cfg.contrast.threshold,
                ..RuleOptions::default()
            }
            .with_settings(settings),
            show_progress: stderr_is_tty && !cli.quiet && !cli.json && !is_ui_mode,
        })
    };

    match cli.command {
        Commands::Scan(args) => {
            let settings = load_settings(&store)?;
            let engine = engine_for(&settings);
            let mode = if args.detailed {
                ScanMode::Detailed
            } else {
                cfg.scan.default_mode
            };
            track_event(&settings, "scan", mode.as_str());

            let mut exclude = cfg.scan.exclude.clone();
            exclude.extend(args.exclude);
            exclude.sort();
            exclude.dedup();

            let target = args.target.as_str();
            let is_batch = target != "-" && Path::new(target).is_dir();
            let mut issue_count = 0;

            if is_batch {
                if args.element.is_some() {
                    return Err(crate::exit::invalid_args(
                        "scan: --element needs a single page, not a directory",
                    ));
                }
                crate::scan::validate_globs(&cfg.scan.include, &exclude)
                    .map_err(crate::exit::invalid_args_err)?;
                let page_set =
                    crate::scan::discover_pages(Path::new(target), &cfg.scan.include, &exclude)?;
                if page_set.error_count > 0 {
                    tracing::warn!(count = page_set.error_count, "some entries could not be read");
                }
                let scans = engine.scan_files(&page_set.pages, mode);

                for scan in &scans {
                    if let Ok(pass) = &scan.outcome {
                        issue_count += pass.results.issues.len();
                        if !args.no_save {
                            store
                                .save_scan_result(ScanRecord::new(
                                    scan.path.display().to_string(),
                                    pass.results.clone(),
                                ))
                                .map_err(crate::exit::storage_err)?;
                        }
                    }
                }

                if cli.json {
                    let out: Vec<PageOutput<'_>> = scans
                        .iter()
                        .map(|scan| match &scan.outcome {
                            Ok(pass) => PageOutput {
                                page: scan.path.display().to_string(),
                                results: Some(&pass.results),
                                error: None,
                                failed_rules: &pass.failed_rules,
                            },
                            Err(err) => PageOutput {
                                page: scan.path.display().to_string(),
                                results: None,
                                error: Some(format!("{err:#}")),
                                failed_rules: &[],
                            },
                        })
                        .collect();
                    write_json(&out)?;
                } else if !ui_cfg.quiet {
                    let rows: Vec<PageRow<'_>> = scans
                        .iter()
                        .map(|scan| PageRow {
                            label: scan
                                .path
                                .strip_prefix(&page_set.root)
                                .unwrap_or(&scan.path)
                                .display()
                                .to_string(),
                            results: scan.outcome.as_ref().ok().map(|p| &p.results),
                            error: scan.outcome.as_ref().err().map(|e| format!("{e:#}")),
                        })
                        .collect();
                    if rows.is_empty() {
                        println!("No pages found under {target}.");
                    } else {
                        crate::ui::write_batch(&mut io::stdout().lock(), &rows);
                    }
                }
            } else {
                let (doc, label) = load_target(target)?;
                let pass = match &args.element {
                    Some(selector) => engine
                        .scan_element(&doc, selector)
                        .map_err(crate::exit::invalid_args_err)?,
                    None => engine.scan(&doc, mode),
                };
                issue_count = pass.results.issues.len();
                let url = args.url.clone().unwrap_or_else(|| label.clone());
                if !args.no_save {
                    store
                        .save_scan_result(ScanRecord::new(url, pass.results.clone()))
                        .map_err(crate::exit::storage_err)?;
                }
                if cli.json {
                    write_json(&pass.results)?;
                } else {
                    crate::ui::print_scan(&label, &pass.results, &pass.failed_rules, &ui_cfg);
                }
                crate::ui::notify(&ui_cfg, &settings, &pass.results);
            }

            if args.fail_on_issues && issue_count > 0 {
                return Err(crate::exit::issues_found(issue_count));
            }
        }
        Commands::Report(args) => {
            let settings = load_settings(&store)?;
            let engine = engine_for(&settings);
            let format = args.format.unwrap_or(settings.export_format);
            let (doc, _) = load_target(&args.target)?;
            let mode = if args.detailed {
                ScanMode::Detailed
            } else {
                cfg.scan.default_mode
            };
            let pass = engine.scan(&doc, mode);
            track_event(&settings, "report", format.as_str());
            let rendered = crate::report::render(
                &pass.results,
                format,
                &ReportOptions {
                    detailed: args.detailed,
                    passed_limit: cfg.report.passed_limit,
                },
            )?;
            write_output(args.output.as_deref(), &rendered, &ui_cfg)?;
        }
        Commands::Highlight(args) => {
            let settings = load_settings(&store)?;
            let doc = Document::from_path(&args.file)?;
            let drawn = if args.clear {
                let mut overlay = Overlay::attach(&doc, settings.colors.clone());
                let n = overlay.drawn();
                overlay.clear_highlights();
                n
            } else {
                let engine = engine_for(&settings);
                let mode = if args.detailed {
                    ScanMode::Detailed
                } else {
                    cfg.scan.default_mode
                };
                let results = engine.scan(&doc, mode).results;
                let mut overlay = Overlay::new(settings.colors.clone());
                overlay.highlight(&doc, &results, args.filter)
            };
            write_output(Some(&args.output), &doc.to_html(), &ui_cfg)?;
            if cli.json {
                write_json(&serde_json::json!({ "drawn": drawn, "cleared": args.clear }))?;
            } else if !ui_cfg.quiet {
                let verb = if args.clear { "removed" } else { "drew" };
                println!("{verb} {drawn} overlay node(s) in {}", args.output.display());
            }
        }
        Commands::Filter(args) => {
            let mut doc = Document::from_path(&args.file)?;
            match args.mode {
                Some(mode) if !args.clear => {
                    if !crate::filters::apply(&mut doc, mode) {
                        return Err(crate::exit::invalid_args(format!(
                            "filter: page has no <body>: {}",
                            args.file.display()
                        )));
                    }
                }
                _ => crate::filters::clear(&mut doc),
            }
            write_output(Some(&args.output), &doc.to_html(), &ui_cfg)?;
        }
        Commands::History(args) => {
            let mut history = store.history().map_err(crate::exit::storage_err)?;
            if let Some(limit) = args.limit {
                history.truncate(limit);
            }
            if cli.json {
                write_json(&history)?;
            } else {
                crate::ui::print_history(&history, &ui_cfg);
            }
        }
        Commands::Settings(args) => match args.command {
            SettingsCommand::Show => {
                let settings = load_settings(&store)?;
                write_json(&settings)?;
            }
            SettingsCommand::Set { key, value } => {
                let settings = load_settings(&store)?;
                let updated = settings
                    .with_key(&key, &value)
                    .map_err(crate::exit::invalid_args_err)?;
                store
                    .save_settings(updated)
                    .map_err(crate::exit::storage_err)?;
                if !ui_cfg.quiet && !cli.json {
                    println!("{key} = {value}");
                }
            }
            SettingsCommand::Reset => {
                store
                    .save_settings(Settings::default())
                    .map_err(crate::exit::storage_err)?;
                if !ui_cfg.quiet && !cli.json {
                    println!("settings reset to defaults");
                }
            }
        },
        Commands::Export(args) => {
            let bundle = store.export().map_err(crate::exit::storage_err)?;
            let mut body = serde_json::to_string_pretty(&bundle)?;
            body.push('\n');
            write_output(args.output.as_deref(), &body, &ui_cfg)?;
        }
        Commands::Import(args) => {
            let s = std::fs::read_to_string(&args.file)
                .with_context(|| format!("failed to read {}", args.file.display()))
                .map_err(crate::exit::invalid_args_err)?;
            let value: serde_json::Value = serde_json::from_str(&s)
                .context("invalid data format: not JSON")
                .map_err(crate::exit::invalid_args_err)?;
            let summary = store
                .import(&value)
                .map_err(crate::exit::invalid_args_err)?;
            if cli.json {
                write_json(&summary)?;
            } else if !ui_cfg.quiet {
                println!(
                    "imported settings; history {} ({} entries)",
                    if summary.history_replaced {
                        "replaced"
                    } else {
                        "kept"
                    },
                    summary.history_len
                );
            }
        }
        Commands::ClearData => {
            store.clear().map_err(crate::exit::storage_err)?;
            if !ui_cfg.quiet && !cli.json {
                println!("all data cleared");
            }
        }
        Commands::CheckUpdate => {
            let check = store
                .check_update(time::OffsetDateTime::now_utc())
                .map_err(crate::exit::storage_err)?;
            if cli.json {
                write_json(&serde_json::json!({
                    "success": true,
                    "checked": check.checked,
                    "updateAvailable": check.update_available,
                }))?;
            } else if !ui_cfg.quiet {
                if check.checked {
                    println!("a11y-inspector {} is up to date", env!("CARGO_PKG_VERSION"));
                } else {
                    println!("skipped: last update check was less than a day ago");
                }
            }
        }
        Commands::Serve(args) => {
            let settings = load_settings(&store)?;
            let content = ContentContext::new(
                engine_for(&settings),
                Overlay::new(settings.colors.clone()),
            );
            let mut router = Router::new(content, BackgroundContext::new(store.clone()));
            if let Some(page) = &args.page {
                let doc = Document::from_path(page)?;
                router
                    .open_page(doc, &page.display().to_string())
                    .map_err(crate::exit::storage_err)?;
            }
            crate::messages::serve(&mut router, io::stdin().lock(), io::stdout().lock())?;
        }
        Commands::Ui(args) => {
            if cli.json {
                return Err(crate::exit::invalid_args("ui cannot be combined with --json"));
            }
            if !(ui_cfg.stdin_is_tty && ui_cfg.stdout_is_tty) {
                return Err(crate::exit::invalid_args(
                    "ui needs a terminal (stdin and stdout)",
                ));
            }
            if !args.target.is_file() {
                return Err(crate::exit::invalid_args(format!(
                    "ui: not a file: {}",
                    args.target.display()
                )));
            }
            let settings = load_settings(&store)?;
            let mode = if args.detailed {
                ScanMode::Detailed
            } else {
                cfg.scan.default_mode
            };
            crate::tui::run(
                engine_for(&settings),
                store.clone(),
                args.target,
                mode,
                ui_cfg.color,
            )?;
        }
        Commands::Completion(args) => {
            let shell = parse_shell(&args.shell)?;
            let mut cmd = Cli::command();
            let mut out = std::io::stdout().lock();
            clap_complete::generate(shell, &mut cmd, "a11y-inspector", &mut out);
        }
        Commands::Config(args) => {
            if args.show {
                if cli.json {
                    let stdout = std::io::stdout();
                    serde_json::to_writer_pretty(stdout.lock(), &cfg)?;
                    println!();
                } else {
                    println!("{}", toml::to_string_pretty(&cfg)?);
                }
            } else if !ui_cfg.quiet {
                eprintln!("config: use `a11y-inspector config --show`");
            }
        }
    }

    Ok(())
}

fn load_settings(store: &Store) -> Result<Settings> {
    store.settings().map_err(crate::exit::storage_err)
}

/// Parses the page named by `target` (`-` reads stdin) and returns it with
/// a display label.
fn load_target(target: &str) -> Result<(Document, String)> {
    if target == "-" {
        let doc = Document::from_reader(io::stdin().lock()).context("failed to read page from stdin")?;
        return Ok((doc, "stdin".to_string()));
    }
    let path = Path::new(target);
    if path.is_dir() {
        return Err(crate::exit::invalid_args(format!(
            "expected a page, got a directory: {target}"
        )));
    }
    Ok((Document::from_path(path)?, path.display().to_string()))
}

fn write_json<T: Serialize + ?Sized>(value: &T) -> Result<()> {
    use std::io::Write;

    let buf = serde_json::to_vec_pretty(value)?;

    let mut stdout = std::io::stdout().lock();
    match stdout.write_all(&buf) {
        Ok(()) => {}
        Err(err) if err.kind() == std::io::ErrorKind::BrokenPipe => return Ok(()),
        Err(err) => return Err(err.into()),
    }
    match stdout.write_all(b"\n") {
        Ok(()) => Ok(()),
        Err(err) if err.kind() == std::io::ErrorKind::BrokenPipe => Ok(()),
        Err(err) => Err(err.into()),
    }
}

/// Writes `content` to `path`, or to stdout when no path is given.
fn write_output(path: Option<&Path>, content: &str, cfg: &UiConfig) -> Result<()> {
    use std::io::Write;

    let Some(path) = path else {
        let mut stdout = std::io::stdout().lock();
        return match stdout.write_all(content.as_bytes()) {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == std::io::ErrorKind::BrokenPipe => Ok(()),
            Err(err) => Err(err.into()),
        };
    };
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("failed to create {}", parent.display()))?;
        }
    }
    std::fs::write(path, content.as_bytes())
        .with_context(|| format!("failed to write {}", path.display()))?;
    if cfg.verbose && !cfg.quiet {
        eprintln!("wrote {}", path.display());
    }
    Ok(())
}

fn parse_shell(s: &str) -> Result<clap_complete::Shell> {
    let s = s.trim().to_ascii_lowercase();
    match s.as_str() {
        "bash" => Ok(clap_complete::Shell::Bash),
        "zsh" => Ok(clap_complete::Shell::Zsh),
        "fish" => Ok(clap_complete::Shell::Fish),
        other => Err(crate::exit::invalid_args(format!(
            "unsupported shell: {other} (expected bash|zsh|fish)"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn command_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn typed_flags_parse_from_their_wire_names() {
        let cli = Cli::try_parse_from([
            "a11y-inspector",
            "highlight",
            "page.html",
            "--type",
            "warnings",
            "--output",
            "out.html",
        ])
        .expect("parse");
        let Commands::Highlight(args) = cli.command else {
            panic!("expected highlight");
        };
        assert_eq!(args.filter, HighlightFilter::Warnings);

        let cli = Cli::try_parse_from([
            "a11y-inspector",
            "filter",
            "page.html",
            "--mode",
            "reduced-motion",
            "--output",
            "out.html",
        ])
        .expect("parse");
        let Commands::Filter(args) = cli.command else {
            panic!("expected filter");
        };
        assert_eq!(args.mode, Some(VisualFilter::ReducedMotion));

        assert!(
            Cli::try_parse_from(["a11y-inspector", "report", "p.html", "--format", "pdf"]).is_err()
        );
    }

    #[test]
    fn parse_shell_rejects_unknown_shells() {
        assert!(parse_shell("Bash").is_ok());
        let err = parse_shell("tcsh").expect_err("unsupported");
        assert_eq!(crate::exit::exit_code(&err), 2);
    }
}
