//! shell-sentinel: web-shell detector.
//!
//! This is the main entry point for the CLI application.

use shell_sentinel::core::config::Config;
use shell_sentinel::core::error::Result;
use shell_sentinel::detection::SignatureStore;
use shell_sentinel::scanner::{FileCollector, WebshellScanner};
use shell_sentinel::ui::cli::{Cli, Commands, ConfigAction, OutputFormat};
use shell_sentinel::ui::report::write_scan;
use shell_sentinel::utils::logging::{init_logging, LogConfig};
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

/// Options of the `scan` command.
struct ScanArgs {
    paths: Vec<PathBuf>,
    extension: Option<String>,
    line: bool,
    no_line: bool,
    db: Option<PathBuf>,
    recursive: bool,
    threads: Option<usize>,
}

#[tokio::main]
async fn main() -> ExitCode {
    match run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {}", e);
            if let Some(hint) = e.suggestion() {
                eprintln!("Hint: {}", hint);
            }
            ExitCode::FAILURE
        }
    }
}

async fn run() -> Result<()> {
    let cli = Cli::parse_args();

    // Load configuration before logging so the configured level applies
    let (config, config_error) = Config::load_or_default();

    let log_config = if cli.verbose {
        LogConfig::verbose()
    } else if cli.quiet {
        LogConfig::quiet()
    } else {
        LogConfig::from_config(&config)
    };
    init_logging(log_config)?;

    if let Some(e) = config_error {
        log::warn!("Failed to load config, using defaults: {}", e);
    }
    log::debug!("shell-sentinel v{}", env!("CARGO_PKG_VERSION"));

    match cli.command {
        Some(Commands::Scan {
            path,
            extension,
            line,
            no_line,
            db,
            recursive,
            threads,
        }) => {
            let args = ScanArgs {
                paths: path,
                extension,
                line,
                no_line,
                db,
                recursive,
                threads,
            };
            run_scan(config, args, cli.format).await
        }
        Some(Commands::Config { action }) => run_config(action, &config),
        Some(Commands::Info) => run_info(&config),
        None => {
            println!("shell-sentinel - Web-shell Detector");
            println!();
            println!("Use --help for usage information");
            println!();
            println!("Quick start:");
            println!("  shell-sentinel scan -p /var/www -r           Scan a web root");
            println!("  shell-sentinel scan -p up.php --db shells.db Use a fingerprint database");
            Ok(())
        }
    }
}

/// Run a web-shell scan.
async fn run_scan(mut config: Config, args: ScanArgs, format: OutputFormat) -> Result<()> {
    if let Some(list) = &args.extension {
        config.scan.set_extensions(list);
    }
    if args.recursive {
        config.scan.recursive = true;
    }
    if args.line {
        config.scan.show_line = true;
    } else if args.no_line {
        config.scan.show_line = false;
    }
    if let Some(threads) = args.threads {
        config.scan.scan_threads = threads;
    }
    if args.db.is_some() {
        config.database.path = args.db;
    }
    config.validate()?;

    let store = Arc::new(SignatureStore::load_path_or_empty(
        config.database.path.as_deref(),
    ));

    let files = FileCollector::new(config.scan.clone()).collect_all(&args.paths)?;
    log::info!("Found {} candidate files", files.len());

    let scanner = WebshellScanner::from_config(&config, store);
    let summary = scanner.scan(files).await?;

    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    write_scan(&mut out, &summary, format.into())
}

/// Handle configuration commands.
fn run_config(action: ConfigAction, config: &Config) -> Result<()> {
    match action {
        ConfigAction::Show => {
            println!("{}", serde_json::to_string_pretty(config)?);
        }
        ConfigAction::Reset => {
            log::info!("Resetting configuration to defaults...");
            Config::default().save(&Config::default_config_path())?;
            println!("Configuration reset to defaults.");
        }
        ConfigAction::Path => {
            println!("{}", Config::default_config_path().display());
        }
    }
    Ok(())
}

/// Show application information.
fn run_info(config: &Config) -> Result<()> {
    println!("shell-sentinel - Web-shell Detector");
    println!();
    println!("Version:          {}", env!("CARGO_PKG_VERSION"));
    println!("Config Path:      {}", Config::default_config_path().display());
    println!("Data Directory:   {}", Config::data_dir().display());
    println!();
    println!("Scan Settings:");
    println!("  Extensions:     {}", config.scan.extensions.join(","));
    println!("  Show Lines:     {}", config.scan.show_line);
    println!("  Recursive:      {}", config.scan.recursive);
    println!("  Max File Size:  {} MB", config.scan.skip_large_files_mb);
    println!("  Threads:        {}", config.scan.scan_threads);
    println!();
    println!("Fingerprint Database:");
    match &config.database.path {
        Some(path) => {
            let store = SignatureStore::load_path_or_empty(Some(path));
            println!("  Path:           {}", path.display());
            println!("  Version:        {}", store.version().unwrap_or("-"));
            println!("  Fingerprints:   {}", store.len());
            println!("  Skipped:        {}", store.skipped());
        }
        None => println!("  (none configured, heuristics only)"),
    }
    Ok(())
}
