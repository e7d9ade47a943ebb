//! perevod: translate stdin lines with a catalog, or validate a catalog.

use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use tracing::{error, info};

use perevod::{init_tracing, Catalog, EngineConfig, Locale};

#[derive(Parser)]
#[command(name = "perevod")]
#[command(version)]
#[command(about = "Translate runtime UI text with a static catalog")]
struct Cli {
    /// Catalog file (JSON); the built-in catalog when omitted
    #[arg(short, long, value_name = "FILE")]
    catalog: Option<PathBuf>,

    /// Engine config file (JSON)
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Locale to translate into
    #[arg(short, long, default_value = "en")]
    locale: Locale,

    /// Only load the catalog and report malformed rules
    #[arg(long)]
    check: bool,
}

fn main() -> ExitCode {
    init_tracing();
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => match EngineConfig::load_from_file(path) {
            Ok(config) => config,
            Err(e) => {
                error!(path = %path.display(), error = %e, "config load failed");
                return ExitCode::FAILURE;
            }
        },
        None => EngineConfig::default(),
    };

    let catalog_path = cli.catalog.as_ref().or(config.catalog_path.as_ref());
    let catalog = match catalog_path {
        Some(path) => match Catalog::load_from_file(path, &config) {
            Ok(catalog) => catalog,
            Err(e) => {
                error!(path = %path.display(), error = %e, "catalog load failed");
                return ExitCode::FAILURE;
            }
        },
        None => Catalog::builtin(&config),
    };

    if cli.check {
        return check(&catalog);
    }

    match translate_lines(&catalog, cli.locale) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(error = %e, "stdin translation failed");
            ExitCode::FAILURE
        }
    }
}

fn check(catalog: &Catalog) -> ExitCode {
    for (rule, reason) in catalog.skipped_rules() {
        println!("skipped rule {:?}: {reason}", rule.pattern);
    }
    info!(
        version = catalog.version(),
        entries = catalog.len(),
        rules = catalog.rule_count(),
        skipped = catalog.skipped_rules().len(),
        "catalog checked"
    );
    if catalog.skipped_rules().is_empty() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    }
}

fn translate_lines(catalog: &Catalog, locale: Locale) -> io::Result<()> {
    let stdin = io::stdin();
    let stdout = io::stdout();
    let mut out = stdout.lock();
    for line in stdin.lock().lines() {
        writeln!(out, "{}", catalog.translate(&line?, locale))?;
    }
    out.flush()
}
