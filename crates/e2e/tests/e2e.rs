//! E2E test harness entry point
//!
//! This file is the test binary that runs the sortable lists suite.
//! Run with: cargo test --package sortable-e2e --test e2e -- [OPTIONS]

use std::path::{Path, PathBuf};

use clap::Parser;
use regex::Regex;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use sortable_e2e::board::BoardFactory;
use sortable_e2e::playwright::PlaywrightFactory;
use sortable_e2e::suite::default_suite;
use sortable_e2e::{CaseFilter, DriverFactory, E2eError, E2eResult, SuiteConfig, TestCase, TestRunner};

/// Slow-mo applied to headed runs unless the config sets one
const HEADED_SLOW_MO_MS: u64 = 500;

const DEFAULT_CONFIG: &str = "e2e.yaml";

#[derive(Parser, Debug)]
#[command(name = "sortable-e2e")]
#[command(about = "E2E test runner for the sortable lists page")]
struct Args {
    /// Suite config file (defaults to e2e.yaml when present)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Directory of YAML test cases (defaults to the built-in suite)
    #[arg(short, long)]
    specs: Option<PathBuf>,

    /// Run only cases with this tag
    #[arg(short, long)]
    tag: Option<String>,

    /// Run only cases whose name matches this regex
    #[arg(short, long)]
    grep: Option<String>,

    /// Run only the named project
    #[arg(short, long)]
    project: Option<String>,

    /// Seed for random item selection
    #[arg(long, env = "E2E_SEED")]
    seed: Option<u64>,

    /// Page under test
    #[arg(long, env = "E2E_BASE_URL")]
    base_url: Option<String>,

    /// Show the browser window
    #[arg(long)]
    headed: bool,

    /// Retries per failed case
    #[arg(long)]
    retries: Option<u32>,

    /// Output directory for results
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Run against the in-memory board instead of a browser
    #[arg(long)]
    dry_run: bool,

    /// Print the selected cases and exit
    #[arg(long)]
    list: bool,

    /// Fail instead of skipping when Playwright is not installed
    #[arg(long)]
    require_browser: bool,
}

fn main() {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let args = Args::parse();

    // Run async main
    let rt = match tokio::runtime::Runtime::new() {
        Ok(rt) => rt,
        Err(e) => {
            eprintln!("Error: failed to create tokio runtime: {}", e);
            std::process::exit(2);
        }
    };
    let result = rt.block_on(async_main(args));

    match result {
        Ok(true) => std::process::exit(0),
        Ok(false) => std::process::exit(1),
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(2);
        }
    }
}

fn load_config(args: &Args) -> E2eResult<SuiteConfig> {
    let path = match &args.config {
        Some(path) => Some(path.clone()),
        None => Some(PathBuf::from(DEFAULT_CONFIG)).filter(|p| p.exists()),
    };
    let mut config = SuiteConfig::load(path.as_deref())?;

    if let Some(url) = &args.base_url {
        config.base_url = url.clone();
    }
    if let Some(seed) = args.seed {
        config.selection_seed = Some(seed);
    }
    if args.headed {
        config.headless = false;
        if config.slow_mo_ms == 0 {
            config.slow_mo_ms = HEADED_SLOW_MO_MS;
        }
    }
    if let Some(retries) = args.retries {
        config.retries = retries;
    }
    if let Some(output) = &args.output {
        config.output_dir = output.clone();
    }
    config.validate()?;
    Ok(config)
}

fn load_cases(specs: Option<&Path>) -> E2eResult<Vec<TestCase>> {
    match specs {
        Some(dir) => TestCase::load_all(dir),
        None => Ok(default_suite()),
    }
}

async fn run<F: DriverFactory>(
    factory: F,
    config: SuiteConfig,
    cases: &[TestCase],
    filter: &CaseFilter,
) -> E2eResult<bool> {
    let mut runner = TestRunner::new(factory, config);
    let results = runner.run_cases(cases, filter).await;
    runner.stop_server();

    let results = results?;
    runner.write_results(&results)?;
    Ok(results.success())
}

async fn async_main(args: Args) -> E2eResult<bool> {
    let config = load_config(&args)?;
    let cases = load_cases(args.specs.as_deref())?;
    let filter = CaseFilter {
        tag: args.tag.clone(),
        grep: args.grep.as_deref().map(Regex::new).transpose()?,
        project: args.project.clone(),
    };

    if args.list {
        let lister = TestRunner::new(BoardFactory::default(), config);
        for case in lister.select_cases(&cases, &filter)? {
            println!("{}  [{}]", case.name, case.tags.join(", "));
        }
        return Ok(true);
    }

    if args.dry_run {
        info!("Dry run against the simulated board");
        return run(BoardFactory::default(), config, &cases, &filter).await;
    }

    let factory = match PlaywrightFactory::new(config.clone()) {
        Ok(factory) => factory,
        Err(E2eError::PlaywrightNotFound) if !args.require_browser => {
            warn!("Playwright is not installed; skipping browser run (use --dry-run for the simulated board)");
            return Ok(true);
        }
        Err(e) => return Err(e),
    };
    run(factory, config, &cases, &filter).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_args_definition() {
        Args::command().debug_assert();
    }
}
