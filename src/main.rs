use anyhow::{bail, Context, Result};
use clap::{Parser, ValueEnum};
use std::path::PathBuf;

use railmap_core::logging::{init_tracing, LogLevel, TracingConfig};
use railmap_core::{generate_with_retries, run_survey, verify, GeneratorConfig};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    Ascii,
    Json,
}

/// Generate a seeded rail map and print it.
#[derive(Parser, Debug)]
#[command(name = "railmap", version, about)]
struct Args {
    /// Configuration file (.ron or .json); defaults are used otherwise
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Seed string (time-derived when empty)
    #[arg(short, long)]
    seed: Option<String>,

    /// Grid width in cells
    #[arg(short = 'W', long)]
    width: Option<i32>,

    /// Grid height in cells
    #[arg(short = 'H', long)]
    height: Option<i32>,

    /// Output format
    #[arg(short, long, value_enum, default_value_t = OutputFormat::Ascii)]
    format: OutputFormat,

    /// Re-check the finished map and fail on any violated invariant
    #[arg(long)]
    verify: bool,

    /// Generate N derived seeds in parallel and print a success report
    #[arg(long, value_name = "N")]
    survey: Option<usize>,

    /// Number of seeds to try before giving up
    #[arg(short, long, default_value_t = 1)]
    retries: usize,

    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

fn main() -> Result<()> {
    let args = Args::parse();
    init_tracing(&TracingConfig::with_level(LogLevel::from_verbosity(args.verbose)));

    let mut config = match &args.config {
        Some(path) => GeneratorConfig::load(path)
            .with_context(|| format!("loading configuration from {}", path.display()))?,
        None => GeneratorConfig::default(),
    };
    if let Some(seed) = args.seed {
        config.seed = seed;
    }
    if let Some(width) = args.width {
        config.width = width;
    }
    if let Some(height) = args.height {
        config.height = height;
    }
    config.validate().context("invalid configuration")?;

    if let Some(count) = args.survey {
        let report = run_survey(&config, count);
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    let map = generate_with_retries(&config, args.retries.max(1))?;

    if args.verify {
        let violations = verify(&map, &config);
        if !violations.is_empty() {
            for v in &violations {
                eprintln!("violation: {v}");
            }
            bail!("{} invariant violation(s)", violations.len());
        }
    }

    match args.format {
        OutputFormat::Ascii => {
            print!("{map}");
            let stats = map.stats();
            println!(
                "seed {:?} start {} end {} | wood {} iron {} mountain {} river {} groups {}",
                map.seed,
                map.start,
                map.end,
                stats.wood,
                stats.iron,
                stats.mountain,
                stats.river,
                stats.groups
            );
        }
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&map)?),
    }
    Ok(())
}
