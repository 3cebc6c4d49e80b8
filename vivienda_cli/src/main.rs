mod beacon;

use std::io::{self, Write};

use anyhow::{Context, Result, bail};
use clap::Parser;
use env_logger::Env;
use log::debug;
use vivienda_core::{PulseRequest, PulseSource, RunConfig, SelectionRun, Stage, TOTAL_STEPS};

use crate::beacon::HttpBeacon;

const OK_MARK: &str = "\x1b[32mok \u{2713}\x1b[0m";

#[derive(Parser)]
#[command(
    name = "vivienda",
    author,
    version,
    about = "Verifiable random selection of dwellings from a public beacon pulse"
)]
struct Cli {
    /// Operator secret as hex, mixed into the beacon value.
    #[arg(short = 's', long, default_value = "")]
    secret: String,
    /// Beacon pulse time in Unix milliseconds; latest pulse when empty.
    #[arg(short = 'f', long = "date", default_value = "")]
    date: String,
    /// Number of output files to split the selection into.
    #[arg(short = 'n', long, default_value_t = 1)]
    files: usize,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging();
    if cli.files == 0 {
        bail!("--files must be a positive integer");
    }
    let request = PulseRequest::parse(&cli.date).context("parsing --date")?;
    let config = RunConfig::from_env().context("reading VIVIENDA_* settings")?;
    debug!("run configuration: {config:?}");

    progress(1, "Fetching beacon pulse");
    let beacon = HttpBeacon::from_env()?;
    let pulse = beacon.fetch(request)?;
    done();
    progress(Stage::Seed.step(), Stage::Seed.label());

    let run = SelectionRun::new(config);
    let report = run
        .run_files(&pulse, &cli.secret, cli.files, |stage| {
            done();
            if let Some(next) = stage.next() {
                progress(next.step(), next.label());
            }
        })
        .with_context(|| {
            format!(
                "selecting dwellings from {} and {}",
                run.config().base_table.display(),
                run.config().extension_table.display()
            )
        })?;

    let summary = &report.summary;
    println!();
    println!("Pulse {} ({})", summary.pulse_time, summary.pulse_uri);
    println!("Selected dwellings: {}", summary.selected);
    println!("Result files: {}", summary.files);
    for path in &report.files {
        println!("  {}", path.display());
    }
    println!("Audit manifest: {}", report.manifest_path.display());
    Ok(())
}

fn init_logging() {
    let mut builder = env_logger::Builder::from_env(Env::default().default_filter_or("info"));
    builder.format_timestamp(None);
    let _ = builder.try_init();
}

fn progress(step: usize, label: &str) {
    print!("({step}/{TOTAL_STEPS}) {label}... ");
    let _ = io::stdout().flush();
}

fn done() {
    println!("{OK_MARK}");
}
