use std::fs::File;
use std::io::BufReader;
use std::time::Instant;
use anyhow::{Context, Result};
use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;
use flowcache::cache::Cache;
use flowcache::config::SimulatorConfig;
use flowcache::io::get_reader;
use flowcache::simulator::Simulator;

#[cfg(debug_assertions)]
const DEBUG_DEFAULT: bool = true;

#[cfg(not(debug_assertions))]
const DEBUG_DEFAULT: bool = false;

#[derive(Parser, Debug)]
#[command(about = String::from("Replays a packet trace against a flow cache and reports the hit rate"))]
struct Args {
    /// JSON simulator configuration
    config: String,
    /// Tab separated packet trace, read from stdin when omitted
    trace: Option<String>,

    #[arg(short, long)]
    performance: bool,

    #[arg(short, long, default_value_t = DEBUG_DEFAULT)]
    debug: bool,
}

fn main() -> Result<()> {
    let start = Instant::now();
    let args = Args::parse();
    // Logs go to stderr so stdout only carries the result. RUST_LOG overrides the default level
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let config_file = File::open(&args.config)
        .with_context(|| format!("Couldn't open the config file at path {}", args.config))?;
    let config = SimulatorConfig::from_reader(BufReader::new(config_file))
        .context("Couldn't parse the config file")?;
    let mut simulator = Simulator::new(&config).context("Invalid cache configuration")?;
    let trace = args.trace.as_deref().unwrap_or("<stdin>");
    info!(cache = %simulator.cache().describe(), trace, "simulating");

    let result = match &args.trace {
        Some(path) => {
            let trace_file = File::open(path)
                .with_context(|| format!("Couldn't open the trace file at path {path}"))?;
            let trace_reader = get_reader(trace_file).context("Couldn't map the trace file")?;
            simulator.simulate(trace_reader)
        }
        None => simulator.simulate(std::io::stdin().lock()),
    }.context("Couldn't read the trace")?;
    println!("{}", serde_json::to_string_pretty(result).context("Couldn't serialise the output")?);

    if args.performance {
        let simulation_time = simulator.get_execution_time();
        let total_time = start.elapsed();
        println!("Simulation time: {}s", simulation_time.as_nanos() as f64 / 1e9);
        println!("Total execution time (includes initial parsing, configuration, and output): {}s", total_time.as_nanos() as f64 / 1e9)
    }
    if args.debug {
        #[cfg(debug_assertions)]
        println!("Running the debug binary, debug mode is enabled by default. If benchmarking, do not use this binary, re-compile with the --release argument when using cargo run");
        println!("Parsed input configuration: {config:?}");
        println!("Resident flows at the end of the trace: {}", simulator.cache().resident_count());
        println!("Malformed records skipped: {}", simulator.get_skipped_record_count());
        println!("Packets without a flow key: {}", simulator.get_ignored_packet_count());
    }
    Ok(())
}
