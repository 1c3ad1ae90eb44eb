use anyhow::Context;
use argus_runner::{RunnerConfig, SessionSimulation, load_config, load_default_config};
use argus_scheduler::RunKind;

fn print_help() {
    eprintln!(
        r#"Argus - Live-subscription scheduler simulation

USAGE:
    argus [OPTIONS]

OPTIONS:
    --config <PATH>     Load configuration from JSON file
    --sessions <N>      Override the number of sessions to run
    --seed <N>          Override the simulation seed
    --help              Print this help message

ENVIRONMENT VARIABLES:
    RUST_LOG            Log level filter (default: info)

EXAMPLES:
    # One simulated session with the embedded defaults
    argus

    # Three sessions from a config file, with debug logs
    RUST_LOG=debug argus --config argus.json --sessions 3
"#
    );
}

fn parse_value<T: std::str::FromStr>(args: &[String], i: usize, flag: &str) -> T {
    match args.get(i).map(|v| v.parse::<T>()) {
        Some(Ok(value)) => value,
        _ => {
            eprintln!("Error: {} requires a numeric argument", flag);
            std::process::exit(1);
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args: Vec<String> = std::env::args().collect();
    let mut config_path: Option<String> = None;
    let mut sessions: Option<u32> = None;
    let mut seed: Option<u64> = None;

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--help" | "-h" => {
                print_help();
                return Ok(());
            }
            "--config" | "-c" => {
                i += 1;
                if i >= args.len() {
                    eprintln!("Error: --config requires a path argument");
                    std::process::exit(1);
                }
                config_path = Some(args[i].clone());
            }
            "--sessions" => {
                i += 1;
                sessions = Some(parse_value(&args, i, "--sessions"));
            }
            "--seed" => {
                i += 1;
                seed = Some(parse_value(&args, i, "--seed"));
            }
            arg => {
                eprintln!("Unknown argument: {}", arg);
                print_help();
                std::process::exit(1);
            }
        }
        i += 1;
    }

    let mut config: RunnerConfig = match &config_path {
        Some(path) => {
            log::info!("Loading configuration from: {}", path);
            load_config(path).with_context(|| format!("loading {}", path))?
        }
        None => {
            log::info!("Using default configuration");
            load_default_config()?
        }
    };
    if let Some(sessions) = sessions {
        config.session.sessions = sessions;
    }
    if seed.is_some() {
        config.simulation.seed = seed;
    }
    config.validate().context("invalid configuration")?;

    log::info!(
        "Starting Argus: {} slots, {} session(s), {}x time",
        config.allocator.capacity,
        config.session.sessions,
        config.simulation.time_scale
    );

    let mut simulation = SessionSimulation::with_config(config)?;

    let ingress = simulation.ingress();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            log::warn!("Interrupt received, stopping after the current run");
            ingress.shutdown();
        }
    });

    let results = simulation.run().await?;

    println!("\n=== Argus Simulation Summary ===");
    for summary in &results.sessions {
        println!(
            "Session {} ({}): final phase {}, {} deep / {} scheduled / {} preempted runs, {} cycles{}",
            summary.session_id,
            summary.date,
            summary.final_phase,
            summary.count(RunKind::Deep),
            summary.count(RunKind::Scheduled),
            summary.count(RunKind::Preempted),
            summary.pipeline_cycles,
            if summary.stopped_early { " (stopped early)" } else { "" }
        );
        println!("  Shortlist: {} symbols", summary.shortlist.len());
        println!(
            "  Signals: {} preemption, {} position",
            summary.preemption_signals, summary.position_events
        );
    }
    println!("Stored symbols: {}", results.stored_symbols);
    println!("Final pool ({} slots):", results.final_snapshot.len());
    for slot in &results.final_snapshot {
        println!(
            "  {:<8} {:<12} {:.3}",
            slot.symbol_id.as_str(),
            slot.tier.to_string(),
            slot.score
        );
    }

    Ok(())
}
