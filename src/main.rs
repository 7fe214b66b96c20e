//! capsim entry point: CLI wiring and config-driven fleet construction.

use std::path::Path;
use std::process;

use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

use capsim::config::ScenarioConfig;
use capsim::error::EnergyError;
use capsim::io::export::export_report;
use capsim::io::trace::{CsvTraceRecorder, NullRecorder, TraceRecorder};
use capsim::runner::run_scenario;
use capsim::sim::kpi::EnergyReport;

/// Parsed CLI arguments.
struct CliArgs {
    scenario_path: Option<String>,
    preset: Option<String>,
    seed_override: Option<u64>,
    devices_override: Option<usize>,
    trace_out: Option<String>,
    report_out: Option<String>,
}

fn print_help() {
    eprintln!("capsim: energy simulator for capacitor-powered LoRaWAN end devices");
    eprintln!();
    eprintln!("Usage: capsim [OPTIONS]");
    eprintln!();
    eprintln!("Options:");
    eprintln!("  --scenario <path>        Load scenario from TOML config file");
    eprintln!(
        "  --preset <name>          Use a built-in preset ({})",
        ScenarioConfig::PRESETS.join(", ")
    );
    eprintln!("  --seed <u64>             Override random seed");
    eprintln!("  --devices <n>            Override the number of devices");
    eprintln!("  --trace-out <path>       Write every trace point to CSV");
    eprintln!("  --report-out <path>      Write the report (.json for JSON, CSV otherwise)");
    eprintln!("  --help                   Show this help message");
    eprintln!();
    eprintln!("If no --scenario or --preset is given, the baseline preset is used.");
    eprintln!("Log verbosity follows RUST_LOG (default: info).");
}

fn next_value(args: &[String], i: &mut usize, flag: &str, what: &str) -> String {
    *i += 1;
    if *i >= args.len() {
        eprintln!("error: {flag} requires a {what} argument");
        process::exit(1);
    }
    args[*i].clone()
}

fn parse_args() -> CliArgs {
    let args: Vec<String> = std::env::args().collect();
    let mut cli = CliArgs {
        scenario_path: None,
        preset: None,
        seed_override: None,
        devices_override: None,
        trace_out: None,
        report_out: None,
    };

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--help" | "-h" => {
                print_help();
                process::exit(0);
            }
            "--scenario" => cli.scenario_path = Some(next_value(&args, &mut i, "--scenario", "path")),
            "--preset" => cli.preset = Some(next_value(&args, &mut i, "--preset", "name")),
            "--seed" => {
                let v = next_value(&args, &mut i, "--seed", "u64");
                if let Ok(s) = v.parse::<u64>() {
                    cli.seed_override = Some(s);
                } else {
                    eprintln!("error: --seed value \"{v}\" is not a valid u64");
                    process::exit(1);
                }
            }
            "--devices" => {
                let v = next_value(&args, &mut i, "--devices", "count");
                match v.parse::<usize>() {
                    Ok(n) if n > 0 => cli.devices_override = Some(n),
                    _ => {
                        eprintln!("error: --devices value \"{v}\" is not a positive integer");
                        process::exit(1);
                    }
                }
            }
            "--trace-out" => cli.trace_out = Some(next_value(&args, &mut i, "--trace-out", "path")),
            "--report-out" => {
                cli.report_out = Some(next_value(&args, &mut i, "--report-out", "path"));
            }
            other => {
                eprintln!("error: unknown argument \"{other}\"");
                print_help();
                process::exit(1);
            }
        }
        i += 1;
    }

    cli
}

fn init_tracing() {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

fn run<R: TraceRecorder>(scenario: &ScenarioConfig, recorder: R) -> Result<EnergyReport, EnergyError> {
    run_scenario(scenario, recorder).map(|r| r.report)
}

fn main() {
    let cli = parse_args();
    init_tracing();

    // Load config: --scenario takes priority, then --preset, then baseline default
    let mut scenario = if let Some(ref path) = cli.scenario_path {
        match ScenarioConfig::from_toml_file(Path::new(path)) {
            Ok(cfg) => cfg,
            Err(e) => {
                eprintln!("{e}");
                process::exit(1);
            }
        }
    } else if let Some(ref name) = cli.preset {
        match ScenarioConfig::from_preset(name) {
            Ok(cfg) => cfg,
            Err(e) => {
                eprintln!("{e}");
                process::exit(1);
            }
        }
    } else {
        ScenarioConfig::baseline()
    };

    if let Some(seed) = cli.seed_override {
        scenario.simulation.seed = seed;
    }
    if let Some(n) = cli.devices_override {
        scenario.simulation.devices = n;
    }

    let errors = scenario.validate();
    if !errors.is_empty() {
        for e in &errors {
            eprintln!("{e}");
        }
        process::exit(1);
    }

    let result = match cli.trace_out {
        Some(ref path) => CsvTraceRecorder::create(Path::new(path))
            .and_then(|recorder| run(&scenario, recorder)),
        None => run(&scenario, NullRecorder),
    };
    let report = match result {
        Ok(report) => report,
        Err(e) => {
            eprintln!("error: {e}");
            process::exit(1);
        }
    };

    for d in &report.devices {
        println!("{d}");
    }
    println!("\n{report}");

    if let Some(ref path) = cli.trace_out {
        eprintln!("Trace written to {path}");
    }
    if let Some(ref path) = cli.report_out {
        if let Err(e) = export_report(&report, Path::new(path)) {
            eprintln!("error: failed to write report: {e}");
            process::exit(1);
        }
        eprintln!("Report written to {path}");
    }
}
