//! Ticket Lottery CLI
//!
//! Replays lottery scenarios against the in-memory runtime.

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;
use ticket_lottery::config::{generate_sample_config, ConfigLoader, LoggingConfig};
use ticket_lottery::lottery::winner_index;
use ticket_lottery::scenario::{run_scenario, Scenario, ScenarioReport, StepOutcome};
use ticket_lottery::AppResult;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "ticket-lottery")]
#[command(about = "Deterministic ticket lottery", long_about = None)]
struct Cli {
    /// Configuration file (TOML)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Replay a scenario file and report each step
    Run {
        scenario: PathBuf,

        /// Print the report as JSON
        #[arg(long)]
        json: bool,
    },

    /// Write a sample configuration file
    InitConfig { path: PathBuf },

    /// Show which ticket index wins at a given time
    Winner {
        #[arg(long)]
        now: u64,

        #[arg(long)]
        max_tickets: u64,

        #[arg(long, default_value = "0")]
        epoch_zero: u64,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    match run(cli) {
        Ok(code) => code,
        Err(e) => {
            eprintln!("❌ {}", e);
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> AppResult<ExitCode> {
    let mut loader = ConfigLoader::new();
    if let Some(path) = &cli.config {
        loader = loader.with_path(path);
    }
    let config = loader.load()?;
    init_tracing(&config.logging);

    match cli.command {
        Command::Run { scenario, json } => {
            let scenario = Scenario::load(&scenario)?;
            let report = run_scenario(&scenario, &config.deployment)?;

            if json {
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                print_report(&report);
            }

            Ok(if report.is_success() {
                ExitCode::SUCCESS
            } else {
                ExitCode::FAILURE
            })
        }
        Command::InitConfig { path } => {
            generate_sample_config(&path)?;
            println!("✅ Wrote sample configuration to {}", path.display());
            Ok(ExitCode::SUCCESS)
        }
        Command::Winner {
            now,
            max_tickets,
            epoch_zero,
        } => {
            let index = winner_index(now, epoch_zero, max_tickets)?;
            println!("{}", index);
            Ok(ExitCode::SUCCESS)
        }
    }
}

fn init_tracing(logging: &LoggingConfig) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&logging.level));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);

    if logging.json {
        builder.json().init();
    } else {
        builder.init();
    }
}

fn print_report(report: &ScenarioReport) {
    println!("🎟️  Scenario: {}", report.name);
    println!("============================================");

    let mut section: Option<&str> = None;
    for step in &report.steps {
        if let Some(heading) = step.section.as_deref() {
            if section != Some(heading) {
                println!("\n## {}", heading);
                section = Some(heading);
            }
        }

        let mark = if step.passed { "✅" } else { "❌" };
        let result = match &step.outcome {
            StepOutcome::Accepted { transfers, .. } if transfers.is_empty() => "accepted".to_string(),
            StepOutcome::Accepted { transfers, .. } => {
                let moved: Vec<String> = transfers
                    .iter()
                    .map(|t| format!("{:?} {} -> {}", t.kind, t.amount, t.recipient.short()))
                    .collect();
                format!("accepted [{}]", moved.join(", "))
            }
            StepOutcome::Rejected { code, .. } => format!("rejected {}", code),
        };

        println!(
            "{} #{:<3} t={:<6} {:<10} {:<24} amount={:<10} {}",
            mark,
            step.index,
            step.now,
            step.sender,
            step.call.to_string(),
            step.amount,
            result
        );
    }

    println!("\n📊 Balances");
    for (label, amount) in &report.balances {
        println!("   {:<10} {}", label, amount);
    }

    let state = &report.final_state.state;
    println!(
        "\n🏁 {} passed, {} failed | round {} ({}/{} sold, cost {}) | custody {}",
        report.passed,
        report.failed,
        state.phase(),
        state.tickets_sold(),
        state.max_tickets(),
        state.ticket_cost(),
        report.final_state.custody
    );
}
