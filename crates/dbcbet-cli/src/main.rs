//! Bounded-exhaustive testing CLI.
//!
//! Provides the `dbcbet` binary, which runs the bounded-exhaustive test
//! driver over the bundled demonstration domains and prints the resulting
//! invoices as text or JSON.

mod demos;
mod render;

use std::process;

use clap::{Parser, Subcommand};
use tracing::Level;

use dbcbet_check::{Bet, BetConfig, Invoice};

use render::Format;

/// Design-by-contract checking and bounded-exhaustive testing.
#[derive(Parser)]
#[command(name = "dbcbet", about = "Design-by-contract checking and bounded-exhaustive testing")]
struct Cli {
    /// Increase log verbosity (-v info, -vv debug, -vvv trace).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

/// Available subcommands.
#[derive(Subcommand)]
enum Commands {
    /// Run a demonstration domain through the test driver.
    Run {
        /// Demo name (see `dbcbet list`).
        demo: String,

        /// Cap on argument combinations per enumeration.
        #[arg(long)]
        arg_scope: Option<usize>,

        /// Do not log operations that declare no precondition.
        #[arg(long)]
        no_audit: bool,

        /// Output format.
        #[arg(short, long, value_enum, default_value = "text")]
        format: Format,
    },

    /// List the demonstration domains.
    List,
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match cli.command {
        Commands::Run {
            demo,
            arg_scope,
            no_audit,
            format,
        } => {
            let config = BetConfig {
                argument_scope: arg_scope,
                audit_missing_preconditions: !no_audit,
            };
            process::exit(run_demo(&demo, config, format));
        }
        Commands::List => {
            for demo in demos::DEMOS {
                println!("{:<12} {}", demo.name, demo.about);
            }
        }
    }
}

fn init_tracing(verbosity: u8) {
    let level = match verbosity {
        0 => Level::WARN,
        1 => Level::INFO,
        2 => Level::DEBUG,
        _ => Level::TRACE,
    };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .init();
}

/// Execute the run subcommand.
///
/// Returns exit code: 0 = no failures, 1 = contract failures found,
/// 2 = fatal error (unknown demo, setup failure, aborted run).
fn run_demo(name: &str, config: BetConfig, format: Format) -> i32 {
    let Some(demo) = demos::find(name) else {
        eprintln!("Error: unknown demo '{}' (try `dbcbet list`)", name);
        return 2;
    };
    let setup = match demo.build() {
        Ok(s) => s,
        Err(e) => {
            eprintln!("Error: failed to set up '{}': {}", name, e);
            return 2;
        }
    };

    let mut invoices: Vec<Invoice> = Vec::with_capacity(setup.targets.len());
    for ty in &setup.targets {
        let mut bet = Bet::new(&setup.registry, &setup.finitizations).with_config(config.clone());
        match bet.run(*ty) {
            Ok(invoice) => invoices.push(invoice),
            Err(e) => {
                eprintln!("Error: run aborted: {}", e);
                return 2;
            }
        }
    }

    match format {
        Format::Text => {
            let reports: Vec<String> = invoices.iter().map(render::render_text).collect();
            print!("{}", reports.join("\n"));
        }
        Format::Json => match render::render_json(&invoices) {
            Ok(json) => println!("{}", json),
            Err(e) => {
                eprintln!("Error: failed to serialize invoices: {}", e);
                return 2;
            }
        },
    }

    if invoices.iter().any(Invoice::has_failures) {
        1
    } else {
        0
    }
}
