/*!
 * Handoff IPC - Main Entry Point
 *
 * Runs one of the demo programs with both roles in this process:
 * - one-way: the parent streams text messages to the child
 * - two-way: the child asks the parent to add numbers
 * - fifo: the parent hands the child a fifo and drains records from it
 */

use clap::Parser;
use std::process::ExitCode;
use std::time::Duration;
use tracing::{error, info};

use handoff_ipc::core::errors::{exit_code, status};
use handoff_ipc::{init_tracing, launch, ClosePolicy, Program, ReadShape, SessionConfig};

#[derive(Parser, Debug)]
#[command(name = "handoff-ipc")]
#[command(author, version, about = "Channel and fifo IPC between a parent and a child")]
struct Cli {
    /// Program to run
    #[arg(value_enum)]
    program: Program,

    /// What the server does with requests queued when the client leaves
    #[arg(long, value_enum)]
    close_policy: Option<ClosePolicy>,

    /// How the streaming consumer detects the end of the stream
    #[arg(long, value_enum)]
    read_shape: Option<ReadShape>,

    /// Number of messages, requests, or records to send
    #[arg(short = 'n', long)]
    count: Option<u32>,

    /// Give up on any wait after this many milliseconds
    #[arg(long)]
    timeout_ms: Option<u64>,

    /// Skip all pacing sleeps
    #[arg(long)]
    fast: bool,

    /// Print the launch report as JSON
    #[arg(long)]
    json: bool,
}

impl Cli {
    fn apply(&self, mut config: SessionConfig) -> SessionConfig {
        if self.fast {
            config = config.without_delays();
        }
        if let Some(policy) = self.close_policy {
            config.close_policy = policy;
        }
        if let Some(shape) = self.read_shape {
            config.read_shape = shape;
        }
        if let Some(count) = self.count {
            match self.program {
                Program::OneWay => config.message_count = count,
                Program::TwoWay => config.request_count = count,
                Program::FifoTransfer => config.record_count = count as usize,
            }
        }
        if let Some(millis) = self.timeout_ms {
            config.wait_timeout = Some(Duration::from_millis(millis));
        }
        config
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing();

    let config = match SessionConfig::from_env() {
        Ok(config) => cli.apply(config),
        Err(e) => {
            error!(error = %e, "Invalid configuration");
            return ExitCode::from(exit_code(status::INVALID_ARGS));
        }
    };

    info!(program = %cli.program, "Launching");
    let report = match launch(cli.program, &config) {
        Ok(report) => report,
        Err(e) => {
            error!(error = %e, status = e.status(), "Launch failed");
            return ExitCode::from(exit_code(e.status()));
        }
    };

    if cli.json {
        match serde_json::to_string_pretty(&report) {
            Ok(json) => println!("{}", json),
            Err(e) => error!(error = %e, "Failed to serialize launch report"),
        }
    }

    info!(
        parent = report.parent.status,
        child = report.child.status,
        "Both roles finished"
    );
    ExitCode::from(report.exit_code())
}
