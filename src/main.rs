//! Payment Processor CLI
//!
//! Runs a CSV batch of charges and refunds through the payment pipeline and
//! writes one result row per operation to stdout.
//!
//! # Usage
//!
//! ```bash
//! cargo run -- payments.csv > results.csv
//! ```
//!
//! # Environment Variables
//!
//! - `RUST_LOG`: Set to `debug` or `warn` to control logging verbosity
//! - `PAYMENTS_GATEWAY`: `stripe` (default) or `paypal`
//! - `PAYMENTS_ENV`: environment tag stamped on audit events
//! - `NOTIFY_RETRY_ATTEMPTS`: attempts per notification (default 3)

use log::info;
use payment_processor::{BatchError, BatchRunner, Result, RunnerConfig};
use std::env;
use std::fs::File;
use std::io::{self, BufReader};
use std::process;

#[tokio::main(flavor = "current_thread")]
async fn main() {
    env_logger::init();

    if let Err(e) = run().await {
        eprintln!("Error: {}", e);
        process::exit(1);
    }
}

async fn run() -> Result<()> {
    let args: Vec<String> = env::args().collect();
    if args.len() < 2 {
        return Err(BatchError::MissingArgument);
    }

    let config = RunnerConfig::from_env()?;
    info!("Using {:?} gateway in {}", config.gateway, config.environment);

    let input_path = &args[1];
    let file = File::open(input_path)?;
    let reader = BufReader::new(file);

    let mut runner = BatchRunner::new(config.build_processor());
    runner.process_csv(reader).await?;
    runner.flush_notifications().await;

    let stdout = io::stdout();
    let handle = stdout.lock();
    runner.write_output(handle)?;

    Ok(())
}
