//! jstail - drain a NATS JetStream backlog to stdout
//!
//! # Usage
//!
//! ```bash
//! # Print everything pending on two subjects, then exit
//! jstail --stream ORDERS --subjects orders.created,orders.updated
//!
//! # Only payloads containing a substring, as JSON lines
//! jstail --stream ORDERS --subjects 'orders.>' --query customer-42 -o json
//!
//! # Skip the NATS context and talk to a server directly
//! jstail --server nats://localhost:4222 --stream ORDERS --subjects 'orders.>'
//! ```

mod cmd;

use std::process::ExitCode;

use clap::Parser;

/// jstail - drain a NATS JetStream backlog to stdout
#[derive(Parser, Debug)]
#[command(name = "jstail")]
#[command(version, about, long_about = None)]
struct Cli {
    #[command(flatten)]
    tail: cmd::tail::TailArgs,
}

#[tokio::main]
async fn main() -> ExitCode {
    // Before parsing so env-backed flags see .env values
    let env_file = jstail_config::load_env_file();
    let cli = Cli::parse();

    if let Err(e) = cmd::tail::init_logging(&cli.tail) {
        return fail(&e);
    }
    env_file.report();

    match cmd::tail::run(cli.tail).await {
        Ok(summary) => {
            tracing::debug!(
                fetches = summary.fetches,
                received = summary.received,
                emitted = summary.emitted,
                "done"
            );
            ExitCode::SUCCESS
        }
        Err(e) => fail(&e),
    }
}

fn fail(err: &anyhow::Error) -> ExitCode {
    eprintln!("error: {err:#}");
    ExitCode::from(cmd::tail::exit_code(err))
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_required_flags_are_not_clap_required() {
        // Missing --stream must reach our own check (exit 1), not clap's (exit 2)
        let cli = Cli::try_parse_from(["jstail"]).unwrap();
        assert!(cli.tail.stream.is_none());
        assert!(cli.tail.subjects.is_none());
    }
}
