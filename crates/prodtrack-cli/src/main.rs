//! # prodtrack CLI entry point
//!
//! Parses command-line arguments and dispatches to subcommand handlers.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use prodtrack_cli::identity::{run_enroll_admin, run_register, EnrollAdminArgs, RegisterArgs};
use prodtrack_cli::session::{run_issue_token, run_verify_token, IssueTokenArgs, VerifyTokenArgs};
use prodtrack_cli::wallet::{run_list_identities, run_revoke, ListIdentitiesArgs, RevokeArgs};

/// Product tracking operator tool.
///
/// Manages the identity keystore shared with the API server and mints or
/// inspects session tokens.
#[derive(Parser, Debug)]
#[command(name = "prodtrack", version, about, long_about = None)]
struct Cli {
    /// Enable verbose output. Repeat for more verbosity (-v, -vv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Identity keystore directory.
    #[arg(long, env = "WALLET_DIR", global = true, default_value = "wallet")]
    wallet_dir: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Enroll organization administrators.
    EnrollAdmin(EnrollAdminArgs),

    /// Register and enroll an end user.
    Register(RegisterArgs),

    /// Issue a session token for a stored identity.
    IssueToken(IssueTokenArgs),

    /// Verify a session token and print its claims.
    VerifyToken(VerifyTokenArgs),

    /// List the identities held in the keystore.
    ListIdentities(ListIdentitiesArgs),

    /// Remove an identity from the keystore.
    Revoke(RevokeArgs),
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let filter = match cli.verbose {
        0 => EnvFilter::new("warn"),
        1 => EnvFilter::new("info"),
        _ => EnvFilter::new("debug"),
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let result = match cli.command {
        Commands::EnrollAdmin(args) => block_on(run_enroll_admin(&args, &cli.wallet_dir)),
        Commands::Register(args) => block_on(run_register(&args, &cli.wallet_dir)),
        Commands::IssueToken(args) => run_issue_token(&args, &cli.wallet_dir),
        Commands::VerifyToken(args) => run_verify_token(&args, &cli.wallet_dir),
        Commands::ListIdentities(args) => run_list_identities(&args, &cli.wallet_dir),
        Commands::Revoke(args) => run_revoke(&args, &cli.wallet_dir),
    };

    match result {
        Ok(code) => ExitCode::from(code),
        Err(e) => {
            tracing::error!("{e:#}");
            eprintln!("error: {e:#}");
            ExitCode::from(1)
        }
    }
}

fn block_on<F: std::future::Future<Output = anyhow::Result<u8>>>(future: F) -> anyhow::Result<u8> {
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?
        .block_on(future)
}
