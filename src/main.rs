use anyhow::Result;
use clap::{Parser, Subcommand};

use shipshape::cli;
use shipshape::ledger::RequestKind;

#[derive(Parser)]
#[command(name = "shipshape")]
#[command(about = "Fleet change-management: request, review, approve, implement")]
#[command(
    long_about = "Shipshape tracks modifications to ships, systems and software through \
                  specialized change-request forms with a uniform approval workflow. \
                  Create a request with 'shipshape new', then walk it through \
                  submit, approve and implement."
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create a new change request of the given kind
    New {
        /// Request kind: hardware, software, system-plan or security-review
        #[arg(long)]
        kind: RequestKind,
        /// Ship the change applies to
        #[arg(long)]
        ship: Option<String>,
        /// Why the change is needed
        #[arg(long)]
        purpose: String,
        /// What will actually change
        #[arg(long)]
        description: String,
    },
    /// Submit a draft request for review (requester only)
    Submit { request_number: String },
    /// Open a submitted request for review (administrators)
    Review { request_number: String },
    /// Approve a pending request (administrators)
    Approve { request_number: String },
    /// Reject a pending request with a reason (administrators)
    Reject {
        request_number: String,
        /// Why the request is rejected
        #[arg(long)]
        reason: String,
    },
    /// Mark an approved request as carried out
    Implement { request_number: String },
    /// Show the ledger status of one request
    Status { request_number: String },
    /// Show the approval history of one request
    History { request_number: String },
    /// List requests waiting for a decision
    Queue,
    /// Find and repair forms whose ledger entry is missing or diverged
    Reconcile,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    if shipshape::config::config()?.observability.tracing_enabled {
        shipshape::telemetry::init_telemetry()?;
    }

    let runtime = tokio::runtime::Runtime::new()?;
    let result = match cli.command {
        Commands::New {
            kind,
            ship,
            purpose,
            description,
        } => runtime.block_on(cli::new_request_command(kind, ship, purpose, description)),
        Commands::Submit { request_number } => {
            runtime.block_on(cli::submit_command(request_number))
        }
        Commands::Review { request_number } => {
            runtime.block_on(cli::review_command(request_number))
        }
        Commands::Approve { request_number } => {
            runtime.block_on(cli::approve_command(request_number))
        }
        Commands::Reject {
            request_number,
            reason,
        } => runtime.block_on(cli::reject_command(request_number, reason)),
        Commands::Implement { request_number } => {
            runtime.block_on(cli::implement_command(request_number))
        }
        Commands::Status { request_number } => {
            runtime.block_on(cli::status_command(request_number))
        }
        Commands::History { request_number } => {
            runtime.block_on(cli::history_command(request_number))
        }
        Commands::Queue => runtime.block_on(cli::queue_command()),
        Commands::Reconcile => runtime.block_on(cli::reconcile_command()),
    };

    shipshape::telemetry::shutdown_telemetry();
    result
}
