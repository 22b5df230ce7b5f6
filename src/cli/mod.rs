// CLI command handlers - thin glue over the workflow coordinator

use std::sync::Arc;

use anyhow::{anyhow, Result};

use crate::audit::TracingAuditRecorder;
use crate::config;
use crate::forms::{FormDetails, InMemoryFormStore, NewForm};
use crate::identity::{IdentityProvider, StaticIdentity, UserIdentity};
use crate::ledger::{InMemoryLedgerStore, RequestKind};
use crate::trail::InMemoryTrailStore;
use crate::workflow::WorkflowCoordinator;

/// Build the coordinator for a CLI session.
///
/// Without the `database` feature this wires the in-memory stores, which
/// live only as long as the process; compile with `--features database`
/// for durable state.
pub async fn build_coordinator() -> Result<WorkflowCoordinator> {
    #[cfg(feature = "database")]
    {
        if let Some(manager) = crate::database::init_database().await? {
            let cfg = config::config()?;
            let store = crate::database::SqliteWorkflowStore::new(
                manager.pool().clone(),
                cfg.workflow.request_number_attempts,
            );
            return Ok(WorkflowCoordinator::new(
                Arc::new(store.clone()),
                Arc::new(store.clone()),
                Arc::new(store),
                Arc::new(TracingAuditRecorder::new()),
            ));
        }
    }

    Ok(WorkflowCoordinator::new(
        Arc::new(InMemoryFormStore::new()),
        Arc::new(InMemoryLedgerStore::new()),
        Arc::new(InMemoryTrailStore::new()),
        Arc::new(TracingAuditRecorder::new()),
    ))
}

/// Resolve the acting user from configuration. Identity is authoritative:
/// a session without one cannot run any command.
pub async fn resolve_actor() -> Result<UserIdentity> {
    let cfg = config::config()?;
    let role = cfg
        .identity
        .role
        .parse()
        .map_err(|e| anyhow!("invalid configured role: {e}"))?;
    let provider = StaticIdentity::new(UserIdentity::new(cfg.identity.user_id.clone(), role));
    Ok(provider.current_user().await?)
}

pub async fn new_request_command(
    kind: RequestKind,
    ship: Option<String>,
    purpose: String,
    description: String,
) -> Result<()> {
    let coordinator = build_coordinator().await?;
    let actor = resolve_actor().await?;

    let form = coordinator
        .create(
            NewForm {
                requester_user_id: String::new(),
                ship_id: ship,
                purpose,
                description,
                details: FormDetails::empty_for(kind),
            },
            &actor,
        )
        .await?;

    println!("📋 Created {} request {}", kind.label(), form.request_number);
    println!("   Requester: {}", form.requester_user_id);
    println!("   Submit it with: shipshape submit {}", form.request_number);
    Ok(())
}

pub async fn submit_command(request_number: String) -> Result<()> {
    let coordinator = build_coordinator().await?;
    let actor = resolve_actor().await?;

    coordinator.submit(&request_number, &actor).await?;
    println!("📨 Submitted {request_number} for review");
    Ok(())
}

pub async fn review_command(request_number: String) -> Result<()> {
    let coordinator = build_coordinator().await?;
    let actor = resolve_actor().await?;

    let entry = coordinator.begin_review(&request_number, &actor).await?;
    println!("🔍 {} is now {}", request_number, entry.status);
    Ok(())
}

pub async fn approve_command(request_number: String) -> Result<()> {
    let coordinator = build_coordinator().await?;
    let actor = resolve_actor().await?;

    coordinator.approve(&request_number, &actor).await?;
    println!("✅ Approved {request_number}");
    Ok(())
}

pub async fn reject_command(request_number: String, reason: String) -> Result<()> {
    let coordinator = build_coordinator().await?;
    let actor = resolve_actor().await?;

    coordinator.reject(&request_number, &actor, &reason).await?;
    println!("❌ Rejected {request_number}: {reason}");
    Ok(())
}

pub async fn implement_command(request_number: String) -> Result<()> {
    let coordinator = build_coordinator().await?;
    let actor = resolve_actor().await?;

    let entry = coordinator.implement(&request_number, &actor).await?;
    println!("🏁 {} is {}", request_number, entry.status);
    Ok(())
}

pub async fn status_command(request_number: String) -> Result<()> {
    let coordinator = build_coordinator().await?;

    match coordinator.status_of(&request_number).await? {
        Some(entry) => {
            println!("📊 {request_number}");
            println!("   Kind:      {}", entry.kind.label());
            println!("   Status:    {}", entry.status);
            println!("   Requester: {}", entry.requested_by);
            println!("   Purpose:   {}", entry.purpose);
            if let Some(ship) = &entry.ship_id {
                println!("   Ship:      {ship}");
            }
            println!("   Updated:   {}", entry.updated_at.format("%Y-%m-%d %H:%M UTC"));
        }
        None => println!("📭 No change request found for {request_number}"),
    }
    Ok(())
}

pub async fn history_command(request_number: String) -> Result<()> {
    let coordinator = build_coordinator().await?;

    let history = coordinator.history(&request_number).await?;
    if history.is_empty() {
        println!("📭 No approval history for {request_number}");
        return Ok(());
    }

    println!("📜 Approval history for {request_number}:");
    for entry in history {
        let comment = entry
            .comment
            .as_deref()
            .map(|c| format!(" ({c})"))
            .unwrap_or_default();
        println!(
            "   {}. {} by {} at {}{}",
            entry.stage,
            entry.action,
            entry.action_by,
            entry.action_at.format("%Y-%m-%d %H:%M UTC"),
            comment
        );
    }
    Ok(())
}

pub async fn queue_command() -> Result<()> {
    let coordinator = build_coordinator().await?;

    let queue = coordinator.review_queue().await?;
    if queue.is_empty() {
        println!("🎉 Approval queue is empty");
        return Ok(());
    }

    println!("🗂  {} request(s) waiting for a decision:", queue.len());
    for entry in queue {
        println!(
            "   {} [{}] {} (requested by {})",
            entry.request_number,
            entry.status,
            entry.purpose,
            entry.requested_by
        );
    }
    Ok(())
}

pub async fn reconcile_command() -> Result<()> {
    let coordinator = build_coordinator().await?;

    let report = coordinator.reconcile().await?;
    println!("🔎 Scanned {} form(s)", report.scanned);
    println!("   Consistent:      {}", report.clean);
    println!("   Ledger created:  {}", report.created.len());
    println!("   Ledger repaired: {}", report.repaired.len());
    if !report.unrepairable.is_empty() {
        println!("   ⚠️  Unrepairable divergences:");
        for issue in &report.unrepairable {
            println!(
                "      {} (ledger {}, form flags under-review={} approved={}): {}",
                issue.request_number,
                issue.ledger_status,
                issue.is_under_review,
                issue.is_approved,
                issue.reason
            );
        }
    }
    Ok(())
}
