// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Command-line interface of `rcd`

use crate::config::{DaemonConfig, Paths};
use crate::lifecycle::{open_engine, Daemon, DaemonEngine};
use anyhow::{bail, Result};
use clap::{Args, Parser, Subcommand};
use rc_adapters::NoOpScopeResolver;
use rc_core::{
    AccountId, AcquireMode, ConstraintId, ConstraintSpec, Consumer, ConsumerId, HoldingScope,
    ResourceUnit,
};
use rc_engine::{AcquireRequest, LedgerStats, QueueStatus, RecoveryTask};
use rc_storage::ConsumerLedger;
use serde::Serialize;
use std::future::Future;
use std::path::PathBuf;
use std::time::Duration;

#[derive(Parser)]
#[command(
    name = "rcd",
    version,
    about = "Resource constraints - FIFO admission over a shared ledger"
)]
pub struct Cli {
    /// State directory (defaults to RC_STATE_DIR or ~/.local/state/rc)
    #[arg(long, global = true)]
    pub state_dir: Option<PathBuf>,

    /// Config file (defaults to config.toml in the state directory)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Print JSON instead of text
    #[arg(long, global = true)]
    pub json: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Run periodic stuck-claim recovery until SIGINT/SIGTERM
    Run,
    /// Run a single recovery pass
    Recover,
    /// Constraint management
    #[command(subcommand)]
    Constraint(ConstraintCommand),
    /// Claim permits for a step
    Acquire(AcquireArgs),
    /// Release a consumer (finish if active, reject if blocked)
    Release {
        consumer: String,
    },
    /// Release everything a plan or stage holds
    EndScope {
        /// plan:<execution> or stage:<execution>/<stage>
        scope: HoldingScope,
    },
    /// Queue depth and head-of-line of a constraint's units
    Status {
        constraint: String,
        /// Only this resource unit
        unit: Option<String>,
    },
}

#[derive(Subcommand)]
pub enum ConstraintCommand {
    /// Create a constraint
    Create {
        name: String,
        #[arg(long)]
        account: String,
        /// Permits available per resource unit
        #[arg(long)]
        capacity: u32,
    },
    /// List an account's constraints
    List {
        #[arg(long)]
        account: String,
    },
    /// Delete a constraint
    Delete {
        id: String,
        #[arg(long)]
        account: String,
    },
    /// Show who holds permits
    Usage {
        /// Constraint ids (all of the account's when omitted)
        ids: Vec<String>,
        #[arg(long)]
        account: String,
    },
}

#[derive(Args)]
pub struct AcquireArgs {
    pub constraint: String,
    /// Resource unit (e.g. a cluster name)
    pub unit: String,
    /// Stable id of the claiming step; repeated acquires reuse its consumer
    #[arg(long)]
    pub claimant: String,
    /// plan:<execution> or stage:<execution>/<stage>
    #[arg(long)]
    pub scope: HoldingScope,
    #[arg(long, default_value_t = 1)]
    pub permits: u32,
    /// ensure or accumulate
    #[arg(long, default_value = "accumulate")]
    pub mode: AcquireMode,
    /// Poll until admitted instead of returning while blocked
    #[arg(long)]
    pub wait: bool,
    /// Poll interval for --wait
    #[arg(long, default_value = "1s", value_parser = humantime::parse_duration)]
    pub poll: Duration,
}

/// Resolved settings shared by every command
pub struct Context {
    pub paths: Paths,
    pub config: DaemonConfig,
    pub json: bool,
}

impl Context {
    fn engine(&self) -> Result<DaemonEngine> {
        Ok(open_engine(&self.paths, &self.config)?)
    }

    fn print<T: Serialize>(&self, value: &T, text: impl FnOnce() -> String) -> Result<()> {
        if self.json {
            println!("{}", serde_json::to_string_pretty(value)?);
        } else {
            println!("{}", text());
        }
        Ok(())
    }
}

/// Execute a command; `shutdown` resolves when `run` should stop
pub async fn execute(
    ctx: &Context,
    command: Command,
    shutdown: impl Future<Output = ()>,
) -> Result<()> {
    match command {
        Command::Run => run(ctx, shutdown).await,
        Command::Recover => recover(ctx).await,
        Command::Constraint(command) => constraint(ctx, command).await,
        Command::Acquire(args) => acquire(ctx, args).await,
        Command::Release { consumer } => release(ctx, ConsumerId::new(consumer)).await,
        Command::EndScope { scope } => end_scope(ctx, scope).await,
        Command::Status { constraint, unit } => {
            status(ctx, ConstraintId::new(constraint), unit.map(ResourceUnit::new)).await
        }
    }
}

async fn run(ctx: &Context, shutdown: impl Future<Output = ()>) -> Result<()> {
    let daemon = Daemon::startup(&ctx.paths, &ctx.config)?;
    // Signal readiness for a supervisor waiting on stdout
    println!("READY");
    let result = daemon.run(shutdown).await;
    daemon.shutdown();
    result?;
    Ok(())
}

async fn recover(ctx: &Context) -> Result<()> {
    let engine = ctx.engine()?;
    let task = RecoveryTask::new(NoOpScopeResolver::new(), ctx.config.recovery.clone());
    let report = task.run_once(&engine).await?;
    ctx.print(&report, || {
        format!(
            "scanned: {}\nreclaimed: {}\npromoted: {}\nfailures: {}",
            report.scanned, report.reclaimed, report.promoted, report.failures
        )
    })
}

async fn constraint(ctx: &Context, command: ConstraintCommand) -> Result<()> {
    let engine = ctx.engine()?;
    match command {
        ConstraintCommand::Create {
            name,
            account,
            capacity,
        } => {
            let constraint = engine
                .create_constraint(ConstraintSpec::new(account, name, capacity))
                .await?;
            ctx.print(&constraint, || constraint.id.to_string())
        }
        ConstraintCommand::List { account } => {
            let constraints = engine.list_constraints(&AccountId::new(account)).await?;
            ctx.print(&constraints, || {
                if constraints.is_empty() {
                    return "No constraints".to_string();
                }
                let mut out = format!("{:<38} {:<20} {:>8} STRATEGY", "ID", "NAME", "CAPACITY");
                for c in &constraints {
                    out.push_str(&format!(
                        "\n{:<38} {:<20} {:>8} {}",
                        c.id, c.name, c.capacity, c.strategy
                    ));
                }
                out
            })
        }
        ConstraintCommand::Delete { id, account } => {
            let id = ConstraintId::new(id);
            if !engine.delete_constraint(&AccountId::new(account), &id).await? {
                bail!("constraint not found: {id}");
            }
            ctx.print(&id, || format!("Deleted {id}"))
        }
        ConstraintCommand::Usage { ids, account } => {
            let ids: Vec<ConstraintId> = ids.into_iter().map(ConstraintId::new).collect();
            let usage = engine.usage(&AccountId::new(account), &ids).await?;
            ctx.print(&usage, || {
                let mut lines = Vec::new();
                for u in &usage {
                    let held: u32 = u.active.iter().map(|a| a.permits).sum();
                    lines.push(format!("{} ({}): {held}/{} held", u.name, u.constraint_id, u.capacity));
                    for a in &u.active {
                        lines.push(format!(
                            "  {} {} {} x{}",
                            a.consumer_id, a.resource_unit, a.holding_scope, a.permits
                        ));
                    }
                }
                lines.join("\n")
            })
        }
    }
}

async fn acquire(ctx: &Context, args: AcquireArgs) -> Result<()> {
    let engine = ctx.engine()?;
    let request = AcquireRequest::new(
        ConstraintId::new(args.constraint),
        args.unit,
        args.claimant,
        args.permits,
        args.scope,
    )
    .with_mode(args.mode);

    let mut consumer = engine.try_acquire(request).await?;
    while args.wait && consumer.is_blocked() {
        tokio::time::sleep(args.poll).await;
        consumer = engine.consumer(&consumer.id).await?;
    }
    if consumer.is_terminal() {
        bail!("consumer {} was released while waiting ({})", consumer.id, consumer.state);
    }
    ctx.print(&consumer, || describe(&consumer))
}

async fn release(ctx: &Context, consumer_id: ConsumerId) -> Result<()> {
    let engine = ctx.engine()?;
    let consumer = engine.finish(&consumer_id).await?;
    ctx.print(&consumer, || describe(&consumer))
}

async fn end_scope(ctx: &Context, scope: HoldingScope) -> Result<()> {
    let engine = ctx.engine()?;
    let released = engine.finish_scope(&scope).await?;
    ctx.print(&released, || format!("Released {released} consumer(s) of {scope}"))
}

async fn status(ctx: &Context, constraint_id: ConstraintId, unit: Option<ResourceUnit>) -> Result<()> {
    let engine = ctx.engine()?;
    let units = match unit {
        Some(unit) => vec![unit],
        None => {
            engine.get_constraint(&constraint_id).await?;
            engine
                .ledger()
                .units(&constraint_id)
                .await?
                .into_iter()
                .map(|key| key.resource_unit)
                .collect()
        }
    };

    let mut statuses = Vec::with_capacity(units.len());
    for unit in &units {
        statuses.push(engine.queue_status(&constraint_id, unit).await?);
    }
    let stats = LedgerStats::collect(engine.ledger()).await?;

    #[derive(Serialize)]
    struct StatusOutput<'a> {
        units: &'a [QueueStatus],
        ledger: &'a LedgerStats,
    }
    let output = StatusOutput {
        units: &statuses,
        ledger: &stats,
    };
    ctx.print(&output, || {
        if statuses.is_empty() {
            return format!("{constraint_id}: idle");
        }
        statuses.iter().map(describe_queue).collect::<Vec<_>>().join("\n")
    })
}

fn describe(consumer: &Consumer) -> String {
    format!(
        "{} {} (order {}, {} permit(s) on {})",
        consumer.id,
        consumer.state.as_str().to_lowercase(),
        consumer.order,
        consumer.permits,
        consumer.key()
    )
}

fn describe_queue(status: &QueueStatus) -> String {
    let mut out = format!(
        "{}: {}/{} permits held by {} consumer(s), {} waiting",
        status.key,
        status.active_permits,
        status.capacity,
        status.active_consumers,
        status.queue_depth
    );
    if let Some(head) = &status.head_of_line {
        out.push_str(&format!(
            "\n  head: {} ({}) wants {} for {}",
            head.consumer_id,
            head.claimant_id,
            head.permits,
            humantime::format_duration(Duration::from_secs(head.waiting.as_secs()))
        ));
    }
    out
}

#[cfg(test)]
#[path = "commands_tests.rs"]
mod tests;
