use std::error::Error;

use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand};
use engine::{
    Actor, BatchFilter, CreateBatchCmd, Engine, EngineError, MoneyCents, NewAdvanceCmd,
    PaymentRunCmd, PaymentType, RunOptions,
};
use migration::{Migrator, MigratorTrait};
use serde::Serialize;
use tokio_util::sync::CancellationToken;

mod settings;

type AppResult<T> = Result<T, Box<dyn Error + Send + Sync>>;

#[derive(Parser, Debug)]
#[command(name = "growpay")]
#[command(about = "Grower advance payments: runs, batches and cash advances")]
struct Cli {
    /// Settings file, without extension.
    #[arg(long, default_value = "settings")]
    config: String,

    /// Name recorded in audit columns (also read from `GROWPAY_ACTOR`).
    #[arg(long, env = "GROWPAY_ACTOR", default_value = "growpay")]
    actor: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Price (test) or pay (actual) an advance round.
    Run(Run),
    Batch(Batch),
    Advance(Advance),
}

#[derive(Args, Debug)]
struct Run {
    #[command(subcommand)]
    command: RunCommand,
}

#[derive(Subcommand, Debug)]
enum RunCommand {
    Test(RunArgs),
    Actual(RunArgs),
}

#[derive(Args, Debug)]
struct RunArgs {
    #[arg(long)]
    round: u8,
    #[arg(long)]
    crop_year: i32,
    #[arg(long)]
    payment_date: NaiveDate,
    #[arg(long)]
    cutoff_date: NaiveDate,
    #[arg(long = "exclude-grower")]
    exclude_growers: Vec<i64>,
    #[arg(long = "exclude-product")]
    exclude_products: Vec<i64>,
    #[arg(long = "exclude-process")]
    exclude_processes: Vec<i64>,
    #[arg(long)]
    include_on_hold: bool,
}

#[derive(Args, Debug)]
struct Batch {
    #[command(subcommand)]
    command: BatchCommand,
}

#[derive(Subcommand, Debug)]
enum BatchCommand {
    Create(BatchCreateArgs),
    Approve(BatchId),
    Post(BatchId),
    /// Finalize a posted batch and issue its cheques.
    Process(BatchId),
    Void(BatchVoidArgs),
    /// Report whether a batch can be voided.
    CheckVoid(BatchId),
    /// Show a batch by id or number.
    Show { batch: String },
    List(BatchListArgs),
}

#[derive(Args, Debug)]
struct BatchId {
    id: i64,
}

#[derive(Args, Debug)]
struct BatchCreateArgs {
    #[arg(long = "type", value_parser = parse_payment_type)]
    payment_type: PaymentType,
    #[arg(long)]
    crop_year: i32,
    #[arg(long)]
    date: NaiveDate,
    #[arg(long)]
    cutoff_date: Option<NaiveDate>,
    #[arg(long)]
    notes: Option<String>,
}

#[derive(Args, Debug)]
struct BatchVoidArgs {
    id: i64,
    #[arg(long)]
    reason: String,
}

#[derive(Args, Debug)]
struct BatchListArgs {
    #[arg(long)]
    crop_year: Option<i32>,
    #[arg(long = "type", value_parser = parse_payment_type)]
    payment_type: Option<PaymentType>,
    #[arg(long)]
    include_voided: bool,
}

#[derive(Args, Debug)]
struct Advance {
    #[command(subcommand)]
    command: AdvanceCommand,
}

#[derive(Subcommand, Debug)]
enum AdvanceCommand {
    Issue(AdvanceIssueArgs),
    /// Reverse one advance deduction.
    Reverse { deduction_id: i64 },
    Void(AdvanceVoidArgs),
    Outstanding { grower_id: i64 },
}

#[derive(Args, Debug)]
struct AdvanceIssueArgs {
    #[arg(long)]
    grower: i64,
    /// Amount in major units, e.g. `250.00`.
    #[arg(long)]
    amount: MoneyCents,
    #[arg(long)]
    date: NaiveDate,
    #[arg(long)]
    notes: Option<String>,
}

#[derive(Args, Debug)]
struct AdvanceVoidArgs {
    id: i64,
    #[arg(long)]
    reason: String,
}

fn parse_payment_type(raw: &str) -> Result<PaymentType, String> {
    PaymentType::try_from(raw).map_err(|err| err.to_string())
}

fn print_json<T: Serialize>(value: &T) -> AppResult<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

async fn connect_db(url: &str) -> AppResult<sea_orm::DatabaseConnection> {
    let db = sea_orm::Database::connect(url).await?;
    Migrator::up(&db, None).await?;
    Ok(db)
}

/// Cancellation token tripped by Ctrl-C.
fn ctrl_c_token() -> CancellationToken {
    let token = CancellationToken::new();
    let trigger = token.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("interrupt received, stopping after the current grower");
            trigger.cancel();
        }
    });
    token
}

async fn run(engine: &Engine, command: RunCommand, actor: Actor) -> AppResult<()> {
    let (actual, args) = match command {
        RunCommand::Test(args) => (false, args),
        RunCommand::Actual(args) => (true, args),
    };
    let mut cmd = PaymentRunCmd::new(
        args.round,
        args.crop_year,
        args.payment_date,
        args.cutoff_date,
        actor,
    )
    .include_on_hold(args.include_on_hold);
    cmd.filters.grower_ids = args.exclude_growers;
    cmd.filters.product_ids = args.exclude_products;
    cmd.filters.process_ids = args.exclude_processes;

    let options = RunOptions::default()
        .cancellation(ctrl_c_token())
        .on_progress(|progress| {
            tracing::info!(
                processed = progress.processed,
                total = progress.total,
                grower_id = progress.grower_id,
                "{}",
                progress.message
            );
        });
    let result = if actual {
        engine.actual_run_with(&cmd, options).await?
    } else {
        engine.test_run_with(&cmd, options).await?
    };
    print_json(&result)?;
    if !result.success {
        std::process::exit(1);
    }
    Ok(())
}

async fn batch(engine: &Engine, command: BatchCommand, actor: Actor) -> AppResult<()> {
    match command {
        BatchCommand::Create(args) => {
            let mut cmd = CreateBatchCmd::new(args.payment_type, args.crop_year, args.date, actor);
            if let Some(cutoff) = args.cutoff_date {
                cmd = cmd.cutoff_date(cutoff);
            }
            if let Some(notes) = args.notes {
                cmd = cmd.notes(notes);
            }
            print_json(&engine.create_batch(cmd).await?)
        }
        BatchCommand::Approve(BatchId { id }) => print_json(&engine.approve_batch(id, &actor).await?),
        BatchCommand::Post(BatchId { id }) => print_json(&engine.post_batch(id, &actor).await?),
        BatchCommand::Process(BatchId { id }) => {
            print_json(&engine.process_payments(id, &actor).await?)
        }
        BatchCommand::Void(args) => {
            match engine.void_batch(args.id, &args.reason, &actor).await {
                Ok(batch) => print_json(&batch),
                Err(EngineError::IntegrityViolation(validation)) => {
                    print_json(&validation)?;
                    std::process::exit(1);
                }
                Err(err) => Err(err.into()),
            }
        }
        BatchCommand::CheckVoid(BatchId { id }) => print_json(&engine.validate_can_void(id).await?),
        BatchCommand::Show { batch } => {
            let batch = match batch.parse::<i64>() {
                Ok(id) => engine.batch(id).await?,
                Err(_) => engine.batch_by_number(&batch).await?,
            };
            print_json(&batch)
        }
        BatchCommand::List(args) => {
            let filter = BatchFilter {
                crop_year: args.crop_year,
                payment_type: args.payment_type,
                status: None,
                include_voided: args.include_voided,
            };
            print_json(&engine.batches(&filter).await?)
        }
    }
}

async fn advance(engine: &Engine, command: AdvanceCommand, actor: Actor) -> AppResult<()> {
    match command {
        AdvanceCommand::Issue(args) => {
            let mut cmd = NewAdvanceCmd::new(args.grower, args.amount, args.date, actor);
            if let Some(notes) = args.notes {
                cmd = cmd.notes(notes);
            }
            print_json(&engine.issue_advance(cmd).await?)
        }
        AdvanceCommand::Reverse { deduction_id } => {
            print_json(&engine.reverse_advance_deduction(deduction_id, &actor).await?)
        }
        AdvanceCommand::Void(args) => {
            print_json(&engine.void_advance(args.id, &args.reason, &actor).await?)
        }
        AdvanceCommand::Outstanding { grower_id } => {
            print_json(&engine.outstanding_advances(grower_id).await?)
        }
    }
}

#[tokio::main]
async fn main() -> AppResult<()> {
    let cli = Cli::parse();
    let settings = settings::Settings::new(&cli.config)?;

    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(format!(
            "growpay={level},engine={level}",
            level = settings.app.level
        ))
        .init();

    let db = connect_db(&settings.database_url()).await?;
    let engine = Engine::builder().database(db).build().await?;
    let actor = Actor::new(cli.actor);

    match cli.command {
        Command::Run(Run { command }) => run(&engine, command, actor).await,
        Command::Batch(Batch { command }) => batch(&engine, command, actor).await,
        Command::Advance(Advance { command }) => advance(&engine, command, actor).await,
    }
}
