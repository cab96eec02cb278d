use anyhow::{Context, bail};
use clap::{Parser, Subcommand};
use comfy_table::presets::UTF8_FULL;
use comfy_table::{Cell, CellAlignment, Table};
use configuration::{Config, init_tracing, load_config, load_config_from};
use core_types::{ExchangeSnapshot, ExecutionPlan, OrderBook, OrderSide, TieBreak};
use router::{BestExecutionRouter, ExecutionOutcome};
use rust_decimal::Decimal;
use std::path::PathBuf;
use std::process::ExitCode;
use storage::{JsonDirectoryStore, SnapshotSink, SnapshotSource};

/// The main entry point for the meta-exchange application.
fn main() -> ExitCode {
    // Load environment overrides from a .env file when one exists.
    let _ = dotenvy::dotenv();

    // Parse command-line arguments
    let cli = Cli::parse();

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

// ==============================================================================
// CLI Structure
// ==============================================================================

/// Best-execution routing of crypto orders across several exchanges.
#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Configuration file to read instead of `config.toml`.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Directory holding the exchange snapshot files.
    #[arg(long, global = true)]
    exchanges_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Compute the best execution for an order and apply it to the exchanges.
    Execute(ExecuteArgs),
    /// Show the balances and order books of the loaded exchanges.
    Books(BooksArgs),
}

#[derive(Parser)]
struct ExecuteArgs {
    /// Whether to buy or sell the asset.
    #[arg(long, value_enum)]
    side: OrderSide,

    /// The quantity of the asset to buy or sell (e.g., "0.5").
    #[arg(long)]
    amount: Decimal,

    /// Ordering of orders quoted at the same price. Overrides the configuration.
    #[arg(long, value_enum)]
    tie_break: Option<TieBreak>,

    /// Print the plan without writing the updated exchanges back.
    #[arg(long)]
    dry_run: bool,
}

#[derive(Parser)]
struct BooksArgs {
    /// Only show this exchange.
    #[arg(long)]
    exchange: Option<String>,
}

fn run(cli: Cli) -> anyhow::Result<()> {
    let mut config = match &cli.config {
        Some(path) => load_config_from(path),
        None => load_config(),
    }
    .context("failed to load configuration")?;

    if let Some(dir) = cli.exchanges_dir {
        config.storage.exchanges_dir = dir;
    }

    // Held until the end of `run` so buffered file logs are flushed.
    let _guard = init_tracing(&config.logging).context("failed to initialise logging")?;

    let store = JsonDirectoryStore::new(&config.storage.exchanges_dir)
        .with_pretty(config.storage.pretty);

    match cli.command {
        Commands::Execute(args) => handle_execute(args, &config, &store),
        Commands::Books(args) => handle_books(args, &store),
    }
}

// ==============================================================================
// Execute Command Logic
// ==============================================================================

/// Loads the exchanges, routes the order and persists every exchange it touched.
fn handle_execute(
    args: ExecuteArgs,
    config: &Config,
    store: &JsonDirectoryStore,
) -> anyhow::Result<()> {
    let mut exchanges = store
        .load_all()
        .context("failed to load exchange snapshots")?;

    let mut settings = config.router;
    if let Some(tie_break) = args.tie_break {
        settings.tie_break = tie_break;
    }
    let router = BestExecutionRouter::new(settings);

    let outcome = router
        .execute(args.side, args.amount, &mut exchanges)
        .context("failed to compute the execution plan")?;

    let plan = match outcome {
        ExecutionOutcome::ExceedsLimit {
            side,
            requested,
            required,
            total_available_funds,
        } => {
            println!(
                "The amount you want to {} exceeds the available funds of all exchanges.",
                side.to_string().to_lowercase()
            );
            println!("Requested: {}", requested);
            if side == OrderSide::Sell {
                println!("Cash required: {}", required);
            }
            println!("Available: {}", total_available_funds);
            return Ok(());
        }
        ExecutionOutcome::Executed { plan, .. } => plan,
    };

    print_plan(&plan);

    if args.dry_run {
        tracing::info!(plan_id = %plan.plan_id, "dry run, exchanges left unchanged");
        return Ok(());
    }

    let touched = plan.exchange_ids();
    let changed: Vec<&ExchangeSnapshot> = exchanges
        .iter()
        .filter(|exchange| touched.contains(&exchange.id.as_str()))
        .collect();
    let written = store
        .persist_all(&changed)
        .context("failed to persist updated exchanges")?;
    tracing::info!(plan_id = %plan.plan_id, exchanges = written, "persisted updated exchanges");

    Ok(())
}

fn print_plan(plan: &ExecutionPlan) {
    println!("Best Price: {}", plan.best_price);
    println!(
        "Filled: {} of {} ({})",
        plan.filled_amount(),
        plan.requested_amount,
        plan.side
    );
    if !plan.is_complete() {
        println!("Warning: the order books ran out before the full amount could be filled.");
    }
    if plan.is_empty() {
        return;
    }

    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_header(vec!["#", "Exchange", "Order", "Price", "Amount", "Notional"]);
    for (i, fill) in plan.fills.iter().enumerate() {
        table.add_row(vec![
            Cell::new(i + 1),
            Cell::new(&fill.exchange_id),
            Cell::new(&fill.order_id),
            Cell::new(fill.price).set_alignment(CellAlignment::Right),
            Cell::new(fill.amount).set_alignment(CellAlignment::Right),
            Cell::new(fill.notional()).set_alignment(CellAlignment::Right),
        ]);
    }
    println!("{table}");
    println!("Total notional: {}", plan.total_notional());
}

// ==============================================================================
// Books Command Logic
// ==============================================================================

/// Prints each exchange's balances followed by its asks and bids, lowest price first.
fn handle_books(args: BooksArgs, store: &JsonDirectoryStore) -> anyhow::Result<()> {
    let exchanges = store
        .load_all()
        .context("failed to load exchange snapshots")?;

    let selected: Vec<&ExchangeSnapshot> = exchanges
        .iter()
        .filter(|exchange| args.exchange.as_ref().is_none_or(|id| &exchange.id == id))
        .collect();

    if selected.is_empty() {
        match args.exchange {
            Some(id) => bail!("exchange {} not found in {}", id, store.dir().display()),
            None => println!("No exchanges found in {}", store.dir().display()),
        }
    }

    for exchange in selected {
        println!(
            "{} (Crypto Available: {}, Euro Available: {})",
            exchange.id, exchange.asset_balance, exchange.cash_balance
        );
        println!("{}", book_table("Asks", &exchange.asks));
        println!("{}", book_table("Bids", &exchange.bids));
        println!();
    }

    Ok(())
}

fn book_table(title: &str, book: &OrderBook) -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_header(vec![title, "Price", "Amount"]);
    for order in book.sorted_by_price() {
        table.add_row(vec![
            Cell::new(&order.id),
            Cell::new(order.price).set_alignment(CellAlignment::Right),
            Cell::new(order.amount).set_alignment(CellAlignment::Right),
        ]);
    }
    table
}
