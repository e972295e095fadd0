//! Confidential ledger demo: wires a `StateManager` to a pair of ZK wallets
//! and a pair of ring wallets and walks them through funding, sending, and
//! mining, printing balances and chain state along the way.

use std::sync::Arc;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use confidential_ledger::chain::now_seconds;
use confidential_ledger::config::LedgerConfig;
use confidential_ledger::context::CryptoContext;
use confidential_ledger::state_manager::StateManager;
use confidential_ledger::tx::{CoinbaseTx, Transaction};
use confidential_ledger::wallet::ring::RingWallet;
use confidential_ledger::wallet::zk::ZkWallet;

#[derive(Parser)]
#[command(name = "ledger-demo")]
#[command(about = "Confidential ledger walkthrough: ZK transfers, ring transfers, mining, verification")]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Run the full ZK + ring walkthrough (default if no subcommand given).
    Run {
        /// Mining difficulty (leading hex zeros required of a block hash).
        #[arg(long, default_value_t = 1)]
        difficulty: u32,
    },
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();
    let difficulty = match cli.command {
        Some(Command::Run { difficulty }) => difficulty,
        None => 1,
    };

    run_demo(difficulty)
}

fn run_demo(difficulty: u32) -> Result<()> {
    let config = LedgerConfig::demo();
    let ctx = Arc::new(CryptoContext::new(config.curve, config.value_table_size));
    let state_manager = Arc::new(StateManager::new(config.curve, difficulty));
    let mut rng = rand::thread_rng();

    println!("== confidential ledger demo ==");

    let alice = ZkWallet::new(ctx.clone(), &mut rng);
    let bob = ZkWallet::new(ctx.clone(), &mut rng);
    alice.register(&state_manager);
    bob.register(&state_manager);
    println!("alice (zk): {}", alice.address);
    println!("bob   (zk): {}", bob.address);

    state_manager.add_transaction(Transaction::Coinbase(CoinbaseTx {
        recipient_address: alice.address.clone(),
        amount: 100,
        timestamp: now_seconds(),
        tx_id: "demo-seed-zk".to_string(),
    }));
    state_manager.mine_block("Miner");
    println!("alice balance after coinbase: {}", alice.balance());

    let zk_tx_id = alice.send_transaction(&state_manager, bob.public_key(), &bob.address, 30, &mut rng)?;
    println!("alice -> bob: 30 (tx {zk_tx_id})");
    state_manager.mine_block("Miner");
    println!("alice balance: {}, bob balance: {}", alice.balance(), bob.balance());

    let carol = RingWallet::new(ctx.clone(), &mut rng);
    let dave = RingWallet::new(ctx, &mut rng);
    carol.register(&state_manager);
    dave.register(&state_manager);
    println!("carol (ring): {}", carol.address);
    println!("dave  (ring): {}", dave.address);

    state_manager.add_transaction(Transaction::Coinbase(CoinbaseTx {
        recipient_address: carol.address.clone(),
        amount: 50,
        timestamp: now_seconds(),
        tx_id: "demo-seed-ring".to_string(),
    }));
    state_manager.mine_block("Miner");
    println!("carol balance after coinbase: {}", carol.balance());

    let ring_tx_id = carol.send_transaction(&state_manager, dave.view_public_key(), dave.spend_public_key(), 15, &mut rng)?;
    println!("carol -> dave: 15 (tx {ring_tx_id})");
    state_manager.mine_block("Miner");
    println!("carol balance: {}, dave balance: {}", carol.balance(), dave.balance());

    state_manager.verify_chain()?;
    let summary = state_manager.get_state_summary();
    println!(
        "chain verified ok. length={}, last_hash={}, mempool={}",
        summary.chain_length, summary.last_block_hash, summary.mempool_size
    );

    Ok(())
}
