// Demo driver for the ledger: builds an in-memory chain from the settings
// file (plus AGT_* overrides) and runs one of the CLI commands against it.
use agt_chain::cli::FeePriorityArg;
use agt_chain::{
    Blockchain, CancellationToken, Command, FeePriority, InMemoryTokenRegistry, MiningOutcome,
    Opt, Settings, SystemClock, TokenRegistry, TransferRequest, Wallet,
};
use clap::Parser;
use log::{error, info, warn, LevelFilter};
use rand::seq::SliceRandom;
use std::path::Path;
use std::process;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

const PRIORITIES: [FeePriorityArg; 3] = [
    FeePriorityArg::Normal,
    FeePriorityArg::High,
    FeePriorityArg::Critical,
];

fn main() {
    // Info by default, RUST_LOG wins when set
    env_logger::Builder::new()
        .filter_level(LevelFilter::Info)
        .parse_default_env()
        .init();

    let opt = Opt::parse();

    if let Err(e) = run_command(opt) {
        error!("Error: {e}");
        process::exit(1);
    }
}

fn load_settings(path: Option<&Path>) -> agt_chain::Result<Settings> {
    let mut settings = match path {
        Some(path) => Settings::load(path)?,
        None => Settings::default(),
    };
    settings.apply_env_overrides()?;
    Ok(settings)
}

fn new_chain(settings: Settings) -> agt_chain::Result<Blockchain> {
    Blockchain::new(
        settings,
        Arc::new(InMemoryTokenRegistry::with_genesis_assets()),
        Arc::new(SystemClock::new()),
    )
}

fn cancellation(timeout_secs: Option<u64>) -> CancellationToken {
    match timeout_secs {
        Some(secs) => CancellationToken::with_timeout(Duration::from_secs(secs)),
        None => CancellationToken::new(),
    }
}

fn run_command(opt: Opt) -> Result<(), Box<dyn std::error::Error>> {
    let settings = load_settings(opt.config.as_deref())?;

    match opt.command {
        Command::Demo {
            blocks,
            amount,
            commitment,
            timeout_secs,
        } => run_demo(settings, blocks, amount, commitment, timeout_secs)?,
        Command::EstimateFee { size, priority } => {
            let fee = settings
                .fees
                .calculate_fee(size, FeePriority::from(priority));
            println!(
                "Estimated fee for {priority} priority: {fee} {}",
                settings.fees.default_fee_asset
            );
        }
        Command::Tokens => {
            let registry = InMemoryTokenRegistry::with_genesis_assets();
            for asset in registry.assets() {
                println!(
                    "{:<8} {:<28} decimals {:>2}  supply {}",
                    asset.get_symbol(),
                    asset.get_name(),
                    asset.get_decimals(),
                    asset.get_total_supply()
                );
            }
        }
        Command::ShowConfig => print!("{}", settings.to_toml()?),
        Command::Printchain { blocks, json } => {
            let chain = new_chain(settings)?;
            let miner = Wallet::new()?;
            for _ in 0..blocks {
                chain.mine_block(&miner.get_address(), 0, &CancellationToken::new())?;
            }

            if json {
                println!("{}", serde_json::to_string_pretty(&chain.blocks())?);
            } else {
                for (height, block) in chain.blocks().iter().enumerate() {
                    println!("Height: {height}");
                    println!("Prev block hash: {}", block.get_previous_hash());
                    println!("Cur block hash: {}", block.get_hash());
                    println!("Timestamp: {}", block.get_timestamp());
                    println!("Nonce: {}, difficulty: {}", block.get_nonce(), block.get_difficulty());
                    for tx in block.get_transactions() {
                        println!(
                            "- {} {} {} -> {}",
                            tx.get_amount(),
                            tx.get_asset(),
                            tx.get_sender().unwrap_or("<reward>"),
                            tx.get_recipient()
                        );
                    }
                    println!();
                }
            }
        }
    }
    Ok(())
}

fn run_demo(
    settings: Settings,
    blocks: usize,
    amount: u64,
    commitment: u64,
    timeout_secs: Option<u64>,
) -> Result<(), Box<dyn std::error::Error>> {
    let reward_asset = settings.chain.reward_asset.clone();
    let chain = Arc::new(new_chain(settings)?);
    let alice = Wallet::new()?;
    let bob = Wallet::new()?;
    println!("Alice: {}", alice.get_fingerprint());
    println!("Bob:   {}", bob.get_fingerprint());

    let alice_address = alice.get_address();
    let bob_address = bob.get_address();

    let mut rng = rand::thread_rng();
    for _ in 0..blocks {
        let priority = *PRIORITIES.choose(&mut rng).unwrap_or(&FeePriorityArg::Normal);
        let request = TransferRequest::new(&alice_address, &bob_address, amount, &reward_asset)
            .priority(priority.into());
        let mut tx = chain.create_transaction(request)?;
        tx.sign(&alice)?;
        info!("Submitting {amount} {reward_asset} at {priority} priority (fee {})", tx.get_fee());
        chain.submit_transaction(tx)?;

        // The search runs on its own thread; the chain stays readable meanwhile
        let worker = {
            let chain = chain.clone();
            let miner = alice_address.clone();
            let cancel = cancellation(timeout_secs);
            thread::spawn(move || chain.mine_block(&miner, commitment, &cancel))
        };
        let outcome = worker
            .join()
            .map_err(|_| "mining thread panicked".to_string())??;

        match outcome {
            MiningOutcome::Sealed(report) => {
                if let Some(e) = &report.commitment_error {
                    warn!("{e}");
                }
                println!(
                    "Sealed block {} (difficulty {}, reward {} {reward_asset})",
                    report.block.get_hash(),
                    report.effective_difficulty,
                    report.reward
                );
            }
            MiningOutcome::Cancelled => {
                println!(
                    "Mining cancelled; {} transactions still pending",
                    chain.pending_count()
                );
                break;
            }
        }
    }

    println!();
    for (name, wallet) in [("Alice", &alice), ("Bob", &bob)] {
        let balances = chain.balances_of(&wallet.get_address());
        let summary: Vec<String> = balances
            .iter()
            .filter(|(_, balance)| **balance != 0)
            .map(|(asset, balance)| format!("{balance} {asset}"))
            .collect();
        println!("{name}: {}", summary.join(", "));
    }

    chain.validate()?;
    println!(
        "Chain valid at height {} ({} fees collected)",
        chain.get_height(),
        chain.collected_fees(&chain.get_settings().fees.default_fee_asset)
    );
    Ok(())
}
