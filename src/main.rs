use clap::{Parser, Subcommand};
use log::{info, warn};

use synnergy::{
    Address, Block, FeePools, Ledger, LedgerConfig, Result, TokenId, SYNNERGY_VERSION,
};

/// Synnergy Core node - ledger, gas-metered VM backends, and layer-2 services.
#[derive(Parser)]
#[command(name = "synnergy")]
#[command(about = "A from-scratch blockchain core with a CLI front-end")]
#[command(version = SYNNERGY_VERSION)]
struct Cli {
    /// Log level (error, warn, info, debug, trace)
    #[arg(short, long, default_value = "info")]
    log_level: String,

    /// Directory holding the ledger's WAL, snapshot, archive, and KV mirror
    #[arg(short, long, default_value = "./data")]
    data_dir: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Open the ledger at `data-dir`, logging its height and state root.
    Start,
    /// Print chain height, tip hash, state root, and mempool size.
    Inspect,
    /// Mine `count` empty blocks on top of the current tip (dev-net only).
    Tick {
        /// Number of blocks to append
        #[arg(short, long, default_value = "1")]
        count: u64,
    },
}

fn default_config() -> LedgerConfig {
    LedgerConfig {
        snapshot_interval: 100,
        prune_interval: 1000,
        retention: 10_000,
        fee_pools: FeePools {
            miner: Address::derive(b"synnergy:miner"),
            pos_validator_pool: Address::derive(b"synnergy:pos-pool"),
            poh_validator_pool: Address::derive(b"synnergy:poh-pool"),
            identity_token_holders: Address::derive(b"synnergy:identity"),
            loan_pool: Address::derive(b"synnergy:loan"),
            charity_pool: Address::derive(b"synnergy:charity"),
            authority_nodes: Address::derive(b"synnergy:authority"),
        },
        fee_token: TokenId::from_code("SYNN"),
        max_supply: None,
        chain_id: 1,
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(&cli.log_level)).init();

    match cli.command {
        Commands::Start => {
            let ledger = Ledger::open(&cli.data_dir, default_config())?;
            info!(
                "synnergy node started: height={} tip={} state_root={}",
                ledger.height(),
                ledger.tip().hash,
                ledger.state_root()
            );
        }
        Commands::Inspect => {
            let ledger = Ledger::open(&cli.data_dir, default_config())?;
            println!("height:      {}", ledger.height());
            println!("chain_len:   {}", ledger.chain_len());
            println!("tip hash:    {}", ledger.tip().hash);
            println!("state root:  {}", ledger.state_root());
            println!("mempool:     {} pending", ledger.mempool().len());
        }
        Commands::Tick { count } => {
            let mut ledger = Ledger::open(&cli.data_dir, default_config())?;
            for _ in 0..count {
                let block = Block::new(ledger.height() + 1, ledger.tip().hash, vec![], 0, vec![]);
                ledger.add_block(block)?;
            }
            info!("appended {count} block(s); height is now {}", ledger.height());
            if count == 0 {
                warn!("tick called with count=0, nothing appended");
            }
        }
    }

    Ok(())
}
