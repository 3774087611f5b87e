use clap::{Args, Parser, Subcommand};
use dotenv::dotenv;
use ethers::providers::{Http, Provider};
use ethers::types::{Address, TransactionReceipt, U256};
use std::sync::Arc;

mod config;
mod domain_types;
mod gas;
mod ledger;
mod protocol;
mod tx_queue;
mod wallet;
mod withdraw;

use config::Config;
use domain_types::{parse_address, parse_uint256};
use gas::{format_gwei, FeeQuoteSource, GasPriceFeed};
use ledger::{EthersLedger, Ledger};
use protocol::{
    parse_pool_reward, PoolReward, ProtocolError, RewardDistribution, RewardsClaiming,
    SavingsModule, StakingPool, VestedAkro,
};
use tx_queue::TransactionQueue;
use wallet::{AccountSource, EnvWalletProvider};

#[derive(Parser, Debug)]
#[command(name = "adel-backend", version, about = "Savings withdrawals, ADEL staking and rewards claiming")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Compute the largest withdrawable amount of one pool token
    MaxWithdraw(PoolTokenArgs),
    /// Withdraw the largest withdrawable amount of one pool token
    Withdraw(PoolTokenArgs),
    /// Withdraw the whole pool balance
    WithdrawAll(PoolArgs),
    /// Stake ADEL, approving the staking pool first if needed
    Stake {
        #[arg(long, value_parser = parse_uint256, help = "Amount in token base units (decimal or 0x-hex)")]
        amount: U256,
    },
    /// Unstake every unlocked ADEL
    Unstake,
    /// Claim vested ADEL rewards from the latest snapshot
    Claim,
    /// Withdraw accrued pool rewards from the reward distribution module
    WithdrawRewards {
        #[arg(
            long = "reward",
            value_parser = parse_pool_reward,
            required = true,
            help = "POOL_TOKEN:REWARD_TOKEN, repeatable"
        )]
        rewards: Vec<PoolReward>,
    },
    /// Unlock and redeem vested AKRO
    ClaimAkro,
    /// Print current gas quotes
    Gas,
}

#[derive(Args, Debug)]
struct PoolArgs {
    #[arg(long, value_parser = parse_address, help = "Savings pool (protocol) address")]
    pool: Address,
    #[arg(long, value_parser = parse_address, help = "Pool LP token address")]
    lp_token: Address,
}

#[derive(Args, Debug)]
struct PoolTokenArgs {
    #[command(flatten)]
    pool: PoolArgs,
    #[arg(long, value_parser = parse_address, help = "Deposit token to withdraw")]
    token: Address,
}

struct App {
    config: Config,
    ledger: Arc<dyn Ledger>,
    fees: Arc<GasPriceFeed>,
    account: Address,
    queue: TransactionQueue,
}

async fn connect(config: Config) -> Result<App, String> {
    let provider = Provider::<Http>::try_from(config.rpc_url.as_str())
        .map_err(|e| format!("Invalid RPC URL {}: {}", config.rpc_url, e))?;

    let wallet = Arc::new(EnvWalletProvider::from_env()?);
    let account = wallet.address();

    let ethers_ledger = EthersLedger::new(provider, wallet.wallet()).await?;
    let fees = Arc::new(GasPriceFeed::new(&config.gas_fees_url, ethers_ledger.provider())?);
    let ledger: Arc<dyn Ledger> = Arc::new(ethers_ledger);

    let accounts: Arc<dyn AccountSource> = wallet;
    let queue = TransactionQueue::spawn_with_grace(
        ledger.clone(),
        fees.clone(),
        accounts,
        config.submission_grace,
    );

    Ok(App {
        config,
        ledger,
        fees,
        account,
        queue,
    })
}

fn protocol_error(e: ProtocolError) -> String {
    e.to_string()
}

fn print_receipt(receipt: &TransactionReceipt) {
    println!(
        "Confirmed {:?} in block {}",
        receipt.transaction_hash,
        receipt
            .block_number
            .map(|n| n.to_string())
            .unwrap_or_else(|| "?".to_string())
    );
}

fn print_submissions(queue: &TransactionQueue) {
    let tracker = queue.tracker();
    for (status, count) in tracker.status_counts() {
        if count > 0 {
            log::info!("[TxQueue] {} submission(s) {}", count, status);
        }
    }
    for summary in tracker.list_recent(10) {
        match serde_json::to_string_pretty(&summary) {
            Ok(json) => println!("{}", json),
            Err(e) => log::warn!("Failed to serialize submission {}: {}", summary.id, e),
        }
    }
}

async fn run(cli: Cli) -> Result<(), String> {
    let config = Config::from_env()?;
    let app = connect(config).await?;

    match cli.command {
        Command::MaxWithdraw(args) => {
            let savings = SavingsModule::mainnet(app.ledger.clone(), app.queue.clone())?;
            let token = savings
                .pool_token(args.token)
                .await
                .map_err(|e| e.to_string())?;
            let amount = savings
                .max_withdraw_amount(app.account, args.pool.pool, token, args.pool.lp_token)
                .await
                .map_err(|e| e.to_string())?;
            println!("{}", amount);
        }
        Command::Withdraw(args) => {
            let savings = SavingsModule::mainnet(app.ledger.clone(), app.queue.clone())?;
            let token = savings
                .pool_token(args.token)
                .await
                .map_err(|e| e.to_string())?;
            let receipt = savings
                .withdraw_one_token(args.pool.pool, token, args.pool.lp_token)
                .await
                .map_err(protocol_error)?;
            print_receipt(&receipt);
        }
        Command::WithdrawAll(args) => {
            let savings = SavingsModule::mainnet(app.ledger.clone(), app.queue.clone())?;
            let receipt = savings
                .withdraw_all_tokens(args.pool, args.lp_token)
                .await
                .map_err(protocol_error)?;
            print_receipt(&receipt);
        }
        Command::Stake { amount } => {
            let staking = StakingPool::adel(app.ledger.clone(), app.queue.clone())?;
            let receipt = staking.stake(amount).await.map_err(protocol_error)?;
            print_receipt(&receipt);
        }
        Command::Unstake => {
            let staking = StakingPool::adel(app.ledger.clone(), app.queue.clone())?;
            let receipt = staking.unstake_all_unlocked().await.map_err(protocol_error)?;
            print_receipt(&receipt);
        }
        Command::Claim => {
            let rewards = RewardsClaiming::mainnet(&app.config.rewards_proofs_url, app.queue.clone())?;
            let receipt = rewards.claim().await.map_err(protocol_error)?;
            print_receipt(&receipt);
        }
        Command::WithdrawRewards { rewards } => {
            let distribution = RewardDistribution::mainnet(app.queue.clone())?;
            let receipt = distribution
                .withdraw_rewards(&rewards)
                .await
                .map_err(protocol_error)?;
            print_receipt(&receipt);
        }
        Command::ClaimAkro => {
            let vested = VestedAkro::mainnet(app.ledger.clone(), app.queue.clone())?;
            let available = vested
                .available_to_claim(app.account)
                .await
                .map_err(|e| e.to_string())?;
            log::info!("[Rewards] {} AKRO available to redeem", available);
            let receipt = vested.claim().await.map_err(protocol_error)?;
            print_receipt(&receipt);
        }
        Command::Gas => {
            match app.fees.dynamic_fee_quote().await {
                Ok(quote) => {
                    println!("dynamic: base fee {}", format_gwei(quote.base_fee_per_gas));
                    for (tier, fees) in [
                        ("slow", quote.slow),
                        ("standard", quote.standard),
                        ("fast", quote.fast),
                    ] {
                        println!(
                            "  {}: max fee {}, priority {}",
                            tier,
                            format_gwei(fees.max_fee_per_gas),
                            format_gwei(fees.max_priority_fee_per_gas)
                        );
                    }
                }
                Err(e) => println!("dynamic: unavailable ({})", e),
            }
            match app.fees.legacy_fee_quote().await {
                Ok(quote) => println!("legacy: gas price {}", format_gwei(quote.gas_price)),
                Err(e) => println!("legacy: unavailable ({})", e),
            }
            return Ok(());
        }
    }

    print_submissions(&app.queue);
    Ok(())
}

#[tokio::main]
async fn main() {
    dotenv().ok();
    env_logger::init();

    let cli = Cli::parse();
    if let Err(e) = run(cli).await {
        log::error!("{}", e);
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}
