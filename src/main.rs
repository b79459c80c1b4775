use std::path::{Path, PathBuf};

use chrono::{TimeZone, Utc};
use clap::{Args, Parser, Subcommand, ValueEnum};
use num_bigint::BigUint;
use solana_sdk::signature::{Keypair, Signer};
use solana_sdk::signer::SignerError;
use solana_sdk::transaction::Transaction;
use thiserror::Error;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

use vesting_core::codec::{self, Width};
use vesting_core::instruction::{self, Instruction, SEED_LEN};
use vesting_core::metadata::{self, MetadataParams};
use vesting_core::pubkey::{
    associated_token_address, associated_vesting_address, vesting_account_address, Pubkey,
};
use vesting_core::state::{MetadataState, VestingAccount};
use vesting_core::{CodecError, VestingError};

mod config;
mod rpc;
mod schedule;
mod wallet;

use config::{Config, ConfigError};
use rpc::{encode_transaction, HttpRpcClient, RpcClient, RpcError};
use schedule::{amount_to_ui_amount, plan_releases, ScheduleError};
use wallet::WalletError;

/// Fresh seeds tried before giving up on finding an unused vesting address.
const MAX_SEED_ATTEMPTS: usize = 16;

//==================== CLI definition ====================//

/// Create and manage token vesting contracts.
#[derive(Parser, Debug)]
#[command(name = "vesting", author, version, about, long_about = None)]
struct Cli {
    /// YAML configuration file
    #[arg(long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,

    /// JSON-RPC endpoint, overrides the configuration
    #[arg(long, global = true, value_name = "URL")]
    url: Option<String>,

    /// Signer keypair file, overrides the configuration
    #[arg(long, global = true, value_name = "PATH")]
    keypair: Option<PathBuf>,

    /// Print the signed transaction in base64 instead of sending it
    #[arg(long, global = true)]
    dry_run: bool,

    /// Raise log verbosity (-v info, -vv debug)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Lock tokens for a beneficiary under a tier's release schedule
    Create {
        beneficiary: Pubkey,
        /// Tier id or name from the configuration
        tier: String,
        /// Purchase amount; divided by the tier price when one is set
        amount: f64,
    },
    /// Release every schedule whose date has passed
    Unlock {
        /// Contract seed printed by `create`
        seed: Pubkey,
    },
    /// Hand the remaining schedule to another wallet
    ChangeBeneficiary {
        seed: Pubkey,
        new_beneficiary: Pubkey,
    },
    /// Show a vesting contract and its releases
    Info { seed: Pubkey },
    /// Manage vesting metadata accounts
    Metadata {
        #[command(subcommand)]
        action: MetadataCommand,
    },
    /// Fixed-width little-endian integer encoding
    Codec {
        #[command(subcommand)]
        action: CodecCommand,
    },
    /// Write a new keypair file
    Keygen {
        #[arg(long, value_name = "PATH")]
        out: PathBuf,
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}

#[derive(Subcommand, Debug)]
enum MetadataCommand {
    Create(MetadataArgs),
    Update(MetadataArgs),
    Delete(MetadataArgs),
    /// Decode a metadata account
    Show(ShowArgs),
}

#[derive(Args, Debug, Clone)]
#[group(required = true, multiple = false)]
struct ShowArgs {
    /// Metadata account
    #[arg(long)]
    account: Option<Pubkey>,
    /// Wallet whose associated vesting account for the configured mint is shown
    #[arg(long)]
    wallet: Option<Pubkey>,
}

#[derive(Args, Debug, Clone)]
struct MetadataArgs {
    /// Metadata account
    #[arg(long)]
    account: Pubkey,
    /// Authority recorded in the metadata, defaults to the signer
    #[arg(long)]
    authority: Option<Pubkey>,
    #[arg(long)]
    vault: Pubkey,
    /// Seconds until rewards are fully realised
    #[arg(long, default_value_t = 0)]
    duration: u64,
    #[arg(long, default_value_t = 0)]
    apr: u64,
    #[arg(long, default_value_t = 0)]
    withdrawal_timelock: u64,
    #[arg(long, default_value_t = 0)]
    early_withdrawal_fee: u64,
    #[arg(long, default_value_t = 0)]
    lifetime: u64,
}

#[derive(Subcommand, Debug)]
enum CodecCommand {
    /// Decimal value to little-endian hex
    Encode {
        value: String,
        #[arg(long, value_enum, default_value_t = WidthArg::W64)]
        width: WidthArg,
    },
    /// Little-endian hex to decimal value
    Decode {
        hex: String,
        #[arg(long, value_enum, default_value_t = WidthArg::W64)]
        width: WidthArg,
    },
}

/// Field width in bits.
#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum WidthArg {
    #[value(name = "32")]
    W32,
    #[value(name = "64")]
    W64,
}

impl From<WidthArg> for Width {
    fn from(arg: WidthArg) -> Self {
        match arg {
            WidthArg::W32 => Width::U32,
            WidthArg::W64 => Width::U64,
        }
    }
}

//==================== Errors ====================//

#[derive(Debug, Error)]
enum CliError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Rpc(#[from] RpcError),
    #[error(transparent)]
    Ledger(#[from] VestingError),
    #[error(transparent)]
    Codec(#[from] CodecError),
    #[error(transparent)]
    Schedule(#[from] ScheduleError),
    #[error(transparent)]
    Wallet(#[from] WalletError),
    #[error("signing failed: {0}")]
    Signer(#[from] SignerError),
    #[error("account {0} does not exist")]
    MissingAccount(Pubkey),
    #[error("no unused vesting address after {0} seeds")]
    SeedsExhausted(usize),
    #[error("{0}")]
    Usage(String),
}

//==================== Context ====================//

struct Context {
    config: Config,
    rpc: Box<dyn RpcClient>,
    keypair_path: PathBuf,
    dry_run: bool,
}

impl Context {
    fn signer(&self) -> Result<Keypair, CliError> {
        Ok(wallet::read_keypair(&self.keypair_path)?)
    }

    /// Compile, sign and send `instructions` with `signer` paying fees.
    fn submit(&self, instructions: &[Instruction], signer: &Keypair) -> Result<String, CliError> {
        let payer = signer.pubkey();
        let blockhash = self.rpc.get_latest_blockhash()?;
        debug!(%blockhash, instructions = instructions.len(), "compiling transaction");
        let mut transaction = Transaction::new_with_payer(instructions, Some(&payer));
        transaction.try_sign(&[signer], blockhash)?;

        if self.dry_run {
            println!("{}", encode_transaction(&transaction)?);
            return Ok(transaction.signatures[0].to_string());
        }
        let signature = self.rpc.send_transaction(&transaction)?;
        info!(%signature, "transaction sent");
        Ok(signature)
    }

    fn vesting_account(&self, seed: &[u8; SEED_LEN]) -> Result<(Pubkey, VestingAccount), CliError> {
        let (address, _) = vesting_account_address(seed, &self.config.program_id)?;
        let data = self
            .rpc
            .get_account_data(&address)?
            .ok_or(CliError::MissingAccount(address))?;
        Ok((address, VestingAccount::unpack(&data)?))
    }

    fn ui(&self, amount: u64) -> f64 {
        amount_to_ui_amount(amount, self.config.mint_decimals)
    }
}

fn now() -> u32 {
    u32::try_from(Utc::now().timestamp()).unwrap_or(u32::MAX)
}

fn format_timestamp(timestamp: u32) -> String {
    Utc.timestamp_opt(i64::from(timestamp), 0)
        .single()
        .map(|date| date.format("%Y-%m-%d %H:%M:%S UTC").to_string())
        .unwrap_or_else(|| timestamp.to_string())
}

//==================== Vesting commands ====================//

fn command_create(
    ctx: &Context,
    beneficiary: Pubkey,
    tier: &str,
    amount: f64,
) -> Result<[u8; SEED_LEN], CliError> {
    let config = &ctx.config;
    let tier = config.tier(tier)?;
    let plan = tier.plan(amount, config.mint_decimals)?;
    let releases = plan_releases(config.execution_timestamp()?, &plan)?;
    info!(tier = %tier.name, releases = releases.len(), allocation = plan.allocation, "planned releases");

    let signer = ctx.signer()?;
    let payer = signer.pubkey();
    let source_token = associated_token_address(&payer, &config.mint);

    let mut found = None;
    for _ in 0..MAX_SEED_ATTEMPTS {
        let mut seed: [u8; SEED_LEN] = rand::random();
        let (vesting, bump) = vesting_account_address(&seed, &config.program_id)?;
        seed[SEED_LEN - 1] = bump;
        if ctx.rpc.account_exists(&vesting)? {
            debug!(%vesting, "vesting address taken, trying another seed");
            continue;
        }
        found = Some((seed, vesting));
        break;
    }
    let (seed, vesting) = found.ok_or(CliError::SeedsExhausted(MAX_SEED_ATTEMPTS))?;
    let vault = associated_token_address(&vesting, &config.mint);
    println!("Creating vesting contract {vesting}");

    let number_of_schedules = u32::try_from(releases.len())
        .map_err(|_| CliError::Usage("too many releases".into()))?;
    let instructions = [
        instruction::init(&config.program_id, &payer, &vesting, seed, number_of_schedules)?,
        instruction::create_associated_token_account(&payer, &vesting, &config.mint),
        instruction::create(
            &config.program_id,
            &payer,
            &source_token,
            &vesting,
            &vault,
            seed,
            config.mint,
            beneficiary,
            releases,
        )?,
    ];
    let signature = ctx.submit(&instructions, &signer)?;

    println!("  Tokens vested: {}", ctx.ui(plan.allocation));
    println!("  Recipient: {beneficiary}");
    println!("Signature: {signature}");
    println!("\nContract seed: {}", Pubkey::new_from_array(seed));
    Ok(seed)
}

fn command_unlock(ctx: &Context, seed: [u8; SEED_LEN]) -> Result<String, CliError> {
    let (vesting, account) = ctx.vesting_account(&seed)?;
    let header = account.header;
    println!("Unlocking tokens for {}", header.beneficiary);

    let vault = associated_token_address(&vesting, &header.mint);
    let beneficiary_token = associated_token_address(&header.beneficiary, &header.mint);
    let unlockable = account.unlocked_quantity(now());

    let ix = instruction::unlock(&ctx.config.program_id, &vesting, &vault, &beneficiary_token, seed)?;
    let signer = ctx.signer()?;
    let signature = ctx.submit(&[ix], &signer)?;

    println!("  Tokens unlocked: {}", ctx.ui(unlockable));
    println!("  Recipient: {}", header.beneficiary);
    println!("Signature: {signature}");
    Ok(signature)
}

fn command_change_beneficiary(
    ctx: &Context,
    seed: [u8; SEED_LEN],
    new_beneficiary: Pubkey,
) -> Result<String, CliError> {
    let (vesting, account) = ctx.vesting_account(&seed)?;
    let signer = ctx.signer()?;
    let current = signer.pubkey();
    if current != account.header.beneficiary {
        return Err(CliError::Usage(format!(
            "signer {current} is not the beneficiary {} of {vesting}",
            account.header.beneficiary
        )));
    }
    let new_token = associated_token_address(&new_beneficiary, &account.header.mint);
    let ix = instruction::change_beneficiary(&ctx.config.program_id, &vesting, &current, &new_token, seed)?;
    let signature = ctx.submit(&[ix], &signer)?;

    println!("Beneficiary of {vesting} changed to {new_beneficiary}");
    println!("Signature: {signature}");
    Ok(signature)
}

fn command_info(ctx: &Context, seed: [u8; SEED_LEN]) -> Result<(), CliError> {
    println!("Program ID: {}", ctx.config.program_id);
    println!("Seed: {}", Pubkey::new_from_array(seed));

    let (vesting, account) = ctx.vesting_account(&seed)?;
    let header = &account.header;
    println!("Vesting Account Address: {vesting}");
    println!("Vesting Vault Address: {}", associated_token_address(&vesting, &header.mint));
    println!("Initialized: {}", header.is_initialized);
    println!("Mint Address: {}", header.mint);
    println!("Beneficiary Address: {}", header.beneficiary);
    println!(
        "Beneficiary Token Address: {}",
        associated_token_address(&header.beneficiary, &header.mint)
    );

    for (i, release) in account.releases.iter().enumerate() {
        println!("\nRelease {}", i + 1);
        println!("Release Date: {}", format_timestamp(release.timestamp));
        println!("Quantity: {}", ctx.ui(release.quantity));
    }
    println!("\nUnlockable now: {}", ctx.ui(account.unlocked_quantity(now())));
    println!("Total Tokens Remaining: {}", ctx.ui(account.remaining_quantity()));
    Ok(())
}

//==================== Metadata ====================//

fn metadata_program(ctx: &Context) -> Result<Pubkey, CliError> {
    ctx.config
        .metadata_program_id
        .ok_or_else(|| CliError::Usage("metadata_program_id is not configured".into()))
}

fn command_metadata_show(ctx: &Context, args: &ShowArgs) -> Result<MetadataState, CliError> {
    let program_id = metadata_program(ctx)?;
    let address = match (args.account, args.wallet) {
        (Some(account), _) => account,
        (None, Some(wallet)) => {
            let (address, _) = associated_vesting_address(
                &wallet,
                &ctx.config.mint,
                &ctx.config.program_id,
                &program_id,
            )?;
            address
        }
        (None, None) => return Err(CliError::Usage("pass --account or --wallet".into())),
    };
    let data = ctx
        .rpc
        .get_account_data(&address)?
        .ok_or(CliError::MissingAccount(address))?;
    let state = MetadataState::unpack(&data)?;

    println!("Metadata Account Address: {address}");
    println!("Initialized: {}", state.is_initialized);
    println!("Authority: {}", state.authority);
    println!("Vault: {}", state.vault);
    println!("Duration: {}", state.duration);
    println!("APR: {}", state.apr);
    println!("Withdrawal Timelock: {}", state.withdrawal_timelock);
    println!("Early Withdrawal Fee: {}", state.early_withdrawal_fee);
    println!("Lifetime: {}", state.lifetime);
    Ok(state)
}

fn command_metadata(ctx: &Context, action: MetadataCommand) -> Result<String, CliError> {
    if let MetadataCommand::Show(args) = &action {
        command_metadata_show(ctx, args)?;
        return Ok(String::new());
    }
    let program_id = metadata_program(ctx)?;
    let signer = ctx.signer()?;
    let tx_authority = signer.pubkey();

    let params = |args: &MetadataArgs| MetadataParams {
        authority: args.authority.unwrap_or(tx_authority),
        vault: args.vault,
        duration: args.duration,
        apr: args.apr,
        withdrawal_timelock: args.withdrawal_timelock,
        early_withdrawal_fee: args.early_withdrawal_fee,
        lifetime: args.lifetime,
    };
    let (ix, account, verb) = match &action {
        MetadataCommand::Create(args) => (
            metadata::create(&program_id, &tx_authority, &args.account, params(args))?,
            args.account,
            "created",
        ),
        MetadataCommand::Update(args) => (
            metadata::update(&program_id, &tx_authority, &args.account, params(args))?,
            args.account,
            "updated",
        ),
        MetadataCommand::Delete(args) => (
            metadata::delete(&program_id, &tx_authority, &args.account, params(args))?,
            args.account,
            "deleted",
        ),
        MetadataCommand::Show(_) => return Ok(String::new()),
    };
    let signature = ctx.submit(&[ix], &signer)?;
    println!("Metadata {account} {verb}");
    println!("Signature: {signature}");
    Ok(signature)
}

//==================== Codec / keygen ====================//

fn codec_encode(value: &str, width: Width) -> Result<String, CliError> {
    let value: BigUint = value
        .trim()
        .parse()
        .map_err(|err| CliError::Usage(format!("invalid value {value:?}: {err}")))?;
    Ok(hex::encode(codec::encode(&value, width)?))
}

fn codec_decode(hex_str: &str, width: Width) -> Result<String, CliError> {
    let bytes = hex::decode(hex_str.trim())
        .map_err(|err| CliError::Usage(format!("invalid hex {hex_str:?}: {err}")))?;
    Ok(codec::decode(&bytes, width)?.to_string())
}

fn command_keygen(out: &Path, force: bool) -> Result<(), CliError> {
    let keypair = wallet::generate();
    wallet::write_keypair(&keypair, out, force)?;
    println!("Wrote new keypair to {}", out.display());
    println!("pubkey: {}", keypair.pubkey());
    Ok(())
}

//==================== Entry point ====================//

fn init_tracing(verbose: u8) {
    let default = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn context(cli: &Cli) -> Result<Context, CliError> {
    let path = cli
        .config
        .clone()
        .or_else(Config::default_path)
        .ok_or_else(|| CliError::Usage("no --config given and HOME is not set".into()))?;
    let config = Config::load(&path)?;
    debug!(path = %path.display(), "loaded config");

    let url = cli.url.clone().unwrap_or_else(|| config.json_rpc_url.clone());
    let keypair_path = cli
        .keypair
        .clone()
        .or_else(|| config.keypair_path.clone())
        .or_else(|| path.parent().map(|dir| dir.join("id.json")))
        .ok_or_else(|| CliError::Usage("no keypair configured".into()))?;
    Ok(Context {
        rpc: Box::new(HttpRpcClient::new(&url)?),
        config,
        keypair_path,
        dry_run: cli.dry_run,
    })
}

fn run(cli: Cli) -> Result<(), CliError> {
    match &cli.command {
        Command::Codec { action } => {
            let out = match action {
                CodecCommand::Encode { value, width } => codec_encode(value, (*width).into())?,
                CodecCommand::Decode { hex, width } => codec_decode(hex, (*width).into())?,
            };
            println!("{out}");
            return Ok(());
        }
        Command::Keygen { out, force } => return command_keygen(out, *force),
        _ => {}
    }

    let ctx = context(&cli)?;
    match cli.command {
        Command::Create {
            beneficiary,
            tier,
            amount,
        } => command_create(&ctx, beneficiary, &tier, amount).map(|_| ()),
        Command::Unlock { seed } => command_unlock(&ctx, seed.to_bytes()).map(|_| ()),
        Command::ChangeBeneficiary {
            seed,
            new_beneficiary,
        } => command_change_beneficiary(&ctx, seed.to_bytes(), new_beneficiary).map(|_| ()),
        Command::Info { seed } => command_info(&ctx, seed.to_bytes()),
        Command::Metadata { action } => command_metadata(&ctx, action).map(|_| ()),
        Command::Codec { .. } | Command::Keygen { .. } => Ok(()),
    }
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);
    if let Err(err) = run(cli) {
        eprintln!("error: {err}");
        std::process::exit(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rpc::tests::FakeRpc;
    use std::rc::Rc;
    use vesting_core::instruction::VestingInstruction;
    use vesting_core::state::{Release, VestingHeader};

    const CONFIG: &str = r#"
program_id: BPFLoaderUpgradeab1e11111111111111111111111
metadata_program_id: Stake11111111111111111111111111111111111111
mint: TokenkegQfeZyiNwAJbNbGKPFXCWuBvf9Ss623VQ5DA
mint_decimals: 6
execution_date: 2022-01-15
tiers:
  - id: 0
    name: Team
    group: team
    vesting_months: 60
  - id: 2
    name: Private
    group: private
    vesting_months: 12
    price: 0.5
"#;

    /// `RpcClient` handle that shares state with the test.
    struct Shared(Rc<FakeRpc>);

    impl RpcClient for Shared {
        fn get_latest_blockhash(&self) -> Result<solana_sdk::hash::Hash, RpcError> {
            self.0.get_latest_blockhash()
        }
        fn get_account_data(&self, address: &Pubkey) -> Result<Option<Vec<u8>>, RpcError> {
            self.0.get_account_data(address)
        }
        fn send_transaction(&self, transaction: &Transaction) -> Result<String, RpcError> {
            self.0.send_transaction(transaction)
        }
    }

    struct Harness {
        ctx: Context,
        fake: Rc<FakeRpc>,
        signer: Keypair,
        _dir: tempfile::TempDir,
    }

    fn harness() -> Harness {
        let dir = tempfile::tempdir().unwrap();
        let keypair_path = dir.path().join("id.json");
        let signer = Keypair::new();
        wallet::write_keypair(&signer, &keypair_path, false).unwrap();
        let fake = Rc::new(FakeRpc::default());
        let ctx = Context {
            config: Config::from_yaml(CONFIG).unwrap(),
            rpc: Box::new(Shared(Rc::clone(&fake))),
            keypair_path,
            dry_run: false,
        };
        Harness {
            ctx,
            fake,
            signer,
            _dir: dir,
        }
    }

    fn store_account(h: &Harness, seed: &[u8; SEED_LEN], beneficiary: Pubkey) -> Pubkey {
        let (address, _) = vesting_account_address(seed, &h.ctx.config.program_id).unwrap();
        let account = VestingAccount {
            header: VestingHeader {
                is_initialized: true,
                beneficiary,
                mint: h.ctx.config.mint,
            },
            releases: vec![
                Release { timestamp: 1_000, quantity: 5 },
                Release { timestamp: u32::MAX, quantity: 7 },
            ],
        };
        h.fake
            .accounts
            .borrow_mut()
            .insert(address, account.pack().unwrap());
        address
    }

    #[test]
    fn create_sends_init_ata_and_create() {
        let h = harness();
        let beneficiary = Pubkey::new_unique();
        let seed = command_create(&h.ctx, beneficiary, "private", 50.0).unwrap();

        let sent = h.fake.sent.borrow();
        assert_eq!(sent.len(), 1);
        let tx = &sent[0];
        assert!(tx.verify().is_ok());
        assert_eq!(tx.message.account_keys[0], h.signer.pubkey());
        assert_eq!(tx.message.instructions.len(), 3);

        let (vesting, bump) = vesting_account_address(&seed, &h.ctx.config.program_id).unwrap();
        assert_eq!(seed[SEED_LEN - 1], bump);
        assert!(tx.message.account_keys.contains(&vesting));

        match VestingInstruction::unpack(&tx.message.instructions[2].data).unwrap() {
            VestingInstruction::Create {
                seeds,
                mint,
                beneficiary: recorded,
                schedules,
            } => {
                assert_eq!(seeds, seed);
                assert_eq!(mint, h.ctx.config.mint);
                assert_eq!(recorded, beneficiary);
                assert_eq!(schedules.len(), 12);
                // 50 / 0.5 = 100 tokens at 6 decimals
                let total: u64 = schedules.iter().map(|r| r.quantity).sum();
                assert_eq!(total, 100_000_000);
                assert_eq!(schedules[0].timestamp, 1_642_204_800);
            }
            other => panic!("unexpected {other:?}"),
        }
        match VestingInstruction::unpack(&tx.message.instructions[0].data).unwrap() {
            VestingInstruction::Init {
                number_of_schedules,
                ..
            } => assert_eq!(number_of_schedules, 12),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn longest_schedule_fits_one_transaction() {
        let h = harness();
        command_create(&h.ctx, Pubkey::new_unique(), "team", 1_000.0).unwrap();
        let sent = h.fake.sent.borrow();
        let tx = &sent[0];
        assert!(encode_transaction(tx).is_ok());
        match VestingInstruction::unpack(&tx.message.instructions[2].data).unwrap() {
            VestingInstruction::Create { schedules, .. } => {
                assert_eq!(schedules.len(), schedule::MAX_RELEASES as usize)
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn create_rejects_unknown_tier() {
        let h = harness();
        assert!(matches!(
            command_create(&h.ctx, Pubkey::new_unique(), "seed", 1.0),
            Err(CliError::Config(ConfigError::UnknownTier(_)))
        ));
        assert!(h.fake.sent.borrow().is_empty());
    }

    #[test]
    fn unlock_targets_beneficiary_token_account() {
        let h = harness();
        let seed = [4u8; SEED_LEN];
        let beneficiary = Pubkey::new_unique();
        let vesting = store_account(&h, &seed, beneficiary);
        command_unlock(&h.ctx, seed).unwrap();

        let sent = h.fake.sent.borrow();
        let message = &sent[0].message;
        let ben_token = associated_token_address(&beneficiary, &h.ctx.config.mint);
        assert!(message.account_keys.contains(&vesting));
        assert!(message.account_keys.contains(&ben_token));
        assert_eq!(
            VestingInstruction::unpack(&message.instructions[0].data).unwrap(),
            VestingInstruction::Unlock { seeds: seed }
        );
    }

    #[test]
    fn unlock_of_missing_account_fails() {
        let h = harness();
        assert!(matches!(
            command_unlock(&h.ctx, [9u8; SEED_LEN]),
            Err(CliError::MissingAccount(_))
        ));
    }

    #[test]
    fn change_beneficiary_requires_current_beneficiary() {
        let h = harness();
        let seed = [6u8; SEED_LEN];
        store_account(&h, &seed, Pubkey::new_unique());
        assert!(matches!(
            command_change_beneficiary(&h.ctx, seed, Pubkey::new_unique()),
            Err(CliError::Usage(_))
        ));

        let seed = [8u8; SEED_LEN];
        store_account(&h, &seed, h.signer.pubkey());
        command_change_beneficiary(&h.ctx, seed, Pubkey::new_unique()).unwrap();
        assert_eq!(h.fake.sent.borrow().len(), 1);
    }

    #[test]
    fn info_reads_stored_account() {
        let h = harness();
        let seed = [2u8; SEED_LEN];
        store_account(&h, &seed, Pubkey::new_unique());
        command_info(&h.ctx, seed).unwrap();
        assert!(h.fake.sent.borrow().is_empty());
    }

    #[test]
    fn metadata_defaults_authority_to_signer() {
        let h = harness();
        let args = MetadataArgs {
            account: Pubkey::new_unique(),
            authority: None,
            vault: Pubkey::new_unique(),
            duration: 10,
            apr: 5,
            withdrawal_timelock: 0,
            early_withdrawal_fee: 0,
            lifetime: 100,
        };
        command_metadata(&h.ctx, MetadataCommand::Create(args)).unwrap();
        let sent = h.fake.sent.borrow();
        let data = &sent[0].message.instructions[0].data;
        match metadata::MetadataInstruction::unpack(data).unwrap() {
            metadata::MetadataInstruction::Create(params) => {
                assert_eq!(params.authority, h.signer.pubkey());
                assert_eq!(params.lifetime, 100);
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    fn metadata_bytes(authority: &Pubkey, vault: &Pubkey, apr: u64) -> Vec<u8> {
        let mut data = vec![1u8];
        data.extend_from_slice(authority.as_ref());
        data.extend_from_slice(vault.as_ref());
        for field in [30u64, apr, 0, 0, 365] {
            data.extend_from_slice(&field.to_le_bytes());
        }
        data
    }

    #[test]
    fn metadata_show_decodes_account() {
        let h = harness();
        let authority = Pubkey::new_unique();
        let vault = Pubkey::new_unique();
        let account = Pubkey::new_unique();
        h.fake
            .accounts
            .borrow_mut()
            .insert(account, metadata_bytes(&authority, &vault, 12));

        let args = ShowArgs {
            account: Some(account),
            wallet: None,
        };
        let state = command_metadata_show(&h.ctx, &args).unwrap();
        assert!(state.is_initialized);
        assert_eq!(state.authority, authority);
        assert_eq!(state.vault, vault);
        assert_eq!((state.duration, state.apr, state.lifetime), (30, 12, 365));
        assert!(h.fake.sent.borrow().is_empty());

        let missing = ShowArgs {
            account: Some(Pubkey::new_unique()),
            wallet: None,
        };
        assert!(matches!(
            command_metadata_show(&h.ctx, &missing),
            Err(CliError::MissingAccount(_))
        ));
    }

    #[test]
    fn metadata_show_derives_associated_vesting_address() {
        let h = harness();
        let wallet = Pubkey::new_unique();
        let config = &h.ctx.config;
        let metadata_program = config.metadata_program_id.unwrap();
        let (address, _) = Pubkey::find_program_address(
            &[wallet.as_ref(), config.program_id.as_ref(), config.mint.as_ref()],
            &metadata_program,
        );
        h.fake
            .accounts
            .borrow_mut()
            .insert(address, metadata_bytes(&wallet, &Pubkey::new_unique(), 7));

        let args = ShowArgs {
            account: None,
            wallet: Some(wallet),
        };
        let state = command_metadata_show(&h.ctx, &args).unwrap();
        assert_eq!(state.authority, wallet);
        assert_eq!(state.apr, 7);
    }

    #[test]
    fn codec_commands() {
        assert_eq!(codec_encode("256", Width::U32).unwrap(), "00010000");
        assert_eq!(
            codec_encode("18446744073709551615", Width::U64).unwrap(),
            "ffffffffffffffff"
        );
        assert!(matches!(
            codec_encode("4294967296", Width::U32),
            Err(CliError::Codec(CodecError::OutOfRange { .. }))
        ));
        assert!(matches!(codec_encode("-1", Width::U32), Err(CliError::Usage(_))));
        assert_eq!(codec_decode("01000000", Width::U32).unwrap(), "1");
        assert!(matches!(
            codec_decode("0100", Width::U32),
            Err(CliError::Codec(CodecError::InvalidLength { expected: 4, actual: 2 }))
        ));
    }

    #[test]
    fn parses_command_lines() {
        let cli = Cli::try_parse_from(["vesting", "codec", "encode", "7", "--width", "32"]).unwrap();
        assert!(matches!(
            cli.command,
            Command::Codec {
                action: CodecCommand::Encode {
                    width: WidthArg::W32,
                    ..
                }
            }
        ));
        let cli = Cli::try_parse_from(["vesting", "codec", "decode", "00"]).unwrap();
        assert!(matches!(
            cli.command,
            Command::Codec {
                action: CodecCommand::Decode {
                    width: WidthArg::W64,
                    ..
                }
            }
        ));
        assert_eq!(Width::from(WidthArg::W32), Width::U32);
        assert!(Cli::try_parse_from(["vesting", "codec", "encode", "7", "--width", "16"]).is_err());

        let key = Pubkey::new_unique().to_string();
        assert!(Cli::try_parse_from(["vesting", "metadata", "show", "--wallet", key.as_str()]).is_ok());
        assert!(Cli::try_parse_from(["vesting", "metadata", "show"]).is_err());
        assert!(Cli::try_parse_from([
            "vesting", "metadata", "show", "--wallet", key.as_str(), "--account", key.as_str()
        ])
        .is_err());

        let seed = Pubkey::new_unique().to_string();
        let cli = Cli::try_parse_from(["vesting", "--dry-run", "-vv", "info", seed.as_str()]).unwrap();
        assert!(cli.dry_run);
        assert_eq!(cli.verbose, 2);
        assert!(Cli::try_parse_from(["vesting", "unlock", "not-base58!"]).is_err());
    }
}
