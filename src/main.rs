#[macro_use]
extern crate log;

use clap::{CommandFactory, Parser};
use colored::*;
use eyre::{Result, WrapErr, bail};
use std::time::Duration;

use eth_deposit::{
    account::AccountStore,
    config::{self, *},
    credentials::{WithdrawalSource, derive_withdrawal_credentials},
    deposit::{self, DepositParams, OutputFormat},
    domain, global, global_set,
    helpers::{self, units},
    logger::{DEFAULT_LOG_LEVEL, Logger},
    printf,
    verify::{self, VerificationPolicy},
};

fn main() -> Result<()> {
    // Parse args with clap
    let args = Cli::parse();

    // Load config file & shellexpand the keystore so we can use "~/...", etc
    let mut config = config::merge_args_from_file::<CliArgs>(args.config, args.config_path)?;
    config.keystore = config
        .keystore
        .map(|keystore| helpers::expand_path(&keystore.to_string_lossy()));
    if config.timeout == Some(0) {
        bail!("timeout must be at least 1 second");
    }

    // Setup our global logger
    let logger = Logger::new(config.log_level.unwrap_or(DEFAULT_LOG_LEVEL));
    if config.quiet {
        logger.set_quiet();
    }
    logger.set_global()?;

    // Store global ref to our logger and config
    global_set!(quiet) = config.quiet;
    global_set!(logger) = logger;
    global_set!(config) = config;

    if !cmd_dispatch(&Cli::command(), &args.command)? {
        std::process::exit(1);
    }
    Ok(())
}

fn timeout() -> Duration {
    Duration::from_secs(global!(config).timeout.unwrap_or(10))
}

fn load_store() -> Result<AccountStore> {
    let keystore = global!(config)
        .keystore
        .clone()
        .unwrap_or_else(|| helpers::expand_path(config::DEFAULT_KEYSTORE));
    AccountStore::load_keystore(&keystore)
        .wrap_err_with(|| format!("failed to load keystore {}", keystore.display()))
}

/// Returns false when the command ran but its result is a failure.
fn cmd_dispatch(app: &clap::Command, cmd: &CliCmd) -> Result<bool> {
    match cmd {
        CliCmd::Version {} => {
            let mut ver = app.render_version();
            ver.pop(); // remove "\n"
            println!("version: {}", ver);
        }
        CliCmd::Validator { command } => match command {
            CmdValidator::DepositData {
                validator_accounts,
                withdrawal_account,
                withdrawal_pubkey,
                withdrawal_address,
                compounding,
                amount,
                fork_version,
                format,
                passphrases,
            } => {
                let store = load_store()?;
                let validators = store.select(validator_accounts)?;
                let withdrawal_account = withdrawal_account
                    .as_deref()
                    .map(|spec| store.get(spec))
                    .transpose()?;
                let source = WithdrawalSource::from_options(
                    withdrawal_account.as_ref(),
                    withdrawal_pubkey.as_deref(),
                    withdrawal_address.as_deref(),
                    *compounding,
                )?;
                let params = DepositParams {
                    withdrawal_credentials: derive_withdrawal_credentials(&source)?,
                    amount: units::parse_deposit_amount(amount)?,
                    fork_version: domain::parse_fork_version(fork_version.as_deref())?,
                    format: *format,
                    // Scratch accounts accept any passphrase, so always try at least one
                    passphrases: match passphrases.is_empty() {
                        true => vec![String::new()],
                        false => passphrases.clone(),
                    },
                    timeout: timeout(),
                };
                debug!(
                    "Generating {} deposit(s) for fork version {}",
                    validators.len(),
                    params.fork_version.to_string().blue()
                );
                let records = deposit::build_batch(&validators, &params)
                    .wrap_err("Failed to generate deposit data")?;
                if *format == OutputFormat::Raw && records.len() > 1 {
                    info!("Raw output holds one transaction per validator");
                }
                // Deposit data is the product, print it even when quiet
                println!("{}", deposit::render_batch(&records));
            }
        },
        CliCmd::Deposit { command } => match command {
            CmdDeposit::Verify {
                data,
                withdrawal_account,
                withdrawal_pubkey,
                withdrawal_address,
                compounding,
                amount,
                validator_pubkeys,
                fork_version,
            } => {
                let input = deposit::read_input(data)?;
                let deposits =
                    deposit::parse_deposits(&input).wrap_err("Failed to parse deposit data")?;

                let withdrawal_credentials =
                    match (withdrawal_account, withdrawal_pubkey, withdrawal_address) {
                        (None, None, None) => None,
                        _ => {
                            let account = withdrawal_account
                                .as_deref()
                                .map(|spec| -> Result<_> { Ok(load_store()?.get(spec)?) })
                                .transpose()?;
                            let source = WithdrawalSource::from_options(
                                account.as_ref(),
                                withdrawal_pubkey.as_deref(),
                                withdrawal_address.as_deref(),
                                *compounding,
                            )?;
                            Some(derive_withdrawal_credentials(&source)?)
                        }
                    };
                let policy = VerificationPolicy {
                    withdrawal_credentials,
                    amount: amount
                        .as_deref()
                        .map(units::parse_deposit_amount)
                        .transpose()?,
                    pubkeys: validator_pubkeys
                        .as_deref()
                        .map(verify::parse_pubkeys)
                        .transpose()?,
                    fork_version: fork_version
                        .as_deref()
                        .map(|v| domain::parse_fork_version(Some(v)))
                        .transpose()?,
                };
                debug!("{:#?}", policy);

                let mut passed = true;
                for report in verify::verify_all(&deposits, &policy) {
                    printf!("Deposit {}:", report.label.yellow());
                    for line in report.lines() {
                        printf!("  {}", line);
                    }
                    passed &= report.overall_pass();
                }
                return Ok(passed);
            }
        },
    };
    Ok(true)
}
