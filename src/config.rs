use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use std::{fs::File, io::BufReader};

use eyre::{Result, WrapErr, bail};
use serde_derive::Deserialize;

use clap_serde_derive::{
    ClapSerde,
    clap::{self, Parser, Subcommand},
};

use crate::deposit::OutputFormat;
use crate::helpers::expand_path;

pub const DEFAULT_KEYSTORE: &str = "~/.eth-deposit/keystore";

fn config_file() -> PathBuf {
    let config_home = match std::env::var("XDG_CONFIG_HOME") {
        Ok(dir) if !dir.is_empty() => PathBuf::from(dir),
        _ => expand_path("~/.config"),
    };
    config_home.join("eth-deposit").join("config.toml")
}

#[derive(Parser)]
#[command(author, version, about)]
pub struct Cli {
    /// Config file
    #[arg(short, long = "config", default_value = config_file().into_os_string())]
    pub config_path: Option<PathBuf>,

    /// Global arguments
    #[command(flatten)]
    pub config: <CliArgs as ClapSerde>::Opt,

    // Subcommands
    #[command(subcommand)]
    pub command: CliCmd,
}

// Every value is optional so a config file may set any subset
#[derive(Debug, Clone, ClapSerde, Deserialize)]
pub struct CliArgs {
    /// Logging level (0: critical .. 5: trace)
    #[arg(short, long = "log-level", required = false, default_value = "3")]
    pub log_level: Option<u8>,

    /// Print nothing but the generated data
    #[arg(short, long, required = false, action = clap::ArgAction::SetTrue)]
    pub quiet: bool,

    /// Timeout for account operations, in seconds
    #[arg(
        long,
        required = false,
        default_value = "10",
        value_parser = clap::value_parser!(u64).range(1..)
    )]
    pub timeout: Option<u64>,

    /// Keystore directory
    #[arg(long, required = false, default_value = DEFAULT_KEYSTORE)]
    pub keystore: Option<PathBuf>,
}

// Command line cmds
#[derive(Subcommand)]
pub enum CliCmd {
    /// Print version information
    #[clap(visible_alias = "ver")]
    Version {},
    /// Validator key operations
    #[clap(visible_aliases = &["v"])]
    Validator {
        #[command(subcommand)]
        command: CmdValidator,
    },
    /// Deposit data operations
    #[clap(visible_aliases = &["d"])]
    Deposit {
        #[command(subcommand)]
        command: CmdDeposit,
    },
}

#[derive(Subcommand)]
pub enum CmdValidator {
    /// Generate signed deposit data for one or more validators
    #[clap(visible_aliases = &["dd"])]
    DepositData {
        /// Validator account: name, public key, 0x private key or "*" for all
        #[arg(long = "validator-account", visible_alias = "va", required = true)]
        validator_accounts: Vec<String>,
        /// Account whose public key receives withdrawals
        #[arg(long, visible_alias = "wa", required = false)]
        withdrawal_account: Option<String>,
        /// BLS public key that receives withdrawals
        #[arg(long, visible_alias = "wp", required = false)]
        withdrawal_pubkey: Option<String>,
        /// EIP-55 checksummed execution address that receives withdrawals
        #[arg(long, visible_alias = "wd", required = false)]
        withdrawal_address: Option<String>,
        /// Create a compounding (0x02) validator
        #[arg(long, required = false, action = clap::ArgAction::SetTrue)]
        compounding: bool,
        /// Amount to deposit, e.g. "32 ether"
        #[arg(short, long, required = true)]
        amount: String,
        /// Fork version of the target network
        #[arg(long, required = false)]
        fork_version: Option<String>,
        /// Output format
        #[arg(short, long, value_enum, default_value_t = OutputFormat::Json)]
        format: OutputFormat,
        /// Passphrase to unlock validator accounts, may be repeated
        #[arg(short, long = "passphrase", required = false)]
        passphrases: Vec<String>,
    },
}

#[derive(Subcommand)]
pub enum CmdDeposit {
    /// Verify deposit data against expected values
    #[clap(visible_aliases = &["ver"])]
    Verify {
        /// Deposit data: JSON, raw transaction data or a path to either
        #[arg(long, required = true)]
        data: String,
        /// Account whose public key should receive withdrawals
        #[arg(long, visible_alias = "wa", required = false)]
        withdrawal_account: Option<String>,
        /// BLS public key that should receive withdrawals
        #[arg(long, visible_alias = "wp", required = false)]
        withdrawal_pubkey: Option<String>,
        /// Execution address that should receive withdrawals
        #[arg(long, visible_alias = "wd", required = false)]
        withdrawal_address: Option<String>,
        /// Expect compounding (0x02) credentials
        #[arg(long, required = false, action = clap::ArgAction::SetTrue)]
        compounding: bool,
        /// Expected deposit amount, e.g. "32 ether"
        #[arg(short, long, required = false)]
        amount: Option<String>,
        /// Allowed validator public key, or a file of keys one per line
        #[arg(long, required = false)]
        validator_pubkeys: Option<String>,
        /// Expected fork version
        #[arg(long, required = false)]
        fork_version: Option<String>,
    },
}

/// Values present in the config file override the command line (defaults
/// included, clap fills those in before we get here).
pub fn merge_args_from_file<T>(args: <T as ClapSerde>::Opt, maybe_path: Option<PathBuf>) -> Result<T>
where
    T: ClapSerde + serde::de::DeserializeOwned,
{
    let Some(path) = maybe_path.filter(|path| path.exists()) else {
        return Ok(T::from(args));
    };
    let config = read_config::<T>(&path)?;
    Ok(T::from(args).merge(config))
}

fn read_config<T: ClapSerde>(path: &Path) -> Result<<T as ClapSerde>::Opt> {
    let context = || format!("{:?}", path);
    let config = match path.extension().and_then(OsStr::to_str) {
        Some("toml") => {
            let content = std::fs::read_to_string(path).wrap_err_with(context)?;
            toml::from_str(&content).wrap_err_with(context)?
        }
        Some("json") => {
            let f = File::open(path).wrap_err_with(context)?;
            serde_json::from_reader(BufReader::new(f)).wrap_err_with(context)?
        }
        Some("jsonc") => {
            let f = File::open(path).wrap_err_with(context)?;
            serde_jsonc::from_reader(BufReader::new(f)).wrap_err_with(context)?
        }
        _ => bail!("Unsupported config file type: {:?}", path),
    };
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_from(args).unwrap()
    }

    #[test]
    fn config_file_overrides() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "log_level = 5\ntimeout = 30\nkeystore = \"/tmp/keys\"\n").unwrap();

        let cli = parse(&["eth-deposit", "--quiet", "version"]);
        let config = merge_args_from_file::<CliArgs>(cli.config, Some(path)).unwrap();
        assert_eq!(config.timeout, Some(30));
        assert!(config.quiet, "unset in file, kept from command line");
        assert_eq!(config.log_level, Some(5));
        assert_eq!(config.keystore, Some(PathBuf::from("/tmp/keys")));
    }

    #[test]
    fn jsonc_config() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.jsonc");
        std::fs::write(&path, "{\n  // verbose\n  \"log_level\": 4\n}\n").unwrap();
        let cli = parse(&["eth-deposit", "version"]);
        let config = merge_args_from_file::<CliArgs>(cli.config, Some(path)).unwrap();
        assert_eq!(config.log_level, Some(4));
        assert_eq!(config.timeout, Some(10));
    }

    #[test]
    fn missing_and_unsupported_config() {
        let cli = parse(&["eth-deposit", "version"]);
        let config =
            merge_args_from_file::<CliArgs>(cli.config, Some(PathBuf::from("/nonexistent.toml")))
                .unwrap();
        assert_eq!(config.log_level, Some(3));
        assert!(!config.quiet);

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.yaml");
        std::fs::write(&path, "log_level: 1").unwrap();
        let cli = parse(&["eth-deposit", "version"]);
        assert!(merge_args_from_file::<CliArgs>(cli.config, Some(path)).is_err());
    }

    #[test]
    fn zero_timeout_rejected() {
        assert!(Cli::try_parse_from(["eth-deposit", "--timeout", "0", "version"]).is_err());
    }

    #[test]
    fn deposit_data_args() {
        let cli = parse(&[
            "eth-deposit",
            "validator",
            "deposit-data",
            "--validator-account",
            "Validators/1",
            "--validator-account",
            "Validators/2",
            "--withdrawal-address",
            "0x30C99930617B7b793beaB603ecEB08691005f2E5",
            "--amount",
            "32 ether",
            "--format",
            "launchpad",
            "--passphrase",
            "a",
            "--passphrase",
            "b",
        ]);
        match cli.command {
            CliCmd::Validator {
                command:
                    CmdValidator::DepositData {
                        validator_accounts,
                        format,
                        passphrases,
                        compounding,
                        ..
                    },
            } => {
                assert_eq!(validator_accounts, vec!["Validators/1", "Validators/2"]);
                assert_eq!(format, OutputFormat::Launchpad);
                assert_eq!(passphrases, vec!["a", "b"]);
                assert!(!compounding);
            }
            _ => panic!("wrong command parsed"),
        }
    }
}
