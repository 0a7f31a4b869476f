use crate::core::FeePriority;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::str::FromStr;

/// Fee priority levels for transactions
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeePriorityArg {
    Normal,
    High,
    Critical,
}

impl FromStr for FeePriorityArg {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "normal" => Ok(FeePriorityArg::Normal),
            "high" => Ok(FeePriorityArg::High),
            "critical" => Ok(FeePriorityArg::Critical),
            _ => Err(format!(
                "Invalid priority: {s}. Valid options: normal, high, critical"
            )),
        }
    }
}

impl std::fmt::Display for FeePriorityArg {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FeePriorityArg::Normal => write!(f, "normal"),
            FeePriorityArg::High => write!(f, "high"),
            FeePriorityArg::Critical => write!(f, "critical"),
        }
    }
}

impl From<FeePriorityArg> for FeePriority {
    fn from(arg: FeePriorityArg) -> Self {
        match arg {
            FeePriorityArg::Normal => FeePriority::Normal,
            FeePriorityArg::High => FeePriority::High,
            FeePriorityArg::Critical => FeePriority::Critical,
        }
    }
}

#[derive(Debug, Parser)]
#[command(name = "agt-chain", about = "In-memory AGT ledger with commitment-weighted mining")]
pub struct Opt {
    #[arg(long = "config", global = true, help = "TOML settings file")]
    pub config: Option<PathBuf>,
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    #[command(
        name = "demo",
        about = "Create two wallets, transfer between them, mine and validate"
    )]
    Demo {
        #[arg(long, default_value_t = 3, help = "Number of blocks to mine")]
        blocks: usize,
        #[arg(long, default_value_t = 100, help = "AGT moved per block (in base units)")]
        amount: u64,
        #[arg(long, default_value_t = 0, help = "Miner commitment (0 for none)")]
        commitment: u64,
        #[arg(long = "timeout-secs", help = "Cancel any single block search after this many seconds")]
        timeout_secs: Option<u64>,
    },
    #[command(
        name = "estimatefee",
        about = "Estimate transaction fee for a size and priority"
    )]
    EstimateFee {
        #[arg(long, help = "Serialized transaction size in bytes")]
        size: usize,
        #[arg(
            long,
            default_value = "normal",
            help = "Transaction priority (normal, high, critical)"
        )]
        priority: FeePriorityArg,
    },
    #[command(name = "tokens", about = "List registered assets")]
    Tokens,
    #[command(name = "showconfig", about = "Print the effective settings as TOML")]
    ShowConfig,
    #[command(name = "printchain", about = "Mine reward-only blocks and print the chain")]
    Printchain {
        #[arg(long, default_value_t = 1, help = "Number of blocks to mine first")]
        blocks: usize,
        #[arg(long, help = "Print as JSON")]
        json: bool,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_demo_defaults() {
        let opt = Opt::try_parse_from(["agt-chain", "demo"]).unwrap();
        assert!(opt.config.is_none());
        match opt.command {
            Command::Demo {
                blocks,
                amount,
                commitment,
                timeout_secs,
            } => {
                assert_eq!((blocks, amount, commitment), (3, 100, 0));
                assert_eq!(timeout_secs, None);
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn test_parse_estimatefee() {
        let opt = Opt::try_parse_from([
            "agt-chain",
            "estimatefee",
            "--size",
            "2048",
            "--priority",
            "CRITICAL",
            "--config",
            "agt.toml",
        ])
        .unwrap();
        assert_eq!(opt.config, Some(PathBuf::from("agt.toml")));
        match opt.command {
            Command::EstimateFee { size, priority } => {
                assert_eq!(size, 2048);
                assert_eq!(FeePriority::from(priority), FeePriority::Critical);
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn test_rejects_unknown_priority() {
        let parsed = Opt::try_parse_from(["agt-chain", "estimatefee", "--size", "1", "--priority", "low"]);
        assert!(parsed.is_err());
    }
}
