//! CLI argument parsing

use arpspoof_session::{SpoofConfig, SpoofMode};
use clap::{Parser, Subcommand, ValueEnum};
use ipnetwork::Ipv4Network;
use std::time::Duration;

#[derive(Parser, Debug)]
#[command(name = "arpspoof")]
#[command(version, about = "ARP cache poisoning between two groups of hosts", long_about = None)]
// -V is taken by the victim list
#[command(subcommand_negates_reqs = true, disable_version_flag = true)]
pub struct Cli {
    /// Network interface to attack from
    #[arg(short = 'i', long, required = true)]
    pub interface: Option<String>,

    /// Victim hosts or networks (10.0.0.5, 10.0.0.0/24)
    ///
    /// Addresses are resolved one at a time before poisoning starts. Each
    /// silent address costs resolve-retries x resolve-timeout-secs (6 s by
    /// default), so a sparse /24 can take close to half an hour.
    #[arg(short = 'V', long, value_name = "NETWORK", num_args = 1.., required = true)]
    pub victims: Vec<Ipv4Network>,

    /// Target hosts or networks, usually the gateway
    ///
    /// Resolved the same way as the victims, with the same cost per silent address.
    #[arg(short = 'T', long, value_name = "NETWORK", num_args = 1.., required = true)]
    pub targets: Vec<Ipv4Network>,

    /// ARP operation used to poison and to restore
    #[arg(short, long, value_enum, default_value_t = ModeArg::Reply)]
    pub mode: ModeArg,

    /// Pause between poisoning rounds in milliseconds
    #[arg(long, value_name = "MS", default_value_t = 1000)]
    pub interval_ms: u64,

    /// ARP requests sent per host while resolving
    #[arg(long, value_name = "N", default_value_t = 2)]
    pub resolve_retries: u32,

    /// Seconds to wait for each resolution reply
    #[arg(long, value_name = "SECONDS", default_value_t = 3)]
    pub resolve_timeout_secs: u64,

    /// Seconds to wait for the worker to stop before giving up
    #[arg(long, value_name = "SECONDS", default_value_t = 5)]
    pub stop_timeout_secs: u64,

    /// Verbose output (-v, -vv for increasing verbosity)
    #[arg(short = 'v', long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug, PartialEq, Eq)]
pub enum Commands {
    /// List available network interfaces
    Interfaces,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModeArg {
    /// Forge ARP requests
    Request,
    /// Forge unsolicited ARP replies
    Reply,
}

impl From<ModeArg> for SpoofMode {
    fn from(mode: ModeArg) -> Self {
        match mode {
            ModeArg::Request => SpoofMode::Request,
            ModeArg::Reply => SpoofMode::Reply,
        }
    }
}

impl Cli {
    /// Parse command-line arguments
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Session settings described by the flags
    pub fn config(&self) -> SpoofConfig {
        SpoofConfig::default()
            .with_mode(self.mode.into())
            .with_interval(Duration::from_millis(self.interval_ms))
            .with_resolve_retries(self.resolve_retries)
            .with_resolve_timeout(Duration::from_secs(self.resolve_timeout_secs))
            .with_stop_timeout(Duration::from_secs(self.stop_timeout_secs))
    }

    /// Default log filter for the requested verbosity
    pub fn log_filter(&self) -> &'static str {
        match self.verbose {
            0 => "info",
            1 => "debug",
            _ => "trace",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_attack() {
        let cli = Cli::try_parse_from([
            "arpspoof", "-i", "eth0", "-V", "192.168.1.10", "192.168.1.11", "-T", "192.168.1.0/30",
        ])
        .unwrap();

        assert_eq!(cli.interface.as_deref(), Some("eth0"));
        assert_eq!(cli.victims.len(), 2);
        assert_eq!(cli.victims[0].prefix(), 32);
        assert_eq!(cli.targets[0].prefix(), 30);
        assert_eq!(cli.mode, ModeArg::Reply);
        assert!(cli.command.is_none());
    }

    #[test]
    fn test_config_from_flags() {
        let cli = Cli::try_parse_from([
            "arpspoof",
            "-i",
            "eth0",
            "-V",
            "10.0.0.2",
            "-T",
            "10.0.0.1",
            "--mode",
            "request",
            "--interval-ms",
            "250",
            "--resolve-retries",
            "4",
            "--stop-timeout-secs",
            "9",
            "-vv",
        ])
        .unwrap();

        let config = cli.config();
        assert_eq!(config.mode, SpoofMode::Request);
        assert_eq!(config.interval, Duration::from_millis(250));
        assert_eq!(config.resolve_retries, 4);
        assert_eq!(config.resolve_timeout, Duration::from_secs(3));
        assert_eq!(config.stop_timeout, Duration::from_secs(9));
        assert_eq!(cli.log_filter(), "trace");
    }

    #[test]
    fn test_attack_requires_both_networks() {
        assert!(Cli::try_parse_from(["arpspoof", "-i", "eth0", "-V", "10.0.0.2"]).is_err());
        assert!(Cli::try_parse_from(["arpspoof", "-i", "eth0", "-T", "10.0.0.1"]).is_err());
    }

    #[test]
    fn test_rejects_bad_network() {
        assert!(Cli::try_parse_from(["arpspoof", "-i", "eth0", "-V", "10.0.0.300", "-T", "10.0.0.1"])
            .is_err());
    }

    #[test]
    fn test_interfaces_subcommand_needs_no_attack_flags() {
        let cli = Cli::try_parse_from(["arpspoof", "interfaces"]).unwrap();

        assert_eq!(cli.command, Some(Commands::Interfaces));
        assert_eq!(cli.log_filter(), "info");
    }
}
