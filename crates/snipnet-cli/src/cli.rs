//! Command-line interface definitions and parsing

use clap::Parser;

/// Decentralized UDP gossip chat node.
#[derive(Debug, Parser)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Team name announced to the bootstrap registry
    pub team_name: String,

    /// Local UDP/TCP port
    pub port: u16,

    /// Enable verbose logging
    #[arg(short, long)]
    pub verbose: bool,

    /// Configuration file path (TOML)
    #[arg(short, long)]
    pub config: Option<String>,

    /// Override the bootstrap registry endpoint (host:port)
    #[arg(long)]
    pub registry: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_team_name_and_port() {
        let cli = Cli::try_parse_from(["snipnet", "the rustlings", "12000"]).unwrap();
        assert_eq!(cli.team_name, "the rustlings");
        assert_eq!(cli.port, 12000);
        assert!(!cli.verbose);
        assert!(cli.config.is_none());
    }

    #[test]
    fn rejects_wrong_arity() {
        assert!(Cli::try_parse_from(["snipnet"]).is_err());
        assert!(Cli::try_parse_from(["snipnet", "team"]).is_err());
        assert!(Cli::try_parse_from(["snipnet", "team", "12000", "extra"]).is_err());
    }

    #[test]
    fn rejects_non_numeric_port() {
        assert!(Cli::try_parse_from(["snipnet", "team", "notaport"]).is_err());
    }

    #[test]
    fn accepts_optional_flags() {
        let cli = Cli::try_parse_from([
            "snipnet",
            "team",
            "12000",
            "--verbose",
            "--registry",
            "127.0.0.1:9000",
        ])
        .unwrap();
        assert!(cli.verbose);
        assert_eq!(cli.registry.as_deref(), Some("127.0.0.1:9000"));
    }
}
