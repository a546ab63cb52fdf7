use super::app_config::LogLevel;
use clap::Parser;
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(
    name = "gatebird",
    version,
    about = "A small Discord bot running on the gatebird gateway client",
    long_about = None
)]
pub struct CliArgs {
    /// Bot token.
    #[arg(long, env = "TOKEN", hide_env_values = true)]
    pub token: Option<String>,

    /// Configuration file path.
    #[arg(short, long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Log file path.
    #[arg(long, value_name = "PATH")]
    pub log_path: Option<PathBuf>,

    /// Log verbosity level.
    #[arg(long, value_enum)]
    pub log_level: Option<LogLevel>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_flags() {
        let args = CliArgs::try_parse_from([
            "gatebird",
            "--token",
            "abc.def.ghi",
            "-c",
            "bot.toml",
            "--log-level",
            "debug",
        ])
        .unwrap();

        assert_eq!(args.token.as_deref(), Some("abc.def.ghi"));
        assert_eq!(args.config, Some(PathBuf::from("bot.toml")));
        assert_eq!(args.log_level, Some(LogLevel::Debug));
        assert_eq!(args.log_path, None);
    }

    #[test]
    fn test_rejects_unknown_log_level() {
        assert!(CliArgs::try_parse_from(["gatebird", "--log-level", "loud"]).is_err());
    }
}
