use clap::{Args, Parser, Subcommand, ValueEnum};

use crate::view::{GroupMode, SortKey};

#[derive(Parser, Debug)]
#[command(
    name = "flowdeck",
    version,
    about = "Live terminal console for a proxy core's connection telemetry"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Launch the interactive console (default when no subcommand given)
    Monitor(MonitorArgs),
    /// Fetch one snapshot and print it to stdout
    Snapshot(SnapshotArgs),
}

/// Arguments shared by both modes: how to reach the telemetry endpoint.
#[derive(Args, Debug, Clone)]
pub struct ConnectArgs {
    /// Base URL of the proxy core's telemetry API
    #[arg(long, default_value = "http://127.0.0.1:9090")]
    pub endpoint: String,

    /// Access key appended to API requests
    #[arg(long)]
    pub access_key: Option<String>,

    /// Push interval requested from the core, in milliseconds [default: 1000]
    #[arg(long, default_value_t = 1000, value_parser = validate_interval)]
    pub interval: u64,
}

impl Default for ConnectArgs {
    fn default() -> Self {
        Self {
            endpoint: "http://127.0.0.1:9090".to_string(),
            access_key: None,
            interval: 1000,
        }
    }
}

/// Arguments specific to monitor (console) mode.
#[derive(Args, Debug, Clone)]
pub struct MonitorArgs {
    #[command(flatten)]
    pub connect: ConnectArgs,

    /// Initial sort column
    #[arg(long, default_value = "host")]
    pub sort: SortKey,

    /// Initial grouping axis
    #[arg(long, default_value = "current")]
    pub group: GroupMode,

    /// Dashboard rolling window in seconds [default: 60]
    #[arg(long, default_value_t = 60, value_parser = validate_window)]
    pub window: u64,

    /// Disable colored output
    #[arg(long)]
    pub no_color: bool,

    /// Initial search query (substring, case-insensitive)
    #[arg(long)]
    pub search: Option<String>,
}

/// Arguments specific to snapshot mode.
#[derive(Args, Debug, Clone)]
pub struct SnapshotArgs {
    #[command(flatten)]
    pub connect: ConnectArgs,

    /// Output format [default: tsv]
    #[arg(long, default_value = "tsv")]
    pub format: OutputFormat,

    /// Grouping axis applied before printing
    #[arg(long, default_value = "current")]
    pub group: GroupMode,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Tsv,
    Json,
}

fn validate_interval(s: &str) -> Result<u64, String> {
    let val: u64 = s
        .parse()
        .map_err(|_| format!("'{s}' is not a valid integer"))?;
    if val < 100 {
        Err("interval must be at least 100 ms".to_string())
    } else if val > 10_000 {
        Err("interval must be at most 10000 ms".to_string())
    } else {
        Ok(val)
    }
}

fn validate_window(s: &str) -> Result<u64, String> {
    let val: u64 = s
        .parse()
        .map_err(|_| format!("'{s}' is not a valid integer"))?;
    if val < 10 {
        Err("window must be at least 10 seconds".to_string())
    } else if val > 3_600 {
        Err("window must be at most 3600 seconds".to_string())
    } else {
        Ok(val)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    fn parse(args: &[&str]) -> Result<Cli, clap::Error> {
        Cli::try_parse_from(args)
    }

    #[test]
    fn no_arguments_defaults_to_monitor() {
        let cli = parse(&["flowdeck"]).unwrap();
        assert!(cli.command.is_none());
    }

    #[test]
    fn monitor_explicit() {
        let cli = parse(&["flowdeck", "monitor"]).unwrap();
        assert!(matches!(cli.command, Some(Command::Monitor(_))));
    }

    #[test]
    fn monitor_defaults() {
        let cli = parse(&["flowdeck", "monitor"]).unwrap();
        let Some(Command::Monitor(args)) = cli.command else {
            panic!("expected monitor");
        };
        assert_eq!(args.connect.endpoint, "http://127.0.0.1:9090");
        assert_eq!(args.connect.interval, 1000);
        assert_eq!(args.window, 60);
        assert_eq!(args.sort, SortKey::Host);
        assert_eq!(args.group, GroupMode::Current);
    }

    #[test]
    fn snapshot_with_json_format() {
        let cli = parse(&["flowdeck", "snapshot", "--format", "json"]).unwrap();
        let Some(Command::Snapshot(args)) = cli.command else {
            panic!("expected snapshot");
        };
        assert_eq!(args.format, OutputFormat::Json);
    }

    #[test]
    fn invalid_format_rejected() {
        assert!(parse(&["flowdeck", "snapshot", "--format", "xml"]).is_err());
    }

    #[test]
    fn interval_bounds() {
        assert!(parse(&["flowdeck", "monitor", "--interval", "100"]).is_ok());
        assert!(parse(&["flowdeck", "monitor", "--interval", "10000"]).is_ok());
        assert!(parse(&["flowdeck", "monitor", "--interval", "50"]).is_err());
        assert!(parse(&["flowdeck", "monitor", "--interval", "20000"]).is_err());
    }

    #[test]
    fn window_bounds() {
        assert!(parse(&["flowdeck", "monitor", "--window", "10"]).is_ok());
        assert!(parse(&["flowdeck", "monitor", "--window", "5"]).is_err());
        assert!(parse(&["flowdeck", "monitor", "--window", "7200"]).is_err());
    }

    #[test]
    fn access_key_flag() {
        let cli = parse(&["flowdeck", "snapshot", "--access-key", "k"]).unwrap();
        let Some(Command::Snapshot(args)) = cli.command else {
            panic!("expected snapshot");
        };
        assert_eq!(args.connect.access_key.as_deref(), Some("k"));
    }

    #[test]
    fn group_axis_values() {
        let cli = parse(&["flowdeck", "monitor", "--group", "source"]).unwrap();
        let Some(Command::Monitor(args)) = cli.command else {
            panic!("expected monitor");
        };
        assert_eq!(args.group, GroupMode::Source);
        assert!(parse(&["flowdeck", "monitor", "--group", "bogus"]).is_err());
    }

    #[test]
    fn search_flag_monitor_only() {
        let cli = parse(&["flowdeck", "monitor", "--search", "example"]).unwrap();
        let Some(Command::Monitor(args)) = cli.command else {
            panic!("expected monitor");
        };
        assert_eq!(args.search.as_deref(), Some("example"));
        assert!(parse(&["flowdeck", "snapshot", "--search", "x"]).is_err());
    }

    #[test]
    fn format_is_snapshot_only() {
        assert!(parse(&["flowdeck", "monitor", "--format", "json"]).is_err());
    }
}
