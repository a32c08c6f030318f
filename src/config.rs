use anyhow::{Context as _, Result, anyhow};
use clap::Parser;
use journalscope::journal::{FilterKind, Journalctl, QuerySpecification, TimeBound};
use std::path::PathBuf;
use std::time::Duration;

/// Browse and search systemd journal entries
#[derive(Debug, Parser)]
#[command(name = "journalscope", version, about)]
pub struct Cli {
    /// journalctl binary to run
    #[arg(long, env = "JOURNALSCOPE_JOURNALCTL", default_value = "journalctl")]
    pub journalctl: PathBuf,

    /// Show the calling user's journal
    #[arg(long)]
    pub user: bool,

    /// Keep only the newest N entries of each query
    #[arg(short = 'n', long, value_name = "N")]
    pub lines: Option<usize>,

    /// Seconds before a running journalctl is killed
    #[arg(long, value_name = "SECS", default_value_t = 10)]
    pub timeout: u64,

    /// Start of the interval (YYYY-MM-DD [HH:MM[:SS]], today, -1h, ...)
    #[arg(short = 'S', long)]
    pub since: Option<String>,

    /// End of the interval
    #[arg(short = 'U', long)]
    pub until: Option<String>,

    /// Boot to show (0 = current, -1 = previous, or a boot id)
    #[arg(short = 'b', long, value_name = "ID")]
    pub boot: Option<String>,

    /// Do not restrict the query to the current boot
    #[arg(long, conflicts_with = "boot")]
    pub all_boots: bool,

    /// Only entries of this systemd unit
    #[arg(short = 'u', long)]
    pub unit: Option<String>,

    /// Only entries with this syslog identifier
    #[arg(short = 't', long)]
    pub identifier: Option<String>,

    /// Priority level or range (err, 3, err..warning)
    #[arg(short = 'p', long)]
    pub priority: Option<String>,

    /// Extra filter as NAME=VALUE (boot, unit, identifier, priority)
    #[arg(long = "filter", value_name = "NAME=VALUE")]
    pub filters: Vec<String>,

    /// Initial search text (case-insensitive regex)
    #[arg(short = 's', long, default_value = "")]
    pub search: String,

    /// Print matching entries and exit instead of opening the browser
    #[arg(long)]
    pub print: bool,

    /// Enable debug logging (interactive mode needs --log-file)
    #[arg(long)]
    pub debug: bool,

    /// Write logs to this file
    #[arg(long, value_name = "PATH")]
    pub log_file: Option<PathBuf>,
}

/// Resolved runtime configuration.
#[derive(Debug, Clone)]
pub struct Config {
    pub journalctl: PathBuf,
    pub user: bool,
    pub lines: Option<usize>,
    pub timeout: Duration,
    pub spec: QuerySpecification,
    pub search: String,
    pub print: bool,
    pub debug: bool,
    pub log_file: Option<PathBuf>,
}

impl Config {
    pub fn from_cli(cli: Cli) -> Result<Self> {
        if cli.timeout == 0 {
            return Err(anyhow!("--timeout must be at least 1 second"));
        }

        let since = cli
            .since
            .as_deref()
            .map(str::parse::<TimeBound>)
            .transpose()
            .context("invalid --since")?;
        let until = cli
            .until
            .as_deref()
            .map(str::parse::<TimeBound>)
            .transpose()
            .context("invalid --until")?;

        let mut spec = if cli.all_boots {
            QuerySpecification::new()
        } else {
            QuerySpecification::current_boot()
        }
        .with_since(since)
        .with_until(until);

        let named = [
            (FilterKind::Boot, cli.boot),
            (FilterKind::Unit, cli.unit),
            (FilterKind::Identifier, cli.identifier),
            (FilterKind::Priority, cli.priority),
        ];
        for (kind, value) in named {
            if let Some(value) = value {
                spec = spec.with_filter(kind, &value)?;
            }
        }

        for raw in &cli.filters {
            let (name, value) = raw
                .split_once('=')
                .ok_or_else(|| anyhow!("--filter expects NAME=VALUE, got '{raw}'"))?;
            let kind: FilterKind = name.parse().map_err(|e: String| anyhow!(e))?;
            spec = spec.with_filter(kind, value)?;
        }

        Ok(Self {
            journalctl: cli.journalctl,
            user: cli.user,
            lines: cli.lines,
            timeout: Duration::from_secs(cli.timeout),
            spec,
            search: cli.search,
            print: cli.print,
            debug: cli.debug,
            log_file: cli.log_file,
        })
    }

    pub fn provider(&self) -> Journalctl {
        Journalctl::new(&self.journalctl)
            .user(self.user)
            .max_lines(self.lines)
            .timeout(self.timeout)
    }
}
