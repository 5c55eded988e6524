use std::ffi::OsString;
use std::io::IsTerminal;
use std::path::PathBuf;

use anyhow::anyhow;
use clap::{ArgAction, Args, Parser, Subcommand};
use tracing::debug;
use tracing_subscriber::EnvFilter;

use crate::config::Config;
use crate::week::WeekMode;

#[derive(Debug, Clone)]
pub struct PreprocessedArgs {
    pub cleaned_args: Vec<OsString>,
    pub rc_overrides: Vec<(String, String)>,
}

#[derive(Debug, Clone)]
pub struct KeyVal {
    pub key: String,
    pub value: String,
}

impl std::str::FromStr for KeyVal {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (k, v) = s
            .split_once('=')
            .ok_or_else(|| anyhow!("expected KEY=VALUE, got: {s}"))?;
        Ok(Self {
            key: k.trim().to_string(),
            value: v.trim().to_string(),
        })
    }
}

#[derive(Parser, Debug, Clone)]
#[command(
    name = "weeklink",
    version,
    about = "Turns a Google Calendar link into one that opens a chosen week in a chosen timezone",
    disable_help_subcommand = true,
    infer_subcommands = true
)]
pub struct GlobalCli {
    #[arg(short = 'v', long = "verbose", action = ArgAction::Count, global = true)]
    pub verbose: u8,

    #[arg(short = 'q', long = "quiet", action = ArgAction::Count, global = true)]
    pub quiet: u8,

    #[arg(
        long = "rc",
        value_parser = clap::builder::ValueParser::new(|s: &str| s.parse::<KeyVal>()),
        action = ArgAction::Append
    )]
    pub rc_overrides: Vec<KeyVal>,

    #[arg(long = "weeklinkrc")]
    pub weeklinkrc: Option<PathBuf>,

    #[arg(long = "data")]
    pub data: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Print the week link for a calendar URL
    Link(LinkArgs),
    /// Print the Monday and Sunday of the selected week
    Range(WeekArgs),
    /// List catalog timezones, optionally filtered
    Timezones {
        query: Option<String>,
    },
    /// List recently used timezones
    Recent,
    /// Show or clear saved preferences
    Prefs {
        #[arg(long)]
        clear: bool,
    },
}

#[derive(Args, Debug, Clone, Default, PartialEq, Eq)]
pub struct WeekArgs {
    #[arg(long, value_enum)]
    pub week: Option<WeekMode>,

    /// Any day of the wanted week, YYYY-MM-DD
    #[arg(long)]
    pub date: Option<String>,
}

#[derive(Args, Debug, Clone, Default, PartialEq, Eq)]
pub struct LinkArgs {
    /// Calendar link; the saved one is used when omitted
    pub url: Option<String>,

    #[arg(long = "tz")]
    pub timezone: Option<String>,

    #[command(flatten)]
    pub week: WeekArgs,

    #[arg(long)]
    pub copy: bool,

    #[arg(long)]
    pub open: bool,
}

impl Command {
    /// Command run when none is given, per `default.command`.
    pub fn from_default(cfg: &Config) -> anyhow::Result<Self> {
        let name = cfg
            .get("default.command")
            .unwrap_or_else(|| "link".to_string());
        debug!(command = %name, "no explicit command, using default");
        match name.trim() {
            "link" => Ok(Self::Link(LinkArgs::default())),
            "range" => Ok(Self::Range(WeekArgs::default())),
            "timezones" => Ok(Self::Timezones { query: None }),
            "recent" => Ok(Self::Recent),
            "prefs" => Ok(Self::Prefs { clear: false }),
            other => Err(anyhow!("unknown default.command: {other}")),
        }
    }
}

pub fn init_tracing(verbose: u8, quiet: u8) -> anyhow::Result<()> {
    let default_level = if quiet >= 2 {
        "error"
    } else if quiet == 1 {
        "warn"
    } else if verbose >= 3 {
        "trace"
    } else if verbose == 2 {
        "debug"
    } else if verbose == 1 {
        "info"
    } else {
        "warn"
    };

    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(default_level))
        .map_err(|e| anyhow!("invalid RUST_LOG / log filter: {e}"))?;

    let init_result = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(true)
        .with_level(true)
        .with_writer(std::io::stderr)
        .with_ansi(std::io::stderr().is_terminal())
        .try_init();

    if let Err(err) = init_result {
        debug!(error = %err, "tracing subscriber already set, continuing");
    }

    Ok(())
}

/// Pulls `rc.KEY=VALUE` and `rc.KEY:VALUE` tokens out before clap sees them.
#[tracing::instrument(skip_all)]
pub fn preprocess_args(raw: &[OsString]) -> anyhow::Result<PreprocessedArgs> {
    let mut cleaned = Vec::with_capacity(raw.len());
    let mut overrides: Vec<(String, String)> = Vec::new();

    let mut iter = raw.iter().cloned();
    if let Some(bin) = iter.next() {
        cleaned.push(bin);
    }

    for arg in iter {
        let s = arg.to_string_lossy();
        if let Some(rest) = s.strip_prefix("rc.") {
            let parsed = rest
                .split_once('=')
                .or_else(|| rest.split_once(':'))
                .map(|(k, v)| (format!("rc.{k}"), v.to_string()));

            if let Some((k, v)) = parsed {
                debug!(key = %k, value = %v, "captured positional rc override");
                overrides.push((k, v));
                continue;
            }
        }

        cleaned.push(arg);
    }

    Ok(PreprocessedArgs {
        cleaned_args: cleaned,
        rc_overrides: overrides,
    })
}

#[cfg(test)]
mod tests {
    use std::ffi::OsString;

    use clap::Parser;

    use super::{Command, GlobalCli, LinkArgs, WeekArgs, preprocess_args};
    use crate::config::Config;
    use crate::week::WeekMode;

    fn args(list: &[&str]) -> Vec<OsString> {
        list.iter().map(OsString::from).collect()
    }

    #[test]
    fn positional_rc_tokens_become_overrides() {
        let pre = preprocess_args(&args(&[
            "weeklink",
            "rc.default.timezone=Asia/Tokyo",
            "link",
            "rc.color:off",
        ]))
        .expect("preprocess");

        assert_eq!(pre.cleaned_args, args(&["weeklink", "link"]));
        assert_eq!(
            pre.rc_overrides,
            vec![
                ("rc.default.timezone".to_string(), "Asia/Tokyo".to_string()),
                ("rc.color".to_string(), "off".to_string()),
            ]
        );
    }

    #[test]
    fn parses_link_subcommand() {
        let cli = GlobalCli::parse_from([
            "weeklink",
            "-vv",
            "link",
            "https://calendar.google.com/calendar/render?action=TEMPLATE",
            "--tz",
            "Europe/Paris",
            "--week",
            "next",
            "--copy",
        ]);

        assert_eq!(cli.verbose, 2);
        assert_eq!(
            cli.command,
            Some(Command::Link(LinkArgs {
                url: Some(
                    "https://calendar.google.com/calendar/render?action=TEMPLATE".to_string()
                ),
                timezone: Some("Europe/Paris".to_string()),
                week: WeekArgs {
                    week: Some(WeekMode::Next),
                    date: None,
                },
                copy: true,
                open: false,
            }))
        );
    }

    #[test]
    fn abbreviated_subcommands_are_inferred() {
        let cli = GlobalCli::parse_from(["weeklink", "tim", "tokyo"]);
        assert_eq!(
            cli.command,
            Some(Command::Timezones {
                query: Some("tokyo".to_string())
            })
        );
    }

    #[test]
    fn default_command_comes_from_config() {
        let mut cfg = Config::default();
        assert_eq!(
            Command::from_default(&cfg).expect("default"),
            Command::Link(LinkArgs::default())
        );

        cfg.apply_overrides(vec![("default.command".to_string(), "recent".to_string())]);
        assert_eq!(Command::from_default(&cfg).expect("recent"), Command::Recent);

        cfg.apply_overrides(vec![("default.command".to_string(), "bogus".to_string())]);
        assert!(Command::from_default(&cfg).is_err());
    }
}
