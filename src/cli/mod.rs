//! CLI argument parsing module
//!
//! Handles the command-line interface using clap:
//! - `run`: the monitoring daemon
//! - `check`: one evaluation pass, printed and exited
//! - `status` / `stop`: talk to a running daemon over its socket
//! - `unit-file`: systemd unit generation
//! - global `--log-level`

use crate::constants::{APP_NAME, DEFAULT_CONFIG_PATH};
use anyhow::{anyhow, Result};
use clap::{Arg, ArgAction, ArgMatches, Command};
use std::ffi::OsString;
use std::path::PathBuf;

/// Version string including the commit it was built from
pub const VERSION: &str = concat!(env!("NODEWATCH_VERSION"), " (", env!("GIT_HASH"), ")");

/// Parsed command line
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CliArgs {
    pub log_level: String,
    pub command: CliCommand,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CliCommand {
    Run {
        config: PathBuf,
        socket: Option<PathBuf>,
    },
    Check {
        config: PathBuf,
        json: bool,
        notify: bool,
    },
    Status {
        config: Option<PathBuf>,
        socket: Option<PathBuf>,
        json: bool,
    },
    Stop {
        config: Option<PathBuf>,
        socket: Option<PathBuf>,
    },
    UnitFile {
        binary: Option<PathBuf>,
        config: PathBuf,
        output: Option<PathBuf>,
    },
}

fn config_arg(required_default: bool) -> Arg {
    let arg = Arg::new("config")
        .short('c')
        .long("config")
        .value_name("FILE")
        .value_parser(clap::value_parser!(PathBuf))
        .help("Configuration file (TOML)");
    if required_default {
        arg.default_value(DEFAULT_CONFIG_PATH)
    } else {
        arg
    }
}

fn socket_arg() -> Arg {
    Arg::new("socket")
        .short('s')
        .long("socket")
        .value_name("PATH")
        .value_parser(clap::value_parser!(PathBuf))
        .help("Daemon IPC socket (defaults to the configured socket_path)")
}

fn json_arg() -> Arg {
    Arg::new("json")
        .short('j')
        .long("json")
        .help("Output in JSON format")
        .action(ArgAction::SetTrue)
}

/// Build the clap command tree
pub fn build_command() -> Command {
    Command::new(APP_NAME)
        .version(VERSION)
        .about("Host health monitor and alerter")
        .long_about(
            "Periodically checks systemd units, containers, memory, CPU and filesystem usage. \
             Failed units are restarted and newly detected problems are mailed as one digest per tick.",
        )
        .subcommand_required(true)
        .arg_required_else_help(true)
        .arg(
            Arg::new("log-level")
                .long("log-level")
                .value_name("LEVEL")
                .global(true)
                .default_value("info")
                .value_parser(["error", "warn", "info", "debug", "trace", "off"])
                .help("Log level (RUST_LOG overrides)"),
        )
        .subcommand(
            Command::new("run")
                .about("Run the monitoring loop in the foreground")
                .arg(config_arg(true))
                .arg(socket_arg()),
        )
        .subcommand(
            Command::new("check")
                .about("Evaluate every target once and print the result; nothing is restarted")
                .arg(config_arg(true))
                .arg(json_arg())
                .arg(
                    Arg::new("notify")
                        .long("notify")
                        .help("Mail the digest through the configured transport")
                        .action(ArgAction::SetTrue),
                ),
        )
        .subcommand(
            Command::new("status")
                .about("Show the state held by a running daemon")
                .arg(config_arg(false))
                .arg(socket_arg())
                .arg(json_arg()),
        )
        .subcommand(
            Command::new("stop")
                .about("Ask a running daemon to stop after its current tick")
                .arg(config_arg(false))
                .arg(socket_arg()),
        )
        .subcommand(
            Command::new("unit-file")
                .about("Print a systemd service unit for the daemon")
                .arg(
                    Arg::new("binary")
                        .long("binary")
                        .value_name("PATH")
                        .value_parser(clap::value_parser!(PathBuf))
                        .help("Daemon executable (defaults to this binary)"),
                )
                .arg(config_arg(true))
                .arg(
                    Arg::new("output")
                        .short('o')
                        .long("output")
                        .value_name("FILE")
                        .value_parser(clap::value_parser!(PathBuf))
                        .help("Write the unit to FILE instead of stdout"),
                ),
        )
}

fn path_arg(matches: &ArgMatches, id: &str) -> Option<PathBuf> {
    matches.get_one::<PathBuf>(id).cloned()
}

fn required_path(matches: &ArgMatches, id: &str) -> Result<PathBuf> {
    path_arg(matches, id).ok_or_else(|| anyhow!("Missing --{}", id))
}

/// Parse command line arguments of this process
pub fn parse_args() -> Result<CliArgs> {
    let matches = build_command().get_matches();
    from_matches(&matches)
}

/// Parse an explicit argument list; errors instead of exiting
pub fn parse_from<I, T>(args: I) -> Result<CliArgs>
where
    I: IntoIterator<Item = T>,
    T: Into<OsString> + Clone,
{
    let matches = build_command().try_get_matches_from(args)?;
    from_matches(&matches)
}

fn from_matches(matches: &ArgMatches) -> Result<CliArgs> {
    let log_level = matches
        .get_one::<String>("log-level")
        .cloned()
        .unwrap_or_else(|| "info".to_string());

    let command = match matches.subcommand() {
        Some(("run", sub)) => CliCommand::Run {
            config: required_path(sub, "config")?,
            socket: path_arg(sub, "socket"),
        },
        Some(("check", sub)) => CliCommand::Check {
            config: required_path(sub, "config")?,
            json: sub.get_flag("json"),
            notify: sub.get_flag("notify"),
        },
        Some(("status", sub)) => CliCommand::Status {
            config: path_arg(sub, "config"),
            socket: path_arg(sub, "socket"),
            json: sub.get_flag("json"),
        },
        Some(("stop", sub)) => CliCommand::Stop {
            config: path_arg(sub, "config"),
            socket: path_arg(sub, "socket"),
        },
        Some(("unit-file", sub)) => CliCommand::UnitFile {
            binary: path_arg(sub, "binary"),
            config: required_path(sub, "config")?,
            output: path_arg(sub, "output"),
        },
        Some((other, _)) => return Err(anyhow!("Unknown command: {}", other)),
        None => return Err(anyhow!("No command given")),
    };

    Ok(CliArgs { log_level, command })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_command_definition_is_valid() {
        build_command().debug_assert();
    }

    #[test]
    fn test_run_defaults() {
        let args = parse_from(["nodewatch", "run"]).unwrap();
        assert_eq!(args.log_level, "info");
        assert_eq!(
            args.command,
            CliCommand::Run {
                config: PathBuf::from(DEFAULT_CONFIG_PATH),
                socket: None,
            }
        );
    }

    #[test]
    fn test_global_log_level_after_subcommand() {
        let args = parse_from(["nodewatch", "check", "--json", "--log-level", "debug"]).unwrap();
        assert_eq!(args.log_level, "debug");
        assert!(matches!(args.command, CliCommand::Check { json: true, notify: false, .. }));
    }

    #[test]
    fn test_status_with_socket() {
        let args = parse_from(["nodewatch", "status", "--socket", "/tmp/nw.sock"]).unwrap();
        assert_eq!(
            args.command,
            CliCommand::Status {
                config: None,
                socket: Some(PathBuf::from("/tmp/nw.sock")),
                json: false,
            }
        );
    }

    #[test]
    fn test_invalid_log_level_rejected() {
        assert!(parse_from(["nodewatch", "--log-level", "loud", "run"]).is_err());
    }

    #[test]
    fn test_subcommand_required() {
        assert!(parse_from(["nodewatch"]).is_err());
    }
}
