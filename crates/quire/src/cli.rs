//! Command-line arguments.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Replay rich-text editing scripts against a stored document
#[derive(Parser, Debug)]
#[command(name = "quire", version, about)]
pub struct CliArgs {
    #[command(subcommand)]
    pub command: Command,

    /// Directory holding the stored documents
    #[arg(long, global = true, value_name = "DIR")]
    pub store_dir: Option<PathBuf>,

    /// Store key of the document to edit
    #[arg(long, global = true, value_name = "KEY")]
    pub key: Option<String>,

    /// Log filter, e.g. `debug` or `quire_core=debug`
    #[arg(long, global = true, value_name = "FILTER")]
    pub log_level: Option<String>,

    /// Config file to read instead of the default location
    #[arg(long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,
}

#[derive(Subcommand, Debug, PartialEq, Eq)]
pub enum Command {
    /// Replay a script file (`-` reads stdin) and save the result
    Run {
        #[arg(value_name = "SCRIPT")]
        script: PathBuf,
    },
    /// Print the stored document as HTML
    Show,
    /// Print the stored document as JSON
    Dump {
        #[arg(long)]
        pretty: bool,
    },
    /// Replace the stored document with an empty paragraph
    Reset,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn global_flags_parse_after_the_subcommand() {
        let args = CliArgs::try_parse_from([
            "quire",
            "run",
            "edits.txt",
            "--key",
            "draft",
            "--log-level",
            "debug",
        ])
        .unwrap();

        assert_eq!(
            args.command,
            Command::Run {
                script: PathBuf::from("edits.txt")
            }
        );
        assert_eq!(args.key.as_deref(), Some("draft"));
        assert_eq!(args.log_level.as_deref(), Some("debug"));
        assert_eq!(args.store_dir, None);
    }

    #[test]
    fn dump_takes_pretty_flag() {
        let args = CliArgs::try_parse_from(["quire", "dump", "--pretty"]).unwrap();
        assert_eq!(args.command, Command::Dump { pretty: true });
    }

    #[test]
    fn subcommand_is_required() {
        assert!(CliArgs::try_parse_from(["quire"]).is_err());
    }
}
