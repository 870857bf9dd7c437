use std::io::{self, Read, Write};
use std::path::Path;

use anyhow::Context;
use clap::Parser;
use quire::cli::{CliArgs, Command};
use quire::config::Config;
use quire::logging;
use quire::script::{parse_script, run_script};
use quire_view::{FileStore, Session};

fn read_script(path: &Path) -> anyhow::Result<String> {
    if path == Path::new("-") {
        let mut src = String::new();
        io::stdin()
            .read_to_string(&mut src)
            .context("failed to read script from stdin")?;
        return Ok(src);
    }
    std::fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))
}

fn main() -> anyhow::Result<()> {
    let args = CliArgs::parse();
    let mut config = Config::load(args.config.as_deref())?;
    config.apply_overrides(&args);
    logging::init(config.log_filter());

    let store_dir = config.store_dir()?;
    tracing::debug!(store_dir = %store_dir.display(), key = %config.content_key, "opening store");
    let mut session = Session::open(FileStore::new(store_dir), config.content_key.clone());

    let stdout = io::stdout();
    let mut out = stdout.lock();
    match &args.command {
        Command::Run { script } => {
            let src = read_script(script)?;
            let steps = parse_script(&src)?;
            run_script(&mut session, &steps, &mut out)?;
        }
        Command::Show => writeln!(out, "{}", session.render_html())?,
        Command::Dump { pretty } => {
            let doc = session.document();
            let json = if *pretty {
                doc.to_json_pretty()?
            } else {
                doc.to_json_string()?
            };
            writeln!(out, "{json}")?;
        }
        Command::Reset => session.reset(),
    }
    Ok(())
}
