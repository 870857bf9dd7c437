//! Line-oriented editing scripts.
//!
//! ```text
//! # comments and blank lines are skipped
//! type Hello world
//! select 0:0 0:5        # block path:offset, anchor then focus
//! select-block 1.0      # the whole text of a nested block
//! key mod+b
//! click heading-one
//! render
//! dump
//! ```
//!
//! Block paths are dot-separated child indices; offsets count bytes across
//! all leaves of the block.

use std::io::Write;

use anyhow::{Context, bail};
use quire_core::{Node, Path, Selection};
use quire_view::{Chord, Control, FlatStore, KeyEvent, KeyOutcome, Session};
use thiserror::Error;
use tracing::debug;

/// A position given as block path plus text offset within that block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlockOffset {
    pub block: Path,
    pub offset: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Step {
    Type(String),
    Select {
        anchor: BlockOffset,
        focus: Option<BlockOffset>,
    },
    SelectBlock(Path),
    Key(KeyEvent),
    Click(Control),
    Render,
    Dump,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ScriptError {
    #[error("line {line}: unknown command {command:?}")]
    UnknownCommand { line: usize, command: String },

    #[error("line {line}: {message}")]
    Invalid { line: usize, message: String },
}

fn invalid(line: usize, message: impl Into<String>) -> ScriptError {
    ScriptError::Invalid {
        line,
        message: message.into(),
    }
}

fn parse_block_path(line: usize, s: &str) -> Result<Path, ScriptError> {
    s.split('.')
        .map(|part| {
            part.parse::<usize>()
                .map_err(|_| invalid(line, format!("bad block path {s:?}")))
        })
        .collect()
}

fn parse_block_offset(line: usize, s: &str) -> Result<BlockOffset, ScriptError> {
    let (block, offset) = s
        .split_once(':')
        .ok_or_else(|| invalid(line, format!("expected <block>:<offset>, got {s:?}")))?;
    Ok(BlockOffset {
        block: parse_block_path(line, block)?,
        offset: offset
            .parse()
            .map_err(|_| invalid(line, format!("bad offset {offset:?}")))?,
    })
}

fn strip_comment(s: &str) -> &str {
    match s.find(" #") {
        Some(ix) => &s[..ix],
        None => s,
    }
}

pub fn parse_script(src: &str) -> Result<Vec<Step>, ScriptError> {
    let mut steps = Vec::new();
    for (ix, raw) in src.lines().enumerate() {
        let line = ix + 1;
        let trimmed = raw.trim_start();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }

        let (command, rest) = trimmed.split_once(' ').unwrap_or((trimmed, ""));
        let step = match command {
            // Typed text is taken verbatim, trailing spaces and `#` included.
            "type" => Step::Type(rest.to_string()),
            "select" => {
                let mut args = strip_comment(rest).split_whitespace();
                let anchor = args
                    .next()
                    .ok_or_else(|| invalid(line, "select needs a position"))?;
                let anchor = parse_block_offset(line, anchor)?;
                let focus = args
                    .next()
                    .map(|focus| parse_block_offset(line, focus))
                    .transpose()?;
                Step::Select { anchor, focus }
            }
            "select-block" => Step::SelectBlock(parse_block_path(line, strip_comment(rest).trim())?),
            "key" => {
                let chord: Chord = strip_comment(rest)
                    .trim()
                    .parse()
                    .map_err(|err| invalid(line, format!("{err}")))?;
                Step::Key(KeyEvent::new(chord.key, chord.modifiers))
            }
            "click" => {
                let name = strip_comment(rest).trim();
                let control = Control::from_name(name)
                    .ok_or_else(|| invalid(line, format!("unknown toolbar control {name:?}")))?;
                Step::Click(control)
            }
            "render" => Step::Render,
            "dump" => Step::Dump,
            other => {
                return Err(ScriptError::UnknownCommand {
                    line,
                    command: other.to_string(),
                });
            }
        };
        steps.push(step);
    }
    Ok(steps)
}

fn resolve<S: FlatStore>(session: &Session<S>, at: &BlockOffset) -> anyhow::Result<quire_core::Point> {
    session
        .document()
        .point_at(&at.block, at.offset)
        .with_context(|| format!("no text block at {:?}", at.block))
}

/// Runs `steps` against `session`, writing `render` / `dump` output to `out`.
pub fn run_script<S: FlatStore, W: Write>(
    session: &mut Session<S>,
    steps: &[Step],
    out: &mut W,
) -> anyhow::Result<()> {
    for step in steps {
        debug!(?step, "script step");
        match step {
            Step::Type(text) => session.type_text(text),
            Step::Select { anchor, focus } => {
                let anchor_point = resolve(session, anchor)?;
                let focus_point = match focus {
                    Some(focus) => resolve(session, focus)?,
                    None => anchor_point.clone(),
                };
                session.select(Selection::new(anchor_point, focus_point));
            }
            Step::SelectBlock(block) => {
                let Some(Node::Element(el)) = session.document().node(block) else {
                    bail!("no block at {block:?}");
                };
                let len = el.text().len();
                let start = resolve(
                    session,
                    &BlockOffset {
                        block: block.clone(),
                        offset: 0,
                    },
                )?;
                let end = resolve(
                    session,
                    &BlockOffset {
                        block: block.clone(),
                        offset: len,
                    },
                )?;
                session.select(Selection::new(start, end));
            }
            Step::Key(event) => {
                if session.handle_key(event) == KeyOutcome::Ignored {
                    debug!(?event, "key not bound");
                }
            }
            Step::Click(control) => session.click(control),
            Step::Render => writeln!(out, "{}", session.render_html())?,
            Step::Dump => writeln!(out, "{}", session.document().to_json_string()?)?,
        }
    }
    Ok(())
}
