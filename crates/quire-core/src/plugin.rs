use std::collections::HashMap;
use std::sync::Arc;

use serde_json::Value;
use thiserror::Error;
use tracing::warn;

use crate::core::{BlockType, Document, Editor, ElementNode, Mark, Marks, Node, NodePatch};
use crate::format;
use crate::ops::{Op, Path};

#[derive(Debug, Clone, Error)]
#[error("{message}")]
pub struct CommandError {
    message: String,
}

impl CommandError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

#[derive(Debug, Clone, Error)]
#[error("{message}")]
pub struct QueryError {
    message: String,
}

impl QueryError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

#[derive(Debug, Clone, Error)]
pub enum RegistryError {
    #[error("duplicate command id: {0}")]
    DuplicateCommand(String),
    #[error("duplicate query id: {0}")]
    DuplicateQuery(String),
}

type CommandHandler = Arc<dyn Fn(&mut Editor, Option<Value>) -> Result<(), CommandError> + Send + Sync>;
type QueryHandler = Arc<dyn Fn(&Editor, Option<Value>) -> Result<Value, QueryError> + Send + Sync>;

#[derive(Clone)]
pub struct CommandSpec {
    pub id: String,
    pub handler: CommandHandler,
}

impl CommandSpec {
    pub fn new(
        id: impl Into<String>,
        handler: impl Fn(&mut Editor, Option<Value>) -> Result<(), CommandError> + Send + Sync + 'static,
    ) -> Self {
        Self {
            id: id.into(),
            handler: Arc::new(handler),
        }
    }
}

/// Id of the command toggling `mark`, e.g. `marks.toggle_bold`.
pub fn toggle_mark_command_id(mark: Mark) -> String {
    format!("marks.toggle_{mark}")
}

/// Id of the command toggling `block`, e.g. `block.toggle_heading_one`.
pub fn toggle_block_command_id(block: &BlockType) -> String {
    format!("block.toggle_{}", block.as_str().replace('-', "_"))
}

#[derive(Clone)]
pub struct QuerySpec {
    pub id: String,
    pub handler: QueryHandler,
}

impl QuerySpec {
    pub fn new(
        id: impl Into<String>,
        handler: impl Fn(&Editor, Option<Value>) -> Result<Value, QueryError> + Send + Sync + 'static,
    ) -> Self {
        Self {
            id: id.into(),
            handler: Arc::new(handler),
        }
    }
}

/// A structural fix-up run after every transaction until none produces ops.
pub trait NormalizePass: Send + Sync {
    fn id(&self) -> &'static str;
    fn run(&self, doc: &Document) -> Vec<Op>;
}

pub trait EditorPlugin: Send + Sync {
    fn id(&self) -> &'static str;
    fn normalize_passes(&self) -> Vec<Box<dyn NormalizePass>> {
        Vec::new()
    }
    fn commands(&self) -> Vec<CommandSpec> {
        Vec::new()
    }
    fn queries(&self) -> Vec<QuerySpec> {
        Vec::new()
    }
}

#[derive(Default)]
pub struct PluginRegistry {
    normalize_passes: Vec<Box<dyn NormalizePass>>,
    commands: HashMap<String, CommandSpec>,
    queries: HashMap<String, QuerySpec>,
}

impl PluginRegistry {
    pub fn new(
        plugins: impl IntoIterator<Item = Box<dyn EditorPlugin>>,
    ) -> Result<Self, RegistryError> {
        let mut registry = Self::default();
        for plugin in plugins {
            registry.register_plugin(plugin)?;
        }
        Ok(registry)
    }

    /// Document normalization only.
    pub fn core() -> Self {
        let plugins: Vec<Box<dyn EditorPlugin>> = vec![Box::new(CoreNormalizePlugin)];
        Self::builtin(plugins)
    }

    pub fn richtext() -> Self {
        let plugins: Vec<Box<dyn EditorPlugin>> = vec![
            Box::new(CoreNormalizePlugin),
            Box::new(MarksPlugin),
            Box::new(BlocksPlugin),
        ];
        Self::builtin(plugins)
    }

    fn builtin(plugins: Vec<Box<dyn EditorPlugin>>) -> Self {
        let mut registry = Self::default();
        for plugin in plugins {
            let id = plugin.id();
            if let Err(err) = registry.register_plugin(plugin) {
                warn!(plugin = id, "skipping built-in plugin: {err}");
            }
        }
        registry
    }

    pub fn register_plugin(&mut self, plugin: Box<dyn EditorPlugin>) -> Result<(), RegistryError> {
        let commands = plugin.commands();
        let queries = plugin.queries();
        if let Some(cmd) = commands.iter().find(|c| self.commands.contains_key(&c.id)) {
            return Err(RegistryError::DuplicateCommand(cmd.id.clone()));
        }
        if let Some(query) = queries.iter().find(|q| self.queries.contains_key(&q.id)) {
            return Err(RegistryError::DuplicateQuery(query.id.clone()));
        }

        self.normalize_passes.extend(plugin.normalize_passes());
        for cmd in commands {
            self.commands.insert(cmd.id.clone(), cmd);
        }
        for query in queries {
            self.queries.insert(query.id.clone(), query);
        }
        Ok(())
    }

    pub fn normalize_passes(&self) -> &[Box<dyn NormalizePass>] {
        &self.normalize_passes
    }

    pub fn commands(&self) -> &HashMap<String, CommandSpec> {
        &self.commands
    }

    pub fn command(&self, id: &str) -> Option<CommandSpec> {
        self.commands.get(id).cloned()
    }

    pub fn queries(&self) -> &HashMap<String, QuerySpec> {
        &self.queries
    }

    pub fn query(&self, id: &str) -> Option<QuerySpec> {
        self.queries.get(id).cloned()
    }

    /// Ops of the first pass with something to fix, in registration order.
    pub fn normalize(&self, doc: &Document) -> Vec<Op> {
        self.normalize_passes
            .iter()
            .map(|pass| pass.run(doc))
            .find(|ops| !ops.is_empty())
            .unwrap_or_default()
    }
}

struct CoreNormalizePlugin;

impl EditorPlugin for CoreNormalizePlugin {
    fn id(&self) -> &'static str {
        "core.normalize"
    }

    fn normalize_passes(&self) -> Vec<Box<dyn NormalizePass>> {
        vec![
            Box::new(EnsureNonEmptyDocument),
            Box::new(WrapRootLeaves),
            Box::new(NormalizeListChildren),
            Box::new(RemoveEmptyListContainers),
            Box::new(EnsureTextBlockHasLeaf),
            Box::new(MergeAdjacentTextLeaves),
        ]
    }
}

fn elements(doc: &Document) -> Vec<(Path, &ElementNode)> {
    fn walk<'a>(
        children: &'a [Node],
        path: &mut Path,
        out: &mut Vec<(Path, &'a ElementNode)>,
    ) {
        for (ix, node) in children.iter().enumerate() {
            let Node::Element(el) = node else {
                continue;
            };
            path.push(ix);
            out.push((path.clone(), el));
            walk(&el.children, path, out);
            path.pop();
        }
    }

    let mut out = Vec::new();
    walk(&doc.children, &mut Vec::new(), &mut out);
    out
}

fn child_path(parent: &[usize], ix: usize) -> Path {
    let mut path = parent.to_vec();
    path.push(ix);
    path
}

struct EnsureNonEmptyDocument;

impl NormalizePass for EnsureNonEmptyDocument {
    fn id(&self) -> &'static str {
        "core.ensure_non_empty_document"
    }

    fn run(&self, doc: &Document) -> Vec<Op> {
        if doc.children.is_empty() {
            return vec![Op::InsertNode {
                path: vec![0],
                node: Node::paragraph(""),
            }];
        }
        Vec::new()
    }
}

/// The root holds blocks only: each run of bare leaves there becomes a
/// paragraph. Fixes the last run first, one run per pass.
struct WrapRootLeaves;

impl NormalizePass for WrapRootLeaves {
    fn id(&self) -> &'static str {
        "core.wrap_root_leaves"
    }

    fn run(&self, doc: &Document) -> Vec<Op> {
        let Some(last) = doc.children.iter().rposition(Node::is_text) else {
            return Vec::new();
        };
        let first = doc.children[..last]
            .iter()
            .rposition(Node::is_element)
            .map_or(0, |ix| ix + 1);

        let mut ops: Vec<Op> = (first..=last)
            .rev()
            .map(|ix| Op::RemoveNode { path: vec![ix] })
            .collect();
        ops.push(Op::InsertNode {
            path: vec![first],
            node: Node::element(BlockType::Paragraph, doc.children[first..=last].to_vec()),
        });
        ops
    }
}

/// List containers hold list items only: stray text blocks are retyped,
/// bare leaves are wrapped, anything deeper is flattened into the list.
/// Fixes one container per run, deepest and last first.
struct NormalizeListChildren;

impl NormalizePass for NormalizeListChildren {
    fn id(&self) -> &'static str {
        "list.normalize_children"
    }

    fn run(&self, doc: &Document) -> Vec<Op> {
        for (path, el) in elements(doc).into_iter().rev() {
            if !el.kind.is_list() {
                continue;
            }

            let mut ops = Vec::new();
            for (ix, child) in el.children.iter().enumerate().rev() {
                let at = child_path(&path, ix);
                match child {
                    Node::Text(_) => {
                        ops.push(Op::RemoveNode { path: at.clone() });
                        ops.push(Op::InsertNode {
                            path: at,
                            node: Node::element(BlockType::ListItem, vec![child.clone()]),
                        });
                    }
                    Node::Element(inner) if inner.is_text_block() => {
                        if inner.kind != BlockType::ListItem {
                            ops.push(Op::SetNode {
                                path: at,
                                patch: NodePatch::Kind {
                                    kind: BlockType::ListItem,
                                },
                            });
                        }
                    }
                    Node::Element(inner) => {
                        ops.push(Op::RemoveNode { path: at });
                        for (offset, grandchild) in inner.children.iter().enumerate() {
                            ops.push(Op::InsertNode {
                                path: child_path(&path, ix + offset),
                                node: grandchild.clone(),
                            });
                        }
                    }
                }
            }
            if !ops.is_empty() {
                return ops;
            }
        }
        Vec::new()
    }
}

struct RemoveEmptyListContainers;

impl NormalizePass for RemoveEmptyListContainers {
    fn id(&self) -> &'static str {
        "list.remove_empty_containers"
    }

    fn run(&self, doc: &Document) -> Vec<Op> {
        elements(doc)
            .into_iter()
            .rev()
            .filter(|(_, el)| el.kind.is_list() && el.children.is_empty())
            .map(|(path, _)| Op::RemoveNode { path })
            .collect()
    }
}

struct EnsureTextBlockHasLeaf;

impl NormalizePass for EnsureTextBlockHasLeaf {
    fn id(&self) -> &'static str {
        "core.ensure_text_block_has_leaf"
    }

    fn run(&self, doc: &Document) -> Vec<Op> {
        elements(doc)
            .into_iter()
            .filter(|(_, el)| !el.kind.is_list() && el.children.is_empty())
            .map(|(path, _)| Op::InsertNode {
                path: child_path(&path, 0),
                node: Node::text(""),
            })
            .collect()
    }
}

/// Adjacent leaves with equal marks become one; empty leaves are absorbed by
/// their neighbour.
struct MergeAdjacentTextLeaves;

impl NormalizePass for MergeAdjacentTextLeaves {
    fn id(&self) -> &'static str {
        "core.merge_adjacent_text_leaves"
    }

    fn run(&self, doc: &Document) -> Vec<Op> {
        let mut ops = Vec::new();
        for (path, el) in elements(doc) {
            // (is empty, marks) of the leaf right of the cursor, after merges.
            let mut right: Option<(bool, Marks)> = None;
            for ix in (0..el.children.len()).rev() {
                let Node::Text(left) = &el.children[ix] else {
                    right = None;
                    continue;
                };
                let left_empty = left.text.is_empty();

                if let Some((right_empty, right_marks)) = right {
                    if left.marks == right_marks || right_empty {
                        ops.push(Op::MergeText {
                            path: child_path(&path, ix + 1),
                        });
                        right = Some((left_empty && right_empty, left.marks));
                        continue;
                    }
                    if left_empty {
                        ops.push(Op::SetNode {
                            path: child_path(&path, ix),
                            patch: NodePatch::Marks { marks: right_marks },
                        });
                        ops.push(Op::MergeText {
                            path: child_path(&path, ix + 1),
                        });
                        right = Some((false, right_marks));
                        continue;
                    }
                }
                right = Some((left_empty, left.marks));
            }
        }
        ops
    }
}

fn arg_str<'a>(args: &'a Option<Value>, key: &str) -> Option<&'a str> {
    args.as_ref()?.get(key)?.as_str()
}

fn mark_arg(args: &Option<Value>) -> Result<Mark, String> {
    let name = arg_str(args, "mark").ok_or("Missing args.mark")?;
    name.parse::<Mark>().map_err(|err| err.to_string())
}

fn block_arg(args: &Option<Value>) -> Result<BlockType, String> {
    arg_str(args, "type")
        .map(BlockType::from)
        .ok_or_else(|| "Missing args.type".to_string())
}

fn toggle_mark_command(editor: &mut Editor, mark: Mark) -> Result<(), CommandError> {
    format::toggle_mark(editor, mark)
        .map_err(|e| CommandError::new(format!("Failed to toggle {mark}: {e}")))
}

fn toggle_block_command(editor: &mut Editor, block: &BlockType) -> Result<(), CommandError> {
    format::toggle_block(editor, block)
        .map_err(|e| CommandError::new(format!("Failed to toggle {block}: {e}")))
}

struct MarksPlugin;

impl EditorPlugin for MarksPlugin {
    fn id(&self) -> &'static str {
        "marks"
    }

    fn commands(&self) -> Vec<CommandSpec> {
        let mut commands: Vec<CommandSpec> = Mark::ALL
            .into_iter()
            .map(|mark| {
                CommandSpec::new(toggle_mark_command_id(mark), move |editor, _args| {
                    toggle_mark_command(editor, mark)
                })
            })
            .collect();

        commands.push(CommandSpec::new("marks.toggle", |editor, args| {
            let mark = mark_arg(&args).map_err(CommandError::new)?;
            toggle_mark_command(editor, mark)
        }));
        commands
    }

    fn queries(&self) -> Vec<QuerySpec> {
        vec![
            QuerySpec::new("marks.get_active", |editor, _args| {
                let mut active = Marks::default();
                for mark in Mark::ALL {
                    active.set(mark, format::is_mark_active(editor, mark));
                }
                serde_json::to_value(active)
                    .map_err(|err| QueryError::new(format!("Failed to encode marks: {err}")))
            }),
            QuerySpec::new("marks.is_active", |editor, args| {
                let mark = mark_arg(&args).map_err(QueryError::new)?;
                Ok(Value::Bool(format::is_mark_active(editor, mark)))
            }),
        ]
    }
}

struct BlocksPlugin;

const TOGGLE_BLOCKS: [BlockType; 6] = [
    BlockType::HeadingOne,
    BlockType::HeadingTwo,
    BlockType::BlockQuote,
    BlockType::Code,
    BlockType::NumberedList,
    BlockType::BulletedList,
];

impl EditorPlugin for BlocksPlugin {
    fn id(&self) -> &'static str {
        "blocks"
    }

    fn commands(&self) -> Vec<CommandSpec> {
        let mut commands: Vec<CommandSpec> = TOGGLE_BLOCKS
            .into_iter()
            .map(|block| {
                CommandSpec::new(toggle_block_command_id(&block), move |editor, _args| {
                    toggle_block_command(editor, &block)
                })
            })
            .collect();

        commands.push(CommandSpec::new("block.toggle", |editor, args| {
            let block = block_arg(&args).map_err(CommandError::new)?;
            toggle_block_command(editor, &block)
        }));
        commands
    }

    fn queries(&self) -> Vec<QuerySpec> {
        vec![
            QuerySpec::new("block.is_active", |editor, args| {
                let block = block_arg(&args).map_err(QueryError::new)?;
                Ok(Value::Bool(format::is_block_active(editor, &block)))
            }),
            QuerySpec::new("list.active_type", |editor, _args| {
                Ok(format::active_list_type(editor)
                    .map(|kind| Value::String(kind.as_str().to_string()))
                    .unwrap_or(Value::Null))
            }),
        ]
    }
}
