use std::fmt;
use std::str::FromStr;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, warn};

use crate::ops::{Op, Path, Transaction};
use crate::plugin::{CommandError, CommandSpec, PluginRegistry, QueryError};

/// Block-level element types.
///
/// Serialized as the kebab-case names used in the persisted JSON
/// (`"heading-one"`, `"bulleted-list"`, ...). Any other name is kept verbatim
/// in [`BlockType::Other`] and renders as a plain paragraph.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub enum BlockType {
    #[default]
    Paragraph,
    HeadingOne,
    HeadingTwo,
    BlockQuote,
    BulletedList,
    NumberedList,
    ListItem,
    Code,
    Other(String),
}

impl BlockType {
    pub fn from_name(name: &str) -> Self {
        match name {
            "paragraph" => Self::Paragraph,
            "heading-one" => Self::HeadingOne,
            "heading-two" => Self::HeadingTwo,
            "block-quote" => Self::BlockQuote,
            "bulleted-list" => Self::BulletedList,
            "numbered-list" => Self::NumberedList,
            "list-item" => Self::ListItem,
            "code" => Self::Code,
            other => Self::Other(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::Paragraph => "paragraph",
            Self::HeadingOne => "heading-one",
            Self::HeadingTwo => "heading-two",
            Self::BlockQuote => "block-quote",
            Self::BulletedList => "bulleted-list",
            Self::NumberedList => "numbered-list",
            Self::ListItem => "list-item",
            Self::Code => "code",
            Self::Other(name) => name,
        }
    }

    /// List containers: the only types allowed to hold `list-item` children.
    pub fn is_list(&self) -> bool {
        matches!(self, Self::BulletedList | Self::NumberedList)
    }
}

impl fmt::Display for BlockType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<&str> for BlockType {
    fn from(name: &str) -> Self {
        Self::from_name(name)
    }
}

impl Serialize for BlockType {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for BlockType {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        // `type: null` is what clearing a block type used to leave behind.
        let name = Option::<String>::deserialize(deserializer)?;
        Ok(name.map_or(Self::Paragraph, |name| Self::from_name(&name)))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mark {
    Bold,
    Italic,
    Underline,
    Code,
}

impl Mark {
    pub const ALL: [Mark; 4] = [Mark::Bold, Mark::Italic, Mark::Underline, Mark::Code];

    pub fn as_str(self) -> &'static str {
        match self {
            Mark::Bold => "bold",
            Mark::Italic => "italic",
            Mark::Underline => "underline",
            Mark::Code => "code",
        }
    }
}

impl fmt::Display for Mark {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown mark: {0}")]
pub struct UnknownMark(pub String);

impl FromStr for Mark {
    type Err = UnknownMark;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Mark::ALL
            .into_iter()
            .find(|mark| mark.as_str() == s)
            .ok_or_else(|| UnknownMark(s.to_string()))
    }
}

fn is_false(value: &bool) -> bool {
    !*value
}

fn nullable_flag<'de, D: Deserializer<'de>>(deserializer: D) -> Result<bool, D::Error> {
    Ok(Option::<bool>::deserialize(deserializer)?.unwrap_or(false))
}

/// Character-level format flags. Absent, `null` and `false` all mean "off";
/// only set flags are serialized.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Marks {
    #[serde(default, skip_serializing_if = "is_false", deserialize_with = "nullable_flag")]
    pub bold: bool,
    #[serde(default, skip_serializing_if = "is_false", deserialize_with = "nullable_flag")]
    pub italic: bool,
    #[serde(default, skip_serializing_if = "is_false", deserialize_with = "nullable_flag")]
    pub underline: bool,
    #[serde(default, skip_serializing_if = "is_false", deserialize_with = "nullable_flag")]
    pub code: bool,
}

impl Marks {
    pub fn get(&self, mark: Mark) -> bool {
        match mark {
            Mark::Bold => self.bold,
            Mark::Italic => self.italic,
            Mark::Underline => self.underline,
            Mark::Code => self.code,
        }
    }

    pub fn set(&mut self, mark: Mark, value: bool) {
        match mark {
            Mark::Bold => self.bold = value,
            Mark::Italic => self.italic = value,
            Mark::Underline => self.underline = value,
            Mark::Code => self.code = value,
        }
    }

    pub fn with(mut self, mark: Mark, value: bool) -> Self {
        self.set(mark, value);
        self
    }

    pub fn is_empty(&self) -> bool {
        Mark::ALL.into_iter().all(|mark| !self.get(mark))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(transparent)]
pub struct Document {
    pub children: Vec<Node>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Node {
    Element(ElementNode),
    Text(TextNode),
}

impl<'de> Deserialize<'de> for Node {
    /// A node with a `text` string is a leaf, anything else an element. A
    /// leaf that also carries `children` is rejected rather than guessed at.
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        use serde::de::Error as _;

        let value = Value::deserialize(deserializer)?;
        if !value.get("text").is_some_and(Value::is_string) {
            return serde_json::from_value(value)
                .map(Node::Element)
                .map_err(D::Error::custom);
        }
        if value.get("children").is_some() {
            return Err(D::Error::custom("text node must not have children"));
        }
        serde_json::from_value(value)
            .map(Node::Text)
            .map_err(D::Error::custom)
    }
}

impl Node {
    pub fn paragraph(text: impl Into<String>) -> Self {
        Self::element(BlockType::Paragraph, vec![Self::text(text)])
    }

    pub fn element(kind: BlockType, children: Vec<Node>) -> Self {
        Node::Element(ElementNode { kind, children })
    }

    pub fn text(text: impl Into<String>) -> Self {
        Self::marked(text, Marks::default())
    }

    pub fn marked(text: impl Into<String>, marks: Marks) -> Self {
        Node::Text(TextNode {
            text: text.into(),
            marks,
        })
    }

    pub fn is_text(&self) -> bool {
        matches!(self, Node::Text(_))
    }

    pub fn is_element(&self) -> bool {
        matches!(self, Node::Element(_))
    }

    /// An element whose children are leaves only: the lowest block in its branch.
    pub fn is_text_block(&self) -> bool {
        matches!(self, Node::Element(el) if el.is_text_block())
    }

    pub fn kind(&self) -> Option<&BlockType> {
        match self {
            Node::Element(el) => Some(&el.kind),
            Node::Text(_) => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ElementNode {
    #[serde(rename = "type")]
    pub kind: BlockType,
    pub children: Vec<Node>,
}

impl ElementNode {
    pub fn is_text_block(&self) -> bool {
        !self.kind.is_list() && !self.children.iter().any(Node::is_element)
    }

    pub fn text(&self) -> String {
        let mut out = String::new();
        for child in &self.children {
            match child {
                Node::Text(t) => out.push_str(&t.text),
                Node::Element(el) => out.push_str(&el.text()),
            }
        }
        out
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextNode {
    pub text: String,
    #[serde(flatten)]
    pub marks: Marks,
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Point {
    #[serde(default)]
    pub path: Path,
    pub offset: usize,
}

impl Point {
    pub fn new(path: Path, offset: usize) -> Self {
        Self { path, offset }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Selection {
    pub anchor: Point,
    pub focus: Point,
}

impl Selection {
    pub fn new(anchor: Point, focus: Point) -> Self {
        Self { anchor, focus }
    }

    pub fn collapsed(point: Point) -> Self {
        Self {
            anchor: point.clone(),
            focus: point,
        }
    }

    pub fn is_collapsed(&self) -> bool {
        self.anchor == self.focus
    }

    /// `(start, end)` in document order.
    pub fn edges(&self) -> (&Point, &Point) {
        if self.focus < self.anchor {
            (&self.focus, &self.anchor)
        } else {
            (&self.anchor, &self.focus)
        }
    }
}

/// Property change carried by [`Op::SetNode`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "set", rename_all = "snake_case")]
pub enum NodePatch {
    Kind { kind: BlockType },
    Mark { mark: Mark, value: bool },
    Marks { marks: Marks },
}

impl Document {
    pub fn new(children: Vec<Node>) -> Self {
        Self { children }
    }

    /// The document a fresh session starts from: one empty paragraph.
    pub fn empty_paragraph() -> Self {
        Self::new(vec![Node::paragraph("")])
    }

    pub fn node(&self, path: &[usize]) -> Option<&Node> {
        node_ref(self, path)
    }

    pub fn children_at(&self, parent_path: &[usize]) -> Option<&[Node]> {
        if parent_path.is_empty() {
            return Some(&self.children);
        }
        match node_ref(self, parent_path)? {
            Node::Element(el) => Some(&el.children),
            Node::Text(_) => None,
        }
    }

    pub fn leaf(&self, path: &[usize]) -> Option<&TextNode> {
        match node_ref(self, path)? {
            Node::Text(t) => Some(t),
            Node::Element(_) => None,
        }
    }

    /// Every leaf in document order.
    pub fn leaves(&self) -> Vec<(Path, &TextNode)> {
        fn walk<'a>(children: &'a [Node], path: &mut Path, out: &mut Vec<(Path, &'a TextNode)>) {
            for (ix, node) in children.iter().enumerate() {
                path.push(ix);
                match node {
                    Node::Text(t) => out.push((path.clone(), t)),
                    Node::Element(el) => walk(&el.children, path, out),
                }
                path.pop();
            }
        }

        let mut out = Vec::new();
        walk(&self.children, &mut Vec::new(), &mut out);
        out
    }

    pub fn start_point(&self) -> Option<Point> {
        first_text_point(self)
    }

    /// Resolves a text offset counted across all leaves of the block at
    /// `block_path`. Offsets on a leaf boundary resolve to the start of the
    /// following leaf.
    pub fn point_at(&self, block_path: &[usize], offset: usize) -> Option<Point> {
        let Some(Node::Element(el)) = node_ref(self, block_path) else {
            return None;
        };

        let mut remaining = offset;
        let mut last_text: Option<(usize, usize)> = None;
        for (child_ix, node) in el.children.iter().enumerate() {
            let Node::Text(t) = node else {
                continue;
            };
            if remaining < t.text.len() {
                let mut path = block_path.to_vec();
                path.push(child_ix);
                return Some(Point::new(path, clamp_to_char_boundary(&t.text, remaining)));
            }
            remaining -= t.text.len();
            last_text = Some((child_ix, t.text.len()));
        }

        let (child_ix, len) = last_text?;
        let mut path = block_path.to_vec();
        path.push(child_ix);
        Some(Point::new(path, len))
    }
}

#[derive(Debug, Error)]
pub enum ApplyError {
    #[error("invalid path: {0}")]
    InvalidPath(String),
    #[error("patch does not apply to the node at {0:?}")]
    PatchMismatch(Path),
    #[error("normalization did not converge")]
    NormalizeDidNotConverge,
}

impl From<PathError> for ApplyError {
    fn from(value: PathError) -> Self {
        ApplyError::InvalidPath(value.0)
    }
}

#[derive(Debug)]
pub struct PathError(pub String);

/// Normalization rounds allowed per transaction before giving up.
const MAX_NORMALIZE_ITERATIONS: usize = 100;

#[derive(Debug, Clone)]
pub struct TransactionPreview {
    pub doc: Document,
    pub selection: Selection,
}

/// In-memory editing engine: owns the document, the selection and the
/// pending caret marks, and applies every mutation as a [`Transaction`].
pub struct Editor {
    pub(crate) doc: Document,
    pub(crate) selection: Selection,
    pub(crate) marks: Option<Marks>,
    registry: PluginRegistry,
}

impl Editor {
    pub fn new(doc: Document, selection: Selection, registry: PluginRegistry) -> Self {
        let mut editor = Self {
            doc,
            selection,
            marks: None,
            registry,
        };
        editor.normalize_in_place();
        editor
    }

    /// Rich-text editor over `doc` with the caret at the start of the document.
    pub fn with_document(doc: Document) -> Self {
        let start = doc
            .start_point()
            .unwrap_or_else(|| Point::new(vec![0, 0], 0));
        Self::new(doc, Selection::collapsed(start), PluginRegistry::richtext())
    }

    pub fn with_richtext_plugins() -> Self {
        Self::with_document(Document::empty_paragraph())
    }

    pub fn doc(&self) -> &Document {
        &self.doc
    }

    pub fn selection(&self) -> &Selection {
        &self.selection
    }

    pub fn set_selection(&mut self, selection: Selection) {
        let selection = normalize_selection(&self.doc, &selection);
        if selection != self.selection {
            self.marks = None;
        }
        self.selection = selection;
    }

    /// Marks queued at a collapsed caret for the next inserted text.
    pub fn pending_marks(&self) -> Option<Marks> {
        self.marks
    }

    pub fn registry(&self) -> &PluginRegistry {
        &self.registry
    }

    pub fn apply(&mut self, tx: Transaction) -> Result<(), ApplyError> {
        if tx.is_empty() {
            return Ok(());
        }
        let TransactionPreview { doc, selection } = self.preview_transaction(&tx)?;
        debug!(
            source = tx.meta.source.as_deref().unwrap_or("unknown"),
            ops = tx.ops.len(),
            "applied transaction"
        );
        self.doc = doc;
        self.selection = selection;
        self.marks = None;
        Ok(())
    }

    pub fn preview_transaction(&self, tx: &Transaction) -> Result<TransactionPreview, ApplyError> {
        let mut doc = self.doc.clone();
        let mut selection = self.selection.clone();

        for op in tx.ops.iter().cloned() {
            apply_op_to(&mut doc, &mut selection, op)?;
        }

        if let Some(sel) = &tx.selection_after {
            selection = sel.clone();
        }

        normalize_document(
            &self.registry,
            &mut doc,
            &mut selection,
            MAX_NORMALIZE_ITERATIONS,
        )?;
        let selection = normalize_selection(&doc, &selection);

        Ok(TransactionPreview { doc, selection })
    }

    pub fn run_command(&mut self, id: &str, args: Option<Value>) -> Result<(), CommandError> {
        let Some(command) = self.registry.command(id) else {
            return Err(CommandError::new(format!("Unknown command: {id}")));
        };
        (command.handler)(self, args)
    }

    pub fn run_query_json(&self, id: &str, args: Option<Value>) -> Result<Value, QueryError> {
        let Some(query) = self.registry.query(id) else {
            return Err(QueryError::new(format!("Unknown query: {id}")));
        };
        (query.handler)(self, args)
    }

    pub fn run_query<T>(&self, id: &str, args: Option<Value>) -> Result<T, QueryError>
    where
        T: DeserializeOwned,
    {
        let value = self.run_query_json(id, args)?;
        serde_json::from_value(value)
            .map_err(|err| QueryError::new(format!("Failed to decode query result: {err}")))
    }

    pub fn commands(&self) -> impl Iterator<Item = &CommandSpec> {
        self.registry.commands().values()
    }

    fn normalize_in_place(&mut self) {
        if let Err(err) = normalize_document(
            &self.registry,
            &mut self.doc,
            &mut self.selection,
            MAX_NORMALIZE_ITERATIONS,
        ) {
            warn!("initial document normalization failed: {err}");
        }
        self.selection = normalize_selection(&self.doc, &self.selection);
    }
}

fn normalize_document(
    registry: &PluginRegistry,
    doc: &mut Document,
    selection: &mut Selection,
    max_iterations: usize,
) -> Result<(), ApplyError> {
    for _ in 0..max_iterations {
        let ops = registry.normalize(doc);
        if ops.is_empty() {
            return Ok(());
        }
        for op in ops {
            apply_op_to(doc, selection, op)?;
        }
    }
    Err(ApplyError::NormalizeDidNotConverge)
}

pub(crate) fn apply_op_to(
    doc: &mut Document,
    selection: &mut Selection,
    op: Op,
) -> Result<(), ApplyError> {
    match op {
        Op::InsertText { path, offset, text } => {
            let text_node = node_text_mut(doc, &path)?;
            let offset = clamp_to_char_boundary(&text_node.text, offset);
            text_node.text.insert_str(offset, &text);
            transform_selection_insert_text(selection, &path, offset, text.len());
        }
        Op::RemoveText { path, range } => {
            let text_node = node_text_mut(doc, &path)?;
            let start =
                clamp_to_char_boundary(&text_node.text, range.start.min(text_node.text.len()));
            let end = clamp_to_char_boundary(&text_node.text, range.end.min(text_node.text.len()));
            if start < end {
                text_node.text.replace_range(start..end, "");
                transform_selection_remove_text(selection, &path, start..end);
            }
        }
        Op::InsertNode { path, node } => {
            insert_node(doc, &path, node)?;
            transform_selection_insert_node(selection, &path);
        }
        Op::RemoveNode { path } => {
            remove_node(doc, &path)?;
            transform_selection_remove_node(selection, &path);
        }
        Op::SplitText { path, offset } => {
            let next = next_sibling_path(&path)?;
            let text_node = node_text_mut(doc, &path)?;
            let offset = clamp_to_char_boundary(&text_node.text, offset);
            let right = TextNode {
                text: text_node.text.split_off(offset),
                marks: text_node.marks,
            };
            insert_node(doc, &next, Node::Text(right))?;
            transform_selection_split_text(selection, &path, &next, offset);
        }
        Op::MergeText { path } => {
            let prev = previous_sibling_path(&path)?;
            if !matches!(node_ref(doc, &prev), Some(Node::Text(_))) {
                return Err(ApplyError::InvalidPath(format!(
                    "Merge target at {prev:?} is not a text node"
                )));
            }
            let Node::Text(removed) = node_ref(doc, &path)
                .cloned()
                .ok_or_else(|| ApplyError::InvalidPath(format!("No node at {path:?}")))?
            else {
                return Err(ApplyError::InvalidPath(format!(
                    "Merged node at {path:?} is not a text node"
                )));
            };
            let prev_node = node_text_mut(doc, &prev)?;
            let prev_len = prev_node.text.len();
            prev_node.text.push_str(&removed.text);
            remove_node(doc, &path)?;
            transform_selection_merge_text(selection, &path, &prev, prev_len);
        }
        Op::SetNode { path, patch } => match (node_mut(doc, &path)?, patch) {
            (Node::Element(el), NodePatch::Kind { kind }) => el.kind = kind,
            (Node::Text(t), NodePatch::Mark { mark, value }) => t.marks.set(mark, value),
            (Node::Text(t), NodePatch::Marks { marks }) => t.marks = marks,
            _ => return Err(ApplyError::PatchMismatch(path)),
        },
    }
    Ok(())
}

pub(crate) fn clamp_to_char_boundary(s: &str, mut ix: usize) -> usize {
    ix = ix.min(s.len());
    while ix > 0 && !s.is_char_boundary(ix) {
        ix -= 1;
    }
    ix
}

fn next_sibling_path(path: &[usize]) -> Result<Path, PathError> {
    let (last, parent) = path
        .split_last()
        .ok_or_else(|| PathError("Empty path".into()))?;
    let mut next = parent.to_vec();
    next.push(last + 1);
    Ok(next)
}

fn previous_sibling_path(path: &[usize]) -> Result<Path, PathError> {
    let (last, parent) = path
        .split_last()
        .ok_or_else(|| PathError("Empty path".into()))?;
    let prev = last
        .checked_sub(1)
        .ok_or_else(|| PathError(format!("No previous sibling for {path:?}")))?;
    let mut out = parent.to_vec();
    out.push(prev);
    Ok(out)
}

fn transform_selection_insert_text(
    selection: &mut Selection,
    path: &[usize],
    offset: usize,
    len: usize,
) {
    for point in [&mut selection.anchor, &mut selection.focus] {
        if point.path == path && point.offset >= offset {
            point.offset = point.offset.saturating_add(len);
        }
    }
}

fn transform_selection_remove_text(
    selection: &mut Selection,
    path: &[usize],
    range: std::ops::Range<usize>,
) {
    let removed_len = range.end.saturating_sub(range.start);
    for point in [&mut selection.anchor, &mut selection.focus] {
        if point.path != path || point.offset <= range.start {
            continue;
        }
        if point.offset >= range.end {
            point.offset = point.offset.saturating_sub(removed_len);
        } else {
            point.offset = range.start;
        }
    }
}

fn transform_selection_insert_node(selection: &mut Selection, path: &[usize]) {
    let Some((index, parent_path)) = path.split_last() else {
        return;
    };
    let depth = parent_path.len();

    for point in [&mut selection.anchor, &mut selection.focus] {
        if point.path.len() <= depth || !point.path.starts_with(parent_path) {
            continue;
        }
        if point.path[depth] >= *index {
            point.path[depth] += 1;
        }
    }
}

fn transform_selection_remove_node(selection: &mut Selection, path: &[usize]) {
    let Some((index, parent_path)) = path.split_last() else {
        return;
    };
    let depth = parent_path.len();

    for point in [&mut selection.anchor, &mut selection.focus] {
        if point.path.len() <= depth || !point.path.starts_with(parent_path) {
            continue;
        }
        let ix = point.path[depth];
        if ix > *index {
            point.path[depth] = ix - 1;
        } else if ix == *index {
            // Inside the removed subtree: park on the previous sibling and let
            // selection normalization resolve it to a leaf.
            point.path.truncate(depth + 1);
            point.path[depth] = index.saturating_sub(1);
            point.offset = 0;
        }
    }
}

/// Range edges move inward: the start follows text that moves to the new
/// leaf, the end stays behind. A caret follows the text.
fn transform_selection_split_text(
    selection: &mut Selection,
    path: &[usize],
    next: &[usize],
    position: usize,
) {
    let collapsed = selection.is_collapsed();
    let anchor_is_start = selection.anchor <= selection.focus;
    transform_selection_insert_node(selection, next);

    for (point, is_start) in [
        (&mut selection.anchor, anchor_is_start),
        (&mut selection.focus, !anchor_is_start),
    ] {
        if point.path != path {
            continue;
        }
        let forward = collapsed || is_start;
        if point.offset > position || (point.offset == position && forward) {
            point.path = next.to_vec();
            point.offset -= position;
        }
    }
}

fn transform_selection_merge_text(
    selection: &mut Selection,
    path: &[usize],
    prev: &[usize],
    prev_len: usize,
) {
    let Some((index, parent_path)) = path.split_last() else {
        return;
    };
    let depth = parent_path.len();

    for point in [&mut selection.anchor, &mut selection.focus] {
        if point.path == path {
            point.path = prev.to_vec();
            point.offset += prev_len;
            continue;
        }
        if point.path.len() > depth
            && point.path.starts_with(parent_path)
            && point.path[depth] > *index
        {
            point.path[depth] -= 1;
        }
    }
}

fn node_ref<'a>(doc: &'a Document, path: &[usize]) -> Option<&'a Node> {
    let (first, rest) = path.split_first()?;
    let mut node = doc.children.get(*first)?;
    for &ix in rest {
        node = match node {
            Node::Element(el) => el.children.get(ix)?,
            Node::Text(_) => return None,
        };
    }
    Some(node)
}

fn node_mut<'a>(doc: &'a mut Document, path: &[usize]) -> Result<&'a mut Node, PathError> {
    let (first, rest) = path
        .split_first()
        .ok_or_else(|| PathError("Empty path".into()))?;
    let len = doc.children.len();
    let node = doc
        .children
        .get_mut(*first)
        .ok_or_else(|| PathError(format!("Path out of bounds at depth 0: {first} >= {len}")))?;
    descend_mut(node, rest, 1)
}

fn descend_mut<'a>(node: &'a mut Node, rest: &[usize], depth: usize) -> Result<&'a mut Node, PathError> {
    let Some((ix, rest)) = rest.split_first() else {
        return Ok(node);
    };
    match node {
        Node::Element(el) => {
            let len = el.children.len();
            let child = el.children.get_mut(*ix).ok_or_else(|| {
                PathError(format!("Path out of bounds at depth {depth}: {ix} >= {len}"))
            })?;
            descend_mut(child, rest, depth + 1)
        }
        Node::Text(_) => Err(PathError(format!(
            "Non-container node at depth {}",
            depth - 1
        ))),
    }
}

fn node_text_mut<'a>(doc: &'a mut Document, path: &[usize]) -> Result<&'a mut TextNode, PathError> {
    match node_mut(doc, path)? {
        Node::Text(t) => Ok(t),
        Node::Element(_) => Err(PathError("Expected Text node".into())),
    }
}

fn children_mut<'a>(
    doc: &'a mut Document,
    parent_path: &[usize],
) -> Result<&'a mut Vec<Node>, PathError> {
    if parent_path.is_empty() {
        return Ok(&mut doc.children);
    }
    match node_mut(doc, parent_path)? {
        Node::Element(el) => Ok(&mut el.children),
        Node::Text(_) => Err(PathError("Parent is not a container".into())),
    }
}

fn insert_node(doc: &mut Document, path: &[usize], node: Node) -> Result<(), PathError> {
    let (index, parent_path) = path
        .split_last()
        .ok_or_else(|| PathError("Empty insert path".into()))?;
    let children = children_mut(doc, parent_path)?;
    if *index > children.len() {
        return Err(PathError(format!(
            "Insert index out of bounds: {index} > {}",
            children.len()
        )));
    }
    children.insert(*index, node);
    Ok(())
}

fn remove_node(doc: &mut Document, path: &[usize]) -> Result<Node, PathError> {
    let (index, parent_path) = path
        .split_last()
        .ok_or_else(|| PathError("Empty remove path".into()))?;
    let children = children_mut(doc, parent_path)?;
    if *index >= children.len() {
        return Err(PathError(format!(
            "Remove index out of bounds: {index} >= {}",
            children.len()
        )));
    }
    Ok(children.remove(*index))
}

fn first_text_point(doc: &Document) -> Option<Point> {
    doc.leaves()
        .into_iter()
        .next()
        .map(|(path, _)| Point::new(path, 0))
}

/// Clamps both selection points onto existing leaves.
pub fn normalize_selection(doc: &Document, selection: &Selection) -> Selection {
    let fallback = first_text_point(doc).unwrap_or(Point {
        path: vec![0],
        offset: 0,
    });

    let anchor = normalize_point_to_existing_text(doc, &selection.anchor).unwrap_or_else(|| {
        normalize_point_to_existing_text(doc, &selection.focus).unwrap_or_else(|| fallback.clone())
    });
    let focus =
        normalize_point_to_existing_text(doc, &selection.focus).unwrap_or_else(|| anchor.clone());

    Selection { anchor, focus }
}

fn normalize_point_to_existing_text(doc: &Document, point: &Point) -> Option<Point> {
    if point.path.is_empty() || doc.children.is_empty() {
        return None;
    }

    let mut resolved_path: Path = Vec::new();
    let mut children: &[Node] = &doc.children;

    for &wanted in &point.path {
        if children.is_empty() {
            break;
        }
        let ix = wanted.min(children.len() - 1);
        resolved_path.push(ix);
        match &children[ix] {
            Node::Text(t) => {
                return Some(Point {
                    path: resolved_path,
                    offset: clamp_to_char_boundary(&t.text, point.offset),
                });
            }
            Node::Element(el) => children = &el.children,
        }
    }

    // Landed on an element: use its first leaf.
    let node = node_ref(doc, &resolved_path)?;
    let Node::Element(el) = node else {
        return None;
    };
    let sub = Document::new(el.children.clone());
    let inner = first_text_point(&sub)?;
    resolved_path.extend(inner.path);
    Some(Point::new(resolved_path, 0))
}
