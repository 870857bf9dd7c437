use thiserror::Error;

use crate::core::{
    ApplyError, BlockType, Document, Editor, Mark, Marks, Node, NodePatch, Point, Selection,
    apply_op_to,
};
use crate::ops::{Op, Path, Transaction};

/// How [`EditorEngine::nodes`] treats the nodes touching the selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchMode {
    /// Every matching node that touches the selection.
    Existential,
    /// Matching nodes, but only when every touched leaf is covered by a
    /// match (the leaf itself or one of its ancestors). Otherwise nothing.
    Universal,
}

#[derive(Debug, Error)]
pub enum EngineError {
    #[error(transparent)]
    Apply(#[from] ApplyError),
}

pub type NodeMatcher<'a> = &'a dyn Fn(&Node) -> bool;

/// The primitives the formatting layer is written against.
pub trait EditorEngine {
    fn document(&self) -> &Document;

    fn selection(&self) -> &Selection;

    fn nodes(&self, matcher: NodeMatcher<'_>, mode: MatchMode) -> Vec<(Path, &Node)>;

    /// Patches the lowest matching nodes. With `split`, leaves cut by the
    /// selection edges are split first so only the selected text changes.
    fn set_nodes(
        &mut self,
        patch: NodePatch,
        matcher: NodeMatcher<'_>,
        split: bool,
    ) -> Result<(), EngineError>;

    /// Wraps the sibling run spanned by the lowest matching nodes in a new
    /// element of `kind`.
    fn wrap_nodes(&mut self, kind: BlockType, matcher: NodeMatcher<'_>) -> Result<(), EngineError>;

    /// Lifts the children of matching containers into the container's parent.
    /// With `split`, only the touched children leave; the untouched ones stay
    /// in copies of the container before and after.
    fn unwrap_nodes(&mut self, matcher: NodeMatcher<'_>, split: bool) -> Result<(), EngineError>;

    fn marks(&self) -> Marks;

    fn add_mark(&mut self, mark: Mark) -> Result<(), EngineError>;

    fn remove_mark(&mut self, mark: Mark) -> Result<(), EngineError>;
}

/// Ops recorded against a scratch copy of the editor state.
struct Draft {
    doc: Document,
    selection: Selection,
    ops: Vec<Op>,
}

impl Draft {
    fn new(editor: &Editor) -> Self {
        Self {
            doc: editor.doc.clone(),
            selection: editor.selection.clone(),
            ops: Vec::new(),
        }
    }

    fn push(&mut self, op: Op) -> Result<(), ApplyError> {
        apply_op_to(&mut self.doc, &mut self.selection, op.clone())?;
        self.ops.push(op);
        Ok(())
    }

    /// Replaces `parent[range]` with `nodes`. Leaves the selection to the caller.
    fn splice(
        &mut self,
        parent: &[usize],
        range: std::ops::RangeInclusive<usize>,
        nodes: Vec<Node>,
    ) -> Result<(), ApplyError> {
        let selection = self.selection.clone();
        let start = *range.start();
        for _ in range {
            self.push(Op::RemoveNode {
                path: child_path(parent, start),
            })?;
        }
        for (offset, node) in nodes.into_iter().enumerate() {
            self.push(Op::InsertNode {
                path: child_path(parent, start + offset),
                node,
            })?;
        }
        self.selection = selection;
        Ok(())
    }

    fn into_transaction(self, source: &str) -> Transaction {
        Transaction::new(self.ops)
            .selection_after(self.selection)
            .source(source)
    }
}

fn child_path(parent: &[usize], ix: usize) -> Path {
    let mut path = parent.to_vec();
    path.push(ix);
    path
}

/// Leaves the selection touches, in document order. A range edge sitting on
/// the far boundary of a non-empty leaf does not touch it.
fn touched_leaves(doc: &Document, selection: &Selection) -> Vec<Path> {
    let (start, end) = selection.edges();
    if selection.is_collapsed() {
        return doc
            .leaf(&start.path)
            .map(|_| vec![start.path.clone()])
            .unwrap_or_default();
    }

    doc.leaves()
        .into_iter()
        .filter(|(path, leaf)| {
            if *path < start.path || *path > end.path {
                return false;
            }
            let len = leaf.text.len();
            let only_edge = start.path != end.path;
            if only_edge && *path == end.path && end.offset == 0 && len > 0 {
                return false;
            }
            if only_edge && *path == start.path && start.offset >= len && len > 0 {
                return false;
            }
            true
        })
        .map(|(path, _)| path)
        .collect()
}

fn descendants(doc: &Document) -> Vec<(Path, &Node)> {
    fn walk<'a>(children: &'a [Node], path: &mut Path, out: &mut Vec<(Path, &'a Node)>) {
        for (ix, node) in children.iter().enumerate() {
            path.push(ix);
            out.push((path.clone(), node));
            if let Node::Element(el) = node {
                walk(&el.children, path, out);
            }
            path.pop();
        }
    }

    let mut out = Vec::new();
    walk(&doc.children, &mut Vec::new(), &mut out);
    out
}

fn matching_nodes<'a>(
    doc: &'a Document,
    selection: &Selection,
    matcher: NodeMatcher<'_>,
    mode: MatchMode,
) -> Vec<(Path, &'a Node)> {
    let leaves = touched_leaves(doc, selection);
    if leaves.is_empty() {
        return Vec::new();
    }

    let matches: Vec<(Path, &Node)> = descendants(doc)
        .into_iter()
        .filter(|(path, node)| leaves.iter().any(|leaf| leaf.starts_with(path)) && matcher(*node))
        .collect();

    if mode == MatchMode::Universal {
        let covered = leaves
            .iter()
            .all(|leaf| matches.iter().any(|(path, _)| leaf.starts_with(path)));
        if !covered {
            return Vec::new();
        }
    }
    matches
}

/// Drops every path that is an ancestor of another path in the set.
fn lowest(paths: Vec<Path>) -> Vec<Path> {
    paths
        .iter()
        .filter(|p| {
            !paths
                .iter()
                .any(|q| q.len() > p.len() && q.starts_with(p.as_slice()))
        })
        .cloned()
        .collect()
}

fn lowest_matches(doc: &Document, selection: &Selection, matcher: NodeMatcher<'_>) -> Vec<Path> {
    let paths = matching_nodes(doc, selection, matcher, MatchMode::Existential)
        .into_iter()
        .map(|(path, _)| path)
        .collect();
    lowest(paths)
}

fn split_at_edges(draft: &mut Draft) -> Result<(), ApplyError> {
    if draft.selection.is_collapsed() {
        return Ok(());
    }
    let (start, end) = {
        let (start, end) = draft.selection.edges();
        (start.clone(), end.clone())
    };

    for point in [end, start] {
        let Some(leaf) = draft.doc.leaf(&point.path) else {
            continue;
        };
        if point.offset > 0 && point.offset < leaf.text.len() {
            draft.push(Op::SplitText {
                path: point.path,
                offset: point.offset,
            })?;
        }
    }
    Ok(())
}

/// Where the children of a container end up after it is split-unwrapped.
struct Lift {
    container: Path,
    first: usize,
    last: usize,
    has_before: bool,
    parts: usize,
}

impl Lift {
    fn map(&self, point: &mut Point) {
        let depth = self.container.len() - 1;
        let Some((&container_ix, parent)) = self.container.split_last() else {
            return;
        };
        if point.path.len() <= depth || !point.path.starts_with(parent) {
            return;
        }

        let ix = point.path[depth];
        if ix > container_ix {
            point.path[depth] = (ix + self.parts).saturating_sub(1);
            return;
        }
        if ix < container_ix || point.path.len() <= depth + 1 {
            return;
        }

        let child = point.path[depth + 1];
        let base = container_ix + usize::from(self.has_before);
        let rest = point.path[depth + 2..].to_vec();
        let mut path = parent.to_vec();
        if child < self.first {
            path.extend([container_ix, child]);
        } else if child <= self.last {
            path.push(base + child - self.first);
        } else {
            path.extend([base + self.last - self.first + 1, child - self.last - 1]);
        }
        path.extend(rest);
        point.path = path;
    }
}

fn wrap_point(point: &mut Point, parent: &[usize], first: usize, last: usize) {
    let depth = parent.len();
    if point.path.len() <= depth || !point.path.starts_with(parent) {
        return;
    }
    let ix = point.path[depth];
    if ix > last {
        point.path[depth] = ix - (last - first);
    } else if ix >= first {
        point.path[depth] = first;
        point.path.insert(depth + 1, ix - first);
    }
}

fn common_prefix(a: &[usize], b: &[usize]) -> Path {
    a.iter()
        .zip(b)
        .take_while(|(x, y)| x == y)
        .map(|(x, _)| *x)
        .collect()
}

impl EditorEngine for Editor {
    fn document(&self) -> &Document {
        &self.doc
    }

    fn selection(&self) -> &Selection {
        &self.selection
    }

    fn nodes(&self, matcher: NodeMatcher<'_>, mode: MatchMode) -> Vec<(Path, &Node)> {
        matching_nodes(&self.doc, &self.selection, matcher, mode)
    }

    fn set_nodes(
        &mut self,
        patch: NodePatch,
        matcher: NodeMatcher<'_>,
        split: bool,
    ) -> Result<(), EngineError> {
        let mut draft = Draft::new(self);
        if split {
            split_at_edges(&mut draft)?;
        }

        for path in lowest_matches(&draft.doc, &draft.selection, matcher) {
            draft.push(Op::SetNode {
                path,
                patch: patch.clone(),
            })?;
        }

        if draft.ops.is_empty() {
            return Ok(());
        }
        self.apply(draft.into_transaction("engine.set_nodes"))?;
        Ok(())
    }

    fn wrap_nodes(&mut self, kind: BlockType, matcher: NodeMatcher<'_>) -> Result<(), EngineError> {
        let matches = lowest_matches(&self.doc, &self.selection, matcher);
        let (Some(first), Some(last)) = (matches.first(), matches.last()) else {
            return Ok(());
        };

        let prefix = common_prefix(first, last);
        let parent = if prefix.len() >= first.len().min(last.len()) {
            first[..first.len() - 1].to_vec()
        } else {
            prefix
        };
        let depth = parent.len();
        let (a, b) = (first[depth], last[depth]);

        let Some(siblings) = self.doc.children_at(&parent) else {
            return Ok(());
        };
        let wrapped = Node::element(kind, siblings[a..=b].to_vec());

        let mut draft = Draft::new(self);
        draft.splice(&parent, a..=b, vec![wrapped])?;
        wrap_point(&mut draft.selection.anchor, &parent, a, b);
        wrap_point(&mut draft.selection.focus, &parent, a, b);

        self.apply(draft.into_transaction("engine.wrap_nodes"))?;
        Ok(())
    }

    fn unwrap_nodes(&mut self, matcher: NodeMatcher<'_>, split: bool) -> Result<(), EngineError> {
        let leaves = touched_leaves(&self.doc, &self.selection);
        let mut targets: Vec<Path> = matching_nodes(
            &self.doc,
            &self.selection,
            &|node: &Node| node.is_element() && matcher(node),
            MatchMode::Existential,
        )
        .into_iter()
        .map(|(path, _)| path)
        .collect();
        if targets.is_empty() {
            return Ok(());
        }
        targets.reverse();

        let mut draft = Draft::new(self);
        for container in targets {
            let Some(Node::Element(el)) = draft.doc.node(&container).cloned() else {
                continue;
            };
            let depth = container.len();
            let touched: Vec<usize> = (0..el.children.len())
                .filter(|ix| {
                    leaves.iter().any(|leaf| {
                        leaf.len() > depth && leaf.starts_with(&container) && leaf[depth] == *ix
                    })
                })
                .collect();

            let (first, last) = match (split, touched.first(), touched.last()) {
                (true, Some(&first), Some(&last)) => (first, last),
                _ => (0, el.children.len().saturating_sub(1)),
            };

            let mut parts = Vec::new();
            let has_before = first > 0;
            if has_before {
                parts.push(Node::element(el.kind.clone(), el.children[..first].to_vec()));
            }
            parts.extend(el.children.iter().skip(first).take(last + 1 - first).cloned());
            if last + 1 < el.children.len() {
                parts.push(Node::element(el.kind.clone(), el.children[last + 1..].to_vec()));
            }

            let lift = Lift {
                container: container.clone(),
                first,
                last,
                has_before,
                parts: parts.len(),
            };
            let Some((&ix, parent)) = container.split_last() else {
                continue;
            };
            draft.splice(parent, ix..=ix, parts)?;
            lift.map(&mut draft.selection.anchor);
            lift.map(&mut draft.selection.focus);
        }

        self.apply(draft.into_transaction("engine.unwrap_nodes"))?;
        Ok(())
    }

    fn marks(&self) -> Marks {
        if let Some(marks) = self.marks {
            return marks;
        }
        let leaves = touched_leaves(&self.doc, &self.selection);
        let path = leaves.first().unwrap_or(&self.selection.focus.path);
        self.doc.leaf(path).map(|t| t.marks).unwrap_or_default()
    }

    fn add_mark(&mut self, mark: Mark) -> Result<(), EngineError> {
        if self.selection.is_collapsed() {
            self.marks = Some(self.marks().with(mark, true));
            return Ok(());
        }
        self.set_nodes(NodePatch::Mark { mark, value: true }, &Node::is_text, true)
    }

    fn remove_mark(&mut self, mark: Mark) -> Result<(), EngineError> {
        if self.selection.is_collapsed() {
            self.marks = Some(self.marks().with(mark, false));
            return Ok(());
        }
        self.set_nodes(NodePatch::Mark { mark, value: false }, &Node::is_text, true)
    }
}

impl Editor {
    /// Inserts `text` at the caret, replacing a selected range inside one
    /// block. A range spanning blocks collapses to its start first. Pending
    /// caret marks apply to the inserted text.
    pub fn insert_text(&mut self, text: &str) -> Result<(), EngineError> {
        if text.is_empty() {
            return Ok(());
        }

        let mut draft = Draft::new(self);
        let (start, end) = {
            let (start, end) = draft.selection.edges();
            (start.clone(), end.clone())
        };
        if start != end && start.path[..start.path.len() - 1] == end.path[..end.path.len() - 1] {
            delete_range_in_block(&mut draft, &start, &end)?;
        }
        draft.selection = Selection::collapsed(start.clone());

        let Some(leaf) = draft.doc.leaf(&start.path).cloned() else {
            return Err(ApplyError::InvalidPath(format!("No text at {:?}", start.path)).into());
        };
        let pending = self.marks.filter(|marks| *marks != leaf.marks);

        let caret = match pending {
            None => {
                draft.push(Op::InsertText {
                    path: start.path.clone(),
                    offset: start.offset,
                    text: text.to_string(),
                })?;
                draft.selection.focus.clone()
            }
            Some(marks) if leaf.text.is_empty() => {
                draft.push(Op::SetNode {
                    path: start.path.clone(),
                    patch: NodePatch::Marks { marks },
                })?;
                draft.push(Op::InsertText {
                    path: start.path.clone(),
                    offset: 0,
                    text: text.to_string(),
                })?;
                Point::new(start.path.clone(), text.len())
            }
            Some(marks) => {
                let (ix, parent) = match start.path.split_last() {
                    Some((ix, parent)) => (*ix, parent.to_vec()),
                    None => return Ok(()),
                };
                let at = if start.offset == 0 {
                    ix
                } else if start.offset >= leaf.text.len() {
                    ix + 1
                } else {
                    draft.push(Op::SplitText {
                        path: start.path.clone(),
                        offset: start.offset,
                    })?;
                    ix + 1
                };
                let path = child_path(&parent, at);
                draft.push(Op::InsertNode {
                    path: path.clone(),
                    node: Node::marked(text, marks),
                })?;
                Point::new(path, text.len())
            }
        };

        draft.selection = Selection::collapsed(caret);
        self.apply(draft.into_transaction("editor.insert_text"))?;
        Ok(())
    }
}

fn delete_range_in_block(draft: &mut Draft, start: &Point, end: &Point) -> Result<(), ApplyError> {
    if start.path == end.path {
        return draft.push(Op::RemoveText {
            path: start.path.clone(),
            range: start.offset..end.offset,
        });
    }

    draft.push(Op::RemoveText {
        path: end.path.clone(),
        range: 0..end.offset,
    })?;
    let depth = start.path.len() - 1;
    for ix in (start.path[depth] + 1..end.path[depth]).rev() {
        let mut path = start.path.clone();
        path[depth] = ix;
        draft.push(Op::RemoveNode { path })?;
    }
    let len = draft.doc.leaf(&start.path).map_or(0, |t| t.text.len());
    draft.push(Op::RemoveText {
        path: start.path.clone(),
        range: start.offset..len,
    })
}
