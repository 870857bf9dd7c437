//! Mark and block formatting commands, written against [`EditorEngine`].

use tracing::debug;

use crate::core::{BlockType, Mark, Node, NodePatch};
use crate::engine::{EditorEngine, EngineError, MatchMode};

/// True when every leaf the selection touches carries `mark`. At a collapsed
/// caret the engine's current marks decide.
pub fn is_mark_active<E: EditorEngine + ?Sized>(engine: &E, mark: Mark) -> bool {
    if engine.selection().is_collapsed() {
        return engine.marks().get(mark);
    }
    let has_mark = |node: &Node| matches!(node, Node::Text(t) if t.marks.get(mark));
    !engine.nodes(&has_mark, MatchMode::Universal).is_empty()
}

pub fn toggle_mark<E: EditorEngine + ?Sized>(engine: &mut E, mark: Mark) -> Result<(), EngineError> {
    let active = is_mark_active(engine, mark);
    debug!(%mark, active, "toggle mark");

    if engine.selection().is_collapsed() {
        return if active {
            engine.remove_mark(mark)
        } else {
            engine.add_mark(mark)
        };
    }
    engine.set_nodes(
        NodePatch::Mark {
            mark,
            value: !active,
        },
        &Node::is_text,
        true,
    )
}

/// True when any node the selection touches, containers included, has type `block`.
pub fn is_block_active<E: EditorEngine + ?Sized>(engine: &E, block: &BlockType) -> bool {
    let is_kind = |node: &Node| node.kind() == Some(block);
    !engine.nodes(&is_kind, MatchMode::Existential).is_empty()
}

pub fn toggle_block<E: EditorEngine + ?Sized>(
    engine: &mut E,
    block: &BlockType,
) -> Result<(), EngineError> {
    let active = is_block_active(engine, block);
    let is_list = block.is_list();
    debug!(%block, active, "toggle block");

    let in_list = |node: &Node| node.kind().is_some_and(BlockType::is_list);
    engine.unwrap_nodes(&in_list, true)?;

    let kind = if active {
        BlockType::Paragraph
    } else if is_list {
        BlockType::ListItem
    } else {
        block.clone()
    };
    engine.set_nodes(NodePatch::Kind { kind }, &Node::is_text_block, false)?;

    if !active && is_list {
        engine.wrap_nodes(block.clone(), &Node::is_text_block)?;
    }
    Ok(())
}

/// The list container type enclosing the selection, if any.
pub fn active_list_type<E: EditorEngine + ?Sized>(engine: &E) -> Option<BlockType> {
    let in_list = |node: &Node| node.kind().is_some_and(BlockType::is_list);
    engine
        .nodes(&in_list, MatchMode::Existential)
        .into_iter()
        .find_map(|(_, node)| node.kind().cloned())
}
