use quire_core::{
    BlockType, CommandError, Editor, Mark, toggle_block_command_id, toggle_mark_command_id,
};
use serde_json::json;
use tracing::warn;

use crate::render::{RenderNode, Style, Tag};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Control {
    Mark(Mark),
    Block(BlockType),
}

impl Control {
    /// The control name as used by the toolbar: the mark or block type name.
    pub fn name(&self) -> &str {
        match self {
            Control::Mark(mark) => mark.as_str(),
            Control::Block(block) => block.as_str(),
        }
    }

    pub fn from_name(name: &str) -> Option<Control> {
        TOOLBAR.into_iter().find(|control| control.name() == name)
    }

    /// Id of the registry command this control runs.
    pub fn command_id(&self) -> String {
        match self {
            Control::Mark(mark) => toggle_mark_command_id(*mark),
            Control::Block(block) => toggle_block_command_id(block),
        }
    }

    /// Asks the editor's `marks.is_active` / `block.is_active` query. A failed
    /// query reads as inactive.
    pub fn is_active(&self, editor: &Editor) -> bool {
        let (id, args) = match self {
            Control::Mark(mark) => ("marks.is_active", json!({ "mark": mark.as_str() })),
            Control::Block(block) => ("block.is_active", json!({ "type": block.as_str() })),
        };
        editor.run_query::<bool>(id, Some(args)).unwrap_or_else(|err| {
            warn!(control = self.name(), "active-state query failed: {err}");
            false
        })
    }

    pub fn activate(&self, editor: &mut Editor) -> Result<(), CommandError> {
        editor.run_command(&self.command_id(), None)
    }
}

pub const TOOLBAR: [Control; 9] = [
    Control::Mark(Mark::Bold),
    Control::Mark(Mark::Italic),
    Control::Mark(Mark::Underline),
    Control::Mark(Mark::Code),
    Control::Block(BlockType::HeadingOne),
    Control::Block(BlockType::HeadingTwo),
    Control::Block(BlockType::BlockQuote),
    Control::Block(BlockType::NumberedList),
    Control::Block(BlockType::BulletedList),
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ControlState {
    pub control: Control,
    pub active: bool,
}

pub fn control_states(editor: &Editor) -> Vec<ControlState> {
    TOOLBAR
        .into_iter()
        .map(|control| ControlState {
            active: control.is_active(editor),
            control,
        })
        .collect()
}

/// Buttons are black when active, `#ccc` otherwise.
pub fn render_toolbar(states: &[ControlState]) -> RenderNode {
    let buttons = states
        .iter()
        .map(|state| {
            let color = if state.active { "black" } else { "#ccc" };
            RenderNode::styled(
                Tag::Span,
                Style::default().with("color", color),
                vec![RenderNode::Text(state.control.name().to_string())],
            )
            .attr("data-control", state.control.name())
        })
        .collect();
    RenderNode::element(Tag::Div, buttons).attr("class", "toolbar")
}
