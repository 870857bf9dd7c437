use std::fmt::Display;

use quire_core::{Document, Editor, Selection, toggle_mark_command_id};
use tracing::{debug, warn};

use crate::hotkeys::{KeyEvent, KeyOutcome, mark_for_event};
use crate::render::{PLACEHOLDER, document_to_html, is_blank, render_placeholder};
use crate::storage::{FlatStore, load, save};
use crate::toolbar::{Control, ControlState, control_states, render_toolbar};

/// One editing session: the editor state plus the store it persists to.
/// Every event that changes the document rewrites the stored copy.
pub struct Session<S: FlatStore> {
    editor: Editor,
    store: S,
    key: String,
}

impl<S: FlatStore> Session<S> {
    pub fn open(store: S, key: impl Into<String>) -> Self {
        let key = key.into();
        let doc = load(&store, &key);
        debug!(key = %key, blocks = doc.children.len(), "session opened");
        Self {
            editor: Editor::with_document(doc),
            store,
            key,
        }
    }

    pub fn editor(&self) -> &Editor {
        &self.editor
    }

    pub fn document(&self) -> &Document {
        self.editor.doc()
    }

    pub fn selection(&self) -> &Selection {
        self.editor.selection()
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn select(&mut self, selection: Selection) {
        self.editor.set_selection(selection);
    }

    pub fn handle_key(&mut self, event: &KeyEvent) -> KeyOutcome {
        let Some(mark) = mark_for_event(event) else {
            return KeyOutcome::Ignored;
        };
        let id = toggle_mark_command_id(mark);
        self.run(&id, |editor| editor.run_command(&id, None));
        KeyOutcome::Handled
    }

    pub fn click(&mut self, control: &Control) {
        self.run(&control.command_id(), |editor| control.activate(editor));
    }

    pub fn type_text(&mut self, text: &str) {
        self.run("insert_text", |editor| editor.insert_text(text));
    }

    /// Replaces the document with the empty default and stores it.
    pub fn reset(&mut self) {
        self.editor = Editor::with_document(Document::empty_paragraph());
        self.persist();
    }

    pub fn toolbar(&self) -> Vec<ControlState> {
        control_states(&self.editor)
    }

    pub fn render_html(&self) -> String {
        let doc = self.editor.doc();
        let mut html = render_toolbar(&self.toolbar()).to_html();
        if is_blank(doc) {
            html.push_str(&render_placeholder(PLACEHOLDER).to_html());
        }
        html.push_str(&document_to_html(doc));
        html
    }

    /// Ends the session, handing back the store.
    pub fn close(self) -> S {
        debug!(key = %self.key, "session closed");
        self.store
    }

    fn run<E: Display>(&mut self, what: &str, f: impl FnOnce(&mut Editor) -> Result<(), E>) {
        let before = self.editor.doc().clone();
        if let Err(err) = f(&mut self.editor) {
            warn!(command = what, "command failed: {err}");
        }
        if self.editor.doc() != &before {
            self.persist();
        }
    }

    fn persist(&mut self) {
        if let Err(err) = save(&mut self.store, &self.key, self.editor.doc()) {
            warn!(key = %self.key, "failed to save document: {err}");
        }
    }
}
