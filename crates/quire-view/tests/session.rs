use quire_core::{Point, Selection};
use quire_view::{
    Control, FlatStore, KeyEvent, KeyOutcome, MemoryStore, Modifiers, Session, StoreError,
};

fn select_all_of_first_leaf(session: &mut Session<MemoryStore>, len: usize) {
    session.select(Selection::new(
        Point::new(vec![0, 0], 0),
        Point::new(vec![0, 0], len),
    ));
}

#[test]
fn typing_and_hotkeys_persist_after_every_change() {
    let mut session = Session::open(MemoryStore::new(), "content");
    assert_eq!(session.store().get("content").unwrap(), None);

    session.type_text("hello");
    assert_eq!(
        session.store().get("content").unwrap().as_deref(),
        Some(r#"[{"type":"paragraph","children":[{"text":"hello"}]}]"#)
    );

    select_all_of_first_leaf(&mut session, 5);
    let outcome = session.handle_key(&KeyEvent::new('b', Modifiers::cmd()));
    assert_eq!(outcome, KeyOutcome::Handled);
    assert_eq!(
        session.store().get("content").unwrap().as_deref(),
        Some(r#"[{"type":"paragraph","children":[{"text":"hello","bold":true}]}]"#)
    );

    let outcome = session.handle_key(&KeyEvent::new('q', Modifiers::cmd()));
    assert_eq!(outcome, KeyOutcome::Ignored);
}

#[test]
fn reopening_restores_the_saved_document() {
    let mut session = Session::open(MemoryStore::new(), "content");
    session.type_text("kept");
    session.click(&Control::from_name("heading-two").unwrap());

    let store = session.close();
    let reopened = Session::open(store, "content");

    assert_eq!(
        reopened.render_html().split("</div>").nth(1),
        Some("<h2 style=\"color: #555\"><span>kept</span></h2>")
    );
}

#[test]
fn toolbar_reflects_the_selection() {
    let mut session = Session::open(MemoryStore::new(), "content");
    session.type_text("item");
    session.click(&Control::from_name("numbered-list").unwrap());

    let states = session.toolbar();
    let active: Vec<&str> = states
        .iter()
        .filter(|state| state.active)
        .map(|state| state.control.name())
        .collect();
    assert_eq!(active, vec!["numbered-list"]);

    let names: Vec<String> = session
        .toolbar()
        .iter()
        .map(|state| state.control.name().to_string())
        .collect();
    assert_eq!(
        names,
        [
            "bold",
            "italic",
            "underline",
            "code",
            "heading-one",
            "heading-two",
            "block-quote",
            "numbered-list",
            "bulleted-list",
        ]
    );
}

struct BrokenStore;

impl FlatStore for BrokenStore {
    fn get(&self, _key: &str) -> Result<Option<String>, StoreError> {
        Err(StoreError::InvalidKey("broken".to_string()))
    }

    fn set(&mut self, _key: &str, _value: &str) -> Result<(), StoreError> {
        Err(StoreError::InvalidKey("broken".to_string()))
    }
}

#[test]
fn store_failures_do_not_interrupt_editing() {
    let mut session = Session::open(BrokenStore, "content");
    session.type_text("still works");

    assert_eq!(
        session.document().to_json_string().unwrap(),
        r#"[{"type":"paragraph","children":[{"text":"still works"}]}]"#
    );
}

#[test]
fn reset_stores_the_empty_document() {
    let mut session = Session::open(MemoryStore::new(), "content");
    session.type_text("gone soon");
    session.reset();

    assert_eq!(
        session.store().get("content").unwrap().as_deref(),
        Some(r#"[{"type":"paragraph","children":[{"text":""}]}]"#)
    );
}

#[test]
fn blank_document_shows_the_placeholder() {
    let mut session = Session::open(MemoryStore::new(), "content");
    let placeholder = "<span data-placeholder=\"true\" style=\"pointer-events: none; opacity: 0.333\">Enter some text here...</span>";
    assert!(session.render_html().contains(placeholder));

    session.type_text("x");
    assert!(!session.render_html().contains("data-placeholder"));
}
