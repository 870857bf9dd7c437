use quire_core::{
    BlockType, Document, Editor, Mark, Marks, Node, Point, Selection, toggle_block_command_id,
    toggle_mark_command_id,
};

#[test]
fn queries_report_active_formatting() {
    let mut editor = Editor::with_document(Document::new(vec![Node::paragraph("text")]));
    editor.set_selection(Selection::new(
        Point::new(vec![0, 0], 0),
        Point::new(vec![0, 0], 4),
    ));

    editor
        .run_command("marks.toggle", Some(serde_json::json!({ "mark": "underline" })))
        .unwrap();

    let marks = editor.run_query::<Marks>("marks.get_active", None).unwrap();
    assert!(marks.underline);
    assert!(!marks.bold);
    assert!(
        editor
            .run_query::<bool>("marks.is_active", Some(serde_json::json!({ "mark": "underline" })))
            .unwrap()
    );
    assert_eq!(
        editor
            .run_query::<Option<String>>("list.active_type", None)
            .unwrap(),
        None
    );
}

#[test]
fn unknown_ids_and_bad_args_are_errors() {
    let mut editor = Editor::with_richtext_plugins();

    let err = editor.run_command("marks.toggle_sparkle", None).unwrap_err();
    assert_eq!(err.message(), "Unknown command: marks.toggle_sparkle");

    let err = editor
        .run_command("marks.toggle", Some(serde_json::json!({ "mark": "strike" })))
        .unwrap_err();
    assert_eq!(err.message(), "unknown mark: strike");

    assert!(editor.run_query_json("block.is_active", None).is_err());
    assert!(editor.run_query_json("nope", None).is_err());
}

#[test]
fn richtext_registry_exposes_toolbar_commands() {
    let editor = Editor::with_richtext_plugins();
    let mut ids: Vec<&str> = editor.commands().map(|c| c.id.as_str()).collect();
    ids.sort_unstable();

    for id in [
        "marks.toggle_bold",
        "marks.toggle_italic",
        "marks.toggle_underline",
        "marks.toggle_code",
        "block.toggle_heading_one",
        "block.toggle_heading_two",
        "block.toggle_block_quote",
        "block.toggle_numbered_list",
        "block.toggle_bulleted_list",
    ] {
        assert!(ids.binary_search(&id).is_ok(), "missing {id}");
    }
}

#[test]
fn command_ids_follow_the_format_names() {
    assert_eq!(toggle_mark_command_id(Mark::Code), "marks.toggle_code");
    assert_eq!(
        toggle_block_command_id(&BlockType::BlockQuote),
        "block.toggle_block_quote"
    );

    let mut editor = Editor::with_document(Document::new(vec![Node::paragraph("q")]));
    editor
        .run_command(&toggle_block_command_id(&BlockType::BlockQuote), None)
        .unwrap();
    assert_eq!(editor.doc().children[0].kind(), Some(&BlockType::BlockQuote));
}
