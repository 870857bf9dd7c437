use quire_core::format::{is_block_active, toggle_block};
use quire_core::{BlockType, Document, Editor, Node, Point, Selection};

fn kinds(editor: &Editor) -> Vec<BlockType> {
    editor
        .doc()
        .children
        .iter()
        .filter_map(|node| node.kind().cloned())
        .collect()
}

#[test]
fn block_toggled_twice_lands_on_paragraph() {
    for block in [
        BlockType::HeadingOne,
        BlockType::HeadingTwo,
        BlockType::BlockQuote,
        BlockType::Code,
    ] {
        let mut editor = Editor::with_document(Document::new(vec![Node::paragraph("title")]));

        toggle_block(&mut editor, &block).unwrap();
        assert_eq!(kinds(&editor), vec![block.clone()]);
        assert!(is_block_active(&editor, &block));

        toggle_block(&mut editor, &block).unwrap();
        assert_eq!(kinds(&editor), vec![BlockType::Paragraph]);
        assert!(!is_block_active(&editor, &block));
    }
}

#[test]
fn block_commands_dispatch_by_id() {
    let mut editor = Editor::with_document(Document::new(vec![Node::paragraph("quote me")]));

    editor.run_command("block.toggle_block_quote", None).unwrap();
    assert_eq!(
        editor.doc().to_json_string().unwrap(),
        r#"[{"type":"block-quote","children":[{"text":"quote me"}]}]"#
    );
    assert!(
        editor
            .run_query::<bool>(
                "block.is_active",
                Some(serde_json::json!({ "type": "block-quote" }))
            )
            .unwrap()
    );

    editor
        .run_command(
            "block.toggle",
            Some(serde_json::json!({ "type": "heading-two" })),
        )
        .unwrap();
    assert_eq!(kinds(&editor), vec![BlockType::HeadingTwo]);
}

#[test]
fn heading_applies_to_every_selected_block() {
    let doc = Document::new(vec![
        Node::paragraph("one"),
        Node::paragraph("two"),
        Node::paragraph("three"),
    ]);
    let mut editor = Editor::with_document(doc);
    editor.set_selection(Selection::new(
        Point::new(vec![0, 0], 1),
        Point::new(vec![1, 0], 2),
    ));

    toggle_block(&mut editor, &BlockType::HeadingOne).unwrap();

    assert_eq!(
        kinds(&editor),
        vec![
            BlockType::HeadingOne,
            BlockType::HeadingOne,
            BlockType::Paragraph
        ]
    );
}

#[test]
fn unknown_block_type_is_kept_until_toggled() {
    let doc = Document::from_json_str(r#"[{"type":"callout","children":[{"text":"hi"}]}]"#).unwrap();
    let mut editor = Editor::with_document(doc);

    assert!(is_block_active(
        &editor,
        &BlockType::Other("callout".to_string())
    ));
    toggle_block(&mut editor, &BlockType::HeadingTwo).unwrap();
    assert_eq!(kinds(&editor), vec![BlockType::HeadingTwo]);
}
