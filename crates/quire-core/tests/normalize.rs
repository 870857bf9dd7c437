use quire_core::{BlockType, Document, Editor, Mark, Marks, Node, PluginRegistry, Point, Selection};

fn normalized(doc: Document) -> Document {
    let start = Selection::collapsed(Point::new(vec![0, 0], 0));
    Editor::new(doc, start, PluginRegistry::core()).doc().clone()
}

#[test]
fn empty_document_gets_an_empty_paragraph() {
    assert_eq!(normalized(Document::default()), Document::empty_paragraph());
}

#[test]
fn adjacent_leaves_with_equal_marks_merge() {
    let italic = Marks::default().with(Mark::Italic, true);
    let doc = Document::new(vec![Node::element(
        BlockType::Paragraph,
        vec![
            Node::marked("a", italic),
            Node::marked("b", italic),
            Node::text("c"),
            Node::text("d"),
        ],
    )]);

    assert_eq!(
        normalized(doc),
        Document::new(vec![Node::element(
            BlockType::Paragraph,
            vec![Node::marked("ab", italic), Node::text("cd")],
        )])
    );
}

#[test]
fn empty_leaves_are_absorbed_by_neighbours() {
    let bold = Marks::default().with(Mark::Bold, true);
    let doc = Document::new(vec![Node::element(
        BlockType::Paragraph,
        vec![Node::text(""), Node::marked("x", bold), Node::text("")],
    )]);

    assert_eq!(
        normalized(doc),
        Document::new(vec![Node::element(
            BlockType::Paragraph,
            vec![Node::marked("x", bold)],
        )])
    );
}

#[test]
fn childless_block_gets_a_text_leaf() {
    let doc = Document::new(vec![Node::element(BlockType::HeadingOne, Vec::new())]);

    assert_eq!(
        normalized(doc),
        Document::new(vec![Node::element(
            BlockType::HeadingOne,
            vec![Node::text("")],
        )])
    );
}

#[test]
fn empty_list_containers_are_removed() {
    let doc = Document::new(vec![
        Node::paragraph("a"),
        Node::element(BlockType::BulletedList, Vec::new()),
    ]);

    assert_eq!(
        normalized(doc),
        Document::new(vec![Node::paragraph("a")])
    );
}

#[test]
fn list_children_become_list_items() {
    let doc = Document::from_json_str(
        r#"[{"type":"numbered-list","children":[
            {"type":"paragraph","children":[{"text":"p"}]},
            {"text":"bare"},
            {"type":"bulleted-list","children":[{"type":"list-item","children":[{"text":"nested"}]}]}
        ]}]"#,
    )
    .unwrap();

    assert_eq!(
        normalized(doc).to_json_string().unwrap(),
        r#"[{"type":"numbered-list","children":[{"type":"list-item","children":[{"text":"p"}]},{"type":"list-item","children":[{"text":"bare"}]},{"type":"list-item","children":[{"text":"nested"}]}]}]"#
    );
}

#[test]
fn selection_is_clamped_onto_an_existing_leaf() {
    let doc = Document::new(vec![Node::paragraph("abc")]);
    let far = Selection::collapsed(Point::new(vec![4, 2], 99));
    let editor = Editor::new(doc, far, PluginRegistry::core());

    assert_eq!(
        editor.selection(),
        &Selection::collapsed(Point::new(vec![0, 0], 3))
    );
}

#[test]
fn root_leaves_are_wrapped_in_paragraphs() {
    let doc = Document::new(vec![
        Node::text("a"),
        Node::text("b"),
        Node::paragraph("mid"),
        Node::text("stray"),
    ]);

    assert_eq!(
        normalized(doc),
        Document::new(vec![
            Node::paragraph("ab"),
            Node::paragraph("mid"),
            Node::paragraph("stray"),
        ])
    );
}
