use quire_core::format::toggle_mark;
use quire_core::{Document, Editor, Mark, Marks, Node, Point, Selection};

fn caret(editor: &mut Editor, path: &[usize], offset: usize) {
    editor.set_selection(Selection::collapsed(Point::new(path.to_vec(), offset)));
}

#[test]
fn typing_into_an_empty_paragraph() {
    let mut editor = Editor::with_richtext_plugins();

    editor.insert_text("hi").unwrap();

    assert_eq!(editor.doc(), &Document::new(vec![Node::paragraph("hi")]));
    assert_eq!(
        editor.selection(),
        &Selection::collapsed(Point::new(vec![0, 0], 2))
    );
}

#[test]
fn typing_replaces_the_selected_text() {
    let mut editor = Editor::with_document(Document::new(vec![Node::paragraph("hello")]));
    editor.set_selection(Selection::new(
        Point::new(vec![0, 0], 1),
        Point::new(vec![0, 0], 4),
    ));

    editor.insert_text("X").unwrap();

    assert_eq!(editor.doc(), &Document::new(vec![Node::paragraph("hXo")]));
    assert_eq!(
        editor.selection(),
        &Selection::collapsed(Point::new(vec![0, 0], 2))
    );
}

#[test]
fn pending_marks_style_the_first_text_of_an_empty_block() {
    let mut editor = Editor::with_richtext_plugins();

    toggle_mark(&mut editor, Mark::Bold).unwrap();
    editor.insert_text("a").unwrap();

    assert_eq!(
        editor.doc().to_json_string().unwrap(),
        r#"[{"type":"paragraph","children":[{"text":"a","bold":true}]}]"#
    );
}

#[test]
fn pending_marks_split_the_leaf_mid_word() {
    let mut editor = Editor::with_document(Document::new(vec![Node::paragraph("ab")]));
    caret(&mut editor, &[0, 0], 1);

    toggle_mark(&mut editor, Mark::Italic).unwrap();
    editor.insert_text("X").unwrap();

    let texts: Vec<(String, Marks)> = editor
        .doc()
        .leaves()
        .into_iter()
        .map(|(_, leaf)| (leaf.text.clone(), leaf.marks))
        .collect();
    assert_eq!(
        texts,
        vec![
            ("a".to_string(), Marks::default()),
            ("X".to_string(), Marks::default().with(Mark::Italic, true)),
            ("b".to_string(), Marks::default()),
        ]
    );
    assert_eq!(
        editor.selection(),
        &Selection::collapsed(Point::new(vec![0, 1], 1))
    );
}

#[test]
fn moving_the_caret_drops_pending_marks() {
    let mut editor = Editor::with_document(Document::new(vec![Node::paragraph("ab")]));

    toggle_mark(&mut editor, Mark::Underline).unwrap();
    assert!(editor.pending_marks().is_some());

    caret(&mut editor, &[0, 0], 2);
    assert_eq!(editor.pending_marks(), None);

    editor.insert_text("c").unwrap();
    assert_eq!(editor.doc(), &Document::new(vec![Node::paragraph("abc")]));
}
