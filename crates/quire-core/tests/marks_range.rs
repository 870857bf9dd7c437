use quire_core::format::{is_mark_active, toggle_mark};
use quire_core::{Document, Editor, Mark, Marks, Node, Point, Selection};

fn select(editor: &mut Editor, anchor: (&[usize], usize), focus: (&[usize], usize)) {
    editor.set_selection(Selection::new(
        Point::new(anchor.0.to_vec(), anchor.1),
        Point::new(focus.0.to_vec(), focus.1),
    ));
}

fn leaves(editor: &Editor) -> Vec<(String, Marks)> {
    editor
        .doc()
        .leaves()
        .into_iter()
        .map(|(_, leaf)| (leaf.text.clone(), leaf.marks))
        .collect()
}

#[test]
fn toggling_a_mark_twice_inside_one_leaf_restores_the_document() {
    let original = Document::new(vec![Node::paragraph("hello world")]);

    for mark in Mark::ALL {
        let mut editor = Editor::with_document(original.clone());
        select(&mut editor, (&[0, 0], 0), (&[0, 0], 5));

        toggle_mark(&mut editor, mark).unwrap();
        assert!(is_mark_active(&editor, mark), "{mark} should be active");
        assert_ne!(editor.doc(), &original);

        toggle_mark(&mut editor, mark).unwrap();
        assert!(!is_mark_active(&editor, mark), "{mark} should be inactive");
        assert_eq!(editor.doc(), &original);
    }
}

#[test]
fn bold_command_sets_and_clears_the_flag_on_the_whole_word() {
    let mut editor = Editor::with_document(Document::new(vec![Node::paragraph("hello")]));
    select(&mut editor, (&[0, 0], 0), (&[0, 0], 5));

    editor.run_command("marks.toggle_bold", None).unwrap();
    assert_eq!(
        editor.doc().to_json_string().unwrap(),
        r#"[{"type":"paragraph","children":[{"text":"hello","bold":true}]}]"#
    );

    editor.run_command("marks.toggle_bold", None).unwrap();
    assert_eq!(
        editor.doc().to_json_string().unwrap(),
        r#"[{"type":"paragraph","children":[{"text":"hello"}]}]"#
    );
}

#[test]
fn toggle_splits_leaf_at_selection_edges() {
    let mut editor = Editor::with_document(Document::new(vec![Node::paragraph("abcdef")]));
    select(&mut editor, (&[0, 0], 2), (&[0, 0], 4));

    toggle_mark(&mut editor, Mark::Bold).unwrap();

    let bold = Marks::default().with(Mark::Bold, true);
    assert_eq!(
        leaves(&editor),
        vec![
            ("ab".to_string(), Marks::default()),
            ("cd".to_string(), bold),
            ("ef".to_string(), Marks::default()),
        ]
    );
    assert_eq!(
        editor.selection(),
        &Selection::new(Point::new(vec![0, 1], 0), Point::new(vec![0, 1], 2))
    );
    assert!(is_mark_active(&editor, Mark::Bold));

    select(&mut editor, (&[0, 0], 0), (&[0, 2], 2));
    assert!(!is_mark_active(&editor, Mark::Bold));
}

#[test]
fn backward_selection_formats_the_same_range() {
    let mut editor = Editor::with_document(Document::new(vec![Node::paragraph("abcdef")]));
    select(&mut editor, (&[0, 0], 4), (&[0, 0], 2));

    toggle_mark(&mut editor, Mark::Italic).unwrap();

    let italic = Marks::default().with(Mark::Italic, true);
    assert_eq!(
        leaves(&editor),
        vec![
            ("ab".to_string(), Marks::default()),
            ("cd".to_string(), italic),
            ("ef".to_string(), Marks::default()),
        ]
    );
}

#[test]
fn mark_spanning_leaves_merges_them_back_together() {
    let bold = Marks::default().with(Mark::Bold, true);
    let doc = Document::new(vec![Node::element(
        "paragraph".into(),
        vec![Node::marked("ab", bold), Node::text("cd")],
    )]);
    let mut editor = Editor::with_document(doc);
    select(&mut editor, (&[0, 0], 0), (&[0, 1], 2));

    assert!(!is_mark_active(&editor, Mark::Bold));
    toggle_mark(&mut editor, Mark::Bold).unwrap();

    assert_eq!(leaves(&editor), vec![("abcd".to_string(), bold)]);
    assert_eq!(
        editor.selection(),
        &Selection::new(Point::new(vec![0, 0], 0), Point::new(vec![0, 0], 4))
    );
    assert!(is_mark_active(&editor, Mark::Bold));
}

#[test]
fn range_ending_at_start_of_next_leaf_does_not_touch_it() {
    let code = Marks::default().with(Mark::Code, true);
    let doc = Document::new(vec![Node::element(
        "paragraph".into(),
        vec![Node::marked("ab", code), Node::text("cd")],
    )]);
    let mut editor = Editor::with_document(doc);
    select(&mut editor, (&[0, 0], 0), (&[0, 1], 0));

    assert!(is_mark_active(&editor, Mark::Code));
}

#[test]
fn caret_toggle_applies_to_next_typed_text() {
    let mut editor = Editor::with_document(Document::new(vec![Node::paragraph("hello")]));
    select(&mut editor, (&[0, 0], 5), (&[0, 0], 5));

    editor.run_command("marks.toggle_bold", None).unwrap();
    assert_eq!(leaves(&editor), vec![("hello".to_string(), Marks::default())]);
    assert!(is_mark_active(&editor, Mark::Bold));

    editor.insert_text(" world").unwrap();

    let bold = Marks::default().with(Mark::Bold, true);
    assert_eq!(
        leaves(&editor),
        vec![
            ("hello".to_string(), Marks::default()),
            (" world".to_string(), bold),
        ]
    );
    assert_eq!(
        editor.selection(),
        &Selection::collapsed(Point::new(vec![0, 1], 6))
    );
    assert!(is_mark_active(&editor, Mark::Bold));
}
