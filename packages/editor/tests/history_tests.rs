//! Undo/redo and batching

use quire_editor::{Document, DocumentConfig, DEFAULT_CONFIG_NAME};
use quire_model::{Element, Node, Operation, Path, Point, Range};
use serde_json::json;

fn paragraph(text: &str) -> Node {
    Element::typed("paragraph", vec![Node::text(text)]).into()
}

fn paragraphs(texts: &[&str]) -> Document {
    Document::new(Element::new(texts.iter().map(|text| paragraph(text)).collect()))
}

fn insert(path: impl Into<Path>, offset: usize, text: &str) -> Operation {
    Operation::InsertText {
        path: path.into(),
        offset,
        text: text.into(),
    }
}

#[test]
fn test_undo_redo_sequence() -> anyhow::Result<()> {
    let mut doc = paragraphs(&["one"]);
    doc.apply(insert([0, 0], 3, " two"))?;
    doc.apply(insert([0, 0], 7, " three"))?;
    assert_eq!(doc.history().undo_levels(), 2);

    assert!(doc.undo()?);
    assert_eq!(doc.root().string(), "one two");
    assert!(doc.undo()?);
    assert_eq!(doc.root().string(), "one");
    assert!(!doc.undo()?);

    assert!(doc.redo()?);
    assert!(doc.redo()?);
    assert_eq!(doc.root().string(), "one two three");
    assert!(!doc.history().can_redo());
    Ok(())
}

#[test]
fn test_new_edit_clears_redo() -> anyhow::Result<()> {
    let mut doc = paragraphs(&["one"]);
    doc.apply(insert([0, 0], 3, "!"))?;
    doc.undo()?;
    assert!(doc.history().can_redo());

    doc.apply(insert([0, 0], 0, "> "))?;
    assert!(!doc.history().can_redo());
    assert_eq!(doc.root().string(), "> one");
    Ok(())
}

#[test]
fn test_batch_is_one_step() -> anyhow::Result<()> {
    let mut doc = paragraphs(&["one", "two"]);
    doc.apply_batch(vec![
        Operation::RemoveNode {
            path: Path::from([1]),
            node: paragraph("two"),
        },
        insert([0, 0], 3, " and two"),
    ])?;
    assert_eq!(doc.history().undo_levels(), 1);

    doc.undo()?;
    assert_eq!(doc.root(), paragraphs(&["one", "two"]).root());
    Ok(())
}

#[test]
fn test_without_normalizing_is_one_step() -> anyhow::Result<()> {
    let mut doc = paragraphs(&["one"]);
    doc.without_normalizing(|doc| -> anyhow::Result<()> {
        doc.apply(insert([0, 0], 0, "a"))?;
        doc.apply(insert([0, 0], 0, "b"))?;
        doc.apply(Operation::InsertNode {
            path: Path::from([1]),
            node: paragraph("two"),
        })?;
        Ok(())
    })?;
    assert_eq!(doc.history().undo_levels(), 1);

    doc.undo()?;
    assert_eq!(doc.root().string(), "one");
    Ok(())
}

#[test]
fn test_undo_inside_scope_reverts_the_open_step() -> anyhow::Result<()> {
    let mut doc = paragraphs(&["one"]);
    doc.apply(insert([0, 0], 0, "X"))?;

    doc.without_normalizing(|doc| -> anyhow::Result<()> {
        doc.apply(insert([0, 0], 4, "Y"))?;
        assert!(doc.undo()?);
        assert_eq!(doc.root().string(), "Xone");
        Ok(())
    })?;
    assert_eq!(doc.history().undo_levels(), 1);
    assert_eq!(doc.history().redo_levels(), 1);

    assert!(doc.undo()?);
    assert_eq!(doc.root().string(), "one");
    assert!(doc.redo()?);
    assert!(doc.redo()?);
    assert_eq!(doc.root().string(), "XoneY");
    Ok(())
}

#[test]
fn test_redo_inside_scope_keeps_later_edits_undoable() -> anyhow::Result<()> {
    let mut doc = paragraphs(&["one"]);
    doc.apply(insert([0, 0], 3, "!"))?;
    doc.undo()?;

    doc.without_normalizing(|doc| -> anyhow::Result<()> {
        assert!(doc.redo()?);
        doc.apply(insert([0, 0], 0, "> "))?;
        Ok(())
    })?;
    assert_eq!(doc.root().string(), "> one!");
    assert_eq!(doc.history().undo_levels(), 2);

    doc.undo()?;
    assert_eq!(doc.root().string(), "one!");
    doc.undo()?;
    assert_eq!(doc.root().string(), "one");
    Ok(())
}

#[test]
fn test_labelled_scope_names_the_step() -> anyhow::Result<()> {
    let mut doc = paragraphs(&["one"]);
    doc.labelled("Shout", |doc| doc.apply(insert([0, 0], 3, "!")))?;
    assert_eq!(doc.history().undo_description(), Some("Shout"));

    doc.undo()?;
    assert_eq!(doc.history().undo_description(), None);
    assert_eq!(doc.history().redo_description(), Some("Shout"));
    Ok(())
}

#[test]
fn test_undo_restores_removed_selection() -> anyhow::Result<()> {
    let mut doc = paragraphs(&["one", "two"]);
    let caret = Range::collapsed(Point::new([1, 0], 2));
    doc.select(caret.clone())?;

    doc.apply(Operation::RemoveNode {
        path: Path::from([1]),
        node: paragraph("two"),
    })?;
    assert_eq!(doc.selection(), Some(&Range::collapsed(Point::new([0, 0], 3))));

    doc.undo()?;
    assert_eq!(doc.selection(), Some(&caret));
    assert_eq!(doc.root().string(), "onetwo");
    Ok(())
}

#[test]
fn test_selection_changes_are_not_recorded() -> anyhow::Result<()> {
    let mut doc = paragraphs(&["one"]);
    doc.select(Range::collapsed(Point::new([0, 0], 0)))?;
    doc.select(Range::collapsed(Point::new([0, 0], 2)))?;
    assert!(!doc.history().can_undo());
    assert_eq!(doc.operations().len(), 2);
    Ok(())
}

#[test]
fn test_history_can_be_disabled() -> anyhow::Result<()> {
    let config = DocumentConfig {
        history: false,
        record_operations: false,
        ..DocumentConfig::default()
    };
    let mut doc = Document::with_config(Element::new(vec![paragraph("one")]), config);
    doc.apply(insert([0, 0], 3, "!"))?;

    assert!(!doc.history().can_undo());
    assert!(!doc.undo()?);
    assert!(doc.operations().is_empty());
    assert_eq!(doc.version(), 1);
    Ok(())
}

#[test]
fn test_max_undo_levels_from_config() -> anyhow::Result<()> {
    let config = DocumentConfig::from_json(r#"{ "maxUndoLevels": 2 }"#)?;
    let mut doc = Document::with_config(Element::new(vec![paragraph("")]), config);
    for (offset, text) in ["a", "b", "c"].into_iter().enumerate() {
        doc.apply(insert([0, 0], offset, text))?;
    }
    assert_eq!(doc.history().undo_levels(), 2);

    doc.undo()?;
    doc.undo()?;
    assert_eq!(doc.root().string(), "a");
    Ok(())
}

#[test]
fn test_config_loaded_from_directory() -> anyhow::Result<()> {
    let dir = std::env::temp_dir().join(format!("quire-history-{}", std::process::id()));
    std::fs::create_dir_all(&dir)?;
    std::fs::write(
        dir.join(DEFAULT_CONFIG_NAME),
        json!({ "history": false }).to_string(),
    )?;

    let config = DocumentConfig::load(&dir)?;
    std::fs::remove_dir_all(&dir)?;

    assert!(!config.history);
    assert_eq!(config.max_undo_levels, 100);
    Ok(())
}
