//! Shared content: text, markup, icons, extensions and history

use chrono::{TimeZone, Utc};
use mindtree::domain::{Document, HistoryInformation, MindIcon, UserObject};
use mindtree::util::testing;
use mindtree::{MapError, MapResult, NodeId};
use rstest::{fixture, rstest};

#[ctor::ctor]
fn init() {
    testing::init_test_setup();
}

/// A node under the root plus a detached clone of it.
struct Pair {
    doc: Document,
    node: NodeId,
    copy: NodeId,
}

#[fixture]
fn pair() -> Pair {
    let mut doc = Document::default();
    let root = doc.root();
    let node = doc.create_node("node");
    doc.append(root, node).unwrap();
    let copy = doc.clone_node(node).unwrap();
    Pair { doc, node, copy }
}

// ============================================================
// Text
// ============================================================

#[rstest]
fn given_markup_text_when_setting_then_plain_text_is_derived(mut pair: Pair) -> MapResult<()> {
    pair.doc.set_text(pair.node, "<html><body>Tom &amp; Jerry</body></html>")?;

    assert_eq!(
        pair.doc.xml_text(pair.copy)?,
        Some("<html><body>Tom &amp; Jerry</body></html>")
    );
    assert_eq!(pair.doc.plain_text(pair.copy)?, "Tom & Jerry");

    pair.doc.set_text(pair.copy, "plain again")?;
    assert_eq!(pair.doc.xml_text(pair.node)?, None);
    assert_eq!(pair.doc.plain_text(pair.node)?, "plain again");
    Ok(())
}

#[rstest]
fn given_user_object_when_setting_then_text_follows(mut pair: Pair) -> MapResult<()> {
    pair.doc
        .set_user_object(pair.node, UserObject::Markup("<html>m</html>".into()))?;

    assert_eq!(pair.doc.text(pair.copy)?, "<html>m</html>");
    assert_eq!(pair.doc.xml_text(pair.copy)?, Some("<html>m</html>"));
    assert_eq!(
        pair.doc.user_object(pair.copy)?,
        &UserObject::Markup("<html>m</html>".into())
    );

    pair.doc.set_xml_text(pair.copy, "<html>n</html>")?;
    assert_eq!(pair.doc.plain_text(pair.node)?, "n");
    Ok(())
}

// ============================================================
// Icons
// ============================================================

#[rstest]
fn given_icons_when_adding_and_removing_then_counts_are_reported(mut pair: Pair) -> MapResult<()> {
    pair.doc.add_icon(pair.node, &MindIcon::new("flag"))?;
    pair.doc.add_icon(pair.node, &MindIcon::new("star"))?;
    pair.doc.add_icon_at(pair.copy, &MindIcon::new("idea"), 0)?;

    let names: Vec<&str> = pair.doc.icons(pair.node)?.iter().map(MindIcon::name).collect();
    assert_eq!(names, vec!["idea", "flag", "star"]);
    assert_eq!(pair.doc.icon(pair.copy, 1)?, Some(&MindIcon::new("flag")));
    assert_eq!(pair.doc.icon(pair.copy, 3)?, None);

    assert_eq!(pair.doc.remove_icon_at(pair.node, 0)?, 2);
    assert_eq!(pair.doc.remove_icon(pair.copy)?, 1);
    assert_eq!(pair.doc.icons(pair.node)?, &[MindIcon::new("flag")]);
    assert_eq!(pair.doc.remove_icon(pair.node)?, 0);
    assert_eq!(pair.doc.remove_icon(pair.node)?, 0, "removing from none is a no-op");
    Ok(())
}

#[rstest]
fn given_icon_positions_out_of_range_when_mutating_then_index_errors(mut pair: Pair) {
    let result = pair.doc.add_icon_at(pair.node, &MindIcon::new("flag"), 1);
    assert_eq!(result, Err(MapError::IndexOutOfRange { index: 1, len: 0 }));

    let result = pair.doc.remove_icon_at(pair.node, 0);
    assert_eq!(result, Err(MapError::IndexOutOfRange { index: 0, len: 0 }));
}

#[rstest]
fn given_same_icon_on_many_nodes_when_adding_then_registry_interns_once(
    mut pair: Pair,
) -> MapResult<()> {
    let other = pair.doc.create_node("other");
    pair.doc.add_icon(pair.node, &MindIcon::new("flag"))?;
    pair.doc.add_icon(other, &MindIcon::new("flag"))?;
    pair.doc.add_icon(other, &MindIcon::new("star"))?;

    let registry = pair.doc.icon_registry();
    assert_eq!(registry.len(), 2);
    assert!(registry.contains("flag"));
    assert!(!registry.contains("idea"));
    Ok(())
}

// ============================================================
// Extensions
// ============================================================

#[derive(Debug, PartialEq)]
struct Attribute {
    name: &'static str,
    value: i32,
}

#[derive(Debug, PartialEq)]
struct Link(&'static str);

#[rstest]
fn given_extensions_when_mutating_through_clone_then_shared(mut pair: Pair) -> MapResult<()> {
    pair.doc.add_extension(
        pair.node,
        Attribute {
            name: "priority",
            value: 1,
        },
    )?;
    pair.doc.add_extension(pair.copy, Link("https://example.org"))?;

    assert!(pair.doc.contains_extension::<Attribute>(pair.copy)?);
    assert_eq!(
        pair.doc.extension::<Link>(pair.node)?,
        Some(&Link("https://example.org"))
    );

    let duplicate = pair.doc.add_extension(pair.copy, Link("other"));
    assert!(matches!(duplicate, Err(MapError::ExtensionAlreadyPresent(_))));

    let old = pair.doc.put_extension(
        pair.copy,
        Attribute {
            name: "priority",
            value: 2,
        },
    )?;
    assert_eq!(old.map(|a| a.value), Some(1));
    assert_eq!(
        pair.doc
            .extension::<Attribute>(pair.node)?
            .map(|a| (a.name, a.value)),
        Some(("priority", 2))
    );

    assert_eq!(
        pair.doc.remove_extension::<Link>(pair.node)?,
        Some(Link("https://example.org"))
    );
    assert_eq!(pair.doc.remove_extension::<Link>(pair.node)?, None);
    assert!(!pair.doc.contains_extension::<Link>(pair.copy)?);
    Ok(())
}

// ============================================================
// History
// ============================================================

#[rstest]
fn given_history_when_replacing_then_clones_share_it(mut pair: Pair) -> MapResult<()> {
    let created = Utc.with_ymd_and_hms(2020, 1, 2, 3, 4, 5).unwrap();
    let modified = Utc.with_ymd_and_hms(2021, 6, 7, 8, 9, 10).unwrap();

    pair.doc
        .set_history_information(pair.node, HistoryInformation::with_times(created, modified))?;

    let history = pair.doc.history_information(pair.copy)?;
    assert_eq!(history.created_at(), created);
    assert_eq!(history.last_modified_at(), modified);
    Ok(())
}

#[rstest]
fn given_text_edit_when_recording_history_then_modification_time_advances(
    mut pair: Pair,
) -> MapResult<()> {
    let created = Utc.with_ymd_and_hms(2020, 1, 2, 3, 4, 5).unwrap();
    pair.doc
        .set_history_information(pair.node, HistoryInformation::with_times(created, created))?;

    pair.doc.set_text(pair.node, "edited")?;

    let history = pair.doc.history_information(pair.node)?;
    assert_eq!(history.created_at(), created);
    assert!(history.last_modified_at() > created);
    Ok(())
}

