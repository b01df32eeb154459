//! Change notification: views, document listeners and clone fan-out

use std::cell::RefCell;
use std::rc::Rc;

use mindtree::domain::{
    ChangeValue, Document, MindIcon, NodeChangeEvent, NodeChangeListener, NodeProperty, NodeView,
    UserObject,
};
use mindtree::util::testing;
use mindtree::{MapResult, NodeId};
use rstest::{fixture, rstest};

#[ctor::ctor]
fn init() {
    testing::init_test_setup();
}

type Log = Rc<RefCell<Vec<String>>>;

/// Records every callback into a log shared between observers.
struct Recorder {
    name: &'static str,
    log: Log,
    events: RefCell<Vec<NodeChangeEvent>>,
}

impl Recorder {
    fn new(name: &'static str, log: &Log) -> Rc<Self> {
        Rc::new(Self {
            name,
            log: Rc::clone(log),
            events: RefCell::new(Vec::new()),
        })
    }

    fn events(&self) -> Vec<NodeChangeEvent> {
        self.events.borrow().clone()
    }

    fn properties(&self) -> Vec<NodeProperty> {
        self.events.borrow().iter().map(|e| e.property()).collect()
    }
}

impl NodeView for Recorder {
    fn node_changed(&self, event: &NodeChangeEvent) {
        self.log
            .borrow_mut()
            .push(format!("{}:{:?}:{}", self.name, event.property(), event.node()));
        self.events.borrow_mut().push(event.clone());
    }

    fn on_node_inserted(&self, _parent: NodeId, child: NodeId, index: usize) {
        self.log
            .borrow_mut()
            .push(format!("{}:inserted:{}@{}", self.name, child, index));
    }

    fn on_node_deleted(&self, _parent: NodeId, child: NodeId, index: usize) {
        self.log
            .borrow_mut()
            .push(format!("{}:deleted:{}@{}", self.name, child, index));
    }
}

impl NodeChangeListener for Recorder {
    fn node_changed(&self, event: &NodeChangeEvent) {
        NodeView::node_changed(self, event);
    }
}

struct Clones {
    doc: Document,
    root: NodeId,
    a: NodeId,
    a_copy: NodeId,
    log: Log,
}

/// `a` under the root and an attached clone of it next to it.
#[fixture]
fn clones() -> Clones {
    let mut doc = Document::default();
    let root = doc.root();
    let a = doc.create_node("a");
    doc.append(root, a).unwrap();
    let a_copy = doc.clone_node(a).unwrap();
    doc.append(root, a_copy).unwrap();
    Clones {
        doc,
        root,
        a,
        a_copy,
        log: Rc::new(RefCell::new(Vec::new())),
    }
}

// ============================================================
// Clone fan-out
// ============================================================

#[rstest]
fn given_attached_clones_when_text_changes_then_each_view_sees_its_own_node(
    mut clones: Clones,
) -> MapResult<()> {
    let view_a = Recorder::new("a", &clones.log);
    let view_copy = Recorder::new("copy", &clones.log);
    clones.doc.add_view(clones.a, view_a.clone())?;
    clones.doc.add_view(clones.a_copy, view_copy.clone())?;

    clones.doc.set_text(clones.a, "edited")?;

    let seen_a = view_a.events();
    let seen_copy = view_copy.events();
    assert_eq!(seen_a.len(), 1);
    assert_eq!(seen_copy.len(), 1);
    assert_eq!(seen_a[0].node(), clones.a);
    assert_eq!(seen_copy[0].node(), clones.a_copy);
    assert_eq!(seen_copy[0].property(), NodeProperty::Text);
    assert_eq!(
        seen_copy[0].old_value(),
        Some(&ChangeValue::Text("a".to_string()))
    );
    assert_eq!(
        seen_copy[0].new_value(),
        Some(&ChangeValue::Text("edited".to_string()))
    );
    Ok(())
}

#[rstest]
fn given_listener_and_views_when_content_changes_then_listener_precedes_views_per_clone(
    mut clones: Clones,
) -> MapResult<()> {
    let listener = Recorder::new("doc", &clones.log);
    clones.doc.add_node_change_listener(listener.clone());
    clones
        .doc
        .add_view(clones.a, Recorder::new("a", &clones.log))?;
    clones
        .doc
        .add_view(clones.a_copy, Recorder::new("copy", &clones.log))?;

    clones.doc.set_text(clones.a_copy, "x")?;

    let expected = vec![
        format!("doc:Text:{}", clones.a),
        format!("a:Text:{}", clones.a),
        format!("doc:Text:{}", clones.a_copy),
        format!("copy:Text:{}", clones.a_copy),
    ];
    assert_eq!(*clones.log.borrow(), expected);
    assert_eq!(listener.events().len(), 2);
    Ok(())
}

#[rstest]
fn given_unattached_clone_when_content_changes_then_attached_clones_notified(
    mut clones: Clones,
) -> MapResult<()> {
    let loose = clones.doc.clone_node(clones.a)?;
    let view_a = Recorder::new("a", &clones.log);
    let view_loose = Recorder::new("loose", &clones.log);
    clones.doc.add_view(clones.a, view_a.clone())?;
    clones.doc.add_view(loose, view_loose.clone())?;

    clones.doc.set_text(loose, "from loose")?;

    let seen_a = view_a.events();
    assert_eq!(seen_a.len(), 1);
    assert_eq!(seen_a[0].node(), clones.a);
    assert_eq!(seen_a[0].property(), NodeProperty::Text);
    let seen_loose = view_loose.events();
    assert_eq!(seen_loose.len(), 1);
    assert_eq!(seen_loose[0].node(), loose);
    assert_eq!(clones.doc.text(clones.a)?, "from loose");
    Ok(())
}

#[rstest]
fn given_unattached_clone_when_adding_icon_then_each_attached_clone_notified_once(
    mut clones: Clones,
) -> MapResult<()> {
    let loose = clones.doc.clone_node(clones.a)?;
    let listener = Recorder::new("doc", &clones.log);
    clones.doc.add_node_change_listener(listener.clone());

    clones.doc.add_icon(loose, &MindIcon::new("flag"))?;

    let mut notified: Vec<NodeId> = listener.events().iter().map(|e| e.node()).collect();
    notified.sort();
    let mut expected = vec![clones.a, clones.a_copy, loose];
    expected.sort();
    assert_eq!(notified, expected);
    Ok(())
}

#[rstest]
fn given_same_text_when_setting_then_no_event(mut clones: Clones) -> MapResult<()> {
    let view = Recorder::new("a", &clones.log);
    clones.doc.add_view(clones.a, view.clone())?;

    clones.doc.set_text(clones.a, "a")?;

    assert!(view.events().is_empty());
    Ok(())
}

#[rstest]
fn given_unchanged_markup_or_user_object_when_setting_then_no_event_and_history_kept(
    mut clones: Clones,
) -> MapResult<()> {
    clones.doc.set_xml_text(clones.a, "<html>m</html>")?;
    let view = Recorder::new("a", &clones.log);
    clones.doc.add_view(clones.a, view.clone())?;
    let modified = clones.doc.history_information(clones.a)?.last_modified_at();

    clones.doc.set_xml_text(clones.a, "<html>m</html>")?;
    clones
        .doc
        .set_user_object(clones.a, UserObject::Markup("<html>m</html>".into()))?;

    assert!(view.events().is_empty());
    assert_eq!(
        clones.doc.history_information(clones.a)?.last_modified_at(),
        modified
    );

    clones
        .doc
        .set_user_object(clones.a, UserObject::Text("plain".into()))?;
    assert_eq!(view.properties(), vec![NodeProperty::UserObject]);
    Ok(())
}

#[rstest]
fn given_clones_when_folding_then_only_local_views_notified(mut clones: Clones) -> MapResult<()> {
    let listener = Recorder::new("doc", &clones.log);
    let view_a = Recorder::new("a", &clones.log);
    let view_copy = Recorder::new("copy", &clones.log);
    clones.doc.add_node_change_listener(listener.clone());
    clones.doc.add_view(clones.a, view_a.clone())?;
    clones.doc.add_view(clones.a_copy, view_copy.clone())?;

    clones.doc.set_folded(clones.a, true)?;
    clones.doc.set_folded(clones.a, true)?;

    assert_eq!(view_a.properties(), vec![NodeProperty::Folding]);
    assert_eq!(
        view_a.events()[0].new_value(),
        Some(&ChangeValue::Bool(true))
    );
    assert!(view_copy.events().is_empty());
    assert!(listener.events().is_empty());
    Ok(())
}

// ============================================================
// Clone membership events
// ============================================================

#[rstest]
fn given_view_on_node_when_clone_attaches_and_detaches_then_clones_events_fire(
    mut clones: Clones,
) -> MapResult<()> {
    let view_a = Recorder::new("a", &clones.log);
    clones.doc.add_view(clones.a, view_a.clone())?;
    let b = clones.doc.clone_node(clones.a)?;
    assert!(view_a.events().is_empty(), "unattached clones are silent");

    clones.doc.append(clones.root, b)?;
    assert_eq!(view_a.properties(), vec![NodeProperty::Clones]);

    let index = clones
        .doc
        .child_position(clones.root, b)?
        .expect("b is a child of the root");
    clones.doc.remove(clones.root, index)?;
    assert_eq!(
        view_a.properties(),
        vec![NodeProperty::Clones, NodeProperty::Clones]
    );
    Ok(())
}

// ============================================================
// Structural events
// ============================================================

#[rstest]
fn given_view_on_parent_when_inserting_and_removing_then_structural_callbacks_fire(
    mut clones: Clones,
) -> MapResult<()> {
    clones
        .doc
        .add_view(clones.root, Recorder::new("root", &clones.log))?;
    let c = clones.doc.create_node("c");

    clones.doc.insert(clones.root, c, Some(0))?;
    clones.doc.remove(clones.root, 0)?;

    assert_eq!(
        *clones.log.borrow(),
        vec![format!("root:inserted:{}@0", c), format!("root:deleted:{}@0", c)]
    );
    Ok(())
}

#[rstest]
fn given_removed_view_when_content_changes_then_view_is_silent(
    mut clones: Clones,
) -> MapResult<()> {
    let recorder = Recorder::new("a", &clones.log);
    let view: Rc<dyn NodeView> = recorder.clone();
    clones.doc.add_view(clones.a, Rc::clone(&view))?;
    assert!(clones.doc.has_views(clones.a)?);

    assert!(clones.doc.remove_view(clones.a, &view)?);
    assert!(!clones.doc.remove_view(clones.a, &view)?);
    clones.doc.set_text(clones.a, "quiet")?;

    assert!(recorder.events().is_empty());
    assert!(!clones.doc.has_views(clones.a)?);
    Ok(())
}

#[rstest]
fn given_removed_listener_when_content_changes_then_listener_is_silent(
    mut clones: Clones,
) -> MapResult<()> {
    let recorder = Recorder::new("doc", &clones.log);
    let listener: Rc<dyn NodeChangeListener> = recorder.clone();
    clones.doc.add_node_change_listener(Rc::clone(&listener));

    assert!(clones.doc.remove_node_change_listener(&listener));
    clones.doc.set_text(clones.a, "quiet")?;

    assert!(recorder.events().is_empty());
    Ok(())
}
