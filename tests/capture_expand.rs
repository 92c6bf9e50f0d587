//! Capture/expand behaviour of the cache engine over realistic value graphs.

mod common;

use common::{full, here, init_logging, mode_id, text};
use pretty_assertions::assert_eq;
use viewgraph::assemble::{DagBuilder, GridBuilder, NodeOptions, SequenceBuilder};
use viewgraph::{
    AssembleError, Attr, CacheEngine, Child, DispatchError, EngineConfig, EngineError, Heap,
    SliceEntry, SnapshotId, Value, View, ViewContext, ViewId, ViewKindTag, Visualize,
};

#[test]
fn self_referencing_list_resolves_to_its_own_id() {
    init_logging();
    let mut heap = Heap::new();
    let list = heap.list([]);
    heap.push(list, list);

    let mut engine = CacheEngine::default();
    let root = engine.capture(&heap, list, here(1)).unwrap();

    let slice = engine.expand(&root).unwrap();
    let full_mode = mode_id(&full(&slice, &root), "full");
    let elements = engine.expand(&full_mode).unwrap();
    let sequence = full(&elements, &full_mode);

    let element = sequence
        .cells()
        .unwrap()
        .iter()
        .find(|cell| cell.name == "0")
        .map(|cell| cell.view.clone())
        .unwrap();
    assert_eq!(element, root);
    assert!(matches!(elements.entries[&root], SliceEntry::Compact(_)));
}

#[test]
fn mutually_referencing_dicts_terminate() {
    let mut heap = Heap::new();
    let a = heap.dict([]);
    let b = heap.dict([]);
    let key = heap.str("other");
    heap.insert(a, key, b);
    heap.insert(b, key, a);

    let mut engine = CacheEngine::default();
    let root = engine.capture(&heap, a, here(2)).unwrap();
    let b_id = ViewId::for_value(b, root.snapshot());
    let b_entry = engine.entry(&b_id).unwrap();

    let b_full = engine.entry(&b_entry.refs[0]).unwrap();
    assert!(b_full.refs.contains(&root));
}

#[test]
fn expand_is_idempotent() {
    let mut heap = Heap::new();
    let items: Vec<_> = (0..5).map(|i| heap.int(i)).collect();
    let list = heap.list(items);

    let mut engine = CacheEngine::default();
    let root = engine.capture(&heap, list, here(3)).unwrap();

    let first = engine.expand(&root).unwrap();
    let second = engine.expand(&root).unwrap();
    assert_eq!(first, second);
    assert_eq!(
        serde_json::to_string(&first).unwrap(),
        serde_json::to_string(&second).unwrap()
    );
}

#[test]
fn collection_modes_depend_on_length() {
    let mut heap = Heap::new();
    let five: Vec<_> = (0..5).map(|i| heap.int(i)).collect();
    let long = heap.list(five.clone());
    let short = heap.list(five[..2].to_vec());

    let mut engine = CacheEngine::default();
    let long_id = engine.capture(&heap, long, here(4)).unwrap();
    let short_id = engine.capture(&heap, short, here(5)).unwrap();

    let long_view = full(&engine.expand(&long_id).unwrap(), &long_id);
    assert_eq!(
        long_view.as_switch().unwrap().mode_names(),
        vec!["full", "compact", "summary"]
    );

    let compact_id = mode_id(&long_view, "compact");
    let compact = full(&engine.expand(&compact_id).unwrap(), &compact_id);
    let element_cells: Vec<_> = compact
        .cells()
        .unwrap()
        .iter()
        .filter(|cell| cell.name.parse::<usize>().is_ok())
        .collect();
    // three elements and the ellipsis marker
    assert_eq!(element_cells.len(), 4);
    let ellipsis = engine.entry(&element_cells[3].view).unwrap();
    assert_eq!(ellipsis.compact.text, "...");

    let short_view = full(&engine.expand(&short_id).unwrap(), &short_id);
    assert_eq!(
        short_view.as_switch().unwrap().mode_names(),
        vec!["full", "summary"]
    );
}

#[test]
fn snapshots_do_not_interfere() {
    let mut heap = Heap::new();
    let value = heap.int(1);
    let list = heap.list([value]);

    let mut engine = CacheEngine::default();
    let first = engine.capture(&heap, list, here(6)).unwrap();

    heap.push(list, value);
    let second = engine.capture(&heap, list, here(7)).unwrap();

    assert_ne!(first, second);
    assert_eq!(first.snapshot(), SnapshotId(1));
    assert_eq!(second.snapshot(), SnapshotId(2));

    let before = engine.expand(&first).unwrap();
    let after = engine.expand(&second).unwrap();
    assert!(before.entries.keys().all(|id| id.snapshot() == SnapshotId(1)));
    assert!(after.entries.keys().all(|id| id.snapshot() == SnapshotId(2)));

    let summary = |slice: &viewgraph::Slice, id: &ViewId| match &slice.entries[id] {
        SliceEntry::Full { summary, .. } => summary.text.clone(),
        SliceEntry::Compact(summary) => summary.text.clone(),
    };
    assert_eq!(summary(&before, &first), "List[1]");
    assert_eq!(summary(&after, &second), "List[2]");
}

#[test]
fn evicted_snapshot_is_not_found() {
    let mut heap = Heap::new();
    let value = heap.str("x");
    let config = EngineConfig::from_yaml_str("retain_snapshots: 1\n").unwrap();
    let mut engine = CacheEngine::new(config);

    let old = engine.capture(&heap, value, here(8)).unwrap();
    let new = engine.capture(&heap, value, here(9)).unwrap();

    let err = engine.expand(&old).unwrap_err();
    assert_eq!(err.code(), "NOT_FOUND");
    assert!(err.is_recoverable());
    assert!(engine.expand(&new).is_ok());
    assert!(engine.snapshot_info(old.snapshot()).is_none());
}

#[test]
fn raising_attributes_are_skipped() {
    let mut heap = Heap::new();
    let rate = heap.float(0.1);
    let class = heap.alloc(Value::Class {
        name: "Optimizer".into(),
        attrs: vec![],
    });
    let optimizer = heap.alloc(Value::Object {
        class,
        attrs: vec![
            Attr::new("rate", rate),
            Attr::raising("state", "not initialized"),
            Attr::new("__private", rate),
        ],
    });

    let mut engine = CacheEngine::default();
    let root = engine.capture(&heap, optimizer, here(10)).unwrap();
    let view = full(&engine.expand(&root).unwrap(), &root);
    assert_eq!(engine.entry(&root).unwrap().compact.text, "Instance[Optimizer]");

    let full_id = mode_id(&view, "full");
    let kv = engine.entry(&full_id).unwrap();
    let keys: Vec<String> = kv
        .full
        .cells()
        .unwrap()
        .iter()
        .filter(|cell| cell.name.starts_with('k'))
        .map(|cell| engine.entry(&cell.view).unwrap().compact.text.clone())
        .collect();
    assert_eq!(keys, vec!["rate"]);
    assert!(kv.refs.contains(&ViewId::for_value(rate, root.snapshot())));
}

#[test]
fn dag_with_unknown_port_fails_assembly() {
    let mut heap = Heap::new();
    let a = heap.str("a");
    let b = heap.str("b");
    let dag = DagBuilder::new()
        .node("a", NodeOptions::new().item(a).port("out", viewgraph::Direction::East, None))
        .node("b", NodeOptions::new().item(b))
        .edge_with_ports("a", Some("out"), "b", Some("in"))
        .assemble();

    let err = dag.unwrap_err();
    assert_eq!(
        err,
        AssembleError::UnknownPort {
            edge: 0,
            end: "ends",
            node: "b".into(),
            port: "in".into(),
        }
    );
}

/// A graph value that lays itself out as a DAG of its nodes.
#[derive(Debug)]
struct Pipeline {
    stages: Vec<(String, viewgraph::ObjRef)>,
}

impl Visualize for Pipeline {
    fn view(&self, cx: &mut ViewContext<'_>) -> Result<View<Child>, DispatchError> {
        let mut dag = DagBuilder::new();
        let mut previous: Option<&str> = None;
        for (name, value) in &self.stages {
            let item = cx.view(*value);
            dag = dag.node(name.clone(), NodeOptions::new().item(item));
            if let Some(prev) = previous {
                dag = dag.edge(prev, name.clone());
            }
            previous = Some(name.as_str());
        }
        Ok(dag.assemble()?)
    }

    fn type_name(&self) -> &str {
        "Pipeline"
    }
}

#[test]
fn custom_view_references_stages_by_identity() {
    init_logging();
    let mut heap = Heap::new();
    let size = heap.int(28);
    // The pipeline lists itself as a stage; that stage resolves to the root id.
    let pipeline = heap.alloc_cyclic(|this| {
        Value::Custom(Box::new(Pipeline {
            stages: vec![("load".into(), size), ("loop".into(), this)],
        }))
    });

    let mut engine = CacheEngine::default();
    let root = engine.capture(&heap, pipeline, here(11)).unwrap();
    let view = full(&engine.expand(&root).unwrap(), &root);

    assert_eq!(view.kind_tag(), ViewKindTag::Dag);
    let dag = view.as_dag().unwrap();
    assert_eq!(dag.nodes["loop"].view, root);
    assert_eq!(dag.nodes["load"].view, ViewId::for_value(size, root.snapshot()));
    assert!(engine.entry(&root.child(0)).is_none());
    assert_eq!(dag.edges[&0].start_id, "load");
    assert_eq!(heap.type_name(pipeline), "Pipeline");
}

/// Shows one peer twice.
#[derive(Debug)]
struct Pair {
    peer: viewgraph::ObjRef,
}

impl Visualize for Pair {
    fn view(&self, cx: &mut ViewContext<'_>) -> Result<View<Child>, DispatchError> {
        Ok(SequenceBuilder::new()
            .item(cx.view(self.peer))
            .item(cx.view(self.peer))
            .assemble()?)
    }
}

#[test]
fn repeated_custom_references_share_one_id() {
    let mut heap = Heap::new();
    let x = heap.str("shared");
    let pair = heap.alloc(Value::Custom(Box::new(Pair { peer: x })));
    let list = heap.list([pair, x]);

    let mut engine = CacheEngine::default();
    let root = engine.capture(&heap, list, here(15)).unwrap();
    let x_id = ViewId::for_value(x, root.snapshot());
    let pair_id = ViewId::for_value(pair, root.snapshot());

    let entry = engine.entry(&pair_id).unwrap();
    assert_eq!(entry.refs, vec![x_id.clone(), x_id.clone()]);
    assert!(engine.entry(&pair_id.child(0)).is_none());
    assert!(engine.entry(&pair_id.child(1)).is_none());

    let list_full = engine.entry(&mode_id(&engine.entry(&root).unwrap().full, "full")).unwrap();
    assert!(list_full.refs.contains(&x_id));
    assert_eq!(engine.entry(&x_id).unwrap().compact.text, "\"shared\"");
}

#[test]
fn grid_values_are_cached_with_their_cells() {
    let mut heap = Heap::new();
    let title = heap.str("loss");
    let grid = GridBuilder::from_spec("AAB\nAAB\nCCB")
        .unwrap()
        .item("A", title)
        .item("B", text("legend"))
        .item("C", SequenceBuilder::with_elements(["x", "y"]).assemble().unwrap())
        .assemble()
        .unwrap();
    let shown = heap.alloc(Value::View(grid));

    let mut engine = CacheEngine::default();
    let root = engine.capture(&heap, shown, here(12)).unwrap();
    let entry = engine.entry(&root).unwrap();

    assert_eq!(entry.compact.kind, ViewKindTag::Grid);
    assert_eq!(
        entry.refs,
        vec![
            ViewId::for_value(title, root.snapshot()),
            root.child(1),
            root.child(2),
        ]
    );
    assert!(engine.entry(&root.child(2).child(0)).is_some());
}

#[test]
fn malformed_custom_view_abandons_capture() {
    #[derive(Debug)]
    struct Broken;

    impl Visualize for Broken {
        fn view(&self, _cx: &mut ViewContext<'_>) -> Result<View<Child>, DispatchError> {
            Ok(GridBuilder::new().cell("a", 0, 0, 1, 1).assemble()?)
        }
    }

    let mut heap = Heap::new();
    let broken = heap.alloc(Value::Custom(Box::new(Broken)));
    let root = heap.list([broken]);

    let mut engine = CacheEngine::default();
    let err = engine.capture(&heap, root, here(13)).unwrap_err();
    assert!(matches!(
        err,
        EngineError::Assembly {
            value,
            source: AssembleError::MissingCellItem { .. },
            ..
        } if value == broken
    ));
    assert!(engine.is_empty());

    // The engine stays usable.
    let fine = heap.int(1);
    assert!(engine.capture(&heap, fine, here(14)).is_ok());
}
