//! Shared helpers for integration tests.

#![allow(dead_code)]

use viewgraph::{Child, Location, Slice, SliceEntry, View, ViewId, ViewModel};

pub fn init_logging() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter("viewgraph=debug")
        .with_test_writer()
        .try_init();
}

pub fn here(line: u32) -> Location {
    Location::new("script.py", line)
}

pub fn full(slice: &Slice, id: &ViewId) -> ViewModel {
    match slice.entries.get(id) {
        Some(SliceEntry::Full { view, .. }) => view.clone(),
        other => panic!("{} is not a full entry: {:?}", id, other),
    }
}

/// Id bound to a switch mode.
pub fn mode_id(view: &ViewModel, mode: &str) -> ViewId {
    view.as_switch()
        .and_then(|switch| switch.mode(mode))
        .cloned()
        .unwrap_or_else(|| panic!("no mode {} in {:?}", mode, view.kind_tag()))
}

pub fn text(view: &str) -> Child {
    Child::from(View::text(view))
}
