//! Property-based tests for diff recording, replay and inversion.

use cim_object_graph::{
    events::GraphDiff,
    handlers::{ChangeRecorder, GraphChangeHandler, GraphChangeResult},
    value_objects::{ArcId, NodeId, PropertyValue},
};
use parking_lot::Mutex;
use proptest::prelude::*;
use serde_json::json;
use std::collections::{HashMap, HashSet};

/// Handler that logs every callback as the diff it corresponds to
#[derive(Default)]
struct CallLog {
    calls: Mutex<Vec<GraphDiff>>,
}

impl GraphChangeHandler for CallLog {
    fn node_created(&self, node_id: &NodeId) -> GraphChangeResult<()> {
        self.calls.lock().push(GraphDiff::node_created(node_id.clone()));
        Ok(())
    }

    fn node_deleted(&self, node_id: &NodeId) -> GraphChangeResult<()> {
        self.calls.lock().push(GraphDiff::node_deleted(node_id.clone()));
        Ok(())
    }

    fn node_id_changed(&self, node_id: &NodeId, new_id: &NodeId) -> GraphChangeResult<()> {
        self.calls
            .lock()
            .push(GraphDiff::node_id_changed(node_id.clone(), new_id.clone()));
        Ok(())
    }

    fn node_property_changed(
        &self,
        node_id: &NodeId,
        property: &str,
        old_value: &PropertyValue,
        new_value: &PropertyValue,
    ) -> GraphChangeResult<()> {
        self.calls.lock().push(GraphDiff::property_changed(
            node_id.clone(),
            property,
            old_value.clone(),
            new_value.clone(),
        ));
        Ok(())
    }

    fn arc_created(&self, node_id: &NodeId, target_id: &NodeId, arc_id: &ArcId) -> GraphChangeResult<()> {
        self.calls.lock().push(GraphDiff::arc_created(
            node_id.clone(),
            target_id.clone(),
            arc_id.clone(),
        ));
        Ok(())
    }

    fn arc_deleted(&self, node_id: &NodeId, target_id: &NodeId, arc_id: &ArcId) -> GraphChangeResult<()> {
        self.calls.lock().push(GraphDiff::arc_deleted(
            node_id.clone(),
            target_id.clone(),
            arc_id.clone(),
        ));
        Ok(())
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
struct TrackedState {
    nodes: HashSet<NodeId>,
    properties: HashMap<(NodeId, String), PropertyValue>,
    arcs: HashSet<(NodeId, NodeId, ArcId)>,
}

/// Handler with observable graph state
#[derive(Default)]
struct StateTracker {
    state: Mutex<TrackedState>,
}

impl GraphChangeHandler for StateTracker {
    fn node_created(&self, node_id: &NodeId) -> GraphChangeResult<()> {
        self.state.lock().nodes.insert(node_id.clone());
        Ok(())
    }

    fn node_deleted(&self, node_id: &NodeId) -> GraphChangeResult<()> {
        self.state.lock().nodes.remove(node_id);
        Ok(())
    }

    fn node_id_changed(&self, node_id: &NodeId, new_id: &NodeId) -> GraphChangeResult<()> {
        let mut state = self.state.lock();
        if state.nodes.remove(node_id) {
            state.nodes.insert(new_id.clone());
        }
        Ok(())
    }

    fn node_property_changed(
        &self,
        node_id: &NodeId,
        property: &str,
        _old_value: &PropertyValue,
        new_value: &PropertyValue,
    ) -> GraphChangeResult<()> {
        self.state
            .lock()
            .properties
            .insert((node_id.clone(), property.to_string()), new_value.clone());
        Ok(())
    }

    fn arc_created(&self, node_id: &NodeId, target_id: &NodeId, arc_id: &ArcId) -> GraphChangeResult<()> {
        self.state
            .lock()
            .arcs
            .insert((node_id.clone(), target_id.clone(), arc_id.clone()));
        Ok(())
    }

    fn arc_deleted(&self, node_id: &NodeId, target_id: &NodeId, arc_id: &ArcId) -> GraphChangeResult<()> {
        self.state
            .lock()
            .arcs
            .remove(&(node_id.clone(), target_id.clone(), arc_id.clone()));
        Ok(())
    }
}

fn arb_node_id() -> impl Strategy<Value = NodeId> {
    (prop_oneof![Just("Artist"), Just("Painting")], 0u32..8)
        .prop_map(|(entity, key)| NodeId::permanent(entity, key.to_string()))
}

fn arb_value() -> impl Strategy<Value = PropertyValue> {
    prop_oneof![
        Just(json!(null)),
        any::<bool>().prop_map(PropertyValue::from),
        any::<i64>().prop_map(PropertyValue::from),
        "[a-zA-Z ]{0,12}".prop_map(PropertyValue::from),
    ]
}

fn arb_arc_id() -> impl Strategy<Value = ArcId> {
    prop_oneof![Just("toArtist"), Just("paintings")].prop_map(ArcId::from)
}

/// Single diffs whose undo exactly inverts apply
fn arb_invertible_diff() -> impl Strategy<Value = GraphDiff> {
    prop_oneof![
        arb_node_id().prop_map(GraphDiff::node_created),
        arb_node_id().prop_map(GraphDiff::node_deleted),
        (arb_node_id(), "[a-z]{1,8}", arb_value(), arb_value())
            .prop_map(|(id, property, old, new)| GraphDiff::property_changed(id, property, old, new)),
        (arb_node_id(), arb_node_id(), arb_arc_id())
            .prop_map(|(id, target, arc)| GraphDiff::arc_created(id, target, arc)),
        (arb_node_id(), arb_node_id(), arb_arc_id())
            .prop_map(|(id, target, arc)| GraphDiff::arc_deleted(id, target, arc)),
    ]
}

fn arb_any_diff() -> impl Strategy<Value = GraphDiff> {
    prop_oneof![
        arb_invertible_diff(),
        (arb_node_id(), arb_node_id()).prop_map(|(old, new)| GraphDiff::node_id_changed(old, new)),
    ]
}

/// Prior state in which `diff` is a real change
fn prior_state(diff: &GraphDiff) -> TrackedState {
    let mut state = TrackedState::default();
    state.nodes.insert(NodeId::permanent("Artist", "bystander"));
    match diff {
        GraphDiff::NodeDeleted { node_id } => {
            state.nodes.insert(node_id.clone());
        }
        GraphDiff::NodePropertyChanged {
            node_id,
            property,
            old_value,
            ..
        } => {
            state
                .properties
                .insert((node_id.clone(), property.clone()), old_value.clone());
        }
        GraphDiff::ArcDeleted {
            node_id,
            target_node_id,
            arc_id,
        } => {
            state
                .arcs
                .insert((node_id.clone(), target_node_id.clone(), arc_id.clone()));
        }
        _ => {}
    }
    state
}

fn record(recorder: &ChangeRecorder, diffs: &[GraphDiff]) {
    for diff in diffs {
        diff.apply(recorder).unwrap();
    }
}

proptest! {
    #[test]
    fn prop_replay_preserves_callback_order(diffs in prop::collection::vec(arb_any_diff(), 0..40)) {
        let recorder = ChangeRecorder::new();
        record(&recorder, &diffs);

        let log = CallLog::default();
        recorder.apply(&log).unwrap();

        prop_assert_eq!(log.calls.into_inner(), diffs);
    }

    #[test]
    fn prop_recording_off_drops_callbacks(
        before in prop::collection::vec(arb_any_diff(), 0..10),
        dropped in prop::collection::vec(arb_any_diff(), 1..10),
    ) {
        let recorder = ChangeRecorder::new();
        record(&recorder, &before);

        recorder.set_recording(false);
        record(&recorder, &dropped);

        prop_assert_eq!(recorder.size(), before.len());
        recorder.clear();
        prop_assert!(recorder.is_empty());
    }

    #[test]
    fn prop_undo_inverts_apply(diff in arb_invertible_diff()) {
        let before = prior_state(&diff);
        let tracker = StateTracker { state: Mutex::new(before.clone()) };

        diff.apply(&tracker).unwrap();
        diff.undo(&tracker).unwrap();

        prop_assert_eq!(tracker.state.into_inner(), before);
    }

    #[test]
    fn prop_undo_matches_applying_inverse(diffs in prop::collection::vec(arb_any_diff(), 0..20)) {
        let compound = GraphDiff::compound(diffs);

        let undone = CallLog::default();
        compound.undo(&undone).unwrap();
        let inverted = CallLog::default();
        compound.inverse().apply(&inverted).unwrap();

        prop_assert_eq!(undone.calls.into_inner(), inverted.calls.into_inner());
    }
}
