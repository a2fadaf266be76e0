//! Property-based tests for the state machine
//!
//! These tests verify key invariants hold across all possible inputs.

use super::*;
use proptest::prelude::*;

fn arb_intent() -> impl Strategy<Value = Intent> {
    proptest::sample::select(Intent::ALL.to_vec())
}

fn arb_node() -> impl Strategy<Value = AgentNode> {
    proptest::sample::select(AgentNode::ALL.to_vec())
}

fn arb_event() -> impl Strategy<Value = Event> {
    prop_oneof![
        (proptest::option::of(arb_intent()), any::<f32>())
            .prop_map(|(intent, confidence)| Event::Classified { intent, confidence }),
        Just(Event::NodeCompleted),
        "[a-z ]{0,20}".prop_map(|error| Event::NodeFailed { error }),
    ]
}

fn arb_phase() -> impl Strategy<Value = Phase> {
    prop_oneof![
        Just(Phase::ClassifyIntent),
        arb_node().prop_map(Phase::Running),
        arb_node().prop_map(Phase::Completed),
        (arb_node(), "[a-z ]{0,20}").prop_map(|(node, error)| Phase::Failed { node, error }),
    ]
}

proptest! {
    /// Routing is total, and the node name matches the intent token
    #[test]
    fn prop_route_total(intent in proptest::option::of(arb_intent())) {
        let node = route(intent);
        match intent {
            Some(intent) => prop_assert_eq!(node.as_str(), intent.as_str()),
            None => prop_assert_eq!(node, AgentNode::Clarification),
        }
    }

    /// Classification always leads to exactly one node execution, whatever the confidence
    #[test]
    fn prop_classified_runs_exactly_one_node(
        intent in proptest::option::of(arb_intent()),
        confidence in any::<f32>(),
    ) {
        let result = transition(&Phase::ClassifyIntent, Event::Classified { intent, confidence }).unwrap();
        prop_assert_eq!(result.effects, vec![Effect::RunNode(route(intent))]);
        prop_assert_eq!(result.new_phase, Phase::Running(route(intent)));
    }

    /// Terminal phases accept no further events
    #[test]
    fn prop_terminal_phases_reject_events(phase in arb_phase(), event in arb_event()) {
        let result = transition(&phase, event);
        if phase.is_terminal() {
            prop_assert!(result.is_err());
        }
        if let Ok(result) = result {
            // Once routed, the node never changes
            if let Some(node) = phase.node() {
                prop_assert_eq!(result.new_phase.node(), Some(node));
            }
        }
    }
}
