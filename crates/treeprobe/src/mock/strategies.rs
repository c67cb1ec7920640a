//! Fixture trees and proptest strategies.
//!
//! The fixture builders are always available. The strategies need the
//! `proptest` feature.

use super::tree::{MockNode, MockTree, NodeKey};
use crate::geometry::Rect;
use crate::tree::ControlType;

#[cfg(feature = "proptest")]
use crate::condition::{ConditionTerm, JoinOp};
#[cfg(feature = "proptest")]
use crate::tree::{PropertyId, PropertyValue};
#[cfg(feature = "proptest")]
use proptest::prelude::*;

/// Keys of the nodes created by [`sample_window`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SampleWindow {
    /// The top-level window, `Main`
    pub window: NodeKey,
    /// Button `OK`, uid `ok`
    pub ok: NodeKey,
    /// Button `Cancel`, uid `cancel`
    pub cancel: NodeKey,
    /// Edit `input` holding the value `typed`
    pub input: NodeKey,
}

/// A 400x300 window with two buttons and an edit box
pub fn sample_window(tree: &MockTree) -> SampleWindow {
    let window = tree.add(
        tree.root_key(),
        MockNode::new(ControlType::Window)
            .with_name("Main")
            .with_automation_id("main")
            .with_rect(Rect::new(0.0, 0.0, 400.0, 300.0)),
    );
    let ok = tree.add(
        window,
        MockNode::new(ControlType::Button)
            .with_name("OK")
            .with_automation_id("ok")
            .with_rect(Rect::new(10.0, 10.0, 80.0, 30.0)),
    );
    let cancel = tree.add(
        window,
        MockNode::new(ControlType::Button)
            .with_name("Cancel")
            .with_automation_id("cancel")
            .with_rect(Rect::new(100.0, 10.0, 80.0, 30.0)),
    );
    let input = tree.add(
        window,
        MockNode::new(ControlType::Edit)
            .with_automation_id("input")
            .with_rect(Rect::new(10.0, 50.0, 200.0, 24.0))
            .with_value("typed"),
    );
    SampleWindow {
        window,
        ok,
        cancel,
        input,
    }
}

/// A virtualized 200x100 list of `count` items, `item_height` pixels each
pub fn scrolling_list(tree: &MockTree, count: usize, item_height: f64) -> NodeKey {
    let list = tree.add(
        tree.root_key(),
        MockNode::new(ControlType::List)
            .with_automation_id("list")
            .with_rect(Rect::new(0.0, 0.0, 200.0, 100.0))
            .scrollable()
            .virtualized(),
    );
    tree.add_list_items(list, count, item_height);
    list
}

/// Any control type
#[cfg(feature = "proptest")]
pub fn any_control_type() -> impl Strategy<Value = ControlType> {
    proptest::sample::select(ControlType::ALL)
}

/// Short names drawn from a small alphabet, so that collisions happen
#[cfg(feature = "proptest")]
pub fn any_name() -> impl Strategy<Value = String> {
    "[a-c]{1,3}"
}

/// One to five terms over `Name`, `AutomationId` and `ControlType`; the
/// first carries no join, the rest `And` or `Or`
#[cfg(feature = "proptest")]
pub fn condition_terms() -> impl Strategy<Value = Vec<ConditionTerm>> {
    let term = prop_oneof![
        any_name().prop_map(|name| (PropertyId::Name, PropertyValue::from(name))),
        any_name().prop_map(|uid| (PropertyId::AutomationId, PropertyValue::from(uid))),
        any_control_type().prop_map(|ct| (PropertyId::ControlType, PropertyValue::from(ct))),
    ];
    let join = prop_oneof![Just(JoinOp::And), Just(JoinOp::Or)];
    proptest::collection::vec((term, join), 1..=5).prop_map(|terms| {
        terms
            .into_iter()
            .enumerate()
            .map(|(i, ((property, value), join))| ConditionTerm {
                property,
                value,
                join: if i == 0 { JoinOp::None } else { join },
            })
            .collect()
    })
}

/// Item count and a target index inside it
#[cfg(feature = "proptest")]
pub fn list_target() -> impl Strategy<Value = (usize, usize)> {
    (1usize..150).prop_flat_map(|count| (Just(count), 0..count))
}
