//! In-memory tree provider for tests and benchmarks.
//!
//! [`MockTree`] implements [`TreeProvider`](crate::tree::TreeProvider) over
//! an arena of [`MockNode`]s. It models the parts of a live accessibility
//! tree the locator and the scrolling code depend on: scroll containers that
//! shift their content, virtualized lists that only realize visible rows,
//! and nodes that go stale when they leave the tree.
//!
//! ```rust
//! use std::rc::Rc;
//! use treeprobe::mock::{MockNode, MockTree};
//! use treeprobe::prelude::*;
//!
//! let tree = Rc::new(MockTree::new());
//! let window = tree.add(tree.root_key(), MockNode::new(ControlType::Window).with_name("Main"));
//! tree.add(window, MockNode::new(ControlType::Button).with_name("OK"));
//!
//! let provider: Rc<dyn TreeProvider> = tree.clone();
//! let session = Session::new(provider, Settings::default());
//! let ok = session.root().find_element(By::name("OK")).unwrap();
//! assert!(ok.is_some());
//! ```

pub mod strategies;
mod tree;

#[cfg(feature = "proptest")]
pub use strategies::{any_control_type, any_name, condition_terms, list_target};
pub use strategies::{sample_window, scrolling_list, SampleWindow};
pub use tree::{
    MockNode, MockTree, NodeKey, RecordingDiagnostics, DEFAULT_LINE_SIZE, DEFAULT_PROCESS_ID,
    DESKTOP_RECT, RUNTIME_ID_PREFIX,
};
