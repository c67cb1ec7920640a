//! Treeprobe: element location and scroll convergence over UI accessibility trees
//!
//! Treeprobe finds controls in a live accessibility tree (the kind exposed by
//! desktop UI automation APIs) and brings them into view inside scrollable
//! containers. The tree itself sits behind the [`TreeProvider`] trait, so the
//! engine runs the same against a real automation API or [`mock::MockTree`].
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────────┐
//! │                      TREEPROBE Architecture                       │
//! ├──────────────────────────────────────────────────────────────────┤
//! │  ┌────────────┐    ┌────────────┐    ┌────────────┐              │
//! │  │ By         │    │ Retrying   │    │ Tree       │              │
//! │  │ (property  │───►│ Locator    │───►│ Provider   │              │
//! │  │  or path)  │    │ (polling)  │    │ (UIA/mock) │              │
//! │  └────────────┘    └────────────┘    └────────────┘              │
//! │         ▲                                   ▲                     │
//! │  ┌──────┴─────┐    ┌────────────┐           │                     │
//! │  │ Element    │───►│ Viewport   │───────────┘                     │
//! │  │ (lazy)     │    │ Convergence│  scroll, re-probe, align        │
//! │  └────────────┘    └────────────┘                                 │
//! └──────────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Example
//!
//! ```rust
//! use std::rc::Rc;
//! use treeprobe::mock::{scrolling_list, MockTree};
//! use treeprobe::prelude::*;
//!
//! let tree = Rc::new(MockTree::new());
//! let list = scrolling_list(&tree, 200, 20.0);
//! let provider: Rc<dyn TreeProvider> = tree.clone();
//! let session = Session::new(provider, Settings::default().with_probe_timeout_ms(0));
//!
//! let list_box = ListBox::new(session.root().find_element(By::uid("list")).unwrap().unwrap());
//! let item = list_box.scroll_to(By::name("Item 150")).unwrap().unwrap();
//! assert!(!item.is_offscreen().unwrap());
//! # let _ = list;
//! ```

#![warn(missing_docs)]
// Lints are configured in workspace Cargo.toml [workspace.lints.clippy]

/// Predicates over node properties
#[allow(clippy::missing_errors_doc, clippy::must_use_candidate)]
pub mod condition;

/// Typed wrappers for list boxes, combo boxes and data grids
#[allow(
    clippy::missing_errors_doc,
    clippy::must_use_candidate,
    clippy::missing_const_for_fn,
    clippy::doc_markdown
)]
pub mod controls;

/// Scrolling a container until a target is found and in view
#[allow(
    clippy::missing_errors_doc,
    clippy::must_use_candidate,
    clippy::missing_const_for_fn,
    clippy::doc_markdown
)]
pub mod convergence;

/// Lazy element handles and the session they share
#[allow(
    clippy::missing_errors_doc,
    clippy::must_use_candidate,
    clippy::missing_const_for_fn,
    clippy::doc_markdown
)]
pub mod element;

pub mod geometry;

/// Polling search against a provider
#[allow(clippy::missing_errors_doc, clippy::must_use_candidate)]
pub mod locator;

/// In-memory tree provider for tests and benchmarks
#[allow(
    clippy::missing_errors_doc,
    clippy::must_use_candidate,
    clippy::missing_const_for_fn,
    clippy::doc_markdown
)]
pub mod mock;

mod result;

#[allow(clippy::missing_errors_doc)]
pub mod scroll;

#[allow(clippy::missing_errors_doc, clippy::must_use_candidate)]
pub mod settings;

/// Search strategies: property conditions and path expressions
#[allow(
    clippy::missing_errors_doc,
    clippy::must_use_candidate,
    clippy::missing_const_for_fn,
    clippy::doc_markdown
)]
pub mod strategy;

/// The provider seam and the value types it speaks
#[allow(clippy::missing_errors_doc, clippy::must_use_candidate)]
pub mod tree;

/// Path-language queries over the tree
#[allow(
    clippy::missing_errors_doc,
    clippy::must_use_candidate,
    clippy::missing_const_for_fn,
    clippy::doc_markdown,
    clippy::too_many_lines
)]
pub mod xpath;

pub use condition::{Condition, ConditionTerm, JoinOp};
pub use controls::{ComboBox, DataGrid, ListBox, NOT_GET_ITEM, NOT_GET_SELECTED_ITEM};
pub use convergence::{
    Viewport, ViewportConvergence, NOT_SCROLL, POPUP_CLASS_NAME, RESET_THRESHOLD_PERCENT,
    SWEEP_END_PERCENT,
};
pub use element::{
    DiagnosticsHook, Element, ElementProperties, FromPropertyValue, NoDiagnostics, Session,
    TextStrategy,
};
pub use geometry::{to_virtual_screen, Edge, Point, Rect, ScreenScale, INVALID_SCALE};
pub use locator::{PollOptions, RetryingLocator};
pub use result::{ProbeError, ProbeResult};
pub use scroll::ScrollPattern;
pub use settings::{
    Settings, DEFAULT_PROBE_TIMEOUT_MS, DEFAULT_SCROLL_BAR_SIZE, DEFAULT_SEARCH_TIMEOUT_MS,
};
pub use strategy::{By, ByPath, ByProperty};
pub use tree::{
    ControlType, ExpandCollapseState, Node, PatternKind, PropertyId, PropertyValue, RuntimeId,
    ScrollAmount, ScrollInfo, TreeProvider, TreeScope,
};

/// Prelude for convenient imports
pub mod prelude {
    pub use super::condition::*;
    pub use super::controls::*;
    pub use super::convergence::*;
    pub use super::element::*;
    pub use super::geometry::*;
    pub use super::locator::*;
    pub use super::result::*;
    pub use super::scroll::*;
    pub use super::settings::*;
    pub use super::strategy::*;
    pub use super::tree::*;
}
