//! Path queries over the accessibility tree.
//!
//! The tree is presented as a read-only document: a synthetic root, one
//! element per node (named after its control type) and one attribute per
//! supported property. [`TreeNavigator`] is the cursor over that document and
//! [`evaluate`] runs a parsed expression against any [`PathNavigator`].
//!
//! ```rust,ignore
//! let expr = xpath::compile("//Button[@Name='OK']")?;
//! let nav = TreeNavigator::new(provider, provider.root());
//! let hits = xpath::select_elements(&expr, &nav)?;
//! ```

mod eval;
mod navigator;
mod parser;

pub use eval::{evaluate, Value};
pub use navigator::{TreeNavigator, ROOT_NAME};
pub use parser::{parse, Axis, CompareOp, Expr, Function, NodeTest, ParseError, Step};

use crate::result::{ProbeError, ProbeResult};
use crate::tree::Node;

/// Kind of the item under a navigator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeKind {
    /// The document root
    Root,
    /// A tree node
    Element,
    /// A property of a tree node
    Attribute,
}

/// A cursor over a navigable document.
///
/// Movement methods return `Ok(false)` and leave the cursor in place when the
/// move is impossible.
pub trait PathNavigator: Clone {
    /// Kind of the current item
    fn kind(&self) -> NodeKind;

    /// Local name of the current item
    fn local_name(&self) -> ProbeResult<String>;

    /// String value of the current item
    fn string_value(&self) -> ProbeResult<String>;

    /// Whether both cursors sit on the same item
    fn is_same_position(&self, other: &Self) -> bool;

    /// Move to the parent item
    fn move_to_parent(&mut self) -> ProbeResult<bool>;

    /// Move to the first child element
    fn move_to_first_child(&mut self) -> ProbeResult<bool>;

    /// Move to the next sibling element
    fn move_to_next(&mut self) -> ProbeResult<bool>;

    /// Move to the previous sibling element
    fn move_to_previous(&mut self) -> ProbeResult<bool>;

    /// Move to the first attribute of the current element
    fn move_to_first_attribute(&mut self) -> ProbeResult<bool>;

    /// Move to the next attribute of the owning element
    fn move_to_next_attribute(&mut self) -> ProbeResult<bool>;
}

/// Parse `expression`, mapping failures to [`ProbeError::InvalidPath`]
pub fn compile(expression: &str) -> ProbeResult<Expr> {
    parse(expression).map_err(|e| ProbeError::InvalidPath {
        expression: expression.to_string(),
        message: e.to_string(),
    })
}

/// Outcome of a path query that is expected to select tree nodes
#[derive(Debug, Clone, PartialEq)]
pub enum Selection {
    /// Element nodes in document order
    Nodes(Vec<Node>),
    /// The expression produced a string, number or boolean
    NotANodeSet(&'static str),
}

/// Evaluate `expr` and keep only element items, in document order
pub fn select_elements(expr: &Expr, context: &TreeNavigator) -> ProbeResult<Selection> {
    match evaluate(expr, context)? {
        Value::Nodes(items) => Ok(Selection::Nodes(
            items
                .iter()
                .filter(|nav| nav.kind() == NodeKind::Element)
                .filter_map(|nav| nav.node().cloned())
                .collect(),
        )),
        other => Ok(Selection::NotANodeSet(other.type_name())),
    }
}
