//! Search strategies.
//!
//! A strategy turns either a property condition or a path expression into
//! queries against the tree provider. Strategies are plain values; the
//! polling and timeout live in [`crate::locator::RetryingLocator`].

use crate::condition::{Condition, ConditionTerm, JoinOp};
use crate::locator::RetryingLocator;
use crate::result::{ProbeError, ProbeResult};
use crate::tree::{ControlType, Node, PropertyId, PropertyValue, TreeProvider, TreeScope};
use crate::xpath::{self, Expr, Selection, TreeNavigator};
use std::fmt;
use std::rc::Rc;
use tracing::warn;

/// A search strategy
#[derive(Debug, Clone, PartialEq)]
pub enum By {
    /// Match node properties
    Property(ByProperty),
    /// Evaluate a path expression
    Path(ByPath),
}

impl By {
    /// Property strategy over the subtree
    #[must_use]
    pub fn automation_property(property: PropertyId, value: impl Into<PropertyValue>) -> ByProperty {
        ByProperty::new(TreeScope::Subtree, property, value)
    }

    /// Property strategy with an explicit scope
    #[must_use]
    pub fn automation_property_in(
        scope: TreeScope,
        property: PropertyId,
        value: impl Into<PropertyValue>,
    ) -> ByProperty {
        ByProperty::new(scope, property, value)
    }

    /// Match by `Name`
    #[must_use]
    pub fn name(value: impl Into<String>) -> ByProperty {
        Self::automation_property(PropertyId::Name, value.into())
    }

    /// Match by `AutomationId`
    #[must_use]
    pub fn uid(value: impl Into<String>) -> ByProperty {
        Self::automation_property(PropertyId::AutomationId, value.into())
    }

    /// Match by `ClassName`
    #[must_use]
    pub fn class_name(value: impl Into<String>) -> ByProperty {
        Self::automation_property(PropertyId::ClassName, value.into())
    }

    /// Match by `ControlType`
    #[must_use]
    pub fn control_type(control_type: ControlType) -> ByProperty {
        Self::automation_property(PropertyId::ControlType, control_type)
    }

    /// Path expression
    #[must_use]
    pub fn path(expression: impl Into<String>) -> ByPath {
        ByPath::new(expression)
    }

    /// First matching node under `parent`, polling up to `timeout_ms`
    pub fn find_first(
        &self,
        locator: &RetryingLocator,
        parent: &Node,
        timeout_ms: u64,
    ) -> ProbeResult<Option<Node>> {
        locator.find_first(parent, self, timeout_ms)
    }

    /// All matching nodes under `parent`, polling up to `timeout_ms`
    pub fn find_all(
        &self,
        locator: &RetryingLocator,
        parent: &Node,
        timeout_ms: u64,
    ) -> ProbeResult<Vec<Node>> {
        locator.find_all(parent, self, timeout_ms)
    }

    /// Validate and compile once, before polling starts
    pub(crate) fn prepare(&self) -> ProbeResult<Query> {
        match self {
            Self::Property(by) => Ok(Query::Property {
                scope: by.scope,
                condition: by.condition()?,
            }),
            Self::Path(by) => Ok(Query::Path {
                expression: by.expression.clone(),
                expr: xpath::compile(&by.expression)?,
            }),
        }
    }
}

impl fmt::Display for By {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Property(by) => write!(f, "{by}"),
            Self::Path(by) => write!(f, "{by}"),
        }
    }
}

impl From<ByProperty> for By {
    fn from(by: ByProperty) -> Self {
        Self::Property(by)
    }
}

impl From<ByPath> for By {
    fn from(by: ByPath) -> Self {
        Self::Path(by)
    }
}

// =============================================================================
// Property strategy
// =============================================================================

/// Strategy matching a left-deep AND/OR chain of property equalities
#[derive(Debug, Clone, PartialEq)]
pub struct ByProperty {
    scope: TreeScope,
    terms: Vec<ConditionTerm>,
}

impl ByProperty {
    /// Start with a single term
    #[must_use]
    pub fn new(scope: TreeScope, property: PropertyId, value: impl Into<PropertyValue>) -> Self {
        Self {
            scope,
            terms: vec![ConditionTerm::new(property, value, JoinOp::None)],
        }
    }

    /// Build from raw terms; validated when the condition is built
    #[must_use]
    pub fn from_terms(scope: TreeScope, terms: Vec<ConditionTerm>) -> Self {
        Self { scope, terms }
    }

    /// AND another equality onto everything so far
    #[must_use]
    pub fn and(mut self, property: PropertyId, value: impl Into<PropertyValue>) -> Self {
        self.terms.push(ConditionTerm::new(property, value, JoinOp::And));
        self
    }

    /// OR another equality onto everything so far
    #[must_use]
    pub fn or(mut self, property: PropertyId, value: impl Into<PropertyValue>) -> Self {
        self.terms.push(ConditionTerm::new(property, value, JoinOp::Or));
        self
    }

    /// AND a control type
    #[must_use]
    pub fn and_type(self, control_type: ControlType) -> Self {
        self.and(PropertyId::ControlType, control_type)
    }

    /// OR a name
    #[must_use]
    pub fn or_name(self, name: impl Into<String>) -> Self {
        self.or(PropertyId::Name, name.into())
    }

    /// Replace the search scope
    #[must_use]
    pub const fn with_scope(mut self, scope: TreeScope) -> Self {
        self.scope = scope;
        self
    }

    /// Search scope
    #[must_use]
    pub const fn scope(&self) -> TreeScope {
        self.scope
    }

    /// Terms in encounter order
    #[must_use]
    pub fn terms(&self) -> &[ConditionTerm] {
        &self.terms
    }

    /// Build the condition tree
    pub fn condition(&self) -> ProbeResult<Condition> {
        Condition::from_terms(&self.terms)
    }

    /// First matching node under `parent`
    pub fn find_first(
        &self,
        locator: &RetryingLocator,
        parent: &Node,
        timeout_ms: u64,
    ) -> ProbeResult<Option<Node>> {
        locator.find_first(parent, &By::Property(self.clone()), timeout_ms)
    }

    /// All matching nodes under `parent`
    pub fn find_all(
        &self,
        locator: &RetryingLocator,
        parent: &Node,
        timeout_ms: u64,
    ) -> ProbeResult<Vec<Node>> {
        locator.find_all(parent, &By::Property(self.clone()), timeout_ms)
    }
}

impl fmt::Display for ByProperty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let Some((first, rest)) = self.terms.split_first() else {
            return Ok(());
        };
        let mut text = format!("{}: {}", first.property, first.value);
        for term in rest {
            text = format!("({text}) {} {}: {}", term.join, term.property, term.value);
        }
        f.write_str(&text)
    }
}

// =============================================================================
// Path strategy
// =============================================================================

/// Strategy evaluating a path expression against the tree
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ByPath {
    expression: String,
}

impl ByPath {
    /// Create from an expression; syntax is checked when the search runs
    #[must_use]
    pub fn new(expression: impl Into<String>) -> Self {
        Self {
            expression: expression.into(),
        }
    }

    /// The expression text
    #[must_use]
    pub fn expression(&self) -> &str {
        &self.expression
    }

    /// First matching element under `parent`
    pub fn find_first(
        &self,
        locator: &RetryingLocator,
        parent: &Node,
        timeout_ms: u64,
    ) -> ProbeResult<Option<Node>> {
        locator.find_first(parent, &By::Path(self.clone()), timeout_ms)
    }

    /// All matching elements under `parent`, in document order
    pub fn find_all(
        &self,
        locator: &RetryingLocator,
        parent: &Node,
        timeout_ms: u64,
    ) -> ProbeResult<Vec<Node>> {
        locator.find_all(parent, &By::Path(self.clone()), timeout_ms)
    }
}

impl fmt::Display for ByPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.expression)
    }
}

// =============================================================================
// Single attempts
// =============================================================================

/// Result of one query attempt
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Attempt<T> {
    /// Non-empty result
    Hit(T),
    /// Nothing yet; worth polling again
    Miss,
    /// The query can never select elements; stop polling
    Unselectable,
}

/// A strategy compiled for repeated attempts
#[derive(Debug, Clone)]
pub(crate) enum Query {
    Property {
        scope: TreeScope,
        condition: Condition,
    },
    Path {
        expression: String,
        expr: Expr,
    },
}

impl Query {
    pub(crate) fn first(&self, provider: &Rc<dyn TreeProvider>, root: &Node) -> ProbeResult<Attempt<Node>> {
        match self {
            Self::Property { scope, condition } => Ok(provider
                .find_first(root, *scope, condition)?
                .map_or(Attempt::Miss, Attempt::Hit)),
            Self::Path { .. } => Ok(match self.all(provider, root)? {
                Attempt::Hit(nodes) => nodes.into_iter().next().map_or(Attempt::Miss, Attempt::Hit),
                Attempt::Miss => Attempt::Miss,
                Attempt::Unselectable => Attempt::Unselectable,
            }),
        }
    }

    pub(crate) fn all(&self, provider: &Rc<dyn TreeProvider>, root: &Node) -> ProbeResult<Attempt<Vec<Node>>> {
        let nodes = match self {
            Self::Property { scope, condition } => provider.find_all(root, *scope, condition)?,
            Self::Path { expression, expr } => {
                let navigator = TreeNavigator::new(Rc::clone(provider), root.clone());
                let selection = xpath::select_elements(expr, &navigator).map_err(|e| match e {
                    ProbeError::InvalidPath { message, .. } => ProbeError::InvalidPath {
                        expression: expression.clone(),
                        message,
                    },
                    other => other,
                })?;
                match selection {
                    Selection::Nodes(nodes) => nodes,
                    Selection::NotANodeSet(kind) => {
                        warn!(expression = %expression, result = kind, "path expression does not select nodes");
                        return Ok(Attempt::Unselectable);
                    }
                }
            }
        };
        Ok(if nodes.is_empty() {
            Attempt::Miss
        } else {
            Attempt::Hit(nodes)
        })
    }
}
