//! Tree Provider contract.
//!
//! The accessibility tree is owned by an external provider (a platform
//! automation API, a remote agent, or [`crate::mock::MockTree`] in tests).
//! Everything in this crate talks to it through [`TreeProvider`] and the value
//! types defined here. Nodes are opaque references that may go stale at any
//! moment; providers report that as [`ProbeError::ElementNotAvailable`].

use crate::condition::Condition;
use crate::geometry::Rect;
use crate::result::{ProbeError, ProbeResult};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::OnceLock;

// =============================================================================
// Node identity
// =============================================================================

/// Provider-assigned identity of a node
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RuntimeId(Vec<i32>);

impl RuntimeId {
    /// Create from the raw id components
    #[must_use]
    pub fn new(parts: impl Into<Vec<i32>>) -> Self {
        Self(parts.into())
    }

    /// Raw components
    #[must_use]
    pub fn parts(&self) -> &[i32] {
        &self.0
    }
}

impl fmt::Display for RuntimeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, part) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str(" ")?;
            }
            write!(f, "{part}")?;
        }
        Ok(())
    }
}

/// Opaque reference to a node of the external tree.
///
/// Two nodes are the same node iff their runtime ids are equal.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Node {
    runtime_id: RuntimeId,
}

impl Node {
    /// Create a node reference
    #[must_use]
    pub const fn new(runtime_id: RuntimeId) -> Self {
        Self { runtime_id }
    }

    /// The node's runtime id
    #[must_use]
    pub const fn runtime_id(&self) -> &RuntimeId {
        &self.runtime_id
    }
}

impl fmt::Display for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "node[{}]", self.runtime_id)
    }
}

// =============================================================================
// Control types
// =============================================================================

macro_rules! control_types {
    ($($variant:ident),+ $(,)?) => {
        /// Role of a node as exposed by the provider
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[allow(missing_docs)]
        pub enum ControlType {
            $($variant),+
        }

        impl ControlType {
            /// Every control type
            pub const ALL: &'static [Self] = &[$(Self::$variant),+];

            /// Short name, e.g. `Button`
            #[must_use]
            pub const fn name(&self) -> &'static str {
                match self {
                    $(Self::$variant => stringify!($variant)),+
                }
            }
        }
    };
}

control_types! {
    Button, Calendar, CheckBox, ComboBox, Custom, DataGrid, DataItem, Document,
    Edit, Group, Header, HeaderItem, Hyperlink, Image, List, ListItem, Menu,
    MenuBar, MenuItem, Pane, ProgressBar, RadioButton, ScrollBar, Separator,
    Slider, Spinner, SplitButton, StatusBar, Tab, TabItem, Table, Text, Thumb,
    TitleBar, ToolBar, ToolTip, Tree, TreeItem, Window,
}

impl ControlType {
    /// Programmatic name, e.g. `ControlType.Button`
    #[must_use]
    pub fn programmatic_name(&self) -> String {
        format!("ControlType.{}", self.name())
    }
}

impl fmt::Display for ControlType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ControlType.{}", self.name())
    }
}

impl FromStr for ControlType {
    type Err = ProbeError;

    /// Accepts both `Button` and `ControlType.Button`
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let short = s.strip_prefix("ControlType.").unwrap_or(s);
        Self::ALL
            .iter()
            .copied()
            .find(|ct| ct.name() == short)
            .ok_or_else(|| ProbeError::InvalidArgument {
                reason: "UNKNOWN CONTROL TYPE".to_string(),
                message: s.to_string(),
            })
    }
}

/// Expand/collapse state of a node
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ExpandCollapseState {
    /// Children hidden
    Collapsed,
    /// Children visible
    Expanded,
    /// Some children visible
    PartiallyExpanded,
    /// Nothing to expand
    LeafNode,
}

impl fmt::Display for ExpandCollapseState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Collapsed => "Collapsed",
            Self::Expanded => "Expanded",
            Self::PartiallyExpanded => "PartiallyExpanded",
            Self::LeafNode => "LeafNode",
        };
        f.write_str(name)
    }
}

// =============================================================================
// Properties
// =============================================================================

/// Identifier of a node property
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PropertyId {
    /// Display name
    Name,
    /// Stable automation id
    AutomationId,
    /// Framework class name
    ClassName,
    /// Role
    ControlType,
    /// Screen rectangle
    BoundingRectangle,
    /// Enabled flag
    IsEnabled,
    /// Off-screen flag
    IsOffscreen,
    /// Owning process
    ProcessId,
    /// Grid-item pattern availability
    IsGridItemPatternAvailable,
    /// Grid-item row
    Row,
    /// Grid-item column
    Column,
    /// Grid row count
    RowCount,
    /// Grid column count
    ColumnCount,
    /// Selection-item state
    IsSelected,
    /// Expand/collapse state
    ExpandCollapseState,
    /// Provider-specific property
    Custom(String),
}

impl PropertyId {
    /// The well-known properties every provider is expected to expose
    pub const STANDARD: &'static [Self] = &[
        Self::AutomationId,
        Self::Name,
        Self::ClassName,
        Self::ControlType,
        Self::BoundingRectangle,
        Self::IsEnabled,
        Self::IsOffscreen,
        Self::ProcessId,
    ];

    /// Short name used as the path-language attribute name
    #[must_use]
    pub fn name(&self) -> &str {
        match self {
            Self::Name => "Name",
            Self::AutomationId => "AutomationId",
            Self::ClassName => "ClassName",
            Self::ControlType => "ControlType",
            Self::BoundingRectangle => "BoundingRectangle",
            Self::IsEnabled => "IsEnabled",
            Self::IsOffscreen => "IsOffscreen",
            Self::ProcessId => "ProcessId",
            Self::IsGridItemPatternAvailable => "IsGridItemPatternAvailable",
            Self::Row => "Row",
            Self::Column => "Column",
            Self::RowCount => "RowCount",
            Self::ColumnCount => "ColumnCount",
            Self::IsSelected => "IsSelected",
            Self::ExpandCollapseState => "ExpandCollapseState",
            Self::Custom(name) => name,
        }
    }

    /// Look up a property by its short name; unknown names become `Custom`
    #[must_use]
    pub fn from_name(name: &str) -> Self {
        match name {
            "Name" => Self::Name,
            "AutomationId" => Self::AutomationId,
            "ClassName" => Self::ClassName,
            "ControlType" => Self::ControlType,
            "BoundingRectangle" => Self::BoundingRectangle,
            "IsEnabled" => Self::IsEnabled,
            "IsOffscreen" => Self::IsOffscreen,
            "ProcessId" => Self::ProcessId,
            "IsGridItemPatternAvailable" => Self::IsGridItemPatternAvailable,
            "Row" => Self::Row,
            "Column" => Self::Column,
            "RowCount" => Self::RowCount,
            "ColumnCount" => Self::ColumnCount,
            "IsSelected" => Self::IsSelected,
            "ExpandCollapseState" => Self::ExpandCollapseState,
            other => Self::Custom(other.to_string()),
        }
    }

    /// Parse a provider programmatic name such as
    /// `AutomationElementIdentifiers.NameProperty`.
    ///
    /// Returns `None` when the text does not follow the `Owner.XxxProperty`
    /// shape.
    #[must_use]
    pub fn from_programmatic_name(programmatic: &str) -> Option<Self> {
        static PATTERN: OnceLock<Option<Regex>> = OnceLock::new();
        let pattern = PATTERN
            .get_or_init(|| Regex::new(r"^.*\.(?P<name>[^.]+)Property$").ok())
            .as_ref()?;
        let captures = pattern.captures(programmatic)?;
        Some(Self::from_name(captures.name("name")?.as_str()))
    }

    /// Provider programmatic name
    #[must_use]
    pub fn programmatic_name(&self) -> String {
        let owner = match self {
            Self::Row | Self::Column => "GridItemPatternIdentifiers",
            Self::RowCount | Self::ColumnCount => "GridPatternIdentifiers",
            Self::IsSelected => "SelectionItemPatternIdentifiers",
            Self::ExpandCollapseState => "ExpandCollapsePatternIdentifiers",
            _ => "AutomationElementIdentifiers",
        };
        format!("{owner}.{}Property", self.name())
    }
}

impl fmt::Display for PropertyId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for PropertyId {
    type Err = ProbeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.is_empty() {
            return Err(ProbeError::InvalidArgument {
                reason: "UNKNOWN PROPERTY".to_string(),
                message: "empty property name".to_string(),
            });
        }
        Ok(Self::from_programmatic_name(s).unwrap_or_else(|| Self::from_name(s)))
    }
}

/// A property value read from (or compared against) a node
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum PropertyValue {
    /// Text
    String(String),
    /// Integer
    Int(i64),
    /// Boolean
    Bool(bool),
    /// Floating point
    Float(f64),
    /// Rectangle
    Rect(Rect),
    /// Control type
    ControlType(ControlType),
    /// Expand/collapse state
    ExpandCollapse(ExpandCollapseState),
}

impl PropertyValue {
    /// Type name used in diagnostics
    #[must_use]
    pub const fn type_name(&self) -> &'static str {
        match self {
            Self::String(_) => "string",
            Self::Int(_) => "int",
            Self::Bool(_) => "bool",
            Self::Float(_) => "float",
            Self::Rect(_) => "rect",
            Self::ControlType(_) => "control type",
            Self::ExpandCollapse(_) => "expand/collapse state",
        }
    }

    /// Borrow as text
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }

    /// Read as boolean
    #[must_use]
    pub const fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Read as integer
    #[must_use]
    pub const fn as_int(&self) -> Option<i64> {
        match self {
            Self::Int(i) => Some(*i),
            _ => None,
        }
    }

    /// Read as rectangle
    #[must_use]
    pub const fn as_rect(&self) -> Option<Rect> {
        match self {
            Self::Rect(r) => Some(*r),
            _ => None,
        }
    }

    /// Read as control type
    #[must_use]
    pub const fn as_control_type(&self) -> Option<ControlType> {
        match self {
            Self::ControlType(ct) => Some(*ct),
            _ => None,
        }
    }

    /// Read as expand/collapse state
    #[must_use]
    pub const fn as_expand_collapse(&self) -> Option<ExpandCollapseState> {
        match self {
            Self::ExpandCollapse(state) => Some(*state),
            _ => None,
        }
    }
}

impl fmt::Display for PropertyValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::String(s) => f.write_str(s),
            Self::Int(i) => write!(f, "{i}"),
            Self::Bool(true) => f.write_str("True"),
            Self::Bool(false) => f.write_str("False"),
            Self::Float(v) => write!(f, "{v}"),
            Self::Rect(r) => write!(f, "{r}"),
            Self::ControlType(ct) => write!(f, "{ct}"),
            Self::ExpandCollapse(state) => write!(f, "{state}"),
        }
    }
}

impl From<&str> for PropertyValue {
    fn from(value: &str) -> Self {
        Self::String(value.to_string())
    }
}

impl From<String> for PropertyValue {
    fn from(value: String) -> Self {
        Self::String(value)
    }
}

impl From<i64> for PropertyValue {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

impl From<i32> for PropertyValue {
    fn from(value: i32) -> Self {
        Self::Int(i64::from(value))
    }
}

impl From<u32> for PropertyValue {
    fn from(value: u32) -> Self {
        Self::Int(i64::from(value))
    }
}

impl From<bool> for PropertyValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<f64> for PropertyValue {
    fn from(value: f64) -> Self {
        Self::Float(value)
    }
}

impl From<Rect> for PropertyValue {
    fn from(value: Rect) -> Self {
        Self::Rect(value)
    }
}

impl From<ControlType> for PropertyValue {
    fn from(value: ControlType) -> Self {
        Self::ControlType(value)
    }
}

impl From<ExpandCollapseState> for PropertyValue {
    fn from(value: ExpandCollapseState) -> Self {
        Self::ExpandCollapse(value)
    }
}

// =============================================================================
// Scopes, patterns and scrolling
// =============================================================================

/// Which nodes a provider search visits, relative to its root
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TreeScope {
    /// The root only
    Element,
    /// Direct children of the root
    Children,
    /// All descendants of the root
    Descendants,
    /// The root and all its descendants
    Subtree,
}

impl TreeScope {
    /// Whether the root itself is a candidate
    #[must_use]
    pub const fn includes_self(&self) -> bool {
        matches!(self, Self::Element | Self::Subtree)
    }

    /// Whether descendants below the first level are candidates
    #[must_use]
    pub const fn includes_deep_descendants(&self) -> bool {
        matches!(self, Self::Descendants | Self::Subtree)
    }

    /// Whether direct children are candidates
    #[must_use]
    pub const fn includes_children(&self) -> bool {
        !matches!(self, Self::Element)
    }
}

/// Control patterns a node may support
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[allow(missing_docs)]
pub enum PatternKind {
    Scroll,
    ScrollItem,
    Invoke,
    Grid,
    GridItem,
    Selection,
    SelectionItem,
    ExpandCollapse,
    Text,
    Value,
    Window,
}

impl PatternKind {
    /// Display name, e.g. `ScrollPattern`
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Scroll => "ScrollPattern",
            Self::ScrollItem => "ScrollItemPattern",
            Self::Invoke => "InvokePattern",
            Self::Grid => "GridPattern",
            Self::GridItem => "GridItemPattern",
            Self::Selection => "SelectionPattern",
            Self::SelectionItem => "SelectionItemPattern",
            Self::ExpandCollapse => "ExpandCollapsePattern",
            Self::Text => "TextPattern",
            Self::Value => "ValuePattern",
            Self::Window => "WindowPattern",
        }
    }
}

impl fmt::Display for PatternKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// One scroll request along an axis
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ScrollAmount {
    /// One page back
    LargeDecrement,
    /// One line back
    SmallDecrement,
    /// No movement
    NoAmount,
    /// One page forward
    LargeIncrement,
    /// One line forward
    SmallIncrement,
}

/// Scroll position of a container
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScrollInfo {
    /// Horizontal position in 0..=100, or [`ScrollInfo::NO_SCROLL`]
    pub horizontal_percent: f64,
    /// Vertical position in 0..=100, or [`ScrollInfo::NO_SCROLL`]
    pub vertical_percent: f64,
    /// Visible share of the content width, in percent
    pub horizontal_view_size: f64,
    /// Visible share of the content height, in percent
    pub vertical_view_size: f64,
    /// Whether horizontal scrolling is possible
    pub horizontally_scrollable: bool,
    /// Whether vertical scrolling is possible
    pub vertically_scrollable: bool,
}

impl ScrollInfo {
    /// Sentinel percent for an axis that cannot scroll
    pub const NO_SCROLL: f64 = -1.0;

    /// A horizontal scrollbar is drawn
    #[must_use]
    pub fn has_horizontal_scroll_bar(&self) -> bool {
        self.horizontal_percent >= 0.0
    }

    /// A vertical scrollbar is drawn
    #[must_use]
    pub fn has_vertical_scroll_bar(&self) -> bool {
        self.vertical_percent >= 0.0
    }
}

// =============================================================================
// Provider trait
// =============================================================================

/// Access to an external accessibility tree.
///
/// Every method may fail with [`ProbeError::ElementNotAvailable`] when the node
/// left the tree. Property reads fail with
/// [`ProbeError::PropertyNotSupported`] when the node does not expose the
/// property.
pub trait TreeProvider: fmt::Debug {
    /// The desktop root
    fn root(&self) -> Node;

    /// All nodes under `root` within `scope` that satisfy `condition`, in
    /// tree order
    fn find_all(&self, root: &Node, scope: TreeScope, condition: &Condition)
        -> ProbeResult<Vec<Node>>;

    /// First node under `root` within `scope` that satisfies `condition`
    fn find_first(
        &self,
        root: &Node,
        scope: TreeScope,
        condition: &Condition,
    ) -> ProbeResult<Option<Node>> {
        Ok(self.find_all(root, scope, condition)?.into_iter().next())
    }

    /// Current value of a property
    fn property(&self, node: &Node, property: &PropertyId) -> ProbeResult<PropertyValue>;

    /// Properties this node exposes, in a stable order
    fn supported_properties(&self, node: &Node) -> ProbeResult<Vec<PropertyId>>;

    /// Whether the node supports a control pattern
    fn supports_pattern(&self, node: &Node, pattern: PatternKind) -> ProbeResult<bool>;

    /// Parent in the control view; `None` for the root
    fn parent(&self, node: &Node) -> ProbeResult<Option<Node>>;

    /// First child in the control view
    fn first_child(&self, node: &Node) -> ProbeResult<Option<Node>>;

    /// Next sibling in the control view
    fn next_sibling(&self, node: &Node) -> ProbeResult<Option<Node>>;

    /// Previous sibling in the control view
    fn previous_sibling(&self, node: &Node) -> ProbeResult<Option<Node>>;

    /// Document text through the text pattern; `None` without the pattern
    fn text_pattern_text(&self, node: &Node) -> ProbeResult<Option<String>>;

    /// Value through the value pattern; `None` without the pattern
    fn value_pattern_value(&self, node: &Node) -> ProbeResult<Option<String>>;

    /// Selected items through the selection pattern; `None` without the
    /// pattern
    fn selection(&self, node: &Node) -> ProbeResult<Option<Vec<Node>>>;

    /// Ask the node to bring itself into view through the scroll-item
    /// pattern; `false` without the pattern
    fn scroll_item_into_view(&self, node: &Node) -> ProbeResult<bool>;

    /// Scroll state; `None` without the scroll pattern
    fn scroll_info(&self, node: &Node) -> ProbeResult<Option<ScrollInfo>>;

    /// Scroll by one step on each axis
    fn scroll(
        &self,
        node: &Node,
        horizontal: ScrollAmount,
        vertical: ScrollAmount,
    ) -> ProbeResult<()>;
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    mod identity_tests {
        use super::*;

        #[test]
        fn test_runtime_id_display() {
            let id = RuntimeId::new(vec![42, 7, 3]);
            assert_eq!(id.to_string(), "42 7 3");
            assert_eq!(Node::new(id).to_string(), "node[42 7 3]");
        }

        #[test]
        fn test_node_identity_is_runtime_id() {
            let a = Node::new(RuntimeId::new(vec![1, 2]));
            let b = Node::new(RuntimeId::new(vec![1, 2]));
            let c = Node::new(RuntimeId::new(vec![1, 3]));
            assert_eq!(a, b);
            assert_ne!(a, c);
        }
    }

    mod control_type_tests {
        use super::*;

        #[test]
        fn test_names() {
            assert_eq!(ControlType::Button.name(), "Button");
            assert_eq!(ControlType::ListItem.programmatic_name(), "ControlType.ListItem");
            assert_eq!(ControlType::Window.to_string(), "ControlType.Window");
        }

        #[test]
        fn test_parse_both_forms() {
            assert_eq!("Button".parse::<ControlType>().unwrap(), ControlType::Button);
            assert_eq!(
                "ControlType.DataGrid".parse::<ControlType>().unwrap(),
                ControlType::DataGrid
            );
            assert!("Widget".parse::<ControlType>().is_err());
        }

        #[test]
        fn test_all_round_trips_names() {
            for ct in ControlType::ALL {
                assert_eq!(ct.name().parse::<ControlType>().unwrap(), *ct);
            }
        }
    }

    mod property_tests {
        use super::*;

        #[test]
        fn test_from_programmatic_name() {
            assert_eq!(
                PropertyId::from_programmatic_name("AutomationElementIdentifiers.NameProperty"),
                Some(PropertyId::Name)
            );
            assert_eq!(
                PropertyId::from_programmatic_name("GridItemPatternIdentifiers.RowProperty"),
                Some(PropertyId::Row)
            );
            assert_eq!(
                PropertyId::from_programmatic_name("Vendor.FancyProperty"),
                Some(PropertyId::Custom("Fancy".to_string()))
            );
            assert_eq!(PropertyId::from_programmatic_name("Name"), None);
        }

        #[test]
        fn test_programmatic_name_round_trip() {
            for id in PropertyId::STANDARD {
                let text = id.programmatic_name();
                assert_eq!(PropertyId::from_programmatic_name(&text).as_ref(), Some(id));
            }
        }

        #[test]
        fn test_parse_short_or_programmatic() {
            assert_eq!("Name".parse::<PropertyId>().unwrap(), PropertyId::Name);
            assert_eq!(
                "AutomationElementIdentifiers.ClassNameProperty"
                    .parse::<PropertyId>()
                    .unwrap(),
                PropertyId::ClassName
            );
            assert!("".parse::<PropertyId>().is_err());
        }

        #[test]
        fn test_value_display() {
            assert_eq!(PropertyValue::from("OK").to_string(), "OK");
            assert_eq!(PropertyValue::from(7).to_string(), "7");
            assert_eq!(PropertyValue::from(true).to_string(), "True");
            assert_eq!(
                PropertyValue::from(ControlType::Button).to_string(),
                "ControlType.Button"
            );
        }

        #[test]
        fn test_value_accessors() {
            let v = PropertyValue::from(Rect::new(1.0, 2.0, 3.0, 4.0));
            assert_eq!(v.as_rect(), Some(Rect::new(1.0, 2.0, 3.0, 4.0)));
            assert_eq!(v.as_str(), None);
            assert_eq!(v.type_name(), "rect");
            assert_eq!(PropertyValue::from(5_u32).as_int(), Some(5));
        }
    }

    mod scroll_info_tests {
        use super::*;

        #[test]
        fn test_scroll_bar_presence_uses_sentinel() {
            let info = ScrollInfo {
                horizontal_percent: ScrollInfo::NO_SCROLL,
                vertical_percent: 0.0,
                horizontal_view_size: 100.0,
                vertical_view_size: 10.0,
                horizontally_scrollable: false,
                vertically_scrollable: true,
            };
            assert!(!info.has_horizontal_scroll_bar());
            assert!(info.has_vertical_scroll_bar());
        }

        #[test]
        fn test_scope_flags() {
            assert!(TreeScope::Subtree.includes_self());
            assert!(!TreeScope::Descendants.includes_self());
            assert!(!TreeScope::Children.includes_deep_descendants());
            assert!(!TreeScope::Element.includes_children());
        }
    }
}
