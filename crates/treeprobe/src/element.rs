//! Element handles.
//!
//! An [`Element`] either holds a node directly or knows how to find it again:
//! a parent handle plus the strategy that located it. Nothing is cached, so a
//! lazy handle re-runs its search on every access and follows the tree as it
//! changes. Every handle shares a [`Session`], which owns the provider, the
//! settings and the diagnostics hook.
//!
//! ```rust,ignore
//! let session = Session::new(provider, Settings::default());
//! let ok = session.root().find_element(By::name("OK"))?;
//! ```

use crate::convergence::ViewportConvergence;
use crate::geometry::{Point, Rect};
use crate::locator::{PollOptions, RetryingLocator};
use crate::result::{ProbeError, ProbeResult};
use crate::scroll::ScrollPattern;
use crate::settings::Settings;
use crate::strategy::By;
use crate::tree::{
    ControlType, ExpandCollapseState, Node, PatternKind, PropertyId, PropertyValue, TreeProvider,
};
use serde::Serialize;
use std::fmt;
use std::rc::Rc;
use tracing::{debug, info};

// =============================================================================
// Diagnostics
// =============================================================================

/// Receives failure notifications, typically to capture a screenshot.
///
/// Called only when [`Settings::automatic_screenshot_capture`] is on.
pub trait DiagnosticsHook: fmt::Debug {
    /// Record the state of the screen; `context` names the failure
    fn capture(&self, context: &str);
}

/// Hook that does nothing
#[derive(Debug, Clone, Copy, Default)]
pub struct NoDiagnostics;

impl DiagnosticsHook for NoDiagnostics {
    fn capture(&self, _context: &str) {}
}

// =============================================================================
// Session
// =============================================================================

/// Provider, settings and diagnostics shared by every handle
#[derive(Debug)]
pub struct Session {
    locator: RetryingLocator,
    settings: Settings,
    diagnostics: Rc<dyn DiagnosticsHook>,
}

impl Session {
    /// Create a session without diagnostics
    #[must_use]
    pub fn new(provider: Rc<dyn TreeProvider>, settings: Settings) -> Rc<Self> {
        Self::with_diagnostics(provider, settings, Rc::new(NoDiagnostics))
    }

    /// Create a session reporting failures to `diagnostics`
    #[must_use]
    pub fn with_diagnostics(
        provider: Rc<dyn TreeProvider>,
        settings: Settings,
        diagnostics: Rc<dyn DiagnosticsHook>,
    ) -> Rc<Self> {
        let locator = RetryingLocator::new(provider, PollOptions::from(&settings));
        Rc::new(Self {
            locator,
            settings,
            diagnostics,
        })
    }

    /// The tree provider
    #[must_use]
    pub fn provider(&self) -> &Rc<dyn TreeProvider> {
        self.locator.provider()
    }

    /// Session settings
    #[must_use]
    pub const fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Locator configured from the settings
    #[must_use]
    pub const fn locator(&self) -> &RetryingLocator {
        &self.locator
    }

    /// Handle on the desktop root
    #[must_use]
    pub fn root(self: &Rc<Self>) -> Element {
        Element::from_node(self, self.provider().root())
    }

    /// Invoke the diagnostics hook if automatic capture is on
    pub fn capture_if_needed(&self, context: &str) {
        if self.settings.automatic_screenshot_capture {
            debug!(context, "capturing diagnostics");
            self.diagnostics.capture(context);
        }
    }
}

// =============================================================================
// Text
// =============================================================================

/// Where to read an element's text from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum TextStrategy {
    /// Text pattern first, then value pattern
    #[default]
    Any,
    /// Text pattern only
    TextPattern,
    /// Value pattern only
    ValuePattern,
}

/// Text of `node`, or `None` when no pattern in `strategy` yields it
pub(crate) fn read_text(
    provider: &dyn TreeProvider,
    node: &Node,
    strategy: TextStrategy,
) -> ProbeResult<Option<String>> {
    match strategy {
        TextStrategy::TextPattern => provider.text_pattern_text(node),
        TextStrategy::ValuePattern => provider.value_pattern_value(node),
        TextStrategy::Any => match provider.text_pattern_text(node)? {
            Some(text) => Ok(Some(text)),
            None => provider.value_pattern_value(node),
        },
    }
}

// =============================================================================
// Typed properties
// =============================================================================

/// Conversion out of a [`PropertyValue`]
pub trait FromPropertyValue: Sized {
    /// Type name used in mismatch errors
    const TYPE_NAME: &'static str;

    /// Convert, or `None` if the value has another type
    fn from_property_value(value: PropertyValue) -> Option<Self>;
}

impl FromPropertyValue for PropertyValue {
    const TYPE_NAME: &'static str = "value";

    fn from_property_value(value: PropertyValue) -> Option<Self> {
        Some(value)
    }
}

impl FromPropertyValue for String {
    const TYPE_NAME: &'static str = "String";

    fn from_property_value(value: PropertyValue) -> Option<Self> {
        match value {
            PropertyValue::String(s) => Some(s),
            _ => None,
        }
    }
}

impl FromPropertyValue for bool {
    const TYPE_NAME: &'static str = "Bool";

    fn from_property_value(value: PropertyValue) -> Option<Self> {
        value.as_bool()
    }
}

impl FromPropertyValue for i64 {
    const TYPE_NAME: &'static str = "Int";

    fn from_property_value(value: PropertyValue) -> Option<Self> {
        value.as_int()
    }
}

impl FromPropertyValue for i32 {
    const TYPE_NAME: &'static str = "Int";

    fn from_property_value(value: PropertyValue) -> Option<Self> {
        value.as_int().and_then(|v| Self::try_from(v).ok())
    }
}

impl FromPropertyValue for f64 {
    const TYPE_NAME: &'static str = "Float";

    fn from_property_value(value: PropertyValue) -> Option<Self> {
        match value {
            PropertyValue::Float(v) => Some(v),
            _ => None,
        }
    }
}

impl FromPropertyValue for Rect {
    const TYPE_NAME: &'static str = "Rect";

    fn from_property_value(value: PropertyValue) -> Option<Self> {
        value.as_rect()
    }
}

impl FromPropertyValue for ControlType {
    const TYPE_NAME: &'static str = "ControlType";

    fn from_property_value(value: PropertyValue) -> Option<Self> {
        value.as_control_type()
    }
}

impl FromPropertyValue for ExpandCollapseState {
    const TYPE_NAME: &'static str = "ExpandCollapse";

    fn from_property_value(value: PropertyValue) -> Option<Self> {
        value.as_expand_collapse()
    }
}

/// Snapshot of the commonly inspected properties of an element
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ElementProperties {
    /// `Name`
    pub name: String,
    /// Runtime id, space separated
    pub runtime_id: String,
    /// `IsEnabled`
    pub is_enabled: bool,
    /// `IsOffscreen`
    pub is_offscreen: bool,
    /// `BoundingRectangle`
    pub bounding_rectangle: Rect,
    /// Scaled center of the bounding rectangle; `None` when it is empty
    pub clickable_point: Option<Point>,
}

// =============================================================================
// Element
// =============================================================================

/// Handle on a tree node, direct or lazily resolved
#[derive(Clone)]
pub struct Element {
    session: Rc<Session>,
    node: Option<Node>,
    parent: Option<Rc<Element>>,
    strategy: Option<By>,
}

impl fmt::Debug for Element {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Element")
            .field("node", &self.node)
            .field("strategy", &self.strategy.as_ref().map(ToString::to_string))
            .finish_non_exhaustive()
    }
}

impl Element {
    /// Create a handle.
    ///
    /// Fails with [`ProbeError::InvalidHandle`] unless `node` is set or both
    /// `parent` and `strategy` are.
    pub fn new(
        session: &Rc<Session>,
        node: Option<Node>,
        parent: Option<Self>,
        strategy: Option<By>,
    ) -> ProbeResult<Self> {
        if node.is_none() && (parent.is_none() || strategy.is_none()) {
            return Err(ProbeError::InvalidHandle {
                message: "need a node or a parent with a search strategy".to_string(),
            });
        }
        Ok(Self {
            session: Rc::clone(session),
            node,
            parent: parent.map(Rc::new),
            strategy,
        })
    }

    /// Handle holding `node` directly
    #[must_use]
    pub fn from_node(session: &Rc<Session>, node: Node) -> Self {
        Self {
            session: Rc::clone(session),
            node: Some(node),
            parent: None,
            strategy: None,
        }
    }

    /// Handle that searches `parent` with `strategy` whenever it is used
    #[must_use]
    pub fn lazy(parent: &Self, strategy: impl Into<By>) -> Self {
        Self {
            session: Rc::clone(&parent.session),
            node: None,
            parent: Some(Rc::new(parent.clone())),
            strategy: Some(strategy.into()),
        }
    }

    pub(crate) fn found(&self, node: Node, strategy: By) -> Self {
        Self {
            session: Rc::clone(&self.session),
            node: Some(node),
            parent: Some(Rc::new(self.clone())),
            strategy: Some(strategy),
        }
    }

    /// The session this handle belongs to
    #[must_use]
    pub fn session(&self) -> &Rc<Session> {
        &self.session
    }

    /// Parent handle, if this handle came from a search
    #[must_use]
    pub fn parent(&self) -> Option<&Self> {
        self.parent.as_deref()
    }

    /// Strategy that located this handle
    #[must_use]
    pub const fn strategy(&self) -> Option<&By> {
        self.strategy.as_ref()
    }

    fn provider(&self) -> &dyn TreeProvider {
        self.session.provider().as_ref()
    }

    /// The node behind this handle.
    ///
    /// A direct handle returns its node. A lazy handle resolves its parent
    /// and searches it for up to the session's search timeout; a miss is
    /// [`ProbeError::ElementNotFound`].
    pub fn resolve(&self) -> ProbeResult<Node> {
        if let Some(node) = &self.node {
            return Ok(node.clone());
        }
        let (Some(parent), Some(strategy)) = (&self.parent, &self.strategy) else {
            return Err(ProbeError::InvalidHandle {
                message: "handle has neither node nor search strategy".to_string(),
            });
        };
        let parent_node = parent.resolve()?;
        self.session
            .locator()
            .find_first(&parent_node, strategy, self.session.settings.search_timeout_ms)?
            .ok_or_else(|| ProbeError::ElementNotFound {
                element: strategy.to_string(),
            })
    }

    /// Copy of this handle holding the currently resolved node
    pub fn pinned(&self) -> ProbeResult<Self> {
        let node = self.resolve()?;
        Ok(Self {
            node: Some(node),
            ..self.clone()
        })
    }

    /// True once the node left the tree (or can no longer be found)
    pub fn is_stale(&self) -> ProbeResult<bool> {
        match self.raw_property(&PropertyId::AutomationId) {
            Ok(_) | Err(ProbeError::PropertyNotSupported { .. }) => Ok(false),
            Err(e) if e.is_stale() => Ok(true),
            Err(e) => Err(e),
        }
    }

    /// Whether both handles currently resolve to the same node
    pub fn same_node(&self, other: &Self) -> ProbeResult<bool> {
        Ok(self.resolve()? == other.resolve()?)
    }

    // =========================================================================
    // Searching
    // =========================================================================

    /// First descendant matching `strategy` within the search timeout
    pub fn find_element(&self, strategy: impl Into<By>) -> ProbeResult<Option<Self>> {
        self.find_element_with_timeout(strategy, self.session.settings.search_timeout_ms)
    }

    /// First descendant matching `strategy` within `timeout_ms`.
    ///
    /// A miss is logged and reported to the diagnostics hook.
    pub fn find_element_with_timeout(
        &self,
        strategy: impl Into<By>,
        timeout_ms: u64,
    ) -> ProbeResult<Option<Self>> {
        let strategy = strategy.into();
        let parent = self.resolve()?;
        match self.session.locator().find_first(&parent, &strategy, timeout_ms)? {
            Some(node) => Ok(Some(self.found(node, strategy))),
            None => {
                info!(%strategy, "element not found");
                self.session.capture_if_needed("element not found");
                Ok(None)
            }
        }
    }

    /// First descendant with this `Name`
    pub fn find_element_by_name(&self, name: &str) -> ProbeResult<Option<Self>> {
        self.find_element(By::name(name))
    }

    /// First descendant with this `AutomationId`
    pub fn find_element_by_uid(&self, uid: &str) -> ProbeResult<Option<Self>> {
        self.find_element(By::uid(uid))
    }

    /// Every descendant matching `strategy`
    pub fn find_elements(&self, strategy: impl Into<By>) -> ProbeResult<Vec<Self>> {
        let strategy = strategy.into();
        let parent = self.resolve()?;
        let nodes = self.session.locator().find_all(
            &parent,
            &strategy,
            self.session.settings.search_timeout_ms,
        )?;
        Ok(nodes
            .into_iter()
            .map(|node| self.found(node, strategy.clone()))
            .collect())
    }

    // =========================================================================
    // Properties
    // =========================================================================

    /// Untyped property value
    pub fn raw_property(&self, property: &PropertyId) -> ProbeResult<PropertyValue> {
        let node = self.resolve()?;
        self.provider().property(&node, property)
    }

    /// Property value converted to `T`
    pub fn property<T: FromPropertyValue>(&self, property: &PropertyId) -> ProbeResult<T> {
        let value = self.raw_property(property)?;
        let actual = value.to_string();
        T::from_property_value(value).ok_or_else(|| ProbeError::PropertyType {
            property: property.name().to_string(),
            expected: T::TYPE_NAME,
            actual,
        })
    }

    /// `Name`
    pub fn name(&self) -> ProbeResult<String> {
        self.property(&PropertyId::Name)
    }

    /// `AutomationId`
    pub fn automation_id(&self) -> ProbeResult<String> {
        self.property(&PropertyId::AutomationId)
    }

    /// `ClassName`
    pub fn class_name(&self) -> ProbeResult<String> {
        self.property(&PropertyId::ClassName)
    }

    /// `ControlType`
    pub fn control_type(&self) -> ProbeResult<ControlType> {
        self.property(&PropertyId::ControlType)
    }

    /// `BoundingRectangle`
    pub fn bounding_rectangle(&self) -> ProbeResult<Rect> {
        self.property(&PropertyId::BoundingRectangle)
    }

    /// `IsEnabled`
    pub fn is_enabled(&self) -> ProbeResult<bool> {
        self.property(&PropertyId::IsEnabled)
    }

    /// `IsOffscreen`
    pub fn is_offscreen(&self) -> ProbeResult<bool> {
        self.property(&PropertyId::IsOffscreen)
    }

    /// `ProcessId`
    pub fn process_id(&self) -> ProbeResult<i64> {
        self.property(&PropertyId::ProcessId)
    }

    /// Snapshot of name, runtime id, state and geometry
    pub fn properties(&self) -> ProbeResult<ElementProperties> {
        let node = self.resolve()?;
        let bounding_rectangle = self.bounding_rectangle()?;
        let clickable_point = (!bounding_rectangle.is_empty())
            .then(|| self.session.settings.screen_scale.scaled_center(&bounding_rectangle));
        Ok(ElementProperties {
            name: self.name()?,
            runtime_id: node.runtime_id().to_string(),
            is_enabled: self.is_enabled()?,
            is_offscreen: self.is_offscreen()?,
            bounding_rectangle,
            clickable_point,
        })
    }

    // =========================================================================
    // Geometry
    // =========================================================================

    fn located_rect(&self) -> ProbeResult<Rect> {
        let rect = self.bounding_rectangle()?;
        if rect.is_empty() {
            return Err(ProbeError::GeometryIndeterminate {
                element: self.to_string(),
                cause: format!("empty bounding rectangle {rect}"),
            });
        }
        Ok(rect)
    }

    /// Center of the bounding rectangle, in physical pixels.
    ///
    /// This is the point scroll alignment works with.
    pub fn interaction_point(&self) -> ProbeResult<Point> {
        Ok(self.located_rect()?.center())
    }

    /// Center of the bounding rectangle in logical pixels, for input
    /// synthesis
    pub fn clickable_point(&self) -> ProbeResult<Point> {
        let rect = self.located_rect()?;
        Ok(self.session.settings.screen_scale.scaled_center(&rect))
    }

    // =========================================================================
    // Patterns
    // =========================================================================

    /// Whether the node supports `pattern`
    pub fn supports_pattern(&self, pattern: PatternKind) -> ProbeResult<bool> {
        let node = self.resolve()?;
        self.provider().supports_pattern(&node, pattern)
    }

    /// Scroll pattern of the node, if supported
    pub fn scroll_pattern(&self) -> ProbeResult<Option<ScrollPattern>> {
        let node = self.resolve()?;
        if self.provider().supports_pattern(&node, PatternKind::Scroll)? {
            Ok(Some(ScrollPattern::new(Rc::clone(self.session.provider()), node)))
        } else {
            Ok(None)
        }
    }

    /// Bring the element into view.
    ///
    /// Uses the element's own scroll-item pattern when it has one; otherwise
    /// `scrollable_parent` is scrolled line by line until the element's
    /// center lies inside it. See [`ViewportConvergence::scroll_into_view`].
    pub fn scroll_into_view(&self, scrollable_parent: Option<&Self>) -> ProbeResult<()> {
        ViewportConvergence::new(&self.session).scroll_into_view(self, scrollable_parent)
    }

    /// Text through the text pattern, falling back to the value pattern
    pub fn text(&self) -> ProbeResult<String> {
        self.text_with(TextStrategy::Any)
    }

    /// Text through `strategy`; [`ProbeError::TextUnavailable`] if none yields
    pub fn text_with(&self, strategy: TextStrategy) -> ProbeResult<String> {
        let node = self.resolve()?;
        if let Some(text) = read_text(self.provider(), &node, strategy)? {
            return Ok(text);
        }
        info!(element = %self, ?strategy, "text not available");
        self.session.capture_if_needed("text not available");
        Err(ProbeError::TextUnavailable {
            element: self.to_string(),
        })
    }

    fn describe(&self, node: &Node) -> ProbeResult<String> {
        let provider = self.provider();
        let control_type = provider.property(node, &PropertyId::ControlType)?;
        let mut text = format!("type: {control_type}");
        for (label, property) in [("uid", PropertyId::AutomationId), ("name", PropertyId::Name)] {
            match provider.property(node, &property) {
                Ok(value) => {
                    let value = value.to_string();
                    if !value.is_empty() {
                        text.push_str(&format!(", {label}: {value}"));
                    }
                }
                Err(ProbeError::PropertyNotSupported { .. }) => {}
                Err(e) => return Err(e),
            }
        }
        Ok(text)
    }
}

/// `type: ControlType.Button, uid: ok, name: OK` for handles holding a node.
/// Lazy handles render their strategy without searching.
impl fmt::Display for Element {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (&self.node, &self.strategy) {
            (Some(node), strategy) => match self.describe(node) {
                Ok(text) => f.write_str(&text),
                Err(_) => match strategy {
                    Some(by) => write!(f, "{by} (unavailable)"),
                    None => write!(f, "{node} (unavailable)"),
                },
            },
            (None, Some(by)) => write!(f, "{by}"),
            (None, None) => f.write_str("<invalid element>"),
        }
    }
}
