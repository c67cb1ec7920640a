//! Scroll convergence.
//!
//! Brings an element that may be scrolled out of view (or not realized at
//! all in a virtualized container) into the visible part of its container:
//!
//! 1. probe for the element with the short probe timeout;
//! 2. on a miss, reset the container to its origin, probe again and sweep
//!    page by page, probing after every page;
//! 3. once found, nudge line by line until the element's center lies inside
//!    the viewport (bottom, top, right, left, in that order).
//!
//! Every scroll loop stops as soon as a step leaves the scroll position
//! unchanged, so a provider that ignores scroll requests cannot hang the
//! caller.

use crate::element::{Element, Session};
use crate::geometry::Edge;
use crate::result::{ProbeError, ProbeResult};
use crate::scroll::ScrollPattern;
use crate::strategy::By;
use crate::tree::{PatternKind, PropertyId, ScrollAmount, ScrollInfo};
use std::cell::{Cell, OnceCell};
use std::rc::Rc;
use tracing::{debug, error, warn};

// =============================================================================
// CONSTANTS
// =============================================================================

/// Scroll percent at or below which a container counts as reset
pub const RESET_THRESHOLD_PERCENT: f64 = 0.1;

/// Scroll percent at or above which a sweep has reached the end
pub const SWEEP_END_PERCENT: f64 = 99.9;

/// Class name of drop-down popup windows
pub const POPUP_CLASS_NAME: &str = "Popup";

/// Reason carried by every scroll failure
pub const NOT_SCROLL: &str = "NOT SCROLL";

/// What the found element is aligned against
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Viewport {
    /// The scrolled container itself
    #[default]
    Container,
    /// The popup window owned by the container's process (drop-down lists)
    Popup,
}

/// Scroll axis
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(crate) enum Axis {
    Vertical,
    Horizontal,
}

impl Edge {
    const fn scroll_step(self) -> (Axis, ScrollAmount) {
        match self {
            Self::Bottom => (Axis::Vertical, ScrollAmount::SmallIncrement),
            Self::Top => (Axis::Vertical, ScrollAmount::SmallDecrement),
            Self::Right => (Axis::Horizontal, ScrollAmount::SmallIncrement),
            Self::Left => (Axis::Horizontal, ScrollAmount::SmallDecrement),
        }
    }
}

/// Fails with `ElementNotEnabled` (and captures diagnostics) if `element` is
/// disabled
pub(crate) fn ensure_enabled(element: &Element, reason: &str) -> ProbeResult<()> {
    if element.is_enabled()? {
        return Ok(());
    }
    error!(element = %element, reason, "element not enabled");
    element.session().capture_if_needed("element not enabled");
    Err(ProbeError::ElementNotEnabled {
        reason: reason.to_string(),
        element: element.to_string(),
    })
}

// =============================================================================
// Scroller
// =============================================================================

/// Scroll driver for one container.
///
/// The scroll pattern is looked up on first use, so a container whose
/// target is visible without scrolling needs no pattern at all.
#[derive(Debug)]
pub(crate) struct Scroller<'a> {
    container: &'a Element,
    pattern: OnceCell<Option<ScrollPattern>>,
    steps: Cell<u32>,
}

impl<'a> Scroller<'a> {
    pub(crate) fn new(container: &'a Element) -> Self {
        Self {
            container,
            pattern: OnceCell::new(),
            steps: Cell::new(0),
        }
    }

    /// Scroll requests issued so far
    pub(crate) fn steps(&self) -> u32 {
        self.steps.get()
    }

    fn try_pattern(&self) -> ProbeResult<Option<&ScrollPattern>> {
        if let Some(pattern) = self.pattern.get() {
            return Ok(pattern.as_ref());
        }
        let pattern = self.container.scroll_pattern()?;
        Ok(self.pattern.get_or_init(|| pattern).as_ref())
    }

    /// The scroll pattern, or `PatternNotSupported`
    pub(crate) fn pattern(&self) -> ProbeResult<&ScrollPattern> {
        self.try_pattern()?.ok_or_else(|| {
            debug!(container = %self.container, "scroll pattern not supported");
            ProbeError::PatternNotSupported {
                reason: NOT_SCROLL.to_string(),
                pattern: PatternKind::Scroll.name().to_string(),
                element: self.container.to_string(),
            }
        })
    }

    fn info(&self) -> ProbeResult<Option<ScrollInfo>> {
        match self.try_pattern()? {
            Some(pattern) => Ok(Some(pattern.info()?)),
            None => Ok(None),
        }
    }

    pub(crate) fn is_scrollable(&self, axis: Axis) -> ProbeResult<bool> {
        Ok(self.info()?.is_some_and(|info| match axis {
            Axis::Vertical => info.vertically_scrollable,
            Axis::Horizontal => info.horizontally_scrollable,
        }))
    }

    fn percent(&self, axis: Axis) -> ProbeResult<f64> {
        let info = self.pattern()?.info()?;
        Ok(match axis {
            Axis::Vertical => info.vertical_percent,
            Axis::Horizontal => info.horizontal_percent,
        })
    }

    /// Scroll one step; `false` if the position did not change
    fn step(&self, axis: Axis, amount: ScrollAmount) -> ProbeResult<bool> {
        let before = self.percent(axis)?;
        let pattern = self.pattern()?;
        match axis {
            Axis::Vertical => pattern.scroll_vertical(amount)?,
            Axis::Horizontal => pattern.scroll_horizontal(amount)?,
        }
        self.steps.set(self.steps.get() + 1);
        let after = self.percent(axis)?;
        let moved = (after - before).abs() > f64::EPSILON;
        if !moved {
            warn!(container = %self.container, ?axis, ?amount, percent = after, "scroll position did not change");
        }
        Ok(moved)
    }

    /// Page back to the origin: vertically, then horizontally if possible
    pub(crate) fn reset(&self) -> ProbeResult<()> {
        self.reset_axis(Axis::Vertical)?;
        if self.is_scrollable(Axis::Horizontal)? {
            self.reset_axis(Axis::Horizontal)?;
        }
        Ok(())
    }

    /// Page back to the origin along one axis
    pub(crate) fn reset_axis(&self, axis: Axis) -> ProbeResult<()> {
        while self.percent(axis)? > RESET_THRESHOLD_PERCENT {
            if !self.step(axis, ScrollAmount::LargeDecrement)? {
                break;
            }
        }
        Ok(())
    }

    /// Page forward along `axis`, running `probe` after every page, until it
    /// hits or the end of the range is reached
    pub(crate) fn sweep<T>(
        &self,
        axis: Axis,
        mut probe: impl FnMut() -> ProbeResult<Option<T>>,
    ) -> ProbeResult<Option<T>> {
        loop {
            let percent = self.percent(axis)?;
            if !(0.0..SWEEP_END_PERCENT).contains(&percent) {
                return Ok(None);
            }
            if !self.step(axis, ScrollAmount::LargeIncrement)? {
                return Ok(None);
            }
            if let Some(found) = probe()? {
                return Ok(Some(found));
            }
        }
    }

    /// Scroll line by line until the center of `target` is inside
    /// `viewport` for every edge in `edges`.
    ///
    /// The bottom edge is pulled in by the scrollbar height when a
    /// horizontal scrollbar is drawn, and the right edge by the scrollbar
    /// width when a vertical one is.
    pub(crate) fn align(&self, target: &Element, viewport: &Element, edges: &[Edge]) -> ProbeResult<()> {
        let settings = self.container.session().settings();
        for &edge in edges {
            let (axis, amount) = edge.scroll_step();
            loop {
                let point = target.interaction_point()?;
                let rect = viewport.bounding_rectangle()?;
                if rect.is_empty() {
                    return Err(ProbeError::GeometryIndeterminate {
                        element: viewport.to_string(),
                        cause: format!("empty viewport rectangle {rect}"),
                    });
                }
                let inset = match (edge, self.info()?) {
                    (Edge::Bottom, Some(info)) if info.has_horizontal_scroll_bar() => {
                        f64::from(settings.scroll_bar_height)
                    }
                    (Edge::Right, Some(info)) if info.has_vertical_scroll_bar() => {
                        f64::from(settings.scroll_bar_width)
                    }
                    _ => 0.0,
                };
                if !rect.is_beyond(&point, edge, inset) {
                    break;
                }
                if !self.step(axis, amount)? {
                    break;
                }
            }
        }
        Ok(())
    }
}

// =============================================================================
// Convergence
// =============================================================================

/// Scroll-until-visible search
#[derive(Debug, Clone)]
pub struct ViewportConvergence {
    session: Rc<Session>,
}

impl ViewportConvergence {
    /// Create for a session
    #[must_use]
    pub fn new(session: &Rc<Session>) -> Self {
        Self {
            session: Rc::clone(session),
        }
    }

    /// One search of `container` with the probe timeout
    pub(crate) fn probe(&self, container: &Element, strategy: &By, timeout_ms: u64) -> ProbeResult<Option<Element>> {
        let node = container.resolve()?;
        Ok(self
            .session
            .locator()
            .find_first(&node, strategy, timeout_ms)?
            .map(|found| container.found(found, strategy.clone())))
    }

    /// Scroll `container` until an element matching `strategy` is visible.
    ///
    /// Returns `Ok(None)` when the whole range was swept without a match.
    ///
    /// # Errors
    ///
    /// `ElementNotEnabled` for a disabled container (before any scrolling),
    /// `PatternNotSupported` when scrolling is needed but impossible,
    /// `Precondition` when the popup viewport cannot be found, and
    /// `GeometryIndeterminate` when the element has no rectangle to align.
    pub fn scroll_to(
        &self,
        container: &Element,
        strategy: impl Into<By>,
        viewport: Viewport,
    ) -> ProbeResult<Option<Element>> {
        let strategy = strategy.into();
        ensure_enabled(container, NOT_SCROLL)?;

        let probe_timeout = self.session.settings().probe_timeout_ms;
        let scroller = Scroller::new(container);
        let mut found = self.probe(container, &strategy, probe_timeout)?;

        if found.is_none() {
            scroller.pattern()?;
            if scroller.is_scrollable(Axis::Vertical)? {
                scroller.reset()?;
                found = self.probe(container, &strategy, probe_timeout)?;
                if found.is_none() {
                    found = scroller.sweep(Axis::Vertical, || self.probe(container, &strategy, probe_timeout))?;
                }
            }
        }

        let Some(element) = found else {
            debug!(container = %container, %strategy, steps = scroller.steps(), "no matching element in container");
            return Ok(None);
        };

        let view = match viewport {
            Viewport::Container => container.clone(),
            Viewport::Popup => self.popup(container)?,
        };
        scroller.align(&element, &view, &[Edge::Bottom, Edge::Top, Edge::Right, Edge::Left])?;
        debug!(element = %element, steps = scroller.steps(), "scrolled into view");
        Ok(Some(element))
    }

    /// Bring an element that is already realized into view.
    ///
    /// An element with the scroll-item pattern scrolls itself. Otherwise
    /// `scrollable_parent` is scrolled line by line (bottom, top, right,
    /// left) on each axis it can scroll.
    ///
    /// # Errors
    ///
    /// `Precondition` when no parent is given and the element cannot scroll
    /// itself, or when the element is still off-screen afterwards;
    /// `PatternNotSupported` when the parent cannot scroll.
    pub fn scroll_into_view(&self, element: &Element, scrollable_parent: Option<&Element>) -> ProbeResult<()> {
        let node = element.resolve()?;
        if self.session.provider().scroll_item_into_view(&node)? {
            debug!(element = %element, "scrolled into view by the element itself");
            return Ok(());
        }
        let Some(parent) = scrollable_parent else {
            error!(element = %element, "no scrollable parent given");
            return Err(ProbeError::precondition(
                NOT_SCROLL,
                format!("no scrollable parent given for {element}"),
            ));
        };

        let scroller = Scroller::new(parent);
        scroller.pattern()?;
        let mut edges = Vec::new();
        if scroller.is_scrollable(Axis::Vertical)? {
            edges.extend([Edge::Bottom, Edge::Top]);
        }
        if scroller.is_scrollable(Axis::Horizontal)? {
            edges.extend([Edge::Right, Edge::Left]);
        }
        scroller.align(element, parent, &edges)?;

        if element.is_offscreen()? {
            error!(element = %element, parent = %parent, steps = scroller.steps(), "element still off-screen");
            element.session().capture_if_needed("element not scrolled into view");
            return Err(ProbeError::precondition(
                NOT_SCROLL,
                format!("could not scroll {element} into view"),
            ));
        }
        debug!(element = %element, steps = scroller.steps(), "scrolled into view");
        Ok(())
    }

    /// Popup window of the container's process
    fn popup(&self, container: &Element) -> ProbeResult<Element> {
        let process_id = container.process_id()?;
        let strategy = By::class_name(POPUP_CLASS_NAME).and(PropertyId::ProcessId, process_id);
        match self.session.root().find_element(strategy)? {
            Some(popup) => Ok(popup),
            None => {
                error!(container = %container, process_id, "popup window of drop-down list not found");
                Err(ProbeError::precondition(
                    NOT_SCROLL,
                    format!("popup window of {container} not found"),
                ))
            }
        }
    }
}
