//! In-memory accessibility tree.
//!
//! Nodes live in an arena and are addressed by [`NodeKey`]. Rectangles are
//! given in layout coordinates, i.e. where the node would be with every
//! scroll container at its origin; the rectangle reported to callers is
//! shifted by the offsets of all scrolling ancestors. A virtualized scroll
//! container only realizes the children that currently intersect its
//! viewport, like a real virtualizing list does.

use crate::condition::Condition;
use crate::element::DiagnosticsHook;
use crate::geometry::Rect;
use crate::result::{ProbeError, ProbeResult};
use crate::tree::{
    ControlType, Node, PatternKind, PropertyId, PropertyValue, RuntimeId, ScrollAmount,
    ScrollInfo, TreeProvider, TreeScope,
};
use std::cell::{Cell, RefCell};

/// Index of a node in a [`MockTree`]
pub type NodeKey = usize;

/// First runtime-id component of every mock node
pub const RUNTIME_ID_PREFIX: i32 = 42;

/// Process id given to nodes that do not set one
pub const DEFAULT_PROCESS_ID: i64 = 1000;

/// Line size used for small scroll steps
pub const DEFAULT_LINE_SIZE: f64 = 20.0;

/// Bounds of the mock desktop
pub const DESKTOP_RECT: Rect = Rect::new(0.0, 0.0, 1920.0, 1080.0);

// =============================================================================
// Node description
// =============================================================================

/// Description of a node to add to a [`MockTree`]
#[derive(Debug, Clone)]
pub struct MockNode {
    control_type: ControlType,
    name: String,
    automation_id: String,
    class_name: String,
    rect: Rect,
    enabled: bool,
    process_id: i64,
    text: Option<String>,
    value: Option<String>,
    extra: Vec<(PropertyId, PropertyValue)>,
    patterns: Vec<PatternKind>,
    scrollable: bool,
    scroll_viewport: Option<Rect>,
    virtualized: bool,
    stalled_scroll: bool,
    line_size: f64,
    realization_lag: usize,
    selection: Vec<NodeKey>,
}

impl MockNode {
    /// An enabled node of `control_type` with no name and an empty rectangle
    #[must_use]
    pub fn new(control_type: ControlType) -> Self {
        Self {
            control_type,
            name: String::new(),
            automation_id: String::new(),
            class_name: String::new(),
            rect: Rect::EMPTY,
            enabled: true,
            process_id: DEFAULT_PROCESS_ID,
            text: None,
            value: None,
            extra: Vec::new(),
            patterns: Vec::new(),
            scrollable: false,
            scroll_viewport: None,
            virtualized: false,
            stalled_scroll: false,
            line_size: DEFAULT_LINE_SIZE,
            realization_lag: 0,
            selection: Vec::new(),
        }
    }

    /// Set `Name`
    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Set `AutomationId`
    #[must_use]
    pub fn with_automation_id(mut self, id: impl Into<String>) -> Self {
        self.automation_id = id.into();
        self
    }

    /// Set `ClassName`
    #[must_use]
    pub fn with_class_name(mut self, class_name: impl Into<String>) -> Self {
        self.class_name = class_name.into();
        self
    }

    /// Set the layout rectangle
    #[must_use]
    pub const fn with_rect(mut self, rect: Rect) -> Self {
        self.rect = rect;
        self
    }

    /// Set `IsEnabled`
    #[must_use]
    pub const fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    /// Set `ProcessId`
    #[must_use]
    pub const fn with_process_id(mut self, process_id: i64) -> Self {
        self.process_id = process_id;
        self
    }

    /// Support the text pattern with this document text
    #[must_use]
    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = Some(text.into());
        self
    }

    /// Support the value pattern with this value
    #[must_use]
    pub fn with_value(mut self, value: impl Into<String>) -> Self {
        self.value = Some(value.into());
        self
    }

    /// Expose an additional property, after the standard ones
    #[must_use]
    pub fn with_property(mut self, property: PropertyId, value: impl Into<PropertyValue>) -> Self {
        let value = value.into();
        match self.extra.iter_mut().find(|(p, _)| *p == property) {
            Some(slot) => slot.1 = value,
            None => self.extra.push((property, value)),
        }
        self
    }

    /// Claim support for a control pattern
    #[must_use]
    pub fn with_pattern(mut self, pattern: PatternKind) -> Self {
        self.patterns.push(pattern);
        self
    }

    /// Support the scroll pattern; the viewport is the node's own rectangle
    #[must_use]
    pub const fn scrollable(mut self) -> Self {
        self.scrollable = true;
        self
    }

    /// Support the scroll pattern with a viewport other than the node's
    /// rectangle (a drop-down whose list is drawn below it)
    #[must_use]
    pub const fn scrollable_within(mut self, viewport: Rect) -> Self {
        self.scrollable = true;
        self.scroll_viewport = Some(viewport);
        self
    }

    /// Realize only the children that intersect the viewport
    #[must_use]
    pub const fn virtualized(mut self) -> Self {
        self.virtualized = true;
        self
    }

    /// Accept scroll requests but never move
    #[must_use]
    pub const fn with_stalled_scroll(mut self) -> Self {
        self.stalled_scroll = true;
        self
    }

    /// Pixels moved by a small scroll step
    #[must_use]
    pub const fn with_line_size(mut self, line_size: f64) -> Self {
        self.line_size = line_size;
        self
    }

    /// After each scroll, the next `finds` searches anywhere in the tree
    /// come back empty, as if the new page were still being realized
    #[must_use]
    pub const fn with_realization_lag(mut self, finds: usize) -> Self {
        self.realization_lag = finds;
        self
    }

    fn extra(&self, property: &PropertyId) -> Option<&PropertyValue> {
        self.extra.iter().find(|(p, _)| p == property).map(|(_, v)| v)
    }

    fn layout_viewport(&self) -> Rect {
        self.scroll_viewport.unwrap_or(self.rect)
    }
}

// =============================================================================
// Arena
// =============================================================================

#[derive(Debug)]
struct Slot {
    desc: MockNode,
    parent: Option<NodeKey>,
    children: Vec<NodeKey>,
    removed: bool,
    offset_x: f64,
    offset_y: f64,
}

#[derive(Debug, Default)]
struct Arena {
    slots: Vec<Slot>,
}

impl Arena {
    fn slot(&self, key: NodeKey) -> Option<&Slot> {
        self.slots.get(key).filter(|s| !s.removed)
    }

    /// Sum of the scroll offsets of all strict ancestors
    fn shift(&self, key: NodeKey) -> (f64, f64) {
        let mut dx = 0.0;
        let mut dy = 0.0;
        let mut current = self.slots.get(key).and_then(|s| s.parent);
        while let Some(k) = current {
            let Some(slot) = self.slots.get(k) else { break };
            if slot.desc.scrollable {
                dx += slot.offset_x;
                dy += slot.offset_y;
            }
            current = slot.parent;
        }
        (dx, dy)
    }

    fn screen_rect(&self, key: NodeKey) -> Rect {
        let Some(slot) = self.slots.get(key) else {
            return Rect::EMPTY;
        };
        if slot.desc.rect.is_empty() {
            return slot.desc.rect;
        }
        let (dx, dy) = self.shift(key);
        slot.desc.rect.offset(-dx, -dy)
    }

    fn viewport(&self, host: NodeKey) -> Rect {
        let Some(slot) = self.slots.get(host) else {
            return Rect::EMPTY;
        };
        let (dx, dy) = self.shift(host);
        slot.desc.layout_viewport().offset(-dx, -dy)
    }

    fn realized(&self, key: NodeKey) -> bool {
        let Some(parent) = self.slots.get(key).and_then(|s| s.parent) else {
            return true;
        };
        match self.slots.get(parent) {
            Some(p) if p.desc.scrollable && p.desc.virtualized => {
                self.screen_rect(key).intersects(&self.viewport(parent))
            }
            _ => true,
        }
    }

    /// Present, not removed, realized, and so are all ancestors
    fn available(&self, key: NodeKey) -> bool {
        let mut current = Some(key);
        while let Some(k) = current {
            if self.slot(k).is_none() || !self.realized(k) {
                return false;
            }
            current = self.slots[k].parent;
        }
        true
    }

    fn live_children(&self, key: NodeKey) -> Vec<NodeKey> {
        self.slots
            .get(key)
            .map(|s| {
                s.children
                    .iter()
                    .copied()
                    .filter(|&c| self.slot(c).is_some() && self.realized(c))
                    .collect()
            })
            .unwrap_or_default()
    }

    fn is_offscreen(&self, key: NodeKey) -> bool {
        let rect = self.screen_rect(key);
        let mut current = self.slots.get(key).and_then(|s| s.parent);
        while let Some(k) = current {
            let slot = &self.slots[k];
            if slot.desc.scrollable && !rect.intersects(&self.viewport(k)) {
                return true;
            }
            current = slot.parent;
        }
        false
    }

    /// Width and height of everything below `host`, measured from its
    /// viewport origin
    fn content_extent(&self, host: NodeKey) -> (f64, f64) {
        let origin = self.slots[host].desc.layout_viewport();
        let mut right = origin.right();
        let mut bottom = origin.bottom();
        let mut stack = self.slots[host].children.clone();
        while let Some(k) = stack.pop() {
            let slot = &self.slots[k];
            if slot.removed {
                continue;
            }
            if !slot.desc.rect.is_empty() {
                right = right.max(slot.desc.rect.right());
                bottom = bottom.max(slot.desc.rect.bottom());
            }
            stack.extend(slot.children.iter().copied());
        }
        (right - origin.x, bottom - origin.y)
    }

    fn scroll_info(&self, host: NodeKey) -> ScrollInfo {
        let slot = &self.slots[host];
        let viewport = slot.desc.layout_viewport();
        let (width, height) = self.content_extent(host);
        let max_x = width - viewport.width;
        let max_y = height - viewport.height;
        let percent = |offset: f64, max: f64| {
            if max > 0.0 {
                offset / max * 100.0
            } else {
                ScrollInfo::NO_SCROLL
            }
        };
        let view_size = |view: f64, content: f64| {
            if content > 0.0 {
                (view / content * 100.0).min(100.0)
            } else {
                100.0
            }
        };
        ScrollInfo {
            horizontal_percent: percent(slot.offset_x, max_x),
            vertical_percent: percent(slot.offset_y, max_y),
            horizontal_view_size: view_size(viewport.width, width),
            vertical_view_size: view_size(viewport.height, height),
            horizontally_scrollable: max_x > 0.0,
            vertically_scrollable: max_y > 0.0,
        }
    }

    /// Move the nearest scrolling ancestor just far enough that `key` lies
    /// inside its viewport
    fn bring_into_view(&mut self, key: NodeKey) {
        let mut host = self.slots.get(key).and_then(|s| s.parent);
        while let Some(h) = host {
            if self.slots[h].desc.scrollable {
                break;
            }
            host = self.slots[h].parent;
        }
        let Some(host) = host else { return };
        let rect = self.screen_rect(key);
        let viewport = self.viewport(host);
        let delta = |near: f64, far: f64, view_near: f64, view_far: f64| {
            if far > view_far {
                (far - view_far).min(near - view_near)
            } else if near < view_near {
                near - view_near
            } else {
                0.0
            }
        };
        let dx = delta(rect.left(), rect.right(), viewport.left(), viewport.right());
        let dy = delta(rect.top(), rect.bottom(), viewport.top(), viewport.bottom());
        let layout = self.slots[host].desc.layout_viewport();
        let (width, height) = self.content_extent(host);
        let slot = &mut self.slots[host];
        slot.offset_x = (slot.offset_x + dx).clamp(0.0, (width - layout.width).max(0.0));
        slot.offset_y = (slot.offset_y + dy).clamp(0.0, (height - layout.height).max(0.0));
    }

    fn read(&self, key: NodeKey, property: &PropertyId) -> ProbeResult<PropertyValue> {
        let Some(slot) = self.slot(key) else {
            return Err(ProbeError::not_available(format!("mock node {key}")));
        };
        let desc = &slot.desc;
        Ok(match property {
            PropertyId::Name => desc.name.clone().into(),
            PropertyId::AutomationId => desc.automation_id.clone().into(),
            PropertyId::ClassName => desc.class_name.clone().into(),
            PropertyId::ControlType => desc.control_type.into(),
            PropertyId::BoundingRectangle => self.screen_rect(key).into(),
            PropertyId::IsEnabled => desc.enabled.into(),
            PropertyId::IsOffscreen => self.is_offscreen(key).into(),
            PropertyId::ProcessId => desc.process_id.into(),
            other => match desc.extra(other) {
                Some(value) => value.clone(),
                None => {
                    return Err(ProbeError::PropertyNotSupported {
                        property: other.name().to_string(),
                        element: format!("mock node {key}"),
                    })
                }
            },
        })
    }

    fn matches(&self, key: NodeKey, condition: &Condition) -> ProbeResult<bool> {
        condition.evaluate(&mut |property| match self.read(key, property) {
            Ok(value) => Ok(Some(value)),
            Err(ProbeError::PropertyNotSupported { .. }) => Ok(None),
            Err(e) => Err(e),
        })
    }

    fn collect(
        &self,
        key: NodeKey,
        deep: bool,
        scope: TreeScope,
        condition: &Condition,
        out: &mut Vec<NodeKey>,
    ) -> ProbeResult<()> {
        for child in self.live_children(key) {
            let wanted = if deep {
                scope.includes_deep_descendants()
            } else {
                scope.includes_children()
            };
            if wanted && self.matches(child, condition)? {
                out.push(child);
            }
            if scope.includes_deep_descendants() {
                self.collect(child, true, scope, condition, out)?;
            }
        }
        Ok(())
    }
}

// =============================================================================
// Tree
// =============================================================================

/// In-memory [`TreeProvider`] with call counters.
///
/// Key 0 is the desktop root. Mutation goes through `&self` so a test can
/// keep changing the tree while the engine holds an `Rc` to it.
#[derive(Debug)]
pub struct MockTree {
    arena: RefCell<Arena>,
    find_calls: Cell<usize>,
    supported_properties_calls: Cell<usize>,
    scroll_log: RefCell<Vec<(ScrollAmount, ScrollAmount)>>,
    lagging_finds: Cell<usize>,
}

impl Default for MockTree {
    fn default() -> Self {
        Self::new()
    }
}

impl MockTree {
    /// A tree holding only the desktop root
    #[must_use]
    pub fn new() -> Self {
        let root = MockNode::new(ControlType::Pane)
            .with_name("Desktop")
            .with_class_name("#32769")
            .with_rect(DESKTOP_RECT);
        Self {
            arena: RefCell::new(Arena {
                slots: vec![Slot {
                    desc: root,
                    parent: None,
                    children: Vec::new(),
                    removed: false,
                    offset_x: 0.0,
                    offset_y: 0.0,
                }],
            }),
            find_calls: Cell::new(0),
            supported_properties_calls: Cell::new(0),
            scroll_log: RefCell::new(Vec::new()),
            lagging_finds: Cell::new(0),
        }
    }

    /// Key of the desktop root
    #[must_use]
    pub const fn root_key(&self) -> NodeKey {
        0
    }

    /// Append `node` as the last child of `parent`
    pub fn add(&self, parent: NodeKey, node: MockNode) -> NodeKey {
        let mut arena = self.arena.borrow_mut();
        let key = arena.slots.len();
        arena.slots.push(Slot {
            desc: node,
            parent: Some(parent),
            children: Vec::new(),
            removed: false,
            offset_x: 0.0,
            offset_y: 0.0,
        });
        if let Some(p) = arena.slots.get_mut(parent) {
            p.children.push(key);
        }
        key
    }

    /// Add `count` list items of `item_height`, stacked from the top of the
    /// parent's viewport and named `Item 0`, `Item 1`, ...
    pub fn add_list_items(&self, parent: NodeKey, count: usize, item_height: f64) -> Vec<NodeKey> {
        let origin = self.layout_viewport(parent);
        (0..count)
            .map(|i| {
                let rect = Rect::new(origin.x, origin.y + item_height * i as f64, origin.width, item_height);
                self.add(
                    parent,
                    MockNode::new(ControlType::ListItem)
                        .with_name(format!("Item {i}"))
                        .with_automation_id(format!("item{i}"))
                        .with_rect(rect),
                )
            })
            .collect()
    }

    /// Fill `grid` with `rows` x `columns` grid items, each holding a text
    /// named `row,column`, and set the grid's row and column counts
    pub fn add_grid_cells(
        &self,
        grid: NodeKey,
        rows: usize,
        columns: usize,
        cell_width: f64,
        cell_height: f64,
    ) {
        self.set_property(grid, PropertyId::RowCount, rows as i64);
        self.set_property(grid, PropertyId::ColumnCount, columns as i64);
        let origin = self.layout_viewport(grid);
        for row in 0..rows {
            for column in 0..columns {
                let rect = Rect::new(
                    origin.x + cell_width * column as f64,
                    origin.y + cell_height * row as f64,
                    cell_width,
                    cell_height,
                );
                let cell = self.add(
                    grid,
                    MockNode::new(ControlType::DataItem)
                        .with_rect(rect)
                        .with_property(PropertyId::IsGridItemPatternAvailable, true)
                        .with_property(PropertyId::Row, row as i64)
                        .with_property(PropertyId::Column, column as i64),
                );
                self.add(
                    cell,
                    MockNode::new(ControlType::Text)
                        .with_name(format!("{row},{column}"))
                        .with_rect(rect),
                );
            }
        }
    }

    fn layout_viewport(&self, key: NodeKey) -> Rect {
        self.arena
            .borrow()
            .slots
            .get(key)
            .map_or(Rect::EMPTY, |s| s.desc.layout_viewport())
    }

    /// Runtime handle of a node that has not been removed
    #[must_use]
    pub fn node(&self, key: NodeKey) -> Option<Node> {
        self.arena.borrow().slot(key).map(|_| Self::node_for(key))
    }

    fn node_for(key: NodeKey) -> Node {
        Node::new(RuntimeId::new(vec![RUNTIME_ID_PREFIX, key as i32]))
    }

    fn key_of(&self, node: &Node) -> ProbeResult<NodeKey> {
        let key = match node.runtime_id().parts() {
            [RUNTIME_ID_PREFIX, key] if *key >= 0 => *key as usize,
            _ => return Err(ProbeError::not_available(node.to_string())),
        };
        if self.arena.borrow().available(key) {
            Ok(key)
        } else {
            Err(ProbeError::not_available(node.to_string()))
        }
    }

    /// Remove a node and, with it, its subtree
    pub fn remove(&self, key: NodeKey) {
        if let Some(slot) = self.arena.borrow_mut().slots.get_mut(key) {
            slot.removed = true;
        }
    }

    /// Change `IsEnabled`
    pub fn set_enabled(&self, key: NodeKey, enabled: bool) {
        if let Some(slot) = self.arena.borrow_mut().slots.get_mut(key) {
            slot.desc.enabled = enabled;
        }
    }

    /// Change or add an extra property
    pub fn set_property(&self, key: NodeKey, property: PropertyId, value: impl Into<PropertyValue>) {
        if let Some(slot) = self.arena.borrow_mut().slots.get_mut(key) {
            let desc = std::mem::replace(&mut slot.desc, MockNode::new(ControlType::Custom));
            slot.desc = desc.with_property(property, value);
        }
    }

    /// Expose the selection pattern on `container` with `items` selected
    pub fn set_selection(&self, container: NodeKey, items: &[NodeKey]) {
        if let Some(slot) = self.arena.borrow_mut().slots.get_mut(container) {
            slot.desc.selection = items.to_vec();
            if !slot.desc.patterns.contains(&PatternKind::Selection) {
                slot.desc.patterns.push(PatternKind::Selection);
            }
        }
    }

    /// Number of `find_all`/`find_first` queries served
    #[must_use]
    pub fn find_calls(&self) -> usize {
        self.find_calls.get()
    }

    /// Number of `supported_properties` queries served
    #[must_use]
    pub fn supported_properties_calls(&self) -> usize {
        self.supported_properties_calls.get()
    }

    /// Number of scroll requests, including ignored ones
    #[must_use]
    pub fn scroll_calls(&self) -> usize {
        self.scroll_log.borrow().len()
    }

    /// Scroll requests as `(horizontal, vertical)` pairs, oldest first
    #[must_use]
    pub fn scroll_log(&self) -> Vec<(ScrollAmount, ScrollAmount)> {
        self.scroll_log.borrow().clone()
    }

    /// Forget recorded scroll requests
    pub fn clear_scroll_log(&self) {
        self.scroll_log.borrow_mut().clear();
    }
}

fn step(amount: ScrollAmount, page: f64, line: f64) -> f64 {
    match amount {
        ScrollAmount::LargeDecrement => -page,
        ScrollAmount::SmallDecrement => -line,
        ScrollAmount::NoAmount => 0.0,
        ScrollAmount::LargeIncrement => page,
        ScrollAmount::SmallIncrement => line,
    }
}

impl TreeProvider for MockTree {
    fn root(&self) -> Node {
        Self::node_for(self.root_key())
    }

    fn find_all(&self, root: &Node, scope: TreeScope, condition: &Condition) -> ProbeResult<Vec<Node>> {
        self.find_calls.set(self.find_calls.get() + 1);
        let key = self.key_of(root)?;
        if self.lagging_finds.get() > 0 {
            self.lagging_finds.set(self.lagging_finds.get() - 1);
            return Ok(Vec::new());
        }
        let arena = self.arena.borrow();
        let mut found = Vec::new();
        if scope.includes_self() && arena.matches(key, condition)? {
            found.push(key);
        }
        arena.collect(key, false, scope, condition, &mut found)?;
        Ok(found.into_iter().map(Self::node_for).collect())
    }

    fn property(&self, node: &Node, property: &PropertyId) -> ProbeResult<PropertyValue> {
        let key = self.key_of(node)?;
        self.arena.borrow().read(key, property)
    }

    fn supported_properties(&self, node: &Node) -> ProbeResult<Vec<PropertyId>> {
        self.supported_properties_calls
            .set(self.supported_properties_calls.get() + 1);
        let key = self.key_of(node)?;
        let arena = self.arena.borrow();
        let mut properties = PropertyId::STANDARD.to_vec();
        if let Some(slot) = arena.slot(key) {
            properties.extend(slot.desc.extra.iter().map(|(p, _)| p.clone()));
        }
        Ok(properties)
    }

    fn supports_pattern(&self, node: &Node, pattern: PatternKind) -> ProbeResult<bool> {
        let key = self.key_of(node)?;
        let arena = self.arena.borrow();
        let Some(slot) = arena.slot(key) else {
            return Ok(false);
        };
        let desc = &slot.desc;
        Ok(match pattern {
            PatternKind::Scroll => desc.scrollable,
            PatternKind::Text => desc.text.is_some(),
            PatternKind::Value => desc.value.is_some(),
            PatternKind::GridItem => desc.extra(&PropertyId::IsGridItemPatternAvailable)
                == Some(&PropertyValue::Bool(true)),
            PatternKind::Grid => desc.extra(&PropertyId::RowCount).is_some(),
            PatternKind::ExpandCollapse => desc.extra(&PropertyId::ExpandCollapseState).is_some(),
            PatternKind::SelectionItem => desc.extra(&PropertyId::IsSelected).is_some(),
            other => desc.patterns.contains(&other),
        })
    }

    fn parent(&self, node: &Node) -> ProbeResult<Option<Node>> {
        let key = self.key_of(node)?;
        let arena = self.arena.borrow();
        Ok(arena.slots[key].parent.map(Self::node_for))
    }

    fn first_child(&self, node: &Node) -> ProbeResult<Option<Node>> {
        let key = self.key_of(node)?;
        let arena = self.arena.borrow();
        Ok(arena.live_children(key).first().copied().map(Self::node_for))
    }

    fn next_sibling(&self, node: &Node) -> ProbeResult<Option<Node>> {
        let key = self.key_of(node)?;
        let arena = self.arena.borrow();
        let Some(parent) = arena.slots[key].parent else {
            return Ok(None);
        };
        let siblings = arena.live_children(parent);
        let position = siblings.iter().position(|&k| k == key);
        Ok(position
            .and_then(|i| siblings.get(i + 1))
            .copied()
            .map(Self::node_for))
    }

    fn previous_sibling(&self, node: &Node) -> ProbeResult<Option<Node>> {
        let key = self.key_of(node)?;
        let arena = self.arena.borrow();
        let Some(parent) = arena.slots[key].parent else {
            return Ok(None);
        };
        let siblings = arena.live_children(parent);
        let position = siblings.iter().position(|&k| k == key);
        Ok(position
            .and_then(|i| i.checked_sub(1))
            .and_then(|i| siblings.get(i))
            .copied()
            .map(Self::node_for))
    }

    fn text_pattern_text(&self, node: &Node) -> ProbeResult<Option<String>> {
        let key = self.key_of(node)?;
        Ok(self.arena.borrow().slots[key].desc.text.clone())
    }

    fn value_pattern_value(&self, node: &Node) -> ProbeResult<Option<String>> {
        let key = self.key_of(node)?;
        Ok(self.arena.borrow().slots[key].desc.value.clone())
    }

    fn selection(&self, node: &Node) -> ProbeResult<Option<Vec<Node>>> {
        let key = self.key_of(node)?;
        let arena = self.arena.borrow();
        let desc = &arena.slots[key].desc;
        if !desc.patterns.contains(&PatternKind::Selection) {
            return Ok(None);
        }
        Ok(Some(
            desc.selection
                .iter()
                .copied()
                .filter(|&k| arena.available(k))
                .map(Self::node_for)
                .collect(),
        ))
    }

    fn scroll_item_into_view(&self, node: &Node) -> ProbeResult<bool> {
        let key = self.key_of(node)?;
        let mut arena = self.arena.borrow_mut();
        if !arena.slots[key].desc.patterns.contains(&PatternKind::ScrollItem) {
            return Ok(false);
        }
        arena.bring_into_view(key);
        Ok(true)
    }

    fn scroll_info(&self, node: &Node) -> ProbeResult<Option<ScrollInfo>> {
        let key = self.key_of(node)?;
        let arena = self.arena.borrow();
        if !arena.slots[key].desc.scrollable {
            return Ok(None);
        }
        Ok(Some(arena.scroll_info(key)))
    }

    fn scroll(&self, node: &Node, horizontal: ScrollAmount, vertical: ScrollAmount) -> ProbeResult<()> {
        let key = self.key_of(node)?;
        let mut arena = self.arena.borrow_mut();
        if !arena.slots[key].desc.scrollable {
            return Err(ProbeError::Provider {
                message: format!("{node} does not support ScrollPattern"),
            });
        }
        self.scroll_log.borrow_mut().push((horizontal, vertical));
        if arena.slots[key].desc.stalled_scroll {
            return Ok(());
        }
        let viewport = arena.slots[key].desc.layout_viewport();
        let line = arena.slots[key].desc.line_size;
        let (width, height) = arena.content_extent(key);
        let max_x = (width - viewport.width).max(0.0);
        let max_y = (height - viewport.height).max(0.0);
        let slot = &mut arena.slots[key];
        slot.offset_x = (slot.offset_x + step(horizontal, viewport.width, line)).clamp(0.0, max_x);
        slot.offset_y = (slot.offset_y + step(vertical, viewport.height, line)).clamp(0.0, max_y);
        self.lagging_finds.set(slot.desc.realization_lag);
        Ok(())
    }
}

// =============================================================================
// Diagnostics
// =============================================================================

/// Diagnostics hook that records every capture request
#[derive(Debug, Default)]
pub struct RecordingDiagnostics {
    captures: RefCell<Vec<String>>,
}

impl RecordingDiagnostics {
    /// Contexts passed to `capture`, oldest first
    #[must_use]
    pub fn captures(&self) -> Vec<String> {
        self.captures.borrow().clone()
    }
}

impl DiagnosticsHook for RecordingDiagnostics {
    fn capture(&self, context: &str) {
        self.captures.borrow_mut().push(context.to_string());
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    mod layout_tests {
        use super::*;

        #[test]
        fn test_scrolling_shifts_descendants() {
            let tree = MockTree::new();
            let list = tree.add(
                tree.root_key(),
                MockNode::new(ControlType::List)
                    .with_rect(Rect::new(10.0, 10.0, 100.0, 50.0))
                    .scrollable(),
            );
            let items = tree.add_list_items(list, 10, 10.0);
            let item = tree.node(items[7]).unwrap();
            assert_eq!(
                tree.property(&item, &PropertyId::BoundingRectangle).unwrap(),
                PropertyValue::Rect(Rect::new(10.0, 80.0, 100.0, 10.0))
            );
            assert_eq!(tree.property(&item, &PropertyId::IsOffscreen).unwrap(), PropertyValue::Bool(true));

            let list_node = tree.node(list).unwrap();
            tree.scroll(&list_node, ScrollAmount::NoAmount, ScrollAmount::LargeIncrement).unwrap();
            assert_eq!(
                tree.property(&item, &PropertyId::BoundingRectangle).unwrap(),
                PropertyValue::Rect(Rect::new(10.0, 30.0, 100.0, 10.0))
            );
            assert_eq!(tree.property(&item, &PropertyId::IsOffscreen).unwrap(), PropertyValue::Bool(false));
            assert_eq!(tree.scroll_info(&list_node).unwrap().unwrap().vertical_percent, 100.0);
        }

        #[test]
        fn test_virtualized_children_come_and_go() {
            let tree = MockTree::new();
            let list = tree.add(
                tree.root_key(),
                MockNode::new(ControlType::List)
                    .with_rect(Rect::new(0.0, 0.0, 100.0, 50.0))
                    .scrollable()
                    .virtualized(),
            );
            let items = tree.add_list_items(list, 20, 10.0);
            let list_node = tree.node(list).unwrap();
            let visible = tree
                .find_all(&list_node, TreeScope::Children, &Condition::True)
                .unwrap();
            assert_eq!(visible.len(), 5);

            let first = tree.node(items[0]).unwrap();
            assert!(tree.property(&first, &PropertyId::Name).is_ok());
            tree.scroll(&list_node, ScrollAmount::NoAmount, ScrollAmount::LargeIncrement).unwrap();
            assert!(tree.property(&first, &PropertyId::Name).unwrap_err().is_stale());
            assert_eq!(tree.first_child(&list_node).unwrap(), tree.node(items[5]));
        }

        #[test]
        fn test_realization_lag_hides_new_page() {
            let tree = MockTree::new();
            let list = tree.add(
                tree.root_key(),
                MockNode::new(ControlType::List)
                    .with_rect(Rect::new(0.0, 0.0, 100.0, 50.0))
                    .scrollable()
                    .virtualized()
                    .with_realization_lag(2),
            );
            tree.add_list_items(list, 20, 10.0);
            let list_node = tree.node(list).unwrap();
            let count = || tree.find_all(&list_node, TreeScope::Children, &Condition::True).unwrap().len();
            assert_eq!(count(), 5);
            tree.scroll(&list_node, ScrollAmount::NoAmount, ScrollAmount::LargeIncrement).unwrap();
            assert_eq!(count(), 0);
            assert_eq!(count(), 0);
            assert_eq!(count(), 5);
        }

        #[test]
        fn test_scroll_item_brings_node_into_view() {
            let tree = MockTree::new();
            let list = tree.add(
                tree.root_key(),
                MockNode::new(ControlType::List)
                    .with_rect(Rect::new(0.0, 0.0, 100.0, 50.0))
                    .scrollable(),
            );
            let plain = tree.add(
                list,
                MockNode::new(ControlType::ListItem).with_rect(Rect::new(0.0, 100.0, 100.0, 10.0)),
            );
            let item = tree.add(
                list,
                MockNode::new(ControlType::ListItem)
                    .with_rect(Rect::new(0.0, 200.0, 100.0, 10.0))
                    .with_pattern(PatternKind::ScrollItem),
            );
            assert!(!tree.scroll_item_into_view(&tree.node(plain).unwrap()).unwrap());

            let node = tree.node(item).unwrap();
            assert!(tree.scroll_item_into_view(&node).unwrap());
            assert_eq!(
                tree.property(&node, &PropertyId::BoundingRectangle).unwrap(),
                PropertyValue::Rect(Rect::new(0.0, 40.0, 100.0, 10.0))
            );
            assert_eq!(tree.property(&node, &PropertyId::IsOffscreen).unwrap(), PropertyValue::Bool(false));
            assert_eq!(tree.scroll_calls(), 0);
        }
    }

    mod query_tests {
        use super::*;

        #[test]
        fn test_scopes() {
            let tree = MockTree::new();
            let window = tree.add(tree.root_key(), MockNode::new(ControlType::Window).with_name("w"));
            let pane = tree.add(window, MockNode::new(ControlType::Pane).with_name("w"));
            tree.add(pane, MockNode::new(ControlType::Button).with_name("w"));
            let window_node = tree.node(window).unwrap();
            let by_name = Condition::leaf(PropertyId::Name, "w");
            let count = |scope| tree.find_all(&window_node, scope, &by_name).unwrap().len();
            assert_eq!(count(TreeScope::Element), 1);
            assert_eq!(count(TreeScope::Children), 1);
            assert_eq!(count(TreeScope::Descendants), 2);
            assert_eq!(count(TreeScope::Subtree), 3);
            assert_eq!(tree.find_calls(), 4);
        }

        #[test]
        fn test_removed_subtree_is_unavailable() {
            let tree = MockTree::new();
            let window = tree.add(tree.root_key(), MockNode::new(ControlType::Window));
            let button = tree.add(window, MockNode::new(ControlType::Button));
            let button_node = tree.node(button).unwrap();
            tree.remove(window);
            assert!(tree.node(window).is_none());
            let err = tree.parent(&button_node).unwrap_err();
            assert_eq!(err.reason(), "ELEMENT NOT AVAILABLE");
            assert_eq!(tree.first_child(&tree.root()).unwrap(), None);
        }

        #[test]
        fn test_extra_properties_follow_standard_ones() {
            let tree = MockTree::new();
            let item = tree.add(
                tree.root_key(),
                MockNode::new(ControlType::ListItem).with_property(PropertyId::IsSelected, true),
            );
            let node = tree.node(item).unwrap();
            let properties = tree.supported_properties(&node).unwrap();
            assert_eq!(properties.len(), PropertyId::STANDARD.len() + 1);
            assert_eq!(properties.last(), Some(&PropertyId::IsSelected));
            assert!(tree.supports_pattern(&node, PatternKind::SelectionItem).unwrap());
            assert!(matches!(
                tree.property(&node, &PropertyId::Row),
                Err(ProbeError::PropertyNotSupported { .. })
            ));
        }

        #[test]
        fn test_selection_pattern() {
            let tree = MockTree::new();
            let combo = tree.add(tree.root_key(), MockNode::new(ControlType::ComboBox));
            let first = tree.add(combo, MockNode::new(ControlType::ListItem).with_name("a"));
            let second = tree.add(combo, MockNode::new(ControlType::ListItem).with_name("b"));
            let combo_node = tree.node(combo).unwrap();
            assert_eq!(tree.selection(&combo_node).unwrap(), None);

            tree.set_selection(combo, &[second, first]);
            assert!(tree.supports_pattern(&combo_node, PatternKind::Selection).unwrap());
            assert_eq!(
                tree.selection(&combo_node).unwrap(),
                Some(vec![tree.node(second).unwrap(), tree.node(first).unwrap()])
            );
            tree.remove(second);
            assert_eq!(tree.selection(&combo_node).unwrap(), Some(vec![tree.node(first).unwrap()]));
        }

        #[test]
        fn test_scroll_without_pattern_fails() {
            let tree = MockTree::new();
            let pane = tree.add(tree.root_key(), MockNode::new(ControlType::Pane));
            let node = tree.node(pane).unwrap();
            assert!(tree.scroll_info(&node).unwrap().is_none());
            let err = tree
                .scroll(&node, ScrollAmount::NoAmount, ScrollAmount::SmallIncrement)
                .unwrap_err();
            assert_eq!(err.reason(), "PROVIDER ERROR");
            assert_eq!(tree.scroll_calls(), 0);
        }
    }
}
