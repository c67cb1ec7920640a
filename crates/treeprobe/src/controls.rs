//! Typed facades over common scrollable controls.

use crate::condition::Condition;
use crate::convergence::{ensure_enabled, Axis, Scroller, Viewport, ViewportConvergence, NOT_SCROLL};
use crate::element::Element;
use crate::geometry::Edge;
use crate::result::{ProbeError, ProbeResult};
use crate::strategy::{By, ByProperty};
use crate::tree::{ExpandCollapseState, PatternKind, PropertyId, TreeScope};
use tracing::error;

/// Reason carried by cell lookup failures
pub const NOT_GET_ITEM: &str = "NOT GET ITEM";

/// Reason carried by selection reads on a closed drop-down
pub const NOT_GET_SELECTED_ITEM: &str = "NOT GET SELECTED ITEM";

// =============================================================================
// ListBox
// =============================================================================

/// A scrollable list
#[derive(Debug, Clone)]
pub struct ListBox {
    element: Element,
}

impl ListBox {
    /// Wrap an element
    #[must_use]
    pub const fn new(element: Element) -> Self {
        Self { element }
    }

    /// The underlying element
    #[must_use]
    pub const fn element(&self) -> &Element {
        &self.element
    }

    /// Scroll until an item matching `strategy` is visible in the list
    pub fn scroll_to(&self, strategy: impl Into<By>) -> ProbeResult<Option<Element>> {
        ViewportConvergence::new(self.element.session()).scroll_to(
            &self.element,
            strategy,
            Viewport::Container,
        )
    }
}

impl From<Element> for ListBox {
    fn from(element: Element) -> Self {
        Self::new(element)
    }
}

// =============================================================================
// ComboBox
// =============================================================================

/// A drop-down list whose items are shown in a popup window
#[derive(Debug, Clone)]
pub struct ComboBox {
    element: Element,
}

impl ComboBox {
    /// Wrap an element
    #[must_use]
    pub const fn new(element: Element) -> Self {
        Self { element }
    }

    /// The underlying element
    #[must_use]
    pub const fn element(&self) -> &Element {
        &self.element
    }

    /// Current expand/collapse state
    pub fn expand_collapse_state(&self) -> ProbeResult<ExpandCollapseState> {
        self.element.property(&PropertyId::ExpandCollapseState)
    }

    /// Whether the drop-down is open
    pub fn is_expanded(&self) -> ProbeResult<bool> {
        Ok(self.expand_collapse_state()? == ExpandCollapseState::Expanded)
    }

    /// Scroll the open drop-down until an item matching `strategy` is
    /// visible in its popup.
    ///
    /// The drop-down must be expanded; opening it is input synthesis and up
    /// to the caller.
    pub fn scroll_to(&self, strategy: impl Into<By>) -> ProbeResult<Option<Element>> {
        ensure_enabled(&self.element, NOT_SCROLL)?;
        if !self.is_expanded()? {
            error!(element = %self.element, "drop-down is not expanded");
            return Err(ProbeError::precondition(
                NOT_SCROLL,
                format!("{} is not expanded", self.element),
            ));
        }
        ViewportConvergence::new(self.element.session()).scroll_to(
            &self.element,
            strategy,
            Viewport::Popup,
        )
    }

    /// The selected item.
    ///
    /// An open drop-down is searched for an item with `IsSelected = true`.
    /// A closed one usually does not expose its items, so the selection
    /// pattern of the combo box itself is read instead.
    pub fn selected_item(&self) -> ProbeResult<Option<Element>> {
        if self.is_expanded()? {
            return self
                .element
                .find_element(By::automation_property(PropertyId::IsSelected, true));
        }
        let session = self.element.session();
        let node = self.element.resolve()?;
        let Some(selection) = session.provider().selection(&node)? else {
            error!(element = %self.element, "selection pattern not supported");
            return Err(ProbeError::PatternNotSupported {
                reason: NOT_GET_SELECTED_ITEM.to_string(),
                pattern: PatternKind::Selection.name().to_string(),
                element: self.element.to_string(),
            });
        };
        Ok(selection
            .into_iter()
            .next()
            .map(|item| Element::from_node(session, item)))
    }
}

impl From<Element> for ComboBox {
    fn from(element: Element) -> Self {
        Self::new(element)
    }
}

// =============================================================================
// DataGrid
// =============================================================================

/// A grid of cells exposing `Row`/`Column` grid-item properties
#[derive(Debug, Clone)]
pub struct DataGrid {
    element: Element,
}

impl DataGrid {
    /// Wrap an element
    #[must_use]
    pub const fn new(element: Element) -> Self {
        Self { element }
    }

    /// The underlying element
    #[must_use]
    pub const fn element(&self) -> &Element {
        &self.element
    }

    /// `RowCount` of the grid
    pub fn row_count(&self) -> ProbeResult<i32> {
        self.element.property(&PropertyId::RowCount)
    }

    /// `ColumnCount` of the grid
    pub fn column_count(&self) -> ProbeResult<i32> {
        self.element.property(&PropertyId::ColumnCount)
    }

    fn row_strategy(row: i32) -> ByProperty {
        By::automation_property(PropertyId::IsGridItemPatternAvailable, true).and(PropertyId::Row, row)
    }

    fn cell_strategy(row: i32, column: i32) -> ByProperty {
        Self::row_strategy(row).and(PropertyId::Column, column)
    }

    fn check_indices(&self, row: i32, column: i32, reason: &str) -> ProbeResult<()> {
        if row < 0 || column < 0 {
            error!(grid = %self.element, row, column, "cell index out of bounds");
            return Err(ProbeError::InvalidArgument {
                reason: reason.to_string(),
                message: format!("cell index [{row}, {column}] is out of bounds"),
            });
        }
        Ok(())
    }

    /// The content of the visible cell at `(row, column)`.
    ///
    /// The cell must currently be realized with its center inside the grid;
    /// its first descendant is returned.
    pub fn item(&self, row: i32, column: i32) -> ProbeResult<Element> {
        ensure_enabled(&self.element, NOT_GET_ITEM)?;
        self.check_indices(row, column, NOT_GET_ITEM)?;

        let session = self.element.session();
        let convergence = ViewportConvergence::new(session);
        let strategy: By = Self::cell_strategy(row, column).into();
        let cell = convergence.probe(&self.element, &strategy, session.settings().probe_timeout_ms)?;
        let grid_rect = self.element.bounding_rectangle()?;
        let visible = match &cell {
            Some(cell) => grid_rect.contains(&cell.interaction_point()?),
            None => false,
        };
        let Some(cell) = cell.filter(|_| visible) else {
            error!(grid = %self.element, row, column, "cell is not visible");
            return Err(ProbeError::precondition(
                NOT_GET_ITEM,
                format!("cell [{row}, {column}] is not visible in {}", self.element),
            ));
        };

        let cell_node = cell.resolve()?;
        let content = session
            .provider()
            .find_first(&cell_node, TreeScope::Descendants, &Condition::True)?;
        match content {
            Some(node) => Ok(Element::from_node(session, node)),
            None => {
                error!(grid = %self.element, row, column, "cell has no content");
                Err(ProbeError::precondition(
                    NOT_GET_ITEM,
                    format!("cell [{row}, {column}] of {} is empty", self.element),
                ))
            }
        }
    }

    /// Scroll until the cell at `(row, column)` is visible and return it.
    ///
    /// Rows are swept vertically first, then columns horizontally.
    pub fn scroll_to(&self, row: i32, column: i32) -> ProbeResult<Element> {
        ensure_enabled(&self.element, NOT_SCROLL)?;
        self.check_indices(row, column, NOT_SCROLL)?;

        let grid = &self.element;
        let convergence = ViewportConvergence::new(grid.session());
        let probe_timeout = grid.session().settings().probe_timeout_ms;
        let scroller = Scroller::new(grid);
        scroller.pattern()?;

        let row_strategy: By = Self::row_strategy(row).into();
        let probe_row = || convergence.probe(grid, &row_strategy, probe_timeout);
        let mut cell = probe_row()?;
        if cell.is_none() && scroller.is_scrollable(Axis::Vertical)? {
            scroller.reset()?;
            cell = probe_row()?;
            if cell.is_none() {
                cell = scroller.sweep(Axis::Vertical, probe_row)?;
            }
        }
        let Some(cell) = cell else {
            error!(grid = %grid, row, "row index out of bounds");
            return Err(ProbeError::precondition(NOT_SCROLL, format!("row {row} is out of bounds for {grid}")));
        };
        scroller.align(&cell, grid, &[Edge::Bottom, Edge::Top])?;

        let cell_strategy: By = Self::cell_strategy(row, column).into();
        let probe_cell = || convergence.probe(grid, &cell_strategy, probe_timeout);
        let mut cell = probe_cell()?;
        if cell.is_none() && scroller.is_scrollable(Axis::Horizontal)? {
            scroller.reset_axis(Axis::Horizontal)?;
            cell = probe_cell()?;
            if cell.is_none() {
                cell = scroller.sweep(Axis::Horizontal, probe_cell)?;
            }
        }
        let Some(cell) = cell else {
            error!(grid = %grid, column, "column index out of bounds");
            return Err(ProbeError::precondition(
                NOT_SCROLL,
                format!("column {column} is out of bounds for {grid}"),
            ));
        };
        scroller.align(&cell, grid, &[Edge::Right, Edge::Left])?;
        Ok(cell)
    }
}

impl From<Element> for DataGrid {
    fn from(element: Element) -> Self {
        Self::new(element)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::element::Session;
    use crate::geometry::Rect;
    use crate::mock::{MockNode, MockTree};
    use crate::convergence::RESET_THRESHOLD_PERCENT;
    use crate::settings::Settings;
    use crate::tree::{ControlType, ScrollAmount, TreeProvider};
    use std::rc::Rc;

    fn session(tree: &Rc<MockTree>) -> Rc<Session> {
        let provider: Rc<dyn TreeProvider> = tree.clone();
        Session::new(
            provider,
            Settings::default()
                .with_search_timeout_ms(0)
                .with_probe_timeout_ms(0),
        )
    }

    /// 100x60 grid over `rows` x `columns` cells of 40x20
    fn grid(tree: &Rc<MockTree>, rows: usize, columns: usize) -> DataGrid {
        let key = tree.add(
            tree.root_key(),
            MockNode::new(ControlType::DataGrid)
                .with_rect(Rect::new(0.0, 0.0, 100.0, 60.0))
                .scrollable()
                .virtualized(),
        );
        tree.add_grid_cells(key, rows, columns, 40.0, 20.0);
        let session = session(tree);
        DataGrid::new(Element::from_node(&session, tree.node(key).unwrap()))
    }

    mod list_tests {
        use super::*;

        #[test]
        fn test_list_box_scrolls_item_into_view() {
            let tree = Rc::new(MockTree::new());
            let key = tree.add(
                tree.root_key(),
                MockNode::new(ControlType::List)
                    .with_rect(Rect::new(0.0, 0.0, 200.0, 100.0))
                    .scrollable()
                    .virtualized(),
            );
            tree.add_list_items(key, 200, 20.0);
            let session = session(&tree);
            let list: ListBox = Element::from_node(&session, tree.node(key).unwrap()).into();
            let item = list.scroll_to(By::name("Item 150")).unwrap().unwrap();
            let viewport = list.element().bounding_rectangle().unwrap();
            assert!(viewport.contains(&item.interaction_point().unwrap()));
        }
    }

    mod combo_tests {
        use super::*;

        fn combo(tree: &Rc<MockTree>, state: ExpandCollapseState) -> usize {
            let combo = tree.add(
                tree.root_key(),
                MockNode::new(ControlType::ComboBox)
                    .with_process_id(77)
                    .with_rect(Rect::new(0.0, 0.0, 200.0, 20.0))
                    .with_property(PropertyId::ExpandCollapseState, state)
                    .scrollable_within(Rect::new(0.0, 20.0, 200.0, 100.0))
                    .virtualized(),
            );
            for i in 0..30 {
                let y = 20.0 + 20.0 * f64::from(i);
                tree.add(
                    combo,
                    MockNode::new(ControlType::ListItem)
                        .with_name(format!("Option {i}"))
                        .with_property(PropertyId::IsSelected, i == 3)
                        .with_rect(Rect::new(0.0, y, 200.0, 20.0)),
                );
            }
            combo
        }

        fn popup(tree: &Rc<MockTree>) {
            tree.add(
                tree.root_key(),
                MockNode::new(ControlType::Window)
                    .with_class_name("Popup")
                    .with_process_id(77)
                    .with_rect(Rect::new(0.0, 20.0, 200.0, 100.0)),
            );
        }

        #[test]
        fn test_collapsed_combo_is_precondition_error() {
            let tree = Rc::new(MockTree::new());
            let key = combo(&tree, ExpandCollapseState::Collapsed);
            popup(&tree);
            let session = session(&tree);
            let combo = ComboBox::new(Element::from_node(&session, tree.node(key).unwrap()));
            assert!(!combo.is_expanded().unwrap());
            let err = combo.scroll_to(By::name("Option 20")).unwrap_err();
            assert!(matches!(err, ProbeError::Precondition { .. }));
            assert_eq!(err.reason(), NOT_SCROLL);
            assert_eq!(tree.scroll_calls(), 0);
        }

        #[test]
        fn test_expanded_combo_aligns_against_popup() {
            let tree = Rc::new(MockTree::new());
            let key = combo(&tree, ExpandCollapseState::Expanded);
            popup(&tree);
            let session = session(&tree);
            let combo = ComboBox::new(Element::from_node(&session, tree.node(key).unwrap()));
            let item = combo.scroll_to(By::name("Option 20")).unwrap().unwrap();
            let popup_rect = Rect::new(0.0, 20.0, 200.0, 100.0);
            assert!(popup_rect.contains(&item.interaction_point().unwrap()));
        }

        #[test]
        fn test_expanded_combo_without_popup_fails() {
            let tree = Rc::new(MockTree::new());
            let key = combo(&tree, ExpandCollapseState::Expanded);
            let session = session(&tree);
            let combo = ComboBox::new(Element::from_node(&session, tree.node(key).unwrap()));
            let err = combo.scroll_to(By::name("Option 1")).unwrap_err();
            assert_eq!(err.reason(), NOT_SCROLL);
            assert!(err.to_string().contains("popup"));
        }

        #[test]
        fn test_selected_item() {
            let tree = Rc::new(MockTree::new());
            let key = combo(&tree, ExpandCollapseState::Expanded);
            let session = session(&tree);
            let combo = ComboBox::new(Element::from_node(&session, tree.node(key).unwrap()));
            let selected = combo.selected_item().unwrap().unwrap();
            assert_eq!(selected.name().unwrap(), "Option 3");
        }

        #[test]
        fn test_selected_item_of_closed_combo_reads_selection() {
            let tree = Rc::new(MockTree::new());
            let key = combo(&tree, ExpandCollapseState::Collapsed);
            // items follow the combo box in key order
            tree.set_selection(key, &[key + 1 + 3]);
            let session = session(&tree);
            let combo = ComboBox::new(Element::from_node(&session, tree.node(key).unwrap()));
            let finds = tree.find_calls();
            let selected = combo.selected_item().unwrap().unwrap();
            assert_eq!(selected.name().unwrap(), "Option 3");
            assert_eq!(tree.find_calls(), finds);
        }

        #[test]
        fn test_selected_item_of_closed_combo_needs_selection_pattern() {
            let tree = Rc::new(MockTree::new());
            let key = combo(&tree, ExpandCollapseState::Collapsed);
            let session = session(&tree);
            let combo = ComboBox::new(Element::from_node(&session, tree.node(key).unwrap()));
            let err = combo.selected_item().unwrap_err();
            assert!(matches!(err, ProbeError::PatternNotSupported { .. }));
            assert_eq!(err.reason(), NOT_GET_SELECTED_ITEM);
        }

        #[test]
        fn test_closed_combo_with_empty_selection() {
            let tree = Rc::new(MockTree::new());
            let key = combo(&tree, ExpandCollapseState::Collapsed);
            tree.set_selection(key, &[]);
            let session = session(&tree);
            let combo = ComboBox::new(Element::from_node(&session, tree.node(key).unwrap()));
            assert!(combo.selected_item().unwrap().is_none());
        }
    }

    mod grid_tests {
        use super::*;

        #[test]
        fn test_counts() {
            let tree = Rc::new(MockTree::new());
            let grid = grid(&tree, 50, 6);
            assert_eq!(grid.row_count().unwrap(), 50);
            assert_eq!(grid.column_count().unwrap(), 6);
        }

        #[test]
        fn test_negative_indices() {
            let tree = Rc::new(MockTree::new());
            let grid = grid(&tree, 5, 2);
            let err = grid.scroll_to(-1, 0).unwrap_err();
            assert!(matches!(err, ProbeError::InvalidArgument { .. }));
            assert_eq!(err.reason(), NOT_SCROLL);
            let err = grid.item(0, -2).unwrap_err();
            assert_eq!(err.reason(), NOT_GET_ITEM);
            assert_eq!(tree.scroll_calls(), 0);
        }

        #[test]
        fn test_item_requires_visible_cell() {
            let tree = Rc::new(MockTree::new());
            let grid = grid(&tree, 50, 6);
            let item = grid.item(1, 1).unwrap();
            assert_eq!(item.name().unwrap(), "1,1");
            let err = grid.item(40, 1).unwrap_err();
            assert_eq!(err.reason(), NOT_GET_ITEM);
        }

        #[test]
        fn test_scroll_to_sweeps_rows_then_columns() {
            let tree = Rc::new(MockTree::new());
            let grid = grid(&tree, 50, 6);
            let cell = grid.scroll_to(42, 5).unwrap();
            let rect = grid.element().bounding_rectangle().unwrap();
            assert!(rect.contains(&cell.interaction_point().unwrap()));
            assert_eq!(cell.property::<i32>(&PropertyId::Row).unwrap(), 42);
            assert_eq!(cell.property::<i32>(&PropertyId::Column).unwrap(), 5);
            let item = grid.item(42, 5).unwrap();
            assert_eq!(item.name().unwrap(), "42,5");
        }

        #[test]
        fn test_scroll_to_column_left_of_view() {
            let tree = Rc::new(MockTree::new());
            let grid = grid(&tree, 50, 6);
            grid.scroll_to(0, 5).unwrap();
            let pattern = grid.element().scroll_pattern().unwrap().unwrap();
            assert!(pattern.horizontal_percent().unwrap() > RESET_THRESHOLD_PERCENT);

            let cell = grid.scroll_to(0, 0).unwrap();
            assert_eq!(cell.property::<i32>(&PropertyId::Column).unwrap(), 0);
            let rect = grid.element().bounding_rectangle().unwrap();
            assert!(rect.contains(&cell.interaction_point().unwrap()));
            assert_eq!(pattern.horizontal_percent().unwrap(), 0.0);
        }

        #[test]
        fn test_scroll_to_waits_for_late_rows() {
            let tree = Rc::new(MockTree::new());
            let key = tree.add(
                tree.root_key(),
                MockNode::new(ControlType::DataGrid)
                    .with_rect(Rect::new(0.0, 0.0, 100.0, 60.0))
                    .scrollable()
                    .virtualized()
                    .with_realization_lag(1),
            );
            tree.add_grid_cells(key, 12, 2, 40.0, 20.0);
            let provider: Rc<dyn TreeProvider> = tree.clone();
            let session = Session::new(
                provider,
                Settings::default()
                    .with_search_timeout_ms(0)
                    .with_probe_timeout_ms(200),
            );
            let grid = DataGrid::new(Element::from_node(&session, tree.node(key).unwrap()));
            let cell = grid.scroll_to(4, 1).unwrap();
            assert_eq!(cell.property::<i32>(&PropertyId::Row).unwrap(), 4);
            assert_eq!(cell.property::<i32>(&PropertyId::Column).unwrap(), 1);
            // one page down reaches rows 3..=5
            assert_eq!(tree.scroll_log()[0], (ScrollAmount::NoAmount, ScrollAmount::LargeIncrement));
        }

        #[test]
        fn test_scroll_to_out_of_range() {
            let tree = Rc::new(MockTree::new());
            let grid = grid(&tree, 10, 3);
            let err = grid.scroll_to(10, 0).unwrap_err();
            assert!(matches!(err, ProbeError::Precondition { .. }));
            assert!(err.to_string().contains("row 10"));
            let err = grid.scroll_to(0, 3).unwrap_err();
            assert!(err.to_string().contains("column 3"));
        }
    }
}
