//! Scroll pattern handle.

use crate::result::{ProbeError, ProbeResult};
use crate::tree::{Node, PatternKind, ScrollAmount, ScrollInfo, TreeProvider};
use std::fmt;
use std::rc::Rc;
use tracing::trace;

/// Scroll access to one container node.
///
/// Every getter reads the provider afresh; nothing is cached between calls.
#[derive(Clone)]
pub struct ScrollPattern {
    provider: Rc<dyn TreeProvider>,
    node: Node,
}

impl fmt::Debug for ScrollPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ScrollPattern")
            .field("node", &self.node)
            .finish_non_exhaustive()
    }
}

impl ScrollPattern {
    /// Wrap `node`; the caller has checked pattern support
    #[must_use]
    pub fn new(provider: Rc<dyn TreeProvider>, node: Node) -> Self {
        Self { provider, node }
    }

    /// The container node
    #[must_use]
    pub const fn node(&self) -> &Node {
        &self.node
    }

    /// Current scroll state
    pub fn info(&self) -> ProbeResult<ScrollInfo> {
        self.provider
            .scroll_info(&self.node)?
            .ok_or_else(|| ProbeError::PatternNotSupported {
                reason: "NOT SCROLL".to_string(),
                pattern: PatternKind::Scroll.name().to_string(),
                element: self.node.to_string(),
            })
    }

    /// Vertical position in percent, or [`ScrollInfo::NO_SCROLL`]
    pub fn vertical_percent(&self) -> ProbeResult<f64> {
        Ok(self.info()?.vertical_percent)
    }

    /// Horizontal position in percent, or [`ScrollInfo::NO_SCROLL`]
    pub fn horizontal_percent(&self) -> ProbeResult<f64> {
        Ok(self.info()?.horizontal_percent)
    }

    /// Whether the content can scroll vertically
    pub fn vertically_scrollable(&self) -> ProbeResult<bool> {
        Ok(self.info()?.vertically_scrollable)
    }

    /// Whether the content can scroll horizontally
    pub fn horizontally_scrollable(&self) -> ProbeResult<bool> {
        Ok(self.info()?.horizontally_scrollable)
    }

    /// Scroll one step vertically
    pub fn scroll_vertical(&self, amount: ScrollAmount) -> ProbeResult<()> {
        trace!(node = %self.node, ?amount, "scroll vertical");
        self.provider.scroll(&self.node, ScrollAmount::NoAmount, amount)
    }

    /// Scroll one step horizontally
    pub fn scroll_horizontal(&self, amount: ScrollAmount) -> ProbeResult<()> {
        trace!(node = %self.node, ?amount, "scroll horizontal");
        self.provider.scroll(&self.node, amount, ScrollAmount::NoAmount)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::geometry::Rect;
    use crate::mock::{MockNode, MockTree};
    use crate::tree::ControlType;

    fn list(tree: &Rc<MockTree>, items: usize) -> ScrollPattern {
        let list = tree.add(
            tree.root_key(),
            MockNode::new(ControlType::List)
                .with_rect(Rect::new(0.0, 0.0, 200.0, 100.0))
                .scrollable(),
        );
        tree.add_list_items(list, items, 20.0);
        let provider: Rc<dyn TreeProvider> = tree.clone();
        ScrollPattern::new(provider, tree.node(list).unwrap())
    }

    mod state_tests {
        use super::*;

        #[test]
        fn test_fresh_list_starts_at_origin() {
            let tree = Rc::new(MockTree::new());
            let pattern = list(&tree, 50);
            let info = pattern.info().unwrap();
            assert_eq!(info.vertical_percent, 0.0);
            assert!(info.vertically_scrollable);
            assert!(!info.horizontally_scrollable);
            assert_eq!(info.horizontal_percent, ScrollInfo::NO_SCROLL);
            assert!(!info.has_horizontal_scroll_bar());
        }

        #[test]
        fn test_short_list_cannot_scroll() {
            let tree = Rc::new(MockTree::new());
            let pattern = list(&tree, 3);
            assert!(!pattern.vertically_scrollable().unwrap());
            assert_eq!(pattern.vertical_percent().unwrap(), ScrollInfo::NO_SCROLL);
        }
    }

    mod movement_tests {
        use super::*;

        #[test]
        fn test_steps_move_and_clamp() {
            let tree = Rc::new(MockTree::new());
            let pattern = list(&tree, 50);
            pattern.scroll_vertical(ScrollAmount::LargeIncrement).unwrap();
            let after_page = pattern.vertical_percent().unwrap();
            assert!(after_page > 0.0);
            pattern.scroll_vertical(ScrollAmount::SmallDecrement).unwrap();
            assert!(pattern.vertical_percent().unwrap() < after_page);
            for _ in 0..20 {
                pattern.scroll_vertical(ScrollAmount::LargeIncrement).unwrap();
            }
            assert_eq!(pattern.vertical_percent().unwrap(), 100.0);
            assert_eq!(tree.scroll_calls(), 22);
        }

        #[test]
        fn test_missing_pattern_is_reported() {
            let tree = Rc::new(MockTree::new());
            let pane = tree.add(tree.root_key(), MockNode::new(ControlType::Pane));
            let provider: Rc<dyn TreeProvider> = tree.clone();
            let pattern = ScrollPattern::new(provider, tree.node(pane).unwrap());
            let err = pattern.info().unwrap_err();
            assert_eq!(err.reason(), "NOT SCROLL");
        }
    }
}
