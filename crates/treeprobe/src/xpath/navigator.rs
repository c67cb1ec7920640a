//! Cursor over the provider tree.

use super::{NodeKind, PathNavigator};
use crate::element::{read_text, TextStrategy};
use crate::result::{ProbeError, ProbeResult};
use crate::tree::{Node, PropertyId, TreeProvider};
use std::cell::OnceCell;
use std::fmt;
use std::rc::Rc;

/// Local name of the synthetic document root
pub const ROOT_NAME: &str = "Desktop Window";

#[derive(Clone)]
struct ElementItem {
    node: Node,
    /// Shared with every attribute item created from this element
    properties: Rc<OnceCell<Vec<PropertyId>>>,
}

impl ElementItem {
    fn new(node: Node) -> Self {
        Self {
            node,
            properties: Rc::new(OnceCell::new()),
        }
    }

    fn properties(&self, provider: &dyn TreeProvider) -> ProbeResult<&[PropertyId]> {
        if let Some(list) = self.properties.get() {
            return Ok(list);
        }
        let list = provider.supported_properties(&self.node)?;
        Ok(self.properties.get_or_init(|| list))
    }
}

#[derive(Clone)]
enum Item {
    Root(ElementItem),
    Element(ElementItem),
    Property {
        owner: ElementItem,
        owner_is_root: bool,
        index: usize,
    },
}

/// Navigator over the tree of a [`TreeProvider`].
///
/// The provider root becomes the document root; every other node is an
/// element named after its control type; supported properties are exposed
/// as attributes, enumerated once per element and in provider order.
#[derive(Clone)]
pub struct TreeNavigator {
    provider: Rc<dyn TreeProvider>,
    item: Item,
}

impl fmt::Debug for TreeNavigator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut s = f.debug_struct("TreeNavigator");
        match &self.item {
            Item::Root(e) => s.field("root", &e.node),
            Item::Element(e) => s.field("element", &e.node),
            Item::Property { owner, index, .. } => {
                s.field("owner", &owner.node).field("property", index)
            }
        };
        s.finish()
    }
}

impl TreeNavigator {
    /// Create a navigator positioned on `node`
    #[must_use]
    pub fn new(provider: Rc<dyn TreeProvider>, node: Node) -> Self {
        let item = Self::wrap(provider.as_ref(), node);
        Self { provider, item }
    }

    fn wrap(provider: &dyn TreeProvider, node: Node) -> Item {
        if node == provider.root() {
            Item::Root(ElementItem::new(node))
        } else {
            Item::Element(ElementItem::new(node))
        }
    }

    fn element(&self) -> Option<&ElementItem> {
        match &self.item {
            Item::Root(e) | Item::Element(e) => Some(e),
            Item::Property { .. } => None,
        }
    }

    /// Tree node under the cursor (root or element items)
    #[must_use]
    pub fn node(&self) -> Option<&Node> {
        self.element().map(|e| &e.node)
    }

    /// Property under the cursor (attribute items)
    pub fn property(&self) -> ProbeResult<Option<PropertyId>> {
        match &self.item {
            Item::Property { owner, index, .. } => {
                Ok(owner.properties(self.provider.as_ref())?.get(*index).cloned())
            }
            _ => Ok(None),
        }
    }

    /// Whether the element has at least one child
    pub fn has_children(&self) -> ProbeResult<bool> {
        match self.element() {
            Some(e) => Ok(self.provider.first_child(&e.node)?.is_some()),
            None => Ok(false),
        }
    }

    /// Whether text can be read from the element
    pub fn has_text(&self) -> ProbeResult<bool> {
        match self.element() {
            Some(e) => Ok(read_text(self.provider.as_ref(), &e.node, TextStrategy::Any)?.is_some()),
            None => Ok(false),
        }
    }

    /// An element with no children whose text cannot be read.
    ///
    /// The root is never empty.
    pub fn is_empty_element(&self) -> ProbeResult<bool> {
        match self.item {
            Item::Element(_) => Ok(!self.has_children()? && !self.has_text()?),
            _ => Ok(false),
        }
    }
}

impl PathNavigator for TreeNavigator {
    fn kind(&self) -> NodeKind {
        match self.item {
            Item::Root(_) => NodeKind::Root,
            Item::Element(_) => NodeKind::Element,
            Item::Property { .. } => NodeKind::Attribute,
        }
    }

    fn local_name(&self) -> ProbeResult<String> {
        match &self.item {
            Item::Root(_) => Ok(ROOT_NAME.to_string()),
            Item::Element(e) => match self.provider.property(&e.node, &PropertyId::ControlType) {
                Ok(value) => Ok(value
                    .as_control_type()
                    .map_or_else(|| value.to_string(), |ct| ct.name().to_string())),
                Err(ProbeError::PropertyNotSupported { .. }) => Ok("Custom".to_string()),
                Err(e) => Err(e),
            },
            Item::Property { .. } => Ok(self
                .property()?
                .map(|p| p.name().to_string())
                .unwrap_or_default()),
        }
    }

    fn string_value(&self) -> ProbeResult<String> {
        let Item::Property { owner, .. } = &self.item else {
            return Ok(String::new());
        };
        let Some(property) = self.property()? else {
            return Ok(String::new());
        };
        match self.provider.property(&owner.node, &property) {
            Ok(value) => Ok(value.to_string()),
            Err(ProbeError::PropertyNotSupported { .. }) => Ok(String::new()),
            Err(e) => Err(e),
        }
    }

    fn is_same_position(&self, other: &Self) -> bool {
        match (&self.item, &other.item) {
            (Item::Root(a), Item::Root(b)) | (Item::Element(a), Item::Element(b)) => a.node == b.node,
            (
                Item::Property {
                    owner: a, index: i, ..
                },
                Item::Property {
                    owner: b, index: j, ..
                },
            ) => a.node == b.node && i == j,
            _ => false,
        }
    }

    fn move_to_parent(&mut self) -> ProbeResult<bool> {
        match &self.item {
            Item::Root(_) => Ok(false),
            Item::Element(e) => match self.provider.parent(&e.node)? {
                Some(parent) => {
                    self.item = Self::wrap(self.provider.as_ref(), parent);
                    Ok(true)
                }
                None => Ok(false),
            },
            Item::Property {
                owner,
                owner_is_root,
                ..
            } => {
                self.item = if *owner_is_root {
                    Item::Root(owner.clone())
                } else {
                    Item::Element(owner.clone())
                };
                Ok(true)
            }
        }
    }

    fn move_to_first_child(&mut self) -> ProbeResult<bool> {
        let Some(e) = self.element() else {
            return Ok(false);
        };
        match self.provider.first_child(&e.node)? {
            Some(child) => {
                self.item = Item::Element(ElementItem::new(child));
                Ok(true)
            }
            None => Ok(false),
        }
    }

    fn move_to_next(&mut self) -> ProbeResult<bool> {
        let Item::Element(e) = &self.item else {
            return Ok(false);
        };
        match self.provider.next_sibling(&e.node)? {
            Some(next) => {
                self.item = Item::Element(ElementItem::new(next));
                Ok(true)
            }
            None => Ok(false),
        }
    }

    fn move_to_previous(&mut self) -> ProbeResult<bool> {
        let Item::Element(e) = &self.item else {
            return Ok(false);
        };
        match self.provider.previous_sibling(&e.node)? {
            Some(previous) => {
                self.item = Item::Element(ElementItem::new(previous));
                Ok(true)
            }
            None => Ok(false),
        }
    }

    fn move_to_first_attribute(&mut self) -> ProbeResult<bool> {
        let (owner, owner_is_root) = match &self.item {
            Item::Root(e) => (e.clone(), true),
            Item::Element(e) => (e.clone(), false),
            Item::Property { .. } => return Ok(false),
        };
        if owner.properties(self.provider.as_ref())?.is_empty() {
            return Ok(false);
        }
        self.item = Item::Property {
            owner,
            owner_is_root,
            index: 0,
        };
        Ok(true)
    }

    fn move_to_next_attribute(&mut self) -> ProbeResult<bool> {
        let Item::Property { owner, index, .. } = &mut self.item else {
            return Ok(false);
        };
        let count = owner.properties(self.provider.as_ref())?.len();
        if *index + 1 < count {
            *index += 1;
            Ok(true)
        } else {
            Ok(false)
        }
    }
}
