//! Expression evaluator, generic over [`PathNavigator`].

use super::parser::{Axis, CompareOp, Expr, Function, NodeTest, Step};
use super::{NodeKind, PathNavigator};
use crate::result::{ProbeError, ProbeResult};

/// Result of evaluating an expression
#[derive(Debug, Clone)]
pub enum Value<N> {
    /// Node-set in document order
    Nodes(Vec<N>),
    /// String
    String(String),
    /// Number
    Number(f64),
    /// Boolean
    Boolean(bool),
}

impl<N> Value<N> {
    /// XPath type name
    #[must_use]
    pub const fn type_name(&self) -> &'static str {
        match self {
            Self::Nodes(_) => "node-set",
            Self::String(_) => "string",
            Self::Number(_) => "number",
            Self::Boolean(_) => "boolean",
        }
    }
}

struct Context<'a, N> {
    node: &'a N,
    position: usize,
    size: usize,
}

/// Evaluate `expr` with `context` as the context node
pub fn evaluate<N: PathNavigator>(expr: &Expr, context: &N) -> ProbeResult<Value<N>> {
    eval(
        expr,
        &Context {
            node: context,
            position: 1,
            size: 1,
        },
    )
}

fn type_error(message: String) -> ProbeError {
    ProbeError::InvalidPath {
        expression: String::new(),
        message,
    }
}

fn eval<N: PathNavigator>(expr: &Expr, ctx: &Context<'_, N>) -> ProbeResult<Value<N>> {
    match expr {
        Expr::Or(left, right) => {
            let result = to_bool(&eval(left, ctx)?) || to_bool(&eval(right, ctx)?);
            Ok(Value::Boolean(result))
        }
        Expr::And(left, right) => {
            let result = to_bool(&eval(left, ctx)?) && to_bool(&eval(right, ctx)?);
            Ok(Value::Boolean(result))
        }
        Expr::Compare(op, left, right) => {
            let l = eval(left, ctx)?;
            let r = eval(right, ctx)?;
            Ok(Value::Boolean(compare(*op, &l, &r)?))
        }
        Expr::Union(left, right) => {
            let mut nodes = expect_nodes(eval(left, ctx)?, "|")?;
            nodes.extend(expect_nodes(eval(right, ctx)?, "|")?);
            Ok(Value::Nodes(document_order(nodes)?))
        }
        Expr::Negate(inner) => Ok(Value::Number(-to_number(&eval(inner, ctx)?)?)),
        Expr::Path { absolute, steps } => {
            let start = if *absolute {
                root_of(ctx.node)?
            } else {
                ctx.node.clone()
            };
            Ok(Value::Nodes(apply_steps(vec![start], steps)?))
        }
        Expr::Filter {
            primary,
            predicates,
            steps,
        } => {
            let mut nodes = expect_nodes(eval(primary, ctx)?, "a filter expression")?;
            for predicate in predicates {
                nodes = apply_predicate(nodes, predicate)?;
            }
            Ok(Value::Nodes(apply_steps(nodes, steps)?))
        }
        Expr::Literal(text) => Ok(Value::String(text.clone())),
        Expr::Number(value) => Ok(Value::Number(*value)),
        Expr::Call(function, args) => call(*function, args, ctx),
    }
}

fn expect_nodes<N>(value: Value<N>, site: &str) -> ProbeResult<Vec<N>> {
    match value {
        Value::Nodes(nodes) => Ok(nodes),
        other => Err(type_error(format!(
            "{site} needs a node-set, got a {}",
            other.type_name()
        ))),
    }
}

fn root_of<N: PathNavigator>(node: &N) -> ProbeResult<N> {
    let mut cursor = node.clone();
    while cursor.move_to_parent()? {}
    Ok(cursor)
}

// =============================================================================
// Steps
// =============================================================================

fn apply_steps<N: PathNavigator>(mut nodes: Vec<N>, steps: &[Step]) -> ProbeResult<Vec<N>> {
    for step in steps {
        let mut selected = Vec::new();
        let mut contributors = 0;
        for node in &nodes {
            let hits = select_step(node, step)?;
            if !hits.is_empty() {
                contributors += 1;
                selected.extend(hits);
            }
        }
        nodes = if contributors > 1 {
            document_order(selected)?
        } else if step.axis.is_reverse() {
            selected.reverse();
            selected
        } else {
            selected
        };
    }
    Ok(nodes)
}

fn select_step<N: PathNavigator>(node: &N, step: &Step) -> ProbeResult<Vec<N>> {
    let principal = if step.axis == Axis::Attribute {
        NodeKind::Attribute
    } else {
        NodeKind::Element
    };
    let mut matched = Vec::new();
    for candidate in axis_items(node, step.axis)? {
        if node_test_matches(&candidate, &step.test, principal)? {
            matched.push(candidate);
        }
    }
    for predicate in &step.predicates {
        matched = apply_predicate(matched, predicate)?;
    }
    Ok(matched)
}

fn node_test_matches<N: PathNavigator>(
    candidate: &N,
    test: &NodeTest,
    principal: NodeKind,
) -> ProbeResult<bool> {
    Ok(match test {
        NodeTest::Node => true,
        NodeTest::Any => candidate.kind() == principal,
        NodeTest::Name(name) => candidate.kind() == principal && candidate.local_name()? == *name,
    })
}

/// Items along `axis`, in axis order (nearest first for reverse axes)
fn axis_items<N: PathNavigator>(node: &N, axis: Axis) -> ProbeResult<Vec<N>> {
    let mut items = Vec::new();
    match axis {
        Axis::SelfAxis => items.push(node.clone()),
        Axis::Child => {
            let mut child = node.clone();
            if child.move_to_first_child()? {
                items.push(child.clone());
                while child.move_to_next()? {
                    items.push(child.clone());
                }
            }
        }
        Axis::Descendant => push_descendants(node, &mut items)?,
        Axis::DescendantOrSelf => {
            items.push(node.clone());
            push_descendants(node, &mut items)?;
        }
        Axis::Parent => {
            let mut parent = node.clone();
            if parent.move_to_parent()? {
                items.push(parent);
            }
        }
        Axis::Ancestor | Axis::AncestorOrSelf => {
            if axis == Axis::AncestorOrSelf {
                items.push(node.clone());
            }
            let mut cursor = node.clone();
            while cursor.move_to_parent()? {
                items.push(cursor.clone());
            }
        }
        Axis::FollowingSibling | Axis::PrecedingSibling => {
            if node.kind() == NodeKind::Element {
                let mut sibling = node.clone();
                loop {
                    let moved = if axis == Axis::FollowingSibling {
                        sibling.move_to_next()?
                    } else {
                        sibling.move_to_previous()?
                    };
                    if !moved {
                        break;
                    }
                    items.push(sibling.clone());
                }
            }
        }
        Axis::Attribute => {
            let mut attribute = node.clone();
            if attribute.move_to_first_attribute()? {
                items.push(attribute.clone());
                while attribute.move_to_next_attribute()? {
                    items.push(attribute.clone());
                }
            }
        }
    }
    Ok(items)
}

fn push_descendants<N: PathNavigator>(node: &N, out: &mut Vec<N>) -> ProbeResult<()> {
    let mut child = node.clone();
    if !child.move_to_first_child()? {
        return Ok(());
    }
    loop {
        out.push(child.clone());
        push_descendants(&child, out)?;
        if !child.move_to_next()? {
            return Ok(());
        }
    }
}

fn apply_predicate<N: PathNavigator>(nodes: Vec<N>, predicate: &Expr) -> ProbeResult<Vec<N>> {
    let size = nodes.len();
    let mut kept = Vec::with_capacity(size);
    for (index, node) in nodes.into_iter().enumerate() {
        let ctx = Context {
            node: &node,
            position: index + 1,
            size,
        };
        let keep = match eval(predicate, &ctx)? {
            Value::Number(n) => n == (index + 1) as f64,
            other => to_bool(&other),
        };
        if keep {
            kept.push(node);
        }
    }
    Ok(kept)
}

// =============================================================================
// Document order
// =============================================================================

/// Child lists of the parents met during one ordering pass, so that each
/// parent's children are walked once instead of once per node
struct SiblingIndex<N> {
    parents: Vec<(N, Vec<N>)>,
}

impl<N: PathNavigator> SiblingIndex<N> {
    const fn new() -> Self {
        Self {
            parents: Vec::new(),
        }
    }

    fn children(&mut self, parent: &N) -> ProbeResult<&[N]> {
        let slot = match self.parents.iter().position(|(p, _)| p.is_same_position(parent)) {
            Some(slot) => slot,
            None => {
                let mut children = Vec::new();
                let mut child = parent.clone();
                if child.move_to_first_child()? {
                    children.push(child.clone());
                    while child.move_to_next()? {
                        children.push(child.clone());
                    }
                }
                self.parents.push((parent.clone(), children));
                self.parents.len() - 1
            }
        };
        Ok(&self.parents[slot].1)
    }

    /// Position of `node` among the children of `parent`
    fn position(&mut self, parent: &N, node: &N) -> ProbeResult<usize> {
        if let Some(index) = self.children(parent)?.iter().position(|c| c.is_same_position(node)) {
            return Ok(index);
        }
        // the tree changed since the children were listed
        let mut sibling = node.clone();
        let mut index = 0;
        while sibling.move_to_previous()? {
            index += 1;
        }
        Ok(index)
    }
}

/// Sort key: one `(1, sibling index)` per element level from the root, and a
/// trailing `(0, attribute index)` for attributes so they sort after their
/// owner and before its children.
fn order_key<N: PathNavigator>(node: &N, siblings: &mut SiblingIndex<N>) -> ProbeResult<Vec<(u8, usize)>> {
    let mut key = Vec::new();
    let mut cursor = node.clone();
    if cursor.kind() == NodeKind::Attribute {
        let mut owner = cursor.clone();
        owner.move_to_parent()?;
        let mut attribute = owner.clone();
        let mut index = 0;
        if attribute.move_to_first_attribute()? {
            while !attribute.is_same_position(&cursor) && attribute.move_to_next_attribute()? {
                index += 1;
            }
        }
        key.push((0, index));
        cursor = owner;
    }
    loop {
        let mut parent = cursor.clone();
        if !parent.move_to_parent()? {
            break;
        }
        key.push((1, siblings.position(&parent, &cursor)?));
        cursor = parent;
    }
    key.reverse();
    Ok(key)
}

fn document_order<N: PathNavigator>(nodes: Vec<N>) -> ProbeResult<Vec<N>> {
    let mut siblings = SiblingIndex::new();
    let mut keyed = nodes
        .into_iter()
        .map(|node| Ok((order_key(&node, &mut siblings)?, node)))
        .collect::<ProbeResult<Vec<_>>>()?;
    keyed.sort_by(|a, b| a.0.cmp(&b.0));
    keyed.dedup_by(|a, b| a.0 == b.0);
    Ok(keyed.into_iter().map(|(_, node)| node).collect())
}

// =============================================================================
// Conversions and comparison
// =============================================================================

fn to_bool<N>(value: &Value<N>) -> bool {
    match value {
        Value::Nodes(nodes) => !nodes.is_empty(),
        Value::String(s) => !s.is_empty(),
        Value::Number(n) => *n != 0.0 && !n.is_nan(),
        Value::Boolean(b) => *b,
    }
}

fn string_to_number(s: &str) -> f64 {
    s.trim().parse::<f64>().unwrap_or(f64::NAN)
}

fn to_number<N: PathNavigator>(value: &Value<N>) -> ProbeResult<f64> {
    Ok(match value {
        Value::Number(n) => *n,
        Value::Boolean(b) => f64::from(u8::from(*b)),
        Value::String(s) => string_to_number(s),
        Value::Nodes(_) => string_to_number(&to_string(value)?),
    })
}

fn format_number(n: f64) -> String {
    if n.is_nan() {
        "NaN".to_string()
    } else if n.is_infinite() {
        let text = if n > 0.0 { "Infinity" } else { "-Infinity" };
        text.to_string()
    } else if n.fract() == 0.0 && n.abs() < 1e15 {
        format!("{}", n as i64)
    } else {
        n.to_string()
    }
}

fn to_string<N: PathNavigator>(value: &Value<N>) -> ProbeResult<String> {
    Ok(match value {
        Value::Nodes(nodes) => match nodes.first() {
            Some(node) => node.string_value()?,
            None => String::new(),
        },
        Value::String(s) => s.clone(),
        Value::Number(n) => format_number(*n),
        Value::Boolean(b) => b.to_string(),
    })
}

enum Atom {
    Str(String),
    Num(f64),
    Bool(bool),
}

fn atom_of<N: PathNavigator>(value: &Value<N>) -> ProbeResult<Atom> {
    Ok(match value {
        Value::String(s) => Atom::Str(s.clone()),
        Value::Number(n) => Atom::Num(*n),
        Value::Boolean(b) => Atom::Bool(*b),
        Value::Nodes(_) => Atom::Str(to_string(value)?),
    })
}

fn atom_number(atom: &Atom) -> f64 {
    match atom {
        Atom::Str(s) => string_to_number(s),
        Atom::Num(n) => *n,
        Atom::Bool(b) => f64::from(u8::from(*b)),
    }
}

fn atom_bool(atom: &Atom) -> bool {
    match atom {
        Atom::Str(s) => !s.is_empty(),
        Atom::Num(n) => *n != 0.0 && !n.is_nan(),
        Atom::Bool(b) => *b,
    }
}

fn compare_atoms(op: CompareOp, left: &Atom, right: &Atom) -> bool {
    match op {
        CompareOp::Eq | CompareOp::Ne => {
            let equal = match (left, right) {
                (Atom::Bool(_), _) | (_, Atom::Bool(_)) => atom_bool(left) == atom_bool(right),
                (Atom::Num(_), _) | (_, Atom::Num(_)) => atom_number(left) == atom_number(right),
                (Atom::Str(l), Atom::Str(r)) => l == r,
            };
            (op == CompareOp::Eq) == equal
        }
        CompareOp::Lt => atom_number(left) < atom_number(right),
        CompareOp::Le => atom_number(left) <= atom_number(right),
        CompareOp::Gt => atom_number(left) > atom_number(right),
        CompareOp::Ge => atom_number(left) >= atom_number(right),
    }
}

/// A node of a node-set compared against a non-node value becomes an atom of
/// the other side's type
fn node_atom<N: PathNavigator>(node: &N, other: &Atom) -> ProbeResult<Atom> {
    let text = node.string_value()?;
    Ok(match other {
        Atom::Num(_) => Atom::Num(string_to_number(&text)),
        _ => Atom::Str(text),
    })
}

fn compare<N: PathNavigator>(op: CompareOp, left: &Value<N>, right: &Value<N>) -> ProbeResult<bool> {
    match (left, right) {
        (Value::Nodes(l), Value::Nodes(r)) => {
            let right_strings = r
                .iter()
                .map(|n| n.string_value().map(Atom::Str))
                .collect::<ProbeResult<Vec<_>>>()?;
            for node in l {
                let atom = Atom::Str(node.string_value()?);
                if right_strings.iter().any(|r| compare_atoms(op, &atom, r)) {
                    return Ok(true);
                }
            }
            Ok(false)
        }
        (Value::Nodes(nodes), Value::Boolean(b)) => {
            Ok(compare_atoms(op, &Atom::Bool(!nodes.is_empty()), &Atom::Bool(*b)))
        }
        (Value::Boolean(b), Value::Nodes(nodes)) => {
            Ok(compare_atoms(op, &Atom::Bool(*b), &Atom::Bool(!nodes.is_empty())))
        }
        (Value::Nodes(nodes), other) => {
            let other = atom_of(other)?;
            for node in nodes {
                if compare_atoms(op, &node_atom(node, &other)?, &other) {
                    return Ok(true);
                }
            }
            Ok(false)
        }
        (other, Value::Nodes(nodes)) => {
            let other = atom_of(other)?;
            for node in nodes {
                if compare_atoms(op, &other, &node_atom(node, &other)?) {
                    return Ok(true);
                }
            }
            Ok(false)
        }
        _ => Ok(compare_atoms(op, &atom_of(left)?, &atom_of(right)?)),
    }
}

// =============================================================================
// Functions
// =============================================================================

fn string_arg<N: PathNavigator>(args: &[Expr], index: usize, ctx: &Context<'_, N>) -> ProbeResult<String> {
    match args.get(index) {
        Some(arg) => to_string(&eval(arg, ctx)?),
        None => ctx.node.string_value(),
    }
}

fn call<N: PathNavigator>(function: Function, args: &[Expr], ctx: &Context<'_, N>) -> ProbeResult<Value<N>> {
    Ok(match function {
        Function::Position => Value::Number(ctx.position as f64),
        Function::Last => Value::Number(ctx.size as f64),
        Function::Count => {
            let nodes = match args.first() {
                Some(arg) => expect_nodes(eval(arg, ctx)?, "count()")?,
                None => Vec::new(),
            };
            Value::Number(nodes.len() as f64)
        }
        Function::Name | Function::LocalName => {
            let name = match args.first() {
                Some(arg) => match expect_nodes(eval(arg, ctx)?, "name()")?.first() {
                    Some(node) => node.local_name()?,
                    None => String::new(),
                },
                None => ctx.node.local_name()?,
            };
            Value::String(name)
        }
        Function::String => Value::String(string_arg(args, 0, ctx)?),
        Function::Contains => {
            let haystack = string_arg(args, 0, ctx)?;
            let needle = string_arg(args, 1, ctx)?;
            Value::Boolean(haystack.contains(&needle))
        }
        Function::StartsWith => {
            let haystack = string_arg(args, 0, ctx)?;
            let prefix = string_arg(args, 1, ctx)?;
            Value::Boolean(haystack.starts_with(&prefix))
        }
        Function::NormalizeSpace => {
            let text = string_arg(args, 0, ctx)?;
            Value::String(text.split_whitespace().collect::<Vec<_>>().join(" "))
        }
        Function::Concat => {
            let mut out = String::new();
            for index in 0..args.len() {
                out.push_str(&string_arg(args, index, ctx)?);
            }
            Value::String(out)
        }
        Function::Not => {
            let value = match args.first() {
                Some(arg) => eval(arg, ctx)?,
                None => Value::Boolean(false),
            };
            Value::Boolean(!to_bool(&value))
        }
        Function::True => Value::Boolean(true),
        Function::False => Value::Boolean(false),
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
mod tests {
    use super::*;
    use crate::xpath::parse;
    use std::cell::Cell;
    use std::rc::Rc;

    /// A small in-memory document: element `i` has a name, a parent, children
    /// and `(attribute name, value)` pairs. `moves` counts child and sibling
    /// moves.
    #[derive(Debug)]
    struct Doc {
        names: Vec<&'static str>,
        parents: Vec<Option<usize>>,
        children: Vec<Vec<usize>>,
        attributes: Vec<Vec<(&'static str, &'static str)>>,
        moves: Cell<usize>,
    }

    impl Doc {
        fn new() -> Self {
            Self {
                names: vec!["#root"],
                parents: vec![None],
                children: vec![vec![]],
                attributes: vec![vec![]],
                moves: Cell::new(0),
            }
        }

        fn add(&mut self, parent: usize, name: &'static str, attrs: &[(&'static str, &'static str)]) -> usize {
            let id = self.names.len();
            self.names.push(name);
            self.parents.push(Some(parent));
            self.children.push(vec![]);
            self.attributes.push(attrs.to_vec());
            self.children[parent].push(id);
            id
        }
    }

    #[derive(Debug, Clone)]
    struct DocNav {
        doc: Rc<Doc>,
        element: usize,
        attribute: Option<usize>,
    }

    impl DocNav {
        fn root(doc: &Rc<Doc>) -> Self {
            Self {
                doc: Rc::clone(doc),
                element: 0,
                attribute: None,
            }
        }

        fn sibling(&self, delta: isize) -> Option<usize> {
            self.doc.moves.set(self.doc.moves.get() + 1);
            let parent = self.doc.parents[self.element]?;
            let siblings = &self.doc.children[parent];
            let index = siblings.iter().position(|c| *c == self.element)?;
            let target = index.checked_add_signed(delta)?;
            siblings.get(target).copied()
        }
    }

    impl PathNavigator for DocNav {
        fn kind(&self) -> NodeKind {
            match (self.element, self.attribute) {
                (_, Some(_)) => NodeKind::Attribute,
                (0, None) => NodeKind::Root,
                _ => NodeKind::Element,
            }
        }

        fn local_name(&self) -> ProbeResult<String> {
            Ok(match self.attribute {
                Some(a) => self.doc.attributes[self.element][a].0.to_string(),
                None => self.doc.names[self.element].to_string(),
            })
        }

        fn string_value(&self) -> ProbeResult<String> {
            Ok(match self.attribute {
                Some(a) => self.doc.attributes[self.element][a].1.to_string(),
                None => String::new(),
            })
        }

        fn is_same_position(&self, other: &Self) -> bool {
            self.element == other.element && self.attribute == other.attribute
        }

        fn move_to_parent(&mut self) -> ProbeResult<bool> {
            if self.attribute.take().is_some() {
                return Ok(true);
            }
            match self.doc.parents[self.element] {
                Some(p) => {
                    self.element = p;
                    Ok(true)
                }
                None => Ok(false),
            }
        }

        fn move_to_first_child(&mut self) -> ProbeResult<bool> {
            if self.attribute.is_some() {
                return Ok(false);
            }
            self.doc.moves.set(self.doc.moves.get() + 1);
            match self.doc.children[self.element].first() {
                Some(c) => {
                    self.element = *c;
                    Ok(true)
                }
                None => Ok(false),
            }
        }

        fn move_to_next(&mut self) -> ProbeResult<bool> {
            if self.attribute.is_some() {
                return Ok(false);
            }
            match self.sibling(1) {
                Some(s) => {
                    self.element = s;
                    Ok(true)
                }
                None => Ok(false),
            }
        }

        fn move_to_previous(&mut self) -> ProbeResult<bool> {
            if self.attribute.is_some() {
                return Ok(false);
            }
            match self.sibling(-1) {
                Some(s) => {
                    self.element = s;
                    Ok(true)
                }
                None => Ok(false),
            }
        }

        fn move_to_first_attribute(&mut self) -> ProbeResult<bool> {
            if self.attribute.is_some() || self.doc.attributes[self.element].is_empty() {
                return Ok(false);
            }
            self.attribute = Some(0);
            Ok(true)
        }

        fn move_to_next_attribute(&mut self) -> ProbeResult<bool> {
            match self.attribute {
                Some(a) if a + 1 < self.doc.attributes[self.element].len() => {
                    self.attribute = Some(a + 1);
                    Ok(true)
                }
                _ => Ok(false),
            }
        }
    }

    /// root
    ///   Window(Name=Main)
    ///     Pane(Name=Toolbar)
    ///       Button(Name=OK, AutomationId=ok)
    ///       Button(Name=Cancel, AutomationId=cancel)
    ///     Pane(Name=Body)
    ///       Text(Name=Label)
    ///       Button(Name=OK, AutomationId=ok2)
    fn sample() -> DocNav {
        let mut doc = Doc::new();
        let window = doc.add(0, "Window", &[("Name", "Main")]);
        let toolbar = doc.add(window, "Pane", &[("Name", "Toolbar")]);
        doc.add(toolbar, "Button", &[("Name", "OK"), ("AutomationId", "ok")]);
        doc.add(toolbar, "Button", &[("Name", "Cancel"), ("AutomationId", "cancel")]);
        let body = doc.add(window, "Pane", &[("Name", "Body")]);
        doc.add(body, "Text", &[("Name", "Label")]);
        doc.add(body, "Button", &[("Name", "OK"), ("AutomationId", "ok2")]);
        DocNav::root(&Rc::new(doc))
    }

    fn run(expr: &str) -> Value<DocNav> {
        evaluate(&parse(expr).unwrap(), &sample()).unwrap()
    }

    fn ids(expr: &str) -> Vec<usize> {
        match run(expr) {
            Value::Nodes(nodes) => nodes.iter().map(|n| n.element).collect(),
            other => panic!("expected nodes, got {}", other.type_name()),
        }
    }

    mod path_tests {
        use super::*;

        #[test]
        fn test_descendant_with_attribute_predicate() {
            assert_eq!(ids("//Button[@Name='OK']"), vec![3, 7]);
        }

        #[test]
        fn test_absolute_child_path() {
            assert_eq!(ids("/Window/Pane"), vec![2, 5]);
            assert_eq!(ids("/Window/Pane/Button"), vec![3, 4, 7]);
        }

        #[test]
        fn test_positional_predicates() {
            assert_eq!(ids("//Button[1]"), vec![3, 7]);
            assert_eq!(ids("(//Button)[1]"), vec![3]);
            assert_eq!(ids("(//Button)[last()]"), vec![7]);
            assert_eq!(ids("//Pane[position() = 2]/*"), vec![6, 7]);
        }

        #[test]
        fn test_parent_and_ancestors() {
            assert_eq!(ids("//Button[@AutomationId='ok2']/.."), vec![5]);
            assert_eq!(ids("//Text/ancestor::*"), vec![1, 5]);
            assert_eq!(ids("//Text/ancestor::*[1]"), vec![5]);
        }

        #[test]
        fn test_sibling_axes() {
            assert_eq!(ids("//Text/following-sibling::Button"), vec![7]);
            assert_eq!(ids("//Button[@Name='Cancel']/preceding-sibling::*"), vec![3]);
        }

        #[test]
        fn test_union_is_deduplicated_and_ordered() {
            assert_eq!(ids("//Text | //Button[@Name='OK'] | //Text"), vec![3, 6, 7]);
        }

        #[test]
        fn test_union_over_long_list_walks_siblings_once() {
            const ITEMS: usize = 200;
            let mut doc = Doc::new();
            let window = doc.add(0, "Window", &[]);
            let list = doc.add(window, "List", &[]);
            for _ in 0..ITEMS {
                doc.add(list, "ListItem", &[]);
            }
            let doc = Rc::new(doc);
            let nav = DocNav::root(&doc);
            let value = evaluate(&parse("//ListItem | //ListItem").unwrap(), &nav).unwrap();
            let Value::Nodes(nodes) = value else { panic!() };
            assert_eq!(nodes.len(), ITEMS);
            assert!(nodes.windows(2).all(|w| w[0].element < w[1].element));
            assert!(doc.moves.get() < 20 * ITEMS, "{} moves", doc.moves.get());
        }

        #[test]
        fn test_attribute_nodes() {
            match run("//Button[@Name='Cancel']/@*") {
                Value::Nodes(nodes) => {
                    assert_eq!(nodes.len(), 2);
                    assert!(nodes.iter().all(|n| n.kind() == NodeKind::Attribute));
                    assert_eq!(nodes[1].string_value().unwrap(), "cancel");
                }
                other => panic!("unexpected {}", other.type_name()),
            }
        }

        #[test]
        fn test_root_only() {
            assert_eq!(ids("/"), vec![0]);
        }

        #[test]
        fn test_relative_from_context() {
            let nav = sample();
            let mut body = nav.clone();
            body.element = 5;
            let value = evaluate(&parse(".//Button").unwrap(), &body).unwrap();
            let Value::Nodes(nodes) = value else { panic!() };
            assert_eq!(nodes.iter().map(|n| n.element).collect::<Vec<_>>(), vec![7]);
        }
    }

    mod function_tests {
        use super::*;

        #[test]
        fn test_count_and_numbers() {
            assert!(matches!(run("count(//Button)"), Value::Number(n) if n == 3.0));
            assert!(matches!(run("count(//Button) > 2"), Value::Boolean(true)));
            assert!(matches!(run("-count(//Pane)"), Value::Number(n) if n == -2.0));
        }

        #[test]
        fn test_string_functions() {
            assert_eq!(ids("//*[starts-with(@Name, 'Can')]"), vec![4]);
            assert_eq!(ids("//*[contains(@AutomationId, 'ok')]"), vec![3, 7]);
            assert!(matches!(
                run("normalize-space('  a   b ')"),
                Value::String(ref s) if s == "a b"
            ));
            assert!(matches!(
                run("concat('a', 'b', 'c')"),
                Value::String(ref s) if s == "abc"
            ));
        }

        #[test]
        fn test_name_and_not() {
            assert!(matches!(run("name(//Text)"), Value::String(ref s) if s == "Text"));
            assert_eq!(ids("//Pane/*[not(@Name='OK')]"), vec![4, 6]);
            assert_eq!(ids("//*[local-name() = 'Text']"), vec![6]);
        }

        #[test]
        fn test_boolean_literals() {
            assert!(matches!(run("true() and not(false())"), Value::Boolean(true)));
        }
    }

    mod comparison_tests {
        use super::*;

        #[test]
        fn test_node_set_inequality_is_existential() {
            // some Button has a Name other than 'OK'
            assert!(matches!(run("//Button/@Name != 'OK'"), Value::Boolean(true)));
            assert!(matches!(run("//Text/@Name != 'Label'"), Value::Boolean(false)));
        }

        #[test]
        fn test_node_sets_against_each_other() {
            assert!(matches!(
                run("//Pane[@Name='Toolbar']/Button/@Name = //Pane[@Name='Body']/Button/@Name"),
                Value::Boolean(true)
            ));
        }

        #[test]
        fn test_number_conversion() {
            assert!(matches!(run("'10' = 10.0"), Value::Boolean(true)));
            assert!(matches!(run("'abc' < 1"), Value::Boolean(false)));
            assert!(matches!(run("string(2)"), Value::String(ref s) if s == "2"));
            assert!(matches!(run("string(0.5)"), Value::String(ref s) if s == "0.5"));
        }

        #[test]
        fn test_empty_node_set_against_boolean() {
            assert!(matches!(run("//Missing = false()"), Value::Boolean(true)));
        }

        #[test]
        fn test_count_needs_node_set() {
            let err = evaluate(&parse("count('x')").unwrap(), &sample()).unwrap_err();
            assert!(matches!(err, ProbeError::InvalidPath { .. }));
        }
    }
}
