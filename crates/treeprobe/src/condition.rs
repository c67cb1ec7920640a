//! Composite property predicates.
//!
//! Conditions are immutable trees. Appending a term wraps the whole previous
//! tree as the left operand, so a condition built from `a, b, c` is
//! `(a op b) op c`. Subtrees are shared through `Rc` and never mutated.

use crate::result::{ProbeError, ProbeResult};
use crate::tree::{PropertyId, PropertyValue};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::rc::Rc;
use std::str::FromStr;

/// How a term joins the condition built so far
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum JoinOp {
    /// First term only
    #[default]
    None,
    /// Both must hold
    And,
    /// Either may hold
    Or,
}

impl fmt::Display for JoinOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            Self::None => "none",
            Self::And => "and",
            Self::Or => "or",
        };
        f.write_str(text)
    }
}

impl FromStr for JoinOp {
    type Err = ProbeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "" | "none" => Ok(Self::None),
            "and" => Ok(Self::And),
            "or" => Ok(Self::Or),
            other => Err(ProbeError::InvalidCondition {
                message: format!("unknown join operator '{other}'"),
            }),
        }
    }
}

/// One `(property, value, join)` entry of a property strategy
#[derive(Debug, Clone, PartialEq)]
pub struct ConditionTerm {
    /// Property to compare
    pub property: PropertyId,
    /// Expected value
    pub value: PropertyValue,
    /// Join with the terms before it
    pub join: JoinOp,
}

impl ConditionTerm {
    /// Create a term
    #[must_use]
    pub fn new(property: PropertyId, value: impl Into<PropertyValue>, join: JoinOp) -> Self {
        Self {
            property,
            value: value.into(),
            join,
        }
    }
}

/// A predicate over node properties
#[derive(Debug, Clone, PartialEq)]
pub enum Condition {
    /// Matches every node
    True,
    /// Exact equality of one property
    PropertyEquals {
        /// Property to read
        property: PropertyId,
        /// Expected value
        value: PropertyValue,
    },
    /// Conjunction
    And(Rc<Condition>, Rc<Condition>),
    /// Disjunction
    Or(Rc<Condition>, Rc<Condition>),
}

impl Condition {
    /// A single equality leaf
    #[must_use]
    pub fn leaf(property: PropertyId, value: impl Into<PropertyValue>) -> Self {
        Self::PropertyEquals {
            property,
            value: value.into(),
        }
    }

    /// Wrap `existing` as the left operand of `op(existing, leaf)`
    pub fn append(
        existing: Self,
        property: PropertyId,
        value: impl Into<PropertyValue>,
        op: JoinOp,
    ) -> ProbeResult<Self> {
        let leaf = Rc::new(Self::leaf(property, value));
        match op {
            JoinOp::And => Ok(Self::And(Rc::new(existing), leaf)),
            JoinOp::Or => Ok(Self::Or(Rc::new(existing), leaf)),
            JoinOp::None => Err(ProbeError::InvalidCondition {
                message: format!("term '{leaf}' has no join operator"),
            }),
        }
    }

    /// Build a left-deep condition from terms in encounter order.
    ///
    /// The join of the first term is ignored; every later term must carry
    /// `And` or `Or`.
    pub fn from_terms(terms: &[ConditionTerm]) -> ProbeResult<Self> {
        let (first, rest) = terms.split_first().ok_or_else(|| ProbeError::InvalidCondition {
            message: "a condition needs at least one term".to_string(),
        })?;
        let mut condition = Self::leaf(first.property.clone(), first.value.clone());
        for term in rest {
            condition = Self::append(condition, term.property.clone(), term.value.clone(), term.join)?;
        }
        Ok(condition)
    }

    /// Evaluate against a node whose properties are read through `read`.
    ///
    /// `read` returns `Ok(None)` for properties the node does not expose;
    /// such leaves do not match.
    pub fn evaluate<F>(&self, read: &mut F) -> ProbeResult<bool>
    where
        F: FnMut(&PropertyId) -> ProbeResult<Option<PropertyValue>>,
    {
        match self {
            Self::True => Ok(true),
            Self::PropertyEquals { property, value } => {
                Ok(read(property)?.is_some_and(|actual| actual == *value))
            }
            Self::And(left, right) => Ok(left.evaluate(read)? && right.evaluate(read)?),
            Self::Or(left, right) => Ok(left.evaluate(read)? || right.evaluate(read)?),
        }
    }

    /// Number of equality leaves
    #[must_use]
    pub fn leaf_count(&self) -> usize {
        match self {
            Self::True => 0,
            Self::PropertyEquals { .. } => 1,
            Self::And(l, r) | Self::Or(l, r) => l.leaf_count() + r.leaf_count(),
        }
    }

    fn fmt_operand(operand: &Self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match operand {
            Self::And(..) | Self::Or(..) => write!(f, "({operand})"),
            _ => write!(f, "{operand}"),
        }
    }
}

impl fmt::Display for Condition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::True => f.write_str("true"),
            Self::PropertyEquals { property, value } => write!(f, "{property}: {value}"),
            Self::And(left, right) | Self::Or(left, right) => {
                let op = if matches!(self, Self::And(..)) { "and" } else { "or" };
                // the previous tree is always wrapped, the newest leaf never is
                write!(f, "({left}) {op} ")?;
                Self::fmt_operand(right, f)
            }
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::tree::ControlType;
    use proptest::prelude::*;

    fn term(property: PropertyId, value: &str, join: JoinOp) -> ConditionTerm {
        ConditionTerm::new(property, value, join)
    }

    mod build_tests {
        use super::*;

        #[test]
        fn test_single_leaf() {
            let c = Condition::from_terms(&[term(PropertyId::Name, "OK", JoinOp::None)]).unwrap();
            assert_eq!(c, Condition::leaf(PropertyId::Name, "OK"));
            assert_eq!(c.to_string(), "Name: OK");
        }

        #[test]
        fn test_left_deep_rendering() {
            let c = Condition::from_terms(&[
                term(PropertyId::Name, "OK", JoinOp::None),
                ConditionTerm::new(PropertyId::ControlType, ControlType::Button, JoinOp::And),
                term(PropertyId::Name, "Cancel", JoinOp::Or),
            ])
            .unwrap();
            assert_eq!(
                c.to_string(),
                "((Name: OK) and ControlType: ControlType.Button) or Name: Cancel"
            );
            assert_eq!(c.leaf_count(), 3);
        }

        #[test]
        fn test_missing_join_fails_fast() {
            let err = Condition::from_terms(&[
                term(PropertyId::Name, "OK", JoinOp::None),
                term(PropertyId::Name, "Cancel", JoinOp::None),
            ])
            .unwrap_err();
            assert!(matches!(err, ProbeError::InvalidCondition { .. }));
        }

        #[test]
        fn test_empty_terms_fail() {
            assert!(Condition::from_terms(&[]).is_err());
        }

        #[test]
        fn test_first_join_is_ignored() {
            let c = Condition::from_terms(&[term(PropertyId::Name, "OK", JoinOp::Or)]).unwrap();
            assert_eq!(c.to_string(), "Name: OK");
        }

        #[test]
        fn test_append_shares_previous_tree() {
            let base = Condition::leaf(PropertyId::Name, "OK");
            let c = Condition::append(base.clone(), PropertyId::AutomationId, "ok", JoinOp::And)
                .unwrap();
            match c {
                Condition::And(left, _) => assert_eq!(*left, base),
                other => panic!("unexpected {other:?}"),
            }
        }
    }

    mod join_tests {
        use super::*;

        #[test]
        fn test_parse() {
            assert_eq!("AND".parse::<JoinOp>().unwrap(), JoinOp::And);
            assert_eq!(" or ".parse::<JoinOp>().unwrap(), JoinOp::Or);
            assert_eq!("".parse::<JoinOp>().unwrap(), JoinOp::None);
            assert!("xor".parse::<JoinOp>().is_err());
        }
    }

    mod evaluate_tests {
        use super::*;

        fn reader(
            name: &'static str,
        ) -> impl FnMut(&PropertyId) -> ProbeResult<Option<PropertyValue>> {
            move |id| {
                Ok(match id {
                    PropertyId::Name => Some(PropertyValue::from(name)),
                    PropertyId::ControlType => Some(ControlType::Button.into()),
                    _ => None,
                })
            }
        }

        #[test]
        fn test_and_or() {
            let c = Condition::from_terms(&[
                term(PropertyId::Name, "OK", JoinOp::None),
                ConditionTerm::new(PropertyId::ControlType, ControlType::Button, JoinOp::And),
            ])
            .unwrap();
            assert!(c.evaluate(&mut reader("OK")).unwrap());
            assert!(!c.evaluate(&mut reader("Cancel")).unwrap());

            let c = Condition::append(c, PropertyId::Name, "Cancel", JoinOp::Or).unwrap();
            assert!(c.evaluate(&mut reader("Cancel")).unwrap());
        }

        #[test]
        fn test_unsupported_property_does_not_match() {
            let c = Condition::leaf(PropertyId::ClassName, "Popup");
            assert!(!c.evaluate(&mut reader("OK")).unwrap());
            assert!(Condition::True.evaluate(&mut reader("OK")).unwrap());
        }

        #[test]
        fn test_exact_typed_equality() {
            let c = Condition::leaf(PropertyId::Name, 1);
            let mut read = |_: &PropertyId| Ok(Some(PropertyValue::from("1")));
            assert!(!c.evaluate(&mut read).unwrap());
        }
    }

    mod property_based_tests {
        use super::*;

        fn reference_render(terms: &[(String, JoinOp)]) -> String {
            let mut out = format!("Name: {}", terms[0].0);
            for (value, join) in &terms[1..] {
                out = format!("({out}) {join} Name: {value}");
            }
            out
        }

        proptest! {
            #[test]
            fn prop_rendering_matches_left_deep_reference(
                first in "[a-z]{1,6}",
                rest in prop::collection::vec(
                    ("[a-z]{1,6}", prop_oneof![Just(JoinOp::And), Just(JoinOp::Or)]),
                    0..8,
                ),
            ) {
                let mut pairs = vec![(first, JoinOp::None)];
                pairs.extend(rest);
                let terms: Vec<ConditionTerm> = pairs
                    .iter()
                    .map(|(v, j)| ConditionTerm::new(PropertyId::Name, v.as_str(), *j))
                    .collect();
                let condition = Condition::from_terms(&terms).unwrap();
                prop_assert_eq!(condition.to_string(), reference_render(&pairs));
                prop_assert_eq!(condition.leaf_count(), pairs.len());
            }
        }
    }
}
