//! Relation normalization.
//!
//! Every relation is rewritten to the single form `x <<p y`, "x runs before
//! y, priority p". The mirrored spelling `y p>> x` means the same thing, and a
//! bare `<<` or `>>` carries priority 0.

use geekcms_core::{IdentError, PluginRef};
use serde::{Deserialize, Serialize};

use crate::lexer::LineKind;
use crate::operand;

/// Which side of the operator runs first
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Direction {
    /// `left << right`
    LeftPrecedes,
    /// `left >> right`
    RightPrecedes,
}

/// Error turning a line into a relation
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RelationError {
    /// Operator is none of `<<`, `<<p`, `>>`, `p>>`
    #[error("unrecognized operator `{0}`")]
    UnknownOperator(String),

    /// Priority does not fit in a `u32`
    #[error("priority out of range in `{0}`")]
    PriorityOverflow(String),

    /// Unary operator points at the missing operand
    #[error("operator `{op}` needs an operand on its {side}")]
    MisplacedOperand {
        /// Operator text
        op: String,
        /// Side the operand is missing from
        side: &'static str,
    },

    /// Both operands missing
    #[error("relation has no operands")]
    NoOperands,

    /// Operand is malformed
    #[error(transparent)]
    Operand(#[from] IdentError),

    /// Line is not a relation
    #[error("not a relation")]
    NotARelation,
}

/// One parsed relation line, before normalization
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawRelation {
    /// Left operand, `None` in `>> y`
    pub left: Option<PluginRef>,
    /// Priority digits, `None` when omitted
    pub priority: Option<u32>,
    /// Right operand, `None` in `x <<`
    pub right: Option<PluginRef>,
    /// Operator direction
    pub direction: Direction,
}

/// Parse an operator spelling into its direction and optional priority
///
/// # Errors
///
/// Returns error for any spelling other than `<<`, `<<p`, `>>` and `p>>`
pub fn parse_operator(op: &str) -> Result<(Direction, Option<u32>), RelationError> {
    let (direction, digits) = if let Some(digits) = op.strip_prefix("<<") {
        (Direction::LeftPrecedes, digits)
    } else if let Some(digits) = op.strip_suffix(">>") {
        (Direction::RightPrecedes, digits)
    } else {
        return Err(RelationError::UnknownOperator(op.to_string()));
    };

    if digits.is_empty() {
        return Ok((direction, None));
    }
    if !digits.chars().all(|c| c.is_ascii_digit()) {
        return Err(RelationError::UnknownOperator(op.to_string()));
    }
    digits
        .parse::<u32>()
        .map(|p| (direction, Some(p)))
        .map_err(|_| RelationError::PriorityOverflow(op.to_string()))
}

impl RawRelation {
    /// Build a raw relation from a classified line
    ///
    /// # Errors
    ///
    /// Returns error if the line is not a relation, the operator is unknown,
    /// a unary operator points at its missing side, or an operand is malformed
    pub fn from_line(kind: &LineKind, default_theme: &str) -> Result<Self, RelationError> {
        match kind {
            LineKind::BinaryExpr { left, op, right } => {
                let (direction, priority) = parse_operator(op)?;
                Ok(Self {
                    left: Some(operand::resolve(left, default_theme)?),
                    priority,
                    right: Some(operand::resolve(right, default_theme)?),
                    direction,
                })
            }
            LineKind::UnaryExpr {
                operand,
                op,
                operand_first,
            } => {
                let (direction, priority) = parse_operator(op)?;
                match (direction, operand_first) {
                    (Direction::LeftPrecedes, true) => Ok(Self {
                        left: Some(operand::resolve(operand, default_theme)?),
                        priority,
                        right: None,
                        direction,
                    }),
                    (Direction::RightPrecedes, false) => Ok(Self {
                        left: None,
                        priority,
                        right: Some(operand::resolve(operand, default_theme)?),
                        direction,
                    }),
                    (Direction::LeftPrecedes, false) => Err(RelationError::MisplacedOperand {
                        op: op.clone(),
                        side: "left",
                    }),
                    (Direction::RightPrecedes, true) => Err(RelationError::MisplacedOperand {
                        op: op.clone(),
                        side: "right",
                    }),
                }
            }
            LineKind::BareIdentifier(_) => Err(RelationError::NotARelation),
        }
    }
}

/// Normalized relation: `x` runs before `y`
///
/// Priority orders siblings under the same `x` and is not a global weight.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Relation {
    /// Preceding plugin
    pub x: PluginRef,
    /// Sibling priority, lower runs first
    pub priority: u32,
    /// Following plugin
    pub y: PluginRef,
}

impl Relation {
    /// Create a new relation
    #[must_use]
    pub fn new(x: PluginRef, priority: u32, y: PluginRef) -> Self {
        Self { x, priority, y }
    }

    /// `x <<p` with no successor: x runs before the rest of the component
    #[must_use]
    pub fn is_front_anchor(&self) -> bool {
        self.y == PluginRef::Tail && !self.x.is_sentinel()
    }

    /// `p>> y` with no predecessor: y runs after the rest of the component
    #[must_use]
    pub fn is_back_anchor(&self) -> bool {
        self.x == PluginRef::Head && !self.y.is_sentinel()
    }
}

/// Normalize a raw relation to `x <<p y`
///
/// `y p>> x` becomes `x <<p y`. A missing successor of `x <<p` becomes
/// `TAIL` and a missing predecessor of `p>> y` becomes `HEAD`.
///
/// # Errors
///
/// Returns error if both operands are missing or a unary operator points at
/// its missing side
pub fn normalize(raw: RawRelation) -> Result<Relation, RelationError> {
    let priority = raw.priority.unwrap_or(0);
    match (raw.left, raw.right, raw.direction) {
        (None, None, _) => Err(RelationError::NoOperands),
        (Some(left), Some(right), Direction::LeftPrecedes) => {
            Ok(Relation::new(left, priority, right))
        }
        (Some(left), Some(right), Direction::RightPrecedes) => {
            Ok(Relation::new(right, priority, left))
        }
        (Some(x), None, Direction::LeftPrecedes) => Ok(Relation::new(x, priority, PluginRef::Tail)),
        (None, Some(y), Direction::RightPrecedes) => Ok(Relation::new(PluginRef::Head, priority, y)),
        (None, Some(_), Direction::LeftPrecedes) => Err(RelationError::MisplacedOperand {
            op: "<<".to_string(),
            side: "left",
        }),
        (Some(_), None, Direction::RightPrecedes) => Err(RelationError::MisplacedOperand {
            op: ">>".to_string(),
            side: "right",
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexer::classify;

    fn plugin(name: &str) -> PluginRef {
        PluginRef::new("t", name).unwrap()
    }

    fn normalize_text(text: &str) -> Result<Relation, RelationError> {
        let kind = classify(text).unwrap();
        normalize(RawRelation::from_line(&kind, "t")?)
    }

    #[test]
    fn test_parse_operator() {
        assert_eq!(parse_operator("<<"), Ok((Direction::LeftPrecedes, None)));
        assert_eq!(parse_operator("<<7"), Ok((Direction::LeftPrecedes, Some(7))));
        assert_eq!(parse_operator(">>"), Ok((Direction::RightPrecedes, None)));
        assert_eq!(parse_operator("12>>"), Ok((Direction::RightPrecedes, Some(12))));
    }

    #[test]
    fn test_parse_operator_rejects() {
        for op in ["<<<", "<>", ">><<", "<", ">>1", "1<<"] {
            assert!(
                matches!(parse_operator(op), Err(RelationError::UnknownOperator(_))),
                "{} should be rejected",
                op
            );
        }
        assert!(matches!(
            parse_operator("<<99999999999"),
            Err(RelationError::PriorityOverflow(_))
        ));
    }

    #[test]
    fn test_normalize_left_precedes() {
        assert_eq!(
            normalize_text("a <<3 b"),
            Ok(Relation::new(plugin("a"), 3, plugin("b")))
        );
    }

    #[test]
    fn test_normalize_mirrored() {
        assert_eq!(normalize_text("b >> a"), normalize_text("a << b"));
        assert_eq!(normalize_text("b 2>> a"), normalize_text("a <<2 b"));
    }

    #[test]
    fn test_normalize_default_priority() {
        assert_eq!(normalize_text("a << b").unwrap().priority, 0);
    }

    #[test]
    fn test_normalize_unary() {
        let front = normalize_text("a <<").unwrap();
        assert_eq!(front, Relation::new(plugin("a"), 0, PluginRef::Tail));
        assert!(front.is_front_anchor());

        let back = normalize_text("1>> b").unwrap();
        assert_eq!(back, Relation::new(PluginRef::Head, 1, plugin("b")));
        assert!(back.is_back_anchor());
    }

    #[test]
    fn test_misplaced_unary() {
        assert!(matches!(
            normalize_text("a >>"),
            Err(RelationError::MisplacedOperand { side: "right", .. })
        ));
        assert!(matches!(
            normalize(RawRelation {
                left: None,
                priority: None,
                right: Some(plugin("b")),
                direction: Direction::LeftPrecedes,
            }),
            Err(RelationError::MisplacedOperand { side: "left", .. })
        ));
    }

    #[test]
    fn test_no_operands() {
        let raw = RawRelation {
            left: None,
            priority: Some(1),
            right: None,
            direction: Direction::LeftPrecedes,
        };
        assert_eq!(normalize(raw), Err(RelationError::NoOperands));
    }

    #[test]
    fn test_unknown_operator_from_line() {
        assert_eq!(
            normalize_text("a <> b"),
            Err(RelationError::UnknownOperator("<>".to_string()))
        );
    }

    #[test]
    fn test_bare_is_not_relation() {
        let kind = classify("a").unwrap();
        assert_eq!(
            RawRelation::from_line(&kind, "t"),
            Err(RelationError::NotARelation)
        );
    }
}
