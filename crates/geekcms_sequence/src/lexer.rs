//! Line-oriented lexer for the plugin relation DSL.
//!
//! ```text
//! runtime_component ::= component_name (':' | '=') [plugin_relation] NEWLINE
//!                       (plugin_relation NEWLINE)*
//! plugin_relation   ::= binary | unary | plugin_name
//! binary            ::= plugin_name ('<<' [int] | [int] '>>') plugin_name
//! unary             ::= plugin_name '<<' [int] | [int] '>>' plugin_name
//! ```
//!
//! Source text is split into component blocks by their header lines. Lines of
//! a block are classified lazily, one at a time, when the block is sequenced.

use geekcms_core::{is_identifier, SequenceError, SequenceResult};
use indexmap::IndexMap;
use once_cell::sync::Lazy;
use regex::Regex;

// Operand characters exclude whitespace, operator and header punctuation.
// Operands may not start with a digit, so `12>> x` and `x <<1` stay unary.
static HEADER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(?P<name>[^\s:=<>]+)\s*[:=](?P<rest>.*)$").expect("header regex is valid")
});

static BINARY: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"^(?P<left>[^\s<>:=\d][^\s<>:=]*)\s*(?P<op><<\s*\d*|\d*\s*>>|[<>\d]*[<>][<>\d]*)\s*(?P<right>[^\s<>:=\d][^\s<>:=]*)$",
    )
    .expect("binary regex is valid")
});

static UNARY_LEFT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(?P<operand>[^\s<>:=\d][^\s<>:=]*)\s*(?P<op><<\s*\d*|[<>\d]*[<>][<>\d]*)$")
        .expect("unary regex is valid")
});

static UNARY_RIGHT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(?P<op>\d*\s*>>|[<>\d]*[<>][<>\d]*)\s*(?P<operand>[^\s<>:=\d][^\s<>:=]*)$")
        .expect("unary regex is valid")
});

static BARE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[^\s<>:=]+$").expect("bare identifier regex is valid"));

/// One physical line of a component block
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceLine {
    /// 1-based line number within the block, the header being line 1
    pub number: usize,
    /// Line content with surrounding whitespace removed
    pub text: String,
}

/// Classified content of a line
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LineKind {
    /// `left op right`
    BinaryExpr {
        /// Left operand text
        left: String,
        /// Operator text, whitespace removed
        op: String,
        /// Right operand text
        right: String,
    },
    /// `operand op` or `op operand`
    UnaryExpr {
        /// Operand text
        operand: String,
        /// Operator text, whitespace removed
        op: String,
        /// Whether the operand is written before the operator
        operand_first: bool,
    },
    /// A plugin mentioned with no relation
    BareIdentifier(String),
}

/// Classify a relation line (headers are split off by [`lex`])
///
/// Returns `None` when the line has none of the recognized shapes.
#[must_use]
pub fn classify(text: &str) -> Option<LineKind> {
    let text = text.trim();
    if let Some(caps) = BINARY.captures(text) {
        return Some(LineKind::BinaryExpr {
            left: caps["left"].to_string(),
            op: squash(&caps["op"]),
            right: caps["right"].to_string(),
        });
    }
    if let Some(caps) = UNARY_LEFT.captures(text) {
        return Some(LineKind::UnaryExpr {
            operand: caps["operand"].to_string(),
            op: squash(&caps["op"]),
            operand_first: true,
        });
    }
    if let Some(caps) = UNARY_RIGHT.captures(text) {
        return Some(LineKind::UnaryExpr {
            operand: caps["operand"].to_string(),
            op: squash(&caps["op"]),
            operand_first: false,
        });
    }
    if BARE.is_match(text) {
        return Some(LineKind::BareIdentifier(text.to_string()));
    }
    None
}

fn squash(op: &str) -> String {
    op.chars().filter(|c| !c.is_whitespace()).collect()
}

/// All lines of one component, possibly gathered from several headers
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ComponentBlock {
    /// Component name
    pub name: String,
    /// Relation lines in source order
    pub lines: Vec<SourceLine>,
    /// Set when the header itself is malformed; the block cannot be sequenced
    pub header_error: Option<SequenceError>,
}

impl ComponentBlock {
    /// Create an empty block
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            lines: Vec::new(),
            header_error: None,
        }
    }

    /// Classify the block's lines lazily
    ///
    /// Each item pairs the source line with its classification, or is a
    /// syntax error naming the line.
    pub fn tokens(&self) -> impl Iterator<Item = SequenceResult<(&SourceLine, LineKind)>> + '_ {
        self.lines.iter().map(move |line| match classify(&line.text) {
            Some(kind) => Ok((line, kind)),
            None => Err(SequenceError::Syntax {
                component: self.name.clone(),
                line: line.number,
                text: line.text.clone(),
                reason: "unrecognized relation expression".to_string(),
            }),
        })
    }

    /// Check if the block has no relation lines
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }
}

/// Split source text into component blocks
///
/// Blocks come out in order of first header appearance. Headers repeating a
/// component name extend the existing block. A header whose name is not an
/// identifier still opens a block, carrying the error in `header_error`.
///
/// # Errors
///
/// Returns error if a non-blank line appears before the first header
pub fn lex(source: &str) -> SequenceResult<Vec<ComponentBlock>> {
    let mut blocks: IndexMap<String, ComponentBlock> = IndexMap::new();
    let mut current: Option<String> = None;
    let mut number = 0;

    for raw in source.lines() {
        let text = raw.trim();
        number += 1;

        if let Some(caps) = HEADER.captures(text) {
            let name = caps["name"].to_string();
            number = 1;
            let block = blocks
                .entry(name.clone())
                .or_insert_with(|| ComponentBlock::new(name.clone()));
            if !is_identifier(&name) && block.header_error.is_none() {
                tracing::warn!(component = %name, "malformed component header");
                block.header_error = Some(SequenceError::Syntax {
                    component: name.clone(),
                    line: 1,
                    text: text.to_string(),
                    reason: "component name is not an identifier".to_string(),
                });
            }
            let rest = caps["rest"].trim();
            if !rest.is_empty() {
                block.lines.push(SourceLine {
                    number,
                    text: rest.to_string(),
                });
            }
            current = Some(name);
            continue;
        }

        if text.is_empty() {
            continue;
        }

        match current.as_ref().and_then(|name| blocks.get_mut(name)) {
            Some(block) => block.lines.push(SourceLine {
                number,
                text: text.to_string(),
            }),
            None => {
                return Err(SequenceError::Syntax {
                    component: String::new(),
                    line: number,
                    text: text.to_string(),
                    reason: "relation outside of any component".to_string(),
                })
            }
        }
    }

    tracing::debug!(components = blocks.len(), "lexed relation source");
    Ok(blocks.into_values().collect())
}
