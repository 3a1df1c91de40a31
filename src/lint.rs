//! Diagnostics and quick fixes for DSL text.
//!
//! Text rules work on a token stream, so they also run on input the parser
//! rejects. Semantic rules need a parsed [`Specification`] and are skipped
//! when parsing fails.

use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::debug;
use winnow::ascii::{digit1, till_line_ending};
use winnow::combinator::{alt, opt, repeat};
use winnow::prelude::*;
use winnow::token::{any, none_of, one_of, take_till, take_while};

use crate::parse::{locate, parse};
use crate::types::{
    BoolOp, Condition, FieldLookup, Location, Severity, SpecKind, Specification, ValueType,
};

/// Broad family a lint rule belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LintCategory {
    Syntax,
    Style,
    Semantic,
}

impl fmt::Display for LintCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LintCategory::Syntax => write!(f, "syntax"),
            LintCategory::Style => write!(f, "style"),
            LintCategory::Semantic => write!(f, "semantic"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum LintRule {
    SyntaxError,
    UnbalancedParens,
    LowercaseKeyword,
    TrailingWhitespace,
    DoubleNegation,
    EmptyGroup,
    SingleChildGroup,
    DuplicateCondition,
    LineTooLong,
    /// Needs a field schema.
    UnknownField,
    /// Needs a field schema.
    OperatorNotAllowed,
}

impl LintRule {
    #[must_use]
    pub fn id(self) -> &'static str {
        match self {
            LintRule::SyntaxError => "syntax-error",
            LintRule::UnbalancedParens => "unbalanced-parens",
            LintRule::LowercaseKeyword => "lowercase-keyword",
            LintRule::TrailingWhitespace => "trailing-whitespace",
            LintRule::DoubleNegation => "double-negation",
            LintRule::EmptyGroup => "empty-group",
            LintRule::SingleChildGroup => "single-child-group",
            LintRule::DuplicateCondition => "duplicate-condition",
            LintRule::LineTooLong => "line-too-long",
            LintRule::UnknownField => "unknown-field",
            LintRule::OperatorNotAllowed => "operator-not-allowed",
        }
    }

    #[must_use]
    pub fn category(self) -> LintCategory {
        match self {
            LintRule::SyntaxError | LintRule::UnbalancedParens => LintCategory::Syntax,
            LintRule::LowercaseKeyword
            | LintRule::TrailingWhitespace
            | LintRule::DoubleNegation
            | LintRule::LineTooLong => LintCategory::Style,
            LintRule::EmptyGroup
            | LintRule::SingleChildGroup
            | LintRule::DuplicateCondition
            | LintRule::UnknownField
            | LintRule::OperatorNotAllowed => LintCategory::Semantic,
        }
    }

    #[must_use]
    pub fn severity(self) -> Severity {
        match self {
            LintRule::SyntaxError | LintRule::UnbalancedParens | LintRule::OperatorNotAllowed => {
                Severity::Error
            }
            LintRule::LowercaseKeyword
            | LintRule::DoubleNegation
            | LintRule::EmptyGroup
            | LintRule::DuplicateCondition
            | LintRule::UnknownField => Severity::Warning,
            LintRule::TrailingWhitespace | LintRule::SingleChildGroup | LintRule::LineTooLong => {
                Severity::Info
            }
        }
    }
}

impl fmt::Display for LintRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id())
    }
}

/// Replace the byte range `start..end` of the linted text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TextEdit {
    pub start: usize,
    pub end: usize,
    pub replacement: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Fix {
    pub description: String,
    pub edit: TextEdit,
}

/// A lint finding.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LintDiagnostic {
    pub rule: LintRule,
    pub category: LintCategory,
    pub severity: Severity,
    pub message: String,
    pub location: Location,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fix: Option<Fix>,
}

impl LintDiagnostic {
    fn new(rule: LintRule, location: Location, message: impl Into<String>) -> Self {
        Self {
            rule,
            category: rule.category(),
            severity: rule.severity(),
            message: message.into(),
            location,
            fix: None,
        }
    }

    fn with_fix(mut self, description: impl Into<String>, edit: TextEdit) -> Self {
        self.fix = Some(Fix {
            description: description.into(),
            edit,
        });
        self
    }

    #[must_use]
    pub fn is_error(&self) -> bool {
        self.severity == Severity::Error
    }
}

impl fmt::Display for LintDiagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}:{} [{}] {}: {}",
            self.location.line, self.location.column, self.rule, self.severity, self.message
        )?;
        if let Some(fix) = &self.fix {
            write!(f, " (fix: {})", fix.description)?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct LintConfig {
    /// Lines longer than this many characters are reported.
    pub max_line_length: usize,
    pub disabled: Vec<LintRule>,
}

impl Default for LintConfig {
    fn default() -> Self {
        Self {
            max_line_length: 120,
            disabled: Vec::new(),
        }
    }
}

impl LintConfig {
    #[must_use]
    pub fn with_max_line_length(mut self, max: usize) -> Self {
        self.max_line_length = max;
        self
    }

    #[must_use]
    pub fn disable(mut self, rule: LintRule) -> Self {
        if !self.disabled.contains(&rule) {
            self.disabled.push(rule);
        }
        self
    }

    #[must_use]
    pub fn is_enabled(&self, rule: LintRule) -> bool {
        !self.disabled.contains(&rule)
    }
}

/// Lints DSL text, optionally against a field schema.
pub struct DslLinter {
    config: LintConfig,
    schema: Option<Box<dyn FieldLookup + Send + Sync>>,
}

impl Default for DslLinter {
    fn default() -> Self {
        Self::new(LintConfig::default())
    }
}

impl fmt::Debug for DslLinter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DslLinter")
            .field("config", &self.config)
            .field("schema", &self.schema.is_some())
            .finish()
    }
}

impl DslLinter {
    #[must_use]
    pub fn new(config: LintConfig) -> Self {
        Self {
            config,
            schema: None,
        }
    }

    /// Enable the `unknown-field` and `operator-not-allowed` rules.
    #[must_use]
    pub fn with_schema(mut self, schema: impl FieldLookup + Send + Sync + 'static) -> Self {
        self.schema = Some(Box::new(schema));
        self
    }

    #[must_use]
    pub fn config(&self) -> &LintConfig {
        &self.config
    }

    /// All findings for `text`, ordered by position.
    #[must_use]
    pub fn lint(&self, text: &str) -> Vec<LintDiagnostic> {
        let tokens = tokenize(text);
        let mut out = Vec::new();

        let parsed = match parse(text) {
            Ok(parsed) => parsed,
            Err(e) => {
                out.push(LintDiagnostic::new(
                    LintRule::SyntaxError,
                    e.location(),
                    e.message(),
                ));
                None
            }
        };

        check_parens(text, &tokens, &mut out);
        check_keywords(text, &tokens, &mut out);
        check_lines(text, self.config.max_line_length, &mut out);
        check_groups(text, &tokens, &mut out);
        if let Some(spec) = &parsed {
            let leaves = leaf_offsets(&tokens);
            let mut pass = SemanticPass {
                text,
                leaves: &leaves,
                schema: self.schema.as_deref(),
                next_leaf: 0,
                out: &mut out,
            };
            pass.visit(spec);
        }

        out.retain(|d| self.config.is_enabled(d.rule));
        out.sort_by_key(|d| (d.location.line, d.location.column));
        debug!(findings = out.len(), "dsl linted");
        out
    }
}

/// Apply the fixes attached to `diagnostics`. Fixes that overlap an earlier
/// one are skipped.
#[must_use]
pub fn apply_fixes(text: &str, diagnostics: &[LintDiagnostic]) -> String {
    let mut edits: Vec<&TextEdit> = diagnostics
        .iter()
        .filter_map(|d| d.fix.as_ref().map(|f| &f.edit))
        .filter(|e| e.start <= e.end && e.end <= text.len())
        .collect();
    edits.sort_by_key(|e| (e.start, e.end));

    let mut out = String::with_capacity(text.len());
    let mut cursor = 0;
    for edit in edits {
        if edit.start < cursor
            || !text.is_char_boundary(edit.start)
            || !text.is_char_boundary(edit.end)
        {
            continue;
        }
        out.push_str(&text[cursor..edit.start]);
        out.push_str(&edit.replacement);
        cursor = edit.end;
    }
    out.push_str(&text[cursor..]);
    out
}

// -- Tokens -----------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TokenKind {
    Word,
    FieldRef,
    Str,
    Number,
    Compare,
    Open,
    Close,
    Comma,
    Comment,
    Other,
}

#[derive(Debug, Clone, Copy)]
struct Token<'a> {
    kind: TokenKind,
    text: &'a str,
    start: usize,
}

impl Token<'_> {
    fn end(&self) -> usize {
        self.start + self.text.len()
    }

    fn keyword(&self) -> Option<BoolOp> {
        (self.kind == TokenKind::Word)
            .then(|| BoolOp::from_keyword(self.text))
            .flatten()
    }

    /// A comparison operator, symbolic or word.
    fn is_compare(&self) -> bool {
        self.kind == TokenKind::Compare
            || (self.kind == TokenKind::Word
                && matches!(self.text, "contains" | "startsWith" | "endsWith"))
    }
}

fn is_ident_start(c: char) -> bool {
    c.is_ascii_alphabetic() || c == '_'
}

fn is_ident_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_' || c == '.'
}

fn token_kind(input: &mut &str) -> ModalResult<TokenKind> {
    alt((
        ('#', till_line_ending).value(TokenKind::Comment),
        ("${", take_till(0.., '}'), opt('}')).value(TokenKind::FieldRef),
        (
            '"',
            repeat::<_, _, (), _, _>(
                0..,
                alt((('\\', any).void(), none_of(['"', '\\']).void())),
            ),
            opt('"'),
        )
            .value(TokenKind::Str),
        (opt('-'), digit1, opt(('.', digit1))).value(TokenKind::Number),
        (one_of(is_ident_start), take_while(0.., is_ident_char)).value(TokenKind::Word),
        alt((">=", "<=", "==", "!=", ">", "<")).value(TokenKind::Compare),
        '('.value(TokenKind::Open),
        ')'.value(TokenKind::Close),
        ','.value(TokenKind::Comma),
        any.value(TokenKind::Other),
    ))
    .parse_next(input)
}

/// Significant tokens of `text`; whitespace and comments are dropped.
fn tokenize(text: &str) -> Vec<Token<'_>> {
    let mut tokens = Vec::new();
    let mut rest = text.trim_start();
    while !rest.is_empty() {
        let start = text.len() - rest.len();
        let Ok(kind) = token_kind(&mut rest) else {
            break;
        };
        let end = text.len() - rest.len();
        if kind != TokenKind::Comment {
            tokens.push(Token {
                kind,
                text: &text[start..end],
                start,
            });
        }
        rest = rest.trim_start();
    }
    tokens
}

/// Byte offsets of `field op operand` leaves in source order.
fn leaf_offsets(tokens: &[Token<'_>]) -> Vec<usize> {
    let mut offsets = Vec::new();
    let mut i = 0;
    while i + 1 < tokens.len() {
        let head = &tokens[i];
        let is_field = matches!(head.kind, TokenKind::FieldRef | TokenKind::Word);
        if is_field && tokens[i + 1].is_compare() {
            offsets.push(head.start);
            i += 3;
        } else {
            i += 1;
        }
    }
    offsets
}

// -- Text rules -------------------------------------------------------------

fn check_parens(text: &str, tokens: &[Token<'_>], out: &mut Vec<LintDiagnostic>) {
    let mut open = Vec::new();
    for token in tokens {
        match token.kind {
            TokenKind::Open => open.push(token.start),
            TokenKind::Close => {
                if open.pop().is_none() {
                    out.push(LintDiagnostic::new(
                        LintRule::UnbalancedParens,
                        locate(text, token.start),
                        "')' has no matching '('",
                    ));
                }
            }
            _ => {}
        }
    }
    if let Some(&first) = open.first() {
        let missing = open.len();
        out.push(
            LintDiagnostic::new(
                LintRule::UnbalancedParens,
                locate(text, first),
                format!("{missing} unclosed '('"),
            )
            .with_fix(
                format!("append {missing} ')'"),
                TextEdit {
                    start: text.len(),
                    end: text.len(),
                    replacement: ")".repeat(missing),
                },
            ),
        );
    }
}

fn check_keywords(text: &str, tokens: &[Token<'_>], out: &mut Vec<LintDiagnostic>) {
    for (i, token) in tokens.iter().enumerate() {
        let Some(op) = token.keyword() else {
            continue;
        };
        let next = tokens.get(i + 1);
        // `or == 1` and `and(...)` use the word as a field or function name.
        if next.is_some_and(|n| {
            n.is_compare() || (n.kind == TokenKind::Open && n.start == token.end())
        }) {
            continue;
        }

        if token.text != op.keyword() {
            out.push(
                LintDiagnostic::new(
                    LintRule::LowercaseKeyword,
                    locate(text, token.start),
                    format!("keyword '{}' should be written '{}'", token.text, op.keyword()),
                )
                .with_fix(
                    format!("replace with '{}'", op.keyword()),
                    TextEdit {
                        start: token.start,
                        end: token.end(),
                        replacement: op.keyword().to_owned(),
                    },
                ),
            );
        }

        let prev_not = i > 0 && tokens[i - 1].keyword() == Some(BoolOp::Not);
        if op == BoolOp::Not && !prev_not && next.and_then(Token::keyword) == Some(BoolOp::Not) {
            let end = tokens.get(i + 2).map_or(text.len(), |t| t.start);
            out.push(
                LintDiagnostic::new(
                    LintRule::DoubleNegation,
                    locate(text, token.start),
                    "double negation cancels out",
                )
                .with_fix(
                    "remove both NOT",
                    TextEdit {
                        start: token.start,
                        end,
                        replacement: String::new(),
                    },
                ),
            );
        }
    }
}

fn check_lines(text: &str, max_len: usize, out: &mut Vec<LintDiagnostic>) {
    let mut offset = 0;
    for (index, raw) in text.split_inclusive('\n').enumerate() {
        let line = raw.trim_end_matches(['\n', '\r']);
        let line_no = index + 1;

        let trimmed = line.trim_end_matches([' ', '\t']);
        if trimmed.len() < line.len() {
            let column = trimmed.chars().count() + 1;
            out.push(
                LintDiagnostic::new(
                    LintRule::TrailingWhitespace,
                    Location {
                        line: line_no,
                        column,
                    },
                    "trailing whitespace",
                )
                .with_fix(
                    "remove trailing whitespace",
                    TextEdit {
                        start: offset + trimmed.len(),
                        end: offset + line.len(),
                        replacement: String::new(),
                    },
                ),
            );
        }

        let width = line.chars().count();
        if width > max_len {
            out.push(LintDiagnostic::new(
                LintRule::LineTooLong,
                Location {
                    line: line_no,
                    column: max_len + 1,
                },
                format!("line is {width} characters long, limit is {max_len}"),
            ));
        }
        offset += raw.len();
    }
}

/// `(OP)` and `(OP x)` prefix groups.
fn check_groups(text: &str, tokens: &[Token<'_>], out: &mut Vec<LintDiagnostic>) {
    for (i, token) in tokens.iter().enumerate() {
        if token.kind != TokenKind::Open {
            continue;
        }
        let Some(op) = tokens.get(i + 1).and_then(Token::keyword) else {
            continue;
        };
        let mut depth = 0usize;
        let mut commas = 0;
        let mut members = 0;
        for inner in &tokens[i + 2..] {
            match inner.kind {
                TokenKind::Close if depth == 0 => break,
                TokenKind::Close => depth -= 1,
                TokenKind::Open => depth += 1,
                TokenKind::Comma if depth == 0 => commas += 1,
                _ => {}
            }
            members += 1;
        }

        if members == 0 {
            out.push(LintDiagnostic::new(
                LintRule::EmptyGroup,
                locate(text, token.start),
                format!("{op} group has no conditions"),
            ));
        } else if commas == 0 && op != BoolOp::Not && is_prefix_group(&tokens[i + 2..]) {
            out.push(LintDiagnostic::new(
                LintRule::SingleChildGroup,
                locate(text, token.start),
                format!("{op} group has a single condition"),
            ));
        }
    }
}

/// A group body is in prefix form unless another top-level keyword follows
/// its first operand, as in `(NOT a == 1 AND b == 2)`.
fn is_prefix_group(body: &[Token<'_>]) -> bool {
    let mut depth = 0usize;
    for token in body {
        match token.kind {
            TokenKind::Close if depth == 0 => return true,
            TokenKind::Close => depth -= 1,
            TokenKind::Open => depth += 1,
            _ if depth == 0 && token.keyword().is_some() => return false,
            _ => {}
        }
    }
    true
}

// -- Semantic rules ---------------------------------------------------------

struct SemanticPass<'a> {
    text: &'a str,
    leaves: &'a [usize],
    schema: Option<&'a (dyn FieldLookup + Send + Sync)>,
    next_leaf: usize,
    out: &'a mut Vec<LintDiagnostic>,
}

impl SemanticPass<'_> {
    fn leaf_location(&self, index: usize) -> Location {
        self.leaves
            .get(index)
            .map_or(Location { line: 1, column: 1 }, |&offset| {
                locate(self.text, offset)
            })
    }

    fn visit(&mut self, spec: &Specification) {
        if let SpecKind::Field(condition) = &spec.kind {
            let index = self.next_leaf;
            self.next_leaf += 1;
            self.check_schema(condition, index);
            return;
        }

        let composite = matches!(spec.kind, SpecKind::Composite { .. });
        let mut seen: Vec<&Condition> = Vec::new();
        for child in spec.children() {
            if let SpecKind::Field(condition) = &child.kind {
                if composite && seen.contains(&condition) {
                    self.out.push(LintDiagnostic::new(
                        LintRule::DuplicateCondition,
                        self.leaf_location(self.next_leaf),
                        format!(
                            "condition on '{}' repeats an earlier one in the same group",
                            condition.field
                        ),
                    ));
                }
                seen.push(condition);
            }
            self.visit(child);
        }
    }

    fn check_schema(&mut self, condition: &Condition, index: usize) {
        let Some(schema) = self.schema else {
            return;
        };
        let location = self.leaf_location(index);

        match schema.lookup(&condition.field) {
            None => self.out.push(LintDiagnostic::new(
                LintRule::UnknownField,
                location,
                format!("unknown field '{}'", condition.field),
            )),
            Some(info) if !info.allows(condition.operator) => {
                self.out.push(LintDiagnostic::new(
                    LintRule::OperatorNotAllowed,
                    location,
                    format!(
                        "operator '{}' is not allowed on field '{}'",
                        condition.operator, condition.field
                    ),
                ));
            }
            Some(_) => {}
        }

        if condition.value_type == ValueType::FieldReference {
            if let Some(other) = condition.value.as_str() {
                if schema.lookup(other).is_none() {
                    self.out.push(LintDiagnostic::new(
                        LintRule::UnknownField,
                        location,
                        format!("unknown field '{other}'"),
                    ));
                }
            }
        }
    }
}
