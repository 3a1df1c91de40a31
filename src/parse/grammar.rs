use std::collections::BTreeMap;

use winnow::ascii::{digit1, till_line_ending, Caseless};
use winnow::combinator::{alt, cut_err, not, opt, peek, preceded, repeat, separated, terminated};
use winnow::error::{AddContext, ContextError, ErrMode, ModalResult, StrContext, StrContextValue};
use winnow::prelude::*;
use winnow::stream::Stateful;
use winnow::token::{any, literal, one_of, take_while};

use crate::types::{
    Argument, BoolOp, CardinalityKind, CompareOp, Condition, ConditionalKind, LengthBound,
    OptionalKind, SpecKind, Specification, Value, ValueType, MAX_NESTING_DEPTH,
};

/// Recursion budget of the grammar. Exported text spends at most two levels
/// (a parenthesis and a `NOT`) per tree level.
const MAX_PARSE_DEPTH: usize = 2 * MAX_NESTING_DEPTH;

/// Parser input: the remaining text plus the current nesting depth.
pub(crate) type Input<'i> = Stateful<&'i str, usize>;

pub(crate) fn input(text: &str) -> Input<'_> {
    Stateful {
        input: text,
        state: 0,
    }
}

fn expected(what: &'static str) -> StrContext {
    StrContext::Expected(StrContextValue::Description(what))
}

// -- Whitespace & comments --------------------------------------------------

fn ws(input: &mut Input<'_>) -> ModalResult<()> {
    let _: () = repeat(
        0..,
        alt((
            take_while(1.., |c: char| c.is_ascii_whitespace()).void(),
            ('#', till_line_ending).void(),
        )),
    )
    .parse_next(input)?;
    Ok(())
}

// -- Identifiers & keywords -------------------------------------------------

fn is_ident_start(c: char) -> bool {
    c.is_ascii_alphabetic() || c == '_'
}

fn is_ident_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_' || c == '.'
}

/// Whether `name` can be written as a bare DSL identifier.
pub(crate) fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    chars.next().is_some_and(is_ident_start) && chars.all(is_ident_char)
}

fn ident<'i>(input: &mut Input<'i>) -> ModalResult<&'i str> {
    (take_while(1, is_ident_start), take_while(0.., is_ident_char))
        .take()
        .parse_next(input)
}

/// Case-insensitive keyword that must not run into an identifier.
fn keyword<'i>(kw: &'static str) -> impl Parser<Input<'i>, &'i str, ErrMode<ContextError>> {
    terminated(literal(Caseless(kw)), not(one_of(is_ident_char)))
}

/// Case-sensitive word with the same boundary rule.
fn word<'i>(w: &'static str) -> impl Parser<Input<'i>, &'i str, ErrMode<ContextError>> {
    terminated(literal(w), not(one_of(is_ident_char)))
}

fn bool_op(input: &mut Input<'_>) -> ModalResult<BoolOp> {
    alt((
        keyword("AND").value(BoolOp::And),
        keyword("OR").value(BoolOp::Or),
        keyword("NOT").value(BoolOp::Not),
        keyword("XOR").value(BoolOp::Xor),
        keyword("IMPLIES").value(BoolOp::Implies),
    ))
    .parse_next(input)
}

/// `${name}`; the braces must hold a bare identifier with no padding.
fn field_token(input: &mut Input<'_>) -> ModalResult<String> {
    "${".parse_next(input)?;
    let name = cut_err(ident)
        .context(expected("field name"))
        .parse_next(input)?;
    cut_err('}')
        .context(StrContext::Expected(StrContextValue::CharLiteral('}')))
        .parse_next(input)?;
    Ok(name.to_owned())
}

/// A field position: bare identifier or `${name}`.
fn field_name(input: &mut Input<'_>) -> ModalResult<String> {
    alt((field_token, ident.map(str::to_owned)))
        .context(expected("field name"))
        .parse_next(input)
}

// -- Values -----------------------------------------------------------------

fn string_literal(input: &mut Input<'_>) -> ModalResult<String> {
    '"'.parse_next(input)?;
    let mut s = String::new();
    loop {
        let ch = cut_err(any)
            .context(expected("closing quote"))
            .parse_next(input)?;
        match ch {
            '"' => return Ok(s),
            '\\' => {
                let esc = cut_err(any)
                    .context(expected("escape character"))
                    .parse_next(input)?;
                match esc {
                    '"' => s.push('"'),
                    '\\' => s.push('\\'),
                    'n' => s.push('\n'),
                    't' => s.push('\t'),
                    other => {
                        s.push('\\');
                        s.push(other);
                    }
                }
            }
            c => s.push(c),
        }
    }
}

fn number(input: &mut Input<'_>) -> ModalResult<Value> {
    let text = (opt('-'), digit1, opt(('.', digit1)))
        .take()
        .parse_next(input)?;
    let parsed = if text.contains('.') {
        text.parse::<f64>().map(Value::Float).ok()
    } else {
        text.parse::<i64>().map(Value::Int).ok()
    };
    parsed.ok_or_else(|| ErrMode::from_input(&*input).cut())
}

fn unsigned<T>(input: &mut Input<'_>) -> ModalResult<T>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    digit1
        .try_map(str::parse::<T>)
        .context(expected("non-negative integer"))
        .parse_next(input)
}

fn literal_value(input: &mut Input<'_>) -> ModalResult<Value> {
    alt((
        string_literal.map(Value::String),
        word("true").value(Value::Bool(true)),
        word("false").value(Value::Bool(false)),
        word("null").value(Value::Null),
        number,
    ))
    .context(expected("literal value"))
    .parse_next(input)
}

/// Right-hand side of a leaf: a literal or a `${field}` reference.
fn operand(input: &mut Input<'_>) -> ModalResult<(Value, ValueType)> {
    alt((
        field_token.map(|name| (Value::String(name), ValueType::FieldReference)),
        literal_value.map(|v| (v, ValueType::Literal)),
    ))
    .context(expected("value"))
    .parse_next(input)
}

// -- Comparison operators ---------------------------------------------------

fn compare_op(input: &mut Input<'_>) -> ModalResult<CompareOp> {
    alt((
        ">=".value(CompareOp::GreaterThanOrEqual),
        ">".value(CompareOp::GreaterThan),
        "<=".value(CompareOp::LessThanOrEqual),
        "<".value(CompareOp::LessThan),
        "==".value(CompareOp::Equals),
        "!=".value(CompareOp::NotEquals),
        word("contains").value(CompareOp::Contains),
        word("startsWith").value(CompareOp::StartsWith),
        word("endsWith").value(CompareOp::EndsWith),
    ))
    .parse_next(input)
}

fn leaf_rest(field: String, input: &mut Input<'_>) -> ModalResult<Specification> {
    ws.parse_next(input)?;
    let operator = cut_err(compare_op)
        .context(expected("comparison operator"))
        .parse_next(input)?;
    ws.parse_next(input)?;
    let (value, value_type) = cut_err(operand).parse_next(input)?;
    Ok(Specification::leaf(Condition {
        field,
        operator,
        value,
        value_type,
    }))
}

// -- Calls ------------------------------------------------------------------

fn comma(input: &mut Input<'_>) -> ModalResult<()> {
    cut_err((ws, ','))
        .context(StrContext::Expected(StrContextValue::CharLiteral(',')))
        .void()
        .parse_next(input)
}

fn close_paren(input: &mut Input<'_>) -> ModalResult<()> {
    cut_err((ws, ')'))
        .context(StrContext::Expected(StrContextValue::CharLiteral(')')))
        .void()
        .parse_next(input)
}

/// One call argument: leading trivia, then a committed parse.
fn arg<'i, T>(
    input: &mut Input<'i>,
    parser: impl Parser<Input<'i>, T, ErrMode<ContextError>>,
) -> ModalResult<T> {
    ws.parse_next(input)?;
    cut_err(parser).parse_next(input)
}

fn boxed_expr(input: &mut Input<'_>) -> ModalResult<Box<Specification>> {
    arg(input, expr).map(Box::new)
}

fn expr_list(input: &mut Input<'_>) -> ModalResult<Vec<Specification>> {
    ws.parse_next(input)?;
    cut_err('[')
        .context(StrContext::Expected(StrContextValue::CharLiteral('[')))
        .parse_next(input)?;
    let specs: Vec<Specification> = separated(0.., expr, (ws, ',')).parse_next(input)?;
    cut_err((ws, ']'))
        .context(StrContext::Expected(StrContextValue::CharLiteral(']')))
        .parse_next(input)?;
    Ok(specs)
}

fn template_param(input: &mut Input<'_>) -> ModalResult<(String, Value)> {
    let name = arg(input, ident.context(expected("parameter name")))?;
    ws.parse_next(input)?;
    cut_err('=')
        .context(StrContext::Expected(StrContextValue::CharLiteral('=')))
        .parse_next(input)?;
    let value = arg(input, literal_value)?;
    Ok((name.to_owned(), value))
}

fn function_arg(input: &mut Input<'_>) -> ModalResult<Argument> {
    alt((
        literal_value.map(|v| Argument {
            value: v,
            kind: ValueType::Literal,
        }),
        field_name.map(Argument::field),
    ))
    .context(expected("argument"))
    .parse_next(input)
}

fn conditional_call(
    conditional: ConditionalKind,
    input: &mut Input<'_>,
) -> ModalResult<SpecKind> {
    let target_field = arg(input, field_name)?;
    comma(input)?;
    let condition = boxed_expr(input)?;
    Ok(SpecKind::Conditional {
        conditional,
        target_field,
        condition,
    })
}

fn length_call(bound: LengthBound, input: &mut Input<'_>) -> ModalResult<SpecKind> {
    let array_field = arg(input, field_name)?;
    comma(input)?;
    let length = arg(input, unsigned::<u64>)?;
    Ok(SpecKind::Length {
        bound,
        array_field,
        length,
    })
}

fn optional_call(guard: OptionalKind, input: &mut Input<'_>) -> ModalResult<SpecKind> {
    let field = arg(input, field_name)?;
    comma(input)?;
    let spec = boxed_expr(input)?;
    Ok(SpecKind::Optional { guard, field, spec })
}

fn cardinality_call(
    cardinality: CardinalityKind,
    input: &mut Input<'_>,
) -> ModalResult<SpecKind> {
    let count = arg(input, unsigned::<u32>)?;
    comma(input)?;
    let specs = expr_list(input)?;
    Ok(SpecKind::Cardinality {
        cardinality,
        count,
        specs,
    })
}

/// Body of `name(...)` after the opening parenthesis. Reserved names map to
/// their structural shapes; anything else is a plain function call.
fn call_body(name: &str, input: &mut Input<'_>) -> ModalResult<Specification> {
    let kind = match name {
        "requiredIf" => conditional_call(ConditionalKind::RequiredIf, input)?,
        "visibleIf" => conditional_call(ConditionalKind::VisibleIf, input)?,
        "disabledIf" => conditional_call(ConditionalKind::DisabledIf, input)?,
        "readonlyIf" => conditional_call(ConditionalKind::ReadonlyIf, input)?,
        "forEach" => {
            let array_field = arg(input, field_name)?;
            comma(input)?;
            let item = boxed_expr(input)?;
            SpecKind::ForEach { array_field, item }
        }
        "uniqueBy" => {
            let array_field = arg(input, field_name)?;
            comma(input)?;
            let key = arg(input, string_literal.context(expected("key string")))?;
            SpecKind::UniqueBy { array_field, key }
        }
        "minLength" => length_call(LengthBound::Min, input)?,
        "maxLength" => length_call(LengthBound::Max, input)?,
        "ifDefined" => optional_call(OptionalKind::IfDefined, input)?,
        "ifNotNull" => optional_call(OptionalKind::IfNotNull, input)?,
        "ifExists" => optional_call(OptionalKind::IfExists, input)?,
        "withDefault" => {
            let field = arg(input, field_name)?;
            comma(input)?;
            let default = arg(input, literal_value)?;
            comma(input)?;
            let spec = boxed_expr(input)?;
            SpecKind::WithDefault {
                field,
                default,
                spec,
            }
        }
        "atLeast" => cardinality_call(CardinalityKind::AtLeast, input)?,
        "exactly" => cardinality_call(CardinalityKind::Exactly, input)?,
        "contextual" => {
            let template = arg(input, string_literal.context(expected("template string")))?;
            SpecKind::Contextual { template }
        }
        "template" => {
            let template_id = arg(input, string_literal.context(expected("template id")))?;
            let pairs: Vec<(String, Value)> =
                repeat(0.., preceded((ws, ','), template_param)).parse_next(input)?;
            SpecKind::Template {
                template_id,
                params: pairs.into_iter().collect::<BTreeMap<_, _>>(),
            }
        }
        "expression" => {
            let expression = arg(input, string_literal.context(expected("expression string")))?;
            SpecKind::Expression { expression }
        }
        "custom" => {
            let name = arg(input, string_literal.context(expected("custom kind")))?;
            comma(input)?;
            let payload = arg(
                input,
                string_literal
                    .try_map(|raw| serde_json::from_str::<serde_json::Value>(&raw))
                    .context(expected("JSON payload string")),
            )?;
            SpecKind::Custom { name, payload }
        }
        _ => {
            ws.parse_next(input)?;
            let args: Vec<Argument> =
                separated(0.., preceded(ws, function_arg), (ws, ',')).parse_next(input)?;
            SpecKind::Function {
                name: name.to_owned(),
                args,
            }
        }
    };
    close_paren(input)?;
    Ok(Specification::new(kind))
}

// -- Primaries --------------------------------------------------------------

/// `(OP)`, `(OP c)` or `(OP c1, c2, ...)`. A `NOT` with a single operand is
/// read with ordinary expression precedence.
fn prefix_group(input: &mut Input<'_>) -> ModalResult<Specification> {
    ws.parse_next(input)?;
    let operator = bool_op.parse_next(input)?;
    ws.parse_next(input)?;
    if opt(peek(')')).parse_next(input)?.is_some() {
        return Ok(Specification::composite(operator, Vec::new()));
    }
    let first = if operator == BoolOp::Not {
        match negated(input)? {
            Negated::Expression(spec) => return Ok(spec),
            Negated::GroupMember(spec) => spec,
        }
    } else {
        expr(input)?
    };
    let rest: Vec<Specification> = repeat(0.., preceded((ws, ','), expr)).parse_next(input)?;
    let mut specs = vec![first];
    specs.extend(rest);
    Ok(Specification::composite(operator, specs))
}

enum Negated {
    /// `(NOT a AND b)`: the `NOT` binds to `a`.
    Expression(Specification),
    /// `(NOT a AND b, c)`: the first member of a `NOT` group.
    GroupMember(Specification),
}

/// Whatever follows `(NOT`, parsed once. A following comma makes it the first
/// member of a group; otherwise the `NOT` is applied to the leftmost operand.
fn negated(input: &mut Input<'_>) -> ModalResult<Negated> {
    nested(input, |input| {
        let operand = nested(input, unary)?;
        let (spec, levels) = expr_from(operand, input)?;
        if opt(peek((ws, ','))).parse_next(input)?.is_some() {
            Ok(Negated::GroupMember(spec))
        } else {
            Ok(Negated::Expression(negate_leftmost(spec, levels)))
        }
    })
}

/// Wrap the operand `levels` composites down the leftmost path in a `NOT`.
fn negate_leftmost(mut spec: Specification, levels: usize) -> Specification {
    if levels == 0 {
        return Specification::not(vec![spec]);
    }
    if let SpecKind::Composite { specs, .. } = &mut spec.kind {
        if let Some(first) = specs.first_mut() {
            let operand = std::mem::replace(first, Specification::and(Vec::new()));
            *first = negate_leftmost(operand, levels - 1);
        }
    }
    spec
}

fn parenthesized(input: &mut Input<'_>) -> ModalResult<Specification> {
    '('.parse_next(input)?;
    let inner = match opt(prefix_group).parse_next(input)? {
        Some(group) => group,
        None => cut_err(expr).parse_next(input)?,
    };
    close_paren(input)?;
    Ok(inner)
}

fn field_token_leaf(input: &mut Input<'_>) -> ModalResult<Specification> {
    let field = field_token.parse_next(input)?;
    leaf_rest(field, input)
}

fn ident_led(input: &mut Input<'_>) -> ModalResult<Specification> {
    let name = ident.parse_next(input)?;
    let checkpoint = input.checkpoint();
    ws.parse_next(input)?;
    if opt('(').parse_next(input)?.is_some() {
        call_body(name, input)
    } else {
        input.reset(&checkpoint);
        leaf_rest(name.to_owned(), input)
    }
}

fn primary(input: &mut Input<'_>) -> ModalResult<Specification> {
    ws.parse_next(input)?;
    alt((parenthesized, field_token_leaf, ident_led))
        .context(expected("expression"))
        .parse_next(input)
}

// -- Expressions (precedence: IMPLIES < OR < XOR < AND < NOT < primary) ----

/// Run `parser` one nesting level down, failing once the input nests deeper
/// than [`MAX_PARSE_DEPTH`].
fn nested<'i, O>(
    input: &mut Input<'i>,
    parser: impl FnOnce(&mut Input<'i>) -> ModalResult<O>,
) -> ModalResult<O> {
    if input.state >= MAX_PARSE_DEPTH {
        let start = input.checkpoint();
        let error = ContextError::new()
            .add_context(&*input, &start, StrContext::Label("nesting depth"))
            .add_context(&*input, &start, expected("shallower nesting"));
        return Err(ErrMode::Cut(error));
    }
    input.state += 1;
    let result = parser(input);
    input.state -= 1;
    result
}

fn unary(input: &mut Input<'_>) -> ModalResult<Specification> {
    ws.parse_next(input)?;
    if opt(keyword("NOT")).parse_next(input)?.is_some() {
        let inner = nested(input, |input| cut_err(unary).parse_next(input))?;
        Ok(Specification::not(vec![inner]))
    } else {
        primary(input)
    }
}

/// `next (OP next)*`, collected into one n-ary composite.
fn chain(
    input: &mut Input<'_>,
    op: BoolOp,
    mut next: impl FnMut(&mut Input<'_>) -> ModalResult<Specification>,
) -> ModalResult<Specification> {
    let first = next(input)?;
    chain_from(first, input, op, next).map(|(spec, _)| spec)
}

/// The `(OP next)*` tail of a chain whose first operand is already parsed.
/// Also reports whether a composite was built around `first`.
fn chain_from(
    first: Specification,
    input: &mut Input<'_>,
    op: BoolOp,
    mut next: impl FnMut(&mut Input<'_>) -> ModalResult<Specification>,
) -> ModalResult<(Specification, bool)> {
    let mut specs = vec![first];
    loop {
        let checkpoint = input.checkpoint();
        ws.parse_next(input)?;
        if opt(keyword(op.keyword())).parse_next(input)?.is_none() {
            input.reset(&checkpoint);
            break;
        }
        specs.push(next(input).map_err(ErrMode::cut)?);
    }
    if specs.len() == 1 {
        Ok((specs.remove(0), false))
    } else {
        Ok((Specification::composite(op, specs), true))
    }
}

type Level = fn(&mut Input<'_>) -> ModalResult<Specification>;

/// The rest of an expression whose leftmost unary operand is already parsed,
/// with the number of composites built above that operand.
fn expr_from(first: Specification, input: &mut Input<'_>) -> ModalResult<(Specification, usize)> {
    let levels: [(BoolOp, Level); 4] = [
        (BoolOp::And, unary),
        (BoolOp::Xor, and_expr),
        (BoolOp::Or, xor_expr),
        (BoolOp::Implies, or_expr),
    ];
    let mut spec = first;
    let mut wrapped = 0;
    for (op, next) in levels {
        let (built, grew) = chain_from(spec, input, op, next)?;
        spec = built;
        wrapped += usize::from(grew);
    }
    Ok((spec, wrapped))
}

fn and_expr(input: &mut Input<'_>) -> ModalResult<Specification> {
    chain(input, BoolOp::And, unary)
}

fn xor_expr(input: &mut Input<'_>) -> ModalResult<Specification> {
    chain(input, BoolOp::Xor, and_expr)
}

fn or_expr(input: &mut Input<'_>) -> ModalResult<Specification> {
    chain(input, BoolOp::Or, xor_expr)
}

fn implies_expr(input: &mut Input<'_>) -> ModalResult<Specification> {
    chain(input, BoolOp::Implies, or_expr)
}

fn expr(input: &mut Input<'_>) -> ModalResult<Specification> {
    nested(input, |input| {
        ws.parse_next(input)?;
        implies_expr(input)
    })
}

// -- Top-level parser -------------------------------------------------------

/// A whole document: one expression surrounded by trivia, or nothing.
pub fn dsl(input: &mut Input<'_>) -> ModalResult<Option<Specification>> {
    ws.parse_next(input)?;
    if input.is_empty() {
        return Ok(None);
    }
    let spec = expr(input)?;
    ws.parse_next(input)?;
    Ok(Some(spec))
}
