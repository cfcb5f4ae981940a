//! Boolean guard expressions for conditional template blocks.
//!
//! Identifiers test properties (any non-zero value is true) and combine
//! with `&&`, `||`, `!` and parentheses. There is no operator precedence:
//! operands fold left to right and each operator switches the fold mode
//! for everything after it, so `a || b && c` reads as `(a OR b) AND c`.
//! Parenthesize to group.

use crate::errors::SyntaxError;
use crate::properties::PropertyStore;
use crate::subview::SubStringRef;

#[derive(Debug, Default)]
struct Expression {
    result: bool,
    negated: bool,
    value: String,
    children: Vec<Expression>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ExprKind {
    OperatorAnd,
    OperatorOr,
    Object,
    Var,
}

fn kind_of(exp: &Expression) -> ExprKind {
    if exp.value == "&&" {
        ExprKind::OperatorAnd
    } else if exp.value == "||" {
        ExprKind::OperatorOr
    } else if !exp.children.is_empty() {
        ExprKind::Object
    } else {
        ExprKind::Var
    }
}

/// Evaluates a standalone guard expression against a property store.
pub fn evaluate(expression: &str, properties: &PropertyStore) -> std::result::Result<bool, SyntaxError> {
    run(expression, properties).map_err(|message| SyntaxError::new(1, message))
}

/// Evaluates the parenthesized guard the view starts inside.
///
/// The view must be positioned just past the opening `(` of a directive
/// such as `@property(`. On success (and on tokenizer errors past the
/// closing paren) the view is advanced past the matching `)`; when no
/// closing paren exists the view is left untouched.
pub(crate) fn evaluate_guard(
    view: &mut SubStringRef<'_>,
    properties: &PropertyStore,
) -> std::result::Result<bool, SyntaxError> {
    let Some(exp_end) = find_closing_paren(view) else {
        return Err(SyntaxError::new(
            view.line_number(),
            "opening parenthesis without matching closure",
        ));
    };

    let inner = SubStringRef::with_end(view.original(), view.start(), view.start() + exp_end);
    let text = inner.as_str();

    // Line numbers are O(position) to compute; capture the pre-advance
    // position and count only on the error branch, or every guard on the
    // success path pays the scan and a pass goes quadratic.
    let (buffer, guard_start) = (view.original(), view.start());
    *view = SubStringRef::new(view.original(), view.start() + exp_end + 1);

    run(text, properties).map_err(|message| {
        SyntaxError::new(SubStringRef::new(buffer, guard_start).line_number(), message)
    })
}

/// Relative index of the `)` closing the region the view starts inside.
///
/// The scan begins at nesting depth zero (the caller has already consumed
/// the opening paren) and stops at the first `)` that takes the depth
/// negative. A close paren sitting on the very last byte of the buffer is
/// reported as unclosed.
pub(crate) fn find_closing_paren(view: &SubStringRef<'_>) -> Option<usize> {
    let bytes = view.as_str().as_bytes();
    let mut nesting = 0i32;
    let mut i = 0;
    while i < bytes.len() && nesting >= 0 {
        match bytes[i] {
            b'(' => nesting += 1,
            b')' => nesting -= 1,
            _ => {}
        }
        i += 1;
    }

    (i < bytes.len() && nesting < 0).then(|| i - 1)
}

fn run(text: &str, properties: &PropertyStore) -> std::result::Result<bool, String> {
    let root = tokenize(text)?;
    let mut wrapped = [root];
    fold(&mut wrapped, properties)
}

fn tokenize(text: &str) -> std::result::Result<Expression, String> {
    let mut stack = vec![Expression::default()];
    let mut text_started = false;
    let mut next_negates = false;

    for c in text.chars() {
        match c {
            '(' => {
                stack.push(Expression {
                    negated: next_negates,
                    ..Expression::default()
                });
                text_started = false;
                next_negates = false;
            }
            ')' => {
                match stack.pop() {
                    Some(group) if !stack.is_empty() => {
                        let top = stack.len() - 1;
                        stack[top].children.push(group);
                    }
                    _ => return Err("unbalanced closing parenthesis".to_string()),
                }
                text_started = false;
            }
            ' ' | '\t' | '\n' | '\r' => text_started = false,
            '!' => next_negates = true,
            _ => {
                let top = stack.len() - 1;
                let current = &mut stack[top];

                if !text_started {
                    text_started = true;
                    current.children.push(Expression {
                        negated: next_negates,
                        ..Expression::default()
                    });
                }

                if c == '&' || c == '|' {
                    if next_negates {
                        return Err(format!("'!' cannot negate operator '{c}'"));
                    }
                    // An operator glued to the tail of an identifier starts
                    // its own token.
                    let split = current
                        .children
                        .last()
                        .is_some_and(|last| !last.value.is_empty() && !last.value.ends_with(c));
                    if split {
                        current.children.push(Expression::default());
                    }
                }

                if let Some(token) = current.children.last_mut() {
                    token.value.push(c);
                }
                next_negates = false;
            }
        }
    }

    match stack.pop() {
        Some(root) if stack.is_empty() => Ok(root),
        _ => Err("opening parenthesis without matching closure".to_string()),
    }
}

fn fold(tokens: &mut [Expression], properties: &PropertyStore) -> std::result::Result<bool, String> {
    // Validation: operators and operands must alternate, starting with an
    // operand. A trailing operator is tolerated.
    let mut last_was_operator = true;
    for exp in tokens.iter_mut() {
        match kind_of(exp) {
            ExprKind::OperatorAnd | ExprKind::OperatorOr => {
                if last_was_operator {
                    return Err(format!("unrecognized token '{}'", exp.value));
                }
                last_was_operator = true;
            }
            ExprKind::Var => {
                if !last_was_operator {
                    return Err(format!("unrecognized token '{}'", exp.value));
                }
                exp.result = properties.get_property(exp.value.as_str()) != 0;
                last_was_operator = false;
            }
            ExprKind::Object => {
                if !last_was_operator {
                    return Err("unrecognized token '('".to_string());
                }
                exp.result = fold(&mut exp.children, properties)?;
                last_was_operator = false;
            }
        }
    }

    let mut ret = true;
    let mut and_mode = true;
    for exp in tokens.iter() {
        match kind_of(exp) {
            ExprKind::OperatorOr => and_mode = false,
            ExprKind::OperatorAnd => and_mode = true,
            ExprKind::Object | ExprKind::Var => {
                let value = if exp.negated { !exp.result } else { exp.result };
                if and_mode {
                    ret &= value;
                } else {
                    ret |= value;
                }
            }
        }
    }
    Ok(ret)
}
