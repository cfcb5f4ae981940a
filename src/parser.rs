//! Template parser: turns an annotated shader template into plain source.
//!
//! Directives all start with `@` and are consumed by a fixed sequence of
//! passes, each taking the previous pass's output buffer:
//!
//! 1. `@pset`/`@padd`/`@psub`/`@pmul`/`@pdiv`/`@pmod` - property math
//! 2. `@foreach(var, start, count) .. @end` - block repetition
//! 3. `@property(expr) .. @end` - conditional blocks (repeated until no
//!    directive remains, since kept bodies may contain nested guards)
//! 4. `@piece(name) .. @end` - named snippet collection
//! 5. `@insertpiece(name)` - snippet expansion (repeated, pieces nest)
//! 6. `@counter`/`@value`/`@set`/`@add`/`@sub`/`@mul`/`@div`/`@mod` -
//!    emitting counters and late property math
//!
//! Rendering is best-effort: a malformed directive is logged, recorded on
//! the [`RenderOutput`], and scanning continues with the next directive.
//! Error line numbers refer to the intermediate buffer the failing pass
//! was reading, not the original template.
//!
//! Templates are expected to end with a newline: a directive whose `)` is
//! the buffer's very last byte reads as unterminated, and block passes
//! swallow one byte of plain text after each `@end`.

use rustc_hash::FxHashMap;

use crate::errors::SyntaxError;
use crate::expression::{evaluate_guard, find_closing_paren};
use crate::properties::{PropertyKey, PropertyStore};
use crate::subview::SubStringRef;

/// Upper bound on the `@property` / `@insertpiece` expansion loops.
/// Deeper nesting than this is treated as a runaway template.
const MAX_EXPANSION_PASSES: usize = 64;

/// Working-buffer ceiling for the same loops. A piece that inserts itself
/// more than once grows geometrically per pass and would exhaust memory
/// long before the pass cap triggers.
const MAX_EXPANSION_BYTES: usize = 16 << 20;

const MATH_OP_NAMES: [&str; 6] = ["pset", "padd", "psub", "pmul", "pdiv", "pmod"];
const COUNTER_OP_NAMES: [&str; 8] = [
    "counter", "value", "set", "add", "sub", "mul", "div", "mod",
];
const BLOCK_NAMES: [&str; 3] = ["foreach", "property", "piece"];

#[derive(Debug, Clone, Copy)]
enum BinaryOp {
    Set,
    Add,
    Sub,
    Mul,
    Div,
    Mod,
}

const ARITH_OPS: [BinaryOp; 6] = [
    BinaryOp::Set,
    BinaryOp::Add,
    BinaryOp::Sub,
    BinaryOp::Mul,
    BinaryOp::Div,
    BinaryOp::Mod,
];

impl BinaryOp {
    /// Wrapping arithmetic; `None` on division or modulo by zero.
    fn apply(self, a: i32, b: i32) -> Option<i32> {
        match self {
            Self::Set => Some(b),
            Self::Add => Some(a.wrapping_add(b)),
            Self::Sub => Some(a.wrapping_sub(b)),
            Self::Mul => Some(a.wrapping_mul(b)),
            Self::Div => (b != 0).then(|| a.wrapping_div(b)),
            Self::Mod => (b != 0).then(|| a.wrapping_rem(b)),
        }
    }
}

/// The rendered shader source plus every syntax error hit along the way.
#[derive(Debug, Default)]
pub struct RenderOutput {
    pub source: String,
    pub errors: Vec<SyntaxError>,
}

impl RenderOutput {
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.errors.is_empty()
    }
}

/// One-shot parser over a mutable property store.
///
/// The store is shared across every pass and piece file of a single
/// render, so math directives in a piece file are visible to guards in
/// the main template.
pub struct TemplateParser<'a> {
    properties: &'a mut PropertyStore,
    pieces: FxHashMap<PropertyKey, String>,
    errors: Vec<SyntaxError>,
}

impl<'a> TemplateParser<'a> {
    pub fn new(properties: &'a mut PropertyStore) -> Self {
        Self {
            properties,
            pieces: FxHashMap::default(),
            errors: Vec::new(),
        }
    }

    /// Errors recorded so far, in scan order.
    #[must_use]
    pub fn errors(&self) -> &[SyntaxError] {
        &self.errors
    }

    /// Runs the whole pipeline over `template`.
    ///
    /// Piece files contribute only their `@piece` definitions and property
    /// side effects; their remaining text is discarded.
    #[must_use]
    pub fn render<S: AsRef<str>>(mut self, template: &str, piece_templates: &[S]) -> RenderOutput {
        for piece in piece_templates {
            let buffer = self.parse_math(piece.as_ref());
            let buffer = self.parse_foreach(&buffer);
            let buffer = self.parse_properties(&buffer);
            let _ = self.collect_pieces(&buffer);
        }

        let buffer = self.parse_math(template);
        let buffer = self.parse_foreach(&buffer);
        let buffer = self.parse_properties(&buffer);
        let buffer = self.collect_pieces(&buffer);
        let buffer = self.insert_pieces(&buffer);
        let source = self.parse_counter(&buffer);

        RenderOutput {
            source,
            errors: self.errors,
        }
    }

    /// Executes `@pset` and friends, erasing them from the output.
    #[must_use]
    pub fn parse_math(&mut self, input: &str) -> String {
        let mut out = String::with_capacity(input.len());
        let mut view = SubStringRef::new(input, 0);

        while let Some((pos, idx)) = find_any_operation(&view, &MATH_OP_NAMES) {
            out.push_str(&view.as_str()[..pos]);
            view.set_start(view.start() + pos + MATH_OP_NAMES[idx].len() + 2);

            match evaluate_param_args(&mut view) {
                Ok(args) if (2..=3).contains(&args.len()) => {
                    self.apply_arith(ARITH_OPS[idx], MATH_OP_NAMES[idx], &args);
                }
                Ok(_) => self.record(SyntaxError::new(
                    view.line_number(),
                    format!("@{} expects two or three parameters", MATH_OP_NAMES[idx]),
                )),
                Err(e) => self.record(e),
            }
        }

        out.push_str(view.as_str());
        out
    }

    /// Expands `@foreach(var, start, count)` blocks.
    ///
    /// `start` and `count` may be integer literals or property names; the
    /// body is emitted `count` times with every `@var` occurrence replaced
    /// by the current iteration number.
    #[must_use]
    pub fn parse_foreach(&mut self, input: &str) -> String {
        let mut out = String::with_capacity(input.len());
        let mut view = SubStringRef::new(input, 0);

        while let Some(pos) = view.find("@foreach", 0) {
            out.push_str(&view.as_str()[..pos]);
            view.set_start(view.start() + pos + "@foreach(".len());

            let args = evaluate_param_args(&mut view);
            let mut block = view;
            let block_end = find_block_end(&mut block);

            match (args, &block_end) {
                (Ok(args), Ok(())) if args.len() == 3 => {
                    let counter_var = args[0].as_str();
                    let start = self.resolve_index(&args[1]);
                    let count = self.resolve_index(&args[2]);
                    for i in 0..count {
                        repeat(&mut out, &block, start + i, counter_var);
                    }
                }
                (Ok(_), Ok(())) => self.record(SyntaxError::new(
                    view.line_number(),
                    "@foreach expects three parameters",
                )),
                (args, _) => {
                    if let Err(e) = args {
                        self.record(e);
                    }
                }
            }
            if let Err(e) = block_end {
                self.record(e);
            }

            // One extra byte past "@end" is swallowed.
            view.set_start(block.end() + "@end".len() + 1);
        }

        out.push_str(view.as_str());
        out
    }

    /// Resolves `@property(expr) .. @end` guards, repeating until kept
    /// bodies no longer contain nested guards.
    #[must_use]
    pub fn parse_properties(&mut self, input: &str) -> String {
        let mut current = self.parse_properties_once(input);

        let mut passes = 1;
        while current.contains("@property") {
            if passes >= MAX_EXPANSION_PASSES || current.len() >= MAX_EXPANSION_BYTES {
                let pos = current.find("@property").unwrap_or(0);
                self.record(SyntaxError::new(
                    SubStringRef::new(&current, pos).line_number(),
                    "runaway @property nesting, expansion limit reached",
                ));
                break;
            }
            current = self.parse_properties_once(&current);
            passes += 1;
        }

        current
    }

    fn parse_properties_once(&mut self, input: &str) -> String {
        let mut out = String::with_capacity(input.len());
        let mut view = SubStringRef::new(input, 0);

        while let Some(pos) = view.find("@property", 0) {
            out.push_str(&view.as_str()[..pos]);
            view.set_start(view.start() + pos + "@property(".len());

            let result = evaluate_guard(&mut view, self.properties);
            let mut block = view;
            let block_end = find_block_end(&mut block);

            match (result, &block_end) {
                (Ok(true), Ok(())) => out.push_str(block.as_str()),
                (Ok(_), _) => {}
                (Err(e), _) => self.record(e),
            }
            if let Err(e) = block_end {
                self.record(e);
            }

            view.set_start(block.end() + "@end".len());
        }

        out.push_str(view.as_str());
        out
    }

    /// Collects `@piece(name) .. @end` definitions, erasing them from the
    /// output buffer. Redefining a name is an error; the first body wins.
    #[must_use]
    pub fn collect_pieces(&mut self, input: &str) -> String {
        let mut out = String::with_capacity(input.len());
        let mut view = SubStringRef::new(input, 0);

        while let Some(pos) = view.find("@piece", 0) {
            out.push_str(&view.as_str()[..pos]);
            view.set_start(view.start() + pos + "@piece(".len());

            let args = evaluate_param_args(&mut view);
            let mut block = view;
            let block_end = find_block_end(&mut block);

            match (args, &block_end) {
                (Ok(args), Ok(())) if args.len() == 1 => {
                    let key = PropertyKey::new(&args[0]);
                    if self.pieces.contains_key(&key) {
                        self.record(SyntaxError::new(
                            view.line_number(),
                            format!("@piece '{}' already defined", args[0]),
                        ));
                    } else {
                        self.pieces.insert(key, block.as_str().to_string());
                    }
                }
                (Ok(_), Ok(())) => self.record(SyntaxError::new(
                    view.line_number(),
                    "@piece expects one parameter",
                )),
                (args, _) => {
                    if let Err(e) = args {
                        self.record(e);
                    }
                }
            }
            if let Err(e) = block_end {
                self.record(e);
            }

            view.set_start(block.end() + "@end".len() + 1);
        }

        out.push_str(view.as_str());
        out
    }

    /// Expands `@insertpiece(name)`, repeating while inserted bodies
    /// contain further insertions. An unknown piece name is logged but is
    /// not a syntax error.
    #[must_use]
    pub fn insert_pieces(&mut self, input: &str) -> String {
        let mut current = self.insert_pieces_once(input);

        let mut passes = 1;
        while current.contains("@insertpiece") {
            if passes >= MAX_EXPANSION_PASSES || current.len() >= MAX_EXPANSION_BYTES {
                let pos = current.find("@insertpiece").unwrap_or(0);
                self.record(SyntaxError::new(
                    SubStringRef::new(&current, pos).line_number(),
                    "runaway @insertpiece nesting, expansion limit reached",
                ));
                break;
            }
            current = self.insert_pieces_once(&current);
            passes += 1;
        }

        current
    }

    fn insert_pieces_once(&mut self, input: &str) -> String {
        let mut out = String::with_capacity(input.len());
        let mut view = SubStringRef::new(input, 0);

        while let Some(pos) = view.find("@insertpiece", 0) {
            out.push_str(&view.as_str()[..pos]);
            view.set_start(view.start() + pos + "@insertpiece(".len());

            match evaluate_param_args(&mut view) {
                Ok(args) if args.len() == 1 => {
                    match self.pieces.get(&PropertyKey::new(&args[0])) {
                        Some(body) => out.push_str(body),
                        None => log::error!("piece not found: {}", args[0]),
                    }
                }
                Ok(_) => self.record(SyntaxError::new(
                    view.line_number(),
                    "@insertpiece expects one parameter",
                )),
                Err(e) => self.record(e),
            }
        }

        out.push_str(view.as_str());
        out
    }

    /// Executes `@counter`/`@value` (which emit the property's decimal
    /// value) and the late math directives (which are invisible).
    ///
    /// Unlike the early math pass, scanning stops at the first `@` that is
    /// not a counter keyword: this pass runs last, over finished shader
    /// source, and anything else starting with `@` is plain text.
    #[must_use]
    pub fn parse_counter(&mut self, input: &str) -> String {
        let mut out = String::with_capacity(input.len());
        let mut view = SubStringRef::new(input, 0);

        while let Some((pos, idx)) = find_leading_operation(&view, &COUNTER_OP_NAMES) {
            out.push_str(&view.as_str()[..pos]);
            view.set_start(view.start() + pos + COUNTER_OP_NAMES[idx].len() + 2);

            match evaluate_param_args(&mut view) {
                Ok(args) if idx <= 1 => {
                    if args.len() == 1 {
                        let value = self.properties.get_property(args[0].as_str());
                        out.push_str(&value.to_string());
                        if idx == 0 {
                            self.properties
                                .set_property(args[0].as_str(), value.wrapping_add(1));
                        }
                    } else {
                        self.record(SyntaxError::new(
                            view.line_number(),
                            format!("@{} expects one parameter", COUNTER_OP_NAMES[idx]),
                        ));
                    }
                }
                Ok(args) => {
                    if (2..=3).contains(&args.len()) {
                        self.apply_arith(ARITH_OPS[idx - 2], COUNTER_OP_NAMES[idx], &args);
                    } else {
                        self.record(SyntaxError::new(
                            view.line_number(),
                            format!("@{} expects two or three parameters", COUNTER_OP_NAMES[idx]),
                        ));
                    }
                }
                Err(e) => self.record(e),
            }
        }

        out.push_str(view.as_str());
        out
    }

    /// `dst = op(src, operand)` where `args` is `[dst, operand]` or
    /// `[dst, src, operand]` and the operand may be a literal or a
    /// property name.
    fn apply_arith(&mut self, op: BinaryOp, op_name: &str, args: &[String]) {
        let dst = args[0].as_str();
        let (src, operand) = if args.len() == 3 {
            (args[1].as_str(), args[2].as_str())
        } else {
            (dst, args[1].as_str())
        };

        let op1 = self.properties.get_property(src);
        let op2 = self.resolve_operand(operand);
        let result = match op.apply(op1, op2) {
            Some(result) => result,
            None => {
                log::error!("@{op_name}: division by zero, storing 0 in '{dst}'");
                0
            }
        };
        self.properties.set_property(dst, result);
    }

    /// Integer literal, or property lookup when the text is not a number.
    fn resolve_operand(&self, text: &str) -> i32 {
        text.parse()
            .unwrap_or_else(|_| self.properties.get_property(text))
    }

    /// Like [`resolve_operand`](Self::resolve_operand) but for loop
    /// bounds; negative property values clamp to 0.
    fn resolve_index(&self, text: &str) -> usize {
        text.parse().unwrap_or_else(|_| {
            usize::try_from(self.properties.get_property(text)).unwrap_or(0)
        })
    }

    fn record(&mut self, error: SyntaxError) {
        log::error!("{error}");
        self.errors.push(error);
    }
}

/// Finds the next `@` whose keyword (up to the first space, tab or paren)
/// is one of `names`. Returns the `@` offset relative to the view start
/// and the matched index.
fn find_any_operation(view: &SubStringRef<'_>, names: &[&str]) -> Option<(usize, usize)> {
    let mut pos = view.find("@", 0);
    while let Some(p) = pos {
        if let Some(idx) = match_keyword(view, p, names) {
            return Some((p, idx));
        }
        pos = view.find("@", p + 1);
    }
    None
}

/// Like [`find_any_operation`] but gives up at the first `@` whose
/// keyword matches nothing.
fn find_leading_operation(view: &SubStringRef<'_>, names: &[&str]) -> Option<(usize, usize)> {
    let p = view.find("@", 0)?;
    match_keyword(view, p, names).map(|idx| (p, idx))
}

fn match_keyword(view: &SubStringRef<'_>, at: usize, names: &[&str]) -> Option<usize> {
    let max_size = view.find_first_of(" \t(", at + 1).unwrap_or_else(|| view.len());
    let keyword = SubStringRef::with_end(
        view.original(),
        view.start() + at + 1,
        view.start() + max_size,
    );
    names.iter().position(|name| keyword.match_equal(name))
}

/// Shrinks the view to end at the `@` of the `@end` matching the block
/// the view starts inside. `@foreach`, `@property` and `@piece` openers
/// nest. On a missing `@end` the view is left untouched (spanning to the
/// buffer end) and an error is returned.
fn find_block_end(view: &mut SubStringRef<'_>) -> std::result::Result<(), SyntaxError> {
    let bytes = view.original().as_bytes();
    let mut i = view.start();
    let mut nesting = 0i32;

    while i < view.end() && nesting >= 0 {
        if bytes[i] == b'@' {
            let rest = SubStringRef::new(view.original(), i + 1);
            if rest.find("end", 0) == Some(0) {
                nesting -= 1;
                i += "end".len();
            } else {
                for name in BLOCK_NAMES {
                    if rest.find(name, 0) == Some(0) {
                        i += 1 + name.len();
                        nesting += 1;
                        break;
                    }
                }
            }
        }
        i += 1;
    }

    if nesting == -1 {
        view.set_end(i - "@end".len());
        Ok(())
    } else {
        Err(SyntaxError::new(
            view.line_number(),
            "start block (e.g. @foreach, @property) without matching @end",
        ))
    }
}

/// Splits the parenthesized argument list the view starts inside.
///
/// The view sits just past the opening `(`; on success it is advanced
/// past the matching `)`. Arguments are whitespace-trimmed identifiers
/// or numbers separated by commas; an empty list yields one empty
/// argument, matching how callers detect missing parameters.
fn evaluate_param_args(view: &mut SubStringRef<'_>) -> std::result::Result<Vec<String>, SyntaxError> {
    #[derive(PartialEq)]
    enum State {
        Idle,
        Reading,
        AfterSpace,
    }

    let Some(exp_end) = find_closing_paren(view) else {
        return Err(SyntaxError::new(
            view.line_number(),
            "opening parenthesis without matching closure",
        ));
    };

    let inner = SubStringRef::with_end(view.original(), view.start(), view.start() + exp_end);
    let text = inner.as_str();
    // Line numbers are O(position) to compute; capture the pre-advance
    // position and count only on the error branches, or every directive
    // on the success path pays the scan and a pass goes quadratic.
    let (buffer, arg_start) = (view.original(), view.start());
    let line = || SubStringRef::new(buffer, arg_start).line_number();
    *view = SubStringRef::new(view.original(), view.start() + exp_end + 1);

    let mut args = vec![String::new()];
    let mut state = State::Idle;

    for c in text.chars() {
        match c {
            '(' | ')' | '@' | '&' | '|' => {
                return Err(SyntaxError::new(
                    line(),
                    format!("unexpected '{c}' in argument list"),
                ));
            }
            ' ' | '\t' | '\n' | '\r' => {
                if state == State::Reading {
                    state = State::AfterSpace;
                }
            }
            ',' => {
                state = State::Idle;
                args.push(String::new());
            }
            _ => {
                if state == State::AfterSpace {
                    return Err(SyntaxError::new(line(), "',' or ')' expected"));
                }
                if let Some(last) = args.last_mut() {
                    last.push(c);
                }
                state = State::Reading;
            }
        }
    }

    Ok(args)
}

/// Emits one copy of a `@foreach` body, substituting `@var` occurrences
/// (prefix match, no delimiter required) with `pass_num`.
fn repeat(out: &mut String, block: &SubStringRef<'_>, pass_num: usize, counter_var: &str) {
    let text = block.as_str();
    if counter_var.is_empty() {
        out.push_str(text);
        return;
    }

    let mut i = 0;
    while let Some(rel) = text[i..].find('@') {
        let at = i + rel;
        out.push_str(&text[i..at]);
        if text[at + 1..].starts_with(counter_var) {
            out.push_str(&pass_num.to_string());
            i = at + 1 + counter_var.len();
        } else {
            out.push('@');
            i = at + 1;
        }
    }
    out.push_str(&text[i..]);
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store(entries: &[(&str, i32)]) -> PropertyStore {
        PropertyStore::from(entries)
    }

    #[test]
    fn property_block_kept_when_true() {
        let mut props = store(&[("a", 1)]);
        let mut parser = TemplateParser::new(&mut props);
        let out = parser.parse_properties("@property(a) X @end Y");
        assert_eq!(out, " X  Y");
        assert!(parser.errors().is_empty());
    }

    #[test]
    fn property_block_dropped_when_false() {
        let mut props = store(&[("a", 0)]);
        let mut parser = TemplateParser::new(&mut props);
        assert_eq!(parser.parse_properties("@property(a) X @end Y"), " Y");
    }

    #[test]
    fn nested_property_blocks() {
        let mut props = store(&[("a", 1), ("b", 0)]);
        let mut parser = TemplateParser::new(&mut props);
        let out = parser.parse_properties("@property(a)@property(b)B@end A@end");
        assert_eq!(out, " A");
        assert!(parser.errors().is_empty());
    }

    #[test]
    fn property_without_end_degrades() {
        let mut props = store(&[("a", 1)]);
        let mut parser = TemplateParser::new(&mut props);
        let out = parser.parse_properties("@property(a) X");
        assert_eq!(out, "");
        assert_eq!(parser.errors().len(), 1);
    }

    #[test]
    fn foreach_repeats_with_counter_substitution() {
        let mut props = store(&[]);
        let mut parser = TemplateParser::new(&mut props);
        let out = parser.parse_foreach("@foreach(i,0,3) [@i] @end");
        assert_eq!(out, " [0]  [1]  [2] ");
        assert!(parser.errors().is_empty());
    }

    #[test]
    fn foreach_bounds_from_properties() {
        let mut props = store(&[("n", 2), ("base", 5)]);
        let mut parser = TemplateParser::new(&mut props);
        let out = parser.parse_foreach("@foreach(i,base,n)@i,@end");
        assert_eq!(out, "5,6,");
    }

    #[test]
    fn foreach_zero_count_emits_nothing() {
        let mut props = store(&[]);
        let mut parser = TemplateParser::new(&mut props);
        assert_eq!(parser.parse_foreach("@foreach(i,0,0)x@end"), "");
    }

    #[test]
    fn math_pass_updates_properties_invisibly() {
        let mut props = store(&[]);
        let mut parser = TemplateParser::new(&mut props);
        let out = parser.parse_math("@padd( n, 5 )@value( n )\n");
        assert_eq!(out, "@value( n )\n");
        let out = parser.parse_counter(&out);
        assert_eq!(out, "5\n");
        assert!(parser.errors().is_empty());
    }

    #[test]
    fn math_three_arg_form_reads_other_property() {
        let mut props = store(&[("a", 3), ("b", 4)]);
        let mut parser = TemplateParser::new(&mut props);
        let _ = parser.parse_math("@pmul(dst, a, b)\n");
        assert_eq!(props.get_property("dst"), 12);
    }

    #[test]
    fn math_division_by_zero_stores_zero() {
        let mut props = store(&[("n", 10)]);
        let mut parser = TemplateParser::new(&mut props);
        let _ = parser.parse_math("@pdiv(n, 0)\n");
        assert_eq!(props.get_property("n"), 0);
    }

    #[test]
    fn math_arity_error_is_recorded() {
        let mut props = store(&[]);
        let mut parser = TemplateParser::new(&mut props);
        let _ = parser.parse_math("@pset(x)\n");
        assert_eq!(parser.errors().len(), 1);
    }

    #[test]
    fn counter_emits_then_increments() {
        let mut props = store(&[]);
        let mut parser = TemplateParser::new(&mut props);
        let out = parser.parse_counter("@counter( x )@counter( x )@value( x )\n");
        assert_eq!(out, "012\n");
    }

    #[test]
    fn counter_scan_stops_at_foreign_directive() {
        let mut props = store(&[]);
        let mut parser = TemplateParser::new(&mut props);
        let out = parser.parse_counter("@counter(x)@version@counter(x)");
        assert_eq!(out, "0@version@counter(x)");
    }

    #[test]
    fn pieces_collect_and_insert() {
        let mut props = store(&[]);
        let mut parser = TemplateParser::new(&mut props);
        // The byte after "@end" (the space) is swallowed by the skip.
        let out = parser.collect_pieces("@piece(foo) BAR @end @insertpiece(foo)\n");
        assert_eq!(out, "@insertpiece(foo)\n");
        let out = parser.insert_pieces(&out);
        assert_eq!(out, " BAR \n");
        assert!(parser.errors().is_empty());
    }

    #[test]
    fn pieces_nest_through_repeated_insertion() {
        let mut props = store(&[]);
        let mut parser = TemplateParser::new(&mut props);
        let out = parser.collect_pieces("@piece(a)A@end @piece(b)@insertpiece(a)B@end");
        let out = parser.insert_pieces(&format!("{out}@insertpiece(b)\n"));
        assert_eq!(out, "AB\n");
    }

    #[test]
    fn duplicate_piece_keeps_first_body() {
        let mut props = store(&[]);
        let mut parser = TemplateParser::new(&mut props);
        let out = parser.collect_pieces("@piece(p)one@end @piece(p)two@end");
        let out = parser.insert_pieces(&format!("{out}@insertpiece(p)\n"));
        assert_eq!(out, "one\n");
        assert_eq!(parser.errors().len(), 1);
    }

    #[test]
    fn self_inserting_piece_hits_the_expansion_cap() {
        let mut props = store(&[]);
        let mut parser = TemplateParser::new(&mut props);
        let _ = parser.collect_pieces("@piece(a)x@insertpiece(a)@end ");
        let out = parser.insert_pieces("@insertpiece(a)\n");
        assert!(out.contains("@insertpiece"));
        assert_eq!(parser.errors().len(), 1);
        assert!(parser.errors()[0].message.contains("expansion limit"));
    }

    #[test]
    fn doubling_insertion_is_bounded_by_buffer_size() {
        let mut props = store(&[]);
        let mut parser = TemplateParser::new(&mut props);
        // Two self-insertions double the buffer per pass; the byte ceiling
        // has to stop this well before the pass cap would.
        let _ = parser.collect_pieces("@piece(a)x@insertpiece(a)@insertpiece(a)@end ");
        let out = parser.insert_pieces("@insertpiece(a)\n");
        assert!(out.len() < MAX_EXPANSION_BYTES * 2);
        assert_eq!(parser.errors().len(), 1);
    }

    #[test]
    fn unknown_piece_is_not_a_syntax_error() {
        let mut props = store(&[]);
        let mut parser = TemplateParser::new(&mut props);
        let out = parser.insert_pieces("@insertpiece(nope)x");
        assert_eq!(out, "x");
        assert!(parser.errors().is_empty());
    }

    #[test]
    fn render_runs_full_pipeline() {
        let mut props = store(&[("flag", 1)]);
        let parser = TemplateParser::new(&mut props);
        let out = parser.render(
            "@property(flag)@insertpiece(header)@end@counter(reg)\n",
            &["@piece(header)//h@end"],
        );
        assert_eq!(out.source, "//h0\n");
        assert!(out.is_clean());
    }

    #[test]
    fn render_piece_file_math_feeds_main_template_guards() {
        let mut props = store(&[]);
        let parser = TemplateParser::new(&mut props);
        let out = parser.render("@property(flag)Y@end", &["@pset(flag, 1)\n"]);
        assert_eq!(out.source, "Y");
        assert!(out.is_clean());
    }

    #[test]
    fn render_collects_errors_and_continues() {
        let mut props = store(&[("a", 1)]);
        let parser = TemplateParser::new(&mut props);
        let out = parser.render("@pset(x)@property(a)ok@end", &[] as &[&str]);
        assert_eq!(out.source, "ok");
        assert_eq!(out.errors.len(), 1);
        assert!(!out.is_clean());
    }
}
