//! Kernel version pattern compilation.
//!
//! Patterns follow RE2 syntax as accepted by the API's upstream consumers:
//! - `\Q...\E` quotes a literal run (an unterminated `\Q` runs to the end)
//! - A single or nested repeat count may not exceed 1000
//! - Large but legal repetitions compile instead of hitting the default size limit

use regex::{Regex, RegexBuilder};
use regex_syntax::ast::{self, Ast, RepetitionKind, RepetitionRange, Visitor};

/// Largest repeat count accepted, alone or as a product of nested repeats
pub const MAX_REPEAT: u32 = 1000;

/// Compiled program size limit. The repeat cap bounds what a pattern can request.
const SIZE_LIMIT: usize = 256 * (1 << 20);

/// Lazy DFA cache limit
const DFA_SIZE_LIMIT: usize = 64 * (1 << 20);

/// Compile a kernel version pattern
pub fn compile(pattern: &str) -> Result<Regex, regex::Error> {
    let expanded = expand_quoted(pattern);
    check_repeat_counts(&expanded)?;

    RegexBuilder::new(&expanded)
        .size_limit(SIZE_LIMIT)
        .dfa_size_limit(DFA_SIZE_LIMIT)
        .build()
}

/// Replace each `\Q...\E` run with its escaped literal text.
fn expand_quoted(pattern: &str) -> String {
    let mut out = String::with_capacity(pattern.len());
    let mut chars = pattern.chars();

    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('Q') => {
                let rest = chars.as_str();
                let (literal, tail) = rest.split_once(r"\E").unwrap_or((rest, ""));
                out.push_str(&regex::escape(literal));
                chars = tail.chars();
            }
            Some(next) => {
                out.push('\\');
                out.push(next);
            }
            None => out.push('\\'),
        }
    }

    out
}

/// Reject counted repetitions above `MAX_REPEAT`, including nested products.
///
/// Patterns that do not parse are left to the compiler, which reports the
/// syntax error itself.
fn check_repeat_counts(pattern: &str) -> Result<(), regex::Error> {
    let Ok(parsed) = ast::parse::Parser::new().parse(pattern) else {
        return Ok(());
    };
    ast::visit(&parsed, RepeatLimit::default())
}

#[derive(Default)]
struct RepeatLimit {
    /// Product of the enclosing counted repeats, one entry per repetition node
    stack: Vec<u64>,
}

fn repeat_max(ast: &Ast) -> Option<u32> {
    let Ast::Repetition(rep) = ast else {
        return None;
    };
    match &rep.op.kind {
        RepetitionKind::Range(RepetitionRange::Exactly(n))
        | RepetitionKind::Range(RepetitionRange::AtLeast(n)) => Some(*n),
        RepetitionKind::Range(RepetitionRange::Bounded(min, max)) => Some((*min).max(*max)),
        RepetitionKind::ZeroOrOne | RepetitionKind::ZeroOrMore | RepetitionKind::OneOrMore => {
            Some(1)
        }
    }
}

impl Visitor for RepeatLimit {
    type Output = ();
    type Err = regex::Error;

    fn finish(self) -> Result<(), regex::Error> {
        Ok(())
    }

    fn visit_pre(&mut self, ast: &Ast) -> Result<(), regex::Error> {
        let Some(count) = repeat_max(ast) else {
            return Ok(());
        };
        let outer = self.stack.last().copied().unwrap_or(1);
        let total = outer.saturating_mul(u64::from(count));
        if count > MAX_REPEAT || total > u64::from(MAX_REPEAT) {
            return Err(regex::Error::Syntax(format!(
                "invalid repeat count: {} exceeds the limit of {}",
                total, MAX_REPEAT
            )));
        }
        self.stack.push(total);
        Ok(())
    }

    fn visit_post(&mut self, ast: &Ast) -> Result<(), regex::Error> {
        if repeat_max(ast).is_some() {
            self.stack.pop();
        }
        Ok(())
    }
}
