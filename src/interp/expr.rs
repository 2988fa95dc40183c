//! Arithmetic over script arguments.
//!
//! Arguments are strings. A bare word such as `delta` or `bigger` passes
//! through untouched; anything else is treated as an arithmetic expression
//! over numbers and `$variables`, evaluated in double precision.

use std::collections::HashMap;

use super::error::EvalError;

/// Variables visible to one command invocation. Keys include the `$`.
pub type Context = HashMap<String, String>;

/// Evaluate one argument against the context.
pub fn calc(context: &Context, expr: &str) -> Result<String, EvalError> {
    if is_symbol(expr) {
        return Ok(expr.to_string());
    }
    if expr.starts_with('$') {
        if let Some(value) = context.get(expr).filter(|v| is_symbol(v)) {
            return Ok(value.clone());
        }
    }

    let substituted = substitute(context, expr);
    if let Some(bad) = substituted.chars().find(|c| !is_expression_char(*c)) {
        return Err(invalid(expr, format!("unexpected character `{bad}`")));
    }

    let value = ExprParser::new(&substituted)
        .parse()
        .map_err(|reason| invalid(expr, reason))?;
    Ok(format_number(value))
}

/// Print a number the way script arguments are written (`3`, `2.5`).
pub fn format_number(value: f64) -> String {
    if value == 0.0 {
        // Avoid `-0`.
        return "0".to_string();
    }
    value.to_string()
}

/// A bare identifier that is never evaluated.
pub fn is_symbol(text: &str) -> bool {
    let mut chars = text.chars();
    chars
        .next()
        .is_some_and(|c| c.is_ascii_alphabetic() || c == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
}

fn is_expression_char(c: char) -> bool {
    c.is_ascii_digit() || "().+-*/%!=<> ".contains(c) || c.is_whitespace()
}

/// `$name` prefix of `text`, if it starts with one.
fn variable_name(text: &str) -> Option<&str> {
    let rest = text.strip_prefix('$')?;
    let len = rest
        .find(|c: char| !(c.is_ascii_alphanumeric() || c == '_'))
        .unwrap_or(rest.len());
    (len > 0).then(|| &text[..len + 1])
}

fn substitute(context: &Context, expr: &str) -> String {
    let mut out = String::with_capacity(expr.len());
    let mut rest = expr;
    while let Some(pos) = rest.find('$') {
        out.push_str(&rest[..pos]);
        rest = &rest[pos..];
        match variable_name(rest) {
            Some(name) => {
                match context.get(name) {
                    Some(value) => {
                        out.push('(');
                        out.push_str(value);
                        out.push(')');
                    }
                    None => out.push_str(name),
                }
                rest = &rest[name.len()..];
            }
            None => {
                out.push('$');
                rest = &rest[1..];
            }
        }
    }
    out.push_str(rest);
    out
}

fn invalid(expr: &str, reason: impl Into<String>) -> EvalError {
    EvalError::InvalidExpression {
        expr: expr.to_string(),
        reason: reason.into(),
    }
}

/// Recursive-descent evaluator.
///
/// Precedence, lowest first: `== !=`, `< > <= >=`, `+ -`, `* / %`, unary
/// `- + !`. Comparisons produce 0 or 1.
struct ExprParser {
    chars: Vec<char>,
    pos: usize,
}

impl ExprParser {
    fn new(source: &str) -> Self {
        Self {
            chars: source.chars().collect(),
            pos: 0,
        }
    }

    fn parse(mut self) -> Result<f64, String> {
        let value = self.equality()?;
        self.skip_whitespace();
        match self.peek() {
            None => Ok(value),
            Some(c) => Err(format!("unexpected `{c}`")),
        }
    }

    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn skip_whitespace(&mut self) {
        while self.peek().is_some_and(char::is_whitespace) {
            self.pos += 1;
        }
    }

    fn eat(&mut self, op: &str) -> bool {
        self.skip_whitespace();
        let matches = op
            .chars()
            .enumerate()
            .all(|(i, c)| self.chars.get(self.pos + i) == Some(&c));
        if matches {
            self.pos += op.chars().count();
        }
        matches
    }

    fn equality(&mut self) -> Result<f64, String> {
        let mut lhs = self.relational()?;
        loop {
            if self.eat("==") {
                let rhs = self.relational()?;
                lhs = truth(lhs == rhs);
            } else if self.eat("!=") {
                let rhs = self.relational()?;
                lhs = truth(lhs != rhs);
            } else {
                return Ok(lhs);
            }
        }
    }

    fn relational(&mut self) -> Result<f64, String> {
        let mut lhs = self.additive()?;
        loop {
            if self.eat("<=") {
                let rhs = self.additive()?;
                lhs = truth(lhs <= rhs);
            } else if self.eat(">=") {
                let rhs = self.additive()?;
                lhs = truth(lhs >= rhs);
            } else if self.eat("<") {
                let rhs = self.additive()?;
                lhs = truth(lhs < rhs);
            } else if self.eat(">") {
                let rhs = self.additive()?;
                lhs = truth(lhs > rhs);
            } else {
                return Ok(lhs);
            }
        }
    }

    fn additive(&mut self) -> Result<f64, String> {
        let mut lhs = self.multiplicative()?;
        loop {
            if self.eat("+") {
                lhs += self.multiplicative()?;
            } else if self.eat("-") {
                lhs -= self.multiplicative()?;
            } else {
                return Ok(lhs);
            }
        }
    }

    fn multiplicative(&mut self) -> Result<f64, String> {
        let mut lhs = self.unary()?;
        loop {
            if self.eat("*") {
                lhs *= self.unary()?;
            } else if self.eat("/") {
                let rhs = self.unary()?;
                if rhs == 0.0 {
                    return Err("division by zero".into());
                }
                lhs /= rhs;
            } else if self.eat("%") {
                let rhs = self.unary()?;
                if rhs == 0.0 {
                    return Err("remainder by zero".into());
                }
                lhs %= rhs;
            } else {
                return Ok(lhs);
            }
        }
    }

    fn unary(&mut self) -> Result<f64, String> {
        if self.eat("-") {
            Ok(-self.unary()?)
        } else if self.eat("+") {
            self.unary()
        } else if self.eat("!") {
            Ok(truth(self.unary()? == 0.0))
        } else {
            self.primary()
        }
    }

    fn primary(&mut self) -> Result<f64, String> {
        if self.eat("(") {
            let value = self.equality()?;
            if !self.eat(")") {
                return Err("missing `)`".into());
            }
            return Ok(value);
        }

        self.skip_whitespace();
        let start = self.pos;
        while self
            .peek()
            .is_some_and(|c| c.is_ascii_digit() || c == '.')
        {
            self.pos += 1;
        }
        let literal: String = self.chars[start..self.pos].iter().collect();
        if literal.is_empty() {
            return Err(match self.peek() {
                Some(c) => format!("unexpected `{c}`"),
                None => "unexpected end of expression".into(),
            });
        }
        literal
            .parse()
            .map_err(|_| format!("malformed number `{literal}`"))
    }
}

fn truth(b: bool) -> f64 {
    if b {
        1.0
    } else {
        0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ctx(vars: &[(&str, &str)]) -> Context {
        vars.iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    fn eval(expr: &str) -> String {
        calc(&Context::new(), expr).unwrap()
    }

    #[test]
    fn symbols_pass_through() {
        assert_eq!(eval("delta"), "delta");
        assert_eq!(eval("keep_bigger"), "keep_bigger");
        assert_eq!(eval("a-b"), "a-b");
    }

    #[test]
    fn arithmetic_precedence() {
        assert_eq!(eval("1+2*3"), "7");
        assert_eq!(eval("(1+2)*3"), "9");
        assert_eq!(eval("10/4"), "2.5");
        assert_eq!(eval("-3+1"), "-2");
        assert_eq!(eval("7%4"), "3");
        assert_eq!(eval("2*-3"), "-6");
        assert_eq!(eval("0.1+0.2"), "0.30000000000000004");
        assert_eq!(eval("-0"), "0");
    }

    #[test]
    fn comparisons_and_negation() {
        assert_eq!(eval("1<2"), "1");
        assert_eq!(eval("2<=1"), "0");
        assert_eq!(eval("3==3"), "1");
        assert_eq!(eval("3!=3"), "0");
        assert_eq!(eval("1+1==2"), "1");
        assert_eq!(eval("!0"), "1");
        assert_eq!(eval("!(2>1)"), "0");
    }

    #[test]
    fn variables_are_substituted() {
        let c = ctx(&[("$len", "192"), ("$n", "-4"), ("$mode", "bigger")]);
        assert_eq!(calc(&c, "$len/4").unwrap(), "48");
        assert_eq!(calc(&c, "$len-$n").unwrap(), "196");
        assert_eq!(calc(&c, "$n*$n").unwrap(), "16");
        assert_eq!(calc(&c, "$mode").unwrap(), "bigger");
    }

    #[test]
    fn rejects_bad_input() {
        let c = ctx(&[("$mode", "bigger")]);
        assert!(matches!(calc(&c, "$missing+1"), Err(EvalError::InvalidExpression { .. })));
        assert!(matches!(calc(&c, "$mode+1"), Err(EvalError::InvalidExpression { .. })));
        assert!(matches!(calc(&c, "1/0"), Err(EvalError::InvalidExpression { .. })));
        assert!(matches!(calc(&c, "5%0"), Err(EvalError::InvalidExpression { .. })));
        assert!(matches!(calc(&c, "(1+2"), Err(EvalError::InvalidExpression { .. })));
        assert!(matches!(calc(&c, "1 2"), Err(EvalError::InvalidExpression { .. })));
        assert!(matches!(calc(&c, "1..2"), Err(EvalError::InvalidExpression { .. })));
        assert!(matches!(calc(&c, ""), Err(EvalError::InvalidExpression { .. })));
    }
}
