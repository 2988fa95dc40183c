//! Command body evaluation.
//!
//! Walking a body produces a flat list of emitted statements, each tagged
//! with the number of tick markers (`@` or lane rows) seen before it. The
//! caller turns those line offsets into chart ticks.

use super::error::EvalError;
use super::expr::{calc, Context};
use crate::script::Node;

/// A statement produced by a command body.
#[derive(Debug, Clone, PartialEq)]
pub struct Emitted {
    /// Tick markers passed before this statement.
    pub line_offset: usize,
    pub name: String,
    pub args: Vec<String>,
}

/// Result of evaluating one body.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Evaluation {
    pub emitted: Vec<Emitted>,
    /// Total tick markers passed.
    pub line_count: usize,
}

/// Evaluate a command body in `context`.
///
/// `loop_limit` bounds each `while` loop; `None` leaves loops unbounded.
pub fn evaluate(context: &mut Context, body: &Node, loop_limit: Option<u64>) -> Result<Evaluation, EvalError> {
    let mut evaluator = Evaluator {
        context,
        loop_limit,
        out: Evaluation::default(),
    };
    evaluator.block(&body.children)?;
    Ok(evaluator.out)
}

struct Evaluator<'a> {
    context: &'a mut Context,
    loop_limit: Option<u64>,
    out: Evaluation,
}

impl Evaluator<'_> {
    fn block(&mut self, nodes: &[Node]) -> Result<(), EvalError> {
        let mut i = 0;
        while i < nodes.len() {
            let node = &nodes[i];
            match node.name.as_str() {
                "tick" => self.out.line_count += 1,
                "set" => self.set(node)?,
                "call" => {
                    let mut args = self.calc_all(&node.args)?;
                    if args.is_empty() {
                        return Err(EvalError::MissingCallTarget { line: node.line });
                    }
                    let name = args.remove(0).to_lowercase();
                    self.emit(name, args);
                }
                "if" => {
                    let chain = 1 + nodes[i + 1..]
                        .iter()
                        .take_while(|n| n.name == "else")
                        .count();
                    self.if_chain(&nodes[i..i + chain])?;
                    i += chain;
                    continue;
                }
                "repeat" => self.repeat(node)?,
                "while" => self.while_loop(node)?,
                "else" | "command" | "import" => {
                    return Err(EvalError::UnexpectedNode {
                        name: node.raw_name.clone(),
                        line: node.line,
                    })
                }
                _ => {
                    let args = self.calc_all(&node.args)?;
                    self.emit(node.name.clone(), args);
                }
            }
            i += 1;
        }
        Ok(())
    }

    fn emit(&mut self, name: String, args: Vec<String>) {
        self.out.emitted.push(Emitted {
            line_offset: self.out.line_count,
            name,
            args,
        });
    }

    fn calc_all(&self, args: &[String]) -> Result<Vec<String>, EvalError> {
        args.iter().map(|a| calc(self.context, a)).collect()
    }

    fn set(&mut self, node: &Node) -> Result<(), EvalError> {
        match node.args.as_slice() {
            [name, expr] if name.starts_with('$') => {
                let value = calc(self.context, expr)?;
                self.context.insert(name.clone(), value);
                Ok(())
            }
            _ => Err(EvalError::InvalidSet { line: node.line }),
        }
    }

    /// Run the first branch whose guard holds.
    fn if_chain(&mut self, branches: &[Node]) -> Result<(), EvalError> {
        for branch in branches {
            let guard = match (branch.name.as_str(), branch.args.split_first()) {
                ("if", _) => Some(branch.args.as_slice()),
                (_, Some((first, rest))) if first.eq_ignore_ascii_case("if") => Some(rest),
                (_, None) => None,
                (_, Some(_)) => {
                    return Err(EvalError::InvalidGuard {
                        guard: branch.args.join(" "),
                        line: branch.line,
                    })
                }
            };
            let taken = match guard {
                Some(guard) => self.truthy(guard, branch.line)?,
                None => true,
            };
            if taken {
                return self.block(&branch.children);
            }
        }
        Ok(())
    }

    fn truthy(&self, guard: &[String], line: usize) -> Result<bool, EvalError> {
        let text = guard.join(" ");
        let invalid = || EvalError::InvalidGuard {
            guard: text.clone(),
            line,
        };
        if text.is_empty() {
            return Err(invalid());
        }
        let value = calc(self.context, &text)?;
        match value.as_str() {
            "true" => Ok(true),
            "false" => Ok(false),
            v => v
                .parse::<f64>()
                .map(|n| n.trunc() != 0.0)
                .map_err(|_| invalid()),
        }
    }

    fn count(&self, text: &str, line: usize) -> Result<u64, EvalError> {
        let value = calc(self.context, text)?;
        value
            .parse::<f64>()
            .ok()
            .filter(|n| n.is_finite() && *n >= 0.0 && n.fract() == 0.0)
            .map(|n| n as u64)
            .ok_or_else(|| EvalError::InvalidRepeat {
                text: text.to_string(),
                line,
            })
    }

    fn repeat(&mut self, node: &Node) -> Result<(), EvalError> {
        let times = match node.args.as_slice() {
            [count] => self.count(count, node.line)?,
            [chunk, total] => {
                let chunk = self.count(chunk, node.line)?;
                let total = self.count(total, node.line)?;
                if chunk == 0 || total % chunk != 0 {
                    return Err(EvalError::IndivisibleRepeat {
                        chunk,
                        total,
                        line: node.line,
                    });
                }
                total / chunk
            }
            _ => {
                return Err(EvalError::InvalidRepeat {
                    text: node.args.join(" "),
                    line: node.line,
                })
            }
        };
        for _ in 0..times {
            self.block(&node.children)?;
        }
        Ok(())
    }

    fn while_loop(&mut self, node: &Node) -> Result<(), EvalError> {
        let mut iterations: u64 = 0;
        while self.truthy(&node.args, node.line)? {
            iterations += 1;
            if let Some(limit) = self.loop_limit.filter(|limit| iterations > *limit) {
                return Err(EvalError::IterationLimitExceeded {
                    limit,
                    line: node.line,
                });
            }
            self.block(&node.children)?;
        }
        Ok(())
    }
}
