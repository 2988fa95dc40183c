//! Script interpreter.
//!
//! [`Interpreter::process`] scans a chart for `;command` annotations, expands
//! each through the loaded command table and feeds the resulting curve edits
//! to the [`CurveEngine`], which finally writes back into the chart.

pub mod command;
pub mod error;
pub mod eval;
pub mod expr;

use std::rc::Rc;

use crate::chart::tick::parse_fraction;
use crate::chart::{Chart, Tick, TICKS_PER_MEASURE};
use crate::error::Error;
use crate::script::lexer::split_balanced;
use crate::script::Script;
use crate::zoom::CurveEngine;

pub use command::{Command, CommandTable, ExecContext, Invocation, Param, UserCommand};
pub use error::EvalError;
pub use eval::{evaluate, Emitted, Evaluation};
pub use expr::{calc, Context};

/// Runtime knobs, usually taken from the config file.
#[derive(Debug, Clone, PartialEq)]
pub struct Options {
    /// Cap on iterations of a single `while` loop; `None` means unbounded.
    pub max_loop_iterations: Option<u64>,
    /// Turn `//comment` chart annotations into `print` invocations.
    pub echo_chart_comments: bool,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            max_loop_iterations: Some(100_000),
            echo_chart_comments: true,
        }
    }
}

/// Counters reported after processing a chart.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Summary {
    /// Top-level invocations that ran.
    pub executed: usize,
    /// Invocations skipped while `process off` was active.
    pub skipped: usize,
    /// Invocations naming no known command.
    pub unknown: usize,
}

pub struct Interpreter {
    commands: Rc<CommandTable>,
    options: Options,
}

impl Interpreter {
    pub fn new(script: Script, options: Options) -> Self {
        Self {
            commands: script.commands(),
            options,
        }
    }

    pub fn commands(&self) -> &CommandTable {
        &self.commands
    }

    /// Run every chart invocation and write the resulting curves back.
    pub fn process(&self, chart: &mut Chart) -> Result<Summary, Error> {
        let mut curves = CurveEngine::load(chart);
        let invocations = self.collect_invocations(chart)?;
        let mut summary = Summary::default();
        let mut enabled = true;

        for inv in invocations {
            if inv.name == "process" {
                match inv.args.first().map(|a| a.to_lowercase()).as_deref() {
                    Some("on") => enabled = true,
                    Some("off") => enabled = false,
                    _ => log::warn!("t={}: `process` expects `on` or `off`", inv.tick),
                }
                continue;
            }
            if !enabled {
                log::debug!("t={}: skipping `{}` (processing off)", inv.tick, inv.name);
                summary.skipped += 1;
                continue;
            }
            if !self.commands.contains(&inv.name) {
                log::debug!("t={}: ignoring unknown command `{}`", inv.tick, inv.name);
                summary.unknown += 1;
                continue;
            }
            self.apply_command(&mut curves, inv.tick, &inv.name, inv.args)?;
            summary.executed += 1;
        }

        curves.write_back(chart)?;
        Ok(summary)
    }

    /// Invocations written in chart annotations, in tick order.
    fn collect_invocations(&self, chart: &Chart) -> Result<Vec<Invocation>, Error> {
        let mut invocations = Vec::new();
        for line in chart.lines() {
            for annotation in &line.annotations {
                if let Some(comment) = annotation.strip_prefix("//") {
                    let text = comment.trim();
                    if self.options.echo_chart_comments && !text.is_empty() {
                        invocations.push(Invocation {
                            tick: line.tick(),
                            name: "print".into(),
                            args: vec![text.to_string()],
                        });
                    }
                    continue;
                }
                let Some(statement) = annotation.strip_prefix(';') else {
                    continue;
                };
                let mut tokens =
                    split_balanced(statement.trim()).ok_or_else(|| Error::MalformedInvocation {
                        tick: line.tick(),
                        text: annotation.clone(),
                    })?;
                if tokens.is_empty() {
                    log::warn!("t={}: empty `;` annotation", line.tick());
                    continue;
                }
                let name = tokens.remove(0).to_lowercase();
                invocations.push(Invocation {
                    tick: line.tick(),
                    name,
                    args: tokens,
                });
            }
        }
        Ok(invocations)
    }

    /// Run one command at `tick` and dispatch everything it expands to.
    ///
    /// Curve edits produced by a command are buffered and merged before any
    /// other produced command runs, so nested macros see the updated curves.
    pub fn apply_command(
        &self,
        curves: &mut CurveEngine,
        tick: Tick,
        name: &str,
        args: Vec<String>,
    ) -> Result<(), Error> {
        let wrap = |source: EvalError| Error::Eval {
            command: name.to_string(),
            tick,
            source,
        };
        let command = self
            .commands
            .get(name)
            .ok_or_else(|| wrap(EvalError::UnknownCommand { name: name.to_string() }))?;
        let args: Vec<String> = args.into_iter().map(expand_fraction).collect();

        let produced = command
            .execute(&mut ExecContext {
                tick,
                args: &args,
                curves: &mut *curves,
                options: &self.options,
            })
            .map_err(wrap)?;

        if let Some(unknown) = produced.iter().find(|inv| !self.commands.contains(&inv.name)) {
            return Err(wrap(EvalError::UnknownCommand {
                name: unknown.name.clone(),
            }));
        }

        let (edits, rest): (Vec<_>, Vec<_>) = produced
            .into_iter()
            .partition(|inv| self.commands.get(&inv.name).is_some_and(Command::is_curve_edit));

        if !edits.is_empty() {
            for inv in edits {
                self.apply_command(curves, inv.tick, &inv.name, inv.args)?;
            }
            curves.apply_edits();
        }
        for inv in rest {
            self.apply_command(curves, inv.tick, &inv.name, inv.args)?;
        }
        Ok(())
    }
}

/// `{num/den}` measure fractions become tick counts.
fn expand_fraction(arg: String) -> String {
    let fraction = arg
        .strip_prefix('{')
        .and_then(|a| a.strip_suffix('}'))
        .and_then(parse_fraction);
    match fraction {
        Some((num, den)) => expr::format_number(TICKS_PER_MEASURE as f64 * num as f64 / den as f64),
        None => arg,
    }
}
