//! Commands callable from charts and scripts.

use std::collections::HashMap;
use std::rc::Rc;

use super::error::EvalError;
use super::eval::evaluate;
use super::expr::Context;
use super::Options;
use crate::chart::Tick;
use crate::script::{DefinitionError, Node};
use crate::zoom::{CurveEngine, CurveError, CurveName};

/// Language keywords that can never name a command.
pub const KEYWORDS: &[&str] = &[
    "script", "command", "define", "end", "set", "import", "include", "call", "if", "else", "while",
    "repeat", "tick", "line", "process",
];

/// Largest effect length in ticks; every integer up to it is exact in `f64`.
const MAX_EFFECT_LENGTH: f64 = 9_007_199_254_740_992.0;

const BUILTINS: &[&str] = &["null", "comment", "print", "error", "err"];

fn builtin(name: &str) -> Option<Command> {
    match name {
        "null" | "comment" => Some(Command::Null),
        "print" => Some(Command::Print),
        "error" | "err" => Some(Command::Error),
        _ => None,
    }
}

/// Whether a name is taken by the language or the built-in library.
pub fn is_reserved(name: &str) -> bool {
    let name = name.to_lowercase();
    KEYWORDS.contains(&name.as_str())
        || BUILTINS.contains(&name.as_str())
        || name.parse::<CurveName>().is_ok()
}

/// A command invocation scheduled at a tick.
#[derive(Debug, Clone, PartialEq)]
pub struct Invocation {
    pub tick: Tick,
    pub name: String,
    pub args: Vec<String>,
}

/// What a command needs while it runs.
pub struct ExecContext<'a> {
    pub tick: Tick,
    pub args: &'a [String],
    pub curves: &'a mut CurveEngine,
    pub options: &'a Options,
}

#[derive(Debug, Clone)]
pub enum Command {
    /// Does nothing (`null`, `comment`).
    Null,
    /// Logs its arguments.
    Print,
    /// Fails with its arguments as the message.
    Error,
    /// Buffers a relative edit on a curve.
    CurveEdit(CurveName),
    /// A script-defined macro.
    User(Rc<UserCommand>),
}

impl Command {
    pub fn is_curve_edit(&self) -> bool {
        matches!(self, Command::CurveEdit(_))
    }

    /// Run the command, returning the invocations it expands to.
    pub fn execute(&self, ctx: &mut ExecContext<'_>) -> Result<Vec<Invocation>, EvalError> {
        match self {
            Command::Null => Ok(Vec::new()),
            Command::Print => {
                log::info!("[t={}] {}", ctx.tick, ctx.args.join(" "));
                Ok(Vec::new())
            }
            Command::Error => Err(EvalError::UserError {
                message: ctx.args.join(" "),
            }),
            Command::CurveEdit(curve) => {
                let values = parse_edit_values(*curve, ctx.tick, ctx.args)?;
                ctx.curves.add_edit(*curve, ctx.tick, &values)?;
                Ok(Vec::new())
            }
            Command::User(command) => command.execute(ctx.tick, ctx.args, ctx.options),
        }
    }
}

/// Edit values, with an optional leading `delta` keyword.
fn parse_edit_values(curve: CurveName, tick: Tick, args: &[String]) -> Result<Vec<f64>, EvalError> {
    let values = match args.split_first() {
        Some((first, rest)) if first.eq_ignore_ascii_case("delta") => rest,
        _ => args,
    };
    values
        .iter()
        .map(|v| {
            v.parse::<f64>().map_err(|_| {
                EvalError::from(CurveError::InvalidEditRange {
                    curve,
                    tick,
                    value: v.clone(),
                })
            })
        })
        .collect()
}

/// A `$name` parameter with an optional default.
#[derive(Debug, Clone, PartialEq)]
pub struct Param {
    pub name: String,
    pub default: Option<String>,
}

/// A command defined by a script.
#[derive(Debug, Clone, PartialEq)]
pub struct UserCommand {
    pub name: String,
    pub params: Vec<Param>,
    pub body: Node,
}

impl UserCommand {
    /// Build from a top-level `command` node.
    pub fn from_node(node: Node) -> Result<Self, DefinitionError> {
        let (name, params) = node
            .args
            .split_first()
            .ok_or(DefinitionError::MissingName { line: node.line })?;

        if is_reserved(name) {
            return Err(DefinitionError::ReservedName {
                name: name.clone(),
                line: node.line,
            });
        }

        let params = params
            .iter()
            .map(|param| {
                if !param.starts_with('$') || param.len() < 2 {
                    return Err(DefinitionError::InvalidParameter {
                        command: name.clone(),
                        param: param.clone(),
                        line: node.line,
                    });
                }
                Ok(match param.split_once('=') {
                    Some((n, default)) => Param {
                        name: n.to_string(),
                        default: Some(default.to_string()),
                    },
                    None => Param {
                        name: param.clone(),
                        default: None,
                    },
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        for nested in ["command", "import"] {
            if let Some(inner) = node.find_descendant(nested) {
                return Err(DefinitionError::NestedDefinition {
                    statement: inner.raw_name.clone(),
                    line: inner.line,
                });
            }
        }

        Ok(Self {
            name: name.to_lowercase(),
            params,
            body: node,
        })
    }

    /// Expand the macro at `tick`.
    ///
    /// The first argument is the effect length in ticks; statements emitted
    /// after the i-th tick marker land `i * length / markers` ticks later.
    pub fn execute(&self, tick: Tick, args: &[String], options: &Options) -> Result<Vec<Invocation>, EvalError> {
        let mut context = Context::new();
        for (i, param) in self.params.iter().enumerate() {
            let value = args
                .get(i)
                .or(param.default.as_ref())
                .ok_or_else(|| EvalError::MissingArgument {
                    param: param.name.clone(),
                })?;
            context.insert(param.name.clone(), value.clone());
        }

        // Commands without any parameter place everything at `tick`.
        let length_text = args
            .first()
            .or_else(|| self.params.first().and_then(|p| p.default.as_ref()))
            .cloned()
            .unwrap_or_else(|| "0".to_string());
        let length = length_text
            .parse::<f64>()
            .ok()
            .filter(|l| l.is_finite() && *l >= 0.0 && *l <= MAX_EFFECT_LENGTH)
            .ok_or_else(|| EvalError::InvalidEffectLength {
                value: length_text.clone(),
            })?;

        let evaluation = evaluate(&mut context, &self.body, options.max_loop_iterations)?;
        let lines = evaluation.line_count;
        let step = if lines == 0 {
            0
        } else {
            let whole = length as u64;
            if length.fract() != 0.0 || whole % lines as u64 != 0 {
                return Err(EvalError::LengthLineCountMismatch {
                    length: length_text.clone(),
                    lines,
                });
            }
            whole / lines as u64
        };

        evaluation
            .emitted
            .into_iter()
            .map(|e| -> Result<Invocation, EvalError> {
                let at = (e.line_offset as u64)
                    .checked_mul(step)
                    .and_then(|offset| tick.checked_add(Tick::from_ticks(offset)))
                    .ok_or_else(|| EvalError::InvalidEffectLength {
                        value: length_text.clone(),
                    })?;
                Ok(Invocation {
                    tick: at,
                    name: e.name,
                    args: e.args,
                })
            })
            .collect()
    }
}

/// Commands by lowercase name.
#[derive(Debug, Clone)]
pub struct CommandTable {
    commands: HashMap<String, Command>,
}

impl Default for CommandTable {
    fn default() -> Self {
        Self::with_builtins()
    }
}

impl CommandTable {
    /// Built-ins and the curve-edit commands.
    pub fn with_builtins() -> Self {
        let mut commands: HashMap<String, Command> = BUILTINS
            .iter()
            .filter_map(|name| builtin(name).map(|command| (name.to_string(), command)))
            .collect();
        for curve in CurveName::ALL {
            commands.insert(curve.as_str().to_string(), Command::CurveEdit(curve));
        }
        Self { commands }
    }

    pub fn get(&self, name: &str) -> Option<&Command> {
        self.commands.get(&name.to_lowercase())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// Add or replace a user command.
    pub fn define(&mut self, command: UserCommand) {
        let name = command.name.clone();
        if self.commands.insert(name.clone(), Command::User(Rc::new(command))).is_some() {
            log::debug!("command `{name}` redefined");
        }
    }

    /// Copy every user command of `other` into this table.
    pub fn extend_from(&mut self, other: &CommandTable) {
        for (name, command) in &other.commands {
            if let Command::User(_) = command {
                self.commands.insert(name.clone(), command.clone());
            }
        }
    }

    /// Names of user-defined commands, sorted.
    pub fn user_commands(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self
            .commands
            .iter()
            .filter(|(_, c)| matches!(c, Command::User(_)))
            .map(|(n, _)| n.as_str())
            .collect();
        names.sort_unstable();
        names
    }

    /// A user command by name, for inspection.
    pub fn user_command(&self, name: &str) -> Option<&Rc<UserCommand>> {
        match self.get(name) {
            Some(Command::User(command)) => Some(command),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::script::parse_script;

    fn define(source: &str) -> Result<UserCommand, DefinitionError> {
        let mut root = parse_script(source).unwrap();
        UserCommand::from_node(root.children.remove(0))
    }

    fn args(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    fn schedule(invocations: &[Invocation]) -> Vec<(u64, String, String)> {
        invocations
            .iter()
            .map(|i| (i.tick.ticks(), i.name.clone(), i.args.join(" ")))
            .collect()
    }

    #[test]
    fn parameters_and_defaults() {
        let cmd = define(";command Shake $len $amount=30\n;end\n").unwrap();
        assert_eq!(cmd.name, "shake");
        assert_eq!(
            cmd.params,
            vec![
                Param { name: "$len".into(), default: None },
                Param { name: "$amount".into(), default: Some("30".into()) },
            ]
        );
    }

    #[test]
    fn definition_errors() {
        assert!(matches!(define(";command print\n;end\n"), Err(DefinitionError::ReservedName { .. })));
        assert!(matches!(define(";command Zoom_Top\n;end\n"), Err(DefinitionError::ReservedName { .. })));
        assert!(matches!(define(";command while\n;end while\n"), Err(DefinitionError::ReservedName { .. })));
        assert!(matches!(define(";command foo len\n;end\n"), Err(DefinitionError::InvalidParameter { .. })));
        assert_eq!(define(";command\n;end\n").unwrap_err(), DefinitionError::MissingName { line: 1 });
        assert_eq!(
            define(";command foo\n;if 1\n;import bar\n;end\n;end\n").unwrap_err(),
            DefinitionError::NestedDefinition {
                statement: "import".into(),
                line: 3
            }
        );
    }

    #[test]
    fn entries_spread_over_effect_length() {
        let cmd = define(";command ramp $len $peak=100\nzoom_top = 0\n@\nzoom_top = $peak\n;end\n").unwrap();
        let out = cmd
            .execute(Tick::from_ticks(192), &args(&["192"]), &Options::default())
            .unwrap();
        assert_eq!(
            schedule(&out),
            vec![(192, "zoom_top".into(), "0".into()), (384, "zoom_top".into(), "100".into())]
        );
    }

    #[test]
    fn length_must_divide_between_lines() {
        let cmd = define(";command tri $len\n;print a\n@\n@\n@\n;print b\n;end\n").unwrap();
        let out = cmd.execute(Tick::ZERO, &args(&["96"]), &Options::default()).unwrap();
        assert_eq!(schedule(&out), vec![(0, "print".into(), "a".into()), (96, "print".into(), "b".into())]);

        assert_eq!(
            cmd.execute(Tick::ZERO, &args(&["100"]), &Options::default()).unwrap_err(),
            EvalError::LengthLineCountMismatch {
                length: "100".into(),
                lines: 3
            }
        );
        assert!(matches!(
            cmd.execute(Tick::ZERO, &args(&["-1"]), &Options::default()),
            Err(EvalError::InvalidEffectLength { .. })
        ));
    }

    #[test]
    fn oversized_lengths_are_rejected() {
        let cmd = define(";command ramp $len\nzoom_top = 0\n@\nzoom_top = 100\n;end\n").unwrap();
        assert_eq!(
            cmd.execute(Tick::from_ticks(48), &args(&["100000000000000000000"]), &Options::default())
                .unwrap_err(),
            EvalError::InvalidEffectLength {
                value: "100000000000000000000".into()
            }
        );
        assert!(matches!(
            cmd.execute(Tick::from_ticks(u64::MAX), &args(&["9007199254740992"]), &Options::default()),
            Err(EvalError::InvalidEffectLength { .. })
        ));
    }

    #[test]
    fn missing_arguments() {
        let cmd = define(";command foo $len $x\n;end\n").unwrap();
        assert_eq!(
            cmd.execute(Tick::ZERO, &args(&["48"]), &Options::default()).unwrap_err(),
            EvalError::MissingArgument { param: "$x".into() }
        );
    }

    #[test]
    fn default_length_comes_from_first_parameter() {
        let cmd = define(";command foo $len=48\n;print x\n@\n;print y\n;end\n").unwrap();
        let out = cmd.execute(Tick::ZERO, &[], &Options::default()).unwrap();
        assert_eq!(schedule(&out)[1].0, 48);
    }

    #[test]
    fn builtins_execute() {
        let mut curves = CurveEngine::new();
        let options = Options::default();
        let delta = args(&["DELTA", "5", "-5"]);
        let mut ctx = ExecContext {
            tick: Tick::from_ticks(48),
            args: &delta,
            curves: &mut curves,
            options: &options,
        };
        assert!(Command::CurveEdit(CurveName::ZoomSide).execute(&mut ctx).unwrap().is_empty());
        assert!(Command::Null.execute(&mut ctx).unwrap().is_empty());
        assert!(Command::Print.execute(&mut ctx).unwrap().is_empty());
        assert_eq!(
            Command::Error.execute(&mut ctx).unwrap_err(),
            EvalError::UserError {
                message: "DELTA 5 -5".into()
            }
        );

        let bad = args(&["abc"]);
        ctx.args = &bad;
        assert!(matches!(
            Command::CurveEdit(CurveName::ZoomSide).execute(&mut ctx),
            Err(EvalError::Curve(_))
        ));

        curves.apply_edits();
        assert_eq!(curves.curve(CurveName::ZoomSide).keys().len(), 1);
    }

    #[test]
    fn table_lookup_is_case_insensitive() {
        let mut table = CommandTable::with_builtins();
        assert!(table.contains("PRINT"));
        assert!(table.get("tilt").is_some_and(Command::is_curve_edit));
        assert!(!table.contains("shake"));

        table.define(define(";command shake $len\n;end\n").unwrap());
        assert!(table.contains("Shake"));
        assert_eq!(table.user_commands(), vec!["shake"]);
        assert!(table.user_command("shake").is_some());
    }
}
