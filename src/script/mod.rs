//! KLE script front end: source lines → token lines → block tree → commands.

pub mod ast;
pub mod error;
pub mod lexer;
pub mod loader;
pub mod parser;
pub mod token;

use std::path::Path;
use std::rc::Rc;

pub use ast::Node;
pub use error::{DefinitionError, LoadError, ParseError};
pub use loader::ScriptLoader;

use crate::interp::CommandTable;
use lexer::Lexer;
use parser::Parser;

/// Parse script source into its block tree.
pub fn parse_script(source: &str) -> Result<Node, ParseError> {
    let lines = Lexer::new(source).tokenize()?;
    Parser::new(lines).parse()
}

/// A loaded script: the built-ins plus every command it defines or imports.
#[derive(Debug, Clone)]
pub struct Script {
    commands: Rc<CommandTable>,
}

impl Script {
    /// Only the built-in commands.
    pub fn builtin() -> Self {
        Self {
            commands: Rc::new(CommandTable::with_builtins()),
        }
    }

    /// Load a script file and its imports.
    pub fn load(path: &Path) -> Result<Self, LoadError> {
        let commands = ScriptLoader::new().load_file(path)?;
        Ok(Self { commands })
    }

    /// Load script text; imports resolve against the working directory.
    pub fn from_source(source: &str) -> Result<Self, LoadError> {
        Self::from_source_in(source, Path::new("."))
    }

    /// Load script text with imports resolved against `base_dir`.
    pub fn from_source_in(source: &str, base_dir: &Path) -> Result<Self, LoadError> {
        let commands = ScriptLoader::new().load_source(source, "<script>", base_dir)?;
        Ok(Self { commands })
    }

    pub fn commands(&self) -> Rc<CommandTable> {
        Rc::clone(&self.commands)
    }
}

impl Default for Script {
    fn default() -> Self {
        Self::builtin()
    }
}
