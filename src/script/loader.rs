//! Script loading with imports.
//!
//! Each file is parsed once per loader; importing it again hands out the same
//! shared command table. `stdlib` names the library bundled into the binary.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::rc::Rc;

use super::error::{DefinitionError, LoadError};
use super::parse_script;
use crate::interp::{CommandTable, UserCommand};

/// Import target that resolves to the bundled library.
pub const STDLIB_NAME: &str = "stdlib";

const STDLIB_SOURCE: &str = include_str!("../../stdlib/stdlib.kle");

#[derive(Debug, Default)]
pub struct ScriptLoader {
    cache: HashMap<PathBuf, Rc<CommandTable>>,
    loading: Vec<PathBuf>,
    parsed: usize,
}

impl ScriptLoader {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of sources parsed so far.
    pub fn parsed(&self) -> usize {
        self.parsed
    }

    /// Load a script file, reusing the cached table if it was loaded before.
    pub fn load_file(&mut self, path: &Path) -> Result<Rc<CommandTable>, LoadError> {
        let path = path.canonicalize().map_err(|source| LoadError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        if let Some(table) = self.cache.get(&path) {
            return Ok(Rc::clone(table));
        }
        if self.loading.contains(&path) {
            return Err(LoadError::ImportCycle { path });
        }

        let source = std::fs::read_to_string(&path).map_err(|source| LoadError::Io {
            path: path.clone(),
            source,
        })?;
        let base_dir = path.parent().map(Path::to_path_buf).unwrap_or_default();

        self.loading.push(path.clone());
        let loaded = self.load_source(&source, &path.display().to_string(), &base_dir);
        self.loading.pop();

        let table = loaded?;
        self.cache.insert(path, Rc::clone(&table));
        Ok(table)
    }

    /// Load script text whose imports resolve against `base_dir`.
    pub fn load_source(&mut self, source: &str, origin: &str, base_dir: &Path) -> Result<Rc<CommandTable>, LoadError> {
        self.parsed += 1;
        let root = parse_script(source).map_err(|source| LoadError::Parse {
            origin: origin.to_string(),
            source,
        })?;
        log::trace!("{origin}:\n{}", root.dump());

        let definition_error = |source| LoadError::Definition {
            origin: origin.to_string(),
            source,
        };

        let mut table = CommandTable::with_builtins();
        for node in root.children {
            match node.name.as_str() {
                "command" => {
                    let command = UserCommand::from_node(node).map_err(definition_error)?;
                    log::debug!("{origin}: defined `{}`", command.name);
                    table.define(command);
                }
                "import" => {
                    if node.args.is_empty() {
                        return Err(definition_error(DefinitionError::MissingImportPath { line: node.line }));
                    }
                    let target = node.args.join(" ");
                    let imported = self.import(&target, base_dir)?;
                    table.extend_from(&imported);
                }
                _ => log::warn!(
                    "{origin}: line {}: `{}` outside a command is ignored",
                    node.line,
                    node.raw_name
                ),
            }
        }
        Ok(Rc::new(table))
    }

    fn import(&mut self, target: &str, base_dir: &Path) -> Result<Rc<CommandTable>, LoadError> {
        if target == STDLIB_NAME {
            let key = PathBuf::from(STDLIB_NAME);
            if let Some(table) = self.cache.get(&key) {
                return Ok(Rc::clone(table));
            }
            let table = self.load_source(STDLIB_SOURCE, STDLIB_NAME, base_dir)?;
            self.cache.insert(key, Rc::clone(&table));
            return Ok(table);
        }
        self.load_file(&base_dir.join(target))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn write(dir: &TempDir, name: &str, text: &str) -> PathBuf {
        let path = dir.path().join(name);
        fs::write(&path, text).unwrap();
        path
    }

    #[test]
    fn shared_imports_parse_once() {
        let dir = TempDir::new().unwrap();
        write(&dir, "common.kle", ";command wave $len\nzoom_side = 0\n@\nzoom_side = 10\n;end\n");
        write(&dir, "a.kle", ";import common.kle\n");
        write(&dir, "b.kle", ";include common.kle\n");
        let main = write(&dir, "main.kle", ";import a.kle\n;import b.kle\n");

        let mut loader = ScriptLoader::new();
        let table = loader.load_file(&main).unwrap();
        assert_eq!(table.user_commands(), vec!["wave"]);
        assert_eq!(loader.parsed(), 4);

        let common = loader.load_file(&dir.path().join("common.kle")).unwrap();
        let again = loader.load_file(&dir.path().join("common.kle")).unwrap();
        assert!(Rc::ptr_eq(&common, &again));
        assert_eq!(loader.parsed(), 4);
    }

    #[test]
    fn imports_resolve_relative_to_the_importing_file() {
        let dir = TempDir::new().unwrap();
        fs::create_dir(dir.path().join("lib")).unwrap();
        write(&dir, "lib/inner.kle", ";command inner $len\n;end\n");
        write(&dir, "lib/outer.kle", ";import inner.kle\n");
        let main = write(&dir, "main.kle", ";import lib/outer.kle\n");

        let table = ScriptLoader::new().load_file(&main).unwrap();
        assert!(table.user_command("inner").is_some());
    }

    #[test]
    fn import_cycles_are_reported() {
        let dir = TempDir::new().unwrap();
        write(&dir, "a.kle", ";import b.kle\n");
        write(&dir, "b.kle", ";import a.kle\n");
        let err = ScriptLoader::new().load_file(&dir.path().join("a.kle")).unwrap_err();
        assert!(matches!(err, LoadError::ImportCycle { .. }));
    }

    #[test]
    fn missing_files_are_io_errors() {
        let dir = TempDir::new().unwrap();
        let main = write(&dir, "main.kle", ";import nowhere.kle\n");
        let err = ScriptLoader::new().load_file(&main).unwrap_err();
        assert!(matches!(err, LoadError::Io { .. }));
    }

    #[test]
    fn stdlib_is_bundled() {
        let mut loader = ScriptLoader::new();
        let table = loader.load_source(";import stdlib\n;import stdlib\n", "test", Path::new(".")).unwrap();
        assert!(table.user_command("ramp_top").is_some());
        assert_eq!(loader.parsed(), 2);
    }

    #[test]
    fn definition_errors_carry_origin() {
        let err = ScriptLoader::new()
            .load_source(";command print\n;end\n", "test.kle", Path::new("."))
            .unwrap_err();
        assert!(matches!(err, LoadError::Definition { ref origin, .. } if origin == "test.kle"));
        let err = ScriptLoader::new().load_source(";import\n", "x", Path::new(".")).unwrap_err();
        assert!(matches!(
            err,
            LoadError::Definition {
                source: DefinitionError::MissingImportPath { line: 1 },
                ..
            }
        ));
    }
}
