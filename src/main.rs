//! lanefx: apply KLE lane effect scripts to KSH charts.

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{ArgAction, Parser, ValueEnum};

use lanefx::{Chart, Config, Error, Export, Interpreter, Script};

#[derive(Parser, Debug)]
#[command(name = "lanefx", version, about, long_about = None)]
struct Cli {
    /// Input then output chart; --in and --out take precedence
    #[arg(value_name = "FILES", num_args = 0..=2)]
    files: Vec<PathBuf>,

    /// Input chart
    #[arg(short = 'i', long = "in", value_name = "FILE")]
    input: Option<PathBuf>,

    /// Output chart
    #[arg(short = 'o', long = "out", value_name = "FILE")]
    output: Option<PathBuf>,

    /// Effect script to apply
    #[arg(short = 'k', long = "kle", value_name = "FILE")]
    script: Option<PathBuf>,

    /// Also write a flattened note/laser export of the processed chart
    #[arg(short = 'l', long = "lua", visible_alias = "export", value_name = "FILE")]
    export: Option<PathBuf>,

    /// Format of the export file
    #[arg(long, value_enum, default_value_t = ExportFormat::Lua)]
    export_format: ExportFormat,

    /// Load configuration from a specific file
    #[arg(short = 'c', long = "config", value_name = "FILE")]
    config: Option<PathBuf>,

    /// Increase logging verbosity (repeat for more detail)
    #[arg(short = 'v', long = "verbose", action = ArgAction::Count)]
    verbosity: u8,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum ExportFormat {
    Lua,
    Yaml,
}

fn init_logging(verbosity: u8) {
    let level = match verbosity {
        0 => log::LevelFilter::Info,
        1 => log::LevelFilter::Debug,
        _ => log::LevelFilter::Trace,
    };
    env_logger::Builder::new()
        .filter_level(level)
        .format_timestamp(None)
        .parse_default_env()
        .init();
}

fn read(path: &Path) -> Result<String, Error> {
    std::fs::read_to_string(path).map_err(io_error(path))
}

fn io_error(path: &Path) -> impl FnOnce(std::io::Error) -> Error + '_ {
    move |source| Error::Io {
        path: path.to_path_buf(),
        source,
    }
}

fn staging_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().unwrap_or_default().to_os_string();
    name.push(".lanefx-tmp");
    path.with_file_name(name)
}

/// Write every file beside its target, then rename them all into place.
///
/// A failed write removes the staged files and leaves every target as it was.
fn write_all(files: &[(&Path, &str)]) -> Result<(), Error> {
    let mut staged = Vec::with_capacity(files.len());
    for (path, contents) in files {
        let tmp = staging_path(path);
        if let Err(source) = std::fs::write(&tmp, contents) {
            for done in &staged {
                let _ = std::fs::remove_file(done);
            }
            return Err(io_error(path)(source));
        }
        staged.push(tmp);
    }
    for ((path, _), tmp) in files.iter().zip(&staged) {
        std::fs::rename(tmp, path).map_err(io_error(path))?;
        log::info!("wrote {}", path.display());
    }
    Ok(())
}

fn render_export(chart: &Chart, format: ExportFormat) -> Result<String, Error> {
    let export = Export::from_chart(chart);
    log::debug!(
        "export: {} measures, {} notes, {} laser segments",
        export.measure_times.len(),
        export.notes.len(),
        export.lasers.len()
    );
    match format {
        ExportFormat::Lua => Ok(export.to_lua()),
        ExportFormat::Yaml => Ok(export.to_yaml()?),
    }
}

fn run(cli: Cli, input: &Path, output: &Path) -> Result<(), Error> {
    let config = match &cli.config {
        Some(path) => Config::load(path)?,
        None => Config::load_default()?,
    };

    let text = read(input)?;
    let mut chart = Chart::parse(&text)?;
    log::info!("loaded {} ({} lines)", input.display(), chart.line_count());

    let script = match cli.script.as_ref().or(config.default_script.as_ref()) {
        Some(path) => {
            log::info!("loading script {}", path.display());
            Script::load(path)?
        }
        None => Script::builtin(),
    };

    let interpreter = Interpreter::new(script, config.options());
    let summary = interpreter.process(&mut chart)?;
    log::info!(
        "ran {} command(s), {} skipped, {} unknown",
        summary.executed,
        summary.skipped,
        summary.unknown
    );

    let rendered_chart = chart.to_string();
    let rendered_export = match &cli.export {
        Some(path) => Some((path.as_path(), render_export(&chart, cli.export_format)?)),
        None => None,
    };

    let mut files = vec![(output, rendered_chart.as_str())];
    if let Some((path, text)) = &rendered_export {
        files.push((*path, text.as_str()));
    }
    write_all(&files)?;
    Ok(())
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbosity);

    // Positional files fill whichever of input/output no flag named.
    let mut positional = cli.files.iter().cloned();
    let input = cli.input.clone().or_else(|| positional.next());
    let output = cli.output.clone().or_else(|| positional.next());
    let (Some(input), Some(output)) = (input, output) else {
        eprintln!("lanefx: both an input and an output chart are required (see --help)");
        return ExitCode::from(2);
    };

    match run(cli, &input, &output) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            log::error!("{e}");
            ExitCode::FAILURE
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn writes_every_file() {
        let dir = TempDir::new().unwrap();
        let chart = dir.path().join("out.ksh");
        let export = dir.path().join("out.lua");
        write_all(&[(chart.as_path(), "chart"), (export.as_path(), "export")]).unwrap();
        assert_eq!(std::fs::read_to_string(&chart).unwrap(), "chart");
        assert_eq!(std::fs::read_to_string(&export).unwrap(), "export");
        assert!(!staging_path(&chart).exists());
    }

    #[test]
    fn failed_export_leaves_chart_untouched() {
        let dir = TempDir::new().unwrap();
        let chart = dir.path().join("out.ksh");
        std::fs::write(&chart, "before").unwrap();
        let export = dir.path().join("missing").join("out.lua");

        let err = write_all(&[(chart.as_path(), "after"), (export.as_path(), "export")]).unwrap_err();
        assert!(matches!(err, Error::Io { ref path, .. } if *path == export));
        assert_eq!(std::fs::read_to_string(&chart).unwrap(), "before");
        assert!(!staging_path(&chart).exists());
    }
}
