//! Script files with imports, loaded from disk.

use std::fs;
use std::path::Path;

use tempfile::TempDir;

use lanefx::script::LoadError;
use lanefx::{Chart, Config, Interpreter, Script, Tick};

const CHART: &str = "t=120\r\n--\r\n;wide 192\r\n0000|00|--\r\n0000|00|--\r\n--\r\n0000|00|--\r\n--\r\n";

fn write(dir: &Path, name: &str, text: &str) {
    fs::write(dir.join(name), text).unwrap();
}

#[test]
fn imported_commands_run_against_the_chart() {
    let dir = TempDir::new().unwrap();
    fs::create_dir(dir.path().join("fx")).unwrap();
    write(
        &dir.path().join("fx"),
        "wide.kle",
        ";import stdlib\n;command wide $len\n;ramp_top $len 40\n;end\n",
    );
    write(dir.path(), "main.kle", ";import fx/wide.kle\n");

    let script = Script::load(&dir.path().join("main.kle")).unwrap();
    let interpreter = Interpreter::new(script, Config::default().options());
    assert!(interpreter.commands().user_command("wide").is_some());
    assert!(interpreter.commands().user_command("ramp_top").is_some());

    let mut chart = Chart::parse(CHART).unwrap();
    interpreter.process(&mut chart).unwrap();
    let top: Vec<&str> = chart
        .line_at(Tick::from_ticks(192))
        .unwrap()
        .modifier_values("zoom_top")
        .collect();
    assert_eq!(top, vec!["40", "0"]);
    let start: Vec<&str> = chart
        .line_at(Tick::ZERO)
        .unwrap()
        .modifier_values("zoom_top")
        .collect();
    assert_eq!(start, vec!["0"]);
}

#[test]
fn later_definitions_override_imports() {
    let dir = TempDir::new().unwrap();
    write(dir.path(), "lib.kle", ";command wide $len\nzoom_top = 0\n@\nzoom_top = 10\n;end\n");
    write(
        dir.path(),
        "main.kle",
        ";import lib.kle\n;command wide $len\nzoom_bottom = 0\n@\nzoom_bottom = 10\n;end\n",
    );

    let script = Script::load(&dir.path().join("main.kle")).unwrap();
    let mut chart = Chart::parse(CHART).unwrap();
    Interpreter::new(script, Default::default()).process(&mut chart).unwrap();
    let line = chart.line_at(Tick::from_ticks(192)).unwrap();
    assert_eq!(line.modifier_values("zoom_top").count(), 0);
    assert_eq!(line.modifier_values("zoom_bottom").collect::<Vec<_>>(), vec!["10", "0"]);
}

#[test]
fn load_errors_name_the_failing_file() {
    let dir = TempDir::new().unwrap();
    write(dir.path(), "broken.kle", ";command wide $len\n;if 1\n;end\n");
    write(dir.path(), "main.kle", ";import broken.kle\n");

    let err = Script::load(&dir.path().join("main.kle")).unwrap_err();
    match err {
        LoadError::Parse { origin, source } => {
            assert!(origin.ends_with("broken.kle"), "{origin}");
            assert_eq!(source.line(), 1);
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn missing_script_file() {
    let dir = TempDir::new().unwrap();
    let err = Script::load(&dir.path().join("absent.kle")).unwrap_err();
    assert!(matches!(err, LoadError::Io { .. }));
}
