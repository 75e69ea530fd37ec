#![cfg(feature = "cli")]

use std::path::{Path, PathBuf};
use std::process::{Command, Output};

use tempfile::TempDir;

const SCENARIO: &str = r#"
[image]
name = "scenario"
slots_nb = 2
frame_size = 8

[[slots]]
name = "liftoff"
[[slots.frames]]
cmde = "state"
args = [1]
[[slots.frames]]
cmde = "state"
args = [2]
[[slots.frames]]
cmde = "state"
args = [3]

[[slots]]
name = "spare"
[[slots.frames]]
cmde = "null"
"#;

fn write_table(dir: &TempDir, name: &str, text: &str) -> PathBuf {
    let path = dir.path().join(name);
    std::fs::write(&path, text).expect("table should be writable");
    path
}

fn scalpgen(args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_scalpgen"))
        .args(["--log-level", "error"])
        .args(args)
        .output()
        .expect("scalpgen should run")
}

fn path_str(path: &Path) -> &str {
    path.to_str().expect("temp paths are utf-8")
}

#[test]
fn compile_bin_places_containers_and_sequences() {
    let dir = tempfile::tempdir().expect("tempdir");
    let table = write_table(&dir, "scenario.toml", SCENARIO);
    let out = dir.path().join("scenario.bin");

    let output = scalpgen(&[
        "--format",
        "json",
        "compile",
        path_str(&table),
        "-o",
        path_str(&out),
    ]);
    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));

    let bytes = std::fs::read(&out).expect("artifact should exist");
    assert_eq!(bytes.len(), 40);
    assert_eq!(&bytes[0..8], &[0x00, 0x00, 0xff, 0x01, 0x23, 0x00, 0x10, 0x03]);
    assert_eq!(&bytes[8..16], &[0x00, 0x00, 0xff, 0x00, 0x00, 0x00, 0x00, 0x00]);
    assert_eq!(&bytes[16..24], &[0x00, 0x00, 0xff, 0x02, 0x01, 0x01, 0x00, 0x00]);
    assert_eq!(&bytes[24..32], &[0x00, 0x00, 0xff, 0x02, 0x01, 0x02, 0x00, 0x00]);
    assert_eq!(&bytes[32..40], &[0x00, 0x00, 0xff, 0x02, 0x01, 0x03, 0x00, 0x00]);

    let summary: serde_json::Value =
        serde_json::from_slice(&output.stdout).expect("summary should be json");
    assert_eq!(summary["emit"], "bin");
    assert_eq!(summary["frames"], 5);
    assert_eq!(summary["extended_frames"], 3);
    assert_eq!(summary["image_bytes"], 40);
}

#[test]
fn compile_hex_records_checksum_to_zero() {
    let dir = tempfile::tempdir().expect("tempdir");
    let table = write_table(&dir, "scenario.toml", SCENARIO);
    let out = dir.path().join("scenario.hex");

    let output = scalpgen(&["compile", path_str(&table), "-o", path_str(&out), "--eof-record"]);
    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));

    let text = std::fs::read_to_string(&out).expect("artifact should exist");
    let lines: Vec<&str> = text.lines().collect();
    assert_eq!(lines.len(), 1 + 5 + 1);
    assert_eq!(lines[0], ":02000004008179");
    assert_eq!(lines[6], ":00000001ff");
    for line in &lines {
        assert!(line.starts_with(':'));
        let sum = (1..line.len())
            .step_by(2)
            .map(|i| u8::from_str_radix(&line[i..i + 2], 16).expect("hex digits"))
            .fold(0u8, |acc, b| acc.wrapping_add(b));
        assert_eq!(sum, 0, "{line}");
    }
    assert!(lines[2].starts_with(":08000800"));
}

#[test]
fn compile_listing_to_stdout() {
    let dir = tempfile::tempdir().expect("tempdir");
    let table = write_table(&dir, "scenario.toml", SCENARIO);

    let output = scalpgen(&["compile", path_str(&table)]);
    assert!(output.status.success());
    let text = String::from_utf8_lossy(&output.stdout);
    assert!(text.starts_with("#include \"dispatcher.h\""));
    assert!(text.contains("//-> scenario :"));
    assert!(text.contains("\t// slot 0 (liftoff)"));
    assert_eq!(text.matches("//-- start of extended zone --").count(), 1);
    assert_eq!(text.matches(".dest =").count(), 5);
}

#[test]
fn compile_is_deterministic() {
    let dir = tempfile::tempdir().expect("tempdir");
    let table = write_table(&dir, "scenario.toml", SCENARIO);
    let first = dir.path().join("first.hex");
    let second = dir.path().join("second.hex");

    assert!(scalpgen(&["compile", path_str(&table), "-o", path_str(&first)]).status.success());
    assert!(scalpgen(&["compile", path_str(&table), "-o", path_str(&second)]).status.success());
    assert_eq!(
        std::fs::read(&first).expect("first"),
        std::fs::read(&second).expect("second")
    );
}

#[test]
fn slot_count_mismatch_writes_nothing() {
    let dir = tempfile::tempdir().expect("tempdir");
    let table = write_table(
        &dir,
        "bad.toml",
        &SCENARIO.replace("slots_nb = 2", "slots_nb = 3"),
    );
    let out = dir.path().join("bad.hex");

    let output = scalpgen(&["compile", path_str(&table), "-o", path_str(&out)]);
    assert_eq!(output.status.code(), Some(60));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("slots number inconsistent"), "{stderr}");
    assert!(!out.exists());
}

#[test]
fn too_many_arguments_is_reported_with_position() {
    let dir = tempfile::tempdir().expect("tempdir");
    let table = write_table(
        &dir,
        "wide.toml",
        r#"
[image]
slots_nb = 1
frame_size = 8

[[slots]]
[[slots.frames]]
cmde = "servo_info"
args = [0xc0, 0x5a, 0x09, -15]
"#,
    );
    let out = dir.path().join("wide.hex");

    let output = scalpgen(&["compile", path_str(&table), "-o", path_str(&out)]);
    assert_eq!(output.status.code(), Some(60));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("slot 0, frame 0"), "{stderr}");
    assert!(!out.exists());
}

#[test]
fn missing_table_is_a_failure() {
    let dir = tempfile::tempdir().expect("tempdir");
    let missing = dir.path().join("missing.toml");
    let output = scalpgen(&["check", path_str(&missing)]);
    assert_eq!(output.status.code(), Some(1));
}

#[test]
fn check_reports_layout_without_writing() {
    let dir = tempfile::tempdir().expect("tempdir");
    let table = write_table(&dir, "scenario.toml", SCENARIO);

    let output = scalpgen(&["--format", "json", "check", path_str(&table)]);
    assert!(output.status.success());
    let report: serde_json::Value =
        serde_json::from_slice(&output.stdout).expect("report should be json");
    assert_eq!(report["image_bytes"], 40);
    assert_eq!(report["records"][0]["description"], "Container(offset=0x0010, count=3, eeprom)");
    assert_eq!(report["records"][2]["zone"], "extended");
    assert_eq!(std::fs::read_dir(dir.path()).expect("dir").count(), 1);
}

#[test]
fn inspect_reads_compiled_hex_back() {
    let dir = tempfile::tempdir().expect("tempdir");
    let table = write_table(&dir, "scenario.toml", SCENARIO);
    let hex = dir.path().join("scenario.hex");
    assert!(scalpgen(&["compile", path_str(&table), "-o", path_str(&hex)]).status.success());

    let output = scalpgen(&[
        "--format",
        "json",
        "inspect",
        path_str(&hex),
        "--frame-size",
        "8",
    ]);
    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));
    let report: serde_json::Value =
        serde_json::from_slice(&output.stdout).expect("report should be json");
    assert_eq!(report["slots_nb"], 2);
    assert_eq!(report["consistent"], true);
    assert_eq!(report["extended_address"], 0x0081);
    assert_eq!(report["frames"][0]["relay"]["offset"], 16);
    assert_eq!(report["frames"][0]["relay"]["count"], 3);
    assert_eq!(report["frames"][4]["description"], "State(state=0x03)");
}

#[test]
fn inspect_flags_dangling_container() {
    let dir = tempfile::tempdir().expect("tempdir");
    let table = write_table(&dir, "scenario.toml", SCENARIO);
    let bin = dir.path().join("scenario.bin");
    assert!(scalpgen(&["compile", path_str(&table), "-o", path_str(&bin)]).status.success());

    let mut bytes = std::fs::read(&bin).expect("bin");
    bytes.truncate(32);
    std::fs::write(&bin, &bytes).expect("truncate");

    let output = scalpgen(&[
        "--format",
        "json",
        "inspect",
        path_str(&bin),
        "--binary",
        "--frame-size",
        "8",
        "--slots",
        "2",
    ]);
    assert_eq!(output.status.code(), Some(60));
    let report: serde_json::Value =
        serde_json::from_slice(&output.stdout).expect("report should be json");
    assert_eq!(report["consistent"], false);
}

#[test]
fn catalog_lists_builtin_commands() {
    let output = scalpgen(&["--format", "json", "catalog"]);
    assert!(output.status.success());
    let catalog: serde_json::Value =
        serde_json::from_slice(&output.stdout).expect("catalog should be json");
    let commands = catalog["commands"].as_array().expect("commands array");
    assert_eq!(commands.len(), 10);
    assert!(commands
        .iter()
        .any(|c| c["keyword"] == "servo_info" && c["code"] == 6 && c["arity"] == "4"));
}

#[test]
fn version_prints_package_version() {
    let output = scalpgen(&["version"]);
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert_eq!(stdout.trim(), format!("scalpgen {}", env!("CARGO_PKG_VERSION")));
}

#[test]
fn demo_table_compiles() {
    let demo = Path::new(env!("CARGO_MANIFEST_DIR")).join("../../demos/minut.toml");
    let dir = tempfile::tempdir().expect("tempdir");
    let out = dir.path().join("minut.hex");

    let output = scalpgen(&["compile", path_str(&demo), "-o", path_str(&out)]);
    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));

    let text = std::fs::read_to_string(&out).expect("artifact should exist");
    // extended address + 2 slot frames + 6 relayed frames
    assert_eq!(text.lines().count(), 1 + 2 + 6);
    assert!(text.lines().all(|l| l.len() == 1 + 2 * (4 + 11 + 1) || l.len() == 15));
}

#[test]
fn demo_container_carries_storage_selector() {
    let demo = Path::new(env!("CARGO_MANIFEST_DIR")).join("../../demos/minut.toml");
    let output = scalpgen(&["compile", path_str(&demo), "--emit", "bin"]);
    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));
    assert_eq!(output.stdout.len(), (2 + 6) * 11);
    // offset 0x0016 (end of the 2-slot zone), 6 frames, EEPROM selector
    assert_eq!(
        &output.stdout[..11],
        &[0x00, 0x00, 0xff, 0x01, 0x04, 0x00, 0x16, 0x06, 0x01, 0x00, 0x00]
    );
}

#[cfg(target_os = "linux")]
#[test]
fn stdout_write_failure_is_not_success() {
    use std::process::Stdio;

    let dir = tempfile::tempdir().expect("tempdir");
    let table = write_table(&dir, "scenario.toml", SCENARIO);
    let full = std::fs::OpenOptions::new()
        .write(true)
        .open("/dev/full")
        .expect("/dev/full should be writable");

    let output = Command::new(env!("CARGO_BIN_EXE_scalpgen"))
        .args(["--log-level", "error", "compile", path_str(&table), "--emit", "bin"])
        .stdout(Stdio::from(full))
        .output()
        .expect("scalpgen should run");
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("write stdout"), "{stderr}");
}
