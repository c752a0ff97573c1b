//! End-to-end runs of the drawschema binary

use std::path::Path;
use std::process::{Command, Output};

const LIBRARY: &str = r#"<mxfile><diagram name="Page-1"><mxGraphModel><root>
    <mxCell id="0"/><mxCell id="1" parent="0"/>
    <object id="author" label="Author" EN="AUTHOR" tags="_класс"><mxCell parent="1" vertex="1"/></object>
    <object id="author_id" label="Id" EN="ID" tags="_атрибут" DATA_TYPE="NUMBER"><mxCell parent="author" vertex="1"/></object>
    <object id="author_name" label="Name" EN="NAME" tags="_атрибут"><mxCell parent="author" vertex="1"/></object>
    <object id="book" label="Book" EN="BOOK" tags="_класс"><mxCell parent="1" vertex="1"/></object>
    <object id="book_author" label="Author" EN="AUTHOR" tags="_атрибут"><mxCell parent="book" vertex="1"/></object>
    <UserObject id="rel" refAttribute="AUTHOR_ID"><mxCell edge="1" parent="1" source="book_author" target="author" style="startArrow=ERoneToMany;endArrow=none;"/></UserObject>
</root></mxGraphModel></diagram></mxfile>"#;

fn run(args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_drawschema"))
        .args(args)
        .env("DRAWSCHEMA_LOG_LEVEL", "off")
        .env("NO_COLOR", "1")
        .output()
        .expect("failed to spawn drawschema")
}

fn write_library(dir: &Path) -> String {
    let path = dir.join("library.drawio");
    std::fs::write(&path, LIBRARY).unwrap();
    path.to_string_lossy().into_owned()
}

#[test]
fn test_inspect_prints_model_json() {
    let dir = tempfile::tempdir().unwrap();
    let input = write_library(dir.path());

    let output = run(&["inspect", "-i", &input]);
    assert!(output.status.success());

    let model: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(model["candidates"].as_array().unwrap().len(), 1);
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("======== Classes and attributes ========"));
}

#[test]
fn test_plan_reports_missing_relation_fields() {
    let dir = tempfile::tempdir().unwrap();
    let input = write_library(dir.path());
    let log = dir.path().join("run.log");

    let output = run(&[
        "plan",
        "-i",
        &input,
        "--log-file",
        log.to_str().unwrap(),
    ]);
    assert!(output.status.success());

    let plan: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    let tables = plan["plan"]["new_tables"].as_array().unwrap();
    assert_eq!(tables.len(), 2);
    assert_eq!(tables[0]["id"], "AUTHOR");

    let log_text = std::fs::read_to_string(&log).unwrap();
    assert!(log_text.contains("======== Relations ========"));
    assert!(log_text.contains("ERROR: "));
    assert!(!log_text.contains("\x1b["));
}

#[test]
fn test_sync_apply_then_replan_is_empty() {
    let dir = tempfile::tempdir().unwrap();
    let input = write_library(dir.path());
    let snapshot = dir.path().join("schema.json");
    let snapshot = snapshot.to_str().unwrap();

    let output = run(&["sync", "-i", &input, "--snapshot", snapshot, "--apply"]);
    assert!(output.status.success());
    let report: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(report["applied"], true);
    assert_eq!(report["relations"].as_array().unwrap().len(), 1);

    let output = run(&["plan", "-i", &input, "--snapshot", snapshot]);
    assert!(output.status.success());
    let plan: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert!(plan["plan"]["new_tables"].as_array().unwrap().is_empty());
}

#[test]
fn test_missing_input_fails() {
    let output = run(&["plan", "-i", "/nonexistent/library.drawio"]);
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("Failed to read input file"));
}

#[test]
fn test_malformed_diagram_fails() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("broken.drawio");
    std::fs::write(&input, "<mxfile><diagram>").unwrap();

    let output = run(&["inspect", "-i", input.to_str().unwrap()]);
    assert!(!output.status.success());
}
