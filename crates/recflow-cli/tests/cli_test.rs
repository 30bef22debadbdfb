use assert_cmd::prelude::*;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;

fn repo_root() -> PathBuf {
    let manifest_dir = Path::new(env!("CARGO_MANIFEST_DIR"));
    manifest_dir
        .parent()
        .and_then(|p| p.parent())
        .expect("expected crates/<name> layout")
        .to_path_buf()
}

fn tasks(name: &str) -> String {
    let path = repo_root().join("fixtures").join("tasks").join(name);
    assert!(path.exists(), "fixture missing: {}", path.display());
    path.to_string_lossy().into_owned()
}

fn cli(args: &[&str]) -> Command {
    let exe = assert_cmd::cargo_bin!("recflow-cli");
    let mut cmd = Command::new(exe);
    cmd.current_dir(repo_root()).args(args);
    cmd
}

fn stdout_json(cmd: &mut Command) -> serde_json::Value {
    let out = cmd.output().expect("run recflow-cli");
    assert!(
        out.status.success(),
        "stderr: {}",
        String::from_utf8_lossy(&out.stderr)
    );
    serde_json::from_slice(&out.stdout).expect("stdout is JSON")
}

#[test]
fn validate_accepts_the_fixture_config() {
    let base = tasks("base.json");
    let config = tasks("config.json");
    let v = stdout_json(&mut cli(&["validate", "--base", &base, "--config", &config]));
    assert_eq!(v["isValid"], true);
    assert!(v["message"].is_null());
}

#[test]
fn validate_rejects_a_link_field_into_another_table() {
    let base = tasks("base.json");
    let config = tasks("config.json");
    cli(&[
        "validate",
        "--base",
        &base,
        "--config",
        &config,
        "--set",
        "fieldId=fldOwner",
    ])
    .assert()
    .code(3);
}

#[test]
fn graph_prints_nodes_and_edges() {
    let base = tasks("base.json");
    let config = tasks("config.json");
    let v = stdout_json(&mut cli(&["graph", "--base", &base, "--config", &config]));
    assert_eq!(v["kind"], "graph");
    assert_eq!(v["nodes"].as_array().map(Vec::len), Some(3));
    assert_eq!(v["edges"].as_array().map(Vec::len), Some(2));
    assert_eq!(v["edges"][0]["fromId"], "recA");
    assert_eq!(v["edges"][0]["toId"], "recB");
}

#[test]
fn dot_follows_the_chart_orientation() {
    let base = tasks("base.json");
    let config = tasks("config.json");
    let out = cli(&["dot", "--base", &base, "--config", &config])
        .output()
        .expect("run");
    assert!(out.status.success());
    let dot = String::from_utf8(out.stdout).expect("utf8");
    assert!(dot.starts_with("digraph \"Release chain\""), "{dot}");
    assert!(dot.contains("rankdir=TB"));
    assert!(dot.contains("\"recA\" -> \"recB\";"));

    let out = cli(&[
        "dot",
        "--base",
        &base,
        "--config",
        &config,
        "--set",
        "chartOrientation=horizontal",
    ])
    .output()
    .expect("run");
    let dot = String::from_utf8(out.stdout).expect("utf8");
    assert!(dot.contains("rankdir=LR"));
}

#[test]
fn empty_view_exits_without_drawing() {
    let base = tasks("base.json");
    let config = tasks("config.json");
    let out = cli(&[
        "render",
        "--base",
        &base,
        "--config",
        &config,
        "--set",
        "viewId=viwNone",
    ])
    .output()
    .expect("run");
    assert_eq!(out.status.code(), Some(3));
    assert!(String::from_utf8_lossy(&out.stderr).contains("Add some records"));
}

#[test]
fn render_writes_svg_named_after_the_view() {
    let base = tasks("base.json");
    let config = tasks("config.json");
    let tmp = tempfile::tempdir().expect("tempdir");
    let out_dir = tmp.path().to_string_lossy().into_owned();

    cli(&[
        "render", "--base", &base, "--config", &config, "--out-dir", &out_dir,
    ])
    .assert()
    .success();

    let svg = fs::read_to_string(tmp.path().join("Release chain.svg")).expect("read svg");
    assert!(svg.starts_with("<?xml"));
    for id in ["recA", "recB", "recC"] {
        assert!(svg.contains(&format!(r#"id="{id}""#)), "{id}");
    }
}

#[test]
fn render_png_is_twice_the_natural_size() {
    let base = tasks("base.json");
    let config = tasks("config.json");
    let tmp = tempfile::tempdir().expect("tempdir");
    let out_dir = tmp.path().to_string_lossy().into_owned();

    for format in ["svg", "png"] {
        cli(&[
            "render", "--base", &base, "--config", &config, "--format", format, "--out-dir",
            &out_dir,
        ])
        .assert()
        .success();
    }

    let svg = fs::read_to_string(tmp.path().join("Release chain.svg")).expect("read svg");
    let doc = root_size(&svg);

    let file = fs::File::open(tmp.path().join("Release chain.png")).expect("open png");
    let decoder = png::Decoder::new(file);
    let reader = decoder.read_info().expect("png header");
    let info = reader.info();
    assert_eq!(info.width, (doc.0 * 2.0).ceil() as u32);
    assert_eq!(info.height, (doc.1 * 2.0).ceil() as u32);
}

/// Reads `width`/`height` off the root start tag.
fn root_size(svg: &str) -> (f64, f64) {
    let start = svg.find("<svg").expect("svg root");
    let end = start + svg[start..].find('>').expect("root tag end");
    let tag = &svg[start..end];
    let attr = |name: &str| -> f64 {
        let needle = format!(" {name}=\"");
        let at = tag.find(&needle).expect(name) + needle.len();
        let len = tag[at..].find('"').expect("closing quote");
        tag[at..at + len]
            .trim_end_matches("pt")
            .trim_end_matches("px")
            .parse()
            .expect("numeric size")
    };
    (attr("width"), attr("height"))
}

#[test]
fn resolve_finds_the_record_behind_a_text_element() {
    let base = tasks("base.json");
    let config = tasks("config.json");
    let v = stdout_json(&mut cli(&[
        "resolve", "--base", &base, "--config", &config, "recB/2",
    ]));
    assert_eq!(v["target"], "recB/2");
    assert_eq!(v["record"]["id"], "recB");
    assert_eq!(v["record"]["name"], "Build");

    let v = stdout_json(&mut cli(&[
        "resolve", "--base", &base, "--config", &config, "/",
    ]));
    assert!(v["record"].is_null());
}

#[test]
fn missing_base_is_a_usage_error() {
    cli(&["validate"]).assert().code(2);
    let base = tasks("base.json");
    cli(&["graph", "--base", &base, "recA"]).assert().code(2);
}

#[test]
fn graph_and_dot_report_an_empty_view() {
    let base = tasks("base.json");
    let config = tasks("config.json");
    let out = cli(&[
        "graph", "--base", &base, "--config", &config, "--set", "viewId=viwNone",
    ])
    .output()
    .expect("run");
    assert_eq!(out.status.code(), Some(3));
    let v: serde_json::Value = serde_json::from_slice(&out.stdout).expect("stdout is JSON");
    assert_eq!(v["kind"], "empty");

    let out = cli(&[
        "dot", "--base", &base, "--config", &config, "--set", "viewId=viwNone",
    ])
    .output()
    .expect("run");
    assert_eq!(out.status.code(), Some(3));
    assert!(out.stdout.is_empty());
}

#[test]
fn stored_unknown_style_values_fall_back_to_defaults() {
    let base = tasks("base.json");
    let tmp = tempfile::tempdir().expect("tempdir");
    let config = tmp.path().join("config.json");
    fs::write(
        &config,
        r#"{"tableId":"tblTasks","viewId":"viwChain","fieldId":"fldNext","linkStyle":"bogus","chartOrientation":"sideways"}"#,
    )
    .expect("write config");
    let config = config.to_string_lossy().into_owned();

    let out = cli(&["dot", "--base", &base, "--config", &config])
        .output()
        .expect("run");
    assert!(
        out.status.success(),
        "stderr: {}",
        String::from_utf8_lossy(&out.stderr)
    );
    let dot = String::from_utf8(out.stdout).expect("utf8");
    assert!(dot.contains("rankdir=TB"));
    assert!(dot.contains("splines=ortho"));
}
