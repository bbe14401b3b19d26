use std::fs;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};

fn fixture_root() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("../../fixtures/plate_with_hole")
}

fn provcheck(args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_provcheck"))
        .args(args)
        .env_remove("PROVCHECK_LOG")
        .output()
        .expect("run provcheck")
}

fn stdout(out: &Output) -> String {
    String::from_utf8_lossy(&out.stdout).into_owned()
}

fn stderr(out: &Output) -> String {
    String::from_utf8_lossy(&out.stderr).into_owned()
}

fn path_arg(path: &Path) -> String {
    path.to_string_lossy().into_owned()
}

#[test]
fn sparql_prints_the_generated_query() {
    let out = provcheck(&[
        "sparql",
        "--parameter",
        "element-size",
        "--metric",
        "max_von_mises_stress_nodes",
        "--tool",
        "fenics",
    ]);
    assert!(out.status.success(), "stderr: {}", stderr(&out));
    let text = stdout(&out);
    assert!(text.contains("PREFIX m4i: <http://w3id.org/nfdi4ing/metadata4ing#>"));
    assert!(text.contains("SELECT ?element_size ?max_von_mises_stress_nodes ?tool_name"));
    assert!(text.contains("\"fenics\""));
}

#[test]
fn query_csv_lists_every_matching_run() {
    let root = fixture_root();
    let out = provcheck(&[
        "query",
        "--provenance",
        &path_arg(&root),
        "--parameter",
        "element-size",
        "--parameter",
        "element-order",
        "--metric",
        "max_von_mises_stress_nodes",
        "--format",
        "csv",
    ]);
    assert!(out.status.success(), "stderr: {}", stderr(&out));
    let text = stdout(&out);
    let mut lines = text.lines();
    assert_eq!(
        lines.next(),
        Some("element-size,element-order,max_von_mises_stress_nodes,tool_name")
    );
    assert_eq!(lines.count(), 7);
    assert!(stderr(&out).contains("(7 rows)"));
}

#[test]
fn query_json_is_tagged_with_the_document() {
    let root = fixture_root();
    let out = provcheck(&[
        "query",
        "--provenance",
        &path_arg(&root.join("ro-crate-metadata.json")),
        "--parameter",
        "element-size",
        "--metric",
        "max_von_mises_stress_nodes",
        "--tool",
        "KRATOS",
        "--format",
        "json",
    ]);
    assert!(out.status.success(), "stderr: {}", stderr(&out));
    let parsed: serde_json::Value = serde_json::from_str(&stdout(&out)).expect("json output");
    let tables = parsed.as_array().expect("array of tables");
    assert_eq!(tables.len(), 1);
    assert!(tables[0]["locator"]
        .as_str()
        .expect("locator")
        .ends_with("ro-crate-metadata.json"));
    let rows = tables[0]["rows"].as_array().expect("rows");
    assert_eq!(rows.len(), 3);
    assert_eq!(rows[0][0], serde_json::json!(0.0125));
    assert_eq!(rows[0][2], serde_json::json!("Kratos Multiphysics 10.2"));
}

#[test]
fn truth_reads_tools_from_the_workflow_config() {
    let root = fixture_root();
    let out = provcheck(&[
        "truth",
        "--truth-root",
        &path_arg(&root.join("truth")),
        "--config",
        &path_arg(&root.join("workflow_config.json")),
        "--format",
        "csv",
    ]);
    assert!(out.status.success(), "stderr: {}", stderr(&out));
    let text = stdout(&out);
    assert!(text.starts_with("tool,element-size,max_von_mises_stress_nodes\n"));
    // the element-order=2 run is filtered out by default
    assert_eq!(text.lines().count(), 1 + 6);
    assert!(text.contains("fenics,0.025,297.46"));
    assert!(!text.contains("301.02"));
}

#[test]
fn validate_succeeds_and_writes_a_chart() {
    let root = fixture_root();
    let dir = tempfile::tempdir().expect("tempdir");
    let chart = dir.path().join("stress.svg");
    let out = provcheck(&[
        "validate",
        "--provenance",
        &path_arg(&root),
        "--truth-root",
        &path_arg(&root.join("truth")),
        "--config",
        &path_arg(&root.join("workflow_config.json")),
        "-o",
        &path_arg(&chart),
    ]);
    assert!(out.status.success(), "stderr: {}", stderr(&out));
    let log = stderr(&out);
    assert!(log.contains("validated"));
    assert!(log.contains("6 ground-truth entries"));

    let svg = fs::read_to_string(&chart).expect("chart written");
    assert!(svg.starts_with("<svg"));
    assert!(svg.contains("linear-elastic-plate-with-hole"));
    assert!(svg.contains("FEniCS-dolfinx v0.9"));
    assert!(svg.contains("Kratos Multiphysics 10.2"));
}

#[test]
fn validate_fails_when_ground_truth_drifts() {
    let root = fixture_root();
    let dir = tempfile::tempdir().expect("tempdir");
    for tool in ["fenics", "kratos"] {
        let target = dir.path().join(tool);
        fs::create_dir_all(&target).expect("mkdir");
        let text = fs::read_to_string(root.join("truth").join(tool).join("summary.json"))
            .expect("read truth");
        fs::write(target.join("summary.json"), text.replace("297.51", "297.61"))
            .expect("write truth");
    }

    let out = provcheck(&[
        "validate",
        "--provenance",
        &path_arg(&root),
        "--truth-root",
        &path_arg(dir.path()),
        "--tool",
        "fenics",
        "--tool",
        "kratos",
    ]);
    assert!(!out.status.success());
    let log = stderr(&out);
    assert!(log.contains("mismatch"));
    assert!(log.contains("(kratos, 0.025)"));
    assert!(log.contains("1 of 1 provenance document(s) disagree"));
}

/// Write one RO-Crate per tool under `root`, each holding only that tool's runs.
fn split_crate_per_tool(root: &Path, tools: &[&str]) {
    let text = fs::read_to_string(fixture_root().join("ro-crate-metadata.json")).expect("read crate");
    let doc: serde_json::Value = serde_json::from_str(&text).expect("crate json");
    for tool in tools {
        let mut part = doc.clone();
        let nodes = part["@graph"].as_array_mut().expect("@graph");
        nodes.retain(|node| {
            let id = node["@id"].as_str().unwrap_or_default();
            !["fenics", "kratos"].iter().any(|other| other != tool && id.contains(other))
        });
        let dir = root.join(tool);
        fs::create_dir_all(&dir).expect("mkdir");
        fs::write(
            dir.join("ro-crate-metadata.json"),
            serde_json::to_vec_pretty(&part).expect("json"),
        )
        .expect("write crate");
    }
}

fn validate_documents(provenance: &Path, extra: &[&str]) -> Output {
    let root = fixture_root();
    let mut args = vec![
        "validate".to_string(),
        "--provenance".to_string(),
        path_arg(provenance),
        "--truth-root".to_string(),
        path_arg(&root.join("truth")),
        "--config".to_string(),
        path_arg(&root.join("workflow_config.json")),
    ];
    args.extend(extra.iter().map(|a| a.to_string()));
    let args: Vec<&str> = args.iter().map(String::as_str).collect();
    provcheck(&args)
}

#[test]
fn validate_accepts_one_document_per_tool() {
    let dir = tempfile::tempdir().expect("tempdir");
    split_crate_per_tool(dir.path(), &["fenics", "kratos"]);

    let out = validate_documents(dir.path(), &[]);
    assert!(out.status.success(), "stderr: {}", stderr(&out));
    let log = stderr(&out);
    assert!(log.contains("2 document(s), 6 ground-truth entries"));
    assert!(log.contains("(fenics)"));
    assert!(log.contains("(kratos)"));
}

#[test]
fn validate_reports_tools_no_document_covers() {
    let dir = tempfile::tempdir().expect("tempdir");
    split_crate_per_tool(dir.path(), &["fenics"]);

    let out = validate_documents(dir.path(), &[]);
    assert!(!out.status.success());
    assert!(stderr(&out).contains("no provenance document covers the runs of [kratos]"));
}

#[test]
fn validate_fails_when_the_filter_leaves_nothing_to_compare() {
    let out = validate_documents(&fixture_root(), &["--fixed", "element-order=3"]);
    assert!(!out.status.success());
    let log = stderr(&out);
    assert!(log.contains("no ground-truth entries to compare against"), "{log}");
    assert!(!log.contains("validated"));
}

#[test]
fn unknown_output_format_is_rejected() {
    let root = fixture_root();
    let out = provcheck(&[
        "query",
        "--provenance",
        &path_arg(&root),
        "--parameter",
        "element-size",
        "--metric",
        "max_von_mises_stress_nodes",
        "--format",
        "xlsx",
    ]);
    assert!(!out.status.success());
    assert!(stderr(&out).contains("unknown output format `xlsx`"));
}
