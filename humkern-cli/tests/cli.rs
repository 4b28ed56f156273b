//! End-to-end runs of the compiled binary on temporary directories.
//!
//! `--filter-cmd cat` substitutes the identity pipeline for the Humdrum
//! toolchain, so the fixtures carry their `**cdata-beat` spines inline.

use std::fs;
use std::path::Path;
use std::process::{Command, Output};

use pretty_assertions::assert_eq;

fn call_cli(args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_humkern"))
        .args(args)
        .output()
        .unwrap()
}

fn write(path: &Path, content: &str) {
    fs::write(path, content).unwrap();
}

const BEAT_ANNOTATED: &str = "!!!COM: Corelli, Arcangelo\n\
    **kern\t**kern\t**cdata-beat\n\
    *M4/4\t*M4/4\t*\n\
    =1\t=1\t=1\n\
    4c\t4e\t0\n\
    4d\t4f\t1\n\
    =2\t=2\t=2\n\
    4e\t4g\t0\n\
    *-\t*-\t*-";

#[test]
fn harm_inserts_labels_and_strips_beat_spine() {
    let dir = tempfile::tempdir().unwrap();
    let scores = dir.path().join("kern");
    let labels = dir.path().join("labels");
    let out = dir.path().join("out");
    fs::create_dir_all(&scores).unwrap();
    fs::create_dir_all(&labels).unwrap();
    write(&scores.join("op01n01a.krn"), BEAT_ANNOTATED);
    write(
        &labels.join("op01n01a_reviewed.tsv"),
        "mn\tmn_onset\tlabel\n1\t0\tI\n1\t1/4\tV\n2\t0\tI6",
    );

    let output = call_cli(&[
        "harm",
        scores.to_str().unwrap(),
        "--labels-dir",
        labels.to_str().unwrap(),
        "--out-dir",
        out.to_str().unwrap(),
        "--filter-cmd",
        "cat",
    ]);
    assert!(output.status.success());

    let annotated = fs::read_to_string(out.join("op01n01a.krn")).unwrap();
    assert_eq!(
        annotated,
        "!!!COM: Corelli, Arcangelo\n\
        **kern\t**harm\t**kern\n\
        *M4/4\t*above\t*M4/4\n\
        =1\t=1\t=1\n\
        4c\tI\t4e\n\
        4d\tV\t4f\n\
        =2\t=2\t=2\n\
        4e\tI6\t4g\n\
        *-\t*-\t*-"
    );
}

#[test]
fn harm_skips_files_without_cached_labels() {
    let dir = tempfile::tempdir().unwrap();
    let scores = dir.path().join("kern");
    let labels = dir.path().join("labels");
    let out = dir.path().join("out");
    fs::create_dir_all(&scores).unwrap();
    fs::create_dir_all(&labels).unwrap();
    write(&scores.join("op01n01a.krn"), BEAT_ANNOTATED);

    let output = call_cli(&[
        "harm",
        scores.to_str().unwrap(),
        "--labels-dir",
        labels.to_str().unwrap(),
        "--out-dir",
        out.to_str().unwrap(),
        "--filter-cmd",
        "cat",
    ]);

    // The failing file is logged and skipped; the batch still succeeds.
    assert!(output.status.success());
    assert!(!out.join("op01n01a.krn").exists());
    assert!(String::from_utf8_lossy(&output.stderr).contains("No cached labels"));
}

#[test]
fn tempo_rewrites_in_place() {
    let dir = tempfile::tempdir().unwrap();
    let score = dir.path().join("op01n01b.krn");
    write(
        &score,
        "!!!OMD: Allegro\n**kern\t**kern\n*M4/4\t*M4/4\n=1\t=1\n4c\t4e\n!\t!\n4d\t4f\n*-\t*-",
    );

    let output = call_cli(&["tempo", score.to_str().unwrap()]);
    assert!(output.status.success());

    // The null local comment is a spacer line of the source file and must
    // survive the in-place rewrite.
    assert_eq!(
        fs::read_to_string(&score).unwrap(),
        "!!!OMD: Allegro\n\
        **kern\t**kern\n\
        *M4/4\t*M4/4\n\
        *MM104\t*MM104\n\
        =1\t=1\n\
        4c\t4e\n\
        !\t!\n\
        4d\t4f\n\
        *-\t*-"
    );
}

#[test]
fn tempo_warns_and_skips_scores_without_omd() {
    let dir = tempfile::tempdir().unwrap();
    let score = dir.path().join("op01n01c.krn");
    let content = "**kern\n*M4/4\n=1\n4c\n*-";
    write(&score, content);

    let output = call_cli(&["tempo", score.to_str().unwrap()]);
    assert!(output.status.success());
    assert_eq!(fs::read_to_string(&score).unwrap(), content);
    assert!(String::from_utf8_lossy(&output.stderr).contains("No OMD"));
}

const MODULATION_SCORE: &str = "**kern\t**cdata-beat\n\
    *k[f#]\t*\n\
    *G:\t*\n\
    *M4/4\t*\n\
    =1\t=1\n\
    4c\t1\n\
    =2\t=2\n\
    4d\t1\n\
    4e\t3\n\
    *-\t*-";

#[test]
fn modulations_inserts_key_changes() {
    let dir = tempfile::tempdir().unwrap();
    let scores = dir.path().join("kern");
    fs::create_dir_all(&scores).unwrap();
    write(&scores.join("op01n01a.krn"), MODULATION_SCORE);
    let table = dir.path().join("modulations.yaml");
    write(&table, "op01n01a:\n  - [\"2/3\", \"D\"]\n");

    let output = call_cli(&[
        "modulations",
        "--scores-dir",
        scores.to_str().unwrap(),
        "--modulations",
        table.to_str().unwrap(),
        "--filter-cmd",
        "cat",
    ]);
    assert!(output.status.success());

    assert_eq!(
        fs::read_to_string(scores.join("op01n01a.krn")).unwrap(),
        "**kern\n\
        *k[f#]\n\
        *G:\n\
        *M4/4\n\
        =1\n\
        4c\n\
        =2\n\
        4d\n\
        *D:\n\
        4e\n\
        *-"
    );
}

#[test]
fn fix_tempo_splices_designations() {
    let dir = tempfile::tempdir().unwrap();
    let score = dir.path().join("op01n01a.krn");
    write(&score, MODULATION_SCORE);
    let fixes = dir.path().join("tempo-fixes.yaml");
    write(&fixes, "op01n01a:\n  - [\"2/3\", \"Adagio\"]\n");

    let output = call_cli(&[
        "fix-tempo",
        score.to_str().unwrap(),
        "--fixes",
        fixes.to_str().unwrap(),
        "--filter-cmd",
        "cat",
    ]);
    assert!(output.status.success());

    assert_eq!(
        fs::read_to_string(&score).unwrap(),
        "**kern\n\
        *k[f#]\n\
        *G:\n\
        *M4/4\n\
        =1\n\
        4c\n\
        =2\n\
        4d\n\
        !!!OMD: Adagio\n\
        !KEEPLO:TX:a:B:t=Adagio\n\
        4e\n\
        *-"
    );
}

#[test]
fn import_merges_yaml_tables() {
    let dir = tempfile::tempdir().unwrap();
    let scores = dir.path().join("kern");
    let tables = dir.path().join("tables");
    fs::create_dir_all(&scores).unwrap();
    fs::create_dir_all(&tables).unwrap();
    // With the identity filter the "score" is already the line map the
    // pipeline would produce: `<beat>\t<line number>` rows between barlines.
    write(&scores.join("op01n01a.krn"), "=1\n1\t2\n2\t3\n=2\n1\t5");
    let export = dir.path().join("spans.json");
    write(
        &export,
        r#"{
            "pieceId": "op01n01a",
            "modulations": [{ "startLine": 3, "key": " D " }],
            "cadences": [{ "startLine": 2, "endLine": 5, "tags": [" PAC "] }]
        }"#,
    );

    let output = call_cli(&[
        "import",
        export.to_str().unwrap(),
        "--scores-dir",
        scores.to_str().unwrap(),
        "--tables-dir",
        tables.to_str().unwrap(),
        "--filter-cmd",
        "cat",
        "-o",
    ]);
    assert!(output.status.success());
    assert!(String::from_utf8_lossy(&output.stdout).contains("Add to modulations.yaml:"));

    let modulations: std::collections::BTreeMap<String, Vec<(String, String)>> =
        serde_yaml::from_str(&fs::read_to_string(tables.join("modulations.yaml")).unwrap())
            .unwrap();
    assert_eq!(
        modulations["op01n01a"],
        vec![("1/2".to_owned(), "D".to_owned())]
    );

    let cadences: std::collections::BTreeMap<String, Vec<(String, String, Vec<String>)>> =
        serde_yaml::from_str(&fs::read_to_string(tables.join("cadences.yaml")).unwrap()).unwrap();
    assert_eq!(
        cadences["op01n01a"],
        vec![("1/1".to_owned(), "2/1".to_owned(), vec!["PAC".to_owned()])]
    );
}
