//! End-to-end tests of the `contig-scaffolder` binary on a small coords dataset.

use std::path::{Path, PathBuf};

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

const COORDS: &str = "\
ref_start,ref_end,query_start,query_end,ref,original_orientation,aligned_orientation,needs_flip,identity
!ctg1!unique
0,1500000,0,1500000,chr1,+,+,False,99.1
!ctg2!unique
4000000,4100000,0,100000,chr1,+,+,False,97.5
!ctg2!repetitive
6000000,6050000,200000,250000,chr1,+,-,True,91.0
!ctg3!unique
0,2500000,0,2500000,chr2,+,-,True,98.0
";

const INDEX: &str = "\
#ref
ref,ref_length,matching_queries
chr1,10000000,ctg1~ctg2
chr2,5000000,ctg3
#query
query,query_length,orientation,unique,unique_short,repetitive,matching_refs
ctg1,2000000,+,1,0,0,chr1
ctg2,3000000,+,1,0,1,chr1
ctg3,2500000,-,1,0,0,chr2
";

struct Fixture {
    dir: TempDir,
    coords: PathBuf,
}

impl Fixture {
    fn new() -> Self {
        let dir = tempfile::tempdir().unwrap();
        let coords = dir.path().join("asm.coords");
        std::fs::write(&coords, COORDS).unwrap();
        std::fs::write(dir.path().join("asm.coords.idx"), INDEX).unwrap();
        Self { dir, coords }
    }

    fn path(&self, name: &str) -> PathBuf {
        self.dir.path().join(name)
    }

    fn cmd(&self, args: &[&str]) -> Command {
        let mut cmd = Command::cargo_bin("contig-scaffolder").unwrap();
        cmd.arg(args[0]).arg(&self.coords).args(&args[1..]);
        cmd
    }
}

fn read_json(path: &Path) -> serde_json::Value {
    serde_json::from_str(&std::fs::read_to_string(path).unwrap()).unwrap()
}

#[test]
fn test_info_reports_counts() {
    let fx = Fixture::new();
    fx.cmd(&["info"])
        .assert()
        .success()
        .stdout(predicate::str::contains("References: 2"))
        .stdout(predicate::str::contains("Contigs: 3"))
        .stdout(predicate::str::contains("Alignments: 4"));

    let output = fx.cmd(&["info", "--format", "json"]).output().unwrap();
    assert!(output.status.success());
    let json: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(json["summary"]["query_total_length"], 7_500_000);
    assert_eq!(json["references"][0]["contig_count"], 2);
}

#[test]
fn test_frame_hides_low_ratio_contig() {
    let fx = Fixture::new();
    let output = fx
        .cmd(&["frame", "--reference", "chr1", "--format", "json"])
        .output()
        .unwrap();
    assert!(output.status.success());
    let frame: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(frame["allowed"], serde_json::json!(["ctg1"]));

    // Dropping the ratio threshold lets ctg2 through
    let output = fx
        .cmd(&[
            "frame",
            "--reference",
            "chr1",
            "--min-unique-ratio",
            "0",
            "--format",
            "json",
        ])
        .output()
        .unwrap();
    let frame: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(frame["allowed"], serde_json::json!(["ctg1", "ctg2"]));
}

#[test]
fn test_frame_unknown_reference_fails() {
    let fx = Fixture::new();
    fx.cmd(&["frame", "--reference", "chrZ"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("chrZ"));
}

#[test]
fn test_edit_then_export() {
    let fx = Fixture::new();
    let session = fx.path("session.json");
    let session_arg = session.to_str().unwrap();

    fx.cmd(&[
        "edit",
        "--reference",
        "chr1",
        "--invert",
        "ctg1",
        "--break",
        "ctg2:1000000",
        "--group",
        "chr1A=ctg1,ctg2_1",
        "--output",
        session_arg,
    ])
    .assert()
    .success()
    .stdout(predicate::str::contains("Modifications added: 2"));

    let doc = read_json(&session);
    let ws = &doc["workspaces"]["chr1"];
    assert_eq!(ws["modifications"].as_array().unwrap().len(), 2);
    // One undo entry for the batch, one for the group
    assert_eq!(ws["history"].as_array().unwrap().len(), 2);
    assert_eq!(doc["active_reference"], "chr1");

    let scaffold = fx.path("scaffold.json");
    let changelog = fx.path("changes.csv");
    fx.cmd(&[
        "export",
        "--session",
        session_arg,
        "--scaffold",
        scaffold.to_str().unwrap(),
        "--changelog",
        changelog.to_str().unwrap(),
    ])
    .assert()
    .success();

    let scaffold = read_json(&scaffold);
    assert_eq!(scaffold["modifications"].as_array().unwrap().len(), 2);
    assert_eq!(scaffold["chromosomeGroups"]["chr1A"]["createdOn"], "chr1");
    assert_eq!(
        scaffold["chromosomeGroups"]["chr1A"]["contigs"],
        serde_json::json!(["ctg1", "ctg2_1"])
    );

    let csv = std::fs::read_to_string(&changelog).unwrap();
    let mut lines = csv.lines();
    assert_eq!(
        lines.next(),
        Some("seq,reference,type,contig,length,position,timestamp,note")
    );
    assert_eq!(csv.lines().count(), 5);
    assert!(csv.contains(",chr1,break,ctg2,3000000,1000000,"));
}

#[test]
fn test_edit_undo_and_rejection() {
    let fx = Fixture::new();
    let session = fx.path("session.json");
    let session_arg = session.to_str().unwrap();

    fx.cmd(&["edit", "--reference", "chr2", "--invert", "ctg3", "--output", session_arg])
        .assert()
        .success();

    // A break past the contig end rejects the whole batch and writes nothing
    fx.cmd(&[
        "edit",
        "--reference",
        "chr2",
        "--session",
        session_arg,
        "--invert",
        "ctg3",
        "--break",
        "ctg3:9000000",
    ])
    .assert()
    .failure();
    let doc = read_json(&session);
    assert_eq!(doc["workspaces"]["chr2"]["modifications"].as_array().unwrap().len(), 1);

    fx.cmd(&["edit", "--reference", "chr2", "--session", session_arg, "--undo", "1"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Undone steps: 1"));
    let doc = read_json(&session);
    assert_eq!(doc["workspaces"]["chr2"]["modifications"].as_array().unwrap().len(), 0);
}

#[test]
fn test_edit_requires_destination() {
    let fx = Fixture::new();
    fx.cmd(&["edit", "--reference", "chr1", "--invert", "ctg1"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("--output"));
}

#[test]
fn test_export_to_stdout_tsv() {
    let fx = Fixture::new();
    let session = fx.path("session.json");
    fx.cmd(&[
        "edit",
        "--reference",
        "chr1",
        "--uninformative",
        "ctg2",
        "--invert",
        "ctg2",
        "--output",
        session.to_str().unwrap(),
    ])
    .assert()
    .success();

    fx.cmd(&["export", "--session", session.to_str().unwrap(), "--format", "tsv"])
        .assert()
        .success()
        .stdout(predicate::str::starts_with("seq\treference\ttype"))
        .stdout(predicate::str::contains("1\tchr1\tinvert\tctg2\t3000000"));
}
