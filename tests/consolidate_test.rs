use predicates::prelude::*;
use std::fs;
use std::io::Write;
use std::path::Path;
use tempfile::tempdir;
use zip::write::SimpleFileOptions;

const HEADER: &str = "#\tKeyword\tLocation\tVolume\tTags\tURL\tPosition";

fn utf16le(text: &str) -> Vec<u8> {
    let mut out = vec![0xFF, 0xFE];
    for unit in text.encode_utf16() {
        out.extend_from_slice(&unit.to_le_bytes());
    }
    out
}

fn export_body(rows: &[&str]) -> String {
    let mut body = format!("{HEADER}\n");
    for (idx, row) in rows.iter().enumerate() {
        body.push_str(&format!("{}\t{row}\n", idx + 1));
    }
    body
}

fn write_upload(path: &Path, entries: &[(&str, String)]) {
    let file = fs::File::create(path).expect("create zip");
    let mut zip = zip::ZipWriter::new(file);
    for (name, body) in entries {
        zip.start_file(*name, SimpleFileOptions::default())
            .expect("start entry");
        zip.write_all(&utf16le(body)).expect("write entry");
    }
    zip.finish().expect("finish zip");
}

fn rankroll(home: &Path) -> assert_cmd::Command {
    let mut cmd = assert_cmd::cargo::cargo_bin_cmd!("rankroll");
    cmd.current_dir(home)
        .env("RANKROLL_HOME", home)
        .env("RANKROLL_CONFIG_PATH", home.join("absent.toml"))
        .env_remove("RANKROLL_MIN_GAP_DAYS")
        .env_remove("RANKROLL_MAX_COUNT")
        .env_remove("RANKROLL_OUTPUT_ENCODING");
    cmd
}

fn standard_upload(path: &Path) {
    write_upload(
        path,
        &[
            (
                "2024-01-01/example.csv",
                export_body(&["seo tools\tUS\t1,300\tcore\thttps://www.example.com/seo\t9"]),
            ),
            (
                "2024-01-03/example.csv",
                export_body(&["seo tools\tUS\t1,300\tcore\thttps://www.example.com/seo\t8"]),
            ),
            (
                "2024-01-15/example.csv",
                export_body(&[
                    "seo tools\tUS\t1,300\tcore\thttps://www.example.com/seo\t6",
                    "rank check\tUS\t90\t\thttps://www.example.com/rank\t",
                ]),
            ),
            (
                "2024-01-28/example.csv",
                export_body(&[
                    "seo tools\tUS\t1,300\tcore\thttps://www.example.com/seo\t5",
                    "rank check\tUS\t90\t\thttps://www.example.com/rank\t14",
                ]),
            ),
            ("__MACOSX/2024-01-28/._example.csv", "junk".to_string()),
        ],
    );
}

#[test]
fn consolidate_writes_wide_report_from_zip_upload() {
    let tmp = tempdir().expect("tempdir");
    let upload = tmp.path().join("upload.zip");
    standard_upload(&upload);

    rankroll(tmp.path())
        .arg("consolidate")
        .arg("--zip")
        .arg(&upload)
        .assert()
        .success()
        .stdout(predicate::str::contains("project=example rows=2"))
        .stdout(predicate::str::contains(
            "kept=2024-01-28,2024-01-15,2024-01-03 dropped=2024-01-01",
        ));

    let report = fs::read_to_string(tmp.path().join("data/projects/example.csv"))
        .expect("read report");
    let lines: Vec<&str> = report.lines().collect();
    assert_eq!(
        lines,
        vec![
            "keyword\tlocation\turl\tsearch_volume\ttags\trank@2024-01-28\trank@2024-01-15\trank@2024-01-03",
            "rank check\tUS\thttps://www.example.com/rank\t90\t\t14\t\t-",
            "seo tools\tUS\thttps://www.example.com/seo\t1300\tcore\t5\t6\t8",
        ]
    );

    let audit = fs::read_to_string(tmp.path().join("logs/audit.log")).expect("read audit log");
    assert!(audit.contains("\"phase\":\"extract\""));
    assert!(audit.contains("\"phase\":\"consolidate\""));
}

#[test]
fn rerun_hits_cache_until_invalidated() {
    let tmp = tempdir().expect("tempdir");
    let upload = tmp.path().join("upload.zip");
    standard_upload(&upload);

    rankroll(tmp.path())
        .args(["consolidate", "--zip"])
        .arg(&upload)
        .assert()
        .success()
        .stdout(predicate::str::contains("cache=miss"));

    rankroll(tmp.path())
        .arg("consolidate")
        .assert()
        .success()
        .stdout(predicate::str::contains("cache=hit"));

    rankroll(tmp.path())
        .args(["cache-clear", "--project", "example"])
        .assert()
        .success()
        .stdout(predicate::str::contains("project=example removed=1"));

    rankroll(tmp.path())
        .args(["consolidate", "--min-gap-days", "1", "--max-count", "4"])
        .assert()
        .success()
        .stdout(predicate::str::contains("cache=miss"))
        .stdout(predicate::str::contains(
            "kept=2024-01-28,2024-01-15,2024-01-03,2024-01-01 dropped=none",
        ));
}

#[test]
fn conflicting_ranks_are_reported_not_resolved() {
    let tmp = tempdir().expect("tempdir");
    let upload = tmp.path().join("upload.zip");
    write_upload(
        &upload,
        &[
            (
                "2024-01-01/a.csv",
                export_body(&["seo\tUS\t100\tt1\thttps://x.com/\t3"]),
            ),
            (
                "2024-01-01/b.csv",
                export_body(&["seo\tUS\t100\tt1\thttps://x.com/\t7"]),
            ),
        ],
    );

    rankroll(tmp.path())
        .args(["consolidate", "--json", "--zip"])
        .arg(&upload)
        .assert()
        .code(2)
        .stdout(predicate::str::contains("\"ok\": false"))
        .stdout(predicate::str::contains("duplicate snapshot"));

    assert!(!tmp.path().join("data/projects/x.csv").exists());
}

#[test]
fn invalid_gap_configuration_is_rejected() {
    let tmp = tempdir().expect("tempdir");
    rankroll(tmp.path())
        .args(["consolidate", "--max-count", "0"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("invalid gap configuration"));
}

#[test]
fn unknown_project_gets_empty_report_and_warning() {
    let tmp = tempdir().expect("tempdir");
    let upload = tmp.path().join("upload.zip");
    standard_upload(&upload);

    rankroll(tmp.path())
        .args(["consolidate", "--project", "ghost", "--zip"])
        .arg(&upload)
        .assert()
        .success()
        .stdout(predicate::str::contains("cache=miss"))
        .stderr(predicate::str::contains(
            "RANKROLL_WARN code=W001_EMPTY_INPUT stage=consolidate project=ghost",
        ));

    rankroll(tmp.path())
        .args(["consolidate", "--project", "ghost"])
        .assert()
        .success()
        .stdout(predicate::str::contains("cache=hit"))
        .stderr(predicate::str::contains(
            "RANKROLL_WARN code=W001_EMPTY_INPUT stage=consolidate project=ghost",
        ));

    let report =
        fs::read_to_string(tmp.path().join("data/projects/ghost.csv")).expect("read report");
    assert_eq!(report.trim_end(), "keyword\tlocation\turl\tsearch_volume\ttags");
}

#[test]
fn project_name_colliding_with_known_report_leaves_it_intact() {
    let tmp = tempdir().expect("tempdir");
    let upload = tmp.path().join("upload.zip");
    standard_upload(&upload);

    rankroll(tmp.path())
        .args(["consolidate", "--zip"])
        .arg(&upload)
        .assert()
        .success();
    let report_path = tmp.path().join("data/projects/example.csv");
    let before = fs::read_to_string(&report_path).expect("read report");

    for name in ["Example", "example!"] {
        rankroll(tmp.path())
            .args(["consolidate", "--project", name])
            .assert()
            .code(2)
            .stdout(predicate::str::contains(format!(
                "project={name}: unknown project {name} shares report"
            )))
            .stderr(predicate::str::contains("W001_EMPTY_INPUT").not());
    }

    let after = fs::read_to_string(&report_path).expect("read report");
    assert_eq!(after, before);
    assert!(after.contains("seo tools"));
}
