use predicates::prelude::*;
use std::fs;
use std::path::Path;
use tempfile::tempdir;

fn rankroll(home: &Path) -> assert_cmd::Command {
    let mut cmd = assert_cmd::cargo::cargo_bin_cmd!("rankroll");
    cmd.current_dir(home)
        .env("RANKROLL_HOME", home)
        .env("RANKROLL_CONFIG_PATH", home.join("absent.toml"));
    cmd
}

fn write_plain_export(raw: &Path, folder: &str, rows: &str) {
    let dir = raw.join(folder);
    fs::create_dir_all(&dir).expect("mkdir");
    let body = format!("Keyword\tLocation\tVolume\tTags\tURL\tRank\n{rows}\n");
    fs::write(dir.join("export.csv"), body).expect("write export");
}

#[test]
fn projects_and_show_read_existing_exports() {
    let tmp = tempdir().expect("tempdir");
    let raw = tmp.path().join("data/raw");
    write_plain_export(&raw, "2024-03-01", "boots\tUK\t40\t\thttps://shop.acme.co.uk/b\t12");
    write_plain_export(&raw, "2024-03-20", "boots\tUK\t40\t\thttps://shop.acme.co.uk/b\t7");
    write_plain_export(&raw, "notes", "boots\tUK\t40\t\thttps://shop.acme.co.uk/b\t1");

    rankroll(tmp.path())
        .arg("projects")
        .assert()
        .success()
        .stdout(predicate::str::contains(
            "project=acme records=2 snapshots=2 newest=2024-03-20 report=missing",
        ))
        .stdout(predicate::str::contains("parent folder is not a scrape date"));

    rankroll(tmp.path()).arg("consolidate").assert().success();

    rankroll(tmp.path())
        .args(["show", "acme"])
        .assert()
        .success()
        .stdout(predicate::str::contains("rank@2024-03-20  rank@2024-03-01"))
        .stdout(predicate::str::contains("boots"));
}

#[test]
fn show_without_report_reports_issue() {
    let tmp = tempdir().expect("tempdir");
    rankroll(tmp.path())
        .args(["show", "nobody"])
        .assert()
        .code(2)
        .stdout(predicate::str::contains("no report for project nobody"));
}

#[test]
fn status_lists_active_overrides() {
    let tmp = tempdir().expect("tempdir");
    rankroll(tmp.path())
        .env("RANKROLL_MAX_COUNT", "5")
        .args(["status", "--json"])
        .assert()
        .success()
        .stdout(predicate::str::contains("selection.max_count=5"))
        .stdout(predicate::str::contains("RANKROLL_MAX_COUNT"));
}
