//! Profile persistence through the CLI (non-interactive paths only)
use std::fs;
use std::path::Path;

use assert_cmd::Command;

fn run(config: &Path, args: &[&str]) -> String {
    let out = Command::cargo_bin("livestats")
        .unwrap()
        .env("XDG_CONFIG_HOME", config)
        .args(args)
        .output()
        .expect("run livestats");
    assert!(out.status.success(), "{out:?}");
    String::from_utf8_lossy(&out.stdout).into_owned()
}

fn stored(config: &Path) -> serde_json::Value {
    let path = config.join("livestats").join("profiles.json");
    let data = fs::read_to_string(path).expect("profiles.json written");
    serde_json::from_str(&data).unwrap()
}

#[test]
fn profile_created_on_first_use() {
    let td = tempfile::tempdir().unwrap();
    run(td.path(), &["--profile", "dev", "ws://agent:3000", "42", "--dry-run"]);
    let v = stored(td.path());
    assert_eq!(v["profiles"]["dev"]["url"], "ws://agent:3000");
    assert_eq!(v["profiles"]["dev"]["resource"], "42");
}

#[test]
fn stored_profile_supplies_url_and_resource() {
    let td = tempfile::tempdir().unwrap();
    run(td.path(), &["-P", "dev", "ws://agent:3000", "42", "--dry-run"]);

    let out = run(td.path(), &["--profile=dev", "--dry-run"]);
    assert!(out.contains("would watch resource 42 at ws://agent:3000"), "{out}");

    // Resource on the command line overrides the stored one without rewriting it
    let out = run(td.path(), &["-P", "dev", "43", "--dry-run"]);
    assert!(out.contains("would watch resource 43 at ws://agent:3000"), "{out}");
    assert_eq!(stored(td.path())["profiles"]["dev"]["resource"], "42");
}

#[test]
fn changed_profile_overwritten_only_with_save() {
    let td = tempfile::tempdir().unwrap();
    run(td.path(), &["-P", "dev", "ws://agent:3000", "42", "--dry-run"]);

    // Without --save the overwrite prompt reads an empty stdin and declines
    run(td.path(), &["-P", "dev", "ws://other:4000", "42", "--dry-run"]);
    assert_eq!(stored(td.path())["profiles"]["dev"]["url"], "ws://agent:3000");

    run(td.path(), &["-P", "dev", "ws://other:4000", "42", "--save", "--dry-run"]);
    assert_eq!(stored(td.path())["profiles"]["dev"]["url"], "ws://other:4000");
}
