use std::fs;
use std::path::Path;
use std::process::{Command, Output};

fn verified_cmd(root: &Path) -> Command {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_verified"));
    cmd.arg("--root").arg(root);
    cmd.env_remove("RUST_LOG");
    cmd
}

fn run(root: &Path, args: &[&str]) -> Output {
    verified_cmd(root)
        .args(args)
        .output()
        .expect("failed to run verified")
}

fn write_inputs(root: &Path, programs: &str) {
    fs::write(root.join("programs.yml"), programs).expect("failed to write programs.yml");
    fs::write(
        root.join("organizations.yml"),
        "acme:\n  name: Acme Corp\n  website: https://acme.example\n",
    )
    .expect("failed to write organizations.yml");
}

#[test]
fn list_prints_slugs_and_latest_tag() {
    let dir = tempfile::tempdir().expect("tempdir failed");
    write_inputs(dir.path(), "acme/swap-program:\n  - v1.1.0\n  - v1.2.0\n");

    let output = run(dir.path(), &["list"]);
    assert!(output.status.success(), "{:?}", output);
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("acme/swap-program v1.1.0 acme__swap-program-v1.1.0\n"));
    assert!(stdout.contains("acme/swap-program v1.2.0 acme__swap-program-v1.2.0 (latest)\n"));
}

#[test]
fn empty_tag_list_fails_before_any_fetch() {
    let dir = tempfile::tempdir().expect("tempdir failed");
    write_inputs(dir.path(), "acme/swap-program: []\n");

    let output = run(dir.path(), &["index"]);
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("no tags declared for acme/swap-program"), "{stderr}");
    assert!(!dir.path().join("index").exists());
}

#[test]
fn malformed_programs_file_fails() {
    let dir = tempfile::tempdir().expect("tempdir failed");
    write_inputs(dir.path(), "acme/swap-program: [v1.0.0\n");

    let output = run(dir.path(), &["list"]);
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("failed to parse yaml"), "{stderr}");
}

#[test]
fn invalid_repository_name_fails() {
    let dir = tempfile::tempdir().expect("tempdir failed");
    write_inputs(dir.path(), "swap-program:\n  - v1.0.0\n");

    let output = run(dir.path(), &["list"]);
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("invalid repository format"), "{stderr}");
}

#[test]
fn workflows_without_manifest_lookup() {
    let dir = tempfile::tempdir().expect("tempdir failed");
    write_inputs(dir.path(), "acme/swap-program:\n  - v1.2.0\n");

    let output = run(dir.path(), &["workflows", "--no-manifest"]);
    assert!(output.status.success(), "{:?}", output);

    let workflow = fs::read_to_string(
        dir.path()
            .join("out/.github/workflows/verify-acme__swap-program-v1.2.0.yml"),
    )
    .expect("workflow missing");
    assert!(workflow.contains("Verify acme/swap-program v1.2.0"));
    assert!(workflow.contains("anchor-0_22_0"));
    assert!(workflow.contains("release-binaries"));
}

#[test]
fn unreachable_artifact_host_is_fatal() {
    let dir = tempfile::tempdir().expect("tempdir failed");
    write_inputs(dir.path(), "acme/swap-program:\n  - v1.2.0\n");
    fs::write(
        dir.path().join("verified.toml"),
        "[artifacts]\nraw_base_url = \"http://127.0.0.1:9\"\nrepo_url = \"http://127.0.0.1:9\"\n\n[http]\ntimeout_secs = 2\n",
    )
    .expect("failed to write verified.toml");

    let output = run(dir.path(), &["index"]);
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("index error"), "{stderr}");
    assert!(!dir.path().join("index/summary.json").exists());
}

#[test]
fn completions_are_printed() {
    let dir = tempfile::tempdir().expect("tempdir failed");
    let output = run(dir.path(), &["completions", "bash"]);
    assert!(output.status.success());
    assert!(String::from_utf8_lossy(&output.stdout).contains("verified"));
}
