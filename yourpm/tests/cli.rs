//! Integration tests for the yourpm and container-exec binaries.
//!
//! Every test points `YOURPM_HOME` at a temp dir. Tests that touch the
//! container runtime use a shell script standing in for `docker` that logs its
//! arguments.

use assert_cmd::cargo::cargo_bin_cmd;
use assert_cmd::Command;
use flate2::write::GzEncoder;
use flate2::Compression;
use predicates::prelude::*;
use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};

fn yourpm(home: &Path) -> Command {
    let mut cmd = cargo_bin_cmd!("yourpm");
    cmd.env("YOURPM_HOME", home);
    cmd.env_remove("YOURPM_RUNTIME");
    cmd.env_remove("RUST_LOG");
    cmd
}

/// A `docker` replacement: logs each invocation, reports no containers or
/// images, and exits 5 for `exec`.
fn fake_docker(dir: &Path) -> (PathBuf, PathBuf) {
    docker_script(dir, "  image) [ \"$2\" = inspect ] && exit 1 ;;\n")
}

/// Like [`fake_docker`], but every `image` subcommand fails.
fn broken_image_docker(dir: &Path) -> (PathBuf, PathBuf) {
    docker_script(dir, "  image) echo 'daemon unavailable' >&2; exit 1 ;;\n")
}

fn docker_script(dir: &Path, image_case: &str) -> (PathBuf, PathBuf) {
    let script = dir.join("fake-docker");
    let log = dir.join("docker.log");
    fs::write(
        &script,
        format!(
            "#!/bin/sh\necho \"$@\" >> '{}'\ncase \"$1\" in\n  exec) exit 5 ;;\n{image_case}esac\nexit 0\n",
            log.display()
        ),
    )
    .unwrap();
    fs::set_permissions(&script, fs::Permissions::from_mode(0o755)).unwrap();
    (script, log)
}

fn platform_key() -> String {
    yourpm::Platform::current().keys()[0].clone()
}

// ============================================================================
// Basic CLI tests
// ============================================================================

#[test]
fn cli_no_args_shows_help() {
    let temp = tempfile::tempdir().unwrap();
    yourpm(temp.path())
        .assert()
        .failure()
        .stderr(predicate::str::contains("Usage:"));
}

#[test]
fn cli_help_lists_commands() {
    let temp = tempfile::tempdir().unwrap();
    yourpm(temp.path())
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("switch"))
        .stdout(predicate::str::contains("install"))
        .stdout(predicate::str::contains("prune"));
}

// ============================================================================
// switch
// ============================================================================

#[test]
fn switch_without_config_fails() {
    let temp = tempfile::tempdir().unwrap();
    yourpm(temp.path())
        .arg("switch")
        .assert()
        .failure()
        .stderr(predicate::str::contains("failed to read config"));
}

#[test]
fn switch_rejects_config_without_name() {
    let temp = tempfile::tempdir().unwrap();
    let config = temp.path().join("desired.toml");
    fs::write(&config, "[packages]\n").unwrap();

    yourpm(&temp.path().join("home"))
        .arg("switch")
        .arg(&config)
        .assert()
        .failure()
        .stderr(predicate::str::contains("config.name is required"));
}

#[test]
fn switch_installs_packages_and_persists_config() {
    let mut server = mockito::Server::new();
    let mut archive = Vec::new();
    {
        let mut builder = tar::Builder::new(GzEncoder::new(&mut archive, Compression::default()));
        let data = b"#!/bin/sh\necho rg\n";
        let mut header = tar::Header::new_gnu();
        header.set_entry_type(tar::EntryType::Regular);
        header.set_size(data.len() as u64);
        header.set_mode(0o644);
        builder
            .append_data(&mut header, "ripgrep-14.1.0/rg", &data[..])
            .unwrap();
        builder.into_inner().unwrap().finish().unwrap();
    }
    let mock = server
        .mock("GET", "/ripgrep-14.1.0.tar.gz")
        .with_status(200)
        .with_body(archive)
        .expect(1)
        .create();

    let temp = tempfile::tempdir().unwrap();
    let home = temp.path().join("home");
    fs::create_dir_all(&home).unwrap();
    fs::write(
        home.join("manifest.toml"),
        format!(
            "[packages.ripgrep]\nrepo = \"BurntSushi/ripgrep\"\n[packages.ripgrep.binaries]\nnames = [\"rg\"]\n[packages.ripgrep.urls]\n{} = \"{}/ripgrep-{{version}}.tar.gz\"\n",
            platform_key(),
            server.url()
        ),
    )
    .unwrap();
    let config = temp.path().join("laptop.toml");
    fs::write(&config, "name = \"laptop\"\n\n[packages]\nripgrep = \"14.1.0\"\n").unwrap();

    for _ in 0..2 {
        yourpm(&home)
            .arg("switch")
            .arg(&config)
            .assert()
            .success()
            .stdout(predicate::str::contains("Switched to laptop"));
    }

    mock.assert();
    let link = home.join("profiles/default/bin/rg");
    assert_eq!(
        fs::read_link(&link).unwrap(),
        home.join("store/ripgrep-14.1.0/rg")
    );
    let mode = fs::metadata(&link).unwrap().permissions().mode();
    assert_ne!(mode & 0o111, 0);
    assert_eq!(
        fs::read_to_string(home.join("config.toml")).unwrap(),
        fs::read_to_string(&config).unwrap()
    );
}

#[test]
fn switch_reports_unsupported_platform() {
    let temp = tempfile::tempdir().unwrap();
    fs::write(
        temp.path().join("manifest.toml"),
        "[packages.jq.urls]\nplan9-mips = \"https://example.com/jq\"\n",
    )
    .unwrap();
    fs::write(temp.path().join("config.toml"), "name = \"x\"\n[packages]\njq = \"1.7\"\n").unwrap();

    yourpm(temp.path())
        .arg("switch")
        .assert()
        .failure()
        .stderr(predicate::str::contains("not supported for jq"));
}

// ============================================================================
// install
// ============================================================================

#[test]
fn install_downloads_raw_binary_and_links_it() {
    let mut server = mockito::Server::new();
    let mock = server
        .mock("GET", "/jq-linux-amd64")
        .with_status(200)
        .with_body("#!/bin/sh\necho jq\n")
        .create();
    let temp = tempfile::tempdir().unwrap();

    yourpm(temp.path())
        .args(["install", "jq", "1.7.1"])
        .arg(format!("{}/jq-linux-amd64", server.url()))
        .assert()
        .success()
        .stdout(predicate::str::contains("Installed jq 1.7.1"));

    mock.assert();
    assert_eq!(
        fs::read_link(temp.path().join("profiles/default/bin/jq")).unwrap(),
        temp.path().join("store/jq-1.7.1/jq")
    );
    assert!(temp.path().join("cache/jq-1.7.1-jq-linux-amd64").is_file());
}

#[test]
fn install_surfaces_http_errors() {
    let mut server = mockito::Server::new();
    let _mock = server.mock("GET", "/missing").with_status(404).create();
    let temp = tempfile::tempdir().unwrap();

    yourpm(temp.path())
        .args(["install", "jq", "1.7.1"])
        .arg(format!("{}/missing", server.url()))
        .assert()
        .failure()
        .stderr(predicate::str::contains("HTTP 404"));

    assert!(!temp.path().join("store/jq-1.7.1").exists());
}

// ============================================================================
// prune
// ============================================================================

#[test]
fn prune_containers_without_config_refuses() {
    let temp = tempfile::tempdir().unwrap();
    let (docker, log) = fake_docker(temp.path());

    yourpm(temp.path())
        .env("YOURPM_RUNTIME", &docker)
        .args(["prune", "containers"])
        .assert()
        .success()
        .stdout(predicate::str::contains("refusing to prune without --all"));

    assert!(!log.exists());
}

#[test]
fn prune_images_all_passes_flag() {
    let temp = tempfile::tempdir().unwrap();
    let (docker, log) = fake_docker(temp.path());

    yourpm(temp.path())
        .env("YOURPM_RUNTIME", &docker)
        .args(["prune", "images", "--all"])
        .assert()
        .success();

    assert_eq!(fs::read_to_string(log).unwrap().trim(), "image prune -f -a");
}

#[test]
fn prune_images_failure_is_a_warning() {
    let temp = tempfile::tempdir().unwrap();
    let (docker, log) = broken_image_docker(temp.path());

    yourpm(temp.path())
        .env("YOURPM_RUNTIME", &docker)
        .args(["prune", "images"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Image prune failed"))
        .stdout(predicate::str::contains("daemon unavailable"))
        .stdout(predicate::str::contains("Images pruned").not());

    assert_eq!(fs::read_to_string(log).unwrap().trim(), "image prune -f");
}

// ============================================================================
// container-exec
// ============================================================================

fn container_home(temp: &Path) -> PathBuf {
    let home = temp.join("home");
    fs::create_dir_all(&home).unwrap();
    fs::write(
        home.join("config.toml"),
        "name = \"laptop\"\n\n[containers.node]\nimage = \"node\"\nversion = \"20\"\n",
    )
    .unwrap();
    fs::write(
        home.join("containers.toml"),
        "[containers.node]\ncommands = [\"node\"]\nworkdir = \"/workspace\"\n",
    )
    .unwrap();
    home
}

#[test]
fn container_exec_rejects_unknown_command() {
    let temp = tempfile::tempdir().unwrap();
    let home = container_home(temp.path());
    let (docker, log) = fake_docker(temp.path());

    cargo_bin_cmd!("container-exec")
        .env("YOURPM_HOME", &home)
        .env("YOURPM_RUNTIME", &docker)
        .assert()
        .code(1)
        .stderr(predicate::str::contains("not found in any declared container"));

    assert!(!log.exists());
}

#[test]
fn container_exec_creates_container_and_forwards_exit_code() {
    let temp = tempfile::tempdir().unwrap();
    let home = container_home(temp.path());
    let (docker, log) = fake_docker(temp.path());
    let node = temp.path().join("node");
    std::os::unix::fs::symlink(env!("CARGO_BIN_EXE_container-exec"), &node).unwrap();

    Command::new(&node)
        .env("YOURPM_HOME", &home)
        .env("YOURPM_RUNTIME", &docker)
        .arg("--version")
        .write_stdin("")
        .assert()
        .code(5);

    let log = fs::read_to_string(log).unwrap();
    let lines: Vec<_> = log.lines().collect();
    assert_eq!(
        lines,
        vec![
            "ps -a --filter name=^yourpm-node$ --format {{.Names}}",
            "run -d --name yourpm-node --entrypoint  -w /workspace node:20 tail -f /dev/null",
            "exec -i -w /workspace yourpm-node node --version",
        ]
    );
}
