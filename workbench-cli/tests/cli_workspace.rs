use std::fs;
use std::io::{BufRead, BufReader, Read, Write};
use std::net::TcpListener;
use std::path::Path;
use std::process::Command;
use std::thread::JoinHandle;

use assert_cmd::prelude::*;
use predicates::prelude::*;
use predicates::str::contains;
use tempfile::TempDir;

fn workbench_cmd(home: &Path, root: &Path) -> Command {
    let mut cmd = Command::new(assert_cmd::cargo::cargo_bin!("workbench"));
    cmd.env("HOME", home)
        .env("USERPROFILE", home)
        .env("NO_COLOR", "1")
        .env_remove("RUST_LOG")
        .arg("--root")
        .arg(root);
    cmd
}

fn project() -> (TempDir, TempDir) {
    let home = TempDir::new().expect("home");
    let root = TempDir::new().expect("root");
    fs::create_dir_all(root.path().join("src/util")).expect("mkdir");
    fs::write(root.path().join("main.py"), "print('hi')\n").expect("write");
    fs::write(root.path().join("src/app.js"), "export {}\n").expect("write");
    fs::write(root.path().join("src/util/strings.py"), "").expect("write");
    (home, root)
}

#[test]
fn ls_lists_folders_before_files() {
    let (home, root) = project();
    let output = workbench_cmd(home.path(), root.path())
        .args(["ls", "--json"])
        .output()
        .expect("run ls");
    assert!(output.status.success());

    let rows: serde_json::Value = serde_json::from_slice(&output.stdout).expect("json");
    let names: Vec<&str> = rows
        .as_array()
        .expect("array")
        .iter()
        .map(|row| row["name"].as_str().expect("name"))
        .collect();
    assert_eq!(names, vec!["src", "main.py"]);
    assert_eq!(rows[1]["language"], "python");
    assert_eq!(rows[0]["kind"], "folder");
}

#[test]
fn tree_descends_into_nested_folders() {
    let (home, root) = project();
    workbench_cmd(home.path(), root.path())
        .arg("tree")
        .assert()
        .success()
        .stdout(contains("src/"))
        .stdout(contains("util/"))
        .stdout(contains("strings.py"))
        .stdout(contains("main.py"));
}

#[test]
fn tree_respects_depth() {
    let (home, root) = project();
    workbench_cmd(home.path(), root.path())
        .args(["tree", "--depth", "1"])
        .assert()
        .success()
        .stdout(contains("src/"))
        .stdout(contains("app.js").not());
}

#[test]
fn ls_of_subfolder() {
    let (home, root) = project();
    workbench_cmd(home.path(), root.path())
        .args(["ls", "src"])
        .assert()
        .success()
        .stdout(contains("util"))
        .stdout(contains("app.js"))
        .stdout(contains("javascript"));
}

#[test]
fn cat_prints_content_and_language() {
    let (home, root) = project();
    workbench_cmd(home.path(), root.path())
        .args(["cat", "main.py"])
        .assert()
        .success()
        .stdout("print('hi')\n")
        .stderr(contains("python"));
}

#[test]
fn cat_missing_file_fails() {
    let (home, root) = project();
    workbench_cmd(home.path(), root.path())
        .args(["cat", "nope.py"])
        .assert()
        .failure()
        .stderr(contains("could not read 'nope.py'"));
}

#[test]
fn cat_prints_file_whose_content_looks_like_a_load_error() {
    let (home, root) = project();
    fs::write(root.path().join("stub.js"), "// Error loading file").expect("write");
    workbench_cmd(home.path(), root.path())
        .args(["cat", "stub.js"])
        .assert()
        .success()
        .stdout("// Error loading file");
}

#[test]
fn save_writes_stdin_to_file() {
    let (home, root) = project();
    assert_cmd::Command::from_std(workbench_cmd(home.path(), root.path()))
        .args(["save", "main.py"])
        .write_stdin("print('bye')\n")
        .assert()
        .success()
        .stdout(contains("main.py (saved)"));
    assert_eq!(
        fs::read_to_string(root.path().join("main.py")).expect("read"),
        "print('bye')\n"
    );
}

#[test]
fn entry_mutations_change_the_store() {
    let (home, root) = project();
    workbench_cmd(home.path(), root.path())
        .args(["mkdir", "docs"])
        .assert()
        .success()
        .stdout(contains("created folder docs"));
    workbench_cmd(home.path(), root.path())
        .args(["touch", "docs/index.md"])
        .assert()
        .success();
    workbench_cmd(home.path(), root.path())
        .args(["mv", "docs/index.md", "docs/README.md"])
        .assert()
        .success();
    assert!(root.path().join("docs/README.md").is_file());

    workbench_cmd(home.path(), root.path())
        .args(["rm", "src"])
        .assert()
        .success();
    assert!(!root.path().join("src").exists());
}

#[test]
fn mutation_failures_exit_non_zero() {
    let (home, root) = project();
    workbench_cmd(home.path(), root.path())
        .args(["rm", "ghost.txt"])
        .assert()
        .failure()
        .stderr(contains("not found"));
    workbench_cmd(home.path(), root.path())
        .args(["touch", "main.py"])
        .assert()
        .failure()
        .stderr(contains("already exists"));
    workbench_cmd(home.path(), root.path())
        .args(["cat", "../outside"])
        .assert()
        .failure();
}

/// A sandbox that answers one `/execute` request; the handle yields the
/// request body.
fn sandbox_once(response: &'static str) -> (String, JoinHandle<String>) {
    let listener = TcpListener::bind("127.0.0.1:0").expect("bind");
    let base = format!("http://{}", listener.local_addr().expect("addr"));
    let handle = std::thread::spawn(move || {
        let (stream, _) = listener.accept().expect("accept");
        let mut reader = BufReader::new(stream.try_clone().expect("clone"));
        let mut length = 0usize;
        loop {
            let mut line = String::new();
            reader.read_line(&mut line).expect("header");
            let line = line.trim_end();
            if line.is_empty() {
                break;
            }
            if let Some((name, value)) = line.split_once(':') {
                if name.eq_ignore_ascii_case("content-length") {
                    length = value.trim().parse().expect("length");
                }
            }
        }
        let mut body = vec![0u8; length];
        reader.read_exact(&mut body).expect("body");

        let mut stream = stream;
        write!(
            stream,
            "HTTP/1.1 200 OK\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{response}",
            response.len()
        )
        .expect("respond");
        String::from_utf8(body).expect("utf8")
    });
    (base, handle)
}

fn dead_url() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").expect("bind");
    format!("http://{}", listener.local_addr().expect("addr"))
}

#[test]
fn run_prints_sandbox_output() {
    let (home, root) = project();
    let (sandbox, server) =
        sandbox_once(r#"{"run":{"stdout":"hi\n","stderr":"","output":"hi\n","code":0}}"#);
    workbench_cmd(home.path(), root.path())
        .args(["--runner", &sandbox, "run", "main.py"])
        .assert()
        .success()
        .stdout("hi\n")
        .stderr(contains("python"));

    let body: serde_json::Value =
        serde_json::from_str(&server.join().expect("sandbox")).expect("json");
    assert_eq!(body["language"], "python");
    assert_eq!(body["version"], "3.10.0");
    assert_eq!(body["files"][0]["content"], "print('hi')\n");
}

#[test]
fn run_failures_exit_non_zero() {
    let (home, root) = project();
    fs::write(root.path().join("notes.txt"), "plain").expect("write");
    workbench_cmd(home.path(), root.path())
        .args(["--runner", &dead_url(), "run", "notes.txt"])
        .assert()
        .failure()
        .stderr(contains("no runtime for plaintext"));
    workbench_cmd(home.path(), root.path())
        .args(["--runner", &dead_url(), "run", "main.py"])
        .assert()
        .failure()
        .stderr(contains("failed to run 'main.py'"))
        .stderr(contains("network failure"));
    workbench_cmd(home.path(), root.path())
        .args(["--runner", &dead_url(), "run", "missing.py"])
        .assert()
        .failure()
        .stderr(contains("could not read 'missing.py'"));
}

#[test]
fn root_and_remote_conflict() {
    let (home, root) = project();
    workbench_cmd(home.path(), root.path())
        .args(["--remote", "http://127.0.0.1:9", "ls"])
        .assert()
        .failure()
        .stderr(contains("cannot be used with"));
}

#[test]
fn chat_reports_unreachable_advisor() {
    let (home, root) = project();
    let port = {
        let listener = TcpListener::bind("127.0.0.1:0").expect("bind");
        listener.local_addr().expect("addr").port()
    };
    let workbench = home.path().join(".workbench");
    fs::create_dir_all(&workbench).expect("config dir");
    fs::write(
        workbench.join("config.yaml"),
        format!("remote:\n  base_url: http://127.0.0.1:{port}\n  timeout_secs: 2\n"),
    )
    .expect("config");

    workbench_cmd(home.path(), root.path())
        .args(["chat", "hello"])
        .assert()
        .failure()
        .stderr(contains("could not reach the advisor"));
}

#[test]
fn malformed_config_is_reported() {
    let (home, root) = project();
    let workbench = home.path().join(".workbench");
    fs::create_dir_all(&workbench).expect("config dir");
    fs::write(workbench.join("config.yaml"), "save_revert_ms: [not a number\n").expect("config");

    workbench_cmd(home.path(), root.path())
        .arg("ls")
        .assert()
        .failure()
        .stderr(contains("config.yaml"));
}
