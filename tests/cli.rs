//! End-to-end tests for the `syncview` binary.
//!
//! Stdout is a pipe under the test harness, so every command answers in
//! JSON. `--quiet` keeps log lines out of stderr, where errors land as JSON.

use std::fs;
use std::path::{Path, PathBuf};

use assert_cmd::Command;
use serde_json::Value;
use tempfile::TempDir;

struct Fixture {
    dir: TempDir,
}

impl Fixture {
    /// Three-way layout:
    /// - `a.txt` changed locally (outgoing change)
    /// - `docs/c.md` changed in the baseline (incoming change)
    /// - `new.txt` only local (outgoing addition)
    fn new() -> Self {
        let dir = TempDir::new().unwrap();
        let write = |tree: &str, rel: &str, content: &str| {
            let path = dir.path().join(tree).join(rel);
            fs::create_dir_all(path.parent().unwrap()).unwrap();
            fs::write(path, content).unwrap();
        };

        write("ancestor", "a.txt", "base");
        write("ancestor", "docs/c.md", "same");
        write("local", "a.txt", "mine");
        write("local", "docs/c.md", "same");
        write("local", "new.txt", "n");
        write("baseline", "a.txt", "base");
        write("baseline", "docs/c.md", "theirs");

        Self { dir }
    }

    fn path(&self, tree: &str) -> PathBuf {
        self.dir.path().join(tree)
    }

    fn config(&self) -> PathBuf {
        self.dir.path().join("config").join("config.json")
    }

    fn cmd(&self) -> Command {
        let mut cmd = Command::cargo_bin("syncview").unwrap();
        cmd.env_remove("RUST_LOG")
            .env_remove("SYNCVIEW_CONFIG")
            .arg("--quiet")
            .arg("--config")
            .arg(self.config());
        cmd
    }

    /// A view command over the fixture trees.
    fn view(&self, command: &str) -> Command {
        let mut cmd = self.cmd();
        cmd.arg(command)
            .arg(self.path("local"))
            .arg(self.path("baseline"))
            .arg("--ancestor")
            .arg(self.path("ancestor"))
            .args(["--name", "proj"]);
        cmd
    }
}

fn stdout_json(cmd: &mut Command) -> Value {
    let output = cmd.assert().success().get_output().stdout.clone();
    serde_json::from_slice(&output).unwrap()
}

fn stderr_json(cmd: &mut Command, exit_code: i32) -> Value {
    let output = cmd.assert().code(exit_code).get_output().stderr.clone();
    serde_json::from_slice(&output).unwrap()
}

fn paths(list: &Value) -> Vec<&str> {
    list["items"]
        .as_array()
        .unwrap()
        .iter()
        .map(|item| item["path"].as_str().unwrap())
        .collect()
}

#[test]
fn test_list_shows_every_change() {
    let fx = Fixture::new();
    let list = stdout_json(&mut fx.view("list"));
    assert_eq!(list["count"], 3);
    assert_eq!(paths(&list), vec!["/proj/a.txt", "/proj/docs/c.md", "/proj/new.txt"]);
}

#[test]
fn test_list_with_direction_filter() {
    let fx = Fixture::new();
    let list = stdout_json(fx.view("list").args(["--direction", "in"]));
    assert_eq!(paths(&list), vec!["/proj/docs/c.md"]);
}

#[test]
fn test_status_reports_filtered_counts() {
    let fx = Fixture::new();
    let status = stdout_json(fx.view("status").args(["-d", "outgoing"]));
    assert_eq!(status["showing"], 2);
    assert_eq!(status["in_working_set"], 3);
    assert_eq!(status["in_workspace"], 3);
    assert_eq!(status["directions"]["outgoing"], 2);
    assert_eq!(status["directions"]["incoming"], 0);
    assert_eq!(status["title"], "Synchronize - (showing 2 of 3 changes) - proj");
}

#[test]
fn test_tree_nests_by_folder() {
    let fx = Fixture::new();
    let tree = stdout_json(&mut fx.view("tree"));
    let roots = tree.as_array().unwrap();
    assert_eq!(roots.len(), 1);
    assert_eq!(roots[0]["path"], "/proj");

    let children: Vec<&str> = roots[0]["children"]
        .as_array()
        .unwrap()
        .iter()
        .map(|child| child["name"].as_str().unwrap())
        .collect();
    assert_eq!(children, vec!["a.txt", "docs", "new.txt"]);

    let docs = &roots[0]["children"][1];
    assert!(docs.get("kind").is_none());
    assert_eq!(docs["children"][0]["path"], "/proj/docs/c.md");
}

#[test]
fn test_working_set_scopes_the_view() {
    let fx = Fixture::new();
    stdout_json(fx.cmd().args(["working-set", "save", "docs", "/proj/docs"]));

    let list = stdout_json(fx.view("list").args(["--working-set", "docs"]));
    assert_eq!(paths(&list), vec!["/proj/docs/c.md"]);

    // Activated working sets apply without the flag; --all lifts them.
    stdout_json(fx.cmd().args(["working-set", "use", "docs"]));
    let status = stdout_json(&mut fx.view("status"));
    assert_eq!(status["working_set"], "docs");
    assert_eq!(status["showing"], 1);
    assert_eq!(status["in_workspace"], 3);
    assert_eq!(status["title"], "Synchronize - (2 outside working set) - docs - proj");
    let list = stdout_json(fx.view("list").arg("--all"));
    assert_eq!(list["count"], 3);
}

#[test]
fn test_ad_hoc_roots() {
    let fx = Fixture::new();
    let list = stdout_json(fx.view("list").args(["--root", "a.txt", "--root", "new.txt"]));
    assert_eq!(paths(&list), vec!["/proj/a.txt", "/proj/new.txt"]);
}

#[test]
fn test_working_set_list_and_delete() {
    let fx = Fixture::new();
    stdout_json(fx.cmd().args(["working-set", "save", "src", "/proj/src", "--use"]));

    let list = stdout_json(fx.cmd().args(["working-set", "list"]));
    assert_eq!(list["active"], "src");
    assert_eq!(list["working_sets"][0]["roots"][0], "/proj/src");

    let deleted = stdout_json(fx.cmd().args(["working-set", "delete", "src"]));
    assert_eq!(deleted["action"], "deleted");
    assert!(deleted["active"].is_null());
}

#[test]
fn test_unknown_working_set_fails_with_suggestion() {
    let fx = Fixture::new();
    stdout_json(fx.cmd().args(["working-set", "save", "docs", "/proj/docs"]));

    let err = stderr_json(fx.view("list").args(["--working-set", "doc"]), 3);
    assert_eq!(err["error"]["code"], "WORKING_SET_NOT_FOUND");
    assert!(err["error"]["hint"].as_str().unwrap().contains("docs"));
}

#[test]
fn test_filter_set_persists() {
    let fx = Fixture::new();
    let shown = stdout_json(fx.cmd().args(["filter", "set", "--change", "addition"]));
    assert_eq!(shown["filter"]["change_types"][0], "addition");

    let list = stdout_json(&mut fx.view("list"));
    assert_eq!(paths(&list), vec!["/proj/new.txt"]);
}

#[test]
fn test_invalid_direction_is_validation_error() {
    let fx = Fixture::new();
    let err = stderr_json(fx.cmd().args(["filter", "set", "--direction", "sideways"]), 4);
    assert_eq!(err["error"]["code"], "INVALID_ARGUMENT");
    assert!(!fx.config().exists());
}

#[test]
fn test_missing_directory_is_not_found() {
    let fx = Fixture::new();
    let err = stderr_json(
        fx.cmd()
            .arg("list")
            .arg(Path::new("/definitely/not/here"))
            .arg(fx.path("baseline")),
        3,
    );
    assert_eq!(err["error"]["code"], "ROOT_NOT_FOUND");
}

#[test]
fn test_version_json() {
    let fx = Fixture::new();
    let version = stdout_json(fx.cmd().arg("version"));
    assert_eq!(version["name"], "syncview");
    assert!(version["version"].is_string());
}
