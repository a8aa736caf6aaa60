// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Runs real processes through the generic runner.

#![cfg(unix)]

use atest_runner::{
    config::{SETTINGS_PATH, WorkspaceSettings},
    errors::RunError,
    registry::{ResultRegistry, RunMode},
    runner::{OutputStream, TestRunner},
    tree::{LineBase, ResultTree, RootKey},
    xunit::records_from_report,
};
use camino_tempfile::Utf8TempDir;
use indoc::indoc;
use pretty_assertions::assert_eq;

const SCRIPT: &str = indoc! {r#"
    echo "greeting: $ATEST_GREETING"
    echo "collected 2 items"
    echo "warning: slow test" >&2
    mkdir -p build
    cat > build/junit.xml <<'EOF'
    <testsuite name="generic">
        <testcase classname="suite.Cases" file="tests/cases.sh" line="3" name="test_ok"/>
        <testcase classname="suite.Cases" file="tests/cases.sh" line="9" name="test_bad">
            <failure message="exit status 1">expected 0</failure>
        </testcase>
    </testsuite>
    EOF
    exit 1
"#};

fn workspace(settings: &str) -> Utf8TempDir {
    let dir = Utf8TempDir::new().expect("created temp dir");
    std::fs::create_dir_all(dir.path().join(".config")).expect("created config dir");
    std::fs::write(dir.path().join(SETTINGS_PATH), settings).expect("wrote settings");
    std::fs::write(dir.path().join("run.sh"), SCRIPT).expect("wrote script");
    dir
}

#[tokio::test]
async fn generic_run_produces_tree() {
    let dir = workspace(indoc! {r#"
        runner = "generic"

        [generic]
        command = "sh run.sh"
        report = "build/junit.xml"

        [generic.env]
        ATEST_GREETING = "hello"
    "#});
    let settings = WorkspaceSettings::load(dir.path()).expect("settings are valid");
    let runner = TestRunner::new(&settings, dir.path());

    let mut lines = Vec::new();
    let mut sink = |stream: OutputStream, line: &str| lines.push((stream, line.to_owned()));
    let completion = runner
        .execute(&[], &mut sink)
        .await
        .expect("run completed");

    assert_eq!(completion.command, "sh run.sh");
    assert_eq!(completion.exit_code, Some(1));
    let stdout: Vec<_> = lines
        .iter()
        .filter(|(stream, _)| *stream == OutputStream::Stdout)
        .map(|(_, line)| line.as_str())
        .collect();
    assert_eq!(stdout, vec!["greeting: hello", "collected 2 items"]);
    let stderr: Vec<_> = lines
        .iter()
        .filter(|(stream, _)| *stream == OutputStream::Stderr)
        .map(|(_, line)| line.as_str())
        .collect();
    assert_eq!(stderr, vec!["warning: slow test"]);

    let report = completion.report.expect("report was configured");
    let key = RootKey::new("ws", runner.kind().name());
    let mut registry = ResultRegistry::new();
    let handle = registry
        .begin_run(key.clone(), dir.path(), RunMode::Replace)
        .expect("run began");
    let mut observer = |_: &ResultTree| {};
    let outcome = registry
        .complete_run(
            handle,
            records_from_report(&report),
            &settings.ingest_options(dir.path()),
            &mut observer,
        )
        .expect("records ingested");
    assert_eq!(outcome.ingest.ingested, 2);

    let tree = registry.get(&key).expect("tree exists");
    let root = tree.root();
    assert_eq!(tree[root].test_count(), 2);
    assert_eq!(tree[root].failed_test_count(), 1);
    let failed = tree
        .get_failed_by_dotted_path(root, "suite.Cases.test_bad")
        .expect("test_bad failed");
    assert_eq!(
        tree[failed].failure_message(),
        Some("exit status 1\n\nexpected 0")
    );
    let line = tree[failed]
        .file_location()
        .and_then(|location| location.line())
        .expect("test_bad has a line");
    assert_eq!(line.base(), LineBase::OneBased);
    assert_eq!(line.zero_based(), 8);
}

#[tokio::test]
async fn missing_report_is_an_error() {
    let dir = workspace(indoc! {r#"
        runner = "generic"
        generic.command = "true"
        generic.report = "build/junit.xml"
    "#});
    let settings = WorkspaceSettings::load(dir.path()).expect("settings are valid");
    let runner = TestRunner::new(&settings, dir.path());
    let mut sink = |_: OutputStream, _: &str| {};
    let error = runner
        .execute(&[], &mut sink)
        .await
        .expect_err("no report was written");
    assert!(
        matches!(error, RunError::ReadReport { .. }),
        "unexpected error: {error:?}"
    );
}

#[tokio::test]
async fn spawn_failure_is_an_error() {
    let dir = workspace(indoc! {r#"
        runner = "generic"
        generic.command = "atest-program-that-does-not-exist"
    "#});
    let settings = WorkspaceSettings::load(dir.path()).expect("settings are valid");
    let runner = TestRunner::new(&settings, dir.path());
    let mut sink = |_: OutputStream, _: &str| {};
    let error = runner
        .execute(&[], &mut sink)
        .await
        .expect_err("program does not exist");
    assert!(
        matches!(error, RunError::Spawn { .. }),
        "unexpected error: {error:?}"
    );
}
