//! Field and manifest assertions against a scripted stand-in for kubectl
//!
//! The fake understands just enough of `get -o template` and `apply -f` to
//! check what the assertions send it, and denies `apply --as` for any user
//! other than `admin`.

use std::time::Duration;

use serde::Serialize;
use tempfile::TempDir;

use kube_e2e::{init_test_logging, AssertConfig, Asserter, E2eError, Field, FieldRef};

const FAKE_KUBECTL: &str = r#"#!/bin/sh
case "$1" in
  get)
    echo "args: $*"
    ;;
  apply)
    if [ "$4" = "--as" ] && [ "$5" != "admin" ]; then
      echo "Error from server (Forbidden): user \"$5\" cannot create resource" >&2
      exit 1
    fi
    cat "$3"
    ;;
  *)
    echo "unknown command $1" >&2
    exit 2
    ;;
esac
"#;

struct Fake {
    _dir: TempDir,
    asserter: Asserter,
}

fn fake() -> Fake {
    init_test_logging();
    let dir = tempfile::tempdir().unwrap();
    let script = dir.path().join("kubectl");
    std::fs::write(&script, FAKE_KUBECTL).unwrap();
    let asserter = Asserter::new(AssertConfig {
        timeout: Duration::from_millis(300),
        poll_interval: Duration::from_millis(10),
        kubectl: format!("sh {}", script.display()),
        ..Default::default()
    });
    Fake {
        _dir: dir,
        asserter,
    }
}

#[test]
fn field_uses_path_template_and_namespace() {
    let k = fake();
    let field = FieldRef::new("deployment", "web", "frontend", Field::path(".spec.replicas"));
    k.asserter
        .field_should_contain(
            &field,
            &["get deployment frontend", "-n web", "--template={{.spec.replicas}}"],
        )
        .unwrap();
}

#[test]
fn complex_field_template_is_passed_verbatim() {
    let k = fake();
    let field = FieldRef::new(
        "pod",
        "",
        "web-0",
        Field::template("{{range.status.conditions}}{{.type}}{{end}}"),
    );
    k.asserter
        .field_should_contain(&field, &["--template={{range.status.conditions}}{{.type}}{{end}}"])
        .unwrap();
    k.asserter.field_should_not_contain(&field, &["-n"]).unwrap();
}

#[test]
fn field_mismatch_reports_command() {
    let k = fake();
    let field = FieldRef::new("pod", "default", "web-0", Field::path(".status.phase"));
    let err = k
        .asserter
        .field_should_contain(&field, &["Succeeded"])
        .unwrap_err();
    let msg = err.to_string();
    assert!(msg.contains("did not output the expected substring(s): Succeeded"));
    assert!(msg.contains("get pod web-0 -n default"));
}

const CONFIG_MAP: &str = "apiVersion: v1\nkind: ConfigMap\nmetadata:\n  name: e2e\n";

#[test]
fn applies_manifest_content() {
    fake().asserter.must_apply_yaml(CONFIG_MAP).unwrap();
}

#[test]
fn restricted_user_cannot_apply() {
    let k = fake();
    k.asserter
        .must_not_apply_yaml_as_user(CONFIG_MAP, "restricted")
        .unwrap();
    k.asserter.must_apply_yaml_as_user(CONFIG_MAP, "admin").unwrap();
}

#[test]
fn expecting_denial_for_allowed_user_fails() {
    let err = fake()
        .asserter
        .must_not_apply_yaml_as_user(CONFIG_MAP, "admin")
        .unwrap_err();
    match err {
        E2eError::UnexpectedSuccess { output, .. } => assert!(output.contains("kind: ConfigMap")),
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn must_not_apply_without_user_fails_when_apply_works() {
    assert!(fake().asserter.must_not_apply_yaml(CONFIG_MAP).is_err());
}

#[derive(Serialize)]
struct Namespace<'a> {
    #[serde(rename = "apiVersion")]
    api_version: &'a str,
    kind: &'a str,
    metadata: Metadata<'a>,
}

#[derive(Serialize)]
struct Metadata<'a> {
    name: &'a str,
}

#[test]
fn applies_serialized_values() {
    let ns = Namespace {
        api_version: "v1",
        kind: "Namespace",
        metadata: Metadata { name: "e2e-demo" },
    };
    fake().asserter.must_apply(&ns).unwrap();
}
