use std::fs;
use std::path::Path;

use pretty_assertions::assert_eq;
use tempfile::tempdir;

use plaintest::spec::loader::{LoadError, load_suite, load_suites, parse_suite};
use plaintest::spec::spec_model::{Step, Suite, TestCase};

const FLAT_YAML: &str = r#"
name: smoke
base_url: https://example.com
steps:
  - https://example.com に移動する
  - 3秒待つ
  - スクリーンショットを撮る
"#;

const STRUCTURED_YAML: &str = r#"
name: Login
base_url: https://example.com
test_cases:
  - name: valid credentials
    description: happy path
    steps:
      - 「ユーザー名」に「taro」と入力する
      - instruction: 「ログイン」ボタンをクリック
        description: submit the form
      - raw_instruction: 「ようこそ」が表示されている
  - name: empty form
    steps:
      - 「ログイン」ボタンをクリック
"#;

// =========================================================================
// Parsing
// =========================================================================

#[test]
fn test_flat_suite_becomes_one_case() {
    let suite = parse_suite(FLAT_YAML, "yaml", Path::new("smoke.yaml")).unwrap();
    assert_eq!(suite.name, "smoke");
    assert_eq!(suite.base_url.as_deref(), Some("https://example.com"));
    assert_eq!(suite.test_cases.len(), 1);
    assert_eq!(suite.test_cases[0].name, "smoke");
    assert_eq!(
        suite.test_cases[0].steps,
        vec![
            Step::new("https://example.com に移動する"),
            Step::new("3秒待つ"),
            Step::new("スクリーンショットを撮る"),
        ]
    );
}

#[test]
fn test_structured_suite_accepts_every_step_form() {
    let suite = parse_suite(STRUCTURED_YAML, "yml", Path::new("login.yml")).unwrap();
    assert_eq!(suite.step_count(), 4);

    let valid = &suite.test_cases[0];
    assert_eq!(valid.description.as_deref(), Some("happy path"));
    assert_eq!(valid.steps[0], Step::new("「ユーザー名」に「taro」と入力する"));
    assert_eq!(valid.steps[1].instruction, "「ログイン」ボタンをクリック");
    assert_eq!(valid.steps[1].description.as_deref(), Some("submit the form"));
    assert_eq!(valid.steps[2].instruction, "「ようこそ」が表示されている");
    assert_eq!(suite.test_cases[1].name, "empty form");
}

#[test]
fn test_json_suite() {
    let json = r#"{
        "name": "api",
        "test_cases": [
            {"name": "title", "steps": ["タイトルが「Example」である"]}
        ]
    }"#;
    let suite = parse_suite(json, "json", Path::new("api.json")).unwrap();
    assert_eq!(
        suite,
        Suite {
            name: "api".into(),
            base_url: None,
            test_cases: vec![TestCase::new("title", vec![Step::from("タイトルが「Example」である")])],
        }
    );
}

#[test]
fn test_parse_errors() {
    let path = Path::new("broken.yaml");
    assert!(matches!(
        parse_suite("name: [unclosed", "yaml", path),
        Err(LoadError::Parse { .. })
    ));
    assert!(matches!(
        parse_suite("name: x\ntest_cases: []\n", "yaml", path),
        Err(LoadError::Empty { .. })
    ));
    assert!(matches!(
        parse_suite("name = 'x'", "toml", Path::new("x.toml")),
        Err(LoadError::UnsupportedFormat { .. })
    ));
}

// =========================================================================
// Files and directories
// =========================================================================

#[test]
fn test_load_suite_from_disk() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("smoke.YAML");
    fs::write(&path, FLAT_YAML).unwrap();
    assert_eq!(load_suite(&path).unwrap().name, "smoke");
}

#[test]
fn test_missing_file_is_io_error() {
    let dir = tempdir().unwrap();
    let err = load_suite(&dir.path().join("nope.yaml")).unwrap_err();
    assert!(matches!(err, LoadError::Io { .. }));
    assert!(err.to_string().contains("nope.yaml"));
}

#[test]
fn test_directory_loads_suites_in_name_order() {
    let dir = tempdir().unwrap();
    fs::write(dir.path().join("b_login.yml"), STRUCTURED_YAML).unwrap();
    fs::write(dir.path().join("a_smoke.yaml"), FLAT_YAML).unwrap();
    fs::write(dir.path().join("notes.txt"), "not a suite").unwrap();
    fs::create_dir(dir.path().join("nested.yaml")).unwrap();

    let suites = load_suites(dir.path()).unwrap();
    let names: Vec<&str> = suites.iter().map(|s| s.name.as_str()).collect();
    assert_eq!(names, vec!["smoke", "Login"]);
}

#[test]
fn test_directory_without_suites() {
    let dir = tempdir().unwrap();
    fs::write(dir.path().join("readme.md"), "# nothing").unwrap();
    assert!(matches!(load_suites(dir.path()), Err(LoadError::NoSuites { .. })));
}

#[test]
fn test_single_file_through_load_suites() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("smoke.yaml");
    fs::write(&path, FLAT_YAML).unwrap();
    assert_eq!(load_suites(&path).unwrap().len(), 1);
}

// =========================================================================
// URL resolution
// =========================================================================

#[test]
fn test_resolve_url() {
    let with_base = Suite {
        name: "s".into(),
        base_url: Some("https://example.com/app/".into()),
        test_cases: vec![],
    };
    assert_eq!(with_base.resolve_url("/login"), "https://example.com/app/login");
    assert_eq!(with_base.resolve_url("login"), "https://example.com/app/login");
    assert_eq!(with_base.resolve_url("https://other.org/x"), "https://other.org/x");
    assert_eq!(with_base.resolve_url("about:blank"), "about:blank");

    let without = Suite {
        base_url: None,
        ..with_base
    };
    assert_eq!(without.resolve_url("/login"), "/login");
}
