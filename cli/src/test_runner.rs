use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use blockir::serializer::{Mode, Serializer};

#[derive(Debug, Deserialize)]
pub struct ExpectedDiagnostic {
    /// Substring that must appear in the diagnostic message.
    pub contains: String,

    /// If set, the diagnostic must be attached to this block id.
    #[serde(default)]
    pub block: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct TestConfig {
    /// Human-readable test description.
    #[serde(default)]
    pub description: Option<String>,

    /// Serialize in strict mode.
    #[serde(default)]
    pub strict: bool,

    /// Expected document, compared structurally as JSON.
    #[serde(default)]
    pub expect_json: Option<String>,

    /// Expected fatal error — the error's Display string must contain
    /// this substring.
    #[serde(default)]
    pub expect_error: Option<String>,

    /// If true, the test expects the XML itself to be rejected.
    #[serde(default)]
    pub expect_parse_error: bool,

    /// Expected diagnostics. If present (even empty), count and content
    /// are checked.
    #[serde(default)]
    pub expect_diagnostics: Option<Vec<ExpectedDiagnostic>>,
}

/// Split a `.test.xml` file into its TOML config and XML source. The
/// config rides in a leading `<!--test ... -->` comment so the file
/// stays well-formed XML.
fn parse_test_file(content: &str) -> Result<(TestConfig, &str), String> {
    let content = content.trim_start_matches('\u{feff}'); // strip BOM
    let trimmed = content.trim_start();

    let after_open = trimmed
        .strip_prefix("<!--test")
        .ok_or("missing leading <!--test config comment")?;

    let close_pos = after_open
        .find("-->")
        .ok_or("missing --> on test config comment")?;

    let toml_str = &after_open[..close_pos];
    let source = &after_open[close_pos + 3..];

    let config: TestConfig =
        toml::from_str(toml_str).map_err(|e| format!("TOML parse error: {}", e))?;

    Ok((config, source))
}

pub enum TestOutcome {
    Pass,
    Fail(String),
}

pub struct TestResult {
    pub path: PathBuf,
    pub description: Option<String>,
    pub outcome: TestOutcome,
}

fn fail(path: &Path, description: Option<String>, reason: String) -> TestResult {
    TestResult {
        path: path.to_path_buf(),
        description,
        outcome: TestOutcome::Fail(reason),
    }
}

fn run_single_test(path: &Path) -> TestResult {
    let content = match std::fs::read_to_string(path) {
        Ok(c) => c,
        Err(e) => return fail(path, None, format!("cannot read file: {}", e)),
    };

    let (config, source) = match parse_test_file(&content) {
        Ok(pair) => pair,
        Err(e) => return fail(path, None, e),
    };

    let description = config.description.clone();

    let parse_result = blockir::xml::parse(source);

    if config.expect_parse_error {
        return TestResult {
            path: path.to_path_buf(),
            description,
            outcome: match parse_result {
                Err(_) => TestOutcome::Pass,
                Ok(_) => TestOutcome::Fail("expected an XML error, but parsing succeeded".into()),
            },
        };
    }

    let root = match parse_result {
        Ok(root) => root,
        Err(e) => return fail(path, description, format!("unexpected XML error: {}", e)),
    };

    let mode = if config.strict {
        Mode::Strict
    } else {
        Mode::Lenient
    };

    let outcome = match (Serializer::new(mode).serialize(&root), &config.expect_error) {
        (Err(err), Some(expected)) => {
            let err_str = err.to_string();
            return if err_str.contains(expected.as_str()) {
                TestResult {
                    path: path.to_path_buf(),
                    description,
                    outcome: TestOutcome::Pass,
                }
            } else {
                fail(
                    path,
                    description,
                    format!(
                        "expected error containing \"{}\", got: {}",
                        expected, err_str
                    ),
                )
            };
        }
        (Err(err), None) => {
            return fail(path, description, format!("unexpected error: {}", err));
        }
        (Ok(_), Some(expected)) => {
            return fail(
                path,
                description,
                format!(
                    "expected error containing \"{}\", but serialization succeeded",
                    expected
                ),
            );
        }
        (Ok(outcome), None) => outcome,
    };

    if let Some(expected_json) = &config.expect_json {
        let expected: serde_json::Value = match serde_json::from_str(expected_json) {
            Ok(v) => v,
            Err(e) => return fail(path, description, format!("bad expect_json: {}", e)),
        };
        let actual = match serde_json::to_value(&outcome.program) {
            Ok(v) => v,
            Err(e) => return fail(path, description, format!("cannot encode document: {}", e)),
        };
        if actual != expected {
            let pretty = |v: &serde_json::Value| {
                serde_json::to_string_pretty(v).unwrap_or_else(|_| v.to_string())
            };
            return fail(
                path,
                description,
                format!(
                    "document mismatch\n  expected: {}\n  actual:   {}",
                    pretty(&expected),
                    pretty(&actual)
                ),
            );
        }
    }

    if let Some(expected) = &config.expect_diagnostics {
        if let Some(reason) = check_diagnostics(&outcome.diagnostics, expected) {
            return fail(path, description, reason);
        }
    }

    TestResult {
        path: path.to_path_buf(),
        description,
        outcome: TestOutcome::Pass,
    }
}

/// Check that actual diagnostics match expectations. Returns
/// `Some(reason)` on mismatch.
fn check_diagnostics(
    actual: &[blockir::serializer::Diagnostic],
    expected: &[ExpectedDiagnostic],
) -> Option<String> {
    if actual.len() != expected.len() {
        let actual_msgs: Vec<String> = actual.iter().map(|d| format!("  - {}", d)).collect();
        return Some(format!(
            "expected {} diagnostic(s), got {}\n  actual diagnostics:\n{}",
            expected.len(),
            actual.len(),
            if actual_msgs.is_empty() {
                "    (none)".to_string()
            } else {
                actual_msgs.join("\n")
            }
        ));
    }

    for (i, (actual, expected)) in actual.iter().zip(expected.iter()).enumerate() {
        let msg = actual.to_string();

        if !msg.contains(&expected.contains) {
            return Some(format!(
                "diagnostic[{}]: expected message containing \"{}\", got: {}",
                i, expected.contains, msg
            ));
        }

        if let Some(expected_block) = &expected.block {
            match &actual.block {
                Some(block) if block == expected_block => {}
                Some(block) => {
                    return Some(format!(
                        "diagnostic[{}]: expected on block `{}`, but attached to `{}`",
                        i, expected_block, block
                    ));
                }
                None => {
                    return Some(format!(
                        "diagnostic[{}]: expected on block `{}`, but has no block context",
                        i, expected_block
                    ));
                }
            }
        }
    }

    None
}

/// Discover `.test.xml` files grouped by category (subfolder relative to
/// root). Files directly in `root` get category "" (uncategorized).
/// Returns a BTreeMap so categories are sorted alphabetically.
fn discover_categorized(root: &Path) -> BTreeMap<String, Vec<PathBuf>> {
    let mut categories: BTreeMap<String, Vec<PathBuf>> = BTreeMap::new();
    collect_tests(root, root, &mut categories);
    for files in categories.values_mut() {
        files.sort();
    }
    categories
}

fn collect_tests(dir: &Path, root: &Path, out: &mut BTreeMap<String, Vec<PathBuf>>) {
    let Ok(entries) = std::fs::read_dir(dir) else {
        return;
    };
    for entry in entries.flatten() {
        let path = entry.path();
        if path.is_dir() {
            collect_tests(&path, root, out);
        } else if let Some(name) = path.file_name().and_then(|n| n.to_str()) {
            if name.ends_with(".test.xml") {
                let category = path
                    .parent()
                    .and_then(|p| p.strip_prefix(root).ok())
                    .map(|p| p.to_string_lossy().replace('\\', "/"))
                    .unwrap_or_default();
                out.entry(category).or_default().push(path);
            }
        }
    }
}

/// List available categories for the given test path.
pub fn list_categories(path: &Path) {
    if path.is_file() {
        eprintln!("(single file, no categories)");
        return;
    }

    let categories = discover_categorized(path);
    if categories.is_empty() {
        eprintln!("no .test.xml files found in {}", path.display());
        return;
    }

    eprintln!("available categories:");
    for (cat, files) in &categories {
        let label = if cat.is_empty() { "(root)" } else { cat.as_str() };
        eprintln!("  {} ({} tests)", label, files.len());
    }
}

fn pass_label(no_color: bool) -> &'static str {
    if no_color { "PASS" } else { "\x1b[32mPASS\x1b[0m" }
}

fn fail_label(no_color: bool) -> &'static str {
    if no_color { "FAIL" } else { "\x1b[31mFAIL\x1b[0m" }
}

fn bold(s: &str, no_color: bool) -> String {
    if no_color {
        s.to_string()
    } else {
        format!("\x1b[1m{}\x1b[0m", s)
    }
}

/// Run all `.test.xml` files under `path` (or a single file). If
/// `categories` is non-empty, only run tests in those categories.
/// Returns exit code: 0 = all pass, 1 = any failure.
pub fn run_tests(path: &Path, no_color: bool, categories: &[String]) -> i32 {
    let run_categories: BTreeMap<String, Vec<PathBuf>> = if path.is_file() {
        BTreeMap::from([(String::new(), vec![path.to_path_buf()])])
    } else {
        let all = discover_categorized(path);
        if all.is_empty() {
            eprintln!("no .test.xml files found in {}", path.display());
            return 1;
        }
        if categories.is_empty() {
            all
        } else {
            let mut filtered = BTreeMap::new();
            for requested in categories {
                let req = requested.trim_matches('/');
                let mut found = false;
                for (cat, files) in &all {
                    if cat == req || cat.starts_with(&format!("{}/", req)) {
                        filtered.insert(cat.clone(), files.clone());
                        found = true;
                    }
                }
                if !found {
                    eprintln!(
                        "warning: category '{}' not found (available: {})",
                        req,
                        all.keys()
                            .map(|k| if k.is_empty() { "(root)" } else { k.as_str() })
                            .collect::<Vec<_>>()
                            .join(", ")
                    );
                }
            }
            if filtered.is_empty() {
                eprintln!("no matching categories found");
                return 1;
            }
            filtered
        }
    };

    let mut passed = 0usize;
    let mut failed = 0usize;
    let mut failures: Vec<TestResult> = Vec::new();
    let show_headers = run_categories.len() > 1 || !run_categories.contains_key("");

    for (cat, files) in &run_categories {
        if show_headers {
            let header = if cat.is_empty() {
                "(root)".to_string()
            } else {
                cat.to_string()
            };
            eprintln!();
            eprintln!("{}", bold(&header, no_color));
        }

        for file in files {
            let result = run_single_test(file);
            let label = result.description.as_deref().unwrap_or_else(|| {
                file.file_stem().and_then(|s| s.to_str()).unwrap_or("?")
            });

            match &result.outcome {
                TestOutcome::Pass => {
                    passed += 1;
                    eprintln!("  {}  {}", pass_label(no_color), label);
                }
                TestOutcome::Fail(_) => {
                    failed += 1;
                    eprintln!("  {}  {}", fail_label(no_color), label);
                    failures.push(result);
                }
            }
        }
    }

    if !failures.is_empty() {
        eprintln!();
        eprintln!("failures:");
        for f in &failures {
            eprintln!();
            eprintln!("  --- {} ---", f.path.display());
            if let TestOutcome::Fail(reason) = &f.outcome {
                for line in reason.lines() {
                    eprintln!("  {}", line);
                }
            }
        }
    }

    eprintln!();
    if failed == 0 {
        let ok = if no_color { "ok" } else { "\x1b[32mok\x1b[0m" };
        eprintln!("test result: {}. {} passed, 0 failed", ok, passed);
        0
    } else {
        let label = if no_color {
            "FAILED"
        } else {
            "\x1b[31mFAILED\x1b[0m"
        };
        eprintln!(
            "test result: {}. {} passed, {} failed (of {})",
            label,
            passed,
            failed,
            passed + failed
        );
        1
    }
}
