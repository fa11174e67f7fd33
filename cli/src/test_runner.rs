use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use renderer::{HtmlRenderer, RenderConfig};

#[derive(Debug, Default, Deserialize)]
pub struct TestConfig {
    /// Human-readable test description.
    #[serde(default)]
    pub description: Option<String>,

    /// Parsing must fail with an error whose message contains this substring.
    #[serde(default)]
    pub expect_error: Option<String>,

    /// The error must point at this 1-based line of the article source.
    #[serde(default)]
    pub expect_error_line: Option<usize>,

    #[serde(default)]
    pub expect_title: Option<String>,

    #[serde(default)]
    pub expect_slug: Option<String>,

    /// Expected number of top-level blocks.
    #[serde(default)]
    pub expect_blocks: Option<usize>,

    /// Substrings the rendered HTML must contain, in order.
    #[serde(default)]
    pub expect_html: Vec<String>,

    /// Renderer settings used for `expect_html`.
    #[serde(default)]
    pub render: RenderConfig,
}

/// Split a `.test.md` fixture into its `---` TOML header and the article source.
fn split_fixture(content: &str) -> Result<(TestConfig, &str), String> {
    let content = content.trim_start_matches('\u{feff}');
    let mut lines = content.split_inclusive('\n');
    if lines.next().map(str::trim_end) != Some("---") {
        return Err("fixture must start with a `---` line".into());
    }

    let header_start = content.find('\n').map_or(content.len(), |p| p + 1);
    let mut pos = header_start;
    for line in lines {
        if line.trim_end() == "---" {
            let config = toml::from_str(&content[header_start..pos])
                .map_err(|e| format!("invalid fixture header: {}", e))?;
            return Ok((config, &content[pos + line.len()..]));
        }
        pos += line.len();
    }
    Err("fixture header is never closed with `---`".into())
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

impl TestResult {
    fn label(&self) -> &str {
        self.description.as_deref().unwrap_or_else(|| {
            self.path
                .file_stem()
                .and_then(|s| s.to_str())
                .unwrap_or("?")
        })
    }
}

fn run_single_test(path: &Path) -> TestResult {
    let (description, outcome) = match std::fs::read_to_string(path) {
        Ok(content) => match split_fixture(&content) {
            Ok((config, source)) => (config.description.clone(), check(&config, source)),
            Err(e) => (None, Err(format!("fixture header error: {}", e))),
        },
        Err(e) => (None, Err(format!("cannot read file: {}", e))),
    };

    tracing::debug!(path = %path.display(), passed = outcome.is_ok(), "ran fixture");

    TestResult {
        path: path.to_path_buf(),
        description,
        outcome: match outcome {
            Ok(()) => TestOutcome::Pass,
            Err(reason) => TestOutcome::Fail(reason),
        },
    }
}

/// Parse `source` and compare against the expectations in `config`.
fn check(config: &TestConfig, source: &str) -> Result<(), String> {
    let result = article::Parser::new(source.to_string(), 0).parse();

    let doc = match (&config.expect_error, result) {
        (Some(expected), Err(err)) => {
            let message = err.to_string();
            if !message.contains(expected.as_str()) {
                return Err(format!(
                    "error message does not mention \"{}\"\n  actual: {}",
                    expected, message
                ));
            }
            if let Some(line) = config.expect_error_line {
                let actual = line_of(source, err.span.start);
                if actual != line {
                    return Err(format!(
                        "expected error on line {}, but it points at line {}",
                        line, actual
                    ));
                }
            }
            return Ok(());
        }
        (Some(expected), Ok(_)) => {
            return Err(format!(
                "parsing succeeded, but an error mentioning \"{}\" was expected",
                expected
            ));
        }
        (None, Err(err)) => return Err(format!("unexpected parse error: {}", err)),
        (None, Ok(doc)) => doc,
    };

    if let Some(title) = &config.expect_title {
        if doc.title() != title {
            return Err(format!(
                "title mismatch\n  expected: {}\n  actual:   {}",
                title,
                doc.title()
            ));
        }
    }
    if let Some(slug) = &config.expect_slug {
        if doc.slug() != slug {
            return Err(format!(
                "slug mismatch\n  expected: {}\n  actual:   {}",
                slug,
                doc.slug()
            ));
        }
    }
    if let Some(count) = config.expect_blocks {
        if doc.blocks().len() != count {
            return Err(format!(
                "expected {} block(s), got {}",
                count,
                doc.blocks().len()
            ));
        }
    }

    if !config.expect_html.is_empty() {
        let html = HtmlRenderer::new(config.render.clone()).render(&doc);
        let mut from = 0;
        for expected in &config.expect_html {
            match html[from..].find(expected.as_str()) {
                Some(pos) => from += pos + expected.len(),
                None => {
                    return Err(format!(
                        "rendered html is missing (in order): {}\n  html:\n{}",
                        expected, html
                    ));
                }
            }
        }
    }

    Ok(())
}

/// 1-based line number of a byte offset.
fn line_of(source: &str, offset: usize) -> usize {
    let end = offset.min(source.len());
    1 + source.as_bytes()[..end].iter().filter(|&&b| b == b'\n').count()
}

/// Fixture files grouped by category: their folder relative to the suite
/// root, `/`-separated, with `""` for the root itself.
struct Suite {
    groups: BTreeMap<String, Vec<PathBuf>>,
}

impl Suite {
    /// A single fixture file, or every `.test.md` below a directory.
    fn open(path: &Path) -> Suite {
        let mut groups = BTreeMap::new();
        if path.is_file() {
            groups.insert(String::new(), vec![path.to_path_buf()]);
        } else {
            walk(path, path, &mut groups);
            for files in groups.values_mut() {
                files.sort();
            }
        }
        Suite { groups }
    }

    fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    fn labels(&self) -> String {
        let labels: Vec<&str> = self.groups.keys().map(|k| category_label(k)).collect();
        labels.join(", ")
    }

    /// Keep the requested categories and their subfolders.
    fn select(self, requested: &[String]) -> Suite {
        if requested.is_empty() {
            return self;
        }
        let wanted: Vec<&str> = requested.iter().map(|r| r.trim_matches('/')).collect();
        for req in &wanted {
            if !self.groups.keys().any(|cat| within(cat, req)) {
                tracing::warn!(category = *req, available = %self.labels(), "category not found");
            }
        }
        let groups = self
            .groups
            .into_iter()
            .filter(|(cat, _)| wanted.iter().any(|req| within(cat, req)))
            .collect();
        Suite { groups }
    }
}

/// `cat` is `req` or one of its subfolders.
fn within(cat: &str, req: &str) -> bool {
    cat.strip_prefix(req)
        .is_some_and(|rest| rest.is_empty() || rest.starts_with('/'))
}

fn walk(dir: &Path, root: &Path, groups: &mut BTreeMap<String, Vec<PathBuf>>) {
    let entries = match std::fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(err) => {
            tracing::warn!(dir = %dir.display(), %err, "cannot read fixture directory");
            return;
        }
    };
    for path in entries.filter_map(Result::ok).map(|e| e.path()) {
        if path.is_dir() {
            walk(&path, root, groups);
        } else if is_fixture(&path) {
            groups.entry(category_of(&path, root)).or_default().push(path);
        }
    }
}

fn is_fixture(path: &Path) -> bool {
    path.file_name()
        .and_then(|n| n.to_str())
        .is_some_and(|n| n.ends_with(".test.md"))
}

fn category_of(path: &Path, root: &Path) -> String {
    let Some(rel) = path.parent().and_then(|p| p.strip_prefix(root).ok()) else {
        return String::new();
    };
    let parts: Vec<_> = rel
        .components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect();
    parts.join("/")
}

fn category_label(cat: &str) -> &str {
    if cat.is_empty() { "(root)" } else { cat }
}

/// Print the categories of the suite at `path` with their fixture counts.
pub fn list_categories(path: &Path) {
    if path.is_file() {
        eprintln!("{} is a single fixture", path.display());
        return;
    }
    let suite = Suite::open(path);
    if suite.is_empty() {
        eprintln!("no .test.md fixtures under {}", path.display());
        return;
    }
    for (cat, files) in &suite.groups {
        eprintln!("{:<24} {} fixture(s)", category_label(cat), files.len());
    }
}

struct Style {
    no_color: bool,
}

impl Style {
    fn paint(&self, code: &str, s: &str) -> String {
        if self.no_color {
            s.to_string()
        } else {
            format!("\x1b[{}m{}\x1b[0m", code, s)
        }
    }

    fn pass(&self) -> String {
        self.paint("32", "PASS")
    }

    fn fail(&self) -> String {
        self.paint("31", "FAIL")
    }

    fn bold(&self, s: &str) -> String {
        self.paint("1", s)
    }
}

/// Run the fixture suite at `path`, optionally limited to `categories`
/// (ignored for a single file). Returns the process exit code.
pub fn run_tests(path: &Path, no_color: bool, categories: &[String]) -> i32 {
    let style = Style { no_color };

    let suite = Suite::open(path);
    if suite.is_empty() {
        eprintln!("no .test.md fixtures under {}", path.display());
        return 1;
    }
    let suite = if path.is_file() {
        suite
    } else {
        suite.select(categories)
    };
    if suite.is_empty() {
        eprintln!("none of the requested categories exist");
        return 1;
    }

    let headed = suite.groups.len() > 1 || suite.groups.keys().any(|c| !c.is_empty());
    let mut results = Vec::new();
    for (cat, files) in &suite.groups {
        if headed {
            eprintln!();
            eprintln!("{}", style.bold(category_label(cat)));
        }
        for file in files {
            let result = run_single_test(file);
            let tag = match result.outcome {
                TestOutcome::Pass => style.pass(),
                TestOutcome::Fail(_) => style.fail(),
            };
            eprintln!("  {}  {}", tag, result.label());
            results.push(result);
        }
    }

    let failures: Vec<(&TestResult, &String)> = results
        .iter()
        .filter_map(|r| match &r.outcome {
            TestOutcome::Fail(reason) => Some((r, reason)),
            TestOutcome::Pass => None,
        })
        .collect();
    let passed = results.len() - failures.len();

    if !failures.is_empty() {
        eprintln!();
        eprintln!("failures:");
        for (result, reason) in &failures {
            eprintln!();
            eprintln!("  {}", style.bold(&result.path.display().to_string()));
            for line in reason.lines() {
                eprintln!("    {}", line);
            }
        }
    }

    eprintln!();
    let summary = if failures.is_empty() {
        style.paint("32", "ok")
    } else {
        style.paint("31", "FAILED")
    };
    eprintln!("fixtures: {}. {} passed, {} failed", summary, passed, failures.len());
    i32::from(!failures.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    const FIXTURE: &str = "---\ndescription = \"hello\"\nexpect_title = \"Hello\"\nexpect_blocks = 1\n---\n+++\ntitle = \"Hello\"\nslug = \"hello\"\ndate = \"2024-08-20\"\n+++\n# Hi\n";

    #[test]
    fn splits_config_from_source() {
        let (config, source) = split_fixture(FIXTURE).unwrap();
        assert_eq!(config.description.as_deref(), Some("hello"));
        assert_eq!(config.expect_blocks, Some(1));
        assert!(source.starts_with("+++\ntitle"));
        assert!(source.ends_with("# Hi\n"));
    }

    #[test]
    fn rejects_missing_delimiters() {
        assert!(split_fixture("+++\ntitle = \"x\"\n+++\n").is_err());
        assert!(split_fixture("---\ndescription = \"x\"\n").is_err());
    }

    #[test]
    fn error_expectations_check_message_and_line() {
        let config = TestConfig {
            expect_error: Some("never closed".into()),
            expect_error_line: Some(6),
            ..TestConfig::default()
        };
        let source = "+++\ntitle = \"T\"\nslug = \"t\"\ndate = \"2024-08-20\"\n+++\n```rust\nfn main() {}\n";
        assert_eq!(check(&config, source), Ok(()));

        let wrong_line = TestConfig {
            expect_error_line: Some(2),
            ..config
        };
        assert!(check(&wrong_line, source).is_err());
    }

    #[test]
    fn html_expectations_are_ordered() {
        let source = "+++\ntitle = \"T\"\nslug = \"t\"\ndate = \"2024-08-20\"\n+++\n# A\n\nB\n";
        let in_order = TestConfig {
            expect_html: vec!["<h1".into(), "<p>B</p>".into()],
            ..TestConfig::default()
        };
        assert_eq!(check(&in_order, source), Ok(()));
        let reversed = TestConfig {
            expect_html: vec!["<p>B</p>".into(), "<h1".into()],
            ..TestConfig::default()
        };
        assert!(check(&reversed, source).is_err());
    }

    #[test]
    fn runs_a_directory_of_fixtures() {
        let dir = tempfile::tempdir().unwrap();
        let sub = dir.path().join("basics");
        std::fs::create_dir(&sub).unwrap();
        std::fs::write(sub.join("hello.test.md"), FIXTURE).unwrap();
        std::fs::write(dir.path().join("notes.md"), "ignored").unwrap();

        let suite = Suite::open(dir.path());
        assert_eq!(suite.groups.keys().collect::<Vec<_>>(), vec!["basics"]);
        assert_eq!(run_tests(dir.path(), true, &[]), 0);
        assert_eq!(run_tests(dir.path(), true, &["missing".to_string()]), 1);
    }

    #[test]
    fn failing_fixture_fails_the_run() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.test.md");
        std::fs::write(&path, FIXTURE.replace("expect_blocks = 1", "expect_blocks = 3")).unwrap();
        assert_eq!(run_tests(&path, true, &[]), 1);
    }

    #[test]
    fn bundled_fixtures_pass() {
        let cases = Path::new(env!("CARGO_MANIFEST_DIR")).join("tests/cases");
        assert_eq!(run_tests(&cases, true, &[]), 0);
    }
}
