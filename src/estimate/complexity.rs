//! Heuristic source-code complexity scan.
//!
//! Scores the source files behind a component with regex-based counters:
//! lines of code, function definitions, branching, ORM/SQL usage, external
//! calls, UI elements, and a dynamic-code flag. The resulting label is
//! driven by LOC thresholds configured per component type.
//!
//! This is an explicit heuristic — directionally indicative, never exact.
//! It does not parse the languages it scans.

use std::{
    collections::BTreeMap,
    path::{Path, PathBuf},
    sync::LazyLock,
};

use rayon::iter::{IntoParallelRefIterator, ParallelIterator};
use regex::Regex;
use serde::Deserialize;
use tracing::instrument;
use walkdir::WalkDir;

use crate::domain::{Complexity, ComponentType};

/// Raw counters accumulated across a component's source files.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SourceMetrics {
    /// Non-blank, non-comment lines of code.
    pub loc: usize,
    /// Function/method definitions.
    pub functions: usize,
    /// Branching constructs.
    pub branches: usize,
    /// ORM calls and raw SQL statements.
    pub orm_calls: usize,
    /// External HTTP/API call sites.
    pub external_calls: usize,
    /// UI elements (XML tags, QWeb directives, widget bindings).
    pub ui_elements: usize,
    /// Whether any dynamic-code construct (`eval`, `exec`, ...) was seen.
    pub dynamic_code: bool,
    /// Distinct file extensions analyzed.
    pub file_types: std::collections::BTreeSet<String>,
    /// Whether a matching test file was found next to any source file.
    pub has_tests: bool,
    /// How many files contributed to the counters.
    pub files_analyzed: usize,
    /// Per-file problems encountered (missing file, unreadable, ...).
    pub errors: Vec<String>,
}

impl SourceMetrics {
    fn merge(&mut self, other: Self) {
        self.loc += other.loc;
        self.functions += other.functions;
        self.branches += other.branches;
        self.orm_calls += other.orm_calls;
        self.external_calls += other.external_calls;
        self.ui_elements += other.ui_elements;
        self.dynamic_code |= other.dynamic_code;
        self.file_types.extend(other.file_types);
        self.has_tests |= other.has_tests;
        self.files_analyzed += other.files_analyzed;
        self.errors.extend(other.errors);
    }
}

/// Scan result: raw counters plus the derived label and score.
#[derive(Debug, Clone, PartialEq)]
pub struct ComplexityReport {
    /// The accumulated counters.
    pub metrics: SourceMetrics,
    /// The complexity label derived from the LOC rules.
    pub label: Complexity,
    /// Weighted score over the normalized metrics.
    pub score: f64,
    /// The metrics contributing most to the score, largest first.
    pub top_contributors: Vec<(&'static str, f64)>,
}

/// LOC thresholds for one complexity level.
#[derive(Debug, Clone, Copy, Default, Deserialize, PartialEq, Eq)]
pub struct LevelRule {
    /// Upper LOC bound for this level (inclusive).
    #[serde(default)]
    pub max_loc: Option<usize>,
    /// Lower LOC bound for this level (inclusive); used by the top level.
    #[serde(default)]
    pub min_loc: Option<usize>,
}

impl LevelRule {
    /// Whether a LOC count falls inside this level.
    ///
    /// Levels are checked simplest-first, so only the bounds of this level
    /// matter: `min_loc` gates entry, `max_loc` caps it.
    #[must_use]
    pub const fn matches(self, loc: usize) -> bool {
        if let Some(min) = self.min_loc {
            if loc < min {
                return false;
            }
            if self.max_loc.is_none() {
                return true;
            }
        }
        if let Some(max) = self.max_loc {
            return loc <= max;
        }
        false
    }
}

/// Per-component-type complexity rules.
#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
#[serde(transparent)]
pub struct ComplexityRules(BTreeMap<ComponentType, BTreeMap<Complexity, LevelRule>>);

impl ComplexityRules {
    /// Derives a complexity label from a LOC count.
    ///
    /// Levels are checked simplest-first and the first match wins, so a
    /// component always gets the lowest applicable level.
    ///
    /// # Errors
    ///
    /// Returns an error if no rules exist for the component type, or no
    /// level matches — the rules file is authoritative and has no fallback.
    pub fn label(&self, ty: ComponentType, loc: usize) -> Result<Complexity, AnalyzeError> {
        let levels = self
            .0
            .get(&ty)
            .ok_or(AnalyzeError::NoRules { component_type: ty })?;

        Complexity::ALL
            .into_iter()
            .find(|level| levels.get(level).copied().unwrap_or_default().matches(loc))
            .ok_or(AnalyzeError::NoLevelMatched {
                component_type: ty,
                loc,
            })
    }
}

/// Normalization ceilings for the weighted score.
#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct MetricLimits {
    /// LOC ceiling (log-scaled).
    pub loc_max: usize,
    /// Function-count ceiling.
    pub functions_max: usize,
    /// Branch-count ceiling.
    pub branches_max: usize,
    /// ORM/SQL-call ceiling.
    pub orm_calls_max: usize,
    /// External-call ceiling.
    pub external_calls_max: usize,
    /// UI-element ceiling.
    pub ui_elements_max: usize,
}

impl Default for MetricLimits {
    fn default() -> Self {
        Self {
            loc_max: 2000,
            functions_max: 50,
            branches_max: 100,
            orm_calls_max: 30,
            external_calls_max: 10,
            ui_elements_max: 50,
        }
    }
}

/// Weights applied to the normalized metrics.
#[derive(Debug, Clone, Copy, Deserialize, PartialEq)]
#[serde(default)]
pub struct MetricWeights {
    /// Weight of (log-scaled) LOC.
    pub loc: f64,
    /// Weight of function count.
    pub functions: f64,
    /// Weight of branch count.
    pub branches: f64,
    /// Weight of ORM/SQL calls.
    pub orm_calls: f64,
    /// Weight of external calls.
    pub external_calls: f64,
    /// Weight of UI elements.
    pub ui_elements: f64,
    /// Weight of the dynamic-code flag.
    pub dynamic_code: f64,
    /// Weight of the file-type mix.
    pub file_types_mix: f64,
    /// Weight of test presence (negative: tests reduce risk).
    pub test_coverage: f64,
}

impl Default for MetricWeights {
    fn default() -> Self {
        Self {
            loc: 1.5,
            functions: 1.0,
            branches: 0.8,
            orm_calls: 1.2,
            external_calls: 1.5,
            ui_elements: 0.6,
            dynamic_code: 2.5,
            file_types_mix: 0.5,
            test_coverage: -0.8,
        }
    }
}

/// Scan configuration: limits and weights.
#[derive(Debug, Clone, Copy, Default, Deserialize, PartialEq)]
#[serde(default)]
pub struct ScanConfig {
    /// Normalization ceilings.
    pub limits: MetricLimits,
    /// Metric weights.
    pub weights: MetricWeights,
}

/// Errors raised by the complexity scan.
#[derive(Debug, thiserror::Error)]
pub enum AnalyzeError {
    /// No file contributed any metrics.
    #[error("No files were successfully analyzed: {}", errors.join("; "))]
    NoFiles {
        /// Per-file problems encountered.
        errors: Vec<String>,
    },

    /// The rules table has no entry for the component type.
    #[error("No complexity rules for component type '{component_type}'")]
    NoRules {
        /// The type lacking rules.
        component_type: ComponentType,
    },

    /// No configured level matched the LOC count.
    #[error("No complexity level matched for '{component_type}' at {loc} lines")]
    NoLevelMatched {
        /// The component type being labelled.
        component_type: ComponentType,
        /// The LOC count that matched nothing.
        loc: usize,
    },
}

/// Analyzes a set of source files for one component.
///
/// Files are scanned in parallel and their counters merged. Unreadable or
/// missing files are recorded in `metrics.errors` rather than aborting the
/// scan, but a scan where nothing was analyzable is an error.
///
/// # Errors
///
/// Returns an [`AnalyzeError`] when no file could be analyzed, or when the
/// rules cannot label the merged LOC count.
#[instrument(skip(rules, config))]
pub fn analyze_files(
    paths: &[PathBuf],
    ty: ComponentType,
    rules: &ComplexityRules,
    config: &ScanConfig,
) -> Result<ComplexityReport, AnalyzeError> {
    let per_file: Vec<SourceMetrics> = paths.par_iter().map(|path| analyze_path(path)).collect();

    let mut metrics = SourceMetrics::default();
    for file_metrics in per_file {
        metrics.merge(file_metrics);
    }

    if metrics.files_analyzed == 0 {
        return Err(AnalyzeError::NoFiles {
            errors: metrics.errors,
        });
    }

    let label = rules.label(ty, metrics.loc)?;
    let (score, top_contributors) = score_metrics(&metrics, config);

    Ok(ComplexityReport {
        metrics,
        label,
        score,
        top_contributors,
    })
}

/// Analyzes every `.py`, `.xml`, and `.js` file under a directory.
///
/// # Errors
///
/// Same failure modes as [`analyze_files`].
pub fn analyze_dir(
    dir: &Path,
    ty: ComponentType,
    rules: &ComplexityRules,
    config: &ScanConfig,
) -> Result<ComplexityReport, AnalyzeError> {
    let paths: Vec<PathBuf> = WalkDir::new(dir)
        .sort_by_file_name()
        .into_iter()
        .filter_map(Result::ok)
        .filter(|entry| entry.file_type().is_file())
        .map(walkdir::DirEntry::into_path)
        .filter(|path| {
            matches!(
                path.extension().and_then(|e| e.to_str()),
                Some("py" | "xml" | "js")
            )
        })
        .collect();

    analyze_files(&paths, ty, rules, config)
}

fn analyze_path(path: &Path) -> SourceMetrics {
    let content = match std::fs::read_to_string(path) {
        Ok(content) => content,
        Err(err) => {
            return SourceMetrics {
                errors: vec![format!("{}: {err}", path.display())],
                ..SourceMetrics::default()
            };
        }
    };

    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("unknown")
        .to_lowercase();

    let mut metrics = match extension.as_str() {
        "py" => analyze_python(&content),
        "xml" => analyze_xml(&content),
        "js" => analyze_javascript(&content),
        // Unknown file type: count non-blank lines and move on.
        _ => SourceMetrics {
            loc: content.lines().filter(|l| !l.trim().is_empty()).count(),
            ..SourceMetrics::default()
        },
    };

    metrics.file_types.insert(extension);
    metrics.files_analyzed = 1;
    metrics.has_tests = has_test_sibling(path);
    metrics
}

fn has_test_sibling(path: &Path) -> bool {
    let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
        return false;
    };
    let test_name = format!("test_{name}");

    if let Some(parent) = path.parent() {
        if parent.join(&test_name).exists() {
            return true;
        }
        if let Some(grandparent) = parent.parent() {
            if grandparent.join("tests").join(&test_name).exists() {
                return true;
            }
        }
    }
    false
}

static PY_FUNCTION: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)^\s*(?:async\s+)?def\s+\w+\s*\(").unwrap());
static PY_BRANCH: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)^\s*(?:if|elif|for|while|try|except|match)\b").unwrap());
static PY_ORM: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r#"(?x)
        \.(?:search|browse|create|write|unlink|read|read_group|search_read|search_count)\s*\(
        | self\.env\[
        | _sql_constraints
        | cr\.execute
        | (?i)execute\s*\(\s*["'](?:SELECT|INSERT|UPDATE|DELETE)
        "#,
    )
    .unwrap()
});
static PY_EXTERNAL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"requests\.(?:get|post|put|delete|patch)\s*\(|urllib|http\.client|aiohttp|httpx")
        .unwrap()
});
static PY_DYNAMIC: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\beval\s*\(|\bexec\s*\(|__import__\s*\(|importlib\.import_module").unwrap()
});

fn analyze_python(content: &str) -> SourceMetrics {
    let mut metrics = SourceMetrics::default();
    metrics.loc = python_loc(content);
    metrics.functions = PY_FUNCTION.find_iter(content).count();
    metrics.branches = PY_BRANCH.find_iter(content).count();
    metrics.orm_calls = PY_ORM.find_iter(content).count();
    metrics.external_calls = PY_EXTERNAL.find_iter(content).count();
    metrics.dynamic_code = PY_DYNAMIC.is_match(content);
    metrics
}

/// Counts non-blank, non-comment Python lines, skipping docstring bodies.
fn python_loc(content: &str) -> usize {
    let mut count = 0;
    let mut in_docstring = false;

    for line in content.lines() {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }

        let triples = trimmed.matches("\"\"\"").count() + trimmed.matches("'''").count();
        if triples == 2 {
            // Opening and closing on the same line.
            continue;
        }
        if triples == 1 {
            in_docstring = !in_docstring;
            continue;
        }
        if in_docstring || trimmed.starts_with('#') {
            continue;
        }
        count += 1;
    }

    count
}

static XML_AUTOMATION: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"(?i)model=["']base\.automation["']"#).unwrap());
static XML_DOMAIN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?is)<field\s+name=["']filter_domain["'][^>]*>(.*?)</field>"#).unwrap()
});
static XML_ARCH: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?is)<field\s+name=["']arch["'][^>]*type=["']xml["'][^>]*>\s*(.*?)\s*</field>"#)
        .unwrap()
});
static XML_ARCH_ALT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?is)<field\s+name=["']arch["'][^>]*>\s*(.*?)\s*</field>"#).unwrap()
});
static XML_UI: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"<(?:field|button|widget|group|notebook|page|tree|form|kanban|search|xpath)\s|<t\s+t-",
    )
    .unwrap()
});

fn analyze_xml(content: &str) -> SourceMetrics {
    let mut metrics = SourceMetrics::default();

    // Automation records are configuration: one line, unless the filter
    // domain carries enough conditions to be real logic.
    if XML_AUTOMATION.is_match(content) {
        metrics.loc = 1;
        if let Some(captures) = XML_DOMAIN.captures(content) {
            let conditions = captures[1].matches('(').count();
            if conditions > 3 {
                metrics.loc = conditions;
            }
        }
        return metrics;
    }

    // View files: only the <arch> payload is meaningful; the record wrapper
    // is boilerplate.
    match extract_arch(content) {
        Some(arch) => {
            metrics.loc = meaningful_xml_lines(&arch);
            metrics.ui_elements = XML_UI.find_iter(&arch).count();
        }
        None => {
            metrics.loc = content.lines().filter(|l| !l.trim().is_empty()).count();
            metrics.ui_elements = XML_UI.find_iter(content).count();
        }
    }

    metrics
}

/// Pulls the payload of every `<field name="arch">` out of a view file.
/// Multiple views in one file are concatenated.
fn extract_arch(content: &str) -> Option<String> {
    let collect = |regex: &Regex| -> Vec<&str> {
        regex
            .captures_iter(content)
            .filter_map(|c| c.get(1).map(|m| m.as_str()))
            .collect()
    };

    let matches = collect(&XML_ARCH);
    let matches = if matches.is_empty() {
        collect(&XML_ARCH_ALT)
    } else {
        matches
    };

    (!matches.is_empty()).then(|| matches.join("\n"))
}

static XML_WRAPPER_LINE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^(?:</|<data\s*>?\s*$|<template\s*[^>]*>\s*$)").unwrap());

/// Counts view lines, ignoring closing tags and bare wrapper tags.
fn meaningful_xml_lines(content: &str) -> usize {
    content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !XML_WRAPPER_LINE.is_match(line))
        .count()
}

static JS_FUNCTION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"function\s+\w+\s*\(|\w+\s*:\s*function\s*\(|=>|async\s+\w+\s*\(").unwrap()
});
static JS_UI: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\.template\s*=|_renderElement|\.widget\s*=|Component\.extend|<t\s+t-").unwrap()
});
static JS_EXTERNAL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"fetch\s*\(|XMLHttpRequest|\$\.ajax|axios").unwrap());
static JS_BRANCH: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\bif\s*\(|\belse\s|\bswitch\s*\(|\bcase\s|\bfor\s*\(|\bwhile\s*\(").unwrap()
});

fn analyze_javascript(content: &str) -> SourceMetrics {
    let mut metrics = SourceMetrics::default();
    metrics.loc = content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with("//"))
        .count();
    metrics.functions = JS_FUNCTION.find_iter(content).count();
    metrics.ui_elements = JS_UI.find_iter(content).count();
    metrics.external_calls = JS_EXTERNAL.find_iter(content).count();
    metrics.branches = JS_BRANCH.find_iter(content).count();
    metrics
}

#[allow(clippy::cast_precision_loss)]
fn score_metrics(metrics: &SourceMetrics, config: &ScanConfig) -> (f64, Vec<(&'static str, f64)>) {
    let limits = &config.limits;
    let weights = &config.weights;

    let normalize = |value: usize, max: usize| -> f64 {
        if max == 0 {
            0.0
        } else {
            (value as f64 / max as f64).min(1.0)
        }
    };

    let loc_norm = ((metrics.loc as f64).ln_1p() / (limits.loc_max as f64).ln_1p()).min(1.0);

    let contributions = [
        ("loc", loc_norm * weights.loc),
        (
            "functions",
            normalize(metrics.functions, limits.functions_max) * weights.functions,
        ),
        (
            "branches",
            normalize(metrics.branches, limits.branches_max) * weights.branches,
        ),
        (
            "orm_calls",
            normalize(metrics.orm_calls, limits.orm_calls_max) * weights.orm_calls,
        ),
        (
            "external_calls",
            normalize(metrics.external_calls, limits.external_calls_max) * weights.external_calls,
        ),
        (
            "ui_elements",
            normalize(metrics.ui_elements, limits.ui_elements_max) * weights.ui_elements,
        ),
        (
            "dynamic_code",
            if metrics.dynamic_code { weights.dynamic_code } else { 0.0 },
        ),
        (
            "file_types_mix",
            normalize(metrics.file_types.len(), 5) * weights.file_types_mix,
        ),
        (
            "test_coverage",
            if metrics.has_tests { weights.test_coverage } else { 0.0 },
        ),
    ];

    let score: f64 = contributions.iter().map(|(_, c)| c).sum::<f64>().max(0.0);

    let mut positive: Vec<(&'static str, f64)> = contributions
        .into_iter()
        .filter(|&(_, contribution)| contribution > 0.0)
        .collect();
    positive.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
    positive.truncate(3);

    (score, positive)
}
