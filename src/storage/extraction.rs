//! Loading extraction output.
//!
//! An extraction run writes one JSON file per component type into a
//! directory. Each file holds a `records` array of raw Odoo records; this
//! module turns those into [`Component`]s, inferring a coarse complexity
//! label from the type-specific payload. Missing files are skipped — a run
//! that found no reports simply writes no report file.

use std::path::{Path, PathBuf};

use rayon::iter::{IntoParallelRefIterator, ParallelIterator};
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, instrument};

use crate::domain::{filter, Complexity, Component, ComponentType, DomainExpr};

/// The per-type extraction files, in processing order.
const EXTRACTION_FILES: [(&str, ComponentType); 5] = [
    ("custom_fields_output.json", ComponentType::Field),
    ("views_metadata.json", ComponentType::View),
    ("server_actions_output.json", ComponentType::ServerAction),
    ("auto_actions_output.json", ComponentType::Automation),
    ("reports_output.json", ComponentType::Report),
];

/// Errors raised while loading extraction output.
#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    /// A file existed but could not be read.
    #[error("Failed to read {path}: {source}")]
    Io {
        /// The file that failed.
        path: PathBuf,
        /// The underlying I/O error.
        source: std::io::Error,
    },

    /// A file was not valid JSON or had an unexpected shape.
    #[error("Failed to parse {path}: {source}")]
    Json {
        /// The file that failed.
        path: PathBuf,
        /// The underlying deserialization error.
        source: serde_json::Error,
    },

    /// A configured record filter was malformed.
    #[error("Invalid filter for '{key}': {source}")]
    Filter {
        /// The filter key (component-type name).
        key: String,
        /// The underlying domain-parse error.
        source: filter::ParseError,
    },
}

/// Client-side record filters, one optional domain per component type.
///
/// Extraction output is sometimes broader than a project wants to plan for;
/// filters restrict the loaded pool without re-running the extraction.
#[derive(Debug, Default)]
pub struct ExtractionFilters {
    filters: Vec<(ComponentType, DomainExpr)>,
}

impl ExtractionFilters {
    /// Loads filters from a JSON file mapping component-type names
    /// (`custom_fields`, `views`, `server_actions`, `automations`,
    /// `reports`) to domain lists. Absent keys mean "no filter".
    ///
    /// # Errors
    ///
    /// Returns a [`LoadError`] if the file cannot be read or parsed, or if a
    /// domain list is malformed.
    pub fn load(path: &Path) -> Result<Self, LoadError> {
        let content = std::fs::read_to_string(path).map_err(|source| LoadError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let raw: serde_json::Map<String, Value> =
            serde_json::from_str(&content).map_err(|source| LoadError::Json {
                path: path.to_path_buf(),
                source,
            })?;

        let mut filters = Vec::new();
        for (key, ty) in [
            ("custom_fields", ComponentType::Field),
            ("views", ComponentType::View),
            ("server_actions", ComponentType::ServerAction),
            ("automations", ComponentType::Automation),
            ("reports", ComponentType::Report),
        ] {
            if let Some(domain) = raw.get(key) {
                let expr = DomainExpr::parse(domain).map_err(|source| LoadError::Filter {
                    key: key.to_string(),
                    source,
                })?;
                filters.push((ty, expr));
            }
        }

        Ok(Self { filters })
    }

    /// The filter configured for a component type, if any.
    #[must_use]
    pub fn for_type(&self, ty: ComponentType) -> Option<&DomainExpr> {
        self.filters
            .iter()
            .find(|(t, _)| *t == ty)
            .map(|(_, expr)| expr)
    }
}

/// Loads every extraction file in `dir` into a component pool.
///
/// Files load in parallel; the returned pool preserves the fixed file order
/// (fields, views, server actions, automations, reports) and, within a file,
/// record order.
///
/// # Errors
///
/// Returns the first [`LoadError`] encountered. A missing file is not an
/// error; an unreadable or malformed one is.
#[instrument(skip(filters))]
pub fn load_pool(dir: &Path, filters: &ExtractionFilters) -> Result<Vec<Component>, LoadError> {
    let per_file: Vec<Result<Vec<Component>, LoadError>> = EXTRACTION_FILES
        .par_iter()
        .map(|&(filename, ty)| load_file(&dir.join(filename), ty, filters.for_type(ty)))
        .collect();

    let mut pool = Vec::new();
    for loaded in per_file {
        pool.extend(loaded?);
    }

    debug!(components = pool.len(), "loaded extraction pool");
    Ok(pool)
}

#[derive(Debug, Deserialize)]
struct RecordsFile {
    #[serde(default)]
    records: Vec<serde_json::Map<String, Value>>,
}

fn load_file(
    path: &Path,
    ty: ComponentType,
    filter: Option<&DomainExpr>,
) -> Result<Vec<Component>, LoadError> {
    if !path.exists() {
        return Ok(Vec::new());
    }

    let content = std::fs::read_to_string(path).map_err(|source| LoadError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let file: RecordsFile = serde_json::from_str(&content).map_err(|source| LoadError::Json {
        path: path.to_path_buf(),
        source,
    })?;

    Ok(file
        .records
        .into_iter()
        .filter(|record| filter.is_none_or(|f| f.matches(record)))
        .map(|record| parse_record(&record, ty))
        .collect())
}

fn parse_record(record: &serde_json::Map<String, Value>, ty: ComponentType) -> Component {
    let name = str_field(record, "name");
    let display_name = match ty {
        ComponentType::Field => first_str(record, &["field_description", "name"]),
        _ => first_str(record, &["display_name", "name"]),
    };
    let model = match ty {
        ComponentType::ServerAction | ComponentType::Automation => model_from_pair(record),
        _ => str_field(record, "model"),
    };

    let complexity = match ty {
        ComponentType::Field => field_complexity(record),
        ComponentType::View => view_complexity(record),
        ComponentType::ServerAction => code_complexity(&str_field(record, "code")),
        ComponentType::Automation => automation_complexity(record),
        ComponentType::Report => report_complexity(record),
    };

    Component {
        id: record
            .get("id")
            .and_then(Value::as_u64)
            .and_then(|id| u32::try_from(id).ok())
            .unwrap_or(0),
        name,
        display_name,
        component_type: ty,
        model,
        complexity,
        file_path: record
            .get("file_path")
            .and_then(Value::as_str)
            .map(PathBuf::from),
    }
}

fn str_field(record: &serde_json::Map<String, Value>, key: &str) -> String {
    record
        .get(key)
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string()
}

fn first_str(record: &serde_json::Map<String, Value>, keys: &[&str]) -> String {
    keys.iter()
        .map(|key| str_field(record, key))
        .find(|value| !value.is_empty())
        .unwrap_or_default()
}

/// Server actions and automations carry their model either as a flat
/// `model_name` string or as an Odoo `[id, "model.name"]` pair under
/// `model_id`.
fn model_from_pair(record: &serde_json::Map<String, Value>) -> String {
    let flat = str_field(record, "model_name");
    if !flat.is_empty() {
        return flat;
    }

    record
        .get("model_id")
        .and_then(Value::as_array)
        .and_then(|pair| pair.get(1))
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string()
}

fn line_count(text: &str) -> usize {
    text.split('\n').count()
}

fn field_complexity(record: &serde_json::Map<String, Value>) -> Complexity {
    let compute = str_field(record, "compute");
    if !compute.is_empty() {
        return if line_count(&compute) > 10 {
            Complexity::Complex
        } else {
            Complexity::Medium
        };
    }

    let ttype = str_field(record, "ttype");
    if matches!(ttype.as_str(), "many2one" | "one2many" | "many2many") {
        return Complexity::Medium;
    }

    Complexity::Simple
}

fn view_complexity(record: &serde_json::Map<String, Value>) -> Complexity {
    match line_count(&str_field(record, "arch")) {
        n if n > 150 => Complexity::VeryComplex,
        n if n > 50 => Complexity::Complex,
        n if n > 20 => Complexity::Medium,
        _ => Complexity::Simple,
    }
}

fn code_complexity(code: &str) -> Complexity {
    if code.is_empty() {
        return Complexity::Simple;
    }
    match line_count(code) {
        n if n > 150 => Complexity::VeryComplex,
        n if n > 50 => Complexity::Complex,
        n if n > 20 => Complexity::Medium,
        _ => Complexity::Simple,
    }
}

fn automation_complexity(record: &serde_json::Map<String, Value>) -> Complexity {
    let code = str_field(record, "code");
    if !code.is_empty() {
        return code_complexity(&code);
    }

    let trigger = str_field(record, "trigger");
    if matches!(
        trigger.as_str(),
        "on_time" | "on_time_created" | "on_time_updated"
    ) {
        return Complexity::Medium;
    }

    if str_field(record, "filter_domain").len() > 50 {
        return Complexity::Medium;
    }

    Complexity::Simple
}

fn report_complexity(record: &serde_json::Map<String, Value>) -> Complexity {
    if str_field(record, "report_type") == "qweb-pdf" {
        Complexity::Complex
    } else {
        Complexity::Medium
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn write_file(dir: &Path, name: &str, value: &Value) {
        std::fs::write(dir.join(name), serde_json::to_string_pretty(value).unwrap()).unwrap();
    }

    #[test]
    fn loads_components_from_all_present_files() {
        let tmp = tempfile::tempdir().unwrap();

        write_file(
            tmp.path(),
            "custom_fields_output.json",
            &json!({"records": [
                {"id": 1, "name": "x_credit_limit", "field_description": "Credit Limit",
                 "model": "sale.order", "ttype": "float"},
                {"id": 2, "name": "x_partner_ref", "model": "sale.order", "ttype": "many2one"}
            ]}),
        );
        write_file(
            tmp.path(),
            "server_actions_output.json",
            &json!({"records": [
                {"id": 3, "name": "Check Credit", "model_id": [42, "sale.order"],
                 "code": "if record.amount_total > limit:\n    raise UserError('over limit')"}
            ]}),
        );

        let pool = load_pool(tmp.path(), &ExtractionFilters::default()).unwrap();

        assert_eq!(pool.len(), 3);
        assert_eq!(pool[0].display_name, "Credit Limit");
        assert_eq!(pool[0].complexity, Complexity::Simple);
        assert_eq!(pool[1].complexity, Complexity::Medium);
        assert_eq!(pool[2].component_type, ComponentType::ServerAction);
        assert_eq!(pool[2].model, "sale.order");
    }

    #[test]
    fn empty_directory_loads_empty_pool() {
        let tmp = tempfile::tempdir().unwrap();
        let pool = load_pool(tmp.path(), &ExtractionFilters::default()).unwrap();
        assert!(pool.is_empty());
    }

    #[test]
    fn malformed_json_is_an_error() {
        let tmp = tempfile::tempdir().unwrap();
        std::fs::write(tmp.path().join("views_metadata.json"), "not json").unwrap();

        let err = load_pool(tmp.path(), &ExtractionFilters::default()).unwrap_err();
        assert!(matches!(err, LoadError::Json { .. }));
    }

    #[test]
    fn pool_order_follows_file_then_record_order() {
        let tmp = tempfile::tempdir().unwrap();
        write_file(
            tmp.path(),
            "views_metadata.json",
            &json!({"records": [{"id": 10, "name": "v1"}, {"id": 11, "name": "v2"}]}),
        );
        write_file(
            tmp.path(),
            "custom_fields_output.json",
            &json!({"records": [{"id": 20, "name": "f1"}]}),
        );

        let pool = load_pool(tmp.path(), &ExtractionFilters::default()).unwrap();
        let ids: Vec<u32> = pool.iter().map(|c| c.id).collect();
        // Fields always precede views, regardless of load completion order.
        assert_eq!(ids, vec![20, 10, 11]);
    }

    #[test]
    fn filters_restrict_loaded_records() {
        let tmp = tempfile::tempdir().unwrap();
        write_file(
            tmp.path(),
            "custom_fields_output.json",
            &json!({"records": [
                {"id": 1, "name": "x_keep", "ttype": "char"},
                {"id": 2, "name": "x_drop", "ttype": "binary"}
            ]}),
        );
        write_file(
            tmp.path(),
            "filters.json",
            &json!({"custom_fields": [["ttype", "!=", "binary"]]}),
        );

        let filters = ExtractionFilters::load(&tmp.path().join("filters.json")).unwrap();
        let pool = load_pool(tmp.path(), &filters).unwrap();

        assert_eq!(pool.len(), 1);
        assert_eq!(pool[0].name, "x_keep");
    }

    #[test]
    fn invalid_filter_is_an_error() {
        let tmp = tempfile::tempdir().unwrap();
        write_file(
            tmp.path(),
            "filters.json",
            &json!({"automations": [["state", "resembles", "x"]]}),
        );

        let err = ExtractionFilters::load(&tmp.path().join("filters.json")).unwrap_err();
        assert!(matches!(err, LoadError::Filter { .. }));
    }

    #[test]
    fn automation_complexity_prefers_code_then_trigger_then_domain() {
        let timed = json!({"trigger": "on_time"});
        assert_eq!(
            automation_complexity(timed.as_object().unwrap()),
            Complexity::Medium
        );

        let long_domain = json!({"filter_domain": "x".repeat(60)});
        assert_eq!(
            automation_complexity(long_domain.as_object().unwrap()),
            Complexity::Medium
        );

        let plain = json!({"trigger": "on_create"});
        assert_eq!(
            automation_complexity(plain.as_object().unwrap()),
            Complexity::Simple
        );
    }
}
