use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use rayon::prelude::*;
use serde_json::Value;
use serde_sarif::sarif::Sarif;
use tracing::{debug, info};

use crate::error::SummaryError;
use crate::finding::{Finding, FindingArray};
use crate::sarif::{find_tool_component_driver, take_result_levels};

/// A parsed SARIF file.
#[derive(Debug)]
pub(crate) struct SarifDocument {
    pub(crate) sarif: Sarif,
    /// Raw result levels, indexed by run then by result.
    pub(crate) result_levels: Vec<Vec<Option<String>>>,
}

/// Identity of one run across all input files.
#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) struct RunMetadata {
    pub(crate) id: usize,
    pub(crate) tool_name: String,
}

/// Everything read from the input SARIF files.
#[derive(Clone, Debug, Default)]
pub(crate) struct Model {
    pub(crate) sarif_files: Vec<String>,
    pub(crate) runs: Vec<RunMetadata>,
    pub(crate) findings: FindingArray,
}

impl Model {
    /// Reads and parses every file, then assembles the model in input order.
    ///
    /// Files are read in parallel; any read or parse failure aborts the build.
    pub(crate) fn build(files: &[PathBuf]) -> Result<Self, SummaryError> {
        if files.is_empty() {
            return Err(SummaryError::InputNotFound {
                reason: "input list is empty".to_string(),
            });
        }
        let documents = files
            .par_iter()
            .map(|path| {
                let document = read_sarif(path)?;
                Ok((path.display().to_string(), document))
            })
            .collect::<Result<Vec<_>, SummaryError>>()?;
        Self::from_documents(documents)
    }

    /// Assembles the model from already parsed documents.
    ///
    /// Run ids start at 1 and follow document order, then run order.
    pub(crate) fn from_documents(
        documents: Vec<(String, SarifDocument)>,
    ) -> Result<Self, SummaryError> {
        if documents.is_empty() {
            return Err(SummaryError::InputNotFound {
                reason: "input list is empty".to_string(),
            });
        }
        let mut model = Model::default();
        let mut next_run_id = 1;
        for (sarif_path, document) in documents {
            let shared_path: Arc<str> = Arc::from(sarif_path.as_str());
            model.sarif_files.push(sarif_path);
            let mut run_levels = document.result_levels.into_iter();
            for mut run in document.sarif.runs {
                let run_id = next_run_id;
                next_run_id += 1;
                let results = run.results.take().unwrap_or_default();
                let mut levels = run_levels.next().unwrap_or_default().into_iter();
                let run = Arc::new(run);
                let mut tool_name = None;
                for result in results {
                    let finding = Finding::new(
                        Arc::clone(&shared_path),
                        run_id,
                        Arc::clone(&run),
                        Arc::new(result),
                        levels.next().flatten(),
                    );
                    tool_name.get_or_insert_with(|| finding.tool_name().to_string());
                    model.findings.push(finding);
                }
                let tool_name =
                    tool_name.unwrap_or_else(|| find_tool_component_driver(&run).name.clone());
                debug!("run {run_id} of {shared_path} produced by {tool_name}");
                model.runs.push(RunMetadata {
                    id: run_id,
                    tool_name,
                });
            }
        }
        info!(
            "loaded {} findings from {} runs in {} SARIF files",
            model.findings.len(),
            model.runs.len(),
            model.sarif_files.len()
        );
        Ok(model)
    }
}

fn read_sarif(path: &Path) -> Result<SarifDocument, SummaryError> {
    let content = fs::read_to_string(path).map_err(|source| SummaryError::ReadInput {
        path: path.to_path_buf(),
        source,
    })?;
    parse_sarif(path, &content)
}

/// Parses in two steps so result levels outside the SARIF vocabulary survive:
/// they are taken out of the raw JSON before the typed conversion.
pub(crate) fn parse_sarif(path: &Path, content: &str) -> Result<SarifDocument, SummaryError> {
    let malformed = |source| SummaryError::MalformedInput {
        path: path.to_path_buf(),
        source,
    };
    let deserializer = &mut serde_json::Deserializer::from_str(content);
    let mut raw: Value = serde_path_to_error::deserialize(deserializer).map_err(malformed)?;
    let result_levels = take_result_levels(&mut raw);
    let sarif = serde_path_to_error::deserialize(raw).map_err(malformed)?;
    Ok(SarifDocument {
        sarif,
        result_levels,
    })
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::finding::Level;
    use serde_json::json;
    use tempfile::tempdir;

    pub(crate) fn sarif_document(runs: Value) -> String {
        json!({
            "$schema": "https://json.schemastore.org/sarif-2.1.0.json",
            "version": "2.1.0",
            "runs": runs
        })
        .to_string()
    }

    pub(crate) fn tool_run(name: &str, results: Value) -> Value {
        json!({
            "tool": { "driver": { "name": name, "rules": [{ "id": "R" }] } },
            "results": results
        })
    }

    pub(crate) fn result(level: &str) -> Value {
        json!({ "message": { "text": "m" }, "ruleId": "R", "level": level })
    }

    pub(crate) fn model_from(documents: &[(&str, String)]) -> Model {
        let parsed = documents
            .iter()
            .map(|(path, content)| {
                let document = parse_sarif(Path::new(path), content).expect("parse SARIF");
                (path.to_string(), document)
            })
            .collect();
        Model::from_documents(parsed).expect("build model")
    }

    #[test]
    fn run_ids_follow_file_then_run_order() {
        let model = model_from(&[
            (
                "a.sarif",
                sarif_document(json!([
                    tool_run("A1", json!([result("error")])),
                    tool_run("A2", json!([]))
                ])),
            ),
            ("b.sarif", sarif_document(json!([tool_run("B1", json!([result("note")]))]))),
        ]);

        let runs: Vec<(usize, &str)> = model
            .runs
            .iter()
            .map(|run| (run.id, run.tool_name.as_str()))
            .collect();
        assert_eq!(runs, vec![(1, "A1"), (2, "A2"), (3, "B1")]);
        assert_eq!(model.sarif_files, vec!["a.sarif", "b.sarif"]);
        let findings: Vec<(usize, &str)> = model
            .findings
            .iter()
            .map(|finding| (finding.run_id(), finding.sarif_path()))
            .collect();
        assert_eq!(findings, vec![(1, "a.sarif"), (3, "b.sarif")]);
    }

    #[test]
    fn run_tool_name_comes_from_first_result_component() {
        let run = json!({
            "tool": {
                "driver": { "name": "Driver" },
                "extensions": [{ "name": "Plugin", "rules": [{ "id": "P" }] }]
            },
            "results": [{
                "message": { "text": "m" },
                "rule": { "id": "P", "toolComponent": { "index": 0 } }
            }]
        });
        let model = model_from(&[("a.sarif", sarif_document(json!([run])))]);

        assert_eq!(model.runs[0].tool_name, "Plugin");
    }

    fn levels(model: &Model) -> Vec<Level> {
        model.findings.iter().map(|finding| finding.level()).collect()
    }

    #[test]
    fn unrecognized_result_level_parses_as_none() {
        let model = model_from(&[(
            "a.sarif",
            sarif_document(json!([tool_run(
                "Trivy",
                json!([
                    result("error"),
                    { "message": { "text": "m" }, "ruleId": "R" },
                    result("bogus")
                ])
            )])),
        )]);

        assert_eq!(levels(&model), vec![Level::Error, Level::Unknown, Level::None]);
    }

    #[test]
    fn result_levels_stay_with_their_run() {
        let model = model_from(&[(
            "a.sarif",
            sarif_document(json!([
                tool_run("A", json!([result("bogus")])),
                { "tool": { "driver": { "name": "Empty" } } },
                tool_run("B", json!([result("note"), result("warning")]))
            ])),
        )]);

        assert_eq!(levels(&model), vec![Level::None, Level::Note, Level::Warning]);
        let runs: Vec<usize> = model.findings.iter().map(|finding| finding.run_id()).collect();
        assert_eq!(runs, vec![1, 3, 3]);
    }

    #[test]
    fn unrecognized_rule_default_level_parses_as_none() {
        let run = json!({
            "tool": {
                "driver": {
                    "name": "Trivy",
                    "rules": [
                        { "id": "B", "defaultConfiguration": { "level": "bogus" } },
                        { "id": "W", "defaultConfiguration": { "level": "warning" } }
                    ]
                }
            },
            "results": [
                { "message": { "text": "m" }, "ruleId": "B" },
                { "message": { "text": "m" }, "ruleId": "W" }
            ]
        });
        let model = model_from(&[("a.sarif", sarif_document(json!([run])))]);

        assert_eq!(levels(&model), vec![Level::None, Level::Warning]);
    }

    #[test]
    fn codeql_problem_severity_levels_classify_through_the_model() {
        let run = json!({
            "tool": {
                "driver": {
                    "name": "CodeQL",
                    "rules": [
                        { "id": "js/style", "properties": { "problem.severity": "recommendation" } },
                        { "id": "js/xss", "properties": { "problem.severity": "warning" } }
                    ]
                }
            },
            "results": [
                { "message": { "text": "m" }, "ruleId": "js/style" },
                { "message": { "text": "m" }, "ruleId": "js/xss" },
                { "message": { "text": "m" }, "ruleId": "js/style", "level": "error" }
            ]
        });
        let model = model_from(&[("codeql.sarif", sarif_document(json!([run])))]);

        assert_eq!(levels(&model), vec![Level::None, Level::Warning, Level::Error]);
    }

    #[test]
    fn build_keeps_unrecognized_levels_from_files() {
        let dir = tempdir().expect("temp dir");
        let path = dir.path().join("odd.sarif");
        fs::write(&path, sarif_document(json!([tool_run("T", json!([result("bogus")]))])))
            .expect("write SARIF");

        let model = Model::build(&[path]).expect("build model");

        assert_eq!(levels(&model), vec![Level::None]);
    }

    #[test]
    fn build_reads_files_in_order() {
        let dir = tempdir().expect("temp dir");
        let mut paths = Vec::new();
        for (index, tool) in ["First", "Second", "Third"].iter().enumerate() {
            let path = dir.path().join(format!("{index}.sarif"));
            fs::write(&path, sarif_document(json!([tool_run(tool, json!([result("warning")]))])))
                .expect("write SARIF");
            paths.push(path);
        }

        let first = Model::build(&paths).expect("build model");
        let second = Model::build(&paths).expect("build model");

        let tools: Vec<&str> = first.runs.iter().map(|run| run.tool_name.as_str()).collect();
        assert_eq!(tools, vec!["First", "Second", "Third"]);
        assert_eq!(first.runs, second.runs);
    }

    #[test]
    fn build_rejects_empty_input() {
        let error = Model::build(&[]).expect_err("empty input");

        assert!(matches!(error, SummaryError::InputNotFound { .. }));
    }

    #[test]
    fn build_fails_on_malformed_document() {
        let dir = tempdir().expect("temp dir");
        let good = dir.path().join("good.sarif");
        fs::write(&good, sarif_document(json!([tool_run("T", json!([]))]))).expect("write");
        let bad = dir.path().join("bad.sarif");
        fs::write(&bad, r#"{"version":"2.1.0","runs":[{"tool":{}}]}"#).expect("write");

        let error = Model::build(&[good, bad.clone()]).expect_err("malformed input");

        match error {
            SummaryError::MalformedInput { path, source } => {
                assert_eq!(path, bad);
                assert!(source.path().to_string().starts_with("runs[0].tool"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn build_fails_on_missing_file() {
        let dir = tempdir().expect("temp dir");

        let error = Model::build(&[dir.path().join("missing.sarif")]).expect_err("missing");

        assert!(matches!(error, SummaryError::ReadInput { .. }));
    }
}
