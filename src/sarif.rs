use serde::Serialize;
use serde_json::Value;
use serde_sarif::sarif::{ReportingDescriptor, Result as SarifResult, Run, ToolComponent};

/// Returns the run's driver component.
pub(crate) fn find_tool_component_driver(run: &Run) -> &ToolComponent {
    &run.tool.driver
}

/// Returns the extension referenced by `result.rule.toolComponent.index`, if it resolves.
pub(crate) fn find_tool_component_extension<'a>(
    run: &'a Run,
    result: &SarifResult,
) -> Option<&'a ToolComponent> {
    let index = result.rule.as_ref()?.tool_component.as_ref()?.index?;
    let index = usize::try_from(index).ok()?;
    run.tool.extensions.as_ref()?.get(index)
}

/// Returns the component that produced `result`: the referenced extension, or the driver.
pub(crate) fn find_tool_component<'a>(run: &'a Run, result: &SarifResult) -> &'a ToolComponent {
    find_tool_component_extension(run, result).unwrap_or_else(|| find_tool_component_driver(run))
}

/// Locates the rule describing `result` in the catalog of its tool component.
///
/// The rule index is tried first (the reference's own index, then `ruleIndex`),
/// and only counts when it lies inside the catalog. Otherwise the rule is looked
/// up by id (the reference's id, then `ruleId`).
pub(crate) fn find_rule<'a>(run: &'a Run, result: &SarifResult) -> Option<&'a ReportingDescriptor> {
    let reference = result.rule.as_ref();
    let index = reference
        .and_then(|reference| reference.index)
        .or(result.rule_index)
        .and_then(|index| usize::try_from(index).ok());
    let id = reference
        .and_then(|reference| reference.id.as_deref())
        .filter(|id| !id.is_empty())
        .or(result.rule_id.as_deref());

    let rules = find_tool_component(run, result).rules.as_deref()?;
    if let Some(rule) = index.and_then(|index| rules.get(index)) {
        return Some(rule);
    }
    let id = id?;
    rules.iter().find(|rule| rule.id == id)
}

/// Reads a custom property of the rule describing `result`.
pub(crate) fn find_rule_property<'a>(
    run: &'a Run,
    result: &SarifResult,
    key: &str,
) -> Option<&'a Value> {
    find_rule(run, result)?
        .properties
        .as_ref()?
        .additional_properties
        .get(key)
}

/// Removes `level` from every result of a raw SARIF document and returns the
/// values by run, then by result.
///
/// Typed results only accept the four SARIF level words; any other string is
/// kept here so it classifies as an unrecognized level instead of failing the
/// parse. Non-string values are kept as their JSON text.
pub(crate) fn take_result_levels(document: &mut Value) -> Vec<Vec<Option<String>>> {
    let Some(runs) = document.get_mut("runs").and_then(Value::as_array_mut) else {
        return Vec::new();
    };
    runs.iter_mut()
        .map(|run| {
            let Some(results) = run.get_mut("results").and_then(Value::as_array_mut) else {
                return Vec::new();
            };
            results
                .iter_mut()
                .map(|result| {
                    let level = result.as_object_mut()?.remove("level")?;
                    match level {
                        Value::Null => None,
                        Value::String(text) => Some(text),
                        other => Some(other.to_string()),
                    }
                })
                .collect()
        })
        .collect()
}

/// Raw `defaultConfiguration.level` string of a rule.
pub(crate) fn rule_default_level(rule: &ReportingDescriptor) -> Option<String> {
    let configuration = rule.default_configuration.as_ref()?;
    string_value(&configuration.level)
}

fn string_value<T: Serialize>(value: &T) -> Option<String> {
    match serde_json::to_value(value).ok()? {
        Value::String(text) => Some(text),
        _ => None,
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use serde_json::json;

    pub(crate) fn run_from_json(value: Value) -> Run {
        serde_json::from_value(value).expect("parse run")
    }

    fn rule(id: &str) -> Value {
        json!({ "id": id, "properties": { "marker": id } })
    }

    fn sample_run(results: Value) -> Run {
        run_from_json(json!({
            "tool": {
                "driver": {
                    "name": "Driver",
                    "rules": [rule("D0"), rule("D1"), rule("D2")]
                },
                "extensions": [
                    { "name": "Extension", "rules": [rule("E0"), rule("E1")] }
                ]
            },
            "results": results
        }))
    }

    fn first_result(run: &Run) -> &SarifResult {
        &run.results.as_ref().expect("results")[0]
    }

    fn resolved_id(results: Value) -> Option<String> {
        let run = sample_run(results);
        find_rule(&run, first_result(&run)).map(|rule| rule.id.clone())
    }

    #[test]
    fn tool_component_defaults_to_driver() {
        let run = sample_run(json!([{ "message": { "text": "m" }, "ruleId": "D1" }]));

        assert_eq!(find_tool_component(&run, first_result(&run)).name, "Driver");
    }

    #[test]
    fn tool_component_resolves_extension_reference() {
        let run = sample_run(json!([{
            "message": { "text": "m" },
            "rule": { "id": "E1", "toolComponent": { "index": 0 } }
        }]));

        assert_eq!(find_tool_component(&run, first_result(&run)).name, "Extension");
    }

    #[test]
    fn tool_component_falls_back_when_extension_index_is_out_of_range() {
        let run = sample_run(json!([{
            "message": { "text": "m" },
            "rule": { "id": "D1", "toolComponent": { "index": 7 } }
        }]));

        assert_eq!(find_tool_component(&run, first_result(&run)).name, "Driver");
    }

    #[test]
    fn rule_reference_index_wins_over_rule_index_and_id() {
        let id = resolved_id(json!([{
            "message": { "text": "m" },
            "ruleId": "D0",
            "ruleIndex": 1,
            "rule": { "index": 2 }
        }]));

        assert_eq!(id.as_deref(), Some("D2"));
    }

    #[test]
    fn rule_index_zero_is_a_valid_index() {
        let id = resolved_id(json!([{ "message": { "text": "m" }, "ruleId": "D2", "ruleIndex": 0 }]));

        assert_eq!(id.as_deref(), Some("D0"));
    }

    #[test]
    fn out_of_range_index_falls_back_to_id() {
        let id = resolved_id(json!([{ "message": { "text": "m" }, "ruleId": "D1", "ruleIndex": 42 }]));

        assert_eq!(id.as_deref(), Some("D1"));
    }

    #[test]
    fn reference_id_is_preferred_over_result_rule_id() {
        let id = resolved_id(json!([{
            "message": { "text": "m" },
            "ruleId": "D0",
            "rule": { "id": "D2" }
        }]));

        assert_eq!(id.as_deref(), Some("D2"));
    }

    #[test]
    fn extension_rules_are_searched_in_extension_catalog() {
        let id = resolved_id(json!([{
            "message": { "text": "m" },
            "rule": { "id": "E1", "toolComponent": { "index": 0 } }
        }]));

        assert_eq!(id.as_deref(), Some("E1"));
    }

    #[test]
    fn unknown_rule_is_absent() {
        let id = resolved_id(json!([{ "message": { "text": "m" }, "ruleId": "missing" }]));

        assert_eq!(id, None);
    }

    #[test]
    fn rule_property_reads_property_bag() {
        let run = sample_run(json!([{ "message": { "text": "m" }, "ruleId": "D1" }]));

        assert_eq!(
            find_rule_property(&run, first_result(&run), "marker"),
            Some(&json!("D1"))
        );
        assert_eq!(find_rule_property(&run, first_result(&run), "other"), None);
    }

    #[test]
    fn rule_default_level_is_read_as_raw_string() {
        let run = run_from_json(json!({
            "tool": {
                "driver": {
                    "name": "Driver",
                    "rules": [
                        { "id": "R", "defaultConfiguration": { "level": "note" } },
                        { "id": "B", "defaultConfiguration": { "level": "bogus" } }
                    ]
                }
            },
            "results": [{ "message": { "text": "m" }, "ruleId": "R" }]
        }));
        let rules = run.tool.driver.rules.as_deref().expect("rules");

        assert_eq!(rule_default_level(&rules[0]).as_deref(), Some("note"));
        assert_eq!(rule_default_level(&rules[1]).as_deref(), Some("bogus"));
    }

    #[test]
    fn result_levels_are_taken_out_of_the_document() {
        let mut document = json!({
            "version": "2.1.0",
            "runs": [
                {
                    "tool": { "driver": { "name": "A" } },
                    "results": [
                        { "message": { "text": "m" }, "level": "error" },
                        { "message": { "text": "m" } },
                        { "message": { "text": "m" }, "level": "bogus" },
                        { "message": { "text": "m" }, "level": 3 }
                    ]
                },
                { "tool": { "driver": { "name": "B" } } }
            ]
        });

        let levels = take_result_levels(&mut document);

        assert_eq!(
            levels,
            vec![
                vec![
                    Some("error".to_string()),
                    None,
                    Some("bogus".to_string()),
                    Some("3".to_string())
                ],
                vec![]
            ]
        );
        let results = document["runs"][0]["results"].as_array().expect("results");
        assert!(results.iter().all(|result| result.get("level").is_none()));
    }
}
