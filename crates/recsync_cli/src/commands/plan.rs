//! Plan command implementation.
//!
//! Replays a merge against a scratch memory store seeded with the past
//! file, and reports the statements the merge issued.

use super::Inputs;
use recsync_core::{merge, MergeOptions, MergeReport, RecordCollection, RecordType};
use recsync_store::MemoryStore;
use serde::Serialize;
use std::path::Path;
use tracing::{debug, info};

/// One statement of the plan.
#[derive(Debug, Serialize)]
pub struct PlannedStatement {
    /// SQL rendering of the statement.
    pub sql: String,
    /// Number of parameter rows it runs with.
    pub rows: usize,
}

/// Result of a planned merge.
#[derive(Debug, Serialize)]
pub struct PlanResult {
    /// Statements in execution order.
    pub statements: Vec<PlannedStatement>,
    /// Merge counters.
    pub report: MergeReport,
}

/// Plans the merge of `current` over `past`.
pub fn compute(
    schema: &Path,
    past: &Path,
    current: &Path,
    options: MergeOptions,
) -> Result<PlanResult, Box<dyn std::error::Error>> {
    let Inputs {
        item_type,
        mut past,
        mut current,
    } = Inputs::load(schema, past, current)?;

    let mut store = MemoryStore::new();
    for spec in item_type.sequences() {
        let start = next_free(&item_type, &spec.name, [&past, &current]).map_or(spec.start, |n| {
            n.max(spec.start)
        });
        debug!(sequence = %spec.name, start, "defining sequence");
        store.define_sequence(spec.name.as_str(), start, spec.step);
    }

    merge(
        &mut store,
        &mut past,
        &RecordCollection::new(&item_type),
        options.clone(),
    )?;
    store.clear_history();

    let report = merge(&mut store, &mut current, &past, options)?;
    info!(
        record_type = item_type.name(),
        statements = report.statements,
        "merge planned"
    );

    let statements = store
        .history()
        .into_iter()
        .map(|executed| PlannedStatement {
            sql: executed.statement.text(),
            rows: executed.rows,
        })
        .collect();
    Ok(PlanResult { statements, report })
}

/// The value after the largest one already drawn from `sequence`.
fn next_free<'c>(
    item_type: &RecordType,
    sequence: &str,
    collections: impl IntoIterator<Item = &'c RecordCollection>,
) -> Option<i64> {
    let names: Vec<&str> = item_type
        .attributes()
        .filter(|a| a.value_type().sequence().is_some_and(|s| s.name == sequence))
        .map(|a| a.name())
        .collect();
    let step = item_type
        .sequences()
        .into_iter()
        .find(|s| s.name == sequence)
        .map_or(1, |s| s.step);

    collections
        .into_iter()
        .flat_map(|c| c.iter())
        .flat_map(|r| names.iter().filter_map(|n| r.get(n).and_then(|v| v.as_integer())))
        .max()
        .map(|n| n.saturating_add(step))
}

/// Runs the plan command.
pub fn run(
    schema: &Path,
    past: &Path,
    current: &Path,
    options: MergeOptions,
    format: &str,
) -> Result<(), Box<dyn std::error::Error>> {
    let result = compute(schema, past, current, options)?;

    match format {
        "json" => {
            println!("{}", serde_json::to_string_pretty(&result)?);
        }
        _ => print_text_output(&result),
    }
    Ok(())
}

fn print_text_output(result: &PlanResult) {
    if result.statements.is_empty() {
        println!("Nothing to do");
        return;
    }
    for (i, statement) in result.statements.iter().enumerate() {
        println!("{:>3}. {}  [{} row(s)]", i + 1, statement.sql, statement.rows);
    }
    println!();
    println!(
        "Inserted: {}  Updated: {}  Deleted: {}  Allocated: {}",
        result.report.inserted,
        result.report.updated,
        result.report.deleted,
        result.report.allocated
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::testing::{file, CURRENT, PAST, SCHEMA};

    #[test]
    fn plan_lists_statements_in_phase_order() {
        let (schema, past, current) = (file(SCHEMA), file(PAST), file(CURRENT));
        let result = compute(
            schema.path(),
            past.path(),
            current.path(),
            MergeOptions::default(),
        )
        .unwrap();

        let sql: Vec<&str> = result.statements.iter().map(|s| s.sql.as_str()).collect();
        assert_eq!(
            sql,
            vec![
                "INSERT INTO t_a (a, b, c, f) VALUES (?, ?, ?, ?)",
                "UPDATE t_a SET f = ? WHERE a = ? AND b = ?",
                "DELETE FROM t_a WHERE a = ? AND b = ?",
            ]
        );
        assert_eq!(
            (result.report.inserted, result.report.updated, result.report.deleted),
            (1, 1, 1)
        );
    }

    #[test]
    fn identical_files_plan_nothing() {
        let (schema, past) = (file(SCHEMA), file(PAST));
        let result = compute(
            schema.path(),
            past.path(),
            past.path(),
            MergeOptions::default(),
        )
        .unwrap();
        assert!(result.statements.is_empty());
        assert_eq!(result.report, MergeReport::default());
    }

    #[test]
    fn sequences_continue_after_existing_values() {
        let schema = file(
            r#"{
                "name": "t_seq",
                "identity": [{ "name": "id", "type": "sequence",
                               "sequence": { "name": "t_seq_id", "start": 10000, "step": 1 } }],
                "values": [{ "name": "name", "type": "text" }]
            }"#,
        );
        let past = file(r#"[{ "id": 10004, "name": "old" }]"#);
        let current = file(r#"[{ "id": 10004, "name": "old" }, { "name": "new" }]"#);

        let result = compute(
            schema.path(),
            past.path(),
            current.path(),
            MergeOptions::default(),
        )
        .unwrap();
        assert_eq!(result.report.allocated, 1);
        assert_eq!(result.report.inserted, 1);
        assert_eq!(result.statements.len(), 1);
    }
}
