//! Diff command implementation.

use super::Inputs;
use recsync_core::Diff;
use std::path::Path;
use tracing::info;

/// Computes the diff between two record files.
pub fn compute(schema: &Path, past: &Path, current: &Path) -> Result<Diff, Box<dyn std::error::Error>> {
    let inputs = Inputs::load(schema, past, current)?;
    let diff = recsync_core::diff(&inputs.current, &inputs.past)?;
    info!(
        record_type = inputs.item_type.name(),
        inserts = diff.inserts.len(),
        changes = diff.changes.len(),
        deletes = diff.deletes.len(),
        "diff computed"
    );
    Ok(diff)
}

/// Renders a diff in the requested format.
pub fn render(diff: &Diff, format: &str) -> Result<String, Box<dyn std::error::Error>> {
    match format {
        "json" => Ok(serde_json::to_string_pretty(diff)?),
        _ => {
            if diff.is_empty() {
                Ok("No changes".to_string())
            } else {
                Ok(diff.to_string())
            }
        }
    }
}

/// Runs the diff command.
pub fn run(
    schema: &Path,
    past: &Path,
    current: &Path,
    format: &str,
) -> Result<(), Box<dyn std::error::Error>> {
    let diff = compute(schema, past, current)?;
    println!("{}", render(&diff, format)?);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::testing::{file, CURRENT, PAST, SCHEMA};

    #[test]
    fn diff_between_files() {
        let (schema, past, current) = (file(SCHEMA), file(PAST), file(CURRENT));
        let diff = compute(schema.path(), past.path(), current.path()).unwrap();
        assert_eq!(diff.inserts.len(), 1);
        assert_eq!(diff.changes.len(), 1);
        assert_eq!(diff.deletes.len(), 1);
        assert_eq!(diff.changes[0].signature(), vec!["f"]);
    }

    #[test]
    fn json_output_lists_sections() {
        let (schema, past, current) = (file(SCHEMA), file(PAST), file(CURRENT));
        let diff = compute(schema.path(), past.path(), current.path()).unwrap();
        let json: serde_json::Value = serde_json::from_str(&render(&diff, "json").unwrap()).unwrap();
        assert_eq!(json["inserts"].as_array().unwrap().len(), 1);
        assert_eq!(json["deletes"][0], serde_json::json!([10010, 10021]));
    }

    #[test]
    fn identical_files_render_no_changes() {
        let (schema, past) = (file(SCHEMA), file(PAST));
        let diff = compute(schema.path(), past.path(), past.path()).unwrap();
        assert_eq!(render(&diff, "text").unwrap(), "No changes");
    }
}
