//! Batch repair passes: query the rows that need work, then patch them one
//! at a time behind the pacer, checkpointing after every completed item so
//! an interrupted run can pick up where it left off.

use std::collections::HashMap;

use crate::{BankClient, Filter, LoadOutcome, ProgressTracker, PropertyValue, Row};

#[derive(Debug, Default)]
pub(crate) struct BatchOutcome {
    pub(crate) processed: u64,
    pub(crate) patched: usize,
    pub(crate) skipped: usize,
    pub(crate) failed: usize,
}

/// Coerce a raw CLI string into the kind the target property already has.
/// Unknown targets (property absent everywhere) default to text.
pub(crate) fn fill_value_for(
    existing: Option<&PropertyValue>,
    raw: &str,
) -> Result<PropertyValue, String> {
    let value = match existing {
        None | Some(PropertyValue::Text { .. }) => PropertyValue::Text { text: raw.to_string() },
        Some(PropertyValue::Title { .. }) => PropertyValue::Title { text: raw.to_string() },
        Some(PropertyValue::Select { .. }) => {
            PropertyValue::Select { option: Some(raw.to_string()) }
        }
        Some(PropertyValue::MultiSelect { .. }) => {
            PropertyValue::MultiSelect { options: vec![raw.to_string()] }
        }
        Some(PropertyValue::Checkbox { .. }) => match raw.trim().to_ascii_lowercase().as_str() {
            "true" | "1" | "yes" | "on" => PropertyValue::Checkbox { checked: true },
            "false" | "0" | "no" | "off" => PropertyValue::Checkbox { checked: false },
            other => return Err(format!("'{other}' is not a checkbox value")),
        },
        Some(PropertyValue::Number { .. }) => {
            let parsed = raw
                .trim()
                .parse::<f64>()
                .map_err(|_| format!("'{raw}' is not a number"))?;
            PropertyValue::Number { value: Some(parsed) }
        }
        Some(PropertyValue::Url { .. }) => PropertyValue::Url { url: Some(raw.to_string()) },
        Some(PropertyValue::Date { .. }) => {
            PropertyValue::Date { start: Some(raw.to_string()), end: None }
        }
    };
    Ok(value)
}

/// Shared driver for the patch-style repairs. `patch_for` decides per row:
/// `Ok(Some(props))` to patch, `Ok(None)` to skip, `Err` to record a
/// per-item failure and keep going.
pub(crate) fn run_patch_batch(
    client: &mut BankClient,
    tracker: &mut ProgressTracker,
    rows: &[Row],
    resume: bool,
    dry_run: bool,
    label: &str,
    mut patch_for: impl FnMut(&Row) -> Result<Option<HashMap<String, PropertyValue>>, String>,
) -> Result<BatchOutcome, Box<dyn std::error::Error>> {
    if resume {
        match tracker.load() {
            LoadOutcome::Loaded => {
                let status = tracker.status();
                eprintln!(
                    "[{label}] resuming: {}/{} done ({}%)",
                    status.processed, status.total, status.percentage
                );
            }
            LoadOutcome::NoPriorState => {
                eprintln!(
                    "[{label}] no checkpoint at {}; starting fresh",
                    tracker.path().display()
                );
            }
            LoadOutcome::Failed => {
                eprintln!("[{label}] checkpoint unreadable; starting fresh");
            }
        }
    } else if !dry_run {
        tracker.reset();
    }
    if !dry_run {
        tracker.set_total(rows.len() as u64);
    }

    let pending = tracker.filter_unprocessed(rows);
    let offset = rows.len() - pending.len();
    let mut outcome = BatchOutcome {
        processed: tracker.record().processed,
        ..BatchOutcome::default()
    };

    for (i, row) in pending.iter().enumerate() {
        let index = (offset + i) as u64;
        match patch_for(row) {
            Ok(Some(props)) => {
                if dry_run {
                    let mut names: Vec<&str> = props.keys().map(String::as_str).collect();
                    names.sort();
                    println!("would patch {} ({})", row.id, names.join(", "));
                    outcome.patched += 1;
                    continue;
                }
                if let Err(err) = client.update_properties(&row.id, &props) {
                    outcome.failed += 1;
                    tracker.add_error(err, Some(&row.id), Some(index));
                    continue;
                }
                outcome.patched += 1;
                outcome.processed += 1;
                tracker.update(outcome.processed, Some(&row.id), Some(index));
            }
            Ok(None) => {
                outcome.skipped += 1;
                if !dry_run {
                    outcome.processed += 1;
                    tracker.update(outcome.processed, Some(&row.id), Some(index));
                }
            }
            Err(message) => {
                outcome.failed += 1;
                if !dry_run {
                    tracker.add_error(message, Some(&row.id), Some(index));
                }
            }
        }
    }
    Ok(outcome)
}

pub(crate) fn run_fill(
    client: &mut BankClient,
    tracker: &mut ProgressTracker,
    property: &str,
    value: &str,
    resume: bool,
    dry_run: bool,
) -> Result<BatchOutcome, Box<dyn std::error::Error>> {
    let filter = Filter::is_empty(property);
    let rows = client.query_all(Some(&filter))?;
    let property = property.to_string();
    let value = value.to_string();
    run_patch_batch(client, tracker, &rows, resume, dry_run, "fill", move |row| {
        // A resumed run may re-see rows patched before the interruption
        if !row.property_is_empty(&property) {
            return Ok(None);
        }
        let patch = fill_value_for(row.property(&property), &value)?;
        let mut props = HashMap::new();
        props.insert(property.clone(), patch);
        Ok(Some(props))
    })
}

pub(crate) fn run_retag(
    client: &mut BankClient,
    tracker: &mut ProgressTracker,
    property: &str,
    from: &str,
    to: &str,
    resume: bool,
    dry_run: bool,
) -> Result<BatchOutcome, Box<dyn std::error::Error>> {
    let filter = Filter::equals(property, from);
    let rows = client.query_all(Some(&filter))?;
    let property = property.to_string();
    let from = from.to_string();
    let to = to.to_string();
    run_patch_batch(client, tracker, &rows, resume, dry_run, "retag", move |row| {
        match row.property(&property) {
            Some(PropertyValue::Select { option: Some(current) }) if *current == from => {
                let mut props = HashMap::new();
                props.insert(
                    property.clone(),
                    PropertyValue::Select { option: Some(to.clone()) },
                );
                Ok(Some(props))
            }
            Some(other) if other.as_text() == from => Err(format!(
                "property is {} kind, expected select",
                other.kind_name()
            )),
            _ => Ok(None),
        }
    })
}

pub(crate) fn archive_one(
    client: &mut BankClient,
    id: &str,
    dry_run: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    if dry_run {
        println!("would archive {id}");
        return Ok(());
    }
    client.archive_row(id)?;
    println!("archived {id}");
    Ok(())
}

pub(crate) fn archive_where_empty(
    client: &mut BankClient,
    property: &str,
    dry_run: bool,
) -> Result<(usize, usize), Box<dyn std::error::Error>> {
    let filter = Filter::is_empty(property);
    let rows = client.query_all(Some(&filter))?;
    let mut archived = 0;
    let mut failed = 0;
    for row in &rows {
        if dry_run {
            println!("would archive {}  {}", row.id, row.title().unwrap_or_default());
            archived += 1;
            continue;
        }
        match client.archive_row(&row.id) {
            Ok(_) => archived += 1,
            Err(err) => {
                failed += 1;
                eprintln!("[archive] {}: {err}", row.id);
            }
        }
    }
    Ok((archived, failed))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fill_value_follows_existing_kind() {
        let select = PropertyValue::Select { option: None };
        assert_eq!(
            fill_value_for(Some(&select), "medium").unwrap(),
            PropertyValue::Select { option: Some("medium".into()) }
        );

        let number = PropertyValue::Number { value: None };
        assert_eq!(
            fill_value_for(Some(&number), "7").unwrap(),
            PropertyValue::Number { value: Some(7.0) }
        );

        assert_eq!(
            fill_value_for(None, "anything").unwrap(),
            PropertyValue::Text { text: "anything".into() }
        );
    }

    #[test]
    fn test_fill_value_rejects_bad_coercions() {
        let number = PropertyValue::Number { value: None };
        assert!(fill_value_for(Some(&number), "seven").is_err());

        let checkbox = PropertyValue::Checkbox { checked: false };
        assert!(fill_value_for(Some(&checkbox), "maybe").is_err());
        assert_eq!(
            fill_value_for(Some(&checkbox), "yes").unwrap(),
            PropertyValue::Checkbox { checked: true }
        );
    }

    #[test]
    fn test_fill_value_multi_select_and_date() {
        let multi = PropertyValue::MultiSelect { options: vec![] };
        assert_eq!(
            fill_value_for(Some(&multi), "algebra").unwrap(),
            PropertyValue::MultiSelect { options: vec!["algebra".into()] }
        );

        let date = PropertyValue::Date { start: None, end: None };
        assert_eq!(
            fill_value_for(Some(&date), "2024-06-01").unwrap(),
            PropertyValue::Date { start: Some("2024-06-01".into()), end: None }
        );
    }
}
