//! One-off inspection passes over the bank: empty properties, duplicate
//! values, LaTeX defects, and JSON-bearing fields that fail to parse.
//! Each pass works on an already-fetched row list and only formats output.

use std::collections::HashMap;

use crate::{
    DupeGroup, DupesReport, JsonFinding, JsonReport, LatexFinding, LatexReport, MissingReport, Row,
    RowRef, truncate_chars,
};

pub(crate) fn report_missing(rows: &[Row], property: &str) -> MissingReport {
    let flagged: Vec<RowRef> = rows
        .iter()
        .filter(|row| row.property_is_empty(property))
        .map(RowRef::of)
        .collect();
    MissingReport {
        property: property.to_string(),
        scanned: rows.len(),
        missing: flagged.len(),
        rows: flagged,
    }
}

pub(crate) fn report_dupes(rows: &[Row], property: &str) -> DupesReport {
    let mut by_value: HashMap<String, Vec<RowRef>> = HashMap::new();
    for row in rows {
        let Some(text) = row.property_text(property) else {
            continue;
        };
        if text.is_empty() {
            continue;
        }
        by_value.entry(text).or_default().push(RowRef::of(row));
    }

    let mut groups: Vec<DupeGroup> = by_value
        .into_iter()
        .filter(|(_, refs)| refs.len() > 1)
        .map(|(value, mut rows)| {
            rows.sort_by(|a, b| a.id.cmp(&b.id));
            DupeGroup { value, rows }
        })
        .collect();
    groups.sort_by(|a, b| a.value.cmp(&b.value));

    DupesReport {
        property: property.to_string(),
        scanned: rows.len(),
        groups,
    }
}

/// Heuristic LaTeX lint: balance of braces and `$` delimiters plus
/// `\left`/`\right` pairing. Escaped characters (`\{`, `\$`) don't count.
pub(crate) fn latex_issues(text: &str) -> Vec<String> {
    let mut issues = Vec::new();
    let mut depth: i64 = 0;
    let mut extra_close = 0usize;
    let mut dollars = 0usize;
    let mut empty_groups = 0usize;
    let mut escaped = false;
    let mut prev_open = false;

    for ch in text.chars() {
        if escaped {
            escaped = false;
            prev_open = false;
            continue;
        }
        match ch {
            '\\' => {
                escaped = true;
                prev_open = false;
            }
            '{' => {
                depth += 1;
                prev_open = true;
            }
            '}' => {
                if prev_open {
                    empty_groups += 1;
                }
                if depth == 0 {
                    extra_close += 1;
                } else {
                    depth -= 1;
                }
                prev_open = false;
            }
            '$' => {
                dollars += 1;
                prev_open = false;
            }
            _ => {
                prev_open = false;
            }
        }
    }

    if extra_close > 0 {
        issues.push(format!("{extra_close} unmatched '}}'"));
    }
    if depth > 0 {
        issues.push(format!("{depth} unclosed '{{'"));
    }
    if dollars % 2 != 0 {
        issues.push("unpaired $ delimiter".to_string());
    }
    let left = text.matches("\\left").count();
    let right = text.matches("\\right").count();
    if left != right {
        issues.push(format!("\\left/\\right mismatch ({left} vs {right})"));
    }
    if empty_groups > 0 {
        issues.push(format!("{empty_groups} empty group(s)"));
    }
    issues
}

pub(crate) fn report_latex(rows: &[Row], properties: &[String]) -> LatexReport {
    let mut findings = Vec::new();
    let mut flagged_rows = 0;
    for row in rows {
        let mut row_flagged = false;
        for property in properties {
            let Some(text) = row.property_text(property) else {
                continue;
            };
            if text.is_empty() {
                continue;
            }
            let issues = latex_issues(&text);
            if !issues.is_empty() {
                row_flagged = true;
                findings.push(LatexFinding {
                    id: row.id.clone(),
                    property: property.clone(),
                    issues,
                });
            }
        }
        if row_flagged {
            flagged_rows += 1;
        }
    }
    LatexReport {
        properties: properties.to_vec(),
        scanned: rows.len(),
        flagged: flagged_rows,
        findings,
    }
}

pub(crate) fn report_json(rows: &[Row], property: &str) -> JsonReport {
    let mut checked = 0;
    let mut findings = Vec::new();
    for row in rows {
        let Some(text) = row.property_text(property) else {
            continue;
        };
        if text.trim().is_empty() {
            continue;
        }
        checked += 1;
        if let Err(err) = serde_json::from_str::<serde_json::Value>(&text) {
            findings.push(JsonFinding {
                id: row.id.clone(),
                error: err.to_string(),
                preview: truncate_chars(text.trim(), 80),
            });
        }
    }
    JsonReport {
        property: property.to_string(),
        scanned: rows.len(),
        checked,
        invalid: findings.len(),
        findings,
    }
}

// ── Console output ──────────────────────────────────────────────────────

fn print_row_line(row: &RowRef) {
    match &row.title {
        Some(title) => println!("  {}  {}", row.id, title),
        None => println!("  {}", row.id),
    }
}

pub(crate) fn print_missing(
    report: &MissingReport,
    json: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    if json {
        println!("{}", serde_json::to_string_pretty(report)?);
        return Ok(());
    }
    for row in &report.rows {
        print_row_line(row);
    }
    println!(
        "{} of {} rows missing '{}'",
        report.missing, report.scanned, report.property
    );
    Ok(())
}

pub(crate) fn print_dupes(
    report: &DupesReport,
    json: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    if json {
        println!("{}", serde_json::to_string_pretty(report)?);
        return Ok(());
    }
    for group in &report.groups {
        println!("'{}' ({} rows):", group.value, group.rows.len());
        for row in &group.rows {
            print_row_line(row);
        }
    }
    println!(
        "{} duplicated '{}' value(s) across {} rows",
        report.groups.len(),
        report.property,
        report.scanned
    );
    Ok(())
}

pub(crate) fn print_latex(
    report: &LatexReport,
    json: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    if json {
        println!("{}", serde_json::to_string_pretty(report)?);
        return Ok(());
    }
    for finding in &report.findings {
        println!(
            "  {}  {}: {}",
            finding.id,
            finding.property,
            finding.issues.join("; ")
        );
    }
    println!(
        "{} of {} rows flagged in [{}]",
        report.flagged,
        report.scanned,
        report.properties.join(", ")
    );
    Ok(())
}

pub(crate) fn print_json_report(
    report: &JsonReport,
    json: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    if json {
        println!("{}", serde_json::to_string_pretty(report)?);
        return Ok(());
    }
    for finding in &report.findings {
        println!("  {}  {}", finding.id, finding.error);
        println!("      {}", finding.preview);
    }
    println!(
        "{} invalid of {} non-empty '{}' values ({} rows scanned)",
        report.invalid, report.checked, report.property, report.scanned
    );
    Ok(())
}

pub(crate) fn print_row(row: &Row, json: bool) -> Result<(), Box<dyn std::error::Error>> {
    if json {
        println!("{}", serde_json::to_string_pretty(row)?);
        return Ok(());
    }
    println!("id: {}", row.id);
    println!("archived: {}", row.archived);
    if let Some(edited) = &row.last_edited {
        println!("last edited: {edited}");
    }
    let mut names: Vec<&String> = row.properties.keys().collect();
    names.sort();
    for name in names {
        let value = &row.properties[name];
        let text = value.as_text();
        if text.is_empty() {
            println!("  {name} ({}): <empty>", value.kind_name());
        } else {
            println!("  {name} ({}): {}", value.kind_name(), truncate_chars(&text, 120));
        }
    }
    Ok(())
}
