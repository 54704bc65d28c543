use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// One row of the hosted collection: a stable id, a soft-delete flag, and a
/// typed property map keyed by property name.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub(crate) struct Row {
    pub(crate) id: String,
    #[serde(default)]
    pub(crate) archived: bool,
    #[serde(default)]
    pub(crate) last_edited: Option<String>,
    #[serde(default)]
    pub(crate) properties: HashMap<String, PropertyValue>,
}

impl Row {
    pub(crate) fn property(&self, name: &str) -> Option<&PropertyValue> {
        self.properties.get(name)
    }

    /// Plain-text rendering of a property. None when the row has no such
    /// property at all; an empty string means present-but-blank.
    pub(crate) fn property_text(&self, name: &str) -> Option<String> {
        self.properties.get(name).map(PropertyValue::as_text)
    }

    /// Absent properties count as empty.
    pub(crate) fn property_is_empty(&self, name: &str) -> bool {
        self.properties.get(name).is_none_or(PropertyValue::is_empty)
    }

    pub(crate) fn title(&self) -> Option<String> {
        self.properties
            .values()
            .find(|value| matches!(value, PropertyValue::Title { .. }))
            .map(PropertyValue::as_text)
            .filter(|text| !text.is_empty())
    }
}

/// One page of a filtered collection query, in the server's stable order.
#[derive(Debug, Deserialize)]
pub(crate) struct QueryPage {
    pub(crate) items: Vec<Row>,
    #[serde(default)]
    pub(crate) next_cursor: Option<String>,
    #[serde(default)]
    pub(crate) has_more: bool,
}

/// The closed set of property kinds the bank schema uses. The `kind` tag is
/// what the wire format carries; adding a kind here is a schema change.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub(crate) enum PropertyValue {
    Title {
        text: String,
    },
    Text {
        text: String,
    },
    Number {
        #[serde(default)]
        value: Option<f64>,
    },
    Select {
        #[serde(default)]
        option: Option<String>,
    },
    MultiSelect {
        #[serde(default)]
        options: Vec<String>,
    },
    Checkbox {
        checked: bool,
    },
    Url {
        #[serde(default)]
        url: Option<String>,
    },
    Date {
        #[serde(default)]
        start: Option<String>,
        #[serde(default)]
        end: Option<String>,
    },
}

impl PropertyValue {
    pub(crate) fn kind_name(&self) -> &'static str {
        match self {
            PropertyValue::Title { .. } => "title",
            PropertyValue::Text { .. } => "text",
            PropertyValue::Number { .. } => "number",
            PropertyValue::Select { .. } => "select",
            PropertyValue::MultiSelect { .. } => "multi_select",
            PropertyValue::Checkbox { .. } => "checkbox",
            PropertyValue::Url { .. } => "url",
            PropertyValue::Date { .. } => "date",
        }
    }

    /// Total plain-text mapping: every kind renders to a string, empty
    /// values render to "".
    pub(crate) fn as_text(&self) -> String {
        match self {
            PropertyValue::Title { text } | PropertyValue::Text { text } => text.clone(),
            PropertyValue::Number { value } => match value {
                Some(v) if v.fract() == 0.0 && v.abs() < 1e15 => format!("{}", *v as i64),
                Some(v) => v.to_string(),
                None => String::new(),
            },
            PropertyValue::Select { option } => option.clone().unwrap_or_default(),
            PropertyValue::MultiSelect { options } => options.join(", "),
            PropertyValue::Checkbox { checked } => checked.to_string(),
            PropertyValue::Url { url } => url.clone().unwrap_or_default(),
            PropertyValue::Date { start, end } => match (start, end) {
                (Some(start), Some(end)) => format!("{start}..{end}"),
                (Some(start), None) => start.clone(),
                _ => String::new(),
            },
        }
    }

    /// Whether the value carries no content. A checkbox is never empty:
    /// false is a real answer.
    pub(crate) fn is_empty(&self) -> bool {
        match self {
            PropertyValue::Title { text } | PropertyValue::Text { text } => text.trim().is_empty(),
            PropertyValue::Number { value } => value.is_none(),
            PropertyValue::Select { option } => option.is_none(),
            PropertyValue::MultiSelect { options } => options.is_empty(),
            PropertyValue::Checkbox { .. } => false,
            PropertyValue::Url { url } => url.is_none(),
            PropertyValue::Date { start, .. } => start.is_none(),
        }
    }
}

// ── Report shapes (console + --json output) ─────────────────────────────

#[derive(Debug, Clone, Serialize)]
pub(crate) struct RowRef {
    pub(crate) id: String,
    pub(crate) title: Option<String>,
}

impl RowRef {
    pub(crate) fn of(row: &Row) -> Self {
        Self {
            id: row.id.clone(),
            title: row.title(),
        }
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct MissingReport {
    pub(crate) property: String,
    pub(crate) scanned: usize,
    pub(crate) missing: usize,
    pub(crate) rows: Vec<RowRef>,
}

#[derive(Debug, Serialize)]
pub(crate) struct DupeGroup {
    pub(crate) value: String,
    pub(crate) rows: Vec<RowRef>,
}

#[derive(Debug, Serialize)]
pub(crate) struct DupesReport {
    pub(crate) property: String,
    pub(crate) scanned: usize,
    pub(crate) groups: Vec<DupeGroup>,
}

#[derive(Debug, Serialize)]
pub(crate) struct LatexFinding {
    pub(crate) id: String,
    pub(crate) property: String,
    pub(crate) issues: Vec<String>,
}

#[derive(Debug, Serialize)]
pub(crate) struct LatexReport {
    pub(crate) properties: Vec<String>,
    pub(crate) scanned: usize,
    pub(crate) flagged: usize,
    pub(crate) findings: Vec<LatexFinding>,
}

#[derive(Debug, Serialize)]
pub(crate) struct JsonFinding {
    pub(crate) id: String,
    pub(crate) error: String,
    pub(crate) preview: String,
}

#[derive(Debug, Serialize)]
pub(crate) struct JsonReport {
    pub(crate) property: String,
    pub(crate) scanned: usize,
    pub(crate) checked: usize,
    pub(crate) invalid: usize,
    pub(crate) findings: Vec<JsonFinding>,
}

#[derive(Debug, Serialize)]
pub(crate) struct CsvFileInfo {
    pub(crate) path: String,
    pub(crate) size_bytes: u64,
    pub(crate) modified: Option<String>,
    pub(crate) checksum: String,
}

#[derive(Debug, Serialize)]
pub(crate) struct CsvScanReport {
    pub(crate) root: String,
    pub(crate) scanned: usize,
    pub(crate) files: Vec<CsvFileInfo>,
    pub(crate) duplicate_groups: Vec<Vec<String>>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row_with(properties: Vec<(&str, PropertyValue)>) -> Row {
        Row {
            id: "row-1".to_string(),
            archived: false,
            last_edited: None,
            properties: properties
                .into_iter()
                .map(|(k, v)| (k.to_string(), v))
                .collect(),
        }
    }

    #[test]
    fn test_as_text_covers_every_kind() {
        let cases = [
            (PropertyValue::Title { text: "AMC 2019 P5".into() }, "AMC 2019 P5"),
            (PropertyValue::Text { text: "x".into() }, "x"),
            (PropertyValue::Number { value: Some(3.0) }, "3"),
            (PropertyValue::Number { value: Some(2.5) }, "2.5"),
            (PropertyValue::Number { value: None }, ""),
            (PropertyValue::Select { option: Some("hard".into()) }, "hard"),
            (
                PropertyValue::MultiSelect { options: vec!["algebra".into(), "geometry".into()] },
                "algebra, geometry",
            ),
            (PropertyValue::Checkbox { checked: true }, "true"),
            (PropertyValue::Url { url: Some("https://e.x".into()) }, "https://e.x"),
            (PropertyValue::Date { start: Some("2024-01-01".into()), end: None }, "2024-01-01"),
            (
                PropertyValue::Date {
                    start: Some("2024-01-01".into()),
                    end: Some("2024-02-01".into()),
                },
                "2024-01-01..2024-02-01",
            ),
        ];
        for (value, expected) in cases {
            assert_eq!(value.as_text(), expected, "kind {}", value.kind_name());
        }
    }

    #[test]
    fn test_is_empty() {
        assert!(PropertyValue::Text { text: "  ".into() }.is_empty());
        assert!(PropertyValue::Select { option: None }.is_empty());
        assert!(PropertyValue::MultiSelect { options: vec![] }.is_empty());
        assert!(!PropertyValue::Checkbox { checked: false }.is_empty());
        assert!(!PropertyValue::Number { value: Some(0.0) }.is_empty());
    }

    #[test]
    fn test_property_tag_round_trip() {
        let value = PropertyValue::Select { option: Some("medium".into()) };
        let json = serde_json::to_string(&value).unwrap();
        assert!(json.contains("\"kind\":\"select\""), "unexpected wire form: {json}");
        let back: PropertyValue = serde_json::from_str(&json).unwrap();
        assert_eq!(back, value);
    }

    #[test]
    fn test_row_from_wire_json() {
        let raw = r#"{
            "id": "prob-91",
            "archived": false,
            "last_edited": "2025-11-02T10:00:00Z",
            "properties": {
                "Problem ID": {"kind": "title", "text": "AIME 2020 P9"},
                "Difficulty": {"kind": "select", "option": null},
                "Verified": {"kind": "checkbox", "checked": true}
            }
        }"#;
        let row: Row = serde_json::from_str(raw).unwrap();
        assert_eq!(row.id, "prob-91");
        assert_eq!(row.title().as_deref(), Some("AIME 2020 P9"));
        assert!(row.property_is_empty("Difficulty"));
        assert!(row.property_is_empty("Topic"), "absent property counts as empty");
        assert!(!row.property_is_empty("Verified"));
    }

    #[test]
    fn test_row_title_skips_non_title_kinds() {
        let row = row_with(vec![
            ("Statement", PropertyValue::Text { text: "Prove that...".into() }),
            ("Problem ID", PropertyValue::Title { text: "IMO 1988 P6".into() }),
        ]);
        assert_eq!(row.title().as_deref(), Some("IMO 1988 P6"));

        let untitled = row_with(vec![(
            "Statement",
            PropertyValue::Text { text: "Evaluate...".into() },
        )]);
        assert_eq!(untitled.title(), None);
    }
}
