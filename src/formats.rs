//! Format catalog: which formats can go in, which can come out.
//!
//! The `/operations` endpoint lists every supported `convert` pair. Asking
//! for the output formats of `pdf` filters that list by
//! `input_format=pdf` and collects the distinct `output_format`s; the input
//! direction works the same way the other way round.

use crate::filters::{ListFilter, Query};
use crate::model::OperationEntry;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Which side of a conversion pair is being listed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FormatDirection {
    /// Formats that can be converted *from* (the known format is the output).
    Input,
    /// Formats that can be converted *to* (the known format is the input).
    Output,
}

/// A selectable format: upper-cased display name and the wire value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FormatOption {
    pub name: String,
    pub value: String,
}

/// Filter for the catalog request.
pub fn catalog_filter(direction: FormatDirection, known: Option<&str>) -> ListFilter {
    let filter = ListFilter::new().operation("convert");
    match known.filter(|k| !k.is_empty()) {
        None => filter,
        Some(k) => match direction {
            FormatDirection::Output => filter.input_format(k),
            FormatDirection::Input => filter.output_format(k),
        },
    }
}

/// Query pairs for the catalog request.
pub fn catalog_query(direction: FormatDirection, known: Option<&str>) -> Query {
    catalog_filter(direction, known).to_query()
}

/// Reduce catalog entries to a sorted, de-duplicated format list.
///
/// Formats are compared case-insensitively; the known counterpart itself is
/// left out (converting `pdf` to `pdf` is not a choice worth offering).
pub fn collect_formats(
    entries: &[OperationEntry],
    direction: FormatDirection,
    known: Option<&str>,
) -> Vec<FormatOption> {
    let known = known.map(str::to_lowercase);
    let mut seen = HashSet::new();
    let mut formats: Vec<FormatOption> = entries
        .iter()
        .filter_map(|entry| match direction {
            FormatDirection::Output => entry.output_format.as_deref(),
            FormatDirection::Input => entry.input_format.as_deref(),
        })
        .filter(|f| !f.is_empty())
        .filter_map(|format| {
            let key = format.to_lowercase();
            if known.as_deref() == Some(key.as_str()) || !seen.insert(key.clone()) {
                return None;
            }
            Some(FormatOption {
                name: format.to_uppercase(),
                value: key,
            })
        })
        .collect();

    formats.sort_by_key(|f| f.name.to_lowercase());
    formats
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::Map;

    fn entry(input: &str, output: &str) -> OperationEntry {
        OperationEntry {
            operation: "convert".into(),
            input_format: Some(input.into()),
            output_format: Some(output.into()),
            extra: Map::new(),
        }
    }

    fn names(formats: &[FormatOption]) -> Vec<&str> {
        formats.iter().map(|f| f.name.as_str()).collect()
    }

    #[test]
    fn output_formats_of_pdf() {
        let catalog = [entry("pdf", "png"), entry("pdf", "jpg"), entry("pdf", "PDF")];
        let formats = collect_formats(&catalog, FormatDirection::Output, Some("pdf"));
        assert_eq!(names(&formats), vec!["JPG", "PNG"]);
        assert_eq!(formats[0].value, "jpg");
    }

    #[test]
    fn duplicates_differing_in_case_collapse() {
        let catalog = [entry("docx", "pdf"), entry("DOCX", "pdf"), entry("odt", "pdf")];
        let formats = collect_formats(&catalog, FormatDirection::Input, None);
        assert_eq!(names(&formats), vec!["DOCX", "ODT"]);
    }

    #[test]
    fn missing_formats_are_skipped() {
        let mut odd = entry("x", "y");
        odd.output_format = None;
        let formats = collect_formats(&[odd, entry("a", "")], FormatDirection::Output, None);
        assert!(formats.is_empty());
    }

    #[test]
    fn query_depends_on_direction() {
        assert_eq!(
            catalog_query(FormatDirection::Output, Some("pdf")),
            vec![
                ("filter[operation]".to_string(), "convert".to_string()),
                ("filter[input_format]".to_string(), "pdf".to_string()),
            ]
        );
        assert_eq!(
            catalog_query(FormatDirection::Input, Some("pdf")),
            vec![
                ("filter[operation]".to_string(), "convert".to_string()),
                ("filter[output_format]".to_string(), "pdf".to_string()),
            ]
        );
        assert_eq!(catalog_query(FormatDirection::Input, None).len(), 1);
    }
}
