//! List filters rendered as `filter[...]` query parameters.

use serde::{Deserialize, Serialize};

/// Query string pairs, in order.
pub type Query = Vec<(String, String)>;

/// Optional criteria for the list endpoints (`/jobs`, `/tasks`,
/// `/operations`). Unset or empty values are never sent.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListFilter {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tag: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub operation: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub job_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub input_format: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output_format: Option<String>,
}

impl ListFilter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn status(mut self, v: impl Into<String>) -> Self {
        self.status = Some(v.into());
        self
    }

    pub fn tag(mut self, v: impl Into<String>) -> Self {
        self.tag = Some(v.into());
        self
    }

    pub fn operation(mut self, v: impl Into<String>) -> Self {
        self.operation = Some(v.into());
        self
    }

    pub fn job_id(mut self, v: impl Into<String>) -> Self {
        self.job_id = Some(v.into());
        self
    }

    pub fn input_format(mut self, v: impl Into<String>) -> Self {
        self.input_format = Some(v.into());
        self
    }

    pub fn output_format(mut self, v: impl Into<String>) -> Self {
        self.output_format = Some(v.into());
        self
    }

    /// Render as `filter[key]=value` pairs, skipping empty values.
    pub fn to_query(&self) -> Query {
        [
            ("status", &self.status),
            ("tag", &self.tag),
            ("operation", &self.operation),
            ("job_id", &self.job_id),
            ("input_format", &self.input_format),
            ("output_format", &self.output_format),
        ]
        .into_iter()
        .filter_map(|(key, value)| {
            value
                .as_deref()
                .filter(|v| !v.is_empty())
                .map(|v| (format!("filter[{key}]"), v.to_string()))
        })
        .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_filter_renders_nothing() {
        assert!(ListFilter::new().to_query().is_empty());
    }

    #[test]
    fn empty_values_are_omitted() {
        let q = ListFilter::new().status("finished").tag("").job_id("j-1").to_query();
        assert_eq!(
            q,
            vec![
                ("filter[status]".to_string(), "finished".to_string()),
                ("filter[job_id]".to_string(), "j-1".to_string()),
            ]
        );
    }

    #[test]
    fn deserialises_from_partial_object() {
        let f: ListFilter = serde_json::from_str(r#"{"operation": "convert"}"#).unwrap();
        assert_eq!(f.to_query(), vec![("filter[operation]".into(), "convert".into())]);
    }
}
