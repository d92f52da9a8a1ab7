//! Request, result, and report types shared by every agent.
//!
//! All of these are immutable once built. A [`ResearchResult`] can only be obtained
//! through [`SchemaDescriptor::validate`](crate::SchemaDescriptor::validate), so holding
//! one means its fields already satisfied the issuing agent's schema.

use std::fmt;

use serde::{Deserialize, Serialize};

const RULE: &str = "--------------------------------------------------";

/// Which agent produced a result or report section.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AgentRole {
    Company,
    Prospect,
    QueryInterpreter,
}

impl AgentRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            AgentRole::Company => "company",
            AgentRole::Prospect => "prospect",
            AgentRole::QueryInterpreter => "query_interpreter",
        }
    }

    /// Heading used when a section from this role is rendered.
    pub fn report_title(&self) -> &'static str {
        match self {
            AgentRole::Company => "Company Information",
            AgentRole::Prospect => "Prospect Information",
            AgentRole::QueryInterpreter => "Query Interpretation",
        }
    }
}

impl fmt::Display for AgentRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A research subject plus the optional hints an agent may use.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResearchRequest {
    subject: String,
    context: Option<String>,
    profile_url: Option<String>,
}

impl ResearchRequest {
    pub fn new(subject: impl Into<String>) -> Self {
        Self {
            subject: subject.into(),
            context: None,
            profile_url: None,
        }
    }

    /// Associated context, e.g. the employer of a prospect.
    pub fn with_context(mut self, context: impl Into<String>) -> Self {
        self.context = Some(context.into());
        self
    }

    /// Page whose text should be folded into the prompt when available.
    pub fn with_profile_url(mut self, url: impl Into<String>) -> Self {
        self.profile_url = Some(url.into());
        self
    }

    pub fn subject(&self) -> &str {
        &self.subject
    }

    pub fn context(&self) -> Option<&str> {
        self.context.as_deref()
    }

    pub fn profile_url(&self) -> Option<&str> {
        self.profile_url.as_deref()
    }
}

/// Value of a validated field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    Text(String),
    List(Vec<String>),
}

impl FieldValue {
    pub fn as_text(&self) -> Option<&str> {
        match self {
            FieldValue::Text(text) => Some(text),
            FieldValue::List(_) => None,
        }
    }

    pub fn as_list(&self) -> Option<&[String]> {
        match self {
            FieldValue::Text(_) => None,
            FieldValue::List(items) => Some(items),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResultField {
    pub name: String,
    pub value: FieldValue,
}

/// Schema-validated output of one agent invocation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResearchResult {
    source: AgentRole,
    fields: Vec<ResultField>,
}

impl ResearchResult {
    pub(crate) fn new(source: AgentRole, fields: Vec<ResultField>) -> Self {
        Self { source, fields }
    }

    pub fn source(&self) -> AgentRole {
        self.source
    }

    /// Fields in schema declaration order.
    pub fn fields(&self) -> &[ResultField] {
        &self.fields
    }

    pub fn get(&self, name: &str) -> Option<&FieldValue> {
        self.fields
            .iter()
            .find(|field| field.name == name)
            .map(|field| &field.value)
    }

    pub fn text(&self, name: &str) -> Option<&str> {
        self.get(name).and_then(FieldValue::as_text)
    }

    pub fn list(&self, name: &str) -> Option<&[String]> {
        self.get(name).and_then(FieldValue::as_list)
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Replace the value of a text field this result already holds.
    ///
    /// Absent or list-valued fields are left untouched, so the validated shape is kept.
    pub fn with_text_override(mut self, name: &str, value: impl Into<String>) -> Self {
        let target = self
            .fields
            .iter_mut()
            .find(|field| field.name == name && matches!(field.value, FieldValue::Text(_)));
        if let Some(field) = target {
            field.value = FieldValue::Text(value.into());
        }
        self
    }
}

/// One labelled block of a [`CombinedReport`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReportSection {
    pub source: AgentRole,
    pub fields: Vec<ResultField>,
}

impl From<ResearchResult> for ReportSection {
    fn from(result: ResearchResult) -> Self {
        Self {
            source: result.source,
            fields: result.fields,
        }
    }
}

impl ReportSection {
    pub fn get(&self, name: &str) -> Option<&FieldValue> {
        self.fields
            .iter()
            .find(|field| field.name == name)
            .map(|field| &field.value)
    }
}

/// Ordered, non-merging collection of agent results.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CombinedReport {
    sections: Vec<ReportSection>,
}

impl CombinedReport {
    pub fn from_sections(sections: Vec<ReportSection>) -> Self {
        Self { sections }
    }

    pub fn sections(&self) -> &[ReportSection] {
        &self.sections
    }

    pub fn len(&self) -> usize {
        self.sections.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sections.is_empty()
    }
}

impl fmt::Display for CombinedReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.sections.is_empty() {
            return writeln!(f, "No research results.");
        }

        for (idx, section) in self.sections.iter().enumerate() {
            if idx > 0 {
                writeln!(f)?;
            }
            writeln!(f, "{}", section.source.report_title())?;
            writeln!(f, "{RULE}")?;
            for field in &section.fields {
                let label = field_label(&field.name);
                match &field.value {
                    FieldValue::Text(text) => writeln!(f, "{label}: {text}")?,
                    FieldValue::List(items) if items.is_empty() => {
                        writeln!(f, "{label}: (none)")?
                    }
                    FieldValue::List(items) => {
                        writeln!(f, "{label}:")?;
                        for item in items {
                            writeln!(f, "  - {item}")?;
                        }
                    }
                }
            }
        }
        Ok(())
    }
}

/// `market_position` -> `Market Position`.
fn field_label(name: &str) -> String {
    name.split('_')
        .filter(|word| !word.is_empty())
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn text(name: &str, value: &str) -> ResultField {
        ResultField {
            name: name.to_string(),
            value: FieldValue::Text(value.to_string()),
        }
    }

    #[test]
    fn request_builder_keeps_optional_hints() {
        let request = ResearchRequest::new("John Smith")
            .with_context("Apple")
            .with_profile_url("https://example.com/jsmith");

        assert_eq!(request.subject(), "John Smith");
        assert_eq!(request.context(), Some("Apple"));
        assert_eq!(request.profile_url(), Some("https://example.com/jsmith"));
    }

    #[test]
    fn text_override_only_touches_existing_text_fields() {
        let result = ResearchResult::new(
            AgentRole::Prospect,
            vec![
                text("company", "Apple Inc."),
                ResultField {
                    name: "experience".into(),
                    value: FieldValue::List(vec!["Intel".into()]),
                },
            ],
        )
        .with_text_override("company", "Apple")
        .with_text_override("experience", "ignored")
        .with_text_override("location", "ignored");

        assert_eq!(result.text("company"), Some("Apple"));
        assert_eq!(result.list("experience"), Some(&["Intel".to_string()][..]));
        assert!(result.get("location").is_none());
        assert_eq!(result.len(), 2);
    }

    #[test]
    fn field_labels_are_title_cased() {
        assert_eq!(field_label("market_position"), "Market Position");
        assert_eq!(field_label("ceo"), "Ceo");
        assert_eq!(field_label("decision_maker_assessment"), "Decision Maker Assessment");
    }

    #[test]
    fn empty_report_renders_placeholder() {
        let report = CombinedReport::default();
        assert!(report.is_empty());
        assert_eq!(report.to_string(), "No research results.\n");
    }

    #[test]
    fn report_renders_sections_in_order() {
        let report = CombinedReport::from_sections(vec![
            ReportSection {
                source: AgentRole::Company,
                fields: vec![
                    text("overview", "Makes software"),
                    ResultField {
                        name: "technology_stack".into(),
                        value: FieldValue::List(vec!["Azure".into(), "C#".into()]),
                    },
                ],
            },
            ReportSection {
                source: AgentRole::Prospect,
                fields: vec![text("background", "Engineer turned executive")],
            },
        ]);

        let rendered = report.to_string();
        let expected = format!(
            "Company Information\n{RULE}\nOverview: Makes software\nTechnology Stack:\n  - Azure\n  - C#\n\nProspect Information\n{RULE}\nBackground: Engineer turned executive\n"
        );
        assert_eq!(rendered, expected);
    }

    #[test]
    fn section_serializes_with_source_tag() {
        let section = ReportSection {
            source: AgentRole::Prospect,
            fields: vec![text("name", "Jane")],
        };
        let value = serde_json::to_value(&section).unwrap();
        assert_eq!(value["source"], "prospect");
        assert_eq!(value["fields"][0]["name"], "name");
        assert_eq!(value["fields"][0]["value"], "Jane");
    }
}
