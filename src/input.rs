use serde_json::Value;

/// Anything a caller may hand the converter as a document.
#[derive(Debug, Clone, PartialEq)]
pub enum MarkdownInput {
    Text(String),
    Lines(Vec<String>),
    /// Loosely typed input, e.g. a tool argument an LLM filled in.
    Value(Value),
}

impl MarkdownInput {
    /// Flatten to a single Markdown string.
    ///
    /// Returns `None` only for JSON `null`, which has no sensible text form.
    pub fn normalize(self) -> Option<String> {
        match self {
            MarkdownInput::Text(text) => Some(text),
            MarkdownInput::Lines(lines) => Some(lines.join("\n")),
            MarkdownInput::Value(value) => value_to_text(value),
        }
    }
}

fn value_to_text(value: Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(text) => Some(text),
        Value::Bool(flag) => Some(flag.to_string()),
        Value::Number(number) => Some(number.to_string()),
        Value::Array(items) => Some(
            items
                .into_iter()
                .map(|item| match item {
                    Value::String(text) => text,
                    other => other.to_string(),
                })
                .collect::<Vec<_>>()
                .join("\n"),
        ),
        object @ Value::Object(_) => serde_json::to_string_pretty(&object).ok(),
    }
}

impl From<&str> for MarkdownInput {
    fn from(text: &str) -> Self {
        MarkdownInput::Text(text.to_string())
    }
}

impl From<String> for MarkdownInput {
    fn from(text: String) -> Self {
        MarkdownInput::Text(text)
    }
}

impl From<&String> for MarkdownInput {
    fn from(text: &String) -> Self {
        MarkdownInput::Text(text.clone())
    }
}

impl From<Vec<String>> for MarkdownInput {
    fn from(lines: Vec<String>) -> Self {
        MarkdownInput::Lines(lines)
    }
}

impl From<&[&str]> for MarkdownInput {
    fn from(lines: &[&str]) -> Self {
        MarkdownInput::Lines(lines.iter().map(|line| line.to_string()).collect())
    }
}

impl From<Value> for MarkdownInput {
    fn from(value: Value) -> Self {
        MarkdownInput::Value(value)
    }
}
