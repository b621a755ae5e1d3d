/// Placeholder in a body template that gets replaced by the student's code.
pub const SOURCE_PLACEHOLDER: &str = "{{ source }}";

/// Template snippets wrapped around a submission before compilation.
///
/// Each field falls back from the problem/language pairing to the language
/// default; `None` means the part is absent entirely.
#[derive(Clone, Debug, Default)]
pub struct SourceTemplate {
    pub head: Option<String>,
    pub body: Option<String>,
    pub tail: Option<String>,
}

impl SourceTemplate {
    /// Combine language defaults with pairing overrides, field by field.
    pub fn resolve(
        language: (Option<String>, Option<String>, Option<String>),
        pairing: (Option<String>, Option<String>, Option<String>),
    ) -> Self {
        Self {
            head: pairing.0.or(language.0),
            body: pairing.1.or(language.1),
            tail: pairing.2.or(language.2),
        }
    }

    /// Render the final source: substitute the student's code into the body
    /// template when present, then join head, body, tail with newlines.
    pub fn render(&self, source: &str) -> String {
        let body = match &self.body {
            Some(template) if template.contains(SOURCE_PLACEHOLDER) => {
                template.replace(SOURCE_PLACEHOLDER, source)
            }
            // A body template without the placeholder is treated as a prefix.
            Some(template) => format!("{template}\n{source}"),
            None => source.to_string(),
        };

        let mut parts = Vec::with_capacity(3);
        if let Some(head) = &self.head {
            if !head.is_empty() {
                parts.push(head.as_str());
            }
        }
        parts.push(&body);
        if let Some(tail) = &self.tail {
            if !tail.is_empty() {
                parts.push(tail.as_str());
            }
        }
        parts.join("\n")
    }
}
