use serde::Serialize;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Error,
}

/// A problem reported back to the host, optionally tied to one input attribute
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Diagnostic {
    pub severity: Severity,
    pub summary: String,
    pub detail: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub attribute: Option<String>,
}

impl Diagnostic {
    pub fn error(summary: impl Into<String>, detail: impl Into<String>) -> Self {
        Self {
            severity: Severity::Error,
            summary: summary.into(),
            detail: detail.into(),
            attribute: None,
        }
    }

    pub fn attribute_error(
        attribute: impl Into<String>,
        summary: impl Into<String>,
        detail: impl Into<String>,
    ) -> Self {
        Self {
            attribute: Some(attribute.into()),
            ..Self::error(summary, detail)
        }
    }

}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self.severity {
            Severity::Error => "Error",
        };

        write!(f, "{}: {}", label, self.summary)?;
        if let Some(attribute) = &self.attribute {
            write!(f, " (attribute \"{}\")", attribute)?;
        }
        if !self.detail.is_empty() {
            write!(f, "\n  {}", self.detail)?;
        }
        Ok(())
    }
}

/// Ordered collection of diagnostics produced by one operation
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct Diagnostics(Vec<Diagnostic>);

impl Diagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, diagnostic: Diagnostic) {
        self.0.push(diagnostic);
    }

    pub fn add_attribute_error(
        &mut self,
        attribute: impl Into<String>,
        summary: impl Into<String>,
        detail: impl Into<String>,
    ) {
        self.push(Diagnostic::attribute_error(attribute, summary, detail));
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Diagnostic> {
        self.0.iter()
    }

    /// Diagnostics attached to the given attribute
    pub fn for_attribute<'a>(&'a self, attribute: &'a str) -> impl Iterator<Item = &'a Diagnostic> {
        self.0
            .iter()
            .filter(move |d| d.attribute.as_deref() == Some(attribute))
    }
}

impl From<Diagnostic> for Diagnostics {
    fn from(diagnostic: Diagnostic) -> Self {
        Self(vec![diagnostic])
    }
}

impl fmt::Display for Diagnostics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, diagnostic) in self.0.iter().enumerate() {
            if i > 0 {
                writeln!(f)?;
            }
            write!(f, "{}", diagnostic)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_for_attribute_filters() {
        let mut diags = Diagnostics::new();
        assert!(diags.is_empty());

        diags.push(Diagnostic::error("Failed to read repository (1) public key", ""));
        diags.add_attribute_error("app_id", "Missing GitHub App ID", "set it");
        assert_eq!(diags.len(), 2);
        assert_eq!(diags.for_attribute("app_id").count(), 1);
        assert_eq!(diags.for_attribute("owner").count(), 0);
    }

    #[test]
    fn test_display() {
        let mut diags = Diagnostics::new();
        diags.add_attribute_error("owner", "Missing GitHub Owner", "Set the `owner` attribute.");
        diags.push(Diagnostic::error("Something else", ""));

        assert_eq!(
            diags.to_string(),
            "Error: Missing GitHub Owner (attribute \"owner\")\n  Set the `owner` attribute.\nError: Something else"
        );
    }

    #[test]
    fn test_serializes_as_list() {
        let diags = Diagnostics::from(Diagnostic::error("boom", "detail"));
        let json = serde_json::to_value(&diags).unwrap();
        assert_eq!(json[0]["severity"], "error");
        assert_eq!(json[0]["summary"], "boom");
        assert!(json[0].get("attribute").is_none());
    }
}
