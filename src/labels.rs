//! Label cleanup applied once at ingestion, before labels become column names.
//!
//! Rules run in order; the result is trimmed after the last rule.

use regex::Regex;

#[derive(Debug, Clone)]
pub struct LabelRule {
    pattern: Regex,
    replacement: String,
}

impl LabelRule {
    pub fn new(pattern: &str, replacement: impl Into<String>) -> Result<Self, regex::Error> {
        Ok(Self {
            pattern: Regex::new(pattern)?,
            replacement: replacement.into(),
        })
    }

    fn apply(&self, label: &str) -> String {
        self.pattern
            .replace_all(label, self.replacement.as_str())
            .into_owned()
    }
}

#[derive(Debug, Clone, Default)]
pub struct LabelRules {
    rules: Vec<LabelRule>,
}

impl LabelRules {
    pub fn new(rules: Vec<LabelRule>) -> Self {
        Self { rules }
    }

    /// Strip footnote markers "(1)".."(9)", with or without a leading space.
    ///
    /// "Buenos Aires (1)" → "Buenos Aires",
    /// "Promedio Ponderado (MG Total) (3)" → "Promedio Ponderado (MG Total)"
    pub fn footnotes() -> Self {
        Self::new(vec![footnote_rule()])
    }

    /// Footnotes plus separator normalization for price-index category names:
    /// ", ", " y " and runs of whitespace become "_".
    ///
    /// "Alimentos y bebidas no alcohólicas" → "Alimentos_bebidas_no_alcohólicas"
    pub fn category_names() -> Self {
        Self::new(vec![
            footnote_rule(),
            static_rule(r"^\s+|\s+$", ""),
            static_rule(r"\s*,\s*|\s+y\s+|\s+", "_"),
        ])
    }

    pub fn push(mut self, rule: LabelRule) -> Self {
        self.rules.push(rule);
        self
    }

    pub fn apply(&self, raw: &str) -> String {
        self.rules
            .iter()
            .fold(raw.to_string(), |label, rule| rule.apply(&label))
            .trim()
            .to_string()
    }
}

fn footnote_rule() -> LabelRule {
    static_rule(r" ?\([1-9]\)", "")
}

fn static_rule(pattern: &str, replacement: &str) -> LabelRule {
    LabelRule::new(pattern, replacement).expect("built-in label pattern is valid")
}
