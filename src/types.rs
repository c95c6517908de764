use serde::{Deserialize, Serialize};

/// Cell content that requests computation.
pub const PLACEHOLDER: &str = "?";

/// Argument value used when a parameter has neither a row value nor a default.
pub const SENTINEL_ARGUMENT: &str = "foo";

//==============================================================================
// Function signatures
//==============================================================================

/// Declared default of a function parameter
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum DefaultValue {
    /// A textual default (may be the empty string)
    Text(String),
    /// The "no value" default; passed through as `ArgValue::Absent`
    Absent,
}

impl DefaultValue {
    pub fn text(value: impl Into<String>) -> Self {
        DefaultValue::Text(value.into())
    }
}

impl From<&DefaultValue> for ArgValue {
    fn from(default: &DefaultValue) -> Self {
        match default {
            DefaultValue::Text(s) => ArgValue::Text(s.clone()),
            DefaultValue::Absent => ArgValue::Absent,
        }
    }
}

/// A formal parameter of a registered function
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Parameter {
    pub name: String,
    pub default: Option<DefaultValue>,
}

impl Parameter {
    /// Parameter without a default
    pub fn required(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            default: None,
        }
    }

    /// Parameter with a textual default
    pub fn optional(name: impl Into<String>, default: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            default: Some(DefaultValue::Text(default.into())),
        }
    }

    /// Parameter whose default is "no value"
    pub fn absent(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            default: Some(DefaultValue::Absent),
        }
    }

    pub fn has_default(&self) -> bool {
        self.default.is_some()
    }

    /// Rendering used by signature listings: `name`, `name='x'`, `name=None`
    pub fn signature(&self) -> String {
        match &self.default {
            None => self.name.clone(),
            Some(DefaultValue::Text(s)) => format!("{}='{}'", self.name, s),
            Some(DefaultValue::Absent) => format!("{}=None", self.name),
        }
    }
}

//==============================================================================
// Call arguments
//==============================================================================

/// A resolved argument. Values are never coerced; callables parse them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum ArgValue {
    Text(String),
    Absent,
}

impl ArgValue {
    pub fn as_text(&self) -> Option<&str> {
        match self {
            ArgValue::Text(s) => Some(s),
            ArgValue::Absent => None,
        }
    }

    pub fn is_absent(&self) -> bool {
        matches!(self, ArgValue::Absent)
    }
}

/// Where a resolved argument came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ArgSource {
    /// Same-row cell at this column index
    Column(usize),
    Default,
    Sentinel,
}

/// Resolved arguments for one call, in parameter order
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Arguments {
    entries: Vec<(String, ArgValue, ArgSource)>,
}

impl Arguments {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, name: impl Into<String>, value: ArgValue, source: ArgSource) {
        self.entries.push((name.into(), value, source));
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Positional access
    pub fn get(&self, index: usize) -> Option<&ArgValue> {
        self.entries.get(index).map(|(_, v, _)| v)
    }

    /// Named access (case-insensitive)
    pub fn value(&self, name: &str) -> Option<&ArgValue> {
        self.entries
            .iter()
            .find(|(n, _, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v, _)| v)
    }

    /// Named text access; `None` when missing or absent
    pub fn text(&self, name: &str) -> Option<&str> {
        self.value(name).and_then(ArgValue::as_text)
    }

    /// Named text access rendering absent values as ""
    pub fn text_or_empty(&self, name: &str) -> &str {
        self.text(name).unwrap_or("")
    }

    pub fn source(&self, name: &str) -> Option<ArgSource> {
        self.entries
            .iter()
            .find(|(n, _, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, _, s)| *s)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &ArgValue)> {
        self.entries.iter().map(|(n, v, _)| (n.as_str(), v))
    }
}

//==============================================================================
// Rows
//==============================================================================

/// A row as read from a source, with its source-assigned identifier
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceRow {
    pub id: String,
    pub cells: Vec<String>,
}

impl SourceRow {
    pub fn new(id: impl Into<String>, cells: Vec<String>) -> Self {
        Self {
            id: id.into(),
            cells,
        }
    }

    /// True when every cell is empty (the stop signal for streaming sources)
    pub fn is_blank(&self) -> bool {
        self.cells.iter().all(|c| c.is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parameter_signature() {
        assert_eq!(Parameter::required("a").signature(), "a");
        assert_eq!(Parameter::optional("b", "hi").signature(), "b='hi'");
        assert_eq!(Parameter::absent("c").signature(), "c=None");
        assert!(!Parameter::required("a").has_default());
        assert!(Parameter::absent("c").has_default());
    }

    #[test]
    fn test_arguments_named_lookup_is_case_insensitive() {
        let mut args = Arguments::new();
        args.push("Param1", ArgValue::Text("X".into()), ArgSource::Column(2));
        args.push("sep", ArgValue::Absent, ArgSource::Default);

        assert_eq!(args.text("param1"), Some("X"));
        assert_eq!(args.text("sep"), None);
        assert_eq!(args.text_or_empty("sep"), "");
        assert_eq!(args.source("PARAM1"), Some(ArgSource::Column(2)));
        assert_eq!(args.get(1), Some(&ArgValue::Absent));
        assert_eq!(args.len(), 2);
    }

    #[test]
    fn test_blank_row_detection() {
        assert!(SourceRow::new("3", vec![String::new(), String::new()]).is_blank());
        assert!(SourceRow::new("3", vec![]).is_blank());
        assert!(!SourceRow::new("3", vec![String::new(), "x".into()]).is_blank());
    }
}
