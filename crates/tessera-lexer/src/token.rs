use serde::Serialize;

/// A byte range in template source, used for diagnostics.
///
/// Either end may be unknown: positions are only tracked when the caller asks
/// for source ranges, and some diagnostics only know where a problem starts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Range {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end: Option<usize>,
}

impl Range {
    pub fn new(start: usize, end: usize) -> Self {
        Self {
            start: Some(start),
            end: Some(end),
        }
    }

    pub fn at(start: usize) -> Self {
        Self {
            start: Some(start),
            end: None,
        }
    }

    pub fn from_options(start: Option<usize>, end: Option<usize>) -> Self {
        Self { start, end }
    }

    pub fn none() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.start.is_none() && self.end.is_none()
    }
}

/// A start-tag attribute as it appeared in the source.
///
/// `value` is already entity-decoded. `start`/`end` cover the attribute text
/// without its leading whitespace and are only present in source-range mode.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Attr {
    pub name: String,
    pub value: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end: Option<usize>,
}

impl Attr {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
            start: None,
            end: None,
        }
    }

    pub fn range(&self) -> Range {
        Range::from_options(self.start, self.end)
    }
}
