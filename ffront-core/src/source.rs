#![forbid(unsafe_code)]

//! Access to the source text and closure of a host function.

use std::collections::BTreeMap;
use std::fmt;

use ffront_ast::SymbolType;

use crate::error::{FrontendError, SourceUnavailableError};
use crate::values::CapturedValue;

/// Placeholder file name of functions created from a string at runtime.
pub const MISSING_FILENAME: &str = "<string>";

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SourceDefinition {
    pub source: String,
    pub filename: String,
    /// 1-based line of the `def` in `filename`.
    pub starting_line: u32,
}

impl SourceDefinition {
    pub fn new(source: impl Into<String>, filename: impl Into<String>, starting_line: u32) -> Self {
        Self {
            source: source.into(),
            filename: filename.into(),
            starting_line,
        }
    }
}

/// What the frontend needs to know about a host function.
pub trait SourceExtractor: fmt::Debug + Send + Sync {
    fn name(&self) -> &str;

    fn source_definition(&self) -> Result<SourceDefinition, FrontendError>;

    /// Values of the function's closure cells, by name.
    fn closure_cells(&self) -> &BTreeMap<String, CapturedValue>;

    /// The namespace global names are looked up in.
    fn global_namespace(&self) -> &BTreeMap<String, CapturedValue>;

    /// Signature annotations; `"return"` holds the return annotation.
    fn annotations(&self) -> &BTreeMap<String, SymbolType>;
}

/// In-memory description of a host function.
#[derive(Clone, Debug, Default)]
pub struct HostFunction {
    pub name: String,
    pub source: Option<String>,
    pub filename: String,
    pub starting_line: u32,
    pub closure_cells: BTreeMap<String, CapturedValue>,
    pub globals: BTreeMap<String, CapturedValue>,
    pub annotations: BTreeMap<String, SymbolType>,
}

impl HostFunction {
    pub fn new(name: impl Into<String>, source: impl Into<String>, filename: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            source: Some(source.into()),
            filename: filename.into(),
            starting_line: 1,
            ..Default::default()
        }
    }

    pub fn at_line(mut self, starting_line: u32) -> Self {
        self.starting_line = starting_line;
        self
    }

    pub fn with_closure_cell(mut self, name: impl Into<String>, value: CapturedValue) -> Self {
        self.closure_cells.insert(name.into(), value);
        self
    }

    pub fn with_global(mut self, name: impl Into<String>, value: CapturedValue) -> Self {
        self.globals.insert(name.into(), value);
        self
    }

    pub fn with_annotation(mut self, name: impl Into<String>, ty: SymbolType) -> Self {
        self.annotations.insert(name.into(), ty);
        self
    }
}

impl SourceExtractor for HostFunction {
    fn name(&self) -> &str {
        &self.name
    }

    fn source_definition(&self) -> Result<SourceDefinition, FrontendError> {
        if self.filename.is_empty() || self.filename.ends_with(MISSING_FILENAME) {
            return Err(SourceUnavailableError {
                message: "can not create field operator from a function that is not in a source file"
                    .to_string(),
            }
            .into());
        }
        let Some(source) = &self.source else {
            return Err(SourceUnavailableError {
                message: format!("can not get source code of passed function ({})", self.name),
            }
            .into());
        };
        Ok(SourceDefinition {
            source: dedent(source),
            filename: self.filename.clone(),
            starting_line: self.starting_line.max(1),
        })
    }

    fn closure_cells(&self) -> &BTreeMap<String, CapturedValue> {
        &self.closure_cells
    }

    fn global_namespace(&self) -> &BTreeMap<String, CapturedValue> {
        &self.globals
    }

    fn annotations(&self) -> &BTreeMap<String, SymbolType> {
        &self.annotations
    }
}

/// Remove the leading whitespace every non-blank line shares. Blank lines
/// are reduced to an empty line.
pub fn dedent(text: &str) -> String {
    let margin = text
        .lines()
        .filter(|line| !line.trim().is_empty())
        .map(|line| &line[..line.len() - line.trim_start_matches([' ', '\t']).len()])
        .reduce(common_prefix)
        .unwrap_or("");

    let mut out = String::with_capacity(text.len());
    for line in text.split_inclusive('\n') {
        let (body, newline) = match line.strip_suffix('\n') {
            Some(body) => (body, "\n"),
            None => (line, ""),
        };
        if body.trim().is_empty() {
            out.push_str(newline);
        } else {
            out.push_str(body.strip_prefix(margin).unwrap_or(body));
            out.push_str(newline);
        }
    }
    out
}

fn common_prefix<'a>(a: &'a str, b: &'a str) -> &'a str {
    let len = a
        .bytes()
        .zip(b.bytes())
        .take_while(|(x, y)| x == y)
        .count();
    &a[..len]
}
