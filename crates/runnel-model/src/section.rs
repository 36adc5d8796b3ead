//! Bracketed-section tokenizer.
//!
//! Splits model text into named sections of whitespace-separated rows.
//! Comments start with `;` and run to end of line. Section names are
//! case-insensitive and stored upper-cased; a section that appears twice
//! has its rows appended to the first occurrence.

use indexmap::IndexMap;

use crate::error::ModelError;

/// One data row: its 1-based line number and its whitespace-split fields.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Row {
    /// 1-based line number in the source text.
    pub line: usize,
    /// Whitespace-separated tokens, comments removed.
    pub fields: Vec<String>,
}

impl Row {
    /// Field at `index`, if present.
    pub fn field(&self, index: usize) -> Option<&str> {
        self.fields.get(index).map(String::as_str)
    }

    /// The first field, which names the element the row describes.
    pub fn name(&self) -> &str {
        // Rows are only created with at least one field.
        &self.fields[0]
    }
}

/// A named section and its data rows in file order.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Section {
    /// Upper-cased section name without brackets.
    pub name: String,
    /// Line of the first header for this section.
    pub header_line: usize,
    /// Data rows.
    pub rows: Vec<Row>,
}

/// All sections of a model file, in order of first appearance.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SectionMap {
    sections: IndexMap<String, Section>,
}

impl SectionMap {
    /// Tokenize `text` into sections.
    ///
    /// Fails on a malformed header (`[` without a closing `]`, or an empty
    /// name) and on data appearing before the first header.
    pub fn parse(text: &str) -> Result<Self, ModelError> {
        let mut sections: IndexMap<String, Section> = IndexMap::new();
        let mut current: Option<String> = None;

        for (idx, raw) in text.lines().enumerate() {
            let line = idx + 1;
            let content = match raw.find(';') {
                Some(pos) => &raw[..pos],
                None => raw,
            };
            let trimmed = content.trim();
            if trimmed.is_empty() {
                continue;
            }

            if trimmed.starts_with('[') {
                let name = trimmed
                    .strip_prefix('[')
                    .and_then(|s| s.strip_suffix(']'))
                    .map(str::trim)
                    .filter(|s| !s.is_empty())
                    .ok_or_else(|| ModelError::MalformedHeader {
                        line,
                        text: trimmed.to_string(),
                    })?
                    .to_ascii_uppercase();
                sections.entry(name.clone()).or_insert_with(|| Section {
                    name: name.clone(),
                    header_line: line,
                    rows: Vec::new(),
                });
                current = Some(name);
                continue;
            }

            let Some(name) = current.as_ref() else {
                return Err(ModelError::DataOutsideSection { line });
            };
            let fields = trimmed.split_whitespace().map(str::to_string).collect();
            if let Some(section) = sections.get_mut(name) {
                section.rows.push(Row { line, fields });
            }
        }

        Ok(Self { sections })
    }

    /// Look up a section by name (case-insensitive).
    pub fn get(&self, name: &str) -> Option<&Section> {
        self.sections.get(&name.to_ascii_uppercase())
    }

    /// Rows of a section, or an empty slice if the section is absent.
    pub fn rows(&self, name: &str) -> &[Row] {
        self.get(name).map(|s| s.rows.as_slice()).unwrap_or(&[])
    }

    /// Whether a section header appeared.
    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// Section names in order of first appearance.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.sections.keys().map(String::as_str)
    }

    /// Number of distinct sections.
    pub fn len(&self) -> usize {
        self.sections.len()
    }

    /// Returns `true` if the text had no sections.
    pub fn is_empty(&self) -> bool {
        self.sections.is_empty()
    }
}
