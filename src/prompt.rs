//! Prompt builder.
//!
//! Pure formatting: the same question and table list always render the same
//! prompt. Tables keep the caller's order and are never truncated.

use std::fmt;

use crate::metadata::TableSchema;
use crate::validation::QUERY_FIELD;

const PREAMBLE: &str = "You are an expert SQL assistant. Write a single read-only SELECT \
statement that answers the question using only the tables described below.";

/// An immutable, fully rendered prompt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PromptContext {
    text: String,
    table_count: usize,
}

impl PromptContext {
    pub fn as_str(&self) -> &str {
        &self.text
    }

    /// Number of table lines in the prompt.
    pub fn table_count(&self) -> usize {
        self.table_count
    }
}

impl fmt::Display for PromptContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text)
    }
}

impl AsRef<str> for PromptContext {
    fn as_ref(&self) -> &str {
        &self.text
    }
}

/// Render one schema line: `Table <name>: <col> (<type>), ...`.
pub fn schema_line(table: &TableSchema) -> String {
    format!(
        "Table {}: {}",
        sanitize(&table.name),
        sanitize(&table.describe())
    )
}

/// Build the instruction text for `question` over `tables`.
pub fn build_prompt(question: &str, tables: &[TableSchema]) -> PromptContext {
    let mut text = String::new();

    text.push_str(PREAMBLE);
    text.push('\n');
    text.push_str(&format!(
        "Respond with exactly one JSON object containing a single key \"{QUERY_FIELD}\" \
whose value is the SQL text. Do not add explanations or markdown."
    ));
    text.push_str("\n\nSchemas:\n");

    for table in tables {
        text.push_str(&schema_line(table));
        text.push('\n');
    }

    text.push_str("\nQuestion: ");
    text.push_str(&sanitize(question));
    text.push_str("\n\nJSON response:");

    PromptContext {
        text,
        table_count: tables.len(),
    }
}

/// Replace control characters (newlines included) with a space so caller
/// text cannot break the line framing.
fn sanitize(text: &str) -> String {
    text.chars()
        .map(|c| if c.is_control() { ' ' } else { c })
        .collect()
}
