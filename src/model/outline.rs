//! Scenario outline expansion.

use super::{MultilineArgument, Outline, Scenario, Step};

impl Outline {
    /// Expands the outline into one scenario per example row.
    ///
    /// Each `<column>` token is replaced with the row's cell for that column;
    /// tokens naming unknown columns are left untouched. Expanded scenarios are
    /// named `"<outline name> (example n)"`, counting from one.
    #[must_use]
    pub fn expand(&self) -> Vec<Scenario> {
        let headers = self.examples.headers();
        self.examples
            .body()
            .iter()
            .enumerate()
            .map(|(index, row)| {
                let bindings: Vec<(&str, &str)> = headers
                    .iter()
                    .zip(row)
                    .map(|(header, cell)| (header.as_str(), cell.as_str()))
                    .collect();
                Scenario {
                    name: format!("{} (example {})", self.name, index + 1),
                    tags: self.tags.clone(),
                    steps: self
                        .steps
                        .iter()
                        .map(|step| substitute_step(step, &bindings))
                        .collect(),
                }
            })
            .collect()
    }
}

fn substitute_step(step: &Step, bindings: &[(&str, &str)]) -> Step {
    Step {
        keyword: step.keyword,
        text: substitute(&step.text, bindings),
        argument: step.argument.as_ref().map(|argument| match argument {
            MultilineArgument::Table(table) => {
                MultilineArgument::Table(table.map_cells(|cell| substitute(cell, bindings)))
            }
            MultilineArgument::Text(text) => MultilineArgument::Text(substitute(text, bindings)),
        }),
    }
}

/// Replaces `<column>` tokens in one left-to-right pass, so inserted values
/// are never scanned for further tokens.
fn substitute(template: &str, bindings: &[(&str, &str)]) -> String {
    let mut output = String::with_capacity(template.len());
    let mut rest = template;
    while let Some((before, opened)) = rest.split_once('<') {
        output.push_str(before);
        // An unknown or unterminated token keeps its `<` and scanning resumes
        // right after it.
        let (inserted, next) = opened
            .split_once('>')
            .filter(|(column, _)| !column.contains('<'))
            .and_then(|(column, after)| {
                bindings
                    .iter()
                    .find(|(header, _)| *header == column)
                    .map(|(_, value)| (*value, after))
            })
            .unwrap_or(("<", opened));
        output.push_str(inserted);
        rest = next;
    }
    output.push_str(rest);
    output
}
