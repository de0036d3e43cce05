//! Renderers for the CLI boundary.
//!
//! The document tree stays render-agnostic; these functions project it
//! to plain text (markdown-flavored, for terminals and files) or JSON.

use crate::format::{Block, FormattedResponse, Section, Table};
use anyhow::Result;

/// Render a response document as markdown-flavored text.
pub fn render_text(response: &FormattedResponse) -> String {
    let mut output = String::new();

    output.push_str(&format!("# {}\n\n", response.title));

    for section in &response.sections {
        render_section(section, 2, &mut output);
    }

    output
}

fn render_section(section: &Section, level: usize, output: &mut String) {
    output.push_str(&format!("{} {}\n\n", "#".repeat(level), section.heading));

    for block in &section.blocks {
        render_block(block, output);
    }

    for subsection in &section.subsections {
        render_section(subsection, level + 1, output);
    }
}

fn render_block(block: &Block, output: &mut String) {
    match block {
        Block::Paragraph { text } => {
            output.push_str(text);
            output.push_str("\n\n");
        }
        Block::Bullets { items } => {
            for item in items {
                output.push_str(&format!("- {}\n", item));
            }
            output.push('\n');
        }
        Block::Table(table) => {
            render_table(table, output);
        }
    }
}

fn render_table(table: &Table, output: &mut String) {
    output.push_str(&format!("| {} |\n", table.headers.join(" | ")));
    output.push_str(&format!(
        "|{}\n",
        table.headers.iter().map(|_| ":---|").collect::<String>()
    ));
    for row in &table.rows {
        output.push_str(&format!("| {} |\n", row.join(" | ")));
    }
    output.push('\n');
}

/// Render a response document as pretty-printed JSON.
pub fn render_json(response: &FormattedResponse) -> Result<String> {
    serde_json::to_string_pretty(response).map_err(Into::into)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_response() -> FormattedResponse {
        FormattedResponse {
            title: "Trend analysis: revenue (2020-2022)".to_string(),
            sections: vec![Section {
                heading: "PSU-1".to_string(),
                blocks: vec![
                    Block::Bullets {
                        items: vec!["2020: 100.00 cr".to_string(), "2022: 150.00 cr".to_string()],
                    },
                    Block::Table(Table {
                        headers: vec!["Period".to_string(), "Growth".to_string()],
                        rows: vec![vec!["2020 to 2022".to_string(), "+50.0%".to_string()]],
                    }),
                ],
                subsections: vec![Section {
                    heading: "Notes".to_string(),
                    blocks: vec![Block::Paragraph {
                        text: "No data for 2021.".to_string(),
                    }],
                    subsections: vec![],
                }],
            }],
        }
    }

    #[test]
    fn test_render_text_structure() {
        let text = render_text(&sample_response());

        assert!(text.contains("# Trend analysis: revenue (2020-2022)"));
        assert!(text.contains("## PSU-1"));
        assert!(text.contains("### Notes"));
        assert!(text.contains("- 2020: 100.00 cr"));
        assert!(text.contains("| Period | Growth |"));
        assert!(text.contains("| 2020 to 2022 | +50.0% |"));
    }

    #[test]
    fn test_render_json_round_trips() {
        let response = sample_response();
        let json = render_json(&response).unwrap();
        let back: FormattedResponse = serde_json::from_str(&json).unwrap();

        assert_eq!(back.title, response.title);
        assert_eq!(back.sections.len(), 1);
        assert_eq!(back.sections[0].subsections.len(), 1);
    }

    #[test]
    fn test_render_text_is_deterministic() {
        let response = sample_response();
        assert_eq!(render_text(&response), render_text(&response));
    }
}
