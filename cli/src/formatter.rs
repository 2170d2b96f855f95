use crate::title::Title;
use comfy_table::{presets::UTF8_FULL, Cell, CellAlignment, Row, Table};
use fathom::markup::Element;
use serde_json::{json, Value};
use std::path::PathBuf;

const EXCERPT_CHARS: usize = 60;

pub struct Formatter {}

impl Default for Formatter {
    fn default() -> Self {
        Self::new()
    }
}

impl Formatter {
    pub fn new() -> Self {
        Self {}
    }

    pub fn format_titles(&self, titles: &[(PathBuf, Option<Title>)]) -> String {
        let mut table = Table::new();
        table.load_preset(UTF8_FULL);
        table.set_header(Row::from(vec![
            Cell::new("File").set_alignment(CellAlignment::Left),
            Cell::new("Title").set_alignment(CellAlignment::Left),
            Cell::new("Score").set_alignment(CellAlignment::Right),
            Cell::new("Source").set_alignment(CellAlignment::Left),
        ]));

        for (path, title) in titles {
            let path = path.display().to_string();
            match title {
                Some(title) => table.add_row(Row::from(vec![
                    Cell::new(path),
                    Cell::new(excerpt(&title.text)),
                    Cell::new(title.score).set_alignment(CellAlignment::Right),
                    Cell::new(&title.source),
                ])),
                None => table.add_row(Row::from(vec![
                    Cell::new(path),
                    Cell::new("-"),
                    Cell::new("-").set_alignment(CellAlignment::Right),
                    Cell::new("-"),
                ])),
            };
        }

        format!("{}\n", table)
    }

    pub fn titles_json(&self, titles: &[(PathBuf, Option<Title>)]) -> Value {
        Value::Array(
            titles
                .iter()
                .map(|(path, title)| match title {
                    Some(title) => json!({
                        "file": path.display().to_string(),
                        "title": title.text,
                        "score": title.score,
                        "source": title.source,
                    }),
                    None => json!({
                        "file": path.display().to_string(),
                        "title": null,
                    }),
                })
                .collect(),
        )
    }

    pub fn format_selection(&self, selector: &str, elements: &[Element]) -> String {
        let mut output = format!(
            "{} element(s) match '{}'\n",
            elements.len(),
            selector
        );
        if elements.is_empty() {
            return output;
        }

        let mut table = Table::new();
        table.load_preset(UTF8_FULL);
        table.set_header(Row::from(vec![
            Cell::new("#").set_alignment(CellAlignment::Right),
            Cell::new("Tag"),
            Cell::new("Id"),
            Cell::new("Classes"),
            Cell::new("Text"),
        ]));
        for element in elements {
            table.add_row(Row::from(vec![
                Cell::new(element.index()).set_alignment(CellAlignment::Right),
                Cell::new(element.name()),
                Cell::new(element.id().unwrap_or("")),
                Cell::new(element.classes().join(" ")),
                Cell::new(excerpt(&element.text())),
            ]));
        }

        output.push_str(&table.to_string());
        output.push('\n');
        output
    }
}

/// The first few characters of a text, with an ellipsis if cut
fn excerpt(text: &str) -> String {
    let mut chars = text.chars();
    let head: String = chars.by_ref().take(EXCERPT_CHARS).collect();
    if chars.next().is_some() {
        format!("{}…", head)
    } else {
        head
    }
}
