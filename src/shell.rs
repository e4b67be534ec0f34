//! Layout chrome and plain-text rendering of pages for the terminal.

use crate::list::{ListState, Row};
use crate::routes::Route;

pub const APP_TITLE: &str = "Release Notes CMS";

const NAV: [(&str, Route); 3] = [
    ("Buckets", Route::Buckets),
    ("Files", Route::Files),
    ("Release Notes", Route::ReleaseNotes),
];

/// Static header + navigation wrapped around every page.
#[derive(Debug, Clone, Copy, Default)]
pub struct Layout;

impl Layout {
    /// The navigation entry a route belongs to.
    fn section(route: &Route) -> Route {
        match route {
            Route::Buckets
            | Route::NewBucket
            | Route::BucketDetails(_)
            | Route::EditBucket(_)
            | Route::NewFile {
                bucket_id: Some(_),
            } => Route::Buckets,
            Route::Files | Route::EditFile(_) | Route::NewFile { bucket_id: None } => Route::Files,
            Route::ReleaseNotes | Route::NewReleaseNote | Route::EditReleaseNote(_) => {
                Route::ReleaseNotes
            }
        }
    }

    pub fn render(&self, active: &Route, heading: &str, body: &str) -> String {
        let section = Self::section(active);
        let nav = NAV
            .iter()
            .map(|(label, route)| {
                if *route == section {
                    format!("[{label}]")
                } else {
                    label.to_string()
                }
            })
            .collect::<Vec<_>>()
            .join("  ");

        let mut out = String::new();
        out.push_str(APP_TITLE);
        out.push_str("  |  ");
        out.push_str(&nav);
        out.push('\n');
        out.push_str(&"=".repeat(APP_TITLE.len() + 5 + nav.chars().count()));
        out.push_str("\n\n");
        out.push_str(heading);
        out.push_str(&format!("  ({active})\n\n"));
        out.push_str(body.trim_end());
        out.push('\n');
        out
    }
}

/// Left-aligned columns sized to their widest cell.
pub fn render_table(headers: &[&str], rows: &[Vec<String>]) -> String {
    let mut widths: Vec<usize> = headers.iter().map(|h| h.chars().count()).collect();
    for row in rows {
        for (i, cell) in row.iter().enumerate() {
            if let Some(w) = widths.get_mut(i) {
                *w = (*w).max(cell.chars().count());
            }
        }
    }

    let dashes: Vec<String> = widths.iter().map(|w| "-".repeat(*w)).collect();
    let mut out = table_line(headers, &widths);
    out.push('\n');
    out.push_str(&table_line(
        &dashes.iter().map(String::as_str).collect::<Vec<_>>(),
        &widths,
    ));
    out.push('\n');
    for row in rows {
        out.push_str(&table_line(
            &row.iter().map(String::as_str).collect::<Vec<_>>(),
            &widths,
        ));
        out.push('\n');
    }
    out
}

fn table_line(cells: &[&str], widths: &[usize]) -> String {
    cells
        .iter()
        .zip(widths)
        .map(|(cell, &width)| format!("{cell:<width$}"))
        .collect::<Vec<_>>()
        .join("  ")
        .trim_end()
        .to_string()
}

/// Body of a list page: status line or a table with edit/delete controls.
pub fn render_rows(state: &ListState, rows: &[Row], create: &Route) -> String {
    match state {
        ListState::Loading => return "Loading...\n".to_string(),
        ListState::Failed(message) => return format!("Error: {message}\n"),
        ListState::Ready { .. } => {}
    }

    let mut out = String::new();
    if matches!(state, ListState::Ready { from_fixtures: true }) {
        out.push_str("(backend unavailable, showing demo data)\n\n");
    }
    if rows.is_empty() {
        out.push_str("Nothing here yet.\n");
    } else {
        let cells: Vec<Vec<String>> = rows
            .iter()
            .map(|row| {
                vec![
                    row.id.to_string(),
                    row.label.clone(),
                    row.detail.clone(),
                    row.created_at.format("%b %d, %Y").to_string(),
                    row.edit.to_string(),
                    format!("delete {}", row.delete),
                ]
            })
            .collect();
        out.push_str(&render_table(
            &["Id", "Name", "Detail", "Created At", "Edit", "Delete"],
            &cells,
        ));
    }
    out.push_str(&format!("\nNew: {create}\n"));
    out
}

/// Body of a form page: one `Label: value` line per field, multi-line values indented.
pub fn render_fields(fields: &[(&'static str, String)]) -> String {
    let width = fields.iter().map(|(l, _)| l.len()).max().unwrap_or(0);
    let mut out = String::new();
    for (label, value) in fields {
        let mut lines = value.lines();
        let first = lines.next().unwrap_or("");
        out.push_str(&format!("{label:>width$}: {first}\n"));
        for rest in lines {
            out.push_str(&format!("{:>width$}  {rest}\n", ""));
        }
    }
    out
}
