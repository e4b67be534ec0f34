//! Long-form text editing with a Markdown preview.

use pulldown_cmark::{html, Options, Parser};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

const EMPTY_PREVIEW: &str = "No content to preview";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ViewMode {
    #[default]
    Edit,
    Preview,
    Split,
}

impl fmt::Display for ViewMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ViewMode::Edit => "edit",
            ViewMode::Preview => "preview",
            ViewMode::Split => "split",
        })
    }
}

impl FromStr for ViewMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "edit" => Ok(ViewMode::Edit),
            "preview" => Ok(ViewMode::Preview),
            "split" => Ok(ViewMode::Split),
            other => Err(format!("unknown view mode `{other}`")),
        }
    }
}

/// What the editor shows in its current mode.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Rendered {
    Source(String),
    Html(String),
    Split { source: String, html: String },
}

/// Holds the text of one long-form field and the mode it is shown in.
///
/// Nothing is persisted here; the owning form reads [`ContentEditor::content`]
/// when it builds its payload.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ContentEditor {
    content: String,
    mode: ViewMode,
}

impl ContentEditor {
    pub fn new(content: impl Into<String>) -> Self {
        ContentEditor {
            content: content.into(),
            mode: ViewMode::Edit,
        }
    }

    pub fn content(&self) -> &str {
        &self.content
    }

    pub fn into_content(self) -> String {
        self.content
    }

    pub fn mode(&self) -> ViewMode {
        self.mode
    }

    pub fn set_mode(&mut self, mode: ViewMode) {
        self.mode = mode;
    }

    /// Replaces the text. Ignored in preview mode, where the source is not
    /// exposed; returns whether the change was applied.
    pub fn set_content(&mut self, content: impl Into<String>) -> bool {
        if self.mode == ViewMode::Preview {
            tracing::debug!("Content change ignored in preview mode");
            return false;
        }
        self.content = content.into();
        true
    }

    pub fn render(&self) -> Rendered {
        match self.mode {
            ViewMode::Edit => Rendered::Source(self.content.clone()),
            ViewMode::Preview => Rendered::Html(self.preview()),
            ViewMode::Split => Rendered::Split {
                source: self.content.clone(),
                html: self.preview(),
            },
        }
    }

    fn preview(&self) -> String {
        if self.content.trim().is_empty() {
            render_markdown(EMPTY_PREVIEW)
        } else {
            render_markdown(&self.content)
        }
    }
}

/// Markdown → HTML with tables and strikethrough. Raw HTML such as embedded
/// `<iframe>` players is emitted unescaped.
pub fn render_markdown(source: &str) -> String {
    let mut options = Options::empty();
    options.insert(Options::ENABLE_TABLES);
    options.insert(Options::ENABLE_STRIKETHROUGH);

    let parser = Parser::new_ext(source, options);
    let mut out = String::with_capacity(source.len() * 3 / 2);
    html::push_html(&mut out, parser);
    out
}
