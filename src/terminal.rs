//! Terminal stand-ins for the editor and the instance viewer, used by the
//! `explore` command.

use std::io::Write;

use crate::cache::InstanceCache;
use crate::controller::{Feedback, Highlight, LogClass, Renderer, TextSurface};
use crate::models::{EditorRange, Instance};

/// Prints each displayed instance as pretty JSON.
pub struct JsonRenderer<W: Write> {
    out: W,
    shown: usize,
}

impl<W: Write> JsonRenderer<W> {
    pub fn new(out: W) -> Self {
        Self { out, shown: 0 }
    }

    pub fn shown(&self) -> usize {
        self.shown
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

impl<W: Write> Renderer for JsonRenderer<W> {
    fn reset_positions(&mut self) {}

    fn show(&mut self, instance: &Instance) {
        self.shown += 1;
        let body = instance
            .graph()
            .map(|g| serde_json::to_string_pretty(g).unwrap_or_else(|_| g.to_string()))
            .unwrap_or_else(|| "<empty instance>".to_string());
        if let Err(e) = writeln!(self.out, "{}", body) {
            tracing::warn!("Failed to print instance: {}", e);
        }
    }

    fn new_instance_setup(&mut self) {}
}

/// Source text loaded from a file. Highlights are recorded, not drawn.
#[derive(Debug, Default)]
pub struct FileSurface {
    text: String,
    highlights: Vec<(EditorRange, Highlight)>,
}

impl FileSurface {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            highlights: Vec::new(),
        }
    }

    pub fn set_text(&mut self, text: impl Into<String>) {
        self.text = text.into();
    }

    pub fn highlights(&self) -> &[(EditorRange, Highlight)] {
        &self.highlights
    }
}

impl TextSurface for FileSurface {
    fn value(&self) -> String {
        self.text.clone()
    }

    fn highlight(&mut self, range: EditorRange, kind: Highlight) {
        tracing::debug!(?kind, ?range, "Highlight");
        self.highlights.push((range, kind));
    }

    fn clear_highlights(&mut self) {
        self.highlights
            .retain(|(_, kind)| *kind == Highlight::Secret);
    }

    fn clear_secret_highlights(&mut self) {
        self.highlights
            .retain(|(_, kind)| *kind != Highlight::Secret);
    }
}

/// One line per message, prefixed by its class.
pub fn format_feedback(feedback: &Feedback) -> String {
    let tag = match feedback.class {
        LogClass::Error => "error",
        LogClass::Warning => "warning",
        LogClass::Complete => "ok",
        LogClass::Wrong => "fail",
        LogClass::Info => "info",
    };
    format!("[{}] {}", tag, feedback.message.trim_end())
}

/// Cursor position within the cache, 1-based for display.
pub fn format_status(cache: &InstanceCache) -> String {
    if cache.max_known() == 0 {
        return format!("no instances ({:?})", cache.state());
    }
    format!(
        "instance {}/{} ({:?})",
        cache.cursor() + 1,
        cache.max_known(),
        cache.state()
    )
}
