//! System prompt construction for the Task Runner: a small builder that
//! accumulates named sections (headings, paragraphs, bullet lists) and
//! renders them as Markdown, so each section stays independently editable
//! and unit-testable rather than living in one opaque string literal.

#[derive(Debug, Default, Clone)]
pub struct PromptBuilder {
    sections: Vec<Section>,
}

#[derive(Debug, Clone)]
enum Section {
    Heading(String),
    Paragraph(String),
    Bullets(Vec<String>),
}

impl PromptBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn heading(mut self, text: impl Into<String>) -> Self {
        self.sections.push(Section::Heading(text.into()));
        self
    }

    pub fn paragraph(mut self, text: impl Into<String>) -> Self {
        let text = text.into();
        if !text.is_empty() {
            self.sections.push(Section::Paragraph(text));
        }
        self
    }

    pub fn bullets(mut self, items: Vec<String>) -> Self {
        if !items.is_empty() {
            self.sections.push(Section::Bullets(items));
        }
        self
    }

    pub fn render(&self) -> String {
        let mut out = String::new();
        for section in &self.sections {
            match section {
                Section::Heading(text) => {
                    out.push_str("## ");
                    out.push_str(text);
                    out.push_str("\n\n");
                }
                Section::Paragraph(text) => {
                    out.push_str(text);
                    out.push_str("\n\n");
                }
                Section::Bullets(items) => {
                    for item in items {
                        out.push_str("- ");
                        out.push_str(item);
                        out.push('\n');
                    }
                    out.push('\n');
                }
            }
        }
        out.trim_end().to_string()
    }
}

/// Assembles the fixed system prompt: who the agent is, the tool-use
/// contract, how to respond when uncertain, and what files (if any) are
/// available for upload.
pub fn build_system_prompt(task: &str, files_context: &str) -> String {
    let mut builder = PromptBuilder::new()
        .heading("Role")
        .paragraph(
            "You are a web automation agent. You drive a real browser one tool call at a time \
             to accomplish the task described below, using only what you can observe on the \
             current page.",
        )
        .heading("Task")
        .paragraph(task)
        .heading("Tool use")
        .bullets(vec![
            "Call exactly one batch of tools per turn; tools execute in the order you list them.".to_string(),
            "If a tool call fails, later calls in the same turn are skipped — fix the failure first.".to_string(),
            "Element ids (e.g. `button-2`) are only valid for the observation they came from; always act on the most recent one.".to_string(),
            "Call `complete_work` with a feedback summary once the task is done; call `abort_work` with a reason if it cannot be completed.".to_string(),
        ])
        .heading("When uncertain")
        .paragraph(
            "Use `observe` to get a fresh look at the page, or `think` to record your reasoning, \
             rather than guessing at an element id or navigating away from the task.",
        );

    if !files_context.is_empty() {
        builder = builder.heading("Available files").paragraph(files_context.to_string());
    }

    builder.render()
}
