//! Persona prompt assembly
//!
//! Every reply is generated from a single stateless prompt: the persona
//! preamble, its style rules, the retrieved résumé context and the
//! visitor's question.
//!
//! Author: hephaex@gmail.com

use folio_core::{PersonaConfig, ScoredChunk};

/// Builder for persona prompts
#[derive(Debug, Clone, Default)]
pub struct PromptBuilder {
    preamble: String,
    style: Vec<String>,
    context_sections: Vec<String>,
    question: String,
}

impl PromptBuilder {
    /// Create a new prompt builder
    pub fn new() -> Self {
        Self::default()
    }

    /// Start from a persona: preamble, style rules and off-topic rule
    pub fn for_persona(persona: &PersonaConfig) -> Self {
        let mut builder = Self::new().preamble(format!(
            "You are {}, {}.",
            persona.name, persona.description
        ));
        for rule in &persona.style {
            builder = builder.add_style(rule.clone());
        }
        if !persona.off_topic_reply.is_empty() {
            builder = builder.add_style(format!(
                "If the user asks about unrelated stuff (politics, celebrities, news), reply: \"{}\"",
                persona.off_topic_reply
            ));
        }
        builder
    }

    /// Set the opening line
    pub fn preamble(mut self, preamble: impl Into<String>) -> Self {
        self.preamble = preamble.into();
        self
    }

    /// Add a style rule
    pub fn add_style(mut self, rule: impl Into<String>) -> Self {
        self.style.push(rule.into());
        self
    }

    /// Add a context section
    pub fn add_context(mut self, context: impl Into<String>) -> Self {
        self.context_sections.push(context.into());
        self
    }

    /// Add retrieved chunks in rank order, stopping before the context
    /// would exceed `max_chars`. Chunks are never cut mid-text; blank
    /// placeholder hits are skipped.
    pub fn add_chunks(mut self, chunks: &[ScoredChunk], max_chars: usize) -> Self {
        let mut used = self.context_len();
        for chunk in chunks.iter().filter(|c| c.has_text()) {
            let separator = if self.context_sections.is_empty() { 0 } else { 2 };
            let len = chunk.text.chars().count();
            if used + separator + len > max_chars {
                tracing::debug!("Context limit reached at {}", chunk.id);
                break;
            }
            used += separator + len;
            self.context_sections.push(chunk.text.clone());
        }
        self
    }

    /// Set the question
    pub fn question(mut self, q: impl Into<String>) -> Self {
        self.question = q.into();
        self
    }

    fn context_len(&self) -> usize {
        let text: usize = self
            .context_sections
            .iter()
            .map(|s| s.chars().count())
            .sum();
        text + self.context_sections.len().saturating_sub(1) * 2
    }

    /// Build the final prompt
    pub fn build(self) -> String {
        let mut prompt = String::new();

        if !self.preamble.is_empty() {
            prompt.push_str(&self.preamble);
            prompt.push('\n');
        }

        if !self.style.is_empty() {
            prompt.push_str("Your style:\n");
            for rule in &self.style {
                prompt.push_str("- ");
                prompt.push_str(rule);
                prompt.push('\n');
            }
        }

        prompt.push_str("\nContext:\n");
        prompt.push_str(&self.context_sections.join("\n\n"));
        prompt.push_str("\n\nQuestion:\n");
        prompt.push_str(&self.question);
        prompt.push('\n');

        prompt
    }
}
