//! Prompt assembly for the query pipeline
//!
//! Builds the bounded prompt sent to the chat model: system instruction,
//! section-tagged context passages, the user's question, and answering
//! instructions. The context block is budgeted in characters; passages
//! are added most relevant first and the lowest-ranked fall off when the
//! budget is spent.

use bookrag_core::SearchResult;

const SYSTEM_INSTRUCTION: &str = "You are a knowledgeable assistant for a technical book. \
Answer the question using the provided context passages. \
Cite the section a passage came from when you use it. \
If the context does not contain the answer, say so before answering from general knowledge.";

const NO_CONTEXT_INSTRUCTION: &str = "You are a knowledgeable assistant for a technical book. \
No relevant passages were found for this question. \
Answer from general knowledge if you can, or say that the book does not cover it.";

/// Assemble the full prompt for a query.
///
/// `sources` must already be ordered most relevant first.
pub fn assemble_prompt(query: &str, sources: &[SearchResult], max_context_chars: usize) -> String {
    if sources.is_empty() {
        return PromptBuilder::new(NO_CONTEXT_INSTRUCTION).question(query).build();
    }

    let mut builder = PromptBuilder::new(SYSTEM_INSTRUCTION).context_budget(max_context_chars);
    for source in sources {
        builder = builder.add_source(source);
    }

    builder
        .question(query)
        .instruction("Use only information relevant to the question")
        .instruction("Mention the section name for any passage you rely on")
        .build()
}

/// Builder for grounded prompts with a bounded context block
pub struct PromptBuilder {
    system: String,
    budget: usize,
    used: usize,
    full: bool,
    entries: Vec<String>,
    question: String,
    instructions: Vec<String>,
}

impl PromptBuilder {
    /// Start a prompt with the given system instruction
    pub fn new(system: impl Into<String>) -> Self {
        Self {
            system: system.into(),
            budget: usize::MAX,
            used: 0,
            full: false,
            entries: Vec::new(),
            question: String::new(),
            instructions: Vec::new(),
        }
    }

    /// Cap the total passage content added through [`Self::add_source`]
    pub fn context_budget(mut self, chars: usize) -> Self {
        self.budget = chars;
        self
    }

    /// Add a retrieved passage, tagged with its position and section.
    ///
    /// The first passage that would exceed the budget closes the context
    /// block; it and everything after it is dropped. Because callers add
    /// passages most relevant first, the lowest-ranked are the ones lost.
    pub fn add_source(mut self, source: &SearchResult) -> Self {
        if self.full || self.used + source.content.len() > self.budget {
            self.full = true;
            return self;
        }

        self.used += source.content.len();
        self.entries.push(format!(
            "[{}] Section: {}\n{}",
            self.entries.len() + 1,
            source.section,
            source.content
        ));
        self
    }

    /// Set the question
    pub fn question(mut self, question: impl Into<String>) -> Self {
        self.question = question.into();
        self
    }

    /// Append an answering instruction
    pub fn instruction(mut self, instruction: impl Into<String>) -> Self {
        self.instructions.push(instruction.into());
        self
    }

    /// Render the final prompt
    pub fn build(self) -> String {
        let mut prompt = self.system;

        if !self.entries.is_empty() {
            prompt.push_str("\n\n<context>\n");
            prompt.push_str(&self.entries.join("\n\n"));
            prompt.push_str("\n</context>");
        }

        if !self.question.is_empty() {
            prompt.push_str("\n\n<question>\n");
            prompt.push_str(&self.question);
            prompt.push_str("\n</question>");
        }

        if !self.instructions.is_empty() {
            prompt.push_str("\n\n<instructions>\n");
            for (i, instruction) in self.instructions.iter().enumerate() {
                prompt.push_str(&format!("{}. {}\n", i + 1, instruction));
            }
            prompt.push_str("</instructions>");
        }

        prompt.push('\n');
        prompt
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn result(content: &str, section: &str, score: f32, rank: usize) -> SearchResult {
        SearchResult {
            content: content.to_string(),
            section: section.to_string(),
            source_path: "docs/test.md".to_string(),
            relevance_score: score,
            rank,
        }
    }

    #[test]
    fn test_prompt_builder_layout() {
        let prompt = PromptBuilder::new("You are a helpful assistant.")
            .add_source(&result("Context from document A", "A", 0.9, 0))
            .add_source(&result("Context from document B", "B", 0.8, 1))
            .question("What is the answer?")
            .instruction("Be concise")
            .build();

        assert!(prompt.starts_with("You are a helpful assistant."));
        assert!(prompt.contains("<context>"));
        assert!(prompt.contains("[1] Section: A"));
        assert!(prompt.contains("[2] Section: B"));
        assert!(prompt.contains("What is the answer?"));
        assert!(prompt.contains("1. Be concise"));
    }

    #[test]
    fn test_assemble_tags_chunks_with_sections() {
        let sources = vec![
            result("ROS 2 overview text", "Introduction to ROS 2", 0.9, 0),
            result("Simulation details", "Isaac Sim", 0.7, 1),
        ];

        let prompt = assemble_prompt("What is ROS 2?", &sources, 8000);
        assert!(prompt.contains("[1] Section: Introduction to ROS 2"));
        assert!(prompt.contains("[2] Section: Isaac Sim"));
        assert!(prompt.contains("What is ROS 2?"));
    }

    #[test]
    fn test_assemble_truncates_lowest_ranked_first() {
        let big = "x".repeat(120);
        let sources = vec![
            result(&big, "First", 0.9, 0),
            result(&big, "Second", 0.8, 1),
            result(&big, "Third", 0.7, 2),
        ];

        // Budget for two passages only
        let prompt = assemble_prompt("question", &sources, 250);
        assert!(prompt.contains("Section: First"));
        assert!(prompt.contains("Section: Second"));
        assert!(!prompt.contains("Section: Third"));
    }

    #[test]
    fn test_budget_drops_a_suffix_not_a_subset() {
        // Once a passage overflows, a smaller later one must not sneak in
        let prompt = PromptBuilder::new("sys")
            .context_budget(100)
            .add_source(&result(&"x".repeat(60), "First", 0.9, 0))
            .add_source(&result(&"x".repeat(60), "Second", 0.8, 1))
            .add_source(&result("tiny", "Third", 0.7, 2))
            .question("q")
            .build();

        assert!(prompt.contains("Section: First"));
        assert!(!prompt.contains("Section: Second"));
        assert!(!prompt.contains("Section: Third"));
    }

    #[test]
    fn test_assemble_without_context() {
        let prompt = assemble_prompt("What is ROS 2?", &[], 8000);
        assert!(prompt.contains("No relevant passages"));
        assert!(!prompt.contains("<context>"));
        assert!(prompt.contains("What is ROS 2?"));
    }
}
