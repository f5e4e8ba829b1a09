use std::path::Path;
use std::sync::Arc;

use tracing::info;

use crate::application::use_cases::RetrieveUseCase;
use crate::application::ChatClient;
use crate::domain::{DomainError, SearchResult};

const SYSTEM_PROMPT: &str =
    "You are a customer support assistant. Answer based ONLY on the provided context.";

const SNIPPET_WIDTH: usize = 800;

const IMAGE_ONLY_QUESTION: &str = "Describe the product shown in the image.";

/// Answers a support question by retrieving catalog context and handing it
/// to an LLM.
pub struct AnswerQuestionUseCase {
    retriever: Arc<RetrieveUseCase>,
    chat_client: Arc<dyn ChatClient>,
}

impl AnswerQuestionUseCase {
    pub fn new(retriever: Arc<RetrieveUseCase>, chat_client: Arc<dyn ChatClient>) -> Self {
        Self {
            retriever,
            chat_client,
        }
    }

    pub async fn answer_text(&self, query: &str, k: usize) -> Result<String, DomainError> {
        let results = self.retriever.by_text(query, k).await?;
        self.answer_with_context(query, &results).await
    }

    pub async fn answer_image(&self, image: &Path, k: usize) -> Result<String, DomainError> {
        let results = self.retriever.by_image(image, k).await?;
        self.answer_with_context(IMAGE_ONLY_QUESTION, &results).await
    }

    pub async fn answer_text_and_image(
        &self,
        query: &str,
        image: &Path,
        k: usize,
    ) -> Result<String, DomainError> {
        let results = self.retriever.by_text_and_image(query, image, k).await?;
        self.answer_with_context(query, &results).await
    }

    /// Generate an answer from already-retrieved context, for callers that
    /// have run the retrieval themselves.
    pub async fn answer_with_context(
        &self,
        query: &str,
        results: &[SearchResult],
    ) -> Result<String, DomainError> {
        info!("Answering with {} context chunks", results.len());
        let prompt = build_prompt(query, results);
        self.chat_client.complete(SYSTEM_PROMPT, &prompt).await
    }
}

/// Render the user prompt: question, then one context entry per retrieved
/// chunk (product title plus a flattened snippet), then answering rules.
pub fn build_prompt(query: &str, results: &[SearchResult]) -> String {
    let contexts: Vec<String> = results
        .iter()
        .map(|result| {
            let meta = result.chunk().metadata();
            format!(
                "- {} (ASIN: {})\n  {}",
                meta.product_name(),
                meta.asin(),
                result.chunk().snippet(SNIPPET_WIDTH)
            )
        })
        .collect();

    let context_block = if contexts.is_empty() {
        "No context retrieved.".to_string()
    } else {
        contexts.join("\n\n")
    };

    format!(
        "Question:\n{query}\n\nContext:\n{context_block}\n\nRules:\n\
         - Use only the given context, don't invent facts.\n\
         - Present troubleshooting steps as bullet points if available.\n"
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Chunk, ChunkMetadata};

    fn result(name: &str, text: &str) -> SearchResult {
        let chunk = Chunk::new(
            text.to_string(),
            ChunkMetadata::new("B0042", name, None, "catalog.json"),
        );
        SearchResult::new(chunk, 0.1)
    }

    #[test]
    fn test_prompt_includes_question_and_context_entries() {
        let results = vec![
            result("Garmin watch", "Warranty: 1 year"),
            result("Citizen watch", "Warranty: 2 years"),
        ];

        let prompt = build_prompt("What is the warranty?", &results);

        assert!(prompt.contains("What is the warranty?"));
        assert!(prompt.contains("- Garmin watch (ASIN: B0042)"));
        assert!(prompt.contains("Warranty: 2 years"));
        assert!(prompt.contains("Rules:"));
    }

    #[test]
    fn test_prompt_without_results_says_so() {
        let prompt = build_prompt("anything", &[]);
        assert!(prompt.contains("No context retrieved."));
    }
}
