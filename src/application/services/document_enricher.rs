use std::sync::Arc;
use std::time::Duration;

use crate::application::ports::text_generator::{ChatMessage, TextGenerator};
use crate::domain::value_objects::Category;

const EXCERPT_CHARS: usize = 1000;

#[derive(Debug, Clone, PartialEq)]
pub struct DocumentInsights {
    pub summary: Option<String>,
    pub category: Category,
}

impl DocumentInsights {
    pub fn unavailable() -> Self {
        Self {
            summary: None,
            category: Category::Unclear,
        }
    }
}

/// Asks the text generator for a one-sentence summary and a category.
/// Never fails: each call degrades to its default on its own.
pub struct DocumentEnricher {
    text_generator: Arc<dyn TextGenerator>,
    call_timeout: Duration,
}

impl DocumentEnricher {
    pub fn new(text_generator: Arc<dyn TextGenerator>, call_timeout: Duration) -> Self {
        Self {
            text_generator,
            call_timeout,
        }
    }

    pub async fn enrich(&self, text: &str) -> DocumentInsights {
        let excerpt: String = text.chars().take(EXCERPT_CHARS).collect();
        if excerpt.trim().is_empty() {
            return DocumentInsights::unavailable();
        }

        let summary = self.summarize(&excerpt).await;
        let category = self.categorize(&excerpt).await;

        DocumentInsights { summary, category }
    }

    async fn summarize(&self, excerpt: &str) -> Option<String> {
        let messages = [
            ChatMessage::system("You are an assistant for accountants."),
            ChatMessage::user(format!(
                "Summarize the following document in one sentence.\n\nDocument content:\n\"\"\"{}\"\"\"",
                excerpt
            )),
        ];

        match self.complete(&messages).await {
            Some(reply) => {
                let sentence = reply.trim();
                if sentence.is_empty() {
                    None
                } else {
                    Some(sentence.to_string())
                }
            }
            None => None,
        }
    }

    async fn categorize(&self, excerpt: &str) -> Category {
        let options: Vec<&str> = Category::ALL.iter().map(|c| c.as_str()).collect();
        let messages = [ChatMessage::user(format!(
            "You are an AI assistant for accountants. Categorize the following document into one of these categories:\n- {}\n\nRespond ONLY with the category name.\n\nDocument content:\n\"\"\"{}\"\"\"",
            options.join("\n- "),
            excerpt
        ))];

        self.complete(&messages)
            .await
            .map(|label| Category::from_label(&label))
            .unwrap_or(Category::Unclear)
    }

    async fn complete(&self, messages: &[ChatMessage]) -> Option<String> {
        match tokio::time::timeout(self.call_timeout, self.text_generator.complete(messages)).await
        {
            Ok(Ok(reply)) => Some(reply),
            Ok(Err(e)) => {
                tracing::warn!("Document enrichment call failed: {}", e);
                None
            }
            Err(_) => {
                tracing::warn!(
                    "Document enrichment call timed out after {}s",
                    self.call_timeout.as_secs()
                );
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::FakeTextGenerator;

    #[tokio::test]
    async fn test_failures_degrade_to_defaults() {
        let enricher = DocumentEnricher::new(
            Arc::new(FakeTextGenerator::failing()),
            Duration::from_secs(1),
        );

        let insights = enricher.enrich("Salary slip for March").await;

        assert_eq!(insights, DocumentInsights::unavailable());
    }

    #[tokio::test]
    async fn test_reply_is_used_for_summary_and_category() {
        let generator = Arc::new(FakeTextGenerator::replying("Receipt."));
        let enricher = DocumentEnricher::new(generator.clone(), Duration::from_secs(1));

        let insights = enricher.enrich("Coffee 3.50 EUR").await;

        assert_eq!(insights.summary.as_deref(), Some("Receipt."));
        assert_eq!(insights.category, Category::Receipt);
        assert_eq!(generator.requests().len(), 2);
    }

    #[tokio::test]
    async fn test_only_an_excerpt_is_sent() {
        let generator = Arc::new(FakeTextGenerator::replying("tax"));
        let enricher = DocumentEnricher::new(generator.clone(), Duration::from_secs(1));
        let text = "§".repeat(5000);

        enricher.enrich(&text).await;

        for request in generator.requests() {
            let prompt = &request.last().unwrap().content;
            assert!(prompt.matches('§').count() <= EXCERPT_CHARS);
        }
    }

    #[tokio::test]
    async fn test_blank_text_skips_the_generator() {
        let generator = Arc::new(FakeTextGenerator::replying("tax"));
        let enricher = DocumentEnricher::new(generator.clone(), Duration::from_secs(1));

        let insights = enricher.enrich("   ").await;

        assert_eq!(insights, DocumentInsights::unavailable());
        assert!(generator.requests().is_empty());
    }
}
