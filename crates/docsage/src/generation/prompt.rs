//! Prompt templates for grounded answer generation

use crate::retrieval::Passage;

use super::HistoryTurns;

/// Builds prompts for the hosted generator
pub struct PromptBuilder;

impl PromptBuilder {
    /// System instructions: answer only from the context, cite with markers
    pub fn system_prompt() -> &'static str {
        "You are a document-grounded assistant. Answer using ONLY the numbered \
         context passages provided. Cite every claim with the matching passage \
         marker, e.g. [1] or [2]. If the context does not contain the answer, \
         say you don't know based on the provided documents. Never cite a \
         passage number that was not provided."
    }

    /// Numbered context block from retrieved passages
    pub fn build_context(passages: &[Passage]) -> String {
        let mut context = String::new();
        for (i, passage) in passages.iter().enumerate() {
            let p = &passage.payload;
            let pages = if p.page_start == p.page_end {
                format!("p{}", p.page_start)
            } else {
                format!("p{}-{}", p.page_start, p.page_end)
            };
            context.push_str(&format!(
                "[{}] {} {} | {}\n{}\n\n",
                i + 1,
                p.filename,
                pages,
                p.chunk_id,
                p.text
            ));
        }
        context
    }

    /// Full user prompt with optional conversation history, oldest first
    pub fn build_user_prompt(
        question: &str,
        passages: &[Passage],
        history: &HistoryTurns,
    ) -> String {
        let mut prompt = String::new();

        if !history.is_empty() {
            prompt.push_str("Previous conversation:\n");
            for (q, a) in history {
                prompt.push_str(&format!("USER: {}\nASSISTANT: {}\n", q, a));
            }
            prompt.push('\n');
        }

        prompt.push_str("Context:\n");
        prompt.push_str(&Self::build_context(passages));
        prompt.push_str(&format!("Question: {}", question));
        prompt
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::ChunkPayload;
    use uuid::Uuid;

    fn passage(text: &str, page_start: u32, page_end: u32) -> Passage {
        Passage {
            payload: ChunkPayload {
                chunk_id: "doc-0".to_string(),
                document_id: Uuid::new_v4(),
                filename: "guide.pdf".to_string(),
                page_start,
                page_end,
                position: 0,
                text: text.to_string(),
            },
            similarity: 0.9,
            rerank_score: None,
        }
    }

    #[test]
    fn context_numbers_passages_with_page_ranges() {
        let passages = vec![passage("first text", 1, 1), passage("second text", 2, 4)];
        let context = PromptBuilder::build_context(&passages);
        assert!(context.contains("[1] guide.pdf p1"));
        assert!(context.contains("[2] guide.pdf p2-4"));
        assert!(context.contains("first text"));
    }

    #[test]
    fn history_precedes_context_oldest_first() {
        let passages = vec![passage("ctx", 1, 1)];
        let history = vec![
            ("first question".to_string(), "first answer".to_string()),
            ("second question".to_string(), "second answer".to_string()),
        ];
        let prompt = PromptBuilder::build_user_prompt("third question", &passages, &history);

        let first = prompt.find("first question").unwrap();
        let second = prompt.find("second question").unwrap();
        let ctx = prompt.find("Context:").unwrap();
        assert!(first < second && second < ctx);
        assert!(prompt.ends_with("Question: third question"));
    }
}
