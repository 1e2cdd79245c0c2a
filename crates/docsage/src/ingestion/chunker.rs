//! Word-window chunking with page attribution
//!
//! Splits page-attributed text into overlapping windows of roughly
//! `target_tokens` whitespace-separated words. Each chunk records the page
//! range its words came from so citations can point back at the right
//! pages.

/// One chunk of text before it is tied to a document id
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChunkDraft {
    /// Chunk text (words joined by single spaces)
    pub text: String,
    /// First page a word in this chunk came from (1-indexed)
    pub page_start: u32,
    /// Last page a word in this chunk came from (1-indexed)
    pub page_end: u32,
    /// Ordinal position within the document
    pub position: u32,
}

/// Split page-attributed text into overlapping word windows.
///
/// The step between windows is `target_tokens - overlap_tokens` (minimum 1),
/// so consecutive chunks share `overlap_tokens` words of context. An empty
/// input yields an empty vec; input shorter than one window yields exactly
/// one chunk spanning its full page range. Output order follows input order.
pub fn chunk_pages(
    pages: &[(u32, String)],
    target_tokens: usize,
    overlap_tokens: usize,
) -> Vec<ChunkDraft> {
    let target = target_tokens.max(1);
    let overlap = overlap_tokens.min(target - 1);
    let step = (target - overlap).max(1);

    // Flatten pages into one word stream, remembering each word's page.
    let mut words: Vec<(&str, u32)> = Vec::new();
    for (page_number, text) in pages {
        for word in text.split_whitespace() {
            words.push((word, *page_number));
        }
    }

    if words.is_empty() {
        return Vec::new();
    }

    let mut chunks = Vec::new();
    let mut start = 0usize;
    let mut position = 0u32;

    loop {
        let end = (start + target).min(words.len());
        let window = &words[start..end];

        let text = window
            .iter()
            .map(|(word, _)| *word)
            .collect::<Vec<_>>()
            .join(" ");

        chunks.push(ChunkDraft {
            text,
            page_start: window.first().map(|(_, p)| *p).unwrap_or(1),
            page_end: window.last().map(|(_, p)| *p).unwrap_or(1),
            position,
        });
        position += 1;

        if end == words.len() {
            break;
        }
        start += step;
    }

    chunks
}
