//! Sentence-level chunking for the TTS adapter.

/// Split `text` at `.` terminators, keeping the terminator on its chunk.
/// Empty chunks and chunks under 3 characters are dropped — word-level and
/// comma splitting were abandoned because long sentences stay intelligible
/// and per-sentence grain matches the caption unstick rules.
pub fn chunk_text(text: &str, min_chunk_length: usize) -> Vec<String> {
    let mut chunks = Vec::new();
    let mut current = String::new();
    for c in text.chars() {
        current.push(c);
        if c == '.' {
            chunks.push(std::mem::take(&mut current));
        }
    }
    if !current.trim().is_empty() {
        chunks.push(current);
    }

    chunks
        .into_iter()
        .map(|c| c.trim().to_string())
        .filter(|c| c.chars().count() >= min_chunk_length.max(3))
        .collect()
}

/// Cumulative character offset of chunks `[0..k)`, used to anchor each
/// chunk's progress reporting.
pub fn cumulative_offsets(chunks: &[String]) -> Vec<usize> {
    let mut offsets = Vec::with_capacity(chunks.len());
    let mut total = 0usize;
    for chunk in chunks {
        offsets.push(total);
        total += chunk.chars().count();
    }
    offsets
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn splits_on_sentence_terminators() {
        let chunks = chunk_text("First sentence. Second sentence. Ok.", 3);
        assert_eq!(chunks, vec!["First sentence.", "Second sentence.", "Ok."]);
    }

    #[test]
    fn drops_short_chunks() {
        let chunks = chunk_text("Hi. A real sentence here.", 3);
        assert_eq!(chunks, vec!["A real sentence here."]);
    }

    #[test]
    fn keeps_trailing_text_without_terminator() {
        let chunks = chunk_text("No period at the end", 3);
        assert_eq!(chunks, vec!["No period at the end"]);
    }

    #[test]
    fn offsets_track_cumulative_length() {
        let chunks = vec!["abc".to_string(), "defgh".to_string()];
        assert_eq!(cumulative_offsets(&chunks), vec![0, 3]);
    }
}
