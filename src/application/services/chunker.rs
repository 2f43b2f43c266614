pub const DEFAULT_CHUNK_SIZE: usize = 500;

/// Splits text into contiguous, non-overlapping segments of `chunk_size`
/// characters. The last segment may be shorter and concatenating the
/// segments gives back the input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Chunker {
    chunk_size: usize,
}

impl Chunker {
    pub fn new(chunk_size: usize) -> Result<Self, String> {
        if chunk_size == 0 {
            return Err("Chunk size must be greater than zero".to_string());
        }
        Ok(Self { chunk_size })
    }

    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    pub fn chunk(&self, text: &str) -> Vec<String> {
        chunk_text(text, self.chunk_size)
    }
}

impl Default for Chunker {
    fn default() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
        }
    }
}

/// Sizes are counted in `char`s so a segment boundary never falls inside a
/// UTF-8 sequence.
pub fn chunk_text(text: &str, chunk_size: usize) -> Vec<String> {
    if text.is_empty() || chunk_size == 0 {
        return Vec::new();
    }

    let mut chunks = Vec::with_capacity(text.len() / chunk_size + 1);
    let mut start = 0;
    let mut count = 0;

    for (offset, _) in text.char_indices() {
        if count == chunk_size {
            chunks.push(text[start..offset].to_string());
            start = offset;
            count = 0;
        }
        count += 1;
    }
    chunks.push(text[start..].to_string());

    chunks
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_text_has_no_chunks() {
        assert!(chunk_text("", 500).is_empty());
        assert!(Chunker::default().chunk("").is_empty());
    }

    #[test]
    fn test_1234_characters_split_500_500_234() {
        let text = "a".repeat(1234);
        let chunks = Chunker::default().chunk(&text);

        let lengths: Vec<usize> = chunks.iter().map(|c| c.chars().count()).collect();
        assert_eq!(lengths, vec![500, 500, 234]);
    }

    #[test]
    fn test_exact_multiple_has_no_trailing_empty_chunk() {
        let text = "b".repeat(1000);
        let chunks = chunk_text(&text, 500);
        assert_eq!(chunks.len(), 2);
        assert!(chunks.iter().all(|c| c.len() == 500));
    }

    #[test]
    fn test_short_text_is_one_chunk() {
        assert_eq!(chunk_text("Short text", 100), vec!["Short text".to_string()]);
    }

    #[test]
    fn test_concatenation_restores_input() {
        let samples = [
            "This is a very long sentence that should be split into multiple chunks.",
            "Line one\n\nLine two\n\n\tTabbed line three",
            "Ümlaut € and emoji 🧾 receipts mixed with ASCII",
            "x",
        ];

        for text in samples {
            for size in [1, 2, 3, 7, 16, 500] {
                let chunks = chunk_text(text, size);
                assert_eq!(chunks.concat(), text, "size {size}");
                assert!(chunks.iter().all(|c| c.chars().count() <= size));
                assert!(
                    chunks[..chunks.len() - 1]
                        .iter()
                        .all(|c| c.chars().count() == size)
                );
            }
        }
    }

    #[test]
    fn test_multibyte_characters_count_once() {
        let text = "€€€€€";
        let chunks = chunk_text(text, 2);
        assert_eq!(chunks, vec!["€€", "€€", "€"]);
    }

    #[test]
    fn test_chunking_is_deterministic() {
        let text = "deterministic ".repeat(100);
        assert_eq!(chunk_text(&text, 37), chunk_text(&text, 37));
    }

    #[test]
    fn test_zero_chunk_size_is_rejected() {
        assert!(Chunker::new(0).is_err());
        assert_eq!(Chunker::new(250).unwrap().chunk_size(), 250);
    }
}
