//! Grounding retrieval.
//!
//! Vector lookup is an external collaborator; the duel consumes it through
//! the `Retriever` trait only. The bundled `MemoryRetriever` ranks chunks by
//! lexical keyword overlap, which is enough to ground offline duels and
//! tests without an embedding model.

use std::collections::HashSet;
use std::sync::Arc;

use async_trait::async_trait;
use dashmap::DashMap;
use tracing::{debug, warn};

const MIN_KEYWORD_LEN: usize = 3;
const MAX_KEYWORDS: usize = 32;

/// A grounding snippet returned by retrieval, best match first.
#[derive(Debug, Clone)]
pub struct RetrievedSnippet {
    pub text: String,
    pub score: f32,
    pub source: Option<String>,
}

/// A chunk of source material handed to `Retriever::ingest`.
#[derive(Debug, Clone)]
pub struct IngestDocument {
    pub id: String,
    pub text: String,
    pub source: Option<String>,
}

/// Read side is called once per turn plus once for scoring; ingestion
/// happens before the session starts. Implementations must be safe to share
/// across concurrently running sessions.
#[async_trait]
pub trait Retriever: Send + Sync {
    async fn retrieve(&self, query: &str, limit: usize) -> anyhow::Result<Vec<RetrievedSnippet>>;

    async fn ingest(&self, docs: Vec<IngestDocument>) -> anyhow::Result<()>;
}

pub type DynRetriever = Arc<dyn Retriever>;

struct StoredChunk {
    text: String,
    source: Option<String>,
    keywords: Vec<String>,
}

/// In-memory lexical retriever. Ranks every stored chunk by query keyword
/// overlap, so poorly matching chunks still surface when nothing better
/// exists, the way a nearest-neighbour index behaves.
pub struct MemoryRetriever {
    store: DashMap<String, StoredChunk>,
}

impl MemoryRetriever {
    pub fn new() -> Self {
        Self {
            store: DashMap::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.store.is_empty()
    }

    pub fn len(&self) -> usize {
        self.store.len()
    }
}

impl Default for MemoryRetriever {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Retriever for MemoryRetriever {
    async fn retrieve(&self, query: &str, limit: usize) -> anyhow::Result<Vec<RetrievedSnippet>> {
        if self.store.is_empty() {
            warn!("no documents ingested; retrieval returned nothing");
            return Ok(Vec::new());
        }

        let query_tokens: HashSet<String> = tokenize(query).into_iter().collect();

        let mut ranked: Vec<(String, RetrievedSnippet)> = self
            .store
            .iter()
            .map(|entry| {
                let chunk = entry.value();
                let snippet = RetrievedSnippet {
                    text: chunk.text.clone(),
                    score: overlap_score(&query_tokens, &chunk.keywords),
                    source: chunk.source.clone(),
                };
                (entry.key().clone(), snippet)
            })
            .collect();

        // score descending, id ascending so ties are stable across runs
        ranked.sort_by(|a, b| {
            b.1.score
                .partial_cmp(&a.1.score)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.0.cmp(&b.0))
        });
        ranked.truncate(limit);

        Ok(ranked.into_iter().map(|(_, snippet)| snippet).collect())
    }

    async fn ingest(&self, docs: Vec<IngestDocument>) -> anyhow::Result<()> {
        if docs.is_empty() {
            return Ok(());
        }

        let count = docs.len();
        for doc in docs {
            let keywords = tokenize(&doc.text);
            self.store.insert(
                doc.id,
                StoredChunk {
                    text: doc.text,
                    source: doc.source,
                    keywords,
                },
            );
        }
        debug!(count, total = self.store.len(), "ingested document chunks");
        Ok(())
    }
}

fn tokenize(text: &str) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut keywords = Vec::new();

    for token in text.split(|c: char| !c.is_alphanumeric()) {
        let token = token.trim().to_lowercase();
        if token.len() < MIN_KEYWORD_LEN {
            continue;
        }
        if seen.insert(token.clone()) {
            keywords.push(token);
        }
        if keywords.len() >= MAX_KEYWORDS {
            break;
        }
    }

    keywords
}

fn overlap_score(query_tokens: &HashSet<String>, doc_keywords: &[String]) -> f32 {
    if query_tokens.is_empty() || doc_keywords.is_empty() {
        return 0.0;
    }

    let overlap = doc_keywords
        .iter()
        .filter(|kw| query_tokens.contains(kw.as_str()))
        .count();

    if overlap == 0 {
        0.0
    } else {
        overlap as f32 / query_tokens.len() as f32
    }
}

/// Split plain text into word-boundary chunks of at most `size` characters,
/// with consecutive chunks sharing roughly `overlap` characters. Words longer
/// than `size` become their own chunk rather than being split mid-word.
pub fn chunk_text(text: &str, size: usize, overlap: usize) -> Vec<String> {
    let words: Vec<&str> = text.split_whitespace().collect();
    if words.is_empty() {
        return Vec::new();
    }
    let size = size.max(1);
    let overlap = overlap.min(size.saturating_sub(1));

    let mut chunks = Vec::new();
    let mut start = 0usize;
    while start < words.len() {
        let mut end = start;
        let mut len = 0usize;
        while end < words.len() {
            let add = words[end].len() + usize::from(len > 0);
            if len > 0 && len + add > size {
                break;
            }
            len += add;
            end += 1;
        }
        chunks.push(words[start..end].join(" "));
        if end >= words.len() {
            break;
        }

        // back up whole words until roughly `overlap` characters are covered
        let mut back = 0usize;
        let mut covered = 0usize;
        while back + 1 < end - start {
            let word_len = words[end - 1 - back].len() + 1;
            if covered + word_len > overlap {
                break;
            }
            covered += word_len;
            back += 1;
        }
        start = end - back;
    }
    chunks
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tokenize_deduplicates_keywords() {
        let tokens = tokenize("Kelp forests shelter kelp crabs, kelp!");
        assert!(tokens.contains(&"kelp".to_string()));
        assert!(tokens.contains(&"forests".to_string()));
        assert_eq!(tokens.len(), tokens.iter().collect::<HashSet<_>>().len());
        assert!(tokens.iter().all(|token| token.len() >= MIN_KEYWORD_LEN));
    }

    #[test]
    fn overlap_score_returns_overlap_ratio() {
        let query_tokens = HashSet::from([String::from("ocean"), String::from("trench")]);
        let score = overlap_score(
            &query_tokens,
            &[String::from("ocean"), String::from("floor")],
        );
        assert!(score > 0.0);

        let zero = overlap_score(&query_tokens, &[String::from("desert")]);
        assert_eq!(zero, 0.0);
    }

    #[tokio::test]
    async fn retrieve_ranks_by_overlap_and_respects_limit() {
        let retriever = MemoryRetriever::new();
        retriever
            .ingest(vec![
                IngestDocument {
                    id: "1".into(),
                    text: "The abyssal trench holds hydrothermal vents".into(),
                    source: None,
                },
                IngestDocument {
                    id: "2".into(),
                    text: "Meadow grass sways under summer wind".into(),
                    source: None,
                },
                IngestDocument {
                    id: "3".into(),
                    text: "Vents in the trench feed tube worms".into(),
                    source: None,
                },
            ])
            .await
            .unwrap();

        let hits = retriever
            .retrieve("hydrothermal vents of the trench", 2)
            .await
            .unwrap();
        assert_eq!(hits.len(), 2);
        assert!(hits[0].score >= hits[1].score);
        assert!(hits[0].text.contains("trench"));
        assert!(hits.iter().all(|hit| !hit.text.contains("Meadow")));
    }

    #[tokio::test]
    async fn empty_store_retrieves_nothing() {
        let retriever = MemoryRetriever::new();
        let hits = retriever.retrieve("anything", 3).await.unwrap();
        assert!(hits.is_empty());
    }

    #[tokio::test]
    async fn reingesting_an_id_replaces_the_chunk() {
        let retriever = MemoryRetriever::new();
        retriever
            .ingest(vec![IngestDocument {
                id: "1".into(),
                text: "first version".into(),
                source: None,
            }])
            .await
            .unwrap();
        retriever
            .ingest(vec![IngestDocument {
                id: "1".into(),
                text: "second version".into(),
                source: None,
            }])
            .await
            .unwrap();
        assert_eq!(retriever.len(), 1);
        let hits = retriever.retrieve("version", 5).await.unwrap();
        assert_eq!(hits[0].text, "second version");
    }

    #[test]
    fn chunks_respect_size_and_overlap() {
        let text = "alpha beta gamma delta epsilon zeta eta theta iota kappa";
        let chunks = chunk_text(text, 24, 10);
        assert!(chunks.len() > 1);
        assert!(chunks.iter().all(|chunk| chunk.len() <= 24));

        // consecutive chunks share their boundary words
        for pair in chunks.windows(2) {
            let last_word = pair[0].split_whitespace().last().unwrap();
            assert!(pair[1].contains(last_word));
        }

        // every word survives chunking
        let joined = chunks.join(" ");
        for word in text.split_whitespace() {
            assert!(joined.contains(word));
        }
    }

    #[test]
    fn chunking_handles_degenerate_inputs() {
        assert!(chunk_text("", 500, 50).is_empty());
        assert!(chunk_text("   \n\t  ", 500, 50).is_empty());

        let long_word = "a".repeat(40);
        let chunks = chunk_text(&long_word, 10, 5);
        assert_eq!(chunks, vec![long_word]);

        // overlap >= size still terminates
        let chunks = chunk_text("one two three four five six", 8, 100);
        assert!(!chunks.is_empty());
    }
}
