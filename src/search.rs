use crate::data_models::{Post, SearchResult};

/// Normalized match-score cutoff, 0 = exact. Looser matches than this
/// are excluded. Mirrors the tolerance the site's search box had.
const SCORE_THRESHOLD: f64 = 0.3;

/// One corpus post, pre-tokenized over its searchable fields
/// {title, author label, category label, description, content} and
/// paired with its display projection.
struct IndexedPost {
    result: SearchResult,
    words: Vec<String>,
}

/// In-memory fuzzy index over a loaded corpus. Built once per worker
/// session and read-only afterwards.
pub struct SearchEngine {
    entries: Vec<IndexedPost>,
}

impl SearchEngine {
    pub fn build(posts: Vec<Post>) -> SearchEngine {
        let entries = posts
            .iter()
            .map(|post| IndexedPost {
                result: SearchResult::from(post),
                words: index_words(post),
            })
            .collect();

        SearchEngine { entries }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Rank the corpus against a term: best match first, ties keep
    /// corpus order, posts looser than the cutoff excluded. The content
    /// field is searched but never returned.
    pub fn query(&self, term: &str) -> Vec<SearchResult> {
        let tokens = tokenize(term);
        if tokens.is_empty() {
            return Vec::new();
        }

        let mut scored: Vec<(f64, &SearchResult)> = Vec::new();
        for entry in &self.entries {
            if let Some(score) = score_post(&entry.words, &tokens) {
                scored.push((score, &entry.result));
            }
        }

        // Stable sort: equal scores keep corpus order
        scored.sort_by(|a, b| a.0.total_cmp(&b.0));
        scored.into_iter().map(|(_, result)| result.clone()).collect()
    }
}

fn tokenize(text: &str) -> Vec<String> {
    text.to_lowercase()
        .split(|c: char| !c.is_alphanumeric())
        .filter(|word| !word.is_empty())
        .map(str::to_string)
        .collect()
}

fn index_words(post: &Post) -> Vec<String> {
    let fields = [
        post.title.as_str(),
        post.author.label(),
        post.category.label(),
        post.description.as_str(),
        post.content.as_str(),
    ];

    let mut words = Vec::new();
    for field in fields {
        words.extend(tokenize(field));
    }
    words
}

/// Distance of a query token to one indexed word, normalized to
/// [0, 1] with 0 = exact. Containment either way counts as exact so
/// that prefixes and short terms behave like substring search.
fn word_distance(token: &str, word: &str) -> f64 {
    if word.contains(token) || token.contains(word) {
        return 0.0;
    }
    1.0 - strsim::jaro_winkler(token, word)
}

fn best_distance(words: &[String], token: &str) -> f64 {
    words
        .iter()
        .map(|word| word_distance(token, word))
        .fold(1.0, f64::min)
}

/// Score a post against the query tokens: the mean of each token's
/// best distance over the post's words. Every token must land under
/// the cutoff somewhere, or the post is out.
fn score_post(words: &[String], tokens: &[String]) -> Option<f64> {
    let mut total = 0.0;
    for token in tokens {
        let distance = best_distance(words, token);
        if distance > SCORE_THRESHOLD {
            return None;
        }
        total += distance;
    }
    Some(total / tokens.len() as f64)
}
