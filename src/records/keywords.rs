//! # Keyword Extraction
//!
//! Unsupervised, single-document keyword extraction in the style of YAKE.
//! Every term is scored from local statistics only (casing, position,
//! frequency, context spread, sentence spread), then candidate phrases of one
//! to `max_ngram_size` words are scored from their terms. Lower scores are
//! better.
//!
//! ## Term score
//!
//! ```text
//! H = (T_rel * T_pos) / (T_case + T_freq / T_rel + T_sent / T_rel)
//! ```
//!
//! ## Phrase score
//!
//! ```text
//! S = prod(H) / (tf * (1 + sum(H)))
//! ```
//!
//! Stopwords contribute to neither product nor sum, and may only appear
//! inside a phrase, never at its edges.

use std::collections::{HashMap, HashSet};

use regex::Regex;

use super::error::RecordsError;

/// Common English function words
const ENGLISH_STOPWORDS: &[&str] = &[
    "a", "about", "above", "after", "again", "against", "all", "also", "am", "an", "and", "any",
    "are", "as", "at", "be", "because", "been", "before", "being", "below", "between", "both",
    "but", "by", "can", "could", "did", "do", "does", "doing", "down", "during", "each", "few",
    "for", "from", "further", "had", "has", "have", "having", "he", "her", "here", "hers",
    "herself", "him", "himself", "his", "how", "i", "if", "in", "into", "is", "it", "its",
    "itself", "just", "may", "me", "might", "more", "most", "must", "my", "myself", "no", "nor",
    "not", "now", "of", "off", "on", "once", "only", "or", "other", "our", "ours", "ourselves",
    "out", "over", "own", "same", "shall", "she", "should", "so", "some", "such", "than", "that",
    "the", "their", "theirs", "them", "themselves", "then", "there", "these", "they", "this",
    "those", "through", "to", "too", "under", "until", "up", "upon", "us", "very", "was", "we",
    "were", "what", "when", "where", "which", "while", "who", "whom", "why", "will", "with",
    "within", "without", "would", "you", "your", "yours", "yourself", "yourselves",
];

const SENTENCE_BOUNDARY: &str = r"[.!?]+(?:\s+|$)|[\r\n]+";
const TOKEN: &str = r"[\p{L}\p{N}]+(?:['’\-][\p{L}\p{N}]+)*|[^\s\p{L}\p{N}]";

/// Tuning for keyword extraction
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct KeywordConfig {
    /// Longest candidate phrase, in words
    pub max_ngram_size: usize,

    /// How many preceding words count as context
    pub window_size: usize,

    /// Number of keywords returned
    pub top: usize,

    /// Similarity above which a candidate is a duplicate of a better one
    pub dedup_threshold: f64,
}

impl Default for KeywordConfig {
    fn default() -> Self {
        Self {
            max_ngram_size: 3,
            window_size: 1,
            top: 20,
            dedup_threshold: 0.9,
        }
    }
}

/// A scored keyword phrase
#[derive(Debug, Clone, PartialEq)]
pub struct Keyword {
    /// Phrase as first written in the text
    pub phrase: String,

    /// Relevance score, lower is better
    pub score: f64,
}

#[derive(Debug, Default)]
struct TermStats {
    tf: usize,
    tf_acronym: usize,
    tf_capitalized: usize,
    sentences: Vec<usize>,
    left: HashMap<usize, usize>,
    right: HashMap<usize, usize>,
}

#[derive(Debug, Clone, Copy)]
struct Token<'a> {
    term: usize,
    surface: &'a str,
    numeric: bool,
}

#[derive(Debug)]
struct Candidate {
    surface: String,
    terms: Vec<usize>,
    tf: usize,
    first_seen: usize,
}

/// Extracts keywords from free text
#[derive(Debug)]
pub struct KeywordExtractor {
    config: KeywordConfig,
    stopwords: HashSet<String>,
    stop_phrases: HashSet<String>,
    sentence_boundary: Regex,
    token: Regex,
}

impl KeywordExtractor {
    /// Create an extractor with the built-in English stopwords plus `extra_stopwords`.
    ///
    /// Single-word extras join the stopword set; multi-word extras suppress
    /// candidate phrases equal to them. Matching is case-insensitive.
    pub fn new(config: KeywordConfig, extra_stopwords: &[String]) -> Result<Self, RecordsError> {
        let mut stopwords: HashSet<String> =
            ENGLISH_STOPWORDS.iter().map(|s| s.to_string()).collect();
        let mut stop_phrases = HashSet::new();

        for stopword in extra_stopwords {
            let normalized = stopword
                .split_whitespace()
                .collect::<Vec<_>>()
                .join(" ")
                .to_lowercase();
            if normalized.is_empty() {
                continue;
            }
            if normalized.contains(' ') {
                stop_phrases.insert(normalized);
            } else {
                stopwords.insert(normalized);
            }
        }

        Ok(Self {
            config,
            stopwords,
            stop_phrases,
            sentence_boundary: Regex::new(SENTENCE_BOUNDARY)?,
            token: Regex::new(TOKEN)?,
        })
    }

    /// The tuning this extractor was built with
    pub fn config(&self) -> &KeywordConfig {
        &self.config
    }

    fn is_stopword(&self, term: &str) -> bool {
        term.chars().count() < 3 || self.stopwords.contains(term)
    }

    /// Extract the best keywords of `text`, best first
    pub fn extract_keywords(&self, text: &str) -> Vec<Keyword> {
        let sentences: Vec<&str> = self
            .sentence_boundary
            .split(text)
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .collect();
        if sentences.is_empty() || self.config.top == 0 {
            return Vec::new();
        }

        let mut keys: Vec<String> = Vec::new();
        let mut term_ids: HashMap<String, usize> = HashMap::new();
        let mut terms: Vec<TermStats> = Vec::new();
        let mut chunks: Vec<Vec<Token>> = Vec::new();

        for (sentence_id, sentence) in sentences.iter().enumerate() {
            let mut chunk: Vec<Token> = Vec::new();
            let mut position = 0usize;

            for found in self.token.find_iter(sentence) {
                let surface = found.as_str();
                if !surface.chars().next().is_some_and(char::is_alphanumeric) {
                    // punctuation ends a chunk; phrases never span it
                    if !chunk.is_empty() {
                        chunks.push(std::mem::take(&mut chunk));
                    }
                    continue;
                }

                let key = surface.to_lowercase();
                let id = match term_ids.get(&key) {
                    Some(id) => *id,
                    None => {
                        let id = terms.len();
                        term_ids.insert(key.clone(), id);
                        keys.push(key);
                        terms.push(TermStats::default());
                        id
                    }
                };
                let numeric = !surface.chars().any(char::is_alphabetic);

                let stats = &mut terms[id];
                stats.tf += 1;
                stats.sentences.push(sentence_id);
                if is_acronym(surface) {
                    stats.tf_acronym += 1;
                } else if position > 0 && surface.chars().next().is_some_and(char::is_uppercase) {
                    stats.tf_capitalized += 1;
                }

                if !numeric {
                    let neighbors: Vec<usize> = chunk
                        .iter()
                        .rev()
                        .take(self.config.window_size)
                        .filter(|t| !t.numeric)
                        .map(|t| t.term)
                        .collect();
                    for left in neighbors {
                        *terms[id].left.entry(left).or_default() += 1;
                        *terms[left].right.entry(id).or_default() += 1;
                    }
                }

                chunk.push(Token {
                    term: id,
                    surface,
                    numeric,
                });
                position += 1;
            }

            if !chunk.is_empty() {
                chunks.push(chunk);
            }
        }

        let stop: Vec<bool> = keys.iter().map(|k| self.is_stopword(k)).collect();
        let weights = term_weights(&terms, &keys, &stop, sentences.len());
        let candidates = self.candidates(&chunks, &keys, &stop);

        let mut scored: Vec<(f64, usize, String, String)> = candidates
            .into_iter()
            .map(|(key, candidate)| {
                let mut product = 1.0;
                let mut sum = 0.0;
                for term in candidate.terms.iter().filter(|t| !stop[**t]) {
                    product *= weights[*term];
                    sum += weights[*term];
                }
                let score = product / (candidate.tf as f64 * (1.0 + sum));
                (score, candidate.first_seen, key, candidate.surface)
            })
            .collect();
        scored.sort_by(|a, b| a.0.total_cmp(&b.0).then(a.1.cmp(&b.1)));

        let mut selected: Vec<(String, Keyword)> = Vec::new();
        for (score, _, key, phrase) in scored {
            let duplicate = selected
                .iter()
                .any(|(kept, _)| similarity(kept, &key) > self.config.dedup_threshold);
            if duplicate {
                continue;
            }
            selected.push((key, Keyword { phrase, score }));
            if selected.len() == self.config.top {
                break;
            }
        }

        selected.into_iter().map(|(_, keyword)| keyword).collect()
    }

    /// Keywords of `text` as a comma-separated list, scores dropped
    pub fn keyword_list(&self, text: &str) -> String {
        self.extract_keywords(text)
            .into_iter()
            .map(|k| k.phrase)
            .collect::<Vec<_>>()
            .join(",")
    }

    fn candidates(
        &self,
        chunks: &[Vec<Token>],
        keys: &[String],
        stop: &[bool],
    ) -> HashMap<String, Candidate> {
        let mut candidates: HashMap<String, Candidate> = HashMap::new();
        let mut seen = 0usize;

        for chunk in chunks {
            for start in 0..chunk.len() {
                for size in 1..=self.config.max_ngram_size {
                    let end = start + size;
                    if end > chunk.len() {
                        break;
                    }
                    let window = &chunk[start..end];
                    if window.iter().any(|t| t.numeric)
                        || stop[window[0].term]
                        || stop[window[size - 1].term]
                    {
                        continue;
                    }

                    let key = window
                        .iter()
                        .map(|t| keys[t.term].as_str())
                        .collect::<Vec<_>>()
                        .join(" ");
                    if self.stop_phrases.contains(&key) {
                        continue;
                    }

                    seen += 1;
                    candidates
                        .entry(key)
                        .and_modify(|c| c.tf += 1)
                        .or_insert_with(|| Candidate {
                            surface: window
                                .iter()
                                .map(|t| t.surface)
                                .collect::<Vec<_>>()
                                .join(" "),
                            terms: window.iter().map(|t| t.term).collect(),
                            tf: 1,
                            first_seen: seen,
                        });
                }
            }
        }

        candidates
    }
}

fn term_weights(terms: &[TermStats], keys: &[String], stop: &[bool], sentences: usize) -> Vec<f64> {
    let valid_tfs: Vec<f64> = terms
        .iter()
        .zip(keys)
        .zip(stop)
        .filter(|((_, key), is_stop)| !**is_stop && key.chars().any(char::is_alphabetic))
        .map(|((stats, _), _)| stats.tf as f64)
        .collect();
    let mean = mean(&valid_tfs);
    let deviation = std_dev(&valid_tfs, mean);
    let max_tf = terms.iter().map(|t| t.tf).max().unwrap_or(1) as f64;

    terms
        .iter()
        .map(|stats| {
            let tf = stats.tf as f64;

            let t_case = stats.tf_acronym.max(stats.tf_capitalized) as f64 / (1.0 + tf.ln());
            let t_pos = (3.0 + median(&stats.sentences)).ln().ln();
            let t_freq = if mean + deviation > 0.0 {
                tf / (mean + deviation)
            } else {
                tf
            };
            let t_rel = 1.0 + (spread(&stats.left) + spread(&stats.right)) * tf / max_tf;
            let mut distinct = stats.sentences.clone();
            distinct.dedup();
            let t_sent = distinct.len() as f64 / sentences as f64;

            (t_rel * t_pos) / (t_case + t_freq / t_rel + t_sent / t_rel)
        })
        .collect()
}

/// Distinct neighbours per co-occurrence
fn spread(neighbors: &HashMap<usize, usize>) -> f64 {
    let total: usize = neighbors.values().sum();
    if total == 0 {
        0.0
    } else {
        neighbors.len() as f64 / total as f64
    }
}

fn is_acronym(word: &str) -> bool {
    word.chars().count() > 1
        && word.chars().any(char::is_alphabetic)
        && word.chars().all(|c| !c.is_alphabetic() || c.is_uppercase())
}

fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        0.0
    } else {
        values.iter().sum::<f64>() / values.len() as f64
    }
}

fn std_dev(values: &[f64], mean: f64) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / values.len() as f64;
    variance.sqrt()
}

/// Median of sentence ids, which are pushed in ascending order
fn median(sorted: &[usize]) -> f64 {
    match sorted.len() {
        0 => 0.0,
        n if n % 2 == 1 => sorted[n / 2] as f64,
        n => (sorted[n / 2 - 1] + sorted[n / 2]) as f64 / 2.0,
    }
}

/// Levenshtein similarity ratio in [0, 1]
fn similarity(a: &str, b: &str) -> f64 {
    strsim::normalized_levenshtein(a, b)
}
