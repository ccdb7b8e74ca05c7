//! Search result ranking and excerpts.
//!
//! Matching is case-insensitive plain substring containment over a
//! recipe's descriptive text ([`Recipe::description_text`]). Case folding
//! can change byte lengths, so matches found in the folded text are mapped
//! back onto the original before any slicing.

use crate::models::Recipe;
use std::ops::Range;

/// Default excerpt length, in characters.
pub const DEFAULT_EXCERPT_LEN: usize = 160;

/// Words of context kept on each side of a match.
const CONTEXT_WORDS: usize = 4;

const ELLIPSIS: &str = "…";

/// Lower-cased text with a map from folded byte offsets to original ones.
struct Folded {
    text: String,
    origin: Vec<usize>,
}

impl Folded {
    fn new(text: &str) -> Self {
        let mut folded = String::with_capacity(text.len());
        let mut origin = Vec::with_capacity(text.len());
        for (index, c) in text.char_indices() {
            for lower in c.to_lowercase() {
                folded.push(lower);
                origin.extend(std::iter::repeat_n(index, lower.len_utf8()));
            }
        }
        Self {
            text: folded,
            origin,
        }
    }

    /// Maps a non-empty folded range onto whole characters of `original`.
    fn original_range(&self, original: &str, folded: Range<usize>) -> Range<usize> {
        let start = self.origin[folded.start];
        let last = self.origin[folded.end - 1];
        let width = original[last..].chars().next().map_or(0, char::len_utf8);
        start..last + width
    }
}

/// Byte ranges of `text` matching `query`, ignoring case.
///
/// The query is matched as given, surrounding spaces included. Matches do
/// not overlap. An empty or whitespace-only query matches nothing.
#[must_use]
pub fn match_spans(query: &str, text: &str) -> Vec<Range<usize>> {
    if query.trim().is_empty() {
        return Vec::new();
    }
    let needle = query.to_lowercase();

    let folded = Folded::new(text);
    let mut spans = Vec::new();
    let mut from = 0;
    while let Some(offset) = folded.text[from..].find(&needle) {
        let start = from + offset;
        let end = start + needle.len();
        spans.push(folded.original_range(text, start..end));
        from = end;
    }
    spans
}

/// Total number of matched characters, or `None` if nothing matches.
#[must_use]
pub fn match_score(query: &str, text: &str) -> Option<usize> {
    let spans = match_spans(query, text);
    if spans.is_empty() {
        return None;
    }
    Some(spans.into_iter().map(|span| text[span].chars().count()).sum())
}

fn word_ranges(text: &str) -> Vec<Range<usize>> {
    let mut words = Vec::new();
    let mut start = None;
    for (index, c) in text.char_indices() {
        match (c.is_whitespace(), start) {
            (true, Some(s)) => {
                words.push(s..index);
                start = None;
            },
            (false, None) => start = Some(index),
            _ => {},
        }
    }
    if let Some(s) = start {
        words.push(s..text.len());
    }
    words
}

/// Joins tokens with spaces, stopping before the first one that would
/// push the result past `max_len` characters.
fn fit(tokens: &[&str], max_len: usize) -> String {
    let mut out = String::new();
    let mut len = 0;
    for token in tokens {
        let extra = token.chars().count() + usize::from(!out.is_empty());
        if len + extra > max_len {
            break;
        }
        if !out.is_empty() {
            out.push(' ');
        }
        out.push_str(token);
        len += extra;
    }
    out
}

/// Joins `words[lo..=hi]`, marking words cut on either side with an ellipsis.
fn window_text(words: &[&str], lo: usize, hi: usize) -> String {
    let mut tokens = Vec::with_capacity(hi - lo + 3);
    if lo > 0 {
        tokens.push(ELLIPSIS);
    }
    tokens.extend_from_slice(&words[lo..=hi]);
    if hi + 1 < words.len() {
        tokens.push(ELLIPSIS);
    }
    tokens.join(" ")
}

/// Grows a window outwards from the matched words `first..=last`, one word
/// per side at a time, while it still fits in `max_len` characters.
fn centered(words: &[&str], first: usize, last: usize, max_len: usize) -> String {
    let floor = first.saturating_sub(CONTEXT_WORDS);
    let ceiling = (last + CONTEXT_WORDS).min(words.len() - 1);
    let fits = |lo: usize, hi: usize| window_text(words, lo, hi).chars().count() <= max_len;

    if !fits(first, last) {
        return fit(&words[first..=last], max_len);
    }
    let (mut lo, mut hi) = (first, last);
    loop {
        let mut grew = false;
        if lo > floor && fits(lo - 1, hi) {
            lo -= 1;
            grew = true;
        }
        if hi < ceiling && fits(lo, hi + 1) {
            hi += 1;
            grew = true;
        }
        if !grew {
            return window_text(words, lo, hi);
        }
    }
}

/// Builds an excerpt of `text` around the matches of `query`.
///
/// Each match is widened to whole words plus a few words of context;
/// overlapping windows merge and gaps are marked with an ellipsis. If that
/// does not fit in `max_len` characters, the excerpt narrows to the first
/// match, shedding context from both sides before the matched words. With
/// no match the excerpt is the leading words of `text`.
#[must_use]
pub fn excerpt(query: &str, text: &str, max_len: usize) -> String {
    let ranges = word_ranges(text);
    let words: Vec<&str> = ranges.iter().map(|w| &text[w.clone()]).collect();
    let spans = match_spans(query, text);
    if spans.is_empty() || words.is_empty() {
        return fit(&words, max_len);
    }

    let hits: Vec<(usize, usize)> = spans
        .iter()
        .map(|span| {
            let first = ranges.iter().position(|w| w.end > span.start).unwrap_or(0);
            let last = ranges
                .iter()
                .rposition(|w| w.start < span.end)
                .unwrap_or(first)
                .max(first);
            (first, last)
        })
        .collect();

    let mut windows: Vec<(usize, usize)> = Vec::new();
    for &(first, last) in &hits {
        let window = (
            first.saturating_sub(CONTEXT_WORDS),
            (last + CONTEXT_WORDS).min(words.len() - 1),
        );
        match windows.last_mut() {
            Some(previous) if window.0 <= previous.1 + 1 => previous.1 = previous.1.max(window.1),
            _ => windows.push(window),
        }
    }

    let mut tokens = Vec::new();
    for &(first, last) in &windows {
        if first > 0 {
            tokens.push(ELLIPSIS);
        }
        tokens.extend_from_slice(&words[first..=last]);
    }
    if windows.last().is_some_and(|&(_, last)| last + 1 < words.len()) {
        tokens.push(ELLIPSIS);
    }
    let full = tokens.join(" ");
    if full.chars().count() <= max_len {
        return full;
    }

    let (first, last) = hits[0];
    centered(&words, first, last, max_len)
}

/// A recipe with its match score and excerpt.
#[derive(Debug, Clone, PartialEq)]
pub struct RankedRecipe {
    /// The matched recipe.
    pub recipe: Recipe,
    /// Matched characters in the description; `None` if nothing matched.
    pub score: Option<usize>,
    /// Excerpt around the matches.
    pub excerpt: String,
}

/// Orders recipes by match score, best first.
///
/// Recipes without a match sort last; ties keep their input order.
#[must_use]
pub fn rank(query: &str, recipes: Vec<Recipe>, max_len: usize) -> Vec<RankedRecipe> {
    let mut ranked: Vec<RankedRecipe> = recipes
        .into_iter()
        .map(|recipe| {
            let text = recipe.description_text();
            RankedRecipe {
                score: match_score(query, &text),
                excerpt: excerpt(query, &text, max_len),
                recipe,
            }
        })
        .collect();
    ranked.sort_by(|a, b| b.score.cmp(&a.score));
    ranked
}
