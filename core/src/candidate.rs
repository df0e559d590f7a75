//! Candidate types: a scored suggestion with its source, and the paginated
//! list with cursor navigation shown as the lookup table.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::ops::Range;

/// Where a candidate came from. Order is the tie-breaking priority:
/// earlier sources win on equal scores and on merge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum CandidateSource {
    UserDb,
    Dictionary,
    Spellcheck,
    Emoji,
    Related,
    ComposeCompletion,
}

impl CandidateSource {
    /// Lower is better.
    pub fn priority(self) -> u8 {
        self as u8
    }

    pub fn label(self) -> &'static str {
        match self {
            CandidateSource::UserDb => "user",
            CandidateSource::Dictionary => "dict",
            CandidateSource::Spellcheck => "spell",
            CandidateSource::Emoji => "emoji",
            CandidateSource::Related => "related",
            CandidateSource::ComposeCompletion => "compose",
        }
    }
}

/// A single suggestion with an associated score. Scores are on a relative
/// scale; higher is better.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Candidate {
    pub text: String,
    pub source: CandidateSource,
    pub score: f64,
    /// Optional short annotation shown next to the candidate: a code
    /// point, a language tag, a remaining compose sequence.
    pub annotation: Option<String>,
}

impl Candidate {
    pub fn new<T: Into<String>>(text: T, source: CandidateSource, score: f64) -> Self {
        Candidate {
            text: text.into(),
            source,
            score,
            annotation: None,
        }
    }

    pub fn with_annotation<T: Into<String>>(mut self, annotation: T) -> Self {
        self.annotation = Some(annotation.into());
        self
    }
}

/// Merge candidates so that no two entries share (text, source) and no two
/// entries share a text: the highest score wins, and among equal-score
/// duplicates the better-priority source. The result is sorted by score
/// descending, then source priority, then text.
pub fn merge_and_rank(candidates: Vec<Candidate>) -> Vec<Candidate> {
    let mut by_text: HashMap<String, Candidate> = HashMap::new();
    for candidate in candidates {
        match by_text.get_mut(&candidate.text) {
            None => {
                by_text.insert(candidate.text.clone(), candidate);
            }
            Some(existing) => {
                let better_score = candidate.score > existing.score;
                let equal_score = candidate.score == existing.score;
                let better_source = candidate.source.priority() < existing.source.priority();
                if better_score || (equal_score && better_source) {
                    // Keep the richer annotation if the winner has none.
                    let annotation = candidate
                        .annotation
                        .clone()
                        .or_else(|| existing.annotation.clone());
                    *existing = candidate;
                    existing.annotation = annotation;
                } else if existing.source.priority() > candidate.source.priority() {
                    // Same text, worse score, better source: remember the
                    // source ranking only.
                    existing.source = existing.source.min(candidate.source);
                }
            }
        }
    }
    let mut out: Vec<Candidate> = by_text.into_values().collect();
    out.sort_by(|a, b| {
        b.score
            .partial_cmp(&a.score)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| a.source.priority().cmp(&b.source.priority()))
            .then_with(|| a.text.cmp(&b.text))
    });
    out
}

/// A paginated list of candidates with cursor navigation.
#[derive(Debug, Clone)]
pub struct CandidateList {
    candidates: Vec<Candidate>,
    page_size: usize,
    current_page: usize,
    cursor: usize,
    /// Whether the cursor marks a real selection (auto-select / navigated)
    /// or is merely the insertion point for paging.
    selected: bool,
}

impl CandidateList {
    pub fn new() -> Self {
        Self::with_page_size(6)
    }

    pub fn with_page_size(page_size: usize) -> Self {
        CandidateList {
            candidates: Vec::new(),
            page_size: page_size.max(1),
            current_page: 0,
            cursor: 0,
            selected: false,
        }
    }

    pub fn set_page_size(&mut self, page_size: usize) {
        self.page_size = page_size.max(1);
        self.current_page = 0;
        self.cursor = 0;
    }

    pub fn page_size(&self) -> usize {
        self.page_size
    }

    /// Replace the candidates, resetting pagination and selection.
    pub fn set_candidates(&mut self, candidates: Vec<Candidate>) {
        self.candidates = candidates;
        self.current_page = 0;
        self.cursor = 0;
        self.selected = false;
    }

    pub fn candidates(&self) -> &[Candidate] {
        &self.candidates
    }

    pub fn len(&self) -> usize {
        self.candidates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.candidates.is_empty()
    }

    pub fn num_pages(&self) -> usize {
        if self.candidates.is_empty() {
            0
        } else {
            self.candidates.len().div_ceil(self.page_size)
        }
    }

    pub fn current_page(&self) -> usize {
        self.current_page
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn is_selected(&self) -> bool {
        self.selected
    }

    /// Mark the current cursor position as a real selection.
    pub fn select_current(&mut self) {
        if !self.candidates.is_empty() {
            self.selected = true;
        }
    }

    pub fn deselect(&mut self) {
        self.selected = false;
    }

    fn current_page_range(&self) -> Range<usize> {
        let start = self.current_page * self.page_size;
        let end = (start + self.page_size).min(self.candidates.len());
        start..end
    }

    fn current_page_len(&self) -> usize {
        self.current_page_range().len()
    }

    pub fn current_page_candidates(&self) -> &[Candidate] {
        if self.candidates.is_empty() {
            return &[];
        }
        &self.candidates[self.current_page_range()]
    }

    /// The candidate under the cursor, if a real selection exists.
    pub fn selected_candidate(&self) -> Option<&Candidate> {
        if !self.selected {
            return None;
        }
        self.current_page_candidates().get(self.cursor)
    }

    /// The candidate at a 1-based index on the current page (digit commit).
    pub fn candidate_on_page(&self, one_based: usize) -> Option<&Candidate> {
        if one_based == 0 {
            return None;
        }
        self.current_page_candidates().get(one_based - 1)
    }

    /// Move the selection forward, wrapping to the next page at the end.
    pub fn select_next(&mut self) {
        if self.candidates.is_empty() {
            return;
        }
        if !self.selected {
            self.selected = true;
            return;
        }
        if self.cursor + 1 < self.current_page_len() {
            self.cursor += 1;
        } else if self.current_page + 1 < self.num_pages() {
            self.current_page += 1;
            self.cursor = 0;
        } else {
            self.current_page = 0;
            self.cursor = 0;
        }
    }

    /// Move the selection backward, wrapping to the previous page.
    pub fn select_previous(&mut self) {
        if self.candidates.is_empty() {
            return;
        }
        if !self.selected {
            self.selected = true;
            self.current_page = self.num_pages() - 1;
            self.cursor = self.current_page_len().saturating_sub(1);
            return;
        }
        if self.cursor > 0 {
            self.cursor -= 1;
        } else if self.current_page > 0 {
            self.current_page -= 1;
            self.cursor = self.current_page_len().saturating_sub(1);
        } else {
            self.current_page = self.num_pages() - 1;
            self.cursor = self.current_page_len().saturating_sub(1);
        }
    }

    pub fn page_up(&mut self) -> bool {
        if self.current_page > 0 {
            self.current_page -= 1;
            self.cursor = self.cursor.min(self.current_page_len().saturating_sub(1));
            true
        } else {
            false
        }
    }

    pub fn page_down(&mut self) -> bool {
        if self.num_pages() > 0 && self.current_page + 1 < self.num_pages() {
            self.current_page += 1;
            self.cursor = self.cursor.min(self.current_page_len().saturating_sub(1));
            true
        } else {
            false
        }
    }

    pub fn clear(&mut self) {
        self.candidates.clear();
        self.current_page = 0;
        self.cursor = 0;
        self.selected = false;
    }
}

impl Default for CandidateList {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn candidate(text: &str, source: CandidateSource, score: f64) -> Candidate {
        Candidate::new(text, source, score)
    }

    #[test]
    fn merge_keeps_highest_score_and_best_source() {
        let merged = merge_and_rank(vec![
            candidate("colour", CandidateSource::Dictionary, 0.0),
            candidate("colour", CandidateSource::UserDb, 2.5),
            candidate("cold", CandidateSource::Dictionary, 0.0),
            candidate("cold", CandidateSource::Spellcheck, 0.0),
        ]);
        assert_eq!(merged.len(), 2);
        assert_eq!(merged[0].text, "colour");
        assert_eq!(merged[0].source, CandidateSource::UserDb);
        assert_eq!(merged[0].score, 2.5);
        assert_eq!(merged[1].source, CandidateSource::Dictionary);
    }

    #[test]
    fn ranking_is_score_then_source_then_text() {
        let merged = merge_and_rank(vec![
            candidate("b", CandidateSource::Emoji, 1.0),
            candidate("a", CandidateSource::Emoji, 1.0),
            candidate("c", CandidateSource::Dictionary, 1.0),
        ]);
        let texts: Vec<&str> = merged.iter().map(|c| c.text.as_str()).collect();
        assert_eq!(texts, vec!["c", "a", "b"]);
        // Scores non-increasing by rank.
        for pair in merged.windows(2) {
            assert!(pair[0].score >= pair[1].score);
        }
    }

    #[test]
    fn selection_wraps_across_pages() {
        let mut list = CandidateList::with_page_size(2);
        list.set_candidates(
            (0..5)
                .map(|i| candidate(&format!("w{i}"), CandidateSource::Dictionary, -(i as f64)))
                .collect(),
        );
        assert!(!list.is_selected());
        list.select_next();
        assert_eq!(list.selected_candidate().unwrap().text, "w0");
        list.select_next();
        assert_eq!(list.selected_candidate().unwrap().text, "w1");
        list.select_next();
        assert_eq!(list.current_page(), 1);
        assert_eq!(list.selected_candidate().unwrap().text, "w2");
        for _ in 0..3 {
            list.select_next();
        }
        // Wrapped back to the start.
        assert_eq!(list.current_page(), 0);
        assert_eq!(list.selected_candidate().unwrap().text, "w0");
    }

    #[test]
    fn digit_commit_addresses_current_page() {
        let mut list = CandidateList::with_page_size(3);
        list.set_candidates(
            (0..6)
                .map(|i| candidate(&format!("w{i}"), CandidateSource::Dictionary, 0.0))
                .collect(),
        );
        assert_eq!(list.candidate_on_page(2).unwrap().text, "w1");
        list.page_down();
        assert_eq!(list.candidate_on_page(2).unwrap().text, "w4");
        assert!(list.candidate_on_page(0).is_none());
        assert!(list.candidate_on_page(4).is_none());
    }
}
