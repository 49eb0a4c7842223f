//! Fuzzy matching of highlight fragments onto page paragraphs
//!
//! Every fragment is scored against every paragraph of the page's match form.
//! Candidates below the threshold are dropped, the surviving paragraphs are
//! deduplicated (first seen wins) and finally put back into the order in which
//! they appear on the page. Score never decides output order.

use crate::paragraphs::PageText;
use crate::similarity::Scorer;
use log::debug;
use serde::Serialize;
use std::collections::HashSet;

/// Which scored paragraphs a single fragment may keep
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CandidatePolicy {
    /// Only the best-scoring paragraph
    Best,
    /// The `n` best-scoring paragraphs
    TopN(usize),
    /// Every paragraph at or above the threshold
    #[default]
    AboveThreshold,
}

/// A fragment paired with one paragraph it resembles
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Match {
    pub fragment: String,
    pub paragraph: String,
    /// Position of `paragraph` in the page's match form
    pub paragraph_index: usize,
    pub score: u8,
}

pub struct HighlightMatcher<'a> {
    scorer: &'a dyn Scorer,
    threshold: u8,
    policy: CandidatePolicy,
}

impl<'a> HighlightMatcher<'a> {
    /// `threshold` above 100 is treated as 100
    pub fn new(scorer: &'a dyn Scorer, threshold: u8, policy: CandidatePolicy) -> Self {
        Self {
            scorer,
            threshold: threshold.min(100),
            policy,
        }
    }

    pub fn threshold(&self) -> u8 {
        self.threshold
    }

    /// Candidates for one fragment, best first
    pub fn match_fragment(&self, fragment: &str, text: &PageText) -> Vec<Match> {
        let fragment = fragment.trim();
        if fragment.is_empty() {
            return Vec::new();
        }

        let mut scored: Vec<(usize, u8)> = text
            .match_form
            .iter()
            .enumerate()
            .map(|(i, paragraph)| (i, self.scorer.score(fragment, paragraph)))
            .collect();
        // Stable: equal scores stay in page order
        scored.sort_by(|a, b| b.1.cmp(&a.1));

        let keep = match self.policy {
            CandidatePolicy::Best => 1,
            CandidatePolicy::TopN(n) => n,
            CandidatePolicy::AboveThreshold => scored.len(),
        };

        scored
            .into_iter()
            .take(keep)
            .filter(|&(_, score)| score >= self.threshold)
            .map(|(i, score)| Match {
                fragment: fragment.to_string(),
                paragraph: text.match_form[i].clone(),
                paragraph_index: i,
                score,
            })
            .collect()
    }

    /// All surviving candidates, in fragment order
    pub fn match_fragments<S: AsRef<str>>(&self, fragments: &[S], text: &PageText) -> Vec<Match> {
        fragments
            .iter()
            .flat_map(|f| self.match_fragment(f.as_ref(), text))
            .collect()
    }

    /// Distinct matched paragraphs in page order
    pub fn ordered_highlights<S: AsRef<str>>(&self, fragments: &[S], text: &PageText) -> Vec<String> {
        let matches = self.match_fragments(fragments, text);

        let mut seen = HashSet::new();
        let mut unique: Vec<String> = Vec::new();
        for m in matches {
            if seen.insert(m.paragraph.clone()) {
                unique.push(m.paragraph);
            }
        }

        // Key on first occurrence so repeated paragraph strings sort together
        unique.sort_by_key(|p| text.index_of(p).unwrap_or(usize::MAX));

        debug!(
            "Matched {} fragments onto {} of {} paragraphs (threshold {})",
            fragments.len(),
            unique.len(),
            text.len(),
            self.threshold
        );
        unique
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::similarity::TokenSortRatio;

    fn page() -> PageText {
        PageText::from_raw(
            "The kernel schedules processes. Memory is paged on demand. \
             Files live in a tree of directories. Devices are files too.",
        )
    }

    #[test]
    fn test_garbled_fragment_below_high_threshold() {
        let text = PageText::from_raw("Some body sentence. Unrelated words here.");
        let scorer = TokenSortRatio;
        let strict = HighlightMatcher::new(&scorer, 90, CandidatePolicy::AboveThreshold);
        assert!(strict.ordered_highlights(&["Sm bdy sntnc"], &text).is_empty());

        let lenient = HighlightMatcher::new(&scorer, 50, CandidatePolicy::AboveThreshold);
        assert_eq!(
            lenient.ordered_highlights(&["Sm bdy sntnc"], &text),
            vec!["Some body sentence"]
        );
    }

    #[test]
    fn test_same_paragraph_from_two_fragments_kept_once() {
        let scorer = TokenSortRatio;
        let matcher = HighlightMatcher::new(&scorer, 50, CandidatePolicy::Best);
        let out = matcher.ordered_highlights(
            &["Memory is paged on demand", "memory paged demand"],
            &page(),
        );
        assert_eq!(out, vec!["Memory is paged on demand"]);
    }

    #[test]
    fn test_output_in_page_order() {
        let scorer = TokenSortRatio;
        let matcher = HighlightMatcher::new(&scorer, 80, CandidatePolicy::Best);
        let text = page();
        let out = matcher.ordered_highlights(
            &[
                "Devices are files too.",
                "The kernel schedules processes",
                "Files live in a tree of directories",
            ],
            &text,
        );
        assert_eq!(
            out,
            vec![
                "The kernel schedules processes",
                "Files live in a tree of directories",
                "Devices are files too."
            ]
        );
        let indices: Vec<usize> = out.iter().filter_map(|p| text.index_of(p)).collect();
        assert!(indices.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn test_raising_threshold_never_adds_matches() {
        let scorer = TokenSortRatio;
        let text = page();
        let fragments = ["kernel processes", "paged memory", "tree", "devices files"];
        let mut last = usize::MAX;
        for threshold in [0u8, 20, 40, 50, 60, 80, 100] {
            let matcher = HighlightMatcher::new(&scorer, threshold, CandidatePolicy::AboveThreshold);
            let count = matcher.ordered_highlights(&fragments, &text).len();
            assert!(count <= last, "threshold {} grew the result", threshold);
            last = count;
        }
    }

    #[test]
    fn test_matching_is_repeatable_and_distinct() {
        let scorer = TokenSortRatio;
        let matcher = HighlightMatcher::new(&scorer, 30, CandidatePolicy::AboveThreshold);
        let text = page();
        let fragments = ["files", "memory paged", "files directories"];
        let first = matcher.ordered_highlights(&fragments, &text);
        let second = matcher.ordered_highlights(&fragments, &text);
        assert_eq!(first, second);
        let distinct: HashSet<&String> = first.iter().collect();
        assert_eq!(distinct.len(), first.len());
    }

    #[test]
    fn test_empty_fragment_skipped() {
        let scorer = TokenSortRatio;
        let matcher = HighlightMatcher::new(&scorer, 0, CandidatePolicy::AboveThreshold);
        assert!(matcher.match_fragment("   ", &page()).is_empty());
    }

    #[test]
    fn test_candidate_policies() {
        let scorer = TokenSortRatio;
        let text = page();
        let all = HighlightMatcher::new(&scorer, 0, CandidatePolicy::AboveThreshold)
            .match_fragment("files", &text);
        assert_eq!(all.len(), text.len());
        assert!(all.windows(2).all(|w| w[0].score >= w[1].score));

        let top2 = HighlightMatcher::new(&scorer, 0, CandidatePolicy::TopN(2))
            .match_fragment("files", &text);
        assert_eq!(top2.len(), 2);
        assert_eq!(top2[..], all[..2]);

        let best = HighlightMatcher::new(&scorer, 0, CandidatePolicy::Best)
            .match_fragment("files", &text);
        assert_eq!(best.len(), 1);
        assert_eq!(best[0], all[0]);
    }

    #[test]
    fn test_threshold_clamped() {
        let scorer = TokenSortRatio;
        let matcher = HighlightMatcher::new(&scorer, 250, CandidatePolicy::Best);
        assert_eq!(matcher.threshold(), 100);
        assert_eq!(
            matcher.ordered_highlights(&["Devices are files too."], &page()),
            vec!["Devices are files too."]
        );
    }
}
