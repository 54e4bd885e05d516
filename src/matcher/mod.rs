//! Pure transcript-to-target resolution. No suspension points: the
//! matcher is synchronous and allocation-bounded in the size of the
//! target index (spec §4.6, §5).

use std::collections::HashMap;

use crate::dom::{DomTarget, TargetIndex};

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MatchKind {
    Exact,
    Fuzzy,
}

#[derive(Debug, Clone)]
pub enum ResolveOutcome {
    Unique { target: DomTarget, match_kind: MatchKind },
    Ambiguous { candidates: Vec<DomTarget> },
    NoMatch,
    Misconfiguration { detail: String },
}

pub fn resolve(transcript: &str, index: &TargetIndex, fuzzy_threshold: f32, fuzzy_margin: f32, collision_is_error: bool) -> ResolveOutcome {
    if collision_is_error {
        if let Some(detail) = find_duplicate_labels(&index.targets) {
            return ResolveOutcome::Misconfiguration { detail };
        }
    }

    let exact: Vec<&DomTarget> = index
        .targets
        .iter()
        .filter(|t| t.normalized_label == transcript || t.synonyms.iter().any(|s| s == transcript))
        .collect();

    match exact.len() {
        0 => {}
        1 => {
            return ResolveOutcome::Unique {
                target: exact[0].clone(),
                match_kind: MatchKind::Exact,
            }
        }
        _ => {
            return if collision_is_error {
                ResolveOutcome::Misconfiguration {
                    detail: format!("{} targets exactly match \"{transcript}\"", exact.len()),
                }
            } else {
                ResolveOutcome::Ambiguous {
                    candidates: exact.into_iter().cloned().collect(),
                }
            };
        }
    }

    let mut scored: Vec<(f32, &DomTarget)> = index
        .targets
        .iter()
        .map(|t| (best_similarity(transcript, t), t))
        .filter(|(score, _)| *score >= fuzzy_threshold)
        .collect();
    scored.sort_by(|a, b| b.0.partial_cmp(&a.0).unwrap_or(std::cmp::Ordering::Equal));

    match scored.len() {
        0 => ResolveOutcome::NoMatch,
        1 => ResolveOutcome::Unique {
            target: scored[0].1.clone(),
            match_kind: MatchKind::Fuzzy,
        },
        _ => {
            let (top, _) = scored[0];
            let (second, _) = scored[1];
            if top - second >= fuzzy_margin {
                ResolveOutcome::Unique {
                    target: scored[0].1.clone(),
                    match_kind: MatchKind::Fuzzy,
                }
            } else {
                ResolveOutcome::Ambiguous {
                    candidates: scored.into_iter().map(|(_, t)| t.clone()).collect(),
                }
            }
        }
    }
}

fn similarity(a: &str, b: &str) -> f32 {
    let max_len = a.chars().count().max(b.chars().count());
    if max_len == 0 {
        return 1.0;
    }
    // Damerau-Levenshtein (transposition-aware) so an adjacent letter swap
    // from ASR noise ("submti" for "submit") costs 1 edit, not 2.
    let distance = strsim::damerau_levenshtein(a, b) as f32;
    1.0 - distance / max_len as f32
}

fn best_similarity(transcript: &str, target: &DomTarget) -> f32 {
    let mut best = similarity(transcript, &target.normalized_label);
    for syn in &target.synonyms {
        best = best.max(similarity(transcript, syn));
    }
    best
}

fn find_duplicate_labels(targets: &[DomTarget]) -> Option<String> {
    let mut groups: HashMap<&str, Vec<&str>> = HashMap::new();
    for t in targets {
        groups.entry(t.normalized_label.as_str()).or_default().push(t.id.as_str());
    }
    let offending: Vec<String> = groups
        .into_iter()
        .filter(|(_, ids)| ids.len() > 1)
        .map(|(label, ids)| format!("\"{label}\" -> [{}]", ids.join(", ")))
        .collect();
    (!offending.is_empty()).then(|| offending.join("; "))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::{ActionKind, ElementHandle, Scope};

    fn target(id: &str, label: &str, synonyms: &[&str]) -> DomTarget {
        DomTarget {
            id: id.to_string(),
            handle: ElementHandle(0),
            raw_label: label.to_string(),
            normalized_label: label.to_string(),
            synonyms: synonyms.iter().map(|s| s.to_string()).collect(),
            risk: None,
            default_action: ActionKind::Click,
        }
    }

    fn index_of(targets: Vec<DomTarget>) -> TargetIndex {
        TargetIndex {
            targets,
            scope: Scope::Page,
        }
    }

    #[test]
    fn exact_match_wins_over_fuzzy() {
        let index = index_of(vec![target("a", "submit", &[]), target("b", "submitting", &[])]);
        match resolve("submit", &index, 0.1, 0.0, false) {
            ResolveOutcome::Unique { target, match_kind } => {
                assert_eq!(target.id, "a");
                assert_eq!(match_kind, MatchKind::Exact);
            }
            other => panic!("expected unique exact match, got {other:?}"),
        }
    }

    #[test]
    fn synonym_counts_as_exact() {
        let index = index_of(vec![target("a", "submit", &["send"])]);
        match resolve("send", &index, 0.7, 0.15, false) {
            ResolveOutcome::Unique { target, match_kind } => {
                assert_eq!(target.id, "a");
                assert_eq!(match_kind, MatchKind::Exact);
            }
            other => panic!("expected unique exact match via synonym, got {other:?}"),
        }
    }

    #[test]
    fn fuzzy_unique_when_margin_clears() {
        let index = index_of(vec![target("a", "submit", &[]), target("b", "cancel", &[])]);
        match resolve("submitt", &index, 0.5, 0.15, false) {
            ResolveOutcome::Unique { target, match_kind } => {
                assert_eq!(target.id, "a");
                assert_eq!(match_kind, MatchKind::Fuzzy);
            }
            other => panic!("expected unique fuzzy match, got {other:?}"),
        }
    }

    #[test]
    fn ambiguous_when_top_two_too_close() {
        let index = index_of(vec![target("a", "submit", &[]), target("b", "submat", &[])]);
        match resolve("submot", &index, 0.3, 0.9, false) {
            ResolveOutcome::Ambiguous { candidates } => assert_eq!(candidates.len(), 2),
            other => panic!("expected ambiguous, got {other:?}"),
        }
    }

    #[test]
    fn no_match_below_threshold() {
        let index = index_of(vec![target("a", "submit", &[])]);
        match resolve("xyz", &index, 0.9, 0.15, false) {
            ResolveOutcome::NoMatch => {}
            other => panic!("expected no_match, got {other:?}"),
        }
    }

    #[test]
    fn duplicate_labels_are_misconfiguration_under_error_policy() {
        let index = index_of(vec![target("a", "ok", &[]), target("b", "ok", &[])]);
        match resolve("ok", &index, 0.7, 0.15, true) {
            ResolveOutcome::Misconfiguration { detail } => assert!(detail.contains("ok")),
            other => panic!("expected misconfiguration, got {other:?}"),
        }
    }

    #[test]
    fn duplicate_exact_matches_disambiguate_under_default_policy() {
        let index = index_of(vec![target("a", "ok", &[]), target("b", "ok", &[])]);
        match resolve("ok", &index, 0.7, 0.15, false) {
            ResolveOutcome::Ambiguous { candidates } => assert_eq!(candidates.len(), 2),
            other => panic!("expected ambiguous, got {other:?}"),
        }
    }
}
