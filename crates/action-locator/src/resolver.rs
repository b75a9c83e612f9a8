//! Element resolver with fallback chain orchestration

use std::time::Instant;

use perceiver_structural::{AccessibilitySnapshot, AxNode};
use tracing::debug;

use crate::errors::LocatorError;
use crate::events;
use crate::labels::{base_label, disambiguate, metadata_for};
use crate::strategies::{overlap, strategy_for, targetable_pool, tokens, Match};
use crate::types::{Candidate, LocatorStrategy, ResolveOptions, ResolveResult, TargetDescriptor};

/// Resolves with the default candidate cap.
pub fn resolve(
    descriptor: &TargetDescriptor,
    snapshot: &AccessibilitySnapshot,
) -> Result<ResolveResult, LocatorError> {
    resolve_with_options(descriptor, snapshot, &ResolveOptions::default())
}

/// Runs the fallback chain, narrows ties by hint, then applies the ordinal.
///
/// Pure: the same descriptor and snapshot always give the same result.
pub fn resolve_with_options(
    descriptor: &TargetDescriptor,
    snapshot: &AccessibilitySnapshot,
    options: &ResolveOptions,
) -> Result<ResolveResult, LocatorError> {
    validate(descriptor)?;
    let started = Instant::now();
    let pool = targetable_pool(snapshot);

    let mut used: Option<LocatorStrategy> = None;
    let mut matches: Vec<Match<'_>> = Vec::new();
    for kind in LocatorStrategy::fallback_chain() {
        let strategy = strategy_for(kind);
        let found = strategy.collect(descriptor, snapshot, &pool);
        debug!(
            target: "locator",
            strategy = strategy.name(),
            matches = found.len(),
            "strategy evaluated"
        );
        if !found.is_empty() {
            used = Some(kind);
            matches = found;
            break;
        }
    }
    let matched = matches.len();

    if used == Some(LocatorStrategy::FuzzyText) {
        // stable: equal scores stay in document order
        matches.sort_by(|a, b| b.score.total_cmp(&a.score));
    } else if matches.len() > 1 {
        if let Some(hint) = descriptor.hint_text() {
            matches = narrow_by_hint(snapshot, matches, hint);
        }
    }

    let result = match (used, descriptor.ordinal) {
        (None, _) => ResolveResult::None,
        (Some(strategy), Some(ordinal)) => match matches.get(ordinal - 1) {
            Some(hit) => ResolveResult::One(build_candidates(snapshot, &[*hit], strategy).remove(0)),
            None => ResolveResult::None,
        },
        (Some(strategy), None) => {
            matches.truncate(options.max_candidates.max(1));
            let mut candidates = build_candidates(snapshot, &matches, strategy);
            match candidates.len() {
                0 => ResolveResult::None,
                1 => ResolveResult::One(candidates.remove(0)),
                _ => ResolveResult::Many(candidates),
            }
        }
    };

    events::emit_resolve(
        used.map(|strategy| strategy.name()),
        matched,
        result.len(),
        started.elapsed(),
    );
    Ok(result)
}

fn validate(descriptor: &TargetDescriptor) -> Result<(), LocatorError> {
    if descriptor.is_empty() {
        return Err(LocatorError::InvalidDescriptor(
            "nothing to look for: give a role, a name or a hint".into(),
        ));
    }
    if descriptor.ordinal == Some(0) {
        return Err(LocatorError::InvalidDescriptor(
            "positions start at one".into(),
        ));
    }
    Ok(())
}

/// Keeps the group whose surroundings best match the hint; no-op when nothing matches.
fn narrow_by_hint<'a>(
    snapshot: &'a AccessibilitySnapshot,
    matches: Vec<Match<'a>>,
    hint: &str,
) -> Vec<Match<'a>> {
    let query = tokens(hint);
    let scored: Vec<(f64, Match<'a>)> = matches
        .into_iter()
        .map(|hit| (overlap(&query, &context_tokens(snapshot, hit.node)), hit))
        .collect();
    let best = scored.iter().map(|(score, _)| *score).fold(0.0, f64::max);
    if best <= 0.0 {
        return scored.into_iter().map(|(_, hit)| hit).collect();
    }
    scored
        .into_iter()
        .filter(|(score, _)| *score == best)
        .map(|(_, hit)| hit)
        .collect()
}

fn context_tokens(snapshot: &AccessibilitySnapshot, node: &AxNode) -> Vec<String> {
    let mut words = Vec::new();
    for text in [
        Some(node.name.as_str()),
        node.text.as_deref(),
        node.aria_label.as_deref(),
        node.description.as_deref(),
    ]
    .into_iter()
    .flatten()
    {
        words.extend(tokens(text));
    }
    if let Some(heading) = snapshot.preceding_heading(node.id) {
        words.extend(tokens(&heading.display_name()));
    }
    if let Some(landmark) = snapshot.landmark_of(node.id) {
        words.extend(tokens(&landmark.name));
        if let Some(kind) = landmark.landmark {
            words.extend(tokens(kind.label()));
        }
    }
    words
}

fn build_candidates(
    snapshot: &AccessibilitySnapshot,
    matches: &[Match<'_>],
    strategy: LocatorStrategy,
) -> Vec<Candidate> {
    let metadata: Vec<_> = matches
        .iter()
        .map(|hit| metadata_for(snapshot, hit.node))
        .collect();
    let labels = disambiguate(
        matches
            .iter()
            .zip(&metadata)
            .map(|(hit, metadata)| base_label(hit.node, metadata))
            .collect(),
    );
    matches
        .iter()
        .zip(metadata)
        .zip(labels)
        .map(|((hit, metadata), label)| Candidate {
            node: hit.node.clone(),
            label,
            strategy,
            score: hit.score,
            metadata,
        })
        .collect()
}
