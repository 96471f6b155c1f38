//! Candidate scoring and best-match selection
//!
//! Pure functions with no I/O. Both the target track and the candidates are normalized
//! before any comparison, so callers may pass raw or already-normalized values.

use crate::normalize::{collapse_separators, similarity};
use crate::types::{Candidate, MatchScore, ProviderId, Track};

/// The winning candidate of a ranking round
#[derive(Clone, Debug, PartialEq)]
pub struct RankedMatch {
    /// Id of the selected candidate
    pub provider_id: ProviderId,
    /// Its score against the target
    pub score: MatchScore,
}

/// Score one normalized candidate against a normalized target.
///
/// Returns `None` when the candidate lacks a title or an album; such a candidate takes no
/// part in the round.
pub fn score_candidate(target: &Track, candidate: &Candidate) -> Option<MatchScore> {
    if candidate.title.is_empty() || candidate.album.is_empty() {
        return None;
    }

    let title = similarity(&candidate.title, &target.title);
    let artist = artist_part(target, candidate);
    let album = album_part(target, candidate);

    Some(MatchScore::from_parts(title, artist, album))
}

/// Artist similarity, scored only when the candidate artist contains the target artist
/// once separators are collapsed. A failed containment check scores 0 without
/// disqualifying the candidate.
fn artist_part(target: &Track, candidate: &Candidate) -> f64 {
    if candidate.artist.is_empty() {
        return 0.0;
    }
    let contains = collapse_separators(&candidate.artist)
        .contains(collapse_separators(&target.artist).as_str());
    if !contains {
        return 0.0;
    }
    similarity(&candidate.artist, &target.artist)
}

fn album_part(target: &Track, candidate: &Candidate) -> f64 {
    // Singles usually carry the title as their album
    let exact_single = candidate.album == candidate.title && candidate.album == target.title;
    if exact_single {
        return 1.0;
    }
    similarity(&candidate.album, &target.album)
}

/// Precision gate: a high total alone is not enough, the title or the artist must overlap.
fn passes_precision_gate(target: &Track, candidate: &Candidate) -> bool {
    candidate.title.contains(target.title.as_str())
        || candidate.artist.contains(target.artist.as_str())
}

/// Select the best candidate for `track`, or `None` if no candidate is eligible.
///
/// A candidate replaces the current best only if its total is strictly greater and it
/// passes the precision gate, so the first candidate wins ties.
pub fn select_best(track: &Track, candidates: &[Candidate]) -> Option<RankedMatch> {
    if candidates.is_empty() {
        return None;
    }

    let target = track.normalized();
    let mut best: Option<RankedMatch> = None;

    for raw in candidates {
        let candidate = raw.normalized();
        let Some(score) = score_candidate(&target, &candidate) else {
            tracing::trace!(provider_id = %candidate.provider_id, "candidate missing title or album, skipped");
            continue;
        };

        let best_total = best.as_ref().map_or(0.0, |b| b.score.total);
        if score.total > best_total && passes_precision_gate(&target, &candidate) {
            best = Some(RankedMatch {
                provider_id: candidate.provider_id,
                score,
            });
        }
    }

    best
}
