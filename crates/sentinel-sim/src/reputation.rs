//! Faction reputation model.
//!
//! Each faction carries an integer score in [-100, 100] and a tier derived
//! from it. Tier thresholds are strict, so a faction has to move past a
//! boundary (not just reach it) before its standing changes.
//!
//! # Invariants
//!
//! - Scores are clamped to [-100, 100] after every delta.
//! - A tier always equals [`tier_of`] of the score it is stored with.
//! - Only breach resolutions change scores; the tick loop never does.
//!
//! Everything here is pure and can be called without coordination.

use sentinel_types::{Faction, FactionRep, RepTier};

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

/// Score penalty applied to the blamed faction when a breach fails.
pub const BREACH_FAILURE_PENALTY: i32 = -15;

/// Score penalty applied to the blamed faction when a breach succeeds.
pub const BREACH_SUCCESS_PENALTY: i32 = -10;

/// Score bonus applied to every other faction when a breach succeeds.
pub const BREACH_SUCCESS_BONUS: i32 = 5;

/// Starting score for each faction, in [`Faction::ALL`] order.
const STARTING_SCORES: [(Faction, i32); 3] = [
    (Faction::CorporateSecurity, 0),
    (Faction::StreetCollective, 0),
    (Faction::InformationBroker, 10),
];

// ---------------------------------------------------------------------------
// ReputationChange
// ---------------------------------------------------------------------------

/// Record of a single score adjustment, used for logging and summaries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReputationChange {
    /// The faction that moved.
    pub faction: Faction,
    /// Score before the delta.
    pub score_before: i32,
    /// Score after the delta (clamped).
    pub score_after: i32,
    /// Tier before the delta.
    pub tier_before: RepTier,
    /// Tier after the delta.
    pub tier_after: RepTier,
}

impl ReputationChange {
    /// Whether the delta crossed a tier boundary.
    pub fn tier_changed(&self) -> bool {
        self.tier_before != self.tier_after
    }
}

// ---------------------------------------------------------------------------
// Pure functions
// ---------------------------------------------------------------------------

/// Derive the tier for a score.
pub const fn tier_of(score: i32) -> RepTier {
    RepTier::from_score(score)
}

/// Apply `delta` to a standing, clamping the score and re-deriving the tier.
pub fn apply_delta(rep: &FactionRep, delta: i32) -> FactionRep {
    rep.with_score(rep.score().saturating_add(delta))
}

/// Build the three starting standings.
pub fn initial_factions() -> Vec<FactionRep> {
    STARTING_SCORES
        .iter()
        .map(|&(faction, score)| FactionRep::new(faction, score))
        .collect()
}

/// Starting score of a faction in a fresh world.
pub fn starting_score(faction: Faction) -> i32 {
    STARTING_SCORES
        .iter()
        .find(|&&(name, _)| name == faction)
        .map_or(0, |&(_, score)| score)
}

/// Apply `delta` to the named faction in place.
///
/// Returns `None` (and changes nothing) if the faction is not present.
pub fn adjust_faction(
    factions: &mut [FactionRep],
    name: Faction,
    delta: i32,
) -> Option<ReputationChange> {
    let rep = factions.iter_mut().find(|rep| rep.name() == name)?;
    let updated = apply_delta(rep, delta);
    let change = ReputationChange {
        faction: name,
        score_before: rep.score(),
        score_after: updated.score(),
        tier_before: rep.tier(),
        tier_after: updated.tier(),
    };
    *rep = updated;
    Some(change)
}

/// Apply the breach-failure penalty to the blamed faction, if any.
pub fn apply_breach_failure(
    factions: &mut [FactionRep],
    blamed: Option<Faction>,
) -> Vec<ReputationChange> {
    blamed
        .and_then(|faction| adjust_faction(factions, faction, BREACH_FAILURE_PENALTY))
        .into_iter()
        .collect()
}

/// Apply the breach-success deltas.
///
/// The blamed faction loses [`BREACH_SUCCESS_PENALTY`]; every faction that
/// is not the blamed one gains [`BREACH_SUCCESS_BONUS`]. With no blamed
/// faction, all of them gain the bonus. Each faction moves at most once.
pub fn apply_breach_success(
    factions: &mut [FactionRep],
    blamed: Option<Faction>,
) -> Vec<ReputationChange> {
    Faction::ALL
        .into_iter()
        .filter_map(|name| {
            let delta = if Some(name) == blamed {
                BREACH_SUCCESS_PENALTY
            } else {
                BREACH_SUCCESS_BONUS
            };
            adjust_faction(factions, name, delta)
        })
        .collect()
}
