//! World snapshot construction and small in-place helpers.

use chrono::Utc;
use sentinel_types::{
    Agent, AgentId, Faction, FactionRep, MAX_ANOMALIES, MAX_INTEL_ENTRIES, MAX_NARRATIVES,
    ThreatLevel, WorldState,
};

use crate::{bounded, reputation};

/// Narratives a fresh world starts with, newest first.
pub const SEED_NARRATIVES: [&str; 3] = [
    "Grid relay 7 reporting intermittent packet loss.",
    "Street Collective chatter spiking on open channels.",
    "Information Broker offering bulk credentials at discount.",
];

/// Build the starting snapshot for a process whose only agent is `local`.
pub fn initial_state(local: &Agent) -> WorldState {
    WorldState {
        tick: 0,
        threat_level: ThreatLevel::Green,
        anomalies: Vec::new(),
        narratives: SEED_NARRATIVES.iter().map(|&line| line.to_owned()).collect(),
        factions: reputation::initial_factions(),
        intel_entries: Vec::new(),
        agents: vec![local.clone()],
    }
}

/// Append `agent` if no agent with its id is present.
///
/// Returns `true` if the agent was added.
pub fn ensure_agent(state: &mut WorldState, agent: &Agent) -> bool {
    if state.agent(agent.id).is_some() {
        return false;
    }
    state.agents.push(agent.clone());
    true
}

/// Refresh `last_active` on the given agent. Returns `false` if absent.
pub fn touch_agent(state: &mut WorldState, id: AgentId) -> bool {
    state
        .agents
        .iter_mut()
        .find(|agent| agent.id == id)
        .map(|agent| agent.last_active = Utc::now())
        .is_some()
}

/// Trim anomalies, narratives and intel to their caps.
///
/// Returns the number of entries evicted across all three.
pub fn enforce_bounds(state: &mut WorldState) -> usize {
    bounded::enforce_bound(&mut state.anomalies, MAX_ANOMALIES)
        .saturating_add(bounded::enforce_bound(&mut state.narratives, MAX_NARRATIVES))
        .saturating_add(bounded::enforce_bound(
            &mut state.intel_entries,
            MAX_INTEL_ENTRIES,
        ))
}

/// What [`normalize`] had to repair in a snapshot.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Repairs {
    /// Entries evicted to bring the capped collections under their caps.
    pub evicted: usize,
    /// Whether the faction list was rebuilt.
    pub factions_rebuilt: bool,
    /// Standings whose score or tier was out of line.
    pub tiers_corrected: usize,
}

impl Repairs {
    /// Whether the snapshot was already well formed.
    pub const fn is_clean(&self) -> bool {
        self.evicted == 0 && !self.factions_rebuilt && self.tiers_corrected == 0
    }
}

/// Bring a snapshot from outside this process back within the world
/// invariants.
///
/// Collections are trimmed to their caps. Unless the snapshot holds exactly
/// one standing per faction, the list is rebuilt in [`Faction::ALL`] order
/// from the first standing seen for each faction, with missing factions at
/// their starting score. Tiers are then re-derived from scores.
pub fn normalize(state: &mut WorldState) -> Repairs {
    let evicted = enforce_bounds(state);
    let factions_rebuilt = !has_one_standing_per_faction(&state.factions);
    if factions_rebuilt {
        state.factions = Faction::ALL
            .into_iter()
            .map(|name| {
                state
                    .factions
                    .iter()
                    .find(|rep| rep.name() == name)
                    .cloned()
                    .unwrap_or_else(|| FactionRep::new(name, reputation::starting_score(name)))
            })
            .collect();
    }
    Repairs {
        evicted,
        factions_rebuilt,
        tiers_corrected: state.rederive_tiers(),
    }
}

fn has_one_standing_per_faction(factions: &[FactionRep]) -> bool {
    factions.len() == Faction::ALL.len()
        && Faction::ALL
            .into_iter()
            .all(|name| factions.iter().filter(|rep| rep.name() == name).count() == 1)
}

/// Narrative line recorded on a sweep tick.
pub fn sweep_narrative(tick: u64, threat: ThreatLevel) -> String {
    format!("Periodic sweep at tick {tick}: threat level {threat}.")
}
