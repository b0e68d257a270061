//! World clock and tick schedule.
//!
//! The tick counter itself lives in [`WorldState::tick`] because it travels
//! with every snapshot. The clock owns the schedule derived from it: which
//! ticks record a sweep narrative and which ticks decay the threat level.
//!
//! All derivations use checked arithmetic; the counter never wraps.

use sentinel_types::WorldState;

use crate::config::WorldConfig;

/// Errors that can occur during clock operations.
#[derive(Debug, thiserror::Error)]
pub enum ClockError {
    /// Tick counter would overflow.
    #[error("tick counter overflow: cannot advance beyond u64::MAX")]
    TickOverflow,

    /// Invalid schedule configuration (e.g. zero sweep interval).
    #[error("invalid clock configuration: {reason}")]
    InvalidConfig {
        /// Explanation of what is wrong with the configuration.
        reason: String,
    },
}

/// Tick schedule for one instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WorldClock {
    /// Every n-th tick records a routine sweep narrative.
    sweep_interval: u64,

    /// Every n-th tick steps the threat level down one level.
    threat_decay_interval: u64,
}

impl WorldClock {
    /// Create a clock from explicit intervals.
    ///
    /// # Errors
    ///
    /// Returns [`ClockError::InvalidConfig`] if either interval is 0.
    pub fn new(sweep_interval: u64, threat_decay_interval: u64) -> Result<Self, ClockError> {
        if sweep_interval == 0 {
            return Err(ClockError::InvalidConfig {
                reason: "sweep_interval must be at least 1".to_owned(),
            });
        }
        if threat_decay_interval == 0 {
            return Err(ClockError::InvalidConfig {
                reason: "threat_decay_interval must be at least 1".to_owned(),
            });
        }
        Ok(Self {
            sweep_interval,
            threat_decay_interval,
        })
    }

    /// Create a clock from the `world` configuration section.
    ///
    /// # Errors
    ///
    /// Returns [`ClockError::InvalidConfig`] if either interval is 0.
    pub fn from_config(config: &WorldConfig) -> Result<Self, ClockError> {
        Self::new(config.sweep_interval, config.threat_decay_interval)
    }

    /// Advance the snapshot by one tick. Returns the new tick number.
    ///
    /// # Errors
    ///
    /// Returns [`ClockError::TickOverflow`] if the tick counter would exceed
    /// `u64::MAX`. The snapshot is left unchanged in that case.
    pub fn advance(&self, state: &mut WorldState) -> Result<u64, ClockError> {
        state.tick = state.tick.checked_add(1).ok_or(ClockError::TickOverflow)?;
        Ok(state.tick)
    }

    /// Whether `tick` records a sweep narrative. Tick 0 never does.
    pub fn is_sweep_tick(&self, tick: u64) -> bool {
        tick > 0 && tick.checked_rem(self.sweep_interval) == Some(0)
    }

    /// Whether `tick` decays the threat level. Tick 0 never does.
    pub fn is_decay_tick(&self, tick: u64) -> bool {
        tick > 0 && tick.checked_rem(self.threat_decay_interval) == Some(0)
    }

    /// Configured sweep interval.
    pub const fn sweep_interval(&self) -> u64 {
        self.sweep_interval
    }

    /// Configured threat decay interval.
    pub const fn threat_decay_interval(&self) -> u64 {
        self.threat_decay_interval
    }
}

impl Default for WorldClock {
    fn default() -> Self {
        Self {
            sweep_interval: 10,
            threat_decay_interval: 15,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use sentinel_sim::world;
    use sentinel_types::{Agent, Position};

    use super::*;

    fn state() -> WorldState {
        world::initial_state(&Agent::new("Ghost", Position::default()))
    }

    #[test]
    fn advance_increments_tick() {
        let clock = WorldClock::default();
        let mut state = state();
        assert_eq!(clock.advance(&mut state).unwrap(), 1);
        assert_eq!(clock.advance(&mut state).unwrap(), 2);
        assert_eq!(state.tick, 2);
    }

    #[test]
    fn advance_refuses_to_wrap() {
        let clock = WorldClock::default();
        let mut state = state();
        state.tick = u64::MAX;
        assert!(matches!(
            clock.advance(&mut state),
            Err(ClockError::TickOverflow)
        ));
        assert_eq!(state.tick, u64::MAX);
    }

    #[test]
    fn default_schedule_matches_world_defaults() {
        let clock = WorldClock::default();
        let sweeps: Vec<u64> = (0..=45).filter(|&t| clock.is_sweep_tick(t)).collect();
        let decays: Vec<u64> = (0..=45).filter(|&t| clock.is_decay_tick(t)).collect();
        assert_eq!(sweeps, vec![10, 20, 30, 40]);
        assert_eq!(decays, vec![15, 30, 45]);
    }

    #[test]
    fn zero_intervals_rejected() {
        assert!(WorldClock::new(0, 15).is_err());
        assert!(WorldClock::new(10, 0).is_err());
        assert!(WorldClock::new(1, 1).is_ok());
    }

    #[test]
    fn from_config_uses_world_section() {
        let config = WorldConfig::default();
        assert_eq!(WorldClock::from_config(&config).unwrap(), WorldClock::default());
    }
}
