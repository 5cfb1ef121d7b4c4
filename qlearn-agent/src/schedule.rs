//! Exploration schedules (per-episode epsilon)

use serde::{Deserialize, Serialize};

/// Trait for schedules (e.g., for epsilon decay)
pub trait Schedule: Send + Sync {
    /// Get value at episode t
    fn value(&self, t: usize) -> f64;
}

/// Linear schedule that decays from start to end over steps
#[derive(Debug, Clone)]
pub struct LinearSchedule {
    /// Starting value
    pub start: f64,
    /// Ending value
    pub end: f64,
    /// Number of episodes for decay
    pub steps: usize,
}

impl LinearSchedule {
    /// Create a new linear schedule
    #[must_use]
    pub fn new(start: f64, end: f64, steps: usize) -> Self {
        Self { start, end, steps }
    }
}

impl Schedule for LinearSchedule {
    #[allow(clippy::cast_precision_loss)]
    fn value(&self, t: usize) -> f64 {
        if t >= self.steps {
            self.end
        } else {
            let progress = t as f64 / self.steps as f64;
            self.start + (self.end - self.start) * progress
        }
    }
}

/// Exponential decay schedule
#[derive(Debug, Clone)]
pub struct ExponentialSchedule {
    /// Starting value
    pub start: f64,
    /// Minimum value
    pub min_value: f64,
    /// Decay rate
    pub decay_rate: f64,
}

impl ExponentialSchedule {
    /// Create a new exponential schedule
    #[must_use]
    pub fn new(start: f64, min_value: f64, decay_rate: f64) -> Self {
        Self {
            start,
            min_value,
            decay_rate,
        }
    }
}

impl Schedule for ExponentialSchedule {
    #[allow(
        clippy::cast_precision_loss,
        clippy::cast_possible_truncation,
        clippy::cast_possible_wrap
    )]
    fn value(&self, t: usize) -> f64 {
        let value = self.start * self.decay_rate.powi(t.min(i32::MAX as usize) as i32);
        value.max(self.min_value)
    }
}

/// Constant schedule
#[derive(Debug, Clone)]
pub struct ConstantSchedule {
    /// Constant value
    pub value: f64,
}

impl Schedule for ConstantSchedule {
    fn value(&self, _t: usize) -> f64 {
        self.value
    }
}

/// Serializable choice of epsilon schedule, anchored at the configured epsilon
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum EpsilonSchedule {
    /// Keep epsilon fixed for the whole run
    #[default]
    Constant,
    /// Interpolate to `end` over `episodes` episodes
    Linear {
        /// Final epsilon
        end: f64,
        /// Episodes to reach it
        episodes: usize,
    },
    /// Multiply by `decay` each episode, never dropping below `min`
    Exponential {
        /// Per-episode factor
        decay: f64,
        /// Floor
        min: f64,
    },
}

impl EpsilonSchedule {
    /// Build the schedule starting from `epsilon`
    #[must_use]
    pub fn build(&self, epsilon: f64) -> Box<dyn Schedule> {
        match *self {
            Self::Constant => Box::new(ConstantSchedule { value: epsilon }),
            Self::Linear { end, episodes } => Box::new(LinearSchedule::new(epsilon, end, episodes)),
            Self::Exponential { decay, min } => {
                Box::new(ExponentialSchedule::new(epsilon, min, decay))
            }
        }
    }

    /// Check the schedule's own parameters
    pub fn validate(&self) -> qlearn_core::Result<()> {
        let ok = match *self {
            Self::Constant => true,
            Self::Linear { end, .. } => (0.0..=1.0).contains(&end),
            Self::Exponential { decay, min } => {
                (0.0..=1.0).contains(&decay) && (0.0..=1.0).contains(&min)
            }
        };
        if ok {
            Ok(())
        } else {
            Err(qlearn_core::RLError::InvalidConfig(format!(
                "epsilon schedule {self:?} leaves [0, 1]"
            )))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn constant_is_default() {
        let schedule = EpsilonSchedule::default().build(0.2);
        assert_eq!(schedule.value(0), 0.2);
        assert_eq!(schedule.value(1_000), 0.2);
    }

    #[test]
    fn linear_reaches_end() {
        let schedule = EpsilonSchedule::Linear { end: 0.0, episodes: 10 }.build(1.0);
        assert_relative_eq!(schedule.value(5), 0.5);
        assert_eq!(schedule.value(10), 0.0);
        assert_eq!(schedule.value(50), 0.0);
    }

    #[test]
    fn exponential_respects_floor() {
        let schedule = EpsilonSchedule::Exponential { decay: 0.5, min: 0.1 }.build(0.8);
        assert_relative_eq!(schedule.value(1), 0.4);
        assert_relative_eq!(schedule.value(2), 0.2);
        assert_relative_eq!(schedule.value(10), 0.1);
    }

    #[test]
    fn parses_tagged_config() {
        let schedule: EpsilonSchedule =
            serde_json::from_str(r#"{"kind":"exponential","decay":0.99,"min":0.05}"#).unwrap();
        assert_eq!(schedule, EpsilonSchedule::Exponential { decay: 0.99, min: 0.05 });
        assert!(EpsilonSchedule::Linear { end: 2.0, episodes: 3 }.validate().is_err());
    }
}
