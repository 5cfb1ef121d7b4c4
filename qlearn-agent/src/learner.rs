//! One-step tabular Q-learning update

use qlearn_core::{RLError, Result, Transition};

use crate::q_table::QTable;

/// Q-learning (off-policy TD control) update rule
///
/// Q(s,a) ← Q(s,a) + α[r + γ max_a' Q(s',a') - Q(s,a)]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct QLearner {
    alpha: f64,
    gamma: f64,
}

impl QLearner {
    /// Create a learner
    ///
    /// # Arguments
    ///
    /// * `alpha` - learning rate, in `(0, 1]`
    /// * `gamma` - discount factor, in `[0, 1]`
    pub fn new(alpha: f64, gamma: f64) -> Result<Self> {
        if !(alpha > 0.0 && alpha <= 1.0) {
            return Err(RLError::InvalidConfig(format!(
                "alpha {alpha} outside (0, 1]"
            )));
        }
        if !(0.0..=1.0).contains(&gamma) {
            return Err(RLError::InvalidConfig(format!(
                "gamma {gamma} outside [0, 1]"
            )));
        }
        Ok(Self { alpha, gamma })
    }

    /// Learning rate
    #[must_use]
    pub fn alpha(&self) -> f64 {
        self.alpha
    }

    /// Discount factor
    #[must_use]
    pub fn gamma(&self) -> f64 {
        self.gamma
    }

    /// Apply one update and return the new value of the touched cell
    ///
    /// Exactly one cell changes. The `done` flag of the transition does
    /// not zero the bootstrap term.
    pub fn update(&self, table: &mut QTable, transition: &Transition) -> Result<f64> {
        let target =
            transition.reward.value() + self.gamma * table.best_value(transition.next_state)?;
        let predicted = table.get(transition.state, transition.action)?;
        let updated = predicted + self.alpha * (target - predicted);
        table.set(transition.state, transition.action, updated)?;

        tracing::trace!(
            state = transition.state,
            action = transition.action,
            td_error = target - predicted,
            value = updated,
            "q update"
        );
        Ok(updated)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn bellman_update_matches_hand_computation() {
        let mut table = QTable::new(12, 3);
        table.set(5, 0, 4.0).unwrap();
        table.set(5, 2, 1.0).unwrap();
        assert_eq!(table.best_value(5).unwrap(), 4.0);

        let learner = QLearner::new(0.5, 0.9).unwrap();
        let updated = learner
            .update(&mut table, &Transition::new(2, 1, 10.0, 5))
            .unwrap();

        assert_relative_eq!(updated, 6.8, epsilon = 1e-12);
        assert_eq!(table.get(2, 1).unwrap(), updated);
        assert_eq!(updated, 0.0 + 0.5 * ((10.0 + 0.9 * 4.0) - 0.0));
    }

    #[test]
    fn touches_exactly_one_cell() {
        let mut table = QTable::new(4, 3);
        table.set(3, 1, 2.0).unwrap();
        let before = table.clone();

        QLearner::new(0.1, 0.95)
            .unwrap()
            .update(&mut table, &Transition::new(0, 2, -1.0, 3))
            .unwrap();

        let changed: Vec<(usize, usize)> = before
            .values()
            .indexed_iter()
            .filter(|(idx, v)| table.values()[*idx] != **v)
            .map(|(idx, _)| idx)
            .collect();
        assert_eq!(changed, vec![(0, 2)]);
    }

    #[test]
    fn self_transition_uses_pre_update_values() {
        let mut table = QTable::new(1, 2);
        table.set(0, 0, 1.0).unwrap();
        let learner = QLearner::new(1.0, 0.5).unwrap();
        let updated = learner
            .update(&mut table, &Transition::new(0, 1, 2.0, 0))
            .unwrap();
        // target = 2 + 0.5 * 1.0
        assert_relative_eq!(updated, 2.5);
    }

    #[test]
    fn rejects_bad_hyperparameters() {
        assert!(QLearner::new(0.0, 0.9).is_err());
        assert!(QLearner::new(1.5, 0.9).is_err());
        assert!(QLearner::new(0.5, -0.1).is_err());
        assert!(QLearner::new(0.5, 1.1).is_err());
        assert!(QLearner::new(f64::NAN, 0.5).is_err());
        assert!(QLearner::new(1.0, 1.0).is_ok());
    }

    #[test]
    fn out_of_range_transition_is_an_error() {
        let mut table = QTable::new(2, 2);
        let learner = QLearner::new(0.5, 0.5).unwrap();
        assert!(learner
            .update(&mut table, &Transition::new(0, 0, 1.0, 2))
            .is_err());
        assert!(learner
            .update(&mut table, &Transition::new(0, 2, 1.0, 1))
            .is_err());
    }
}
