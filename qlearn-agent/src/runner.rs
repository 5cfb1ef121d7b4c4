//! Episode driver: ties policy, learner and table to an environment
//!
//! Each episode walks `START -> RUNNING -> (TERMINAL | STEP_BUDGET_EXHAUSTED)`.
//! The table and the random source live across episodes; the reward and
//! step accumulators are per episode.

use std::path::PathBuf;

use qlearn_core::{
    ActionCatalog, Environment, Episode, EpisodeOutcome, RLError, Result, StateCodec, Step,
    Transition,
};
use rand::{rngs::StdRng, SeedableRng};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::{
    config::{InitialObservation, RunConfig, RunMode},
    learner::QLearner,
    policy::EpsilonGreedy,
    q_table::QTable,
    schedule::Schedule,
};

/// Aggregate statistics of a run
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RunSummary {
    /// Mode the run used
    pub mode: RunMode,
    /// Per-episode records in order
    pub episodes: Vec<Episode>,
    /// Sum of all episode rewards
    pub total_reward: f64,
    /// Sum of all episode steps
    pub total_steps: usize,
    /// Episodes that ended on the terminal rule
    pub terminal_count: usize,
    /// Table location when the run saved it
    pub saved_to: Option<PathBuf>,
}

impl RunSummary {
    fn record(&mut self, episode: Episode) {
        self.total_reward += episode.total_reward;
        self.total_steps += episode.steps;
        if episode.reached_terminal() {
            self.terminal_count += 1;
        }
        self.episodes.push(episode);
    }

    /// Mean episode reward
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn mean_reward(&self) -> f64 {
        if self.episodes.is_empty() {
            0.0
        } else {
            self.total_reward / self.episodes.len() as f64
        }
    }
}

/// Runs episodes of epsilon-greedy Q-learning against an environment
pub struct EpisodeDriver<E> {
    env: E,
    config: RunConfig,
    codec: StateCodec,
    catalog: ActionCatalog,
    table: QTable,
    policy: EpsilonGreedy,
    learner: QLearner,
    schedule: Box<dyn Schedule>,
    rng: StdRng,
}

impl<E: Environment> EpisodeDriver<E> {
    /// Build a driver, loading or creating the table according to the mode
    pub async fn open(env: E, config: RunConfig) -> Result<Self> {
        config.validate()?;
        let table = if config.mode.loads_table() {
            let table =
                QTable::load(&config.table_path, config.num_states, config.actions.len()).await?;
            info!(path = %config.table_path.display(), "loaded q-table");
            table
        } else {
            QTable::new(config.num_states, config.actions.len())
        };
        Self::with_table(env, config, table)
    }

    /// Build a driver around an existing table
    pub fn with_table(env: E, config: RunConfig, table: QTable) -> Result<Self> {
        config.validate()?;
        if table.num_states() != config.num_states {
            return Err(RLError::DimensionMismatch {
                expected: config.num_states,
                actual: table.num_states(),
            });
        }
        if table.num_actions() != config.actions.len() {
            return Err(RLError::DimensionMismatch {
                expected: config.actions.len(),
                actual: table.num_actions(),
            });
        }

        let rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };

        Ok(Self {
            codec: config.codec()?,
            catalog: config.actions.clone(),
            policy: EpsilonGreedy::new(config.epsilon)?,
            learner: QLearner::new(config.alpha, config.gamma)?,
            schedule: config.epsilon_schedule.build(config.epsilon),
            env,
            config,
            table,
            rng,
        })
    }

    /// Current table
    pub fn table(&self) -> &QTable {
        &self.table
    }

    /// The environment
    pub fn env(&self) -> &E {
        &self.env
    }

    /// Run all configured episodes, then save unless evaluating
    ///
    /// The first error aborts the run; checkpoints already written stay.
    pub async fn run(&mut self) -> Result<RunSummary> {
        info!(
            mode = ?self.config.mode,
            episodes = self.config.num_episodes,
            max_steps = self.config.max_steps_per_episode,
            states = self.config.num_states,
            actions = self.catalog.len(),
            "starting run"
        );

        let mut summary = RunSummary {
            mode: self.config.mode,
            ..RunSummary::default()
        };
        let learns = self.config.mode.learns();

        for index in 0..self.config.num_episodes {
            let episode = self.run_episode(index).await?;
            let ordinal = index + 1;

            if ordinal % self.config.log_interval == 0 || ordinal == self.config.num_episodes {
                let terminal_count =
                    summary.terminal_count + usize::from(episode.reached_terminal());
                info!(
                    episode = ordinal,
                    reward = episode.total_reward,
                    steps = episode.steps,
                    outcome = ?episode.outcome,
                    epsilon = episode.epsilon,
                    terminal_count,
                    "episode finished"
                );
            }
            summary.record(episode);

            if let Some(interval) = self.config.checkpoint_interval {
                if learns && ordinal % interval == 0 && ordinal != self.config.num_episodes {
                    self.persist().await?;
                }
            }
        }

        if learns {
            self.persist().await?;
            summary.saved_to = Some(self.config.table_path.clone());
        }

        info!(
            total_reward = summary.total_reward,
            mean_reward = summary.mean_reward(),
            total_steps = summary.total_steps,
            terminal_count = summary.terminal_count,
            "run complete"
        );
        Ok(summary)
    }

    /// Play a single episode
    pub async fn run_episode(&mut self, index: usize) -> Result<Episode> {
        let epsilon = self.schedule.value(index);
        self.policy.set_epsilon(epsilon);
        let mut episode = Episode::begin(index, epsilon);

        // START
        let first = self.initial_step().await?;
        episode.total_reward += first.reward.value();
        let mut state = self.codec.decode(&first.state)?;
        debug!(episode = index, state, reward = first.reward.value(), "initial observation");

        if self.config.terminal.is_terminal(first.done, first.reward) {
            episode.finish(EpisodeOutcome::Terminal);
            return Ok(episode);
        }

        // RUNNING
        let mut outcome = EpisodeOutcome::StepBudgetExhausted;
        while episode.steps < self.config.max_steps_per_episode {
            let action = self.policy.select(&self.table, state, &mut self.rng)?;
            let label = self.catalog.label(action)?;
            let step = self.env.step(label).await?;

            let next_state = self.codec.decode(&step.state)?;
            let done = self.config.terminal.is_terminal(step.done, step.reward);

            if self.config.mode.learns() {
                let transition = Transition {
                    state,
                    action,
                    reward: step.reward,
                    next_state,
                    done,
                };
                self.learner.update(&mut self.table, &transition)?;
            }

            episode.total_reward += step.reward.value();
            episode.steps += 1;
            debug!(
                episode = index,
                step = episode.steps,
                state,
                action = label,
                reward = step.reward.value(),
                next_state,
                done,
                "step"
            );

            state = next_state;
            if done {
                outcome = EpisodeOutcome::Terminal;
                break;
            }
        }

        episode.finish(outcome);
        Ok(episode)
    }

    /// Write the table to `table_path`
    pub async fn persist(&self) -> Result<()> {
        self.table.save(&self.config.table_path).await?;
        info!(path = %self.config.table_path.display(), "saved q-table");
        Ok(())
    }

    /// Close the environment connection
    pub async fn close(&mut self) -> Result<()> {
        self.env.close().await
    }

    async fn initial_step(&mut self) -> Result<Step> {
        match &self.config.initial_observation {
            InitialObservation::Action { label } => self.env.step(label).await,
            InitialObservation::Random => {
                let action = self.catalog.sample(&mut self.rng);
                let label = self.catalog.label(action)?;
                self.env.step(label).await
            }
            InitialObservation::Reset => self.env.reset().await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;
    use std::path::Path;

    use async_trait::async_trait;

    use crate::config::TerminalRule;

    /// Replays canned observations and records what was sent
    #[derive(Default)]
    struct ScriptedEnv {
        script: VecDeque<Step>,
        sent: Vec<String>,
        resets: usize,
        closed: bool,
    }

    impl ScriptedEnv {
        fn new(script: impl IntoIterator<Item = Step>) -> Self {
            Self {
                script: script.into_iter().collect(),
                ..Self::default()
            }
        }

        fn next(&mut self) -> Result<Step> {
            self.script
                .pop_front()
                .ok_or_else(|| RLError::Connection("script exhausted".to_string()))
        }
    }

    #[async_trait]
    impl Environment for ScriptedEnv {
        async fn reset(&mut self) -> Result<Step> {
            self.resets += 1;
            self.next()
        }

        async fn step(&mut self, action: &str) -> Result<Step> {
            self.sent.push(action.to_string());
            self.next()
        }

        async fn close(&mut self) -> Result<()> {
            self.closed = true;
            Ok(())
        }
    }

    fn bits(index: usize) -> String {
        format!("{index:09b}")
    }

    fn obs(index: usize, reward: f64) -> Step {
        Step::new(bits(index), reward)
    }

    fn config(dir: &Path) -> RunConfig {
        RunConfig {
            num_states: 12,
            num_episodes: 1,
            max_steps_per_episode: 3,
            epsilon: 0.0,
            alpha: 0.5,
            gamma: 0.9,
            table_path: dir.join("q.txt"),
            seed: Some(7),
            ..RunConfig::default()
        }
    }

    fn driver(env: ScriptedEnv, config: RunConfig) -> EpisodeDriver<ScriptedEnv> {
        let table = QTable::new(config.num_states, config.actions.len());
        EpisodeDriver::with_table(env, config, table).unwrap()
    }

    #[tokio::test]
    async fn stops_at_step_cap_and_counts_initial_reward() {
        let dir = tempfile::tempdir().unwrap();
        let env = ScriptedEnv::new([
            obs(0, 1.0),
            obs(1, 2.0),
            obs(2, 3.0),
            obs(3, 4.0),
            obs(4, 99.0),
        ]);
        let mut driver = driver(env, config(dir.path()));

        let episode = driver.run_episode(0).await.unwrap();

        assert_eq!(episode.steps, 3);
        assert_eq!(episode.outcome, EpisodeOutcome::StepBudgetExhausted);
        assert_eq!(episode.total_reward, 10.0);
        assert_eq!(driver.env().sent.len(), 4);
        assert_eq!(driver.env().sent[0], "jump");
        assert_eq!(driver.env().script.len(), 1);
    }

    #[tokio::test]
    async fn stops_when_environment_reports_done() {
        let dir = tempfile::tempdir().unwrap();
        let env = ScriptedEnv::new([
            obs(0, -1.0),
            obs(1, -1.0),
            obs(2, 50.0).terminal(),
            obs(3, 7.0),
        ]);
        let mut driver = driver(env, config(dir.path()));

        let episode = driver.run_episode(0).await.unwrap();

        assert_eq!(episode.steps, 2);
        assert!(episode.reached_terminal());
        assert_eq!(episode.total_reward, 48.0);
        assert_eq!(driver.env().script.len(), 1);
    }

    #[tokio::test]
    async fn stops_on_reward_threshold() {
        let dir = tempfile::tempdir().unwrap();
        let config = RunConfig {
            max_steps_per_episode: 10,
            terminal: TerminalRule {
                use_done_flag: false,
                reward_threshold: Some(300.0),
            },
            ..config(dir.path())
        };
        let env = ScriptedEnv::new([
            obs(0, 0.0),
            obs(1, -14.0),
            obs(5, 300.0).terminal(),
            obs(6, 0.0),
        ]);
        let mut driver = driver(env, config);

        let episode = driver.run_episode(0).await.unwrap();
        assert_eq!(episode.steps, 2);
        assert_eq!(episode.outcome, EpisodeOutcome::Terminal);
        assert_eq!(episode.total_reward, 286.0);
    }

    #[tokio::test]
    async fn terminal_initial_observation_takes_no_steps() {
        let dir = tempfile::tempdir().unwrap();
        let env = ScriptedEnv::new([obs(3, 5.0).terminal()]);
        let mut driver = driver(env, config(dir.path()));

        let episode = driver.run_episode(0).await.unwrap();
        assert_eq!(episode.steps, 0);
        assert_eq!(episode.outcome, EpisodeOutcome::Terminal);
        assert_eq!(episode.total_reward, 5.0);
    }

    #[tokio::test]
    async fn greedy_step_updates_table() {
        let dir = tempfile::tempdir().unwrap();
        let config = RunConfig {
            max_steps_per_episode: 1,
            ..config(dir.path())
        };
        let env = ScriptedEnv::new([obs(2, 0.0), obs(5, 10.0)]);
        let mut driver = driver(env, config);

        driver.run_episode(0).await.unwrap();

        // zero table: greedy pick is action 0 ("left")
        assert_eq!(driver.env().sent, vec!["jump", "left"]);
        assert_eq!(driver.table().get(2, 0).unwrap(), 5.0);
    }

    #[tokio::test]
    async fn fresh_run_saves_table_and_aggregates() {
        let dir = tempfile::tempdir().unwrap();
        let config = RunConfig {
            num_episodes: 2,
            max_steps_per_episode: 2,
            ..config(dir.path())
        };
        let path = config.table_path.clone();
        let env = ScriptedEnv::new([
            obs(0, 1.0),
            obs(1, 1.0),
            obs(2, 1.0).terminal(),
            obs(0, 2.0),
            obs(4, 2.0),
            obs(8, 2.0),
        ]);
        let mut driver = driver(env, config);

        let summary = driver.run().await.unwrap();

        assert_eq!(summary.episodes.len(), 2);
        assert_eq!(summary.terminal_count, 1);
        assert_eq!(summary.total_steps, 4);
        assert_eq!(summary.total_reward, 9.0);
        assert_eq!(summary.saved_to.as_deref(), Some(path.as_path()));

        let saved = QTable::load(&path, 12, 3).await.unwrap();
        assert_eq!(&saved, driver.table());
        assert_ne!(saved, QTable::new(12, 3));
    }

    #[tokio::test]
    async fn evaluate_mode_neither_learns_nor_saves() {
        let dir = tempfile::tempdir().unwrap();
        let mut table = QTable::new(12, 3);
        table.set(0, 2, 1.0).unwrap();
        let config = RunConfig {
            mode: RunMode::Evaluate,
            max_steps_per_episode: 2,
            ..config(dir.path())
        };
        let path = config.table_path.clone();
        let env = ScriptedEnv::new([obs(0, 0.0), obs(0, 50.0), obs(0, 50.0)]);
        let mut driver = EpisodeDriver::with_table(env, config, table.clone()).unwrap();

        let summary = driver.run().await.unwrap();

        assert_eq!(driver.table(), &table);
        assert_eq!(driver.env().sent, vec!["jump", "jump", "jump"]);
        assert!(summary.saved_to.is_none());
        assert!(!path.exists());
    }

    #[tokio::test]
    async fn resume_loads_table_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let config = RunConfig {
            mode: RunMode::Resume,
            ..config(dir.path())
        };
        let mut table = QTable::new(12, 3);
        table.set(11, 1, 3.25).unwrap();
        table.save(&config.table_path).await.unwrap();

        let driver = EpisodeDriver::open(ScriptedEnv::default(), config).await.unwrap();
        assert_eq!(driver.table(), &table);
    }

    #[tokio::test]
    async fn resume_without_table_fails() {
        let dir = tempfile::tempdir().unwrap();
        let config = RunConfig {
            mode: RunMode::Resume,
            ..config(dir.path())
        };
        let result = EpisodeDriver::open(ScriptedEnv::default(), config).await;
        assert!(matches!(result, Err(RLError::Io(_))));
    }

    #[tokio::test]
    async fn resume_with_wrong_shape_fails() {
        let dir = tempfile::tempdir().unwrap();
        let config = RunConfig {
            mode: RunMode::Resume,
            ..config(dir.path())
        };
        QTable::new(12, 2).save(&config.table_path).await.unwrap();
        let result = EpisodeDriver::open(ScriptedEnv::default(), config).await;
        assert!(matches!(result, Err(RLError::MalformedTable { .. })));
    }

    #[tokio::test]
    async fn reset_strategy_uses_dedicated_reset() {
        let dir = tempfile::tempdir().unwrap();
        let config = RunConfig {
            initial_observation: InitialObservation::Reset,
            max_steps_per_episode: 1,
            ..config(dir.path())
        };
        let env = ScriptedEnv::new([obs(0, 0.0), obs(1, 0.0)]);
        let mut driver = driver(env, config);

        driver.run_episode(0).await.unwrap();
        assert_eq!(driver.env().resets, 1);
        assert_eq!(driver.env().sent, vec!["left"]);
    }

    #[tokio::test]
    async fn random_strategy_sends_catalog_action() {
        let dir = tempfile::tempdir().unwrap();
        let config = RunConfig {
            initial_observation: InitialObservation::Random,
            max_steps_per_episode: 0,
            ..config(dir.path())
        };
        let env = ScriptedEnv::new([obs(0, 0.0)]);
        let mut driver = driver(env, config);

        driver.run_episode(0).await.unwrap();
        let sent = &driver.env().sent;
        assert_eq!(sent.len(), 1);
        assert!(ActionCatalog::default().index(&sent[0]).is_ok());
    }

    #[tokio::test]
    async fn environment_failure_aborts_run() {
        let dir = tempfile::tempdir().unwrap();
        let config = RunConfig {
            num_episodes: 3,
            ..config(dir.path())
        };
        let path = config.table_path.clone();
        let env = ScriptedEnv::new([obs(0, 0.0), obs(1, 0.0)]);
        let mut driver = driver(env, config);

        let result = driver.run().await;
        assert!(matches!(result, Err(RLError::Connection(_))));
        assert!(!path.exists());
    }

    #[tokio::test]
    async fn out_of_range_state_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let env = ScriptedEnv::new([obs(12, 0.0)]);
        let mut driver = driver(env, config(dir.path()));

        let result = driver.run_episode(0).await;
        assert!(matches!(result, Err(RLError::InvalidState(_))));
    }

    #[tokio::test]
    async fn checkpoint_survives_failure_in_later_episode() {
        let dir = tempfile::tempdir().unwrap();
        let config = RunConfig {
            num_episodes: 3,
            max_steps_per_episode: 1,
            checkpoint_interval: Some(1),
            ..config(dir.path())
        };
        let path = config.table_path.clone();
        // third episode gets its first observation, then the script runs dry
        let env = ScriptedEnv::new([
            obs(0, 0.0),
            obs(1, 10.0),
            obs(0, 0.0),
            obs(2, 4.0),
            obs(0, 0.0),
        ]);
        let mut driver = driver(env, config);

        let result = driver.run().await;
        assert!(matches!(result, Err(RLError::Connection(_))));
        assert!(path.exists());

        let saved = QTable::load(&path, 12, 3).await.unwrap();
        assert_eq!(&saved, driver.table());
        // 5.0 after the first episode, then 5.0 + 0.5 * (4.0 - 5.0)
        assert_eq!(saved.get(0, 0).unwrap(), 4.5);

        driver.close().await.unwrap();
        assert!(driver.env().closed);
    }

    #[tokio::test]
    async fn random_source_carries_across_episodes() {
        let dir = tempfile::tempdir().unwrap();
        let config = RunConfig {
            epsilon: 1.0,
            max_steps_per_episode: 20,
            ..config(dir.path())
        };
        let script = || (0..42).map(|_| obs(0, 0.0)).collect::<Vec<_>>();

        let mut first = driver(ScriptedEnv::new(script()), config.clone());
        first.run_episode(0).await.unwrap();
        first.run_episode(1).await.unwrap();
        let sent = &first.env().sent;
        assert_eq!(sent.len(), 42);

        let mut replay = driver(ScriptedEnv::new(script()), config);
        replay.run_episode(0).await.unwrap();
        let first_only = &replay.env().sent;

        assert_eq!(&sent[..21], &first_only[..]);
        assert_ne!(&sent[21..], &first_only[..]);
    }

    #[test]
    fn rejects_table_of_wrong_shape() {
        let dir = tempfile::tempdir().unwrap();
        let result = EpisodeDriver::with_table(
            ScriptedEnv::default(),
            config(dir.path()),
            QTable::new(12, 4),
        );
        assert!(matches!(
            result,
            Err(RLError::DimensionMismatch { expected: 3, actual: 4 })
        ));
    }
}
