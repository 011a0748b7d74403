use async_trait::async_trait;
use ndarray::Array2;
use trellis_core::{
    Agent, Dataset, Environment, EpisodeInfo, EpisodeStart, FitCondition, MdpInfo, PolicyState,
    RLError, Result, Runner, Step, VectorEpisodeStart, VectorRunner,
};

/// Walks right from 0 until `length`, where it is absorbed with reward 1.
struct Corridor {
    info: MdpInfo,
    length: usize,
    position: usize,
}

impl Corridor {
    fn new(length: usize, horizon: usize) -> Self {
        Self {
            info: MdpInfo::discrete(length + 1, 2, 0.5, horizon),
            length,
            position: 0,
        }
    }
}

#[async_trait]
impl Environment for Corridor {
    type State = usize;
    type Action = usize;

    fn info(&self) -> &MdpInfo {
        &self.info
    }

    async fn reset(&mut self) -> Result<(usize, EpisodeInfo)> {
        self.position = 0;
        Ok((0, EpisodeInfo::new().with("length", self.length as f64)))
    }

    async fn step(&mut self, action: &usize) -> Result<Step<usize>> {
        if *action == 1 {
            self.position += 1;
        }
        let absorbing = self.position == self.length;
        Ok(Step {
            state: self.position,
            reward: if absorbing { 1.0 } else { 0.0 },
            absorbing,
        })
    }
}

/// Always moves right and records what the driver hands it.
#[derive(Default)]
struct Recorder {
    starts: usize,
    fits: Vec<(usize, usize)>,
    masks: Vec<Vec<bool>>,
    next_theta: f64,
    episodic: bool,
}

impl Agent for Recorder {
    type State = usize;
    type Action = usize;

    fn episode_start(&mut self, _state: &usize, _info: &EpisodeInfo) -> Result<EpisodeStart> {
        self.starts += 1;
        Ok(EpisodeStart {
            policy_state: None,
            theta: None,
        })
    }

    fn episode_start_vectorized(
        &mut self,
        states: &[usize],
        _infos: &[EpisodeInfo],
        start_mask: &[bool],
    ) -> Result<VectorEpisodeStart> {
        self.masks.push(start_mask.to_vec());
        let mut theta = Array2::zeros((states.len(), 1));
        for (slot, &restart) in start_mask.iter().enumerate() {
            if restart {
                self.next_theta += 1.0;
                theta[[slot, 0]] = self.next_theta;
            }
        }
        Ok(VectorEpisodeStart {
            policy_states: vec![None; states.len()],
            theta: Some(theta),
        })
    }

    fn draw_action(&mut self, _state: &usize, _ps: &PolicyState) -> Result<(usize, PolicyState)> {
        Ok((1, None))
    }

    fn draw_actions_vectorized(
        &mut self,
        states: &[usize],
        _ps: &[PolicyState],
    ) -> Result<(Vec<usize>, Vec<PolicyState>)> {
        Ok((vec![1; states.len()], vec![None; states.len()]))
    }

    fn fit(&mut self, dataset: &Dataset<usize, usize>) -> Result<()> {
        self.fits.push((dataset.n_episodes(), dataset.len()));
        Ok(())
    }

    fn is_episodic(&self) -> bool {
        self.episodic
    }
}

#[tokio::test]
async fn test_runner_fits_every_step() {
    let mut runner = Runner::new(Recorder::default(), Corridor::new(3, 100));
    runner.learn(FitCondition::Steps(1), 2).await.unwrap();

    let agent = runner.agent();
    assert_eq!(agent.starts, 2);
    assert_eq!(agent.fits.len(), 6);
    assert!(agent.fits.iter().all(|&(episodes, steps)| episodes == 1 && steps == 1));
}

#[tokio::test]
async fn test_step_chunks_stop_at_episode_end() {
    let mut runner = Runner::new(Recorder::default(), Corridor::new(3, 100));
    runner.learn(FitCondition::Steps(2), 2).await.unwrap();

    // every episode's tail is fitted before the next episode starts
    assert_eq!(runner.agent().fits, vec![(1, 2), (1, 1), (1, 2), (1, 1)]);
}

#[tokio::test]
async fn test_episodic_agent_rejects_step_fits() {
    let agent = Recorder {
        episodic: true,
        ..Recorder::default()
    };
    let mut runner = Runner::new(agent, Corridor::new(3, 100));
    assert!(matches!(
        runner.learn(FitCondition::Steps(1), 1).await,
        Err(RLError::InvalidParameter(_))
    ));
    assert_eq!(runner.agent().starts, 0);

    runner.learn(FitCondition::Episodes(1), 1).await.unwrap();
    assert_eq!(runner.agent().fits, vec![(1, 3)]);
}

#[tokio::test]
async fn test_runner_fits_every_episode_batch() {
    let mut runner = Runner::new(Recorder::default(), Corridor::new(2, 100));
    runner.learn(FitCondition::Episodes(2), 4).await.unwrap();
    assert_eq!(runner.agent().fits, vec![(2, 4), (2, 4)]);
}

#[tokio::test]
async fn test_evaluate_returns_discounted_episodes() {
    let mut runner = Runner::new(Recorder::default(), Corridor::new(3, 100));
    let dataset = runner.evaluate(2).await.unwrap();

    assert_eq!(dataset.n_episodes(), 2);
    // reward 1 on the third step, gamma = 0.5
    assert_eq!(dataset.discounted_return().to_vec(), vec![0.25, 0.25]);
    assert!(dataset.episodes().iter().all(|e| e.is_complete()));
    assert_eq!(dataset.episode_info().get("length"), Some(&[3.0, 3.0][..]));
}

#[tokio::test]
async fn test_horizon_truncates_without_absorbing() {
    let mut runner = Runner::new(Recorder::default(), Corridor::new(10, 4));
    let dataset = runner.evaluate(1).await.unwrap();

    let episode = &dataset.episodes()[0];
    assert_eq!(episode.len(), 4);
    let last = episode.transitions.last().unwrap();
    assert!(last.last);
    assert!(!last.absorbing);
}

#[tokio::test]
async fn test_learn_rejects_zero_condition() {
    let mut runner = Runner::new(Recorder::default(), Corridor::new(1, 10));
    assert!(runner.learn(FitCondition::Episodes(0), 1).await.is_err());
}

#[tokio::test]
async fn test_vector_runner_restarts_slots_independently() {
    let envs = vec![Corridor::new(1, 100), Corridor::new(3, 100)];
    let mut runner = VectorRunner::new(Recorder::default(), envs).unwrap();
    let dataset = runner.evaluate(4).await.unwrap();

    assert_eq!(dataset.n_episodes(), 4);
    let masks = &runner.agent().masks;
    assert_eq!(masks[0], vec![true, true]);
    // the short corridor restarts alone while the long one is mid-episode
    assert_eq!(masks[1], vec![true, false]);
    assert!(masks.iter().skip(1).all(|m| m.iter().filter(|&&r| r).count() == 1));

    // each episode keeps the theta its slot was started with
    let thetas: Vec<f64> = dataset
        .episodes()
        .iter()
        .map(|e| e.theta.as_ref().unwrap()[0])
        .collect();
    let mut sorted = thetas.clone();
    sorted.sort_by(f64::total_cmp);
    sorted.dedup();
    assert_eq!(sorted.len(), 4);
}

#[tokio::test]
async fn test_vector_runner_fits_per_episode_batch() {
    let envs = vec![Corridor::new(1, 100), Corridor::new(2, 100), Corridor::new(2, 100)];
    let mut runner = VectorRunner::new(Recorder::default(), envs).unwrap();
    runner.learn(6, 3).await.unwrap();

    let fits = &runner.agent().fits;
    assert_eq!(fits.len(), 2);
    assert!(fits.iter().all(|&(episodes, _)| episodes == 3));
}

#[tokio::test]
async fn test_vector_runner_uses_fewer_slots_than_envs_when_quota_is_small() {
    let envs = vec![Corridor::new(1, 100), Corridor::new(1, 100), Corridor::new(1, 100)];
    let mut runner = VectorRunner::new(Recorder::default(), envs).unwrap();
    let dataset = runner.evaluate(2).await.unwrap();

    assert_eq!(dataset.n_episodes(), 2);
    assert_eq!(runner.agent().masks[0].len(), 2);
}

#[test]
fn test_vector_runner_needs_envs() {
    let envs: Vec<Corridor> = Vec::new();
    assert!(VectorRunner::new(Recorder::default(), envs).is_err());
}
