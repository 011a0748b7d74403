#![allow(dead_code)]

use async_trait::async_trait;
use ndarray::{arr1, Array1};
use trellis_core::{BoxSpace, DiscreteSpace, Environment, EpisodeInfo, MdpInfo, Result, Space, Step};

/// Finite chain: action 1 moves right, action 0 moves left (clamped at 0).
/// Reaching the last cell is absorbing with reward 1.
pub struct Chain {
    info: MdpInfo,
    length: usize,
    position: usize,
}

impl Chain {
    pub fn new(length: usize, horizon: usize) -> Self {
        Self {
            info: MdpInfo::new(
                Space::Discrete(DiscreteSpace::new(length + 1)),
                Space::Discrete(DiscreteSpace::new(2)),
                0.9,
                horizon,
            ),
            length,
            position: 0,
        }
    }
}

#[async_trait]
impl Environment for Chain {
    type State = usize;
    type Action = usize;

    fn info(&self) -> &MdpInfo {
        &self.info
    }

    async fn reset(&mut self) -> Result<(usize, EpisodeInfo)> {
        self.position = 0;
        Ok((0, EpisodeInfo::new()))
    }

    async fn step(&mut self, action: &usize) -> Result<Step<usize>> {
        if *action == 1 {
            self.position += 1;
        } else {
            self.position = self.position.saturating_sub(1);
        }
        let absorbing = self.position == self.length;
        Ok(Step {
            state: self.position,
            reward: if absorbing { 1.0 } else { 0.0 },
            absorbing,
        })
    }
}

/// Single-action line: every step moves right, the last cell is absorbing
/// with reward 1.
pub struct Line {
    info: MdpInfo,
    length: usize,
    position: usize,
}

impl Line {
    pub fn new(length: usize) -> Self {
        Self {
            info: MdpInfo::discrete(length + 1, 1, 0.9, 100),
            length,
            position: 0,
        }
    }
}

#[async_trait]
impl Environment for Line {
    type State = usize;
    type Action = usize;

    fn info(&self) -> &MdpInfo {
        &self.info
    }

    async fn reset(&mut self) -> Result<(usize, EpisodeInfo)> {
        self.position = 0;
        Ok((0, EpisodeInfo::new()))
    }

    async fn step(&mut self, _action: &usize) -> Result<Step<usize>> {
        self.position += 1;
        let absorbing = self.position == self.length;
        Ok(Step {
            state: self.position,
            reward: if absorbing { 1.0 } else { 0.0 },
            absorbing,
        })
    }
}

/// One-step task rewarding `-(a - target)²`. The state is the constant
/// feature vector `[1]`.
pub struct Quadratic {
    info: MdpInfo,
    target: f64,
}

impl Quadratic {
    pub fn new(target: f64) -> Self {
        let boxed = |lo: f64, hi: f64| Space::Box(BoxSpace::new(vec![lo], vec![hi]).unwrap());
        Self {
            info: MdpInfo::new(boxed(1.0, 1.0), boxed(-10.0, 10.0), 1.0, 1),
            target,
        }
    }
}

#[async_trait]
impl Environment for Quadratic {
    type State = Array1<f64>;
    type Action = Array1<f64>;

    fn info(&self) -> &MdpInfo {
        &self.info
    }

    async fn reset(&mut self) -> Result<(Array1<f64>, EpisodeInfo)> {
        Ok((arr1(&[1.0]), EpisodeInfo::new()))
    }

    async fn step(&mut self, action: &Array1<f64>) -> Result<Step<Array1<f64>>> {
        let error = action[0] - self.target;
        Ok(Step {
            state: arr1(&[1.0]),
            reward: -error * error,
            absorbing: true,
        })
    }
}

/// One-step task whose target depends on the initial state `[c, 1]`:
/// the reward is `-(a - (2c + 1))²`, with `c` cycling through -1, 0, 1.
pub struct ContextualTarget {
    info: MdpInfo,
    episode: usize,
    context: f64,
}

impl ContextualTarget {
    pub fn new() -> Self {
        Self {
            info: MdpInfo::new(
                Space::Box(BoxSpace::new(vec![-1.0, 1.0], vec![1.0, 1.0]).unwrap()),
                Space::Box(BoxSpace::new(vec![-10.0], vec![10.0]).unwrap()),
                1.0,
                1,
            ),
            episode: 0,
            context: 0.0,
        }
    }
}

#[async_trait]
impl Environment for ContextualTarget {
    type State = Array1<f64>;
    type Action = Array1<f64>;

    fn info(&self) -> &MdpInfo {
        &self.info
    }

    async fn reset(&mut self) -> Result<(Array1<f64>, EpisodeInfo)> {
        self.context = [-1.0, 0.0, 1.0][self.episode % 3];
        self.episode += 1;
        Ok((
            arr1(&[self.context, 1.0]),
            EpisodeInfo::new().with("context", self.context),
        ))
    }

    async fn step(&mut self, action: &Array1<f64>) -> Result<Step<Array1<f64>>> {
        let error = action[0] - (2.0 * self.context + 1.0);
        Ok(Step {
            state: arr1(&[self.context, 1.0]),
            reward: -error * error,
            absorbing: true,
        })
    }
}
