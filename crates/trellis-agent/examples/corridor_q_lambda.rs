//! Example: Q(λ) and SARSA(λ) walking a corridor
//!
//! Run with `RUST_LOG=trellis_agent=debug` to see per-fit updates.

use async_trait::async_trait;
use tracing_subscriber::EnvFilter;
use trellis_agent::prelude::*;
use trellis_agent::ConstantRate;
use trellis_core::{DiscreteSpace, FitCondition, Runner, Space, Step, TraceKind};

/// Corridor of `length` cells; action 1 steps right, action 0 steps left.
/// Each step costs 0.01 and the far end pays 1.
struct Corridor {
    info: MdpInfo,
    length: usize,
    position: usize,
}

impl Corridor {
    fn new(length: usize) -> Self {
        Self {
            info: MdpInfo::new(
                Space::Discrete(DiscreteSpace::new(length + 1)),
                Space::Discrete(DiscreteSpace::new(2)),
                0.95,
                100,
            ),
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

    async fn reset(&mut self) -> trellis_core::Result<(usize, EpisodeInfo)> {
        self.position = 0;
        Ok((0, EpisodeInfo::new()))
    }

    async fn step(&mut self, action: &usize) -> trellis_core::Result<Step<usize>> {
        self.position = if *action == 1 {
            self.position + 1
        } else {
            self.position.saturating_sub(1)
        };
        let absorbing = self.position == self.length;
        Ok(Step {
            state: self.position,
            reward: if absorbing { 1.0 } else { -0.01 },
            absorbing,
        })
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let env = Corridor::new(8);
    let info = env.info().clone();

    // Q(λ) with a fixed exploration rate
    let agent = QLearningLambda::new(
        &info,
        Box::new(EpsGreedy::new(0.1)),
        Box::new(ConstantRate(0.2)),
        0.9,
        TraceKind::Replacing,
    )?
    .with_seed(42);
    let mut runner = Runner::new(agent, env);

    for round in 1..=5 {
        runner.learn(FitCondition::Steps(1), 20).await?;
        if let Some(summary) = runner.evaluate(10).await?.returns_summary() {
            println!(
                "Q(λ) round {}: mean return = {:.3}, best = {:.3}",
                round, summary.mean, summary.max
            );
        }
    }

    // SARSA(λ) configured from JSON with a decaying epsilon
    let config = QLambdaConfig::from_json(
        r#"{
            "lambda_coef": 0.9,
            "trace": "accumulating",
            "learning_rate": {"type": "constant", "value": 0.1},
            "epsilon": {
                "type": "exponential",
                "start": 0.5,
                "min_value": 0.01,
                "decay_rate": 0.999
            },
            "seed": 7
        }"#,
    )?;
    let agent = SarsaLambda::from_config(&info, &config)?;
    let mut runner = Runner::new(agent, Corridor::new(8));
    runner.learn(FitCondition::Episodes(1), 100).await?;

    let q = runner.agent().q_table();
    println!("\nSARSA(λ) greedy actions:");
    for state in 0..8 {
        println!("  cell {}: {:?}", state, q.argmax(state));
    }

    Ok(())
}
