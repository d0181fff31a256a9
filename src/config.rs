/// Agent configuration. Agents are described by short specs such as `random`, `simple-max`,
/// `minimax:9` or `mcts:2000`; the number after the colon is the search depth or rollout budget,
/// must be at least 1, and falls back to the agent's default when left out.

use std::fmt;
use std::str::FromStr;

use rand::rngs::StdRng;

use crate::agents::{
    GameAgent, MinimaxAgent, MinimaxConfig, MonteCarloAgent, MonteCarloConfig, RandomAgent,
    SimpleMaxAgent,
};
use crate::error::{Error, Result};
use crate::game_state::GameState;

/// Which algorithm an agent runs, and its parameters.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum AgentKind {
    Random,
    SimpleMax,
    Minimax(MinimaxConfig),
    MonteCarlo(MonteCarloConfig),
}

impl AgentKind {
    /// Build an agent of this kind playing for `player`. Only the random and Monte Carlo agents
    /// draw from `rng`.
    pub fn build<S: GameState + 'static>(
        &self,
        init_state: S,
        player: S::Player,
        rng: StdRng,
    ) -> Box<dyn GameAgent<S>> {
        match *self {
            AgentKind::Random => Box::new(
                RandomAgent::new(init_state)
                    .with_player(player)
                    .with_rng(rng),
            ),
            AgentKind::SimpleMax => Box::new(SimpleMaxAgent::new(init_state).with_player(player)),
            AgentKind::Minimax(config) => {
                Box::new(MinimaxAgent::with_config(init_state, config).with_player(player))
            }
            AgentKind::MonteCarlo(config) => Box::new(
                MonteCarloAgent::with_config(init_state, config)
                    .with_player(player)
                    .with_rng(rng),
            ),
        }
    }
}

impl FromStr for AgentKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<AgentKind> {
        let spec = s.trim().to_lowercase();
        let (name, param) = match spec.find(':') {
            Some(idx) => (&spec[..idx], Some(&spec[idx + 1..])),
            None => (spec.as_str(), None),
        };

        let parse_param = |value: &str| match value.parse::<usize>() {
            Ok(n) if n > 0 => Ok(n),
            _ => Err(Error::InvalidParameter {
                agent: name.to_string(),
                value: value.to_string(),
            }),
        };

        match (name, param) {
            ("random", None) => Ok(AgentKind::Random),
            ("simple-max", None) | ("simplemax", None) => Ok(AgentKind::SimpleMax),
            ("minimax", param) => {
                let mut config = MinimaxConfig::default();
                if let Some(depth) = param {
                    config.max_depth = parse_param(depth)?;
                }
                Ok(AgentKind::Minimax(config))
            }
            ("mcts", param) | ("monte-carlo", param) => {
                let mut config = MonteCarloConfig::default();
                if let Some(rollouts) = param {
                    config.rollouts = parse_param(rollouts)?;
                }
                Ok(AgentKind::MonteCarlo(config))
            }
            ("random", Some(value)) | ("simple-max", Some(value)) | ("simplemax", Some(value)) => {
                Err(Error::InvalidParameter {
                    agent: name.to_string(),
                    value: value.to_string(),
                })
            }
            _ => Err(Error::UnknownAgent {
                name: s.to_string(),
            }),
        }
    }
}

impl fmt::Display for AgentKind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            AgentKind::Random => write!(f, "random"),
            AgentKind::SimpleMax => write!(f, "simple-max"),
            AgentKind::Minimax(config) => write!(f, "minimax:{}", config.max_depth),
            AgentKind::MonteCarlo(config) => write!(f, "mcts:{}", config.rollouts),
        }
    }
}

#[cfg(test)]
mod tests {
    use rand::SeedableRng;

    use super::*;
    use crate::tictactoe::Player::{O, X};
    use crate::tictactoe::TicTacToeBoard;

    #[test]
    fn test_parse_agent_kinds() {
        assert_eq!("random".parse::<AgentKind>(), Ok(AgentKind::Random));
        assert_eq!(" Simple-Max ".parse::<AgentKind>(), Ok(AgentKind::SimpleMax));
        assert_eq!(
            "minimax".parse::<AgentKind>(),
            Ok(AgentKind::Minimax(MinimaxConfig::default()))
        );

        match "minimax:4".parse::<AgentKind>() {
            Ok(AgentKind::Minimax(config)) => {
                assert_eq!(config.max_depth, 4);
                assert!(config.pruning);
            }
            other => panic!("unexpected {:?}", other),
        }

        match "mcts:250".parse::<AgentKind>() {
            Ok(AgentKind::MonteCarlo(config)) => {
                assert_eq!(config.rollouts, 250);
                assert_eq!(
                    config.exploration_constant,
                    MonteCarloConfig::default().exploration_constant
                );
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_parse_errors() {
        assert_eq!(
            "alphazero".parse::<AgentKind>(),
            Err(Error::UnknownAgent {
                name: "alphazero".to_string()
            })
        );
        assert_eq!(
            "minimax:deep".parse::<AgentKind>(),
            Err(Error::InvalidParameter {
                agent: "minimax".to_string(),
                value: "deep".to_string()
            })
        );
        assert!("random:3".parse::<AgentKind>().is_err());
        assert!("mcts:-1".parse::<AgentKind>().is_err());
    }

    #[test]
    fn test_zero_depth_and_budget_are_rejected() {
        assert_eq!(
            "minimax:0".parse::<AgentKind>(),
            Err(Error::InvalidParameter {
                agent: "minimax".to_string(),
                value: "0".to_string()
            })
        );
        assert_eq!(
            "mcts:0".parse::<AgentKind>(),
            Err(Error::InvalidParameter {
                agent: "mcts".to_string(),
                value: "0".to_string()
            })
        );
        assert!("minimax:1".parse::<AgentKind>().is_ok());
    }

    #[test]
    fn test_display_parses_back() {
        for spec in &["random", "simple-max", "minimax:3", "mcts:100"] {
            let kind: AgentKind = spec.parse().unwrap();
            assert_eq!(kind.to_string(), *spec);
            assert_eq!(kind.to_string().parse::<AgentKind>(), Ok(kind));
        }
    }

    #[test]
    fn test_build_seats_the_player() {
        let board = TicTacToeBoard::new(3);
        for spec in &["random", "simple-max", "minimax:2", "mcts:20"] {
            let kind: AgentKind = spec.parse().unwrap();
            let agent = kind.build(board.clone(), O, StdRng::seed_from_u64(1));
            assert_eq!(agent.player(), O);
            assert_eq!(agent.current_state(), &board);

            let mut agent = kind.build(board.clone(), X, StdRng::seed_from_u64(1));
            let action = agent.get_next_action().unwrap();
            assert!(board.legal_actions().contains(&action));
        }
    }
}
