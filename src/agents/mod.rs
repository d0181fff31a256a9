/// Agents that choose actions for any game implementing `GameState`.
mod mcts_agent;
mod minimax_agent;

pub use mcts_agent::{FinalSelection, MonteCarloAgent, MonteCarloConfig, RolloutStats};
pub use minimax_agent::{MinimaxAgent, MinimaxConfig, SearchStats};

use log::debug;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};

use crate::error::{Error, Result};
use crate::game_state::GameState;

/// An agent that will choose a legal action for its player given the current state of the game.
///
/// The driver owns the shared game state: after every move it hands the new state to each agent
/// with `set_current_state`. Agents never advance the state themselves.
pub trait GameAgent<S: GameState> {
    fn context(&self) -> &AgentContext<S>;
    fn context_mut(&mut self) -> &mut AgentContext<S>;

    /// Choose an action from `current_state()`. Fails with `Error::NoLegalActions` if there is
    /// nothing to choose from.
    fn get_next_action(&mut self) -> Result<S::Action>;

    /// The player this agent is choosing actions for.
    fn player(&self) -> S::Player {
        self.context().player
    }

    fn current_state(&self) -> &S {
        &self.context().current_state
    }

    fn set_current_state(&mut self, state: S) {
        self.context_mut().current_state = state;
    }
}

/// The player an agent acts for and the latest state the driver has shown it.
#[derive(Clone, Debug)]
pub struct AgentContext<S: GameState> {
    pub player: S::Player,
    pub current_state: S,
}

impl<S: GameState> AgentContext<S> {
    /// Plays for whoever is to move in `init_state`.
    pub fn new(init_state: S) -> Self {
        AgentContext {
            player: init_state.active_player(),
            current_state: init_state,
        }
    }
}

/*
 * ------------
 * Random Agent
 * ------------
 */

#[derive(Clone, Debug)]
/// Agent that makes random moves.
pub struct RandomAgent<S: GameState, R: Rng = StdRng> {
    context: AgentContext<S>,
    rng: R,
}

impl<S: GameState> RandomAgent<S> {
    pub fn new(init_state: S) -> Self {
        RandomAgent {
            context: AgentContext::new(init_state),
            rng: StdRng::from_entropy(),
        }
    }
}

impl<S: GameState, R: Rng> RandomAgent<S, R> {
    pub fn with_player(mut self, player: S::Player) -> Self {
        self.context.player = player;
        self
    }

    /// Swap in a different source of randomness, e.g. a seeded one for reproducible games.
    pub fn with_rng<R2: Rng>(self, rng: R2) -> RandomAgent<S, R2> {
        RandomAgent {
            context: self.context,
            rng,
        }
    }
}

impl<S: GameState, R: Rng> GameAgent<S> for RandomAgent<S, R> {
    fn context(&self) -> &AgentContext<S> {
        &self.context
    }

    fn context_mut(&mut self) -> &mut AgentContext<S> {
        &mut self.context
    }

    fn get_next_action(&mut self) -> Result<S::Action> {
        let legal_actions = self.context.current_state.legal_actions();
        legal_actions
            .choose(&mut self.rng)
            .cloned()
            .ok_or(Error::NoLegalActions)
    }
}

/*
 * ----------------
 * Simple-Max Agent
 * ----------------
 */

#[derive(Clone, Debug)]
/// Agent that looks one move ahead and takes whichever action leaves it with the highest utility.
/// Ties go to the action listed first.
pub struct SimpleMaxAgent<S: GameState> {
    context: AgentContext<S>,
}

impl<S: GameState> SimpleMaxAgent<S> {
    pub fn new(init_state: S) -> Self {
        SimpleMaxAgent {
            context: AgentContext::new(init_state),
        }
    }

    pub fn with_player(mut self, player: S::Player) -> Self {
        self.context.player = player;
        self
    }
}

impl<S: GameState> GameAgent<S> for SimpleMaxAgent<S> {
    fn context(&self) -> &AgentContext<S> {
        &self.context
    }

    fn context_mut(&mut self) -> &mut AgentContext<S> {
        &mut self.context
    }

    fn get_next_action(&mut self) -> Result<S::Action> {
        let state = &self.context.current_state;
        let player = self.context.player;

        let mut best: Option<(S::Action, f64)> = None;
        for action in state.legal_actions() {
            let value = state.get_next_state(&action).utility(player);
            match best {
                Some((_, best_value)) if value <= best_value => (),
                _ => best = Some((action, value)),
            }
        }

        let (action, value) = best.ok_or(Error::NoLegalActions)?;
        debug!(
            "{:?} SimpleMaxAgent chose {:?} (utility {:.3})",
            player, action, value
        );
        Ok(action)
    }
}
