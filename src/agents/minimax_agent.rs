/// Depth-limited minimax agent with alpha-beta pruning.
use std::f64;

use log::{debug, trace};

use crate::agents::{AgentContext, GameAgent};
use crate::error::{Error, Result};
use crate::game_state::GameState;

/// Enough to search a 3x3 tic-tac-toe game to the end from any position.
pub const DEFAULT_MAX_DEPTH: usize = 9;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct MinimaxConfig {
    /// Number of state transitions to look ahead, regardless of whose move each one is.
    pub max_depth: usize,
    /// Skip subtrees that cannot change the result. Turning this off gives plain exhaustive
    /// minimax, which picks the same action but visits more nodes.
    pub pruning: bool,
}

impl Default for MinimaxConfig {
    fn default() -> Self {
        MinimaxConfig {
            max_depth: DEFAULT_MAX_DEPTH,
            pruning: true,
        }
    }
}

/// What the most recent decision cost and what it expects to get.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SearchStats {
    /// Nodes visited, the root included.
    pub nodes: usize,
    /// Value of the chosen line for the agent's player.
    pub value: f64,
}

/// A position in the search tree. Only exists for the duration of one `get_next_action()` call;
/// the bounds are inherited from the chain of ancestors above it.
struct SearchNode<S: GameState> {
    state: S,
    depth: usize,
    maximizer: S::Player,
    alpha: f64,
    beta: f64,
}

impl<S: GameState> SearchNode<S> {
    fn root(state: S, maximizer: S::Player) -> Self {
        SearchNode {
            state,
            depth: 0,
            maximizer,
            alpha: f64::NEG_INFINITY,
            beta: f64::INFINITY,
        }
    }

    fn child(&self, action: &S::Action, alpha: f64, beta: f64) -> Self {
        SearchNode {
            state: self.state.get_next_state(action),
            depth: self.depth + 1,
            maximizer: self.maximizer,
            alpha,
            beta,
        }
    }
}

#[derive(Clone, Debug)]
/// Adversarial tree search agent for two-player games. Every player other than the agent's own is
/// treated as the single opponent trying to minimize the agent's utility.
pub struct MinimaxAgent<S: GameState> {
    context: AgentContext<S>,
    config: MinimaxConfig,
    last_search: Option<SearchStats>,
}

impl<S: GameState> GameAgent<S> for MinimaxAgent<S> {
    fn context(&self) -> &AgentContext<S> {
        &self.context
    }

    fn context_mut(&mut self) -> &mut AgentContext<S> {
        &mut self.context
    }

    fn get_next_action(&mut self) -> Result<S::Action> {
        let player = self.context.player;
        let root = SearchNode::root(self.context.current_state.clone(), player);

        let mut nodes = 0;
        let (best_action, value) = self.minimax(&root, &mut nodes);
        let action = best_action.ok_or(Error::NoLegalActions)?;

        debug!(
            "{:?} MinimaxAgent chose {:?} (value {:.3}, {} nodes, depth {}, pruning {})",
            player, action, value, nodes, self.config.max_depth, self.config.pruning
        );
        self.last_search = Some(SearchStats { nodes, value });

        Ok(action)
    }
}

impl<S: GameState> MinimaxAgent<S> {
    pub fn new(init_state: S, max_depth: usize) -> Self {
        Self::with_config(
            init_state,
            MinimaxConfig {
                max_depth,
                ..MinimaxConfig::default()
            },
        )
    }

    /// A depth of 0 would make the root itself a leaf with no action to return, so the root is
    /// always searched at least one move deep.
    pub fn with_config(init_state: S, config: MinimaxConfig) -> Self {
        MinimaxAgent {
            context: AgentContext::new(init_state),
            config: MinimaxConfig {
                max_depth: config.max_depth.max(1),
                ..config
            },
            last_search: None,
        }
    }

    pub fn with_player(mut self, player: S::Player) -> Self {
        self.context.player = player;
        self
    }

    pub fn with_pruning(mut self, pruning: bool) -> Self {
        self.config.pruning = pruning;
        self
    }

    pub fn config(&self) -> MinimaxConfig {
        self.config
    }

    /// Stats from the last call to `get_next_action()`, if it succeeded.
    pub fn last_search(&self) -> Option<SearchStats> {
        self.last_search
    }

    /// Returns the best action from this node (`None` at leaves) and its value for the maximizer.
    /// Earlier actions win ties.
    fn minimax(&self, node: &SearchNode<S>, nodes: &mut usize) -> (Option<S::Action>, f64) {
        *nodes += 1;

        if node.depth >= self.config.max_depth || node.state.is_terminal() {
            return (None, node.state.utility(node.maximizer));
        }

        let maximizing = node.state.active_player() == node.maximizer;
        let (mut alpha, mut beta) = (node.alpha, node.beta);
        let mut best_action = None;
        let mut best_value = if maximizing {
            f64::NEG_INFINITY
        } else {
            f64::INFINITY
        };

        for action in node.state.legal_actions() {
            let child = node.child(&action, alpha, beta);
            let (_, value) = self.minimax(&child, nodes);

            if maximizing {
                if best_action.is_none() || value > best_value {
                    best_value = value;
                    best_action = Some(action);
                }
                alpha = alpha.max(best_value);
            } else {
                if best_action.is_none() || value < best_value {
                    best_value = value;
                    best_action = Some(action);
                }
                beta = beta.min(best_value);
            }

            if self.config.pruning && alpha >= beta {
                trace!(
                    "cutoff at depth {} (alpha {}, beta {})",
                    node.depth,
                    alpha,
                    beta
                );
                break;
            }
        }

        (best_action, best_value)
    }
}
