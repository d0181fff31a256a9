/// Monte Carlo tree search agent.
use std::f64;
use std::time::Instant;

use log::{debug, trace};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};

use crate::agents::{AgentContext, GameAgent};
use crate::error::{Error, Result};
use crate::game_state::GameState;

/// Weight of the exploration term in UCB1.
pub const DEFAULT_EXPLORATION_CONSTANT: f64 = 2.;

pub const DEFAULT_ROLLOUTS: usize = 1000;

/// How the root's children are compared once the rollout budget is spent.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FinalSelection {
    /// Highest mean simulation result, v / n.
    AverageValue,
    /// Highest summed simulation result, v. Favors children that happened to be visited more.
    TotalValue,
    /// Highest visit count, n.
    MostVisited,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct MonteCarloConfig {
    /// Number of selection/expansion/simulation/backpropagation rounds per decision.
    pub rollouts: usize,
    /// Controls to what extent we should search unexplored vs explored (and well-scored) nodes.
    pub exploration_constant: f64,
    pub final_selection: FinalSelection,
    /// Score children by the active player's point of view instead of the agent's: where the
    /// opponent is to move, selection favors the children that are worst for the agent. Off by
    /// default, in which case every node maximizes the agent's own average result.
    pub minimize_for_opponent: bool,
}

impl Default for MonteCarloConfig {
    fn default() -> Self {
        MonteCarloConfig {
            rollouts: DEFAULT_ROLLOUTS,
            exploration_constant: DEFAULT_EXPLORATION_CONSTANT,
            final_selection: FinalSelection::AverageValue,
            minimize_for_opponent: false,
        }
    }
}

/// What the most recent decision looked like.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RolloutStats {
    pub rollouts: usize,
    /// Nodes in the search tree, the root included.
    pub tree_size: usize,
    /// Visit counts of the root's children, summed.
    pub root_child_visits: u64,
    /// Statistic of the chosen child under the configured `FinalSelection`.
    pub value: f64,
}

/// Index of a node in the search tree's arena.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
struct NodeId(usize);

#[derive(Clone, Debug)]
/// Tree node for the Monte Carlo search tree.
struct MonteCarloNode<S: GameState> {
    // Theoretical copy of the game state with the action the node represents applied.
    state: S,
    // The action that led here from the parent. None for the root.
    action: Option<S::Action>,
    // Non-owning link back up the tree, used for backpropagation only.
    parent: Option<NodeId>,
    // In the order they were expanded.
    children: Vec<NodeId>,
    // Legal actions from this state that don't have a child node yet.
    untried: Vec<S::Action>,
    // Cached from the state so selection doesn't ask the game over and over.
    is_terminal: bool,
    active_player: S::Player,
    // Number of simulations that passed through this node.
    visits: u64,
    // Sum of the simulation results, from the agent's point of view.
    value: f64,
}

impl<S: GameState> MonteCarloNode<S> {
    fn new(state: S, action: Option<S::Action>, parent: Option<NodeId>) -> Self {
        let is_terminal = state.is_terminal();
        let untried = if is_terminal {
            vec![]
        } else {
            state.legal_actions()
        };
        MonteCarloNode {
            active_player: state.active_player(),
            state,
            action,
            parent,
            children: vec![],
            untried,
            is_terminal,
            visits: 0,
            value: 0.,
        }
    }

    /// Children are only descended into once every legal action has one.
    fn is_fully_expanded(&self) -> bool {
        self.untried.is_empty()
    }
}

/// UCB1 score of a child: `q + c * sqrt(ln(N) / n)` where `n` is the child's visits and `N` is the
/// parent's. A child that has never been visited scores infinity so it is always tried first.
pub fn ucb1(q: f64, child_visits: u64, parent_visits: u64, exploration_constant: f64) -> f64 {
    if child_visits == 0 {
        return f64::INFINITY;
    }
    let n = child_visits as f64;
    q + exploration_constant * ((parent_visits as f64).ln() / n).sqrt()
}

/// Search tree for a single decision. Nodes live in one arena and refer to each other by index,
/// the whole tree is dropped when the decision has been made.
struct SearchTree<S: GameState> {
    nodes: Vec<MonteCarloNode<S>>,
    // The agent's player; all values are stored from its point of view.
    player: S::Player,
    exploration_constant: f64,
    minimize_for_opponent: bool,
}

impl<S: GameState> SearchTree<S> {
    fn new(root_state: S, player: S::Player, config: &MonteCarloConfig) -> Self {
        SearchTree {
            nodes: vec![MonteCarloNode::new(root_state, None, None)],
            player,
            exploration_constant: config.exploration_constant,
            minimize_for_opponent: config.minimize_for_opponent,
        }
    }

    fn root(&self) -> NodeId {
        NodeId(0)
    }

    fn get(&self, id: NodeId) -> &MonteCarloNode<S> {
        &self.nodes[id.0]
    }

    fn get_mut(&mut self, id: NodeId) -> &mut MonteCarloNode<S> {
        &mut self.nodes[id.0]
    }

    fn len(&self) -> usize {
        self.nodes.len()
    }

    /// One full round: selection, expansion, simulation, backpropagation.
    fn rollout(&mut self, rng: &mut impl Rng) {
        let selected = self.selection();
        let expanded = self.expansion(selected, rng);
        let result = self.simulation(expanded, rng);
        self.backpropagation(expanded, result);
    }

    /// Follow the highest scoring children down from the root until reaching a node that is
    /// terminal or still has untried actions.
    fn selection(&self) -> NodeId {
        let mut current = self.root();
        loop {
            let node = self.get(current);
            if node.is_terminal || !node.is_fully_expanded() || node.children.is_empty() {
                return current;
            }
            current = self.best_child_ucb(current);
        }
    }

    /// Child with the highest UCB1 score, `q` being the agent's average result through it. With
    /// `minimize_for_opponent` set, `q` is negated where the opponent is to move.
    fn best_child_ucb(&self, parent_id: NodeId) -> NodeId {
        let parent = self.get(parent_id);
        let sign = if self.minimize_for_opponent && parent.active_player != self.player {
            -1.
        } else {
            1.
        };

        let mut best = parent.children[0];
        let mut best_score = f64::NEG_INFINITY;
        for &child_id in parent.children.iter() {
            let child = self.get(child_id);
            let q = if child.visits == 0 {
                0.
            } else {
                sign * child.value / child.visits as f64
            };
            let score = ucb1(q, child.visits, parent.visits, self.exploration_constant);
            if score > best_score {
                best_score = score;
                best = child_id;
            }
        }
        best
    }

    /// Attach a child for one random untried action of the selected node. A terminal node has
    /// nothing to expand and is simulated from directly.
    fn expansion(&mut self, selected: NodeId, rng: &mut impl Rng) -> NodeId {
        let node = self.get_mut(selected);
        if node.is_terminal || node.untried.is_empty() {
            return selected;
        }

        let idx = rng.gen_range(0..node.untried.len());
        let action = node.untried.swap_remove(idx);
        let next_state = node.state.get_next_state(&action);

        let child_id = NodeId(self.nodes.len());
        self.nodes
            .push(MonteCarloNode::new(next_state, Some(action), Some(selected)));
        self.get_mut(selected).children.push(child_id);
        child_id
    }

    /// Play out a game randomly from this node and return the result for the agent.
    fn simulation(&self, from: NodeId, rng: &mut impl Rng) -> f64 {
        let mut state = self.get(from).state.clone();
        while !state.is_terminal() {
            let action = match state.legal_actions().choose(rng) {
                Some(action) => action.clone(),
                // a game that isn't over but has nothing to play; score it where it stands
                None => break,
            };
            state = state.get_next_state(&action);
        }
        state.utility(self.player)
    }

    /// Update every node from the one simulated up to the root.
    fn backpropagation(&mut self, from: NodeId, result: f64) {
        let mut current = Some(from);
        while let Some(id) = current {
            let node = self.get_mut(id);
            node.visits += 1;
            node.value += result;
            current = node.parent;
        }
    }

    /// The root's child that scores best under `selection`, earliest expanded on ties.
    fn best_root_child(&self, selection: FinalSelection) -> Option<(NodeId, f64)> {
        let mut best: Option<(NodeId, f64)> = None;
        for &child_id in self.get(self.root()).children.iter() {
            let child = self.get(child_id);
            let stat = match selection {
                FinalSelection::AverageValue => child.value / child.visits.max(1) as f64,
                FinalSelection::TotalValue => child.value,
                FinalSelection::MostVisited => child.visits as f64,
            };
            trace!(
                "{:?}: visits {}, value {:.3}, stat {:.3}",
                child.action,
                child.visits,
                child.value,
                stat
            );
            match best {
                Some((_, best_stat)) if stat <= best_stat => (),
                _ => best = Some((child_id, stat)),
            }
        }
        best
    }

    fn root_child_visits(&self) -> u64 {
        self.get(self.root())
            .children
            .iter()
            .map(|&id| self.get(id).visits)
            .sum()
    }
}

#[derive(Clone, Debug)]
/// Monte Carlo tree search agent using UCB1 for selection and uniformly random playouts. The tree
/// is rebuilt from `current_state` on every decision; nothing carries over between turns.
pub struct MonteCarloAgent<S: GameState, R: Rng = StdRng> {
    context: AgentContext<S>,
    config: MonteCarloConfig,
    rng: R,
    last_search: Option<RolloutStats>,
}

impl<S: GameState, R: Rng> GameAgent<S> for MonteCarloAgent<S, R> {
    fn context(&self) -> &AgentContext<S> {
        &self.context
    }

    fn context_mut(&mut self) -> &mut AgentContext<S> {
        &mut self.context
    }

    fn get_next_action(&mut self) -> Result<S::Action> {
        let now = Instant::now();
        let player = self.context.player;
        let root_state = self.context.current_state.clone();
        if root_state.is_terminal() || root_state.legal_actions().is_empty() {
            return Err(Error::NoLegalActions);
        }

        let mut tree = SearchTree::new(root_state, player, &self.config);
        for _ in 0..self.config.rollouts {
            tree.rollout(&mut self.rng);
        }

        let (best_id, value) = tree
            .best_root_child(self.config.final_selection)
            .ok_or(Error::NoLegalActions)?;
        let action = tree
            .get(best_id)
            .action
            .clone()
            .ok_or(Error::NoLegalActions)?;

        let stats = RolloutStats {
            rollouts: self.config.rollouts,
            tree_size: tree.len(),
            root_child_visits: tree.root_child_visits(),
            value,
        };
        debug!(
            "{:?} MonteCarloAgent chose {:?} ({:?} {:.3}, {} rollouts, {} nodes, took {:?})",
            player,
            action,
            self.config.final_selection,
            value,
            stats.rollouts,
            stats.tree_size,
            now.elapsed()
        );
        self.last_search = Some(stats);

        Ok(action)
    }
}

impl<S: GameState> MonteCarloAgent<S> {
    pub fn new(init_state: S, rollouts: usize) -> Self {
        Self::with_config(
            init_state,
            MonteCarloConfig {
                rollouts,
                ..MonteCarloConfig::default()
            },
        )
    }

    /// A budget of 0 rollouts would never expand the root, so at least one is always run.
    pub fn with_config(init_state: S, config: MonteCarloConfig) -> Self {
        MonteCarloAgent {
            context: AgentContext::new(init_state),
            config: MonteCarloConfig {
                rollouts: config.rollouts.max(1),
                ..config
            },
            rng: StdRng::from_entropy(),
            last_search: None,
        }
    }
}

impl<S: GameState, R: Rng> MonteCarloAgent<S, R> {
    pub fn with_player(mut self, player: S::Player) -> Self {
        self.context.player = player;
        self
    }

    /// Swap in a different source of randomness for expansion and simulation.
    pub fn with_rng<R2: Rng>(self, rng: R2) -> MonteCarloAgent<S, R2> {
        MonteCarloAgent {
            context: self.context,
            config: self.config,
            rng,
            last_search: self.last_search,
        }
    }

    pub fn config(&self) -> MonteCarloConfig {
        self.config
    }

    /// Stats from the last call to `get_next_action()`, if it succeeded.
    pub fn last_search(&self) -> Option<RolloutStats> {
        self.last_search
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tictactoe::Player::{O, X};
    use crate::tictactoe::TicTacToeBoard;

    fn seeded(board: TicTacToeBoard, rollouts: usize, seed: u64) -> MonteCarloAgent<TicTacToeBoard> {
        MonteCarloAgent::new(board, rollouts).with_rng(StdRng::seed_from_u64(seed))
    }

    #[test]
    fn test_ucb1_prefers_unvisited() {
        assert_eq!(ucb1(0., 0, 10, 2.), f64::INFINITY);
        assert!(ucb1(1., 1, 10, 2.).is_finite());
        // less visited children get a bigger exploration bonus
        assert!(ucb1(0.5, 2, 10, 2.) > ucb1(0.5, 8, 10, 2.));
        assert_eq!(ucb1(0.25, 4, 1, 2.), 0.25);
    }

    #[test]
    fn test_returns_legal_action() {
        let board = TicTacToeBoard::new(3).get_next_state(&(0, 0));
        for &rollouts in &[1, 2, 10, 100] {
            let mut agent = seeded(board.clone(), rollouts, rollouts as u64);
            let action = agent.get_next_action().unwrap();
            assert!(board.legal_actions().contains(&action));
        }
    }

    #[test]
    fn test_visit_accounting() {
        let board = TicTacToeBoard::new(3);
        let rollouts = 500;
        let mut agent = seeded(board.clone(), rollouts, 3);
        agent.get_next_action().unwrap();
        let stats = agent.last_search().unwrap();
        assert_eq!(stats.rollouts, rollouts);
        assert_eq!(stats.root_child_visits, rollouts as u64);

        let mut tree = SearchTree::new(board, X, &MonteCarloConfig::default());
        let mut rng = StdRng::seed_from_u64(3);
        for i in 1..=50u64 {
            tree.rollout(&mut rng);
            assert_eq!(tree.get(tree.root()).visits, i);
            assert_eq!(tree.root_child_visits(), i);
        }
        // every root child was tried once before any of them was visited twice
        let root = tree.get(tree.root());
        assert_eq!(root.children.len(), 9);
        assert!(root.untried.is_empty());
    }

    #[test]
    fn test_terminal_leaf_is_resimulated_in_place() {
        // every legal move for X ends the game
        let board = TicTacToeBoard::from_rows(&["XOX", "XOO", "OX."]).unwrap();
        let mut tree = SearchTree::new(board, X, &MonteCarloConfig::default());
        let mut rng = StdRng::seed_from_u64(0);
        for _ in 0..5 {
            tree.rollout(&mut rng);
        }
        // one child was created, every later rollout re-selected it without expanding
        assert_eq!(tree.len(), 2);
        assert_eq!(tree.root_child_visits(), 5);
    }

    #[test]
    fn test_takes_the_win() {
        let board = TicTacToeBoard::from_rows(&["XX.", "OO.", "..."]).unwrap();
        let mut agent = seeded(board, 1000, 11);
        assert_eq!(agent.get_next_action(), Ok((0, 2)));
        assert_eq!(agent.last_search().unwrap().value, 1.);
    }

    /// Root with O to move, searched for X, where both children have 4 visits: (0, 0) averages
    /// 0.75 for X and (0, 1) averages -0.75.
    fn two_child_tree(config: &MonteCarloConfig) -> SearchTree<TicTacToeBoard> {
        let board = TicTacToeBoard::new(3).get_next_state(&(2, 2));
        assert_eq!(board.active_player(), O);
        let mut tree = SearchTree::new(board.clone(), X, config);
        let root = tree.root();
        tree.get_mut(root).untried.clear();
        tree.get_mut(root).visits = 8;
        for &(action, value) in &[((0, 0), 3.), ((0, 1), -3.)] {
            let state = board.get_next_state(&action);
            let mut child = MonteCarloNode::new(state, Some(action), Some(root));
            child.visits = 4;
            child.value = value;
            let id = NodeId(tree.len());
            tree.nodes.push(child);
            tree.get_mut(root).children.push(id);
        }
        tree
    }

    #[test]
    fn test_selection_maximizes_agent_value_by_default() {
        let tree = two_child_tree(&MonteCarloConfig::default());
        let selected = tree.selection();
        assert_eq!(tree.get(selected).action, Some((0, 0)));
    }

    #[test]
    fn test_selection_can_minimize_for_opponent() {
        let config = MonteCarloConfig {
            minimize_for_opponent: true,
            ..MonteCarloConfig::default()
        };
        let tree = two_child_tree(&config);
        let selected = tree.selection();
        assert_eq!(tree.get(selected).action, Some((0, 1)));
    }

    #[test]
    fn test_most_visited_takes_the_win() {
        let board = TicTacToeBoard::from_rows(&["XX.", "OO.", "..."]).unwrap();
        let config = MonteCarloConfig {
            rollouts: 2000,
            final_selection: FinalSelection::MostVisited,
            minimize_for_opponent: true,
            ..MonteCarloConfig::default()
        };
        let mut agent =
            MonteCarloAgent::with_config(board, config).with_rng(StdRng::seed_from_u64(5));
        assert_eq!(agent.get_next_action(), Ok((0, 2)));
    }

    #[test]
    fn test_total_value_takes_the_win() {
        let board = TicTacToeBoard::from_rows(&["XX.", "OO.", "..."]).unwrap();
        let config = MonteCarloConfig {
            rollouts: 1000,
            final_selection: FinalSelection::TotalValue,
            minimize_for_opponent: true,
            ..MonteCarloConfig::default()
        };
        let mut agent =
            MonteCarloAgent::with_config(board, config).with_rng(StdRng::seed_from_u64(13));
        assert_eq!(agent.get_next_action(), Ok((0, 2)));
        let stats = agent.last_search().unwrap();
        // every rollout through the winning move scores 1
        assert!(stats.value >= 1.);
        assert_eq!(stats.value.fract(), 0.);
    }

    #[test]
    fn test_terminal_root_has_no_action() {
        let board = TicTacToeBoard::from_rows(&["XXX", "OO.", "..."]).unwrap();
        let mut agent = seeded(board, 100, 0);
        assert_eq!(agent.get_next_action(), Err(Error::NoLegalActions));
        assert!(agent.last_search().is_none());
    }

    #[test]
    fn test_zero_rollouts_is_clamped() {
        let board = TicTacToeBoard::new(3);
        let mut agent = seeded(board.clone(), 0, 9);
        assert_eq!(agent.config().rollouts, 1);
        let action = agent.get_next_action().unwrap();
        assert!(board.legal_actions().contains(&action));
    }

    #[test]
    fn test_seeded_agents_agree() {
        let board = TicTacToeBoard::new(3).get_next_state(&(1, 1));
        let mut a = seeded(board.clone(), 300, 17);
        let mut b = seeded(board, 300, 17);
        assert_eq!(a.get_next_action(), b.get_next_action());
    }
}
