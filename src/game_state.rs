/// Generic game state interface.
use std::fmt;
use std::hash::Hash;

/// Functionality associated with any turn-based game that the agents can search over.
///
/// A state is a snapshot: transitions produce new values and never modify the receiver, so a
/// state and every state derived from it are independent of one another.
pub trait GameState: Clone + fmt::Debug {
    /// Identifies whose turn it is, and who a utility is measured for.
    type Player: Copy + Eq + Hash + fmt::Debug;

    /// An action an agent can take when it is their turn. Opaque to the agents.
    type Action: Clone + PartialEq + fmt::Debug;

    /// The player that gets to make the next move.
    fn active_player(&self) -> Self::Player;

    /// All the actions that are allowed at this state. Empty at terminal states.
    fn legal_actions(&self) -> Vec<Self::Action>;

    /// Is this an end state for the game?
    fn is_terminal(&self) -> bool;

    /// Payoff for `player`, positive values favor them. Exact at terminal states, a heuristic
    /// estimate everywhere else (depth-limited search relies on it).
    fn utility(&self, player: Self::Player) -> f64;

    /// Apply an action and return the resulting state. The action must be one of
    /// `legal_actions()`; anything else is up to the implementing game.
    fn get_next_state(&self, action: &Self::Action) -> Self;

    /// The winner of a finished game, `None` if the game is drawn or still going.
    fn get_winner(&self) -> Option<Self::Player>;
}
