/// Error types for the game agents crate.
use thiserror::Error;

/// Main error type for the crate.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum Error {
    /// An agent was asked to act on a state with no legal actions.
    #[error("no legal actions available from the current state")]
    NoLegalActions,

    #[error("unknown agent '{name}' (expected random, simple-max, minimax[:DEPTH] or mcts[:ROLLOUTS])")]
    UnknownAgent { name: String },

    #[error("invalid parameter '{value}' for agent '{agent}'")]
    InvalidParameter { agent: String, value: String },

    /// The driver found no agent seated for the player whose turn it is.
    #[error("no agent plays for {player}")]
    NoAgentForPlayer { player: String },

    #[error("invalid board: {reason}")]
    InvalidBoard { reason: String },
}

pub type Result<T> = std::result::Result<T, Error>;
