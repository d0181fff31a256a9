/// Search agents for turn-based, two-player games, and tic-tac-toe to play them on.
pub mod agents;
pub mod config;
pub mod error;
pub mod game_state;
pub mod play;
pub mod tictactoe;

pub use agents::{
    AgentContext, FinalSelection, GameAgent, MinimaxAgent, MinimaxConfig, MonteCarloAgent,
    MonteCarloConfig, RandomAgent, RolloutStats, SearchStats, SimpleMaxAgent,
};
pub use config::AgentKind;
pub use error::{Error, Result};
pub use game_state::GameState;
pub use play::{play_game, play_series, GameRecord, SeriesTally};
