/// Running games between agents: one at a time, or a whole series of independent games spread
/// over a thread pool.
use std::collections::HashMap;
use std::hash::Hash;
use std::sync::mpsc;
use std::time::Instant;

use log::{debug, info};
use scoped_threadpool::Pool;

use crate::agents::GameAgent;
use crate::error::{Error, Result};
use crate::game_state::GameState;

/// How a finished game went.
#[derive(Clone, Debug)]
pub struct GameRecord<S: GameState> {
    pub final_state: S,
    /// Every action played, in order.
    pub actions: Vec<S::Action>,
    pub winner: Option<S::Player>,
}

/// Play one game from `initial` to the end. Each turn the agent seated for the active player
/// chooses an action, the shared state is advanced, and every agent is shown the new state.
pub fn play_game<S: GameState>(
    initial: S,
    agents: &mut [Box<dyn GameAgent<S>>],
) -> Result<GameRecord<S>> {
    let mut state = initial;
    for agent in agents.iter_mut() {
        agent.set_current_state(state.clone());
    }

    let mut actions = Vec::new();
    while !state.is_terminal() {
        let active = state.active_player();
        let agent = agents
            .iter_mut()
            .find(|agent| agent.player() == active)
            .ok_or_else(|| Error::NoAgentForPlayer {
                player: format!("{:?}", active),
            })?;

        let action = agent.get_next_action()?;
        debug!("{:?} plays {:?}", active, action);
        state = state.get_next_state(&action);
        actions.push(action);

        for agent in agents.iter_mut() {
            agent.set_current_state(state.clone());
        }
    }

    let winner = state.get_winner();
    debug!("game over after {} moves, winner {:?}", actions.len(), winner);
    Ok(GameRecord {
        final_state: state,
        actions,
        winner,
    })
}

/// Outcome counts over a series of games.
#[derive(Clone, Debug, PartialEq)]
pub struct SeriesTally<P: Eq + Hash> {
    pub games: usize,
    pub wins: HashMap<P, usize>,
    pub draws: usize,
}

impl<P: Eq + Hash> Default for SeriesTally<P> {
    fn default() -> Self {
        SeriesTally {
            games: 0,
            wins: HashMap::new(),
            draws: 0,
        }
    }
}

impl<P: Eq + Hash> SeriesTally<P> {
    pub fn record(&mut self, winner: Option<P>) {
        self.games += 1;
        match winner {
            Some(player) => *self.wins.entry(player).or_insert(0) += 1,
            None => self.draws += 1,
        }
    }

    pub fn wins_for(&self, player: &P) -> usize {
        self.wins.get(player).copied().unwrap_or(0)
    }
}

/// Play `games` independent games from `initial`, in parallel across all cores. `new_agents` is
/// called with the game's index inside the worker that plays it, so seeding from the index gives
/// reproducible series. The search inside each game stays single threaded.
pub fn play_series<S, F>(initial: &S, games: usize, new_agents: F) -> Result<SeriesTally<S::Player>>
where
    S: GameState + Sync,
    S::Player: Send,
    F: Fn(usize) -> Vec<Box<dyn GameAgent<S>>> + Sync,
{
    let now = Instant::now();
    let mut pool = Pool::new(num_cpus::get().max(1) as u32);
    let (sender, receiver) = mpsc::channel();

    pool.scoped(|scoped| {
        for game in 0..games {
            let sender = sender.clone();
            let new_agents = &new_agents;
            scoped.execute(move || {
                let mut agents = new_agents(game);
                let outcome = play_game(initial.clone(), &mut agents).map(|record| record.winner);
                // the receiver is only dropped once every game has reported
                let _ = sender.send((game, outcome));
            });
        }
    });
    drop(sender);

    let mut tally = SeriesTally::default();
    for (game, outcome) in receiver {
        let winner = outcome?;
        debug!("game {} won by {:?}", game, winner);
        tally.record(winner);
    }

    info!(
        "played {} games in {:?}: {} draws, wins {:?}",
        tally.games,
        now.elapsed(),
        tally.draws,
        tally.wins
    );
    Ok(tally)
}

#[cfg(test)]
mod tests {
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    use super::*;
    use crate::agents::{RandomAgent, SimpleMaxAgent};
    use crate::tictactoe::Player::{O, X};
    use crate::tictactoe::TicTacToeBoard;

    #[test]
    fn test_play_game_keeps_agents_in_sync() {
        let board = TicTacToeBoard::new(3);
        let mut agents: Vec<Box<dyn GameAgent<TicTacToeBoard>>> = vec![
            Box::new(SimpleMaxAgent::new(board.clone())),
            Box::new(
                RandomAgent::new(board.clone())
                    .with_player(O)
                    .with_rng(StdRng::seed_from_u64(3)),
            ),
        ];

        let record = play_game(board.clone(), &mut agents).unwrap();
        assert!(record.final_state.is_terminal());
        assert_eq!(record.winner, record.final_state.get_winner());
        for agent in agents.iter() {
            assert_eq!(agent.current_state(), &record.final_state);
        }

        // replaying the record reaches the same position through legal moves only
        let mut replay = board;
        for action in record.actions.iter() {
            assert!(replay.legal_actions().contains(action));
            replay = replay.get_next_state(action);
        }
        assert_eq!(replay, record.final_state);
    }

    #[test]
    fn test_play_game_needs_every_seat() {
        let board = TicTacToeBoard::new(3);
        let mut agents: Vec<Box<dyn GameAgent<TicTacToeBoard>>> =
            vec![Box::new(SimpleMaxAgent::new(board.clone()))];
        match play_game(board, &mut agents) {
            Err(Error::NoAgentForPlayer { player }) => assert_eq!(player, "O"),
            other => panic!("unexpected {:?}", other.map(|record| record.winner)),
        }
    }

    #[test]
    fn test_finished_game_plays_no_moves() {
        let board = TicTacToeBoard::from_rows(&["XXX", "OO.", "..."]).unwrap();
        let mut agents: Vec<Box<dyn GameAgent<TicTacToeBoard>>> = vec![];
        let record = play_game(board, &mut agents).unwrap();
        assert!(record.actions.is_empty());
        assert_eq!(record.winner, Some(X));
    }

    #[test]
    fn test_tally() {
        let mut tally = SeriesTally::default();
        tally.record(Some(X));
        tally.record(None);
        tally.record(Some(X));
        assert_eq!(tally.games, 3);
        assert_eq!(tally.wins_for(&X), 2);
        assert_eq!(tally.wins_for(&O), 0);
        assert_eq!(tally.draws, 1);
    }
}
