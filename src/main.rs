use anyhow::{ensure, Result};
use clap::Parser;
use log::info;
use rand::rngs::StdRng;
use rand::{thread_rng, Rng, SeedableRng};

use game_agents::tictactoe::{Player, TicTacToeBoard};
use game_agents::{play_game, play_series, AgentKind, GameAgent, GameState};

#[derive(Parser)]
#[command(name = "game-agents")]
#[command(version, about = "Play tic-tac-toe between search agents", long_about = None)]
struct Cli {
    /// Agent playing X: random, simple-max, minimax[:DEPTH] or mcts[:ROLLOUTS]
    #[arg(short = 'x', long = "x", default_value = "minimax")]
    x: AgentKind,

    /// Agent playing O, same choices as X
    #[arg(short = 'o', long = "o", default_value = "random")]
    o: AgentKind,

    /// Board dimension (the board has size * size cells)
    #[arg(long, default_value_t = 3)]
    size: usize,

    /// Number of games to play; more than one runs them in parallel and prints the tally
    #[arg(long, default_value_t = 1)]
    games: usize,

    /// Seed for the random and Monte Carlo agents
    #[arg(long)]
    seed: Option<u64>,
}

fn seat_agents(
    cli: &Cli,
    board: &TicTacToeBoard,
    seed: u64,
) -> Vec<Box<dyn GameAgent<TicTacToeBoard>>> {
    let x_rng = StdRng::seed_from_u64(seed);
    let o_rng = StdRng::seed_from_u64(seed.wrapping_add(1));
    vec![
        cli.x.build(board.clone(), Player::X, x_rng),
        cli.o.build(board.clone(), Player::O, o_rng),
    ]
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    ensure!(cli.size > 0, "board size must be at least 1");
    ensure!(cli.games > 0, "need at least one game to play");

    let seed = cli.seed.unwrap_or_else(|| thread_rng().gen());
    let board = TicTacToeBoard::new(cli.size);
    info!(
        "X: {}, O: {}, {}x{} board, seed {}",
        cli.x, cli.o, cli.size, cli.size, seed
    );

    if cli.games == 1 {
        let mut agents = seat_agents(&cli, &board, seed);
        let record = play_game(board.clone(), &mut agents)?;

        let mut state = board;
        println!("{}", state);
        for action in record.actions.iter() {
            println!("{} plays {:?}", state.active_player(), action);
            state = state.get_next_state(action);
            println!("{}", state);
        }
        match record.winner {
            Some(winner) => println!("{} wins!", winner),
            None => println!("Draw."),
        }
    } else {
        // every game gets its own pair of seeds
        let tally = play_series(&board, cli.games, |game| {
            seat_agents(&cli, &board, seed.wrapping_add(2 * game as u64))
        })?;
        println!(
            "{} games: X won {}, O won {}, {} draws",
            tally.games,
            tally.wins_for(&Player::X),
            tally.wins_for(&Player::O),
            tally.draws
        );
    }

    Ok(())
}
