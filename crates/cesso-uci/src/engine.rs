//! Event-driven, single-threaded UCI engine.

use std::io::{self, BufRead};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, mpsc};

use tracing::{debug, info, warn};

use cesso_core::Board;
use cesso_engine::search::negamax::{MATE_SCORE, MATE_THRESHOLD};
use cesso_engine::{SearchResult, Searcher, limits_from_go};

use crate::command::{Command, GoParams, SetOption, parse_command};
use crate::error::UciError;

/// Internal engine state — tracks whether the engine is idle or searching.
enum EngineState {
    Idle,
    Searching,
}

/// Events processed by the main engine loop.
enum EngineEvent {
    UciCommand(Result<Command, UciError>),
    SearchDone(SearchDone),
    InputClosed,
}

/// Payload returned by the search thread when it finishes.
struct SearchDone {
    result: SearchResult,
    searcher: Searcher,
}

/// The UCI engine, holding current board state and searcher.
///
/// Runs an event-driven loop on the main thread, dispatching searches
/// to a worker thread and processing UCI commands concurrently.
pub struct UciEngine {
    board: Board,
    /// Zobrist hashes of positions played before `board`, oldest first —
    /// fed to the searcher for repetition detection.
    history: Vec<u64>,
    searcher: Option<Searcher>,
    state: EngineState,
    stop_flag: Arc<AtomicBool>,
    pending_clear_tt: bool,
    pending_resize_mb: Option<usize>,
}

impl UciEngine {
    /// Create a new engine with the starting position.
    pub fn new() -> Self {
        Self {
            board: Board::starting_position(),
            history: Vec::new(),
            searcher: Some(Searcher::new()),
            state: EngineState::Idle,
            stop_flag: Arc::new(AtomicBool::new(false)),
            pending_clear_tt: false,
            pending_resize_mb: None,
        }
    }

    /// Run the UCI event loop, reading from stdin until `quit` or input closes.
    pub fn run(mut self) -> Result<(), UciError> {
        let (tx, rx) = mpsc::channel::<EngineEvent>();

        // Spawn stdin reader thread
        let stdin_tx = tx.clone();
        std::thread::spawn(move || {
            let stdin = io::stdin();
            let reader = stdin.lock();
            for line in reader.lines() {
                match line {
                    Ok(line) => {
                        let trimmed = line.trim().to_string();
                        if trimmed.is_empty() {
                            continue;
                        }
                        debug!(cmd = %trimmed, "received UCI command");
                        let cmd = parse_command(&trimmed);
                        if stdin_tx.send(EngineEvent::UciCommand(cmd)).is_err() {
                            break;
                        }
                    }
                    Err(_) => {
                        let _ = stdin_tx.send(EngineEvent::InputClosed);
                        break;
                    }
                }
            }
            let _ = stdin_tx.send(EngineEvent::InputClosed);
        });

        for event in &rx {
            match event {
                EngineEvent::UciCommand(Ok(cmd)) => match cmd {
                    Command::Uci => self.handle_uci(),
                    Command::IsReady => self.handle_isready(),
                    Command::UciNewGame => self.handle_ucinewgame(),
                    Command::Position(board, history) => self.handle_position(board, history),
                    Command::Go(params) => self.handle_go(params, &tx),
                    Command::SetOption(option) => self.handle_setoption(option),
                    Command::Stop => self.handle_stop(),
                    Command::Quit => {
                        // Stop any active search and wait for it to finish
                        if !matches!(self.state, EngineState::Idle) {
                            self.handle_stop();
                            // Drain events until we get SearchDone
                            for ev in &rx {
                                if let EngineEvent::SearchDone(done) = ev {
                                    self.finish_search(done);
                                    break;
                                }
                            }
                        }
                        break;
                    }
                    Command::Unknown(_) => {}
                },
                EngineEvent::UciCommand(Err(e)) => {
                    warn!(error = %e, "UCI parse error");
                }
                EngineEvent::SearchDone(done) => {
                    self.finish_search(done);
                }
                EngineEvent::InputClosed => break,
            }
        }

        info!("cesso shutting down");
        Ok(())
    }

    fn handle_uci(&self) {
        println!("id name cesso");
        println!("id author Nicolas Lazaro");
        println!("option name Hash type spin default 16 min 1 max 4096");
        println!("option name Clear Hash type button");
        println!("option name SyzygyPath type string default <empty>");
        println!("option name EvalFile type string default <empty>");
        println!("option name Use NNUE type check default false");
        println!("uciok");
    }

    fn handle_isready(&self) {
        println!("readyok");
    }

    fn handle_ucinewgame(&mut self) {
        self.board = Board::starting_position();
        self.history.clear();
        if let Some(ref searcher) = self.searcher {
            searcher.clear_tt();
        } else {
            // Search thread owns the searcher — defer clear until it comes back
            self.pending_clear_tt = true;
        }
    }

    fn handle_position(&mut self, board: Board, history: Vec<u64>) {
        self.board = board;
        self.history = history;
    }

    fn handle_setoption(&mut self, option: SetOption) {
        match option {
            SetOption::Hash(mb) => {
                if let Some(ref mut searcher) = self.searcher {
                    searcher.resize_tt(mb);
                } else {
                    self.pending_resize_mb = Some(mb);
                }
            }
            SetOption::ClearHash => {
                if let Some(ref searcher) = self.searcher {
                    searcher.clear_tt();
                } else {
                    self.pending_clear_tt = true;
                }
            }
            SetOption::SyzygyPath(_) | SetOption::EvalFile(_) | SetOption::UseNnue(_) => {
                // Accepted for UCI compliance; no backing implementation yet.
            }
        }
    }

    fn handle_go(&mut self, params: GoParams, tx: &mpsc::Sender<EngineEvent>) {
        if !matches!(self.state, EngineState::Idle) {
            warn!("go received while not idle, ignoring");
            return;
        }

        // Reset stop flag
        self.stop_flag = Arc::new(AtomicBool::new(false));

        let side = self.board.side_to_move();
        let mut control = limits_from_go(
            params.wtime,
            params.btime,
            params.winc,
            params.binc,
            params.movestogo,
            params.movetime,
            params.infinite,
            side,
            Arc::clone(&self.stop_flag),
        );
        if let Some(nodes) = params.nodes {
            control = control.with_node_limit(nodes);
        }
        let control = Arc::new(control);

        let max_depth = params.depth.unwrap_or(128);

        // Take the searcher — the search thread will own it
        let mut searcher = self.searcher.take().unwrap_or_default();

        let board = self.board;
        let history = self.history.clone();
        let search_control = Arc::clone(&control);
        let tx = tx.clone();

        std::thread::spawn(move || {
            let result =
                searcher.search(&board, max_depth, &search_control, &history, |d, score, nodes, pv| {
                    let elapsed = search_control.elapsed();
                    let elapsed_ms = elapsed.as_millis().max(1);
                    let nps = (nodes as u128 * 1000) / elapsed_ms;
                    let hashfull = searcher.hash_full();
                    let score_str = format_score(score);

                    let pv_str: String = pv
                        .iter()
                        .filter(|m| !m.is_null())
                        .map(|m| m.to_uci())
                        .collect::<Vec<_>>()
                        .join(" ");

                    println!(
                        "info depth {} score {} nodes {} nps {} hashfull {} time {} pv {}",
                        d, score_str, nodes, nps, hashfull, elapsed_ms, pv_str
                    );
                });
            let _ = tx.send(EngineEvent::SearchDone(SearchDone { result, searcher }));
        });

        self.state = EngineState::Searching;
    }

    fn handle_stop(&mut self) {
        self.stop_flag.store(true, Ordering::Release);
    }

    fn finish_search(&mut self, done: SearchDone) {
        let mut searcher = done.searcher;

        if let Some(mb) = self.pending_resize_mb.take() {
            searcher.resize_tt(mb);
        }
        if self.pending_clear_tt {
            searcher.clear_tt();
            self.pending_clear_tt = false;
        }

        self.searcher = Some(searcher);

        let result = &done.result;
        if result.best_move.is_null() {
            println!("bestmove 0000");
        } else {
            println!("bestmove {}", result.best_move.to_uci());
        }

        self.state = EngineState::Idle;
    }
}

/// Format a score for a UCI `info` line: `cp <n>` or `mate <n>`.
fn format_score(score: i32) -> String {
    if score > MATE_THRESHOLD {
        let plies_to_mate = MATE_SCORE - score;
        format!("mate {}", (plies_to_mate + 1) / 2)
    } else if score < -MATE_THRESHOLD {
        let plies_to_mate = MATE_SCORE + score;
        format!("mate -{}", (plies_to_mate + 1) / 2)
    } else {
        format!("cp {score}")
    }
}

impl Default for UciEngine {
    fn default() -> Self {
        Self::new()
    }
}
