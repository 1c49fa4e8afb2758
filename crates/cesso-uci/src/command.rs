//! UCI command parsing.

use std::time::Duration;

use cesso_core::{Board, Move};

use crate::error::UciError;

/// Parameters accepted by the `go` command.
#[derive(Debug, Default, Clone, Copy)]
pub struct GoParams {
    /// White's remaining clock time.
    pub wtime: Option<Duration>,
    /// Black's remaining clock time.
    pub btime: Option<Duration>,
    /// White's increment per move.
    pub winc: Option<Duration>,
    /// Black's increment per move.
    pub binc: Option<Duration>,
    /// Moves remaining until the next time control.
    pub movestogo: Option<u32>,
    /// Fixed time to search, overriding clock-based limits.
    pub movetime: Option<Duration>,
    /// Fixed depth cap in plies.
    pub depth: Option<u8>,
    /// Hard node budget.
    pub nodes: Option<u64>,
    /// Search until `stop`, ignoring time/depth limits.
    pub infinite: bool,
}

/// A `setoption` target and its new value.
#[derive(Debug, Clone)]
pub enum SetOption {
    /// `setoption name Hash value <mb>` -- resize the transposition table.
    Hash(usize),
    /// `setoption name Clear Hash` -- wipe the transposition table.
    ClearHash,
    /// `setoption name SyzygyPath value <path>` -- accepted, not used by the core.
    SyzygyPath(String),
    /// `setoption name EvalFile value <path>` -- accepted, not used by the core.
    EvalFile(String),
    /// `setoption name Use NNUE value <true|false>`.
    UseNnue(bool),
}

/// A parsed UCI command.
#[derive(Debug)]
pub enum Command {
    /// `uci` -- identify the engine.
    Uci,
    /// `isready` -- synchronization ping.
    IsReady,
    /// `ucinewgame` -- reset engine state.
    UciNewGame,
    /// `position` -- set up a board position with optional moves applied.
    /// The second field is the Zobrist hash of every ancestor position
    /// played before the resulting board, oldest first, for repetition
    /// detection.
    Position(Board, Vec<u64>),
    /// `go` -- start a search with the given parameters.
    Go(GoParams),
    /// `setoption` -- change an engine configuration value.
    SetOption(SetOption),
    /// `stop` -- halt the current search.
    Stop,
    /// `quit` -- exit the engine.
    Quit,
    /// Unrecognized command (silently ignored per UCI spec).
    Unknown(String),
}

/// Parse a single line of UCI input into a [`Command`].
pub fn parse_command(line: &str) -> Result<Command, UciError> {
    let tokens: Vec<&str> = line.split_whitespace().collect();
    if tokens.is_empty() {
        return Ok(Command::Unknown(String::new()));
    }

    match tokens[0] {
        "uci" => Ok(Command::Uci),
        "isready" => Ok(Command::IsReady),
        "ucinewgame" => Ok(Command::UciNewGame),
        "stop" => Ok(Command::Stop),
        "quit" => Ok(Command::Quit),
        "position" => parse_position(&tokens[1..]),
        "go" => parse_go(&tokens[1..]),
        "setoption" => parse_setoption(&tokens[1..]),
        _ => Ok(Command::Unknown(tokens[0].to_string())),
    }
}

/// Parse the `position` command arguments.
///
/// Supports:
/// - `position startpos [moves e2e4 d7d5 ...]`
/// - `position fen <fen-string> [moves e2e4 d7d5 ...]`
fn parse_position(tokens: &[&str]) -> Result<Command, UciError> {
    if tokens.is_empty() {
        return Err(UciError::MalformedPosition);
    }

    let (mut board, rest) = if tokens[0] == "startpos" {
        let rest = &tokens[1..];
        (Board::starting_position(), rest)
    } else if tokens[0] == "fen" {
        // FEN is 6 space-separated fields
        if tokens.len() < 7 {
            return Err(UciError::InvalidFen {
                fen: tokens[1..].join(" "),
            });
        }
        let fen = tokens[1..7].join(" ");
        let board: Board = fen.parse().map_err(|_| UciError::InvalidFen { fen: fen.clone() })?;
        (board, &tokens[7..])
    } else {
        return Err(UciError::MalformedPosition);
    };

    // Apply moves if present: "moves e2e4 d7d5 ...". Each position visited
    // before the final one is an ancestor for repetition detection.
    let mut history = Vec::new();
    if !rest.is_empty() && rest[0] == "moves" {
        for uci_str in &rest[1..] {
            let mv = Move::from_uci(uci_str, &board).ok_or_else(|| UciError::InvalidMove {
                uci_move: uci_str.to_string(),
            })?;
            history.push(board.hash());
            board = board.make_move(mv);
        }
    }

    Ok(Command::Position(board, history))
}

fn parse_duration_ms(tokens: &[&str], i: usize, param: &str) -> Result<Duration, UciError> {
    let raw = tokens.get(i).ok_or_else(|| UciError::MissingGoValue { param: param.to_string() })?;
    let ms: u64 = raw.parse().map_err(|_| UciError::InvalidGoValue {
        param: param.to_string(),
        value: raw.to_string(),
    })?;
    Ok(Duration::from_millis(ms))
}

fn parse_u32(tokens: &[&str], i: usize, param: &str) -> Result<u32, UciError> {
    let raw = tokens.get(i).ok_or_else(|| UciError::MissingGoValue { param: param.to_string() })?;
    raw.parse().map_err(|_| UciError::InvalidGoValue {
        param: param.to_string(),
        value: raw.to_string(),
    })
}

/// Parse the `go` command arguments: `wtime/btime/winc/binc/movestogo`,
/// `movetime`, `depth`, `nodes`, and `infinite`.
fn parse_go(tokens: &[&str]) -> Result<Command, UciError> {
    let mut params = GoParams::default();

    let mut i = 0;
    while i < tokens.len() {
        match tokens[i] {
            "wtime" => {
                params.wtime = Some(parse_duration_ms(tokens, i + 1, "wtime")?);
                i += 2;
            }
            "btime" => {
                params.btime = Some(parse_duration_ms(tokens, i + 1, "btime")?);
                i += 2;
            }
            "winc" => {
                params.winc = Some(parse_duration_ms(tokens, i + 1, "winc")?);
                i += 2;
            }
            "binc" => {
                params.binc = Some(parse_duration_ms(tokens, i + 1, "binc")?);
                i += 2;
            }
            "movestogo" => {
                params.movestogo = Some(parse_u32(tokens, i + 1, "movestogo")?);
                i += 2;
            }
            "movetime" => {
                params.movetime = Some(parse_duration_ms(tokens, i + 1, "movetime")?);
                i += 2;
            }
            "depth" => {
                let raw = tokens.get(i + 1).ok_or_else(|| UciError::MissingGoValue { param: "depth".to_string() })?;
                let depth: u8 = raw.parse().map_err(|_| UciError::InvalidGoValue {
                    param: "depth".to_string(),
                    value: raw.to_string(),
                })?;
                params.depth = Some(depth);
                i += 2;
            }
            "nodes" => {
                let raw = tokens.get(i + 1).ok_or_else(|| UciError::MissingGoValue { param: "nodes".to_string() })?;
                let nodes: u64 = raw.parse().map_err(|_| UciError::InvalidGoValue {
                    param: "nodes".to_string(),
                    value: raw.to_string(),
                })?;
                params.nodes = Some(nodes);
                i += 2;
            }
            "infinite" => {
                params.infinite = true;
                i += 1;
            }
            _ => i += 1,
        }
    }

    Ok(Command::Go(params))
}

/// Parse `setoption name <Name> [value <Value>]`.
fn parse_setoption(tokens: &[&str]) -> Result<Command, UciError> {
    if tokens.first() != Some(&"name") {
        return Ok(Command::Unknown("setoption".to_string()));
    }

    let value_pos = tokens.iter().position(|&t| t == "value");
    let name_tokens = match value_pos {
        Some(vp) => &tokens[1..vp],
        None => &tokens[1..],
    };
    let name = name_tokens.join(" ");
    let value = value_pos.map(|vp| tokens[vp + 1..].join(" "));

    let option = match name.as_str() {
        "Hash" => {
            let raw = value.ok_or_else(|| UciError::MissingGoValue { param: "Hash".to_string() })?;
            let mb: usize = raw.parse().map_err(|_| UciError::InvalidGoValue {
                param: "Hash".to_string(),
                value: raw.clone(),
            })?;
            SetOption::Hash(mb)
        }
        "Clear Hash" => SetOption::ClearHash,
        "SyzygyPath" => SetOption::SyzygyPath(value.unwrap_or_default()),
        "EvalFile" => SetOption::EvalFile(value.unwrap_or_default()),
        "Use NNUE" => SetOption::UseNnue(value.as_deref() == Some("true")),
        _ => return Ok(Command::Unknown(format!("setoption name {name}"))),
    };

    Ok(Command::SetOption(option))
}
