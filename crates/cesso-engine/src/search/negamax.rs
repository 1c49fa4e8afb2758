//! Negamax alpha-beta search with quiescence, PVS, and LMR.

use cesso_core::{Board, Move, MoveKind, PieceKind, generate_legal_moves};

use crate::evaluate;
use crate::search::control::SearchControl;
use crate::search::heuristics::{CaptureHistory, ContinuationHistory, KillerTable, QuietHistory};
use crate::search::ordering::{MovePicker, lmr_reduction};
use crate::search::params::{gravity_bonus, SearchParams};
use crate::search::see::see_ge;
use crate::search::stack::{ContHistIndex, SearchStack};
use crate::search::tt::{Bound, TranspositionTable};
use cesso_core::Color;

/// Score representing an unreachable upper/lower bound.
pub const INF: i32 = 30_000;

/// Base score for checkmate (adjusted by ply for mate distance).
pub const MATE_SCORE: i32 = 29_000;

/// Scores above this threshold indicate a forced mate.
pub const MATE_THRESHOLD: i32 = 28_000;

/// Maximum search depth (in plies) for array sizing and recursion limits.
pub const MAX_PLY: usize = 128;

/// Parameters passed to each negamax call beyond alpha/beta.
#[derive(Clone, Copy)]
pub(super) struct NodeParams {
    pub depth: u8,
    pub ply: u8,
    pub do_null: bool,
    /// Whether this node's ancestor path still matches the previous
    /// iteration's PV line (spec.md 4.2 step 11's "follow_pv" flag).
    pub following_pv: bool,
}

/// Check if the side to move has any non-pawn, non-king material.
fn has_non_pawn_material(board: &Board) -> bool {
    let us = board.side_to_move();
    let our_pieces = board.side(us);
    (board.pieces(PieceKind::Knight) & our_pieces).is_nonempty()
        || (board.pieces(PieceKind::Bishop) & our_pieces).is_nonempty()
        || (board.pieces(PieceKind::Rook) & our_pieces).is_nonempty()
        || (board.pieces(PieceKind::Queen) & our_pieces).is_nonempty()
}

/// Negamax alpha-beta search with PVS, LMR, razoring, static/null-move pruning.
///
/// Returns the best score for the side to move, or the timeout sentinel
/// [`INF`] if the search was aborted mid-node. The principal variation is
/// collected into `ctx.pv`.
pub(super) fn negamax(board: &Board, mut alpha: i32, beta: i32, params: NodeParams, ctx: &mut SearchContext<'_>) -> i32 {
    let NodeParams { mut depth, ply, do_null, following_pv } = params;
    let is_pv = beta - alpha > 1;
    let is_root = ply == 0;

    ctx.pv.clear_ply(ply as usize);
    ctx.nodes += 1;

    if ply as usize >= MAX_PLY - 1 {
        return evaluate(board);
    }

    // Terminal guards (repetition, 50-move rule) — not at the root.
    if ply > 0 {
        if board.halfmove_clock() >= 100 {
            return ctx.draw_score(board);
        }
        let hash = board.hash();
        let hmc = board.halfmove_clock() as usize;
        let len = ctx.history.len();
        let lookback = hmc.min(len);
        if ctx.history[len.saturating_sub(lookback)..len].iter().any(|&h| h == hash) {
            return ctx.draw_score(board);
        }
    }

    // Mate distance pruning.
    if !is_root {
        alpha = alpha.max(-MATE_SCORE + ply as i32);
        let new_beta = beta.min(MATE_SCORE - ply as i32 - 1);
        if alpha >= new_beta {
            return alpha;
        }
    }

    // TT probe.
    let mut tt_move = Move::NULL;
    let mut tt_is_pv = is_pv;
    if let Some(tt_entry) = ctx.tt.probe(board.hash(), ply) {
        tt_move = tt_entry.best_move;
        tt_is_pv = tt_is_pv || tt_entry.is_pv;

        if !is_pv && tt_entry.depth >= depth {
            let cutoff = match tt_entry.bound {
                Bound::Exact => true,
                Bound::LowerBound => tt_entry.score >= beta,
                Bound::UpperBound => tt_entry.score <= alpha,
                Bound::None => false,
            };
            if cutoff {
                return tt_entry.score;
            }
        }
    }

    // Periodic time check.
    if ctx.control.should_stop(ctx.nodes) {
        return INF;
    }

    let king_sq = board.king_square(board.side_to_move());
    let in_check = board.is_square_attacked(king_sq, board.side_to_move().flip());

    if in_check {
        depth += 1;
    }

    if depth == 0 {
        return qsearch(board, ply, alpha, beta, ctx);
    }

    let static_eval = evaluate(board);
    ctx.stack.at_mut(ply as usize).static_eval = static_eval;

    if !in_check {
        // Reverse futility / static null-move pruning.
        if !is_pv && depth < 3 && beta.abs() < MATE_THRESHOLD {
            let margin = ctx.params.rfp_margin_per_depth * depth as i32;
            if static_eval - margin >= beta {
                return static_eval - margin;
            }
        }

        // Null-move pruning.
        if do_null && !is_pv && ply > 0 && depth >= ctx.params.null_move_min_depth
            && has_non_pawn_material(board)
        {
            let null_board = board.make_null_move();
            ctx.history.push(board.hash());
            let r = ctx.params.null_move_reduction;
            let null_score = -negamax(
                &null_board,
                -beta,
                -beta + 1,
                NodeParams {
                    depth: depth.saturating_sub(1 + r),
                    ply: ply + 1,
                    do_null: false,
                    following_pv: false,
                },
                ctx,
            );
            ctx.history.pop();

            if null_score >= beta {
                return beta;
            }
        }

        // Razoring: shallow fail-low shortcut using static eval plus margin.
        if !is_pv && depth <= 3 {
            let margin = ctx.params.razor_margin[depth as usize];
            let s = static_eval + margin;
            if s < beta {
                let razor_score = qsearch(board, ply, alpha, beta, ctx);
                if razor_score < beta {
                    return razor_score.max(s);
                }
            }
        }

        // Internal Iterative Reduction: no TT move at a PV/cut node.
        if is_pv && depth >= ctx.params.iir_min_depth && tt_move.is_null() {
            depth = depth.saturating_sub(ctx.params.iir_reduction);
        }
    }

    let moves = generate_legal_moves(board);
    if moves.is_empty() {
        return if in_check {
            -(MATE_SCORE - ply as i32)
        } else {
            ctx.draw_score(board)
        };
    }

    let pv_move = if following_pv && (ply as usize) < ctx.pv_line.len() {
        ctx.pv_line[ply as usize]
    } else {
        Move::NULL
    };

    let original_alpha = alpha;
    let mut best_score = -INF;
    let mut best_move = Move::NULL;
    let mut picker = MovePicker::new(
        &moves,
        board,
        tt_move,
        pv_move,
        ply as usize,
        &ctx.killers,
        &ctx.quiet_history,
        &ctx.capture_history,
        &ctx.cont_history,
        &ctx.stack,
    );

    let mut searched_quiets = [Move::NULL; 64];
    let mut quiet_count: usize = 0;
    let mut move_count: usize = 0;

    while let Some(mv) = picker.pick_next() {
        let is_capture = board.piece_on(mv.dest()).is_some() || mv.kind() == MoveKind::EnPassant;
        let is_tactical = is_capture || mv.kind() == MoveKind::Promotion;
        let is_quiet_move = !is_tactical;
        let moved_piece = board.piece_on(mv.source()).unwrap_or(PieceKind::Pawn);

        if is_quiet_move && quiet_count < 64 {
            searched_quiets[quiet_count] = mv;
            quiet_count += 1;
        }

        ctx.stack.at_mut(ply as usize).current_move = mv;
        ctx.stack.at_mut(ply as usize).moved_piece = moved_piece;
        ctx.stack.at_mut(ply as usize).cont_hist_index = Some(ContHistIndex { piece: moved_piece, to: mv.dest() });

        let child = board.make_move(mv);
        move_count += 1;
        ctx.history.push(board.hash());

        let child_following_pv = following_pv && mv == pv_move;
        let new_depth = depth - 1;

        let score;
        if move_count == 1 {
            score = -negamax(
                &child,
                -beta,
                -alpha,
                NodeParams { depth: new_depth, ply: ply + 1, do_null: true, following_pv: child_following_pv },
                ctx,
            );
        } else {
            let do_lmr = depth > 2
                && move_count > 2 + is_pv as usize
                && ply > 0
                && is_quiet_move
                && !in_check;

            let searched_depth = if do_lmr {
                let mut r = lmr_reduction(depth, move_count) as i32;
                if !is_pv {
                    r += 1;
                }
                new_depth.saturating_sub(r.max(1) as u8).max(1)
            } else {
                new_depth
            };

            let mut sc = -negamax(
                &child,
                -alpha - 1,
                -alpha,
                NodeParams { depth: searched_depth, ply: ply + 1, do_null: true, following_pv: false },
                ctx,
            );

            if sc > alpha && searched_depth < new_depth {
                sc = -negamax(
                    &child,
                    -alpha - 1,
                    -alpha,
                    NodeParams { depth: new_depth, ply: ply + 1, do_null: true, following_pv: false },
                    ctx,
                );
            }

            if sc > alpha && is_pv {
                sc = -negamax(
                    &child,
                    -beta,
                    -alpha,
                    NodeParams { depth: new_depth, ply: ply + 1, do_null: true, following_pv: child_following_pv },
                    ctx,
                );
            }

            score = sc;
        }

        ctx.history.pop();

        if ctx.control.should_stop(ctx.nodes) {
            return INF;
        }

        if score > best_score {
            best_score = score;
            best_move = mv;
            if score > alpha {
                alpha = score;
                ctx.pv.update(ply as usize, mv);
            }
        }

        if alpha >= beta {
            if is_quiet_move {
                ctx.killers.store(ply as usize, mv);
                let bonus = gravity_bonus(depth);

                ctx.quiet_history.update(moved_piece, mv.source(), mv.dest(), bonus, ctx.params);
                ctx.cont_history.update(&ctx.stack, ply as usize, moved_piece, mv.dest(), bonus, ctx.params);

                for &bad_mv in &searched_quiets[..quiet_count.saturating_sub(1)] {
                    if let Some(bad_piece) = board.piece_on(bad_mv.source()) {
                        ctx.quiet_history.update(bad_piece, bad_mv.source(), bad_mv.dest(), -bonus, ctx.params);
                        ctx.cont_history.update(&ctx.stack, ply as usize, bad_piece, bad_mv.dest(), -bonus, ctx.params);
                    }
                }
            } else if is_capture {
                let victim = if mv.kind() == MoveKind::EnPassant {
                    PieceKind::Pawn
                } else {
                    board.piece_on(mv.dest()).unwrap_or(PieceKind::Pawn)
                };
                let bonus = gravity_bonus(depth);
                ctx.capture_history.update(moved_piece, victim, mv.source(), mv.dest(), bonus, ctx.params);
            }
            break;
        }
    }

    let bound = if best_score <= original_alpha {
        Bound::UpperBound
    } else if best_score >= beta {
        Bound::LowerBound
    } else {
        Bound::Exact
    };

    let store_move = if bound == Bound::UpperBound && best_move.is_null() {
        tt_move
    } else {
        best_move
    };
    ctx.tt.store(board.hash(), depth, best_score, static_eval, store_move, bound, ply, is_pv || tt_is_pv);

    best_score
}

/// Aspiration window search — wraps [`negamax`] with a narrow window
/// that widens on fail-high/fail-low.
///
/// For depths 1-4 or near-mate scores, uses a full window.
/// For deeper searches, starts with `delta = params.aspiration_delta`.
pub(super) fn aspiration_search(board: &Board, depth: u8, prev_score: i32, ctx: &mut SearchContext<'_>) -> i32 {
    let following_pv = !ctx.pv_line.is_empty();
    let base_params = NodeParams { depth, ply: 0, do_null: true, following_pv };

    if depth <= 4 || prev_score.abs() >= MATE_THRESHOLD {
        return negamax(board, -INF, INF, base_params, ctx);
    }

    let mut delta = ctx.params.aspiration_delta;
    let mut alpha = (prev_score - delta).max(-INF);
    let mut beta = (prev_score + delta).min(INF);

    loop {
        let score = negamax(board, alpha, beta, base_params, ctx);

        if ctx.control.should_stop(ctx.nodes) {
            return score;
        }

        if score <= alpha {
            delta *= 4;
            alpha = (prev_score - delta).max(-INF);
            if delta > INF {
                alpha = -INF;
                beta = INF;
            }
        } else if score >= beta {
            delta *= 4;
            beta = (prev_score + delta).min(INF);
            if delta > INF {
                alpha = -INF;
                beta = INF;
            }
        } else {
            return score;
        }
    }
}

/// Quiescence search — resolve tactical sequences before evaluating.
///
/// Only considers captures and promotions (via [`MovePicker::new_qsearch`])
/// to avoid the horizon effect. Losing captures (negative SEE) are pruned.
fn qsearch(board: &Board, ply: u8, mut alpha: i32, beta: i32, ctx: &mut SearchContext<'_>) -> i32 {
    ctx.nodes += 1;

    if ctx.control.should_stop(ctx.nodes) {
        return INF;
    }

    if ply as usize >= MAX_PLY - 1 {
        return evaluate(board);
    }

    if board.halfmove_clock() >= 100 {
        return ctx.draw_score(board);
    }

    let stand_pat = evaluate(board);
    if stand_pat >= beta {
        return stand_pat;
    }
    if stand_pat > alpha {
        alpha = stand_pat;
    }

    let moves = generate_legal_moves(board);
    let mut picker = MovePicker::new_qsearch(&moves, board);

    while let Some(mv) = picker.pick_next() {
        if mv.kind() != MoveKind::Promotion && !see_ge(board, mv, 0) {
            continue;
        }

        let child = board.make_move(mv);
        let score = -qsearch(&child, ply + 1, -beta, -alpha, ctx);

        if score >= beta {
            return score;
        }
        if score > alpha {
            alpha = score;
        }
    }

    alpha
}

/// Triangular PV table for collecting principal variation lines.
///
/// Stored on the heap via `SearchContext` (~33 KB). Each row `ply` contains
/// the PV continuation from that ply onward.
pub struct PvTable {
    moves: [[Move; MAX_PLY]; MAX_PLY],
    len: [usize; MAX_PLY],
}

impl PvTable {
    /// Create a zeroed PV table.
    pub fn new() -> Self {
        Self {
            moves: [[Move::NULL; MAX_PLY]; MAX_PLY],
            len: [0; MAX_PLY],
        }
    }

    /// Clear the PV line at `ply` (called at the top of each node).
    pub fn clear_ply(&mut self, ply: usize) {
        if ply < MAX_PLY {
            self.len[ply] = 0;
        }
    }

    /// Update the PV at `ply`: set `mv` as the best move and copy
    /// the continuation from `ply + 1`.
    pub fn update(&mut self, ply: usize, mv: Move) {
        if ply >= MAX_PLY {
            return;
        }

        self.moves[ply][0] = mv;

        let child_ply = ply + 1;
        if child_ply < MAX_PLY {
            let child_len = self.len[child_ply];
            let copy_len = child_len.min(MAX_PLY - 1);

            let (top, bottom) = self.moves.split_at_mut(child_ply);
            top[ply][1..1 + copy_len].copy_from_slice(&bottom[0][..copy_len]);

            self.len[ply] = 1 + copy_len;
        } else {
            self.len[ply] = 1;
        }
    }

    /// The principal variation from the root.
    pub fn root_pv(&self) -> &[Move] {
        &self.moves[0][..self.len[0]]
    }

    /// Length of the root PV line.
    pub fn root_len(&self) -> usize {
        self.len[0]
    }
}

impl Default for PvTable {
    fn default() -> Self {
        Self::new()
    }
}

/// Search state threaded through negamax calls.
pub(super) struct SearchContext<'a> {
    /// Total nodes visited.
    pub nodes: u64,
    /// Transposition table (shared, lockless).
    pub tt: &'a TranspositionTable,
    /// Principal variation table.
    pub pv: PvTable,
    /// Search control (stop flag + time limits).
    pub control: &'a SearchControl,
    /// Tunable search constants.
    pub params: &'a SearchParams,
    /// Killer move table.
    pub killers: KillerTable,
    /// Quiet-move history table.
    pub quiet_history: QuietHistory,
    /// Capture history table.
    pub capture_history: CaptureHistory,
    /// Continuation history table.
    pub cont_history: Box<ContinuationHistory>,
    /// Per-ply search stack.
    pub stack: SearchStack,
    /// Zobrist hashes of positions visited during this search (for repetition detection).
    pub history: Vec<u64>,
    /// Contempt factor in centipawns — biases draw evaluation.
    pub contempt: i32,
    /// The color the engine is playing (for contempt sign).
    pub engine_color: Color,
    /// The previous iteration's root PV, consulted for move-ordering's PV bonus.
    pub pv_line: Vec<Move>,
}

impl SearchContext<'_> {
    /// Contempt-aware draw score for negamax.
    ///
    /// When the engine is to move, a draw scores `-contempt` (bad when
    /// contempt > 0). When the opponent is to move, it scores `+contempt`.
    #[inline]
    fn draw_score(&self, board: &Board) -> i32 {
        if board.side_to_move() == self.engine_color {
            -self.contempt
        } else {
            self.contempt
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::search::tt::TranspositionTable;
    use std::sync::atomic::AtomicBool;
    use std::sync::Arc;

    fn fresh_ctx<'a>(
        tt: &'a TranspositionTable,
        control: &'a SearchControl,
        params: &'a SearchParams,
    ) -> SearchContext<'a> {
        SearchContext {
            nodes: 0,
            tt,
            pv: PvTable::new(),
            control,
            params,
            killers: KillerTable::new(),
            quiet_history: QuietHistory::new(),
            capture_history: CaptureHistory::new(),
            cont_history: Box::new(ContinuationHistory::new()),
            stack: SearchStack::new(),
            history: Vec::new(),
            contempt: 0,
            engine_color: Color::White,
            pv_line: Vec::new(),
        }
    }

    #[test]
    fn mate_in_one_found_at_depth_two() {
        let board: Board = "6k1/5ppp/8/8/8/8/5PPP/R6K w - - 0 1".parse().unwrap();
        let tt = TranspositionTable::new(1);
        let stopped = Arc::new(AtomicBool::new(false));
        let control = SearchControl::new_infinite(stopped);
        let params = SearchParams::default();
        let mut ctx = fresh_ctx(&tt, &control, &params);

        let score = aspiration_search(&board, 2, 0, &mut ctx);
        assert!(score >= MATE_SCORE - 3, "score={score}");
        assert_eq!(ctx.pv.root_pv()[0], Move::new(cesso_core::Square::A1, cesso_core::Square::A8));
    }

    #[test]
    fn stalemate_scores_zero() {
        let board: Board = "7k/5Q2/6K1/8/8/8/8/8 b - - 0 1".parse().unwrap();
        let tt = TranspositionTable::new(1);
        let stopped = Arc::new(AtomicBool::new(false));
        let control = SearchControl::new_infinite(stopped);
        let params = SearchParams::default();
        let mut ctx = fresh_ctx(&tt, &control, &params);

        let score = negamax(&board, -INF, INF, NodeParams { depth: 1, ply: 0, do_null: true, following_pv: false }, &mut ctx);
        assert_eq!(score, 0);
        assert_eq!(ctx.pv.root_len(), 0);
    }

    #[test]
    fn mated_scores_negative_mate() {
        let board: Board = "6k1/6R1/5K2/8/8/8/8/8 b - - 0 1".parse().unwrap();
        let tt = TranspositionTable::new(1);
        let stopped = Arc::new(AtomicBool::new(false));
        let control = SearchControl::new_infinite(stopped);
        let params = SearchParams::default();
        let mut ctx = fresh_ctx(&tt, &control, &params);

        let score = negamax(&board, -INF, INF, NodeParams { depth: 1, ply: 0, do_null: true, following_pv: false }, &mut ctx);
        assert!(score <= -MATE_SCORE + 1, "score={score}");
    }

    #[test]
    fn deeper_search_visits_at_least_as_many_nodes() {
        let board = Board::starting_position();
        let tt = TranspositionTable::new(1);
        let stopped = Arc::new(AtomicBool::new(false));
        let control = SearchControl::new_infinite(stopped);
        let params = SearchParams::default();

        let mut ctx3 = fresh_ctx(&tt, &control, &params);
        aspiration_search(&board, 3, 0, &mut ctx3);

        let tt2 = TranspositionTable::new(1);
        let mut ctx4 = fresh_ctx(&tt2, &control, &params);
        aspiration_search(&board, 4, 0, &mut ctx4);

        assert!(ctx4.nodes >= ctx3.nodes);
    }

    #[test]
    fn repetition_in_history_scores_draw() {
        let board = Board::starting_position();
        let tt = TranspositionTable::new(1);
        let stopped = Arc::new(AtomicBool::new(false));
        let control = SearchControl::new_infinite(stopped);
        let params = SearchParams::default();
        let mut ctx = fresh_ctx(&tt, &control, &params);
        ctx.history.push(board.hash());

        let score = negamax(&board, -INF, INF, NodeParams { depth: 1, ply: 1, do_null: true, following_pv: false }, &mut ctx);
        assert_eq!(score, 0);
    }

    #[test]
    fn aborted_search_returns_timeout_sentinel() {
        let board = Board::starting_position();
        let tt = TranspositionTable::new(1);
        let stopped = Arc::new(AtomicBool::new(true));
        let control = SearchControl::new_infinite(stopped);
        let params = SearchParams::default();
        let mut ctx = fresh_ctx(&tt, &control, &params);

        let score = negamax(&board, -INF, INF, NodeParams { depth: 4, ply: 0, do_null: true, following_pv: false }, &mut ctx);
        assert_eq!(score, INF);
    }
}
