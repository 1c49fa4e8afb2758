//! Evaluation module for cesso engine.
//!
//! `evaluate` is the search core's only window into this module: a black-box
//! `Position -> i32` function, side-to-move relative, in centipawns. The
//! search (`crate::search`) never inspects any of the sub-scores below.

pub mod king_safety;
pub mod material;
pub mod mobility;
pub mod outposts;
pub mod pawns;
pub mod phase;
pub mod pst;
pub mod rooks;
pub mod score;

#[cfg(feature = "nnue")]
pub mod nnue;

use cesso_core::{Board, Color, PieceKind, Square};

use score::Score;

/// Sum every positional term (material, PST, pawns, mobility, king safety,
/// outposts, rooks) into one White-relative packed score.
fn classical_score(board: &Board) -> Score {
    let mut score = material::material(board);

    for sq in Square::all() {
        if let (Some(kind), Some(color)) = (board.piece_on(sq), board.color_on(sq)) {
            let term = pst::pst_value(kind, color, sq);
            score += if color == Color::White { term } else { -term };
        }
    }

    score += pawns::evaluate_pawns(board);
    score += mobility::evaluate_mobility(board);
    score += king_safety::evaluate_king_safety(board);
    score += outposts::evaluate_outposts(board);
    score += rooks::evaluate_rooks(board);
    score
}

/// Blend a packed middlegame/endgame [`Score`] by the current game phase.
fn taper(score: Score, board: &Board) -> i32 {
    let phase = phase::game_phase(board);
    let mg = score.mg() as i32;
    let eg = score.eg() as i32;
    (mg * phase + eg * (phase::MAX_PHASE - phase)) / phase::MAX_PHASE
}

/// Static evaluation of `board`, in centipawns, relative to the side to move.
///
/// This is the sole black-box evaluation entry point the search core calls
/// (spec §6: `evaluate(pos) -> int`). With the `nnue` feature enabled the
/// network replaces the classical terms; with `hce` (the default) the
/// hand-crafted terms above are used directly.
pub fn evaluate(board: &Board) -> i32 {
    #[cfg(feature = "nnue")]
    {
        return nnue::evaluate(board);
    }

    #[cfg(not(feature = "nnue"))]
    {
        let white_relative = taper(classical_score(board), board);
        let material_count = board.pieces(PieceKind::Pawn).count()
            + board.pieces(PieceKind::Knight).count()
            + board.pieces(PieceKind::Bishop).count()
            + board.pieces(PieceKind::Rook).count()
            + board.pieces(PieceKind::Queen).count();
        // Nudge toward simplification when ahead, per standard HCE practice:
        // a known material edge is worth slightly more as pieces come off.
        let scaled = if material_count < 6 {
            white_relative + white_relative.signum() * 10
        } else {
            white_relative
        };
        if board.side_to_move() == Color::White {
            scaled
        } else {
            -scaled
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn starting_position_is_near_zero() {
        let board = Board::starting_position();
        assert_eq!(evaluate(&board), 0);
    }

    #[test]
    fn extra_queen_favors_side_to_move_appropriately() {
        // White has an extra queen; white to move should see a large positive score.
        let board: Board = "4k3/8/8/8/8/8/8/3QK3 w - - 0 1".parse().unwrap();
        assert!(evaluate(&board) > 500);

        // Same position, black to move: score flips sign (still White-favored
        // in absolute terms, but negative from Black's perspective).
        let board_black: Board = "4k3/8/8/8/8/8/8/3QK3 b - - 0 1".parse().unwrap();
        assert!(evaluate(&board_black) < -500);
    }
}
