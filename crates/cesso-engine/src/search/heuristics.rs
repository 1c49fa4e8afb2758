//! Killer moves and history tables for quiet-move ordering.
//!
//! Every history table updates with the same gravity formula: the bonus or
//! malus decays the existing value proportionally, so a table self-stabilizes
//! instead of growing without bound (see `params::gravity_bonus`).

use cesso_core::{Move, PieceKind, Square};

use crate::search::negamax::MAX_PLY;
use crate::search::params::SearchParams;
use crate::search::stack::{ContHistIndex, SearchStack};

/// Two killer moves per ply — quiet moves that caused a beta cutoff.
pub struct KillerTable {
    slots: [[Move; 2]; MAX_PLY],
}

impl KillerTable {
    pub fn new() -> Self {
        Self {
            slots: [[Move::NULL; 2]; MAX_PLY],
        }
    }

    /// Store a killer move at the given ply, shifting slot 0 into slot 1.
    pub fn store(&mut self, ply: usize, mv: Move) {
        if ply >= MAX_PLY {
            return;
        }
        if self.slots[ply][0] != mv {
            self.slots[ply][1] = self.slots[ply][0];
            self.slots[ply][0] = mv;
        }
    }

    pub fn first(&self, ply: usize) -> Move {
        if ply >= MAX_PLY { Move::NULL } else { self.slots[ply][0] }
    }

    pub fn second(&self, ply: usize) -> Move {
        if ply >= MAX_PLY { Move::NULL } else { self.slots[ply][1] }
    }

    pub fn is_killer(&self, ply: usize, mv: Move) -> bool {
        if ply >= MAX_PLY {
            return false;
        }
        self.slots[ply][0] == mv || self.slots[ply][1] == mv
    }
}

impl Default for KillerTable {
    fn default() -> Self {
        Self::new()
    }
}

/// Apply the gravity update to one history cell.
///
/// `bonus` drives both direction and magnitude: positive rewards a cutoff
/// move, negative penalizes a quiet move that was searched but didn't cut
/// off. The update is `cell += adjust - cell * |adjust| / history_max`,
/// clamped to the table's envelope before being applied.
fn gravity_update(cell: &mut i32, bonus: i32, cap: i32, history_max: i32) {
    let adjust = bonus.clamp(-cap, cap);
    *cell += adjust - *cell * adjust.abs() / history_max;
}

/// Quiet-move history, keyed `[piece][from][to]`.
pub struct QuietHistory {
    table: Box<[[[i32; 64]; 64]; PieceKind::COUNT]>,
}

impl QuietHistory {
    pub fn new() -> Self {
        Self {
            table: Box::new([[[0; 64]; 64]; PieceKind::COUNT]),
        }
    }

    pub fn score(&self, piece: PieceKind, from: Square, to: Square) -> i32 {
        self.table[piece.index()][from.index()][to.index()]
    }

    pub fn update(&mut self, piece: PieceKind, from: Square, to: Square, bonus: i32, params: &SearchParams) {
        let cap = if bonus >= 0 { params.quiet_bonus_max } else { params.quiet_malus_max };
        gravity_update(&mut self.table[piece.index()][from.index()][to.index()], bonus, cap, params.history_max);
    }
}

impl Default for QuietHistory {
    fn default() -> Self {
        Self::new()
    }
}

/// Capture history, keyed `[piece][captured][from][to]`.
pub struct CaptureHistory {
    table: Box<[[[[i32; 64]; 64]; PieceKind::COUNT]; PieceKind::COUNT]>,
}

impl CaptureHistory {
    pub fn new() -> Self {
        Self {
            table: Box::new([[[[0; 64]; 64]; PieceKind::COUNT]; PieceKind::COUNT]),
        }
    }

    pub fn score(&self, piece: PieceKind, captured: PieceKind, from: Square, to: Square) -> i32 {
        self.table[piece.index()][captured.index()][from.index()][to.index()]
    }

    pub fn update(
        &mut self,
        piece: PieceKind,
        captured: PieceKind,
        from: Square,
        to: Square,
        bonus: i32,
        params: &SearchParams,
    ) {
        let cap = if bonus >= 0 { params.capture_bonus_max } else { params.capture_malus_max };
        gravity_update(
            &mut self.table[piece.index()][captured.index()][from.index()][to.index()],
            bonus,
            cap,
            params.history_max,
        );
    }
}

impl Default for CaptureHistory {
    fn default() -> Self {
        Self::new()
    }
}

/// Continuation history, keyed `(prev piece, prev to) x (piece, to)`.
///
/// Consulted at lookback 1 and 2 plies: "what tends to follow well after
/// this piece landed on this square, one or two moves ago."
pub struct ContinuationHistory {
    table: Box<[[[[i32; 64]; PieceKind::COUNT]; 64]; PieceKind::COUNT]>,
}

impl ContinuationHistory {
    pub fn new() -> Self {
        Self {
            table: Box::new([[[[0; 64]; PieceKind::COUNT]; 64]; PieceKind::COUNT]),
        }
    }

    fn score_one(&self, prev: ContHistIndex, piece: PieceKind, to: Square) -> i32 {
        self.table[prev.piece.index()][prev.to.index()][piece.index()][to.index()]
    }

    /// Combined score over the 1-back and 2-back continuation tables.
    pub fn score(&self, stack: &SearchStack, ply: usize, piece: PieceKind, to: Square) -> i32 {
        let mut total = 0;
        if let Some(prev) = stack.back(ply, 1).cont_hist_index {
            total += self.score_one(prev, piece, to);
        }
        if let Some(prev) = stack.back(ply, 2).cont_hist_index {
            total += self.score_one(prev, piece, to);
        }
        total
    }

    fn update_one(&mut self, prev: ContHistIndex, piece: PieceKind, to: Square, bonus: i32, params: &SearchParams) {
        let cap = if bonus >= 0 { params.cont_bonus_max } else { params.cont_malus_max };
        gravity_update(
            &mut self.table[prev.piece.index()][prev.to.index()][piece.index()][to.index()],
            bonus,
            cap,
            params.history_max,
        );
    }

    /// Update both the 1-back and 2-back tables for the move just made.
    pub fn update(&mut self, stack: &SearchStack, ply: usize, piece: PieceKind, to: Square, bonus: i32, params: &SearchParams) {
        if let Some(prev) = stack.back(ply, 1).cont_hist_index {
            self.update_one(prev, piece, to, bonus, params);
        }
        if let Some(prev) = stack.back(ply, 2).cont_hist_index {
            self.update_one(prev, piece, to, bonus, params);
        }
    }
}

impl Default for ContinuationHistory {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cesso_core::{Move, Square};
    use crate::search::params;

    #[test]
    fn killer_store_and_check() {
        let mut kt = KillerTable::new();
        let mv1 = Move::new(Square::E2, Square::E4);
        let mv2 = Move::new(Square::D2, Square::D4);

        kt.store(5, mv1);
        assert!(kt.is_killer(5, mv1));
        assert!(!kt.is_killer(5, mv2));

        kt.store(5, mv2);
        assert!(kt.is_killer(5, mv1));
        assert!(kt.is_killer(5, mv2));
    }

    #[test]
    fn killer_same_move_no_shift() {
        let mut kt = KillerTable::new();
        let mv1 = Move::new(Square::E2, Square::E4);
        let mv2 = Move::new(Square::D2, Square::D4);

        kt.store(0, mv1);
        kt.store(0, mv2);
        kt.store(0, mv2);
        assert!(kt.is_killer(0, mv1));
        assert!(kt.is_killer(0, mv2));
    }

    #[test]
    fn quiet_history_gravity_converges() {
        let params = SearchParams::default();
        let mut hist = QuietHistory::new();
        let (piece, from, to) = (PieceKind::Knight, Square::G1, Square::F3);

        for _ in 0..1000 {
            hist.update(piece, from, to, params::gravity_bonus(6), &params);
        }
        let score = hist.score(piece, from, to);
        assert!(score > 0 && score <= params.quiet_bonus_max, "score={score}");
    }

    #[test]
    fn quiet_history_penalty_is_negative() {
        let params = SearchParams::default();
        let mut hist = QuietHistory::new();
        let (piece, from, to) = (PieceKind::Pawn, Square::E2, Square::E4);

        hist.update(piece, from, to, -params::gravity_bonus(4), &params);
        assert!(hist.score(piece, from, to) < 0);
    }

    #[test]
    fn continuation_history_round_trips() {
        let params = SearchParams::default();
        let mut cont = ContinuationHistory::new();
        let mut stack = SearchStack::new();

        stack.at_mut(0).cont_hist_index = Some(ContHistIndex { piece: PieceKind::Pawn, to: Square::E4 });
        stack.at_mut(1).cont_hist_index = Some(ContHistIndex { piece: PieceKind::Knight, to: Square::F6 });

        cont.update(&stack, 2, PieceKind::Bishop, Square::C4, params::gravity_bonus(5), &params);
        assert!(cont.score(&stack, 2, PieceKind::Bishop, Square::C4) > 0);
        assert_eq!(cont.score(&stack, 0, PieceKind::Bishop, Square::C4), 0);
    }
}
