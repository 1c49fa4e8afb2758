//! Lazy SMP thread pool for parallel search.
//!
//! N independent threads share one transposition table; each owns its own
//! heuristic tables and search stack. Coordination is limited to the atomic
//! stop flag and lock-free TT access (spec.md's permitted concurrency
//! extension over the single-threaded baseline).

use std::sync::atomic::{AtomicU64, Ordering};

use cesso_core::{Board, Move};

use crate::search::SearchResult;
use crate::search::control::SearchControl;
use crate::search::heuristics::{CaptureHistory, ContinuationHistory, KillerTable, QuietHistory};
use crate::search::negamax::{INF, PvTable, SearchContext, aspiration_search};
use crate::search::params::SearchParams;
use crate::search::stack::SearchStack;
use crate::search::tt::TranspositionTable;

/// Lazy SMP thread pool — owns the shared transposition table.
pub struct ThreadPool {
    tt: TranspositionTable,
    params: SearchParams,
    num_threads: usize,
}

impl ThreadPool {
    /// Create a new thread pool with `hash_mb` MB transposition table.
    pub fn new(hash_mb: usize) -> Self {
        Self {
            tt: TranspositionTable::new(hash_mb),
            params: SearchParams::default(),
            num_threads: 1,
        }
    }

    /// Set the number of search threads.
    pub fn set_num_threads(&mut self, n: usize) {
        self.num_threads = n.max(1);
    }

    /// Resize the transposition table.
    pub fn resize_tt(&mut self, mb: usize) {
        self.tt = TranspositionTable::new(mb);
    }

    /// Clear the transposition table.
    pub fn clear_tt(&self) {
        self.tt.clear();
    }

    /// Per-mille occupancy of the transposition table's current generation.
    pub fn hash_full(&self) -> i32 {
        self.tt.hash_full()
    }

    /// Run a Lazy SMP search.
    ///
    /// Thread 0 runs full iterative deepening with the `on_iter` callback for UCI output.
    /// Threads 1..N-1 run silent iterative deepening, contributing only to the shared TT.
    /// Uses `std::thread::scope` — no `Arc` needed on the TT.
    pub fn search<F>(
        &self,
        board: &Board,
        max_depth: u8,
        control: &SearchControl,
        history: &[u64],
        mut on_iter: F,
    ) -> SearchResult
    where
        F: FnMut(u8, i32, u64, &[Move]),
    {
        self.tt.new_generation();

        if self.num_threads <= 1 {
            return self.search_main(board, max_depth, control, history, &mut on_iter, None);
        }

        let node_counters: Vec<AtomicU64> = (0..self.num_threads).map(|_| AtomicU64::new(0)).collect();

        let mut result = SearchResult {
            best_move: Move::NULL,
            pv: vec![Move::NULL],
            score: -INF,
            nodes: 0,
            depth: 0,
        };

        std::thread::scope(|s| {
            for (thread_id, node_counter) in node_counters.iter().enumerate().skip(1) {
                let tt = &self.tt;
                let params = &self.params;
                s.spawn(move || {
                    run_helper(thread_id, tt, params, board, max_depth, control, node_counter, history);
                });
            }

            result = self.search_main(board, max_depth, control, history, &mut on_iter, Some(&node_counters[0]));
        });

        let total_nodes: u64 = node_counters.iter().map(|c| c.load(Ordering::Relaxed)).sum();
        result.nodes = total_nodes;

        result
    }

    /// Run iterative deepening on the calling thread, reporting via `on_iter`.
    ///
    /// When `node_counter` is `Some`, this is a Lazy SMP coordinator thread
    /// running alongside helpers; otherwise it's the single-thread fast path.
    fn search_main<F>(
        &self,
        board: &Board,
        max_depth: u8,
        control: &SearchControl,
        history: &[u64],
        on_iter: &mut F,
        node_counter: Option<&AtomicU64>,
    ) -> SearchResult
    where
        F: FnMut(u8, i32, u64, &[Move]),
    {
        let mut ctx = SearchContext {
            nodes: 0,
            tt: &self.tt,
            pv: PvTable::new(),
            control,
            params: &self.params,
            killers: KillerTable::new(),
            quiet_history: QuietHistory::new(),
            capture_history: CaptureHistory::new(),
            cont_history: Box::new(ContinuationHistory::new()),
            stack: SearchStack::new(),
            history: history.to_vec(),
            contempt: 0,
            engine_color: board.side_to_move(),
            pv_line: Vec::new(),
        };

        let mut completed_move = Move::NULL;
        let mut completed_score = -INF;
        let mut completed_depth: u8 = 0;
        let mut completed_pv: Vec<Move> = Vec::new();
        let mut prev_score: i32 = 0;

        for depth in 1..=max_depth {
            if control.should_stop_iterating() {
                break;
            }

            ctx.pv_line = completed_pv.clone();
            let score = aspiration_search(board, depth, prev_score, &mut ctx);

            if control.should_stop(ctx.nodes) {
                break;
            }

            prev_score = score;

            let pv = ctx.pv.root_pv();
            if !pv.is_empty() && !pv[0].is_null() {
                completed_move = pv[0];
            }
            completed_score = score;
            completed_depth = depth;
            completed_pv = pv.iter().copied().filter(|m| !m.is_null()).collect();

            on_iter(depth, score, ctx.nodes, &completed_pv);
        }

        if let Some(counter) = node_counter {
            counter.store(ctx.nodes, Ordering::Relaxed);
        }

        SearchResult {
            best_move: completed_move,
            pv: if completed_pv.is_empty() { vec![completed_move] } else { completed_pv },
            score: completed_score,
            nodes: ctx.nodes,
            depth: completed_depth,
        }
    }
}

/// Silent helper thread for Lazy SMP — writes to TT only, no UCI output.
#[allow(clippy::too_many_arguments)]
fn run_helper(
    thread_id: usize,
    tt: &TranspositionTable,
    params: &SearchParams,
    board: &Board,
    max_depth: u8,
    control: &SearchControl,
    node_counter: &AtomicU64,
    history: &[u64],
) {
    let mut ctx = SearchContext {
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
        history: history.to_vec(),
        contempt: 0,
        engine_color: board.side_to_move(),
        pv_line: Vec::new(),
    };

    // Depth offset: helpers start at different depths to increase search divergence.
    // Helper i starts at depth 1 + (i % 2), so odd helpers skip depth 1.
    let start_depth: u8 = 1 + (thread_id % 2) as u8;

    let mut prev_score: i32 = 0;
    let mut completed_pv: Vec<Move> = Vec::new();

    for depth in start_depth..=max_depth {
        if control.should_stop_iterating() {
            break;
        }

        ctx.pv_line = completed_pv.clone();
        let score = aspiration_search(board, depth, prev_score, &mut ctx);

        if control.should_stop(ctx.nodes) {
            break;
        }

        prev_score = score;
        completed_pv = ctx.pv.root_pv().iter().copied().filter(|m| !m.is_null()).collect();
    }

    node_counter.store(ctx.nodes, Ordering::Relaxed);
}

impl std::fmt::Debug for ThreadPool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ThreadPool")
            .field("tt", &self.tt)
            .field("num_threads", &self.num_threads)
            .finish()
    }
}

impl Default for ThreadPool {
    fn default() -> Self {
        Self::new(16)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicBool;
    use std::sync::Arc;
    use cesso_core::Board;

    #[test]
    fn single_thread_finds_legal_move() {
        let pool = ThreadPool::new(1);
        let board = Board::starting_position();
        let stopped = Arc::new(AtomicBool::new(false));
        let control = SearchControl::new_infinite(stopped);
        let result = pool.search(&board, 2, &control, &[], |_, _, _, _| {});
        assert!(!result.best_move.is_null());
    }

    #[test]
    fn multi_thread_finds_mate_in_one() {
        let mut pool = ThreadPool::new(1);
        pool.set_num_threads(2);
        let board: Board = "6k1/5ppp/8/8/8/8/5PPP/R6K w - - 0 1".parse().unwrap();
        let stopped = Arc::new(AtomicBool::new(false));
        let control = SearchControl::new_infinite(stopped);
        let result = pool.search(&board, 3, &control, &[], |_, _, _, _| {});
        assert_eq!(result.best_move.to_uci(), "a1a8");
    }

    #[test]
    fn multi_thread_node_count_sums_all_threads() {
        let mut pool = ThreadPool::new(1);
        pool.set_num_threads(3);
        let board = Board::starting_position();
        let stopped = Arc::new(AtomicBool::new(false));
        let control = SearchControl::new_infinite(stopped);
        let result = pool.search(&board, 3, &control, &[], |_, _, _, _| {});
        assert!(result.nodes > 0);
    }
}
