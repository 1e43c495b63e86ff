use crate::board::{Board, Piece};
use crate::moves::execute::{generate_captures, generate_legal, make_move_basic, undo_move_basic};
use crate::moves::magic::MagicTables;
use crate::moves::square_control::{in_check, is_square_attacked};
use crate::moves::types::{Move, MoveBuffer};
use crate::search::eval;
use crate::search::ordering::order_moves;
use crate::search::tt::{EvalTable, NodeType, PawnTable, TranspositionTable};
use std::time::{Duration, Instant};

pub const INF: i32 = 32000;
pub const MATE_SCORE: i32 = 31000;
pub const MATE_THRESHOLD: i32 = MATE_SCORE - 1000;
const MAX_Q_SEARCH_DEPTH: i32 = 100;

/// Converts a relative (from-this-node) mate score into the depth-independent
/// form stored in the TT, so a stored mate score is meaningful when probed
/// from a different ply (spec §4.5 distance-to-mate scoring).
fn score_to_tt(score: i32, ply: i32) -> i32 {
    if score >= MATE_THRESHOLD {
        score + ply
    } else if score <= -MATE_THRESHOLD {
        score - ply
    } else {
        score
    }
}

fn score_from_tt(score: i32, ply: i32) -> i32 {
    if score >= MATE_THRESHOLD {
        score - ply
    } else if score <= -MATE_THRESHOLD {
        score + ply
    } else {
        score
    }
}

/// UCI `go` time controls. `winc`/`binc` are accepted for protocol
/// completeness but, matching the source engine's allocator, don't enter the
/// allocation formula.
#[derive(Debug, Clone, Copy, Default)]
pub struct Limits {
    pub wtime: Option<u64>,
    pub btime: Option<u64>,
    pub winc: Option<u64>,
    pub binc: Option<u64>,
    pub movetime: Option<u64>,
    pub depth: Option<i32>,
    pub infinite: bool,
}

pub struct TimeManager {
    pub start_time: Instant,
    pub allotted: Option<Duration>,
    pub stop_signal: bool,
}

impl TimeManager {
    pub fn new(limit: Option<Duration>) -> Self {
        Self {
            start_time: Instant::now(),
            allotted: limit,
            stop_signal: false,
        }
    }

    #[inline(always)]
    pub fn check_time(&mut self) {
        if self.stop_signal {
            return;
        }
        if let Some(limit) = self.allotted
            && self.start_time.elapsed() >= limit
        {
            self.stop_signal = true;
        }
    }

    #[inline(always)]
    pub fn elapsed(&self) -> Duration {
        self.start_time.elapsed()
    }
}

/// Allocates a per-move budget from the clock: `clock / max(40 - ply/2, 5)`,
/// defaulting to 16s when the GUI sent no time controls for the side to move
/// (spec §4.6, matching the source engine's `SearchData::allocTime`).
fn allocate_time(board: &Board, limits: &Limits) -> Option<Duration> {
    if limits.infinite {
        return None;
    }
    if let Some(mt) = limits.movetime {
        return Some(Duration::from_millis(mt));
    }

    let clock = match board.side_to_move {
        crate::board::Color::White => limits.wtime,
        crate::board::Color::Black => limits.btime,
    };

    let clock = match clock {
        Some(c) => c,
        None => return Some(Duration::from_millis(16000)),
    };

    let side_offset = if board.side_to_move == crate::board::Color::Black {
        1
    } else {
        0
    };
    let ply = (board.fullmove_number.saturating_sub(1) * 2 + side_offset) as i32;
    let avg_rest = (40 - ply / 2).max(5) as u64;
    Some(Duration::from_millis(clock / avg_rest))
}

/// Mutable state threaded through one `search()` call: TT/pawn/eval caches,
/// node counters and the time budget.
pub struct SearchState {
    pub tt: TranspositionTable,
    pub pawn_tt: PawnTable,
    pub eval_tt: EvalTable,
    pub nodes: u64,
    pub qnodes: u64,
    pub aspiration_fails: u64,
    pub time: TimeManager,
}

impl SearchState {
    pub fn new(tt_mb: usize, time_limit: Option<Duration>) -> Self {
        Self {
            tt: TranspositionTable::new(tt_mb),
            pawn_tt: PawnTable::new(8),
            eval_tt: EvalTable::new(8),
            nodes: 0,
            qnodes: 0,
            aspiration_fails: 0,
            time: TimeManager::new(time_limit),
        }
    }
}

/// A capture the source engine's `BadCapture` heuristic flags as a likely
/// losing trade, without running a full static-exchange evaluation (spec
/// explicitly drops SEE). Grounded on `Search.cpp::BadCapture`: a non-pawn
/// capturing a much lower-value piece that is defended by a pawn (margin
/// 200), or by anything at all when the gap is even larger (margin 500).
fn is_bad_capture(board: &Board, tables: &MagicTables, mv: Move, captured_value: i32) -> bool {
    if mv.piece == Piece::Pawn {
        return false;
    }
    let mover_value = mv.piece.value();
    if mover_value - 50 <= captured_value {
        return false;
    }

    let defender = board.side_to_move.opposite();
    let target = 1u64 << mv.to.index();
    let pawn_defenders = match defender {
        crate::board::Color::White => ((target & !0x8080_8080_8080_8080) >> 7) | ((target & !0x0101_0101_0101_0101) >> 9),
        crate::board::Color::Black => ((target & !0x0101_0101_0101_0101) << 7) | ((target & !0x8080_8080_8080_8080) << 9),
    };
    let defended_by_pawn = pawn_defenders & board.pieces(Piece::Pawn, defender) != 0;

    if defended_by_pawn && captured_value + 200 < mover_value {
        return true;
    }
    if captured_value + 500 < mover_value && is_square_attacked(board, mv.to, defender, tables) {
        return true;
    }
    false
}

pub fn quiescence(
    board: &mut Board,
    tables: &MagicTables,
    state: &mut SearchState,
    ply: i32,
    mut alpha: i32,
    beta: i32,
) -> i32 {
    state.nodes += 1;
    state.qnodes += 1;
    if state.nodes & 1023 == 0 {
        state.time.check_time();
    }
    if state.time.stop_signal || ply > MAX_Q_SEARCH_DEPTH {
        return eval::evaluate(board, tables, &mut state.pawn_tt, &mut state.eval_tt);
    }

    let stand_pat = eval::evaluate(board, tables, &mut state.pawn_tt, &mut state.eval_tt);
    if stand_pat >= beta {
        return beta;
    }
    if stand_pat > alpha {
        alpha = stand_pat;
    }

    let mut moves = Vec::with_capacity(32);
    let mut scratch = Vec::with_capacity(256);
    generate_captures(board, tables, &mut moves, &mut scratch);
    order_moves(&mut moves, board, None, tables);

    for mv in moves {
        if state.time.stop_signal {
            break;
        }

        let captured_value = if mv.is_en_passant() {
            Piece::Pawn.value()
        } else {
            board.piece_at(mv.to).map(|(_, p)| p.value()).unwrap_or(0)
        };
        let is_prom = mv.is_promotion();

        // Delta pruning: even winning the captured piece can't reach alpha.
        if !is_prom && stand_pat + captured_value + 200 < alpha {
            continue;
        }

        // BadCapture heuristic (not SEE): skip clearly losing non-pawn trades.
        if !is_prom
            && captured_value != Piece::Pawn.value()
            && is_bad_capture(board, tables, mv, captured_value)
        {
            continue;
        }

        let undo = make_move_basic(board, mv);
        let score = -quiescence(board, tables, state, ply + 1, -beta, -alpha);
        undo_move_basic(board, undo);

        if state.time.stop_signal {
            break;
        }
        if score >= beta {
            return beta;
        }
        if score > alpha {
            alpha = score;
        }
    }

    alpha
}

pub fn negamax(
    board: &mut Board,
    tables: &MagicTables,
    state: &mut SearchState,
    depth: i32,
    ply: i32,
    mut alpha: i32,
    beta: i32,
) -> (i32, Option<Move>) {
    if state.nodes & 1023 == 0 {
        state.time.check_time();
    }
    if state.time.stop_signal {
        return (0, None);
    }
    state.nodes += 1;

    let hash = board.key();
    state.tt.prefetch(hash);

    let mut hash_move = None;
    if let Some((tt_move, raw_score, tt_depth, bound)) = state.tt.probe(hash) {
        hash_move = tt_move;
        if ply > 0 && tt_depth as i32 >= depth {
            let score = score_from_tt(raw_score, ply);
            if bound == NodeType::Exact as u8
                || (bound == NodeType::LowerBound as u8 && score >= beta)
                || (bound == NodeType::UpperBound as u8 && score <= alpha)
            {
                return (score, tt_move);
            }
        }
    }

    let in_check_now = in_check(board, board.side_to_move, tables);
    if depth <= 0 && !in_check_now {
        let score = quiescence(board, tables, state, ply, alpha, beta);
        return (score, None);
    }
    // Check extension: resolve checks fully rather than stopping at the
    // horizon mid-sequence (grounded on `Search.cpp::SearchRoot`'s `++depth`).
    let extension = if in_check_now { 1 } else { 0 };

    let mut moves = Vec::with_capacity(64);
    let mut scratch = Vec::with_capacity(256);
    generate_legal(board, tables, &mut moves, &mut scratch);
    order_moves(&mut moves, board, hash_move, tables);

    let mut best_move = None;
    let mut best_score = -INF;
    let original_alpha = alpha;
    let mut move_count = 0u32;

    for mv in moves {
        let undo = make_move_basic(board, mv);
        let (val, _) = negamax(
            board,
            tables,
            state,
            depth - 1 + extension,
            ply + 1,
            -beta,
            -alpha,
        );
        undo_move_basic(board, undo);
        let score = -val;
        move_count += 1;

        if state.time.stop_signal {
            return (0, None);
        }

        if score > best_score {
            best_score = score;
            if score > alpha {
                alpha = score;
                best_move = Some(mv);
            }
            if score >= beta {
                let tt_score = score_to_tt(beta, ply);
                state.tt.save(
                    hash,
                    Some(mv),
                    tt_score,
                    depth.max(0) as u8,
                    NodeType::LowerBound as u8,
                );
                return (beta, Some(mv));
            }
        }
    }

    if move_count == 0 {
        if in_check_now {
            return (-MATE_SCORE + ply, None);
        }
        return (0, None);
    }
    if state.time.stop_signal {
        return (0, None);
    }

    let node_type = if best_score > original_alpha {
        NodeType::Exact
    } else {
        NodeType::UpperBound
    };
    let tt_score = score_to_tt(best_score, ply);
    state
        .tt
        .save(hash, best_move, tt_score, depth.max(0) as u8, node_type as u8);

    (best_score, best_move)
}

/// Searches the root position's legal moves at a fixed `depth` within
/// `(alpha, beta)`. Grounded on `Search.cpp::SearchRoot`: a flat pass over
/// root moves rather than a recursive `negamax` call, since the root needs
/// its own best-move bookkeeping independent of ply-0 TT semantics.
fn search_root(
    board: &mut Board,
    tables: &MagicTables,
    state: &mut SearchState,
    moves: &[Move],
    depth: i32,
    mut alpha: i32,
    beta: i32,
) -> (i32, Option<Move>) {
    let mut best_score = -INF;
    let mut best_move = moves.first().copied();

    for &mv in moves {
        let undo = make_move_basic(board, mv);
        let (val, _) = negamax(board, tables, state, depth - 1, 1, -beta, -alpha);
        undo_move_basic(board, undo);
        let score = -val;

        if state.time.stop_signal {
            return (best_score, best_move);
        }

        if score > best_score {
            best_score = score;
            best_move = Some(mv);
        }
        if score > alpha {
            alpha = score;
            if score >= beta {
                state.tt.save(
                    board.key(),
                    Some(mv),
                    score_to_tt(score, 0),
                    depth.max(0) as u8,
                    NodeType::LowerBound as u8,
                );
                return (score, Some(mv));
            }
        }
    }

    let bound = if best_score <= alpha && best_score > -INF {
        NodeType::UpperBound
    } else {
        NodeType::Exact
    };
    state.tt.save(
        board.key(),
        best_move,
        score_to_tt(best_score, 0),
        depth.max(0) as u8,
        bound as u8,
    );
    (best_score, best_move)
}

fn format_score(score: i32) -> String {
    if score.abs() >= MATE_THRESHOLD {
        let moves_to_mate = (MATE_SCORE - score.abs() + 1) / 2;
        if score > 0 {
            format!("mate {}", moves_to_mate)
        } else {
            format!("mate -{}", moves_to_mate)
        }
    } else {
        format!("cp {}", score)
    }
}

/// Runs iterative deepening from depth 1 (or `limits.depth` if given) until
/// time runs out, returning the best move found at the last fully-completed
/// depth. Prints one UCI `info` line per completed depth.
pub fn search(board: &mut Board, tables: &MagicTables, limits: Limits) -> Move {
    let time_limit = allocate_time(board, &limits);
    let max_depth = limits.depth.unwrap_or(64);
    let mut state = SearchState::new(128, time_limit);

    let mut root_moves = Vec::with_capacity(64);
    let mut scratch = Vec::with_capacity(256);
    generate_legal(board, tables, &mut root_moves, &mut scratch);

    let mut best_move = root_moves.first().copied();
    if root_moves.is_empty() {
        return Move {
            from: crate::square::Square::from_index(0),
            to: crate::square::Square::from_index(0),
            piece: Piece::Pawn,
            promotion: None,
            flags: 0,
        };
    }

    let mut best_score = 0;

    for depth in 1..=max_depth {
        if depth > 1
            && let Some(limit) = state.time.allotted
            && state.time.start_time.elapsed() >= limit
        {
            break;
        }

        // Root move ordering: hash move from the previous iteration first,
        // then MVV-LVA (spec §4.5).
        let hash_move = state.tt.probe(board.key()).and_then(|(mv, ..)| mv);
        order_moves(&mut root_moves, board, hash_move, tables);

        let (score, mv) = if depth <= 2 {
            search_root(board, tables, &mut state, &root_moves, depth, -INF, INF)
        } else {
            // Run all four aspiration windows unconditionally, without an
            // early break on an in-bounds result (spec §9 Open Question:
            // faithful, intentionally wasteful re-search on every depth).
            let windows = [10, 25, 50];
            let mut last = (-INF, root_moves.first().copied());
            for w in windows {
                let a = best_score - w;
                let b = best_score + w;
                last = search_root(board, tables, &mut state, &root_moves, depth, a, b);
                if last.0 <= a || last.0 >= b {
                    state.aspiration_fails += 1;
                }
            }
            last = search_root(board, tables, &mut state, &root_moves, depth, -INF, INF);
            last
        };

        if state.time.stop_signal {
            break;
        }

        best_score = score;
        if mv.is_some() {
            best_move = mv;
        }

        if let Some(valid_mv) = best_move {
            println!(
                "info depth {} score {} nodes {} qnodes {} time {} asp_fail {} pv {}",
                depth,
                format_score(best_score),
                state.nodes,
                state.qnodes,
                state.time.elapsed().as_millis(),
                state.aspiration_fails,
                valid_mv.to_uci()
            );
        }

        if best_score.abs() >= MATE_THRESHOLD {
            break;
        }
    }

    best_move.expect("at least one legal root move")
}
