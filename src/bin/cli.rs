use mirador::board::Board;
use mirador::moves::execute::{generate_legal, make_move_basic};
use mirador::moves::magic::MagicTables;
use mirador::moves::magic::loader::load_magic_tables;
use mirador::moves::perft::perft_divide;
use mirador::moves::types::Move;
use mirador::search::eval::static_eval;
use mirador::search::search::{Limits, search};
use std::io::{self, BufRead};
use std::str::FromStr;

fn main() {
    #[cfg(feature = "cli")]
    mirador::logger::init_logging("logs/mirador.log", "info");

    let tables = load_magic_tables();
    let mut board = Board::new();

    let stdin = io::stdin();
    for line in stdin.lock().lines() {
        let line = match line {
            Ok(l) => l.trim().to_string(),
            Err(_) => break,
        };
        if line.is_empty() {
            continue;
        }

        let parts: Vec<&str> = line.split_whitespace().collect();
        match parts[0] {
            "uci" => handle_uci(),
            "isready" => println!("readyok"),
            "ucinewgame" => board = Board::new(),
            "position" => {
                if let Some(new_board) = handle_position(&parts, &tables) {
                    board = new_board;
                }
            }
            "go" => handle_go(&parts, &mut board, &tables),
            "d" => println!("{}", board.render_ascii()),
            "eval" => {
                let score = static_eval(&board, &tables, -i32::MAX, i32::MAX);
                println!("info string static eval {} cp (side to move)", score);
            }
            "perft" => {
                if let Some(depth_str) = parts.get(1)
                    && let Ok(depth) = depth_str.parse::<u32>()
                {
                    let total = perft_divide(&mut board, &tables, depth);
                    println!("info string perft total {}", total);
                }
            }
            "quit" => break,
            _ => {}
        }
    }
}

fn handle_uci() {
    println!("id name Mirador 1.0");
    println!("id author Mirador contributors");
    println!("option name Hash type spin default 128 min 1 max 4096");
    println!("uciok");
}

fn handle_position(parts: &[&str], tables: &MagicTables) -> Option<Board> {
    let mut board = if parts.len() > 1 && parts[1] == "startpos" {
        Board::new()
    } else if parts.len() > 1 && parts[1] == "fen" {
        let fen_start = 2;
        let mut fen_end = parts.len();
        for (i, &part) in parts.iter().enumerate().skip(fen_start) {
            if part == "moves" {
                fen_end = i;
                break;
            }
        }
        let fen_string = parts[fen_start..fen_end].join(" ");
        Board::from_str(&fen_string).ok()?
    } else {
        Board::new()
    };

    if let Some(moves_idx) = parts.iter().position(|&p| p == "moves") {
        for move_str in &parts[moves_idx + 1..] {
            if let Some(mv) = parse_uci_move(&board, move_str, tables) {
                make_move_basic(&mut board, mv);
            } else {
                // Spec §7: an illegal move in `position ... moves ...` is
                // skipped, not surfaced as an error; the rest of the list
                // still applies against the board as it stood before it.
                eprintln!("info string invalid move: {}", move_str);
            }
        }
    }

    Some(board)
}

fn parse_uci_move(board: &Board, move_str: &str, tables: &MagicTables) -> Option<Move> {
    if move_str.len() < 4 {
        return None;
    }
    let chars: Vec<char> = move_str.chars().collect();

    let from_file = (chars[0] as u8).wrapping_sub(b'a');
    let from_rank = (chars[1] as u8).wrapping_sub(b'1');
    let to_file = (chars[2] as u8).wrapping_sub(b'a');
    let to_rank = (chars[3] as u8).wrapping_sub(b'1');
    if from_file > 7 || from_rank > 7 || to_file > 7 || to_rank > 7 {
        return None;
    }

    let from_square = (from_rank * 8 + from_file) as usize;
    let to_square = (to_rank * 8 + to_file) as usize;

    let promo_piece = if move_str.len() >= 5 {
        match chars[4] {
            'q' => Some(mirador::board::Piece::Queen),
            'r' => Some(mirador::board::Piece::Rook),
            'b' => Some(mirador::board::Piece::Bishop),
            'n' => Some(mirador::board::Piece::Knight),
            _ => None,
        }
    } else {
        None
    };

    let mut moves = Vec::with_capacity(256);
    let mut scratch = Vec::with_capacity(256);
    let mut board_copy = board.clone();
    generate_legal(&mut board_copy, tables, &mut moves, &mut scratch);

    for mv in moves {
        if (mv.from.index() as usize) == from_square && (mv.to.index() as usize) == to_square {
            if promo_piece.is_some() {
                if mv.promotion == promo_piece {
                    return Some(mv);
                }
            } else if mv.promotion.is_none() {
                return Some(mv);
            }
        }
    }
    None
}

fn handle_go(parts: &[&str], board: &mut Board, tables: &MagicTables) {
    let mut limits = Limits::default();
    let mut i = 1;
    while i < parts.len() {
        match parts[i] {
            "depth" => {
                if i + 1 < parts.len() {
                    limits.depth = parts[i + 1].parse().ok();
                }
                i += 2;
            }
            "movetime" => {
                if i + 1 < parts.len() {
                    limits.movetime = parts[i + 1].parse().ok();
                }
                i += 2;
            }
            "wtime" => {
                if i + 1 < parts.len() {
                    limits.wtime = parts[i + 1].parse().ok();
                }
                i += 2;
            }
            "btime" => {
                if i + 1 < parts.len() {
                    limits.btime = parts[i + 1].parse().ok();
                }
                i += 2;
            }
            "winc" => {
                if i + 1 < parts.len() {
                    limits.winc = parts[i + 1].parse().ok();
                }
                i += 2;
            }
            "binc" => {
                if i + 1 < parts.len() {
                    limits.binc = parts[i + 1].parse().ok();
                }
                i += 2;
            }
            "infinite" => {
                limits.infinite = true;
                i += 1;
            }
            _ => i += 1,
        }
    }

    let best = search(board, tables, limits);
    println!("bestmove {}", best.to_uci());
}
