//! FEN (Forsyth-Edwards Notation) loader/emitter. The external UCI front-end is
//! the only privileged caller allowed to place pieces directly via this path.

use super::castle_bits::*;
use super::fen_tables::{CHAR_TO_PC, PC_TO_CHAR};
use super::{Board, Color, Piece};
use crate::square::Square;
use std::fmt::Write as _;

pub const STARTPOS_FEN: &str = "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1";

impl Board {
    /// Resets `self` in place from a FEN string. Standard six fields; the move
    /// counters default to 0/1 if the last two fields are missing.
    pub fn set_fen(&mut self, fen: &str) -> Result<(), String> {
        let fields: Vec<&str> = fen.split_whitespace().collect();
        if fields.len() < 4 {
            return Err(format!("FEN needs at least 4 fields, got {}", fields.len()));
        }

        let mut board = Board::new_empty();
        board.piece_bb = [[0u64; 6]; 2];
        board.occ_white = 0;
        board.occ_black = 0;
        board.occ_all = 0;
        board.piece_on_sq = [super::EMPTY_SQ; 64];

        // 1) Piece placement, ranks 8 -> 1, top to bottom.
        let ranks: Vec<&str> = fields[0].split('/').collect();
        if ranks.len() != 8 {
            return Err(format!("expected 8 ranks, got {}", ranks.len()));
        }
        for (rank_from_top, rank_str) in ranks.iter().enumerate() {
            let rank = 7 - rank_from_top as u8;
            let mut file: u8 = 0;
            for c in rank_str.chars() {
                if let Some(skip) = c.to_digit(10) {
                    file += skip as u8;
                } else {
                    if file > 7 {
                        return Err(format!("rank overflow in '{}'", rank_str));
                    }
                    let (piece, color) = CHAR_TO_PC[c as usize]
                        .ok_or_else(|| format!("bad piece glyph '{}'", c))?;
                    let sq = Square::from_file_rank(file, rank);
                    board.set_bb(color, piece, board.bb(color, piece) | (1u64 << sq.index()));
                    file += 1;
                }
            }
        }

        // 2) Side to move.
        board.side_to_move = match fields[1] {
            "w" => Color::White,
            "b" => Color::Black,
            other => return Err(format!("bad side to move '{}'", other)),
        };

        // 3) Castling rights.
        board.castling_rights = 0;
        if fields[2] != "-" {
            for c in fields[2].chars() {
                board.castling_rights |= match c {
                    'K' => CASTLE_WK,
                    'Q' => CASTLE_WQ,
                    'k' => CASTLE_BK,
                    'q' => CASTLE_BQ,
                    other => return Err(format!("bad castling glyph '{}'", other)),
                };
            }
        }

        // 4) En passant target.
        board.en_passant = if fields[3] == "-" {
            None
        } else {
            Some(parse_square(fields[3])?)
        };

        // 5/6) Halfmove clock / fullmove number, optional.
        board.halfmove_clock = fields.get(4).and_then(|s| s.parse().ok()).unwrap_or(0);
        board.fullmove_number = fields.get(5).and_then(|s| s.parse().ok()).unwrap_or(1);

        board.history.clear();
        board.refresh_zobrist();
        *self = board;
        Ok(())
    }

    /// Emits the standard six-field FEN for the current position.
    pub fn to_fen(&self) -> String {
        let mut out = String::with_capacity(64);

        for rank_from_top in 0..8u8 {
            let rank = 7 - rank_from_top;
            let mut empty_run = 0u8;
            for file in 0..8u8 {
                let sq = Square::from_file_rank(file, rank);
                match self.piece_at(sq) {
                    Some((color, piece)) => {
                        if empty_run > 0 {
                            let _ = write!(out, "{}", empty_run);
                            empty_run = 0;
                        }
                        let idx = (color as usize) * 6 + (piece as usize);
                        out.push(PC_TO_CHAR[idx]);
                    }
                    None => empty_run += 1,
                }
            }
            if empty_run > 0 {
                let _ = write!(out, "{}", empty_run);
            }
            if rank_from_top != 7 {
                out.push('/');
            }
        }

        out.push(' ');
        out.push(match self.side_to_move {
            Color::White => 'w',
            Color::Black => 'b',
        });

        out.push(' ');
        if self.castling_rights == 0 {
            out.push('-');
        } else {
            if self.castling_rights & CASTLE_WK != 0 {
                out.push('K');
            }
            if self.castling_rights & CASTLE_WQ != 0 {
                out.push('Q');
            }
            if self.castling_rights & CASTLE_BK != 0 {
                out.push('k');
            }
            if self.castling_rights & CASTLE_BQ != 0 {
                out.push('q');
            }
        }

        out.push(' ');
        match self.en_passant {
            Some(sq) => {
                let _ = write!(out, "{}", sq);
            }
            None => out.push('-'),
        }

        let _ = write!(out, " {} {}", self.halfmove_clock, self.fullmove_number);
        out
    }
}

fn parse_square(s: &str) -> Result<Square, String> {
    let bytes = s.as_bytes();
    if bytes.len() != 2 {
        return Err(format!("bad square '{}'", s));
    }
    let file = bytes[0].wrapping_sub(b'a');
    let rank = bytes[1].wrapping_sub(b'1');
    if file > 7 || rank > 7 {
        return Err(format!("bad square '{}'", s));
    }
    Ok(Square::from_file_rank(file, rank))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn startpos_round_trips() {
        let b = Board::from_str(STARTPOS_FEN).unwrap();
        assert_eq!(b.to_fen(), STARTPOS_FEN);
    }

    #[test]
    fn kiwipete_round_trips() {
        let fen = "r3k2r/p1ppqpb1/bn2pnp1/3PN3/1p2P3/2N2Q1p/PPPBBPPP/R3K2R w KQkq - 0 1";
        let b = Board::from_str(fen).unwrap();
        assert_eq!(b.to_fen(), fen);
    }

    #[test]
    fn en_passant_field_round_trips() {
        let fen = "8/8/8/K2pP2r/8/8/8/7k w - d6 0 1";
        let b = Board::from_str(fen).unwrap();
        assert_eq!(b.en_passant, Some(Square::from_file_rank(3, 5)));
        assert_eq!(b.to_fen(), fen);
    }

    #[test]
    fn rejects_malformed_fen() {
        assert!(Board::from_str("not a fen").is_err());
    }
}
