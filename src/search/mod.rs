pub mod eval;
pub mod ordering;
pub mod pst;
pub mod search;
pub mod tt;
