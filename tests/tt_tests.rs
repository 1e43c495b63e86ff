use mirador::search::tt::{NodeType, TranspositionTable};

#[test]
fn test_tt_mate_score_normalization() {
    let mut tt = TranspositionTable::new(1); // 1MB table
    let key = 123456789;

    // Scenario: search.rs normalizes a mate found at ply 15 to a
    // depth-independent score before storing it (MATE_SCORE - ply = 31000 -
    // 15 = 30985); the TT itself stores and returns that value verbatim
    // regardless of which ply later probes it.
    let search_score = 30985;
    let search_depth = 5;

    tt.save(key, None, search_score, search_depth, NodeType::Exact as u8);

    let (_, score, depth, bound) = tt.probe(key).expect("entry present");
    assert_eq!(score, 30985, "probing should return the stored score");
    assert_eq!(depth, search_depth);
    assert_eq!(bound, NodeType::Exact as u8);

    // A later probe (simulating a transposition reached at a different ply)
    // still sees the same raw value; ply-adjustment happens in search.rs.
    let (_, score_again, _, _) = tt.probe(key).expect("entry still present");
    assert_eq!(score_again, 30985);
}
