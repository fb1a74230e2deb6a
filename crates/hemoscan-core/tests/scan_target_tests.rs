//! Tests scan target identifiers stay stable for prompts and logs.

use hemoscan_core::ScanTarget;

#[test]
fn scan_target_tests_display_matches_wire_identifier() {
    let rendered: Vec<String> = ScanTarget::ALL.iter().map(ToString::to_string).collect();
    assert_eq!(rendered, vec!["NailBed", "Conjunctiva", "Palm"]);
    assert_eq!(ScanTarget::default(), ScanTarget::NailBed);
}

#[test]
fn scan_target_tests_display_round_trips_through_parse() {
    for target in ScanTarget::ALL {
        let parsed: ScanTarget = target.to_string().parse().expect("display form should parse");
        assert_eq!(parsed, target);
    }
}
