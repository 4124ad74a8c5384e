use std::fs;
use std::path::PathBuf;

use ron::de::from_str as ron_from_str;
use serde::Deserialize;
use slipfeed_printing::{PageConfig, PrintMode};

#[derive(Debug, Deserialize)]
struct PaperFixture {
    cases: Vec<PaperCase>,
}

#[derive(Debug, Deserialize)]
struct PaperCase {
    width_mm: f64,
    height_mm: Option<u32>,
    width_px: u32,
    height_px: u32,
    continuous: bool,
}

#[test]
fn page_sizes_match_fixture() {
    let fixture_path =
        PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures/paper_widths.ron");
    let fixture_text = fs::read_to_string(&fixture_path)
        .unwrap_or_else(|err| panic!("Failed to read {:?}: {err}", fixture_path));
    let fixture: PaperFixture = ron_from_str(&fixture_text)
        .unwrap_or_else(|err| panic!("Failed to parse {:?}: {err}", fixture_path));
    assert!(!fixture.cases.is_empty());

    for case in fixture.cases {
        let config = PageConfig::from_paper(case.width_mm, case.height_mm);
        assert_eq!(
            (config.printable_width_px, config.height_px),
            (case.width_px, case.height_px),
            "paper {case:?}"
        );
        let expected_mode = if case.continuous {
            PrintMode::Continuous
        } else {
            PrintMode::Paginated
        };
        assert_eq!(config.mode, expected_mode, "paper {case:?}");
    }
}
