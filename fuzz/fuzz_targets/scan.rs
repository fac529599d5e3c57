#![no_main]

use goldcheck_syntax::ast::Fixture;
use goldcheck_syntax::parser::{extract_expectations, scan_directives};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    // Fixtures are text; invalid UTF-8 is rejected before scanning
    if let Ok(s) = std::str::from_utf8(data) {
        let fixture = Fixture::new("fuzz", s);
        let _ = scan_directives(&fixture);
        let _ = extract_expectations(&fixture, "CHECK");
    }
});
