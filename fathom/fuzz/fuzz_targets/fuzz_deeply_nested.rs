#![no_main]

use fathom::markup::Document;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|depth: u16| {
    let depth = depth as usize % 400;
    let source = format!("{}text{}", "<div>".repeat(depth), "</div>".repeat(depth));
    let _ = Document::parse(&source);
});
