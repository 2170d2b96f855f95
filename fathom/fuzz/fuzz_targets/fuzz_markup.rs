#![no_main]

use fathom::markup::Document;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    if let Ok(source) = std::str::from_utf8(data) {
        if let Ok(doc) = Document::parse(source) {
            for element in doc.elements() {
                let _ = element.text();
                let _ = element.classes();
            }
        }
    }
});
