#![no_main]

use fathom::markup::Document;
use libfuzzer_sys::fuzz_target;

const PAGE: &str = r#"
<div id="main" class="content">
  <p class="lead" lang="en-US">First</p>
  <section><a href="https://example.com/" rel="nofollow">link</a></section>
</div>
"#;

fuzz_target!(|data: &[u8]| {
    if let Ok(selector) = std::str::from_utf8(data) {
        if let Ok(doc) = Document::parse(PAGE) {
            let _ = doc.select(selector);
        }
    }
});
