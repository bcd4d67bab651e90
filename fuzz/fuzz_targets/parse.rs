#![no_main]

use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let document = crawlcheck::parse(data);
    let _ = document.matcher().allowed_single("FooBot", "http://foo.bar/x/y");
});
