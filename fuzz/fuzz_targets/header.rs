#![no_main]

use libfuzzer_sys::fuzz_target;
use sir_conform::bindings::SymbolBindings;
use sir_conform::infer::infer_types;
use sir_conform::metadata::parse_header;

fuzz_target!(|data: &[u8]| {
    // Unit files are read lossily, so arbitrary bytes are fair input
    let text = String::from_utf8_lossy(data);
    let metadata = parse_header(text.lines());
    let args: Vec<&str> = metadata.backend_args.values().flatten().map(String::as_str).collect();
    let _ = SymbolBindings::parse(&args);
    let _ = infer_types(&text, "main");
});
