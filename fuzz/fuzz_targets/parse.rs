#![no_main]

use libfuzzer_sys::fuzz_target;
use tfscenario::frontend::{lexer, parser};

fuzz_target!(|data: &[u8]| {
    if let Ok(s) = std::str::from_utf8(data) {
        if let Ok(tokens) = lexer::lex(s) {
            if let Ok(body) = parser::parse(&tokens) {
                // Canonical rendering must not panic either.
                for attr in body.attributes() {
                    let _ = attr.value.node.to_string();
                }
            }
        }
    }
});
