#![no_main]

use libfuzzer_sys::fuzz_target;
use testrunner_rs::parser;

fuzz_target!(|data: &[u8]| {
    let input = String::from_utf8_lossy(data);

    // Must never panic; a parsed script must be well formed
    let Ok(script) = parser::parse(&input) else {
        return;
    };

    let line_count = input.lines().count();
    for command in &script.commands {
        assert!(!command.name.is_empty(), "empty command name");
        assert!(
            command.line_num >= 1 && command.line_num <= line_count,
            "line {} out of range",
            command.line_num
        );
    }
    for file in &script.files {
        assert!(!file.name.is_empty(), "empty file name");
    }

    assert_eq!(parser::parse(&input).ok().as_ref(), Some(&script), "parser is not deterministic");
});
