#![no_main]

use arbitrary::{Arbitrary, Unstructured};
use libfuzzer_sys::fuzz_target;
use testrunner_rs::parser;

const NAMES: [&str; 8] = ["exec", "stdout", "stderr", "exists", "cmp", "env", "skip", "slow"];
const CONDITIONS: [&str; 4] = ["unix", "!windows", "quick", "env:CI"];

#[derive(Arbitrary, Debug)]
struct Line {
    name: u8,
    condition: Option<u8>,
    negated: bool,
    args: Vec<Word>,
}

/// An argument drawn from lowercase ASCII so quoting is predictable
#[derive(Arbitrary, Debug)]
struct Word(Vec<u8>);

impl Word {
    fn text(&self) -> String {
        self.0
            .iter()
            .map(|b| char::from(b'a' + b % 26))
            .take(12)
            .collect()
    }
}

#[derive(Arbitrary, Debug)]
struct Input {
    lines: Vec<Line>,
    files: Vec<(Word, Vec<u8>)>,
}

fuzz_target!(|data: &[u8]| {
    let Ok(input) = Input::arbitrary(&mut Unstructured::new(data)) else {
        return;
    };

    let mut source = String::new();
    for line in &input.lines {
        if let Some(c) = line.condition {
            source.push_str(&format!("[{}] ", CONDITIONS[c as usize % CONDITIONS.len()]));
        }
        if line.negated {
            source.push_str("! ");
        }
        source.push_str(NAMES[line.name as usize % NAMES.len()]);
        for arg in &line.args {
            // Quoted so empty words survive as arguments
            source.push_str(&format!(" '{}'", arg.text()));
        }
        source.push('\n');
    }
    // File blocks come last; whatever they hold cannot change the commands
    for (name, contents) in &input.files {
        source.push_str(&format!("-- f{} --\n", name.text()));
        source.push_str(&String::from_utf8_lossy(contents));
        source.push('\n');
    }

    let script = parser::parse(&source).expect("generated scripts are well formed");
    assert_eq!(script.commands.len(), input.lines.len());
    for (parsed, line) in script.commands.iter().zip(&input.lines) {
        assert_eq!(parsed.name, NAMES[line.name as usize % NAMES.len()]);
        assert_eq!(parsed.negated, line.negated);
        assert_eq!(parsed.args.len(), line.args.len());
    }
});
