#![no_main]

use libfuzzer_sys::fuzz_target;
use std::io::{self, Write};
use testrunner_rs::{ColorStream, Interactive};

struct Tty(Vec<u8>);

impl Write for Tty {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl Interactive for Tty {
    fn interactive(&self) -> io::Result<bool> {
        Ok(true)
    }
}

const ESCAPES: [&str; 4] = ["\x1b[32m", "\x1b[31m", "\x1b[33m", "\x1b[0m"];

fuzz_target!(|data: &[u8]| {
    let mut sink = Tty(Vec::new());
    let mut stream = ColorStream::new(&mut sink).expect("highlighter compiles");
    assert_eq!(stream.write(data).expect("in-memory write"), data.len());

    match std::str::from_utf8(data) {
        // Escapes already in the input would be indistinguishable
        Ok(text) if !text.contains('\x1b') => {
            let out = String::from_utf8(sink.0).expect("text stays text");
            let stripped = ESCAPES.iter().fold(out, |acc, esc| acc.replace(esc, ""));
            assert_eq!(stripped, text);
        }
        Ok(_) => {}
        Err(_) => assert_eq!(sink.0, data),
    }
});
