//! Colorizing output stream
//!
//! [`ColorStream`] wraps a borrowed sink and highlights the status words of a
//! test report (`ok`, `FAIL`, `skipped`) with ANSI colors. Colors are only
//! emitted when the sink says it is an interactive terminal, so captured logs
//! and pipes receive the report byte for byte.

use crate::error::Result;
use regex::{Captures, Regex};
use std::borrow::Cow;
use std::fs::File;
use std::io::{self, Write};
use termcolor::{Ansi, Color, ColorSpec, WriteColor};
use tracing::debug;

/// Status words and the color each one is wrapped in, in the order the
/// passes run.
const TOKENS: [(&str, Color); 3] = [
    ("ok", Color::Green),
    ("FAIL", Color::Red),
    ("skipped", Color::Yellow),
];

/// Capability query: is this sink connected to an interactive console?
///
/// Sinks that cannot tell keep the default, which answers "no". An `Err`
/// is treated the same way by [`ColorStream`].
pub trait Interactive {
    /// Report whether writes to this sink reach a terminal
    fn interactive(&self) -> io::Result<bool> {
        Ok(false)
    }
}

impl Interactive for io::Stdout {
    fn interactive(&self) -> io::Result<bool> {
        Ok(atty::is(atty::Stream::Stdout))
    }
}

impl Interactive for io::StdoutLock<'_> {
    fn interactive(&self) -> io::Result<bool> {
        Ok(atty::is(atty::Stream::Stdout))
    }
}

impl Interactive for io::Stderr {
    fn interactive(&self) -> io::Result<bool> {
        Ok(atty::is(atty::Stream::Stderr))
    }
}

impl Interactive for io::StderrLock<'_> {
    fn interactive(&self) -> io::Result<bool> {
        Ok(atty::is(atty::Stream::Stderr))
    }
}

impl Interactive for Vec<u8> {}
impl Interactive for File {}
impl Interactive for io::Sink {}

impl<W: Interactive + ?Sized> Interactive for &mut W {
    fn interactive(&self) -> io::Result<bool> {
        (**self).interactive()
    }
}

impl<W: Interactive + ?Sized> Interactive for Box<W> {
    fn interactive(&self) -> io::Result<bool> {
        (**self).interactive()
    }
}

/// Result of a best-effort flush
#[derive(Debug)]
pub enum FlushOutcome {
    /// The sink flushed cleanly
    Flushed,
    /// The sink failed to flush; the error is reported here and nowhere else
    Suppressed(io::Error),
}

/// One highlighting pass: a word matcher and the escape that opens its color
#[derive(Debug, Clone)]
struct Highlight {
    pattern: Regex,
    start: String,
}

/// Render an ANSI sequence through termcolor
fn ansi_sequence(spec: Option<&ColorSpec>) -> io::Result<String> {
    let mut ansi = Ansi::new(Vec::new());
    match spec {
        Some(spec) => ansi.set_color(spec)?,
        None => ansi.reset()?,
    }
    Ok(String::from_utf8_lossy(&ansi.into_inner()).into_owned())
}

/// Precompiled status-word highlighter
#[derive(Debug, Clone)]
pub struct Highlighter {
    passes: Vec<Highlight>,
    reset: String,
}

impl Highlighter {
    /// Compile the case-insensitive whole-word matchers for every status word
    pub fn new() -> Result<Self> {
        let mut passes = Vec::with_capacity(TOKENS.len());
        for (word, color) in TOKENS {
            let pattern = Regex::new(&format!(r"(?i)\b{}\b", regex::escape(word)))?;
            let mut spec = ColorSpec::new();
            spec.set_fg(Some(color)).set_reset(false);
            passes.push(Highlight {
                pattern,
                start: ansi_sequence(Some(&spec))?,
            });
        }

        Ok(Highlighter {
            passes,
            reset: ansi_sequence(None)?,
        })
    }

    /// Wrap every status word in `text` with its color and a reset
    ///
    /// Passes run in order (success, failure, skip) over the progressively
    /// rewritten string. No escape contains a status word, so a later pass
    /// never matches inside an earlier pass's output.
    pub fn render<'t>(&self, text: &'t str) -> Cow<'t, str> {
        let mut out = Cow::Borrowed(text);
        for pass in &self.passes {
            let rewritten = match pass.pattern.replace_all(&out, |caps: &Captures<'_>| {
                format!("{}{}{}", pass.start, &caps[0], self.reset)
            }) {
                Cow::Borrowed(_) => None,
                Cow::Owned(s) => Some(s),
            };
            if let Some(s) = rewritten {
                out = Cow::Owned(s);
            }
        }
        out
    }
}

/// Output stream that colors status words on the way to a borrowed sink
///
/// Every write is handled on its own: nothing is buffered between calls, so
/// the sink sees writes in the order they were made. A word split across
/// two writes is not highlighted.
pub struct ColorStream<'a, W: ?Sized> {
    sink: &'a mut W,
    highlighter: Highlighter,
}

impl<'a, W> ColorStream<'a, W>
where
    W: Write + Interactive + ?Sized,
{
    /// Wrap `sink` for the lifetime of the borrow
    pub fn new(sink: &'a mut W) -> Result<Self> {
        Ok(Self::with_highlighter(sink, Highlighter::new()?))
    }

    /// Wrap `sink` reusing an already compiled highlighter
    pub fn with_highlighter(sink: &'a mut W, highlighter: Highlighter) -> Self {
        ColorStream { sink, highlighter }
    }

    /// Access the wrapped sink
    pub fn get_ref(&self) -> &W {
        self.sink
    }

    /// Whether colors would be emitted right now
    ///
    /// Asked on every write; a failing query counts as "not a terminal".
    pub fn should_color(&self) -> bool {
        match self.sink.interactive() {
            Ok(tty) => tty,
            Err(err) => {
                debug!(error = %err, "terminal query failed, writing without color");
                false
            }
        }
    }

    /// Transform one write's worth of bytes
    ///
    /// Bytes that are not valid UTF-8 come back untouched.
    pub fn colorize<'b>(&self, buf: &'b [u8]) -> Cow<'b, [u8]> {
        if !self.should_color() {
            return Cow::Borrowed(buf);
        }
        match std::str::from_utf8(buf) {
            Ok(text) => match self.highlighter.render(text) {
                Cow::Borrowed(_) => Cow::Borrowed(buf),
                Cow::Owned(s) => Cow::Owned(s.into_bytes()),
            },
            Err(err) => {
                debug!(error = %err, "non-text write passed through unchanged");
                Cow::Borrowed(buf)
            }
        }
    }

    /// Flush the sink, reporting instead of returning any failure
    pub fn try_flush(&mut self) -> FlushOutcome {
        match self.sink.flush() {
            Ok(()) => FlushOutcome::Flushed,
            Err(err) => FlushOutcome::Suppressed(err),
        }
    }
}

impl<W> Write for ColorStream<'_, W>
where
    W: Write + Interactive + ?Sized,
{
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let out = self.colorize(buf);
        self.sink.write_all(&out)?;
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        if let FlushOutcome::Suppressed(err) = self.try_flush() {
            debug!(error = %err, "flush failed, ignoring");
        }
        Ok(())
    }
}
