//! Parser for test script files
//!
//! A script is a list of commands, one per line, optionally followed by file
//! blocks introduced with `-- name --` headers:
//!
//! ```text
//! # comment
//! [unix] exec cat greeting.txt
//! stdout 'hello'
//! ! exists missing.txt
//!
//! -- greeting.txt --
//! hello
//! ```

use crate::error::{Error, Result};

/// A file materialized into the work directory before the script runs
#[derive(Debug, Clone, PartialEq)]
pub struct ScriptFile {
    /// Path relative to the work directory
    pub name: String,
    /// Raw contents, without the block's trailing newline
    pub contents: Vec<u8>,
}

/// A single command line
#[derive(Debug, Clone, PartialEq)]
pub struct Command {
    /// The command name (first word after any prefix)
    pub name: String,
    /// Command arguments
    pub args: Vec<String>,
    /// 1-based line number in the script
    pub line_num: usize,
    /// Condition guarding the command, e.g. `unix` or `!windows`
    pub condition: Option<String>,
    /// Whether the command is expected to fail (`! cmd`)
    pub negated: bool,
}

/// A parsed test script
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Script {
    /// Commands in execution order
    pub commands: Vec<Command>,
    /// Files to create before running
    pub files: Vec<ScriptFile>,
}

impl Script {
    /// Whether the script declares itself slow with a bare `slow` line
    pub fn is_slow(&self) -> bool {
        self.commands
            .iter()
            .any(|c| c.name == "slow" && c.condition.is_none() && !c.negated)
    }
}

/// Parse script source into commands and files
///
/// # Errors
/// Returns [`Error::Parse`] with the offending line number for an unclosed
/// condition bracket or a `!` that is not followed by a command.
pub fn parse(content: &str) -> Result<Script> {
    let mut script = Script::default();
    let mut current_file: Option<ScriptFile> = None;

    for (idx, line) in content.lines().enumerate() {
        if let Some(name) = parse_file_header(line) {
            if let Some(file) = current_file.take() {
                script.files.push(finish_file(file));
            }
            current_file = Some(ScriptFile {
                name,
                contents: Vec::new(),
            });
            continue;
        }

        if let Some(file) = current_file.as_mut() {
            file.contents.extend_from_slice(line.as_bytes());
            file.contents.push(b'\n');
            continue;
        }

        if let Some(command) = parse_command_line(line, idx + 1)? {
            script.commands.push(command);
        }
    }

    if let Some(file) = current_file.take() {
        script.files.push(finish_file(file));
    }

    Ok(script)
}

/// Drop the newline added after the last line of a file block
fn finish_file(mut file: ScriptFile) -> ScriptFile {
    if file.contents.ends_with(b"\n") {
        file.contents.pop();
    }
    file
}

/// Parse a file header line like `-- name --`
fn parse_file_header(line: &str) -> Option<String> {
    let name = line
        .trim()
        .strip_prefix("-- ")?
        .strip_suffix(" --")?
        .trim();
    if name.is_empty() {
        None
    } else {
        Some(name.to_string())
    }
}

/// Parse one command line; blank lines and comments yield `None`
fn parse_command_line(line: &str, line_num: usize) -> Result<Option<Command>> {
    let trimmed = line.trim();
    if trimmed.is_empty() || trimmed.starts_with('#') {
        return Ok(None);
    }

    let (condition, rest) = match trimmed.strip_prefix('[') {
        Some(after) => {
            let end = after
                .find(']')
                .ok_or_else(|| Error::parse_error(line_num, "Unclosed condition bracket"))?;
            (Some(after[..end].trim().to_string()), after[end + 1..].trim())
        }
        None => (None, trimmed),
    };

    let mut tokens = tokenize(rest).into_iter();
    let Some(first) = tokens.next() else {
        return Ok(None);
    };

    let (negated, name) = if first == "!" {
        let name = tokens
            .next()
            .ok_or_else(|| Error::parse_error(line_num, "! requires a command"))?;
        (true, name)
    } else {
        (false, first)
    };

    Ok(Some(Command {
        name,
        args: tokens.collect(),
        line_num,
        condition,
        negated,
    }))
}

/// Split a command line into words, honoring quotes and backslash escapes
fn tokenize(input: &str) -> Vec<String> {
    let mut tokens = Vec::new();
    let mut current = String::new();
    // A quoted empty string still counts as a token.
    let mut pending = false;
    let mut quote: Option<char> = None;
    let mut chars = input.chars();

    while let Some(ch) = chars.next() {
        match (ch, quote) {
            ('"' | '\'', None) => {
                quote = Some(ch);
                pending = true;
            }
            (c, Some(q)) if c == q => quote = None,
            (' ' | '\t', None) => {
                if pending {
                    tokens.push(std::mem::take(&mut current));
                    pending = false;
                }
            }
            ('\\', _) => {
                pending = true;
                match chars.next() {
                    Some('n') => current.push('\n'),
                    Some('t') => current.push('\t'),
                    Some(c @ ('\\' | '"' | '\'')) => current.push(c),
                    Some(other) => {
                        current.push('\\');
                        current.push(other);
                    }
                    None => current.push('\\'),
                }
            }
            (c, _) => {
                current.push(c);
                pending = true;
            }
        }
    }

    if pending {
        tokens.push(current);
    }
    tokens
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn file_headers() {
        assert_eq!(parse_file_header("-- hello.txt --"), Some("hello.txt".to_string()));
        assert_eq!(
            parse_file_header("-- sub/dir/file.txt --"),
            Some("sub/dir/file.txt".to_string())
        );
        assert_eq!(parse_file_header("--hello--"), None);
        assert_eq!(parse_file_header("--  --"), None);
        assert_eq!(parse_file_header("hello"), None);
    }

    #[test]
    fn tokens_with_quotes_and_escapes() {
        assert_eq!(tokenize("exec echo hello"), vec!["exec", "echo", "hello"]);
        assert_eq!(tokenize("exec echo \"hello world\""), vec!["exec", "echo", "hello world"]);
        assert_eq!(tokenize("stdout 'a\\nb'"), vec!["stdout", "a\nb"]);
        assert_eq!(tokenize("exec echo \"say \\\"hi\\\"\""), vec!["exec", "echo", "say \"hi\""]);
        assert_eq!(tokenize("stdout ''"), vec!["stdout", ""]);
        assert_eq!(tokenize("  spaced\t\tout  "), vec!["spaced", "out"]);
    }

    #[test]
    fn command_prefixes() {
        let cmd = parse_command_line("exec echo hi", 1).unwrap().unwrap();
        assert_eq!(cmd.name, "exec");
        assert_eq!(cmd.args, vec!["echo", "hi"]);
        assert_eq!(cmd.condition, None);
        assert!(!cmd.negated);

        let cmd = parse_command_line("[!windows] ! exists gone", 7).unwrap().unwrap();
        assert_eq!(cmd.condition.as_deref(), Some("!windows"));
        assert!(cmd.negated);
        assert_eq!(cmd.name, "exists");
        assert_eq!(cmd.line_num, 7);

        assert!(parse_command_line("# note", 1).unwrap().is_none());
        assert!(parse_command_line("[unix]", 1).unwrap().is_none());
    }

    #[test]
    fn command_errors_carry_line() {
        match parse("exec true\n[unix exec true") {
            Err(Error::Parse { line, .. }) => assert_eq!(line, 2),
            other => panic!("unexpected: {:?}", other),
        }
        assert!(matches!(parse("!"), Err(Error::Parse { line: 1, .. })));
    }

    #[test]
    fn script_with_files() {
        let content = "exec cat a.txt b.txt\nstdout 'one\\ntwo'\n\n-- a.txt --\none\n-- b.txt --\ntwo\n";
        let script = parse(content).unwrap();
        assert_eq!(script.commands.len(), 2);
        assert_eq!(script.files.len(), 2);
        assert_eq!(script.files[0].name, "a.txt");
        assert_eq!(script.files[0].contents, b"one");
        assert_eq!(script.files[1].contents, b"two");
    }

    #[test]
    fn file_blocks_keep_blank_and_comment_lines() {
        let script = parse("-- f --\n# not a comment\n\nend").unwrap();
        assert!(script.commands.is_empty());
        assert_eq!(script.files[0].contents, b"# not a comment\n\nend");
    }

    #[test]
    fn slow_marker() {
        assert!(parse("slow\nexec true").unwrap().is_slow());
        assert!(!parse("[linux] slow\nexec true").unwrap().is_slow());
        assert!(!parse("exec true").unwrap().is_slow());
    }
}
