//! The token & comment stream (spec.md 6.1): `mm-core` names this an
//! external collaborator rather than part of the core, so the CLI owns it.
//! Grounded in `examples/original_source/src/comment.cpp`'s `comment`/
//! `addcmd` pair, re-expressed over an already-in-memory source string
//! instead of a `std::ifstream`.

use mm_core::ingest::JCommand;

#[derive(Debug)]
pub struct TokenizeError {
    pub what: String,
}

impl std::fmt::Display for TokenizeError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "tokenizer error: {}", self.what)
    }
}

impl std::error::Error for TokenizeError {}

fn unquote(word: &str) -> String {
    if word.len() >= 2 && word.starts_with('\'') && word.ends_with('\'') {
        word[1..word.len() - 1].to_string()
    } else {
        word.to_string()
    }
}

/// Split a `$j`/`$t` comment body's words (everything after the leading
/// `$j`/`$t` token) into semicolon-delimited commands.
fn split_commands(words: &[String]) -> Vec<Vec<String>> {
    let mut commands: Vec<Vec<String>> = vec![Vec::new()];
    for tok in words {
        let mut parts = tok.split(';').peekable();
        while let Some(part) = parts.next() {
            if !part.is_empty() {
                commands.last_mut().expect("always at least one command in progress").push(unquote(part));
            }
            if parts.peek().is_some() {
                commands.push(Vec::new());
            }
        }
    }
    if commands.last().is_some_and(Vec::is_empty) {
        commands.pop();
    }
    commands
}

/// Tokenize `src` into the flat math-token stream plus any `$j`/`$t`
/// structured commands it carried, dropping ordinary comments entirely.
pub fn tokenize(src: &str) -> Result<(Vec<String>, Vec<JCommand>), TokenizeError> {
    let raw: Vec<&str> = src.split_ascii_whitespace().collect();
    let mut tokens = Vec::new();
    let mut jcommands = Vec::new();
    let mut i = 0;

    while i < raw.len() {
        if raw[i] == "$(" {
            let start = i + 1;
            let mut j = start;
            while j < raw.len() && raw[j] != "$)" {
                j += 1;
            }
            if j == raw.len() {
                return Err(TokenizeError { what: "unclosed $( comment".into() });
            }
            let body = &raw[start..j];
            if body.first() == Some(&"$j") || body.first() == Some(&"$t") {
                let words: Vec<String> = body[1..].iter().map(|s| s.to_string()).collect();
                for command in split_commands(&words) {
                    if let Some((name, rest)) = command.split_first() {
                        jcommands.push(JCommand { name: name.clone(), words: rest.to_vec() });
                    }
                }
            }
            i = j + 1;
        } else {
            tokens.push(raw[i].to_string());
            i += 1;
        }
    }
    Ok((tokens, jcommands))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_comments_are_dropped_without_leaving_a_trace() {
        let src = "$c wff $. $( just a remark $) $v p $.";
        let (tokens, jcommands) = tokenize(src).unwrap();
        assert_eq!(tokens, vec!["$c", "wff", "$.", "$v", "p", "$."]);
        assert!(jcommands.is_empty());
    }

    #[test]
    fn a_j_comment_yields_one_structured_command_per_semicolon_group() {
        let src = "$( $j ctor-definitions wi 0 1 1 1; syntax 'wff'; $)";
        let (tokens, jcommands) = tokenize(src).unwrap();
        assert!(tokens.is_empty());
        assert_eq!(jcommands.len(), 2);
        assert_eq!(jcommands[0].name, "ctor-definitions");
        assert_eq!(jcommands[0].words, vec!["wi", "0", "1", "1", "1"]);
        assert_eq!(jcommands[1].name, "syntax");
        assert_eq!(jcommands[1].words, vec!["wff"]);
    }

    #[test]
    fn unclosed_comment_is_an_error() {
        let src = "$( never closed";
        assert!(tokenize(src).is_err());
    }
}
