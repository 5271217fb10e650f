//! Quote-aware tokenizer for a single input line.
//!
//! Words are runs of an extended word-character set; single and double
//! quotes group text verbatim and a backslash escapes the next character.
//! Any other punctuation stands alone: `|` is a pipe, `<` and `>` are
//! redirects, `#` starts a comment running to the end of the line, and
//! everything else is a one-character word. Quoted text is always a word, so
//! `'|'` does not split a pipeline.

use std::iter::Peekable;
use std::str::Chars;

use trellis_types::error::{Result, TrellisError};

/// Punctuation that counts as part of a word.
const EXTRA_WORD_CHARS: &str = ",./[]{}~!@$%^&*()-_=+:;";

const COMMENT: char = '#';

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    Word,
    Pipe,
    Redirect,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub kind: TokenKind,
    pub text: String,
}

impl Token {
    fn word(text: impl Into<String>) -> Self {
        Self {
            kind: TokenKind::Word,
            text: text.into(),
        }
    }

    pub fn is_pipe(&self) -> bool {
        self.kind == TokenKind::Pipe
    }
}

fn is_word_char(ch: char) -> bool {
    ch.is_alphanumeric() || ch == '_' || EXTRA_WORD_CHARS.contains(ch)
}

/// Lazy token sequence over one line.
///
/// Tokens carry no positions, so iterating again just means building a new
/// lexer over the same line. The sequence ends after the first error.
#[derive(Debug, Clone)]
pub struct Lexer<'a> {
    chars: Peekable<Chars<'a>>,
    failed: bool,
}

impl<'a> Lexer<'a> {
    pub fn new(line: &'a str) -> Self {
        Self {
            chars: line.chars().peekable(),
            failed: false,
        }
    }

    fn read_word(&mut self) -> Result<Token> {
        let mut text = String::new();
        while let Some(&ch) = self.chars.peek() {
            match ch {
                '\'' => {
                    self.chars.next();
                    self.read_quoted('\'', &mut text)?;
                },
                '"' => {
                    self.chars.next();
                    self.read_quoted('"', &mut text)?;
                },
                '\\' => {
                    self.chars.next();
                    match self.chars.next() {
                        Some(escaped) => text.push(escaped),
                        None => {
                            return Err(TrellisError::Syntax(
                                "no escaped character".to_string(),
                            ));
                        },
                    }
                },
                c if is_word_char(c) => {
                    text.push(c);
                    self.chars.next();
                },
                _ => break,
            }
        }
        Ok(Token::word(text))
    }

    fn read_quoted(&mut self, quote: char, text: &mut String) -> Result<()> {
        loop {
            match self.chars.next() {
                Some(c) if c == quote => return Ok(()),
                Some('\\') if quote == '"' => match self.chars.peek() {
                    Some(&next) if next == '"' || next == '\\' => {
                        text.push(next);
                        self.chars.next();
                    },
                    _ => text.push('\\'),
                },
                Some(c) => text.push(c),
                None => {
                    return Err(TrellisError::Syntax("no closing quotation".to_string()));
                },
            }
        }
    }
}

impl Iterator for Lexer<'_> {
    type Item = Result<Token>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed {
            return None;
        }
        while self.chars.next_if(|c| c.is_whitespace()).is_some() {}

        let &ch = self.chars.peek()?;
        if ch == COMMENT {
            self.chars.by_ref().for_each(drop);
            return None;
        }
        let token = match ch {
            '\'' | '"' | '\\' => self.read_word(),
            c if is_word_char(c) => self.read_word(),
            '|' => {
                self.chars.next();
                Ok(Token {
                    kind: TokenKind::Pipe,
                    text: "|".to_string(),
                })
            },
            '<' | '>' => {
                self.chars.next();
                Ok(Token {
                    kind: TokenKind::Redirect,
                    text: ch.to_string(),
                })
            },
            other => {
                self.chars.next();
                Ok(Token::word(other))
            },
        };
        if token.is_err() {
            self.failed = true;
        }
        Some(token)
    }
}

/// Tokenize a whole line eagerly.
pub fn tokenize(line: &str) -> Result<Vec<Token>> {
    Lexer::new(line).collect()
}

/// Split tokens into pipeline stages on pipe tokens, joining each stage's
/// tokens with single spaces.
///
/// An empty trailing stage (`cmd |`) is dropped; empty leading or middle
/// stages are kept so the dispatcher can report them.
pub fn split_stages(tokens: &[Token]) -> Vec<String> {
    let mut stages = Vec::new();
    let mut part: Vec<&str> = Vec::new();
    for token in tokens {
        if token.is_pipe() {
            stages.push(part.join(" "));
            part.clear();
        } else {
            part.push(&token.text);
        }
    }
    if !part.is_empty() {
        stages.push(part.join(" "));
    }
    stages
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds_and_text(line: &str) -> Vec<(TokenKind, String)> {
        tokenize(line)
            .unwrap()
            .into_iter()
            .map(|t| (t.kind, t.text))
            .collect()
    }

    #[test]
    fn single_word() {
        assert_eq!(
            kinds_and_text("test"),
            vec![(TokenKind::Word, "test".to_string())]
        );
    }

    #[test]
    fn lone_pipe() {
        let tokens = tokenize("|").unwrap();
        assert_eq!(tokens.len(), 1);
        assert_eq!(tokens[0].kind, TokenKind::Pipe);
    }

    #[test]
    fn pipe_with_options() {
        let got = kinds_and_text("test | wc -l");
        assert_eq!(
            got,
            vec![
                (TokenKind::Word, "test".to_string()),
                (TokenKind::Pipe, "|".to_string()),
                (TokenKind::Word, "wc".to_string()),
                (TokenKind::Word, "-l".to_string()),
            ]
        );
    }

    #[test]
    fn quotes_pipes_and_redirects() {
        let got = kinds_and_text(r#"this "is a" '<' |test 'with "pipes' > redirect"#);
        assert_eq!(
            got,
            vec![
                (TokenKind::Word, "this".to_string()),
                (TokenKind::Word, "is a".to_string()),
                (TokenKind::Word, "<".to_string()),
                (TokenKind::Pipe, "|".to_string()),
                (TokenKind::Word, "test".to_string()),
                (TokenKind::Word, r#"with "pipes"#.to_string()),
                (TokenKind::Redirect, ">".to_string()),
                (TokenKind::Word, "redirect".to_string()),
            ]
        );
    }

    #[test]
    fn extended_word_chars_stay_together() {
        let got = kinds_and_text("ping 10.0.0.1/24 -c:3 a=b");
        let texts: Vec<&str> = got.iter().map(|(_, t)| t.as_str()).collect();
        assert_eq!(texts, vec!["ping", "10.0.0.1/24", "-c:3", "a=b"]);
    }

    #[test]
    fn adjacent_quotes_concatenate() {
        let got = kinds_and_text(r#"ab"c d"'e'"#);
        assert_eq!(got, vec![(TokenKind::Word, "abc de".to_string())]);
    }

    #[test]
    fn backslash_escapes() {
        let got = kinds_and_text(r"a\ b \|");
        assert_eq!(
            got,
            vec![
                (TokenKind::Word, "a b".to_string()),
                (TokenKind::Word, "|".to_string()),
            ]
        );
    }

    #[test]
    fn escaped_quote_inside_double_quotes() {
        let got = kinds_and_text(r#""say \"hi\"""#);
        assert_eq!(got, vec![(TokenKind::Word, r#"say "hi""#.to_string())]);
    }

    #[test]
    fn other_punctuation_is_single_char_word() {
        let got = kinds_and_text("a?b");
        let texts: Vec<&str> = got.iter().map(|(_, t)| t.as_str()).collect();
        assert_eq!(texts, vec!["a", "?", "b"]);
    }

    #[test]
    fn hash_starts_comment() {
        let got = kinds_and_text("show # note | grep x");
        assert_eq!(got, vec![(TokenKind::Word, "show".to_string())]);
        let got = kinds_and_text("a#b c");
        assert_eq!(got, vec![(TokenKind::Word, "a".to_string())]);
        assert!(tokenize("# only a comment").unwrap().is_empty());
    }

    #[test]
    fn quoted_or_escaped_hash_is_text() {
        let got = kinds_and_text(r"'#1' \#2");
        let texts: Vec<&str> = got.iter().map(|(_, t)| t.as_str()).collect();
        assert_eq!(texts, vec!["#1", "#2"]);
    }

    #[test]
    fn quote_inside_comment_is_not_an_error() {
        let tokens = tokenize("show # it's fine").unwrap();
        assert_eq!(split_stages(&tokens), vec!["show"]);
    }

    #[test]
    fn unterminated_quote_is_error() {
        let err = tokenize("echo 'oops").unwrap_err();
        assert!(format!("{err}").contains("no closing quotation"));
        let err = tokenize("echo \"oops").unwrap_err();
        assert!(err.is_user_error());
    }

    #[test]
    fn sequence_stops_after_error() {
        let mut lexer = Lexer::new("a 'b");
        assert!(lexer.next().unwrap().is_ok());
        assert!(lexer.next().unwrap().is_err());
        assert!(lexer.next().is_none());
    }

    #[test]
    fn empty_and_blank_lines() {
        assert!(tokenize("").unwrap().is_empty());
        assert!(tokenize("   \t ").unwrap().is_empty());
    }

    #[test]
    fn restartable_by_rebuilding() {
        let line = "show | grep a";
        let first: Vec<_> = Lexer::new(line).collect();
        let second: Vec<_> = Lexer::new(line).collect();
        assert_eq!(first.len(), second.len());
    }

    #[test]
    fn stages_split_on_pipes() {
        let tokens = tokenize("show run | grep -i 'a b' | head -n 1").unwrap();
        assert_eq!(
            split_stages(&tokens),
            vec!["show run", "grep -i a b", "head -n 1"]
        );
    }

    #[test]
    fn trailing_pipe_dropped() {
        let tokens = tokenize("show |").unwrap();
        assert_eq!(split_stages(&tokens), vec!["show"]);
    }

    #[test]
    fn leading_pipe_keeps_empty_stage() {
        let tokens = tokenize("| grep a").unwrap();
        assert_eq!(split_stages(&tokens), vec!["", "grep a"]);
    }

    #[test]
    fn redirect_passes_through_as_text() {
        let tokens = tokenize("show > out").unwrap();
        assert_eq!(split_stages(&tokens), vec!["show > out"]);
    }
}
