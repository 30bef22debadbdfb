#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Tok {
    /// An identifier: bare word, numeral or double-quoted string (unescaped).
    Id { text: String, quoted: bool },
    LBrace,
    RBrace,
    LBracket,
    RBracket,
    Eq,
    Semi,
    Comma,
    Colon,
    Arrow,
    DashDash,
}

impl Tok {
    pub(crate) fn describe(&self) -> String {
        match self {
            Tok::Id { text, .. } => format!("`{text}`"),
            Tok::LBrace => "`{`".to_string(),
            Tok::RBrace => "`}`".to_string(),
            Tok::LBracket => "`[`".to_string(),
            Tok::RBracket => "`]`".to_string(),
            Tok::Eq => "`=`".to_string(),
            Tok::Semi => "`;`".to_string(),
            Tok::Comma => "`,`".to_string(),
            Tok::Colon => "`:`".to_string(),
            Tok::Arrow => "`->`".to_string(),
            Tok::DashDash => "`--`".to_string(),
        }
    }

    /// Case-insensitive keyword test; quoted strings are never keywords.
    pub(crate) fn is_keyword(&self, kw: &str) -> bool {
        matches!(self, Tok::Id { text, quoted: false } if text.eq_ignore_ascii_case(kw))
    }
}

#[derive(Debug, Clone, thiserror::Error)]
#[error("{message}")]
pub(crate) struct LexError {
    pub offset: usize,
    pub message: String,
}

pub(crate) type Spanned = (usize, Tok, usize);

pub(crate) struct Lexer<'input> {
    input: &'input str,
    pos: usize,
    line_start: bool,
}

impl<'input> Lexer<'input> {
    pub(crate) fn new(input: &'input str) -> Self {
        Self {
            input,
            pos: 0,
            line_start: true,
        }
    }

    fn peek(&self) -> Option<u8> {
        self.input.as_bytes().get(self.pos).copied()
    }

    fn peek_at(&self, n: usize) -> Option<u8> {
        self.input.as_bytes().get(self.pos + n).copied()
    }

    fn bump(&mut self) -> Option<u8> {
        let b = self.peek()?;
        self.pos += 1;
        Some(b)
    }

    fn skip_to_newline(&mut self) {
        while let Some(b) = self.peek() {
            if b == b'\n' {
                break;
            }
            self.pos += 1;
        }
    }

    /// Skips whitespace and comments. `#` lines are only comments at the start of a line.
    fn skip_trivia(&mut self) -> Result<(), LexError> {
        loop {
            match self.peek() {
                Some(b'\n') => {
                    self.pos += 1;
                    self.line_start = true;
                }
                Some(b) if b.is_ascii_whitespace() => self.pos += 1,
                Some(b'#') if self.line_start => self.skip_to_newline(),
                Some(b'/') if self.peek_at(1) == Some(b'/') => self.skip_to_newline(),
                Some(b'/') if self.peek_at(1) == Some(b'*') => {
                    let start = self.pos;
                    let Some(end) = self.input[self.pos + 2..].find("*/") else {
                        return Err(LexError {
                            offset: start,
                            message: "unterminated block comment".to_string(),
                        });
                    };
                    self.pos += 2 + end + 2;
                }
                _ => return Ok(()),
            }
        }
    }

    fn lex_quoted(&mut self) -> Result<Tok, LexError> {
        let start = self.pos;
        self.pos += 1;
        let mut text = String::new();
        loop {
            let rest = &self.input[self.pos..];
            let Some(ch) = rest.chars().next() else {
                return Err(LexError {
                    offset: start,
                    message: "unterminated string".to_string(),
                });
            };
            self.pos += ch.len_utf8();
            match ch {
                '"' => break,
                '\\' => match self.peek() {
                    Some(b'"') => {
                        self.pos += 1;
                        text.push('"');
                    }
                    Some(b'\\') => {
                        // Kept as a pair so a trailing `\\` cannot escape the closing quote.
                        self.pos += 1;
                        text.push_str("\\\\");
                    }
                    Some(b'\n') => {
                        // Line continuation.
                        self.pos += 1;
                    }
                    _ => text.push('\\'),
                },
                c => text.push(c),
            }
        }
        Ok(Tok::Id { text, quoted: true })
    }

    fn lex_numeral(&mut self) -> Tok {
        let start = self.pos;
        if self.peek() == Some(b'-') {
            self.pos += 1;
        }
        while let Some(b) = self.peek() {
            if b.is_ascii_digit() || b == b'.' {
                self.pos += 1;
            } else {
                break;
            }
        }
        Tok::Id {
            text: self.input[start..self.pos].to_string(),
            quoted: false,
        }
    }

    fn lex_word(&mut self) -> Tok {
        let start = self.pos;
        while let Some(ch) = self.input[self.pos..].chars().next() {
            if ch == '_' || ch.is_alphanumeric() {
                self.pos += ch.len_utf8();
            } else {
                break;
            }
        }
        Tok::Id {
            text: self.input[start..self.pos].to_string(),
            quoted: false,
        }
    }

    fn next_token(&mut self) -> Option<Result<Spanned, LexError>> {
        if let Err(e) = self.skip_trivia() {
            self.pos = self.input.len();
            return Some(Err(e));
        }
        let start = self.pos;
        let b = self.peek()?;
        self.line_start = false;
        let tok = match b {
            b'{' => {
                self.bump();
                Tok::LBrace
            }
            b'}' => {
                self.bump();
                Tok::RBrace
            }
            b'[' => {
                self.bump();
                Tok::LBracket
            }
            b']' => {
                self.bump();
                Tok::RBracket
            }
            b'=' => {
                self.bump();
                Tok::Eq
            }
            b';' => {
                self.bump();
                Tok::Semi
            }
            b',' => {
                self.bump();
                Tok::Comma
            }
            b':' => {
                self.bump();
                Tok::Colon
            }
            b'-' if self.peek_at(1) == Some(b'>') => {
                self.pos += 2;
                Tok::Arrow
            }
            b'-' if self.peek_at(1) == Some(b'-') => {
                self.pos += 2;
                Tok::DashDash
            }
            b'"' => match self.lex_quoted() {
                Ok(tok) => tok,
                Err(e) => {
                    self.pos = self.input.len();
                    return Some(Err(e));
                }
            },
            b'-' | b'.' | b'0'..=b'9' => self.lex_numeral(),
            b'<' => {
                self.pos = self.input.len();
                return Some(Err(LexError {
                    offset: start,
                    message: "HTML-like labels are not supported".to_string(),
                }));
            }
            _ => {
                let tok = self.lex_word();
                if self.pos == start {
                    let ch = self.input[start..].chars().next().unwrap_or('?');
                    self.pos = self.input.len();
                    return Some(Err(LexError {
                        offset: start,
                        message: format!("unexpected character `{ch}`"),
                    }));
                }
                tok
            }
        };
        Some(Ok((start, tok, self.pos)))
    }
}

impl Iterator for Lexer<'_> {
    type Item = Result<Spanned, LexError>;

    fn next(&mut self) -> Option<Self::Item> {
        self.next_token()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn toks(input: &str) -> Vec<Tok> {
        Lexer::new(input).map(|r| r.unwrap().1).collect()
    }

    fn id(text: &str) -> Tok {
        Tok::Id {
            text: text.to_string(),
            quoted: false,
        }
    }

    #[test]
    fn lexes_edge_statement_with_attributes() {
        assert_eq!(
            toks(r##"a -> "b c" [color="#333", penwidth=1.5];"##),
            vec![
                id("a"),
                Tok::Arrow,
                Tok::Id {
                    text: "b c".into(),
                    quoted: true
                },
                Tok::LBracket,
                id("color"),
                Tok::Eq,
                Tok::Id {
                    text: "#333".into(),
                    quoted: true
                },
                Tok::Comma,
                id("penwidth"),
                Tok::Eq,
                id("1.5"),
                Tok::RBracket,
                Tok::Semi,
            ]
        );
    }

    #[test]
    fn skips_all_comment_forms() {
        let input = "# preprocessor line\ndigraph { // trailing\n /* block\n comment */ a }";
        assert_eq!(
            toks(input),
            vec![id("digraph"), Tok::LBrace, id("a"), Tok::RBrace]
        );
    }

    #[test]
    fn unescapes_quotes_but_keeps_other_escapes() {
        assert_eq!(
            toks(r#""say \"hi\"\nbye""#),
            vec![Tok::Id {
                text: "say \"hi\"\\nbye".into(),
                quoted: true
            }]
        );
    }

    #[test]
    fn reports_unterminated_string_offset() {
        let err = Lexer::new("a -> \"oops").find_map(Result::err).unwrap();
        assert_eq!(err.offset, 5);
    }

    #[test]
    fn keywords_are_case_insensitive_and_never_quoted() {
        assert!(id("DiGraph").is_keyword("digraph"));
        assert!(
            !Tok::Id {
                text: "node".into(),
                quoted: true
            }
            .is_keyword("node")
        );
    }
}
