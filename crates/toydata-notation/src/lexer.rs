use crate::errors::NotationError;

/// Token classes of the notation.
///
/// Double and single brackets are distinct token kinds; the parser never
/// reinterprets one as the other.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TokenKind {
    /// Text outside any bracket (a verb name, type tag word or literal).
    Word(String),
    /// Content of a `[[...]]` clause.
    Double(String),
    /// Content of a `[...]` clause.
    Single(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub kind: TokenKind,
    /// Character offset of the token start in the source string.
    pub position: usize,
}

impl Token {
    /// Source text of the token, brackets included.
    pub fn text(&self) -> String {
        match &self.kind {
            TokenKind::Word(word) => word.clone(),
            TokenKind::Double(content) => format!("[[{content}]]"),
            TokenKind::Single(content) => format!("[{content}]"),
        }
    }
}

pub fn lex(src: &str) -> Result<Vec<Token>, NotationError> {
    let mut tokens = Vec::new();
    let chars: Vec<char> = src.chars().collect();
    let mut pos = 0usize;

    while pos < chars.len() {
        let c = chars[pos];

        if c == '[' {
            let start = pos;
            let double = pos + 1 < chars.len() && chars[pos + 1] == '[';
            pos += if double { 2 } else { 1 };
            let content_start = pos;

            loop {
                if pos >= chars.len() {
                    let open = if double { "[[" } else { "[" };
                    return Err(NotationError::syntax(
                        open,
                        start,
                        format!("unbalanced brackets: `{open}` is never closed"),
                    ));
                }
                match chars[pos] {
                    '[' => {
                        return Err(NotationError::syntax(
                            "[",
                            pos,
                            "nested brackets are not allowed",
                        ));
                    }
                    ']' => break,
                    _ => pos += 1,
                }
            }

            let content: String = chars[content_start..pos].iter().collect();

            if double {
                if pos + 1 >= chars.len() || chars[pos + 1] != ']' {
                    return Err(NotationError::syntax(
                        format!("[[{content}]"),
                        start,
                        "double bracket closed with a single bracket",
                    ));
                }
                pos += 2;
            } else {
                pos += 1;
                if pos < chars.len() && chars[pos] == ']' {
                    return Err(NotationError::syntax(
                        format!("[{content}]]"),
                        start,
                        "single bracket closed with a double bracket",
                    ));
                }
            }

            if content.trim().is_empty() {
                let text = if double { "[[]]" } else { "[]" };
                return Err(NotationError::syntax(text, start, "empty bracket clause"));
            }

            let kind = if double {
                TokenKind::Double(content)
            } else {
                TokenKind::Single(content)
            };
            tokens.push(Token {
                kind,
                position: start,
            });
            continue;
        }

        if c == ']' {
            return Err(NotationError::syntax(
                "]",
                pos,
                "unbalanced brackets: `]` without a matching `[`",
            ));
        }

        let start = pos;
        while pos < chars.len() && chars[pos] != '[' && chars[pos] != ']' {
            pos += 1;
        }
        tokens.push(Token {
            kind: TokenKind::Word(chars[start..pos].iter().collect()),
            position: start,
        });
    }

    Ok(tokens)
}
