//! Normalized SQL token stream on top of `sqlparser`'s tokenizer.
//!
//! The classifier only needs words, separators and parentheses. Whitespace and
//! comments are dropped; literals and operators collapse into `Other`.

use sqlparser::dialect::MySqlDialect;
use sqlparser::tokenizer::{Token, Tokenizer};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Tok {
    Word { value: String, quoted: bool },
    Dot,
    Comma,
    LParen,
    RParen,
    Semi,
    Other,
}

impl Tok {
    /// Unquoted word equal to `keyword`, ignoring case.
    pub fn is_keyword(&self, keyword: &str) -> bool {
        matches!(self, Tok::Word { value, quoted: false } if value.eq_ignore_ascii_case(keyword))
    }

    pub fn is_any_keyword(&self, keywords: &[&str]) -> bool {
        keywords.iter().any(|k| self.is_keyword(k))
    }

    pub fn word(&self) -> Option<&str> {
        match self {
            Tok::Word { value, .. } => Some(value),
            _ => None,
        }
    }

    pub fn is_quoted(&self) -> bool {
        matches!(self, Tok::Word { quoted: true, .. })
    }
}

/// Tokenize `sql`. A lexer rejection (e.g. unterminated quote) is returned as its message.
pub fn tokenize(sql: &str) -> Result<Vec<Tok>, String> {
    let dialect = MySqlDialect {};
    let tokens = Tokenizer::new(&dialect, sql)
        .tokenize()
        .map_err(|e| e.to_string())?;

    Ok(tokens
        .into_iter()
        .filter_map(|token| match token {
            Token::Word(w) => Some(Tok::Word {
                value: w.value,
                quoted: w.quote_style.is_some(),
            }),
            Token::Period => Some(Tok::Dot),
            Token::Comma => Some(Tok::Comma),
            Token::LParen => Some(Tok::LParen),
            Token::RParen => Some(Tok::RParen),
            Token::SemiColon => Some(Tok::Semi),
            Token::Whitespace(_) | Token::EOF => None,
            _ => Some(Tok::Other),
        })
        .collect())
}
