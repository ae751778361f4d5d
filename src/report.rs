use core::str::FromStr;

use heapless::{String, Vec};
use nom::{
    branch::alt,
    bytes::complete::tag,
    character::complete::anychar,
    combinator::map,
    multi::fold_many_m_n,
    IResult,
};

use crate::Error;

/// Raw bytes accepted per line before the reader declares it malformed.
pub const MAX_LINE_LENGTH: usize = 64;

/// Decoded-line capacity. Code points above 0x7f take two bytes of UTF-8.
pub const MAX_DECODED_LENGTH: usize = MAX_LINE_LENGTH * 2;

const MAX_TOKENS: usize = MAX_LINE_LENGTH;

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Token {
    /// The literal word "space". A momentary press, never held.
    Space,
    /// Any other single character. Unmapped ones are ignored downstream.
    Char(char),
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Report {
    /// The "null" line: release every held key.
    ReleaseAll,
    Buttons(Vec<Token, MAX_TOKENS>),
}

fn space_token(i: &str) -> IResult<&str, Token> {
    map(tag("space"), |_| Token::Space)(i)
}

fn char_token(i: &str) -> IResult<&str, Token> {
    map(anychar, Token::Char)(i)
}

fn tokens(i: &str) -> IResult<&str, Vec<Token, MAX_TOKENS>> {
    fold_many_m_n(
        0,
        MAX_TOKENS,
        alt((space_token, char_token)),
        Vec::<Token, MAX_TOKENS>::new,
        |mut acc, token| {
            // The fold bound equals the vector capacity, so push cannot fail.
            let _ = acc.push(token);
            acc
        },
    )(i)
}

impl FromStr for Report {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s == "null" {
            return Ok(Report::ReleaseAll);
        }

        let (s, tokens) = tokens(s).map_err(|_| Error::ParseError)?;

        // Unparsed input at end of string is an error.
        if !s.is_empty() {
            return Err(Error::ParseError);
        }

        Ok(Report::Buttons(tokens))
    }
}

/// Assembles raw serial bytes into decoded lines.
///
/// Bytes are decoded one byte per character. An overlong line errors once,
/// then the reader discards input until the next newline.
pub struct LineReader {
    buf: Vec<u8, MAX_LINE_LENGTH>,
    discarding: bool,
}

impl LineReader {
    pub const fn new() -> Self {
        Self {
            buf: Vec::new(),
            discarding: false,
        }
    }

    pub fn handle_byte(&mut self, byte: u8) -> Result<Option<String<MAX_DECODED_LENGTH>>, Error> {
        if byte == b'\n' {
            if self.discarding {
                self.discarding = false;
                return Ok(None);
            }
            let line = Self::decode(&self.buf);
            self.buf.clear();
            return Ok(Some(line));
        }

        if self.discarding {
            return Ok(None);
        }

        if self.buf.push(byte).is_err() {
            self.discarding = true;
            self.buf.clear();
            return Err(Error::LineTooLong);
        }

        Ok(None)
    }

    fn decode(buf: &[u8]) -> String<MAX_DECODED_LENGTH> {
        let mut line = String::new();
        for &byte in buf {
            // Cannot overflow: MAX_DECODED_LENGTH covers two UTF-8 bytes for
            // every buffered byte.
            let _ = line.push(byte as char);
        }
        line
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chars(s: &str) -> Report {
        Report::Buttons(s.chars().map(Token::Char).collect())
    }

    #[test]
    fn null_line_parses() {
        assert_eq!("null".parse::<Report>(), Ok(Report::ReleaseAll));
    }

    #[test]
    fn null_line_is_trimmed() {
        assert_eq!("  null \r".parse::<Report>(), Ok(Report::ReleaseAll));
    }

    #[test]
    fn null_embedded_in_other_text_is_not_release_all() {
        assert_eq!("anull".parse::<Report>(), Ok(chars("anull")));
    }

    #[test]
    fn plain_buttons_parse() {
        assert_eq!("aw".parse::<Report>(), Ok(chars("aw")));
    }

    #[test]
    fn empty_line_parses_to_no_buttons() {
        assert_eq!("".parse::<Report>(), Ok(chars("")));
    }

    #[test]
    fn space_word_parses_as_single_token() {
        assert_eq!(
            "space".parse::<Report>(),
            Ok(Report::Buttons([Token::Space].iter().cloned().collect()))
        );
    }

    #[test]
    fn space_word_mixes_with_characters() {
        assert_eq!(
            "aspacew".parse::<Report>(),
            Ok(Report::Buttons(
                [Token::Char('a'), Token::Space, Token::Char('w')]
                    .iter()
                    .cloned()
                    .collect()
            ))
        );
    }

    #[test]
    fn partial_space_word_parses_as_characters() {
        assert_eq!("spac".parse::<Report>(), Ok(chars("spac")));
    }

    #[test]
    fn overlong_input_fails() {
        let bytes = [b'a'; MAX_TOKENS + 1];
        let line = core::str::from_utf8(&bytes).unwrap();
        assert_eq!(line.parse::<Report>(), Err(Error::ParseError));
    }

    #[test]
    fn line_reader_yields_completed_lines() {
        let mut reader = LineReader::new();
        let mut lines = heapless::Vec::<_, 4>::new();
        for &byte in b"aw\nnull\n" {
            if let Some(line) = reader.handle_byte(byte).unwrap() {
                lines.push(line).unwrap();
            }
        }
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0].as_str(), "aw");
        assert_eq!(lines[1].as_str(), "null");
    }

    #[test]
    fn line_reader_decodes_one_byte_per_character() {
        let mut reader = LineReader::new();
        assert_eq!(reader.handle_byte(0xe9), Ok(None));
        let line = reader.handle_byte(b'\n').unwrap().unwrap();
        assert_eq!(line.as_str(), "\u{e9}");
    }

    #[test]
    fn line_reader_discards_overlong_lines_and_resynchronizes() {
        let mut reader = LineReader::new();
        let mut errors = 0;
        for _ in 0..MAX_LINE_LENGTH + 8 {
            if reader.handle_byte(b'a').is_err() {
                errors += 1;
            }
        }
        assert_eq!(errors, 1);

        // The newline ending the oversized line yields nothing.
        assert_eq!(reader.handle_byte(b'\n'), Ok(None));

        // The next line comes through intact.
        assert_eq!(reader.handle_byte(b'w'), Ok(None));
        let line = reader.handle_byte(b'\n').unwrap().unwrap();
        assert_eq!(line.as_str(), "w");
    }
}
