use itertools::Itertools;

use crate::grammar::{Color, NamedColor, Operation};

#[derive(PartialEq, Debug)]
pub enum Token {
    Word(String),
    // Unsigned integer text, the only form RGB channels accept
    Integer(u64),
    Number(f64),
    Hex(String)
}

pub fn lex_token(text: &str) -> Token {
    if text.starts_with('#') {
        return Token::Hex(text.to_string());
    }

    if let Ok(n) = text.parse::<u64>() {
        return Token::Integer(n);
    }

    // Infinities and NaN are words, never usable as parameters
    match text.parse::<f64>() {
        Ok(n) if n.is_finite() => Token::Number(n),
        _ => Token::Word(text.to_string())
    }
}

pub fn lex_operation(text: &str) -> Vec<Token> {
    text.split_whitespace().map(lex_token).collect_vec()
}

fn number(token: &Token) -> Option<f64> {
    match token {
        Token::Integer(n) => Some(*n as f64),
        Token::Number(n) => Some(*n),
        _ => None
    }
}

fn rgb_channel(token: &Token) -> Option<u8> {
    match token {
        Token::Integer(n) => u8::try_from(*n).ok(),
        _ => None
    }
}

fn parse_color(tokens: &[Token]) -> Option<Color> {
    match tokens {
        [Token::Word(name)] => name.parse::<NamedColor>().ok().map(Color::Named),
        [Token::Hex(hex)] if Color::is_hex(hex) => Some(Color::Hex(hex.clone())),
        [_, _, _] => {
            let (r, g, b) = tokens.iter().map(rgb_channel).collect::<Option<Vec<_>>>()?
                .into_iter()
                .collect_tuple()?;
            Some(Color::Rgb(r, g, b))
        }
        _ => None
    }
}

// Parses `<opcode> [parameter]`, returning None for anything unsupported
pub fn parse_operation(tokens: &[Token]) -> Option<Operation> {
    let (opcode, parameters) = match tokens.split_first() {
        Some((Token::Word(opcode), parameters)) => (opcode.as_str(), parameters),
        _ => return None
    };

    match (opcode, parameters) {
        ("nop", []) => Some(Operation::Nop),
        ("push", []) => Some(Operation::Push),
        ("pop", []) => Some(Operation::Pop),
        ("draw", [n]) => number(n).map(Operation::Draw),
        ("forward", [n]) => number(n).map(Operation::Move),
        ("angle", [n]) => number(n).map(Operation::Turn),
        ("color", parameters) => parse_color(parameters).map(Operation::SetColor),
        _ => None
    }
}
