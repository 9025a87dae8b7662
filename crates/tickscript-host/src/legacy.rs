//! Argument binding for calls supplied as raw text
//!
//! Text commands pass arguments as a single string. It is run through the
//! tokenizer's flat pass and each token becomes one argument; anything that
//! would need real evaluation (operators, calls, grouping) is refused.

use tickscript_api::{LazyValue, Token, TokenKind, Value};

use crate::error::ScriptError;

/// A unary minus waiting for the literal it applies to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Sign {
    None,
    Pending,
}

impl Sign {
    fn prefix(self) -> &'static str {
        match self {
            Sign::None => "",
            Sign::Pending => "-",
        }
    }
}

/// Turn coordinates and a token stream into argument bindings
///
/// `lookup` resolves a variable token to an existing global binding. Tokens
/// that do not resolve are passed as plain strings.
pub(crate) fn bind_arguments(
    coords: &[i32],
    tokens: &[Token],
    lookup: impl Fn(&str) -> Option<LazyValue>,
) -> Result<Vec<LazyValue>, ScriptError> {
    let mut argv: Vec<LazyValue> = coords
        .iter()
        .map(|&c| LazyValue::of(Value::from(c)))
        .collect();
    let mut sign = Sign::None;

    for token in tokens {
        match token.kind {
            TokenKind::Variable | TokenKind::StringParam => {
                if token.kind == TokenKind::Variable {
                    if let Some(binding) = lookup(&token.surface) {
                        argv.push(binding);
                        continue;
                    }
                }
                argv.push(LazyValue::of(Value::string(token.surface.clone())));
                sign = Sign::None;
            }
            TokenKind::Literal => {
                let text = format!("{}{}", sign.prefix(), token.surface);
                let number = text.parse::<f64>().map_err(|_| not_a_number(&text))?;
                argv.push(LazyValue::of(Value::Number(number)));
                sign = Sign::None;
            }
            TokenKind::HexLiteral => {
                let number = parse_hex(&token.surface)
                    .ok_or_else(|| not_a_number(&format!("{}{}", sign.prefix(), token.surface)))?;
                let number = match sign {
                    Sign::Pending => -number,
                    Sign::None => number,
                };
                argv.push(LazyValue::of(Value::Number(number)));
                sign = Sign::None;
            }
            TokenKind::Operator | TokenKind::UnaryOperator => {
                let is_minus = token.surface == "-" || token.surface == "-u";
                if is_minus && sign == Sign::None {
                    sign = Sign::Pending;
                } else {
                    return Err(ScriptError::Invocation(format!(
                        "Fail: operators, like {} are not allowed in invoke",
                        token.surface
                    )));
                }
            }
            TokenKind::Function => {
                return Err(ScriptError::Invocation(format!(
                    "Fail: passing functions like {}() to invoke is not allowed",
                    token.surface
                )));
            }
            TokenKind::OpenParen | TokenKind::Comma | TokenKind::CloseParen | TokenKind::Marker => {
                return Err(ScriptError::Invocation(format!(
                    "Fail: {} is not allowed in invoke",
                    token.surface
                )));
            }
        }
    }
    Ok(argv)
}

fn not_a_number(text: &str) -> ScriptError {
    ScriptError::Invocation(format!(
        "Fail: {} seems like a number but it is not a number. Use quotes to ensure its a string",
        text
    ))
}

/// Parse `0x`-prefixed hex of any length
fn parse_hex(surface: &str) -> Option<f64> {
    let digits = surface
        .strip_prefix("0x")
        .or_else(|| surface.strip_prefix("0X"))?;
    if digits.is_empty() {
        return None;
    }
    digits
        .chars()
        .try_fold(0f64, |acc, c| c.to_digit(16).map(|d| acc * 16.0 + d as f64))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tok(kind: TokenKind, surface: &str) -> Token {
        Token::new(kind, surface)
    }

    fn values(argv: &[LazyValue]) -> Vec<Value> {
        argv.iter().map(LazyValue::eval).collect()
    }

    fn no_globals(_: &str) -> Option<LazyValue> {
        None
    }

    #[test]
    fn test_negative_literal() {
        let tokens = [tok(TokenKind::Operator, "-"), tok(TokenKind::Literal, "5")];
        let argv = bind_arguments(&[], &tokens, no_globals).unwrap();
        assert_eq!(values(&argv), vec![Value::Number(-5.0)]);
    }

    #[test]
    fn test_negative_hex_literal() {
        let tokens = [tok(TokenKind::UnaryOperator, "-u"), tok(TokenKind::HexLiteral, "0x1F")];
        let argv = bind_arguments(&[], &tokens, no_globals).unwrap();
        assert_eq!(values(&argv), vec![Value::Number(-31.0)]);
    }

    #[test]
    fn test_long_hex_literal() {
        assert_eq!(parse_hex("0x10000000000000000"), Some(18446744073709551616.0));
        assert_eq!(parse_hex("0x"), None);
        assert_eq!(parse_hex("0xZZ"), None);
    }

    #[test]
    fn test_unresolved_variable_is_string() {
        let tokens = [tok(TokenKind::Variable, "hello")];
        let argv = bind_arguments(&[], &tokens, no_globals).unwrap();
        assert_eq!(values(&argv), vec![Value::string("hello")]);
    }

    #[test]
    fn test_resolved_variable_is_substituted() {
        let tokens = [tok(TokenKind::Variable, "global_x"), tok(TokenKind::StringParam, "s")];
        let argv = bind_arguments(&[], &tokens, |name| {
            (name == "global_x").then(|| LazyValue::of(Value::Number(7.0)))
        })
        .unwrap();
        assert_eq!(values(&argv), vec![Value::Number(7.0), Value::string("s")]);
    }

    #[test]
    fn test_coordinates_come_first() {
        let tokens = [tok(TokenKind::Literal, "2.5")];
        let argv = bind_arguments(&[1, -2, 3], &tokens, no_globals).unwrap();
        assert_eq!(
            values(&argv),
            vec![
                Value::Number(1.0),
                Value::Number(-2.0),
                Value::Number(3.0),
                Value::Number(2.5)
            ]
        );
    }

    #[test]
    fn test_string_clears_pending_sign() {
        let tokens = [
            tok(TokenKind::Operator, "-"),
            tok(TokenKind::StringParam, "x"),
            tok(TokenKind::Literal, "4"),
        ];
        let argv = bind_arguments(&[], &tokens, no_globals).unwrap();
        assert_eq!(values(&argv), vec![Value::string("x"), Value::Number(4.0)]);
    }

    #[test]
    fn test_rejected_tokens() {
        let cases = [
            (vec![tok(TokenKind::Operator, "+")], "operators, like + are not allowed"),
            (
                vec![tok(TokenKind::Operator, "-"), tok(TokenKind::Operator, "-")],
                "operators, like - are not allowed",
            ),
            (vec![tok(TokenKind::Function, "print")], "passing functions like print()"),
            (vec![tok(TokenKind::Comma, ",")], ", is not allowed in invoke"),
            (vec![tok(TokenKind::OpenParen, "(")], "( is not allowed in invoke"),
        ];
        for (tokens, expected) in cases {
            let err = bind_arguments(&[], &tokens, no_globals).unwrap_err();
            assert!(
                err.to_string().contains(expected),
                "{} should contain {}",
                err,
                expected
            );
        }
    }

    #[test]
    fn test_malformed_literal() {
        let tokens = [tok(TokenKind::Operator, "-"), tok(TokenKind::Literal, "1.2.3")];
        let err = bind_arguments(&[], &tokens, no_globals).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Fail: -1.2.3 seems like a number but it is not a number. Use quotes to ensure its a string"
        );
    }
}
