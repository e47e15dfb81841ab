//! Lexer implementation using logos

mod token;

pub use token::{LexError, Token};

use crate::ast::Span;
use crate::error::{CompileError, Result};
use logos::Logos;

/// Tokenize source code
pub fn tokenize(source: &str) -> Result<Vec<(Token, Span)>> {
    let mut tokens = Vec::new();
    let mut lexer = Token::lexer(source);

    while let Some(result) = lexer.next() {
        let span = Span::new(lexer.span().start, lexer.span().end);
        match result {
            Ok(token) => tokens.push((token, span)),
            Err(LexError::IntegerOutOfRange) => {
                return Err(CompileError::lexer(
                    format!("integer literal out of range: {}", lexer.slice()),
                    span,
                ));
            }
            Err(LexError::UnexpectedCharacter) => {
                return Err(CompileError::lexer(
                    format!("unexpected character: {:?}", lexer.slice()),
                    span,
                ));
            }
        }
    }

    Ok(tokens)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(source: &str) -> Vec<Token> {
        tokenize(source).unwrap().into_iter().map(|(t, _)| t).collect()
    }

    #[test]
    fn test_tokenize_empty() {
        assert!(tokenize("").unwrap().is_empty());
        assert!(tokenize("  \t\n\r\n ").unwrap().is_empty());
    }

    #[test]
    fn test_tokenize_declaration_keywords() {
        assert_eq!(
            kinds("module sealed open abstract class object override fn"),
            vec![
                Token::Module, Token::Sealed, Token::Open, Token::Abstract,
                Token::Class, Token::Object, Token::Override, Token::Fn,
            ]
        );
    }

    #[test]
    fn test_tokenize_expression_keywords() {
        assert_eq!(
            kinds("let if else when is true false and or not self"),
            vec![
                Token::Let, Token::If, Token::Else, Token::When, Token::Is,
                Token::True, Token::False, Token::And, Token::Or, Token::Not,
                Token::SelfKw,
            ]
        );
    }

    #[test]
    fn test_keyword_prefix_is_identifier() {
        let tokens = kinds("classy iso whenever");
        assert_eq!(
            tokens,
            vec![
                Token::Ident("classy".to_string()),
                Token::Ident("iso".to_string()),
                Token::Ident("whenever".to_string()),
            ]
        );
    }

    #[test]
    fn test_tokenize_class_header() {
        assert_eq!(
            kinds("class Cat(name: String) : Mammal(name)"),
            vec![
                Token::Class,
                Token::Ident("Cat".to_string()),
                Token::LParen,
                Token::Ident("name".to_string()),
                Token::Colon,
                Token::Ident("String".to_string()),
                Token::RParen,
                Token::Colon,
                Token::Ident("Mammal".to_string()),
                Token::LParen,
                Token::Ident("name".to_string()),
                Token::RParen,
            ]
        );
    }

    #[test]
    fn test_tokenize_arms() {
        assert_eq!(
            kinds("is Cat | is Dog => \"x\","),
            vec![
                Token::Is,
                Token::Ident("Cat".to_string()),
                Token::Pipe,
                Token::Is,
                Token::Ident("Dog".to_string()),
                Token::FatArrow,
                Token::StringLit("x".to_string()),
                Token::Comma,
            ]
        );
    }

    #[test]
    fn test_tokenize_operators() {
        assert_eq!(
            kinds("+ - * / % == != < > <= >= = -> =>"),
            vec![
                Token::Plus, Token::Minus, Token::Star, Token::Slash, Token::Percent,
                Token::EqEq, Token::NotEq, Token::Lt, Token::Gt, Token::LtEq, Token::GtEq,
                Token::Eq, Token::Arrow, Token::FatArrow,
            ]
        );
    }

    #[test]
    fn test_tokenize_integer_literal() {
        let tokens = tokenize("42").unwrap();
        assert!(matches!(&tokens[0].0, Token::IntLit(42)));
    }

    #[test]
    fn test_tokenize_integer_overflow_is_error() {
        assert!(tokenize("99999999999999999999").is_err());
    }

    #[test]
    fn test_tokenize_negative_integer_as_minus_then_int() {
        assert_eq!(kinds("-42"), vec![Token::Minus, Token::IntLit(42)]);
    }

    #[test]
    fn test_tokenize_string_with_escapes() {
        let tokens = tokenize(r#""\n\t\r\\\"\0""#).unwrap();
        assert_eq!(tokens[0].0, Token::StringLit("\n\t\r\\\"\0".to_string()));
    }

    #[test]
    fn test_tokenize_string_unknown_escape_kept() {
        let tokens = tokenize(r#""a\qb""#).unwrap();
        assert_eq!(tokens[0].0, Token::StringLit("a\\qb".to_string()));
    }

    #[test]
    fn test_tokenize_spans() {
        let tokens = tokenize("fn main").unwrap();
        assert_eq!(tokens[0].1, Span::new(0, 2));
        assert_eq!(tokens[1].1, Span::new(3, 7));
    }

    #[test]
    fn test_tokenize_skips_comments() {
        let tokens = kinds("fn // the rest is ignored\nmain");
        assert_eq!(tokens, vec![Token::Fn, Token::Ident("main".to_string())]);
    }

    #[test]
    fn test_tokenize_unexpected_character_error() {
        let err = tokenize("class A $").unwrap_err();
        assert!(err.message().contains("unexpected character"));
        assert_eq!(err.span(), Some(Span::new(8, 9)));
    }

    #[test]
    fn test_integer_literal_out_of_range_error() {
        let err = tokenize("fn f() -> Int = 99999999999999999999;").unwrap_err();
        assert!(err.message().contains("integer literal out of range: 99999999999999999999"));
        assert_eq!(err.span(), Some(Span::new(16, 36)));

        let tokens = tokenize("9223372036854775807").unwrap();
        assert_eq!(tokens[0].0, Token::IntLit(i64::MAX));
    }

    #[test]
    fn test_token_display_matches_source() {
        for source in ["sealed", "=>", "{", "}", "Mammal"] {
            let tokens = tokenize(source).unwrap();
            assert_eq!(tokens[0].0.to_string(), source);
        }
    }
}
