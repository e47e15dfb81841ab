//! Parser implementation using lalrpop

use crate::ast::{BinOp, Expr, FileId, Program, Span, Spanned};
use crate::error::{CompileError, Result};
use crate::lexer::Token;


lalrpop_util::lalrpop_mod!(
    #[allow(clippy::all)]
    grammar
);

/// Parse the tokens of a lone file into AST. Spans carry file 0.
pub fn parse(tokens: Vec<(Token, Span)>) -> Result<Program> {
    parse_in_file(0, tokens)
}

/// Parse tokens of one file of a multi-file project. Spans carry `file`.
pub fn parse_in_file(file: FileId, tokens: Vec<(Token, Span)>) -> Result<Program> {
    let token_iter = tokens
        .into_iter()
        .map(|(tok, span)| (span.start, tok, span.end));

    grammar::ProgramParser::new()
        .parse(file, token_iter)
        .map_err(|e| {
            let span = match &e {
                lalrpop_util::ParseError::InvalidToken { location } => Span::new(*location, *location + 1),
                lalrpop_util::ParseError::UnrecognizedEof { location, .. } => {
                    Span::new(*location, *location + 1)
                }
                lalrpop_util::ParseError::UnrecognizedToken { token, .. } => {
                    Span::new(token.0, token.2)
                }
                lalrpop_util::ParseError::ExtraToken { token } => Span::new(token.0, token.2),
                lalrpop_util::ParseError::User { .. } => Span::new(0, 1),
            };
            CompileError::parser(format!("{e}"), span.with_file(file))
        })
}

/// Build a binary expression node spanning `l..r`
pub(crate) fn binary(
    file: FileId,
    l: usize,
    r: usize,
    left: Spanned<Expr>,
    op: BinOp,
    right: Spanned<Expr>,
) -> Spanned<Expr> {
    Spanned::new(
        Expr::Binary {
            left: Box::new(left),
            op,
            right: Box::new(right),
        },
        Span::in_file(file, l, r),
    )
}
