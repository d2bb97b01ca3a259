//! Token stream adapter.
//!
//! A thin, single-pass cursor over a flat token list: `peek`, `peek_at`,
//! `use_`, `use_expect`, `use_if`, with a one-token `rewind`.

use crate::error::CompileError;
use crate::token::{Token, TokenKind};

pub struct TokenQueue {
    tokens: Vec<Token>,
    pos: usize,
}

impl TokenQueue {
    pub fn new(tokens: Vec<Token>) -> Self {
        TokenQueue { tokens, pos: 0 }
    }

    fn eof_token(&self) -> Token {
        let line = self.tokens.last().map(|t| t.line).unwrap_or(1);
        Token::eof(line)
    }

    /// Current token without consuming it.
    pub fn peek(&self) -> Token {
        self.tokens.get(self.pos).cloned().unwrap_or_else(|| self.eof_token())
    }

    /// Token `k` positions ahead of the current one, without consuming.
    pub fn peek_at(&self, k: usize) -> Token {
        self.tokens
            .get(self.pos + k)
            .cloned()
            .unwrap_or_else(|| self.eof_token())
    }

    /// Consume and return the current token.
    pub fn use_(&mut self) -> Token {
        let tok = self.peek();
        if self.pos < self.tokens.len() {
            self.pos += 1;
        }
        tok
    }

    /// Consume the current token, failing with a line-numbered syntax error
    /// if it is not of the expected kind.
    pub fn use_expect(&mut self, kind: TokenKind) -> Result<Token, CompileError> {
        let tok = self.peek();
        if tok.kind != kind {
            return Err(CompileError::syntax(
                tok.line,
                format!("expected {:?}, found '{}'", kind, tok.lexeme),
            ));
        }
        Ok(self.use_())
    }

    /// Consume and return the current token's kind if it matches one of
    /// `kinds`; otherwise leave the queue untouched and return `None`.
    pub fn use_if(&mut self, kinds: &[TokenKind]) -> Option<TokenKind> {
        let kind = self.peek().kind;
        if kinds.contains(&kind) {
            self.use_();
            Some(kind)
        } else {
            None
        }
    }

    /// Rewind the cursor by a single token.
    pub fn rewind(&mut self) {
        assert!(self.pos > 0, "rewind past start of token queue");
        self.pos -= 1;
    }

    pub fn is_at_end(&self) -> bool {
        self.peek().kind == TokenKind::Eof
    }

    pub fn current_line(&self) -> usize {
        self.peek().line
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::token::tokenize;

    fn queue(src: &str) -> TokenQueue {
        TokenQueue::new(tokenize(src).unwrap())
    }

    #[test]
    fn peek_does_not_consume() {
        let q = queue("int a;");
        assert_eq!(q.peek().kind, TokenKind::Int);
        assert_eq!(q.peek().kind, TokenKind::Int);
    }

    #[test]
    fn use_advances_one_token_at_a_time() {
        let mut q = queue("int a;");
        assert_eq!(q.use_().kind, TokenKind::Int);
        assert_eq!(q.use_().kind, TokenKind::Identifier);
        assert_eq!(q.use_().kind, TokenKind::Semicolon);
        assert!(q.is_at_end());
    }

    #[test]
    fn use_expect_errors_on_mismatch() {
        let mut q = queue("int a;");
        assert!(q.use_expect(TokenKind::Double).is_err());
    }

    #[test]
    fn use_if_only_consumes_on_match() {
        let mut q = queue("+ -");
        assert_eq!(q.use_if(&[TokenKind::Minus]), None);
        assert_eq!(q.use_if(&[TokenKind::Plus]), Some(TokenKind::Plus));
        assert_eq!(q.use_().kind, TokenKind::Minus);
    }

    #[test]
    fn rewind_restores_previous_token() {
        let mut q = queue("int double");
        q.use_();
        q.rewind();
        assert_eq!(q.peek().kind, TokenKind::Int);
    }

    #[test]
    fn past_end_returns_eof_sentinel() {
        let mut q = queue("int");
        q.use_();
        assert_eq!(q.peek().kind, TokenKind::Eof);
        assert_eq!(q.peek().lexeme, "_EOF_");
    }
}
