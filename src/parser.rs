//! Recursive-descent grammar and semantic analysis.
//!
//! A single pass builds the typed AST, resolves names through the
//! [`SymbolTable`], and checks types and control-flow facts as each node
//! is constructed — there is no separate semantic-analysis phase.

use crate::ast::{BinOp, Expr, Function, LiteralValue, Program, Stmt, UnOp};
use crate::error::CompileError;
use crate::literal_strings::LiteralStringTable;
use crate::symbol_table::SymbolTable;
use crate::token::TokenKind;
use crate::token_queue::TokenQueue;
use crate::types::DataType;

pub struct Parser {
    tokens: TokenQueue,
    functions: Vec<Function>,
    symbols: SymbolTable,
    literals: LiteralStringTable,

    current_function_id: usize,
    current_return_type: DataType,
    current_locals: Vec<(DataType, usize)>,
    past_return_in_main_scope: bool,
    inside_if: bool,
    loop_stack: Vec<usize>,
    next_loop_id: usize,
}

impl Parser {
    pub fn new(source: &str) -> Result<Self, CompileError> {
        let tokens = crate::token::tokenize(source)?;
        Ok(Parser {
            tokens: TokenQueue::new(tokens),
            functions: Vec::new(),
            symbols: SymbolTable::new(0),
            literals: LiteralStringTable::new(),
            current_function_id: 0,
            current_return_type: DataType::Integer,
            current_locals: Vec::new(),
            past_return_in_main_scope: false,
            inside_if: false,
            loop_stack: Vec::new(),
            next_loop_id: 1,
        })
    }

    pub fn parse(mut self) -> Result<(Program, LiteralStringTable), CompileError> {
        while !self.tokens.is_at_end() {
            let function = self.parse_function()?;
            self.functions.push(function);
        }
        Ok((
            Program {
                functions: self.functions,
            },
            self.literals,
        ))
    }

    // ---------------------------------------------------------------
    // Functions
    // ---------------------------------------------------------------

    fn parse_function(&mut self) -> Result<Function, CompileError> {
        self.symbols = SymbolTable::new(self.symbols.next_uid());
        self.current_locals = Vec::new();
        self.past_return_in_main_scope = false;
        self.next_loop_id = 1;
        self.tokens.use_expect(TokenKind::Function)?;

        let name_tok = self.tokens.use_expect(TokenKind::Identifier)?;
        if self.functions.iter().any(|f| f.name == name_tok.lexeme) {
            return Err(CompileError::scope(
                name_tok.line,
                format!("function '{}' already defined", name_tok.lexeme),
            ));
        }

        self.tokens.use_expect(TokenKind::OpenParen)?;
        let params = self.parse_params()?;
        self.tokens.use_expect(TokenKind::CloseParen)?;
        self.tokens.use_expect(TokenKind::Colon)?;
        let return_type = self.parse_data_type()?;
        self.current_return_type = return_type;

        self.current_function_id = self.functions.len() + 1;

        self.tokens.use_expect(TokenKind::OpenBrace)?;
        let mut body = Vec::new();
        while self.tokens.peek().kind != TokenKind::CloseBrace {
            if let Some(stmt) = self.parse_statement()? {
                body.push(stmt);
            }
        }
        let close_line = self.tokens.current_line();
        self.tokens.use_expect(TokenKind::CloseBrace)?;

        if !stmts_always_return(&body) {
            return Err(CompileError::control_flow(
                close_line,
                format!("function '{}' does not have a guaranteed return", name_tok.lexeme),
            ));
        }

        Ok(Function {
            id: self.current_function_id,
            name: name_tok.lexeme,
            return_type,
            params,
            locals: std::mem::take(&mut self.current_locals),
            body,
        })
    }

    fn parse_params(&mut self) -> Result<Vec<(DataType, usize)>, CompileError> {
        let mut params = Vec::new();
        while self.tokens.peek().kind != TokenKind::CloseParen {
            let data_type = self.parse_data_type()?;
            let name_tok = self.tokens.use_expect(TokenKind::Identifier)?;
            let uid = self.symbols.init_var(&name_tok.lexeme, data_type, name_tok.line)?;
            params.push((data_type, uid));
            self.tokens.use_if(&[TokenKind::Comma]);
        }
        Ok(params)
    }

    fn parse_data_type(&mut self) -> Result<DataType, CompileError> {
        let tok = self.tokens.peek();
        let data_type = match tok.kind {
            TokenKind::Int => DataType::Integer,
            TokenKind::Double => DataType::Double,
            TokenKind::Char => DataType::Char,
            TokenKind::StringType => DataType::String,
            _ => {
                return Err(CompileError::syntax(
                    tok.line,
                    format!("expected a type (int, double, char, string), found '{}'", tok.lexeme),
                ))
            }
        };
        self.tokens.use_();
        Ok(data_type)
    }

    // ---------------------------------------------------------------
    // Statements
    // ---------------------------------------------------------------

    fn parse_statement(&mut self) -> Result<Option<Stmt>, CompileError> {
        let tok = self.tokens.peek();

        if self.past_return_in_main_scope {
            return Err(CompileError::control_flow(
                tok.line,
                "statement encountered after a top-level return",
            ));
        }

        match tok.kind {
            TokenKind::Return => self.parse_return(),
            TokenKind::If => Ok(Some(self.parse_if()?)),
            TokenKind::While => Ok(Some(self.parse_while()?)),
            TokenKind::Continue => self.parse_continue_break(true),
            TokenKind::Break => self.parse_continue_break(false),
            TokenKind::OpenBrace => Ok(Some(Stmt::Block(self.parse_block()?))),
            TokenKind::Int | TokenKind::Double | TokenKind::Char | TokenKind::StringType => {
                self.parse_var_decl()
            }
            TokenKind::Identifier => {
                if self.tokens.peek_at(1).kind == TokenKind::OpenParen {
                    let call = self.parse_function_call()?;
                    self.tokens.use_expect(TokenKind::Semicolon)?;
                    Ok(Some(Stmt::ExprStmt(call)))
                } else {
                    Ok(Some(self.parse_assignment()?))
                }
            }
            _ => Err(CompileError::syntax(
                tok.line,
                format!("unexpected token '{}' at the start of a statement", tok.lexeme),
            )),
        }
    }

    fn parse_block(&mut self) -> Result<Vec<Stmt>, CompileError> {
        self.symbols.push_scope();
        self.tokens.use_expect(TokenKind::OpenBrace)?;
        let mut stmts = Vec::new();
        while self.tokens.peek().kind != TokenKind::CloseBrace {
            if let Some(stmt) = self.parse_statement()? {
                stmts.push(stmt);
            }
        }
        self.tokens.use_expect(TokenKind::CloseBrace)?;
        self.symbols.pop_scope();
        Ok(stmts)
    }

    fn parse_return(&mut self) -> Result<Option<Stmt>, CompileError> {
        let return_line = self.tokens.use_().line;
        let value = self.parse_logical()?;
        self.tokens.use_expect(TokenKind::Semicolon)?;
        check_assignable(self.current_return_type, value.data_type(), return_line)?;

        if !self.symbols.inside_nested_scope() {
            self.past_return_in_main_scope = true;
        }

        Ok(Some(Stmt::Return {
            value,
            inside_if: self.inside_if,
        }))
    }

    fn parse_continue_break(&mut self, is_continue: bool) -> Result<Option<Stmt>, CompileError> {
        let tok = self.tokens.use_();
        self.tokens.use_expect(TokenKind::Semicolon)?;
        let loop_id = *self.loop_stack.last().ok_or_else(|| {
            CompileError::control_flow(
                tok.line,
                format!(
                    "'{}' statement outside of a loop",
                    if is_continue { "continue" } else { "break" }
                ),
            )
        })?;
        Ok(Some(if is_continue {
            Stmt::Continue { loop_id }
        } else {
            Stmt::Break { loop_id }
        }))
    }

    fn parse_while(&mut self) -> Result<Stmt, CompileError> {
        self.tokens.use_expect(TokenKind::While)?;
        self.tokens.use_expect(TokenKind::OpenParen)?;
        let condition = self.parse_logical()?;
        self.tokens.use_expect(TokenKind::CloseParen)?;

        let loop_id = self.next_loop_id;
        self.next_loop_id += 1;
        self.loop_stack.push(loop_id);

        let body = if self.tokens.peek().kind == TokenKind::OpenBrace {
            self.parse_block()?
        } else {
            self.symbols.push_scope();
            let stmt = self.parse_statement()?;
            self.symbols.pop_scope();
            stmt.into_iter().collect()
        };

        self.loop_stack.pop();

        Ok(Stmt::While {
            condition,
            body,
            loop_id,
        })
    }

    fn parse_if(&mut self) -> Result<Stmt, CompileError> {
        let was_inside_if = self.inside_if;
        self.inside_if = true;

        self.tokens.use_expect(TokenKind::If)?;
        self.tokens.use_expect(TokenKind::OpenParen)?;
        let condition = self.parse_logical()?;
        self.tokens.use_expect(TokenKind::CloseParen)?;

        let then_block = if self.tokens.peek().kind == TokenKind::OpenBrace {
            self.parse_block()?
        } else {
            self.symbols.push_scope();
            let stmt = self.parse_statement()?;
            self.symbols.pop_scope();
            stmt.into_iter().collect()
        };
        let then_returns = stmts_always_return(&then_block);

        let else_block = if self.tokens.peek().kind == TokenKind::Else {
            self.tokens.use_();
            let block = if self.tokens.peek().kind == TokenKind::OpenBrace {
                self.parse_block()?
            } else {
                self.symbols.push_scope();
                let stmt = self.parse_statement()?;
                self.symbols.pop_scope();
                stmt.into_iter().collect()
            };
            Some(block)
        } else {
            None
        };
        let else_returns = else_block.as_deref().is_some_and(stmts_always_return);

        self.inside_if = was_inside_if;

        Ok(Stmt::If {
            condition,
            then_block,
            else_block,
            then_returns,
            else_returns,
        })
    }

    fn parse_var_decl(&mut self) -> Result<Option<Stmt>, CompileError> {
        let data_type = self.parse_data_type()?;
        let name_tok = self.tokens.use_expect(TokenKind::Identifier)?;
        let uid = self.symbols.init_var(&name_tok.lexeme, data_type, name_tok.line)?;
        self.current_locals.push((data_type, uid));

        if self.tokens.peek().kind == TokenKind::Semicolon {
            self.tokens.use_();
            // Declaration without initialization: no code is emitted, the
            // local defaults to zero per WAT local semantics.
            return Ok(None);
        }

        self.tokens.use_expect(TokenKind::Assign)?;
        let value_line = self.tokens.current_line();
        let value = self.parse_logical()?;
        self.tokens.use_expect(TokenKind::Semicolon)?;
        check_assignable(data_type, value.data_type(), value_line)?;

        Ok(Some(Stmt::Assign { uid, value }))
    }

    fn parse_assignment(&mut self) -> Result<Stmt, CompileError> {
        let name_tok = self.tokens.use_expect(TokenKind::Identifier)?;
        let var = self.symbols.lookup(&name_tok.lexeme, name_tok.line)?;

        if self.tokens.peek().kind == TokenKind::OpenBracket {
            if var.data_type != DataType::String {
                return Err(CompileError::type_error(
                    name_tok.line,
                    format!("cannot index '{}': indexing requires a string", name_tok.lexeme),
                ));
            }
            self.tokens.use_();
            let index_line = self.tokens.current_line();
            let index = self.parse_expression()?;
            if index.data_type() != DataType::Integer {
                return Err(CompileError::type_error(
                    index_line,
                    "index expression must be of type int",
                ));
            }
            self.tokens.use_expect(TokenKind::CloseBracket)?;
            self.tokens.use_expect(TokenKind::Assign)?;
            let value_line = self.tokens.current_line();
            let value = self.parse_logical()?;
            self.tokens.use_expect(TokenKind::Semicolon)?;
            check_assignable(DataType::Char, value.data_type(), value_line)?;
            return Ok(Stmt::IndexAssign {
                base_uid: var.uid,
                index,
                value,
            });
        }

        self.tokens.use_expect(TokenKind::Assign)?;
        let value_line = self.tokens.current_line();
        let value = self.parse_logical()?;
        self.tokens.use_expect(TokenKind::Semicolon)?;
        check_assignable(var.data_type, value.data_type(), value_line)?;

        Ok(Stmt::Assign {
            uid: var.uid,
            value,
        })
    }

    // ---------------------------------------------------------------
    // Expressions, precedence low to high:
    // logical -> and -> comparison -> expression -> term -> factor -> primary
    // ---------------------------------------------------------------

    fn parse_logical(&mut self) -> Result<Expr, CompileError> {
        let mut node = self.parse_and()?;
        while self.tokens.peek().kind == TokenKind::Or {
            let line = self.tokens.use_().line;
            let rhs = self.parse_and()?;
            node = self.make_logical(BinOp::Or, node, rhs, line)?;
        }
        Ok(node)
    }

    fn parse_and(&mut self) -> Result<Expr, CompileError> {
        let mut node = self.parse_comparison()?;
        while self.tokens.peek().kind == TokenKind::And {
            let line = self.tokens.use_().line;
            let rhs = self.parse_comparison()?;
            node = self.make_logical(BinOp::And, node, rhs, line)?;
        }
        Ok(node)
    }

    fn make_logical(&self, op: BinOp, lhs: Expr, rhs: Expr, line: usize) -> Result<Expr, CompileError> {
        if lhs.data_type() == DataType::Double || rhs.data_type() == DataType::Double {
            return Err(CompileError::type_error(
                line,
                "logical operators cannot be applied to double",
            ));
        }
        Ok(Expr::Binary {
            op,
            lhs: Box::new(lhs),
            rhs: Box::new(rhs),
            data_type: DataType::Integer,
        })
    }

    /// Comparisons are deliberately non-associative: `a < b < c` is
    /// rejected after parsing a second relational operator at this level.
    fn parse_comparison(&mut self) -> Result<Expr, CompileError> {
        let mut node = self.parse_expression()?;
        let mut seen = 0u32;
        while let Some(kind) = self.tokens.use_if(&[
            TokenKind::Eq,
            TokenKind::NotEq,
            TokenKind::Greater,
            TokenKind::GreaterEq,
            TokenKind::Less,
            TokenKind::LessEq,
        ]) {
            let line = self.tokens.current_line();
            let rhs = self.parse_expression()?;
            seen += 1;
            if seen > 1 {
                return Err(CompileError::type_error(line, "comparisons are non-associative"));
            }
            let op = match kind {
                TokenKind::Eq => BinOp::Eq,
                TokenKind::NotEq => BinOp::NotEq,
                TokenKind::Greater => BinOp::Gt,
                TokenKind::GreaterEq => BinOp::Ge,
                TokenKind::Less => BinOp::Lt,
                TokenKind::LessEq => BinOp::Le,
                _ => unreachable!(),
            };
            let data_type = DataType::promote(node.data_type(), rhs.data_type());
            node = Expr::Binary {
                op,
                lhs: Box::new(node),
                rhs: Box::new(rhs),
                data_type,
            };
        }
        Ok(node)
    }

    fn parse_expression(&mut self) -> Result<Expr, CompileError> {
        let mut node = self.parse_term()?;
        while let Some(kind) = self.tokens.use_if(&[TokenKind::Plus, TokenKind::Minus]) {
            let line = self.tokens.current_line();
            let rhs = self.parse_term()?;
            node = self.make_additive(kind, node, rhs, line)?;
        }
        Ok(node)
    }

    fn make_additive(&self, kind: TokenKind, lhs: Expr, rhs: Expr, line: usize) -> Result<Expr, CompileError> {
        let lt = lhs.data_type();
        let rt = rhs.data_type();

        if kind == TokenKind::Plus {
            let both_composable = (lt == DataType::String || lt == DataType::Char)
                && (rt == DataType::String || rt == DataType::Char);
            if lt == DataType::String || rt == DataType::String {
                if !both_composable {
                    return Err(CompileError::type_error(
                        line,
                        "strings can only be composed with strings or chars",
                    ));
                }
                let data_type = if lt == DataType::Char && rt == DataType::Char {
                    DataType::Char
                } else {
                    DataType::String
                };
                return Ok(Expr::Binary {
                    op: BinOp::Add,
                    lhs: Box::new(lhs),
                    rhs: Box::new(rhs),
                    data_type,
                });
            }
        } else if lt == DataType::String || rt == DataType::String {
            return Err(CompileError::type_error(line, "strings cannot be used with '-'"));
        }

        if (lt == DataType::Char && rt == DataType::Double) || (lt == DataType::Double && rt == DataType::Char) {
            return Err(CompileError::type_error(
                line,
                "char can only be added or subtracted with char or int",
            ));
        }

        let data_type = if lt == DataType::Char && rt == DataType::Char {
            DataType::Char
        } else {
            DataType::promote(lt, rt)
        };
        let op = if kind == TokenKind::Plus { BinOp::Add } else { BinOp::Sub };
        Ok(Expr::Binary {
            op,
            lhs: Box::new(lhs),
            rhs: Box::new(rhs),
            data_type,
        })
    }

    fn parse_term(&mut self) -> Result<Expr, CompileError> {
        let mut node = self.parse_factor()?;
        while let Some(kind) = self.tokens.use_if(&[TokenKind::Star, TokenKind::Slash, TokenKind::Percent]) {
            let line = self.tokens.current_line();
            let rhs = self.parse_factor()?;
            node = self.make_multiplicative(kind, node, rhs, line)?;
        }
        Ok(node)
    }

    fn make_multiplicative(&self, kind: TokenKind, lhs: Expr, rhs: Expr, line: usize) -> Result<Expr, CompileError> {
        let lt = lhs.data_type();
        let rt = rhs.data_type();

        match kind {
            TokenKind::Percent => {
                if lt != DataType::Integer || rt != DataType::Integer {
                    return Err(CompileError::type_error(line, "modulus requires both operands to be int"));
                }
                Ok(Expr::Binary {
                    op: BinOp::Mod,
                    lhs: Box::new(lhs),
                    rhs: Box::new(rhs),
                    data_type: DataType::Integer,
                })
            }
            TokenKind::Star => {
                if (lt == DataType::Char && rt == DataType::Integer) || (lt == DataType::Integer && rt == DataType::Char)
                {
                    // Normalize to (count, char) regardless of source order so the
                    // generator can evaluate operands in a fixed sequence.
                    let (count, ch) = if lt == DataType::Integer { (lhs, rhs) } else { (rhs, lhs) };
                    return Ok(Expr::Binary {
                        op: BinOp::Repeat,
                        lhs: Box::new(count),
                        rhs: Box::new(ch),
                        data_type: DataType::String,
                    });
                }
                if lt == DataType::Char && rt == DataType::Char {
                    return Err(CompileError::type_error(line, "cannot multiply two chars"));
                }
                if (lt == DataType::Char && rt == DataType::Double) || (lt == DataType::Double && rt == DataType::Char) {
                    return Err(CompileError::type_error(line, "cannot multiply a char with a double"));
                }
                if lt == DataType::String || rt == DataType::String {
                    return Err(CompileError::type_error(line, "strings cannot be used with '*'"));
                }
                Ok(Expr::Binary {
                    op: BinOp::Mul,
                    lhs: Box::new(lhs),
                    rhs: Box::new(rhs),
                    data_type: DataType::promote(lt, rt),
                })
            }
            TokenKind::Slash => {
                if lt == DataType::Char || rt == DataType::Char {
                    return Err(CompileError::type_error(line, "division does not accept a char operand"));
                }
                if lt == DataType::String || rt == DataType::String {
                    return Err(CompileError::type_error(line, "division does not accept a string operand"));
                }
                Ok(Expr::Binary {
                    op: BinOp::Div,
                    lhs: Box::new(lhs),
                    rhs: Box::new(rhs),
                    data_type: DataType::promote(lt, rt),
                })
            }
            _ => unreachable!(),
        }
    }

    fn parse_factor(&mut self) -> Result<Expr, CompileError> {
        if self.tokens.peek().kind == TokenKind::Not {
            self.tokens.use_();
            let operand = self.parse_factor()?;
            return Ok(Expr::Unary {
                op: UnOp::Not,
                operand: Box::new(operand),
                data_type: DataType::Integer,
            });
        }
        self.parse_primary()
    }

    fn parse_primary(&mut self) -> Result<Expr, CompileError> {
        let tok = self.tokens.peek();

        if tok.kind == TokenKind::Minus {
            self.tokens.use_();
            let operand = self.parse_primary()?;
            let data_type = operand.data_type();
            return Ok(Expr::Unary {
                op: UnOp::Negate,
                operand: Box::new(operand),
                data_type,
            });
        }
        if tok.kind == TokenKind::Not {
            self.tokens.use_();
            let operand = self.parse_primary()?;
            return Ok(Expr::Unary {
                op: UnOp::Not,
                operand: Box::new(operand),
                data_type: DataType::Integer,
            });
        }
        if tok.kind == TokenKind::OpenParen {
            self.tokens.use_();
            let expr = self.parse_expression()?;
            self.tokens.use_expect(TokenKind::CloseParen)?;
            return self.parse_cast(expr);
        }
        if tok.kind == TokenKind::Size {
            self.tokens.use_();
            self.tokens.use_expect(TokenKind::OpenParen)?;
            let arg_line = self.tokens.current_line();
            let arg = self.parse_expression()?;
            if arg.data_type() != DataType::String {
                return Err(CompileError::type_error(arg_line, "size() can only be applied to a string"));
            }
            self.tokens.use_expect(TokenKind::CloseParen)?;
            return self.parse_cast(Expr::Call {
                callee: "get_length".to_string(),
                data_type: DataType::Integer,
                args: vec![arg],
            });
        }
        if tok.kind == TokenKind::Sqrt {
            self.tokens.use_();
            self.tokens.use_expect(TokenKind::OpenParen)?;
            let var_tok = self.tokens.use_expect(TokenKind::Identifier)?;
            let var = self.symbols.lookup(&var_tok.lexeme, var_tok.line)?;
            if !var.data_type.is_numeric() {
                return Err(CompileError::type_error(var_tok.line, "sqrt() requires a numeric variable"));
            }
            self.tokens.use_expect(TokenKind::CloseParen)?;
            let operand = Expr::Variable {
                uid: var.uid,
                data_type: var.data_type,
            };
            return self.parse_cast(Expr::Unary {
                op: UnOp::Sqrt,
                operand: Box::new(operand),
                data_type: DataType::Double,
            });
        }
        if tok.kind == TokenKind::Identifier {
            if self.tokens.peek_at(1).kind == TokenKind::OpenBracket {
                let expr = self.parse_index_expr()?;
                return self.parse_cast(expr);
            }
            if self.tokens.peek_at(1).kind == TokenKind::OpenParen {
                let call = self.parse_function_call()?;
                return self.parse_cast(call);
            }
            self.tokens.use_();
            let var = self.symbols.lookup(&tok.lexeme, tok.line)?;
            return self.parse_cast(Expr::Variable {
                uid: var.uid,
                data_type: var.data_type,
            });
        }
        if tok.kind == TokenKind::IntLiteral {
            self.tokens.use_();
            let value: i32 = tok.lexeme.parse().map_err(|_| {
                CompileError::syntax(tok.line, format!("invalid integer literal '{}'", tok.lexeme))
            })?;
            return Ok(Expr::Literal(LiteralValue::Int(value)));
        }
        if tok.kind == TokenKind::FloatLiteral {
            self.tokens.use_();
            let value: f64 = tok.lexeme.parse().map_err(|_| {
                CompileError::syntax(tok.line, format!("invalid double literal '{}'", tok.lexeme))
            })?;
            return Ok(Expr::Literal(LiteralValue::Double(value)));
        }
        if tok.kind == TokenKind::CharLiteral {
            self.tokens.use_();
            let ch = tok.lexeme.chars().next().unwrap_or('\0');
            return Ok(Expr::Literal(LiteralValue::Char(ch as i32)));
        }
        if tok.kind == TokenKind::StringLiteral {
            self.tokens.use_();
            let offset = self.literals.add(tok.lexeme.clone());
            return Ok(Expr::LiteralString {
                offset,
                length: tok.lexeme.len(),
            });
        }

        Err(CompileError::syntax(tok.line, format!("unexpected token '{}'", tok.lexeme)))
    }

    fn parse_index_expr(&mut self) -> Result<Expr, CompileError> {
        let name_tok = self.tokens.use_expect(TokenKind::Identifier)?;
        let var = self.symbols.lookup(&name_tok.lexeme, name_tok.line)?;
        if var.data_type != DataType::String {
            return Err(CompileError::type_error(
                name_tok.line,
                "indexing is only supported on strings",
            ));
        }
        self.tokens.use_expect(TokenKind::OpenBracket)?;
        let index_line = self.tokens.current_line();
        let index = self.parse_expression()?;
        if index.data_type() != DataType::Integer {
            return Err(CompileError::type_error(index_line, "index expression must be of type int"));
        }
        self.tokens.use_expect(TokenKind::CloseBracket)?;
        Ok(Expr::Index {
            base_uid: var.uid,
            index: Box::new(index),
        })
    }

    fn parse_function_call(&mut self) -> Result<Expr, CompileError> {
        let name_tok = self.tokens.use_expect(TokenKind::Identifier)?;
        let callee = self
            .functions
            .iter()
            .find(|f| f.name == name_tok.lexeme)
            .cloned()
            .ok_or_else(|| {
                CompileError::scope(
                    name_tok.line,
                    format!("function '{}' is not defined (forward declarations are unsupported)", name_tok.lexeme),
                )
            })?;

        self.tokens.use_expect(TokenKind::OpenParen)?;
        let mut args = Vec::new();
        while self.tokens.peek().kind != TokenKind::CloseParen {
            args.push(self.parse_expression()?);
            self.tokens.use_if(&[TokenKind::Comma]);
        }
        self.tokens.use_expect(TokenKind::CloseParen)?;

        if args.len() != callee.params.len() {
            return Err(CompileError::type_error(
                name_tok.line,
                format!(
                    "function '{}' expects {} argument(s), found {}",
                    callee.name,
                    callee.params.len(),
                    args.len()
                ),
            ));
        }
        for (arg, (param_type, _)) in args.iter().zip(callee.params.iter()) {
            if *param_type < arg.data_type() {
                return Err(CompileError::type_error(
                    name_tok.line,
                    format!(
                        "argument type mismatch in call to '{}': expected {}, found {}",
                        callee.name,
                        param_type,
                        arg.data_type()
                    ),
                ));
            }
        }

        Ok(Expr::Call {
            callee: callee.name.clone(),
            data_type: callee.return_type,
            args,
        })
    }

    /// Handle an optional trailing `: type` explicit cast.
    fn parse_cast(&mut self, node: Expr) -> Result<Expr, CompileError> {
        if self.tokens.peek().kind != TokenKind::Colon {
            return Ok(node);
        }
        self.tokens.use_();
        let target = self.parse_data_type()?;
        Ok(Expr::Unary {
            op: UnOp::Cast,
            operand: Box::new(node),
            data_type: target,
        })
    }
}

/// Whether this statement list is guaranteed to return on every control
/// flow path: a classical "every path returns" predicate rather than a
/// returns-counter heuristic.
fn stmts_always_return(stmts: &[Stmt]) -> bool {
    stmts.iter().any(stmt_always_returns)
}

fn stmt_always_returns(stmt: &Stmt) -> bool {
    match stmt {
        Stmt::Return { .. } => true,
        Stmt::Block(inner) => stmts_always_return(inner),
        Stmt::If {
            then_returns,
            else_returns,
            else_block: Some(_),
            ..
        } => *then_returns && *else_returns,
        _ => false,
    }
}

fn check_assignable(declared: DataType, value: DataType, line: usize) -> Result<(), CompileError> {
    if declared < value {
        return Err(CompileError::type_error(
            line,
            format!("cannot assign a {value} value to a {declared} target"),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn try_parse(src: &str) -> Result<Program, CompileError> {
        Ok(Parser::new(src)?.parse()?.0)
    }

    fn parse_ok(src: &str) -> Program {
        try_parse(src).unwrap_or_else(|e| panic!("expected '{src}' to parse, got {e:?}"))
    }

    fn parse_err(src: &str) -> CompileError {
        try_parse(src).unwrap_err()
    }

    /// The return expression of a program's sole function.
    fn return_expr(program: &Program) -> &Expr {
        match program.functions[0].body.last().unwrap() {
            Stmt::Return { value, .. } => value,
            other => panic!("expected a Return statement, got {other:?}"),
        }
    }

    // -----------------------------------------------------------------
    // Per-operator type-check table
    // -----------------------------------------------------------------

    #[test]
    fn modulus_requires_both_operands_int() {
        let program = parse_ok("function f(): int { return 7 % 2; }");
        assert!(matches!(return_expr(&program), Expr::Binary { op: BinOp::Mod, .. }));

        let err = parse_err("function f(): int { return 7.0 % 2; }");
        assert!(matches!(err, CompileError::Type { .. }));
    }

    #[test]
    fn star_char_times_int_normalizes_to_repeat_regardless_of_order() {
        let forward = parse_ok("function f(): string { char c = 'x'; int n = 3; return n * c; }");
        let backward = parse_ok("function f(): string { char c = 'x'; int n = 3; return c * n; }");
        for program in [&forward, &backward] {
            match return_expr(program) {
                Expr::Binary { op: BinOp::Repeat, lhs, rhs, .. } => {
                    assert_eq!(lhs.data_type(), DataType::Integer);
                    assert_eq!(rhs.data_type(), DataType::Char);
                }
                other => panic!("expected a Repeat binary, got {other:?}"),
            }
        }
    }

    #[test]
    fn star_rejects_char_times_char() {
        let err = parse_err("function f(): string { char a = 'x'; char b = 'y'; return a * b; }");
        assert!(matches!(err, CompileError::Type { .. }));
    }

    #[test]
    fn star_rejects_char_times_double() {
        let err = parse_err("function f(): double { char a = 'x'; double d = 1.0; return a * d; }");
        assert!(matches!(err, CompileError::Type { .. }));
    }

    #[test]
    fn star_rejects_string_operand() {
        let err = parse_err(r#"function f(): string { string s = "hi"; return s * s; }"#);
        assert!(matches!(err, CompileError::Type { .. }));
    }

    #[test]
    fn slash_rejects_char_operand() {
        let err = parse_err("function f(): int { char a = 'x'; int n = 2; return n / a; }");
        assert!(matches!(err, CompileError::Type { .. }));
    }

    #[test]
    fn slash_rejects_string_operand() {
        let err = parse_err(r#"function f(): string { string s = "hi"; return s / s; }"#);
        assert!(matches!(err, CompileError::Type { .. }));
    }

    #[test]
    fn plus_rejects_mixed_char_and_double() {
        let err = parse_err("function f(): double { char a = 'x'; double d = 1.0; return a + d; }");
        assert!(matches!(err, CompileError::Type { .. }));
    }

    #[test]
    fn plus_char_plus_char_stays_char_typed() {
        let program = parse_ok("function f(): char { char a = 'x'; char b = 'y'; return a + b; }");
        match return_expr(&program) {
            Expr::Binary { op: BinOp::Add, data_type, .. } => assert_eq!(*data_type, DataType::Char),
            other => panic!("expected an Add binary, got {other:?}"),
        }
    }

    #[test]
    fn plus_string_only_composes_with_string_or_char() {
        let err = parse_err(r#"function f(): string { string s = "hi"; int n = 1; return s + n; }"#);
        assert!(matches!(err, CompileError::Type { .. }));
    }

    #[test]
    fn minus_rejects_string_operand() {
        let err = parse_err(r#"function f(): string { string s = "hi"; return s - s; }"#);
        assert!(matches!(err, CompileError::Type { .. }));
    }

    #[test]
    fn logical_and_rejects_double() {
        let err = parse_err("function f(): int { double d = 1.0; return d && d; }");
        assert!(matches!(err, CompileError::Type { .. }));
    }

    #[test]
    fn logical_or_rejects_double() {
        let err = parse_err("function f(): int { double d = 1.0; return d || d; }");
        assert!(matches!(err, CompileError::Type { .. }));
    }

    #[test]
    fn comparisons_are_non_associative() {
        let err = parse_err("function f(): int { return 1 < 2 < 3; }");
        assert!(matches!(err, CompileError::Type { .. }));
    }

    // -----------------------------------------------------------------
    // Scope errors
    // -----------------------------------------------------------------

    #[test]
    fn redeclaration_in_the_same_scope_is_a_scope_error() {
        let err = parse_err("function f(): int { int a; int a; return 0; }");
        assert!(matches!(err, CompileError::Scope { .. }));
    }

    #[test]
    fn shadowing_in_a_nested_scope_is_allowed() {
        parse_ok("function f(): int { int a = 1; { int a = 2; } return a; }");
    }

    #[test]
    fn undefined_variable_is_a_scope_error() {
        let err = parse_err("function f(): int { return x; }");
        assert!(matches!(err, CompileError::Scope { .. }));
    }

    #[test]
    fn call_to_a_not_yet_defined_function_is_a_scope_error() {
        let err = parse_err(
            "function main(): int { return helper(); } function helper(): int { return 1; }",
        );
        assert!(matches!(err, CompileError::Scope { .. }));
    }

    // -----------------------------------------------------------------
    // Function-call argument checking
    // -----------------------------------------------------------------

    #[test]
    fn call_arity_mismatch_is_a_type_error() {
        let err = parse_err(
            "function helper(int x): int { return x; } function main(): int { return helper(); }",
        );
        assert!(matches!(err, CompileError::Type { .. }));
    }

    #[test]
    fn call_argument_promotion_is_allowed() {
        parse_ok("function helper(double x): double { return x; } function main(): double { return helper(1); }");
    }

    #[test]
    fn call_argument_narrowing_is_a_type_error() {
        let err = parse_err(
            "function helper(int x): int { return x; } function main(): int { return helper(1.5); }",
        );
        assert!(matches!(err, CompileError::Type { .. }));
    }

    // -----------------------------------------------------------------
    // Guaranteed-return analysis
    // -----------------------------------------------------------------

    #[test]
    fn missing_return_is_a_control_flow_error() {
        let err = parse_err("function f(): int { int a; }");
        assert!(matches!(err, CompileError::ControlFlow { .. }));
    }

    #[test]
    fn if_else_both_returning_satisfies_guaranteed_return() {
        parse_ok("function f(int x): int { if (x) { return 1; } else { return 2; } }");
    }

    #[test]
    fn if_without_else_does_not_satisfy_guaranteed_return() {
        let err = parse_err("function f(int x): int { if (x) { return 1; } }");
        assert!(matches!(err, CompileError::ControlFlow { .. }));
    }

    // -----------------------------------------------------------------
    // Control-flow statements
    // -----------------------------------------------------------------

    #[test]
    fn break_outside_a_loop_is_a_control_flow_error() {
        let err = parse_err("function f(): int { break; return 0; }");
        assert!(matches!(err, CompileError::ControlFlow { .. }));
    }

    #[test]
    fn continue_outside_a_loop_is_a_control_flow_error() {
        let err = parse_err("function f(): int { continue; return 0; }");
        assert!(matches!(err, CompileError::ControlFlow { .. }));
    }

    #[test]
    fn break_inside_a_while_loop_is_allowed() {
        parse_ok("function f(): int { while (1) { break; } return 0; }");
    }

    #[test]
    fn statement_after_a_top_level_return_is_a_control_flow_error() {
        let err = parse_err("function f(): int { return 0; return 1; }");
        assert!(matches!(err, CompileError::ControlFlow { .. }));
    }

    // -----------------------------------------------------------------
    // sqrt()'s restricted grammar
    // -----------------------------------------------------------------

    #[test]
    fn sqrt_accepts_a_bare_numeric_identifier() {
        let program = parse_ok("function f(): double { int n = 4; return sqrt(n); }");
        assert!(matches!(return_expr(&program), Expr::Unary { op: UnOp::Sqrt, .. }));
    }

    #[test]
    fn sqrt_rejects_a_non_identifier_operand() {
        let err = parse_err("function f(): double { return sqrt(1 + 2); }");
        assert!(matches!(err, CompileError::Syntax { .. }));
    }

    #[test]
    fn sqrt_rejects_a_non_numeric_variable() {
        let err = parse_err(r#"function f(): double { string s = "hi"; return sqrt(s); }"#);
        assert!(matches!(err, CompileError::Type { .. }));
    }

    // -----------------------------------------------------------------
    // Assignment narrowing / declaration-without-initialization
    // -----------------------------------------------------------------

    #[test]
    fn assignment_narrowing_is_a_type_error() {
        let err = parse_err("function f(): int { int a; a = 1.5; return 0; }");
        assert!(matches!(err, CompileError::Type { .. }));
    }

    #[test]
    fn declaration_without_initialization_still_registers_a_local() {
        let program = parse_ok("function f(): int { int a; return a; }");
        assert_eq!(program.functions[0].locals.len(), 1);
    }

    // -----------------------------------------------------------------
    // Indexing
    // -----------------------------------------------------------------

    #[test]
    fn indexing_requires_a_string_target() {
        let err = parse_err("function f(): char { int n = 1; return n[0]; }");
        assert!(matches!(err, CompileError::Type { .. }));
    }

    #[test]
    fn indexing_requires_an_integer_index() {
        let err = parse_err(r#"function f(): char { string s = "hi"; char c = 'x'; return s[c]; }"#);
        assert!(matches!(err, CompileError::Type { .. }));
    }

    #[test]
    fn size_requires_a_string_argument() {
        let err = parse_err("function f(): int { int n = 1; return size(n); }");
        assert!(matches!(err, CompileError::Type { .. }));
    }
}
