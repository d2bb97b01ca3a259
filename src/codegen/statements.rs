//! `Stmt` lowering.

use super::{emit, CodeGen};
use crate::ast::Stmt;
use crate::types::DataType;

impl CodeGen<'_> {
    /// Lower a function body (or any nested statement list) in source
    /// order. `fun_exit` is the enclosing function's own exit-block
    /// label, used by early-return `if`/`else` branches.
    pub(super) fn gen_stmts(&mut self, stmts: &[Stmt], fun_exit: &str) {
        for stmt in stmts {
            self.gen_stmt(stmt, fun_exit);
        }
    }

    fn gen_stmt(&mut self, stmt: &Stmt, fun_exit: &str) {
        match stmt {
            Stmt::Assign { uid, value } => {
                self.gen_expr(value);
                if self.var_type(*uid) == DataType::Double && value.data_type() != DataType::Double {
                    self.line("(f64.convert_i32_s)");
                }
                emit!(self, "(local.set $var{uid})");
                emit!(self, "(local.get $var{uid})");
                self.line("(drop)");
            }
            Stmt::IndexAssign {
                base_uid,
                index,
                value,
            } => {
                self.gen_expr(index);
                emit!(self, "(local.get $var{base_uid})");
                self.line("(i32.add)");
                self.gen_expr(value);
                self.line("(i32.store8)");
            }
            Stmt::ExprStmt(expr) => {
                self.gen_expr(expr);
                self.line("(drop)");
            }
            Stmt::If {
                condition,
                then_block,
                else_block,
                then_returns,
                else_returns,
            } => self.gen_if(condition, then_block, else_block.as_deref(), *then_returns, *else_returns, fun_exit),
            Stmt::While {
                condition,
                body,
                loop_id,
            } => {
                emit!(self, "(block $exit{loop_id}");
                emit!(self, "(loop $loop{loop_id}");
                self.gen_expr(condition);
                self.line("(i32.eqz)");
                emit!(self, "(br_if $exit{loop_id})");
                self.gen_stmts(body, fun_exit);
                emit!(self, "(br $loop{loop_id})");
                self.line(")");
                self.line(")");
            }
            Stmt::Block(inner) => self.gen_stmts(inner, fun_exit),
            Stmt::Continue { loop_id } => emit!(self, "(br $loop{loop_id})"),
            Stmt::Break { loop_id } => emit!(self, "(br $exit{loop_id})"),
            Stmt::Return { value, inside_if } => {
                self.gen_expr(value);
                if *inside_if {
                    self.line("(return)");
                }
            }
        }
    }

    #[allow(clippy::too_many_arguments)]
    fn gen_if(
        &mut self,
        condition: &crate::ast::Expr,
        then_block: &[Stmt],
        else_block: Option<&[Stmt]>,
        then_returns: bool,
        else_returns: bool,
        fun_exit: &str,
    ) {
        self.gen_expr(condition);

        if then_returns && else_returns {
            self.line("(if (result i32)");
        } else {
            self.line("(if");
        }

        self.line("(then");
        self.gen_stmts(then_block, fun_exit);
        if then_returns {
            self.line("(return)");
        }
        if then_returns && !else_returns {
            emit!(self, "(br ${fun_exit})");
        }
        self.line(")");

        if let Some(else_block) = else_block {
            self.line("(else");
            self.gen_stmts(else_block, fun_exit);
            if else_returns && !then_returns {
                emit!(self, "(br ${fun_exit})");
            }
            self.line(")");
        }

        self.line(")");
    }
}
