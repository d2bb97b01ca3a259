//! `Expr` lowering.

use super::{emit, CodeGen};
use crate::ast::{BinOp, Expr, LiteralValue, UnOp};
use crate::types::DataType;

impl CodeGen<'_> {
    pub(super) fn gen_expr(&mut self, expr: &Expr) {
        match expr {
            Expr::Literal(LiteralValue::Int(v)) | Expr::Literal(LiteralValue::Char(v)) => {
                emit!(self, "(i32.const {v})");
            }
            Expr::Literal(LiteralValue::Double(v)) => {
                emit!(self, "(f64.const {v})");
            }
            Expr::LiteralString { offset, .. } => {
                emit!(self, "(i32.const {offset})");
            }
            Expr::Variable { uid, .. } => {
                emit!(self, "(local.get $var{uid})");
            }
            Expr::Index { base_uid, index } => {
                emit!(self, "(local.get $var{base_uid})");
                self.gen_expr(index);
                self.line("(i32.add)");
                self.line("(i32.load8_u)");
            }
            Expr::Binary { op, lhs, rhs, .. } => self.gen_binary(*op, lhs, rhs),
            Expr::Unary {
                op,
                operand,
                data_type,
            } => self.gen_unary(*op, operand, *data_type),
            Expr::Call {
                callee, args, ..
            } => {
                for arg in args {
                    self.gen_expr(arg);
                }
                emit!(self, "(call ${callee})");
            }
        }
    }

    fn gen_binary(&mut self, op: BinOp, lhs: &Expr, rhs: &Expr) {
        let lt = lhs.data_type();
        let rt = rhs.data_type();

        match op {
            BinOp::Add if lt.is_string_like() && rt.is_string_like() => {
                self.gen_expr(lhs);
                if lt == DataType::Char && rt == DataType::String {
                    self.line("(call $char_to_string)");
                }
                self.gen_expr(rhs);
                if rt == DataType::Char && lt == DataType::String {
                    self.line("(call $char_to_string)");
                }
                if lt == DataType::Char && rt == DataType::Char {
                    self.line("(i32.add)");
                } else {
                    self.line("(call $add_strings)");
                }
            }
            BinOp::Repeat => {
                // lhs is the (already-normalized) int count, rhs the char.
                self.gen_expr(lhs);
                self.gen_expr(rhs);
                self.line("(call $pad_char)");
            }
            BinOp::And => {
                self.gen_expr(lhs);
                self.line("(if (result i32)");
                self.line("(then");
                self.gen_expr(rhs);
                self.line("(i32.const 0)");
                self.line("(i32.ne)");
                self.line(")");
                self.line("(else");
                self.line("(i32.const 0)");
                self.line(")");
                self.line(")");
            }
            BinOp::Or => {
                self.gen_expr(lhs);
                self.line("(if (result i32)");
                self.line("(then");
                self.line("(i32.const 1)");
                self.line(")");
                self.line("(else");
                self.gen_expr(rhs);
                self.line("(i32.const 0)");
                self.line("(i32.ne)");
                self.line(")");
                self.line(")");
            }
            _ => self.gen_numeric_binary(op, lhs, rhs, lt, rt),
        }
    }

    /// Arithmetic, relational, `%`: evaluate each side, promoting to
    /// double where required, then emit the operator in the promoted
    /// WAT type.
    fn gen_numeric_binary(&mut self, op: BinOp, lhs: &Expr, rhs: &Expr, lt: DataType, rt: DataType) {
        let promoted = DataType::promote(lt, rt);
        let t = promoted.wat_repr();

        self.gen_expr(lhs);
        if promoted == DataType::Double && lt != DataType::Double {
            self.line("(f64.convert_i32_s)");
        }
        self.gen_expr(rhs);
        if promoted == DataType::Double && rt != DataType::Double {
            self.line("(f64.convert_i32_s)");
        }

        let signed = if promoted == DataType::Double { "" } else { "_s" };
        match op {
            BinOp::Add => emit!(self, "({t}.add)"),
            BinOp::Sub => emit!(self, "({t}.sub)"),
            BinOp::Mul => emit!(self, "({t}.mul)"),
            BinOp::Div if promoted == DataType::Double => self.line("(f64.div)"),
            BinOp::Div => self.line("(i32.div_s)"),
            BinOp::Mod => self.line("(i32.rem_s)"),
            BinOp::Lt => emit!(self, "({t}.lt{signed})"),
            BinOp::Gt => emit!(self, "({t}.gt{signed})"),
            BinOp::Le => emit!(self, "({t}.le{signed})"),
            BinOp::Ge => emit!(self, "({t}.ge{signed})"),
            BinOp::Eq => emit!(self, "({t}.eq)"),
            BinOp::NotEq => emit!(self, "({t}.ne)"),
            BinOp::Repeat | BinOp::And | BinOp::Or => {
                unreachable!("Repeat/And/Or are dispatched in gen_binary before reaching here")
            }
        }
    }

    fn gen_unary(&mut self, op: UnOp, operand: &Expr, data_type: DataType) {
        match op {
            UnOp::Negate => {
                let t = operand.data_type().wat_repr();
                emit!(self, "({t}.const 0)");
                self.gen_expr(operand);
                emit!(self, "({t}.sub)");
            }
            UnOp::Not => {
                self.gen_expr(operand);
                self.line("(i32.eqz)");
            }
            UnOp::Sqrt => {
                self.gen_expr(operand);
                if operand.data_type() != DataType::Double {
                    self.line("(f64.convert_i32_s)");
                }
                self.line("(f64.sqrt)");
            }
            UnOp::Cast => {
                self.gen_expr(operand);
                self.gen_cast(operand.data_type(), data_type);
            }
        }
    }

    /// Explicit `expr : type` conversions, covering every `(source,
    /// target)` pair the grammar admits; same-representation casts (e.g.
    /// `int:char`) are no-ops since both share the `i32` WAT
    /// representation.
    fn gen_cast(&mut self, source: DataType, target: DataType) {
        use DataType::*;
        match (source, target) {
            (Double, Integer) | (Double, Char) => self.line("(i32.trunc_f64_s)"),
            (Integer, Double) | (Char, Double) => self.line("(f64.convert_i32_s)"),
            (Char, String) => self.line("(call $char_to_string)"),
            _ => {}
        }
    }
}

