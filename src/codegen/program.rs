//! Module preamble, literal-string data segments, and per-function
//! assembly.

use super::{emit, CodeGen};
use crate::ast::{Function, Program};
use crate::literal_strings::{wat_escape, LiteralStringTable};

/// Lower a fully parsed, type-checked program to a complete WAT module.
pub fn generate_module(program: &Program, literals: &LiteralStringTable) -> String {
    let mut gen = CodeGen::new(literals);
    gen.gen_module(program);
    gen.out
}

impl CodeGen<'_> {
    fn gen_module(&mut self, program: &Program) {
        self.line("(module");
        self.line("(memory (export \"memory\") 10)");
        self.gen_literal_data();
        self.emit_runtime_helpers();
        for function in &program.functions {
            self.gen_function(function);
        }
        self.line(")");
    }

    fn gen_literal_data(&mut self) {
        for (offset, bytes) in self.literals.entries() {
            let escaped = wat_escape(bytes);
            emit!(self, "(data (i32.const {offset}) \"{escaped}\\00\")");
        }
        emit!(self, "(global $free_mem (mut i32) (i32.const {}))", self.literals.free_mem_start());
    }

    fn gen_function(&mut self, function: &Function) {
        let vars = function
            .params
            .iter()
            .chain(function.locals.iter())
            .map(|(data_type, uid)| (*uid, *data_type));
        self.set_function_vars(vars);

        let result = function.return_type.wat_repr();
        let exit_label = format!("fun_exit{}", function.id);

        emit!(self, "(func ${}", function.name);
        for (data_type, uid) in &function.params {
            emit!(self, "(param $var{uid} {})", data_type.wat_repr());
        }
        emit!(self, "(result {result})");
        for (data_type, uid) in &function.locals {
            emit!(self, "(local $var{uid} {})", data_type.wat_repr());
        }

        emit!(self, "(block ${exit_label} (result {result})");
        self.gen_stmts(&function.body, &exit_label);
        self.line(")");
        self.line(")");
        emit!(self, "(export \"{}\" (func ${}))", function.name, function.name);
    }
}
