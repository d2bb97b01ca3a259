//! The fixed WAT string-runtime helper functions.
//!
//! These four bodies are a contract, not a design choice: callers elsewhere
//! in the generator rely on their exact semantics, including the
//! `$char_to_string` bump-by-2 quirk (see its doc comment below).

use super::CodeGen;

impl CodeGen<'_> {
    pub(super) fn emit_runtime_helpers(&mut self) {
        self.emit_get_length();
        self.emit_add_strings();
        self.emit_char_to_string();
        self.emit_pad_char();
    }

    fn emit_get_length(&mut self) {
        self.line("(func $get_length (param $str i32) (result i32)");
        self.line("  (local $length i32)");
        self.line("  (local $current i32)");
        self.line("  (block $fun_exit_get_length (result i32)");
        self.line("    (local.set $length (i32.const 0))");
        self.line("    (block $exit1");
        self.line("    (loop $loop1");
        self.line("      (local.get $str)");
        self.line("      (local.get $length)");
        self.line("      (i32.add)");
        self.line("      (i32.load8_u)");
        self.line("      (local.set $current)");
        self.line("      (local.get $current)");
        self.line("      (i32.eqz)");
        self.line("      (br_if $exit1)");
        self.line("      (local.get $length)");
        self.line("      (i32.const 1)");
        self.line("      (i32.add)");
        self.line("      (local.set $length)");
        self.line("      (br $loop1)");
        self.line("    )");
        self.line("    )");
        self.line("  (local.get $length)");
        self.line("  )");
        self.line(")");
        self.line("(export \"get_length\" (func $get_length))");
    }

    fn emit_add_strings(&mut self) {
        self.line("(func $add_strings (param $str1 i32) (param $str2 i32) (result i32)");
        self.line("  (local $old_free_mem i32)");
        self.line("  (local $count i32)");
        self.line("  (local $current i32)");
        self.line("  (local $i i32)");
        self.line("  (global.get $free_mem)");
        self.line("  (local.set $old_free_mem)");
        self.line("  (i32.const 0)");
        self.line("  (local.set $count)");
        self.line("  (i32.const 0)");
        self.line("  (local.set $i)");
        self.line("  (block $fun_exit_add_strings (result i32)");
        self.line("    (block $exit1");
        self.line("      (loop $loop1");
        self.line("        (local.get $str1)");
        self.line("        (local.get $count)");
        self.line("        (i32.add)");
        self.line("        (i32.load8_u)");
        self.line("        (local.set $current)");
        self.line("        (local.get $current)");
        self.line("        (i32.eqz)");
        self.line("        (br_if $exit1)");
        self.line("        (local.get $old_free_mem)");
        self.line("        (local.get $count)");
        self.line("        (i32.add)");
        self.line("        (local.get $current)");
        self.line("        (i32.store8)");
        self.line("        (local.get $count)");
        self.line("        (i32.const 1)");
        self.line("        (i32.add)");
        self.line("        (local.set $count)");
        self.line("        (br $loop1)");
        self.line("      )");
        self.line("    )");
        self.line("    (block $exit2");
        self.line("      (loop $loop2");
        self.line("        (local.get $str2)");
        self.line("        (local.get $i)");
        self.line("        (i32.add)");
        self.line("        (i32.load8_u)");
        self.line("        (local.set $current)");
        self.line("        (local.get $current)");
        self.line("        (i32.eqz)");
        self.line("        (br_if $exit2)");
        self.line("        (local.get $old_free_mem)");
        self.line("        (local.get $count)");
        self.line("        (i32.add)");
        self.line("        (local.get $current)");
        self.line("        (i32.store8)");
        self.line("        (local.get $count)");
        self.line("        (i32.const 1)");
        self.line("        (i32.add)");
        self.line("        (local.set $count)");
        self.line("        (local.get $i)");
        self.line("        (i32.const 1)");
        self.line("        (i32.add)");
        self.line("        (local.set $i)");
        self.line("        (br $loop2)");
        self.line("      )");
        self.line("    )");
        self.line("    (local.get $old_free_mem)");
        self.line("    (local.get $count)");
        self.line("    (i32.add)");
        self.line("    (i32.const 0)");
        self.line("    (i32.store8)");
        self.line("    (local.get $old_free_mem)");
        self.line("    (local.get $count)");
        self.line("    (i32.add)");
        self.line("    (i32.const 1)");
        self.line("    (i32.add)");
        self.line("    (global.set $free_mem)");
        self.line("    (local.get $old_free_mem)");
        self.line("  )");
        self.line(")");
        self.line("(export \"add_strings\" (func $add_strings))");
    }

    /// Allocates two bytes and advances `$free_mem` by 2. This leaves the
    /// NUL sentinel at a position only valid before the next bump; kept
    /// this way deliberately since later reads happen before any
    /// intervening allocation.
    fn emit_char_to_string(&mut self) {
        self.line("(func $char_to_string (param $char i32) (result i32)");
        self.line("  (local $address i32)");
        self.line("  (global.get $free_mem)");
        self.line("  (local.set $address)");
        self.line("  (local.get $address)");
        self.line("  (local.get $char)");
        self.line("  (i32.store8)");
        self.line("  (local.get $address)");
        self.line("  (i32.const 1)");
        self.line("  (i32.add)");
        self.line("  (i32.const 0)");
        self.line("  (i32.store8)");
        self.line("  (local.get $address)");
        self.line("  (i32.const 2)");
        self.line("  (i32.add)");
        self.line("  (global.set $free_mem)");
        self.line("  (local.get $address)");
        self.line(")");
        self.line("(export \"char_to_string\" (func $char_to_string))");
    }

    fn emit_pad_char(&mut self) {
        self.line("(func $pad_char (param $repeat i32) (param $char i32) (result i32)");
        self.line("  (local $char_str i32)");
        self.line("  (local $result i32)");
        self.line("  (local $i i32)");
        self.line("  (block $empty_string_block");
        self.line("    (local.get $repeat)");
        self.line("    (i32.eqz)");
        self.line("    (if");
        self.line("      (then");
        self.line("        (global.get $free_mem)");
        self.line("        (i32.const 0)");
        self.line("        (i32.store8)");
        self.line("        (global.get $free_mem)");
        self.line("        (i32.const 1)");
        self.line("        (i32.add)");
        self.line("        (global.set $free_mem)");
        self.line("        (global.get $free_mem)");
        self.line("        (i32.const 1)");
        self.line("        (i32.sub)");
        self.line("        (return)");
        self.line("      )");
        self.line("    )");
        self.line("  )");
        self.line("  (local.get $char)");
        self.line("  (call $char_to_string)");
        self.line("  (local.set $char_str)");
        self.line("  (local.get $char_str)");
        self.line("  (local.set $result)");
        self.line("  (local.set $i (i32.const 1))");
        self.line("  (block $exit_block");
        self.line("    (loop $loop");
        self.line("      (local.get $i)");
        self.line("      (local.get $repeat)");
        self.line("      (i32.ge_u)");
        self.line("      (br_if $exit_block)");
        self.line("      (local.get $result)");
        self.line("      (local.get $char_str)");
        self.line("      (call $add_strings)");
        self.line("      (local.set $result)");
        self.line("      (local.get $i)");
        self.line("      (i32.const 1)");
        self.line("      (i32.add)");
        self.line("      (local.set $i)");
        self.line("      (br $loop)");
        self.line("    )");
        self.line("  )");
        self.line("  (local.get $result)");
        self.line(")");
        self.line("(export \"pad_char\" (func $pad_char))");
    }
}
