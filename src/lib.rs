//! Tubular: a single-pass compiler from Tubular source to WebAssembly Text.
//!
//! The pipeline is characters → tokens → token queue → parser (with
//! inline symbol-table-backed semantic analysis) → typed AST → code
//! generator → a WAT module as a `String`. [`compile_source`] and
//! [`compile_file`] tie the stages together; `main.rs` is a thin CLI
//! shell around the latter.

pub mod ast;
pub mod codegen;
pub mod error;
pub mod literal_strings;
pub mod parser;
pub mod symbol_table;
pub mod token;
pub mod token_queue;
pub mod types;

pub use error::CompileError;
pub use parser::Parser;

/// Compile a Tubular program held in memory, returning the emitted WAT
/// module text.
pub fn compile_source(source: &str) -> Result<String, CompileError> {
    let (program, literals) = Parser::new(source)?.parse()?;
    Ok(codegen::generate_module(&program, &literals))
}

/// Compile a Tubular source file, mapping file-open failures to the
/// `CompileError::Io` variant with the exact message the CLI requires:
/// `ERROR: Unable to open file '<path>'.`
pub fn compile_file(path: impl AsRef<std::path::Path>) -> Result<String, CompileError> {
    let path = path.as_ref();
    let source = std::fs::read_to_string(path).map_err(|_| {
        CompileError::io(format!(
            "ERROR: Unable to open file '{}'.",
            path.display()
        ))
    })?;
    compile_source(&source)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn integer_addition_emits_i32_add() {
        let src = "function main(): int { return 1 + 2; }";
        let wat = compile_source(src).unwrap();
        assert!(wat.contains("(i32.add)"));
        assert!(wat.contains("(func $main"));
        assert!(wat.contains("(export \"main\" (func $main))"));
    }

    #[test]
    fn mixed_arithmetic_promotes_to_double() {
        let src = "function main(): double { int x = 2; double y = 3.5; return x + y; }";
        let wat = compile_source(src).unwrap();
        assert!(wat.contains("(f64.convert_i32_s)"));
        assert!(wat.contains("(f64.add)"));
    }

    #[test]
    fn string_concat_promotes_char_through_char_to_string() {
        let src = r#"function main(): string { char c = 'x'; string s = "ab"; return c + s; }"#;
        let wat = compile_source(src).unwrap();
        assert!(wat.contains("(call $char_to_string)"));
        assert!(wat.contains("(call $add_strings)"));
    }

    #[test]
    fn indexed_store_emits_i32_store8() {
        let src = r#"function main(): int { string s = "ab"; s[0] = 'z'; return 0; }"#;
        let wat = compile_source(src).unwrap();
        assert!(wat.contains("(i32.store8)"));
    }

    #[test]
    fn guaranteed_return_if_else_gets_result_annotated_if() {
        let src = "function main(): int { if (1) { return 1; } else { return 2; } }";
        let wat = compile_source(src).unwrap();
        assert!(wat.contains("(if (result i32)"));
        assert!(wat.contains("(return)"));
    }

    #[test]
    fn narrowing_return_is_a_type_error() {
        let src = "function main(): int { return 1.5; }";
        let err = compile_source(src).unwrap_err();
        assert!(matches!(err, CompileError::Type { .. }));
    }

    #[test]
    fn chained_comparison_is_a_type_error() {
        let src = "function main(): int { if (1 < 2 < 3) { return 1; } return 0; }";
        let err = compile_source(src).unwrap_err();
        assert!(matches!(err, CompileError::Type { .. }));
    }

    #[test]
    fn break_outside_loop_is_a_control_flow_error() {
        let src = "function main(): int { break; return 0; }";
        let err = compile_source(src).unwrap_err();
        assert!(matches!(err, CompileError::ControlFlow { .. }));
    }

    #[test]
    fn statement_after_top_level_return_is_a_control_flow_error() {
        let src = "function main(): int { return 0; return 1; }";
        let err = compile_source(src).unwrap_err();
        assert!(matches!(err, CompileError::ControlFlow { .. }));
    }

    #[test]
    fn compilation_is_deterministic() {
        let src = "function main(): int { return 1 + 2 * 3; }";
        let first = compile_source(src).unwrap();
        let second = compile_source(src).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn compile_file_reports_io_error_for_missing_path() {
        let err = compile_file("/no/such/path/does-not-exist.tube").unwrap_err();
        match err {
            CompileError::Io { message } => {
                assert_eq!(
                    message,
                    "ERROR: Unable to open file '/no/such/path/does-not-exist.tube'."
                );
            }
            other => panic!("expected Io error, got {other:?}"),
        }
    }

    #[test]
    fn compile_file_reads_and_compiles_a_real_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("prog.tube");
        std::fs::write(&path, "function main(): int { return 42; }").unwrap();
        let wat = compile_file(&path).unwrap();
        assert!(wat.contains("(i32.const 42)"));
    }
}
