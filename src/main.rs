//! CLI driver: open a Tubular source file, compile it, and write the
//! resulting WAT module to standard output.
//!
//! The argument and message contract is specified down to exact text, so
//! this parses `std::env::args()` directly rather than through a derive-
//! based parser — there's no subcommand surface to justify one.

use std::process::ExitCode;

use tubularc::{compile_file, CompileError};

fn main() -> ExitCode {
    let args: Vec<String> = std::env::args().collect();

    if args.len() != 2 {
        println!("Format: {} [filename]", args[0]);
        return ExitCode::FAILURE;
    }

    match compile_file(&args[1]) {
        Ok(wat) => {
            print!("{wat}");
            ExitCode::SUCCESS
        }
        Err(CompileError::Io { message }) => {
            eprintln!("{message}");
            ExitCode::FAILURE
        }
        Err(err) => {
            eprintln!("ERROR: {err}");
            ExitCode::FAILURE
        }
    }
}
