#![forbid(unsafe_code)]

//! dup — command-line duplicate-file finder, CLI entry point.

use std::io;

fn main() {
    let argv: Vec<String> = std::env::args().skip(1).collect();
    let stdout = io::stdout();
    let mut handle = stdout.lock();

    match dup::cli::run(&argv, &mut handle) {
        Ok(code) => std::process::exit(code),
        Err(e) => {
            eprintln!("dup: {e}");
            std::process::exit(2);
        }
    }
}
