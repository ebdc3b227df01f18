//! rowview CLI entry point
//!
//! Parses arguments and delegates to the `cli` module. Errors have already
//! been reported on stdout as JSON; they are repeated on stderr and the
//! process exits non-zero.

use rowview::cli;

fn main() {
    if let Err(e) = cli::run() {
        eprintln!("{}", e);
        std::process::exit(1);
    }
}
