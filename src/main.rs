//! pagesync - multi-region page management with translation sync

use std::process::ExitCode;

fn main() -> ExitCode {
    match pagesync::cli::run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            if !e.is::<pagesync::cli::Reported>() {
                eprintln!("Error: {:#}", e);
            }
            ExitCode::FAILURE
        }
    }
}
