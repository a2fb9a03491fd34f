//! CLI smoke entry point.
//!
//! # Responsibility
//! - Verify `watchgit_core` linkage end to end: open, list, close.
//! - Keep output deterministic for quick local sanity checks.

use std::process::ExitCode;
use watchgit_core::{close_registry, for_each, open_registry, RegistryConfig};

fn main() -> ExitCode {
    println!("watchgit_core version={}", watchgit_core::core_version());

    let config = RegistryConfig::from_env();
    let conn = match open_registry(&config) {
        Ok(conn) => conn,
        Err(err) => {
            eprintln!("{err}");
            return ExitCode::FAILURE;
        }
    };

    let mut alias = String::new();
    let listed = for_each(&conn, |column, value| {
        match column {
            "alias" => alias = value.to_string(),
            _ => println!("{alias}\t{value}"),
        }
        Ok(())
    });

    let closed = close_registry(conn);
    match (listed, closed) {
        (Ok(_), Ok(())) => ExitCode::SUCCESS,
        (Err(err), _) => {
            eprintln!("{err}");
            ExitCode::FAILURE
        }
        (_, Err(err)) => {
            eprintln!("{err}");
            ExitCode::FAILURE
        }
    }
}
