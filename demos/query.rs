//! `cargo run --bin a2s-query-demo -- <host:port>`
//!
//! Queries Info, Players, and Rules from one server and prints the results.
//! Set `RUST_LOG=debug` to see transport retries and framer activity.

use std::process::ExitCode;

use a2s::{ServerEndpoint, ServerQuery};

fn usage() -> ExitCode {
    eprintln!("usage: a2s-query-demo <host:port>");
    ExitCode::FAILURE
}

/// Rejects a malformed connection string before any socket is opened.
fn parse_endpoint(addr: &str) -> Result<ServerEndpoint, ExitCode> {
    ServerEndpoint::parse(addr).map_err(|e| {
        eprintln!("{addr}: {e}");
        ExitCode::FAILURE
    })
}

#[cfg(not(feature = "async"))]
fn main() -> ExitCode {
    env_logger::init();
    let Some(addr) = std::env::args().nth(1) else {
        return usage();
    };

    let endpoint = match parse_endpoint(&addr) {
        Ok(e) => e,
        Err(code) => return code,
    };

    let mut query = match ServerQuery::connect(endpoint.to_socket_addr(), endpoint.to_string()) {
        Ok(q) => q,
        Err(e) => {
            eprintln!("{endpoint}: {e}");
            return ExitCode::FAILURE;
        }
    };

    match query.info() {
        Ok(info) => println!("{info:#?}"),
        Err(e) => eprintln!("info: {e}"),
    }
    match query.players() {
        Ok(players) => println!("{players:#?}"),
        Err(e) => eprintln!("players: {e}"),
    }
    match query.rules() {
        Ok(rules) => println!("{rules:#?}"),
        Err(e) => eprintln!("rules: {e}"),
    }

    ExitCode::SUCCESS
}

#[cfg(feature = "async")]
#[tokio::main]
async fn main() -> ExitCode {
    env_logger::init();
    let Some(addr) = std::env::args().nth(1) else {
        return usage();
    };

    let endpoint = match parse_endpoint(&addr) {
        Ok(e) => e,
        Err(code) => return code,
    };

    let mut query = match ServerQuery::connect(endpoint.to_socket_addr(), endpoint.to_string()).await {
        Ok(q) => q,
        Err(e) => {
            eprintln!("{endpoint}: {e}");
            return ExitCode::FAILURE;
        }
    };

    match query.info().await {
        Ok(info) => println!("{info:#?}"),
        Err(e) => eprintln!("info: {e}"),
    }
    match query.players().await {
        Ok(players) => println!("{players:#?}"),
        Err(e) => eprintln!("players: {e}"),
    }
    match query.rules().await {
        Ok(rules) => println!("{rules:#?}"),
        Err(e) => eprintln!("rules: {e}"),
    }

    ExitCode::SUCCESS
}
