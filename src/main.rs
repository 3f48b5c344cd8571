//! Binary entrypoint for the terminal chat client.

use std::process::ExitCode;

use traffic_ai_client::start_chat_client;

/// Start the interactive client against the configured chat service.
fn main() -> ExitCode {
    start_chat_client::run()
}
