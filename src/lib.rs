// Library root
// -----------
// The binary (`main.rs`) is a thin wrapper around these modules.
//
// Module responsibilities:
// - `config`: finds, creates and parses the `~/.teledrop.conf` credentials.
// - `api`: talks to the Telegram Bot API and streams the document upload.
// - `ui`: prompts, the progress bar and console status lines.
// - `cli`: argument parsing and the end-to-end run.
// - `logging`: tracing subscriber setup.
pub mod api;
pub mod cli;
pub mod config;
pub mod logging;
pub mod ui;
