// UI layer: first-run prompts via `dialoguer`, the upload progress bar via
// `indicatif`, and the one-line status messages printed to stdout.

use std::io::{self, BufRead, IsTerminal, Write};
use std::path::Path;

use dialoguer::{Input, Password};
use indicatif::{ProgressBar, ProgressStyle};

use crate::config::{Field, Prompt};

const PROGRESS_TEMPLATE: &str =
    "{spinner} [{elapsed_precise}] [{bar:40.cyan/blue}] {bytes}/{total_bytes} ({bytes_per_sec}, {eta})";

/// Interactive prompt for a real terminal. The token is read like a
/// password so it is not echoed back.
pub struct TerminalPrompt;

impl Prompt for TerminalPrompt {
    fn notice(&mut self, message: &str) -> io::Result<()> {
        println!("{}", message);
        Ok(())
    }

    fn ask(&mut self, field: Field) -> io::Result<String> {
        let prompt = format!("[+] {}", field.prompt());
        let answer = match field {
            Field::ApiToken => Password::new().with_prompt(prompt).interact()?,
            Field::ChannelId => Input::<String>::new().with_prompt(prompt).interact_text()?,
        };
        Ok(answer.trim().to_string())
    }
}

/// Line-based prompt for piped input: writes the question, reads one line.
pub struct LinePrompt<R, W> {
    input: R,
    output: W,
}

impl<R: BufRead, W: Write> LinePrompt<R, W> {
    pub fn new(input: R, output: W) -> Self {
        Self { input, output }
    }
}

impl<R: BufRead, W: Write> Prompt for LinePrompt<R, W> {
    fn notice(&mut self, message: &str) -> io::Result<()> {
        writeln!(self.output, "{}", message)
    }

    fn ask(&mut self, field: Field) -> io::Result<String> {
        write!(self.output, "[+] {}: ", field.prompt())?;
        self.output.flush()?;

        let mut line = String::new();
        if self.input.read_line(&mut line)? == 0 {
            return Err(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                format!("no value given for {}", field.key()),
            ));
        }
        Ok(line.trim().to_string())
    }
}

/// Pick the prompt that fits stdin: dialoguer on a terminal, plain lines
/// otherwise (dialoguer refuses to run without a tty).
pub fn stdin_prompt() -> Box<dyn Prompt> {
    if io::stdin().is_terminal() {
        Box::new(TerminalPrompt)
    } else {
        Box::new(LinePrompt::new(io::stdin().lock(), io::stdout()))
    }
}

/// Byte progress bar for an upload of `len` bytes. Draws to stderr and
/// stays hidden when stderr is not a terminal.
pub fn upload_progress(len: u64) -> ProgressBar {
    let bar = ProgressBar::new(len);
    let style = ProgressStyle::with_template(PROGRESS_TEMPLATE)
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("=> ");
    bar.set_style(style);
    bar
}

pub fn uploading(path: &Path) {
    println!("[*] Uploading: {}", path.display());
}

pub fn sent() {
    println!("[+] File sent to Telegram successfully!");
}

/// Print an error and its causes on one line.
pub fn failure(err: &anyhow::Error) {
    println!("[-] {:#}", err);
}
