// Configuration resolver: the bot token and the destination channel id live
// in `~/.teledrop.conf` as two `KEY=VALUE` lines. The first run asks for
// both values and writes the file; every later run just reads it back.

use std::collections::HashMap;
use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::{debug, info};

pub const CONFIG_FILE_NAME: &str = ".teledrop.conf";
pub const API_TOKEN_KEY: &str = "API_TOKEN";
pub const CHANNEL_ID_KEY: &str = "PRIVATE_CHANNEL_ID";

/// Printed once before the first-run prompts.
pub const FIRST_RUN_NOTICE: &str =
    "[?] The prompt will only show the first time if you still don't have config file.";

/// Credentials needed to address an upload: who sends it and where it goes.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Credentials {
    pub api_token: String,
    pub channel_id: String,
}

impl Credentials {
    /// Render in the on-disk format, newline-terminated.
    pub fn to_file_contents(&self) -> String {
        format!(
            "{}={}\n{}={}\n",
            API_TOKEN_KEY, self.api_token, CHANNEL_ID_KEY, self.channel_id
        )
    }
}

/// The values asked for on first run, in the order they are asked.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Field {
    ApiToken,
    ChannelId,
}

impl Field {
    pub fn key(self) -> &'static str {
        match self {
            Field::ApiToken => API_TOKEN_KEY,
            Field::ChannelId => CHANNEL_ID_KEY,
        }
    }

    pub fn prompt(self) -> &'static str {
        match self {
            Field::ApiToken => "Enter your Telegram bot API token",
            Field::ChannelId => "Enter your private channel ID",
        }
    }
}

/// Source of first-run answers. The terminal implementation lives in
/// `ui`; tests drive the resolver with scripted input.
pub trait Prompt {
    fn notice(&mut self, message: &str) -> io::Result<()>;
    fn ask(&mut self, field: Field) -> io::Result<String>;
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Error getting user home directory")]
    HomeDir,
    #[error("Error reading input")]
    Input(#[source] io::Error),
    #[error("Error reading config file {}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("Error writing to config file {}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("Malformed config line {line} in {}: expected KEY=VALUE", path.display())]
    MalformedLine { path: PathBuf, line: usize },
}

/// `<home>/.teledrop.conf`
pub fn default_path() -> Result<PathBuf, ConfigError> {
    let home = dirs::home_dir().ok_or(ConfigError::HomeDir)?;
    Ok(home.join(CONFIG_FILE_NAME))
}

/// Return the stored credentials, creating the file through `prompt` if it
/// does not exist yet.
pub fn resolve(path: &Path, prompt: &mut dyn Prompt) -> Result<Credentials, ConfigError> {
    match fs::metadata(path) {
        Ok(_) => load(path),
        Err(e) if e.kind() == io::ErrorKind::NotFound => create(path, prompt),
        Err(source) => Err(ConfigError::Read {
            path: path.to_path_buf(),
            source,
        }),
    }
}

/// Read and parse an existing config file.
pub fn load(path: &Path) -> Result<Credentials, ConfigError> {
    let text = fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    debug!(path = %path.display(), "loaded config file");
    parse(&text, path)
}

fn create(path: &Path, prompt: &mut dyn Prompt) -> Result<Credentials, ConfigError> {
    prompt.notice(FIRST_RUN_NOTICE).map_err(ConfigError::Input)?;
    let api_token = prompt.ask(Field::ApiToken).map_err(ConfigError::Input)?;
    let channel_id = prompt.ask(Field::ChannelId).map_err(ConfigError::Input)?;

    let credentials = Credentials {
        api_token,
        channel_id,
    };
    write(path, &credentials)?;
    info!(path = %path.display(), "created config file");
    Ok(credentials)
}

/// Write `credentials` to `path`, readable by the owner only.
pub fn write(path: &Path, credentials: &Credentials) -> Result<(), ConfigError> {
    let write_err = |source| ConfigError::Write {
        path: path.to_path_buf(),
        source,
    };

    let mut options = OpenOptions::new();
    options.write(true).create(true).truncate(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        options.mode(0o600);
    }

    let mut file = options.open(path).map_err(write_err)?;
    file.write_all(credentials.to_file_contents().as_bytes())
        .map_err(write_err)?;
    Ok(())
}

/// Parse `KEY=VALUE` lines read from `origin`. Blank lines are skipped, each
/// line splits on its first `=`, and keys that never appear come back as
/// empty strings.
pub fn parse(text: &str, origin: &Path) -> Result<Credentials, ConfigError> {
    let mut values: HashMap<&str, &str> = HashMap::new();
    for (idx, line) in text.split('\n').enumerate() {
        let line = line.strip_suffix('\r').unwrap_or(line);
        if line.is_empty() {
            continue;
        }
        let (key, value) = line
            .split_once('=')
            .ok_or_else(|| ConfigError::MalformedLine {
                path: origin.to_path_buf(),
                line: idx + 1,
            })?;
        values.insert(key, value);
    }

    let lookup = |key: &str| match values.get(key) {
        Some(value) => value.to_string(),
        None => {
            debug!(key, "config key missing, using an empty value");
            String::new()
        }
    };

    Ok(Credentials {
        api_token: lookup(API_TOKEN_KEY),
        channel_id: lookup(CHANNEL_ID_KEY),
    })
}
