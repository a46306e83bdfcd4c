// Command-line surface and the run sequence: resolve credentials, open the
// file, send it.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::Result;
use clap::Parser;
use tracing::debug;

use crate::api::{ApiClient, CancelFlag, Delivery, Upload, DEFAULT_API_URL};
use crate::{config, ui};

#[derive(Debug, Parser)]
#[command(name = "teledrop", version)]
#[command(about = "Upload a file to a private Telegram channel as a document")]
pub struct Args {
    #[arg(
        value_name = "FILE_PATH",
        allow_hyphen_values = true,
        help = "File to upload"
    )]
    pub file: PathBuf,

    #[arg(
        long,
        env = "TELEDROP_CONFIG",
        value_name = "FILE",
        help = "Config file holding API_TOKEN and PRIVATE_CHANNEL_ID [default: ~/.teledrop.conf]"
    )]
    pub config: Option<PathBuf>,

    #[arg(
        long,
        default_value_t = 600,
        value_name = "SECS",
        help = "Give up on the upload after this many seconds (0 waits forever)"
    )]
    pub timeout: u64,

    #[arg(long, env = "TELEDROP_API_URL", default_value = DEFAULT_API_URL, hide = true)]
    pub api_url: String,
}

impl Args {
    pub fn timeout(&self) -> Option<Duration> {
        match self.timeout {
            0 => None,
            secs => Some(Duration::from_secs(secs)),
        }
    }
}

/// Resolve credentials and upload `args.file` once.
pub fn run(args: &Args) -> Result<Delivery> {
    let config_path = match &args.config {
        Some(path) => path.clone(),
        None => config::default_path()?,
    };
    debug!(path = %config_path.display(), "using config file");

    let mut prompt = ui::stdin_prompt();
    let credentials = config::resolve(&config_path, prompt.as_mut())?;

    let api = ApiClient::new(&args.api_url, args.timeout())?;
    let upload = Upload::open(&args.file, credentials.channel_id.as_str())?;

    ui::uploading(&args.file);
    let progress = ui::upload_progress(upload.len());
    let delivery = api.send_document(
        &credentials.api_token,
        upload,
        &progress,
        &CancelFlag::new(),
    )?;
    ui::sent();
    Ok(delivery)
}
