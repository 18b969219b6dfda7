//! sealpost: command-line client for sealpost blobs
//!
//! Commands:
//!   encrypt <in> <out> [--armor]             - seal a file with a password
//!   decrypt <in> <out>                       - open a sealed (or armored) file
//!   push <file> --id <id> [--encrypt]        - store a file on a listener
//!   fetch <id> <out> [--decrypt]             - fetch a blob from a listener
//!   config show                              - display current configuration
//!
//! The password is read from SEALPOST_PASSWORD, or prompted for. An empty
//! password is allowed (with a warning).

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use secrecy::SecretString;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use sealpost_core::config::SealpostConfig;
use sealpost_crypto::KeyVariant;
use sealpost_net::BlobClient;

// ── CLI structure ──────────────────────────────────────────────────────────────

#[derive(Parser, Debug)]
#[command(
    name = "sealpost",
    version,
    about = "sealpost blob client",
    long_about = "sealpost: password-encrypt files and move them through a sealpostd listener"
)]
struct Cli {
    /// Path to sealpost.toml configuration file
    #[arg(long, short = 'c', env = "SEALPOST_CONFIG", default_value = "/etc/sealpost/config.toml")]
    config: PathBuf,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "SEALPOST_LOG", default_value = "warn")]
    log: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Encrypt a file into a binary (or base64-armored) envelope
    Encrypt {
        input: PathBuf,
        output: PathBuf,
        /// Write the envelope as base64 text
        #[arg(long)]
        armor: bool,
    },

    /// Decrypt a binary or base64-armored envelope
    ///
    /// Envelopes produced by older tools with different key derivations are
    /// accepted as well; a warning names the variant that matched.
    Decrypt { input: PathBuf, output: PathBuf },

    /// Store a local file on a listener under an ID
    Push {
        file: PathBuf,
        #[arg(long)]
        id: String,
        /// Listener address (default: client.server from config)
        #[arg(long, short = 's')]
        server: Option<String>,
        /// Encrypt the file before sending
        #[arg(long)]
        encrypt: bool,
    },

    /// Fetch a blob from a listener into a local file
    Fetch {
        id: String,
        output: PathBuf,
        /// Listener address (default: client.server from config)
        #[arg(long, short = 's')]
        server: Option<String>,
        /// Decrypt the blob after fetching
        #[arg(long)]
        decrypt: bool,
    },

    /// Configuration management
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand, Debug)]
enum ConfigAction {
    /// Print the active configuration (merged defaults + config file)
    Show,
}

// ── Entry point ───────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(&cli.log);

    let config = SealpostConfig::load_or_default(&cli.config)?;

    match cli.command {
        Commands::Encrypt { input, output, armor } => cmd_encrypt(&input, &output, armor).await,
        Commands::Decrypt { input, output } => cmd_decrypt(&input, &output).await,
        Commands::Push { file, id, server, encrypt } => {
            cmd_push(&config, &file, &id, server.as_deref(), encrypt).await
        }
        Commands::Fetch { id, output, server, decrypt } => {
            cmd_fetch(&config, &id, &output, server.as_deref(), decrypt).await
        }
        Commands::Config { action: ConfigAction::Show } => cmd_config_show(&config, &cli.config),
    }
}

fn init_logging(level: &str) {
    use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr))
        .init();
}

// ── Password ──────────────────────────────────────────────────────────────────

fn password() -> Result<SecretString> {
    resolve_password(std::env::var("SEALPOST_PASSWORD").ok(), || {
        rpassword::prompt_password("sealpost password: ").context("reading password")
    })
}

/// An empty SEALPOST_PASSWORD counts as unset. An empty answer at the
/// prompt is accepted: key derivation is defined for every input, and
/// envelopes sealed with an empty password must stay openable.
fn resolve_password(
    from_env: Option<String>,
    prompt: impl FnOnce() -> Result<String>,
) -> Result<SecretString> {
    let raw = match from_env {
        Some(p) if !p.is_empty() => p,
        _ => prompt()?,
    };
    if raw.is_empty() {
        warn!("using an empty password");
    }
    Ok(SecretString::from(raw))
}

// ── `sealpost encrypt` / `sealpost decrypt` ───────────────────────────────────

async fn cmd_encrypt(input: &Path, output: &Path, armor: bool) -> Result<()> {
    let plaintext = read_file(input).await?;
    let password = password()?;

    let sealed = if armor {
        sealpost_crypto::encrypt_to_text(&plaintext, &password)?.into_bytes()
    } else {
        sealpost_crypto::encrypt(&plaintext, &password)?
    };

    write_file(output, &sealed).await?;
    println!("encrypted {} -> {} ({} bytes)", input.display(), output.display(), sealed.len());
    Ok(())
}

async fn cmd_decrypt(input: &Path, output: &Path) -> Result<()> {
    let sealed = read_file(input).await?;
    let password = password()?;

    let plaintext = open(&sealed, &password)?;

    write_file(output, &plaintext).await?;
    println!("decrypted {} -> {} ({} bytes)", input.display(), output.display(), plaintext.len());
    Ok(())
}

fn open(sealed: &[u8], password: &SecretString) -> Result<Vec<u8>> {
    let recovered = sealpost_crypto::reconcile(sealed, password).context("decrypting envelope")?;
    if recovered.variant != KeyVariant::Canonical {
        warn!(variant = %recovered.variant, "envelope was sealed with a legacy key; re-encrypt it");
    }
    if let Some(format) = sealpost_crypto::sniff(&recovered.plaintext) {
        info!(format = %format, unwrapped = recovered.output_unwrapped, "decrypted image");
    }
    Ok(recovered.plaintext)
}

// ── `sealpost push` / `sealpost fetch` ────────────────────────────────────────

fn client_for(config: &SealpostConfig, server: Option<&str>) -> (BlobClient, String) {
    let addr = server.map(str::to_string).unwrap_or_else(|| config.client.server.clone());
    (BlobClient::from_config(&config.client, &config.wire), addr)
}

async fn cmd_push(
    config: &SealpostConfig,
    file: &Path,
    id: &str,
    server: Option<&str>,
    encrypt: bool,
) -> Result<()> {
    let mut data = read_file(file).await?;
    if encrypt {
        data = sealpost_crypto::encrypt(&data, &password()?)?;
    }

    let (client, addr) = client_for(config, server);
    let bytes = data.len();
    client
        .transfer(&addr, id, data)
        .await
        .with_context(|| format!("pushing {id} to {addr}"))?;

    println!("pushed {} as {id} ({bytes} bytes) to {addr}", file.display());
    Ok(())
}

async fn cmd_fetch(
    config: &SealpostConfig,
    id: &str,
    output: &Path,
    server: Option<&str>,
    decrypt: bool,
) -> Result<()> {
    let (client, addr) = client_for(config, server);
    let mut data = client
        .request(&addr, id)
        .await
        .with_context(|| format!("fetching {id} from {addr}"))?;

    if decrypt {
        data = open(&data, &password()?)?;
    }

    write_file(output, &data).await?;
    println!("fetched {id} ({} bytes) -> {}", data.len(), output.display());
    Ok(())
}

// ── `sealpost config show` ────────────────────────────────────────────────────

fn cmd_config_show(config: &SealpostConfig, config_path: &Path) -> Result<()> {
    if config_path.exists() {
        println!("# Configuration from: {}", config_path.display());
    } else {
        println!("# Configuration: defaults (no file at {})", config_path.display());
    }
    println!();
    let rendered = toml::to_string_pretty(config).context("serializing config to TOML")?;
    print!("{rendered}");
    Ok(())
}

// ── File helpers ──────────────────────────────────────────────────────────────

async fn read_file(path: &Path) -> Result<Vec<u8>> {
    tokio::fs::read(path)
        .await
        .with_context(|| format!("reading {}", path.display()))
}

async fn write_file(path: &Path, data: &[u8]) -> Result<()> {
    tokio::fs::write(path, data)
        .await
        .with_context(|| format!("writing {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use secrecy::ExposeSecret;

    #[test]
    fn test_parse_push() {
        let cli = Cli::try_parse_from([
            "sealpost",
            "push",
            "photo.png",
            "--id",
            "img-1",
            "--server",
            "10.0.0.1:8084",
            "--encrypt",
        ])
        .unwrap();

        match cli.command {
            Commands::Push { file, id, server, encrypt } => {
                assert_eq!(file, PathBuf::from("photo.png"));
                assert_eq!(id, "img-1");
                assert_eq!(server.as_deref(), Some("10.0.0.1:8084"));
                assert!(encrypt);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_push_requires_id() {
        assert!(Cli::try_parse_from(["sealpost", "push", "photo.png"]).is_err());
    }

    #[test]
    fn test_password_prefers_env() {
        let pw = resolve_password(Some("from-env".into()), || panic!("must not prompt")).unwrap();
        assert_eq!(pw.expose_secret(), "from-env");
    }

    #[test]
    fn test_password_prompts_when_env_empty() {
        let pw = resolve_password(Some(String::new()), || Ok("typed".into())).unwrap();
        assert_eq!(pw.expose_secret(), "typed");
    }

    #[test]
    fn test_empty_password_accepted() {
        let pw = resolve_password(None, || Ok(String::new())).unwrap();
        assert_eq!(pw.expose_secret(), "");

        let sealed = sealpost_crypto::encrypt(b"blank", &pw).unwrap();
        assert_eq!(open(&sealed, &pw).unwrap(), b"blank");
    }

    #[test]
    fn test_client_for_server_override() {
        let config = SealpostConfig::default();

        let (_, addr) = client_for(&config, None);
        assert_eq!(addr, "127.0.0.1:8084");

        let (_, addr) = client_for(&config, Some("10.1.1.1:1"));
        assert_eq!(addr, "10.1.1.1:1");
    }

    #[test]
    fn test_open_armored_envelope() {
        let password = SecretString::from("secret");
        let text = sealpost_crypto::encrypt_to_text(b"hello world", &password).unwrap();

        assert_eq!(open(text.as_bytes(), &password).unwrap(), b"hello world");
        assert!(open(text.as_bytes(), &SecretString::from("nope")).is_err());
    }

    #[tokio::test]
    async fn test_file_helpers() {
        let tmp = tempfile::TempDir::new().unwrap();
        let path = tmp.path().join("blob.bin");

        write_file(&path, &[1, 2, 3]).await.unwrap();
        assert_eq!(read_file(&path).await.unwrap(), vec![1, 2, 3]);
        assert!(read_file(&tmp.path().join("absent")).await.is_err());
    }
}
