//! Dchat command-line tool.
//!
//! # Usage
//!
//! ```bash
//! # Create (or show) the key pair for an identity and print its public key
//! dchat --identity 0xa11ce keygen > alice.pem
//!
//! # Encrypt for Alice, reading the message from stdin
//! echo "hello" | dchat encrypt --recipient alice.pem > envelope.json
//!
//! # Decrypt as Alice
//! dchat --identity 0xa11ce decrypt --envelope envelope.json
//!
//! # Digest an envelope the way it is anchored
//! dchat digest --file envelope.json
//! ```
//!
//! Results go to stdout, logs to stderr. `RUST_LOG` overrides `--log-level`.

use std::{
    fs,
    io::{self, Read, Write},
    path::{Path, PathBuf},
};

use clap::{Parser, Subcommand};
use dchat_core::E2eService;
use dchat_crypto::{EncryptedEnvelope, KeyConfig, digest};
use dchat_keystore::{MemoryKeyStore, RedbKeyStore};
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Dchat message encryption tool
#[derive(Parser, Debug)]
#[command(name = "dchat")]
#[command(about = "Key management and end-to-end message encryption for Dchat")]
#[command(version)]
struct Args {
    /// Key store database file
    #[arg(long, global = true, default_value = "dchat-keys.redb")]
    store: PathBuf,

    /// Identity whose key pair to use (wallet address)
    #[arg(long, global = true, default_value = "local")]
    identity: String,

    /// RSA modulus size for new key pairs
    #[arg(long, global = true, default_value_t = 2048)]
    key_bits: usize,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, global = true, default_value = "info")]
    log_level: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Create the identity's key pair if absent and print its public key
    Keygen,

    /// Replace the identity's key pair and print the new public key
    Rotate,

    /// Delete the identity's key pair
    Reset,

    /// Print the identity's public key
    ExportPublicKey,

    /// Encrypt a message for a recipient and print the envelope JSON
    Encrypt {
        /// Recipient public key (PEM file)
        #[arg(long)]
        recipient: PathBuf,

        /// Message text; read from stdin if omitted
        #[arg(long)]
        message: Option<String>,
    },

    /// Decrypt an envelope with the identity's key pair
    Decrypt {
        /// Envelope JSON file, or `-` for stdin
        #[arg(long)]
        envelope: String,
    },

    /// Print the SHA-256 digest of a file or stdin
    Digest {
        /// Input file; stdin if omitted
        #[arg(long)]
        file: Option<PathBuf>,
    },
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&args.log_level));

    tracing_subscriber::registry().with(fmt::layer().with_writer(io::stderr)).with(filter).init();

    let mut out = io::stdout().lock();
    run(&args, &mut out)
}

fn run(args: &Args, out: &mut impl Write) -> Result<(), Box<dyn std::error::Error>> {
    let config = KeyConfig { modulus_bits: args.key_bits };

    match &args.command {
        Command::Keygen => {
            let service = open_service(&args.store, config)?;
            let key_pair = service.generate_or_load_key_pair(&args.identity)?;
            writeln!(out, "{}", service.export_public_key(&key_pair)?)?;
        },
        Command::Rotate => {
            let service = open_service(&args.store, config)?;
            let key_pair = service.rotate_key_pair(&args.identity)?;
            writeln!(out, "{}", service.export_public_key(&key_pair)?)?;
        },
        Command::Reset => {
            let service = open_service(&args.store, config)?;
            if service.reset_identity(&args.identity)? {
                writeln!(out, "removed key pair for {}", args.identity)?;
            } else {
                writeln!(out, "no key pair for {}", args.identity)?;
            }
        },
        Command::ExportPublicKey => {
            let service = open_service(&args.store, config)?;
            let key_pair = service.key_manager().load(&args.identity)?.ok_or_else(|| {
                format!("no key pair for {}; run `dchat keygen` first", args.identity)
            })?;
            writeln!(out, "{}", service.export_public_key(&key_pair)?)?;
        },
        Command::Encrypt { recipient, message } => {
            let recipient_pem = fs::read_to_string(recipient)?;
            let plaintext = match message {
                Some(text) => text.clone(),
                None => read_stdin_text()?,
            };

            // Encrypting needs no key pair of our own, so leave the store untouched
            let service = E2eService::new(MemoryKeyStore::new(), config)?;
            let envelope = service.encrypt_for_recipient(&plaintext, &recipient_pem)?;
            writeln!(out, "{}", envelope.to_json())?;
        },
        Command::Decrypt { envelope } => {
            let wire =
                if envelope == "-" { read_stdin_text()? } else { fs::read_to_string(envelope)? };
            let envelope = EncryptedEnvelope::from_json(wire.trim())?;

            let service = open_service(&args.store, config)?;
            let key_pair = service
                .key_manager()
                .load(&args.identity)?
                .ok_or_else(|| format!("no key pair for {}", args.identity))?;

            writeln!(out, "{}", service.decrypt_envelope(&envelope, &key_pair)?)?;
        },
        Command::Digest { file } => {
            let bytes = match file {
                Some(path) => fs::read(path)?,
                None => {
                    let mut bytes = Vec::new();
                    io::stdin().read_to_end(&mut bytes)?;
                    bytes
                },
            };
            writeln!(out, "{}", digest(&bytes))?;
        },
    }

    Ok(())
}

fn open_service(
    path: &Path,
    config: KeyConfig,
) -> Result<E2eService<RedbKeyStore>, Box<dyn std::error::Error>> {
    let store = RedbKeyStore::open(path)?;
    tracing::debug!(path = %path.display(), "opened key store");
    Ok(E2eService::new(store, config)?)
}

fn read_stdin_text() -> io::Result<String> {
    let mut text = String::new();
    io::stdin().read_to_string(&mut text)?;
    Ok(text)
}
