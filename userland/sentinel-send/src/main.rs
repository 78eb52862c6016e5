//! `sentinel-send` — encrypts and decrypts files in the SENTINAL
//! container format (`spec.md` §6), the hosted counterpart to
//! `original_source/userland/sentinal_send/src/sentinal_send.c`. Classic
//! classification/clearance gate, AES-256-CBC payload, `clap` CLI in the
//! teacher's `sisctl` daemon style (`anyhow::Result` at the boundary,
//! one small module per concern).

mod container;
mod crypto;
mod error;

use anyhow::{bail, Context, Result};
use clap::Parser;
use container::{Header, IV_SIZE, SALT_SIZE};
use error::SendError;
use rand::RngCore;
use std::fs;
use std::path::PathBuf;

/// Pentagon-level secure file transfer tool.
#[derive(Parser, Debug)]
#[command(name = "sentinel-send", version)]
struct Cli {
    /// Encrypt the input file.
    #[arg(short = 'e', long, conflicts_with = "decrypt")]
    encrypt: bool,

    /// Decrypt the input file.
    #[arg(short = 'd', long)]
    decrypt: bool,

    /// Input file path.
    #[arg(short, long)]
    input: PathBuf,

    /// Output file path.
    #[arg(short, long)]
    output: PathBuf,

    /// Encryption password. Prompted for interactively when omitted.
    #[arg(short, long)]
    password: Option<String>,

    /// Classification level of the payload (0..=4), only meaningful for -e.
    #[arg(short = 'c', long, default_value_t = 4)]
    classification: u8,

    /// Caller's security clearance (0..=4).
    #[arg(short = 'u', long, default_value_t = 0)]
    clearance: u8,

    /// Overwrite the output file if it already exists.
    #[arg(short, long)]
    force: bool,

    /// Print progress as the file is processed.
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    if !cli.encrypt && !cli.decrypt {
        bail!("must specify either --encrypt or --decrypt");
    }

    let password = match &cli.password {
        Some(p) => p.clone(),
        None => rpassword::prompt_password("Enter encryption password: ")?,
    };

    if cli.output.exists() && !cli.force {
        bail!("output file {:?} already exists; pass --force to overwrite", cli.output);
    }

    if cli.encrypt {
        encrypt_file(&cli, &password)
    } else {
        decrypt_file(&cli, &password)
    }
}

fn encrypt_file(cli: &Cli, password: &str) -> Result<()> {
    if cli.classification > 4 {
        bail!("classification {} is out of range (0..=4)", cli.classification);
    }
    if cli.clearance < cli.classification {
        bail!(SendError::InsufficientClearance { clearance: cli.clearance, required: cli.classification });
    }

    let plaintext = fs::read(&cli.input).with_context(|| format!("reading {:?}", cli.input))?;

    let mut rng = rand::thread_rng();
    let mut salt = [0u8; SALT_SIZE];
    let mut iv = [0u8; IV_SIZE];
    rng.fill_bytes(&mut salt);
    rng.fill_bytes(&mut iv);

    let mut key = crypto::derive_key(password, &salt);
    let payload_checksum = container::rolling_checksum(&plaintext);
    let ciphertext = crypto::encrypt(&key, &iv, &plaintext);
    crypto::wipe_key(&mut key);

    let header = Header::new(cli.classification, salt, iv, plaintext.len() as u64, payload_checksum)?;

    let mut out = Vec::with_capacity(container::HEADER_SIZE + ciphertext.len());
    out.extend_from_slice(&header.to_bytes());
    out.extend_from_slice(&ciphertext);
    fs::write(&cli.output, &out).with_context(|| format!("writing {:?}", cli.output))?;

    if cli.verbose {
        println!(
            "[ENCRYPT] {} bytes -> {} ({})",
            plaintext.len(),
            cli.output.display(),
            header.classification_name()
        );
    }
    Ok(())
}

fn decrypt_file(cli: &Cli, password: &str) -> Result<()> {
    let raw = fs::read(&cli.input).with_context(|| format!("reading {:?}", cli.input))?;
    let header = Header::from_bytes(&raw)?;

    if cli.clearance < header.classification {
        bail!(SendError::InsufficientClearance { clearance: cli.clearance, required: header.classification });
    }

    let ciphertext = &raw[container::HEADER_SIZE..];
    if ciphertext.len() % 16 != 0 {
        bail!(SendError::UnalignedCiphertext);
    }

    let mut key = crypto::derive_key(password, &header.salt);
    let plaintext = crypto::decrypt(&key, &header.iv, ciphertext)
        .map_err(|_| SendError::PayloadChecksumMismatch)?;
    crypto::wipe_key(&mut key);

    if container::rolling_checksum(&plaintext) != header.payload_checksum
        || plaintext.len() as u64 != header.original_length
    {
        bail!(SendError::PayloadChecksumMismatch);
    }

    fs::write(&cli.output, &plaintext).with_context(|| format!("writing {:?}", cli.output))?;

    if cli.verbose {
        println!("[DECRYPT] {} bytes -> {}", plaintext.len(), cli.output.display());
    }
    Ok(())
}
