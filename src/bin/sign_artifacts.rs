//! Signing utility for HeartVerse model bundles.
//!
//! Two subcommands:
//!
//! ```bash
//! sign_artifacts keygen --out-seed <path> [--out-pub <path>] [--force]
//! sign_artifacts sign <artifact_dir> [--seed <path>]
//! ```
//!
//! `keygen` writes a base64 Ed25519 seed (0600 on Unix) and optionally the
//! base64 public key. `sign` hashes every bundle file into `manifest.json`
//! and writes the raw 64-byte signature over it to `artifacts.sig`.
//!
//! The seed for `sign` comes from `--seed` or
//! `HEARTVERSE_ARTIFACT_SIGNING_KEY_B64_FILE`. Seed material is zeroized
//! after use.

use std::collections::BTreeMap;
use std::fs;
use std::io::Write;
#[cfg(unix)]
use std::os::unix::fs::OpenOptionsExt;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use anyhow::{bail, Context, Result};
use base64::engine::general_purpose;
use base64::Engine;
use ed25519_dalek::{Signature, Signer, SigningKey};
use rand::rngs::OsRng;
use rand::RngCore;
use zeroize::{Zeroize, ZeroizeOnDrop, Zeroizing};

use heartverse::adapters::artifacts::{
    sha256_hex, ArtifactManifest, ARTIFACT_FILES, MANIFEST_FILE, MANIFEST_VERSION, SIGNATURE_FILE,
};

const SEED_FILE_ENV: &str = "HEARTVERSE_ARTIFACT_SIGNING_KEY_B64_FILE";

const USAGE: &str = "Usage:\n  sign_artifacts keygen --out-seed <path> [--out-pub <path>] [--force]\n  sign_artifacts sign <artifact_dir> [--seed <path>]";

#[derive(Zeroize, ZeroizeOnDrop)]
struct Seed([u8; 32]);

fn to_hex(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{b:02x}")).collect()
}

fn unix_now() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs() as i64)
        .unwrap_or(0)
}

fn read_seed(path: &Path) -> Result<Seed> {
    let content = Zeroizing::new(
        fs::read_to_string(path).with_context(|| format!("Failed reading seed file {path:?}"))?,
    );
    let raw = Zeroizing::new(
        general_purpose::STANDARD
            .decode(content.trim())
            .context("Invalid base64 in signing seed")?,
    );
    if raw.len() != 32 {
        bail!(
            "Signing seed must be 32 bytes after base64 decode (got {})",
            raw.len()
        );
    }

    let mut seed = Seed([0u8; 32]);
    seed.0.copy_from_slice(&raw);
    Ok(seed)
}

fn write_file(path: &Path, contents: &[u8], mode: u32, force: bool) -> Result<()> {
    if path.exists() && !force {
        bail!("Refusing to overwrite existing file {path:?}. Use --force.");
    }
    if let Some(parent) = path.parent() {
        let _ = fs::create_dir_all(parent);
    }

    let mut opts = fs::OpenOptions::new();
    opts.write(true).create(true).truncate(true);
    #[cfg(unix)]
    {
        opts.mode(mode);
    }
    #[cfg(not(unix))]
    let _ = mode;

    let mut file = opts
        .open(path)
        .with_context(|| format!("Failed to open {path:?}"))?;
    file.write_all(contents)?;
    file.write_all(b"\n")?;
    Ok(())
}

fn keygen(mut args: impl Iterator<Item = String>) -> Result<()> {
    let mut out_seed: Option<PathBuf> = None;
    let mut out_pub: Option<PathBuf> = None;
    let mut force = false;

    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--out-seed" => out_seed = Some(PathBuf::from(args.next().context(USAGE)?)),
            "--out-pub" => out_pub = Some(PathBuf::from(args.next().context(USAGE)?)),
            "--force" => force = true,
            _ => bail!("Unknown arg: {arg}\n{USAGE}"),
        }
    }
    let out_seed = out_seed.context(USAGE)?;

    // Check both targets before writing either.
    for path in std::iter::once(&out_seed).chain(out_pub.as_ref()) {
        if path.exists() && !force {
            bail!("Refusing to overwrite existing file {path:?}. Use --force.");
        }
    }

    let mut seed = Seed([0u8; 32]);
    OsRng.fill_bytes(&mut seed.0);

    let signing_key = SigningKey::from_bytes(&seed.0);
    let verifying_key = signing_key.verifying_key();

    let seed_b64 = Zeroizing::new(general_purpose::STANDARD.encode(seed.0));
    let pub_b64 = general_purpose::STANDARD.encode(verifying_key.as_bytes());

    write_file(&out_seed, seed_b64.as_bytes(), 0o600, force)?;
    println!("Wrote signing seed (base64) to {out_seed:?}");

    if let Some(pub_path) = &out_pub {
        // Public key is non-secret; allow read access.
        write_file(pub_path, pub_b64.as_bytes(), 0o644, force)?;
        println!("Wrote public key (base64) to {pub_path:?}");
    }

    // Print only non-secret material.
    println!("PUBKEY (hex)={}", to_hex(verifying_key.as_bytes()));
    Ok(())
}

fn sign(mut args: impl Iterator<Item = String>) -> Result<()> {
    let mut dir: Option<PathBuf> = None;
    let mut seed_path: Option<PathBuf> = std::env::var(SEED_FILE_ENV)
        .ok()
        .map(|p| PathBuf::from(p.trim()));

    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--seed" => seed_path = Some(PathBuf::from(args.next().context(USAGE)?)),
            _ if arg.starts_with("--") => bail!("Unknown arg: {arg}\n{USAGE}"),
            _ if dir.is_none() => dir = Some(PathBuf::from(arg)),
            _ => bail!(USAGE),
        }
    }
    let dir = dir.context(USAGE)?;
    let seed_path = seed_path
        .with_context(|| format!("Missing signing seed. Pass --seed or set {SEED_FILE_ENV}."))?;

    let seed = read_seed(&seed_path)?;
    let signing_key = SigningKey::from_bytes(&seed.0);
    drop(seed);
    let verifying_key = signing_key.verifying_key();

    let mut files = BTreeMap::new();
    for file in ARTIFACT_FILES {
        let path = dir.join(file);
        let bytes = fs::read(&path).with_context(|| format!("Failed to read {path:?}"))?;
        files.insert(file.to_string(), sha256_hex(&bytes));
    }

    let manifest = ArtifactManifest {
        version: MANIFEST_VERSION,
        created_at: unix_now(),
        files,
    };
    let manifest_bytes =
        serde_json::to_vec_pretty(&manifest).context("Failed to serialize manifest")?;

    let manifest_path = dir.join(MANIFEST_FILE);
    fs::write(&manifest_path, &manifest_bytes)
        .with_context(|| format!("Failed to write {manifest_path:?}"))?;

    let signature: Signature = signing_key.sign(&manifest_bytes);
    let sig_path = dir.join(SIGNATURE_FILE);
    fs::write(&sig_path, signature.to_bytes())
        .with_context(|| format!("Failed to write {sig_path:?}"))?;

    println!("Signed manifest: {manifest_path:?}");
    println!("Wrote signature: {sig_path:?}");
    println!(
        "PUBKEY (base64)={}",
        general_purpose::STANDARD.encode(verifying_key.as_bytes())
    );
    Ok(())
}

fn main() -> Result<()> {
    let mut args = std::env::args().skip(1);
    match args.next().as_deref() {
        Some("keygen") => keygen(args),
        Some("sign") => sign(args),
        Some("-h" | "--help") => {
            println!("{USAGE}");
            Ok(())
        }
        _ => bail!(USAGE),
    }
}
