// Path: crates/cli/src/commands/keys.rs

use super::notary::load_keypair;
use anyhow::{anyhow, Result};
use clap::{Parser, Subcommand};
use plight_crypto::{key_store, NotaryKeyPair, NotaryPublicKey};
use std::path::PathBuf;

#[derive(Parser, Debug)]
pub struct KeysArgs {
    #[clap(subcommand)]
    pub command: KeysCommands,
}

#[derive(Subcommand, Debug)]
pub enum KeysCommands {
    /// Generate a new notary keypair.
    Generate {
        /// Write the secret to this file (owner-only) instead of printing it.
        #[clap(long)]
        out: Option<PathBuf>,
    },
    /// Print the public key and key id for an existing secret.
    Public {
        /// Read the secret from this file.
        #[clap(long)]
        key_file: Option<PathBuf>,
        /// Read the secret from this environment variable.
        #[clap(long, default_value = "NOTARY_PRIVATE_KEY")]
        env: String,
    },
}

fn print_public(pk: &NotaryPublicKey) -> Result<()> {
    let [x, y] = pk.to_decimal_pair();
    println!("Key ID:       {}", pk.key_id().map_err(|e| anyhow!("{}", e))?);
    println!("Public Key X: {}", x);
    println!("Public Key Y: {}", y);
    Ok(())
}

pub fn run(args: KeysArgs) -> Result<()> {
    match args.command {
        KeysCommands::Generate { out } => {
            let kp = NotaryKeyPair::generate().map_err(|e| anyhow!("Gen failed: {}", e))?;
            println!("--- New EdDSA-Poseidon (BabyJubJub) Notary Key ---");
            match out {
                Some(path) => {
                    key_store::save_to_file(&path, &kp)?;
                    println!("Secret written to {}", path.display());
                }
                None => println!("Private Key:  {}", kp.private_key().to_hex().as_str()),
            }
            print_public(&kp.public_key())
        }
        KeysCommands::Public { key_file, env } => {
            let kp = load_keypair(key_file.as_ref(), &env)?;
            print_public(&kp.public_key())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_generate_to_file_round_trips_through_public() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("notary.key");
        run(KeysArgs {
            command: KeysCommands::Generate {
                out: Some(path.clone()),
            },
        })
        .unwrap();
        assert!(path.exists());

        let loaded = load_keypair(Some(&path), "PLIGHT_TEST_UNSET_KEY_VAR").unwrap();
        let direct = key_store::load_from_file(&path).unwrap();
        assert_eq!(
            loaded.public_key().to_decimal_pair(),
            direct.public_key().to_decimal_pair()
        );

        // A second generate must not clobber the first key.
        assert!(run(KeysArgs {
            command: KeysCommands::Generate { out: Some(path) },
        })
        .is_err());
    }

    #[test]
    fn test_public_without_a_key_fails() {
        let err = run(KeysArgs {
            command: KeysCommands::Public {
                key_file: None,
                env: "PLIGHT_TEST_UNSET_KEY_VAR".into(),
            },
        })
        .unwrap_err();
        assert!(err.to_string().contains("PLIGHT_TEST_UNSET_KEY_VAR"));
    }
}
