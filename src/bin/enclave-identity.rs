use std::io::{self, BufRead, Read, Write};
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{bail, Context};
use clap::{Parser, Subcommand, ValueEnum};
use clap_verbosity_flag::{Verbosity, WarnLevel};
use tracing::{error, info, warn};

use enclave_identity::{
    adapters::SoftwareEnclave,
    api::{AccessPolicy, KeyTag, Pin, Slot},
    error::PolicyError,
    logic::{from_hex, to_hex},
    ports::HardwareKeyStore,
    verify_signature, IdentityConfig, IdentityStore, SigningEngine, DEFAULT_TAG,
};

#[derive(Parser, Debug)]
#[command(name = "enclave-identity")]
#[command(about = "Hardware-backed P-256 signing identity", version)]
pub struct Cli {
    #[command(flatten)]
    pub verbosity: Verbosity<WarnLevel>,

    /// Tag the identity key is stored under
    #[arg(long, global = true)]
    pub tag: Option<KeyTag>,

    /// Key store holding the identity
    #[arg(long, global = true, value_enum, default_value_t = BackendArg::Software)]
    pub backend: BackendArg,

    /// Access policy attached to newly generated keys
    #[arg(long, global = true, value_enum, default_value_t = PolicyArg::Unlocked)]
    pub policy: PolicyArg,

    /// PIV slot for the piv backend (9a, 9c, 9d, 9e or their names)
    #[arg(long, global = true, default_value = "signature")]
    pub slot: Slot,

    /// PIV PIN for the piv backend
    #[arg(long, global = true, env = "ENCLAVE_IDENTITY_PIN", hide_env_values = true)]
    pub pin: Option<Pin>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Generate a new identity, printing its public key as hex
    Generate {
        /// Replace an existing identity; its signatures stop verifying
        #[arg(long)]
        force: bool,
    },

    /// Print the public key of the current identity as hex
    PublicKey,

    /// Sign MESSAGE (or stdin), printing the DER signature as hex
    Sign {
        message: Option<String>,

        /// Enroll an identity first when none exists, and print its public
        /// key as hex on a second line
        #[arg(long)]
        generate_if_missing: bool,
    },

    /// Check a hex signature over MESSAGE (or stdin) against a hex public key
    Verify {
        #[arg(long)]
        public_key: String,

        #[arg(long)]
        signature: String,

        message: Option<String>,
    },

    /// Generate, sign "hello", then verify "hello" and "hellp" on a
    /// throwaway software identity
    Demo,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum BackendArg {
    Software,
    Piv,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum PolicyArg {
    Unlocked,
    Presence,
}

impl From<PolicyArg> for AccessPolicy {
    fn from(arg: PolicyArg) -> Self {
        match arg {
            PolicyArg::Unlocked => AccessPolicy::UnlockedDevice,
            PolicyArg::Presence => AccessPolicy::UnlockedDeviceWithPresence,
        }
    }
}

/// Exit code for input that fails validation before any crypto runs
const EXIT_INVALID_INPUT: u8 = 2;

fn main() -> anyhow::Result<ExitCode> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_writer(io::stderr)
        .with_max_level(cli.verbosity)
        .init();

    let config = IdentityConfig::new(cli.tag.clone().unwrap_or(DEFAULT_TAG))
        .with_policy(cli.policy.into());

    match cli.command {
        Commands::Verify {
            public_key,
            signature,
            message,
        } => verify(&public_key, &signature, message),
        Commands::Demo => demo(),
        command => match cli.backend {
            BackendArg::Software => {
                let enclave = SoftwareEnclave::new().with_presence_verifier(prompt_presence);
                run(Arc::new(IdentityStore::new(enclave, config)), command, true)
            }
            BackendArg::Piv => run_piv(config, cli.slot, cli.pin, command),
        },
    }
}

#[cfg(feature = "piv")]
fn run_piv(
    config: IdentityConfig,
    slot: Slot,
    pin: Option<Pin>,
    command: Commands,
) -> anyhow::Result<ExitCode> {
    let store = enclave_identity::open_piv_identity(config, slot, pin)
        .context("failed to open YubiKey")?;
    run(store, command, false)
}

#[cfg(not(feature = "piv"))]
fn run_piv(
    _config: IdentityConfig,
    _slot: Slot,
    _pin: Option<Pin>,
    _command: Commands,
) -> anyhow::Result<ExitCode> {
    bail!("this build has no PIV support; rebuild with --features piv")
}

/// `ephemeral` is set for key stores that lose their keys when the process exits
fn run<K: HardwareKeyStore>(
    store: Arc<IdentityStore<K>>,
    command: Commands,
    ephemeral: bool,
) -> anyhow::Result<ExitCode> {
    match command {
        Commands::Generate { force } => {
            if !force && store.retrieve().is_some() {
                bail!(
                    "an identity already exists for tag {}; pass --force to replace it",
                    store.tag()
                );
            }

            let handle = store.generate().context("failed to generate identity")?;
            let public = store
                .export_public_key(&handle)
                .context("generated identity has no exportable public key")?;
            info!("Generated identity {}", public.fingerprint());
            if ephemeral {
                warn!("The software backend discards this identity when the command exits");
            }
            println!("{}", to_hex(public.as_bytes()));
        }

        Commands::PublicKey => {
            let public = store
                .current_public_key()
                .with_context(|| no_identity(store.tag(), ephemeral))?;
            println!("{}", to_hex(public.as_bytes()));
        }

        Commands::Sign {
            message,
            generate_if_missing,
        } => {
            let message = read_message(message)?;
            if message.is_empty() {
                bail!("refusing to sign an empty message");
            }

            let handle = if generate_if_missing {
                store
                    .retrieve_or_generate()
                    .context("failed to enroll identity")?
            } else {
                store
                    .retrieve()
                    .with_context(|| no_identity(store.tag(), ephemeral))?
            };

            let signature = SigningEngine::new(Arc::clone(&store))
                .sign(&message, Some(&handle))
                .context("signing failed: key unavailable or access denied")?;
            println!("{}", to_hex(signature.as_bytes()));

            if generate_if_missing {
                let public = store
                    .export_public_key(&handle)
                    .context("signing identity has no exportable public key")?;
                println!("{}", to_hex(public.as_bytes()));
            }
        }

        Commands::Verify {
            public_key,
            signature,
            message,
        } => return verify(&public_key, &signature, message),

        Commands::Demo => return demo(),
    }

    Ok(ExitCode::SUCCESS)
}

fn no_identity(tag: &KeyTag, ephemeral: bool) -> String {
    if ephemeral {
        format!(
            "no identity enrolled for tag {}; the software backend keeps keys only \
             for one command, so use `sign --generate-if-missing`, `demo` or `--backend piv`",
            tag
        )
    } else {
        format!("no identity enrolled for tag {}", tag)
    }
}

fn verify(public_key: &str, signature: &str, message: Option<String>) -> anyhow::Result<ExitCode> {
    let (Some(public_key), Some(signature)) = (from_hex(public_key), from_hex(signature)) else {
        error!("Public key and signature must be hex encoded");
        return Ok(ExitCode::from(EXIT_INVALID_INPUT));
    };
    let message = read_message(message)?;

    if verify_signature(&message, &public_key, &signature) {
        println!("valid");
        Ok(ExitCode::SUCCESS)
    } else {
        println!("invalid");
        Ok(ExitCode::FAILURE)
    }
}

fn demo() -> anyhow::Result<ExitCode> {
    let store = Arc::new(IdentityStore::new(
        SoftwareEnclave::new(),
        IdentityConfig::default(),
    ));
    let engine = SigningEngine::new(Arc::clone(&store));

    let handle = store.generate().context("failed to generate identity")?;
    let public = store
        .export_public_key(&handle)
        .context("generated identity has no exportable public key")?;
    println!("public key: {}", to_hex(public.as_bytes()));

    let signature = engine
        .sign(b"hello", Some(&handle))
        .context("signing \"hello\" failed")?;
    println!("signature:  {}", to_hex(signature.as_bytes()));

    let genuine = verify_signature(b"hello", public.as_bytes(), signature.as_bytes());
    let tampered = verify_signature(b"hellp", public.as_bytes(), signature.as_bytes());
    println!("verify \"hello\": {}", genuine);
    println!("verify \"hellp\": {}", tampered);

    if !genuine || tampered {
        bail!("signature check produced an unexpected result");
    }
    Ok(ExitCode::SUCCESS)
}

fn read_message(message: Option<String>) -> anyhow::Result<Vec<u8>> {
    match message {
        Some(message) => Ok(message.into_bytes()),
        None => {
            let mut data = Vec::new();
            io::stdin()
                .read_to_end(&mut data)
                .context("failed to read message from stdin")?;
            Ok(data)
        }
    }
}

/// Terminal stand-in for a biometric prompt; needs MESSAGE on the command line
fn prompt_presence(reason: &str) -> Result<(), PolicyError> {
    eprint!("{} [y/N] ", reason);
    io::stderr().flush().map_err(|_| PolicyError::Cancelled)?;

    let mut answer = String::new();
    match io::stdin().lock().read_line(&mut answer) {
        Ok(0) | Err(_) => Err(PolicyError::Cancelled),
        Ok(_) if answer.trim().eq_ignore_ascii_case("y") => Ok(()),
        Ok(_) => Err(PolicyError::Denied),
    }
}

#[cfg(test)]
mod tests {
    use assert_cmd::Command;

    #[test]
    fn test_cli_version_parameter() {
        let mut cmd = Command::cargo_bin("enclave-identity").unwrap();
        let assert = cmd.arg("--version").assert();
        assert.success();
    }

    #[test]
    fn test_cli_demo() {
        let mut cmd = Command::cargo_bin("enclave-identity").unwrap();
        let output = cmd.arg("demo").assert().success().get_output().clone();
        let stdout = String::from_utf8_lossy(&output.stdout);
        assert!(stdout.contains("verify \"hello\": true"));
        assert!(stdout.contains("verify \"hellp\": false"));
    }

    #[test]
    fn test_cli_sign_generate_if_missing() {
        let mut cmd = Command::cargo_bin("enclave-identity").unwrap();
        let output = cmd
            .args(["sign", "hello", "--generate-if-missing"])
            .assert()
            .success()
            .get_output()
            .clone();
        let stdout = String::from_utf8_lossy(&output.stdout);
        let signature = stdout.lines().next().unwrap();
        // DER-encoded P-256 signature starts with a SEQUENCE tag
        assert!(signature.starts_with("30"));
        assert!(signature.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn test_cli_sign_output_verifies() {
        let mut cmd = Command::cargo_bin("enclave-identity").unwrap();
        let output = cmd
            .args(["sign", "hello", "--generate-if-missing"])
            .assert()
            .success()
            .get_output()
            .clone();
        let stdout = String::from_utf8_lossy(&output.stdout);
        let lines: Vec<&str> = stdout.lines().collect();
        assert_eq!(lines.len(), 2, "signature then public key: {}", stdout);
        let (signature, public_key) = (lines[0], lines[1]);
        assert!(public_key.starts_with("04"));

        let mut cmd = Command::cargo_bin("enclave-identity").unwrap();
        let output = cmd
            .args([
                "verify",
                "--public-key",
                public_key,
                "--signature",
                signature,
                "hello",
            ])
            .assert()
            .success()
            .get_output()
            .clone();
        assert_eq!(String::from_utf8_lossy(&output.stdout).trim(), "valid");

        let mut cmd = Command::cargo_bin("enclave-identity").unwrap();
        cmd.args([
            "verify",
            "--public-key",
            public_key,
            "--signature",
            signature,
            "hellp",
        ])
        .assert()
        .code(1);
    }

    #[test]
    fn test_cli_sign_without_identity_explains_software_backend() {
        let mut cmd = Command::cargo_bin("enclave-identity").unwrap();
        let output = cmd.args(["sign", "hello"]).assert().failure().get_output().clone();
        let stderr = String::from_utf8_lossy(&output.stderr);
        assert!(stderr.contains("no identity enrolled"));
        assert!(stderr.contains("--generate-if-missing"));
    }

    #[test]
    fn test_cli_sign_empty_message_rejected() {
        let mut cmd = Command::cargo_bin("enclave-identity").unwrap();
        cmd.args(["sign", "--generate-if-missing"])
            .write_stdin("")
            .assert()
            .failure();
    }

    #[test]
    fn test_cli_public_key_without_identity_fails() {
        let mut cmd = Command::cargo_bin("enclave-identity").unwrap();
        let output = cmd.arg("public-key").assert().failure().get_output().clone();
        let stderr = String::from_utf8_lossy(&output.stderr);
        assert!(stderr.contains("software backend keeps keys only"));
    }

    #[test]
    fn test_cli_generate_prints_sec1_point() {
        let mut cmd = Command::cargo_bin("enclave-identity").unwrap();
        let output = cmd.arg("generate").assert().success().get_output().clone();
        let stdout = String::from_utf8_lossy(&output.stdout);
        let trimmed = stdout.trim();
        assert_eq!(trimmed.len(), 130, "65-byte SEC1 point as hex");
        assert!(trimmed.starts_with("04"));
    }

    #[test]
    fn test_cli_verify_malformed_hex() {
        let mut cmd = Command::cargo_bin("enclave-identity").unwrap();
        cmd.args([
            "verify",
            "--public-key",
            "not hex",
            "--signature",
            "3045",
            "hello",
        ])
        .assert()
        .code(2);
    }

    #[test]
    fn test_cli_verify_invalid_signature() {
        let public_key = format!("04{}", "11".repeat(64));
        let mut cmd = Command::cargo_bin("enclave-identity").unwrap();
        cmd.args([
            "verify",
            "--public-key",
            &public_key,
            "--signature",
            "3006020101020101",
            "hello",
        ])
        .assert()
        .code(1);
    }

    #[test]
    fn test_cli_invalid_tag_rejected() {
        let mut cmd = Command::cargo_bin("enclave-identity").unwrap();
        cmd.args(["--tag", "", "public-key"]).assert().failure();
    }

    #[cfg(not(feature = "piv"))]
    #[test]
    fn test_cli_piv_backend_unavailable() {
        let mut cmd = Command::cargo_bin("enclave-identity").unwrap();
        cmd.args(["--backend", "piv", "public-key"]).assert().failure();
    }

    #[test]
    #[cfg_attr(not(feature = "hardware-tests"), ignore)] // Requires YubiKey hardware - enable with: --features hardware-tests
    fn test_cli_piv_generate_then_sign() {
        let mut cmd = Command::cargo_bin("enclave-identity").unwrap();
        let output = cmd
            .args(["--backend", "piv", "generate", "--force"])
            .output()
            .unwrap();
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            assert!(stderr.contains("YubiKey") || stderr.contains("identity"));
            return;
        }

        let mut cmd = Command::cargo_bin("enclave-identity").unwrap();
        cmd.args(["--backend", "piv", "sign", "hello"])
            .assert()
            .success();
    }
}
