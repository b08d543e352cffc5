//! Illium CLI - keys, signatures, Lurk evaluation and proofs from the shell
//!
//! Every command prints a JSON object on stdout; logs go to stderr.
//! Program and parameter arguments take inline text or `@path` to read a file.

mod config;

use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use illium_core::{CryptoProvider, MessageHash, PublicKey, Secp256k1Provider, SecretKey, Signature};
use illium_lurk::{TaggedValue, TAG_SIZE, VALUE_SIZE};
use illium_zk::{
    LurkEvaluator, ParameterStore, ProgramEvaluator, Proof, ProofEngine, ProofProvider, ProveRequest,
    SetupConfig,
};
use serde_json::{json, Value as Json};
use tracing::{debug, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use config::CliConfig;

#[derive(Parser)]
#[command(name = "illium")]
#[command(about = "Illium wallet keys, signatures and Lurk proofs", long_about = None)]
#[command(version)]
struct Cli {
    /// Config file (defaults to $ILLIUM_CONFIG or the user config dir)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate a secret key, randomly or from a 32-byte seed
    Keygen {
        /// Wallet seed (hex)
        #[arg(long)]
        seed: Option<String>,
    },

    /// Derive the public key for a secret key
    Pubkey {
        /// Secret key (hex)
        #[arg(long)]
        secret: String,

        /// Also print the uncompressed coordinates
        #[arg(long)]
        full: bool,
    },

    /// Sign a 32-byte digest
    Sign {
        /// Secret key (hex)
        #[arg(long)]
        secret: String,

        /// Message digest (hex)
        #[arg(long)]
        digest: String,
    },

    /// Verify a signature over a 32-byte digest
    Verify {
        /// Compressed public key (hex)
        #[arg(long)]
        pubkey: String,

        /// Message digest (hex)
        #[arg(long)]
        digest: String,

        /// Signature r (hex)
        #[arg(long)]
        r: String,

        /// Signature s (hex)
        #[arg(long)]
        s: String,
    },

    /// Commit to an expression
    Commit {
        /// Expression text or @file
        expr: String,
    },

    /// Evaluate a program without proving
    Eval {
        #[command(flatten)]
        input: ProgramArgs,

        /// Log every machine step
        #[arg(long)]
        debug: bool,
    },

    /// Evaluate a program and prove the result
    Prove {
        #[command(flatten)]
        input: ProgramArgs,

        /// Write the raw proof bytes here instead of printing them as hex
        #[arg(long)]
        out: Option<PathBuf>,
    },

    /// Verify a proof against program, public params and expected output
    VerifyProof {
        /// Program text or @file
        #[arg(long)]
        program: String,

        /// Public params text or @file
        #[arg(long, default_value = "")]
        public: String,

        /// Proof as hex, or @file holding raw proof bytes
        #[arg(long)]
        proof: String,

        /// Expected output tag (hex)
        #[arg(long)]
        tag: String,

        /// Expected output value (hex)
        #[arg(long)]
        value: String,
    },

    /// Load the public parameters and show them
    Params,
}

#[derive(clap::Args)]
struct ProgramArgs {
    /// Program text or @file
    #[arg(long)]
    program: String,

    /// Private params text or @file
    #[arg(long, default_value = "")]
    private: String,

    /// Public params text or @file
    #[arg(long, default_value = "")]
    public: String,

    /// Step bound (defaults to the configured value)
    #[arg(long)]
    max_steps: Option<usize>,
}

impl ProgramArgs {
    fn request(&self, config: &CliConfig) -> Result<ProveRequest> {
        Ok(ProveRequest::new(
            read_arg(&self.program)?,
            read_arg(&self.private)?,
            read_arg(&self.public)?,
            self.max_steps.unwrap_or(config.default_max_steps),
        ))
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let config_path = cli.config.clone().unwrap_or_else(CliConfig::default_path);
    let config = CliConfig::load_or_create(&config_path)?;

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| config.log_filter.as_str().into()))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    debug!("Using config {:?}", config_path);

    let output = run(cli.command, &config)?;
    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}

fn run(command: Commands, config: &CliConfig) -> Result<Json> {
    let provider = Secp256k1Provider;
    match command {
        Commands::Keygen { seed } => keygen(&provider, seed.as_deref()),
        Commands::Pubkey { secret, full } => pubkey(&provider, &secret, full),
        Commands::Sign { secret, digest } => sign(&provider, &secret, &digest),
        Commands::Verify {
            pubkey,
            digest,
            r,
            s,
        } => verify(&provider, &pubkey, &digest, &r, &s),
        Commands::Commit { expr } => commit(&expr),
        Commands::Eval { input, debug } => eval(&input.request(config)?, debug),
        Commands::Prove { input, out } => prove(config, &input.request(config)?, out),
        Commands::VerifyProof {
            program,
            public,
            proof,
            tag,
            value,
        } => verify_proof(config, &program, &public, &proof, &tag, &value),
        Commands::Params => params(config),
    }
}

/// Inline text, or the contents of the file after a leading `@`
fn read_arg(arg: &str) -> Result<String> {
    match arg.strip_prefix('@') {
        Some(path) => fs::read_to_string(path).with_context(|| format!("reading {}", path)),
        None => Ok(arg.to_string()),
    }
}

fn decode_hex<const N: usize>(what: &str, s: &str) -> Result<[u8; N]> {
    let bytes = hex::decode(s.trim_start_matches("0x")).with_context(|| format!("{} is not hex", what))?;
    let len = bytes.len();
    bytes
        .try_into()
        .map_err(|_| anyhow::anyhow!("{} must be {} bytes, got {}", what, N, len))
}

fn tagged_json(tagged: &TaggedValue) -> Json {
    json!({
        "tag": hex::encode(tagged.tag),
        "value": hex::encode(tagged.value),
        "kind": tagged.tag_kind().map(|t| t.name()),
    })
}

fn parameter_store(config: &CliConfig) -> ParameterStore {
    let setup = SetupConfig {
        rounds: config.setup_rounds,
        ..SetupConfig::default()
    };
    match &config.params_cache {
        Some(path) => ParameterStore::with_cache(setup, path),
        None => ParameterStore::new(setup),
    }
}

fn proof_engine(config: &CliConfig) -> Result<ProofEngine> {
    let params = parameter_store(config).load()?;
    Ok(ProofEngine::new(params))
}

// ============================================
// Keys and signatures
// ============================================

fn keygen(provider: &impl CryptoProvider, seed: Option<&str>) -> Result<Json> {
    let secret = match seed {
        Some(seed) => provider.secret_key_from_seed(&decode_hex::<32>("seed", seed)?)?,
        None => provider.generate_secret_key()?,
    };
    let public = provider.private_to_public(&secret)?;
    Ok(json!({
        "secret_key": secret.to_hex(),
        "public_key": public.to_hex(),
    }))
}

fn pubkey(provider: &impl CryptoProvider, secret: &str, full: bool) -> Result<Json> {
    let secret = SecretKey::from_hex(secret)?;
    let public = provider.private_to_public(&secret)?;
    let mut out = json!({ "public_key": public.to_hex() });
    if full {
        let point = provider.compressed_to_full(&public)?;
        out["x"] = json!(hex::encode(point.x));
        out["y"] = json!(hex::encode(point.y));
    }
    Ok(out)
}

fn sign(provider: &impl CryptoProvider, secret: &str, digest: &str) -> Result<Json> {
    let secret = SecretKey::from_hex(secret)?;
    let digest = MessageHash::from_hex(digest)?;
    let signature = provider.sign(&secret, &digest)?;
    Ok(json!({
        "r": hex::encode(signature.r),
        "s": hex::encode(signature.s),
    }))
}

fn verify(
    provider: &impl CryptoProvider,
    pubkey: &str,
    digest: &str,
    r: &str,
    s: &str,
) -> Result<Json> {
    let public = PublicKey::from_hex(pubkey)?;
    let digest = MessageHash::from_hex(digest)?;
    let signature = Signature::new(decode_hex("r", r)?, decode_hex("s", s)?);
    Ok(json!({ "valid": provider.verify(&public, &digest, &signature) }))
}

// ============================================
// Lurk and proofs
// ============================================

fn commit(expr: &str) -> Result<Json> {
    let digest = illium_lurk::commit(&read_arg(expr)?)?;
    Ok(json!({ "commitment": hex::encode(digest) }))
}

fn eval(request: &ProveRequest, debug: bool) -> Result<Json> {
    let out = LurkEvaluator.evaluate(request, debug)?;
    let emitted: Vec<String> = out.emitted.iter().map(ToString::to_string).collect();
    Ok(json!({
        "result": out.value.to_string(),
        "output": tagged_json(&out.tagged),
        "iterations": out.iterations,
        "emitted": emitted,
    }))
}

fn prove(config: &CliConfig, request: &ProveRequest, out: Option<PathBuf>) -> Result<Json> {
    let engine = proof_engine(config)?;
    let proved = engine.create_proof(request)?;
    info!(
        "Proved {} iterations, {} proof bytes",
        proved.iterations,
        proved.proof.len()
    );

    let mut result = json!({
        "output": tagged_json(&proved.output),
        "iterations": proved.iterations,
        "size": proved.proof.len(),
    });
    match out {
        Some(path) => {
            fs::write(&path, proved.proof.as_bytes())
                .with_context(|| format!("writing {}", path.display()))?;
            result["proof_file"] = json!(path.display().to_string());
        }
        None => result["proof"] = json!(proved.proof.to_hex()),
    }
    Ok(result)
}

fn verify_proof(
    config: &CliConfig,
    program: &str,
    public: &str,
    proof: &str,
    tag: &str,
    value: &str,
) -> Result<Json> {
    let proof = match proof.strip_prefix('@') {
        Some(path) => Proof::from_bytes(fs::read(path).with_context(|| format!("reading {}", path))?),
        None => Proof::from_hex(proof)?,
    };
    let expected = TaggedValue::new(
        decode_hex::<TAG_SIZE>("tag", tag)?,
        decode_hex::<VALUE_SIZE>("value", value)?,
    );

    let engine = proof_engine(config)?;
    let valid = engine.verify_proof(&read_arg(program)?, &read_arg(public)?, &proof, &expected);
    Ok(json!({ "valid": valid }))
}

fn params(config: &CliConfig) -> Result<Json> {
    let store = parameter_store(config);
    let params = store.load()?;
    let setup = params.config();
    Ok(json!({
        "id": hex::encode(params.id()),
        "rounds": setup.rounds,
        "openings": setup.openings,
        "from_cache": store.setup_runs() == 0,
        "cache": store.cache_path().map(|p| p.display().to_string()),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    fn test_config() -> CliConfig {
        CliConfig {
            params_cache: None,
            default_max_steps: 10_000,
            setup_rounds: 64,
            log_filter: "illium=warn".into(),
        }
    }

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_read_arg_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("prog.lurk");
        fs::write(&path, "(lambda (a b) (+ a b))").unwrap();

        assert_eq!(read_arg("(+ 1 2)").unwrap(), "(+ 1 2)");
        assert_eq!(
            read_arg(&format!("@{}", path.display())).unwrap(),
            "(lambda (a b) (+ a b))"
        );
        assert!(read_arg("@/nonexistent/illium/prog.lurk").is_err());
    }

    #[test]
    fn test_sign_then_verify() {
        let provider = Secp256k1Provider;
        let keys = keygen(&provider, Some(&"07".repeat(32))).unwrap();
        let secret = keys["secret_key"].as_str().unwrap();
        let public = keys["public_key"].as_str().unwrap();

        let digest = "ab".repeat(32);
        let sig = sign(&provider, secret, &digest).unwrap();
        let checked = verify(
            &provider,
            public,
            &digest,
            sig["r"].as_str().unwrap(),
            sig["s"].as_str().unwrap(),
        )
        .unwrap();
        assert_eq!(checked["valid"], json!(true));

        let full = pubkey(&provider, secret, true).unwrap();
        assert_eq!(full["public_key"].as_str(), Some(public));
        assert_eq!(full["x"].as_str().map(str::len), Some(64));
    }

    #[test]
    fn test_bad_seed_length() {
        assert!(keygen(&Secp256k1Provider, Some("0102")).is_err());
    }

    #[test]
    fn test_eval_reports_output() {
        let config = test_config();
        let args = ProgramArgs {
            program: "(lambda (a b) (begin (emit a) (+ a b)))".into(),
            private: "2".into(),
            public: "3".into(),
            max_steps: None,
        };
        let out = eval(&args.request(&config).unwrap(), false).unwrap();
        assert_eq!(out["result"], json!("5"));
        assert_eq!(out["output"]["kind"], json!("num"));
        assert_eq!(out["emitted"], json!(["2"]));
    }

    #[test]
    fn test_eval_ignores_params_cache() {
        let dir = tempfile::tempdir().unwrap();
        let config = CliConfig {
            params_cache: Some(dir.path().join("missing").join("params.bin")),
            ..test_config()
        };
        let args = ProgramArgs {
            program: "(lambda (a b) (* a b))".into(),
            private: "6".into(),
            public: "7".into(),
            max_steps: Some(usize::MAX),
        };
        let out = eval(&args.request(&config).unwrap(), false).unwrap();
        assert_eq!(out["result"], json!("42"));
        assert!(!dir.path().join("missing").exists());

        let looping = ProgramArgs {
            program: "(lambda (a b) (letrec ((f (lambda (x) (f x)))) (f a)))".into(),
            private: "1".into(),
            public: "2".into(),
            max_steps: Some(50),
        };
        assert!(eval(&looping.request(&config).unwrap(), false).is_err());
    }

    #[test]
    fn test_prove_then_verify_proof() {
        let config = test_config();
        let args = ProgramArgs {
            program: "(lambda (secret target) (= (* secret secret) target))".into(),
            private: "9".into(),
            public: "81".into(),
            max_steps: None,
        };
        let proved = prove(&config, &args.request(&config).unwrap(), None).unwrap();
        let tag = proved["output"]["tag"].as_str().unwrap();
        let value = proved["output"]["value"].as_str().unwrap();
        let proof = proved["proof"].as_str().unwrap();

        let ok = verify_proof(&config, &args.program, "81", proof, tag, value).unwrap();
        assert_eq!(ok["valid"], json!(true));
        let bad = verify_proof(&config, &args.program, "80", proof, tag, value).unwrap();
        assert_eq!(bad["valid"], json!(false));
    }

    #[test]
    fn test_params_uses_cache() {
        let dir = tempfile::tempdir().unwrap();
        let config = CliConfig {
            params_cache: Some(dir.path().join("params.bin")),
            ..test_config()
        };
        let first = params(&config).unwrap();
        assert_eq!(first["from_cache"], json!(false));
        let second = params(&config).unwrap();
        assert_eq!(second["from_cache"], json!(true));
        assert_eq!(first["id"], second["id"]);
    }
}
