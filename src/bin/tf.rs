//! `tf` — a small command-line harness for exercising the title-formatting
//! engine by hand (§4.6/§4.7 of the design spec).

use std::collections::HashMap;
use std::fs;
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{anyhow, Context, Result};
use clap::{Parser, Subcommand};
use colored::Colorize;

use titlefmt::collab::MapTrack;
use titlefmt::{compile, evaluate, EngineConfig, EvalContext};

#[derive(Parser)]
#[command(name = "tf", about = "Compile and render title-formatting scripts")]
struct Cli {
    /// Path to a TOML config file overriding the engine's default tunables.
    #[arg(long, global = true)]
    config: Option<String>,

    /// Print the parsed config and any field substitutions before running.
    #[arg(long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Render a script against an ad-hoc track built from --field pairs.
    Render {
        script: String,

        /// A `key=value` metadata pair; may be repeated.
        #[arg(long = "field", value_name = "KEY=VALUE")]
        fields: Vec<String>,
    },
    /// Compile a script and print its bytecode as hex.
    Compile { script: String },
}

fn load_config(path: &Option<String>, verbose: bool) -> EngineConfig {
    let Some(path) = path else {
        return EngineConfig::default();
    };
    match fs::read_to_string(path).map(|text| EngineConfig::from_toml_str(&text)) {
        Ok(Ok(config)) => {
            if verbose {
                eprintln!("{} loaded config from {}", "info:".green(), path);
            }
            config
        }
        Ok(Err(err)) => {
            eprintln!("{} failed to parse {}: {}", "warning:".yellow(), path, err);
            EngineConfig::default()
        }
        Err(err) => {
            eprintln!("{} failed to read {}: {}", "warning:".yellow(), path, err);
            EngineConfig::default()
        }
    }
}

fn parse_fields(pairs: &[String]) -> HashMap<String, String> {
    pairs
        .iter()
        .filter_map(|pair| pair.split_once('=').map(|(k, v)| (k.to_string(), v.to_string())))
        .collect()
}

fn run() -> Result<()> {
    let cli = Cli::parse();
    let config = load_config(&cli.config, cli.verbose);

    match cli.command {
        Command::Render { script, fields } => {
            let bytecode = compile(&script).map_err(|e| anyhow!("compile error: {e}"))?;
            let parsed = parse_fields(&fields);
            if cli.verbose {
                eprintln!("{} {} field(s)", "info:".green(), parsed.len());
            }
            let mut track = MapTrack::new();
            for (key, value) in parsed {
                track = track.with_meta(key, value);
            }
            let mut ctx = EvalContext::new().with_track(Arc::new(track));
            let mut buf = vec![0u8; 4096];
            let n = evaluate(&mut ctx, &bytecode, &config, &mut buf).map_err(|e| anyhow!("eval error: {e}"))?;
            let rendered = String::from_utf8_lossy(&buf[..n]);
            println!("{rendered}");
            Ok(())
        }
        Command::Compile { script } => {
            let bytecode = compile(&script).context("compile error")?;
            let hex: Vec<String> = bytecode.as_bytes().iter().map(|b| format!("{b:02x}")).collect();
            println!("{}", hex.join(" "));
            Ok(())
        }
    }
}

fn main() -> ExitCode {
    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("{} {}", "error:".red(), err);
            ExitCode::FAILURE
        }
    }
}
