use std::io::{self, BufRead, Write};
use std::process::ExitCode;

use anyhow::Context as _;
use clap::Parser;

use jscore::cli::{self, CliArgs};
use jscore::config::EngineConfig;
use jscore::{Engine, Env, Language};

fn main() -> anyhow::Result<ExitCode> {
    let args = CliArgs::parse();

    let level = cli::log_level(args.verbose, std::env::var("JSCORE_LOG").ok().as_deref());
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(io::stderr)
        .init();

    // ── Config ────────────────────────────────────────────────────────────────
    let mut config = match &args.config {
        Some(path) => {
            let (config, errors) = EngineConfig::load_file(path)?;
            for e in errors {
                eprintln!("jscore: {}: {e}", path.display());
            }
            config
        }
        None => EngineConfig::new(),
    };
    for spec in &args.set {
        config
            .add_var(spec)
            .map_err(anyhow::Error::msg)
            .with_context(|| format!("bad --set '{spec}'"))?;
    }

    let language = if args.logical { Language::logical() } else { Language::common() };
    let engine = Engine::with_config(language, &config);
    let env = Env::new();
    config.seed_env(&engine, &env).context("seeding variables")?;

    // ── Evaluate ──────────────────────────────────────────────────────────────
    let mut ok = true;
    if let Some(path) = &args.file {
        let src = std::fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
        ok &= run(&engine, &env, &args, &src, &path.display().to_string());
    }
    for (i, src) in args.eval.iter().enumerate() {
        ok &= run(&engine, &env, &args, src, &format!("-e #{}", i + 1));
    }
    if args.is_repl() {
        repl(&engine, &env, &args)?;
    }

    Ok(if ok { ExitCode::SUCCESS } else { ExitCode::FAILURE })
}

/// Evaluate one source text and print its result; errors go to stderr.
fn run(engine: &Engine, env: &Env, args: &CliArgs, src: &str, place: &str) -> bool {
    let options = engine.default_options();
    let result = if args.logical {
        engine
            .is_defined_expr(src, env, options)
            .map(|b| b.to_string())
    } else {
        engine
            .eval_with(src, env, place, options)
            .map(|v| cli::render(&v, args.json))
    };
    match result {
        Ok(text) => {
            println!("{text}");
            true
        }
        Err(e) => {
            eprintln!("error: {e}");
            false
        }
    }
}

fn repl(engine: &Engine, env: &Env, args: &CliArgs) -> anyhow::Result<()> {
    let stdin = io::stdin();
    let interactive = io::IsTerminal::is_terminal(&stdin);
    let mut lineno = 0;
    loop {
        if interactive {
            print!("> ");
            io::stdout().flush()?;
        }
        let mut line = String::new();
        if stdin.lock().read_line(&mut line)? == 0 {
            break;
        }
        lineno += 1;
        let src = line.trim();
        if src.is_empty() {
            continue;
        }
        run(engine, env, args, src, &format!("stdin:{lineno}"));
    }
    Ok(())
}
