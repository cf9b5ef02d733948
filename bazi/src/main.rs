//! Bazi matching engine driver.
//!
//! Reads one request per line on stdin and writes one JSON response per line
//! on stdout. Logs go to stderr; set `RUST_LOG=bazi_core=debug` to watch the
//! enumerator and verifier.
//!
//! ```bash
//! echo 'new_game {"advancedMode": true}' | cargo run -p bazi -- --seed 7
//! ```

mod headless;

use bazi_core::EngineConfig;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load .env file if present
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let args: Vec<String> = std::env::args().collect();

    if args.iter().any(|a| a == "--help" || a == "-h") {
        print_help();
        return Ok(());
    }

    let config = match EngineConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: {e}");
            std::process::exit(1);
        }
    };

    let options = headless::parse_options_from_args(&args)?;
    headless::run_headless(config, options).await?;
    Ok(())
}

fn print_help() {
    println!("bazi - Bazi relationship matching engine");
    println!();
    println!("USAGE:");
    println!("    bazi [OPTIONS]");
    println!();
    println!("OPTIONS:");
    println!("    --seed <N>    Seed the random source for replayable games");
    println!("    -h, --help    Show this help");
    println!();
    println!("PROTOCOL (one request per line on stdin):");
    println!("    <operation> <json>    POST a JSON body to an operation");
    println!("    OPTIONS <operation>   Preflight");
    println!("    #quit                 Exit");
    println!();
    println!("OPERATIONS:");
    println!("    new_game, check_relationship, hints, reveal, settings");
    println!();
    println!("ENVIRONMENT:");
    println!("    BAZI_LUCK_STEPS_MIN, BAZI_LUCK_STEPS_MAX   Luck pillar step range");
    println!("    BAZI_YEAR_MIN, BAZI_YEAR_MAX               Random chart year range");
    println!("    RUST_LOG                                   Log filter (stderr)");
}
