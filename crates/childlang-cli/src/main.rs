use anyhow::Result;
use log::LevelFilter;

use childlang_cli::{build_cli, handle_analyze, handle_describe, schema_text};

fn main() -> Result<()> {
    env_logger::Builder::default()
        .filter_level(LevelFilter::Error)
        .parse_env(env_logger::Env::default().filter_or("CHILDLANG_LOG", "error,childlang=info"))
        .init();

    let matches = build_cli().get_matches();

    match matches.subcommand() {
        Some(("analyze", sub_m)) => match handle_analyze(sub_m) {
            Ok(()) => Ok(()),
            Err(e) => {
                log::error!("Analysis failed: {:#}", e);
                std::process::exit(1)
            }
        },
        Some(("schema", _)) => {
            print!("{}", schema_text());
            Ok(())
        }
        Some(("describe", sub_m)) => handle_describe(sub_m),
        _ => unreachable!("Subcommand is required by CLI configuration"),
    }
}
