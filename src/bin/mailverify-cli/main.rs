mod args;
mod output;

use anyhow::{Context, Result};
use mailverify_lib::{NoReputation, StaticDisposableList, Verifier};
use tracing_subscriber::EnvFilter;

use crate::args::Cli;

fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let emails = cli.collect_emails()?;
    if emails.is_empty() {
        Cli::clap_command().print_help()?;
        println!();
        return Ok(());
    }

    let mut verifier = Verifier::new(cli.verifier_options()).context("initialise verifier")?;
    if let Some(path) = &cli.disposable_list {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("read {}", path.display()))?;
        let list = StaticDisposableList::from_list(&text);
        tracing::debug!(extra = list.extra_len(), "disposable list loaded");
        verifier = verifier.with_disposable(list);
    }
    if cli.no_reputation {
        verifier = verifier.with_reputation(NoReputation);
    }

    let records = verifier.verify(&emails);
    output::write_reports(&records, &cli)?;

    // codes de sortie : 0 OK, 2 erreurs sur au moins une adresse, 1 fatal
    if output::any_error(&records) {
        std::process::exit(2);
    }
    Ok(())
}
