use std::io::{self, BufRead};
use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use mailverify_lib::{SmtpOptions, ValidationMode, VerifierOptions};

#[derive(Parser, Debug)]
#[command(name = "mailverify-cli", version, about = "Vérifie la délivrabilité d'adresses e-mail sans envoyer de message")]
pub struct Cli {
    /// adresses à vérifier
    pub emails: Vec<String>,

    /// lit des adresses depuis stdin (une par ligne)
    #[arg(long)]
    pub stdin: bool,

    /// nombre maximum de domaines vérifiés en parallèle
    #[arg(short = 'w', long, env = "MAILVERIFY_WORKERS", default_value_t = 8)]
    pub workers: usize,

    /// nom annoncé en EHLO (par défaut le hostname de la machine)
    #[arg(long, env = "MAILVERIFY_HOSTNAME")]
    pub hostname: Option<String>,

    /// enveloppe MAIL FROM (par défaut postmaster@<hostname>)
    #[arg(long = "from", env = "MAILVERIFY_FROM")]
    pub from: Option<String>,

    /// tentatives pour la détection catch-all
    #[arg(long = "catchall-attempts", env = "MAILVERIFY_CATCHALL_ATTEMPTS", default_value_t = 5)]
    pub catchall_attempts: u32,

    /// tentatives par destinataire
    #[arg(long, env = "MAILVERIFY_ATTEMPTS", default_value_t = 5)]
    pub attempts: u32,

    /// timeout réseau (ms)
    #[arg(long = "timeout", env = "MAILVERIFY_TIMEOUT_MS", default_value_t = 5_000)]
    pub timeout_ms: u64,

    /// port SMTP
    #[arg(long, env = "MAILVERIFY_PORT", default_value_t = 25)]
    pub port: u16,

    /// désactive STARTTLS
    #[arg(long = "no-starttls")]
    pub no_starttls: bool,

    /// autorise IPv6
    #[arg(long, env = "MAILVERIFY_IPV6")]
    pub ipv6: bool,

    /// mode: strict|relaxed
    #[arg(long, env = "MAILVERIFY_MODE", default_value = "strict")]
    pub mode: String,

    /// liste supplémentaire de domaines jetables (un par ligne)
    #[arg(long = "disposable-list", env = "MAILVERIFY_DISPOSABLE_LIST")]
    pub disposable_list: Option<PathBuf>,

    /// désactive la recherche Gravatar
    #[arg(long = "no-reputation")]
    pub no_reputation: bool,

    /// format: human|json|ndjson|csv
    #[arg(long, env = "MAILVERIFY_FORMAT", default_value = "human")]
    pub format: String,

    /// write report to file (JSON/NDJSON/CSV selon --format)
    #[arg(long)]
    pub out: Option<String>,

    /// logs détaillés (debug) sur stderr
    #[arg(short, long)]
    pub verbose: bool,
}

impl Cli {
    pub fn parse() -> Self {
        <Self as Parser>::parse()
    }

    pub fn clap_command() -> clap::Command {
        <Self as clap::CommandFactory>::command()
    }

    pub fn parsed_mode(&self) -> ValidationMode {
        mode_from_str(&self.mode)
    }

    /// Arguments first, then stdin lines when `--stdin` is set.
    pub fn collect_emails(&self) -> Result<Vec<String>> {
        let mut emails = self.emails.clone();
        if self.stdin {
            for line in io::stdin().lock().lines() {
                let line = line.context("read stdin")?;
                if !line.trim().is_empty() {
                    emails.push(line);
                }
            }
        }
        Ok(emails)
    }

    pub fn verifier_options(&self) -> VerifierOptions {
        let timeout = Duration::from_millis(self.timeout_ms.max(1));
        let smtp = SmtpOptions {
            port: self.port,
            starttls: !self.no_starttls,
            ipv6: self.ipv6,
            ..SmtpOptions::default()
        }
        .with_timeout(timeout);

        VerifierOptions {
            max_workers: self.workers,
            hostname: self.hostname.clone(),
            source_address: self.from.clone(),
            catch_all_attempts: self.catchall_attempts,
            recipient_attempts: self.attempts,
            validation_mode: self.parsed_mode(),
            reputation_timeout: timeout,
            smtp,
        }
    }
}

pub fn mode_from_str(s: &str) -> ValidationMode {
    match s {
        "relaxed" => ValidationMode::Relaxed,
        _ => ValidationMode::Strict,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flags_map_to_options() {
        let cli = Cli::try_parse_from([
            "mailverify-cli",
            "-w",
            "3",
            "--timeout",
            "1500",
            "--port",
            "2525",
            "--no-starttls",
            "--mode",
            "relaxed",
            "--from",
            "probe@example.net",
            "a@example.com",
        ])
        .expect("parse");
        let options = cli.verifier_options();
        assert_eq!(cli.emails, ["a@example.com"]);
        assert_eq!(options.max_workers, 3);
        assert_eq!(options.validation_mode, ValidationMode::Relaxed);
        assert_eq!(options.source_address.as_deref(), Some("probe@example.net"));
        assert_eq!(options.smtp.port, 2525);
        assert!(!options.smtp.starttls);
        assert_eq!(options.smtp.command_timeout, Duration::from_millis(1500));
        assert_eq!(options.reputation_timeout, Duration::from_millis(1500));
    }

    #[test]
    fn unknown_mode_is_strict() {
        assert_eq!(mode_from_str("lenient"), ValidationMode::Strict);
    }

    #[test]
    fn command_is_consistent() {
        Cli::clap_command().debug_assert();
    }
}
