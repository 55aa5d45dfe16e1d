#[cfg(any(feature = "with-serde", feature = "with-csv"))]
use anyhow::Context;
use anyhow::{Result, bail};

use crate::args::Cli;
use mailverify_lib::Lookup;

pub fn write_reports(records: &[Lookup], cli: &Cli) -> Result<()> {
    match cli.format.as_str() {
        "human" => write_human(records),
        "json" => write_json(records, cli),
        "ndjson" => write_ndjson(records, cli),
        "csv" => write_csv(records, cli),
        other => bail!("unknown --format '{other}', use: human|json|ndjson|csv"),
    }
}

pub fn any_error(records: &[Lookup]) -> bool {
    records.iter().any(Lookup::is_error)
}

pub fn status_label(record: &Lookup) -> &'static str {
    if record.is_error() {
        "ERROR"
    } else if record.catch_all {
        "CATCH-ALL"
    } else if record.deliverable {
        "DELIVERABLE"
    } else if record.full_inbox {
        "FULL"
    } else {
        "UNDELIVERABLE"
    }
}

fn yes_no(flag: bool) -> &'static str {
    if flag { "yes" } else { "no" }
}

pub fn human_line(record: &Lookup) -> String {
    let mut line = format!(
        "[{}] {} :: host={} disposable={} reputation={}",
        status_label(record),
        record.address,
        yes_no(record.host_exists),
        yes_no(record.disposable),
        yes_no(record.reputation),
    );
    if let Some(error) = &record.error {
        line.push_str(&format!(" :: {error}"));
    }
    line
}

fn write_human(records: &[Lookup]) -> Result<()> {
    for record in records {
        println!("{}", human_line(record));
    }
    Ok(())
}

#[cfg(feature = "with-serde")]
fn write_json(records: &[Lookup], cli: &Cli) -> Result<()> {
    let s = serde_json::to_string_pretty(records)?;
    if let Some(path) = &cli.out {
        write_all_atomically(path, s.as_bytes())?;
    } else {
        println!("{s}");
    }
    Ok(())
}

#[cfg(not(feature = "with-serde"))]
fn write_json(_: &[Lookup], _: &Cli) -> Result<()> {
    bail!("format=json nécessite la feature 'with-serde'")
}

#[cfg(feature = "with-serde")]
fn write_ndjson(records: &[Lookup], cli: &Cli) -> Result<()> {
    if let Some(path) = &cli.out {
        let mut buf = Vec::new();
        for record in records {
            let line = serde_json::to_string(record)?;
            buf.extend_from_slice(line.as_bytes());
            buf.push(b'\n');
        }
        write_all_atomically(path, &buf)?;
    } else {
        for record in records {
            println!("{}", serde_json::to_string(record)?);
        }
    }
    Ok(())
}

#[cfg(not(feature = "with-serde"))]
fn write_ndjson(_: &[Lookup], _: &Cli) -> Result<()> {
    bail!("format=ndjson nécessite la feature 'with-serde'")
}

#[cfg(feature = "with-csv")]
const CSV_HEADER: [&str; 11] = [
    "address",
    "username",
    "domain",
    "host_exists",
    "deliverable",
    "full_inbox",
    "catch_all",
    "disposable",
    "reputation",
    "error",
    "error_details",
];

#[cfg(feature = "with-csv")]
fn write_csv(records: &[Lookup], cli: &Cli) -> Result<()> {
    if let Some(path) = &cli.out {
        let mut wtr = csv::Writer::from_writer(Vec::new());
        wtr.write_record(CSV_HEADER)?;
        for record in records {
            wtr.write_record(csv_record(record))?;
        }
        let data = wtr.into_inner()?;
        write_all_atomically(path, &data)?;
    } else {
        let mut wtr = csv::Writer::from_writer(std::io::stdout());
        wtr.write_record(CSV_HEADER)?;
        for record in records {
            wtr.write_record(csv_record(record))?;
        }
        wtr.flush()?;
    }
    Ok(())
}

#[cfg(not(feature = "with-csv"))]
fn write_csv(_: &[Lookup], _: &Cli) -> Result<()> {
    bail!("format=csv nécessite la feature 'with-csv'")
}

#[cfg(feature = "with-csv")]
fn csv_record(record: &Lookup) -> Vec<String> {
    let (category, detail) = record
        .error
        .as_ref()
        .map(|e| (e.category.clone(), e.detail.clone()))
        .unwrap_or_default();
    vec![
        record.address.clone(),
        record.username.clone(),
        record.domain.clone(),
        record.host_exists.to_string(),
        record.deliverable.to_string(),
        record.full_inbox.to_string(),
        record.catch_all.to_string(),
        record.disposable.to_string(),
        record.reputation.to_string(),
        category,
        detail,
    ]
}

#[cfg(any(feature = "with-serde", feature = "with-csv"))]
fn write_all_atomically(path: &str, bytes: &[u8]) -> Result<()> {
    use std::io::Write;

    let tmp = format!("{path}.tmp");
    {
        let mut f = std::fs::File::create(&tmp).with_context(|| format!("create {tmp}"))?;
        f.write_all(bytes)?;
        f.sync_all()?;
    }
    std::fs::rename(&tmp, path).with_context(|| format!("rename {tmp} -> {path}"))?;
    Ok(())
}
