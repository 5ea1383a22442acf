//! `logstore`: operator CLI over a log statistics environment.

use std::io::{self, BufRead, Write};
use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use logstore_core::Module;
use logstore_storage::config::{DEFAULT_DB_PATH, DEFAULT_MAX_NAMESPACES, DEFAULT_MAX_SIZE};
use logstore_storage::{init_tracing, LogFormat, LogStore, StorageConfig};
use serde::Serialize;
use tracing::info;

const TOTAL_REQUESTS: &str = "total_requests";
const TOTAL_BYTES: &str = "bandwidth";

#[derive(Debug, Parser)]
#[command(name = "logstore", version, about = "Per-module log statistics storage")]
struct Cli {
    /// Existing directory holding the database file.
    #[arg(long, env = "LOGSTORE_DB_PATH", default_value = DEFAULT_DB_PATH)]
    db_path: PathBuf,

    /// Maximum environment size in bytes.
    #[arg(long, env = "LOGSTORE_MAX_SIZE", default_value_t = DEFAULT_MAX_SIZE)]
    max_size: u64,

    /// Maximum number of namespaces.
    #[arg(long, default_value_t = DEFAULT_MAX_NAMESPACES)]
    max_namespaces: u32,

    /// Leave a module out of the catalog. Repeatable.
    #[arg(long = "ignore-panel", value_name = "MODULE")]
    ignore_panels: Vec<Module>,

    /// Log output format: pretty or json.
    #[arg(long, default_value_t = LogFormat::Pretty)]
    log_format: LogFormat,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Create the environment and catalog.
    Init,
    /// Record `MODULE<TAB>KEY[<TAB>BYTES]` lines read from stdin.
    Ingest,
    /// Print per-module table sizes as JSON.
    Stats,
    /// Print a module's sorted raw data as JSON.
    Export {
        /// Module panel name, e.g. REQUESTS.
        module: Module,
    },
}

impl Cli {
    fn storage_config(&self) -> StorageConfig {
        StorageConfig {
            db_path: self.db_path.clone(),
            max_size: self.max_size,
            max_namespaces: self.max_namespaces,
            deferred_sync: true,
            ignored_modules: self.ignore_panels.clone(),
        }
    }
}

#[derive(Debug, Serialize)]
struct ModuleStats {
    module: Module,
    items: u64,
    unique_visitors: u64,
}

#[derive(Debug, Serialize)]
struct Stats {
    total_requests: u64,
    bandwidth: u64,
    modules: Vec<ModuleStats>,
}

struct Record<'a> {
    module: Module,
    key: &'a str,
    bytes: u64,
}

fn parse_record(line: &str) -> Result<Record<'_>> {
    let mut fields = line.split('\t');
    let module = fields.next().unwrap_or_default().parse::<Module>()?;
    let Some(key) = fields.next().filter(|k| !k.is_empty()) else {
        bail!("missing key");
    };
    let bytes = match fields.next() {
        Some(raw) => raw
            .trim()
            .parse::<u64>()
            .with_context(|| format!("invalid byte count {raw:?}"))?,
        None => 0,
    };
    Ok(Record { module, key, bytes })
}

fn ingest(store: &LogStore, input: impl BufRead) -> Result<u64> {
    let mut recorded = 0;
    for (idx, line) in input.lines().enumerate() {
        let line = line.context("failed to read stdin")?;
        if line.trim().is_empty() {
            continue;
        }
        let record = parse_record(&line).with_context(|| format!("line {}", idx + 1))?;
        let Some(id) = store.insert_keymap(record.module, record.key)? else {
            continue;
        };
        store.insert_datamap(record.module, id, record.key)?;
        store.insert_hits(record.module, id, 1)?;
        store.insert_bw(record.module, id, record.bytes)?;
        store.increment_general_stat(TOTAL_REQUESTS, 1)?;
        store.increment_general_stat(TOTAL_BYTES, record.bytes)?;
        recorded += 1;
    }
    store.sync(true)?;
    Ok(recorded)
}

fn stats(store: &LogStore) -> Result<Stats> {
    let modules = store
        .catalog()
        .modules()
        .map(|module| {
            Ok(ModuleStats {
                module,
                items: store.get_size_datamap(module)?,
                unique_visitors: store.get_size_uniqmap(module)?,
            })
        })
        .collect::<Result<Vec<_>>>()?;
    Ok(Stats {
        total_requests: store.get_general_stat(TOTAL_REQUESTS)?,
        bandwidth: store.get_general_stat(TOTAL_BYTES)?,
        modules,
    })
}

fn print_json(value: &impl Serialize) -> Result<()> {
    let mut out = io::stdout().lock();
    serde_json::to_writer_pretty(&mut out, value)?;
    writeln!(out)?;
    Ok(())
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.log_format).context("failed to install log subscriber")?;

    let config = cli.storage_config();
    let store = LogStore::open(config)
        .with_context(|| format!("failed to open storage at {}", cli.db_path.display()))?;

    match cli.command {
        Command::Init => {
            println!("{} namespaces ready", store.catalog().len());
        }
        Command::Ingest => {
            let recorded = ingest(&store, io::stdin().lock())?;
            info!(recorded, "ingest finished");
        }
        Command::Stats => print_json(&stats(&store)?)?,
        Command::Export { module } => match store.parse_raw_data(module)? {
            Some(data) => print_json(&data)?,
            None => bail!("module {module} is ignored by this configuration"),
        },
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_records() {
        let r = parse_record("REQUESTS\t/index.html\t512").unwrap();
        assert_eq!(r.module, Module::Requests);
        assert_eq!(r.key, "/index.html");
        assert_eq!(r.bytes, 512);

        let r = parse_record("hosts\t10.0.0.1").unwrap();
        assert_eq!(r.module, Module::Hosts);
        assert_eq!(r.bytes, 0);

        assert!(parse_record("NOPE\tx").is_err());
        assert!(parse_record("REQUESTS").is_err());
        assert!(parse_record("REQUESTS\t/\tmany").is_err());
    }

    #[test]
    fn ingest_then_stats() {
        let store = LogStore::in_memory(StorageConfig::default()).unwrap();
        let input = "REQUESTS\t/a\t100\nREQUESTS\t/b\t20\n\nREQUESTS\t/a\t5\nHOSTS\t10.0.0.1\n";
        assert_eq!(ingest(&store, input.as_bytes()).unwrap(), 4);

        assert_eq!(store.get_hits(Module::Requests, 1).unwrap(), 2);
        assert_eq!(store.get_bw(Module::Requests, 1).unwrap(), 105);

        let stats = stats(&store).unwrap();
        assert_eq!(stats.total_requests, 4);
        assert_eq!(stats.bandwidth, 125);
        let requests = stats.modules.iter().find(|m| m.module == Module::Requests).unwrap();
        assert_eq!(requests.items, 2);
    }

    #[test]
    fn ingest_reports_bad_line_number() {
        let store = LogStore::in_memory(StorageConfig::default()).unwrap();
        let err = ingest(&store, "REQUESTS\t/a\nBOGUS\tx\n".as_bytes()).unwrap_err();
        assert!(format!("{err:#}").starts_with("line 2"));
    }

    #[test]
    fn cli_parses_options() {
        let cli = Cli::parse_from([
            "logstore",
            "--db-path",
            "/var/lib/logstore",
            "--ignore-panel",
            "REFERRERS",
            "--log-format",
            "json",
            "export",
            "visitors",
        ]);
        assert_eq!(cli.log_format, LogFormat::Json);
        assert!(matches!(cli.command, Command::Export { module: Module::Visitors }));
        let config = cli.storage_config();
        assert_eq!(config.ignored_modules, vec![Module::Referrers]);
        assert_eq!(config.db_path, PathBuf::from("/var/lib/logstore"));
    }
}
