//! Developer CLI for `ScaKit`.
//!
//! ```bash
//! scakit decode 'authenticator://connect?configuration=https://bank.example/config'
//! scakit resolve "$CODE" --connections connections.json
//! scakit reconcile poll-1.json poll-2.json --start 1700000000 --interval 5 \
//!     --act 1/42=confirmed --sweep-at 1700000020
//! ```
//!
//! Results are printed as JSON on stdout, logs go to stderr.

use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::Arc;

use clap::{Args, Parser, Subcommand};
use eyre::{bail, WrapErr};
use scakit_core::{
    resolve_candidates, AuthorizationReconciler, AuthorizationRecord, AuthorizationStatus,
    Connection, ConnectionStore, InMemoryConnectionStore, Resolution, ScaKitConfig, ScannedCode,
};
use serde_json::{json, Value};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(
    name = "scakit",
    version,
    about = "Inspect ScaKit codes, connections and authorization snapshots"
)]
struct Cli {
    /// Log filter, e.g. `debug` or `scakit_core=trace`.
    #[arg(long, env = "SCAKIT_LOG", default_value = "warn", global = true)]
    log: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Decode a scanned code (QR payload or deep link).
    Decode {
        /// Raw scanned value.
        code: String,
    },
    /// Resolve an action code against a connections file.
    Resolve {
        /// Raw scanned value.
        code: String,
        /// JSON array of connections.
        #[arg(long)]
        connections: PathBuf,
    },
    /// Replay authorization snapshots through the reconciler.
    Reconcile(ReconcileArgs),
}

#[derive(Debug, Args)]
struct ReconcileArgs {
    /// Snapshot files (JSON arrays of authorization records), in poll order.
    #[arg(required = true)]
    snapshots: Vec<PathBuf>,

    /// Time of the first snapshot, unix seconds.
    #[arg(long, default_value_t = 0)]
    start: u64,

    /// Seconds between two snapshots.
    #[arg(long, default_value_t = 1)]
    interval: u64,

    /// Engine configuration (JSON).
    #[arg(long)]
    config: Option<PathBuf>,

    /// Overrides the final retention window, in seconds.
    #[arg(long)]
    retention: Option<u64>,

    /// Local decision applied right after the first snapshot,
    /// `CONNECTION_ID/AUTHORIZATION_ID=confirmed|denied`.
    #[arg(long = "act", value_parser = parse_decision)]
    decisions: Vec<Decision>,

    /// Run the eviction sweep at these times, after the last snapshot.
    #[arg(long = "sweep-at")]
    sweeps: Vec<u64>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct Decision {
    connection_id: String,
    authorization_id: String,
    status: AuthorizationStatus,
}

fn parse_decision(raw: &str) -> Result<Decision, String> {
    let (key, status) = raw
        .split_once('=')
        .ok_or("expected CONNECTION_ID/AUTHORIZATION_ID=STATUS")?;
    let (connection_id, authorization_id) = key
        .split_once('/')
        .ok_or("expected CONNECTION_ID/AUTHORIZATION_ID")?;
    let status = AuthorizationStatus::from_str(status).map_err(|e| format!("{status}: {e}"))?;
    if status == AuthorizationStatus::Base {
        return Err("a decision must be confirmed or denied".to_string());
    }
    Ok(Decision {
        connection_id: connection_id.to_string(),
        authorization_id: authorization_id.to_string(),
        status,
    })
}

fn main() -> eyre::Result<()> {
    let cli = Cli::parse();
    init_tracing(&cli.log)?;

    let output = match cli.command {
        Command::Decode { code } => decode(&code)?,
        Command::Resolve { code, connections } => resolve(&code, &connections)?,
        Command::Reconcile(args) => reconcile(args)?,
    };
    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}

fn init_tracing(filter: &str) -> eyre::Result<()> {
    // The engine logs through the `log` facade.
    tracing_log::LogTracer::init().wrap_err("failed to bridge log records")?;
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_new(filter).wrap_err("invalid log filter")?)
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)
        .wrap_err("failed to install the tracing subscriber")?;
    Ok(())
}

fn decode(raw: &str) -> eyre::Result<Value> {
    Ok(match ScannedCode::parse(raw)? {
        ScannedCode::Action { action } => json!({
            "mode": "action",
            "action_guid": action.action_guid,
            "connect_url": action.connect_url,
            "return_to": action.return_to_url,
            "configuration": action.configuration_url,
            "connect_query": action.connect_query,
        }),
        ScannedCode::NewConnection {
            configuration_url,
            connect_query,
        } => json!({
            "mode": "new_connection",
            "configuration": configuration_url,
            "connect_query": connect_query,
        }),
    })
}

fn resolve(raw: &str, connections: &Path) -> eyre::Result<Value> {
    let store = InMemoryConnectionStore::from_json(&read(connections)?)?;
    let ScannedCode::Action { action } = ScannedCode::parse(raw)? else {
        bail!("not an action code, nothing to resolve");
    };

    let active = store.active_connections()?.len();
    let matching = store.active_connections_by_base_url(action.connect_url.clone())?;
    tracing::debug!(
        active,
        matching = matching.len(),
        connect_url = %action.connect_url,
        "resolving action code"
    );

    Ok(match resolve_candidates(active, matching) {
        Resolution::NoActiveConnection => json!({ "resolution": "no_active_connection" }),
        Resolution::NoSuitableConnection => json!({ "resolution": "no_suitable_connection" }),
        Resolution::Single(connection) => json!({
            "resolution": "single",
            "connection": summary(&connection),
        }),
        Resolution::Ambiguous(candidates) => json!({
            "resolution": "ambiguous",
            "candidates": candidates.iter().map(summary).collect::<Vec<_>>(),
        }),
    })
}

/// Connection fields safe to print; the access token is left out.
fn summary(connection: &Connection) -> Value {
    json!({
        "guid": connection.guid,
        "id": connection.id,
        "name": connection.name,
        "base_url": connection.base_url,
        "created_at": connection.created_at,
    })
}

fn reconcile(args: ReconcileArgs) -> eyre::Result<Value> {
    let mut config = match &args.config {
        Some(path) => ScaKitConfig::from_json(&read(path)?)?,
        None => ScaKitConfig::default(),
    };
    if let Some(retention) = args.retention {
        config.final_retention_secs = retention;
    }
    let reconciler =
        AuthorizationReconciler::new(Arc::new(InMemoryConnectionStore::default()), config);

    let mut steps = Vec::new();
    for (index, path) in args.snapshots.iter().enumerate() {
        let snapshot: Vec<AuthorizationRecord> = serde_json::from_str(&read(path)?)
            .wrap_err_with(|| format!("invalid snapshot {}", path.display()))?;
        let now = args
            .start
            .saturating_add(args.interval.saturating_mul(u64::try_from(index)?));

        let changed = reconciler.update(snapshot, now);
        tracing::info!(now, changed, snapshot = %path.display(), "applied snapshot");
        steps.push(step("update", now, changed, &reconciler));

        if index == 0 {
            for decision in &args.decisions {
                let changed = reconciler.mark_acted(
                    &decision.connection_id,
                    &decision.authorization_id,
                    decision.status,
                    now,
                );
                steps.push(step("act", now, changed, &reconciler));
            }
        }
    }

    for now in args.sweeps {
        let changed = reconciler.evict_expired(now);
        steps.push(step("sweep", now, changed, &reconciler));
    }
    Ok(Value::Array(steps))
}

fn step(kind: &str, now: u64, changed: bool, reconciler: &AuthorizationReconciler) -> Value {
    json!({
        "step": kind,
        "now": now,
        "changed": changed,
        "records": reconciler.records(),
    })
}

fn read(path: &Path) -> eyre::Result<String> {
    fs::read_to_string(path).wrap_err_with(|| format!("failed to read {}", path.display()))
}
