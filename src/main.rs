use anyhow::{bail, Context, Result};
use tracing::info;
use tracing_subscriber::{fmt, EnvFilter};

use masaniello::config::Config;
use masaniello::core::MatrixCache;
use masaniello::models::Outcome;
use masaniello::report::CycleReport;
use masaniello::session::Session;

/// Replays a result sequence through a fresh cycle and prints where it stands.
///
/// Usage: masaniello [--json] W L W ...
fn main() -> Result<()> {
    let cfg = Config::from_env();

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&cfg.log_level));

    fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_timer(fmt::time::UtcTime::rfc_3339())
        .init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let json = args.iter().any(|a| a == "--json");

    let outcomes = args
        .iter()
        .filter(|a| !a.starts_with("--"))
        .map(|a| {
            Outcome::from_str_loose(a).with_context(|| format!("unrecognised result '{}'", a))
        })
        .collect::<Result<Vec<_>>>()?;

    let cache = MatrixCache::new();
    let mut session = Session::new(1, &cfg.session_name, cfg.cycle, &cache)
        .context("invalid cycle configuration")?;

    info!(
        "Cycle: risk ${:.2}, {} operations, {} wins needed, payout {}%{}",
        cfg.cycle.total_risk,
        cfg.cycle.operation_count,
        cfg.cycle.expected_wins,
        cfg.cycle.broker_payout,
        if cfg.cycle.progressive_mode { ", progressive" } else { "" }
    );

    for (i, outcome) in outcomes.iter().enumerate() {
        if let Err(e) = session.mark_result(*outcome) {
            bail!("result #{} ({}) rejected: {}", i + 1, outcome, e);
        }
    }

    if json {
        println!("{}", serde_json::to_string_pretty(&session.snapshot())?);
    } else {
        CycleReport::from_session(&session).print_summary();
    }

    Ok(())
}
