use anyhow::Result;
use tracing_subscriber::{fmt, EnvFilter};

use masaniello::config::Config;
use masaniello::core::{build_matrix, Objective};

/// Prints the payoff matrix. Arguments override the environment:
/// matrix [operations] [wins] [payout%]
fn main() -> Result<()> {
    let cfg = Config::from_env();

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&cfg.log_level));

    fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_timer(fmt::time::UtcTime::rfc_3339())
        .init();

    let args: Vec<String> = std::env::args().collect();

    let mut cycle = cfg.cycle;
    cycle.operation_count = args
        .get(1)
        .and_then(|s| s.parse().ok())
        .unwrap_or(cycle.operation_count);
    cycle.expected_wins = args
        .get(2)
        .and_then(|s| s.parse().ok())
        .unwrap_or(cycle.expected_wins);
    cycle.broker_payout = args
        .get(3)
        .and_then(|s| s.parse().ok())
        .unwrap_or(cycle.broker_payout);

    let matrix = build_matrix(cycle.operation_count, cycle.expected_wins, cycle.payout_ratio())?;
    let objective = Objective::new(&cycle, &matrix);

    println!(
        "N={} K={} P={:.4}  profit {:.2}%  target ${:.2} on ${:.2}",
        cycle.operation_count,
        cycle.expected_wins,
        cycle.payout_ratio(),
        objective.profit_percent,
        objective.target_balance,
        cycle.total_risk
    );
    println!();

    print!("{:>6}", "ops\\w");
    for wins in 0..cycle.expected_wins {
        print!("{:>12}", wins);
    }
    println!();

    for (played, row) in matrix.rows().iter().enumerate() {
        print!("{:>6}", played);
        for cell in row {
            match cell {
                Some(c) => print!("{:>12.6}", c),
                None => print!("{:>12}", "-"),
            }
        }
        println!();
    }

    Ok(())
}
