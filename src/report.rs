use crate::core::objective::Objective;
use crate::models::{CycleStatus, Operation, OperationStatus, Outcome};
use crate::session::Session;

#[derive(Debug, Clone)]
pub struct CycleReport {
    pub session_name: String,
    pub status: CycleStatus,
    pub progressive: bool,

    // Objective
    pub objective: Objective,

    // Performance
    pub initial_balance: f64,
    pub final_balance: f64,
    pub total_pnl: f64,
    pub total_return_pct: f64,

    // Operations
    pub resolved: usize,
    pub wins: usize,
    pub losses: usize,
    pub win_rate: f64,
    pub sub_cycles_won: usize,
    pub sub_cycles_lost: usize,
    pub next_stake: Option<f64>,

    pub operations: Vec<Operation>,
}

impl CycleReport {
    pub fn from_session(session: &Session) -> Self {
        let cfg = session.config();
        let operations = session.operations().to_vec();

        let in_cycle: Vec<&Operation> = operations
            .iter()
            .filter(|op| op.status != OperationStatus::OutOfCycle)
            .collect();
        let resolved: Vec<&&Operation> = in_cycle.iter().filter(|op| !op.is_pending()).collect();
        let wins = resolved.iter().filter(|op| op.result == Some(Outcome::Win)).count();
        let losses = resolved.len() - wins;

        let final_balance = resolved
            .last()
            .map(|op| op.balance)
            .unwrap_or(cfg.total_risk);
        let total_pnl = final_balance - cfg.total_risk;

        let sub_cycles_won = in_cycle
            .iter()
            .filter(|op| matches!(op.status, OperationStatus::Won { .. }))
            .count();
        let sub_cycles_lost = in_cycle
            .iter()
            .filter(|op| matches!(op.status, OperationStatus::Lost { .. }))
            .count();

        Self {
            session_name: session.name.clone(),
            status: session.cycle_status(),
            progressive: cfg.progressive_mode,
            objective: session.objective(),
            initial_balance: cfg.total_risk,
            final_balance,
            total_pnl,
            total_return_pct: total_pnl / cfg.total_risk * 100.0,
            resolved: resolved.len(),
            wins,
            losses,
            win_rate: if resolved.is_empty() {
                0.0
            } else {
                wins as f64 / resolved.len() as f64 * 100.0
            },
            sub_cycles_won,
            sub_cycles_lost,
            next_stake: session.engine().next_stake(),
            operations,
        }
    }

    pub fn print_summary(&self) {
        println!("\n{}", "=".repeat(70));
        println!("  MASANIELLO CYCLE: {}", self.session_name);
        println!("{}", "=".repeat(70));
        println!(
            "  Status:      {}{}",
            self.status,
            if self.progressive { " (progressive)" } else { "" }
        );
        println!();
        println!("  OBJECTIVE");
        println!("  ───────────────────────────────────");
        println!("  Win Rate:    {:.2}%", self.objective.required_win_rate);
        println!("  Profit:      ${:+.2} ({:.2}%)", self.objective.profit, self.objective.profit_percent);
        println!("  Target:      ${:.2}", self.objective.target_balance);
        println!();
        println!("  PERFORMANCE");
        println!("  ───────────────────────────────────");
        println!("  Initial:     ${:.2}", self.initial_balance);
        println!("  Balance:     ${:.2}", self.final_balance);
        println!("  PnL:         ${:+.2}", self.total_pnl);
        println!("  Return:      {:+.1}%", self.total_return_pct);
        println!();
        println!("  OPERATIONS");
        println!("  ───────────────────────────────────");
        println!("  Resolved:    {}", self.resolved);
        println!("  Win/Loss:    {} / {}", self.wins, self.losses);
        println!("  Win Rate:    {:.1}%", self.win_rate);
        if self.progressive {
            println!(
                "  Sub-cycles:  {} won / {} lost",
                self.sub_cycles_won, self.sub_cycles_lost
            );
        }
        match self.next_stake {
            Some(stake) => println!("  Next Stake:  ${:.2}", stake),
            None => println!("  Next Stake:  -"),
        }

        if !self.operations.is_empty() {
            println!();
            println!("  HISTORY");
            println!("  ───────────────────────────────────");
            for (i, op) in self.operations.iter().enumerate() {
                println!(
                    "  {:>3}. {:>4} | stake ${:>9.2} | PnL ${:>+9.2} | bal ${:>9.2} | WR {:>5.1}% | {}",
                    i + 1,
                    op.result.map(|r| r.as_str()).unwrap_or("-"),
                    op.amount,
                    op.profit,
                    op.balance,
                    op.win_rate,
                    op.status
                );
            }
        }

        println!("{}", "=".repeat(70));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::matrix::MatrixCache;
    use crate::test_helpers::cycle_config;

    #[test]
    fn report_counts_resolved_operations() {
        let cache = MatrixCache::new();
        let mut s = Session::new(1, "report", cycle_config(10, 4), &cache).unwrap();
        for outcome in [Outcome::Win, Outcome::Loss, Outcome::Win] {
            s.mark_result(outcome).unwrap();
        }

        let report = CycleReport::from_session(&s);
        assert_eq!(report.resolved, 3);
        assert_eq!(report.wins, 2);
        assert_eq!(report.losses, 1);
        assert_eq!(report.status, CycleStatus::Active);
        assert_eq!(report.operations.len(), 4);
        assert_eq!(report.next_stake, Some(report.operations[3].amount));
        assert!((report.final_balance - report.operations[2].balance).abs() < 1e-12);
    }

    #[test]
    fn won_cycle_report_hits_target() {
        let cache = MatrixCache::new();
        let mut s = Session::new(1, "won", cycle_config(3, 1), &cache).unwrap();
        s.mark_result(Outcome::Loss).unwrap();
        s.mark_result(Outcome::Win).unwrap();

        let report = CycleReport::from_session(&s);
        assert_eq!(report.status, CycleStatus::Won);
        assert!((report.final_balance - report.objective.target_balance).abs() < 1e-9);
        assert!((report.total_pnl - report.objective.profit).abs() < 1e-9);
        assert_eq!(report.next_stake, None);
    }
}
