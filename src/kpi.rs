// KPI totals: prorated cost objective and variance against it.
use crate::calendar::{business_days_count, month_bounds};
use crate::types::{KpiSummary, MonthlyAggregate};
use chrono::NaiveDate;
use serde::Serialize;

/// Monthly labor-cost budget spread evenly over the month's business days.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct CostObjective {
    pub daily: f64,
    pub to_date: f64,
}

impl CostObjective {
    pub fn new(monthly_budget: f64, business_days_month: i64, business_days_elapsed: i64) -> Self {
        let daily = if business_days_month == 0 {
            0.0
        } else {
            monthly_budget / business_days_month as f64
        };
        Self { daily, to_date: daily * business_days_elapsed as f64 }
    }
}

/// How an actual figure compares with the objective-to-date.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Variance {
    pub balance: f64,
    /// `actual / objective`; `None` when there is no target.
    pub ratio: Option<f64>,
}

impl Variance {
    pub fn against(actual: f64, objective_to_date: f64) -> Self {
        let ratio = if objective_to_date == 0.0 {
            None
        } else {
            Some(actual / objective_to_date)
        };
        Self { balance: actual - objective_to_date, ratio }
    }

    /// Percent above (+) or below (-) the objective.
    pub fn delta_pct(&self) -> Option<f64> {
        self.ratio.map(|r| (r - 1.0) * 100.0)
    }
}

/// Attach the prorated objective for `today` to a monthly aggregate.
pub fn compose(monthly: MonthlyAggregate, monthly_budget: f64, today: NaiveDate) -> KpiSummary {
    let (month_start, month_end) = month_bounds(today);
    let business_days_month = business_days_count(month_start, month_end);
    let business_days_elapsed = business_days_count(month_start, today);
    let objective = CostObjective::new(monthly_budget, business_days_month, business_days_elapsed);
    KpiSummary {
        monthly,
        monthly_budget,
        business_days_month,
        business_days_elapsed,
        objective_to_date: objective.to_date,
    }
}

impl KpiSummary {
    pub fn fabricated_variance(&self) -> Variance {
        Variance::against(self.monthly.total_labor_cost_fabricated, self.objective_to_date)
    }

    pub fn recovered_variance(&self) -> Variance {
        Variance::against(self.monthly.total_labor_cost_recovered, self.objective_to_date)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reports::aggregate_current_month;

    #[test]
    fn objective_prorates_by_elapsed_business_days() {
        let obj = CostObjective::new(20_000.0, 20, 5);
        assert_eq!(obj.daily, 1_000.0);
        assert_eq!(obj.to_date, 5_000.0);
    }

    #[test]
    fn zero_business_days_gives_zero_objective() {
        let obj = CostObjective::new(20_000.0, 0, 0);
        assert_eq!(obj.daily, 0.0);
        assert_eq!(obj.to_date, 0.0);
    }

    #[test]
    fn variance_without_target_has_no_ratio() {
        let v = Variance::against(1_500.0, 0.0);
        assert_eq!(v.balance, 1_500.0);
        assert_eq!(v.ratio, None);
        assert_eq!(v.delta_pct(), None);
    }

    #[test]
    fn variance_reports_balance_and_percentage() {
        let v = Variance::against(1_200.0, 1_000.0);
        assert_eq!(v.balance, 200.0);
        assert_eq!(v.ratio, Some(1.2));
        assert!((v.delta_pct().unwrap() - 20.0).abs() < 1e-9);
    }

    #[test]
    fn compose_uses_month_and_elapsed_business_days() {
        // June 2024 has 20 business days; Jun 1-7 holds 5 of them.
        let today = NaiveDate::from_ymd_opt(2024, 6, 7).unwrap();
        let monthly = aggregate_current_month(&[], &[], &[], today);
        let summary = compose(monthly, 40_000.0, today);
        assert_eq!(summary.business_days_month, 20);
        assert_eq!(summary.business_days_elapsed, 5);
        assert_eq!(summary.objective_to_date, 10_000.0);
        assert_eq!(summary.fabricated_variance().balance, -10_000.0);
    }
}
