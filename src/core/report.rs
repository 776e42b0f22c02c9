use std::fmt::Write;

use super::types::{Inputs, MarketAnalysis, PortfolioResult, ProjectionScenario};

pub struct PortfolioReport<'a> {
    pub inputs: &'a Inputs,
    pub result: &'a PortfolioResult,
    pub market: Option<&'a MarketAnalysis>,
    pub narrative: Option<&'a str>,
}

impl PortfolioReport<'_> {
    pub fn render_markdown(&self) -> String {
        let mut out = String::new();
        out.push_str("# All-Weather Portfolio Report\n\n");
        self.write_market_section(&mut out);
        self.write_allocation_section(&mut out);
        self.write_projection_section(&mut out);
        self.write_plan_section(&mut out);
        self.write_risk_section(&mut out);
        if let Some(text) = self.narrative.map(str::trim).filter(|t| !t.is_empty()) {
            out.push_str("\n## Market Commentary\n\n");
            out.push_str(text);
            out.push('\n');
        }
        out
    }

    fn write_market_section(&self, out: &mut String) {
        out.push_str("## Market Analysis\n\n");
        match self.market {
            Some(market) => {
                let _ = writeln!(
                    out,
                    "- **Volatility Level**: {} ({:.2}%)",
                    market.volatility_level(),
                    market.volatility_percent
                );
                let _ = writeln!(out, "- **Market Trend**: {}", market.trend.label());
                let _ = writeln!(out, "- **Market Outlook**: {}", market.outlook());
            }
            None => out.push_str("- Market data unavailable\n"),
        }
        out.push('\n');
    }

    fn write_allocation_section(&self, out: &mut String) {
        let inputs = self.inputs;
        let monthly = inputs.monthly_investment;

        out.push_str("## Portfolio Allocation\n\n");
        let _ = writeln!(out, "- **Strategy**: {}", inputs.strategy.name());
        let _ = writeln!(out, "- **Risk Profile**: {}", inputs.risk);
        let _ = writeln!(out, "- **Age**: {}", inputs.age);
        let _ = writeln!(out, "- **Monthly Investment**: {}", format_currency(monthly));

        out.push_str("\n```mermaid\npie title Asset Allocation\n");
        for share in self.result.allocation.iter() {
            let _ = writeln!(
                out,
                "    \"{}\" : {:.1}",
                display_name(&share.asset),
                share.percent
            );
        }
        out.push_str("```\n\n");

        out.push_str("### Detailed Breakdown\n\n");
        out.push_str("| Asset Class | Allocation (%) | Recommended Funds | Monthly Investment |\n");
        out.push_str("|-------------|----------------|-------------------|--------------------|\n");
        for contribution in &self.result.plan.contributions {
            let funds = if contribution.funds.is_empty() {
                "-".to_string()
            } else {
                contribution
                    .funds
                    .iter()
                    .map(|f| format!("{} ({:.0}%)", f.ticker, f.weight_percent))
                    .collect::<Vec<_>>()
                    .join(", ")
            };
            let _ = writeln!(
                out,
                "| {} | {:.1}% | {} | {} |",
                display_name(&contribution.asset),
                contribution.percent,
                funds,
                format_currency(contribution.monthly_amount)
            );
        }
        out.push('\n');
    }

    fn write_projection_section(&self, out: &mut String) {
        out.push_str("## Investment Growth Projection\n\n");
        let _ = writeln!(
            out,
            "- Starting Monthly Investment: **{}**\n",
            format_currency(self.inputs.monthly_investment)
        );
        for scenario in &self.result.projection.scenarios {
            let _ = writeln!(out, "**{}**:", scenario_heading(scenario));
            for point in &scenario.points {
                let _ = writeln!(
                    out,
                    "- {} Years: **{}**",
                    point.years,
                    format_currency(point.value)
                );
            }
            out.push('\n');
        }
    }

    fn write_plan_section(&self, out: &mut String) {
        let plan = &self.result.plan;
        out.push_str("## Implementation Plan\n\n");
        out.push_str("1. Open a brokerage account (Vanguard, Fidelity, Schwab).\n");
        let _ = writeln!(
            out,
            "2. Set up automatic investments of **{}** per month.",
            format_currency(self.inputs.monthly_investment)
        );
        out.push_str("3. Enable dividend reinvestment (DRIP).\n");
        let _ = writeln!(
            out,
            "4. Rebalance {} when any asset class drifts more than {:.0}% from target.\n",
            plan.rebalancing,
            plan.drift_threshold_percent
        );
    }

    fn write_risk_section(&self, out: &mut String) {
        let allocation = &self.result.allocation;
        out.push_str("## Risk Management\n\n");
        let _ = writeln!(
            out,
            "- Diversification across {} asset classes",
            allocation.len()
        );
        out.push_str("- Regular rebalancing to maintain the target risk\n");
        out.push_str("- Dollar-cost averaging through market fluctuations\n");
        if let Some(cash) = allocation.percent_of("cash") {
            let _ = writeln!(out, "- Emergency fund maintained at {cash:.1}%");
        }
    }
}

fn scenario_heading(scenario: &ProjectionScenario) -> String {
    let name = scenario
        .label
        .split('_')
        .next()
        .unwrap_or(scenario.label.as_str());
    format!(
        "{} ({} Return)",
        capitalize(name),
        format_rate(scenario.annual_rate)
    )
}

fn format_rate(rate: f64) -> String {
    let pct = rate * 100.0;
    if (pct - pct.round()).abs() < 1e-9 {
        format!("{pct:.0}%")
    } else {
        format!("{pct:.1}%")
    }
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

pub fn display_name(asset: &str) -> String {
    asset
        .split('_')
        .filter(|part| !part.is_empty())
        .map(|part| {
            if part.eq_ignore_ascii_case("us") {
                "US".to_string()
            } else {
                capitalize(part)
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

pub fn format_currency(value: f64) -> String {
    let cents = (value.abs() * 100.0).round() as u64;
    let whole = (cents / 100).to_string();
    let mut grouped = String::with_capacity(whole.len() + whole.len() / 3);
    for (idx, ch) in whole.chars().enumerate() {
        if idx > 0 && (whole.len() - idx) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }
    let sign = if value < 0.0 && cents > 0 { "-" } else { "" };
    format!("{sign}${grouped}.{:02}", cents % 100)
}
