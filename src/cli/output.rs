//! CLI Output Formatting.
//!
//! Renders scenario reports and parameters as text, JSON or pretty JSON.

use console::style;
use serde::Serialize;

use crate::cli::scenario::ScenarioReport;
use crate::core::config::EngineParams;
use crate::utils::math::format_units;

// ═══════════════════════════════════════════════════════════════════════════════
// OUTPUT FORMAT
// ═══════════════════════════════════════════════════════════════════════════════

/// Output format options
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    /// Human-readable text
    #[default]
    Text,
    /// JSON format
    Json,
    /// Pretty JSON format
    JsonPretty,
}

impl std::str::FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "text" | "txt" => Ok(OutputFormat::Text),
            "json" => Ok(OutputFormat::Json),
            "json-pretty" | "jsonpretty" => Ok(OutputFormat::JsonPretty),
            _ => Err(format!("Unknown format: {}", s)),
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// OUTPUT FORMATTER
// ═══════════════════════════════════════════════════════════════════════════════

/// Output formatter for CLI
#[derive(Debug, Clone)]
pub struct OutputFormatter {
    format: OutputFormat,
    color: bool,
}

impl Default for OutputFormatter {
    fn default() -> Self {
        Self::new(OutputFormat::Text)
    }
}

impl OutputFormatter {
    /// Create new formatter
    pub fn new(format: OutputFormat) -> Self {
        Self {
            format,
            color: true,
        }
    }

    /// Disable color
    pub fn without_color(mut self) -> Self {
        self.color = false;
        self
    }

    /// Get format
    pub fn format(&self) -> OutputFormat {
        self.format
    }

    /// Print success message
    pub fn success(&self, message: &str) {
        match self.format {
            OutputFormat::Text => println!("{} {}", self.paint_ok("✓"), message),
            _ => self.print_json(&serde_json::json!({ "status": "success", "message": message })),
        }
    }

    /// Print error message
    pub fn error(&self, message: &str) {
        match self.format {
            OutputFormat::Text => eprintln!("{} {}", self.paint_err("✗"), message),
            _ => self.print_json(&serde_json::json!({ "status": "error", "message": message })),
        }
    }

    /// Print a scenario report
    pub fn report(&self, report: &ScenarioReport) {
        match self.format {
            OutputFormat::Text => print!("{}", self.render_report(report)),
            _ => self.print_json(report),
        }
    }

    /// Print engine parameters
    pub fn params(&self, params: &EngineParams) {
        match self.format {
            OutputFormat::Text => print!("{}", self.render_params(params)),
            _ => self.print_json(params),
        }
    }

    /// Text rendering of a scenario report
    pub fn render_report(&self, report: &ScenarioReport) -> String {
        let mut out = String::new();
        out.push_str(&self.section(report.name.as_deref().unwrap_or("Scenario")));

        for step in &report.steps {
            let mark = if step.ok {
                self.paint_ok("✓")
            } else {
                self.paint_err("✗")
            };
            out.push_str(&format!("{} {:>3}. {}\n", mark, step.index, step.description));
            if let Some(error) = &step.error {
                out.push_str(&format!("        {}\n", self.paint_err(error)));
            }
        }

        out.push_str(&self.section("Accounts"));
        let headers = ["user", "collateral", "wallet", "debt", "dsc", "health"];
        let rows: Vec<Vec<String>> = report
            .accounts
            .iter()
            .map(|account| {
                vec![
                    account.user.clone(),
                    join_balances(&account.collateral),
                    join_balances(&account.wallet),
                    account.dsc_minted.clone(),
                    account.dsc_balance.clone(),
                    account.health_factor.clone().unwrap_or_else(|| "stale".into()),
                ]
            })
            .collect();
        out.push_str(&self.render_table(&headers, &rows));

        out.push_str(&self.section("Totals"));
        out.push_str(&self.kv("DSC supply", &report.dsc_supply));
        out.push_str(&self.kv("Events", &report.events.to_string()));
        out.push_str(&self.kv("Liquidations", &report.liquidations.count.to_string()));
        out.push_str(&self.kv(
            "Debt liquidated",
            &format_units(report.liquidations.total_debt_covered),
        ));
        out.push_str(&self.kv("Failed steps", &report.failures().to_string()));
        out
    }

    /// Text rendering of engine parameters
    pub fn render_params(&self, params: &EngineParams) -> String {
        let mut out = self.section("Engine parameters");
        out.push_str(&self.kv("Feed decimals", &params.feed_decimals.to_string()));
        out.push_str(&self.kv(
            "Additional feed precision",
            &params.additional_feed_precision().to_string(),
        ));
        out.push_str(&self.kv(
            "Liquidation threshold",
            &format!("{}/{}", params.liquidation_threshold, params.liquidation_precision),
        ));
        out.push_str(&self.kv(
            "Liquidation bonus",
            &format!("{}/{}", params.liquidation_bonus, params.liquidation_precision),
        ));
        out.push_str(&self.kv("Min health factor", &format_units(params.min_health_factor)));
        out.push_str(&self.kv("Price timeout", &format!("{}s", params.price_timeout_secs)));
        out
    }

    fn section(&self, title: &str) -> String {
        let header = format!("=== {} ===", title);
        if self.color {
            format!("\n{}\n\n", style(header).cyan().bold())
        } else {
            format!("\n{}\n\n", header)
        }
    }

    fn kv(&self, key: &str, value: &str) -> String {
        if self.color {
            format!("{}: {}\n", style(key).bold(), value)
        } else {
            format!("{}: {}\n", key, value)
        }
    }

    fn paint_ok(&self, text: &str) -> String {
        if self.color {
            style(text).green().to_string()
        } else {
            text.to_string()
        }
    }

    fn paint_err(&self, text: &str) -> String {
        if self.color {
            style(text).red().to_string()
        } else {
            text.to_string()
        }
    }

    fn print_json<T: Serialize + ?Sized>(&self, data: &T) {
        let output = if matches!(self.format, OutputFormat::JsonPretty) {
            serde_json::to_string_pretty(data)
        } else {
            serde_json::to_string(data)
        };

        match output {
            Ok(json) => println!("{}", json),
            Err(e) => eprintln!("failed to encode output: {}", e),
        }
    }

    fn render_table(&self, headers: &[&str], rows: &[Vec<String>]) -> String {
        if headers.is_empty() {
            return String::new();
        }

        let mut widths: Vec<usize> = headers.iter().map(|h| h.chars().count()).collect();
        for row in rows {
            for (i, cell) in row.iter().enumerate() {
                if i < widths.len() {
                    widths[i] = widths[i].max(cell.chars().count());
                }
            }
        }

        let header_line: Vec<String> = headers
            .iter()
            .enumerate()
            .map(|(i, h)| format!("{:width$}", h, width = widths[i]))
            .collect();
        let header_line = header_line.join(" | ");

        let mut out = if self.color {
            format!("{}\n", style(header_line).bold())
        } else {
            format!("{}\n", header_line)
        };

        let separator: Vec<String> = widths.iter().map(|w| "-".repeat(*w)).collect();
        out.push_str(&separator.join("-+-"));
        out.push('\n');

        for row in rows {
            let cells: Vec<String> = row
                .iter()
                .enumerate()
                .map(|(i, cell)| {
                    let width = widths.get(i).copied().unwrap_or(0);
                    format!("{:width$}", cell, width = width)
                })
                .collect();
            out.push_str(cells.join(" | ").trim_end());
            out.push('\n');
        }
        out
    }
}

fn join_balances(balances: &std::collections::BTreeMap<String, String>) -> String {
    if balances.is_empty() {
        return "-".into();
    }
    balances
        .iter()
        .map(|(symbol, amount)| format!("{} {}", amount, symbol))
        .collect::<Vec<_>>()
        .join(", ")
}

// ═══════════════════════════════════════════════════════════════════════════════
// TESTS
// ═══════════════════════════════════════════════════════════════════════════════
