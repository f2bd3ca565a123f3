use anyhow::{anyhow, Result};
use colored::Colorize;

use crate::usage::loader::load_usage;
use crate::usage::types::{LoadOptions, Period, Source, UsageResponse};

/// Run the usage command, printing one report to the terminal
pub async fn run(
    source: String,
    period: String,
    mode: Option<String>,
    timezone: Option<String>,
    start_of_week: Option<String>,
    breakdown: bool,
) -> Result<()> {
    let source: Source = source.parse().map_err(|e: String| anyhow!(e))?;
    let period: Period = period.parse().map_err(|e: String| anyhow!(e))?;

    let options = LoadOptions {
        mode: match mode {
            Some(raw) => Some(raw.parse().map_err(|e: String| anyhow!(e))?),
            None => None,
        },
        timezone,
        start_of_week,
        breakdown,
    };

    let response = load_usage(source, period, &options).await;
    render(&response);
    Ok(())
}

fn render(response: &UsageResponse) {
    println!(
        "\n{}",
        format!("  {} usage \u{2014} {}", response.source, response.period)
            .bold()
            .bright_yellow()
    );
    println!("{}", "  ─────────────────────────────".dimmed());

    for error in &response.errors {
        println!("  {} {}", "!".red().bold(), error.red());
    }

    if response.empty_state.is_empty {
        println!("\n  {}", "No local usage data found.".bold());
        if !response.empty_state.missing_paths.is_empty() {
            println!("\n  {}", "Checked paths:".bold());
            for path in &response.empty_state.missing_paths {
                println!("    {}", path.dimmed());
            }
        }
        println!("\n  {}", "Getting started:".bold());
        for step in &response.empty_state.checklist {
            println!("    {} {}", "\u{2022}".bright_yellow(), step);
        }
        println!();
        return;
    }

    if let Some(summary) = &response.summary {
        println!(
            "\n  {} {} tokens, ${:.2}",
            "Total:".bold(),
            format_count(summary.total_tokens).bright_yellow(),
            summary.total_cost_usd
        );
        println!(
            "  {} {} in / {} out",
            "Split:".bold(),
            format_count(summary.total_input_tokens).dimmed(),
            format_count(summary.total_output_tokens).dimmed()
        );
    }

    // Cost timeline (simple bar chart)
    if !response.series.is_empty() {
        println!("\n  {}", "Cost Timeline:".bold());
        let max_cost = response
            .series
            .iter()
            .map(|p| p.cost_usd)
            .fold(0.0_f64, f64::max);
        for point in &response.series {
            let bar_len = if max_cost > 0.0 {
                ((point.cost_usd / max_cost) * 30.0).round() as usize
            } else {
                0
            };
            let bar: String = "\u{2588}".repeat(bar_len);
            println!(
                "  {} {} {}",
                point.label.dimmed(),
                bar.bright_yellow(),
                format!("${:.2}", point.cost_usd).dimmed()
            );
        }
    }

    if !response.sessions.is_empty() {
        println!("\n  {}", "Sessions:".bold());
        for session in response.sessions.iter().take(15) {
            println!(
                "  {} {} {} {}",
                session.last_activity.dimmed(),
                truncate(&session.session_id, 24),
                format!("${:.2}", session.total_cost_usd).bright_yellow(),
                session.models_used.join(", ").dimmed()
            );
        }
    }

    if !response.blocks.is_empty() {
        println!("\n  {}", "Billing Blocks:".bold());
        for block in &response.blocks {
            let marker = if block.is_active {
                "\u{25cf}".green()
            } else {
                "\u{25cb}".dimmed()
            };
            println!(
                "  {} {} \u{2192} {} {} {}",
                marker,
                block.start_time.dimmed(),
                block.end_time.dimmed(),
                format!("${:.2}", block.cost_usd).bright_yellow(),
                format_count(block.total_tokens).dimmed()
            );
        }
    }

    println!();
}

fn format_count(n: u64) -> String {
    if n >= 1_000_000 {
        format!("{:.1}M", n as f64 / 1_000_000.0)
    } else if n >= 1_000 {
        format!("{:.1}K", n as f64 / 1_000.0)
    } else {
        n.to_string()
    }
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let head: String = s.chars().take(max.saturating_sub(1)).collect();
        format!("{}\u{2026}", head)
    }
}
