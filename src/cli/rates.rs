use super::ui;
use crate::controller::{RatesController, RatesView};
use anyhow::{Context, Result};
use comfy_table::Cell;

/// Formats a rate with more precision for small factors.
fn format_rate(rate: f64) -> String {
    if rate < 1.0 {
        format!("{rate:.6}")
    } else {
        format!("{rate:.4}")
    }
}

/// Parses a non-negative amount of the base currency to convert.
pub fn parse_amount(s: &str) -> Result<f64, String> {
    let amount: f64 = s
        .trim()
        .parse()
        .map_err(|_| format!("'{s}' is not a number"))?;
    if !amount.is_finite() || amount < 0.0 {
        return Err(format!("amount must be a non-negative number, got {s}"));
    }
    Ok(amount)
}

impl RatesView {
    /// Renders the projected rates; a second column converts `amount` when it is not 1.
    pub fn display_as_table(&self, amount: f64) -> String {
        let converting = amount != 1.0;
        let mut table = ui::new_styled_table();
        let mut header = vec![
            ui::header_cell("Currency"),
            ui::header_cell(&format!("1 {} =", self.base)),
        ];
        if converting {
            header.push(ui::header_cell(&format!("{amount} {} =", self.base)));
        }
        table.set_header(header);

        for rate in &self.display_rates {
            let mut row = vec![
                Cell::new(rate.currency.to_string()),
                ui::format_optional_cell(rate.value, format_rate),
            ];
            if converting {
                row.push(ui::format_optional_cell(rate.convert(amount), |v| {
                    format!("{v:.2}")
                }));
            }
            table.add_row(row);
        }

        let mut output = format!(
            "Base currency: {}\n\n",
            ui::style_text(&self.base.to_string(), ui::StyleType::Title)
        );
        output.push_str(&table.to_string());

        let updated = self.last_updated.map_or("never".to_string(), |t| {
            t.format("%Y-%m-%d %H:%M:%S UTC").to_string()
        });
        output.push_str(&format!(
            "\n\n{}",
            ui::style_text(&format!("Last updated: {updated}"), ui::StyleType::Subtle)
        ));

        if let Some(previous) = self.previous_base {
            output.push_str(&format!(
                "\n{}",
                ui::style_text(
                    &format!("Switching from {previous}; waiting for {} rates.", self.base),
                    ui::StyleType::Subtle
                )
            ));
        }
        if self.loading {
            output.push_str(&format!(
                "\n{}",
                ui::style_text("Loading latest rates...", ui::StyleType::Subtle)
            ));
        }
        if self.rate_limit_error {
            output.push_str(&format!(
                "\n{}",
                ui::style_text(
                    "Rate limit exceeded; showing cached rates where available.",
                    ui::StyleType::Warning
                )
            ));
        }
        if let Some(failure) = &self.failure {
            output.push_str(&format!(
                "\n{}",
                ui::style_text(&failure.to_string(), ui::StyleType::Error)
            ));
        }

        output
    }
}

/// Fetches the active base once and prints the resulting table.
pub async fn show_rates(controller: &mut RatesController, amount: f64) -> Result<()> {
    let base = controller.state().active_base;
    let spinner = ui::new_spinner(&format!("Fetching {base} rates..."));
    let result = controller.refresh().await;
    spinner.finish_and_clear();

    println!("{}", controller.view().display_as_table(amount));
    result
        .map(|_| ())
        .with_context(|| format!("Failed to fetch rates for {base}"))
}

#[cfg(test)]
mod tests {
    use super::parse_amount;
    use crate::controller::{DisplayRate, DisplaySelection, RatesView};
    use crate::core::{CurrencyCode, RateTable};

    fn view() -> RatesView {
        RatesView {
            base: CurrencyCode::EUR,
            previous_base: None,
            rates: RateTable::new(),
            display_rates: vec![
                DisplayRate {
                    currency: CurrencyCode::USD,
                    value: Some(1.0842),
                },
                DisplayRate {
                    currency: CurrencyCode::JPY,
                    value: None,
                },
            ],
            selection: DisplaySelection::default(),
            loading: false,
            rate_limit_error: true,
            last_updated: None,
            failure: None,
        }
    }

    #[test]
    fn test_table_shows_missing_rate_as_na() {
        let output = console::strip_ansi_codes(&view().display_as_table(1.0)).to_string();
        assert!(output.contains("1 EUR ="));
        assert!(output.contains("USD"));
        assert!(output.contains("1.0842"));
        assert!(output.contains("JPY"));
        assert!(output.contains("N/A"));
        assert!(output.contains("Last updated: never"));
        assert!(output.contains("Rate limit exceeded"));
    }

    #[test]
    fn test_table_converts_amount() {
        let output = console::strip_ansi_codes(&view().display_as_table(250.0)).to_string();
        assert!(output.contains("250 EUR ="));
        assert!(output.contains("271.05"));
        assert_eq!(output.matches("N/A").count(), 2);

        let unit = console::strip_ansi_codes(&view().display_as_table(1.0)).to_string();
        assert_eq!(unit.matches("EUR =").count(), 1);
        assert_eq!(unit.matches("N/A").count(), 1);
    }

    #[test]
    fn test_pending_change_is_explained() {
        let mut pending = view();
        pending.base = CurrencyCode::USD;
        pending.previous_base = Some(CurrencyCode::EUR);

        let output = console::strip_ansi_codes(&pending.display_as_table(1.0)).to_string();
        assert!(output.contains("Switching from EUR; waiting for USD rates."));
        let settled = console::strip_ansi_codes(&view().display_as_table(1.0)).to_string();
        assert!(!settled.contains("Switching from"));
    }

    #[test]
    fn test_parse_amount() {
        assert_eq!(parse_amount("250"), Ok(250.0));
        assert_eq!(parse_amount(" 0.5 "), Ok(0.5));
        assert_eq!(parse_amount("0"), Ok(0.0));
        assert!(parse_amount("-3").is_err());
        assert!(parse_amount("abc").is_err());
        assert!(parse_amount("inf").is_err());
        assert!(parse_amount("NaN").is_err());
    }
}
