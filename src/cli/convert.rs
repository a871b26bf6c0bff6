use super::ui;
use crate::core::exchange::{ConversionReport, Exchange};
use anyhow::{Result, bail};
use comfy_table::Cell;

impl ConversionReport {
    pub fn display_as_table(&self, reporting_currency: &str) -> String {
        let conversion = &self.conversion;
        let source = conversion.source.to_uppercase();
        let target = conversion.target.to_uppercase();
        let reporting = reporting_currency.to_uppercase();

        let mut table = ui::new_styled_table();
        table.set_header(vec![ui::header_cell("Item"), ui::header_cell("Value")]);

        table.add_row(vec![
            Cell::new(format!("Rate (1 {source} in {target})")),
            ui::format_optional_cell(conversion.rate, |r| format!("{r:.6}")),
        ]);
        table.add_row(vec![
            Cell::new("Market symbol"),
            Cell::new(&self.market_symbol),
        ]);

        if let Some(report) = &self.forecast {
            let forecast = report.forecast();
            table.add_row(vec![
                Cell::new(format!("Latest price ({reporting})")),
                ui::format_optional_cell(report.latest_price, |p| format!("{p:.2}")),
            ]);
            table.add_row(vec![
                Cell::new(format!("Tomorrow's forecast ({reporting})")),
                ui::format_optional_cell(forecast.map(|f| f.tomorrow_price), |p| {
                    format!("{p:.2}")
                }),
            ]);
            table.add_row(vec![
                Cell::new("Forecast chart"),
                ui::format_optional_cell(forecast.map(|f| &f.artifact), |path| {
                    path.display().to_string()
                }),
            ]);
        }

        let mut output = format!(
            "Conversion: {}\n\n",
            ui::style_text(
                &format!("{} {source} to {target}", conversion.amount),
                ui::StyleType::Title
            )
        );
        output.push_str(&table.to_string());

        let result = match conversion.result {
            Some(value) => ui::style_text(&format!("{value:.2} {target}"), ui::StyleType::TotalValue),
            None => ui::style_text("Conversion unavailable", ui::StyleType::Error),
        };
        output.push_str(&format!(
            "\n\n{}: {}",
            ui::style_text("Result", ui::StyleType::TotalLabel),
            result
        ));

        if self.forecast.as_ref().is_some_and(|r| r.is_absent()) {
            output.push_str(&format!(
                "\n{}",
                ui::style_text("Forecast unavailable", ui::StyleType::Subtle)
            ));
        }

        output
    }
}

pub async fn run(
    exchange: &Exchange,
    amount: f64,
    from: &str,
    to: &str,
    reporting_currency: &str,
) -> Result<()> {
    if !amount.is_finite() {
        bail!("Amount must be a finite number, got {amount}");
    }
    let from = from.trim().to_lowercase();
    let to = to.trim().to_lowercase();

    let pb = ui::new_spinner(&format!("Converting {from} to {to}..."));
    let report = exchange.convert(amount, &from, &to).await;
    pb.finish_and_clear();

    println!("{}", report.display_as_table(reporting_currency));
    Ok(())
}

#[cfg(test)]
mod tests {
    use crate::core::exchange::ConversionReport;
    use crate::core::rate::Conversion;

    fn conversion(rate: Option<f64>) -> Conversion {
        Conversion {
            amount: 2.0,
            source: "eur".to_string(),
            target: "usd".to_string(),
            rate,
            result: rate.map(|r| r * 2.0),
        }
    }

    #[test]
    fn test_display_known_rate() {
        console::set_colors_enabled(false);
        let report = ConversionReport {
            conversion: conversion(Some(1.1)),
            market_symbol: "EURUSD".to_string(),
            forecast: None,
        };

        let output = report.display_as_table("usd");
        assert!(output.contains("2 EUR to USD"));
        assert!(output.contains("1.100000"));
        assert!(output.contains("2.20 USD"));
        assert!(!output.contains("Forecast chart"));
    }

    #[test]
    fn test_display_unknown_rate() {
        console::set_colors_enabled(false);
        let report = ConversionReport {
            conversion: conversion(None),
            market_symbol: "EURUSD".to_string(),
            forecast: None,
        };

        let output = report.display_as_table("usd");
        assert!(output.contains("N/A"));
        assert!(output.contains("Conversion unavailable"));
    }
}
