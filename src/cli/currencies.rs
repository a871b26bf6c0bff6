use super::ui;
use crate::core::currency::{CurrencySets, market_symbol};
use comfy_table::Cell;
use std::collections::HashMap;

/// Renders the supported currencies, crypto first, with their market symbols.
pub fn display_as_table(currencies: &CurrencySets, symbols: &HashMap<String, String>) -> String {
    let mut table = ui::new_styled_table();
    table.set_header(vec![
        ui::header_cell("Currency"),
        ui::header_cell("Kind"),
        ui::header_cell("Market symbol"),
    ]);

    for id in &currencies.crypto {
        table.add_row(vec![
            Cell::new(id),
            Cell::new("Crypto"),
            Cell::new(market_symbol(symbols, id)),
        ]);
    }
    for id in &currencies.fiat {
        table.add_row(vec![
            Cell::new(id),
            Cell::new("Fiat"),
            Cell::new(market_symbol(symbols, id)),
        ]);
    }

    format!(
        "Supported currencies: {}\n\n{}",
        ui::style_text(
            &(currencies.crypto.len() + currencies.fiat.len()).to_string(),
            ui::StyleType::TotalLabel
        ),
        table
    )
}

pub fn run(currencies: &CurrencySets, symbols: &HashMap<String, String>) {
    println!("{}", display_as_table(currencies, symbols));
}
