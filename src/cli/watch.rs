use super::rates::parse_amount;
use super::ui;
use crate::controller::{DisplaySelection, RateServiceHandle};
use crate::core::CurrencyCode;
use crate::store::SelectionStore;
use anyhow::{Result, anyhow, bail};
use std::str::FromStr;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{debug, warn};

/// A line typed by the user while watching.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum WatchInput {
    Base(CurrencyCode),
    Amount(f64),
    Show(CurrencyCode),
    Hide(CurrencyCode),
    Refresh,
    Preload,
    Quit,
}

impl FromStr for WatchInput {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut parts = s.split_whitespace();
        let verb = parts.next().unwrap_or_default().to_lowercase();
        let arg = parts.next();
        let currency = || -> Result<CurrencyCode> {
            let code = arg.ok_or_else(|| anyhow!("'{verb}' needs a currency code"))?;
            Ok(code.parse()?)
        };
        let input = match verb.as_str() {
            "base" => WatchInput::Base(currency()?),
            "amount" => {
                let value = arg.ok_or_else(|| anyhow!("'amount' needs a number"))?;
                WatchInput::Amount(parse_amount(value).map_err(|e| anyhow!(e))?)
            }
            "show" => WatchInput::Show(currency()?),
            "hide" => WatchInput::Hide(currency()?),
            "refresh" | "r" => WatchInput::Refresh,
            "preload" => WatchInput::Preload,
            "quit" | "q" | "exit" => WatchInput::Quit,
            "" => bail!("empty command"),
            other => bail!("unknown command '{other}'"),
        };
        Ok(input)
    }
}

const HELP: &str =
    "Commands: base <CODE> | amount <N> | show <CODE> | hide <CODE> | refresh | preload | quit";

fn persist(
    store: Option<&SelectionStore>,
    last_saved: &mut DisplaySelection,
    current: &DisplaySelection,
) {
    let Some(store) = store else {
        return;
    };
    if last_saved == current {
        return;
    }
    match store.save(current) {
        Ok(()) => *last_saved = current.clone(),
        Err(e) => warn!(error = %e, "Failed to save selection"),
    }
}

/// Renders every update and forwards stdin commands until quit or Ctrl-C.
pub async fn run_watch(
    handle: RateServiceHandle,
    store: Option<SelectionStore>,
    mut amount: f64,
) -> Result<()> {
    let mut views = handle.subscribe();
    let mut last_saved = views.borrow().selection.clone();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);

    println!("{}", ui::style_text(HELP, ui::StyleType::Subtle));

    loop {
        tokio::select! {
            _ = &mut ctrl_c => break,
            changed = views.changed() => {
                if changed.is_err() {
                    break;
                }
                let view = views.borrow_and_update().clone();
                ui::print_separator();
                println!("{}", view.display_as_table(amount));
                persist(store.as_ref(), &mut last_saved, &view.selection);
            }
            line = lines.next_line() => {
                let Some(line) = line? else { break };
                if line.trim().is_empty() {
                    continue;
                }
                let sent = match line.parse::<WatchInput>() {
                    Ok(WatchInput::Quit) => break,
                    Ok(WatchInput::Base(base)) => handle.set_active_base(base),
                    Ok(WatchInput::Amount(value)) => {
                        amount = value;
                        ui::print_separator();
                        println!("{}", handle.view().display_as_table(amount));
                        continue;
                    }
                    Ok(WatchInput::Show(currency)) => handle.set_displayed(currency, true),
                    Ok(WatchInput::Hide(currency)) => handle.set_displayed(currency, false),
                    Ok(WatchInput::Refresh) => handle.request_force_refresh(),
                    Ok(WatchInput::Preload) => handle.request_preload(),
                    Err(e) => {
                        let message = format!("{e}. {HELP}");
                        println!("{}", ui::style_text(&message, ui::StyleType::Error));
                        continue;
                    }
                };
                sent?;
            }
        }
    }

    debug!("Tearing down rate service");
    handle.teardown().await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_commands() {
        assert_eq!(
            "base usd".parse::<WatchInput>().unwrap(),
            WatchInput::Base(CurrencyCode::USD)
        );
        assert_eq!(
            "  SHOW JPY ".parse::<WatchInput>().unwrap(),
            WatchInput::Show(CurrencyCode::JPY)
        );
        assert_eq!(
            "hide gbp".parse::<WatchInput>().unwrap(),
            WatchInput::Hide(CurrencyCode::GBP)
        );
        assert_eq!(
            "amount 250".parse::<WatchInput>().unwrap(),
            WatchInput::Amount(250.0)
        );
        assert_eq!("r".parse::<WatchInput>().unwrap(), WatchInput::Refresh);
        assert_eq!("preload".parse::<WatchInput>().unwrap(), WatchInput::Preload);
        assert_eq!("quit".parse::<WatchInput>().unwrap(), WatchInput::Quit);
    }

    #[test]
    fn test_parse_rejects_bad_input() {
        assert!("base".parse::<WatchInput>().is_err());
        assert!("base XYZ".parse::<WatchInput>().is_err());
        assert!("jump".parse::<WatchInput>().is_err());
        assert!("amount".parse::<WatchInput>().is_err());
        assert!("amount -5".parse::<WatchInput>().is_err());
    }
}
