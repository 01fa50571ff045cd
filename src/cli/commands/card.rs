//! `passvault card`: identity documents and payment cards.
//!
//! Usage:
//!   passvault card types
//!   passvault card add passport "My passport" --field passportNumber=X1234567 --expires 2031-05-01
//!   passvault card expiring --days 60
//!   passvault card list --type credit_card

use std::fs;

use chrono::{NaiveDate, Utc};
use console::style;
use zeroize::Zeroizing;

use crate::cli::output;
use crate::cli::{confirm, open_vault, CardAction, Cli};
use crate::errors::{Result, VaultError};
use crate::model::card::EXPIRES_SOON_DAYS;
use crate::model::{CardFields, CardType, ExpiryStatus, IdentityCard, NewCard};

/// Execute a `card` subcommand.
pub fn execute(cli: &Cli, action: &CardAction) -> Result<()> {
    match action {
        CardAction::Add {
            card_type,
            name,
            fields,
            expires,
            issued,
            country,
            authority,
            photo,
        } => {
            let card_type = parse_card_type(card_type)?;
            let fields = parse_fields(fields)?;
            let mut new = NewCard::new(card_type, name.clone());
            new.expiry_date = expires.as_deref().map(parse_date).transpose()?;
            new.issue_date = issued.as_deref().map(parse_date).transpose()?;
            new.issuing_country = country.clone();
            new.issuing_authority = authority.clone();
            let photo = photo
                .as_ref()
                .map(fs::read)
                .transpose()?
                .map(Zeroizing::new);

            let (_, mut vault) = open_vault(cli)?;
            let card = vault.add_card(new, &fields, photo.as_ref().map(|p| p.as_slice()))?;
            output::success(&format!(
                "Added {} '{}' (id {})",
                card.card_type.display_name(),
                card.name,
                card.id
            ));
            Ok(())
        }
        CardAction::List { search, card_type } => {
            let card_type = card_type.as_deref().map(parse_card_type).transpose()?;
            let (_, vault) = open_vault(cli)?;
            let mut cards = match (search, card_type) {
                (Some(query), _) => vault.search_cards(query)?,
                (None, Some(t)) => vault.list_cards_by_type(t)?,
                (None, None) => vault.list_cards()?,
            };
            if let Some(t) = card_type {
                cards.retain(|c| c.card_type == t);
            }
            print_cards_table(&cards, Utc::now().date_naive());
            Ok(())
        }
        CardAction::Show { id } => {
            let (_, vault) = open_vault(cli)?;
            let card = vault.get_card(*id)?;
            let fields = vault.read_card_fields(*id)?;

            println!(
                "{} {}",
                style(&card.name).bold(),
                style(format!("[{}]", card.card_type.display_name())).dim()
            );
            let mut table = output::table(vec!["Field", "Value"]);
            for (name, value) in fields.iter() {
                table.add_row(vec![name.to_string(), value.to_string()]);
            }
            if let Some(country) = &card.issuing_country {
                table.add_row(vec!["issuingCountry".to_string(), country.clone()]);
            }
            if let Some(date) = card.issue_date {
                table.add_row(vec!["issueDate".to_string(), date.to_string()]);
            }
            if let Some(date) = card.expiry_date {
                table.add_row(vec!["expiryDate".to_string(), date.to_string()]);
            }
            println!("{table}");
            if card.photo.is_some() {
                output::info("This card has a photo attached.");
            }
            Ok(())
        }
        CardAction::Expiring { days } => {
            let (settings, vault) = open_vault(cli)?;
            let days = days.unwrap_or(settings.expiry_warning_days);
            let today = Utc::now().date_naive();
            let cards = vault.expiring_cards(days, today)?;
            if cards.is_empty() {
                output::success(&format!("No cards expire within {days} days."));
                return Ok(());
            }
            print_cards_table(&cards, today);
            Ok(())
        }
        CardAction::Expired => {
            let (_, vault) = open_vault(cli)?;
            let today = Utc::now().date_naive();
            let cards = vault.expired_cards(today)?;
            if cards.is_empty() {
                output::success("No expired cards.");
                return Ok(());
            }
            print_cards_table(&cards, today);
            Ok(())
        }
        CardAction::Stats => {
            let (_, vault) = open_vault(cli)?;
            let stats = vault.card_statistics(Utc::now().date_naive())?;
            let mut table = output::table(vec!["", "Cards"]);
            table.add_row(vec!["Total".to_string(), stats.total.to_string()]);
            table.add_row(vec!["Expired".to_string(), stats.expired.to_string()]);
            table.add_row(vec![
                format!("Expiring within {EXPIRES_SOON_DAYS} days"),
                stats.expiring_soon.to_string(),
            ]);
            for (card_type, count) in &stats.by_type {
                table.add_row(vec![card_type.display_name().to_string(), count.to_string()]);
            }
            println!("{table}");
            Ok(())
        }
        CardAction::Types => {
            let mut table = output::table(vec!["Type", "Name", "Fields"]);
            for t in CardType::all() {
                table.add_row(vec![
                    type_key(t),
                    t.display_name().to_string(),
                    t.fields().join(", "),
                ]);
            }
            println!("{table}");
            Ok(())
        }
        CardAction::Delete { id, force } => {
            if !confirm(&format!("Delete card {id}?"), *force)? {
                output::info("Cancelled.");
                return Ok(());
            }
            let (_, mut vault) = open_vault(cli)?;
            vault.delete_card(*id)?;
            output::success(&format!("Deleted card {id}"));
            Ok(())
        }
    }
}

fn parse_card_type(name: &str) -> Result<CardType> {
    CardType::parse(name).ok_or_else(|| {
        let all: Vec<String> = CardType::all().map(type_key).collect();
        VaultError::InvalidInput(format!(
            "unknown card type '{name}' (expected one of: {})",
            all.join(", ")
        ))
    })
}

/// The snake_case key a card type is stored and parsed under.
fn type_key(card_type: CardType) -> String {
    serde_json::to_value(card_type)
        .ok()
        .and_then(|v| v.as_str().map(str::to_string))
        .unwrap_or_default()
}

/// Parse `name=value` pairs.  Values may themselves contain `=`.
fn parse_fields(pairs: &[String]) -> Result<CardFields> {
    let mut fields = CardFields::new();
    for pair in pairs {
        // The pair may be a bare secret value, so it is never echoed back.
        let (name, value) = pair
            .split_once('=')
            .ok_or_else(|| VaultError::InvalidInput("fields must look like NAME=VALUE".into()))?;
        if name.trim().is_empty() {
            return Err(VaultError::InvalidInput("field name cannot be empty".into()));
        }
        fields.insert(name.trim(), value);
    }
    Ok(fields)
}

fn parse_date(s: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .map_err(|_| VaultError::InvalidInput(format!("invalid date '{s}', use YYYY-MM-DD")))
}

fn expiry_label(card: &IdentityCard, today: NaiveDate) -> String {
    let days = card.days_until_expiry(today).unwrap_or_default();
    match card.expiry_status(today) {
        ExpiryStatus::NoExpiry => "-".to_string(),
        ExpiryStatus::Expired => style(format!("expired {} days ago", -days)).red().to_string(),
        ExpiryStatus::ExpiresSoon => style(format!("in {days} days")).red().to_string(),
        ExpiryStatus::Expiring => style(format!("in {days} days")).yellow().to_string(),
        ExpiryStatus::Valid => style("valid").green().to_string(),
    }
}

fn print_cards_table(cards: &[IdentityCard], today: NaiveDate) {
    if cards.is_empty() {
        output::info("No cards in this vault yet.");
        output::tip("Run `passvault card types` to see what can be stored.");
        return;
    }

    let mut table = output::table(vec!["ID", "Name", "Type", "Number", "Expires", "Status"]);
    for c in cards {
        table.add_row(vec![
            c.id.to_string(),
            c.name.clone(),
            c.card_type.display_name().to_string(),
            c.number_hint
                .as_deref()
                .map_or_else(|| "-".to_string(), |h| format!("\u{2022}\u{2022}\u{2022}\u{2022}{h}")),
            c.expiry_date.map_or_else(|| "-".to_string(), |d| d.to_string()),
            expiry_label(c, today),
        ]);
    }
    println!("{table}");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_fields_splits_on_first_equals() {
        let fields = parse_fields(&["notes=a=b".to_string(), "cvv=123".to_string()]).unwrap();
        assert_eq!(fields.get("notes"), Some("a=b"));
        assert_eq!(fields.get("cvv"), Some("123"));
    }

    #[test]
    fn parse_fields_rejects_bare_values() {
        let err = parse_fields(&["4111111111111111".to_string()]).unwrap_err();
        assert!(!err.to_string().contains("4111"));
        assert!(parse_fields(&["=value".to_string()]).is_err());
    }

    #[test]
    fn card_type_keys_parse_back() {
        for t in CardType::all() {
            assert_eq!(parse_card_type(&type_key(t)).unwrap(), t);
        }
        assert!(parse_card_type("library_card").is_err());
    }

    #[test]
    fn parse_date_format() {
        assert_eq!(
            parse_date("2031-05-01").unwrap(),
            NaiveDate::from_ymd_opt(2031, 5, 1).unwrap()
        );
        assert!(parse_date("01/05/2031").is_err());
    }
}
