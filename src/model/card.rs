//! Identity cards (passports, licences, payment cards, ...).
//!
//! Which fields a card carries is data, not behaviour: `CardType::spec`
//! returns an entry of a static table listing the display name, the field
//! names, and which field holds the document number.

use std::collections::BTreeMap;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use zeroize::Zeroize;

use super::{Record, StoredEnvelope};

/// Days before expiry at which a card is reported as "expires soon".
pub const EXPIRES_SOON_DAYS: i64 = 30;

/// Days before expiry at which a card is reported as "expiring".
pub const EXPIRING_DAYS: i64 = 90;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CardType {
    Passport,
    DriversLicense,
    NationalId,
    CreditCard,
    DebitCard,
    BankAccount,
    Insurance,
    Ssn,
    Membership,
    Other,
}

/// Static description of one card type.
#[derive(Debug)]
pub struct CardTypeSpec {
    pub display_name: &'static str,
    pub fields: &'static [&'static str],
    /// Field whose last four characters are kept as a non-secret hint.
    pub number_field: Option<&'static str>,
}

static CARD_TYPES: [(CardType, CardTypeSpec); 10] = [
    (
        CardType::Passport,
        CardTypeSpec {
            display_name: "Passport",
            fields: &["passportNumber", "fullName", "nationality", "dateOfBirth", "placeOfBirth", "sex"],
            number_field: Some("passportNumber"),
        },
    ),
    (
        CardType::DriversLicense,
        CardTypeSpec {
            display_name: "Driver's License",
            fields: &["licenseNumber", "fullName", "dateOfBirth", "address", "class", "restrictions"],
            number_field: Some("licenseNumber"),
        },
    ),
    (
        CardType::NationalId,
        CardTypeSpec {
            display_name: "National ID",
            fields: &["idNumber", "fullName", "dateOfBirth", "address", "nationality"],
            number_field: Some("idNumber"),
        },
    ),
    (
        CardType::CreditCard,
        CardTypeSpec {
            display_name: "Credit Card",
            fields: &["cardNumber", "cardholderName", "cvv", "pin", "billingAddress"],
            number_field: Some("cardNumber"),
        },
    ),
    (
        CardType::DebitCard,
        CardTypeSpec {
            display_name: "Debit Card",
            fields: &["cardNumber", "cardholderName", "cvv", "pin", "bankName"],
            number_field: Some("cardNumber"),
        },
    ),
    (
        CardType::BankAccount,
        CardTypeSpec {
            display_name: "Bank Account",
            fields: &["accountNumber", "accountType", "routingNumber", "swiftCode", "bankName", "branchAddress"],
            number_field: Some("accountNumber"),
        },
    ),
    (
        CardType::Insurance,
        CardTypeSpec {
            display_name: "Insurance Card",
            fields: &["policyNumber", "groupNumber", "memberName", "memberId", "providerName", "providerPhone"],
            number_field: Some("policyNumber"),
        },
    ),
    (
        CardType::Ssn,
        CardTypeSpec {
            display_name: "SSN/Tax ID",
            fields: &["ssn", "fullName", "dateOfBirth"],
            number_field: Some("ssn"),
        },
    ),
    (
        CardType::Membership,
        CardTypeSpec {
            display_name: "Membership Card",
            fields: &["memberNumber", "memberName", "organizationName"],
            number_field: Some("memberNumber"),
        },
    ),
    (
        CardType::Other,
        CardTypeSpec {
            display_name: "Other",
            fields: &["customField1", "customField2", "customField3"],
            number_field: None,
        },
    ),
];

impl CardType {
    pub fn all() -> impl Iterator<Item = CardType> {
        CARD_TYPES.iter().map(|(t, _)| *t)
    }

    pub fn spec(self) -> &'static CardTypeSpec {
        CARD_TYPES
            .iter()
            .find(|(t, _)| *t == self)
            .map(|(_, spec)| spec)
            .unwrap_or(&CARD_TYPES[CARD_TYPES.len() - 1].1)
    }

    pub fn display_name(self) -> &'static str {
        self.spec().display_name
    }

    pub fn fields(self) -> &'static [&'static str] {
        self.spec().fields
    }

    /// Parse a snake_case type name such as `drivers_license`.
    pub fn parse(name: &str) -> Option<Self> {
        let wanted = name.trim().to_ascii_lowercase().replace('-', "_");
        Self::all().find(|t| {
            serde_json::to_value(t)
                .ok()
                .and_then(|v| v.as_str().map(|s| s == wanted))
                .unwrap_or(false)
        })
    }

    /// Last four characters of the document-number field, if long enough.
    pub fn number_hint(self, fields: &CardFields) -> Option<String> {
        let number = fields.get(self.spec().number_field?)?;
        let chars: Vec<char> = number.chars().collect();
        if chars.len() < 4 {
            return None;
        }
        Some(chars[chars.len() - 4..].iter().collect())
    }
}

/// Decrypted card field values, keyed by field name.
///
/// Backed by a `BTreeMap` so serialization is ordered and stable.  Values
/// are wiped on drop.
#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CardFields(BTreeMap<String, String>);

impl CardFields {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<String>) {
        if let Some(mut old) = self.0.insert(name.into(), value.into()) {
            old.zeroize();
        }
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.0.get(name).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Field names, in order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for CardFields {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut fields = Self::new();
        for (k, v) in iter {
            fields.insert(k, v);
        }
        fields
    }
}

impl Drop for CardFields {
    fn drop(&mut self) {
        for value in self.0.values_mut() {
            value.zeroize();
        }
    }
}

impl std::fmt::Debug for CardFields {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_set().entries(self.0.keys()).finish()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExpiryStatus {
    NoExpiry,
    Expired,
    ExpiresSoon,
    Expiring,
    Valid,
}

/// Counts over a set of cards on a given day.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CardStatistics {
    pub total: usize,
    pub expired: usize,
    /// Not yet expired, but within `EXPIRES_SOON_DAYS`.
    pub expiring_soon: usize,
    pub by_type: BTreeMap<CardType, usize>,
}

impl CardStatistics {
    pub fn collect<'a>(cards: impl IntoIterator<Item = &'a IdentityCard>, today: NaiveDate) -> Self {
        let mut stats = Self::default();
        for card in cards {
            stats.total += 1;
            match card.expiry_status(today) {
                ExpiryStatus::Expired => stats.expired += 1,
                ExpiryStatus::ExpiresSoon => stats.expiring_soon += 1,
                _ => {}
            }
            *stats.by_type.entry(card.card_type).or_default() += 1;
        }
        stats
    }
}

/// Non-secret details supplied when adding a card.
#[derive(Debug, Clone)]
pub struct NewCard {
    pub card_type: CardType,
    pub name: String,
    pub issuing_country: Option<String>,
    pub issuing_authority: Option<String>,
    pub issue_date: Option<NaiveDate>,
    pub expiry_date: Option<NaiveDate>,
    pub tags: Vec<String>,
}

impl NewCard {
    pub fn new(card_type: CardType, name: impl Into<String>) -> Self {
        Self {
            card_type,
            name: name.into(),
            issuing_country: None,
            issuing_authority: None,
            issue_date: None,
            expiry_date: None,
            tags: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IdentityCard {
    pub id: u64,
    pub card_type: CardType,
    pub name: String,

    /// The sealed `CardFields` map.
    pub fields: StoredEnvelope,

    /// Last four characters of the document number (not secret).
    #[serde(default)]
    pub number_hint: Option<String>,
    #[serde(default)]
    pub issuing_country: Option<String>,
    #[serde(default)]
    pub issuing_authority: Option<String>,
    #[serde(default)]
    pub issue_date: Option<NaiveDate>,
    #[serde(default)]
    pub expiry_date: Option<NaiveDate>,

    /// Sealed photo bytes, if any.
    #[serde(default)]
    pub photo: Option<StoredEnvelope>,

    #[serde(default)]
    pub tags: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub last_modified: DateTime<Utc>,
}

impl IdentityCard {
    /// Days from `today` until expiry (negative once expired).
    pub fn days_until_expiry(&self, today: NaiveDate) -> Option<i64> {
        self.expiry_date.map(|d| (d - today).num_days())
    }

    pub fn is_expired(&self, today: NaiveDate) -> bool {
        self.expiry_date.is_some_and(|d| d < today)
    }

    pub fn expiry_status(&self, today: NaiveDate) -> ExpiryStatus {
        match self.days_until_expiry(today) {
            None => ExpiryStatus::NoExpiry,
            Some(days) if days < 0 => ExpiryStatus::Expired,
            Some(days) if days <= EXPIRES_SOON_DAYS => ExpiryStatus::ExpiresSoon,
            Some(days) if days <= EXPIRING_DAYS => ExpiryStatus::Expiring,
            Some(_) => ExpiryStatus::Valid,
        }
    }
}

impl Record for IdentityCard {
    const TABLE: &'static str = "identity_cards";

    fn id(&self) -> u64 {
        self.id
    }

    fn assign_id(&mut self, id: u64) {
        self.id = id;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn card_expiring(expiry: Option<NaiveDate>) -> IdentityCard {
        IdentityCard {
            id: 1,
            card_type: CardType::Passport,
            name: "passport".into(),
            fields: StoredEnvelope {
                iv: vec![0; 16],
                data: vec![0; 16],
            },
            number_hint: None,
            issuing_country: None,
            issuing_authority: None,
            issue_date: None,
            expiry_date: expiry,
            photo: None,
            tags: vec![],
            created_at: Utc::now(),
            last_modified: Utc::now(),
        }
    }

    #[test]
    fn every_type_has_a_table_entry() {
        for t in CardType::all() {
            assert!(!t.fields().is_empty(), "{t:?} has no fields");
            if let Some(number) = t.spec().number_field {
                assert!(t.fields().contains(&number));
            }
        }
        assert_eq!(CardType::all().count(), 10);
    }

    #[test]
    fn parse_accepts_snake_and_kebab_case() {
        assert_eq!(CardType::parse("drivers_license"), Some(CardType::DriversLicense));
        assert_eq!(CardType::parse("credit-card"), Some(CardType::CreditCard));
        assert_eq!(CardType::parse("spaceship"), None);
    }

    #[test]
    fn number_hint_takes_last_four() {
        let fields: CardFields = [("cardNumber", "4111111111111234")].into_iter().collect();
        assert_eq!(CardType::CreditCard.number_hint(&fields).as_deref(), Some("1234"));
        assert_eq!(CardType::Other.number_hint(&fields), None);

        let short: CardFields = [("ssn", "12")].into_iter().collect();
        assert_eq!(CardType::Ssn.number_hint(&short), None);
    }

    #[test]
    fn expiry_status_thresholds() {
        let today = NaiveDate::from_ymd_opt(2026, 1, 1).unwrap();
        let at = |days: i64| card_expiring(Some(today + chrono::Duration::days(days)));

        assert_eq!(card_expiring(None).expiry_status(today), ExpiryStatus::NoExpiry);
        assert_eq!(at(-1).expiry_status(today), ExpiryStatus::Expired);
        assert_eq!(at(10).expiry_status(today), ExpiryStatus::ExpiresSoon);
        assert_eq!(at(60).expiry_status(today), ExpiryStatus::Expiring);
        assert_eq!(at(365).expiry_status(today), ExpiryStatus::Valid);
        assert!(at(-1).is_expired(today));
    }

    #[test]
    fn statistics_count_expiry_and_types() {
        let today = NaiveDate::from_ymd_opt(2026, 1, 1).unwrap();
        let at = |days: i64| card_expiring(Some(today + chrono::Duration::days(days)));
        let mut visa = at(400);
        visa.card_type = CardType::CreditCard;
        let cards = vec![at(-3), at(5), at(30), at(31), card_expiring(None), visa];

        let stats = CardStatistics::collect(&cards, today);
        assert_eq!(stats.total, 6);
        assert_eq!(stats.expired, 1);
        assert_eq!(stats.expiring_soon, 2);
        assert_eq!(stats.by_type.get(&CardType::Passport), Some(&5));
        assert_eq!(stats.by_type.get(&CardType::CreditCard), Some(&1));
        assert_eq!(CardStatistics::collect(&[], today), CardStatistics::default());
    }

    #[test]
    fn card_fields_serialize_sorted() {
        let fields: CardFields = [("zeta", "1"), ("alpha", "2")].into_iter().collect();
        let json = serde_json::to_string(&fields).unwrap();
        assert_eq!(json, r#"{"alpha":"2","zeta":"1"}"#);
    }

    #[test]
    fn card_fields_debug_hides_values() {
        let fields: CardFields = [("cvv", "987")].into_iter().collect();
        let dbg = format!("{fields:?}");
        assert!(dbg.contains("cvv"));
        assert!(!dbg.contains("987"));
    }
}
