//! Integration tests for the `Vault` session: lifecycle, entities,
//! collections and files.

use std::fs;

use chrono::NaiveDate;
use passvault::crypto::kdf::MIN_ITERATIONS;
use passvault::crypto::{KdfParams, SecureRandom};
use passvault::model::{CardFields, CardType, CollectionKind, NewCard, NewCredential, NoteCategory};
use passvault::store::VaultLayout;
use passvault::{Vault, VaultError};
use tempfile::TempDir;

const MASTER: &str = "Tr0ub4dor&3";

fn fast() -> KdfParams {
    KdfParams {
        iterations: MIN_ITERATIONS,
    }
}

fn layout(dir: &TempDir) -> VaultLayout {
    VaultLayout::new(dir.path().join(".passvault"))
}

fn new_vault(dir: &TempDir) -> Vault {
    Vault::create(layout(dir), MASTER.into(), fast(), SecureRandom::new().unwrap())
        .expect("create vault")
}

fn reopen(dir: &TempDir) -> Vault {
    Vault::open(layout(dir), fast(), SecureRandom::new().unwrap()).expect("open vault")
}

// ---------------------------------------------------------------------------
// Lifecycle
// ---------------------------------------------------------------------------

#[test]
fn note_survives_lock_and_reopen() {
    let dir = TempDir::new().unwrap();
    let mut vault = new_vault(&dir);
    let note = vault
        .add_note("codes", NoteCategory::Other, "launch codes", vec![])
        .unwrap();
    vault.lock();
    drop(vault);

    let mut vault = reopen(&dir);
    assert!(!vault.is_unlocked());
    assert!(matches!(vault.read_note(note.id), Err(VaultError::Locked)));

    vault.unlock(MASTER.into()).unwrap();
    assert_eq!(vault.read_note(note.id).unwrap().as_str(), "launch codes");
}

#[test]
fn wrong_master_password_is_rejected() {
    let dir = TempDir::new().unwrap();
    drop(new_vault(&dir));

    let mut vault = reopen(&dir);
    let err = vault.unlock("tr0ub4dor&3".into()).unwrap_err();
    assert!(matches!(err, VaultError::AuthFailed));
    assert!(!err.is_fatal());
    assert!(!vault.is_unlocked());

    assert!(vault.verify_master_password(MASTER.into()).unwrap());
    assert!(!vault.verify_master_password("nope".into()).unwrap());
}

#[test]
fn opening_a_missing_vault_fails() {
    let dir = TempDir::new().unwrap();
    let result = Vault::open(layout(&dir), fast(), SecureRandom::new().unwrap());
    assert!(matches!(result, Err(VaultError::NotFound(_))));
}

#[test]
fn store_document_holds_no_plaintext() {
    let dir = TempDir::new().unwrap();
    let mut vault = new_vault(&dir);
    vault
        .add_credential(
            NewCredential {
                title: "GitHub".into(),
                ..NewCredential::default()
            },
            "correct horse battery staple",
        )
        .unwrap();
    vault
        .add_note("n", NoteCategory::Personal, "launch codes", vec![])
        .unwrap();

    let doc = fs::read_to_string(vault.layout().document_path()).unwrap();
    assert!(doc.contains("GitHub"));
    assert!(!doc.contains("correct horse"));
    assert!(!doc.contains("launch codes"));
    assert!(!doc.contains(MASTER));
}

// ---------------------------------------------------------------------------
// Credentials, notes, cards
// ---------------------------------------------------------------------------

#[test]
fn credential_password_can_be_revealed_and_updated() {
    let dir = TempDir::new().unwrap();
    let mut vault = new_vault(&dir);
    let cred = vault
        .add_credential(
            NewCredential {
                title: "Mail".into(),
                username: Some("me".into()),
                ..NewCredential::default()
            },
            "first",
        )
        .unwrap();
    assert_eq!(vault.reveal_password(cred.id).unwrap().as_str(), "first");

    vault.update_password(cred.id, "second").unwrap();
    assert_eq!(vault.reveal_password(cred.id).unwrap().as_str(), "second");

    vault.delete_credential(cred.id).unwrap();
    assert!(matches!(vault.get_credential(cred.id), Err(VaultError::NotFound(_))));
    assert!(matches!(vault.delete_credential(cred.id), Err(VaultError::NotFound(_))));
}

#[test]
fn credential_title_is_required() {
    let dir = TempDir::new().unwrap();
    let mut vault = new_vault(&dir);
    assert!(matches!(
        vault.add_credential(NewCredential::default(), "pw"),
        Err(VaultError::InvalidInput(_))
    ));
}

#[test]
fn attachments_follow_their_note() {
    let dir = TempDir::new().unwrap();
    let mut vault = new_vault(&dir);
    let note = vault.add_note("trip", NoteCategory::Personal, "itinerary", vec![]).unwrap();
    let a = vault.attach_file(note.id, "ticket.pdf", b"%PDF-1.7").unwrap();
    let b = vault.attach_file(note.id, "map.png", b"\x89PNG").unwrap();

    assert_eq!(a.mime_type.as_deref(), Some("application/pdf"));
    assert_eq!(vault.list_attachments(note.id).unwrap().len(), 2);
    assert_eq!(vault.read_attachment(b.id).unwrap().as_slice(), b"\x89PNG");

    vault.delete_note(note.id).unwrap();
    assert!(vault.list_attachments(note.id).unwrap().is_empty());
    assert!(fs::read_dir(vault.layout().blobs_dir()).unwrap().next().is_none());
}

#[test]
fn cards_keep_fields_sealed_and_report_expiry() {
    let dir = TempDir::new().unwrap();
    let mut vault = new_vault(&dir);
    let today = NaiveDate::from_ymd_opt(2026, 10, 19).unwrap();

    let fields: CardFields = [("passportNumber", "X12345678"), ("fullName", "A. Person")]
        .into_iter()
        .collect();
    let mut passport = NewCard::new(CardType::Passport, "Passport");
    passport.expiry_date = NaiveDate::from_ymd_opt(2026, 11, 1);
    let passport = vault.add_card(passport, &fields, Some(b"jpeg bytes")).unwrap();
    assert_eq!(passport.number_hint.as_deref(), Some("5678"));

    let mut licence = NewCard::new(CardType::DriversLicense, "Licence");
    licence.expiry_date = NaiveDate::from_ymd_opt(2030, 1, 1);
    vault.add_card(licence, &CardFields::new(), None).unwrap();

    assert_eq!(vault.read_card_fields(passport.id).unwrap(), fields);
    assert_eq!(
        vault.read_card_photo(passport.id).unwrap().unwrap().as_slice(),
        b"jpeg bytes"
    );

    let expiring = vault.expiring_cards(30, today).unwrap();
    assert_eq!(expiring.len(), 1);
    assert_eq!(expiring[0].id, passport.id);

    let doc = fs::read_to_string(vault.layout().document_path()).unwrap();
    assert!(!doc.contains("X12345678"));
}

#[test]
fn credentials_can_be_searched_and_starred() {
    let dir = TempDir::new().unwrap();
    let mut vault = new_vault(&dir);
    for title in ["GitHub", "GitLab", "Bank"] {
        vault
            .add_credential(
                NewCredential {
                    title: title.into(),
                    ..NewCredential::default()
                },
                "pw",
            )
            .unwrap();
    }

    let hits: Vec<String> = vault
        .search_credentials("git")
        .unwrap()
        .into_iter()
        .map(|c| c.title)
        .collect();
    assert_eq!(hits, ["GitHub", "GitLab"]);
    assert!(vault.search_credentials("pw").unwrap().is_empty());
    assert!(vault.list_favorite_credentials().unwrap().is_empty());

    let bank = vault.search_credentials("BANK").unwrap().remove(0);
    assert!(vault.set_credential_favorite(bank.id, true).unwrap().favorite);
    let favorites = vault.list_favorite_credentials().unwrap();
    assert_eq!(favorites.len(), 1);
    assert_eq!(favorites[0].id, bank.id);

    vault.set_credential_favorite(bank.id, false).unwrap();
    assert!(vault.list_favorite_credentials().unwrap().is_empty());
    assert!(matches!(
        vault.set_credential_favorite(999, true),
        Err(VaultError::NotFound(_))
    ));
}

#[test]
fn notes_filter_by_title_category_and_favorite() {
    let dir = TempDir::new().unwrap();
    let mut vault = new_vault(&dir);
    let wifi = vault
        .add_note("Home Wi-Fi", NoteCategory::Personal, "hunter2", vec![])
        .unwrap();
    vault
        .add_note("Payroll", NoteCategory::Work, "wifi at office", vec![])
        .unwrap();
    vault
        .add_note("Insurance", NoteCategory::Financial, "policy", vec![])
        .unwrap();
    assert!(!wifi.favorite);

    let hits = vault.search_notes("wi-fi").unwrap();
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].id, wifi.id);
    // Bodies are sealed and never matched.
    assert!(vault.search_notes("hunter2").unwrap().is_empty());

    let work = vault.list_notes_by_category(NoteCategory::Work).unwrap();
    assert_eq!(work.len(), 1);
    assert_eq!(work[0].title, "Payroll");
    assert!(vault.list_notes_by_category(NoteCategory::Medical).unwrap().is_empty());

    vault.set_note_favorite(wifi.id, true).unwrap();
    drop(vault);
    let mut vault = reopen(&dir);
    vault.unlock(MASTER.into()).unwrap();
    let favorites = vault.list_favorite_notes().unwrap();
    assert_eq!(favorites.len(), 1);
    assert_eq!(favorites[0].id, wifi.id);
    assert_eq!(vault.read_note(wifi.id).unwrap().as_str(), "hunter2");
}

#[test]
fn cards_can_be_searched_filtered_and_counted() {
    let dir = TempDir::new().unwrap();
    let mut vault = new_vault(&dir);
    let today = NaiveDate::from_ymd_opt(2026, 6, 1).unwrap();

    let passport: CardFields = [("passportNumber", "X12345678")].into_iter().collect();
    let mut new = NewCard::new(CardType::Passport, "My passport");
    new.expiry_date = NaiveDate::from_ymd_opt(2026, 5, 1);
    let old_passport = vault.add_card(new, &passport, None).unwrap();

    let visa: CardFields = [("cardNumber", "4111111111111111")].into_iter().collect();
    let mut new = NewCard::new(CardType::CreditCard, "Visa");
    new.expiry_date = NaiveDate::from_ymd_opt(2026, 6, 20);
    new.tags = vec!["travel".into()];
    vault.add_card(new, &visa, None).unwrap();

    let mut new = NewCard::new(CardType::CreditCard, "Amex");
    new.expiry_date = NaiveDate::from_ymd_opt(2030, 1, 1);
    vault.add_card(new, &visa, None).unwrap();

    let by_name = vault.search_cards("passport").unwrap();
    assert_eq!(by_name.len(), 1);
    assert_eq!(by_name[0].id, old_passport.id);
    assert_eq!(vault.search_cards("1111").unwrap().len(), 2);
    assert_eq!(vault.search_cards("TRAVEL").unwrap()[0].name, "Visa");
    // The full number is sealed, so only the hint can match.
    assert!(vault.search_cards("4111").unwrap().is_empty());

    assert_eq!(vault.list_cards_by_type(CardType::CreditCard).unwrap().len(), 2);
    assert!(vault.list_cards_by_type(CardType::Ssn).unwrap().is_empty());

    let expired = vault.expired_cards(today).unwrap();
    assert_eq!(expired.len(), 1);
    assert_eq!(expired[0].id, old_passport.id);

    let stats = vault.card_statistics(today).unwrap();
    assert_eq!(stats.total, 3);
    assert_eq!(stats.expired, 1);
    assert_eq!(stats.expiring_soon, 1);
    assert_eq!(stats.by_type.get(&CardType::CreditCard), Some(&2));
    assert_eq!(stats.by_type.get(&CardType::Passport), Some(&1));

    vault.lock();
    assert!(matches!(vault.card_statistics(today), Err(VaultError::Locked)));
}

#[test]
fn stored_file_names_cannot_escape_the_output_directory() {
    let dir = TempDir::new().unwrap();
    let mut vault = new_vault(&dir);
    vault.create_collection("Docs", CollectionKind::Documents, None).unwrap();
    let note = vault.add_note("n", NoteCategory::Other, "body", vec![]).unwrap();

    for name in ["../../escape.sh", "/etc/cron.d/evil", "..\\win.bat", "..", "line\nbreak"] {
        assert!(
            matches!(
                vault.put_file("Docs", None, name, b"x"),
                Err(VaultError::InvalidInput(_))
            ),
            "put_file accepted {name:?}"
        );
        assert!(
            matches!(
                vault.attach_file(note.id, name, b"y"),
                Err(VaultError::InvalidInput(_))
            ),
            "attach_file accepted {name:?}"
        );
    }
    assert!(vault.list_files(None).unwrap().is_empty());
    assert!(vault.list_attachments(note.id).unwrap().is_empty());
    assert!(!vault.get_note(note.id).unwrap().has_attachments);

    let file = vault.put_file("Docs", None, "tax..2025.pdf", b"ok").unwrap();
    assert_eq!(file.original_name, "tax..2025.pdf");
}

// ---------------------------------------------------------------------------
// Collections and files
// ---------------------------------------------------------------------------

#[test]
fn protected_collection_needs_its_secret() {
    let dir = TempDir::new().unwrap();
    let mut vault = new_vault(&dir);
    vault
        .create_collection("Documents", CollectionKind::Documents, Some("vaultPass1".into()))
        .unwrap();

    let file = vault
        .put_file("Documents", Some("vaultPass1".into()), "report.txt", b"Q3 numbers")
        .unwrap();

    assert!(matches!(
        vault.get_file(file.id, Some("wrong".into())),
        Err(VaultError::AuthFailed)
    ));
    assert!(matches!(vault.get_file(file.id, None), Err(VaultError::AuthFailed)));
    assert!(matches!(
        vault.put_file("Documents", Some("wrong".into()), "x.txt", b"x"),
        Err(VaultError::AuthFailed)
    ));
    assert_eq!(
        vault.get_file(file.id, Some("vaultPass1".into())).unwrap().as_slice(),
        b"Q3 numbers"
    );
}

#[test]
fn unknown_collection_is_an_auth_failure() {
    let dir = TempDir::new().unwrap();
    let mut vault = new_vault(&dir);
    assert!(matches!(
        vault.put_file("Ghost", None, "a.txt", b"a"),
        Err(VaultError::AuthFailed)
    ));
}

#[test]
fn protecting_a_collection_reseals_its_files() {
    let dir = TempDir::new().unwrap();
    let mut vault = new_vault(&dir);
    vault.create_collection("Images", CollectionKind::Images, None).unwrap();
    let file = vault.put_file("Images", None, "cat.jpg", b"meow").unwrap();

    vault
        .set_collection_secret("Images", None, Some("s3cret".into()))
        .unwrap();
    assert!(vault.has_separate_secret("Images").unwrap());
    assert!(matches!(vault.get_file(file.id, None), Err(VaultError::AuthFailed)));
    assert_eq!(
        vault.get_file(file.id, Some("s3cret".into())).unwrap().as_slice(),
        b"meow"
    );

    // Wrong current secret leaves everything as it was.
    assert!(matches!(
        vault.set_collection_secret("Images", Some("bad".into()), None),
        Err(VaultError::AuthFailed)
    ));
    assert!(vault.has_separate_secret("Images").unwrap());

    vault
        .set_collection_secret("Images", Some("s3cret".into()), None)
        .unwrap();
    assert_eq!(vault.get_file(file.id, None).unwrap().as_slice(), b"meow");

    // Only the current payload is left in the blob store.
    assert_eq!(fs::read_dir(vault.layout().blobs_dir()).unwrap().count(), 1);
}

#[test]
fn tampered_blob_fails_integrity_check() {
    let dir = TempDir::new().unwrap();
    let mut vault = new_vault(&dir);
    vault.create_collection("PDFs", CollectionKind::Pdfs, None).unwrap();
    let file = vault
        .put_file("PDFs", None, "contract.pdf", b"%PDF-1.7 signed contract text")
        .unwrap();

    // Flipping an IV bit keeps the padding valid but changes the plaintext.
    let blob = vault.layout().blobs_dir().join(&file.blob_name);
    let mut bytes = fs::read(&blob).unwrap();
    bytes[0] ^= 0x01;
    fs::write(&blob, bytes).unwrap();

    assert!(matches!(
        vault.get_file(file.id, None),
        Err(VaultError::IntegrityFailed(_))
    ));
}

#[test]
fn delete_file_requires_the_collection_secret() {
    let dir = TempDir::new().unwrap();
    let mut vault = new_vault(&dir);
    vault
        .create_collection("Vault", CollectionKind::Custom, Some("inner".into()))
        .unwrap();
    let file = vault.put_file("Vault", Some("inner".into()), "k.txt", b"k").unwrap();

    assert!(matches!(
        vault.delete_file(file.id, Some("outer".into())),
        Err(VaultError::AuthFailed)
    ));
    vault.delete_file(file.id, Some("inner".into())).unwrap();
    assert!(vault.list_files(Some("Vault")).unwrap().is_empty());
}

// ---------------------------------------------------------------------------
// Master password change
// ---------------------------------------------------------------------------

#[test]
fn changing_the_master_password_reseals_master_key_data() {
    let dir = TempDir::new().unwrap();
    let mut vault = new_vault(&dir);
    let cred = vault
        .add_credential(
            NewCredential {
                title: "Bank".into(),
                ..NewCredential::default()
            },
            "pin-1234",
        )
        .unwrap();
    let note = vault.add_note("n", NoteCategory::Financial, "launch codes", vec![]).unwrap();
    vault.create_collection("Images", CollectionKind::Images, None).unwrap();
    vault
        .create_collection("Documents", CollectionKind::Documents, Some("vaultPass1".into()))
        .unwrap();
    let image = vault.put_file("Images", None, "a.png", b"png").unwrap();
    let doc = vault
        .put_file("Documents", Some("vaultPass1".into()), "b.txt", b"txt")
        .unwrap();

    assert!(matches!(
        vault.change_master_password("wrong".into(), "n3w-master".into()),
        Err(VaultError::AuthFailed)
    ));
    vault
        .change_master_password(MASTER.into(), "n3w-master".into())
        .unwrap();
    drop(vault);

    let mut vault = reopen(&dir);
    assert!(matches!(vault.unlock(MASTER.into()), Err(VaultError::AuthFailed)));
    vault.unlock("n3w-master".into()).unwrap();

    assert_eq!(vault.reveal_password(cred.id).unwrap().as_str(), "pin-1234");
    assert_eq!(vault.read_note(note.id).unwrap().as_str(), "launch codes");
    assert_eq!(vault.get_file(image.id, None).unwrap().as_slice(), b"png");
    assert_eq!(
        vault.get_file(doc.id, Some("vaultPass1".into())).unwrap().as_slice(),
        b"txt"
    );
}
