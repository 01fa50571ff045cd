//! The `Vault` session: one opened vault directory plus, once unlocked,
//! the master key.
//!
//! `Vault` wires the pieces together: the record and blob stores, the
//! key hierarchy, the per-entity sealers and the backup engine.  Every
//! operation that touches a secret requires the vault to be unlocked;
//! `lock` (or dropping the vault) zeroes the master key.
//!
//! Operations that rewrite several records (password change, collection
//! re-protection) run inside a store batch.  New blobs are written under
//! fresh names and the old ones are deleted only after the batch commits,
//! so a failure part-way leaves every payload readable.

use std::collections::BTreeSet;
use std::fs;

use chrono::{NaiveDate, Utc};
use tracing::{debug, info, warn};
use zeroize::Zeroizing;

use super::hierarchy::KeyHierarchy;
use super::master::{
    create_master_credential, derive_master_key, renew_master_credential, verify_master_password,
};
use crate::backup::{BackupEngine, BackupKind, BackupRecord, BackupStatistics, RestoreReport};
use crate::crypto::{
    derive_key, Envelope, IntegrityTag, KdfParams, MasterKey, Password, SecureRandom, VaultKey,
};
use crate::errors::{Result, VaultError};
use crate::model::{
    guess_mime_type, CardFields, CardStatistics, CardType, Collection, CollectionKind, Credential, EncryptedFile,
    IdentityCard, NewCard, NewCredential, NoteAttachment, NoteCategory, Record, SecureNote,
    StoredEnvelope,
};
use crate::seal::{
    BytesSealer, CardSealer, FileSealer, NoteSealer, PasswordSealer, SealedFile, Sealer,
};
use crate::store::{BlobStore, FileRecordStore, FsBlobStore, RecordStore, VaultLayout};

#[cfg(feature = "audit-log")]
use crate::audit::AuditLog;

/// Blobs touched by a batch: `written` are removed if the batch fails,
/// `obsolete` are removed once it commits.
#[derive(Default)]
struct BlobJournal {
    written: Vec<String>,
    obsolete: Vec<String>,
}

pub struct Vault {
    layout: VaultLayout,
    records: FileRecordStore,
    blobs: FsBlobStore,
    rng: SecureRandom,
    kdf: KdfParams,
    hierarchy: KeyHierarchy,
    master: Option<MasterKey>,
    #[cfg(feature = "audit-log")]
    audit: Option<AuditLog>,
}

impl Vault {
    // ------------------------------------------------------------------
    // Lifecycle
    // ------------------------------------------------------------------

    /// Initialize a new vault in `layout` and return it unlocked.
    ///
    /// `kdf` is the work factor for the master credential and for any
    /// collection secret set during this session.
    pub fn create(
        layout: VaultLayout,
        password: Password,
        kdf: KdfParams,
        rng: SecureRandom,
    ) -> Result<Self> {
        if layout.exists() {
            return Err(VaultError::AlreadyExists(format!(
                "vault at {}",
                layout.root().display()
            )));
        }
        if password.is_empty() {
            return Err(VaultError::InvalidInput(
                "master password cannot be empty".into(),
            ));
        }

        fs::create_dir_all(layout.root())?;
        let mut records = FileRecordStore::create(&layout.store_dir())?;
        let blobs = FsBlobStore::open(layout.blobs_dir())?;

        let credential = create_master_credential(&rng, password.clone(), &kdf)?;
        records.save_master_credential(&credential)?;
        let master = MasterKey::from(derive_key(password, &credential.salt, &credential.kdf)?);

        let mut vault = Self::assemble(layout, records, blobs, rng, kdf);
        vault.master = Some(master);

        info!(root = %vault.layout.root().display(), "vault created");
        vault.audit("vault.create", None, None);
        Ok(vault)
    }

    /// Open an existing vault, locked.
    pub fn open(layout: VaultLayout, kdf: KdfParams, rng: SecureRandom) -> Result<Self> {
        if !layout.exists() {
            return Err(VaultError::NotFound(format!(
                "vault at {}",
                layout.root().display()
            )));
        }
        let records = FileRecordStore::open(&layout.store_dir())?;
        let blobs = FsBlobStore::open(layout.blobs_dir())?;
        Ok(Self::assemble(layout, records, blobs, rng, kdf))
    }

    fn assemble(
        layout: VaultLayout,
        records: FileRecordStore,
        blobs: FsBlobStore,
        rng: SecureRandom,
        kdf: KdfParams,
    ) -> Self {
        #[cfg(feature = "audit-log")]
        let audit = AuditLog::open(&layout.audit_db());

        Self {
            layout,
            records,
            blobs,
            rng,
            kdf,
            hierarchy: KeyHierarchy::new(rng, kdf),
            master: None,
            #[cfg(feature = "audit-log")]
            audit,
        }
    }

    /// Verify the master password and keep the derived master key.
    pub fn unlock(&mut self, password: Password) -> Result<()> {
        let credential = self
            .records
            .master_credential()?
            .ok_or(VaultError::AuthFailed)?;

        match derive_master_key(password, &credential) {
            Ok(master) => {
                self.master = Some(master);
                info!("vault unlocked");
                self.audit("vault.unlock", None, None);
                Ok(())
            }
            Err(e) => {
                if matches!(e, VaultError::AuthFailed) {
                    warn!("unlock rejected");
                    self.audit("vault.unlock_failed", None, None);
                }
                Err(e)
            }
        }
    }

    /// Drop (and zero) the master key.
    pub fn lock(&mut self) {
        if self.master.take().is_some() {
            info!("vault locked");
        }
    }

    pub fn is_unlocked(&self) -> bool {
        self.master.is_some()
    }

    pub fn master_key(&self) -> Result<&MasterKey> {
        self.master.as_ref().ok_or(VaultError::Locked)
    }

    pub fn layout(&self) -> &VaultLayout {
        &self.layout
    }

    /// Check a password against the stored master credential without
    /// changing the session.
    pub fn verify_master_password(&self, password: Password) -> Result<bool> {
        let credential = self
            .records
            .master_credential()?
            .ok_or(VaultError::AuthFailed)?;
        verify_master_password(password, &credential)
    }

    /// Replace the master password.
    ///
    /// Re-seals everything protected by the master key: credential
    /// passwords, note bodies and attachments, card fields and photos, and
    /// files in collections without their own secret.  Collections with
    /// their own secret are untouched.
    pub fn change_master_password(&mut self, current: Password, new: Password) -> Result<()> {
        if new.is_empty() {
            return Err(VaultError::InvalidInput(
                "master password cannot be empty".into(),
            ));
        }
        let credential = self
            .records
            .master_credential()?
            .ok_or(VaultError::AuthFailed)?;
        let old_master = derive_master_key(current, &credential)?;

        let renewed = renew_master_credential(&self.rng, &credential, new.clone(), &self.kdf)?;
        let new_master = MasterKey::from(derive_key(new, &renewed.salt, &renewed.kdf)?);

        let master_collections: BTreeSet<String> = self
            .records
            .list_collections()?
            .into_iter()
            .filter(|c| !c.descriptor.has_separate_secret())
            .map(|c| c.name)
            .collect();

        let resealed = self.in_batch(|vault, journal| {
            let count = vault.reseal_master_records(
                journal,
                old_master.key(),
                new_master.key(),
                &master_collections,
            )?;
            vault.records.save_master_credential(&renewed)?;
            Ok(count)
        })?;

        self.master = Some(new_master);
        info!(resealed, "master password changed");
        self.audit(
            "vault.passwd",
            None,
            Some(&format!("{resealed} envelopes re-sealed")),
        );
        Ok(())
    }

    fn reseal_master_records(
        &mut self,
        journal: &mut BlobJournal,
        old: &VaultKey,
        new: &VaultKey,
        master_collections: &BTreeSet<String>,
    ) -> Result<usize> {
        let mut count = 0;

        let passwords = PasswordSealer::new(self.rng);
        for mut credential in self.records.list::<Credential>()? {
            let plain = passwords.open(&credential.password.to_envelope()?, old)?;
            credential.password = passwords.seal(&plain, new)?.into();
            self.records.put(credential)?;
            count += 1;
        }

        let bodies = NoteSealer::new(self.rng);
        for mut note in self.records.list::<SecureNote>()? {
            let plain = bodies.open(&note.body.to_envelope()?, old)?;
            note.body = bodies.seal(&plain, new)?.into();
            self.records.put(note)?;
            count += 1;
        }

        let cards = CardSealer::new(self.rng);
        let photos = BytesSealer::new(self.rng);
        for mut card in self.records.list::<IdentityCard>()? {
            let fields = cards.open(&card.fields.to_envelope()?, old)?;
            card.fields = cards.seal(&fields, new)?.into();
            if let Some(photo) = &card.photo {
                let plain = photos.open(&photo.to_envelope()?, old)?;
                card.photo = Some(photos.seal(&plain, new)?.into());
            }
            self.records.put(card)?;
            count += 1;
        }

        for mut attachment in self.records.list::<NoteAttachment>()? {
            let subject = format!("attachment {}", attachment.id);
            let (name, _) =
                self.reseal_blob(journal, &attachment.blob_name, attachment.checksum, &subject, old, new)?;
            journal
                .obsolete
                .push(std::mem::replace(&mut attachment.blob_name, name));
            self.records.put(attachment)?;
            count += 1;
        }

        for file in self.records.list::<EncryptedFile>()? {
            if master_collections.contains(&file.collection) {
                self.reseal_file(journal, file, old, new)?;
                count += 1;
            }
        }

        Ok(count)
    }

    // ------------------------------------------------------------------
    // Credentials
    // ------------------------------------------------------------------

    pub fn add_credential(&mut self, new: NewCredential, password: &str) -> Result<Credential> {
        if new.title.trim().is_empty() {
            return Err(VaultError::InvalidInput("title cannot be empty".into()));
        }
        let key = self.master_copy()?;
        let sealed = PasswordSealer::new(self.rng).seal(password, &key)?;

        let now = Utc::now();
        let credential = self.records.put(Credential {
            id: 0,
            title: new.title,
            username: new.username,
            email: new.email,
            url: new.url,
            password: sealed.into(),
            notes: new.notes,
            tags: new.tags,
            favorite: new.favorite,
            created_at: now,
            last_modified: now,
        })?;

        debug!(credential = credential.id, "credential added");
        self.audit("credential.add", Some(&subject(&credential)), None);
        Ok(credential)
    }

    pub fn get_credential(&self, id: u64) -> Result<Credential> {
        self.ensure_unlocked()?;
        self.require(id)
    }

    /// Decrypt a credential's password.
    pub fn reveal_password(&self, id: u64) -> Result<Zeroizing<String>> {
        let key = self.master_copy()?;
        let credential: Credential = self.require(id)?;
        let password = PasswordSealer::new(self.rng).open(&credential.password.to_envelope()?, &key)?;
        self.audit("credential.reveal", Some(&subject(&credential)), None);
        Ok(password)
    }

    /// Replace a credential's password (sealed afresh with a new IV).
    pub fn update_password(&mut self, id: u64, password: &str) -> Result<Credential> {
        let key = self.master_copy()?;
        let mut credential: Credential = self.require(id)?;
        credential.password = PasswordSealer::new(self.rng).seal(password, &key)?.into();
        credential.last_modified = Utc::now();
        let credential = self.records.put(credential)?;
        self.audit("credential.update", Some(&subject(&credential)), None);
        Ok(credential)
    }

    pub fn list_credentials(&self) -> Result<Vec<Credential>> {
        self.ensure_unlocked()?;
        let mut list = self.records.list::<Credential>()?;
        list.sort_by(|a, b| a.title.to_lowercase().cmp(&b.title.to_lowercase()));
        Ok(list)
    }

    /// Credentials whose title contains `query`, ignoring case.
    pub fn search_credentials(&self, query: &str) -> Result<Vec<Credential>> {
        Ok(self
            .list_credentials()?
            .into_iter()
            .filter(|c| matches_query(&c.title, query))
            .collect())
    }

    pub fn list_favorite_credentials(&self) -> Result<Vec<Credential>> {
        Ok(self
            .list_credentials()?
            .into_iter()
            .filter(|c| c.favorite)
            .collect())
    }

    pub fn set_credential_favorite(&mut self, id: u64, favorite: bool) -> Result<Credential> {
        self.ensure_unlocked()?;
        let mut credential: Credential = self.require(id)?;
        credential.favorite = favorite;
        credential.last_modified = Utc::now();
        Ok(self.records.put(credential)?)
    }

    pub fn delete_credential(&mut self, id: u64) -> Result<()> {
        self.ensure_unlocked()?;
        self.remove::<Credential>(id)?;
        self.audit("credential.delete", Some(&format!("credential {id}")), None);
        Ok(())
    }

    // ------------------------------------------------------------------
    // Secure notes and attachments
    // ------------------------------------------------------------------

    pub fn add_note(
        &mut self,
        title: &str,
        category: NoteCategory,
        body: &str,
        tags: Vec<String>,
    ) -> Result<SecureNote> {
        if title.trim().is_empty() {
            return Err(VaultError::InvalidInput("title cannot be empty".into()));
        }
        let key = self.master_copy()?;
        let sealed = NoteSealer::new(self.rng).seal(body, &key)?;

        let now = Utc::now();
        let note = self.records.put(SecureNote {
            id: 0,
            title: title.to_string(),
            category,
            body: sealed.into(),
            tags,
            favorite: false,
            has_attachments: false,
            created_at: now,
            last_modified: now,
        })?;

        debug!(note = note.id, "note added");
        self.audit("note.add", Some(&subject(&note)), None);
        Ok(note)
    }

    pub fn get_note(&self, id: u64) -> Result<SecureNote> {
        self.ensure_unlocked()?;
        self.require(id)
    }

    /// Decrypt a note's body.
    pub fn read_note(&self, id: u64) -> Result<Zeroizing<String>> {
        let key = self.master_copy()?;
        let note: SecureNote = self.require(id)?;
        NoteSealer::new(self.rng).open(&note.body.to_envelope()?, &key)
    }

    pub fn update_note_body(&mut self, id: u64, body: &str) -> Result<SecureNote> {
        let key = self.master_copy()?;
        let mut note: SecureNote = self.require(id)?;
        note.body = NoteSealer::new(self.rng).seal(body, &key)?.into();
        note.last_modified = Utc::now();
        let note = self.records.put(note)?;
        self.audit("note.update", Some(&subject(&note)), None);
        Ok(note)
    }

    pub fn list_notes(&self) -> Result<Vec<SecureNote>> {
        self.ensure_unlocked()?;
        Ok(self.records.list()?)
    }

    /// Notes whose title contains `query`, ignoring case.  Bodies are
    /// sealed and never searched.
    pub fn search_notes(&self, query: &str) -> Result<Vec<SecureNote>> {
        Ok(self
            .list_notes()?
            .into_iter()
            .filter(|n| matches_query(&n.title, query))
            .collect())
    }

    pub fn list_notes_by_category(&self, category: NoteCategory) -> Result<Vec<SecureNote>> {
        Ok(self
            .list_notes()?
            .into_iter()
            .filter(|n| n.category == category)
            .collect())
    }

    pub fn list_favorite_notes(&self) -> Result<Vec<SecureNote>> {
        Ok(self.list_notes()?.into_iter().filter(|n| n.favorite).collect())
    }

    pub fn set_note_favorite(&mut self, id: u64, favorite: bool) -> Result<SecureNote> {
        self.ensure_unlocked()?;
        let mut note: SecureNote = self.require(id)?;
        note.favorite = favorite;
        note.last_modified = Utc::now();
        Ok(self.records.put(note)?)
    }

    /// Delete a note together with its attachments.
    pub fn delete_note(&mut self, id: u64) -> Result<()> {
        self.ensure_unlocked()?;
        let _: SecureNote = self.require(id)?;
        let attachments = self.list_attachments(id)?;

        self.in_batch(|vault, journal| {
            for attachment in attachments {
                vault.records.delete::<NoteAttachment>(attachment.id)?;
                journal.obsolete.push(attachment.blob_name);
            }
            vault.records.delete::<SecureNote>(id)?;
            Ok(())
        })?;

        self.audit("note.delete", Some(&format!("note {id}")), None);
        Ok(())
    }

    /// Attach a file to a note, sealed under the master key.
    pub fn attach_file(
        &mut self,
        note_id: u64,
        original_name: &str,
        bytes: &[u8],
    ) -> Result<NoteAttachment> {
        validate_file_name(original_name)?;
        let key = self.master_copy()?;
        let mut note: SecureNote = self.require(note_id)?;
        let sealed = FileSealer::new(self.rng).seal(bytes, &key)?;
        let envelope_bytes = sealed.envelope.to_bytes();

        let attachment = self.in_batch(|vault, journal| {
            let blob_name = vault.write_blob(journal, &envelope_bytes)?;
            let attachment = vault.records.put(NoteAttachment {
                id: 0,
                note_id,
                original_name: original_name.to_string(),
                blob_name,
                size: bytes.len() as u64,
                mime_type: guess_mime_type(original_name),
                checksum: sealed.tag,
                uploaded_at: Utc::now(),
            })?;
            note.has_attachments = true;
            note.last_modified = Utc::now();
            vault.records.put(note)?;
            Ok(attachment)
        })?;

        debug!(note = note_id, attachment = attachment.id, size = attachment.size, "attachment added");
        self.audit("note.attach", Some(&format!("note {note_id}")), Some(&subject(&attachment)));
        Ok(attachment)
    }

    pub fn list_attachments(&self, note_id: u64) -> Result<Vec<NoteAttachment>> {
        self.ensure_unlocked()?;
        Ok(self
            .records
            .list::<NoteAttachment>()?
            .into_iter()
            .filter(|a| a.note_id == note_id)
            .collect())
    }

    pub fn get_attachment(&self, id: u64) -> Result<NoteAttachment> {
        self.ensure_unlocked()?;
        self.require(id)
    }

    /// Decrypt an attachment and check it against its integrity tag.
    pub fn read_attachment(&self, id: u64) -> Result<Zeroizing<Vec<u8>>> {
        let key = self.master_copy()?;
        let attachment: NoteAttachment = self.require(id)?;
        let sealed = SealedFile {
            envelope: Envelope::from_bytes(&self.blobs.read(&attachment.blob_name)?)?,
            tag: attachment.checksum,
        };
        FileSealer::new(self.rng).open_as(&sealed, &key, &subject(&attachment))
    }

    pub fn delete_attachment(&mut self, id: u64) -> Result<()> {
        self.ensure_unlocked()?;
        let attachment: NoteAttachment = self.require(id)?;
        let remaining = self
            .list_attachments(attachment.note_id)?
            .iter()
            .filter(|a| a.id != id)
            .count();

        self.in_batch(|vault, journal| {
            vault.records.delete::<NoteAttachment>(id)?;
            journal.obsolete.push(attachment.blob_name.clone());
            if remaining == 0 {
                if let Some(mut note) = vault.records.get::<SecureNote>(attachment.note_id)? {
                    note.has_attachments = false;
                    vault.records.put(note)?;
                }
            }
            Ok(())
        })?;

        self.audit("note.detach", Some(&format!("attachment {id}")), None);
        Ok(())
    }

    // ------------------------------------------------------------------
    // Identity cards
    // ------------------------------------------------------------------

    /// Add a card.  Field names must belong to the card type's field list.
    pub fn add_card(
        &mut self,
        new: NewCard,
        fields: &CardFields,
        photo: Option<&[u8]>,
    ) -> Result<IdentityCard> {
        if new.name.trim().is_empty() {
            return Err(VaultError::InvalidInput("card name cannot be empty".into()));
        }
        check_card_fields(new.card_type, fields)?;
        let key = self.master_copy()?;

        let sealed = CardSealer::new(self.rng).seal(fields, &key)?;
        let photo = photo
            .map(|bytes| BytesSealer::new(self.rng).seal(bytes, &key))
            .transpose()?
            .map(StoredEnvelope::from);

        let now = Utc::now();
        let card = self.records.put(IdentityCard {
            id: 0,
            card_type: new.card_type,
            name: new.name,
            fields: sealed.into(),
            number_hint: new.card_type.number_hint(fields),
            issuing_country: new.issuing_country,
            issuing_authority: new.issuing_authority,
            issue_date: new.issue_date,
            expiry_date: new.expiry_date,
            photo,
            tags: new.tags,
            created_at: now,
            last_modified: now,
        })?;

        debug!(card = card.id, card_type = ?card.card_type, "card added");
        self.audit("card.add", Some(&subject(&card)), None);
        Ok(card)
    }

    pub fn get_card(&self, id: u64) -> Result<IdentityCard> {
        self.ensure_unlocked()?;
        self.require(id)
    }

    /// Decrypt a card's field map.
    pub fn read_card_fields(&self, id: u64) -> Result<CardFields> {
        let key = self.master_copy()?;
        let card: IdentityCard = self.require(id)?;
        CardSealer::new(self.rng).open(&card.fields.to_envelope()?, &key)
    }

    pub fn read_card_photo(&self, id: u64) -> Result<Option<Zeroizing<Vec<u8>>>> {
        let key = self.master_copy()?;
        let card: IdentityCard = self.require(id)?;
        card.photo
            .map(|photo| BytesSealer::new(self.rng).open(&photo.to_envelope()?, &key))
            .transpose()
    }

    pub fn list_cards(&self) -> Result<Vec<IdentityCard>> {
        self.ensure_unlocked()?;
        Ok(self.records.list()?)
    }

    /// Cards whose name, number hint or a tag contains `query`, ignoring case.
    pub fn search_cards(&self, query: &str) -> Result<Vec<IdentityCard>> {
        Ok(self
            .list_cards()?
            .into_iter()
            .filter(|c| {
                matches_query(&c.name, query)
                    || c.number_hint.as_deref().is_some_and(|h| matches_query(h, query))
                    || c.tags.iter().any(|t| matches_query(t, query))
            })
            .collect())
    }

    pub fn list_cards_by_type(&self, card_type: CardType) -> Result<Vec<IdentityCard>> {
        Ok(self
            .list_cards()?
            .into_iter()
            .filter(|c| c.card_type == card_type)
            .collect())
    }

    /// Cards already past their expiry date on `today`.
    pub fn expired_cards(&self, today: NaiveDate) -> Result<Vec<IdentityCard>> {
        let mut cards: Vec<IdentityCard> = self
            .list_cards()?
            .into_iter()
            .filter(|c| c.is_expired(today))
            .collect();
        cards.sort_by_key(|c| c.expiry_date);
        Ok(cards)
    }

    pub fn card_statistics(&self, today: NaiveDate) -> Result<CardStatistics> {
        Ok(CardStatistics::collect(&self.list_cards()?, today))
    }

    /// Cards that expire within `within_days` of `today` (or already
    /// have), soonest first.
    pub fn expiring_cards(&self, within_days: i64, today: NaiveDate) -> Result<Vec<IdentityCard>> {
        let mut cards: Vec<IdentityCard> = self
            .list_cards()?
            .into_iter()
            .filter(|c| c.days_until_expiry(today).is_some_and(|d| d <= within_days))
            .collect();
        cards.sort_by_key(|c| c.expiry_date);
        Ok(cards)
    }

    pub fn delete_card(&mut self, id: u64) -> Result<()> {
        self.ensure_unlocked()?;
        self.remove::<IdentityCard>(id)?;
        self.audit("card.delete", Some(&format!("card {id}")), None);
        Ok(())
    }

    // ------------------------------------------------------------------
    // Collections
    // ------------------------------------------------------------------

    pub fn create_collection(
        &mut self,
        name: &str,
        kind: CollectionKind,
        secret: Option<Password>,
    ) -> Result<Collection> {
        let master = self.master.as_ref().ok_or(VaultError::Locked)?;
        let collection =
            self.hierarchy
                .create_collection(&mut self.records, name, kind, secret, master)?;
        self.audit("collection.create", Some(name), None);
        Ok(collection)
    }

    /// Change how a collection is protected and re-seal its files.
    ///
    /// `current` must unlock the collection as it is now (ignored for a
    /// master-key collection).  `new` is the new secret, or `None` to
    /// return to master-key protection.
    pub fn set_collection_secret(
        &mut self,
        name: &str,
        current: Option<Password>,
        new: Option<Password>,
    ) -> Result<Collection> {
        let master = self.master.clone().ok_or(VaultError::Locked)?;
        let old_key = self
            .hierarchy
            .resolve_key(&self.records, name, &master, current)?;
        let (descriptor, new_key) = self.hierarchy.new_descriptor(new, &master)?;

        let mut collection = self
            .records
            .get_collection(name)?
            .ok_or(VaultError::AuthFailed)?;
        let files: Vec<EncryptedFile> = self
            .records
            .list::<EncryptedFile>()?
            .into_iter()
            .filter(|f| f.collection == name)
            .collect();
        let resealed = files.len();

        let collection = self.in_batch(|vault, journal| {
            for file in files {
                vault.reseal_file(journal, file, &old_key, &new_key)?;
            }
            collection.descriptor = descriptor;
            vault.records.save_collection(&collection)?;
            Ok(collection)
        })?;

        let own_secret = collection.descriptor.has_separate_secret();
        info!(collection = %name, own_secret, resealed, "collection protection changed");
        self.audit(
            if own_secret { "collection.protect" } else { "collection.unprotect" },
            Some(name),
            Some(&format!("{resealed} files re-sealed")),
        );
        Ok(collection)
    }

    pub fn has_separate_secret(&self, name: &str) -> Result<bool> {
        self.hierarchy.has_separate_secret(&self.records, name)
    }

    pub fn list_collections(&self) -> Result<Vec<Collection>> {
        Ok(self.records.list_collections()?)
    }

    /// Resolve the key protecting collection `name` for this session.
    pub fn resolve_collection_key(&self, name: &str, secret: Option<Password>) -> Result<VaultKey> {
        let master = self.master_key()?;
        self.hierarchy.resolve_key(&self.records, name, master, secret)
    }

    // ------------------------------------------------------------------
    // Files
    // ------------------------------------------------------------------

    /// Seal `bytes` into `collection`.
    pub fn put_file(
        &mut self,
        collection: &str,
        secret: Option<Password>,
        original_name: &str,
        bytes: &[u8],
    ) -> Result<EncryptedFile> {
        validate_file_name(original_name)?;
        let key = self.resolve_collection_key(collection, secret)?;
        let sealed = FileSealer::new(self.rng).seal(bytes, &key)?;
        let envelope_bytes = sealed.envelope.to_bytes();

        let file = self.in_batch(|vault, journal| {
            let blob_name = vault.write_blob(journal, &envelope_bytes)?;
            let file = vault.records.put(EncryptedFile {
                id: 0,
                collection: collection.to_string(),
                original_name: original_name.to_string(),
                blob_name,
                original_size: bytes.len() as u64,
                encrypted_size: envelope_bytes.len() as u64,
                mime_type: guess_mime_type(original_name),
                iv: sealed.envelope.iv().to_vec(),
                checksum: sealed.tag,
                uploaded_at: Utc::now(),
                last_accessed: None,
            })?;
            Ok(file)
        })?;

        info!(collection = %collection, file = file.id, size = file.original_size, "file stored");
        self.audit("file.put", Some(&subject(&file)), Some(collection));
        Ok(file)
    }

    /// Decrypt a file and check it against its plaintext tag.
    pub fn get_file(&self, id: u64, secret: Option<Password>) -> Result<Zeroizing<Vec<u8>>> {
        self.ensure_unlocked()?;
        let file: EncryptedFile = self.require(id)?;
        let key = self.resolve_collection_key(&file.collection, secret)?;
        self.open_file(&file, &key)
    }

    pub fn list_files(&self, collection: Option<&str>) -> Result<Vec<EncryptedFile>> {
        self.ensure_unlocked()?;
        Ok(self
            .records
            .list::<EncryptedFile>()?
            .into_iter()
            .filter(|f| collection.map_or(true, |c| f.collection == c))
            .collect())
    }

    /// Delete a file.  Requires the same secret as reading it.
    pub fn delete_file(&mut self, id: u64, secret: Option<Password>) -> Result<()> {
        self.ensure_unlocked()?;
        let file: EncryptedFile = self.require(id)?;
        let _key = self.resolve_collection_key(&file.collection, secret)?;

        self.in_batch(|vault, journal| {
            vault.records.delete::<EncryptedFile>(id)?;
            journal.obsolete.push(file.blob_name.clone());
            Ok(())
        })?;

        self.audit("file.delete", Some(&subject(&file)), Some(&file.collection));
        Ok(())
    }

    fn open_file(&self, file: &EncryptedFile, key: &VaultKey) -> Result<Zeroizing<Vec<u8>>> {
        let sealed = SealedFile {
            envelope: Envelope::from_bytes(&self.blobs.read(&file.blob_name)?)?,
            tag: file.checksum,
        };
        FileSealer::new(self.rng).open_as(&sealed, key, &subject(file))
    }

    fn reseal_file(
        &mut self,
        journal: &mut BlobJournal,
        mut file: EncryptedFile,
        old: &VaultKey,
        new: &VaultKey,
    ) -> Result<()> {
        let (name, envelope) =
            self.reseal_blob(journal, &file.blob_name, file.checksum, &subject(&file), old, new)?;
        journal
            .obsolete
            .push(std::mem::replace(&mut file.blob_name, name));
        file.iv = envelope.iv().to_vec();
        file.encrypted_size = envelope.len() as u64;
        self.records.put(file)?;
        Ok(())
    }

    /// Open a sealed blob under `old`, seal it under `new` into a freshly
    /// named blob, and return the new name.
    fn reseal_blob(
        &mut self,
        journal: &mut BlobJournal,
        blob_name: &str,
        tag: IntegrityTag,
        subject: &str,
        old: &VaultKey,
        new: &VaultKey,
    ) -> Result<(String, Envelope)> {
        let sealer = FileSealer::new(self.rng);
        let sealed = SealedFile {
            envelope: Envelope::from_bytes(&self.blobs.read(blob_name)?)?,
            tag,
        };
        let plain = sealer.open_as(&sealed, old, subject)?;
        let resealed = sealer.seal(&plain, new)?;
        let name = self.write_blob(journal, &resealed.envelope.to_bytes())?;
        Ok((name, resealed.envelope))
    }

    fn write_blob(&mut self, journal: &mut BlobJournal, bytes: &[u8]) -> Result<String> {
        let name = format!("{}.enc", self.rng.uuid()?);
        self.blobs.write(&name, bytes)?;
        journal.written.push(name.clone());
        Ok(name)
    }

    // ------------------------------------------------------------------
    // Backups
    // ------------------------------------------------------------------

    /// A backup engine for this vault's layout (cheap to build and clone).
    pub fn backup_engine(&self) -> BackupEngine {
        BackupEngine::new(self.layout.clone(), self.rng)
    }

    /// Snapshot the whole store into an encrypted artifact.
    pub fn create_backup(&self, description: Option<&str>) -> Result<BackupRecord> {
        let master = self.master_key()?;
        let record = self
            .backup_engine()
            .create(master, description, BackupKind::Manual)?;
        self.audit("backup.create", Some(&record.name), description);
        Ok(record)
    }

    /// Check an artifact against its catalog checksum.  Needs no key.
    pub fn verify_backup(&self, id_or_name: &str) -> Result<bool> {
        let engine = self.backup_engine();
        let record = engine.find(id_or_name)?;
        let ok = engine.verify(&record)?;
        self.audit(
            "backup.verify",
            Some(&record.name),
            Some(if ok { "ok" } else { "mismatch" }),
        );
        Ok(ok)
    }

    /// Restore a backup over the live store, then reload it.
    ///
    /// The artifact must have been sealed under the current master key.
    pub fn restore_backup(&mut self, id_or_name: &str) -> Result<RestoreReport> {
        let master = self.master.clone().ok_or(VaultError::Locked)?;
        let engine = self.backup_engine();
        let record = engine.find(id_or_name)?;

        let report = match engine.restore(&record, &master) {
            Ok(report) => report,
            Err(e) => {
                self.audit("backup.restore_failed", Some(&record.name), Some(&e.to_string()));
                return Err(e);
            }
        };

        self.records = FileRecordStore::open(&self.layout.store_dir())?;
        self.blobs = FsBlobStore::open(self.layout.blobs_dir())?;

        self.audit(
            "backup.restore",
            Some(&record.name),
            Some(&format!("{} blobs", report.blobs)),
        );
        Ok(report)
    }

    pub fn list_backups(&self) -> Result<Vec<BackupRecord>> {
        Ok(self.backup_engine().catalog()?.list())
    }

    pub fn backup_statistics(&self) -> Result<BackupStatistics> {
        Ok(self.backup_engine().catalog()?.statistics())
    }

    pub fn delete_backup(&self, id_or_name: &str) -> Result<BackupRecord> {
        self.ensure_unlocked()?;
        let record = self.backup_engine().delete(id_or_name)?;
        self.audit("backup.delete", Some(&record.name), None);
        Ok(record)
    }

    /// Remove the previous store kept by the last restore.
    pub fn cleanup_before_restore(&self) -> Result<bool> {
        self.ensure_unlocked()?;
        let removed = self.backup_engine().cleanup_before_restore()?;
        if removed {
            self.audit("backup.cleanup", None, None);
        }
        Ok(removed)
    }

    // ------------------------------------------------------------------
    // Audit
    // ------------------------------------------------------------------

    #[cfg(feature = "audit-log")]
    pub fn audit_log(&self) -> Option<&AuditLog> {
        self.audit.as_ref()
    }

    #[cfg(feature = "audit-log")]
    fn audit(&self, operation: &str, subject: Option<&str>, details: Option<&str>) {
        if let Some(log) = &self.audit {
            log.log(operation, subject, details);
        }
    }

    #[cfg(not(feature = "audit-log"))]
    fn audit(&self, _operation: &str, _subject: Option<&str>, _details: Option<&str>) {}

    // ------------------------------------------------------------------
    // Helpers
    // ------------------------------------------------------------------

    fn ensure_unlocked(&self) -> Result<()> {
        self.master_key().map(|_| ())
    }

    /// A caller-scoped copy of the master key (zeroed on drop).
    fn master_copy(&self) -> Result<VaultKey> {
        Ok(self.master_key()?.to_vault_key())
    }

    fn require<R: Record>(&self, id: u64) -> Result<R> {
        self.records
            .get(id)?
            .ok_or_else(|| VaultError::NotFound(format!("{} record {id}", R::TABLE)))
    }

    fn remove<R: Record>(&mut self, id: u64) -> Result<()> {
        if self.records.delete::<R>(id)? {
            Ok(())
        } else {
            Err(VaultError::NotFound(format!("{} record {id}", R::TABLE)))
        }
    }

    /// Run `f` as one store batch.
    ///
    /// On success the batch is committed and obsolete blobs are removed.
    /// On failure the batch is dropped and blobs written by `f` are removed.
    fn in_batch<T>(
        &mut self,
        f: impl FnOnce(&mut Self, &mut BlobJournal) -> Result<T>,
    ) -> Result<T> {
        let mut journal = BlobJournal::default();
        self.records.begin_batch();

        let outcome = f(self, &mut journal).and_then(|value| {
            self.records.commit_batch()?;
            Ok(value)
        });

        match outcome {
            Ok(value) => {
                for name in &journal.obsolete {
                    if let Err(e) = self.blobs.delete(name) {
                        warn!(blob = %name, error = %e, "could not remove obsolete blob");
                    }
                }
                Ok(value)
            }
            Err(e) => {
                if let Err(abort) = self.records.abort_batch() {
                    warn!(error = %abort, "could not reload store after failed batch");
                }
                for name in &journal.written {
                    let _ = self.blobs.delete(name);
                }
                Err(e)
            }
        }
    }
}

/// Log/audit subject for a record: table name and id, nothing else.
fn subject<R: Record>(record: &R) -> String {
    format!("{} {}", R::TABLE, record.id())
}

fn matches_query(text: &str, query: &str) -> bool {
    text.to_lowercase().contains(&query.trim().to_lowercase())
}

/// Stored names are bare file names: they become default output paths.
fn validate_file_name(name: &str) -> Result<()> {
    if name.trim().is_empty() {
        return Err(VaultError::InvalidInput("file name cannot be empty".into()));
    }
    if name.chars().any(|c| c == '/' || c == '\\' || c.is_control()) {
        return Err(VaultError::InvalidInput(format!(
            "file name '{}' contains invalid characters",
            name.escape_debug()
        )));
    }
    // Separators are out, so only a bare dot name can point elsewhere.
    if name == "." || name == ".." {
        return Err(VaultError::InvalidInput(format!("'{name}' is not a file name")));
    }
    Ok(())
}

fn check_card_fields(card_type: CardType, fields: &CardFields) -> Result<()> {
    let allowed = card_type.fields();
    if let Some(unknown) = fields.names().find(|n| !allowed.contains(n)) {
        return Err(VaultError::InvalidInput(format!(
            "'{unknown}' is not a {} field (expected one of: {})",
            card_type.display_name(),
            allowed.join(", ")
        )));
    }
    Ok(())
}
