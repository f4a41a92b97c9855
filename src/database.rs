//! Database initialization, table definitions and link storage
//!
//! This module handles the setup of the embedded redb database and every
//! read or write against it. redb allows a single write transaction at a
//! time, so each mutation below (click increment, star toggle, the
//! de-duplication check on create) runs start to finish inside one write
//! transaction and cannot interleave with another.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use redb::{Database, ReadableDatabase, ReadableTable, TableDefinition};

use crate::error::{AppError, AppResult};
use crate::middleware::TokenAuth;
use crate::model::{Link, User};

/// Main table for storing links
///
/// Key: link id
/// Value: JSON-serialized `Link`
pub const TABLE_LINKS: TableDefinition<&str, &str> = TableDefinition::new("links_v1");

/// Index table for querying links by owner
///
/// Key: Composite key in format "{owner}:{timestamp_micros}:{link_id}"
/// Value: link id
///
/// The zero-padded timestamp keeps an owner's links in creation order.
pub const TABLE_OWNER_INDEX: TableDefinition<&str, &str> = TableDefinition::new("owner_index_v1");

/// Display profiles of users seen by the service
///
/// Key: user id
/// Value: JSON-serialized `User`
pub const TABLE_USERS: TableDefinition<&str, &str> = TableDefinition::new("users_v1");

/// Application state shared across all request handlers
#[derive(Clone)]
pub struct AppState {
    pub store: LinkStore,
    pub auth: TokenAuth,
}

impl AppState {
    pub fn new(db: Database, auth: TokenAuth) -> Self {
        Self {
            store: LinkStore::new(Arc::new(db)),
            auth,
        }
    }
}

/// Initializes the embedded database and creates required tables
///
/// # Example
///
/// ```no_run
/// # use ledgerly::database::init_db;
/// let db = init_db("ledgerly.db").expect("Failed to initialize database");
/// ```
pub fn init_db(db_path: &str) -> Result<Database, redb::Error> {
    let db = Database::create(db_path)?;

    let write_txn = db.begin_write()?;
    {
        write_txn.open_table(TABLE_LINKS)?;
        write_txn.open_table(TABLE_OWNER_INDEX)?;
        write_txn.open_table(TABLE_USERS)?;
    }
    write_txn.commit()?;

    Ok(db)
}

fn owner_index_key(owner: &str, created_at: DateTime<Utc>, id: &str) -> String {
    format!("{}:{:020}:{}", owner, created_at.timestamp_micros(), id)
}

fn read_link(
    table: &impl ReadableTable<&'static str, &'static str>,
    id: &str,
) -> AppResult<Option<Link>> {
    match table.get(id)? {
        Some(guard) => Ok(Some(serde_json::from_str(guard.value())?)),
        None => Ok(None),
    }
}

/// Candidate link ids for `owner`, oldest first.
///
/// The range also covers owners whose id starts with `"{owner}:"`, so
/// callers must check `Link::user` on every record they load.
fn owner_link_ids(
    index: &impl ReadableTable<&'static str, &'static str>,
    owner: &str,
) -> AppResult<Vec<String>> {
    // ';' sorts right after ':', so this range covers every "{owner}:*" key
    let start_key = format!("{}:", owner);
    let end_key = format!("{};", owner);

    let mut ids = Vec::new();
    for entry in index.range(start_key.as_str()..end_key.as_str())? {
        let (_, value) = entry?;
        ids.push(value.value().to_string());
    }
    Ok(ids)
}

fn owner_links(
    links: &impl ReadableTable<&'static str, &'static str>,
    index: &impl ReadableTable<&'static str, &'static str>,
    owner: &str,
) -> AppResult<Vec<Link>> {
    let mut result = Vec::new();
    for id in owner_link_ids(index, owner)? {
        match read_link(links, &id)? {
            Some(link) if link.user == owner => result.push(link),
            _ => {}
        }
    }
    Ok(result)
}

/// Handle to the link and user tables
#[derive(Clone)]
pub struct LinkStore {
    db: Arc<Database>,
}

impl LinkStore {
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    /// Inserts `link` unless its owner already saved the same normalized URL.
    ///
    /// The lookup and the insert share one write transaction.
    pub fn insert_unique(&self, link: Link) -> AppResult<Link> {
        let write_txn = self.db.begin_write()?;
        {
            let mut table_links = write_txn.open_table(TABLE_LINKS)?;
            let mut table_index = write_txn.open_table(TABLE_OWNER_INDEX)?;

            let normalized = link.normalized_url();
            let existing = owner_links(&table_links, &table_index, &link.user)?
                .into_iter()
                .find(|existing| existing.normalized_url() == normalized);
            if let Some(existing) = existing {
                return Err(AppError::DuplicateUrl {
                    existing: existing.existing(),
                });
            }

            let record_json = serde_json::to_string(&link)?;
            table_links.insert(link.id.as_str(), record_json.as_str())?;
            let index_key = owner_index_key(&link.user, link.created_at, &link.id);
            table_index.insert(index_key.as_str(), link.id.as_str())?;
        }
        write_txn.commit()?;

        Ok(link)
    }

    /// Inserts every link whose normalized URL is new for `owner`.
    ///
    /// Duplicates of existing links and of earlier entries in the same batch
    /// are skipped. Returns `(inserted, skipped)`.
    pub fn insert_batch(&self, owner: &str, links: Vec<Link>) -> AppResult<(usize, usize)> {
        let mut inserted = 0;
        let mut skipped = 0;

        let write_txn = self.db.begin_write()?;
        {
            let mut table_links = write_txn.open_table(TABLE_LINKS)?;
            let mut table_index = write_txn.open_table(TABLE_OWNER_INDEX)?;

            let mut seen: HashSet<String> = owner_links(&table_links, &table_index, owner)?
                .iter()
                .map(Link::normalized_url)
                .collect();

            for link in links {
                if link.user != owner || !seen.insert(link.normalized_url()) {
                    skipped += 1;
                    continue;
                }
                let record_json = serde_json::to_string(&link)?;
                table_links.insert(link.id.as_str(), record_json.as_str())?;
                let index_key = owner_index_key(&link.user, link.created_at, &link.id);
                table_index.insert(index_key.as_str(), link.id.as_str())?;
                inserted += 1;
            }
        }
        write_txn.commit()?;

        Ok((inserted, skipped))
    }

    pub fn get(&self, id: &str) -> AppResult<Option<Link>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(TABLE_LINKS)?;
        read_link(&table, id)
    }

    /// All links owned by `owner`, newest first.
    pub fn links_by_owner(&self, owner: &str) -> AppResult<Vec<Link>> {
        let read_txn = self.db.begin_read()?;
        let table_links = read_txn.open_table(TABLE_LINKS)?;
        let table_index = read_txn.open_table(TABLE_OWNER_INDEX)?;

        let mut links = owner_links(&table_links, &table_index, owner)?;
        links.reverse();
        Ok(links)
    }

    /// Every stored link, in no particular order.
    pub fn all_links(&self) -> AppResult<Vec<Link>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(TABLE_LINKS)?;

        let mut links = Vec::new();
        for entry in table.iter()? {
            let (_, value) = entry?;
            links.push(serde_json::from_str::<Link>(value.value())?);
        }
        Ok(links)
    }

    /// Loads a link, lets `mutate` change it, and writes it back atomically.
    ///
    /// If `mutate` fails nothing is written.
    pub fn update<F>(&self, id: &str, mutate: F) -> AppResult<Link>
    where
        F: FnOnce(&mut Link) -> AppResult<()>,
    {
        let write_txn = self.db.begin_write()?;
        let link = {
            let mut table = write_txn.open_table(TABLE_LINKS)?;
            let mut link = read_link(&table, id)?.ok_or(AppError::NotFound)?;
            mutate(&mut link)?;

            let record_json = serde_json::to_string(&link)?;
            table.insert(id, record_json.as_str())?;
            link
        };
        write_txn.commit()?;

        Ok(link)
    }

    /// Permanently removes a link owned by `actor`.
    pub fn delete(&self, id: &str, actor: &str) -> AppResult<Link> {
        let write_txn = self.db.begin_write()?;
        let link = {
            let mut table_links = write_txn.open_table(TABLE_LINKS)?;
            let link = read_link(&table_links, id)?.ok_or(AppError::NotFound)?;
            if link.user != actor {
                return Err(AppError::NotOwner);
            }

            table_links.remove(id)?;
            let index_key = owner_index_key(&link.user, link.created_at, &link.id);
            let mut table_index = write_txn.open_table(TABLE_OWNER_INDEX)?;
            table_index.remove(index_key.as_str())?;
            link
        };
        write_txn.commit()?;

        Ok(link)
    }

    /// Adds one click and returns the new count.
    pub fn increment_clicks(&self, id: &str) -> AppResult<u64> {
        let link = self.update(id, |link| {
            link.clicks = link.clicks.saturating_add(1);
            Ok(())
        })?;
        Ok(link.clicks)
    }

    /// Flips `actor`'s star on a link.
    pub fn toggle_star(&self, id: &str, actor: &str) -> AppResult<Link> {
        self.update(id, |link| {
            link.toggle_star(actor);
            Ok(())
        })
    }

    /// Records a user's display profile, writing only when it changed.
    pub fn remember_user(&self, user: &User) -> AppResult<()> {
        if self.user(&user.id)?.as_ref() == Some(user) {
            return Ok(());
        }

        let write_txn = self.db.begin_write()?;
        {
            let mut table = write_txn.open_table(TABLE_USERS)?;
            let record_json = serde_json::to_string(user)?;
            table.insert(user.id.as_str(), record_json.as_str())?;
        }
        write_txn.commit()?;

        Ok(())
    }

    pub fn user(&self, id: &str) -> AppResult<Option<User>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(TABLE_USERS)?;
        match table.get(id)? {
            Some(guard) => Ok(Some(serde_json::from_str(guard.value())?)),
            None => Ok(None),
        }
    }

    /// Looks up several users at once. Unknown ids are left out of the map.
    pub fn users<'a>(
        &self,
        ids: impl IntoIterator<Item = &'a str>,
    ) -> AppResult<HashMap<String, User>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(TABLE_USERS)?;

        let mut users = HashMap::new();
        for id in ids {
            if users.contains_key(id) {
                continue;
            }
            if let Some(guard) = table.get(id)? {
                let user: User = serde_json::from_str(guard.value())?;
                users.insert(id.to_string(), user);
            }
        }
        Ok(users)
    }
}
