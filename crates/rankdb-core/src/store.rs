//! The store: atomic CRUD over primary records plus score-ordered indexes,
//! and ranked, paginated listing.
//!
//! Every mutation touches the primary record and all of the kind's index
//! entries in one [`Engine::apply`] batch, so a reader can never observe a
//! record whose index memberships are partially updated. The full index key
//! set is always declared up front from the kind's descriptor hash — never
//! discovered by scanning the engine's keyspace.

use std::collections::BTreeMap;
use std::sync::Arc;

use tracing::{debug, trace};

use crate::codec;
use crate::engine::{Command, Engine, Order};
use crate::error::{CodecError, Error, QueryError, Result, SchemaError, ValidationError};
use crate::item::Item;
use crate::keys::{self, KeySpace};

/// Marker value for descriptor hash fields.
const REGISTRY_MARKER: &[u8] = b"1";

/// Which side declares a kind's indexed fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum IndexMode {
    /// Each field on the item declares its own indexed status. The store
    /// grows a per-kind registry lazily so that re-adds and removes can
    /// rewrite every index the kind has ever used. Flexible, but an add that
    /// omits a previously indexed field silently drops that id from the
    /// index.
    #[default]
    SelfDeclared,
    /// Indexed fields are declared once with [`Store::define_kind`]; adds
    /// fail unless every declared field is supplied with a numeric value.
    /// Guarantees index completeness at write time.
    Declared,
}

/// Configuration builder for [`Store`].
pub struct StoreBuilder {
    engine: Arc<dyn Engine>,
    base_prefix: String,
    mode: IndexMode,
}

impl StoreBuilder {
    /// Base prefix prepended to every key, isolating this store's namespace
    /// within a shared engine.
    pub fn key_prefix(mut self, prefix: &str) -> Self {
        self.base_prefix = prefix.to_string();
        self
    }

    pub fn index_mode(mut self, mode: IndexMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn build(self) -> Store {
        Store {
            engine: self.engine,
            keys: KeySpace::new(self.base_prefix),
            mode: self.mode,
        }
    }
}

/// An indexed-object store handle.
///
/// `Store` is cheaply clonable and `Send + Sync`; it holds no mutable state
/// beyond the engine handle and its key-namespace configuration, so any
/// number of callers may issue operations in parallel.
#[derive(Clone)]
pub struct Store {
    engine: Arc<dyn Engine>,
    keys: KeySpace,
    mode: IndexMode,
}

/// One page of a ranked listing.
#[derive(Debug, Clone, PartialEq)]
pub struct ListPage {
    pub items: Vec<Item>,
    /// Whether more results exist beyond this page.
    pub has_more: bool,
}

impl Store {
    pub fn builder(engine: Arc<dyn Engine>) -> StoreBuilder {
        StoreBuilder {
            engine,
            base_prefix: String::new(),
            mode: IndexMode::default(),
        }
    }

    pub fn index_mode(&self) -> IndexMode {
        self.mode
    }

    pub fn key_space(&self) -> &KeySpace {
        &self.keys
    }

    /// Declare a kind's indexed fields.
    ///
    /// Required before any add of that kind in [`IndexMode::Declared`]; in
    /// [`IndexMode::SelfDeclared`] it pre-seeds the registry so listings on
    /// the named fields are valid before the first indexed add.
    pub fn define_kind(&self, kind: &str, indexed_fields: &[&str]) -> Result<()> {
        keys::validate_kind(kind)?;
        let type_key = self.keys.type_key(kind);
        let mut commands = Vec::with_capacity(indexed_fields.len());
        for field in indexed_fields {
            keys::validate_field_name(field)?;
            commands.push(Command::HSet {
                key: type_key.clone(),
                field: (*field).to_string(),
                value: REGISTRY_MARKER.to_vec(),
            });
        }
        self.engine
            .apply(commands)
            .map_err(|e| Error::engine("define_kind", e))?;
        debug!(kind = %kind, fields = indexed_fields.len(), "kind defined");
        Ok(())
    }

    /// The kind's declared/registered indexed field names, sorted, or `None`
    /// if the kind has no descriptor.
    pub fn describe_kind(&self, kind: &str) -> Result<Option<Vec<String>>> {
        keys::validate_kind(kind)?;
        let registry = self
            .engine
            .hgetall(&self.keys.type_key(kind))
            .map_err(|e| Error::engine("describe_kind", e))?;
        if registry.is_empty() {
            return Ok(None);
        }
        Ok(Some(registry.into_keys().collect()))
    }

    /// Add an item, fully replacing any prior version.
    ///
    /// The primary record and every index entry the kind is known to use are
    /// rewritten in one atomic batch: present indexed fields are upserted
    /// with their numeric value as score, fields absent from this version
    /// are retracted. Memberships from a previous version therefore never
    /// survive a re-add.
    pub fn add(&self, item: &Item) -> Result<()> {
        item.validate()?;
        let kind = item.kind();
        let id = item.id();
        let type_key = self.keys.type_key(kind);
        let registry = self
            .engine
            .hgetall(&type_key)
            .map_err(|e| Error::engine("add", e))?;

        // field -> Some(score) to upsert, None to retract.
        let mut memberships: BTreeMap<&str, Option<f64>> = BTreeMap::new();
        let mut new_registry_fields: Vec<&str> = Vec::new();

        match self.mode {
            IndexMode::Declared => {
                if registry.is_empty() {
                    return Err(SchemaError::TypeNotDefined(kind.to_string()).into());
                }
                for field in registry.keys() {
                    let Some(item_field) = item.field(field) else {
                        return Err(SchemaError::MissingIndexedField {
                            kind: kind.to_string(),
                            field: field.clone(),
                        }
                        .into());
                    };
                    let Some(score) = item_field.value.as_score() else {
                        return Err(SchemaError::NonNumericIndex {
                            kind: kind.to_string(),
                            field: field.clone(),
                            actual: item_field.value.value_type(),
                        }
                        .into());
                    };
                    ensure_finite(field, score)?;
                    memberships.insert(field, Some(score));
                }
            }
            IndexMode::SelfDeclared => {
                // Start with a retraction for every index the kind has ever
                // used; present indexed fields overwrite theirs below.
                for field in registry.keys() {
                    memberships.insert(field, None);
                }
                for (name, item_field) in item.fields() {
                    if !item_field.indexed {
                        continue;
                    }
                    let Some(score) = item_field.value.as_score() else {
                        return Err(SchemaError::NotIndexableType {
                            field: name.clone(),
                            actual: item_field.value.value_type(),
                        }
                        .into());
                    };
                    ensure_finite(name, score)?;
                    if !registry.contains_key(name) {
                        new_registry_fields.push(name);
                    }
                    memberships.insert(name, Some(score));
                }
            }
        }

        let record = codec::encode_item(item)?;
        let mut commands =
            Vec::with_capacity(1 + memberships.len() + new_registry_fields.len());
        commands.push(Command::Set {
            key: self.keys.item_key(kind, id),
            value: record,
        });
        for (field, score) in &memberships {
            let key = self.keys.index_key(kind, field);
            commands.push(match score {
                Some(score) => Command::ZAdd {
                    key,
                    score: *score,
                    member: id.to_string(),
                },
                None => Command::ZRem {
                    key,
                    member: id.to_string(),
                },
            });
        }
        for field in new_registry_fields {
            commands.push(Command::HSet {
                key: type_key.clone(),
                field: field.to_string(),
                value: REGISTRY_MARKER.to_vec(),
            });
        }

        self.engine
            .apply(commands)
            .map_err(|e| Error::engine("add", e))?;
        debug!(kind = %kind, id = %id, indexes = memberships.len(), "item added");
        Ok(())
    }

    /// Fetch an item by key. Absent is `None`, never an error.
    pub fn get(&self, kind: &str, id: &str) -> Result<Option<Item>> {
        keys::validate_kind(kind)?;
        keys::validate_id(id)?;
        let key = self.keys.item_key(kind, id);
        let Some(bytes) = self
            .engine
            .get(&key)
            .map_err(|e| Error::engine("get", e))?
        else {
            return Ok(None);
        };
        Ok(Some(codec::decode_item(&bytes)?))
    }

    /// Remove an item: one atomic batch deletes the primary record and
    /// retracts the id from every index entry belonging to the kind.
    ///
    /// Returns `true` if a record existed and was deleted. Removing a
    /// nonexistent item returns `false` — idempotent, not an error.
    pub fn remove(&self, kind: &str, id: &str) -> Result<bool> {
        keys::validate_kind(kind)?;
        keys::validate_id(id)?;
        let registry = self
            .engine
            .hgetall(&self.keys.type_key(kind))
            .map_err(|e| Error::engine("remove", e))?;

        let mut commands: Vec<Command> = registry
            .keys()
            .map(|field| Command::ZRem {
                key: self.keys.index_key(kind, field),
                member: id.to_string(),
            })
            .collect();
        commands.push(Command::Del {
            key: self.keys.item_key(kind, id),
        });

        let deleted = self
            .engine
            .apply(commands)
            .map_err(|e| Error::engine("remove", e))?;
        debug!(kind = %kind, id = %id, existed = deleted > 0, "item removed");
        Ok(deleted > 0)
    }

    /// Ranked, paginated listing of a kind over one indexed field.
    pub fn list(&self, kind: &str) -> ListBuilder<'_> {
        ListBuilder::new(self, kind.to_string())
    }
}

fn ensure_finite(field: &str, score: f64) -> Result<()> {
    if !score.is_finite() {
        return Err(ValidationError::NonFiniteScore {
            field: field.to_string(),
        }
        .into());
    }
    Ok(())
}

/// Builder for a ranked listing.
///
/// Items are returned in score order on the sort field, ties broken by id —
/// ascending for ascending listings, descending for descending ones — so
/// pagination is stable across repeated calls with no intervening writes.
pub struct ListBuilder<'a> {
    store: &'a Store,
    kind: String,
    sort_by: Option<String>,
    descending: bool,
    offset: u64,
    limit: u64,
}

impl<'a> ListBuilder<'a> {
    fn new(store: &'a Store, kind: String) -> Self {
        Self {
            store,
            kind,
            sort_by: None,
            descending: false,
            offset: 0,
            limit: u64::MAX,
        }
    }

    /// The indexed field to order by. Required.
    pub fn sort_by(mut self, field: &str) -> Self {
        self.sort_by = Some(field.to_string());
        self
    }

    /// Highest-score-first when `true`. Default ascending.
    pub fn descending(mut self, descending: bool) -> Self {
        self.descending = descending;
        self
    }

    /// Rank to start from. Default 0.
    pub fn offset(mut self, offset: u64) -> Self {
        self.offset = offset;
        self
    }

    /// Page size. Default unlimited.
    pub fn limit(mut self, limit: u64) -> Self {
        self.limit = limit;
        self
    }

    /// Execute the listing.
    ///
    /// Fetches `limit + 1` ids from the index; the lookahead entry, when
    /// present, sets `has_more` and is discarded before records are decoded.
    /// A missing primary record or a decode failure fails the whole call —
    /// no partial page is returned.
    pub fn execute(self) -> Result<ListPage> {
        keys::validate_kind(&self.kind)?;
        let sort_by = self.sort_by.ok_or(QueryError::SortFieldRequired)?;
        keys::validate_field_name(&sort_by)?;

        let store = self.store;
        let registry = store
            .engine
            .hgetall(&store.keys.type_key(&self.kind))
            .map_err(|e| Error::engine("list", e))?;
        if !registry.contains_key(&sort_by) {
            return Err(QueryError::FieldNotIndexed {
                kind: self.kind,
                field: sort_by,
            }
            .into());
        }

        let order = if self.descending {
            Order::Descending
        } else {
            Order::Ascending
        };
        let mut ids = store
            .engine
            .zrange(
                &store.keys.index_key(&self.kind, &sort_by),
                self.offset,
                self.limit.saturating_add(1),
                order,
            )
            .map_err(|e| Error::engine("list", e))?;

        let has_more = ids.len() as u64 > self.limit;
        if has_more {
            ids.pop();
        }

        let record_keys: Vec<String> = ids
            .iter()
            .map(|id| store.keys.item_key(&self.kind, id))
            .collect();
        let records = store
            .engine
            .get_many(&record_keys)
            .map_err(|e| Error::engine("list", e))?;

        let mut items = Vec::with_capacity(records.len());
        for (key, record) in record_keys.into_iter().zip(records) {
            let Some(bytes) = record else {
                return Err(CodecError::MissingRecord { key }.into());
            };
            items.push(codec::decode_item(&bytes)?);
        }

        trace!(
            kind = %self.kind,
            sort_by = %sort_by,
            offset = self.offset,
            returned = items.len(),
            has_more,
            "list page"
        );
        Ok(ListPage { items, has_more })
    }
}
