use crate::{
    db::selector::Filter,
    store::{
        AccessOp, AccessRules, Collection, Cursor, DocumentStore, FindOptions, RecordId,
        SortOrder, StoreError,
    },
    value::{Document, Value},
};
use std::{
    collections::BTreeMap,
    sync::{Arc, Mutex, PoisonError},
};
use ulid::Ulid;

///
/// MemoryStore
///
/// In-process document store used by the test suite and for embedding.
/// Collections are created on first access; documents keep insertion order.
///

#[derive(Default)]
pub struct MemoryStore {
    collections: Mutex<BTreeMap<String, Arc<MemoryCollection>>>,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl DocumentStore for MemoryStore {
    fn collection(&self, name: &str) -> Arc<dyn Collection> {
        let mut collections = self
            .collections
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        let coll = collections
            .entry(name.to_string())
            .or_insert_with(|| Arc::new(MemoryCollection::default()));

        Arc::clone(coll) as Arc<dyn Collection>
    }
}

///
/// MemoryCollection
///

#[derive(Default)]
struct CollectionState {
    docs: Vec<Document>,
    allow: Vec<AccessRules>,
    deny: Vec<AccessRules>,
}

impl CollectionState {
    // Deny wins; with allow rules registered the op is allow-listed,
    // without any it is open.
    fn access_check(&self, op: AccessOp, doc: &Document) -> Result<(), StoreError> {
        for rules in &self.deny {
            if let Some(check) = rules.predicate(op)
                && check(doc)
            {
                return Err(StoreError::AccessDenied(op));
            }
        }

        let allow_checks: Vec<_> = self
            .allow
            .iter()
            .filter_map(|rules| rules.predicate(op))
            .collect();
        if !allow_checks.is_empty() && !allow_checks.iter().any(|check| check(doc)) {
            return Err(StoreError::AccessDenied(op));
        }

        Ok(())
    }

    fn select(&self, filter: &Filter, options: &FindOptions) -> Vec<Document> {
        let mut docs: Vec<Document> = self
            .docs
            .iter()
            .filter(|doc| filter.matches(doc))
            .cloned()
            .collect();

        if let Some((field, order)) = &options.sort {
            docs.sort_by(|a, b| {
                let av = a.get(field).unwrap_or(&Value::Null);
                let bv = b.get(field).unwrap_or(&Value::Null);
                let cmp = av.sort_cmp(bv);
                match order {
                    SortOrder::Asc => cmp,
                    SortOrder::Desc => cmp.reverse(),
                }
            });
        }
        if let Some(limit) = options.limit {
            docs.truncate(limit);
        }

        docs
    }
}

#[derive(Default)]
pub struct MemoryCollection {
    state: Mutex<CollectionState>,
}

impl MemoryCollection {
    fn locked(&self) -> std::sync::MutexGuard<'_, CollectionState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Collection for MemoryCollection {
    fn find_one(
        &self,
        filter: &Filter,
        options: &FindOptions,
    ) -> Result<Option<Document>, StoreError> {
        let limited = FindOptions {
            sort: options.sort.clone(),
            limit: Some(1),
        };

        Ok(self.locked().select(filter, &limited).into_iter().next())
    }

    fn find(&self, filter: &Filter, options: &FindOptions) -> Result<Cursor, StoreError> {
        Ok(Cursor::new(self.locked().select(filter, options)))
    }

    fn insert(&self, mut doc: Document) -> Result<RecordId, StoreError> {
        let mut state = self.locked();
        state.access_check(AccessOp::Insert, &doc)?;

        let id = RecordId::new(Ulid::new().to_string());
        doc.insert("id".to_string(), id.to_value());
        state.docs.push(doc);

        Ok(id)
    }

    fn update(&self, filter: &Filter, set: Document) -> Result<u64, StoreError> {
        let mut state = self.locked();

        let matching: Vec<usize> = state
            .docs
            .iter()
            .enumerate()
            .filter(|(_, doc)| filter.matches(doc))
            .map(|(i, _)| i)
            .collect();
        for i in &matching {
            state.access_check(AccessOp::Update, &state.docs[*i])?;
        }
        for i in &matching {
            for (field, value) in &set {
                state.docs[*i].insert(field.clone(), value.clone());
            }
        }

        Ok(matching.len() as u64)
    }

    fn remove(&self, id: &RecordId) -> Result<(), StoreError> {
        let mut state = self.locked();
        let id_value = id.to_value();

        if let Some(doc) = state
            .docs
            .iter()
            .find(|doc| doc.get("id") == Some(&id_value))
        {
            let doc = doc.clone();
            state.access_check(AccessOp::Remove, &doc)?;
            state.docs.retain(|d| d.get("id") != Some(&id_value));
        }

        Ok(())
    }

    fn allow(&self, rules: AccessRules) {
        self.locked().allow.push(rules);
    }

    fn deny(&self, rules: AccessRules) {
        self.locked().deny.push(rules);
    }
}

///
/// TESTS
///
