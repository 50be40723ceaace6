//! Keyed scratch storage for externalization aids. Each checklist is one
//! JSON document under `checklist:<id>`, with a metadata index mapping list
//! ids to titles plus the most-recently-active id. The document shape is a
//! compatibility surface and must stay `{title, items: [{id, text,
//! completed}]}`.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::storage::{get_json, put_json, KvStore, StoreResult};

const INDEX_KEY: &str = "checklist:index";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChecklistItem {
    pub id: String,
    pub text: String,
    pub completed: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChecklistDoc {
    pub title: String,
    pub items: Vec<ChecklistItem>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChecklistIndex {
    /// List id to title, in stable id order.
    pub titles: BTreeMap<String, String>,
    pub last_active: Option<String>,
}

pub struct ChecklistService<S> {
    store: S,
}

impl<S: KvStore> ChecklistService<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    fn doc_key(list_id: &str) -> String {
        format!("checklist:{list_id}")
    }

    pub fn index(&self) -> StoreResult<ChecklistIndex> {
        Ok(get_json(&self.store, INDEX_KEY)?.unwrap_or_default())
    }

    fn write_index(&self, index: &ChecklistIndex) -> StoreResult<()> {
        put_json(&self.store, INDEX_KEY, index)
    }

    /// Writes the document and marks the list most recently active.
    pub fn save_list(&self, list_id: &str, doc: &ChecklistDoc) -> StoreResult<()> {
        put_json(&self.store, &Self::doc_key(list_id), doc)?;
        let mut index = self.index()?;
        index.titles.insert(list_id.to_string(), doc.title.clone());
        index.last_active = Some(list_id.to_string());
        self.write_index(&index)
    }

    pub fn load_list(&self, list_id: &str) -> StoreResult<Option<ChecklistDoc>> {
        get_json(&self.store, &Self::doc_key(list_id))
    }

    pub fn delete_list(&self, list_id: &str) -> StoreResult<()> {
        self.store.delete(&Self::doc_key(list_id))?;
        let mut index = self.index()?;
        index.titles.remove(list_id);
        if index.last_active.as_deref() == Some(list_id) {
            index.last_active = None;
        }
        self.write_index(&index)
    }

    /// Appends a new unchecked item. `None` when the list does not exist.
    pub fn add_item(&self, list_id: &str, text: &str) -> StoreResult<Option<ChecklistItem>> {
        let Some(mut doc) = self.load_list(list_id)? else {
            return Ok(None);
        };
        let item = ChecklistItem {
            id: Uuid::new_v4().to_string(),
            text: text.to_string(),
            completed: false,
        };
        doc.items.push(item.clone());
        self.save_list(list_id, &doc)?;
        Ok(Some(item))
    }

    /// Flips an item's completed flag, returning the new state. `None` when
    /// the list or item does not exist.
    pub fn toggle_item(&self, list_id: &str, item_id: &str) -> StoreResult<Option<bool>> {
        let Some(mut doc) = self.load_list(list_id)? else {
            return Ok(None);
        };
        let Some(item) = doc.items.iter_mut().find(|i| i.id == item_id) else {
            return Ok(None);
        };
        item.completed = !item.completed;
        let state = item.completed;
        self.save_list(list_id, &doc)?;
        Ok(Some(state))
    }

    /// Removes an item, returning it. `None` when the list or item does not
    /// exist.
    pub fn remove_item(&self, list_id: &str, item_id: &str) -> StoreResult<Option<ChecklistItem>> {
        let Some(mut doc) = self.load_list(list_id)? else {
            return Ok(None);
        };
        let Some(pos) = doc.items.iter().position(|i| i.id == item_id) else {
            return Ok(None);
        };
        let item = doc.items.remove(pos);
        self.save_list(list_id, &doc)?;
        Ok(Some(item))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStore;

    fn service() -> ChecklistService<MemoryStore> {
        ChecklistService::new(MemoryStore::new())
    }

    fn doc(title: &str) -> ChecklistDoc {
        ChecklistDoc {
            title: title.to_string(),
            items: Vec::new(),
        }
    }

    #[test]
    fn save_load_round_trip_preserves_shape() {
        let service = service();
        let mut morning = doc("Morning routine");
        morning.items.push(ChecklistItem {
            id: "i1".to_string(),
            text: "Pack bag".to_string(),
            completed: false,
        });
        service.save_list("morning", &morning).unwrap();

        let loaded = service.load_list("morning").unwrap().unwrap();
        assert_eq!(loaded, morning);
        assert_eq!(service.load_list("evening").unwrap(), None);
    }

    #[test]
    fn index_tracks_titles_and_last_active() {
        let service = service();
        service.save_list("a", &doc("First")).unwrap();
        service.save_list("b", &doc("Second")).unwrap();

        let index = service.index().unwrap();
        assert_eq!(index.titles.len(), 2);
        assert_eq!(index.titles.get("a").map(String::as_str), Some("First"));
        assert_eq!(index.last_active.as_deref(), Some("b"));
    }

    #[test]
    fn delete_clears_last_active_when_it_pointed_there() {
        let service = service();
        service.save_list("a", &doc("First")).unwrap();
        service.delete_list("a").unwrap();

        let index = service.index().unwrap();
        assert!(index.titles.is_empty());
        assert_eq!(index.last_active, None);
    }

    #[test]
    fn item_lifecycle_add_toggle_remove() {
        let service = service();
        service.save_list("tasks", &doc("Tasks")).unwrap();

        let item = service.add_item("tasks", "Read chapter").unwrap().unwrap();
        assert!(!item.completed);

        assert_eq!(service.toggle_item("tasks", &item.id).unwrap(), Some(true));
        assert_eq!(service.toggle_item("tasks", &item.id).unwrap(), Some(false));

        let removed = service.remove_item("tasks", &item.id).unwrap().unwrap();
        assert_eq!(removed.id, item.id);
        assert!(service.load_list("tasks").unwrap().unwrap().items.is_empty());
    }

    #[test]
    fn item_operations_on_missing_targets_return_none() {
        let service = service();
        assert_eq!(service.add_item("ghost", "x").unwrap(), None);

        service.save_list("tasks", &doc("Tasks")).unwrap();
        assert_eq!(service.toggle_item("tasks", "ghost-item").unwrap(), None);
        assert_eq!(service.remove_item("tasks", "ghost-item").unwrap(), None);
    }

    #[test]
    fn documents_serialize_with_the_fixed_field_names() {
        let mut list = doc("Shape");
        list.items.push(ChecklistItem {
            id: "i1".to_string(),
            text: "item".to_string(),
            completed: true,
        });
        let json = serde_json::to_string(&list).unwrap();
        assert!(json.contains("\"title\":\"Shape\""), "json: {json}");
        assert!(json.contains("\"items\""), "json: {json}");
        assert!(json.contains("\"completed\":true"), "json: {json}");
    }
}
