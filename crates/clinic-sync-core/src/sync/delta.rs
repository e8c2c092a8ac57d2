//! Delta batches: the created/updated/deleted triple exchanged in either
//! sync direction for one record type.

use serde::{Deserialize, Serialize};
use std::{fmt, iter, vec};

/// What a delta item asks the receiving side to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum SyncAction {
    Create,
    Update,
    Delete,
}

impl SyncAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            SyncAction::Create => "CREATE",
            SyncAction::Update => "UPDATE",
            SyncAction::Delete => "DELETE",
        }
    }
}

impl fmt::Display for SyncAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One entry of a delta batch, tagged with its action.
#[derive(Debug, Clone, PartialEq)]
pub enum DeltaItem<C, U, D> {
    Create(C),
    Update(U),
    Delete(D),
}

impl<C, U, D> DeltaItem<C, U, D> {
    /// The action this item carries.
    pub fn action(&self) -> SyncAction {
        match self {
            DeltaItem::Create(_) => SyncAction::Create,
            DeltaItem::Update(_) => SyncAction::Update,
            DeltaItem::Delete(_) => SyncAction::Delete,
        }
    }
}

/// Changes for one record type.
///
/// No ordering is implied across the three lists beyond the iteration
/// order: created, then updated, then deleted, each in list order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(bound(
    serialize = "C: Serialize, U: Serialize, D: Serialize",
    deserialize = "C: Deserialize<'de>, U: Deserialize<'de>, D: Deserialize<'de>"
))]
pub struct DeltaBatch<C, U = C, D = String> {
    #[serde(default = "Vec::new")]
    pub created: Vec<C>,
    #[serde(default = "Vec::new")]
    pub updated: Vec<U>,
    #[serde(default = "Vec::new")]
    pub deleted: Vec<D>,
}

impl<C, U, D> Default for DeltaBatch<C, U, D> {
    fn default() -> Self {
        Self {
            created: Vec::new(),
            updated: Vec::new(),
            deleted: Vec::new(),
        }
    }
}

impl<C, U, D> DeltaBatch<C, U, D> {
    /// An empty batch.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a batch from its three lists.
    pub fn from_parts(created: Vec<C>, updated: Vec<U>, deleted: Vec<D>) -> Self {
        Self {
            created,
            updated,
            deleted,
        }
    }

    /// Total number of items across all three lists.
    pub fn size(&self) -> usize {
        self.created.len() + self.updated.len() + self.deleted.len()
    }

    pub fn is_empty(&self) -> bool {
        self.size() == 0
    }

    /// Concatenate `other` after `self`, list by list. No deduplication.
    pub fn merge(mut self, other: Self) -> Self {
        self.created.extend(other.created);
        self.updated.extend(other.updated);
        self.deleted.extend(other.deleted);
        self
    }

    /// Append items to the three lists.
    pub fn add(
        mut self,
        created: impl IntoIterator<Item = C>,
        updated: impl IntoIterator<Item = U>,
        deleted: impl IntoIterator<Item = D>,
    ) -> Self {
        self.created.extend(created);
        self.updated.extend(updated);
        self.deleted.extend(deleted);
        self
    }

    /// Borrowing view yielding `(action, item)` pairs.
    pub fn iter(&self) -> impl Iterator<Item = DeltaItem<&C, &U, &D>> + '_ {
        self.created
            .iter()
            .map(DeltaItem::Create)
            .chain(self.updated.iter().map(DeltaItem::Update))
            .chain(self.deleted.iter().map(DeltaItem::Delete))
    }
}

type ItemMap<T, C, U, D> = iter::Map<vec::IntoIter<T>, fn(T) -> DeltaItem<C, U, D>>;

impl<C, U, D> IntoIterator for DeltaBatch<C, U, D> {
    type Item = DeltaItem<C, U, D>;
    #[allow(clippy::type_complexity)]
    type IntoIter = iter::Chain<
        iter::Chain<ItemMap<C, C, U, D>, ItemMap<U, C, U, D>>,
        ItemMap<D, C, U, D>,
    >;

    fn into_iter(self) -> Self::IntoIter {
        let create: fn(C) -> DeltaItem<C, U, D> = DeltaItem::Create;
        let update: fn(U) -> DeltaItem<C, U, D> = DeltaItem::Update;
        let delete: fn(D) -> DeltaItem<C, U, D> = DeltaItem::Delete;
        self.created
            .into_iter()
            .map(create)
            .chain(self.updated.into_iter().map(update))
            .chain(self.deleted.into_iter().map(delete))
    }
}

/// Wire-format batch: raw JSON records, ids for deletes.
pub type RawDelta = DeltaBatch<serde_json::Value, serde_json::Value, String>;

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn batch_strategy() -> impl Strategy<Value = DeltaBatch<i32, i32, String>> {
        (
            prop::collection::vec(any::<i32>(), 0..8),
            prop::collection::vec(any::<i32>(), 0..8),
            prop::collection::vec("[a-z0-9]{1,8}", 0..8),
        )
            .prop_map(|(c, u, d)| DeltaBatch::from_parts(c, u, d))
    }

    #[test]
    fn test_add_and_iterate() {
        let batch: DeltaBatch<i32, i32, i32> = DeltaBatch::from_parts(vec![1, 2], vec![0], vec![]);
        assert_eq!(batch.size(), 3);

        let batch = batch.add([3, 4], [], []).add([], [2], []).add([], [], [9]);
        assert_eq!(batch.created, vec![1, 2, 3, 4]);
        assert_eq!(batch.updated, vec![0, 2]);
        assert_eq!(batch.deleted, vec![9]);

        let actions: Vec<_> = batch
            .iter()
            .map(|item| {
                let action = item.action();
                let value = match item {
                    DeltaItem::Create(v) | DeltaItem::Update(v) | DeltaItem::Delete(v) => *v,
                };
                (action, value)
            })
            .collect();
        assert_eq!(
            actions,
            vec![
                (SyncAction::Create, 1),
                (SyncAction::Create, 2),
                (SyncAction::Create, 3),
                (SyncAction::Create, 4),
                (SyncAction::Update, 0),
                (SyncAction::Update, 2),
                (SyncAction::Delete, 9),
            ]
        );
        assert!(!batch.is_empty());
    }

    #[test]
    fn test_empty_batch() {
        let batch: DeltaBatch<i32> = DeltaBatch::new();
        assert_eq!(batch.size(), 0);
        assert!(batch.is_empty());
        assert_eq!(batch.into_iter().count(), 0);
    }

    #[test]
    fn test_wire_shape() {
        let raw: RawDelta = serde_json::from_str(r#"{"created": [{"id": "a"}]}"#).unwrap();
        assert_eq!(raw.created.len(), 1);
        assert!(raw.updated.is_empty());
        assert!(raw.deleted.is_empty());

        let json = serde_json::to_value(&raw).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"created": [{"id": "a"}], "updated": [], "deleted": []})
        );
    }

    #[test]
    fn test_deleted_must_be_ids() {
        let result: Result<RawDelta, _> = serde_json::from_str(r#"{"deleted": [{"id": 1}]}"#);
        assert!(result.is_err());
    }

    #[test]
    fn test_action_wire_names() {
        assert_eq!(SyncAction::Create.to_string(), "CREATE");
        assert_eq!(
            serde_json::to_string(&SyncAction::Delete).unwrap(),
            "\"DELETE\""
        );
    }

    proptest! {
        #[test]
        fn test_merge_with_empty_is_identity(batch in batch_strategy()) {
            let merged = batch.clone().merge(DeltaBatch::new());
            prop_assert_eq!(merged, batch);
        }

        #[test]
        fn test_size_is_sum_of_lists(batch in batch_strategy()) {
            prop_assert_eq!(
                batch.size(),
                batch.created.len() + batch.updated.len() + batch.deleted.len()
            );
            prop_assert_eq!(batch.is_empty(), batch.size() == 0);
        }

        #[test]
        fn test_merge_concatenates(a in batch_strategy(), b in batch_strategy()) {
            let merged = a.clone().merge(b.clone());
            prop_assert_eq!(merged.size(), a.size() + b.size());
            prop_assert_eq!(&merged.created[..a.created.len()], &a.created[..]);
            prop_assert_eq!(&merged.deleted[a.deleted.len()..], &b.deleted[..]);
        }

        #[test]
        fn test_iteration_visits_every_item(batch in batch_strategy()) {
            prop_assert_eq!(batch.iter().count(), batch.size());
            let creates = batch
                .iter()
                .take_while(|item| item.action() == SyncAction::Create)
                .count();
            prop_assert_eq!(creates, batch.created.len());
        }
    }
}
