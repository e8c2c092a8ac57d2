//! Push and pull capabilities.
//!
//! A record type implements [`SyncEntity`] with its typed wire and record
//! shapes. [`EntityCapability`] erases those types behind the object-safe
//! [`PushCapability`] the [`Sink`](super::Sink) stores. Pull goes through
//! [`PullCapability`], normally a [`TablePull`] over a table description.

use rusqlite::Connection;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::marker::PhantomData;
use tracing::debug;

use super::{DeltaItem, RawDelta, SyncAction, SyncContext, SyncError, SyncResult, Watermark};
use crate::db::{changes_since, TableSpec, Upserted};

/// Typed push logic for one record type.
pub trait SyncEntity {
    /// Record-type key used on the wire.
    const KEY: &'static str;

    /// Shape the client sends for created and updated items.
    type Wire: DeserializeOwned;

    /// Normalized record written to storage.
    type Record;

    /// Normalize a wire record: parse timestamps, fill defaults, and clear
    /// optional references that point nowhere.
    fn transform_delta(
        ctx: &mut SyncContext<'_>,
        action: SyncAction,
        wire: Self::Wire,
    ) -> SyncResult<Self::Record>;

    /// Upsert. Creates and updates converge on the same row.
    fn create_from_delta(ctx: &mut SyncContext<'_>, record: &Self::Record) -> SyncResult<Upserted>;

    fn update_from_delta(ctx: &mut SyncContext<'_>, record: &Self::Record) -> SyncResult<Upserted> {
        Self::create_from_delta(ctx, record)
    }

    /// Soft-delete by id, stamped with the push watermark. Returns the
    /// number of rows it marked deleted.
    fn delete_from_delta(ctx: &mut SyncContext<'_>, id: &str) -> SyncResult<usize>;
}

/// Object-safe push entry point for one record type.
pub trait PushCapability: Send + Sync {
    fn key(&self) -> &'static str;

    /// Transform and apply every item of `delta`, created then updated then
    /// deleted. The first failure is returned and nothing is retried.
    fn apply_delta_changes(&self, ctx: &mut SyncContext<'_>, delta: RawDelta) -> SyncResult<()>;
}

/// [`PushCapability`] backed by a [`SyncEntity`].
pub struct EntityCapability<E>(PhantomData<fn() -> E>);

impl<E> EntityCapability<E> {
    pub fn new() -> Self {
        Self(PhantomData)
    }
}

impl<E> Default for EntityCapability<E> {
    fn default() -> Self {
        Self::new()
    }
}

fn decode<E: SyncEntity>(raw: Value) -> SyncResult<E::Wire> {
    serde_json::from_value(raw).map_err(|e| SyncError::InvalidRecord {
        key: E::KEY,
        reason: e.to_string(),
    })
}

impl<E: SyncEntity> PushCapability for EntityCapability<E> {
    fn key(&self) -> &'static str {
        E::KEY
    }

    fn apply_delta_changes(&self, ctx: &mut SyncContext<'_>, delta: RawDelta) -> SyncResult<()> {
        debug!(
            record_type = E::KEY,
            created = delta.created.len(),
            updated = delta.updated.len(),
            deleted = delta.deleted.len(),
            "applying delta"
        );

        for item in delta {
            match item {
                DeltaItem::Create(raw) => {
                    let record = E::transform_delta(ctx, SyncAction::Create, decode::<E>(raw)?)?;
                    let outcome = E::create_from_delta(ctx, &record)?;
                    ctx.stats_mut().record_upsert(outcome);
                }
                DeltaItem::Update(raw) => {
                    let record = E::transform_delta(ctx, SyncAction::Update, decode::<E>(raw)?)?;
                    let outcome = E::update_from_delta(ctx, &record)?;
                    ctx.stats_mut().record_upsert(outcome);
                }
                DeltaItem::Delete(id) => {
                    let rows = E::delete_from_delta(ctx, &id)?;
                    ctx.stats_mut().deleted += rows;
                }
            }
        }
        Ok(())
    }
}

/// Read side for one record type.
pub trait PullCapability: Send + Sync {
    fn key(&self) -> &'static str;

    /// Everything changed after `since`, as wire records and deleted ids.
    fn pull(&self, conn: &Connection, since: &Watermark) -> SyncResult<RawDelta>;
}

/// Pull straight from a table description.
#[derive(Debug, Clone, Copy)]
pub struct TablePull {
    key: &'static str,
    spec: TableSpec,
}

impl TablePull {
    pub const fn new(key: &'static str, spec: TableSpec) -> Self {
        Self { key, spec }
    }
}

impl PullCapability for TablePull {
    fn key(&self) -> &'static str {
        self.key
    }

    fn pull(&self, conn: &Connection, since: &Watermark) -> SyncResult<RawDelta> {
        Ok(changes_since(conn, &self.spec, since)?)
    }
}
