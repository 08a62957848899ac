//! sled-backed entity store.
//!
//! One tree per record kind plus the index trees that let transactions enforce
//! unique keys and find open maintenance without scanning. All records are CBOR.
use crate::error::{Entity, FleetError, Result};
use crate::journal::{Witness, subject_prefix};
use sled::transaction::{
    ConflictableTransactionError, ConflictableTransactionResult, TransactionalTree,
};
use sled::{Db, Tree};

/// Result type inside sled transaction closures.
pub(crate) type TxResult<T> = ConflictableTransactionResult<T, FleetError>;

const TRIP_COUNTER: &[u8] = b"trip_number";

#[derive(Debug, Clone)]
pub struct FleetStore {
    pub(crate) vehicles: Tree,
    pub(crate) drivers: Tree,
    pub(crate) trips: Tree,
    pub(crate) expenses: Tree,
    pub(crate) fuel_logs: Tree,
    pub(crate) maintenance_logs: Tree,
    pub(crate) monthly_summaries: Tree,
    pub(crate) plates: Tree,           // license plate -> vehicle id
    pub(crate) licenses: Tree,         // license number -> driver id
    pub(crate) trip_expenses: Tree,    // trip id -> expense id
    pub(crate) open_maintenance: Tree, // vehicle id -> cbor list of open log ids
    pub(crate) meta: Tree,
    pub(crate) journal: Tree,
}

impl FleetStore {
    pub fn open(db: &Db) -> Result<Self> {
        Ok(Self {
            vehicles: db.open_tree("vehicles")?,
            drivers: db.open_tree("drivers")?,
            trips: db.open_tree("trips")?,
            expenses: db.open_tree("expenses")?,
            fuel_logs: db.open_tree("fuel_logs")?,
            maintenance_logs: db.open_tree("maintenance_logs")?,
            monthly_summaries: db.open_tree("monthly_summaries")?,
            plates: db.open_tree("plates")?,
            licenses: db.open_tree("licenses")?,
            trip_expenses: db.open_tree("trip_expenses")?,
            open_maintenance: db.open_tree("open_maintenance")?,
            meta: db.open_tree("meta")?,
            journal: db.open_tree("journal")?,
        })
    }
}

pub(crate) fn encode<T: minicbor::Encode<()> + ?Sized>(value: &T) -> Result<Vec<u8>> {
    Ok(minicbor::to_vec(value)?)
}

pub(crate) fn decode<T: for<'b> minicbor::Decode<'b, ()>>(bytes: &[u8]) -> Result<T> {
    Ok(minicbor::decode(bytes)?)
}

pub(crate) fn get<T: for<'b> minicbor::Decode<'b, ()>>(
    tree: &Tree,
    key: &str,
) -> Result<Option<T>> {
    tree.get(key.as_bytes())?
        .map(|bytes| decode(&bytes))
        .transpose()
}

/// Like [`get`], but a missing record is a `NotFound` for `entity`.
pub(crate) fn load<T: for<'b> minicbor::Decode<'b, ()>>(
    tree: &Tree,
    entity: Entity,
    id: &str,
) -> Result<T> {
    get(tree, id)?.ok_or_else(|| FleetError::not_found(entity, id))
}

pub(crate) fn scan<T: for<'b> minicbor::Decode<'b, ()>>(tree: &Tree) -> Result<Vec<T>> {
    tree.iter().values().map(|bytes| decode(&bytes?)).collect()
}

pub(crate) fn history(journal: &Tree, subject_id: &str) -> Result<Vec<Witness>> {
    journal
        .scan_prefix(subject_prefix(subject_id).as_bytes())
        .values()
        .map(|bytes| decode(&bytes?))
        .collect()
}

/// Lifts a domain error into a transaction abort.
pub(crate) trait OrAbort<T> {
    fn or_abort(self) -> TxResult<T>;
}

impl<T> OrAbort<T> for Result<T> {
    fn or_abort(self) -> TxResult<T> {
        self.map_err(ConflictableTransactionError::Abort)
    }
}

pub(crate) fn tx_get<T: for<'b> minicbor::Decode<'b, ()>>(
    tree: &TransactionalTree,
    key: &str,
) -> TxResult<Option<T>> {
    match tree.get(key.as_bytes())? {
        Some(bytes) => decode(&bytes).map(Some).or_abort(),
        None => Ok(None),
    }
}

pub(crate) fn tx_load<T: for<'b> minicbor::Decode<'b, ()>>(
    tree: &TransactionalTree,
    entity: Entity,
    id: &str,
) -> TxResult<T> {
    match tx_get(tree, id)? {
        Some(record) => Ok(record),
        None => Err(FleetError::not_found(entity, id)).or_abort(),
    }
}

pub(crate) fn tx_put<T: minicbor::Encode<()> + ?Sized>(
    tree: &TransactionalTree,
    key: &str,
    value: &T,
) -> TxResult<()> {
    let bytes = encode(value).or_abort()?;
    tree.insert(key.as_bytes(), bytes)?;
    Ok(())
}

pub(crate) fn tx_witness(journal: &TransactionalTree, witness: &Witness) -> TxResult<()> {
    let (key, cbor) = witness.finalise().or_abort()?;
    journal.insert(key.as_bytes(), cbor)?;
    Ok(())
}

/// Reads and bumps the trip counter. Running inside the creating transaction
/// makes numbers gapless and unique under concurrent creates.
pub(crate) fn tx_next_trip_number(meta: &TransactionalTree) -> TxResult<u64> {
    let current = match meta.get(TRIP_COUNTER)? {
        Some(bytes) => {
            let raw = <[u8; 8]>::try_from(&bytes[..])
                .map_err(|_| FleetError::Codec("corrupt trip counter".into()))
                .or_abort()?;
            u64::from_be_bytes(raw)
        }
        None => 0,
    };
    let next = current + 1;
    meta.insert(TRIP_COUNTER, next.to_be_bytes().to_vec())?;
    Ok(next)
}

pub(crate) fn tx_open_logs(index: &TransactionalTree, vehicle_id: &str) -> TxResult<Vec<String>> {
    Ok(tx_get(index, vehicle_id)?.unwrap_or_default())
}

pub(crate) fn tx_set_open_logs(
    index: &TransactionalTree,
    vehicle_id: &str,
    open: &[String],
) -> TxResult<()> {
    if open.is_empty() {
        index.remove(vehicle_id.as_bytes())?;
        Ok(())
    } else {
        tx_put(index, vehicle_id, open)
    }
}

pub(crate) fn open_log_count(index: &Tree, vehicle_id: &str) -> Result<usize> {
    let open: Option<Vec<String>> = get(index, vehicle_id)?;
    Ok(open.map_or(0, |open| open.len()))
}
