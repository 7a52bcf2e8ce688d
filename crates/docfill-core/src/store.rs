//! Order store collaborator.
//!
//! The core reads orders once per run and proposes one [`OrderUpdate`] per
//! order. A store applies an update completely or not at all.

use std::io::Write;
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;
use tracing::debug;

use crate::error::StoreError;
use crate::models::order::{FieldValue, OrderField, OrderLine, OrderSnapshot, OrderUpdate, is_empty_value};

/// Narrow interface to the order-management system.
pub trait OrderStore {
    /// All orders with their current values and attached documents.
    fn load_orders(&self) -> Result<Vec<OrderSnapshot>, StoreError>;

    /// Apply one order's update as a single all-or-nothing write.
    fn apply(&mut self, order_id: &str, update: &OrderUpdate) -> Result<(), StoreError>;
}

fn invalid(order: &str, field: impl ToString) -> StoreError {
    StoreError::InvalidWrite {
        order: order.to_string(),
        field: field.to_string(),
    }
}

/// Apply an update to a copy of the order; the original is untouched on error.
fn updated(order: &OrderSnapshot, update: &OrderUpdate) -> Result<OrderSnapshot, StoreError> {
    let mut next = order.clone();

    for write in &update.fields {
        let current = next.header.get(write.field);
        if write.canonicalization {
            let is_name = write.field == OrderField::SupplierName
                && matches!(&current, Some(FieldValue::Text(s)) if !s.trim().is_empty());
            if !is_name {
                return Err(invalid(&order.id, write.field));
            }
        } else if !is_empty_value(current.as_ref()) {
            return Err(StoreError::Conflict {
                order: order.id.clone(),
                field: write.field.to_string(),
            });
        }
        if !next.header.set(write.field, write.value.clone()) {
            return Err(invalid(&order.id, write.field));
        }
    }

    for write in &update.lines {
        let line = next
            .lines
            .iter_mut()
            .find(|l| l.id == write.line_id)
            .ok_or_else(|| StoreError::LineNotFound {
                order: order.id.clone(),
                line: write.line_id.clone(),
            })?;
        if !is_empty_value(line.get(write.field).as_ref()) {
            return Err(StoreError::Conflict {
                order: order.id.clone(),
                field: format!("{}.{}", write.line_id, write.field),
            });
        }
        if !line.set(write.field, write.value.clone()) {
            return Err(invalid(&order.id, format!("{}.{}", write.line_id, write.field)));
        }
    }

    if !update.new_lines.is_empty() && !order.lines.is_empty() {
        return Err(StoreError::Conflict {
            order: order.id.clone(),
            field: "lines".to_string(),
        });
    }
    for (index, new_line) in update.new_lines.iter().enumerate() {
        let mut line = OrderLine {
            id: format!("{}-new-{}", order.id, index + 1),
            sku: new_line.sku.clone(),
            item_number: new_line.item_number.clone(),
            units_ordered: Some(new_line.units_ordered),
            ..OrderLine::default()
        };
        for (field, value) in &new_line.values {
            if !line.set(*field, value.clone()) {
                return Err(invalid(&order.id, format!("{}.{}", new_line.sku, field)));
            }
        }
        next.lines.push(line);
    }

    Ok(next)
}

/// Orders held in memory.
#[derive(Debug, Clone, Default)]
pub struct MemoryOrderStore {
    orders: Vec<OrderSnapshot>,
}

impl MemoryOrderStore {
    pub fn new(orders: Vec<OrderSnapshot>) -> Self {
        Self { orders }
    }

    pub fn orders(&self) -> &[OrderSnapshot] {
        &self.orders
    }

    pub fn get(&self, order_id: &str) -> Option<&OrderSnapshot> {
        self.orders.iter().find(|o| o.id == order_id)
    }

    fn position(&self, order_id: &str) -> Result<usize, StoreError> {
        self.orders
            .iter()
            .position(|o| o.id == order_id)
            .ok_or_else(|| StoreError::OrderNotFound(order_id.to_string()))
    }

    /// Apply and return the previous state of the order.
    fn replace(&mut self, order_id: &str, update: &OrderUpdate) -> Result<OrderSnapshot, StoreError> {
        let index = self.position(order_id)?;
        let next = updated(&self.orders[index], update)?;
        Ok(std::mem::replace(&mut self.orders[index], next))
    }
}

impl OrderStore for MemoryOrderStore {
    fn load_orders(&self) -> Result<Vec<OrderSnapshot>, StoreError> {
        Ok(self.orders.clone())
    }

    fn apply(&mut self, order_id: &str, update: &OrderUpdate) -> Result<(), StoreError> {
        self.replace(order_id, update).map(|_| ())
    }
}

/// Orders kept in a JSON file (an array of order snapshots).
///
/// The whole file is rewritten after each successful order update, through
/// a temporary file and a rename.
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    path: PathBuf,
    inner: MemoryOrderStore,
}

impl JsonFileStore {
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let path = path.into();
        let content = std::fs::read_to_string(&path)?;
        let orders: Vec<OrderSnapshot> = serde_json::from_str(&content)?;
        debug!("Loaded {} orders from {}", orders.len(), path.display());
        Ok(Self {
            path,
            inner: MemoryOrderStore::new(orders),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn orders(&self) -> &[OrderSnapshot] {
        self.inner.orders()
    }

    /// The temp file sits next to the target so the rename stays on one
    /// filesystem; it is removed when the rename fails.
    fn persist(&self) -> Result<(), StoreError> {
        let json = serde_json::to_string_pretty(self.inner.orders())?;
        let dir = self
            .path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or(Path::new("."));

        let mut temp = NamedTempFile::new_in(dir)?;
        temp.write_all(json.as_bytes())?;
        temp.persist(&self.path).map_err(|e| e.error)?;
        Ok(())
    }
}

impl OrderStore for JsonFileStore {
    fn load_orders(&self) -> Result<Vec<OrderSnapshot>, StoreError> {
        self.inner.load_orders()
    }

    fn apply(&mut self, order_id: &str, update: &OrderUpdate) -> Result<(), StoreError> {
        let previous = self.inner.replace(order_id, update)?;
        if let Err(e) = self.persist() {
            // Keep memory and disk in agreement.
            let index = self.inner.position(order_id)?;
            self.inner.orders[index] = previous;
            return Err(e);
        }
        Ok(())
    }
}
