//! Measurement-order tables (`Index,Permutation,MatterQubits` CSV).

use crate::parser::parse_index_list;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// One row of the measurement-order table.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MeasurementOrder {
    pub index: usize,

    /// Non-input qubit labels in measurement order, after relabelling.
    pub permutation: Vec<usize>,

    /// Previously computed matter-qubit count, when the table carries one.
    pub matter_qubits: Option<i64>,
}

#[derive(Debug, Serialize, Deserialize)]
struct OrderRow {
    #[serde(rename = "Index")]
    index: usize,
    #[serde(rename = "Permutation")]
    permutation: String,
    #[serde(rename = "MatterQubits", default)]
    matter_qubits: Option<i64>,
}

/// Renders labels the way the table stores them, e.g. `[3, 1, 2]`.
pub fn format_index_list(labels: &[usize]) -> String {
    let items: Vec<String> = labels.iter().map(ToString::to_string).collect();
    format!("[{}]", items.join(", "))
}

/// Reads a measurement-order CSV with header
/// `Index,Permutation,MatterQubits` (the last column is optional).
pub fn load_orders<P: AsRef<Path>>(path: P) -> Result<Vec<MeasurementOrder>> {
    let path = path.as_ref();
    let mut reader = csv::Reader::from_path(path)
        .with_context(|| format!("Failed to open measurement orders {}", path.display()))?;

    let mut orders = Vec::new();
    for (row, record) in reader.deserialize::<OrderRow>().enumerate() {
        let record =
            record.with_context(|| format!("Malformed row {row} of {}", path.display()))?;
        let permutation = parse_index_list(&record.permutation)
            .with_context(|| format!("Bad permutation in row {row} of {}", path.display()))?;
        orders.push(MeasurementOrder {
            index: record.index,
            permutation,
            matter_qubits: record.matter_qubits,
        });
    }
    Ok(orders)
}

pub fn write_orders<P: AsRef<Path>>(path: P, orders: &[MeasurementOrder]) -> Result<()> {
    let path = path.as_ref();
    let mut writer = csv::Writer::from_path(path)
        .with_context(|| format!("Failed to create {}", path.display()))?;
    for order in orders {
        writer.serialize(OrderRow {
            index: order.index,
            permutation: format_index_list(&order.permutation),
            matter_qubits: order.matter_qubits,
        })?;
    }
    writer.flush()?;
    Ok(())
}

/// Rows `[idx_min, idx_max)` by position, clamped to the table.
pub fn select_range(orders: &[MeasurementOrder], idx_min: usize, idx_max: usize) -> &[MeasurementOrder] {
    let hi = idx_max.min(orders.len());
    &orders[idx_min.min(hi)..hi]
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn reads_optional_matter_column() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("orders.csv");
        fs::write(
            &path,
            "Index,Permutation,MatterQubits\n0,\"[3, 1, 2]\",2\n1,\"(1, 2, 3)\",\n",
        )
        .unwrap();

        let orders = load_orders(&path).unwrap();
        assert_eq!(orders.len(), 2);
        assert_eq!(orders[0].permutation, vec![3, 1, 2]);
        assert_eq!(orders[0].matter_qubits, Some(2));
        assert_eq!(orders[1].matter_qubits, None);
    }

    #[test]
    fn missing_matter_column_is_fine() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("orders.csv");
        fs::write(&path, "Index,Permutation\n7,\"[2, 1]\"\n").unwrap();
        let orders = load_orders(&path).unwrap();
        assert_eq!(orders[0].index, 7);
        assert_eq!(orders[0].matter_qubits, None);
    }

    #[test]
    fn bad_permutation_names_the_row() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("orders.csv");
        fs::write(&path, "Index,Permutation\n0,\"[1, 2]\"\n1,\"[1, x]\"\n").unwrap();
        let err = format!("{:#}", load_orders(&path).unwrap_err());
        assert!(err.contains("row 1"), "{err}");
    }

    #[test]
    fn written_tables_read_back() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("orders.csv");
        let orders = vec![
            MeasurementOrder {
                index: 0,
                permutation: vec![2, 3, 1],
                matter_qubits: Some(1),
            },
            MeasurementOrder {
                index: 1,
                permutation: vec![1, 2, 3],
                matter_qubits: None,
            },
        ];
        write_orders(&path, &orders).unwrap();
        assert_eq!(load_orders(&path).unwrap(), orders);
    }

    #[test]
    fn ranges_are_clamped() {
        let orders: Vec<MeasurementOrder> = (0..5)
            .map(|index| MeasurementOrder {
                index,
                permutation: vec![1],
                matter_qubits: None,
            })
            .collect();
        assert_eq!(select_range(&orders, 1, 3).len(), 2);
        assert_eq!(select_range(&orders, 4, 100).len(), 1);
        assert!(select_range(&orders, 9, 12).is_empty());
    }
}
