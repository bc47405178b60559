//! Grouping and aggregation for the binding table.

use std::collections::{HashMap, HashSet};

use tempus_common::types::Literal;
use tempus_common::utils::error::{Error, Result};

use super::{row_key, Cell, Row, Table};

/// An aggregate function over one binding.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AggregateFunction {
    /// Counts non-missing occurrences; with `distinct`, unique values.
    Count {
        /// Count unique values instead of occurrences.
        distinct: bool,
    },
    /// Sums numeric literal values. Fails on non-numeric cells.
    Sum,
}

/// One aggregation: `function(input)` exposed as `output`.
#[derive(Debug, Clone)]
pub struct AggregateSpec {
    /// Binding the aggregate reads.
    pub input: String,
    /// Binding the aggregate result is exposed as.
    pub output: String,
    /// The aggregate function.
    pub function: AggregateFunction,
}

/// Per-group accumulator state.
struct Group {
    key_cells: Row,
    passthrough: Row,
    rows: Vec<Row>,
}

impl Table {
    /// Groups the table by `keys` and collapses each group through the
    /// aggregate specs. With no keys the whole table is one implicit
    /// group (and an empty table stays empty).
    ///
    /// Output columns are the keys, then the non-grouped non-aggregated
    /// bindings (which must be constant within each group), then the
    /// aggregate outputs.
    ///
    /// # Errors
    ///
    /// Returns a semantic error if a key or aggregate input is unknown,
    /// a non-grouped, non-aggregated binding varies within a group, or
    /// `Sum` meets a non-numeric cell.
    pub fn group_by(&mut self, keys: &[String], aggregates: &[AggregateSpec]) -> Result<()> {
        for key in keys {
            if !self.has_binding(key) {
                return Err(Error::Semantic(format!("group by unknown binding {key:?}")));
            }
        }
        for spec in aggregates {
            if !self.has_binding(&spec.input) {
                return Err(Error::Semantic(format!(
                    "aggregate over unknown binding {:?}",
                    spec.input
                )));
            }
        }

        let aggregated: HashSet<&String> = aggregates.iter().map(|s| &s.input).collect();
        let passthrough: Vec<String> = self
            .bindings
            .iter()
            .filter(|b| !keys.contains(b) && !aggregated.contains(*b))
            .cloned()
            .collect();

        // Bucket rows by group key, preserving first-appearance order.
        let mut order: Vec<String> = Vec::new();
        let mut groups: HashMap<String, Group> = HashMap::new();
        for row in &self.rows {
            let gk = row_key(row, keys);
            let group = groups.entry(gk.clone()).or_insert_with(|| {
                order.push(gk);
                Group {
                    key_cells: keys
                        .iter()
                        .filter_map(|k| row.get(k).map(|c| (k.clone(), c.clone())))
                        .collect(),
                    passthrough: passthrough
                        .iter()
                        .filter_map(|k| row.get(k).map(|c| (k.clone(), c.clone())))
                        .collect(),
                    rows: Vec::new(),
                }
            });
            for binding in &passthrough {
                let seen = group.passthrough.get(binding);
                if seen.map(Cell::key) != row.get(binding).map(Cell::key) {
                    return Err(Error::Semantic(format!(
                        "binding {binding:?} is neither grouped nor aggregated and varies within a group"
                    )));
                }
            }
            group.rows.push(row.clone());
        }

        let mut bindings: Vec<String> = keys.to_vec();
        bindings.extend(passthrough.iter().cloned());
        bindings.extend(aggregates.iter().map(|s| s.output.clone()));
        let mut reduced = Table::new(bindings)?;

        for gk in order {
            let group = &groups[&gk];
            let mut row = group.key_cells.clone();
            row.extend(
                group
                    .passthrough
                    .iter()
                    .map(|(k, v)| (k.clone(), v.clone())),
            );
            for spec in aggregates {
                row.insert(spec.output.clone(), apply(spec, &group.rows)?);
            }
            reduced.add_row(row);
        }

        *self = reduced;
        Ok(())
    }
}

fn apply(spec: &AggregateSpec, rows: &[Row]) -> Result<Cell> {
    let cells = rows.iter().filter_map(|r| r.get(&spec.input));
    match spec.function {
        AggregateFunction::Count { distinct: false } => {
            Ok(Cell::Literal(Literal::Int64(cells.count() as i64)))
        }
        AggregateFunction::Count { distinct: true } => {
            let unique: HashSet<String> = cells.map(Cell::key).collect();
            Ok(Cell::Literal(Literal::Int64(unique.len() as i64)))
        }
        AggregateFunction::Sum => {
            let mut int_sum = 0i64;
            let mut float_sum = 0f64;
            let mut any_float = false;
            for cell in cells {
                match cell {
                    Cell::Literal(Literal::Int64(v)) => int_sum += v,
                    Cell::Literal(Literal::Float64(v)) => {
                        any_float = true;
                        float_sum += v;
                    }
                    other => {
                        return Err(Error::Semantic(format!(
                            "sum over non-numeric value {other} for binding {:?}",
                            spec.input
                        )))
                    }
                }
            }
            if any_float {
                #[allow(clippy::cast_precision_loss)]
                Ok(Cell::Literal(Literal::Float64(float_sum + int_sum as f64)))
            } else {
                Ok(Cell::Literal(Literal::Int64(int_sum)))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(pairs: &[(&str, Cell)]) -> Row {
        pairs.iter().map(|(k, v)| ((*k).to_string(), v.clone())).collect()
    }

    fn text(v: &str) -> Cell {
        Cell::Text(v.to_string())
    }

    fn int(v: i64) -> Cell {
        Cell::Literal(Literal::Int64(v))
    }

    fn sample() -> Table {
        let mut t = Table::new(vec![
            "?gp".to_string(),
            "?name".to_string(),
            "?spend".to_string(),
        ])
        .unwrap();
        t.add_row(row(&[("?gp", text("joe")), ("?name", text("john")), ("?spend", int(10))]));
        t.add_row(row(&[("?gp", text("joe")), ("?name", text("eve")), ("?spend", int(5))]));
        t.add_row(row(&[("?gp", text("joe")), ("?name", text("eve")), ("?spend", int(1))]));
        t
    }

    #[test]
    fn test_count_and_count_distinct() {
        let mut t = sample();
        t.project(&[
            ("?gp".to_string(), "?gp".to_string()),
            ("?name".to_string(), "?name".to_string()),
        ])
        .unwrap();
        let mut distinct = t.clone();

        t.group_by(
            &["?gp".to_string()],
            &[AggregateSpec {
                input: "?name".to_string(),
                output: "?n".to_string(),
                function: AggregateFunction::Count { distinct: false },
            }],
        )
        .unwrap();
        assert_eq!(t.num_rows(), 1);
        assert_eq!(t.rows()[0]["?n"], int(3));

        distinct
            .group_by(
                &["?gp".to_string()],
                &[AggregateSpec {
                    input: "?name".to_string(),
                    output: "?n".to_string(),
                    function: AggregateFunction::Count { distinct: true },
                }],
            )
            .unwrap();
        assert_eq!(distinct.rows()[0]["?n"], int(2));
    }

    #[test]
    fn test_sum() {
        let mut t = sample();
        t.project(&[
            ("?gp".to_string(), "?gp".to_string()),
            ("?spend".to_string(), "?spend".to_string()),
        ])
        .unwrap();
        t.group_by(
            &["?gp".to_string()],
            &[AggregateSpec {
                input: "?spend".to_string(),
                output: "?total".to_string(),
                function: AggregateFunction::Sum,
            }],
        )
        .unwrap();
        assert_eq!(t.rows()[0]["?total"], int(16));
    }

    #[test]
    fn test_sum_rejects_non_numeric() {
        let mut t = sample();
        let err = t.group_by(
            &["?spend".to_string()],
            &[AggregateSpec {
                input: "?name".to_string(),
                output: "?bad".to_string(),
                function: AggregateFunction::Sum,
            }],
        );
        assert!(matches!(err, Err(Error::Semantic(_))));
    }

    #[test]
    fn test_varying_ungrouped_binding_fails() {
        let mut t = sample();
        let err = t.group_by(
            &["?gp".to_string()],
            &[AggregateSpec {
                input: "?name".to_string(),
                output: "?n".to_string(),
                function: AggregateFunction::Count { distinct: false },
            }],
        );
        // ?spend varies inside the single ?gp group.
        assert!(matches!(err, Err(Error::Semantic(_))));
    }

    #[test]
    fn test_implicit_single_group() {
        let mut t = sample();
        t.project(&[("?spend".to_string(), "?spend".to_string())])
            .unwrap();
        t.group_by(
            &[],
            &[AggregateSpec {
                input: "?spend".to_string(),
                output: "?total".to_string(),
                function: AggregateFunction::Sum,
            }],
        )
        .unwrap();
        assert_eq!(t.num_rows(), 1);
        assert_eq!(t.rows()[0]["?total"], int(16));
    }
}
