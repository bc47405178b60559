//! The relational binding table.
//!
//! A [`Table`] is the carrier of partial and complete query results: an
//! ordered list of binding names (columns) and rows mapping names to typed
//! [`Cell`]s. A row may lack a cell for a binding; missing cells sort last
//! and never satisfy a join.
//!
//! The executor materializes one table per pattern clause and folds them
//! with [`Table::inner_join`]; post-processing reshapes the final table
//! with [`Table::filter`], [`Table::group_by`], [`Table::sort`],
//! [`Table::limit`], and [`Table::project`].

use std::collections::{HashMap, HashSet};
use std::fmt;

use tempus_common::utils::error::{Error, Result};

mod aggregate;
mod cell;

pub use aggregate::{AggregateFunction, AggregateSpec};
pub use cell::Cell;

/// A single result row: binding name to cell.
pub type Row = HashMap<String, Cell>;

/// A sort key for [`Table::sort`].
#[derive(Debug, Clone)]
pub struct SortKey {
    /// Binding to order by.
    pub binding: String,
    /// Descending instead of ascending.
    pub descending: bool,
}

impl SortKey {
    /// Ascending sort on a binding.
    #[must_use]
    pub fn asc(binding: impl Into<String>) -> Self {
        Self {
            binding: binding.into(),
            descending: false,
        }
    }

    /// Descending sort on a binding.
    #[must_use]
    pub fn desc(binding: impl Into<String>) -> Self {
        Self {
            binding: binding.into(),
            descending: true,
        }
    }
}

/// A relational table of binding rows.
#[derive(Debug, Clone, Default)]
pub struct Table {
    bindings: Vec<String>,
    names: HashSet<String>,
    rows: Vec<Row>,
}

impl Table {
    /// Creates an empty table with the given binding columns.
    ///
    /// # Errors
    ///
    /// Returns a semantic error if a binding name repeats.
    pub fn new(bindings: Vec<String>) -> Result<Self> {
        let mut names = HashSet::new();
        for binding in &bindings {
            if !names.insert(binding.clone()) {
                return Err(Error::Semantic(format!("duplicate binding {binding:?}")));
            }
        }
        Ok(Self {
            bindings,
            names,
            rows: Vec::new(),
        })
    }

    /// Returns the binding columns, in order.
    #[must_use]
    pub fn bindings(&self) -> &[String] {
        &self.bindings
    }

    /// Returns true if the table has the named binding.
    #[must_use]
    pub fn has_binding(&self, name: &str) -> bool {
        self.names.contains(name)
    }

    /// Returns the rows.
    #[must_use]
    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    /// Returns the number of rows.
    #[must_use]
    pub fn num_rows(&self) -> usize {
        self.rows.len()
    }

    /// Appends a binding column if it is not present yet.
    pub fn add_binding(&mut self, name: &str) {
        if self.names.insert(name.to_string()) {
            self.bindings.push(name.to_string());
        }
    }

    /// Appends a row. Cells for unknown bindings are ignored by every
    /// consumer, so callers are expected to populate known bindings only.
    pub fn add_row(&mut self, row: Row) {
        self.rows.push(row);
    }

    /// Keeps only the rows the predicate accepts.
    pub fn filter(&mut self, mut keep: impl FnMut(&Row) -> bool) {
        self.rows.retain(|row| keep(row));
    }

    /// Stable-sorts the rows by the given keys. Missing cells order after
    /// present ones.
    pub fn sort(&mut self, keys: &[SortKey]) {
        self.rows.sort_by(|a, b| {
            for key in keys {
                let ord = match (a.get(&key.binding), b.get(&key.binding)) {
                    (Some(x), Some(y)) => x.total_cmp(y),
                    (Some(_), None) => std::cmp::Ordering::Less,
                    (None, Some(_)) => std::cmp::Ordering::Greater,
                    (None, None) => std::cmp::Ordering::Equal,
                };
                let ord = if key.descending { ord.reverse() } else { ord };
                if ord != std::cmp::Ordering::Equal {
                    return ord;
                }
            }
            std::cmp::Ordering::Equal
        });
    }

    /// Truncates the table to at most `n` rows.
    pub fn limit(&mut self, n: u64) {
        let n = usize::try_from(n).unwrap_or(usize::MAX);
        self.rows.truncate(n);
    }

    /// Removes duplicate rows, keeping first occurrences.
    pub fn distinct(&mut self) {
        let bindings = self.bindings.clone();
        let mut seen = HashSet::new();
        self.rows.retain(|row| seen.insert(row_key(row, &bindings)));
    }

    /// Projects the table through `(source, output)` pairs: keeps the
    /// sources only, renamed to the outputs, in pair order.
    ///
    /// # Errors
    ///
    /// Returns a semantic error if a source binding is unknown or an
    /// output name repeats.
    pub fn project(&mut self, spec: &[(String, String)]) -> Result<()> {
        for (source, _) in spec {
            if !self.has_binding(source) {
                return Err(Error::Semantic(format!(
                    "projection references unknown binding {source:?}"
                )));
            }
        }
        let mut projected = Table::new(spec.iter().map(|(_, out)| out.clone()).collect())?;
        for row in &self.rows {
            let mut out = Row::new();
            for (source, output) in spec {
                if let Some(cell) = row.get(source) {
                    out.insert(output.clone(), cell.clone());
                }
            }
            projected.add_row(out);
        }
        *self = projected;
        Ok(())
    }

    /// Natural inner join on the binding names shared with `other`. When
    /// no binding is shared the result is the cross product.
    ///
    /// # Errors
    ///
    /// Propagates column bookkeeping failures; joined binding sets are
    /// disjoint-unioned so this does not fail in practice.
    pub fn inner_join(&self, other: &Table) -> Result<Table> {
        let shared: Vec<String> = self
            .bindings
            .iter()
            .filter(|b| other.has_binding(b))
            .cloned()
            .collect();

        let mut bindings = self.bindings.clone();
        bindings.extend(
            other
                .bindings
                .iter()
                .filter(|b| !self.has_binding(b))
                .cloned(),
        );
        let mut joined = Table::new(bindings)?;

        if shared.is_empty() {
            for left in &self.rows {
                for right in &other.rows {
                    let mut row = left.clone();
                    row.extend(right.iter().map(|(k, v)| (k.clone(), v.clone())));
                    joined.add_row(row);
                }
            }
            return Ok(joined);
        }

        // Hash join on the shared bindings. Rows missing any shared cell
        // never match.
        let mut by_key: HashMap<String, Vec<usize>> = HashMap::new();
        for (i, right) in other.rows.iter().enumerate() {
            if let Some(key) = join_key(right, &shared) {
                by_key.entry(key).or_default().push(i);
            }
        }
        for left in &self.rows {
            let Some(key) = join_key(left, &shared) else {
                continue;
            };
            let Some(matches) = by_key.get(&key) else {
                continue;
            };
            for &i in matches {
                let mut row = left.clone();
                row.extend(other.rows[i].iter().map(|(k, v)| (k.clone(), v.clone())));
                joined.add_row(row);
            }
        }
        Ok(joined)
    }
}

fn join_key(row: &Row, bindings: &[String]) -> Option<String> {
    let mut key = String::new();
    for binding in bindings {
        key.push_str(&row.get(binding)?.key());
        key.push('\u{0}');
    }
    Some(key)
}

/// Full-row identity key over the given bindings; missing cells are
/// distinguished from every value.
fn row_key(row: &Row, bindings: &[String]) -> String {
    let mut key = String::new();
    for binding in bindings {
        match row.get(binding) {
            Some(cell) => key.push_str(&cell.key()),
            None => key.push('\u{1}'),
        }
        key.push('\u{0}');
    }
    key
}

impl fmt::Display for Table {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{}", self.bindings.join("\t"))?;
        for row in &self.rows {
            let cells: Vec<String> = self
                .bindings
                .iter()
                .map(|b| row.get(b).map_or_else(|| "<null>".to_string(), Cell::to_string))
                .collect();
            writeln!(f, "{}", cells.join("\t"))?;
        }
        Ok(())
    }
}
