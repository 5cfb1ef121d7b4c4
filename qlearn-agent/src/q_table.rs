//! Dense Q-table with a plain-text persistence format
//!
//! The table holds one row per state and one column per action. On disk
//! it is one line per state in ascending order, each line carrying the
//! action values separated by single spaces and printed with six decimal
//! digits. Reading a file written by [`QTable::write_to`] yields the same
//! table bit for bit, as long as the values were already rounded to six
//! decimals.

use std::io::{BufRead, Write};
use std::path::{Path, PathBuf};

use ndarray::{Array2, ArrayView1};
use qlearn_core::{RLError, Result};

/// Decimal digits written per value
pub const VALUE_PRECISION: usize = 6;

/// Q-table mapping (state, action) pairs to expected discounted return
#[derive(Debug, Clone, PartialEq)]
pub struct QTable {
    values: Array2<f64>,
}

impl QTable {
    /// Create a zero-initialized table
    #[must_use]
    pub fn new(num_states: usize, num_actions: usize) -> Self {
        Self {
            values: Array2::zeros((num_states, num_actions)),
        }
    }

    /// Wrap an existing grid; every entry must be finite
    pub fn from_array(values: Array2<f64>) -> Result<Self> {
        if let Some(((state, action), value)) =
            values.indexed_iter().find(|(_, v)| !v.is_finite())
        {
            return Err(RLError::malformed_table(
                state + 1,
                format!("value {value} for action {action} is not finite"),
            ));
        }
        Ok(Self { values })
    }

    /// Number of rows
    #[must_use]
    pub fn num_states(&self) -> usize {
        self.values.nrows()
    }

    /// Number of columns
    #[must_use]
    pub fn num_actions(&self) -> usize {
        self.values.ncols()
    }

    /// Underlying grid
    #[must_use]
    pub fn values(&self) -> &Array2<f64> {
        &self.values
    }

    /// Get Q-value for a state-action pair
    pub fn get(&self, state: usize, action: usize) -> Result<f64> {
        self.check(state, action)?;
        Ok(self.values[[state, action]])
    }

    /// Set Q-value for a state-action pair
    pub fn set(&mut self, state: usize, action: usize, value: f64) -> Result<()> {
        self.check(state, action)?;
        if !value.is_finite() {
            return Err(RLError::NonFiniteValue {
                state,
                action,
                value,
            });
        }
        self.values[[state, action]] = value;
        Ok(())
    }

    /// All action values of one state
    pub fn row(&self, state: usize) -> Result<ArrayView1<'_, f64>> {
        self.check_state(state)?;
        Ok(self.values.row(state))
    }

    /// Maximum Q-value over all actions in a state
    pub fn best_value(&self, state: usize) -> Result<f64> {
        let best = self.best_action(state)?;
        Ok(self.values[[state, best]])
    }

    /// Greedy action; among equal maxima the lowest index wins
    pub fn best_action(&self, state: usize) -> Result<usize> {
        let row = self.row(state)?;
        if row.is_empty() {
            return Err(RLError::InvalidAction { index: 0, len: 0 });
        }
        let mut best = 0;
        for (action, &value) in row.iter().enumerate().skip(1) {
            if value > row[best] {
                best = action;
            }
        }
        Ok(best)
    }

    /// Parse a table of the expected shape
    ///
    /// Blank lines are ignored. Any other deviation from the shape, or a
    /// token that is not a finite number, is reported with its line number.
    pub fn read_from<R: BufRead>(
        source: R,
        num_states: usize,
        num_actions: usize,
    ) -> Result<Self> {
        let mut data = Vec::with_capacity(num_states * num_actions);
        let mut rows = 0;

        for (i, line) in source.lines().enumerate() {
            let line = line?;
            let line_no = i + 1;
            if line.trim().is_empty() {
                continue;
            }
            if rows == num_states {
                return Err(RLError::malformed_table(
                    line_no,
                    format!("more than {num_states} rows"),
                ));
            }

            let start = data.len();
            for token in line.split_whitespace() {
                let value: f64 = token.parse().map_err(|_| {
                    RLError::malformed_table(line_no, format!("{token:?} is not a number"))
                })?;
                if !value.is_finite() {
                    return Err(RLError::malformed_table(
                        line_no,
                        format!("{token:?} is not finite"),
                    ));
                }
                data.push(value);
            }

            let cols = data.len() - start;
            if cols != num_actions {
                return Err(RLError::malformed_table(
                    line_no,
                    format!("expected {num_actions} values, found {cols}"),
                ));
            }
            rows += 1;
        }

        if rows != num_states {
            return Err(RLError::malformed_table(
                0,
                format!("expected {num_states} rows, found {rows}"),
            ));
        }

        let values = Array2::from_shape_vec((num_states, num_actions), data)
            .map_err(|e| RLError::malformed_table(0, e.to_string()))?;
        Self::from_array(values)
    }

    /// Write the table, one line per state
    pub fn write_to<W: Write>(&self, mut sink: W) -> Result<()> {
        for row in self.values.rows() {
            for (i, value) in row.iter().enumerate() {
                if i > 0 {
                    sink.write_all(b" ")?;
                }
                write!(sink, "{value:.prec$}", prec = VALUE_PRECISION)?;
            }
            sink.write_all(b"\n")?;
        }
        sink.flush()?;
        Ok(())
    }

    /// Parse a table from text
    pub fn from_text(text: &str, num_states: usize, num_actions: usize) -> Result<Self> {
        Self::read_from(text.as_bytes(), num_states, num_actions)
    }

    /// Render the table as text
    #[must_use]
    pub fn to_text(&self) -> String {
        let mut buf = Vec::with_capacity(self.values.len() * (VALUE_PRECISION + 4));
        // Writing into a Vec cannot fail.
        let _ = self.write_to(&mut buf);
        String::from_utf8_lossy(&buf).into_owned()
    }

    /// Load a table file
    pub async fn load(path: &Path, num_states: usize, num_actions: usize) -> Result<Self> {
        let text = tokio::fs::read_to_string(path).await?;
        Self::from_text(&text, num_states, num_actions)
    }

    /// Save to a sibling temporary file, then rename it over `path`
    pub async fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }
        let tmp = temp_path(path);
        tokio::fs::write(&tmp, self.to_text()).await?;
        tokio::fs::rename(&tmp, path).await?;
        tracing::debug!(path = %path.display(), "saved q-table");
        Ok(())
    }

    fn check_state(&self, state: usize) -> Result<()> {
        if state >= self.num_states() {
            return Err(RLError::InvalidState(format!(
                "row {state} outside table of {} states",
                self.num_states()
            )));
        }
        Ok(())
    }

    fn check(&self, state: usize, action: usize) -> Result<()> {
        self.check_state(state)?;
        if action >= self.num_actions() {
            return Err(RLError::InvalidAction {
                index: action,
                len: self.num_actions(),
            });
        }
        Ok(())
    }
}

fn temp_path(path: &Path) -> PathBuf {
    let name = path
        .file_name()
        .map_or_else(|| "q_table".into(), |n| n.to_string_lossy().into_owned());
    path.with_file_name(format!(".{name}.tmp"))
}
