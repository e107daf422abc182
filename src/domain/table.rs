//! Column-oriented table with columns discovered at runtime.
//!
//! Watch-lists carry whatever columns their export happened to include, so
//! column presence is checked per call and typed access parses on demand.

use crate::domain::dates::{is_absent, parse_lenient};
use chrono::NaiveDate;
use indexmap::IndexMap;
use std::cmp::Ordering;
use std::fmt;

#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    Missing,
    Text(String),
    Number(f64),
    Date(NaiveDate),
}

impl Cell {
    /// Raw watch-list text; placeholders become `Missing`.
    pub fn from_raw(raw: &str) -> Cell {
        if is_absent(raw) {
            Cell::Missing
        } else {
            Cell::Text(raw.trim().to_string())
        }
    }

    pub fn is_missing(&self) -> bool {
        match self {
            Cell::Missing => true,
            Cell::Number(v) => v.is_nan(),
            _ => false,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Cell::Number(v) if !v.is_nan() => Some(*v),
            Cell::Text(s) => s.trim_end_matches('%').replace(',', "").parse().ok(),
            _ => None,
        }
    }

    pub fn as_date(&self) -> Option<NaiveDate> {
        match self {
            Cell::Date(d) => Some(*d),
            Cell::Text(s) => parse_lenient(s),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<String> {
        match self {
            Cell::Missing => None,
            other => Some(other.to_string()),
        }
    }
}

impl fmt::Display for Cell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Cell::Missing => Ok(()),
            Cell::Text(s) => write!(f, "{s}"),
            Cell::Number(v) if v.is_nan() => Ok(()),
            Cell::Number(v) => write!(f, "{v}"),
            Cell::Date(d) => write!(f, "{}", d.format("%Y-%m-%d")),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Table {
    columns: IndexMap<String, Vec<Cell>>,
    rows: usize,
}

impl Table {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a table from a header row and raw text records. Short records
    /// are padded with `Missing`.
    pub fn from_records(headers: &[String], records: &[Vec<String>]) -> Self {
        let mut columns: IndexMap<String, Vec<Cell>> = IndexMap::new();
        for (c, name) in headers.iter().enumerate() {
            let cells = records
                .iter()
                .map(|r| r.get(c).map_or(Cell::Missing, |raw| Cell::from_raw(raw)))
                .collect();
            columns.insert(name.trim().to_string(), cells);
        }
        Table {
            columns,
            rows: records.len(),
        }
    }

    pub fn len(&self) -> usize {
        self.rows
    }

    pub fn is_empty(&self) -> bool {
        self.rows == 0
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.columns.contains_key(name)
    }

    pub fn column_names(&self) -> impl Iterator<Item = &str> {
        self.columns.keys().map(String::as_str)
    }

    pub fn column(&self, name: &str) -> Option<&[Cell]> {
        self.columns.get(name).map(Vec::as_slice)
    }

    pub fn get(&self, row: usize, name: &str) -> Option<&Cell> {
        self.columns.get(name)?.get(row)
    }

    pub fn number(&self, row: usize, name: &str) -> Option<f64> {
        self.get(row, name)?.as_f64()
    }

    pub fn text(&self, row: usize, name: &str) -> Option<String> {
        self.get(row, name)?.as_text()
    }

    pub fn date(&self, row: usize, name: &str) -> Option<NaiveDate> {
        self.get(row, name)?.as_date()
    }

    /// Sets one cell, appending the column (filled with `Missing`) if absent.
    pub fn set(&mut self, row: usize, name: &str, value: Cell) {
        let rows = self.rows;
        let column = self
            .columns
            .entry(name.to_string())
            .or_insert_with(|| vec![Cell::Missing; rows]);
        if let Some(cell) = column.get_mut(row) {
            *cell = value;
        }
    }

    /// Replaces a whole column; `values` must hold one cell per row.
    pub fn set_column(&mut self, name: &str, values: Vec<Cell>) {
        debug_assert_eq!(values.len(), self.rows);
        self.columns.insert(name.to_string(), values);
    }

    pub fn rename_column(&mut self, from: &str, to: &str) {
        if let Some(index) = self.columns.get_index_of(from) {
            if let Some((_, cells)) = self.columns.shift_remove_index(index) {
                self.columns.shift_insert(index, to.to_string(), cells);
            }
        }
    }

    /// Moves a column to the front.
    pub fn move_to_front(&mut self, name: &str) {
        if let Some(index) = self.columns.get_index_of(name) {
            self.columns.move_index(index, 0);
        }
    }

    /// Keeps the rows for which `keep` returns true, preserving order.
    pub fn retain<F>(&mut self, mut keep: F)
    where
        F: FnMut(usize) -> bool,
    {
        let kept: Vec<usize> = (0..self.rows).filter(|&r| keep(r)).collect();
        self.select(&kept);
    }

    /// Rebuilds the table from the given row indices, in that order.
    pub fn select(&mut self, rows: &[usize]) {
        for cells in self.columns.values_mut() {
            *cells = rows.iter().map(|&r| cells[r].clone()).collect();
        }
        self.rows = rows.len();
    }

    /// Stable sort of rows by a comparator over row indices.
    pub fn sort_rows_by<F>(&mut self, mut compare: F)
    where
        F: FnMut(usize, usize) -> Ordering,
    {
        let mut order: Vec<usize> = (0..self.rows).collect();
        order.sort_by(|&a, &b| compare(a, b));
        self.select(&order);
    }

    /// Row `row` as display strings in column order.
    pub fn row_strings(&self, row: usize) -> Vec<String> {
        self.columns
            .values()
            .map(|cells| cells.get(row).map(Cell::to_string).unwrap_or_default())
            .collect()
    }
}
