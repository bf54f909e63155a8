//! Assembly of merged values into fixed-width rows.
use std::{collections::VecDeque, mem, sync::Arc};

use crate::{
    Error, Result,
    common::verbose,
    fragment::Fragment,
    merge::merge,
    row::Row,
    value::{Field, Value},
};

/// Accumulates fragment values and cuts them into rows.
///
/// The row width is the number of columns declared by the first fragment's
/// metadata.
#[derive(Debug, Default)]
pub struct RowBuilder {
    fields: Option<Arc<[Field]>>,
    accumulated: Vec<Value>,
    /// Trailing value of the last chunked fragment, waiting for its continuation.
    pending: Option<Value>,
    /// Copy of `pending` taken at a checkpoint, restored by [`RowBuilder::clear_pending`]
    /// so a call resumed from that checkpoint continues the same value.
    pending_for_resume: Option<Value>,
    rows: VecDeque<Row>,
}

impl RowBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the column metadata, once known.
    pub fn fields(&self) -> Option<&[Field]> {
        self.fields.as_deref()
    }

    /// Merge and accumulate fragment values.
    ///
    /// Completed rows are available from [`RowBuilder::pop_row`].
    pub fn add_fragment(&mut self, mut fragment: Fragment) -> Result<()> {
        if self.fields.is_none() {
            if let Some(metadata) = fragment.metadata.take() {
                self.fields = Some(Arc::from(metadata.fields));
            }
        }

        if fragment.values.is_empty() {
            return Ok(());
        }

        let fields = match &self.fields {
            Some(fields) if !fields.is_empty() => fields.clone(),
            Some(_) => return Err(Error::protocol("values received for a result without columns")),
            None => return Err(Error::protocol("values received before metadata")),
        };

        let checkpoint = fragment.is_checkpoint();
        let mut values = fragment.values;

        if let Some(pending) = self.pending.take() {
            let ty = &fields[self.accumulated.len()].ty;
            let mut rest = values.into_iter();
            values = match rest.next() {
                Some(first) => merge(ty, pending, first),
                None => vec![pending],
            };
            values.extend(rest);
        }

        if fragment.chunked_value {
            self.pending = values.pop();
            if checkpoint {
                self.pending_for_resume = self.pending.clone();
            }
        } else if checkpoint {
            self.pending_for_resume = None;
        }

        for value in values {
            self.add_value(&fields, value);
        }

        Ok(())
    }

    fn add_value(&mut self, fields: &Arc<[Field]>, value: Value) {
        self.accumulated.push(value);
        if self.accumulated.len() == fields.len() {
            let values = mem::replace(&mut self.accumulated, Vec::with_capacity(fields.len()));
            verbose!("row complete: {} columns", fields.len());
            self.rows.push_back(Row::new(fields.clone(), values));
        }
    }

    /// Take the next completed row.
    pub fn pop_row(&mut self) -> Option<Row> {
        self.rows.pop_front()
    }

    /// Returns `true` if there is a completed row.
    #[cfg(test)]
    fn has_rows(&self) -> bool {
        !self.rows.is_empty()
    }

    /// Returns `true` if a chunked value is waiting for its continuation.
    #[cfg(test)]
    fn has_pending(&self) -> bool {
        self.pending.is_some()
    }

    /// Drop merge state before a retry.
    ///
    /// The pending value is replaced by the one recorded at the last checkpoint,
    /// which is `None` if that checkpoint did not end inside a chunked value.
    pub fn clear_pending(&mut self) {
        self.pending = self.pending_for_resume.clone();
    }

    /// Drop every incomplete value.
    pub fn discard(&mut self) {
        self.accumulated.clear();
        self.pending = None;
        self.pending_for_resume = None;
    }

    /// Check that the result ended on a row boundary.
    pub fn finish(&mut self) -> Result<()> {
        if self.pending.is_some() {
            self.discard();
            return Err(Error::protocol("result ended inside a chunked value"));
        }

        if !self.accumulated.is_empty() {
            let width = self.fields.as_ref().map_or(0, |f| f.len());
            let reason = format!(
                "result ended with an incomplete row, {} of {width} values",
                self.accumulated.len()
            );
            self.discard();
            return Err(Error::protocol(reason));
        }

        Ok(())
    }
}
