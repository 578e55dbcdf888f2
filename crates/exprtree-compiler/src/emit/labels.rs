//! Label bookkeeping for control flow.
//!
//! Labels are defined before they are bound, so forward branches can be emitted
//! with their final target known only at [`LabelTable::resolve`] time.

use super::EmitError;
use crate::sink::Label;

/// Tracks every label of one method body and the position it is bound to.
#[derive(Debug, Default)]
pub struct LabelTable {
    /// Bound instruction index per label (None until marked)
    targets: Vec<Option<usize>>,
}

impl LabelTable {
    /// Create an empty label table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Define a new, unbound label.
    pub fn define(&mut self) -> Label {
        let label = Label(self.targets.len() as u32);
        self.targets.push(None);
        label
    }

    /// Bind `label` to instruction index `offset`.
    pub fn mark(&mut self, label: Label, offset: usize) -> Result<(), EmitError> {
        match self.targets.get_mut(label.0 as usize) {
            None => Err(EmitError::UnknownLabel(label)),
            Some(Some(_)) => Err(EmitError::LabelMarkedTwice(label)),
            Some(slot) => {
                *slot = Some(offset);
                Ok(())
            }
        }
    }

    /// Check that `label` was defined by this table.
    pub fn check(&self, label: Label) -> Result<(), EmitError> {
        if (label.0 as usize) < self.targets.len() {
            Ok(())
        } else {
            Err(EmitError::UnknownLabel(label))
        }
    }

    /// Get the number of defined labels.
    pub fn len(&self) -> usize {
        self.targets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.targets.is_empty()
    }

    /// Final targets, indexed by label number.
    ///
    /// Returns an error naming the first label that was never marked.
    pub fn resolve(self) -> Result<Vec<usize>, EmitError> {
        self.targets
            .into_iter()
            .enumerate()
            .map(|(i, target)| target.ok_or(EmitError::UnmarkedLabel(Label(i as u32))))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_table_is_empty() {
        let table = LabelTable::new();
        assert!(table.is_empty());
        assert_eq!(table.resolve(), Ok(vec![]));
    }

    #[test]
    fn labels_are_numbered_in_definition_order() {
        let mut table = LabelTable::new();
        assert_eq!(table.define(), Label(0));
        assert_eq!(table.define(), Label(1));
        assert_eq!(table.len(), 2);
    }

    #[test]
    fn resolve_returns_targets() {
        let mut table = LabelTable::new();
        let a = table.define();
        let b = table.define();
        table.mark(b, 7).unwrap();
        table.mark(a, 3).unwrap();
        assert_eq!(table.resolve(), Ok(vec![3, 7]));
    }

    #[test]
    fn marking_twice_is_an_error() {
        let mut table = LabelTable::new();
        let a = table.define();
        table.mark(a, 1).unwrap();
        assert_eq!(table.mark(a, 2), Err(EmitError::LabelMarkedTwice(a)));
    }

    #[test]
    fn unknown_and_unmarked_labels() {
        let mut table = LabelTable::new();
        assert_eq!(table.mark(Label(5), 0), Err(EmitError::UnknownLabel(Label(5))));
        assert!(table.check(Label(0)).is_err());

        let a = table.define();
        assert!(table.check(a).is_ok());
        assert_eq!(table.resolve(), Err(EmitError::UnmarkedLabel(a)));
    }
}
