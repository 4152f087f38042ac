//! Undo/redo bookkeeping over applied operations.
//!
//! [`History`] owns two stacks of [`EditOp`]: operations that have been
//! applied (`past`) and operations that have been undone (`future`).
//! Performing a new operation clears the future -- except for empty
//! operations, which are discarded without touching either stack, so a
//! rejected edit routed through `or_noop` never costs the user their redo
//! chain.
//!
//! [`Transaction`] batches several operations into one undo step: each
//! `perform` applies immediately, and on commit the batch lands in the
//! history as a single composed operation. Dropping a transaction commits
//! whatever it holds; [`Transaction::roll_back`] instead reverts the
//! applied operations in reverse order and records nothing.

use crate::error::GraphError;
use crate::op::EditOp;
use crate::workbench::Workbench;

/// Chronological record of applied operations with an undo cursor.
#[derive(Debug, Clone, Default)]
pub struct History {
    past: Vec<EditOp>,
    future: Vec<EditOp>,
}

impl History {
    pub fn new() -> Self {
        History::default()
    }

    pub fn can_undo(&self) -> bool {
        !self.past.is_empty()
    }

    pub fn can_redo(&self) -> bool {
        !self.future.is_empty()
    }

    /// Drops both stacks without touching the workbench.
    pub fn clear(&mut self) {
        self.past.clear();
        self.future.clear();
    }

    /// Applies `op` and records it as one undo step. Empty operations are
    /// discarded and leave the redo stack intact.
    pub fn perform(&mut self, bench: &mut Workbench, op: EditOp) -> Result<(), GraphError> {
        if op.is_noop() {
            return Ok(());
        }
        op.apply(bench)?;
        bench.debug_verify();
        self.record(op);
        Ok(())
    }

    /// Reverts the most recent operation. Returns `false` when there is
    /// nothing to undo.
    pub fn undo(&mut self, bench: &mut Workbench) -> Result<bool, GraphError> {
        let op = match self.past.pop() {
            Some(op) => op,
            None => return Ok(false),
        };
        op.revert(bench)?;
        bench.debug_verify();
        self.future.push(op);
        Ok(true)
    }

    /// Re-applies the most recently undone operation. Returns `false` when
    /// there is nothing to redo.
    pub fn redo(&mut self, bench: &mut Workbench) -> Result<bool, GraphError> {
        let op = match self.future.pop() {
            Some(op) => op,
            None => return Ok(false),
        };
        op.apply(bench)?;
        bench.debug_verify();
        self.past.push(op);
        Ok(true)
    }

    /// Opens a transaction that commits into this history.
    pub fn begin(&mut self) -> Transaction<'_> {
        Transaction {
            history: self,
            pending: EditOp::noop(),
        }
    }

    fn record(&mut self, op: EditOp) {
        self.past.push(op);
        self.future.clear();
    }
}

// ---------------------------------------------------------------------------
// Transaction
// ---------------------------------------------------------------------------

/// An open batch of operations that will undo as one step.
pub struct Transaction<'h> {
    history: &'h mut History,
    pending: EditOp,
}

impl Transaction<'_> {
    /// Applies `op` now and adds it to the batch. Like a top-level
    /// `perform`, this is a fresh edit: it invalidates the redo chain
    /// immediately, even if the transaction later rolls back.
    pub fn perform(&mut self, bench: &mut Workbench, op: EditOp) -> Result<(), GraphError> {
        if op.is_noop() {
            return Ok(());
        }
        op.apply(bench)?;
        bench.debug_verify();
        self.history.future.clear();
        self.pending = std::mem::take(&mut self.pending).compose(op);
        Ok(())
    }

    /// Records the batch as a single history entry. Dropping the
    /// transaction has the same effect.
    pub fn commit(self) {}

    /// Reverts every operation in the batch, most recent first, and
    /// records nothing.
    pub fn roll_back(mut self, bench: &mut Workbench) -> Result<(), GraphError> {
        let pending = std::mem::take(&mut self.pending);
        if pending.is_noop() {
            return Ok(());
        }
        pending.revert(bench)?;
        bench.debug_verify();
        Ok(())
    }
}

impl Drop for Transaction<'_> {
    fn drop(&mut self) {
        let pending = std::mem::take(&mut self.pending);
        if !pending.is_noop() {
            self.history.record(pending);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::circuit::PortRef;
    use crate::edit::{self, or_noop};
    use crate::link::Endpoint;
    use crate::vertex::{Direction, Port, Vertex};
    use proptest::prelude::*;

    const SOURCES: [&str; 3] = ["a1", "a2", "a3"];
    const DESTS: [&str; 3] = ["b1", "b2", "b3"];

    /// Three wire drivers and three wire readers, all unconnected.
    fn bench() -> Workbench {
        let mut bench = Workbench::standard();
        let circuit = bench.circuit_mut();
        for id in SOURCES {
            circuit
                .insert_vertex(
                    id.into(),
                    Vertex::new("TRUE").with_port(Port::new("out", "out", Direction::Out, "WIRE")),
                )
                .unwrap();
        }
        for id in DESTS {
            circuit
                .insert_vertex(
                    id.into(),
                    Vertex::new("NOT").with_port(Port::new("in", "in", Direction::In, "WIRE")),
                )
                .unwrap();
        }
        bench
    }

    fn connect_plan(bench: &Workbench, source: &str, dest: &str) -> EditOp {
        edit::connect(
            bench,
            Endpoint::port(source, "out"),
            Endpoint::port(dest, "in"),
        )
        .unwrap()
    }

    #[test]
    fn perform_undo_redo_round_trip() {
        let mut bench = bench();
        let initial = bench.clone();
        let mut history = History::new();

        let plan = connect_plan(&bench, "a1", "b1");
        history.perform(&mut bench, plan).unwrap();
        let after = bench.clone();
        assert!(history.can_undo());
        assert!(!history.can_redo());

        assert!(history.undo(&mut bench).unwrap());
        assert_eq!(bench.circuit(), initial.circuit());
        assert_eq!(bench.links(), initial.links());
        assert!(history.can_redo());

        assert!(history.redo(&mut bench).unwrap());
        assert_eq!(bench.circuit(), after.circuit());
        assert_eq!(bench.links(), after.links());
    }

    #[test]
    fn noop_performs_leave_the_redo_stack_alone() {
        let mut bench = bench();
        let mut history = History::new();

        let plan = connect_plan(&bench, "a1", "b1");
        history.perform(&mut bench, plan).unwrap();
        history.undo(&mut bench).unwrap();
        assert!(history.can_redo());

        history.perform(&mut bench, EditOp::noop()).unwrap();
        assert!(!history.can_undo());
        assert!(history.can_redo());
    }

    #[test]
    fn a_fresh_edit_clears_the_redo_stack() {
        let mut bench = bench();
        let mut history = History::new();

        let plan = connect_plan(&bench, "a1", "b1");
        history.perform(&mut bench, plan).unwrap();
        history.undo(&mut bench).unwrap();

        let plan = connect_plan(&bench, "a2", "b2");
        history.perform(&mut bench, plan).unwrap();
        assert!(!history.can_redo());
        assert!(!history.redo(&mut bench).unwrap());
    }

    #[test]
    fn undo_and_redo_report_exhaustion() {
        let mut bench = bench();
        let mut history = History::new();
        assert!(!history.undo(&mut bench).unwrap());
        assert!(!history.redo(&mut bench).unwrap());
    }

    #[test]
    fn transaction_commits_as_a_single_undo_step() {
        let mut bench = bench();
        let initial = bench.clone();
        let mut history = History::new();

        let mut tx = history.begin();
        let plan = connect_plan(&bench, "a1", "b1");
        tx.perform(&mut bench, plan).unwrap();
        let plan = connect_plan(&bench, "a2", "b2");
        tx.perform(&mut bench, plan).unwrap();
        tx.commit();

        assert_eq!(bench.circuit().edges.len(), 2);
        assert!(history.undo(&mut bench).unwrap());
        assert_eq!(bench.circuit(), initial.circuit());
        assert_eq!(bench.links(), initial.links());
        assert!(!history.can_undo());
    }

    #[test]
    fn transaction_roll_back_restores_the_workbench() {
        let mut bench = bench();
        let initial = bench.clone();
        let mut history = History::new();

        let mut tx = history.begin();
        let plan = connect_plan(&bench, "a1", "b1");
        tx.perform(&mut bench, plan).unwrap();
        let plan = connect_plan(&bench, "a2", "b2");
        tx.perform(&mut bench, plan).unwrap();
        tx.roll_back(&mut bench).unwrap();

        assert_eq!(bench.circuit(), initial.circuit());
        assert_eq!(bench.links(), initial.links());
        assert!(!history.can_undo());
    }

    #[test]
    fn transaction_perform_clears_the_redo_stack() {
        let mut bench = bench();
        let mut history = History::new();

        let plan = connect_plan(&bench, "a1", "b1");
        history.perform(&mut bench, plan).unwrap();
        history.undo(&mut bench).unwrap();
        assert!(history.can_redo());

        let mut tx = history.begin();
        let plan = connect_plan(&bench, "a2", "b2");
        tx.perform(&mut bench, plan).unwrap();
        tx.roll_back(&mut bench).unwrap();

        // The batch was abandoned, but the edit still happened: the old
        // redo chain is gone.
        assert!(!history.can_redo());
        assert!(!history.redo(&mut bench).unwrap());
    }

    #[test]
    fn dropped_transaction_commits_pending_edits() {
        let mut bench = bench();
        let initial = bench.clone();
        let mut history = History::new();

        {
            let mut tx = history.begin();
            let plan = connect_plan(&bench, "a1", "b1");
            tx.perform(&mut bench, plan).unwrap();
        }

        assert!(history.can_undo());
        history.undo(&mut bench).unwrap();
        assert_eq!(bench.circuit(), initial.circuit());
    }

    proptest! {
        /// Any sequence of edits can be fully undone back to the initial
        /// document and fully redone back to the final one.
        #[test]
        fn random_edit_walks_undo_and_redo_cleanly(
            actions in proptest::collection::vec((0u8..5, 0usize..3, 0usize..3), 1..12)
        ) {
            let mut bench = bench();
            let initial = bench.clone();
            let mut history = History::new();

            for (kind, a, b) in actions {
                let plan = match kind {
                    0 => or_noop(edit::connect(
                        &bench,
                        Endpoint::port(SOURCES[a], "out"),
                        Endpoint::port(DESTS[b], "in"),
                    )),
                    1 => or_noop(edit::disconnect(&bench, &PortRef::new(SOURCES[a], "out"))),
                    2 => or_noop(edit::disconnect(&bench, &PortRef::new(DESTS[b], "in"))),
                    3 => match bench.links().links().next().map(|link| link.id) {
                        Some(id) => or_noop(edit::cut(&bench, id)),
                        None => EditOp::noop(),
                    },
                    _ => match bench.circuit().edges.keys().next().cloned() {
                        Some(id) => or_noop(edit::delete_edge(&bench, &id)),
                        None => EditOp::noop(),
                    },
                };
                history.perform(&mut bench, plan).unwrap();
                bench.verify().unwrap();
            }
            let settled = bench.clone();

            while history.undo(&mut bench).unwrap() {}
            prop_assert_eq!(bench.circuit(), initial.circuit());
            prop_assert_eq!(bench.links(), initial.links());

            while history.redo(&mut bench).unwrap() {}
            prop_assert_eq!(bench.circuit(), settled.circuit());
            prop_assert_eq!(bench.links(), settled.links());
        }
    }
}
