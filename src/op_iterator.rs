use std::sync::Arc;

use crate::error::DbResult;
use crate::tuple::Tuple;
use crate::tuple_desc::TupleDesc;

/// One-element lookahead shared by every concrete operator, so that
/// `has_next`/`next` are consistent regardless of how `fetch_next` is
/// implemented.
#[derive(Default)]
pub struct IterState {
    lookahead: Option<Tuple>,
    opened: bool,
}

/// The pull-iterator contract every operator implements: `open`/`has_next`/
/// `next`/`rewind`/`close`, tuple-desc propagation, and child-array wiring.
/// Concrete operators implement `fetch_next`/`do_open`/`do_rewind`/
/// `do_close` and get the lookahead bookkeeping for free.
pub trait OpIterator {
    fn state(&self) -> &IterState;
    fn state_mut(&mut self) -> &mut IterState;

    /// Opens children and resets any operator-specific internal state.
    fn do_open(&mut self) -> DbResult<()>;
    /// Produces the next tuple, or `None` at end of stream.
    fn fetch_next(&mut self) -> DbResult<Option<Tuple>>;
    /// Restarts iteration from the beginning; default re-opens.
    fn do_rewind(&mut self) -> DbResult<()> {
        self.do_open()
    }
    /// Closes children; must be idempotent.
    fn do_close(&mut self);

    fn tuple_desc(&self) -> Arc<TupleDesc>;

    /// The operator's children, in plan order. Leaves (e.g. `SeqScan`)
    /// return an empty vector.
    fn children(&self) -> Vec<&dyn OpIterator>;
    /// Rewrites the operator's children in place, e.g. after a plan
    /// optimizer substitutes a different child subtree. The number of
    /// children passed must match what `children()` reports; operators
    /// that take a fixed arity panic on a mismatch, mirroring a
    /// construction-time contract violation rather than a runtime one.
    fn set_children(&mut self, children: Vec<Box<dyn OpIterator>>);

    fn open(&mut self) -> DbResult<()> {
        self.do_open()?;
        self.state_mut().opened = true;
        self.state_mut().lookahead = None;
        Ok(())
    }

    fn has_next(&mut self) -> DbResult<bool> {
        assert!(self.state().opened, "has_next called before open");
        if self.state().lookahead.is_some() {
            return Ok(true);
        }
        let next = self.fetch_next()?;
        let found = next.is_some();
        self.state_mut().lookahead = next;
        Ok(found)
    }

    fn next(&mut self) -> DbResult<Option<Tuple>> {
        assert!(self.state().opened, "next called before open");
        if let Some(t) = self.state_mut().lookahead.take() {
            return Ok(Some(t));
        }
        self.fetch_next()
    }

    fn rewind(&mut self) -> DbResult<()> {
        self.do_rewind()?;
        self.state_mut().lookahead = None;
        Ok(())
    }

    fn close(&mut self) {
        self.do_close();
        self.state_mut().opened = false;
        self.state_mut().lookahead = None;
    }
}
