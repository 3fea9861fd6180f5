//! Test and helper mocks for cover_core

use std::cell::Cell;
use std::rc::Rc;

use cover_traits::{Activatable, BinaryState};

/// An endstop stuck at one level.
#[derive(Debug, Clone, Copy)]
pub struct FixedEndstop(pub bool);

impl BinaryState for FixedEndstop {
    fn is_active(&mut self) -> bool {
        self.0
    }
}

/// An endstop whose level is set from outside; clones share the level.
#[derive(Debug, Clone, Default)]
pub struct SharedEndstop(Rc<Cell<bool>>);

impl SharedEndstop {
    pub fn new(active: bool) -> Self {
        Self(Rc::new(Cell::new(active)))
    }

    pub fn set(&self, active: bool) {
        self.0.set(active);
    }
}

impl BinaryState for SharedEndstop {
    fn is_active(&mut self) -> bool {
        self.0.get()
    }
}

/// Counts activations; can be told to fail. Clones share both.
#[derive(Debug, Clone, Default)]
pub struct CountingActivator {
    count: Rc<Cell<u32>>,
    fail: Rc<Cell<bool>>,
}

impl CountingActivator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn count(&self) -> u32 {
        self.count.get()
    }

    pub fn set_failing(&self, fail: bool) {
        self.fail.set(fail);
    }
}

impl Activatable for CountingActivator {
    fn activate(&mut self) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        if self.fail.get() {
            return Err(Box::new(std::io::Error::other("activation relay not responding")));
        }
        self.count.set(self.count.get() + 1);
        Ok(())
    }
}
