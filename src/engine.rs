//! The seam between a [Model](crate::Model) and the solver that actually solves it.
//!
//! An engine is exclusively owned by one model. It receives a complete snapshot of the problem
//! in [Engine::build] before every solve, so it never observes partially applied mutations.

use std::fmt;
use std::sync::Arc;

use crate::{ModelData, Options, SolveStatus};

/// Solution values produced by the last successful solve.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Solution {
    /// Objective value, including any constant term.
    pub objective : f64,
    /// One value per column.
    pub columns   : Vec<f64>,
    /// Activity of each row.
    pub rows      : Vec<f64>,
}

/// Operations a solver engine provides.
pub trait Engine : Send {
    /// Short identifier used in log output.
    fn name(&self) -> &str;

    /// Load the problem. Replaces anything loaded by a previous call.
    fn build(& mut self, data : &ModelData) -> Result<(),String>;

    /// Solve the loaded problem, honoring the timeout and break-at-first options. Solve outcomes
    /// are returned as status codes; `Err` means the engine itself failed.
    fn solve(& mut self, options : &Options) -> Result<SolveStatus,String>;

    /// The solution of the last solve, if it produced one.
    fn solution(&self) -> Option<&Solution>;
}

type Constructor = dyn Fn() -> Result<Box<dyn Engine>,String> + Send + Sync;

/// Creates engine instances. A factory is passed explicitly to every operation that creates a
/// model, and can be cloned freely.
#[derive(Clone)]
pub struct Factory {
    name : String,
    ctor : Arc<Constructor>,
}

impl Factory {
    pub fn new<F>(name : &str, ctor : F) -> Factory
        where F : Fn() -> Result<Box<dyn Engine>,String> + Send + Sync + 'static
    {
        Factory{ name : name.to_string(), ctor : Arc::new(ctor) }
    }

    pub fn name(&self) -> &str { self.name.as_str() }

    /// Create a new engine instance.
    pub fn create(&self) -> Result<Box<dyn Engine>,String> {
        (self.ctor)()
    }
}

impl fmt::Debug for Factory {
    fn fmt(&self, f : &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Factory").field("name",&self.name).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dummy::DummyEngine;

    #[test]
    fn factory_creates_independent_engines() {
        let f = Factory::new("test", || Ok(Box::new(DummyEngine::new()) as Box<dyn Engine>));
        let g = f.clone();
        let mut e1 = f.create().unwrap();
        let e2 = g.create().unwrap();
        e1.build(&ModelData::new(1,1).unwrap()).unwrap();
        assert_eq!(e1.name(), "dummy");
        assert!(e2.solution().is_none());
        assert_eq!(format!("{:?}",f), "Factory { name: \"test\" }");
    }

    #[test]
    fn failing_factory() {
        let f = Factory::new("broken", || Err("out of licenses".to_string()));
        assert!(f.create().is_err());
    }
}
