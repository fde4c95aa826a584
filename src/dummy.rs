//! This module implements a dummy engine that accepts problem data but has no support for
//! solving. Models using it can be built, queried and written to LP files.
//!
//! The engine can be scripted to report a given status after an optional delay, or to fail,
//! which makes it useful for exercising the model lifecycle without a real solver.
//!
use std::thread;
use std::time::Duration;

use crate::{Engine, Factory, ModelData, Options, Solution, SolveStatus};

#[derive(Clone, Debug, Default)]
enum Script {
    #[default]
    Unsupported,
    Status(SolveStatus),
    Fail(String),
    Panic,
}

/// Engine that stores the dimensions of the problem it was given, and nothing else.
#[derive(Clone, Debug, Default)]
pub struct DummyEngine {
    script   : Script,
    delay    : Option<Duration>,
    numvar   : usize,
    numcon   : usize,
    solution : Option<Solution>,
}

impl DummyEngine {
    pub fn new() -> DummyEngine { DummyEngine::default() }

    /// Report `status` from every solve. The solution has all values zero.
    pub fn with_status(self, status : SolveStatus) -> DummyEngine {
        DummyEngine{ script : Script::Status(status), ..self }
    }

    /// Report an engine failure from every solve.
    pub fn failing(self, msg : &str) -> DummyEngine {
        DummyEngine{ script : Script::Fail(msg.to_string()), ..self }
    }

    /// Panic inside every solve.
    pub fn panicking(self) -> DummyEngine {
        DummyEngine{ script : Script::Panic, ..self }
    }

    /// Sleep for `delay` before returning from a solve.
    pub fn with_delay(self, delay : Duration) -> DummyEngine {
        DummyEngine{ delay : Some(delay), ..self }
    }
}

impl Engine for DummyEngine {
    fn name(&self) -> &str { "dummy" }

    fn build(& mut self, data : &ModelData) -> Result<(),String> {
        self.numvar = data.num_cols();
        self.numcon = data.num_rows();
        self.solution = None;
        Ok(())
    }

    fn solve(& mut self, options : &Options) -> Result<SolveStatus,String> {
        if let Some(delay) = self.delay {
            // A timeout shorter than the delay behaves like a real time limit.
            if options.timeout > 0 && Duration::from_secs(options.timeout) < delay {
                thread::sleep(Duration::from_secs(options.timeout));
                return Ok(SolveStatus::Timeout);
            }
            thread::sleep(delay);
        }
        match &self.script {
            Script::Unsupported => Err("the dummy engine does not support solving".to_string()),
            Script::Fail(msg) => Err(msg.clone()),
            Script::Panic => panic!("dummy engine panicked"),
            Script::Status(status) => {
                if status.has_solution() {
                    self.solution = Some(Solution{
                        objective : 0.0,
                        columns   : vec![0.0; self.numvar],
                        rows      : vec![0.0; self.numcon] });
                }
                Ok(*status)
            }
        }
    }

    fn solution(&self) -> Option<&Solution> { self.solution.as_ref() }
}

/// Factory for plain dummy engines.
pub fn factory() -> Factory {
    Factory::new("dummy", || Ok(Box::new(DummyEngine::new()) as Box<dyn Engine>))
}

/// Factory for dummy engines that are all configured like `engine`.
pub fn scripted(engine : DummyEngine) -> Factory {
    Factory::new("dummy", move || Ok(Box::new(engine.clone()) as Box<dyn Engine>))
}
