//! Background execution of solves.
//!
//! A [Context] represents the caller's execution context. Asynchronous solves started with
//! [Model::solve_async](crate::Model::solve_async) run on the context's worker pool, and their
//! completions are queued back to the context. Completion callbacks are invoked only from
//! [Context::poll], [Context::wait] or [Context::wait_timeout], on the thread that owns the
//! context, so they never run concurrently with that thread's own use of the model.
//!
//! The context is neither `Send` nor `Sync`, and callbacks need not be `Send`.

mod pool;

use std::any::Any;
use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::panic::{self, AssertUnwindSafe};
use std::sync::mpsc;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tracing::{debug, warn};

use crate::model::{self, Shared};
use crate::{Engine, Options, Result, SolveStatus};
use pool::WorkerPool;

type Callback = Box<dyn FnOnce(Result<SolveStatus>)>;

/// Result of running the engine: the engine is handed back unless the solve panicked.
pub(crate) struct Outcome {
    pub engine  : Option<Box<dyn Engine>>,
    pub result  : std::result::Result<SolveStatus,String>,
    pub elapsed : Duration,
}

struct Completion {
    ticket  : u64,
    model   : Arc<Shared>,
    outcome : Outcome,
}

fn panic_message(payload : Box<dyn Any + Send>) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        format!("engine panicked: {}", s)
    }
    else if let Some(s) = payload.downcast_ref::<String>() {
        format!("engine panicked: {}", s)
    }
    else {
        "engine panicked".to_string()
    }
}

/// Run a solve on the current thread. A panic inside the engine is turned into a failure, and
/// the engine is lost.
pub(crate) fn run(mut engine : Box<dyn Engine>, options : &Options) -> Outcome {
    let t0 = Instant::now();
    let res = panic::catch_unwind(AssertUnwindSafe(move || {
        let r = engine.solve(options);
        (engine,r)
    }));
    let elapsed = t0.elapsed();
    match res {
        Ok((engine,result)) => Outcome{ engine : Some(engine), result, elapsed },
        Err(payload) => {
            let msg = panic_message(payload);
            warn!(component = "executor", error = %msg, "solve aborted");
            Outcome{ engine : None, result : Err(msg), elapsed }
        }
    }
}

pub struct Context {
    pool        : WorkerPool,
    tx          : mpsc::Sender<Completion>,
    rx          : mpsc::Receiver<Completion>,
    callbacks   : RefCell<HashMap<u64,Callback>>,
    next_ticket : Cell<u64>,
}

impl Context {
    /// Create a context with `workers` background threads. Zero means one per available CPU.
    pub fn new(workers : usize) -> Result<Context> {
        let workers = if workers > 0 {
            workers
        }
        else {
            std::thread::available_parallelism().map(|n| n.get()).unwrap_or(1)
        };
        let pool = WorkerPool::new(workers)?;
        let (tx,rx) = mpsc::channel();
        Ok(Context{
            pool,
            tx,
            rx,
            callbacks   : RefCell::new(HashMap::new()),
            next_ticket : Cell::new(0) })
    }

    pub fn num_workers(&self) -> usize { self.pool.num_workers() }

    /// Number of solves whose callback has not been invoked yet.
    pub fn pending(&self) -> usize { self.callbacks.borrow().len() }

    pub(crate) fn submit(&self, model : Arc<Shared>, engine : Box<dyn Engine>, options : Options, callback : Callback) {
        let ticket = self.next_ticket.get();
        self.next_ticket.set(ticket+1);
        self.callbacks.borrow_mut().insert(ticket,callback);

        let tx = self.tx.clone();
        self.pool.submit(Box::new(move || {
            let outcome = run(engine,&options);
            // The receiver lives as long as the context, which drains all jobs before it goes.
            _ = tx.send(Completion{ ticket, model, outcome });
        }));
        debug!(component = "executor", ticket, "solve submitted");
    }

    fn deliver(&self, c : Completion) {
        let result = model::finish_solve(&c.model, c.outcome);
        let callback = self.callbacks.borrow_mut().remove(&c.ticket);
        if let Some(callback) = callback {
            callback(result);
        }
    }

    /// Deliver all completions that are ready without blocking. Returns the number of callbacks
    /// invoked.
    pub fn poll(&self) -> usize {
        let mut n = 0;
        while let Ok(c) = self.rx.try_recv() {
            self.deliver(c);
            n += 1;
        }
        n
    }

    /// Block until every pending solve has completed and its callback has been invoked.
    pub fn wait(&self) -> usize {
        let mut n = 0;
        while self.pending() > 0 {
            match self.rx.recv() {
                Ok(c) => { self.deliver(c); n += 1; },
                Err(_) => break
            }
        }
        n
    }

    /// Like [Context::wait], but gives up after `timeout`.
    pub fn wait_timeout(&self, timeout : Duration) -> usize {
        let deadline = Instant::now() + timeout;
        let mut n = 0;
        while self.pending() > 0 {
            let now = Instant::now();
            if now >= deadline { break; }
            match self.rx.recv_timeout(deadline-now) {
                Ok(c) => { self.deliver(c); n += 1; },
                Err(_) => break
            }
        }
        n
    }
}

impl Drop for Context {
    fn drop(& mut self) {
        // Running solves are finished and delivered so no model stays busy forever.
        self.pool.shutdown();
        let n = self.poll();
        if n > 0 {
            debug!(component = "executor", delivered = n, "delivered completions on shutdown");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dummy::{self, DummyEngine};
    use crate::{Model, SolveStatus};
    use std::rc::Rc;

    #[test]
    fn run_catches_panics() {
        let engine = Box::new(DummyEngine::new().panicking());
        let outcome = run(engine, &Options::default());
        assert!(outcome.engine.is_none());
        assert!(outcome.result.unwrap_err().contains("dummy engine panicked"));
    }

    #[test]
    fn callback_runs_on_owner_thread() {
        let ctx = Context::new(2).unwrap();
        let factory = dummy::scripted(DummyEngine::new().with_status(SolveStatus::Optimal));
        let m = Model::create(&factory, 0, 2).unwrap();

        let seen = Rc::new(Cell::new(None));
        let me = std::thread::current().id();
        let s = seen.clone();
        m.solve_async(&ctx, move |r| {
            assert_eq!(std::thread::current().id(), me);
            s.set(Some(r.unwrap()));
        }).unwrap();
        assert_eq!(ctx.pending(), 1);
        assert_eq!(ctx.wait(), 1);
        assert_eq!(seen.get(), Some(SolveStatus::Optimal));
        assert_eq!(ctx.pending(), 0);
    }

    #[test]
    fn drop_delivers_pending() {
        let factory = dummy::scripted(DummyEngine::new().with_status(SolveStatus::Optimal).with_delay(Duration::from_millis(50)));
        let m = Model::create(&factory, 0, 1).unwrap();
        let count = Rc::new(Cell::new(0));
        {
            let ctx = Context::new(1).unwrap();
            let c = count.clone();
            m.solve_async(&ctx, move |_| c.set(c.get()+1)).unwrap();
        }
        assert_eq!(count.get(), 1);
        assert_eq!(m.status().unwrap(), Some(SolveStatus::Optimal));
    }
}
