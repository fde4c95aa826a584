//! The model handle.
//!
//! A [Model] exclusively owns one engine instance and the problem data. All operations validate
//! their arguments before touching the data: wrong shapes give [ModelError::Shape], operations on
//! a disposed model give [ModelError::UseAfterDispose], and any mutation while a solve is in
//! progress gives [ModelError::ModelBusy]. Operations the engine rejects return `false`.
//!
//! The handle is `Send` and `Sync`; the state is kept behind a mutex that is never held while the
//! engine is solving.

mod data;

use std::fs::File;
use std::io::{Read, Write};
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tracing::{debug, info, warn};

pub use data::{Element, ModelData, VariableKind};

use crate::executor::{self, Context, Outcome};
use crate::marshal::{self, Frame, Row, WorkStack};
use crate::{ConstraintType, Engine, Factory, ModelError, Options, Result, Solution, SolveStatus, Verbosity};
use crate::lpformat;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Lifecycle {
    Active,
    Disposed,
}

/// Solve state of a model.
#[derive(Clone, Debug, PartialEq)]
pub enum SolveState {
    Idle,
    Running,
    Completed(SolveStatus),
    Failed(String),
}

pub(crate) struct Inner {
    lifecycle : Lifecycle,
    solve     : SolveState,
    factory   : Factory,
    engine    : Option<Box<dyn Engine>>,
    data      : ModelData,
    options   : Options,
    ws        : WorkStack,
    solution  : Option<Solution>,
}

pub(crate) struct Shared {
    inner : Mutex<Inner>,
}

impl Shared {
    fn lock(&self) -> MutexGuard<'_,Inner> {
        // The state is consistent at every unlock, so a poisoned lock is still usable.
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Handle to one linear or mixed integer problem and its engine.
pub struct Model {
    shared : Arc<Shared>,
}

fn check_col(data : &ModelData, j : usize) -> Result<usize> {
    if j == 0 || j > data.num_cols() {
        Err(ModelError::Shape(format!("column index {} out of range [1,{}]",j,data.num_cols())))
    }
    else {
        Ok(j)
    }
}

fn check_row(data : &ModelData, i : usize) -> Result<usize> {
    if i == 0 || i > data.num_rows() {
        Err(ModelError::Shape(format!("row index {} out of range [1,{}]",i,data.num_rows())))
    }
    else {
        Ok(i)
    }
}

/// Row argument forms accepted when appending constraints or setting the objective.
enum RowArg<'a> {
    Dense(&'a [f64]),
    Sparse(usize,&'a [f64],&'a [usize]),
    Text(&'a str),
}

fn marshal_row<'a>(frame : &'a mut Frame<'_>, arg : RowArg<'_>, dim : usize) -> Result<Row<'a>> {
    match arg {
        RowArg::Dense(values) => marshal::dense(frame,values,dim),
        RowArg::Sparse(count,values,indices) => marshal::sparse(frame,count,values,indices,dim),
        RowArg::Text(text) => marshal::text(frame,text,dim),
    }
}

impl Model {
    fn new(factory : &Factory, engine : Box<dyn Engine>, data : ModelData, options : Options) -> Model {
        Model{
            shared : Arc::new(Shared{
                inner : Mutex::new(Inner{
                    lifecycle : Lifecycle::Active,
                    solve     : SolveState::Idle,
                    factory   : factory.clone(),
                    engine    : Some(engine),
                    data,
                    options,
                    ws        : WorkStack::new(64),
                    solution  : None })})}
    }

    /// Create a model with `rows` empty constraints and `cols` continuous columns.
    ///
    /// # Arguments
    /// - `factory` Creates the engine owned by the model.
    /// - `rows`, `cols` Initial dimensions.
    ///
    /// # Returns
    /// The model, or [ModelError::Allocation] if the engine cannot be created or the dimensions
    /// cannot be allocated.
    pub fn create(factory : &Factory, rows : usize, cols : usize) -> Result<Model> {
        let data = ModelData::new(rows,cols).map_err(ModelError::Allocation)?;
        let engine = factory.create().map_err(ModelError::Allocation)?;
        debug!(component = "model", operation = "create", engine = factory.name(), rows, cols, "model created");
        Ok(Model::new(factory,engine,data,Options::default()))
    }

    /// Load a model from an LP format file.
    ///
    /// If the file cannot be opened the call fails with [ModelError::Io] before anything else is
    /// allocated; a malformed file gives [ModelError::Parse].
    pub fn load<P : AsRef<Path>>(factory : &Factory, path : P, verbosity : Verbosity, name : &str) -> Result<Model> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|e| {
            warn!(component = "model", operation = "load", path = %path.display(), error = %e, "cannot open LP file");
            ModelError::Io(e)
        })?;
        Model::read(factory,file,verbosity,name)
    }

    /// Read a model in LP format from `source`.
    pub fn read<R : Read>(factory : &Factory, mut source : R, verbosity : Verbosity, name : &str) -> Result<Model> {
        let mut bytes = Vec::new();
        source.read_to_end(&mut bytes)?;
        let text = String::from_utf8(bytes).map_err(|e| {
            let valid = &e.as_bytes()[..e.utf8_error().valid_up_to()];
            let line = 1 + valid.iter().filter(|&&b| b == b'\n').count();
            ModelError::parse(line,"invalid UTF-8")
        })?;
        let mut data = lpformat::parse(&text)?;
        data.set_name(name);
        let engine = factory.create().map_err(ModelError::Allocation)?;
        debug!(component = "model", operation = "load", engine = factory.name(), rows = data.num_rows(), cols = data.num_cols(), "model loaded");
        Ok(Model::new(factory,engine,data,Options{ verbosity, ..Options::default() }))
    }

    ////////////////////////////////////////////////////////////
    // Access

    fn active(&self) -> Result<MutexGuard<'_,Inner>> {
        let g = self.shared.lock();
        if g.lifecycle == Lifecycle::Disposed {
            Err(ModelError::UseAfterDispose)
        }
        else {
            Ok(g)
        }
    }

    /// Lock for an option change.
    fn mutable(&self) -> Result<MutexGuard<'_,Inner>> {
        let g = self.active()?;
        if g.solve == SolveState::Running {
            Err(ModelError::ModelBusy)
        }
        else {
            Ok(g)
        }
    }

    /// Apply a change of the problem data. The last solution is dropped only when `f` accepts
    /// the change; validation errors and rejections leave the model as it was.
    fn structural<F>(&self, f : F) -> Result<bool>
        where F : FnOnce(& mut Inner) -> Result<bool>
    {
        let mut g = self.mutable()?;
        let ok = f(&mut *g)?;
        if ok {
            g.solution = None;
        }
        Ok(ok)
    }

    ////////////////////////////////////////////////////////////
    // Lifecycle

    /// Release the engine. A second call is a no-op; any other operation on a disposed model
    /// fails with [ModelError::UseAfterDispose].
    ///
    /// # Returns
    /// [ModelError::ModelBusy] if a solve is in progress.
    pub fn dispose(&self) -> Result<()> {
        let mut g = self.shared.lock();
        if g.lifecycle == Lifecycle::Disposed {
            return Ok(());
        }
        if g.solve == SolveState::Running {
            return Err(ModelError::ModelBusy);
        }
        // Marked first, so nothing can observe a released engine in an active model.
        g.lifecycle = Lifecycle::Disposed;
        let engine = g.engine.take();
        g.solution = None;
        g.data = ModelData::default();
        g.ws = WorkStack::default();
        drop(engine);
        debug!(component = "model", operation = "dispose", "model disposed");
        Ok(())
    }

    pub fn is_disposed(&self) -> bool {
        self.shared.lock().lifecycle == Lifecycle::Disposed
    }

    ////////////////////////////////////////////////////////////
    // Dimensions

    pub fn rows(&self) -> Result<usize> { Ok(self.active()?.data.num_rows()) }
    pub fn columns(&self) -> Result<usize> { Ok(self.active()?.data.num_cols()) }

    /// Set the exact number of rows and columns. Shrinking drops everything outside the new
    /// dimensions. Returns false if the engine cannot allocate the new size.
    pub fn resize(&self, rows : usize, cols : usize) -> Result<bool> {
        let ok = self.structural(|g| Ok(g.data.resize(rows,cols)))?;
        if ok {
            debug!(component = "model", operation = "resize", rows, cols, "model resized");
        }
        else {
            warn!(component = "model", operation = "resize", rows, cols, "resize rejected");
        }
        Ok(ok)
    }

    ////////////////////////////////////////////////////////////
    // Name and options

    pub fn name(&self) -> Result<String> { Ok(self.active()?.data.name().to_string()) }
    pub fn set_name(&self, name : &str) -> Result<()> {
        self.mutable()?.data.set_name(name);
        Ok(())
    }

    pub fn options(&self) -> Result<Options> { Ok(self.active()?.options.clone()) }

    pub fn add_row_mode(&self) -> Result<bool> { Ok(self.active()?.options.add_row_mode) }

    /// Switch row mode. Rows appended in row mode are normalized when it is switched off.
    ///
    /// # Returns
    /// True if the mode changed.
    pub fn set_add_row_mode(&self, on : bool) -> Result<bool> {
        let mut g = self.mutable()?;
        if g.options.add_row_mode == on {
            return Ok(false);
        }
        g.options.add_row_mode = on;
        if !on {
            g.data.normalize();
        }
        Ok(true)
    }

    pub fn break_at_first(&self) -> Result<bool> { Ok(self.active()?.options.break_at_first) }
    pub fn set_break_at_first(&self, on : bool) -> Result<()> {
        self.mutable()?.options.break_at_first = on;
        Ok(())
    }

    pub fn verbose(&self) -> Result<Verbosity> { Ok(self.active()?.options.verbosity) }
    pub fn set_verbose(&self, verbosity : Verbosity) -> Result<()> {
        self.mutable()?.options.verbosity = verbosity;
        Ok(())
    }

    /// Solve timeout in seconds, 0 means no limit.
    pub fn timeout(&self) -> Result<u64> { Ok(self.active()?.options.timeout) }
    pub fn set_timeout(&self, seconds : u64) -> Result<()> {
        self.mutable()?.options.timeout = seconds;
        Ok(())
    }

    ////////////////////////////////////////////////////////////
    // Objective

    pub fn maxim(&self) -> Result<bool> { Ok(self.active()?.data.sense_max()) }
    pub fn set_maxim(&self, max : bool) -> Result<()> {
        self.structural(|g| { g.data.set_sense_max(max); Ok(true) })?;
        Ok(())
    }

    fn set_obj_row(&self, arg : RowArg<'_>) -> Result<bool> {
        self.structural(|g| {
            let Inner{ ws, data, .. } = g;
            let mut frame = ws.frame();
            let row = marshal_row(&mut frame,arg,data.num_cols())?;
            data.set_obj_fn(row.subj,row.cof);
            Ok(true)
        })
    }

    /// Set all objective coefficients from a dense sequence; element `i` belongs to column `i+1`
    /// and columns beyond the sequence get zero.
    pub fn set_obj_fn(&self, values : &[f64]) -> Result<bool> {
        self.set_obj_row(RowArg::Dense(values))
    }

    /// Set all objective coefficients from the first `count` entries of `values` and `indices`.
    /// Columns not mentioned get zero.
    pub fn set_obj_fn_ex(&self, count : usize, values : &[f64], indices : &[usize]) -> Result<bool> {
        self.set_obj_row(RowArg::Sparse(count,values,indices))
    }

    /// Set all objective coefficients from a whitespace separated list of numbers.
    pub fn set_obj_fn_str(&self, text : &str) -> Result<bool> {
        self.set_obj_row(RowArg::Text(text))
    }

    pub fn obj_fn(&self) -> Result<Vec<f64>> { Ok(self.active()?.data.obj_fn().to_vec()) }

    pub fn obj(&self, col : usize) -> Result<f64> {
        let g = self.active()?;
        Ok(g.data.obj(check_col(&g.data,col)?))
    }

    pub fn set_obj(&self, col : usize, value : f64) -> Result<bool> {
        self.structural(|g| {
            check_col(&g.data,col)?;
            g.data.set_obj(col,value);
            Ok(true)
        })
    }

    ////////////////////////////////////////////////////////////
    // Constraints

    fn append(&self, arg : RowArg<'_>, ctype : ConstraintType, rh : f64) -> Result<bool> {
        self.structural(|g| {
            let Inner{ ws, data, options, .. } = g;
            let mut frame = ws.frame();
            let row = marshal_row(&mut frame,arg,data.num_cols())?;
            Ok(data.append_row(row.subj,row.cof,ctype,rh,options.add_row_mode))
        })
    }

    /// Append a constraint from a dense coefficient sequence.
    pub fn add_constraint(&self, values : &[f64], ctype : ConstraintType, rh : f64) -> Result<bool> {
        self.append(RowArg::Dense(values),ctype,rh)
    }

    /// Append a constraint from the first `count` entries of `values` and `indices`.
    pub fn add_constraint_ex(&self, count : usize, values : &[f64], indices : &[usize], ctype : ConstraintType, rh : f64) -> Result<bool> {
        self.append(RowArg::Sparse(count,values,indices),ctype,rh)
    }

    /// Append a constraint from a whitespace separated list of coefficients.
    pub fn add_constraint_str(&self, text : &str, ctype : ConstraintType, rh : f64) -> Result<bool> {
        self.append(RowArg::Text(text),ctype,rh)
    }

    fn replace_row(&self, row : usize, arg : RowArg<'_>) -> Result<bool> {
        self.structural(|g| {
            let Inner{ ws, data, .. } = g;
            check_row(data,row)?;
            let mut frame = ws.frame();
            let r = marshal_row(&mut frame,arg,data.num_cols())?;
            Ok(data.set_row(row,r.subj,r.cof))
        })
    }

    /// Replace the coefficients of row `row` by a dense sequence. Type and right-hand side are
    /// kept.
    pub fn set_row(&self, row : usize, values : &[f64]) -> Result<bool> {
        self.replace_row(row,RowArg::Dense(values))
    }

    /// Replace the coefficients of row `row` by the first `count` entries of `values` and
    /// `indices`.
    pub fn set_row_ex(&self, row : usize, count : usize, values : &[f64], indices : &[usize]) -> Result<bool> {
        self.replace_row(row,RowArg::Sparse(count,values,indices))
    }

    pub fn set_row_str(&self, row : usize, text : &str) -> Result<bool> {
        self.replace_row(row,RowArg::Text(text))
    }

    /// Set a single coefficient. Row 0 is the objective; a zero value removes the entry.
    pub fn set_mat(&self, row : usize, col : usize, value : f64) -> Result<bool> {
        self.structural(|g| {
            check_col(&g.data,col)?;
            if row == 0 {
                g.data.set_obj(col,value);
                Ok(true)
            }
            else {
                check_row(&g.data,row)?;
                Ok(g.data.set_mat(row,col,value))
            }
        })
    }

    /// Single coefficient; row 0 is the objective.
    pub fn mat(&self, row : usize, col : usize) -> Result<f64> {
        let g = self.active()?;
        check_col(&g.data,col)?;
        if row == 0 {
            Ok(g.data.obj(col))
        }
        else {
            check_row(&g.data,row)?;
            Ok(g.data.mat(row,col))
        }
    }

    /// Coefficients of row `row` as a dense vector.
    pub fn row(&self, row : usize) -> Result<Vec<f64>> {
        let g = self.active()?;
        Ok(g.data.row_dense(check_row(&g.data,row)?))
    }

    pub fn constr_type(&self, row : usize) -> Result<ConstraintType> {
        let g = self.active()?;
        Ok(g.data.constr_type(check_row(&g.data,row)?))
    }

    pub fn set_constr_type(&self, row : usize, ctype : ConstraintType) -> Result<bool> {
        self.structural(|g| {
            check_row(&g.data,row)?;
            g.data.set_constr_type(row,ctype);
            Ok(true)
        })
    }

    pub fn row_name(&self, row : usize) -> Result<String> {
        let g = self.active()?;
        Ok(g.data.row_name(check_row(&g.data,row)?))
    }

    /// Name a row. Returns false for a name that cannot be written in LP format.
    pub fn set_row_name(&self, row : usize, name : &str) -> Result<bool> {
        let mut g = self.mutable()?;
        check_row(&g.data,row)?;
        if !lpformat::is_row_name(name) {
            return Ok(false);
        }
        g.data.set_row_name(row,name);
        Ok(true)
    }

    ////////////////////////////////////////////////////////////
    // Right-hand sides

    pub fn rh(&self, row : usize) -> Result<f64> {
        let g = self.active()?;
        Ok(g.data.rh(check_row(&g.data,row)?))
    }

    pub fn set_rh(&self, row : usize, value : f64) -> Result<bool> {
        self.structural(|g| {
            check_row(&g.data,row)?;
            g.data.set_rh(row,value);
            Ok(true)
        })
    }

    /// The range of a row; infinite for an unranged inequality.
    pub fn rh_range(&self, row : usize) -> Result<f64> {
        let g = self.active()?;
        Ok(g.data.rh_range(check_row(&g.data,row)?))
    }

    /// Make row `row` a range constraint. For a `<=` row with right-hand side `b` the activity is
    /// limited to `[b-|delta|,b]`, for `>=` and `=` rows to `[b,b+|delta|]`.
    pub fn set_rh_range(&self, row : usize, delta : f64) -> Result<bool> {
        self.structural(|g| {
            check_row(&g.data,row)?;
            Ok(g.data.set_rh_range(row,delta))
        })
    }

    fn set_rh_row(&self, arg : RowArg<'_>) -> Result<bool> {
        self.structural(|g| {
            let Inner{ ws, data, .. } = g;
            let mut frame = ws.frame();
            let rhs = marshal_row(&mut frame,arg,data.num_rows())?;
            data.set_rh_vec(rhs.subj,rhs.cof);
            Ok(true)
        })
    }

    /// Set all right-hand sides; element `i` belongs to row `i+1`.
    pub fn set_rh_vec(&self, values : &[f64]) -> Result<bool> {
        self.set_rh_row(RowArg::Dense(values))
    }

    /// Set all right-hand sides from a whitespace separated list of numbers.
    pub fn set_rh_vec_str(&self, text : &str) -> Result<bool> {
        self.set_rh_row(RowArg::Text(text))
    }

    ////////////////////////////////////////////////////////////
    // Bounds and kinds

    pub fn bounds(&self, col : usize) -> Result<(f64,f64)> {
        let g = self.active()?;
        Ok(g.data.bounds(check_col(&g.data,col)?))
    }

    /// Set both bounds of a column. Returns false, leaving the bounds unchanged, if
    /// `lower > upper`.
    pub fn set_bounds(&self, col : usize, lower : f64, upper : f64) -> Result<bool> {
        self.structural(|g| {
            check_col(&g.data,col)?;
            Ok(g.data.set_bounds(col,lower,upper))
        })
    }

    pub fn upbo(&self, col : usize) -> Result<f64> { Ok(self.bounds(col)?.1) }
    pub fn lowbo(&self, col : usize) -> Result<f64> { Ok(self.bounds(col)?.0) }

    pub fn set_upbo(&self, col : usize, value : f64) -> Result<bool> {
        self.structural(|g| {
            check_col(&g.data,col)?;
            Ok(g.data.set_upper(col,value))
        })
    }

    pub fn set_lowbo(&self, col : usize, value : f64) -> Result<bool> {
        self.structural(|g| {
            check_col(&g.data,col)?;
            Ok(g.data.set_lower(col,value))
        })
    }

    pub fn is_binary(&self, col : usize) -> Result<bool> {
        let g = self.active()?;
        Ok(g.data.is_binary(check_col(&g.data,col)?))
    }

    /// Make a column binary, which makes it integer with bounds `[0,1]`. Clearing the flag makes
    /// the column continuous and keeps its bounds.
    pub fn set_binary(&self, col : usize, bin : bool) -> Result<bool> {
        self.structural(|g| {
            check_col(&g.data,col)?;
            g.data.set_binary(col,bin);
            Ok(true)
        })
    }

    pub fn is_int(&self, col : usize) -> Result<bool> {
        let g = self.active()?;
        Ok(g.data.is_int(check_col(&g.data,col)?))
    }

    pub fn set_int(&self, col : usize, int : bool) -> Result<bool> {
        self.structural(|g| {
            check_col(&g.data,col)?;
            g.data.set_int(col,int);
            Ok(true)
        })
    }

    pub fn kind(&self, col : usize) -> Result<VariableKind> {
        let g = self.active()?;
        Ok(g.data.kind(check_col(&g.data,col)?))
    }

    pub fn col_name(&self, col : usize) -> Result<String> {
        let g = self.active()?;
        Ok(g.data.col_name(check_col(&g.data,col)?))
    }

    /// Name a column. Returns false for a name that cannot be written in LP format.
    pub fn set_col_name(&self, col : usize, name : &str) -> Result<bool> {
        let mut g = self.mutable()?;
        check_col(&g.data,col)?;
        if !lpformat::is_name(name) {
            return Ok(false);
        }
        g.data.set_col_name(col,name);
        Ok(true)
    }

    ////////////////////////////////////////////////////////////
    // Solving

    /// Move to `Running`, hand the problem to the engine, and take the engine out of the model.
    fn begin_solve(&self) -> Result<(Box<dyn Engine>,Options)> {
        let mut g = self.active()?;
        if g.solve == SolveState::Running {
            return Err(ModelError::ModelBusy);
        }
        let Inner{ solve, factory, engine : slot, data, options, solution, .. } = &mut *g;

        let mut engine = match slot.take() {
            Some(engine) => engine,
            None => factory.create().map_err(ModelError::Allocation)?
        };
        data.normalize();
        if let Err(msg) = engine.build(data) {
            *slot = Some(engine);
            warn!(component = "model", operation = "solve", error = %msg, "engine rejected the problem");
            return Err(ModelError::Solve(msg));
        }
        *solve = SolveState::Running;
        *solution = None;
        info!(component = "model", operation = "solve", engine = engine.name(), rows = data.num_rows(), cols = data.num_cols(), timeout = options.timeout, "solve started");
        Ok((engine,options.clone()))
    }

    /// Solve on the calling thread.
    ///
    /// # Returns
    /// The solve status. Infeasible or unbounded problems are not errors. Fails with
    /// [ModelError::ModelBusy] if another solve is running, or [ModelError::Solve] if the engine
    /// failed.
    pub fn solve(&self) -> Result<SolveStatus> {
        let (engine,options) = self.begin_solve()?;
        let outcome = executor::run(engine,&options);
        finish_solve(&self.shared,outcome)
    }

    /// Start a solve on the worker pool of `ctx` and return immediately.
    ///
    /// `callback` is invoked exactly once with the status, from [Context::poll] or
    /// [Context::wait] on the thread owning `ctx`. If the solve cannot be started, the error is
    /// returned here and the callback is never invoked.
    pub fn solve_async<F>(&self, ctx : &Context, callback : F) -> Result<()>
        where F : FnOnce(Result<SolveStatus>) + 'static
    {
        let (engine,options) = self.begin_solve()?;
        ctx.submit(self.shared.clone(),engine,options,Box::new(callback));
        Ok(())
    }

    pub fn solve_state(&self) -> Result<SolveState> { Ok(self.active()?.solve.clone()) }

    /// Status of the last completed solve.
    pub fn status(&self) -> Result<Option<SolveStatus>> {
        Ok(match self.active()?.solve {
            SolveState::Completed(status) => Some(status),
            _ => None
        })
    }

    /// Objective value of the last solve, if the problem has not been changed since.
    pub fn objective_value(&self) -> Result<Option<f64>> {
        Ok(self.active()?.solution.as_ref().map(|s| s.objective))
    }

    /// Column values of the last solve, if the problem has not been changed since.
    pub fn variables(&self) -> Result<Option<Vec<f64>>> {
        Ok(self.active()?.solution.as_ref().map(|s| s.columns.clone()))
    }

    /// Copy the column values of the last solve into `out`.
    ///
    /// # Returns
    /// False if there is no current solution or `out` is shorter than the number of columns.
    pub fn variables_into(&self, out : & mut [f64]) -> Result<bool> {
        let g = self.active()?;
        match g.solution.as_ref() {
            Some(s) if out.len() >= s.columns.len() => {
                out[..s.columns.len()].copy_from_slice(&s.columns);
                Ok(true)
            },
            _ => Ok(false)
        }
    }

    /// Row activities of the last solve, if the problem has not been changed since.
    pub fn constraint_values(&self) -> Result<Option<Vec<f64>>> {
        Ok(self.active()?.solution.as_ref().map(|s| s.rows.clone()))
    }

    ////////////////////////////////////////////////////////////
    // LP format

    pub fn to_lp_string(&self) -> Result<String> {
        let mut g = self.active()?;
        g.data.normalize();
        Ok(lpformat::to_string(&g.data))
    }

    pub fn write_lp_to<W : Write>(&self, mut out : W) -> Result<()> {
        let text = self.to_lp_string()?;
        out.write_all(text.as_bytes())?;
        Ok(())
    }

    /// Write the model to `path` in LP format.
    pub fn write_lp<P : AsRef<Path>>(&self, path : P) -> Result<bool> {
        let text = self.to_lp_string()?;
        std::fs::write(path.as_ref(),text)?;
        debug!(component = "model", operation = "write", path = %path.as_ref().display(), "model written");
        Ok(true)
    }

    /// A copy of the problem data.
    pub fn data(&self) -> Result<ModelData> {
        let mut g = self.active()?;
        g.data.normalize();
        Ok(g.data.clone())
    }
}

/// Put the engine back into the model and record the outcome of a solve.
pub(crate) fn finish_solve(shared : &Shared, outcome : Outcome) -> Result<SolveStatus> {
    let mut g = shared.lock();
    let Inner{ lifecycle, solve, factory, engine : slot, solution, .. } = &mut *g;

    let engine = match outcome.engine {
        Some(engine) => Some(engine),
        None => match factory.create() {
            Ok(engine) => Some(engine),
            Err(msg) => {
                warn!(component = "model", operation = "solve", error = %msg, "cannot replace engine");
                None
            }
        }
    };

    let elapsed_ms = outcome.elapsed.as_millis() as u64;
    let res = match outcome.result {
        Ok(status) => {
            *solution = if status.has_solution() { engine.as_ref().and_then(|e| e.solution().cloned()) } else { None };
            *solve = SolveState::Completed(status);
            info!(component = "model", operation = "solve", status = ?status, elapsed_ms, "solve finished");
            Ok(status)
        },
        Err(msg) => {
            *solution = None;
            *solve = SolveState::Failed(msg.clone());
            warn!(component = "model", operation = "solve", error = %msg, elapsed_ms, "solve failed");
            Err(ModelError::Solve(msg))
        }
    };

    if *lifecycle == Lifecycle::Disposed {
        // Dropped while solving; the engine is released now.
        *solution = None;
        drop(engine);
    }
    else {
        *slot = engine;
    }
    res
}

impl Drop for Model {
    fn drop(& mut self) {
        let mut g = self.shared.lock();
        if g.lifecycle == Lifecycle::Active {
            g.lifecycle = Lifecycle::Disposed;
            g.engine = None;
            g.solution = None;
        }
    }
}
