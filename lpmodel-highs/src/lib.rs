//! HiGHS engine for `lpmodel`.
//!
//! ```rust
//! use lpmodel::{ConstraintType, SolveStatus};
//!
//! let model = lpmodel_highs::make_model(0, 2).unwrap();
//! model.set_obj_fn(&[2.0, 3.0]).unwrap();
//! model.set_maxim(true).unwrap();
//! model.add_constraint(&[1.0, 1.0], ConstraintType::LE, 4.0).unwrap();
//! assert_eq!(model.solve().unwrap(), SolveStatus::Optimal);
//! let obj = model.objective_value().unwrap().unwrap();
//! assert!((obj - 12.0).abs() < 1e-9);
//! ```

use std::path::Path;

use highs::{Col, HighsModelStatus, HighsStatus, RowProblem, Sense};
use itertools::izip;
use lpmodel::{Engine, Factory, Model, ModelData, Options, Result, Solution, SolveStatus, Verbosity};
use tracing::{debug, trace};

/// Gap used for break-at-first. Any incumbent is accepted.
const ANY_GAP : f64 = 1e30;

/// Engine solving with HiGHS. The problem is rebuilt from the stored snapshot on every solve.
#[derive(Default)]
pub struct HighsEngine {
    data     : Option<ModelData>,
    solution : Option<Solution>,
}

impl HighsEngine {
    pub fn new() -> HighsEngine { HighsEngine::default() }
}

fn problem(data : &ModelData) -> RowProblem {
    let mut pb = RowProblem::default();
    let cols : Vec<Col> = izip!(data.columns(),data.obj_fn().iter())
        .map(|((_,lb,ub,int),&c)| {
            if int { pb.add_integer_column(c,lb..=ub) }
            else { pb.add_column(c,lb..=ub) }
        })
        .collect();

    for i in 1..=data.num_rows() {
        let (lo,hi) = data.row_bounds(i);
        let (subj,cof) = data.row(i);
        let factors : Vec<(Col,f64)> = subj.iter().zip(cof.iter()).map(|(&j,&c)| (cols[j-1],c)).collect();
        pb.add_row(lo..=hi,factors);
    }
    pb
}

fn map_status(status : HighsModelStatus) -> SolveStatus {
    match status {
        HighsModelStatus::Optimal | HighsModelStatus::ModelEmpty => SolveStatus::Optimal,
        HighsModelStatus::Infeasible => SolveStatus::Infeasible,
        HighsModelStatus::Unbounded => SolveStatus::Unbounded,
        HighsModelStatus::ReachedTimeLimit => SolveStatus::Timeout,
        HighsModelStatus::ReachedIterationLimit => SolveStatus::UserAbort,
        _ => SolveStatus::NumFailure,
    }
}

fn highs_error(stage : &str, status : HighsStatus) -> String {
    format!("HiGHS {} failed with status {:?}",stage,status)
}

/// First non-finite coefficient, cost or bound, which HiGHS rejects.
fn check_finite(data : &ModelData) -> std::result::Result<(),String> {
    if let Some(j) = data.obj_fn().iter().position(|c| !c.is_finite()) {
        return Err(format!("objective coefficient of column {} is not finite",j+1));
    }
    for i in 1..=data.num_rows() {
        let (subj,cof) = data.row(i);
        if let Some((j,_)) = subj.iter().zip(cof.iter()).find(|p| !p.1.is_finite()) {
            return Err(format!("coefficient of column {} in row {} is not finite",j,i));
        }
        if data.rh(i).is_nan() {
            return Err(format!("right-hand side of row {} is not a number",i));
        }
    }
    if let Some((j,..)) = data.columns().find(|c| c.1.is_nan() || c.2.is_nan()) {
        return Err(format!("bound of column {} is not a number",j));
    }
    Ok(())
}

impl HighsEngine {
    fn run(&self, data : &ModelData, options : &Options, presolve : bool) -> std::result::Result<highs::SolvedModel,String> {
        let sense = if data.sense_max() { Sense::Maximise } else { Sense::Minimise };
        let mut model = problem(data).try_optimise(sense).map_err(|s| highs_error("model setup",s))?;
        if options.verbosity < Verbosity::Detailed {
            model.make_quiet();
        }
        if options.timeout > 0 {
            model.set_option("time_limit",options.timeout as f64);
        }
        if options.break_at_first && data.has_integers() {
            model.set_option("mip_rel_gap",ANY_GAP);
            model.set_option("mip_abs_gap",ANY_GAP);
        }
        if !presolve {
            model.set_option("presolve","off");
        }
        model.try_solve().map_err(|s| highs_error("solve",s))
    }
}

impl Engine for HighsEngine {
    fn name(&self) -> &str { "highs" }

    fn build(& mut self, data : &ModelData) -> std::result::Result<(),String> {
        self.solution = None;
        self.data = None;
        check_finite(data)?;
        self.data = Some(data.clone());
        Ok(())
    }

    fn solve(& mut self, options : &Options) -> std::result::Result<SolveStatus,String> {
        let data = self.data.as_ref().ok_or_else(|| "no problem loaded".to_string())?;
        debug!(component = "highs",
               operation = "solve",
               num_cols = data.num_cols(),
               num_rows = data.num_rows(),
               timeout = options.timeout,
               "solving");

        let mut solved = self.run(data,options,true)?;
        let mut hstatus = solved.status();
        if hstatus == HighsModelStatus::UnboundedOrInfeasible {
            // Without presolve HiGHS tells the two apart.
            solved = self.run(data,options,false)?;
            hstatus = solved.status();
        }
        let status = match hstatus {
            HighsModelStatus::UnboundedOrInfeasible => SolveStatus::Unbounded,
            HighsModelStatus::Optimal if options.break_at_first && data.has_integers() => SolveStatus::SubOptimal,
            s => map_status(s),
        };
        trace!(component = "highs", operation = "solve", ?hstatus, ?status, "status received");

        self.solution = if status.has_solution() {
            let sol = solved.get_solution();
            let columns = sol.columns().to_vec();
            let rows = sol.rows().to_vec();
            let objective = data.obj_const() + data.obj_fn().iter().zip(columns.iter()).map(|(c,x)| c*x).sum::<f64>();
            Some(Solution{ objective, columns, rows })
        }
        else {
            None
        };
        Ok(status)
    }

    fn solution(&self) -> Option<&Solution> { self.solution.as_ref() }
}

/// Factory for HiGHS engines.
pub fn factory() -> Factory {
    Factory::new("highs", || Ok(Box::new(HighsEngine::new()) as Box<dyn Engine>))
}

/// Create a model with `rows` empty rows and `cols` columns, solved by HiGHS.
pub fn make_model(rows : usize, cols : usize) -> Result<Model> {
    Model::create(&factory(),rows,cols)
}

/// Read a model from an LP file, solved by HiGHS.
pub fn load_model<P : AsRef<Path>>(path : P, verbosity : Verbosity, name : &str) -> Result<Model> {
    Model::load(&factory(),path,verbosity,name)
}
