extern crate lpmodel;
extern crate lpmodel_highs;

use std::cell::RefCell;
use std::path::PathBuf;
use std::rc::Rc;
use std::time::{Duration, Instant};

use lpmodel::*;
use lpmodel_highs::{load_model, make_model};
use rand::{Rng, SeedableRng};
use rand::rngs::StdRng;

fn close(a : &[f64], b : &[f64]) -> bool {
    a.len() == b.len() && a.iter().zip(b.iter()).all(|(x,y)| (x-y).abs() < 1e-6)
}

fn scratch_file(name : &str) -> PathBuf {
    std::env::temp_dir().join(format!("lpmodel-{}-{}", std::process::id(), name))
}

const SMALL_MIP_LP : &str =
    "/* Objective function */\n\
     min: +C1 +C2;\n\
     \n\
     /* Constraints */\n\
     +C1 +C2 >= 2;\n\
     \n\
     /* Variable bounds */\n\
     C1 >= 1;\n\
     C2 >= 1;\n\
     \n\
     /* Integer definitions */\n\
     int C1;\n";

/// `min x1 + x2` with `x1 + x2 >= 2`, both at least one and `x1` integer.
fn small_mip() -> Model {
    let m = make_model(0,2).unwrap();
    m.set_obj_fn(&[1.0,1.0]).unwrap();
    m.set_maxim(false).unwrap();
    m.set_int(1,true).unwrap();
    m.set_lowbo(1,1.0).unwrap();
    m.set_lowbo(2,1.0).unwrap();
    m.add_constraint(&[1.0,1.0],ConstraintType::GE,2.0).unwrap();
    m
}

/// Optimization version of a market split instance: `sum_j a_ij x_j + s_i - t_i = d_i` with
/// binary `x`, minimizing the total deviation. Hard to prove optimal even when small.
fn market_split(m : usize, n : usize, seed : u64) -> Model {
    let mut rng = StdRng::seed_from_u64(seed);
    let model = make_model(0,n+2*m).unwrap();
    for j in 1..=n {
        model.set_binary(j,true).unwrap();
    }
    let mut c = vec![0.0; n+2*m];
    c[n..].iter_mut().for_each(|v| *v = 1.0);
    model.set_obj_fn(&c).unwrap();

    for i in 0..m {
        let mut row : Vec<f64> = (0..n).map(|_| rng.gen_range(0..100) as f64).collect();
        let d = (row.iter().sum::<f64>() / 2.0).floor();
        row.resize(n+2*m,0.0);
        row[n+i] = 1.0;
        row[n+m+i] = -1.0;
        model.add_constraint(&row,ConstraintType::EQ,d).unwrap();
    }
    model
}

#[test]
fn maximize_two_variables() {
    let m = make_model(0,2).unwrap();
    m.set_obj_fn(&[2.0,3.0]).unwrap();
    m.set_maxim(true).unwrap();
    m.add_constraint(&[1.0,1.0],ConstraintType::LE,4.0).unwrap();

    assert_eq!(m.solve().unwrap(), SolveStatus::Optimal);
    assert!(close(&m.variables().unwrap().unwrap(), &[0.0,4.0]));
    assert!((m.objective_value().unwrap().unwrap() - 12.0).abs() < 1e-6);
    assert!(close(&m.constraint_values().unwrap().unwrap(), &[4.0]));

    let mut out = [0.0; 2];
    assert!(m.variables_into(&mut out).unwrap());
    assert!(close(&out, &[0.0,4.0]));
}

#[test]
fn infeasible() {
    let m = make_model(0,1).unwrap();
    m.set_upbo(1,3.0).unwrap();
    m.add_constraint(&[1.0],ConstraintType::GE,5.0).unwrap();
    assert_eq!(m.solve().unwrap(), SolveStatus::Infeasible);
    assert_eq!(m.variables().unwrap(), None);
}

#[test]
fn unbounded() {
    let m = make_model(0,2).unwrap();
    m.set_maxim(true).unwrap();
    m.set_obj_fn(&[1.0,1.0]).unwrap();
    m.add_constraint(&[1.0,-1.0],ConstraintType::LE,1.0).unwrap();
    assert_eq!(m.solve().unwrap(), SolveStatus::Unbounded);
}

#[test]
fn ranged_row() {
    let m = make_model(0,1).unwrap();
    m.set_obj_fn(&[1.0]).unwrap();
    m.add_constraint(&[1.0],ConstraintType::LE,5.0).unwrap();
    m.set_rh_range(1,3.0).unwrap();
    assert_eq!(m.solve().unwrap(), SolveStatus::Optimal);
    assert!(close(&m.variables().unwrap().unwrap(), &[2.0]));

    m.set_maxim(true).unwrap();
    assert_eq!(m.solve().unwrap(), SolveStatus::Optimal);
    assert!(close(&m.variables().unwrap().unwrap(), &[5.0]));
}

#[test]
fn write_and_solve_sync() {
    let m = small_mip();
    let path = scratch_file("sync.lp");
    assert!(m.write_lp(&path).unwrap());
    assert_eq!(std::fs::read_to_string(&path).unwrap(), SMALL_MIP_LP);
    std::fs::remove_file(&path).unwrap();

    assert_eq!(m.invoke("solveSync", &[]).unwrap(), Value::Number(0.0));
    assert!(close(&m.variables().unwrap().unwrap(), &[1.0,1.0]));
    m.dispose().unwrap();
}

#[test]
fn solve_async_delivers_on_owner_thread() {
    let ctx = Context::new(2).unwrap();
    let m = small_mip();
    assert_eq!(m.to_lp_string().unwrap(), SMALL_MIP_LP);

    let got = Rc::new(RefCell::new(None));
    let g = got.clone();
    m.solve_async(&ctx, move |r| { *g.borrow_mut() = Some(r); }).unwrap();
    assert_eq!(ctx.wait(), 1);

    let status = got.borrow_mut().take().unwrap().unwrap();
    assert_eq!(status, SolveStatus::Optimal);
    assert_eq!(m.solve_state().unwrap(), model::SolveState::Completed(SolveStatus::Optimal));
    assert!(close(&m.variables().unwrap().unwrap(), &[1.0,1.0]));
}

#[test]
fn several_models_in_parallel() {
    let ctx = Context::new(0).unwrap();
    let models : Vec<Model> = (0..4).map(|_| small_mip()).collect();
    let done = Rc::new(RefCell::new(Vec::new()));
    for (k,m) in models.iter().enumerate() {
        let d = done.clone();
        m.solve_async(&ctx, move |r| d.borrow_mut().push((k,r.unwrap()))).unwrap();
    }
    ctx.wait();
    let mut done = done.borrow().clone();
    done.sort_by_key(|p| p.0);
    assert_eq!(done, (0..4).map(|k| (k,SolveStatus::Optimal)).collect::<Vec<_>>());
}

#[test]
fn timeout_and_busy() {
    let ctx = Context::new(1).unwrap();
    let m = market_split(6,50,1234);
    m.set_timeout(1).unwrap();

    let got = Rc::new(RefCell::new(None));
    let g = got.clone();
    let t0 = Instant::now();
    m.solve_async(&ctx, move |r| { *g.borrow_mut() = Some(r); }).unwrap();

    // Mutations are rejected while the solve runs, queries are not.
    assert!(matches!(m.set_obj(1,2.0), Err(ModelError::ModelBusy)));
    assert!(matches!(m.set_timeout(5), Err(ModelError::ModelBusy)));
    assert!(matches!(m.solve(), Err(ModelError::ModelBusy)));
    assert!(matches!(m.dispose(), Err(ModelError::ModelBusy)));
    assert_eq!(m.columns().unwrap(), 62);
    assert_eq!(m.solve_state().unwrap(), model::SolveState::Running);

    assert_eq!(ctx.wait_timeout(Duration::from_secs(60)), 1);
    assert!(t0.elapsed() < Duration::from_secs(60));
    assert_eq!(got.borrow_mut().take().unwrap().unwrap(), SolveStatus::Timeout);
    assert!(m.set_obj(1,2.0).unwrap());
}

#[test]
fn break_at_first() {
    let m = market_split(2,12,7);
    m.set_break_at_first(true).unwrap();
    let status = m.solve().unwrap();
    assert_eq!(status, SolveStatus::SubOptimal);
    assert!(m.variables().unwrap().is_some());
}

#[test]
fn load_from_file() {
    let path = PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests/data/problem.lp");
    let m = load_model(&path, Verbosity::Normal, "problem").unwrap();
    assert_eq!(m.name().unwrap(), "problem");
    assert!(!m.maxim().unwrap());
    assert_eq!(m.columns().unwrap(), 2);
    assert_eq!(m.rows().unwrap(), 1);
    assert_eq!(m.col_name(2).unwrap(), "y");
    assert!(m.is_int(2).unwrap());

    assert_eq!(m.solve().unwrap(), SolveStatus::Optimal);
    assert!(close(&m.variables().unwrap().unwrap(), &[0.0,2.0]));
    assert!((m.objective_value().unwrap().unwrap() - 4.0).abs() < 1e-6);
}

#[test]
fn write_and_reload() {
    let m = market_split(2,8,99);
    m.set_name("split").unwrap();
    m.set_rh_range(1,4.0).unwrap();
    let path = scratch_file("reload.lp");
    m.write_lp(&path).unwrap();

    let r = load_model(&path, Verbosity::Normal, "split").unwrap();
    std::fs::remove_file(&path).unwrap();
    assert_eq!(r.rows().unwrap(), 2);
    assert_eq!(r.columns().unwrap(), 12);
    // The objective lists every column up to the last slack, so numbering survives the reload.
    assert_eq!(r.col_name(1).unwrap(), "C1");
    assert_eq!(r.to_lp_string().unwrap(), m.to_lp_string().unwrap());
    assert_eq!(r.rh_range(1).unwrap(), 4.0);

    assert_eq!(m.solve().unwrap(), SolveStatus::Optimal);
    assert_eq!(r.solve().unwrap(), SolveStatus::Optimal);
    let (a,b) = (m.objective_value().unwrap().unwrap(), r.objective_value().unwrap().unwrap());
    assert!((a-b).abs() < 1e-6);
}

#[test]
fn infinite_coefficient_fails_the_solve() {
    let m = make_model(0,1).unwrap();
    m.set_obj_fn(&[1.0]).unwrap();
    m.add_constraint(&[f64::INFINITY],ConstraintType::GE,1.0).unwrap();
    assert!(matches!(m.solve(), Err(ModelError::Solve(_))));
    assert_eq!(m.variables().unwrap(), None);

    // The model stays usable once the row is repaired.
    assert!(m.set_row(1,&[1.0]).unwrap());
    assert_eq!(m.solve().unwrap(), SolveStatus::Optimal);
    assert!(close(&m.variables().unwrap().unwrap(), &[1.0]));
}

#[test]
fn missing_file() {
    assert!(matches!(load_model(scratch_file("missing.lp"), Verbosity::Normal, "x"), Err(ModelError::Io(_))));
}

#[test]
fn use_after_dispose() {
    let m = small_mip();
    m.dispose().unwrap();
    m.dispose().unwrap();
    assert!(matches!(m.solve(), Err(ModelError::UseAfterDispose)));
    assert!(matches!(m.invoke("rows", &[]), Err(ModelError::UseAfterDispose)));
}
