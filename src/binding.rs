//! Dynamic dispatch of host calls onto [Model] methods.
//!
//! Every method validates its argument count, then the kind of each argument, and only then
//! touches the model. Query forms return the queried value, setters that the engine may reject
//! return a `Bool`, and option setters return `Null`.

use crate::value::Args;
use crate::{ConstraintType, Factory, Model, ModelError, Result, Value, Verbosity};

fn ctype(code : f64) -> Option<ConstraintType> {
    if code.fract() == 0.0 { ConstraintType::from_code(code as i32) } else { None }
}

fn optional(values : Option<Vec<f64>>) -> Value {
    values.map(Value::from).unwrap_or(Value::Null)
}

/// `makeLP(rows, columns)`.
pub fn make_lp(factory : &Factory, args : &[Value]) -> Result<Model> {
    let a = Args::new(args);
    a.arity(&[2])?;
    let rows = a.index(0)?;
    let cols = a.index(1)?;
    Model::create(factory,rows,cols)
}

/// `readLP(path, verbosity, name)`.
pub fn read_lp(factory : &Factory, args : &[Value]) -> Result<Model> {
    let a = Args::new(args);
    a.arity(&[3])?;
    let path = a.string(0)?;
    let verbosity = verbosity(&a,1)?;
    let name = a.string(2)?;
    Model::load(factory,path,verbosity,name)
}

fn verbosity(a : &Args, pos : usize) -> Result<Verbosity> {
    let v = a.number(pos)?;
    (if v.fract() == 0.0 { Verbosity::from_code(v as i32) } else { None })
        .ok_or_else(|| ModelError::Type(format!("invalid verbosity level {}", v)))
}

/// Column index argument of `binary` and `intVar`, which report a generic type error.
fn column_arg(a : &Args) -> Result<usize> {
    match a.index(0) {
        Err(ModelError::Type(_)) => Err(ModelError::Type("Invalid type of arguments".to_string())),
        r => r
    }
}

impl Model {
    /// Call the method `method` with loosely typed arguments.
    ///
    /// ```rust
    /// use lpmodel::*;
    ///
    /// let model = Model::create(&dummy::factory(), 0, 2).unwrap();
    /// model.invoke("objFn", &[Value::from(vec![1.0, 1.0])]).unwrap();
    /// assert_eq!(model.invoke("columns", &[]).unwrap(), Value::Number(2.0));
    /// assert!(matches!(model.invoke("rows", &[Value::from(1.0)]), Err(ModelError::Arity(_))));
    /// ```
    pub fn invoke(&self, method : &str, args : &[Value]) -> Result<Value> {
        let a = Args::new(args);
        match method {
            "name" => {
                if a.arity(&[0,1])? == 0 {
                    Ok(Value::from(self.name()?))
                }
                else {
                    self.set_name(a.string(0)?)?;
                    Ok(Value::Bool(true))
                }
            },
            "addRowMode" => {
                if a.arity(&[0,1])? == 0 {
                    Ok(Value::Bool(self.add_row_mode()?))
                }
                else {
                    Ok(Value::Bool(self.set_add_row_mode(a.boolean(0)?)?))
                }
            },
            "obj" => {
                if a.arity(&[1,2])? == 1 {
                    Ok(Value::Number(self.obj(a.index(0)?)?))
                }
                else {
                    let col = a.index(0)?;
                    let value = a.number(1)?;
                    Ok(Value::Bool(self.set_obj(col,value)?))
                }
            },
            "objFn" => {
                a.arity(&[1])?;
                Ok(Value::Bool(self.set_obj_fn(&a.numbers(0)?)?))
            },
            "objFnEx" => {
                a.arity(&[3])?;
                let count = a.index(0)?;
                let values = a.numbers(1)?;
                let indices = a.indexes(2)?;
                Ok(Value::Bool(self.set_obj_fn_ex(count,&values,&indices)?))
            },
            "objFnStr" => {
                a.arity(&[1])?;
                Ok(Value::Bool(self.set_obj_fn_str(a.string(0)?)?))
            },
            "maxim" => {
                if a.arity(&[0,1])? == 0 {
                    Ok(Value::Bool(self.maxim()?))
                }
                else {
                    self.set_maxim(a.boolean(0)?)?;
                    Ok(Value::Null)
                }
            },
            "binary" | "intVar" => {
                let n = a.arity(&[1,2])?;
                let col = column_arg(&a)?;
                match (method,n) {
                    ("binary",1) => Ok(Value::Bool(self.is_binary(col)?)),
                    ("binary",_) => Ok(Value::Bool(self.set_binary(col,a.boolean(1)?)?)),
                    (_,1)        => Ok(Value::Bool(self.is_int(col)?)),
                    _            => Ok(Value::Bool(self.set_int(col,a.boolean(1)?)?)),
                }
            },
            "resize" => {
                a.arity(&[2])?;
                let rows = a.index(0)?;
                let cols = a.index(1)?;
                Ok(Value::Bool(self.resize(rows,cols)?))
            },
            "rows" => {
                a.arity(&[0])?;
                Ok(Value::from(self.rows()?))
            },
            "columns" => {
                a.arity(&[0])?;
                Ok(Value::from(self.columns()?))
            },
            "rh" | "rhRange" => {
                let n = a.arity(&[1,2])?;
                let row = a.index(0)?;
                match (method,n) {
                    ("rh",1) => Ok(Value::Number(self.rh(row)?)),
                    ("rh",_) => Ok(Value::Bool(self.set_rh(row,a.number(1)?)?)),
                    (_,1)    => Ok(Value::Number(self.rh_range(row)?)),
                    _        => Ok(Value::Bool(self.set_rh_range(row,a.number(1)?)?)),
                }
            },
            "rhVec" => {
                a.arity(&[1])?;
                Ok(Value::Bool(self.set_rh_vec(&a.numbers(0)?)?))
            },
            "rhVecStr" => {
                a.arity(&[1])?;
                Ok(Value::Bool(self.set_rh_vec_str(a.string(0)?)?))
            },
            "constraint" => {
                a.arity(&[3])?;
                let values = a.numbers(0)?;
                let code = a.number(1)?;
                let rh = a.number(2)?;
                match ctype(code) {
                    Some(ct) => Ok(Value::Bool(self.add_constraint(&values,ct,rh)?)),
                    None => Ok(Value::Bool(false))
                }
            },
            "constraintEx" => {
                a.arity(&[5])?;
                let count = a.index(0)?;
                let values = a.numbers(1)?;
                let indices = a.indexes(2)?;
                let code = a.number(3)?;
                let rh = a.number(4)?;
                match ctype(code) {
                    Some(ct) => Ok(Value::Bool(self.add_constraint_ex(count,&values,&indices,ct,rh)?)),
                    None => Ok(Value::Bool(false))
                }
            },
            "constraintStr" => {
                a.arity(&[3])?;
                let text = a.string(0)?;
                let code = a.number(1)?;
                let rh = a.number(2)?;
                match ctype(code) {
                    Some(ct) => Ok(Value::Bool(self.add_constraint_str(text,ct,rh)?)),
                    None => Ok(Value::Bool(false))
                }
            },
            "setRow" => {
                a.arity(&[2])?;
                let row = a.index(0)?;
                Ok(Value::Bool(self.set_row(row,&a.numbers(1)?)?))
            },
            "setRowEx" => {
                a.arity(&[4])?;
                let row = a.index(0)?;
                let count = a.index(1)?;
                let values = a.numbers(2)?;
                let indices = a.indexes(3)?;
                Ok(Value::Bool(self.set_row_ex(row,count,&values,&indices)?))
            },
            "setRowStr" => {
                a.arity(&[2])?;
                let row = a.index(0)?;
                Ok(Value::Bool(self.set_row_str(row,a.string(1)?)?))
            },
            "mat" => {
                let n = a.arity(&[2,3])?;
                let row = a.index(0)?;
                let col = a.index(1)?;
                if n == 2 {
                    Ok(Value::Number(self.mat(row,col)?))
                }
                else {
                    Ok(Value::Bool(self.set_mat(row,col,a.number(2)?)?))
                }
            },
            "bounds" => {
                a.arity(&[3])?;
                let col = a.index(0)?;
                let lower = a.number(1)?;
                let upper = a.number(2)?;
                Ok(Value::Bool(self.set_bounds(col,lower,upper)?))
            },
            "upBound" | "lowBound" => {
                let n = a.arity(&[1,2])?;
                let col = a.index(0)?;
                match (method,n) {
                    ("upBound",1) => Ok(Value::Number(self.upbo(col)?)),
                    ("upBound",_) => Ok(Value::Bool(self.set_upbo(col,a.number(1)?)?)),
                    (_,1)         => Ok(Value::Number(self.lowbo(col)?)),
                    _             => Ok(Value::Bool(self.set_lowbo(col,a.number(1)?)?)),
                }
            },
            "breakAtFirst" => {
                if a.arity(&[0,1])? == 0 {
                    Ok(Value::Bool(self.break_at_first()?))
                }
                else {
                    self.set_break_at_first(a.boolean(0)?)?;
                    Ok(Value::Null)
                }
            },
            "verbose" => {
                if a.arity(&[0,1])? == 0 {
                    Ok(Value::Number(self.verbose()?.code() as f64))
                }
                else {
                    self.set_verbose(verbosity(&a,0)?)?;
                    Ok(Value::Null)
                }
            },
            "timeout" => {
                if a.arity(&[0,1])? == 0 {
                    Ok(Value::Number(self.timeout()? as f64))
                }
                else {
                    let secs = a.number(0)?;
                    self.set_timeout(if secs > 0.0 { secs as u64 } else { 0 })?;
                    Ok(Value::Null)
                }
            },
            "solveSync" => {
                a.arity(&[0])?;
                Ok(Value::Number(self.solve()?.code() as f64))
            },
            "variables" => {
                if a.arity(&[0,1])? == 1 && a.numbers(0).is_err() {
                    return Err(ModelError::Type("First argument should be a Array of Numbers".to_string()));
                }
                Ok(optional(self.variables()?))
            },
            "writeLP" => {
                a.arity(&[1])?;
                Ok(Value::Bool(self.write_lp(a.string(0)?)?))
            },
            "delete" => {
                a.arity(&[0])?;
                self.dispose()?;
                Ok(Value::Null)
            },
            _ => Err(ModelError::Type(format!("unknown method {}", method)))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dummy::{self, DummyEngine};
    use crate::SolveStatus;

    fn num(v : f64) -> Value { Value::from(v) }

    #[test]
    fn construction() {
        let f = dummy::factory();
        let m = make_lp(&f, &[num(0.0), num(3.0)]).unwrap();
        assert_eq!(m.columns().unwrap(), 3);
        assert!(matches!(make_lp(&f, &[num(1.0)]), Err(ModelError::Arity(_))));
        match make_lp(&f, &[Value::from("1"), num(1.0)]) {
            Err(ModelError::Type(msg)) => assert_eq!(msg, "First argument should be a Number"),
            _ => panic!("expected type error")
        }
        assert!(matches!(read_lp(&f, &[Value::from("/nonexistent/x.lp"), num(1.0), Value::from("x")]), Err(ModelError::Io(_))));
        assert!(matches!(read_lp(&f, &[Value::from("x.lp"), num(42.0), Value::from("x")]), Err(ModelError::Type(_))));
    }

    #[test]
    fn queries_and_setters() {
        let m = Model::create(&dummy::factory(), 0, 2).unwrap();
        assert_eq!(m.invoke("name", &[Value::from("lp")]).unwrap(), Value::Bool(true));
        assert_eq!(m.invoke("name", &[]).unwrap(), Value::from("lp"));

        assert_eq!(m.invoke("objFn", &[Value::from(vec![1.0, 2.0])]).unwrap(), Value::Bool(true));
        assert_eq!(m.invoke("obj", &[num(2.0)]).unwrap(), num(2.0));
        assert_eq!(m.invoke("obj", &[num(1.0), num(5.0)]).unwrap(), Value::Bool(true));
        assert_eq!(m.obj_fn().unwrap(), vec![5.0, 2.0]);

        assert_eq!(m.invoke("maxim", &[Value::Bool(true)]).unwrap(), Value::Null);
        assert_eq!(m.invoke("maxim", &[]).unwrap(), Value::Bool(true));

        assert_eq!(m.invoke("constraint", &[Value::from(vec![1.0, 1.0]), num(1.0), num(4.0)]).unwrap(), Value::Bool(true));
        assert_eq!(m.invoke("constraint", &[Value::from(vec![1.0, 1.0]), num(7.0), num(4.0)]).unwrap(), Value::Bool(false));
        assert_eq!(m.invoke("constraintStr", &[Value::from("3 1"), num(2.0), num(1.0)]).unwrap(), Value::Bool(true));
        assert_eq!(m.invoke("constraintEx", &[num(1.0), Value::from(vec![2.0]), Value::from(vec![2.0]), num(3.0), num(0.5)]).unwrap(), Value::Bool(true));
        assert_eq!(m.invoke("rows", &[]).unwrap(), num(3.0));

        assert_eq!(m.invoke("rh", &[num(1.0)]).unwrap(), num(4.0));
        assert_eq!(m.invoke("rh", &[num(1.0), num(6.0)]).unwrap(), Value::Bool(true));
        assert_eq!(m.invoke("rhRange", &[num(1.0), num(2.0)]).unwrap(), Value::Bool(true));
        assert_eq!(m.invoke("rhRange", &[num(1.0)]).unwrap(), num(2.0));
        assert_eq!(m.invoke("rhVec", &[Value::from(vec![1.0, 2.0, 3.0])]).unwrap(), Value::Bool(true));
        assert_eq!(m.rh(3).unwrap(), 3.0);

        assert_eq!(m.invoke("bounds", &[num(1.0), num(1.0), num(3.0)]).unwrap(), Value::Bool(true));
        assert_eq!(m.invoke("upBound", &[num(1.0)]).unwrap(), num(3.0));
        assert_eq!(m.invoke("lowBound", &[num(1.0), num(2.0)]).unwrap(), Value::Bool(true));
        assert_eq!(m.invoke("lowBound", &[num(1.0)]).unwrap(), num(2.0));

        assert_eq!(m.invoke("intVar", &[num(2.0), Value::Bool(true)]).unwrap(), Value::Bool(true));
        assert_eq!(m.invoke("intVar", &[num(2.0)]).unwrap(), Value::Bool(true));
        assert_eq!(m.invoke("binary", &[num(2.0)]).unwrap(), Value::Bool(false));
        assert_eq!(m.invoke("binary", &[num(2.0), Value::Bool(true)]).unwrap(), Value::Bool(true));
        assert_eq!(m.invoke("binary", &[num(2.0)]).unwrap(), Value::Bool(true));

        assert_eq!(m.invoke("breakAtFirst", &[Value::Bool(true)]).unwrap(), Value::Null);
        assert_eq!(m.invoke("breakAtFirst", &[]).unwrap(), Value::Bool(true));
        assert_eq!(m.invoke("verbose", &[num(5.0)]).unwrap(), Value::Null);
        assert_eq!(m.invoke("verbose", &[]).unwrap(), num(5.0));
        assert_eq!(m.invoke("timeout", &[num(10.0)]).unwrap(), Value::Null);
        assert_eq!(m.invoke("timeout", &[]).unwrap(), num(10.0));

        assert_eq!(m.invoke("resize", &[num(1.0), num(2.0)]).unwrap(), Value::Bool(true));
        assert_eq!(m.invoke("rows", &[]).unwrap(), num(1.0));
        assert_eq!(m.invoke("variables", &[]).unwrap(), Value::Null);

        assert_eq!(m.invoke("delete", &[]).unwrap(), Value::Null);
        assert!(matches!(m.invoke("rows", &[]), Err(ModelError::UseAfterDispose)));
    }

    #[test]
    fn argument_errors() {
        let m = Model::create(&dummy::factory(), 1, 2).unwrap();
        assert!(matches!(m.invoke("rows", &[num(1.0)]), Err(ModelError::Arity(_))));
        assert!(matches!(m.invoke("rh", &[]), Err(ModelError::Arity(_))));
        assert!(matches!(m.invoke("constraint", &[Value::Null, num(1.0)]), Err(ModelError::Arity(_))));
        match m.invoke("bounds", &[num(1.0), num(0.0), Value::from("x")]) {
            Err(ModelError::Type(msg)) => assert_eq!(msg, "Third argument should be a Number"),
            _ => panic!("expected type error")
        }
        match m.invoke("objFn", &[Value::from("1 2")]) {
            Err(ModelError::Type(msg)) => assert_eq!(msg, "First argument should be a Array of Numbers or NULL"),
            _ => panic!("expected type error")
        }
        match m.invoke("binary", &[Value::Bool(true)]) {
            Err(ModelError::Type(msg)) => assert_eq!(msg, "Invalid type of arguments"),
            _ => panic!("expected type error")
        }
        assert!(matches!(m.invoke("verbose", &[num(9.0)]), Err(ModelError::Type(_))));
        assert!(matches!(m.invoke("variables", &[Value::from(1.0)]), Err(ModelError::Type(_))));
        assert!(matches!(m.invoke("solve", &[]), Err(ModelError::Type(_))));
        assert!(matches!(m.invoke("upBound", &[num(3.0)]), Err(ModelError::Shape(_))));
        // Nothing was changed by the failed calls.
        assert_eq!(m.bounds(1).unwrap(), (0.0, f64::INFINITY));
    }

    #[test]
    fn row_replacement() {
        let m = Model::create(&dummy::factory(), 0, 3).unwrap();
        m.add_constraint(&[1.0, 2.0, 3.0], ConstraintType::LE, 4.0).unwrap();
        assert_eq!(m.invoke("setRow", &[num(1.0), Value::from(vec![0.0, 5.0, 0.0])]).unwrap(), Value::Bool(true));
        assert_eq!(m.row(1).unwrap(), vec![0.0, 5.0, 0.0]);
        assert_eq!(m.invoke("setRowEx", &[num(1.0), num(2.0), Value::from(vec![7.0, 8.0]), Value::from(vec![1.0, 3.0])]).unwrap(), Value::Bool(true));
        assert_eq!(m.row(1).unwrap(), vec![7.0, 0.0, 8.0]);
        assert_eq!(m.invoke("setRowStr", &[num(1.0), Value::from("1 1 1")]).unwrap(), Value::Bool(true));
        assert_eq!(m.row(1).unwrap(), vec![1.0, 1.0, 1.0]);
        assert_eq!(m.rh(1).unwrap(), 4.0);

        assert_eq!(m.invoke("mat", &[num(1.0), num(2.0), num(-2.0)]).unwrap(), Value::Bool(true));
        assert_eq!(m.invoke("mat", &[num(1.0), num(2.0)]).unwrap(), num(-2.0));
        assert_eq!(m.invoke("mat", &[num(0.0), num(3.0), num(6.0)]).unwrap(), Value::Bool(true));
        assert_eq!(m.obj_fn().unwrap(), vec![0.0, 0.0, 6.0]);

        assert!(matches!(m.invoke("setRow", &[num(2.0), Value::from(vec![1.0, 1.0, 1.0])]), Err(ModelError::Shape(_))));
        assert!(matches!(m.invoke("setRowStr", &[num(1.0)]), Err(ModelError::Arity(_))));
        assert!(matches!(m.invoke("mat", &[num(1.0), num(4.0)]), Err(ModelError::Shape(_))));
    }

    #[test]
    fn solve_sync_returns_code() {
        let f = dummy::scripted(DummyEngine::new().with_status(SolveStatus::Infeasible));
        let m = Model::create(&f, 0, 1).unwrap();
        assert_eq!(m.invoke("solveSync", &[]).unwrap(), num(2.0));

        let f = dummy::scripted(DummyEngine::new().with_status(SolveStatus::Optimal));
        let m = Model::create(&f, 0, 2).unwrap();
        assert_eq!(m.invoke("solveSync", &[]).unwrap(), num(0.0));
        assert_eq!(m.invoke("variables", &[Value::Array(vec![])]).unwrap(), Value::from(vec![0.0, 0.0]));
    }
}
