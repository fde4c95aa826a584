//! Storage of the problem data of a model.
//!
//! Constraint rows are stored in compressed sparse row format, contiguous and in row order.
//! Appending grows `a_subj`/`a_cof` at the end, replacing a row shifts the rows after it, and
//! [ModelData::resize] compacts the arrays when shrinking.
//!
//! Operations that the engine would reject return `false` and leave the data unchanged. Index
//! validation is done by the caller.

use std::collections::TryReserveError;
use itertools::izip;
use crate::ConstraintType;

/// Lower and upper bound of a column.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Element {
    pub lb : f64,
    pub ub : f64,
}

impl Default for Element {
    fn default() -> Self { Element{ lb : 0.0, ub : f64::INFINITY } }
}

/// Kind of a column. A binary column is an integer column with bounds exactly `[0,1]`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum VariableKind {
    Continuous,
    Integer,
    Binary,
}

#[derive(Clone, Debug)]
struct RowInfo {
    ctype : ConstraintType,
    rh    : f64,
    range : Option<f64>,
    name  : Option<String>,
}

impl Default for RowInfo {
    fn default() -> Self { RowInfo{ ctype : ConstraintType::LE, rh : 0.0, range : None, name : None } }
}

#[derive(Clone, Debug, Default)]
pub struct ModelData {
    name      : String,
    sense_max : bool,

    c         : Vec<f64>,
    c_fix     : f64,

    var_elt   : Vec<Element>,
    var_int   : Vec<bool>,
    var_name  : Vec<Option<String>>,

    a_ptr     : Vec<[usize;2]>, // [start,length] into a_subj/a_cof
    a_subj    : Vec<usize>,     // 1-based column indexes
    a_cof     : Vec<f64>,
    con       : Vec<RowInfo>,

    /// Rows from this index on may have unsorted column indexes.
    sorted_upto : usize,
}

impl ModelData {
    /// Create data for `rows` empty `<= 0` rows and `cols` continuous columns.
    pub fn new(rows : usize, cols : usize) -> Result<ModelData,String> {
        let mut data = ModelData::default();
        if !data.resize(rows,cols) {
            return Err(format!("cannot allocate a model of {} rows and {} columns",rows,cols));
        }
        Ok(data)
    }

    pub fn name(&self) -> &str { self.name.as_str() }
    pub fn set_name(& mut self, name : &str) { self.name = name.to_string(); }

    pub fn num_rows(&self) -> usize { self.a_ptr.len() }
    pub fn num_cols(&self) -> usize { self.var_elt.len() }

    fn reserve(& mut self, rows : usize, cols : usize) -> Result<(),TryReserveError> {
        let addrows = rows.saturating_sub(self.num_rows());
        let addcols = cols.saturating_sub(self.num_cols());
        self.a_ptr.try_reserve(addrows)?;
        self.con.try_reserve(addrows)?;
        self.c.try_reserve(addcols)?;
        self.var_elt.try_reserve(addcols)?;
        self.var_int.try_reserve(addcols)?;
        self.var_name.try_reserve(addcols)?;
        Ok(())
    }

    /// Set the exact dimensions. Growing adds empty `<= 0` rows and continuous columns with
    /// default bounds; shrinking drops rows, columns and all coefficients outside the new
    /// dimensions. Returns false if the storage cannot be allocated.
    pub fn resize(& mut self, rows : usize, cols : usize) -> bool {
        if self.reserve(rows,cols).is_err() {
            return false;
        }

        if cols < self.num_cols() {
            self.c.truncate(cols);
            self.var_elt.truncate(cols);
            self.var_int.truncate(cols);
            self.var_name.truncate(cols);
        }
        else {
            self.c.resize(cols,0.0);
            self.var_elt.resize(cols,Element::default());
            self.var_int.resize(cols,false);
            self.var_name.resize(cols,None);
        }

        if rows < self.num_rows() {
            self.a_ptr.truncate(rows);
            self.con.truncate(rows);
            self.sorted_upto = self.sorted_upto.min(rows);
        }

        // Compact the row storage, dropping removed rows and out-of-range columns.
        let mut nz = 0;
        for p in self.a_ptr.iter_mut() {
            let [pb,pn] = *p;
            let start = nz;
            for k in pb..pb+pn {
                if self.a_subj[k] <= cols {
                    self.a_subj[nz] = self.a_subj[k];
                    self.a_cof[nz]  = self.a_cof[k];
                    nz += 1;
                }
            }
            *p = [start,nz-start];
        }
        self.a_subj.truncate(nz);
        self.a_cof.truncate(nz);

        while self.num_rows() < rows {
            self.a_ptr.push([nz,0]);
            self.con.push(RowInfo::default());
        }
        true
    }

    /// Append a column with default bounds and return its 1-based index.
    pub fn push_column(& mut self, name : Option<&str>) -> usize {
        self.c.push(0.0);
        self.var_elt.push(Element::default());
        self.var_int.push(false);
        self.var_name.push(name.map(|s| s.to_string()));
        self.num_cols()
    }

    ////////////////////////////////////////////////////////////
    // Objective

    pub fn sense_max(&self) -> bool { self.sense_max }
    pub fn set_sense_max(& mut self, max : bool) { self.sense_max = max; }

    /// Dense objective, one coefficient per column.
    pub fn obj_fn(&self) -> &[f64] { self.c.as_slice() }
    pub fn obj(&self, j : usize) -> f64 { self.c[j-1] }
    pub fn set_obj(& mut self, j : usize, v : f64) { self.c[j-1] = v; }
    pub fn obj_const(&self) -> f64 { self.c_fix }
    pub fn set_obj_const(& mut self, v : f64) { self.c_fix = v; }

    /// Replace all objective coefficients; columns not in `subj` get zero.
    pub fn set_obj_fn(& mut self, subj : &[usize], cof : &[f64]) {
        self.c.iter_mut().for_each(|c| *c = 0.0);
        for (&j,&v) in subj.iter().zip(cof.iter()) {
            self.c[j-1] = v;
        }
    }

    ////////////////////////////////////////////////////////////
    // Constraints

    /// Append a row. Unless `defer_sort` is set, the row is stored with sorted column indexes.
    /// Returns false if storage cannot be allocated.
    pub fn append_row(& mut self, subj : &[usize], cof : &[f64], ctype : ConstraintType, rh : f64, defer_sort : bool) -> bool {
        if self.a_ptr.try_reserve(1).is_err() ||
           self.con.try_reserve(1).is_err() ||
           self.a_subj.try_reserve(subj.len()).is_err() ||
           self.a_cof.try_reserve(cof.len()).is_err() {
            return false;
        }
        let start = self.a_subj.len();
        self.a_subj.extend_from_slice(subj);
        self.a_cof.extend_from_slice(cof);
        self.a_ptr.push([start,subj.len()]);
        self.con.push(RowInfo{ ctype, rh, range : None, name : None });

        if self.sorted_upto == self.num_rows()-1 && !defer_sort {
            self.sort_row(self.num_rows()-1);
            self.sorted_upto = self.num_rows();
        }
        true
    }

    fn sort_row(& mut self, i : usize) {
        let [pb,pn] = self.a_ptr[i];
        let subj = &self.a_subj[pb..pb+pn];
        if subj.windows(2).all(|w| w[0] < w[1]) {
            return;
        }
        let mut perm : Vec<usize> = (0..pn).collect();
        perm.sort_by_key(|&k| subj[k]);
        let rsubj : Vec<usize> = perm.iter().map(|&k| subj[k]).collect();
        let rcof  : Vec<f64>   = perm.iter().map(|&k| self.a_cof[pb+k]).collect();
        self.a_subj[pb..pb+pn].copy_from_slice(&rsubj);
        self.a_cof[pb..pb+pn].copy_from_slice(&rcof);
    }

    /// Sort the column indexes of all rows appended with deferred sorting.
    pub fn normalize(& mut self) {
        for i in self.sorted_upto..self.num_rows() {
            self.sort_row(i);
        }
        self.sorted_upto = self.num_rows();
    }

    pub fn is_normalized(&self) -> bool { self.sorted_upto == self.num_rows() }

    /// Sparse row `i` as `(subj,cof)`.
    pub fn row(&self, i : usize) -> (&[usize],&[f64]) {
        let [pb,pn] = self.a_ptr[i-1];
        (&self.a_subj[pb..pb+pn], &self.a_cof[pb..pb+pn])
    }

    /// Row `i` as a dense vector of length `num_cols()`.
    pub fn row_dense(&self, i : usize) -> Vec<f64> {
        let mut res = vec![0.0; self.num_cols()];
        let (subj,cof) = self.row(i);
        for (&j,&v) in subj.iter().zip(cof.iter()) {
            res[j-1] = v;
        }
        res
    }

    /// Coefficient of column `j` in row `i`.
    pub fn mat(&self, i : usize, j : usize) -> f64 {
        let (subj,cof) = self.row(i);
        subj.iter().position(|&k| k == j).map_or(0.0,|k| cof[k])
    }

    /// Replace the coefficients of row `i`, keeping its type, right-hand side and range. Returns
    /// false if storage cannot be allocated.
    pub fn set_row(& mut self, i : usize, subj : &[usize], cof : &[f64]) -> bool {
        let [pb,pn] = self.a_ptr[i-1];
        let n = subj.len();
        if n > pn && (self.a_subj.try_reserve(n-pn).is_err() || self.a_cof.try_reserve(n-pn).is_err()) {
            return false;
        }
        self.a_subj.splice(pb..pb+pn,subj.iter().copied());
        self.a_cof.splice(pb..pb+pn,cof.iter().copied());
        self.a_ptr[i-1] = [pb,n];
        for p in self.a_ptr[i..].iter_mut() {
            p[0] = p[0] + n - pn;
        }
        self.sort_row(i-1);
        true
    }

    /// Set the coefficient of column `j` in row `i`. A zero removes the entry.
    pub fn set_mat(& mut self, i : usize, j : usize, v : f64) -> bool {
        let (subj,cof) = self.row(i);
        let mut entries : Vec<(usize,f64)> = subj.iter().copied().zip(cof.iter().copied()).filter(|e| e.0 != j).collect();
        if v != 0.0 {
            entries.push((j,v));
        }
        let (subj,cof) : (Vec<usize>,Vec<f64>) = entries.into_iter().unzip();
        self.set_row(i,&subj,&cof)
    }

    pub fn constr_type(&self, i : usize) -> ConstraintType { self.con[i-1].ctype }
    pub fn set_constr_type(& mut self, i : usize, ctype : ConstraintType) { self.con[i-1].ctype = ctype; }

    pub fn rh(&self, i : usize) -> f64 { self.con[i-1].rh }
    pub fn set_rh(& mut self, i : usize, v : f64) { self.con[i-1].rh = v; }

    /// Replace all right-hand sides; rows not in `subj` get zero.
    pub fn set_rh_vec(& mut self, subj : &[usize], cof : &[f64]) {
        self.con.iter_mut().for_each(|r| r.rh = 0.0);
        for (&i,&v) in subj.iter().zip(cof.iter()) {
            self.con[i-1].rh = v;
        }
    }

    /// The range of row `i`. An unranged `<=` or `>=` row has an infinite range, an unranged
    /// equality has range 0.
    pub fn rh_range(&self, i : usize) -> f64 {
        let r = &self.con[i-1];
        match (r.range,r.ctype) {
            (Some(d),_) => d,
            (None,ConstraintType::EQ) => 0.0,
            (None,_) => f64::INFINITY,
        }
    }

    pub fn has_range(&self, i : usize) -> bool { self.con[i-1].range.is_some() }

    /// Set the range of row `i`. An infinite range removes the range. Returns false for NaN.
    pub fn set_rh_range(& mut self, i : usize, d : f64) -> bool {
        if d.is_nan() {
            return false;
        }
        self.con[i-1].range = if d.is_infinite() { None } else { Some(d.abs()) };
        true
    }

    /// Effective `(lower,upper)` bounds of the activity of row `i`.
    ///
    /// A `<=` row with right-hand side `b` and range `d` gives `[b-d,b]`, a `>=` or `=` row gives
    /// `[b,b+d]`.
    pub fn row_bounds(&self, i : usize) -> (f64,f64) {
        let r = &self.con[i-1];
        match r.ctype {
            ConstraintType::LE => (r.range.map(|d| r.rh-d).unwrap_or(f64::NEG_INFINITY), r.rh),
            ConstraintType::GE => (r.rh, r.range.map(|d| r.rh+d).unwrap_or(f64::INFINITY)),
            ConstraintType::EQ => (r.rh, r.rh+r.range.unwrap_or(0.0)),
        }
    }

    /// Name of row `i`, `R<i>` unless set explicitly.
    pub fn row_name(&self, i : usize) -> String {
        self.con[i-1].name.clone().unwrap_or_else(|| format!("R{}",i))
    }
    pub fn has_row_name(&self, i : usize) -> bool { self.con[i-1].name.is_some() }
    pub fn set_row_name(& mut self, i : usize, name : &str) { self.con[i-1].name = Some(name.to_string()); }

    ////////////////////////////////////////////////////////////
    // Columns

    pub fn bounds(&self, j : usize) -> (f64,f64) {
        let e = self.var_elt[j-1];
        (e.lb,e.ub)
    }

    /// Set both bounds. Returns false if `lb > ub` (or either is NaN).
    pub fn set_bounds(& mut self, j : usize, lb : f64, ub : f64) -> bool {
        if !(lb <= ub) {
            return false;
        }
        self.var_elt[j-1] = Element{ lb, ub };
        true
    }

    /// Set the lower bound. Returns false if it would exceed the upper bound.
    pub fn set_lower(& mut self, j : usize, lb : f64) -> bool {
        let ub = self.var_elt[j-1].ub;
        self.set_bounds(j,lb,ub)
    }

    /// Set the upper bound. Returns false if it would be below the lower bound.
    pub fn set_upper(& mut self, j : usize, ub : f64) -> bool {
        let lb = self.var_elt[j-1].lb;
        self.set_bounds(j,lb,ub)
    }

    /// Set bounds without checking consistency. Used when reading files, where crossing bounds
    /// simply make the model infeasible.
    pub(crate) fn set_bounds_unchecked(& mut self, j : usize, lb : f64, ub : f64) {
        self.var_elt[j-1] = Element{ lb, ub };
    }

    pub fn is_int(&self, j : usize) -> bool { self.var_int[j-1] }
    pub fn set_int(& mut self, j : usize, int : bool) { self.var_int[j-1] = int; }

    pub fn is_binary(&self, j : usize) -> bool {
        self.var_int[j-1] && self.var_elt[j-1] == Element{ lb : 0.0, ub : 1.0 }
    }

    /// Make column `j` binary (integer with bounds `[0,1]`), or clear the integer flag.
    pub fn set_binary(& mut self, j : usize, bin : bool) {
        self.var_int[j-1] = bin;
        if bin {
            self.var_elt[j-1] = Element{ lb : 0.0, ub : 1.0 };
        }
    }

    pub fn kind(&self, j : usize) -> VariableKind {
        if self.is_binary(j) { VariableKind::Binary }
        else if self.is_int(j) { VariableKind::Integer }
        else { VariableKind::Continuous }
    }

    pub fn has_integers(&self) -> bool { self.var_int.iter().any(|&b| b) }

    /// Name of column `j`, `C<j>` unless set explicitly.
    pub fn col_name(&self, j : usize) -> String {
        self.var_name[j-1].clone().unwrap_or_else(|| format!("C{}",j))
    }
    pub fn set_col_name(& mut self, j : usize, name : &str) { self.var_name[j-1] = Some(name.to_string()); }

    /// Iterate over all columns as `(j,lb,ub,int)`.
    pub fn columns(&self) -> impl Iterator<Item=(usize,f64,f64,bool)> + '_ {
        izip!(1..,self.var_elt.iter(),self.var_int.iter()).map(|(j,e,&int)| (j,e.lb,e.ub,int))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> ModelData {
        let mut d = ModelData::new(0,3).unwrap();
        assert!(d.append_row(&[3,1], &[2.0,1.0], ConstraintType::LE, 4.0, false));
        assert!(d.append_row(&[2], &[5.0], ConstraintType::GE, 1.0, false));
        d
    }

    #[test]
    fn rows_are_sorted() {
        let d = sample();
        assert_eq!(d.row(1), (&[1usize,3][..], &[1.0,2.0][..]));
        assert_eq!(d.row_dense(1), vec![1.0,0.0,2.0]);
        assert!(d.is_normalized());
    }

    #[test]
    fn deferred_sorting() {
        let mut d = ModelData::new(0,3).unwrap();
        assert!(d.append_row(&[3,1], &[2.0,1.0], ConstraintType::LE, 4.0, true));
        assert!(d.append_row(&[2,1], &[2.0,1.0], ConstraintType::LE, 4.0, false));
        assert!(!d.is_normalized());
        assert_eq!(d.row_dense(1), vec![1.0,0.0,2.0]);
        d.normalize();
        assert!(d.is_normalized());
        assert_eq!(d.row(1).0, &[1,3]);
        assert_eq!(d.row(2).0, &[1,2]);
    }

    #[test]
    fn resize_exact() {
        let mut d = sample();
        assert!(d.resize(4,5));
        assert_eq!((d.num_rows(),d.num_cols()), (4,5));
        assert_eq!(d.row_bounds(3), (f64::NEG_INFINITY,0.0));
        assert!(d.row(4).0.is_empty());

        assert!(d.resize(1,2));
        assert_eq!((d.num_rows(),d.num_cols()), (1,2));
        assert_eq!(d.row(1), (&[1usize][..], &[1.0][..]));
        assert_eq!(d.obj_fn().len(), 2);

        assert!(d.resize(0,0));
        assert_eq!((d.num_rows(),d.num_cols()), (0,0));
    }

    #[test]
    fn replace_rows() {
        let mut d = sample();
        assert!(d.append_row(&[1,2], &[1.0,1.0], ConstraintType::EQ, 3.0, false));

        // Longer and shorter replacements shift the rows after them.
        assert!(d.set_row(1,&[3,2,1],&[6.0,5.0,4.0]));
        assert_eq!(d.row(1), (&[1usize,2,3][..], &[4.0,5.0,6.0][..]));
        assert_eq!(d.row(2), (&[2usize][..], &[5.0][..]));
        assert_eq!(d.row(3), (&[1usize,2][..], &[1.0,1.0][..]));
        assert!(d.set_row(2,&[],&[]));
        assert!(d.row(2).0.is_empty());
        assert_eq!(d.row_dense(3), vec![1.0,1.0,0.0]);
        assert_eq!((d.constr_type(1),d.rh(1)), (ConstraintType::LE,4.0));

        assert!(d.set_mat(2,3,-1.0));
        assert!(d.set_mat(3,1,0.0));
        assert!(d.set_mat(1,2,7.0));
        assert_eq!(d.row_dense(1), vec![4.0,7.0,6.0]);
        assert_eq!(d.row(2), (&[3usize][..], &[-1.0][..]));
        assert_eq!(d.row(3), (&[2usize][..], &[1.0][..]));
        assert_eq!((d.mat(1,2),d.mat(3,1)), (7.0,0.0));

        assert!(d.resize(3,2));
        assert_eq!(d.row_dense(1), vec![4.0,7.0]);
        assert!(d.row(2).0.is_empty());
        assert_eq!(d.row(3), (&[2usize][..], &[1.0][..]));
    }

    #[test]
    fn bounds() {
        let mut d = ModelData::new(0,1).unwrap();
        assert_eq!(d.bounds(1), (0.0,f64::INFINITY));
        assert!(d.set_bounds(1,-1.0,3.0));
        assert!(!d.set_bounds(1,4.0,3.0));
        assert_eq!(d.bounds(1), (-1.0,3.0));
        assert!(!d.set_lower(1,5.0));
        assert!(!d.set_upper(1,-2.0));
        assert!(d.set_upper(1,-1.0));
        assert_eq!(d.bounds(1), (-1.0,-1.0));
    }

    #[test]
    fn kinds() {
        let mut d = ModelData::new(0,2).unwrap();
        assert_eq!(d.kind(1), VariableKind::Continuous);
        d.set_binary(1,true);
        assert_eq!(d.kind(1), VariableKind::Binary);
        assert_eq!(d.bounds(1), (0.0,1.0));
        d.set_binary(1,false);
        assert_eq!(d.kind(1), VariableKind::Continuous);
        d.set_int(2,true);
        assert_eq!(d.kind(2), VariableKind::Integer);
        assert!(d.has_integers());
    }

    #[test]
    fn ranges() {
        let mut d = sample();
        assert_eq!(d.rh_range(1), f64::INFINITY);
        assert!(d.set_rh_range(1,6.0));
        assert_eq!(d.rh_range(1), 6.0);
        assert_eq!(d.row_bounds(1), (-2.0,4.0));
        assert!(d.set_rh_range(2,-3.0));
        assert_eq!(d.row_bounds(2), (1.0,4.0));
        assert!(!d.set_rh_range(2,f64::NAN));
        assert!(d.set_rh_range(2,f64::INFINITY));
        assert_eq!(d.row_bounds(2), (1.0,f64::INFINITY));
    }

    #[test]
    fn names() {
        let mut d = sample();
        assert_eq!(d.row_name(2), "R2");
        assert_eq!(d.col_name(3), "C3");
        d.set_col_name(3,"z");
        assert_eq!(d.col_name(3), "z");
        assert!(!d.has_row_name(1));
    }
}
