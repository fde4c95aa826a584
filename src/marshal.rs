//! Conversion of host sequences into the sparse `(subj,cof)` buffers the model storage expects.
//!
//! All buffers come from a [WorkStack] owned by the model. A [Frame] marks the top of the stack
//! when a call starts, and everything allocated through it is released when the frame is dropped,
//! regardless of whether the call returned normally, failed validation or was rejected.
//!
//! Column indexes in the produced buffers are 1-based.

use itertools::izip;
use crate::{ModelError, Result};

/// Working area for marshaling call arguments. Memory is retained between calls, so after warm-up
/// no allocation happens per call.
#[derive(Default)]
pub struct WorkStack {
    subj_buf : Vec<usize>, // index buffers of all open frames
    cof_buf  : Vec<f64>,   // coefficient buffers of all open frames
    subj_len : usize,      // entries of subj_buf in use
    cof_len  : usize,      // entries of cof_buf in use
}

impl WorkStack {
    /// Preallocate room for rows of `cap` nonzeros.
    pub fn new(cap : usize) -> WorkStack {
        WorkStack{
            subj_buf : Vec::with_capacity(cap),
            cof_buf  : Vec::with_capacity(cap),
            subj_len : 0,
            cof_len  : 0 }
    }

    /// Indicates if no buffers are outstanding.
    pub fn is_empty(&self) -> bool {
        self.subj_len == 0 && self.cof_len == 0
    }

    /// Number of integer and float entries currently allocated.
    pub fn outstanding(&self) -> (usize,usize) {
        (self.subj_len,self.cof_len)
    }

    /// Open a frame. All buffers allocated from the frame are released when it is dropped.
    pub fn frame(& mut self) -> Frame<'_> {
        let subj_base = self.subj_len;
        let cof_base = self.cof_len;
        Frame{ ws : self, subj_base, cof_base }
    }
}

/// Buffers of one call. Dropping the frame gives them back to the stack.
pub struct Frame<'a> {
    ws        : &'a mut WorkStack,
    subj_base : usize,
    cof_base  : usize,
}

impl Frame<'_> {
    /// Take `nsubj` index and `ncof` coefficient slots. The contents are unspecified.
    pub fn alloc(& mut self, nsubj : usize, ncof : usize) -> (& mut [usize], & mut [f64]) {
        let ws = & mut *self.ws;
        let (sb,cb) = (ws.subj_len,ws.cof_len);
        ws.subj_len += nsubj;
        ws.cof_len += ncof;
        if ws.subj_buf.len() < ws.subj_len { ws.subj_buf.resize(ws.subj_len,0); }
        if ws.cof_buf.len() < ws.cof_len { ws.cof_buf.resize(ws.cof_len,0.0); }
        let (se,ce) = (ws.subj_len,ws.cof_len);
        (& mut ws.subj_buf[sb..se], & mut ws.cof_buf[cb..ce])
    }
}

impl Drop for Frame<'_> {
    fn drop(& mut self) {
        self.ws.subj_len = self.subj_base;
        self.ws.cof_len = self.cof_base;
    }
}

/// A sparse row: column indexes (1-based) and coefficients of equal length.
#[derive(Clone, Copy, Debug)]
pub struct Row<'a> {
    pub subj : &'a [usize],
    pub cof  : &'a [f64],
}

impl Row<'_> {
    pub fn len(&self) -> usize { self.subj.len() }
    pub fn is_empty(&self) -> bool { self.subj.is_empty() }
}

/// Convert a dense sequence, where element `i` belongs to index `i+1`. Zeros are dropped.
///
/// # Arguments
/// - `values` The dense values, at most `dim` of them.
/// - `dim` Number of columns (or rows) of the target.
pub fn dense<'a>(frame : &'a mut Frame<'_>, values : &[f64], dim : usize) -> Result<Row<'a>> {
    if values.len() > dim {
        return Err(ModelError::Shape(format!("dense sequence of length {} exceeds dimension {}",values.len(),dim)));
    }
    let nnz = values.iter().filter(|&&v| v != 0.0).count();
    let (subj,cof) = frame.alloc(nnz,nnz);
    for ((j,&v),rs,rc) in izip!(values.iter().enumerate().filter(|(_,&v)| v != 0.0),subj.iter_mut(),cof.iter_mut()) {
        *rs = j+1;
        *rc = v;
    }
    Ok(Row{ subj, cof })
}

/// Convert a sparse `(count, values, indices)` triple. The first `count` entries of both
/// sequences are used. Indexes must be unique and within `[1,dim]`.
pub fn sparse<'a>(frame : &'a mut Frame<'_>, count : usize, values : &[f64], indices : &[usize], dim : usize) -> Result<Row<'a>> {
    if values.len() != indices.len() {
        return Err(ModelError::Shape(format!("values and indices differ in length ({} vs {})",values.len(),indices.len())));
    }
    if count > values.len() {
        return Err(ModelError::Shape(format!("count {} exceeds sequence length {}",count,values.len())));
    }
    if let Some(&j) = indices[..count].iter().find(|&&j| j == 0 || j > dim) {
        return Err(ModelError::Shape(format!("index {} out of range [1,{}]",j,dim)));
    }

    // The upper half of the integer buffer is scratch space for the duplicate check.
    let (ubuf,cof) = frame.alloc(2*count,count);
    let (subj,scratch) = ubuf.split_at_mut(count);
    scratch.copy_from_slice(&indices[..count]);
    scratch.sort_unstable();
    if let Some(w) = scratch.windows(2).find(|w| w[0] == w[1]) {
        return Err(ModelError::Shape(format!("duplicate index {}",w[0])));
    }
    subj.copy_from_slice(&indices[..count]);
    cof.copy_from_slice(&values[..count]);

    let subj : &'a [usize] = subj;
    Ok(Row{ subj, cof })
}

/// Convert a textual row, a whitespace separated list of numbers treated as a dense sequence.
pub fn text<'a>(frame : &'a mut Frame<'_>, text : &str, dim : usize) -> Result<Row<'a>> {
    let n = text.split_whitespace().count();
    if n > dim {
        return Err(ModelError::Shape(format!("row expression has {} entries, dimension is {}",n,dim)));
    }
    let (subj,cof) = frame.alloc(n,n);
    let mut nnz = 0;
    for (j,tok) in text.split_whitespace().enumerate() {
        let v : f64 = tok.parse().map_err(|_| ModelError::Shape(format!("invalid number '{}' in row expression",tok)))?;
        if v != 0.0 {
            subj[nnz] = j+1;
            cof[nnz] = v;
            nnz += 1;
        }
    }
    let subj : &'a [usize] = subj;
    let cof : &'a [f64] = cof;
    Ok(Row{ subj : &subj[..nnz], cof : &cof[..nnz] })
}
