//! Reading and writing models in LP format.
//!
//! The supported grammar is the common subset of the lp_solve LP format:
//!
//! ```text
//! /* Objective function */
//! max: 2x + 3y;
//!
//! /* Constraints */
//! c1: x + y <= 4;
//! -2 <= x - y <= 8;
//! R2: >= -1;            // range on an existing row
//!
//! x <= 3;               // a single variable without a label is a bound
//! -1e30 <= y <= 10;
//!
//! int x;
//! bin z;
//! free w;
//! ```
//!
//! Values with magnitude `1e30` or more are infinite.

use std::collections::HashMap;
use std::fmt::{self, Write};

use crate::{ConstraintType, ModelData, ModelError, Result};

const INF : f64 = 1e30;

fn clamp_inf(v : f64) -> f64 {
    if v >= INF { f64::INFINITY }
    else if v <= -INF { f64::NEG_INFINITY }
    else { v }
}

fn trim_zeros(s : String) -> String {
    if s.contains('.') {
        s.trim_end_matches('0').trim_end_matches('.').to_string()
    }
    else {
        s
    }
}

/// Format a number with at most 12 significant digits, like `%.12g`. Infinite values are
/// written as `±1e+30`.
pub fn fmt_num(v : f64) -> String {
    if v.is_infinite() {
        return if v > 0.0 { "1e+30".to_string() } else { "-1e+30".to_string() };
    }
    if v == 0.0 {
        return "0".to_string();
    }
    let sci = format!("{:.11e}", v);
    let (mant,exp) = sci.split_once('e').unwrap_or((sci.as_str(),"0"));
    let exp : i32 = exp.parse().unwrap_or(0);
    if (-5..12).contains(&exp) {
        trim_zeros(format!("{:.*}", (11-exp) as usize, v))
    }
    else {
        format!("{}e{}{:02}", trim_zeros(mant.to_string()), if exp < 0 { '-' } else { '+' }, exp.abs())
    }
}

////////////////////////////////////////////////////////////
// Writer

fn write_terms<W,I>(out : & mut W, data : &ModelData, terms : I) -> fmt::Result
    where W : Write,
          I : IntoIterator<Item=(usize,f64)>
{
    for (k,(j,c)) in terms.into_iter().enumerate() {
        if k > 0 { out.write_char(' ')?; }
        let name = data.col_name(j);
        if c == 1.0 { write!(out,"+{}",name)?; }
        else if c == -1.0 { write!(out,"-{}",name)?; }
        else if c >= 0.0 { write!(out,"+{} {}",fmt_num(c),name)?; }
        else { write!(out,"-{} {}",fmt_num(-c),name)?; }
    }
    Ok(())
}

/// Number of leading columns the objective must list, with zero terms where needed, so that a
/// reader numbering columns by first appearance gets every column back at its index.
fn declared_columns(data : &ModelData) -> usize {
    let n = data.num_cols();
    let rows = (1..=data.num_rows()).flat_map(move |i| {
        let (subj,cof) = data.row(i);
        subj.iter().zip(cof.iter()).filter(|p| *p.1 != 0.0).map(|p| *p.0)
    });
    let bounds = data.columns().filter(|c| !(c.1 == 0.0 && c.2 == f64::INFINITY)).map(|c| c.0);
    let ints = data.columns().filter(|c| c.3).map(|c| c.0);

    let mut first = vec![usize::MAX; n+1];
    for (k,j) in rows.chain(bounds).chain(ints).enumerate() {
        if first[j] == usize::MAX {
            first[j] = k;
        }
    }
    // Columns after `k` already appear in index order further down.
    let mut k = n;
    while k > 0 && first[k] != usize::MAX && (k == n || first[k] < first[k+1]) {
        k -= 1;
    }
    let last_nonzero = data.obj_fn().iter().rposition(|&c| c != 0.0).map_or(0,|j| j+1);
    k.max(last_nonzero)
}

/// A column name the reader accepts as a single identifier.
pub fn is_name(name : &str) -> bool {
    let mut cs = name.chars();
    cs.next().is_some_and(is_ident_start) && cs.all(is_ident_char)
}

/// A row name the reader accepts as a label. Objective keywords would start an objective.
pub fn is_row_name(name : &str) -> bool {
    is_name(name) &&
        !matches!(name.to_ascii_lowercase().as_str(),
                  "max" | "maximize" | "maximise" | "maximum" | "min" | "minimize" | "minimise" | "minimum")
}

/// Write `data` in LP format.
pub fn write<W : Write>(data : &ModelData, out : & mut W) -> fmt::Result {
    if !data.name().is_empty() {
        write!(out,"/* {} */\n\n",data.name())?;
    }

    out.write_str("/* Objective function */\n")?;
    out.write_str(if data.sense_max() { "max: " } else { "min: " })?;
    let ncols = declared_columns(data);
    write_terms(out,data,data.obj_fn()[..ncols].iter().enumerate().map(|(j,&c)| (j+1,c)))?;
    let c0 = data.obj_const();
    if c0 != 0.0 {
        if ncols > 0 { out.write_char(' ')?; }
        write!(out,"{}{}",if c0 > 0.0 { "+" } else { "-" },fmt_num(c0.abs()))?;
    }
    out.write_str(";\n")?;

    if data.num_rows() > 0 {
        out.write_str("\n/* Constraints */\n")?;
        for i in 1..=data.num_rows() {
            let (subj,cof) = data.row(i);
            let nnz = cof.iter().filter(|&&c| c != 0.0).count();
            let ctype = data.constr_type(i);
            let name = data.row_name(i);
            if data.has_row_name(i) || nnz < 2 || data.has_range(i) {
                write!(out,"{}: ",name)?;
            }
            if nnz == 0 {
                out.write_char('0')?;
            }
            else {
                write_terms(out,data,subj.iter().zip(cof.iter()).filter(|p| *p.1 != 0.0).map(|(&j,&c)| (j,c)))?;
            }
            writeln!(out," {} {};",ctype.operator(),fmt_num(data.rh(i)))?;

            if data.has_range(i) {
                let (lo,hi) = data.row_bounds(i);
                match ctype {
                    ConstraintType::LE => writeln!(out,"{}: >= {};",name,fmt_num(lo))?,
                    _                  => writeln!(out,"{}: <= {};",name,fmt_num(hi))?,
                }
            }
        }
    }

    let mut bounds = String::new();
    for (j,lb,ub,_) in data.columns() {
        let name = data.col_name(j);
        if lb == ub {
            writeln!(bounds,"{} = {};",name,fmt_num(lb))?;
        }
        else if lb == 0.0 && ub == f64::INFINITY {
        }
        else if ub == f64::INFINITY {
            writeln!(bounds,"{} >= {};",name,fmt_num(lb))?;
        }
        else if lb == 0.0 {
            writeln!(bounds,"{} <= {};",name,fmt_num(ub))?;
        }
        else {
            writeln!(bounds,"{} <= {} <= {};",fmt_num(lb),name,fmt_num(ub))?;
        }
    }
    if !bounds.is_empty() {
        out.write_str("\n/* Variable bounds */\n")?;
        out.write_str(&bounds)?;
    }

    let ints : Vec<String> = data.columns().filter(|c| c.3).map(|c| data.col_name(c.0)).collect();
    if !ints.is_empty() {
        out.write_str("\n/* Integer definitions */\n")?;
        writeln!(out,"int {};",ints.join(","))?;
    }
    Ok(())
}

pub fn to_string(data : &ModelData) -> String {
    let mut s = String::new();
    // Writing to a String does not fail
    _ = write(data,&mut s);
    s
}

////////////////////////////////////////////////////////////
// Reader

#[derive(Clone, Copy, Debug, PartialEq)]
enum Rel { Le, Ge, Eq }

impl Rel {
    fn flip(self) -> Rel {
        match self { Rel::Le => Rel::Ge, Rel::Ge => Rel::Le, Rel::Eq => Rel::Eq }
    }
    fn ctype(self) -> ConstraintType {
        match self { Rel::Le => ConstraintType::LE, Rel::Ge => ConstraintType::GE, Rel::Eq => ConstraintType::EQ }
    }
}

#[derive(Clone, Debug, PartialEq)]
enum Tok {
    Num(f64),
    Ident(String),
    Rel(Rel),
    Plus,
    Minus,
    Colon,
    Comma,
    Semi,
}

fn is_ident_start(c : char) -> bool {
    c.is_alphabetic() || "_[]{}&#$%~'@^".contains(c)
}

fn is_ident_char(c : char) -> bool {
    is_ident_start(c) || c.is_ascii_digit() || c == '.'
}

/// Split the text into `(token,line)` pairs, dropping comments.
fn tokenize(text : &str) -> Result<Vec<(Tok,usize)>> {
    let cs : Vec<char> = text.chars().collect();
    let mut res = Vec::new();
    let mut line = 1;
    let mut i = 0;
    while i < cs.len() {
        let c = cs[i];
        let next = cs.get(i+1).copied();
        if c == '\n' {
            line += 1;
            i += 1;
        }
        else if c.is_whitespace() {
            i += 1;
        }
        else if c == '/' && next == Some('*') {
            let start = line;
            i += 2;
            loop {
                match (cs.get(i).copied(),cs.get(i+1).copied()) {
                    (Some('*'),Some('/')) => { i += 2; break; },
                    (Some('\n'),_) => { line += 1; i += 1; },
                    (Some(_),_) => i += 1,
                    (None,_) => return Err(ModelError::parse(start,"unterminated comment"))
                }
            }
        }
        else if c == '/' && next == Some('/') {
            while i < cs.len() && cs[i] != '\n' { i += 1; }
        }
        else if c.is_ascii_digit() || (c == '.' && next.is_some_and(|c| c.is_ascii_digit())) {
            let start = i;
            while i < cs.len() && (cs[i].is_ascii_digit() || cs[i] == '.') { i += 1; }
            if i < cs.len() && (cs[i] == 'e' || cs[i] == 'E') {
                let exp_digit = |k : usize| cs.get(k).is_some_and(|c| c.is_ascii_digit());
                if exp_digit(i+1) {
                    i += 1;
                }
                else if matches!(cs.get(i+1).copied(),Some('+') | Some('-')) && exp_digit(i+2) {
                    i += 2;
                }
                while i < cs.len() && cs[i].is_ascii_digit() { i += 1; }
            }
            let s : String = cs[start..i].iter().collect();
            let v : f64 = s.parse().map_err(|_| ModelError::parse(line,format!("invalid number '{}'",s)))?;
            res.push((Tok::Num(v),line));
        }
        else if is_ident_start(c) {
            let start = i;
            while i < cs.len() && is_ident_char(cs[i]) { i += 1; }
            res.push((Tok::Ident(cs[start..i].iter().collect()),line));
        }
        else {
            let (tok,len) = match (c,next) {
                ('<',Some('=')) => (Tok::Rel(Rel::Le),2),
                ('<',_)         => (Tok::Rel(Rel::Le),1),
                ('>',Some('=')) => (Tok::Rel(Rel::Ge),2),
                ('>',_)         => (Tok::Rel(Rel::Ge),1),
                ('=',Some('<')) => (Tok::Rel(Rel::Le),2),
                ('=',Some('>')) => (Tok::Rel(Rel::Ge),2),
                ('=',Some('=')) => (Tok::Rel(Rel::Eq),2),
                ('=',_)         => (Tok::Rel(Rel::Eq),1),
                ('+',_)         => (Tok::Plus,1),
                ('-',_)         => (Tok::Minus,1),
                (':',_)         => (Tok::Colon,1),
                (',',_)         => (Tok::Comma,1),
                (';',_)         => (Tok::Semi,1),
                _ => return Err(ModelError::parse(line,format!("unexpected character '{}'",c)))
            };
            res.push((tok,line));
            i += len;
        }
    }
    Ok(res)
}

/// A linear expression with terms in order of first appearance.
#[derive(Default)]
struct Expr {
    terms    : Vec<(String,f64)>,
    index    : HashMap<String,usize>,
    constant : f64,
}

impl Expr {
    fn add(& mut self, name : &str, c : f64) {
        match self.index.get(name) {
            Some(&k) => self.terms[k].1 += c,
            None => {
                self.index.insert(name.to_string(),self.terms.len());
                self.terms.push((name.to_string(),c));
            }
        }
    }

    fn parse(toks : &[(Tok,usize)], line : usize) -> Result<Expr> {
        let mut e = Expr::default();
        let mut k = 0;
        while k < toks.len() {
            let mut sign = 1.0;
            let mut signed = false;
            while let Some((t,_)) = toks.get(k) {
                match t {
                    Tok::Plus => {},
                    Tok::Minus => sign = -sign,
                    _ => break
                }
                signed = true;
                k += 1;
            }
            if k > 0 && !signed {
                return Err(ModelError::parse(line,"expected '+' or '-' between terms"));
            }
            match toks.get(k) {
                Some((Tok::Num(v),_)) => {
                    k += 1;
                    if let Some((Tok::Ident(name),_)) = toks.get(k) {
                        e.add(name,sign*v);
                        k += 1;
                    }
                    else {
                        e.constant += sign*v;
                    }
                },
                Some((Tok::Ident(name),_)) => {
                    e.add(name,sign);
                    k += 1;
                },
                Some((t,l)) => return Err(ModelError::parse(*l,format!("unexpected {:?}",t))),
                None => return Err(ModelError::parse(line,"expected a number or a variable"))
            }
        }
        Ok(e)
    }

    /// Terms of `self - other`.
    fn subtract_terms(mut self, other : Expr) -> Vec<(String,f64)> {
        for (name,c) in other.terms {
            self.add(&name,-c);
        }
        self.terms
    }
}

struct Reader {
    data : ModelData,
    cols : HashMap<String,usize>,
    rows : HashMap<String,usize>,
    have_objective : bool,
}

impl Reader {
    fn column(& mut self, name : &str) -> usize {
        if let Some(&j) = self.cols.get(name) {
            return j;
        }
        let j = self.data.num_cols()+1;
        let j = if name == format!("C{}",j) {
            self.data.push_column(None)
        }
        else {
            self.data.push_column(Some(name))
        };
        self.cols.insert(name.to_string(),j);
        j
    }

    fn row_index(&self, name : &str) -> Option<usize> {
        self.rows.get(name).copied().or_else(|| {
            name.strip_prefix('R')
                .and_then(|s| s.parse::<usize>().ok())
                .filter(|&i| i >= 1 && i <= self.data.num_rows())
        })
    }

    fn statement(& mut self, toks : &[(Tok,usize)]) -> Result<()> {
        let line = toks[0].1;
        if let [(Tok::Ident(kw),_),(Tok::Colon,_),rest @ ..] = toks {
            let max = match kw.to_ascii_lowercase().as_str() {
                "max" | "maximize" | "maximise" | "maximum" => Some(true),
                "min" | "minimize" | "minimise" | "minimum" => Some(false),
                _ => None
            };
            if let Some(max) = max {
                return self.objective(max,rest,line);
            }
        }
        if let [(Tok::Ident(kw),_),rest @ ..] = toks {
            let kw = kw.to_ascii_lowercase();
            if matches!(kw.as_str(),"int" | "bin" | "free") && matches!(rest.first(),None | Some((Tok::Ident(_),_))) {
                return self.declaration(&kw,rest,line);
            }
        }
        self.constraint(toks,line)
    }

    fn objective(& mut self, max : bool, toks : &[(Tok,usize)], line : usize) -> Result<()> {
        if self.have_objective {
            return Err(ModelError::parse(line,"objective defined twice"));
        }
        self.have_objective = true;
        let e = Expr::parse(toks,line)?;
        self.data.set_sense_max(max);
        for (name,c) in e.terms.iter() {
            let j = self.column(name);
            self.data.set_obj(j,*c);
        }
        self.data.set_obj_const(e.constant);
        Ok(())
    }

    fn declaration(& mut self, kw : &str, toks : &[(Tok,usize)], line : usize) -> Result<()> {
        for (t,l) in toks {
            match t {
                Tok::Comma => {},
                Tok::Ident(name) => {
                    let j = self.column(name);
                    match kw {
                        "int" => self.data.set_int(j,true),
                        "bin" => self.data.set_binary(j,true),
                        _ => {
                            let (_,ub) = self.data.bounds(j);
                            self.data.set_bounds_unchecked(j,f64::NEG_INFINITY,ub);
                        }
                    }
                },
                _ => return Err(ModelError::parse(*l,format!("expected a variable name in '{}' section",kw)))
            }
        }
        if toks.is_empty() {
            return Err(ModelError::parse(line,format!("empty '{}' section",kw)));
        }
        Ok(())
    }

    fn constraint(& mut self, toks : &[(Tok,usize)], line : usize) -> Result<()> {
        let (label,body) = match toks {
            [(Tok::Ident(name),_),(Tok::Colon,_),rest @ ..] => (Some(name.as_str()),rest),
            _ => (None,toks)
        };

        let mut parts = Vec::new();
        let mut ops = Vec::new();
        let mut start = 0;
        for (k,(t,_)) in body.iter().enumerate() {
            if let Tok::Rel(r) = t {
                parts.push(&body[start..k]);
                ops.push(*r);
                start = k+1;
            }
        }
        parts.push(&body[start..]);

        match ops.len() {
            0 => Err(ModelError::parse(line,"expected a relational operator")),
            1 => {
                if parts[1].is_empty() {
                    return Err(ModelError::parse(line,"missing right-hand side"));
                }
                if parts[0].is_empty() {
                    let name = label.ok_or_else(|| ModelError::parse(line,"missing expression"))?;
                    let e = Expr::parse(parts[1],line)?;
                    if !e.terms.is_empty() {
                        return Err(ModelError::parse(line,"a range must be a constant"));
                    }
                    return self.range(name,ops[0],e.constant,line);
                }
                let mut lhs = Expr::parse(parts[0],line)?;
                let mut rhs = Expr::parse(parts[1],line)?;
                let mut op = ops[0];
                if lhs.terms.is_empty() && !rhs.terms.is_empty() {
                    std::mem::swap(&mut lhs,&mut rhs);
                    op = op.flip();
                }
                let value = rhs.constant - lhs.constant;
                let terms = lhs.subtract_terms(rhs);
                self.single(label,terms,op,value,line)
            },
            2 => {
                let lo = Expr::parse(parts[0],line)?;
                let mid = Expr::parse(parts[1],line)?;
                let hi = Expr::parse(parts[2],line)?;
                if !lo.terms.is_empty() || !hi.terms.is_empty() || mid.terms.is_empty() {
                    return Err(ModelError::parse(line,"expected 'constant op expression op constant'"));
                }
                let (a,b) = (lo.constant-mid.constant, hi.constant-mid.constant);
                let (lo,hi) = match (ops[0],ops[1]) {
                    (Rel::Le,Rel::Le) => (a,b),
                    (Rel::Ge,Rel::Ge) => (b,a),
                    _ => return Err(ModelError::parse(line,"operators of a double inequality must agree"))
                };
                self.double(label,mid.terms,lo,hi,line)
            },
            _ => Err(ModelError::parse(line,"too many relational operators"))
        }
    }

    /// `terms op value`: a bound if unlabeled with a single variable, otherwise a row.
    fn single(& mut self, label : Option<&str>, terms : Vec<(String,f64)>, op : Rel, value : f64, line : usize) -> Result<()> {
        if label.is_none() && terms.len() == 1 {
            let (name,c) = &terms[0];
            if *c == 0.0 {
                return Err(ModelError::parse(line,format!("zero coefficient in bound on {}",name)));
            }
            let j = self.column(name);
            let v = clamp_inf(value / c);
            let op = if *c < 0.0 { op.flip() } else { op };
            let (lb,ub) = self.data.bounds(j);
            match op {
                Rel::Ge => self.data.set_bounds_unchecked(j,v,ub),
                Rel::Le => self.data.set_bounds_unchecked(j,lb,v),
                Rel::Eq => self.data.set_bounds_unchecked(j,v,v),
            }
            return Ok(());
        }
        if label.is_none() && terms.is_empty() {
            return Err(ModelError::parse(line,"constraint without variables"));
        }
        self.add_row(label,terms,op.ctype(),clamp_inf(value),line)?;
        Ok(())
    }

    /// `lo <= terms <= hi`.
    fn double(& mut self, label : Option<&str>, terms : Vec<(String,f64)>, lo : f64, hi : f64, line : usize) -> Result<()> {
        let (lo,hi) = (clamp_inf(lo),clamp_inf(hi));
        if label.is_none() && terms.len() == 1 {
            let (name,c) = &terms[0];
            if *c == 0.0 {
                return Err(ModelError::parse(line,format!("zero coefficient in bound on {}",name)));
            }
            let j = self.column(name);
            let (lb,ub) = if *c > 0.0 { (lo / c, hi / c) } else { (hi / c, lo / c) };
            self.data.set_bounds_unchecked(j,lb,ub);
            return Ok(());
        }
        if lo == f64::NEG_INFINITY {
            self.add_row(label,terms,ConstraintType::LE,hi,line)?;
        }
        else if hi == f64::INFINITY || lo == hi {
            let ctype = if lo == hi { ConstraintType::EQ } else { ConstraintType::GE };
            self.add_row(label,terms,ctype,lo,line)?;
        }
        else {
            let i = self.add_row(label,terms,ConstraintType::GE,lo,line)?;
            self.data.set_rh_range(i,hi-lo);
        }
        Ok(())
    }

    fn add_row(& mut self, label : Option<&str>, terms : Vec<(String,f64)>, ctype : ConstraintType, rh : f64, line : usize) -> Result<usize> {
        let i = self.data.num_rows()+1;
        if let Some(name) = label {
            if self.rows.contains_key(name) {
                return Err(ModelError::parse(line,format!("duplicate row name {}",name)));
            }
        }
        let mut row : Vec<(usize,f64)> = terms.iter().map(|(name,c)| (self.column(name),*c)).collect();
        row.sort_by_key(|&(j,_)| j);
        let (subj,cof) : (Vec<usize>,Vec<f64>) = row.into_iter().unzip();
        if !self.data.append_row(&subj,&cof,ctype,rh,false) {
            return Err(ModelError::Allocation(format!("cannot allocate row {}",i)));
        }
        if let Some(name) = label {
            if name != format!("R{}",i) {
                self.data.set_row_name(i,name);
            }
            self.rows.insert(name.to_string(),i);
        }
        Ok(i)
    }

    /// `name: op value` on an existing row.
    fn range(& mut self, name : &str, op : Rel, value : f64, line : usize) -> Result<()> {
        let i = self.row_index(name).ok_or_else(|| ModelError::parse(line,format!("unknown row {}",name)))?;
        let v = clamp_inf(value);
        let rh = self.data.rh(i);
        let empty = || ModelError::parse(line,format!("empty range on row {}",name));
        match (self.data.constr_type(i),op) {
            (_,Rel::Eq) => {
                self.data.set_constr_type(i,ConstraintType::EQ);
                self.data.set_rh(i,v);
                self.data.set_rh_range(i,f64::INFINITY);
            },
            (ConstraintType::LE,Rel::Ge) => {
                if v > rh { return Err(empty()); }
                self.data.set_rh_range(i,rh-v);
            },
            (ConstraintType::GE,Rel::Le) | (ConstraintType::EQ,Rel::Le) => {
                if v < rh { return Err(empty()); }
                self.data.set_rh_range(i,v-rh);
            },
            (ConstraintType::EQ,Rel::Ge) => {
                if v > rh { return Err(empty()); }
                self.data.set_constr_type(i,ConstraintType::LE);
                self.data.set_rh_range(i,rh-v);
            },
            _ => self.data.set_rh(i,v),
        }
        Ok(())
    }
}

/// Parse a model in LP format.
pub fn parse(text : &str) -> Result<ModelData> {
    let toks = tokenize(text)?;
    let mut reader = Reader{
        data : ModelData::default(),
        cols : HashMap::new(),
        rows : HashMap::new(),
        have_objective : false };

    let mut start = 0;
    for (k,(t,_)) in toks.iter().enumerate() {
        if *t == Tok::Semi {
            if k > start {
                reader.statement(&toks[start..k])?;
            }
            start = k+1;
        }
    }
    if let Some((_,line)) = toks.get(start) {
        return Err(ModelError::parse(*line,"missing ';'"));
    }
    Ok(reader.data)
}
