// Copyright (c) 2025 SOLARE S.R.O.
//
// This file is part of GridArb.
//
// Licensed under the Creative Commons Attribution-NonCommercial-NoDerivatives 4.0 International
// (CC BY-NC-ND 4.0). You may use and share this file for non-commercial purposes only and you may not
// create derivatives. See <https://creativecommons.org/licenses/by-nc-nd/4.0/>.
//
// This software is provided "AS IS", without warranty of any kind.
//
// For commercial licensing, please contact: info@solare.cz

//! Solver-independent integer program.
//!
//! The builder emits this; solver backends translate it into whatever their engine
//! wants. Rows are always `Σ coef*x <= rhs` and the objective is always maximised.

use std::fmt::Write as _;

/// Tolerance used when checking an assignment against rows and bounds
pub const FEASIBILITY_TOLERANCE: f64 = 1e-6;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct VarId(usize);

impl VarId {
    pub fn index(self) -> usize {
        self.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VarKind {
    Integer,
    Binary,
}

#[derive(Debug, Clone, PartialEq)]
pub struct VarDef {
    pub name: String,
    pub kind: VarKind,
    pub lower: f64,
    pub upper: f64,
}

/// A `Σ coef*x <= rhs` row
#[derive(Debug, Clone, PartialEq)]
pub struct Constraint {
    pub name: String,
    pub terms: Vec<(VarId, f64)>,
    pub rhs: f64,
}

impl Constraint {
    pub fn lhs(&self, values: &[f64]) -> f64 {
        dot(&self.terms, values)
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct IntegerProgram {
    variables: Vec<VarDef>,
    constraints: Vec<Constraint>,
    objective: Vec<(VarId, f64)>,
}

impl IntegerProgram {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an integer variable bounded to `[lower, upper]`
    pub fn add_integer(&mut self, name: impl Into<String>, lower: f64, upper: f64) -> VarId {
        self.push_var(VarDef {
            name: name.into(),
            kind: VarKind::Integer,
            lower,
            upper,
        })
    }

    pub fn add_binary(&mut self, name: impl Into<String>) -> VarId {
        self.push_var(VarDef {
            name: name.into(),
            kind: VarKind::Binary,
            lower: 0.0,
            upper: 1.0,
        })
    }

    fn push_var(&mut self, def: VarDef) -> VarId {
        self.variables.push(def);
        VarId(self.variables.len() - 1)
    }

    /// Add `Σ terms <= rhs`
    pub fn add_leq(&mut self, name: impl Into<String>, terms: Vec<(VarId, f64)>, rhs: f64) {
        self.constraints.push(Constraint {
            name: name.into(),
            terms,
            rhs,
        });
    }

    /// Add `coef` to the objective weight of `var`
    pub fn add_objective_term(&mut self, var: VarId, coef: f64) {
        self.objective.push((var, coef));
    }

    pub fn variables(&self) -> &[VarDef] {
        &self.variables
    }

    pub fn var(&self, id: VarId) -> &VarDef {
        &self.variables[id.0]
    }

    pub fn constraints(&self) -> &[Constraint] {
        &self.constraints
    }

    pub fn objective(&self) -> &[(VarId, f64)] {
        &self.objective
    }

    pub fn num_vars(&self) -> usize {
        self.variables.len()
    }

    pub fn num_constraints(&self) -> usize {
        self.constraints.len()
    }

    /// Objective value of an assignment indexed by `VarId`
    pub fn evaluate_objective(&self, values: &[f64]) -> f64 {
        dot(&self.objective, values)
    }

    /// Names of every bound, integrality requirement or row the assignment breaks
    pub fn violations(&self, values: &[f64]) -> Vec<String> {
        let mut broken = Vec::new();
        if values.len() != self.variables.len() {
            broken.push(format!(
                "assignment has {} values for {} variables",
                values.len(),
                self.variables.len()
            ));
            return broken;
        }

        for (def, &value) in self.variables.iter().zip(values) {
            if value < def.lower - FEASIBILITY_TOLERANCE || value > def.upper + FEASIBILITY_TOLERANCE {
                broken.push(format!("bound:{}", def.name));
            }
            if (value - value.round()).abs() > FEASIBILITY_TOLERANCE {
                broken.push(format!("integrality:{}", def.name));
            }
        }

        for row in &self.constraints {
            if row.lhs(values) > row.rhs + FEASIBILITY_TOLERANCE {
                broken.push(row.name.clone());
            }
        }

        broken
    }

    pub fn is_feasible(&self, values: &[f64]) -> bool {
        self.violations(values).is_empty()
    }

    /// Render in CPLEX LP format.
    ///
    /// Names are sanitised and suffixed with their index so distinct ids never
    /// collapse onto the same LP name.
    pub fn to_lp_string(&self) -> String {
        let var_name = |i: usize| lp_name(&self.variables[i].name, i);

        let mut out = String::new();
        out.push_str("\\ GridArb integer program\nMaximize\n obj:");
        write_terms(&mut out, &self.objective, &var_name);
        out.push_str("\nSubject To\n");
        for (i, row) in self.constraints.iter().enumerate() {
            let _ = write!(out, " {}:", lp_name(&row.name, i));
            write_terms(&mut out, &row.terms, &var_name);
            let _ = writeln!(out, " <= {}", row.rhs);
        }

        out.push_str("Bounds\n");
        for (i, def) in self.variables.iter().enumerate() {
            if def.kind == VarKind::Integer {
                let _ = writeln!(out, " {} <= {} <= {}", def.lower, var_name(i), def.upper);
            }
        }

        for (section, kind) in [("General", VarKind::Integer), ("Binary", VarKind::Binary)] {
            let names: Vec<String> = (0..self.variables.len())
                .filter(|&i| self.variables[i].kind == kind)
                .map(var_name)
                .collect();
            if !names.is_empty() {
                let _ = writeln!(out, "{section}\n {}", names.join(" "));
            }
        }

        out.push_str("End\n");
        out
    }
}

fn dot(terms: &[(VarId, f64)], values: &[f64]) -> f64 {
    terms
        .iter()
        .map(|&(id, coef)| coef * values.get(id.0).copied().unwrap_or(0.0))
        .sum()
}

fn write_terms(out: &mut String, terms: &[(VarId, f64)], var_name: &impl Fn(usize) -> String) {
    if terms.is_empty() {
        out.push_str(" 0");
        return;
    }
    for &(id, coef) in terms {
        let sign = if coef < 0.0 { '-' } else { '+' };
        let _ = write!(out, " {sign} {} {}", coef.abs(), var_name(id.0));
    }
}

// LP format forbids a few characters that show up in site ids; the index suffix
// keeps names unique after sanitising
fn lp_name(name: &str, index: usize) -> String {
    let mut out: String = name
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || "_.[]".contains(c) { c } else { '_' })
        .collect();
    let _ = write!(out, "_{index}");
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn small() -> (IntegerProgram, VarId, VarId) {
        let mut program = IntegerProgram::new();
        let a = program.add_integer("x[a]", 0.0, 4.0);
        let y = program.add_binary("y[1]");
        program.add_leq("cap", vec![(a, 2.0), (y, 3.0)], 8.0);
        program.add_objective_term(a, 5.0);
        program.add_objective_term(y, -1.0);
        (program, a, y)
    }

    #[test]
    fn test_evaluate_and_feasibility() {
        let (program, _, _) = small();
        assert_eq!(program.num_vars(), 2);
        assert_eq!(program.num_constraints(), 1);

        assert!(program.is_feasible(&[4.0, 0.0]));
        assert!((program.evaluate_objective(&[4.0, 0.0]) - 20.0).abs() < 1e-9);

        assert_eq!(program.violations(&[4.0, 1.0]), vec!["cap".to_owned()]);
        assert_eq!(program.violations(&[5.0, 0.0]), vec!["bound:x[a]".to_owned()]);
        assert_eq!(
            program.violations(&[1.5, 0.0]),
            vec!["integrality:x[a]".to_owned()]
        );
        assert_eq!(program.violations(&[1.0]).len(), 1);
    }

    #[test]
    fn test_lp_string_lists_sections() {
        let (program, _, _) = small();
        let lp = program.to_lp_string();
        assert!(lp.starts_with("\\ GridArb"));
        assert!(lp.contains("Maximize\n obj: + 5 x[a]_0 - 1 y[1]_1"));
        assert!(lp.contains(" cap_0: + 2 x[a]_0 + 3 y[1]_1 <= 8"));
        assert!(lp.contains(" 0 <= x[a]_0 <= 4"));
        assert!(lp.contains("General\n x[a]_0"));
        assert!(lp.contains("Binary\n y[1]_1"));
        assert!(lp.ends_with("End\n"));
    }

    #[test]
    fn test_lp_names_are_sanitised() {
        assert_eq!(lp_name("x[Site A,air,0]", 3), "x[Site_A_air_0]_3");
    }

    #[test]
    fn test_lp_names_stay_distinct_after_sanitising() {
        // site "a,b" with device "c" and site "a" with device "b,c"
        let mut program = IntegerProgram::new();
        let first = program.add_integer("x[a,b,c]", 0.0, 1.0);
        let second = program.add_integer("x[a,b,c]", 0.0, 1.0);
        program.add_objective_term(first, 1.0);
        program.add_objective_term(second, 1.0);
        program.add_leq("cap[a b]", vec![(first, 1.0)], 1.0);
        program.add_leq("cap[a,b]", vec![(second, 1.0)], 1.0);

        let lp = program.to_lp_string();
        assert!(lp.contains("obj: + 1 x[a_b_c]_0 + 1 x[a_b_c]_1"));
        assert!(lp.contains(" cap[a_b]_0: + 1 x[a_b_c]_0 <= 1"));
        assert!(lp.contains(" cap[a_b]_1: + 1 x[a_b_c]_1 <= 1"));
        assert!(lp.contains("General\n x[a_b_c]_0 x[a_b_c]_1"));
    }
}
