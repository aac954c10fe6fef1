use crate::sorts::SmtSort;
use crate::terms::SmtTerm;

/// Result of a satisfiability check.
#[derive(Debug, Clone, PartialEq)]
pub enum SatResult {
    Sat,
    Unsat,
    Unknown(String),
}

/// Abstract SMT solver interface.
pub trait SmtSolver {
    type Error: std::error::Error;

    /// Declare a new variable.
    fn declare_var(&mut self, name: &str, sort: &SmtSort) -> Result<(), Self::Error>;

    /// Declare an uninterpreted function.
    fn declare_fun(
        &mut self,
        name: &str,
        domain: &[SmtSort],
        range: &SmtSort,
    ) -> Result<(), Self::Error>;

    /// Assert a constraint.
    fn assert(&mut self, term: &SmtTerm) -> Result<(), Self::Error>;

    /// Push a new scope.
    fn push(&mut self) -> Result<(), Self::Error>;

    /// Pop a scope.
    fn pop(&mut self) -> Result<(), Self::Error>;

    /// Check satisfiability.
    fn check_sat(&mut self) -> Result<SatResult, Self::Error>;

    /// Reset the solver state.
    fn reset(&mut self) -> Result<(), Self::Error>;
}

/// Scripted solver for tests: answers `check_sat` from a fixed list and
/// records everything it is asked to do. Lives outside `#[cfg(test)]` so
/// downstream crates can drive the filter without a real backend.
#[derive(Debug, Default)]
pub struct MockSolver {
    script: Vec<SatResult>,
    next: usize,
    pub declared_vars: Vec<(String, SmtSort)>,
    pub declared_funs: Vec<String>,
    pub asserted: Vec<SmtTerm>,
    pub check_sat_calls: usize,
    pub depth: usize,
    pub reset_calls: usize,
}

impl MockSolver {
    /// A solver that answers `Sat` to everything.
    pub fn sat() -> Self {
        Self::scripted(vec![SatResult::Sat])
    }

    /// Answers from `script` in order, repeating the last entry once the
    /// script is exhausted.
    pub fn scripted(script: Vec<SatResult>) -> Self {
        Self {
            script,
            ..Self::default()
        }
    }
}

impl SmtSolver for MockSolver {
    type Error = std::convert::Infallible;

    fn declare_var(&mut self, name: &str, sort: &SmtSort) -> Result<(), Self::Error> {
        self.declared_vars.push((name.to_string(), sort.clone()));
        Ok(())
    }

    fn declare_fun(
        &mut self,
        name: &str,
        _domain: &[SmtSort],
        _range: &SmtSort,
    ) -> Result<(), Self::Error> {
        self.declared_funs.push(name.to_string());
        Ok(())
    }

    fn assert(&mut self, term: &SmtTerm) -> Result<(), Self::Error> {
        self.asserted.push(term.clone());
        Ok(())
    }

    fn push(&mut self) -> Result<(), Self::Error> {
        self.depth += 1;
        Ok(())
    }

    fn pop(&mut self) -> Result<(), Self::Error> {
        self.depth = self.depth.saturating_sub(1);
        Ok(())
    }

    fn check_sat(&mut self) -> Result<SatResult, Self::Error> {
        self.check_sat_calls += 1;
        let idx = self.next.min(self.script.len().saturating_sub(1));
        self.next += 1;
        Ok(self
            .script
            .get(idx)
            .cloned()
            .unwrap_or(SatResult::Sat))
    }

    fn reset(&mut self) -> Result<(), Self::Error> {
        self.reset_calls += 1;
        self.next = 0;
        Ok(())
    }
}
