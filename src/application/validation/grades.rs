use super::{AccessContext, Constraint, FieldValue, Target};
use crate::domain::entities::{Grades, Identity, MAX_GRADE, MIN_GRADE};

const SCORE: Constraint = Constraint::Range {
    min: MIN_GRADE as i64,
    max: MAX_GRADE as i64,
};

/// Every score must lie within the grade range, and a judge may only submit the row
/// keyed by their own id. Admins may write any row.
pub fn check_grade_matrix(grades: &Grades, caller: &Identity) -> Result<(), String> {
    if !caller.is_admin() {
        if let Some(judge) = grades.keys().find(|judge| **judge != caller.id) {
            return Err(format!("cannot submit scores on behalf of judge {}", judge));
        }
    }

    let ctx = AccessContext::new(caller, Target::Unscoped);
    for (judge, row) in grades {
        for (member, score) in row {
            SCORE
                .check(&FieldValue::Integer(i64::from(*score)), &ctx)
                .map_err(|e| format!("score from {} for {} {}", judge, member, e))?;
        }
    }
    Ok(())
}
