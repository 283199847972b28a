//! Declarative per-field validation of create and partial-update requests.
//!
//! Each request type lists its fields through [`FieldAccess`], pairing the value the
//! caller supplied (if any) with a static slice of [`FieldRule`]s. [`validate`] walks
//! that table once: absent fields are skipped, every present field must satisfy all of
//! its rules, and every failing field is reported.

mod grades;
mod rules;

use serde::Serialize;
use std::fmt;

use crate::domain::entities::{Grades, Identity, Record, ResourceId, Team};

pub use grades::check_grade_matrix;

/// Role and ownership capabilities a field can require of the caller.
/// Admin satisfies every predicate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessPredicate {
    Admin,
    AdminOrJudge,
    /// Caller is the target user, or a member or the leader of the target team.
    IsOwner,
    /// Caller is the target user.
    IsSelf,
    /// Caller leads the target team.
    IsTeamLeader,
}

impl AccessPredicate {
    pub fn holds(self, ctx: &AccessContext<'_>) -> bool {
        let caller = ctx.identity;
        if caller.is_admin() {
            return true;
        }

        match self {
            AccessPredicate::Admin => false,
            AccessPredicate::AdminOrJudge => caller.is_judge(),
            AccessPredicate::IsSelf => matches!(ctx.target, Target::User(id) if id == caller.id),
            AccessPredicate::IsOwner => match ctx.target {
                Target::User(id) => id == caller.id,
                Target::Team(team) => caller.is_member_of(team.id) || team.leader == caller.id,
                Target::Unscoped => false,
            },
            AccessPredicate::IsTeamLeader => {
                matches!(ctx.target, Target::Team(team) if team.leader == caller.id)
            }
        }
    }

    fn denial(self) -> &'static str {
        match self {
            AccessPredicate::Admin => "only an admin may set this field",
            AccessPredicate::AdminOrJudge => "only an admin or a judge may set this field",
            AccessPredicate::IsOwner => "only the owner may set this field",
            AccessPredicate::IsSelf => "only the user themselves may set this field",
            AccessPredicate::IsTeamLeader => "only the current team leader may set this field",
        }
    }
}

/// Identity-independent shape checks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Constraint {
    NonEmpty,
    /// Inclusive bounds, counted in characters.
    Length { min: usize, max: usize },
    Url,
    EachUrl,
    Range { min: i64, max: i64 },
    /// Grade matrix: scores in range and, for judges, only their own row.
    GradeMatrix,
}

impl Constraint {
    pub fn check(&self, value: &FieldValue<'_>, ctx: &AccessContext<'_>) -> Result<(), String> {
        match (self, value) {
            (Constraint::NonEmpty, FieldValue::Text(text)) => {
                if text.trim().is_empty() {
                    Err("must not be empty".to_string())
                } else {
                    Ok(())
                }
            }
            (Constraint::Length { min, max }, FieldValue::Text(text)) => {
                let len = text.chars().count();
                if len < *min || len > *max {
                    Err(format!("length must be between {} and {} characters", min, max))
                } else {
                    Ok(())
                }
            }
            (Constraint::Url, FieldValue::Text(text)) => check_url(text),
            (Constraint::EachUrl, FieldValue::TextList(items)) => items
                .iter()
                .enumerate()
                .try_for_each(|(i, item)| check_url(item).map_err(|e| format!("item {}: {}", i, e))),
            (Constraint::Range { min, max }, FieldValue::Integer(n)) => {
                if n < min || n > max {
                    Err(format!("must be between {} and {}", min, max))
                } else {
                    Ok(())
                }
            }
            (Constraint::GradeMatrix, FieldValue::Grades(grades)) => {
                check_grade_matrix(grades, ctx.identity)
            }
            (constraint, _) => Err(format!("{:?} does not apply to this value", constraint)),
        }
    }
}

fn check_url(text: &str) -> Result<(), String> {
    match url::Url::parse(text) {
        Ok(parsed) if matches!(parsed.scheme(), "http" | "https") && parsed.has_host() => Ok(()),
        Ok(_) => Err("must be an http(s) URL".to_string()),
        Err(e) => Err(format!("must be a well-formed URL ({})", e)),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldRule {
    Structural(Constraint),
    Access(AccessPredicate),
}

impl FieldRule {
    fn check(&self, value: &FieldValue<'_>, ctx: &AccessContext<'_>) -> Result<(), (ViolationKind, String)> {
        match self {
            FieldRule::Access(predicate) => {
                if predicate.holds(ctx) {
                    Ok(())
                } else {
                    Err((ViolationKind::Access, predicate.denial().to_string()))
                }
            }
            FieldRule::Structural(constraint) => constraint
                .check(value, ctx)
                .map_err(|message| (ViolationKind::Structural, message)),
        }
    }
}

/// The resource a request is aimed at, as far as ownership predicates care.
#[derive(Debug, Clone, Copy)]
pub enum Target<'a> {
    /// Creation or an endpoint with no single target.
    Unscoped,
    User(ResourceId),
    Team(&'a Record<Team>),
}

#[derive(Debug, Clone, Copy)]
pub struct AccessContext<'a> {
    pub identity: &'a Identity,
    pub target: Target<'a>,
}

impl<'a> AccessContext<'a> {
    pub fn new(identity: &'a Identity, target: Target<'a>) -> Self {
        Self { identity, target }
    }
}

/// Borrowed view of a supplied field value.
#[derive(Debug, Clone, Copy)]
pub enum FieldValue<'a> {
    Text(&'a str),
    TextList(&'a [String]),
    Integer(i64),
    Grades(&'a Grades),
    /// Typed values (ids, dates, roles) that only carry access rules.
    Opaque,
}

pub struct FieldSpec<'a> {
    pub name: &'static str,
    /// `None` when the request omits the field.
    pub value: Option<FieldValue<'a>>,
    pub rules: &'static [FieldRule],
}

impl<'a> FieldSpec<'a> {
    pub fn new(name: &'static str, value: Option<FieldValue<'a>>, rules: &'static [FieldRule]) -> Self {
        Self { name, value, rules }
    }
}

/// Implemented by every request that goes through [`validate`].
pub trait FieldAccess {
    fn fields(&self) -> Vec<FieldSpec<'_>>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ViolationKind {
    Structural,
    Access,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldViolation {
    pub field: &'static str,
    pub kind: ViolationKind,
    pub message: String,
}

/// Every field that failed, each with the first rule it broke. Never empty.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub struct ValidationErrors(Vec<FieldViolation>);

impl ValidationErrors {
    pub fn violations(&self) -> &[FieldViolation] {
        &self.0
    }

    pub fn into_violations(self) -> Vec<FieldViolation> {
        self.0
    }

    pub fn has_access_violation(&self) -> bool {
        self.0.iter().any(|v| v.kind == ViolationKind::Access)
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "JSON validation failed: ")?;
        for (i, violation) in self.0.iter().enumerate() {
            if i > 0 {
                write!(f, "; ")?;
            }
            write!(f, "{}: {}", violation.field, violation.message)?;
        }
        Ok(())
    }
}

/// Check `request` against its field table. Nothing about the request may be applied
/// unless this returns `Ok`.
pub fn validate<R>(request: &R, ctx: &AccessContext<'_>) -> Result<(), ValidationErrors>
where
    R: FieldAccess + ?Sized,
{
    let violations: Vec<FieldViolation> = request
        .fields()
        .into_iter()
        .filter_map(|spec| {
            let value = spec.value?;
            spec.rules.iter().find_map(|rule| {
                rule.check(&value, ctx).err().map(|(kind, message)| FieldViolation {
                    field: spec.name,
                    kind,
                    message,
                })
            })
        })
        .collect();

    if violations.is_empty() {
        Ok(())
    } else {
        Err(ValidationErrors(violations))
    }
}
