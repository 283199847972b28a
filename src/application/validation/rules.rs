//! Field tables for every request the API accepts.

use super::AccessPredicate::{Admin, AdminOrJudge, IsOwner, IsSelf, IsTeamLeader};
use super::Constraint::{EachUrl, GradeMatrix, Length, NonEmpty, Url};
use super::FieldRule::{Access, Structural};
use super::{FieldAccess, FieldRule, FieldSpec, FieldValue};
use crate::domain::entities::{
    Case, CasePatch, CreateTeamRequest, Criterion, CriterionPatch, Event, EventPatch, TeamPatch,
    UserPatch,
};

const USER_NAME: &[FieldRule] = &[Access(IsSelf), Structural(Length { min: 1, max: 20 })];
const USER_BIRTHDATE: &[FieldRule] = &[Access(IsSelf)];
const USER_ROLE: &[FieldRule] = &[Access(Admin)];
const USER_TEAM: &[FieldRule] = &[Access(IsSelf)];

const TEAM_NAME: &[FieldRule] = &[Structural(Length { min: 1, max: 20 })];
const TEAM_NAME_PATCH: &[FieldRule] = &[Access(IsOwner), Structural(Length { min: 1, max: 20 })];
const TEAM_LEADER: &[FieldRule] = &[Access(IsTeamLeader)];
const TEAM_REPOS: &[FieldRule] = &[Access(IsOwner), Structural(EachUrl)];
const TEAM_PRESENTATION: &[FieldRule] = &[Access(IsOwner), Structural(Url)];
const TEAM_GRADES: &[FieldRule] = &[Access(AdminOrJudge), Structural(GradeMatrix)];

const CASE_NAME: &[FieldRule] = &[Structural(Length { min: 1, max: 40 })];
const CASE_DESCRIPTION: &[FieldRule] = &[Structural(NonEmpty)];
const CASE_IMAGE: &[FieldRule] = &[Structural(Url)];
const CASE_NAME_PATCH: &[FieldRule] = &[Access(Admin), Structural(Length { min: 1, max: 40 })];
const CASE_DESCRIPTION_PATCH: &[FieldRule] = &[Access(Admin), Structural(NonEmpty)];
const CASE_IMAGE_PATCH: &[FieldRule] = &[Access(Admin), Structural(Url)];

const CRITERION_TEXT: &[FieldRule] = &[Structural(Length { min: 1, max: 40 })];
const CRITERION_TEXT_PATCH: &[FieldRule] = &[Access(Admin), Structural(Length { min: 1, max: 40 })];

const EVENT_NAME: &[FieldRule] = &[Structural(Length { min: 1, max: 20 })];
const EVENT_DESCRIPTION: &[FieldRule] = &[Structural(NonEmpty)];
const EVENT_NAME_PATCH: &[FieldRule] = &[Access(Admin), Structural(Length { min: 1, max: 20 })];
const EVENT_DESCRIPTION_PATCH: &[FieldRule] = &[Access(Admin), Structural(NonEmpty)];
const EVENT_TIME_PATCH: &[FieldRule] = &[Access(Admin)];

fn text(value: &Option<String>) -> Option<FieldValue<'_>> {
    value.as_deref().map(FieldValue::Text)
}

fn opaque<T>(value: &Option<T>) -> Option<FieldValue<'static>> {
    value.as_ref().map(|_| FieldValue::Opaque)
}

impl FieldAccess for UserPatch {
    fn fields(&self) -> Vec<FieldSpec<'_>> {
        vec![
            FieldSpec::new("name", text(&self.name), USER_NAME),
            FieldSpec::new("birthdate", opaque(&self.birthdate), USER_BIRTHDATE),
            FieldSpec::new("role", opaque(&self.role), USER_ROLE),
            FieldSpec::new("team", opaque(&self.team), USER_TEAM),
        ]
    }
}

impl FieldAccess for CreateTeamRequest {
    fn fields(&self) -> Vec<FieldSpec<'_>> {
        vec![FieldSpec::new("name", Some(FieldValue::Text(&self.name)), TEAM_NAME)]
    }
}

impl FieldAccess for TeamPatch {
    fn fields(&self) -> Vec<FieldSpec<'_>> {
        vec![
            FieldSpec::new("name", text(&self.name), TEAM_NAME_PATCH),
            FieldSpec::new("leader", opaque(&self.leader), TEAM_LEADER),
            FieldSpec::new(
                "repos",
                self.repos.as_deref().map(FieldValue::TextList),
                TEAM_REPOS,
            ),
            FieldSpec::new("presentation_uri", text(&self.presentation_uri), TEAM_PRESENTATION),
            FieldSpec::new("grades", self.grades.as_ref().map(FieldValue::Grades), TEAM_GRADES),
        ]
    }
}

impl FieldAccess for Case {
    fn fields(&self) -> Vec<FieldSpec<'_>> {
        vec![
            FieldSpec::new("name", Some(FieldValue::Text(&self.name)), CASE_NAME),
            FieldSpec::new(
                "description",
                Some(FieldValue::Text(&self.description)),
                CASE_DESCRIPTION,
            ),
            FieldSpec::new("image_uri", text(&self.image_uri), CASE_IMAGE),
        ]
    }
}

impl FieldAccess for CasePatch {
    fn fields(&self) -> Vec<FieldSpec<'_>> {
        vec![
            FieldSpec::new("name", text(&self.name), CASE_NAME_PATCH),
            FieldSpec::new("description", text(&self.description), CASE_DESCRIPTION_PATCH),
            FieldSpec::new("image_uri", text(&self.image_uri), CASE_IMAGE_PATCH),
        ]
    }
}

impl FieldAccess for Criterion {
    fn fields(&self) -> Vec<FieldSpec<'_>> {
        vec![FieldSpec::new("text", Some(FieldValue::Text(&self.text)), CRITERION_TEXT)]
    }
}

impl FieldAccess for CriterionPatch {
    fn fields(&self) -> Vec<FieldSpec<'_>> {
        vec![FieldSpec::new("text", text(&self.text), CRITERION_TEXT_PATCH)]
    }
}

impl FieldAccess for Event {
    fn fields(&self) -> Vec<FieldSpec<'_>> {
        vec![
            FieldSpec::new("name", Some(FieldValue::Text(&self.name)), EVENT_NAME),
            FieldSpec::new(
                "description",
                Some(FieldValue::Text(&self.description)),
                EVENT_DESCRIPTION,
            ),
        ]
    }
}

impl FieldAccess for EventPatch {
    fn fields(&self) -> Vec<FieldSpec<'_>> {
        vec![
            FieldSpec::new("name", text(&self.name), EVENT_NAME_PATCH),
            FieldSpec::new("description", text(&self.description), EVENT_DESCRIPTION_PATCH),
            FieldSpec::new("time", opaque(&self.time), EVENT_TIME_PATCH),
        ]
    }
}
