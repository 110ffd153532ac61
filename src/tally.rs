use crate::state::SessionState;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::HashSet;

/// Round-half-up percentage, `0` when the denominator is zero.
/// Matches the dashboard's display math: each row rounds independently,
/// so a result column is not guaranteed to sum to exactly 100.
pub fn percent(part: usize, whole: usize) -> u32 {
    if whole == 0 {
        return 0;
    }
    ((100.0 * part as f64 / whole as f64) + 0.5).floor() as u32
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OptionTally {
    pub option: String,
    pub answers: usize,
    pub percentage: u32,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AssessmentResults {
    pub assessment_id: String,
    pub total_answers: usize,
    pub results: Vec<OptionTally>,
    pub participants: Vec<String>,
    pub attendance_rate: u32,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AttendanceRow {
    pub name: String,
    pub participated: bool,
    pub joined_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub answered_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AttendanceData {
    pub total_students: usize,
    pub participated_students: usize,
    pub attendance_rate: u32,
    pub student_list: Vec<AttendanceRow>,
}

/// Live tally for one assessment. `None` when the id is unknown.
pub fn assessment_results(state: &SessionState, assessment_id: &str) -> Option<AssessmentResults> {
    let assessment = state.assessment(assessment_id)?;
    let answers: Vec<_> = state
        .answers
        .iter()
        .filter(|a| a.assessment_id == assessment_id)
        .collect();
    let total_answers = answers.len();

    let results = assessment
        .options
        .iter()
        .map(|option| {
            let count = answers.iter().filter(|a| a.option == *option).count();
            OptionTally {
                option: option.clone(),
                answers: count,
                percentage: if total_answers > 0 {
                    percent(count, total_answers)
                } else {
                    0
                },
            }
        })
        .collect();

    Some(AssessmentResults {
        assessment_id: assessment_id.to_string(),
        total_answers,
        results,
        participants: answers.iter().map(|a| a.student_name.clone()).collect(),
        attendance_rate: if total_answers > 0 {
            percent(total_answers, state.students.len())
        } else {
            0
        },
    })
}

/// Participation roster for one assessment. `None` when the id is
/// unknown. `answeredAt` is the student's answer to this assessment,
/// not their most recent answer overall.
pub fn attendance_data(state: &SessionState, assessment_id: &str) -> Option<AttendanceData> {
    state.assessment(assessment_id)?;
    let answers: Vec<_> = state
        .answers
        .iter()
        .filter(|a| a.assessment_id == assessment_id)
        .collect();
    let participated: HashSet<&str> = answers.iter().map(|a| a.student_name.as_str()).collect();

    let student_list = state
        .students
        .iter()
        .map(|student| AttendanceRow {
            name: student.name.clone(),
            participated: participated.contains(student.name.as_str()),
            joined_at: student.joined_at,
            answered_at: answers
                .iter()
                .find(|a| a.student_name == student.name)
                .map(|a| a.timestamp),
        })
        .collect();

    Some(AttendanceData {
        total_students: state.students.len(),
        participated_students: participated.len(),
        attendance_rate: percent(participated.len(), state.students.len()),
        student_list,
    })
}

/// A new assessment may be created when nothing is running, or when
/// every known student has already answered the active one.
pub fn can_create_new(state: &SessionState) -> bool {
    let Some(active) = state.active_assessment() else {
        return true;
    };
    let answered: HashSet<&str> = state
        .answers
        .iter()
        .filter(|a| a.assessment_id == active.id)
        .map(|a| a.student_name.as_str())
        .collect();
    answered.len() >= state.students.len() && !state.students.is_empty()
}
