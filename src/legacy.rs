//! Upgrade of the legacy simple-poll snapshot into the unified
//! assessment model. Older builds persisted a second, poorer schema
//! ("polls" and "votes", no attendance fields) under its own slot; this
//! module maps that document onto the rich model so a workspace carries
//! exactly one schema afterwards.

use crate::state::{Answer, Assessment, StudentRecord};
use anyhow::Context;
use chrono::{DateTime, Utc};
use serde::Deserialize;

pub const LEGACY_POLL_SLOT: &str = "poll";

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LegacyPollState {
    #[serde(default)]
    all_polls: Vec<LegacyPoll>,
    #[serde(default)]
    votes: Vec<LegacyVote>,
    #[serde(default)]
    students: Vec<LegacyStudent>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LegacyPoll {
    id: String,
    question: String,
    #[serde(default)]
    options: Vec<String>,
    time_limit: u32,
    created_at: DateTime<Utc>,
    #[serde(default)]
    is_active: bool,
    #[serde(default)]
    started_at: Option<DateTime<Utc>>,
    #[serde(default)]
    ended_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LegacyVote {
    poll_id: String,
    student_name: String,
    option: String,
    timestamp: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LegacyStudent {
    name: String,
}

#[derive(Debug)]
pub struct LegacyImport {
    pub assessments: Vec<Assessment>,
    pub answers: Vec<Answer>,
    pub students: Vec<StudentRecord>,
    pub collapsed_votes: usize,
}

/// Parse a legacy poll snapshot and map it onto the unified model.
///
/// The legacy vote log was append-only, so one student could hold
/// several votes on the same poll; those collapse to the latest
/// occurrence. Imported students come back offline (they must rejoin to
/// count as online) with `joinedAt` taken from their earliest vote, or
/// the import time when they never voted.
pub fn upgrade_poll_snapshot(raw: &str, imported_at: DateTime<Utc>) -> anyhow::Result<LegacyImport> {
    let legacy: LegacyPollState =
        serde_json::from_str(raw).context("legacy poll snapshot is not valid JSON")?;

    let assessments: Vec<Assessment> = legacy
        .all_polls
        .iter()
        .map(|p| Assessment {
            id: p.id.clone(),
            question: p.question.clone(),
            options: p.options.clone(),
            time_limit_seconds: p.time_limit,
            created_at: p.created_at,
            is_active: p.is_active,
            started_at: p.started_at,
            ended_at: p.ended_at,
        })
        .collect();

    let mut answers: Vec<Answer> = Vec::new();
    for vote in &legacy.votes {
        answers.retain(|a| {
            !(a.assessment_id == vote.poll_id && a.student_name == vote.student_name)
        });
        answers.push(Answer {
            assessment_id: vote.poll_id.clone(),
            student_name: vote.student_name.clone(),
            option: vote.option.clone(),
            timestamp: vote.timestamp,
        });
    }
    let collapsed_votes = legacy.votes.len() - answers.len();

    let mut students: Vec<StudentRecord> = Vec::new();
    let mut record = |name: &str| {
        if students.iter().any(|s| s.name == name) {
            return;
        }
        let theirs: Vec<&Answer> = answers.iter().filter(|a| a.student_name == name).collect();
        let joined_at = theirs
            .iter()
            .map(|a| a.timestamp)
            .min()
            .unwrap_or(imported_at);
        let last_answer = theirs
            .iter()
            .max_by_key(|a| a.timestamp)
            .map(|a| (*a).clone());
        students.push(StudentRecord {
            name: name.to_string(),
            joined_at,
            is_online: false,
            has_answered: last_answer.is_some(),
            last_answer,
        });
    };
    for s in &legacy.students {
        record(s.name.as_str());
    }
    let voter_names: Vec<String> = answers.iter().map(|a| a.student_name.clone()).collect();
    for name in &voter_names {
        record(name.as_str());
    }

    Ok(LegacyImport {
        assessments,
        answers,
        students,
        collapsed_votes,
    })
}
