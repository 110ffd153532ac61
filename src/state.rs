use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub const SESSION_SLOT: &str = "session";

/// Storage port for the persisted session snapshot. The production
/// implementation is backed by the workspace SQLite database; tests use
/// an in-memory fake.
pub trait SnapshotStore {
    fn load(&self, slot: &str) -> anyhow::Result<Option<String>>;
    fn save(&mut self, slot: &str, body: &str) -> anyhow::Result<()>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UserRole {
    Teacher,
    Student,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Assessment {
    pub id: String,
    pub question: String,
    pub options: Vec<String>,
    pub time_limit_seconds: u32,
    pub created_at: DateTime<Utc>,
    pub is_active: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub started_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ended_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Answer {
    pub assessment_id: String,
    pub student_name: String,
    pub option: String,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StudentRecord {
    pub name: String,
    pub joined_at: DateTime<Utc>,
    pub is_online: bool,
    pub has_answered: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_answer: Option<Answer>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionState {
    pub session_id: String,
    #[serde(default)]
    pub user_role: Option<UserRole>,
    #[serde(default)]
    pub student_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_assessment_id: Option<String>,
    #[serde(default)]
    pub assessments: Vec<Assessment>,
    #[serde(default)]
    pub answers: Vec<Answer>,
    #[serde(default)]
    pub students: Vec<StudentRecord>,
}

impl SessionState {
    pub fn fresh() -> Self {
        SessionState {
            session_id: Uuid::new_v4().to_string(),
            user_role: None,
            student_name: String::new(),
            current_assessment_id: None,
            assessments: Vec::new(),
            answers: Vec::new(),
            students: Vec::new(),
        }
    }

    pub fn assessment(&self, id: &str) -> Option<&Assessment> {
        self.assessments.iter().find(|a| a.id == id)
    }

    pub fn active_assessment(&self) -> Option<&Assessment> {
        self.assessments.iter().find(|a| a.is_active)
    }
}

/// Rebuild a session state from a persisted snapshot, merging field by
/// field over defaults. Absent or shape-mismatched fields silently fall
/// back; an unparseable document yields a fresh state. Never fails.
pub fn state_from_snapshot(raw: &str) -> SessionState {
    let mut state = SessionState::fresh();
    let value: serde_json::Value = match serde_json::from_str(raw) {
        Ok(v) => v,
        Err(e) => {
            log::warn!("discarding unparseable session snapshot: {e}");
            return state;
        }
    };
    let Some(obj) = value.as_object() else {
        log::warn!("discarding non-object session snapshot");
        return state;
    };

    fn field<T: serde::de::DeserializeOwned>(
        obj: &serde_json::Map<String, serde_json::Value>,
        key: &str,
    ) -> Option<T> {
        let v = obj.get(key)?;
        match serde_json::from_value(v.clone()) {
            Ok(t) => Some(t),
            Err(e) => {
                log::warn!("ignoring snapshot field {key}: {e}");
                None
            }
        }
    }

    if let Some(v) = field::<String>(obj, "sessionId") {
        state.session_id = v;
    }
    if let Some(v) = field::<Option<UserRole>>(obj, "userRole") {
        state.user_role = v;
    }
    if let Some(v) = field::<String>(obj, "studentName") {
        state.student_name = v;
    }
    if let Some(v) = field::<Option<String>>(obj, "currentAssessmentId") {
        state.current_assessment_id = v;
    }
    if let Some(v) = field::<Vec<Assessment>>(obj, "assessments") {
        state.assessments = v;
    }
    if let Some(v) = field::<Vec<Answer>>(obj, "answers") {
        state.answers = v;
    }
    if let Some(v) = field::<Vec<StudentRecord>>(obj, "students") {
        state.students = v;
    }
    state
}

/// Session store mutations. Commands build fully-timestamped payloads
/// before dispatch, so reduction is deterministic and clock-free.
#[derive(Debug, Clone)]
pub enum Action {
    CreateAssessment(Assessment),
    StartAssessment { id: String, at: DateTime<Utc> },
    EndAssessment { id: String, at: DateTime<Utc> },
    SubmitAnswer(Answer),
    JoinSession { name: String, at: DateTime<Utc> },
    SetUserRole(UserRole),
    SetStudentName(String),
    ResetUserRole,
    ImportSnapshot {
        assessments: Vec<Assessment>,
        answers: Vec<Answer>,
        students: Vec<StudentRecord>,
    },
}

pub fn reduce(state: &SessionState, action: &Action) -> SessionState {
    let mut next = state.clone();
    match action {
        Action::CreateAssessment(assessment) => {
            next.assessments.push(assessment.clone());
        }
        Action::StartAssessment { id, at } => {
            for a in &mut next.assessments {
                if a.id == *id {
                    a.is_active = true;
                    a.started_at = Some(*at);
                    a.ended_at = None;
                } else {
                    a.is_active = false;
                }
            }
            next.current_assessment_id = next
                .assessments
                .iter()
                .find(|a| a.id == *id)
                .map(|a| a.id.clone());
        }
        Action::EndAssessment { id, at } => {
            for a in &mut next.assessments {
                if a.id == *id {
                    a.is_active = false;
                    a.ended_at = Some(*at);
                }
            }
            if next.current_assessment_id.as_deref() == Some(id.as_str()) {
                next.current_assessment_id = None;
            }
        }
        Action::SubmitAnswer(answer) => {
            // One answer per (assessment, student): last write wins.
            next.answers.retain(|a| {
                !(a.assessment_id == answer.assessment_id
                    && a.student_name == answer.student_name)
            });
            next.answers.push(answer.clone());

            match next
                .students
                .iter_mut()
                .find(|s| s.name == answer.student_name)
            {
                Some(student) => {
                    student.has_answered = true;
                    student.last_answer = Some(answer.clone());
                }
                None => next.students.push(StudentRecord {
                    name: answer.student_name.clone(),
                    joined_at: answer.timestamp,
                    is_online: true,
                    has_answered: true,
                    last_answer: Some(answer.clone()),
                }),
            }
        }
        Action::JoinSession { name, at } => {
            match next.students.iter_mut().find(|s| s.name == *name) {
                Some(student) => {
                    student.is_online = true;
                    student.joined_at = *at;
                }
                None => next.students.push(StudentRecord {
                    name: name.clone(),
                    joined_at: *at,
                    is_online: true,
                    has_answered: false,
                    last_answer: None,
                }),
            }
        }
        Action::SetUserRole(role) => {
            next.user_role = Some(*role);
        }
        Action::SetStudentName(name) => {
            next.student_name = name.clone();
        }
        Action::ResetUserRole => {
            next.user_role = None;
            next.student_name = String::new();
        }
        Action::ImportSnapshot {
            assessments,
            answers,
            students,
        } => {
            next.assessments = assessments.clone();
            next.answers = answers.clone();
            next.students = students.clone();
            next.current_assessment_id = next
                .assessments
                .iter()
                .find(|a| a.is_active)
                .map(|a| a.id.clone());
        }
    }
    next
}

pub struct SessionStore {
    state: SessionState,
    snapshots: Box<dyn SnapshotStore>,
}

impl SessionStore {
    /// Load the persisted snapshot (or start fresh) and write the
    /// resulting state back so the slot always reflects what is live.
    pub fn open(snapshots: Box<dyn SnapshotStore>) -> Self {
        let state = match snapshots.load(SESSION_SLOT) {
            Ok(Some(body)) => state_from_snapshot(&body),
            Ok(None) => SessionState::fresh(),
            Err(e) => {
                log::warn!("failed to read session snapshot, starting fresh: {e:?}");
                SessionState::fresh()
            }
        };
        let mut store = SessionStore { state, snapshots };
        store.persist();
        store
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    pub fn dispatch(&mut self, action: Action) {
        self.state = reduce(&self.state, &action);
        self.persist();
    }

    fn persist(&mut self) {
        match serde_json::to_string(&self.state) {
            Ok(body) => {
                if let Err(e) = self.snapshots.save(SESSION_SLOT, &body) {
                    log::warn!("failed to persist session snapshot: {e:?}");
                }
            }
            Err(e) => log::warn!("failed to serialize session snapshot: {e}"),
        }
    }

    pub fn create_assessment(
        &mut self,
        question: String,
        options: Vec<String>,
        time_limit_seconds: u32,
    ) -> Assessment {
        let assessment = Assessment {
            id: Uuid::new_v4().to_string(),
            question,
            options,
            time_limit_seconds,
            created_at: Utc::now(),
            is_active: false,
            started_at: None,
            ended_at: None,
        };
        self.dispatch(Action::CreateAssessment(assessment.clone()));
        assessment
    }

    pub fn start_assessment(&mut self, id: &str) {
        self.dispatch(Action::StartAssessment {
            id: id.to_string(),
            at: Utc::now(),
        });
    }

    pub fn end_assessment(&mut self, id: &str) {
        self.dispatch(Action::EndAssessment {
            id: id.to_string(),
            at: Utc::now(),
        });
    }

    pub fn submit_answer(
        &mut self,
        assessment_id: &str,
        option: &str,
        student_name: &str,
    ) -> Answer {
        let answer = Answer {
            assessment_id: assessment_id.to_string(),
            student_name: student_name.to_string(),
            option: option.to_string(),
            timestamp: Utc::now(),
        };
        self.dispatch(Action::SubmitAnswer(answer.clone()));
        answer
    }

    pub fn join_session(&mut self, name: &str) {
        self.dispatch(Action::JoinSession {
            name: name.to_string(),
            at: Utc::now(),
        });
    }

    pub fn set_user_role(&mut self, role: UserRole) {
        self.dispatch(Action::SetUserRole(role));
    }

    pub fn set_student_name(&mut self, name: &str) {
        self.dispatch(Action::SetStudentName(name.to_string()));
    }

    pub fn reset_user_role(&mut self) {
        self.dispatch(Action::ResetUserRole);
    }

    /// Read an arbitrary snapshot slot through the persistence port
    /// (used by the legacy poll-slot upgrade).
    pub fn load_slot(&self, slot: &str) -> anyhow::Result<Option<String>> {
        self.snapshots.load(slot)
    }

    /// Replace the assessment/answer/student collections wholesale
    /// (legacy import). Session identity and role fields are kept.
    pub fn import_collections(
        &mut self,
        assessments: Vec<Assessment>,
        answers: Vec<Answer>,
        students: Vec<StudentRecord>,
    ) {
        self.dispatch(Action::ImportSnapshot {
            assessments,
            answers,
            students,
        });
    }

    /// Replace the whole state from a serialized snapshot (bundle
    /// restore). Goes through the tolerant decoder, then persists.
    pub fn restore_snapshot(&mut self, body: &str) {
        self.state = state_from_snapshot(body);
        self.persist();
    }
}
