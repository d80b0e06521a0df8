use rusqlite::Connection;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::db;

/// Store keys are the field id behind a fixed namespace prefix. The registry
/// below is the single source of truth for which ids exist; store keys and
/// field ids stay in 1:1 correspondence.
pub const KEY_PREFIX: &str = "lessonPlan_";

pub const API_KEY_ID: &str = "api-key";

pub const COVER_FIELD_IDS: [&str; 6] = [
    "subject",
    "grade",
    "class",
    "academic-year",
    "teacher",
    "lesson-topic",
];

pub const DETAIL_FIELD_IDS: [&str; 11] = [
    "prepare-time",
    "class-hours",
    "curriculum-require",
    "literacy-target",
    "key-points",
    "difficult-points",
    "student-analysis",
    "teaching-strategy",
    "teaching-resources",
    "blackboard-design",
    "teaching-reflection",
];

/// The page has a fixed number of teaching-process rows; the prompt asks for
/// 3-5 steps and fills clamp to this capacity.
pub const PROCESS_ROWS: usize = 5;
pub const PROCESS_COLS: usize = 3;

pub fn store_key(field_id: &str) -> String {
    format!("{}{}", KEY_PREFIX, field_id)
}

pub fn process_field_id(row: usize, col: usize) -> String {
    format!("teachingProcess_{}_{}", row, col)
}

fn is_process_id(field_id: &str) -> bool {
    let Some(rest) = field_id.strip_prefix("teachingProcess_") else {
        return false;
    };
    let mut parts = rest.splitn(2, '_');
    let row = parts.next().and_then(|s| s.parse::<usize>().ok());
    let col = parts.next().and_then(|s| s.parse::<usize>().ok());
    matches!((row, col), (Some(r), Some(c)) if r < PROCESS_ROWS && c < PROCESS_COLS)
}

pub fn is_known_id(field_id: &str) -> bool {
    field_id == API_KEY_ID
        || COVER_FIELD_IDS.contains(&field_id)
        || DETAIL_FIELD_IDS.contains(&field_id)
        || is_process_id(field_id)
}

pub fn get(conn: &Connection, field_id: &str) -> anyhow::Result<Option<String>> {
    db::field_get(conn, &store_key(field_id))
}

pub fn set(conn: &Connection, field_id: &str, value: &str) -> anyhow::Result<()> {
    db::field_set(conn, &store_key(field_id), value)
}

fn get_trimmed(conn: &Connection, field_id: &str) -> anyhow::Result<String> {
    Ok(get(conn, field_id)?.unwrap_or_default().trim().to_string())
}

/// One teaching-process row: three independent free-text cells.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessStep {
    #[serde(default)]
    pub teacher_activity: String,
    #[serde(default)]
    pub student_activity: String,
    #[serde(default)]
    pub design_intent: String,
}

impl ProcessStep {
    pub fn is_empty(&self) -> bool {
        self.teacher_activity.is_empty()
            && self.student_activity.is_empty()
            && self.design_intent.is_empty()
    }
}

/// Generated lesson content as returned by the model. Every field may be
/// absent; absent fields leave the current form values untouched.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LessonContent {
    pub curriculum_require: Option<String>,
    pub literacy_target: Option<String>,
    pub key_points: Option<String>,
    pub difficult_points: Option<String>,
    pub student_analysis: Option<String>,
    pub teaching_strategy: Option<String>,
    pub teaching_resources: Option<String>,
    #[serde(default)]
    pub teaching_process: Vec<ProcessStep>,
    pub blackboard_design: Option<String>,
    pub reflection: Option<String>,
}

const CONTENT_FIELD_MAP: [(&str, fn(&LessonContent) -> &Option<String>); 9] = [
    ("curriculum-require", |c| &c.curriculum_require),
    ("literacy-target", |c| &c.literacy_target),
    ("key-points", |c| &c.key_points),
    ("difficult-points", |c| &c.difficult_points),
    ("student-analysis", |c| &c.student_analysis),
    ("teaching-strategy", |c| &c.teaching_strategy),
    ("teaching-resources", |c| &c.teaching_resources),
    ("blackboard-design", |c| &c.blackboard_design),
    ("teaching-reflection", |c| &c.reflection),
];

/// Write generated content into the store. Present fields are set and
/// persisted; absent or empty fields are skipped. Process steps map
/// positionally onto rows 0..PROCESS_ROWS; excess steps are discarded and
/// trailing rows are left as they are. Re-applying the same content is a
/// no-op beyond rewriting identical values.
///
/// Returns the field ids that were written with their new values.
pub fn apply_generated(
    conn: &Connection,
    content: &LessonContent,
) -> anyhow::Result<Map<String, Value>> {
    let mut filled = Map::new();

    for (field_id, accessor) in CONTENT_FIELD_MAP {
        if let Some(value) = accessor(content) {
            if value.is_empty() {
                continue;
            }
            set(conn, field_id, value)?;
            filled.insert(field_id.to_string(), Value::String(value.clone()));
        }
    }

    for (row, step) in content.teaching_process.iter().enumerate() {
        if row >= PROCESS_ROWS {
            break;
        }
        let cells = [
            &step.teacher_activity,
            &step.student_activity,
            &step.design_intent,
        ];
        for (col, value) in cells.into_iter().enumerate() {
            let field_id = process_field_id(row, col);
            set(conn, &field_id, value)?;
            filled.insert(field_id, Value::String(value.clone()));
        }
    }

    Ok(filled)
}

/// Flat snapshot of every form field, read live at export time.
#[derive(Debug, Clone, Default)]
pub struct LessonRecord {
    pub subject: String,
    pub grade: String,
    pub class_name: String,
    pub academic_year: String,
    pub teacher: String,
    pub lesson_topic: String,
    pub prepare_time: String,
    pub class_hours: String,
    pub curriculum_require: String,
    pub literacy_target: String,
    pub key_points: String,
    pub difficult_points: String,
    pub student_analysis: String,
    pub teaching_strategy: String,
    pub teaching_resources: String,
    pub teaching_process: Vec<ProcessStep>,
    pub blackboard_design: String,
    pub reflection: String,
}

/// Read every live field value, trimmed. Process rows with all three cells
/// empty are dropped.
pub fn collect_record(conn: &Connection) -> anyhow::Result<LessonRecord> {
    let mut record = LessonRecord {
        subject: get_trimmed(conn, "subject")?,
        grade: get_trimmed(conn, "grade")?,
        class_name: get_trimmed(conn, "class")?,
        academic_year: get_trimmed(conn, "academic-year")?,
        teacher: get_trimmed(conn, "teacher")?,
        lesson_topic: get_trimmed(conn, "lesson-topic")?,
        prepare_time: get_trimmed(conn, "prepare-time")?,
        class_hours: get_trimmed(conn, "class-hours")?,
        curriculum_require: get_trimmed(conn, "curriculum-require")?,
        literacy_target: get_trimmed(conn, "literacy-target")?,
        key_points: get_trimmed(conn, "key-points")?,
        difficult_points: get_trimmed(conn, "difficult-points")?,
        student_analysis: get_trimmed(conn, "student-analysis")?,
        teaching_strategy: get_trimmed(conn, "teaching-strategy")?,
        teaching_resources: get_trimmed(conn, "teaching-resources")?,
        teaching_process: Vec::new(),
        blackboard_design: get_trimmed(conn, "blackboard-design")?,
        reflection: get_trimmed(conn, "teaching-reflection")?,
    };

    for row in 0..PROCESS_ROWS {
        let step = ProcessStep {
            teacher_activity: get_trimmed(conn, &process_field_id(row, 0))?,
            student_activity: get_trimmed(conn, &process_field_id(row, 1))?,
            design_intent: get_trimmed(conn, &process_field_id(row, 2))?,
        };
        if !step.is_empty() {
            record.teaching_process.push(step);
        }
    }

    Ok(record)
}
