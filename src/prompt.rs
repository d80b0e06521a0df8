use serde::Deserialize;

/// Fixed system instruction sent with every generation request.
pub const SYSTEM_PROMPT: &str = "你是一个专业的中学教案编写助手，擅长根据新课标要求生成高质量的教案内容。你的回答必须是标准的JSON格式。";

/// Cover metadata gathered before generation. All fields are trimmed;
/// missing values are carried as empty strings rather than omitted.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CoverMetadata {
    #[serde(default)]
    pub subject: String,
    #[serde(default)]
    pub grade: String,
    #[serde(default)]
    pub class: String,
    #[serde(default)]
    pub academic_year: String,
    #[serde(default)]
    pub teacher: String,
    #[serde(default)]
    pub lesson_topic: String,
}

impl CoverMetadata {
    pub fn trimmed(mut self) -> Self {
        for field in [
            &mut self.subject,
            &mut self.grade,
            &mut self.class,
            &mut self.academic_year,
            &mut self.teacher,
            &mut self.lesson_topic,
        ] {
            *field = field.trim().to_string();
        }
        self
    }

    /// Cover fields that must be filled before a generation attempt.
    pub fn missing_required(&self) -> Vec<&'static str> {
        let mut missing = Vec::new();
        if self.subject.is_empty() {
            missing.push("subject");
        }
        if self.grade.is_empty() {
            missing.push("grade");
        }
        missing
    }

    /// Topic used for the prompt when none was entered.
    pub fn topic_or_default(&self) -> String {
        if self.lesson_topic.is_empty() {
            format!("{}教学", self.subject)
        } else {
            self.lesson_topic.clone()
        }
    }
}

/// Compose the generation instruction. Deterministic: the same metadata
/// always yields the same string.
pub fn build_prompt(cover: &CoverMetadata) -> String {
    format!(
        r#"你是一个专业的中学教案编写助手。请根据以下信息生成一份完整的教案内容：

学科：{subject}
年级：{grade}
班级：{class}
学年度：{academic_year}
教师：{teacher}
课题：{topic}

请生成以下内容（使用JSON格式返回）：
{{
  "curriculumRequire": "课标要求内容（200-300字）",
  "literacyTarget": "素养目标内容（3-4个具体目标，每个目标单独一行）",
  "keyPoints": "教学重点（150-200字）",
  "difficultPoints": "教学难点（150-200字）",
  "studentAnalysis": "学情分析（200-300字）",
  "teachingStrategy": "教学策略（200-300字）",
  "teachingResources": "教学资源（列举5-8项具体资源）",
  "teachingProcess": [
    {{
      "teacherActivity": "教师活动内容",
      "studentActivity": "学生活动内容",
      "designIntent": "设计意图"
    }}
  ],
  "blackboardDesign": "板书设计内容（清晰的结构化内容）",
  "reflection": "教学反思（200-300字）"
}}

要求：
1. 内容要详实、专业，符合新课标要求
2. 素养目标要具体、可操作、可评估
3. 教学过程要包含3-5个环节，每个环节要详细
4. 所有内容要符合{grade}学生的认知水平
5. 返回标准的JSON格式，不要有额外的文字说明"#,
        subject = cover.subject,
        grade = cover.grade,
        class = cover.class,
        academic_year = cover.academic_year,
        teacher = cover.teacher,
        topic = cover.topic_or_default(),
    )
}
