use chrono::NaiveDate;

use crate::fields::{LessonRecord, ProcessStep};

/// Which export layout to assemble. Both share escaping and field iteration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TemplateKind {
    /// Paginated A4 layout: cover, table of contents, details, process pages.
    Print,
    /// Flat single-page layout with labeled sections.
    Flat,
}

impl TemplateKind {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "print" => Some(TemplateKind::Print),
            "flat" => Some(TemplateKind::Flat),
            _ => None,
        }
    }
}

/// Escape text for interpolation into HTML. Applied exactly once per value.
pub fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(ch),
        }
    }
    out
}

/// First-page step count: the step list splits at the ceiling of half its
/// length, remainder on page two.
pub fn split_point(step_count: usize) -> usize {
    step_count.div_ceil(2)
}

/// One process-table column: each step rendered as a numbered block
/// `【环节N】` over its text, empty entries skipped, blocks joined by a
/// blank line. Numbering starts at `offset + 1` so it runs continuously
/// across pages.
fn step_column(steps: &[ProcessStep], offset: usize, pick: fn(&ProcessStep) -> &str) -> String {
    steps
        .iter()
        .enumerate()
        .filter_map(|(i, step)| {
            let content = pick(step);
            if content.is_empty() {
                None
            } else {
                Some(format!("【环节{}】\n{}", offset + i + 1, escape_html(content)))
            }
        })
        .collect::<Vec<_>>()
        .join("\n\n")
}

pub fn render(kind: TemplateKind, record: &LessonRecord) -> String {
    match kind {
        TemplateKind::Print => render_print(record),
        TemplateKind::Flat => render_flat(record),
    }
}

const TOC_ROWS: usize = 15;

const PRINT_STYLE: &str = r#"
    body {
        font-family: 'SimSun', '宋体', serif;
        font-size: 16px;
        color: #000;
        background-color: #f5f5f5;
        margin: 0;
        padding: 20px;
        display: flex;
        flex-direction: column;
        align-items: center;
    }
    .page {
        width: 794px;
        height: 1123px;
        border: 1px solid #ccc;
        margin-bottom: 20px;
        padding: 60px;
        box-sizing: border-box;
        background-color: white;
        page-break-after: always;
        display: flex;
        flex-direction: column;
        position: relative;
    }
    .cover-page {
        display: flex;
        flex-direction: column;
        justify-content: space-between;
        align-items: center;
        text-align: center;
        flex-grow: 1;
    }
    .cover-title {
        font-size: 42px;
        color: #465d87;
        letter-spacing: 5px;
        margin-top: 80px;
    }
    .cover-subtitle {
        font-size: 68px;
        font-weight: bold;
        color: #465d87;
        letter-spacing: 20px;
        margin-top: 60px;
        margin-bottom: 150px;
    }
    .info-section {
        width: 60%;
        margin: 0 auto;
        text-align: left;
    }
    .info-line {
        font-size: 24px;
        color: #465d87;
        margin-bottom: 25px;
        display: flex;
        align-items: center;
    }
    .info-line span {
        width: 100px;
        display: inline-block;
        letter-spacing: 8px;
        flex-shrink: 0;
    }
    .info-line .line-content {
        flex-grow: 1;
        border-bottom: 1px solid #465d87;
        margin-left: 10px;
        padding-left: 10px;
        min-height: 1.2em;
    }
    .toc-page h1 {
        text-align: center;
        font-size: 36px;
        font-weight: bold;
        letter-spacing: 10px;
        margin-top: 30px;
        margin-bottom: 20px;
    }
    .content-table, .detail-table {
        width: 100%;
        border-collapse: collapse;
        border: 2px solid #000;
        table-layout: fixed;
    }
    .content-table th, .content-table td,
    .detail-table th, .detail-table td {
        border: 1px solid #000;
        padding: 8px;
        text-align: center;
        font-size: 18px;
        box-sizing: border-box;
    }
    .content-table th, .content-table td { height: 40px; font-weight: normal; }
    .content-table .col-seq { width: 12%; }
    .content-table .col-title { width: 68%; text-align: left; padding-left: 15px; }
    .content-table .col-page { width: 20%; }
    .detail-table { margin-top: 20px; }
    .detail-table td { vertical-align: middle; }
    .detail-table td:not(.row-header) { text-align: left; line-height: 1.8; }
    .detail-table .row-header {
        width: 120px;
        letter-spacing: 5px;
        white-space: nowrap;
        text-align: center;
    }
    .detail-table .nested-table {
        width: 100%;
        border-collapse: collapse;
        margin: 0;
    }
    .detail-table .nested-table td {
        border: none;
        border-bottom: 1px solid #000;
        padding: 8px;
        font-size: 16px;
    }
    .detail-table .nested-table tr:last-child td { border-bottom: none; }
    .detail-table .nested-table .label {
        width: 45%;
        border-right: 1px solid #000;
        text-align: center;
        letter-spacing: 3px;
    }
    .detail-table .nested-table .value { width: 55%; padding-left: 10px; }
    .detail-table tr:nth-child(1) { height: 50px; }
    .detail-table tr:nth-child(2) { height: 100px; }
    .detail-table tr:nth-child(3) { height: 160px; }
    .detail-table tr:nth-child(4) { height: 80px; }
    .detail-table tr:nth-child(5) { height: 80px; }
    .detail-table tr:nth-child(6) { height: 180px; }
    .detail-table tr:nth-child(7) { height: 100px; }
    .detail-table tr:nth-child(8) { height: 80px; }
    .process-page-container {
        display: flex;
        flex-direction: column;
        flex-grow: 1;
        width: 100%;
    }
    .process-table-main {
        width: 100%;
        height: 100%;
        border-collapse: collapse;
        border: 2px solid #000;
        table-layout: fixed;
    }
    .process-table-main thead th {
        height: 45px;
        font-weight: normal;
        border: 1px solid #000;
        padding: 8px;
        text-align: center;
        font-size: 18px;
        letter-spacing: 2px;
    }
    .process-table-main th, .process-table-main td { width: 33.33%; }
    .process-table-main tbody td {
        border: 1px solid #000;
        padding: 12px;
        vertical-align: top;
        text-align: left;
        font-size: 16px;
        line-height: 1.6;
        word-wrap: break-word;
        white-space: pre-wrap;
    }
    .process-table-footer {
        width: 100%;
        border-collapse: collapse;
        border: 2px solid #000;
        border-top: none;
        margin-top: -2px;
        table-layout: fixed;
    }
    .process-table-footer td {
        border: 1px solid #000;
        padding: 10px;
        text-align: left;
        font-size: 18px;
        vertical-align: top;
        line-height: 1.8;
        white-space: pre-wrap;
    }
    .process-table-footer .row-header {
        width: 120px;
        text-align: center;
        letter-spacing: 5px;
        white-space: nowrap;
        vertical-align: middle;
    }
    .process-table-footer .footer-content { height: 120px; }
    @page { size: A4; margin: 0; }
    @media print {
        body { padding: 0; background-color: white; }
        .page {
            border: none;
            margin: 0;
            page-break-after: always;
            page-break-inside: avoid;
        }
        .page:last-child { page-break-after: auto; }
    }
"#;

fn toc_rows(record: &LessonRecord) -> String {
    let mut rows = String::new();
    for seq in 1..=TOC_ROWS {
        if seq == 1 {
            rows.push_str(&format!(
                "            <tr><td>1</td><td>{}</td><td>3</td></tr>\n",
                escape_html(&record.lesson_topic)
            ));
        } else {
            rows.push_str(&format!(
                "            <tr><td>{}</td><td></td><td></td></tr>\n",
                seq
            ));
        }
    }
    rows
}

fn process_page(record: &LessonRecord, steps: &[ProcessStep], offset: usize, footer: bool) -> String {
    let footer_html = if footer {
        format!(
            r#"        <table class="process-table-footer">
            <tr>
                <td class="row-header">板书设计</td>
                <td class="footer-content">{blackboard}</td>
            </tr>
            <tr>
                <td class="row-header">教学反思</td>
                <td class="footer-content">{reflection}</td>
            </tr>
        </table>
"#,
            blackboard = escape_html(&record.blackboard_design),
            reflection = escape_html(&record.reflection),
        )
    } else {
        String::new()
    };

    format!(
        r#"<div class="page">
    <div class="process-page-container">
        <table class="process-table-main">
            <thead>
                <tr>
                    <th colspan="3">教学过程</th>
                </tr>
                <tr>
                    <th>教师活动</th>
                    <th>学生活动</th>
                    <th>设计意图</th>
                </tr>
            </thead>
            <tbody>
                <tr>
                    <td>{teacher}</td>
                    <td>{student}</td>
                    <td>{intent}</td>
                </tr>
            </tbody>
        </table>
{footer_html}    </div>
</div>
"#,
        teacher = step_column(steps, offset, |s| &s.teacher_activity),
        student = step_column(steps, offset, |s| &s.student_activity),
        intent = step_column(steps, offset, |s| &s.design_intent),
        footer_html = footer_html,
    )
}

fn render_print(record: &LessonRecord) -> String {
    let mid = split_point(record.teaching_process.len());
    let (first_half, second_half) = record.teaching_process.split_at(mid);

    let title = if record.lesson_topic.is_empty() {
        "教案".to_string()
    } else {
        record.lesson_topic.clone()
    };

    let mut html = format!(
        r#"<!DOCTYPE html>
<html lang="zh-CN">
<head>
<meta charset="UTF-8">
<meta name="viewport" content="width=device-width, initial-scale=1.0">
<title>教案本 - {title}</title>
<style>{style}</style>
</head>
<body>

<div class="page">
    <div class="cover-page">
        <div>
            <div class="cover-title">教案本</div>
            <div class="cover-subtitle">教 案 本</div>
        </div>
        <div class="info-section">
            <div class="info-line"><span>学 科</span>: <div class="line-content">{subject}</div></div>
            <div class="info-line"><span>年 级</span>: <div class="line-content">{grade}</div></div>
            <div class="info-line"><span>班 级</span>: <div class="line-content">{class}</div></div>
            <div class="info-line"><span>学年度</span>: <div class="line-content">{academic_year}</div></div>
            <div class="info-line"><span>教 师</span>: <div class="line-content">{teacher}</div></div>
        </div>
    </div>
</div>

<div class="page toc-page">
    <h1>教案目录</h1>
    <table class="content-table">
        <thead>
            <tr>
                <th class="col-seq">序号</th>
                <th class="col-title">课 题</th>
                <th class="col-page">页码</th>
            </tr>
        </thead>
        <tbody>
{toc}        </tbody>
    </table>
</div>

<div class="page">
    <table class="detail-table">
        <tbody>
            <tr>
                <td class="row-header">课题</td>
                <td colspan="2">{topic}</td>
                <td style="width: 200px;">
                    <table class="nested-table">
                        <tr><td class="label">备课时间</td><td class="value">{prepare_time}</td></tr>
                        <tr><td class="label">课 时 数</td><td class="value">{class_hours}</td></tr>
                    </table>
                </td>
            </tr>
            <tr>
                <td class="row-header">课标要求</td>
                <td colspan="3">{curriculum}</td>
            </tr>
            <tr>
                <td class="row-header">素养目标</td>
                <td colspan="3">{literacy}</td>
            </tr>
            <tr>
                <td class="row-header">重点</td>
                <td colspan="3">{key_points}</td>
            </tr>
            <tr>
                <td class="row-header">难点</td>
                <td colspan="3">{difficult_points}</td>
            </tr>
            <tr>
                <td class="row-header">学情分析</td>
                <td colspan="3">{student_analysis}</td>
            </tr>
            <tr>
                <td class="row-header">教学策略</td>
                <td colspan="3">{strategy}</td>
            </tr>
            <tr>
                <td class="row-header">教学资源</td>
                <td colspan="3">{resources}</td>
            </tr>
        </tbody>
    </table>
</div>

"#,
        title = escape_html(&title),
        style = PRINT_STYLE,
        subject = escape_html(&record.subject),
        grade = escape_html(&record.grade),
        class = escape_html(&record.class_name),
        academic_year = escape_html(&record.academic_year),
        teacher = escape_html(&record.teacher),
        toc = toc_rows(record),
        topic = escape_html(&record.lesson_topic),
        prepare_time = escape_html(&record.prepare_time),
        class_hours = escape_html(&record.class_hours),
        curriculum = escape_html(&record.curriculum_require),
        literacy = escape_html(&record.literacy_target),
        key_points = escape_html(&record.key_points),
        difficult_points = escape_html(&record.difficult_points),
        student_analysis = escape_html(&record.student_analysis),
        strategy = escape_html(&record.teaching_strategy),
        resources = escape_html(&record.teaching_resources),
    );

    html.push_str(&process_page(record, first_half, 0, false));
    html.push('\n');
    html.push_str(&process_page(record, second_half, mid, true));
    html.push_str("\n</body>\n</html>");
    html
}

fn render_flat(record: &LessonRecord) -> String {
    let sections: [(&str, &str); 13] = [
        ("学科", &record.subject),
        ("年级", &record.grade),
        ("班级", &record.class_name),
        ("学年度", &record.academic_year),
        ("教师", &record.teacher),
        ("课题", &record.lesson_topic),
        ("备课时间", &record.prepare_time),
        ("课时数", &record.class_hours),
        ("课标要求", &record.curriculum_require),
        ("素养目标", &record.literacy_target),
        ("重点", &record.key_points),
        ("难点", &record.difficult_points),
        ("学情分析", &record.student_analysis),
    ];

    let title = if record.lesson_topic.is_empty() {
        "教案".to_string()
    } else {
        record.lesson_topic.clone()
    };

    let mut html = format!(
        r#"<!DOCTYPE html>
<html lang="zh-CN">
<head>
<meta charset="UTF-8">
<title>教案 - {title}</title>
<style>
    body {{ font-family: 'SimSun', '宋体', serif; font-size: 16px; color: #000; margin: 24px; }}
    h1 {{ text-align: center; font-size: 28px; letter-spacing: 6px; }}
    .section {{ margin-bottom: 14px; }}
    .section .label {{ font-weight: bold; letter-spacing: 2px; }}
    .section .value {{ white-space: pre-wrap; line-height: 1.7; margin-top: 4px; }}
    table {{ width: 100%; border-collapse: collapse; margin: 10px 0; }}
    th, td {{ border: 1px solid #000; padding: 8px; font-size: 15px; text-align: left; vertical-align: top; white-space: pre-wrap; }}
    th {{ text-align: center; font-weight: normal; }}
</style>
</head>
<body>
<h1>{title}</h1>
"#,
        title = escape_html(&title),
    );

    for (label, value) in sections {
        html.push_str(&format!(
            "<div class=\"section\"><div class=\"label\">{}</div><div class=\"value\">{}</div></div>\n",
            label,
            escape_html(value)
        ));
    }
    for (label, value) in [
        ("教学策略", &record.teaching_strategy),
        ("教学资源", &record.teaching_resources),
    ] {
        html.push_str(&format!(
            "<div class=\"section\"><div class=\"label\">{}</div><div class=\"value\">{}</div></div>\n",
            label,
            escape_html(value)
        ));
    }

    html.push_str(
        "<div class=\"section\"><div class=\"label\">教学过程</div></div>\n<table>\n<tr><th>环节</th><th>教师活动</th><th>学生活动</th><th>设计意图</th></tr>\n",
    );
    for (i, step) in record.teaching_process.iter().enumerate() {
        html.push_str(&format!(
            "<tr><td>环节{}</td><td>{}</td><td>{}</td><td>{}</td></tr>\n",
            i + 1,
            escape_html(&step.teacher_activity),
            escape_html(&step.student_activity),
            escape_html(&step.design_intent),
        ));
    }
    html.push_str("</table>\n");

    for (label, value) in [
        ("板书设计", &record.blackboard_design),
        ("教学反思", &record.reflection),
    ] {
        html.push_str(&format!(
            "<div class=\"section\"><div class=\"label\">{}</div><div class=\"value\">{}</div></div>\n",
            label,
            escape_html(value)
        ));
    }

    html.push_str("</body>\n</html>");
    html
}

/// Export file name: subject, grade, topic and a formatted date, with
/// path-unsafe separators replaced.
pub fn export_file_name(record: &LessonRecord, date: NaiveDate) -> String {
    let topic = if record.lesson_topic.is_empty() {
        "教案"
    } else {
        record.lesson_topic.as_str()
    };
    let name = format!(
        "教案_{}_{}_{}_{}.html",
        record.subject,
        record.grade,
        topic,
        date.format("%Y年%m月%d日"),
    );
    name.chars()
        .map(|c| match c {
            '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => '-',
            other => other,
        })
        .collect()
}
