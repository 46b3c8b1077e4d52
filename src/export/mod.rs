//! Spreadsheet reports.
//!
//! A report is laid out as a [`Sheet`] first: rows of styled cells plus the
//! merged banner rows and column widths. Layout is pure and tested on its own;
//! [`write_sheet`] renders a sheet to an `.xlsx` file.

use anyhow::{Context, Result};
use chrono::{DateTime, Local, TimeZone, Utc};
use rust_xlsxwriter::{Color, Format, FormatAlign, FormatBorder, Workbook};
use std::path::Path;

use crate::attendance::AttendanceTracker;
use crate::doubts::DoubtBoard;
use crate::quiz::QuizResultsReport;

const NO_SUMMARY: &str = "No summary available.";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CellStyle {
    Plain,
    Bold,
    Italic,
    /// Bold on yellow, centered.
    Banner,
    /// Bold 14pt, centered.
    Title,
    /// Bold white on green, centered.
    Section,
    /// Bold on grey with thin borders.
    Header,
}

#[derive(Debug, Clone, PartialEq)]
pub enum CellValue {
    Text(String),
    Number(f64),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Cell {
    pub value: CellValue,
    pub style: CellStyle,
}

impl Cell {
    pub fn text(value: impl Into<String>) -> Self {
        Self {
            value: CellValue::Text(value.into()),
            style: CellStyle::Plain,
        }
    }

    pub fn number(value: f64) -> Self {
        Self {
            value: CellValue::Number(value),
            style: CellStyle::Plain,
        }
    }

    pub fn styled(mut self, style: CellStyle) -> Self {
        self.style = style;
        self
    }

    pub fn as_text(&self) -> Option<&str> {
        match &self.value {
            CellValue::Text(text) => Some(text),
            CellValue::Number(_) => None,
        }
    }
}

/// Row-wide merge from column 0 to `last_col`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Merge {
    pub row: u32,
    pub last_col: u16,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Sheet {
    pub name: String,
    pub rows: Vec<Vec<Cell>>,
    pub merges: Vec<Merge>,
    pub widths: Vec<f64>,
}

impl Sheet {
    fn new(name: &str, widths: &[f64]) -> Self {
        Self {
            name: name.to_string(),
            rows: Vec::new(),
            merges: Vec::new(),
            widths: widths.to_vec(),
        }
    }

    fn push(&mut self, row: Vec<Cell>) {
        self.rows.push(row);
    }

    fn blank(&mut self) {
        self.rows.push(Vec::new());
    }

    /// Pushes a banner cell merged across the sheet width.
    fn banner(&mut self, text: &str, style: CellStyle) {
        let last_col = self.widths.len().saturating_sub(1) as u16;
        self.merges.push(Merge {
            row: self.rows.len() as u32,
            last_col,
        });
        self.rows.push(vec![Cell::text(text).styled(style)]);
    }

    pub fn cell(&self, row: usize, col: usize) -> Option<&Cell> {
        self.rows.get(row).and_then(|r| r.get(col))
    }
}

/// Formats a stay duration as `1h 2m 3s`, dropping zero units.
pub fn format_duration(ms: i64) -> String {
    if ms <= 0 {
        return "0s".to_string();
    }
    let total = ms / 1000;
    let (hours, minutes, seconds) = (total / 3600, (total / 60) % 60, total % 60);

    let mut parts = Vec::new();
    if hours > 0 {
        parts.push(format!("{}h", hours));
    }
    if minutes > 0 {
        parts.push(format!("{}m", minutes));
    }
    if seconds > 0 || parts.is_empty() {
        parts.push(format!("{}s", seconds));
    }
    parts.join(" ")
}

fn format_date<Tz: TimeZone>(date: &DateTime<Tz>) -> String
where
    Tz::Offset: std::fmt::Display,
{
    date.format("%d-%m-%Y").to_string()
}

fn format_time(at: DateTime<Utc>) -> String {
    at.with_timezone(&Local).format("%H:%M:%S").to_string()
}

fn format_score(score: f64) -> String {
    format!("{}%", score)
}

#[derive(Debug, Clone, PartialEq)]
pub struct StudentLine {
    pub name: String,
    pub first_join: DateTime<Utc>,
    pub stay_ms: i64,
    pub join_count: u32,
    pub questions: Vec<String>,
}

impl StudentLine {
    fn question_text(&self) -> String {
        if self.questions.is_empty() {
            return "-".to_string();
        }
        self.questions
            .iter()
            .enumerate()
            .map(|(i, q)| format!("{}. {}", i + 1, q))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// Attendance and questions of every student in the class.
#[derive(Debug, Clone, PartialEq)]
pub struct ClassReport {
    pub date: DateTime<Local>,
    pub topic: String,
    pub summary: Option<String>,
    pub students: Vec<StudentLine>,
}

impl ClassReport {
    pub fn collect(
        attendance: &AttendanceTracker,
        doubts: &DoubtBoard,
        topic: &str,
        summary: Option<&str>,
        date: DateTime<Local>,
    ) -> Self {
        let now = date.with_timezone(&Utc);
        let students = attendance
            .students()
            .map(|record| StudentLine {
                name: record.identity.clone(),
                first_join: record.first_joined,
                stay_ms: record.elapsed_ms(now) as i64,
                join_count: record.join_count,
                questions: doubts
                    .questions_from(&record.identity)
                    .map(|d| d.text.clone())
                    .collect(),
            })
            .collect();

        Self {
            date,
            topic: topic.to_string(),
            summary: summary.map(String::from),
            students,
        }
    }

    pub fn file_name(&self) -> String {
        format!("Class_Report_{}.xlsx", format_date(&self.date))
    }

    pub fn sheet(&self) -> Sheet {
        let mut sheet = Sheet::new("Class Report", &[20.0, 15.0, 15.0, 12.0, 100.0]);
        let summary = self
            .summary
            .as_deref()
            .filter(|s| !s.trim().is_empty())
            .unwrap_or(NO_SUMMARY);

        sheet.banner("CLASS DETAILS", CellStyle::Banner);
        sheet.push(vec![
            Cell::text("Date:").styled(CellStyle::Bold),
            Cell::text(format_date(&self.date)).styled(CellStyle::Bold),
        ]);
        sheet.push(vec![
            Cell::text("Topic:").styled(CellStyle::Bold),
            Cell::text(&self.topic).styled(CellStyle::Bold),
        ]);
        sheet.push(vec![
            Cell::text("CLASS SUMMARY:").styled(CellStyle::Bold),
            Cell::text(summary),
        ]);
        sheet.blank();
        sheet.banner("STUDENT DETAILS", CellStyle::Banner);
        sheet.push(
            ["Name", "First Join", "Total Stay", "Join Count", "Question"]
                .into_iter()
                .map(|h| Cell::text(h).styled(CellStyle::Bold))
                .collect(),
        );

        for student in &self.students {
            sheet.push(vec![
                Cell::text(&student.name),
                Cell::text(format_time(student.first_join)),
                Cell::text(format_duration(student.stay_ms)),
                Cell::number(student.join_count as f64),
                Cell::text(student.question_text()),
            ]);
        }
        sheet
    }
}

/// Results of one quiz as reported by the backend.
#[derive(Debug, Clone, PartialEq)]
pub struct QuizReport {
    pub topic: String,
    pub date: DateTime<Local>,
    pub results: QuizResultsReport,
}

impl QuizReport {
    pub fn file_name(&self) -> String {
        let topic = self.topic.split_whitespace().collect::<Vec<_>>().join("_");
        format!("Quiz_Report_{}_{}.xlsx", topic, format_date(&self.date))
    }

    pub fn sheet(&self) -> Sheet {
        let mut sheet = Sheet::new("Quiz Report", &[25.0, 50.0, 30.0, 20.0]);
        let stats = &self.results.stats;
        let topic = if self.topic.trim().is_empty() {
            "General"
        } else {
            &self.topic
        };
        let header = |labels: &[&str]| -> Vec<Cell> {
            labels
                .iter()
                .map(|l| Cell::text(*l).styled(CellStyle::Header))
                .collect()
        };

        sheet.banner(&format!("QUIZ REPORT: {}", topic), CellStyle::Title);
        sheet.push(vec![
            Cell::text(format!("Date: {}", format_date(&self.date))).styled(CellStyle::Italic)
        ]);
        sheet.blank();

        sheet.banner("QUIZ STATISTICS", CellStyle::Section);
        sheet.push(header(&[
            "Total Submissions",
            "Average Score",
            "Highest Score",
            "Lowest Score",
        ]));
        sheet.push(vec![
            Cell::number(stats.total_submissions as f64),
            Cell::text(format_score(stats.average_score)),
            Cell::text(format_score(stats.highest_score)),
            Cell::text(format_score(stats.lowest_score)),
        ]);
        sheet.blank();

        sheet.banner("STUDENT RESULTS", CellStyle::Section);
        sheet.push(header(&[
            "Student Name",
            "Score (%)",
            "Correct Answers",
            "Submission Time",
        ]));
        for submission in &self.results.submissions {
            sheet.push(vec![
                Cell::text(&submission.student_name),
                Cell::text(format_score(submission.score)),
                Cell::text(format!(
                    "{}/{}",
                    submission.correct_count, submission.total_questions
                )),
                Cell::text(
                    submission
                        .submitted_at
                        .map(format_time)
                        .unwrap_or_else(|| "-".to_string()),
                ),
            ]);
        }
        sheet.blank();

        sheet.banner("QUIZ QUESTIONS & CORRECT ANSWERS", CellStyle::Section);
        sheet.push(header(&["#", "Question", "Correct Option"]));
        for (index, question) in self.results.questions.iter().enumerate() {
            sheet.push(vec![
                Cell::number((index + 1) as f64),
                Cell::text(&question.question),
                Cell::text(question.correct_label().unwrap_or_else(|| "-".to_string())),
            ]);
        }
        sheet
    }
}

fn cell_format(style: CellStyle) -> Format {
    match style {
        CellStyle::Plain => Format::new(),
        CellStyle::Bold => Format::new().set_bold(),
        CellStyle::Italic => Format::new().set_italic(),
        CellStyle::Banner => Format::new()
            .set_bold()
            .set_background_color(Color::RGB(0xFFFF00))
            .set_align(FormatAlign::Center)
            .set_align(FormatAlign::VerticalCenter),
        CellStyle::Title => Format::new()
            .set_bold()
            .set_font_size(14)
            .set_align(FormatAlign::Center),
        CellStyle::Section => Format::new()
            .set_bold()
            .set_font_color(Color::White)
            .set_background_color(Color::RGB(0x4CAF50))
            .set_align(FormatAlign::Center),
        CellStyle::Header => Format::new()
            .set_bold()
            .set_background_color(Color::RGB(0xE9ECEF))
            .set_border(FormatBorder::Thin),
    }
}

/// Renders a sheet into a single-sheet workbook at `path`.
pub fn write_sheet(sheet: &Sheet, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create {}", parent.display()))?;
    }

    let mut workbook = Workbook::new();
    let worksheet = workbook.add_worksheet();
    worksheet.set_name(&sheet.name)?;

    for (col, width) in sheet.widths.iter().enumerate() {
        worksheet.set_column_width(col as u16, *width)?;
    }

    for (r, row) in sheet.rows.iter().enumerate() {
        let r = r as u32;
        if let Some(merge) = sheet.merges.iter().find(|m| m.row == r) {
            let (text, style) = row
                .first()
                .map(|c| (c.as_text().unwrap_or_default(), c.style))
                .unwrap_or(("", CellStyle::Plain));
            worksheet.merge_range(r, 0, r, merge.last_col, text, &cell_format(style))?;
            continue;
        }

        for (c, cell) in row.iter().enumerate() {
            let c = c as u16;
            let format = cell_format(cell.style);
            match &cell.value {
                CellValue::Text(text) => {
                    worksheet.write_string_with_format(r, c, text, &format)?;
                }
                CellValue::Number(value) => {
                    worksheet.write_number_with_format(r, c, *value, &format)?;
                }
            }
        }
    }

    workbook
        .save(path)
        .with_context(|| format!("Failed to save workbook {}", path.display()))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metadata::Role;
    use crate::protocol::{Id, StudentDoubt};
    use crate::quiz::{QuizQuestion, QuizStats, Submission};
    use chrono::Duration;

    fn text_at(sheet: &Sheet, row: usize, col: usize) -> &str {
        sheet.cell(row, col).and_then(|c| c.as_text()).unwrap_or("")
    }

    fn class_report() -> ClassReport {
        let start = Utc::now() - Duration::minutes(90);
        let mut attendance = AttendanceTracker::new();
        attendance.on_connect_at("Ms. Rao", Role::Teacher, start);
        attendance.on_connect_at("Priya", Role::Student, start);
        attendance.on_disconnect_at("Priya", start + Duration::seconds(3723));
        attendance.on_connect_at("Ravi", Role::Student, start);
        attendance.on_disconnect_at("Ravi", start + Duration::seconds(10));

        let mut doubts = DoubtBoard::new();
        for (id, text) in [(1, "What is DNA?"), (2, "What is RNA?")] {
            doubts.receive(StudentDoubt {
                id: Some(Id::Number(id)),
                name: "Priya".to_string(),
                text: text.to_string(),
                voice_generated: false,
            });
        }

        ClassReport::collect(&attendance, &doubts, "Cells", None, Local::now())
    }

    #[test]
    fn test_format_duration() {
        assert_eq!(format_duration(0), "0s");
        assert_eq!(format_duration(-5), "0s");
        assert_eq!(format_duration(999), "0s");
        assert_eq!(format_duration(3_723_000), "1h 2m 3s");
        assert_eq!(format_duration(3_600_000), "1h");
        assert_eq!(format_duration(61_000), "1m 1s");
    }

    #[test]
    fn test_class_report_layout() {
        let report = class_report();
        let sheet = report.sheet();

        assert_eq!(sheet.name, "Class Report");
        assert_eq!(text_at(&sheet, 0, 0), "CLASS DETAILS");
        assert_eq!(sheet.cell(0, 0).unwrap().style, CellStyle::Banner);
        assert_eq!(text_at(&sheet, 1, 0), "Date:");
        assert_eq!(text_at(&sheet, 2, 1), "Cells");
        assert_eq!(text_at(&sheet, 3, 1), "No summary available.");
        assert!(sheet.rows[4].is_empty());
        assert_eq!(text_at(&sheet, 5, 0), "STUDENT DETAILS");
        assert_eq!(text_at(&sheet, 6, 4), "Question");
        assert_eq!(
            sheet.merges,
            vec![Merge { row: 0, last_col: 4 }, Merge { row: 5, last_col: 4 }]
        );
        assert_eq!(sheet.widths, vec![20.0, 15.0, 15.0, 12.0, 100.0]);
    }

    #[test]
    fn test_class_report_students_only() {
        let sheet = class_report().sheet();
        assert_eq!(sheet.rows.len(), 9);

        assert_eq!(text_at(&sheet, 7, 0), "Priya");
        assert_eq!(text_at(&sheet, 7, 2), "1h 2m 3s");
        assert_eq!(sheet.cell(7, 3).unwrap().value, CellValue::Number(1.0));
        assert_eq!(text_at(&sheet, 7, 4), "1. What is DNA? 2. What is RNA?");

        assert_eq!(text_at(&sheet, 8, 0), "Ravi");
        assert_eq!(text_at(&sheet, 8, 2), "10s");
        assert_eq!(text_at(&sheet, 8, 4), "-");
    }

    #[test]
    fn test_class_report_file_name() {
        let report = class_report();
        let expected = format!("Class_Report_{}.xlsx", report.date.format("%d-%m-%Y"));
        assert_eq!(report.file_name(), expected);
    }

    fn quiz_report() -> QuizReport {
        QuizReport {
            topic: "Cell Biology".to_string(),
            date: Local::now(),
            results: QuizResultsReport {
                stats: QuizStats {
                    total_submissions: 2,
                    average_score: 75.0,
                    highest_score: 100.0,
                    lowest_score: 50.0,
                },
                submissions: vec![
                    Submission {
                        student_name: "Priya".to_string(),
                        score: 100.0,
                        correct_count: 2,
                        total_questions: 2,
                        submitted_at: None,
                    },
                    Submission {
                        student_name: "Ravi".to_string(),
                        score: 50.0,
                        correct_count: 1,
                        total_questions: 2,
                        submitted_at: None,
                    },
                ],
                questions: vec![QuizQuestion {
                    question: "Powerhouse of the cell?".to_string(),
                    options: vec!["Nucleus".to_string(), "Mitochondria".to_string()],
                    correct_answer: Some(1),
                }],
            },
        }
    }

    #[test]
    fn test_quiz_report_layout() {
        let sheet = quiz_report().sheet();

        assert_eq!(sheet.name, "Quiz Report");
        assert_eq!(text_at(&sheet, 0, 0), "QUIZ REPORT: Cell Biology");
        assert!(text_at(&sheet, 1, 0).starts_with("Date: "));
        assert_eq!(text_at(&sheet, 3, 0), "QUIZ STATISTICS");
        assert_eq!(text_at(&sheet, 5, 1), "75%");
        assert_eq!(text_at(&sheet, 7, 0), "STUDENT RESULTS");
        assert_eq!(text_at(&sheet, 9, 2), "2/2");
        assert_eq!(text_at(&sheet, 10, 1), "50%");
        assert_eq!(text_at(&sheet, 12, 0), "QUIZ QUESTIONS & CORRECT ANSWERS");
        assert_eq!(text_at(&sheet, 14, 2), "B. Mitochondria");

        let rows: Vec<u32> = sheet.merges.iter().map(|m| m.row).collect();
        assert_eq!(rows, vec![0, 3, 7, 12]);
        assert!(sheet.merges.iter().all(|m| m.last_col == 3));
        assert_eq!(sheet.widths, vec![25.0, 50.0, 30.0, 20.0]);
    }

    #[test]
    fn test_quiz_report_file_name_underscores_topic() {
        let report = quiz_report();
        assert!(report.file_name().starts_with("Quiz_Report_Cell_Biology_"));
        assert!(report.file_name().ends_with(".xlsx"));
    }

    #[test]
    fn test_write_sheet_creates_workbook() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("reports").join("class.xlsx");
        write_sheet(&class_report().sheet(), &path).unwrap();

        let bytes = std::fs::read(&path).unwrap();
        assert!(bytes.starts_with(b"PK"));
    }
}
