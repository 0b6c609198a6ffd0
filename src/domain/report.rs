//! Clinical report composition.
//!
//! The report has a fixed section layout. Composition is pure; rendering to a
//! page format happens behind the `ReportRenderer` port.

use chrono::NaiveDateTime;

use super::diagnosis::PredictionResult;
use super::patient::PatientRecord;

pub const REPORT_TITLE: &str = "Heart Disease Risk Assessment Report";

pub const SEPARATOR: &str = "----------------------------------------";

/// Timestamp layout used in the report header.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Identical for every patient.
pub const PRECAUTIONS: [&str; 5] = [
    "Maintain a balanced diet low in saturated fats and sodium",
    "Engage in regular physical activity (30 minutes/day)",
    "Avoid tobacco and excessive alcohol",
    "Monitor blood pressure and cholesterol levels",
    "Follow up with a healthcare provider for personalized guidance",
];

pub const ATTRIBUTION: &str =
    "This report is generated with care and poetry by Rajlakshmi's HeartVerse.";

/// Suffix of every report file name.
pub const REPORT_FILE_SUFFIX: &str = "_heart_report.pdf";

/// A composed report, ready to be rendered.
#[derive(Debug, Clone, PartialEq)]
pub struct ClinicalReport {
    pub patient_name: String,
    pub generated_on: NaiveDateTime,
    /// Patient detail lines as (label, formatted value), in fixed order.
    pub details: Vec<(&'static str, String)>,
    pub prediction: PredictionResult,
}

impl ClinicalReport {
    /// Assemble the report for one submission.
    #[must_use]
    pub fn compose(
        record: &PatientRecord,
        result: &PredictionResult,
        generated_on: NaiveDateTime,
    ) -> Self {
        let details = vec![
            ("Age", record.age.to_string()),
            ("Sex", record.sex.to_string()),
            ("Chest Pain Type", record.chest_pain.to_string()),
            ("Resting Blood Pressure", format!("{} mmHg", format_real(record.resting_bp))),
            ("Cholesterol", format!("{} mg/dL", format_real(record.cholesterol))),
            ("Max Heart Rate Achieved", format!("{} bpm", format_real(record.max_heart_rate))),
            ("ST Depression", format_real(record.st_depression)),
            ("Major Vessels", record.major_vessels.to_string()),
            ("Thalassemia", record.thal.to_string()),
        ];

        Self {
            patient_name: record.name.clone(),
            generated_on,
            details,
            prediction: *result,
        }
    }

    #[must_use]
    pub fn doctor_note(&self) -> &'static str {
        self.prediction.outcome.doctor_note()
    }

    /// File name offered to the caller for this report.
    #[must_use]
    pub fn file_name(&self) -> String {
        report_file_name(&self.patient_name)
    }

    /// Report body as lines, blank lines included.
    #[must_use]
    pub fn lines(&self) -> Vec<String> {
        let mut lines = vec![
            REPORT_TITLE.to_string(),
            String::new(),
            format!("Patient Name: {}", self.patient_name),
            format!("Generated On: {}", self.generated_on.format(TIMESTAMP_FORMAT)),
        ];

        section_break(&mut lines);
        lines.push("Patient Details:".to_string());
        lines.extend(
            self.details
                .iter()
                .map(|(label, value)| format!("{label}: {value}")),
        );

        section_break(&mut lines);
        let prediction = &self.prediction;
        lines.push(format!("Prediction: {}", prediction.outcome.headline()));
        lines.push(format!("Confidence Score: {}", prediction.confidence_percent()));
        lines.push(format!("Risk Category: {}", prediction.risk_level));

        section_break(&mut lines);
        lines.push("Doctor's Note:".to_string());
        lines.push(self.doctor_note().to_string());

        section_break(&mut lines);
        lines.push("Precautionary Advice:".to_string());
        lines.extend(PRECAUTIONS.iter().map(|p| format!("\u{2022} {p}")));

        section_break(&mut lines);
        lines.push(ATTRIBUTION.to_string());

        lines
    }

    /// Report body as a single newline-joined string.
    #[must_use]
    pub fn to_text(&self) -> String {
        self.lines().join("\n")
    }
}

fn section_break(lines: &mut Vec<String>) {
    lines.push(String::new());
    lines.push(SEPARATOR.to_string());
    lines.push(String::new());
}

/// Format a real-valued field: integral values keep one decimal (`130.0`).
#[must_use]
pub fn format_real(value: f64) -> String {
    if value.is_finite() && value.fract() == 0.0 && value.abs() < 1e16 {
        format!("{value:.1}")
    } else {
        value.to_string()
    }
}

/// `"{name}_heart_report.pdf"`, with path separators and control characters
/// in the name replaced by `_` so the result is always a bare file name.
#[must_use]
pub fn report_file_name(patient_name: &str) -> String {
    let stem: String = patient_name
        .chars()
        .map(|c| match c {
            '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => '_',
            c if c.is_control() => '_',
            c => c,
        })
        .collect();
    let stem = if stem == "." || stem == ".." { "_".to_string() } else { stem };
    format!("{stem}{REPORT_FILE_SUFFIX}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::patient::tests::sample_record;
    use chrono::NaiveDate;

    fn timestamp() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2026, 3, 14)
            .and_then(|d| d.and_hms_opt(9, 26, 53))
            .expect("valid timestamp")
    }

    #[test]
    fn test_report_contains_header_fields() {
        let result = PredictionResult::new(1, 0.8234);
        let report = ClinicalReport::compose(&sample_record(), &result, timestamp());
        let text = report.to_text();

        assert!(text.starts_with(REPORT_TITLE));
        assert!(text.contains("Patient Name: Jane Doe"));
        assert!(text.contains("Generated On: 2026-03-14 09:26:53"));
        assert!(text.contains("Confidence Score: 82.34%"));
        assert_eq!(report.prediction, result);
        assert!(text.contains("Risk Category: High"));
        assert!(text.ends_with(ATTRIBUTION));
    }

    #[test]
    fn test_detail_fields_in_fixed_order() {
        let result = PredictionResult::new(0, 0.12);
        let report = ClinicalReport::compose(&sample_record(), &result, timestamp());
        let lines = report.lines();

        let start = lines
            .iter()
            .position(|l| l == "Patient Details:")
            .expect("details section");
        assert_eq!(
            &lines[start + 1..start + 10],
            &[
                "Age: 54",
                "Sex: Male",
                "Chest Pain Type: typical angina",
                "Resting Blood Pressure: 130.0 mmHg",
                "Cholesterol: 246.0 mg/dL",
                "Max Heart Rate Achieved: 150.0 bpm",
                "ST Depression: 1.0",
                "Major Vessels: 0",
                "Thalassemia: normal",
            ]
        );
    }

    #[test]
    fn test_precautions_are_fixed_bullets() {
        let a = ClinicalReport::compose(&sample_record(), &PredictionResult::new(0, 0.1), timestamp());
        let b = ClinicalReport::compose(&sample_record(), &PredictionResult::new(1, 0.9), timestamp());

        let bullets = |r: &ClinicalReport| -> Vec<String> {
            r.lines().into_iter().filter(|l| l.starts_with('\u{2022}')).collect()
        };
        assert_eq!(bullets(&a).len(), 5);
        assert_eq!(bullets(&a), bullets(&b));
    }

    #[test]
    fn test_separators_split_sections() {
        let report = ClinicalReport::compose(&sample_record(), &PredictionResult::new(0, 0.1), timestamp());
        let count = report.lines().iter().filter(|l| *l == SEPARATOR).count();
        assert_eq!(count, 5);
    }

    #[test]
    fn test_format_real() {
        assert_eq!(format_real(130.0), "130.0");
        assert_eq!(format_real(1.5), "1.5");
        assert_eq!(format_real(-0.25), "-0.25");
        assert_eq!(format_real(0.0), "0.0");
    }

    #[test]
    fn test_report_file_name() {
        assert_eq!(report_file_name("Jane Doe"), "Jane Doe_heart_report.pdf");
        assert_eq!(report_file_name("../etc/x"), ".._etc_x_heart_report.pdf");
        assert_eq!(report_file_name(""), "_heart_report.pdf");
        assert_eq!(report_file_name("a\nb"), "a_b_heart_report.pdf");
    }
}
