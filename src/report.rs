//! End-of-session report: per-identity rows, summary and people-vs-time timeline.

use std::fs::File;
use std::io::{self, Write};
use std::path::Path;

use serde::Serialize;

use crate::error::Result;
use crate::tracker::Track;

/// Column headers of the per-identity section.
pub const REPORT_HEADER: [&str; 5] = [
    "Face_ID",
    "Attention_Time_s",
    "start_time",
    "end_time",
    "Total_Time_s",
];

/// Column headers of the timeline artifact.
pub const TIMELINE_HEADER: [&str; 2] = ["time_seconds", "people_count"];

/// One identity's totals. Start and end are seconds since session start.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReportRow {
    pub face_id: u64,
    pub attention_time_s: f64,
    pub start_time: f64,
    pub end_time: f64,
    pub total_time_s: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SessionSummary {
    pub total_people_watched: usize,
    pub total_attention_time_s: f64,
    /// 0 when no identity was ever seen
    pub average_attention_time_s: f64,
    pub campaign_duration_s: f64,
}

/// Active identities after one processed frame.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct TimelineSample {
    /// Seconds since session start
    pub time_seconds: f64,
    pub people_count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SessionReport {
    pub rows: Vec<ReportRow>,
    pub summary: SessionSummary,
    pub timeline: Vec<TimelineSample>,
}

impl SessionReport {
    /// Aggregate the full track history.
    ///
    /// Rows come out in ascending id order whatever the order of `tracks`.
    pub fn build(
        tracks: &[&Track],
        session_start: f64,
        session_end: f64,
        timeline: Vec<TimelineSample>,
    ) -> Self {
        let mut rows: Vec<ReportRow> = tracks
            .iter()
            .map(|t| ReportRow {
                face_id: t.id,
                attention_time_s: t.attention_time,
                start_time: t.first_seen_time - session_start,
                end_time: t.last_seen_time - session_start,
                total_time_s: t.total_time,
            })
            .collect();
        rows.sort_by_key(|r| r.face_id);

        let total_people_watched = rows.len();
        let total_attention_time_s: f64 = rows.iter().map(|r| r.attention_time_s).sum();
        let average_attention_time_s = if total_people_watched > 0 {
            total_attention_time_s / total_people_watched as f64
        } else {
            0.0
        };

        Self {
            rows,
            summary: SessionSummary {
                total_people_watched,
                total_attention_time_s,
                average_attention_time_s,
                campaign_duration_s: (session_end - session_start).max(0.0),
            },
            timeline,
        }
    }

    /// Write the CSV report: identity rows, a blank line, then the summary block.
    pub fn write_csv<W: Write>(&self, mut writer: W) -> Result<()> {
        {
            let mut wtr = csv_writer(&mut writer);
            wtr.write_record(REPORT_HEADER)?;
            for row in &self.rows {
                wtr.write_record([
                    row.face_id.to_string(),
                    seconds(row.attention_time_s),
                    seconds(row.start_time),
                    seconds(row.end_time),
                    seconds(row.total_time_s),
                ])?;
            }
            wtr.flush()?;
        }
        // An empty csv record would be written as `""`, not as a blank line.
        writer.write_all(b"\n")?;

        let summary = &self.summary;
        let mut wtr = csv_writer(&mut writer);
        wtr.write_record(["Summary"])?;
        wtr.write_record([
            "Total_People_Watched".to_string(),
            summary.total_people_watched.to_string(),
        ])?;
        wtr.write_record([
            "Total_Attention_Time_s".to_string(),
            seconds(summary.total_attention_time_s),
        ])?;
        wtr.write_record([
            "Average_Attention_Time_s".to_string(),
            seconds(summary.average_attention_time_s),
        ])?;
        wtr.write_record([
            "Campaign_Duration_s".to_string(),
            seconds(summary.campaign_duration_s),
        ])?;
        wtr.flush()?;
        Ok(())
    }

    /// Write the `(time_seconds, people_count)` samples for an external chart.
    pub fn write_timeline_csv<W: Write>(&self, writer: W) -> Result<()> {
        let mut wtr = csv_writer(writer);
        wtr.write_record(TIMELINE_HEADER)?;
        for sample in &self.timeline {
            wtr.write_record([
                format!("{:.3}", sample.time_seconds),
                sample.people_count.to_string(),
            ])?;
        }
        wtr.flush()?;
        Ok(())
    }

    pub fn save_csv(&self, path: impl AsRef<Path>) -> Result<()> {
        let file = File::create(path)?;
        self.write_csv(io::BufWriter::new(file))
    }

    pub fn save_timeline_csv(&self, path: impl AsRef<Path>) -> Result<()> {
        let file = File::create(path)?;
        self.write_timeline_csv(io::BufWriter::new(file))
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

fn csv_writer<W: Write>(writer: W) -> csv::Writer<W> {
    csv::WriterBuilder::new()
        .flexible(true)
        .terminator(csv::Terminator::Any(b'\n'))
        .from_writer(writer)
}

/// Time fields are reported with one decimal.
fn seconds(value: f64) -> String {
    format!("{:.1}", value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tracker::Observation;

    fn track(id: u64, first: f64, last: f64, attention: f64, total: f64) -> Track {
        let mut t = Track::new(id, &Observation::at(0.0, 0.0), first);
        t.last_seen_time = last;
        t.attention_time = attention;
        t.total_time = total;
        t
    }

    #[test]
    fn test_build_sorts_and_summarizes() {
        let a = track(2, 12.0, 15.0, 1.0, 3.0);
        let b = track(1, 10.5, 11.0, 0.5, 0.5);
        let report = SessionReport::build(&[&a, &b], 10.0, 20.0, vec![]);

        let ids: Vec<u64> = report.rows.iter().map(|r| r.face_id).collect();
        assert_eq!(ids, vec![1, 2]);
        assert_eq!(report.rows[1].start_time, 2.0);
        assert_eq!(report.rows[1].end_time, 5.0);
        assert_eq!(report.summary.total_people_watched, 2);
        assert_eq!(report.summary.total_attention_time_s, 1.5);
        assert_eq!(report.summary.average_attention_time_s, 0.75);
        assert_eq!(report.summary.campaign_duration_s, 10.0);
    }

    #[test]
    fn test_empty_history() {
        let report = SessionReport::build(&[], 0.0, 0.0, vec![]);
        assert_eq!(report.summary.total_people_watched, 0);
        assert_eq!(report.summary.average_attention_time_s, 0.0);
    }

    #[test]
    fn test_csv_layout() {
        let a = track(1, 0.0, 0.033, 0.066, 0.066);
        let report = SessionReport::build(&[&a], 0.0, 3.04, vec![]);
        let mut out = Vec::new();
        report.write_csv(&mut out).unwrap();
        let expected = "\
Face_ID,Attention_Time_s,start_time,end_time,Total_Time_s
1,0.1,0.0,0.0,0.1

Summary
Total_People_Watched,1
Total_Attention_Time_s,0.1
Average_Attention_Time_s,0.1
Campaign_Duration_s,3.0
";
        assert_eq!(String::from_utf8(out).unwrap(), expected);
    }

    #[test]
    fn test_csv_empty_report() {
        let report = SessionReport::build(&[], 0.0, 0.0, vec![]);
        let mut out = Vec::new();
        report.write_csv(&mut out).unwrap();
        let text = String::from_utf8(out).unwrap();
        assert!(text.starts_with("Face_ID,Attention_Time_s,start_time,end_time,Total_Time_s\n\nSummary\n"));
        assert!(text.contains("Total_People_Watched,0\n"));
        assert!(text.contains("Average_Attention_Time_s,0.0\n"));
    }

    #[test]
    fn test_timeline_csv_uses_integer_counts() {
        let timeline = vec![
            TimelineSample {
                time_seconds: 0.0,
                people_count: 0,
            },
            TimelineSample {
                time_seconds: 0.5,
                people_count: 2,
            },
        ];
        let report = SessionReport::build(&[], 0.0, 0.5, timeline);
        let mut out = Vec::new();
        report.write_timeline_csv(&mut out).unwrap();
        assert_eq!(
            String::from_utf8(out).unwrap(),
            "time_seconds,people_count\n0.000,0\n0.500,2\n"
        );
    }

    #[test]
    fn test_json_export() {
        let report = SessionReport::build(&[], 0.0, 1.0, vec![]);
        let json = report.to_json().unwrap();
        assert!(json.contains("\"total_people_watched\": 0"));
        assert!(json.contains("\"campaign_duration_s\": 1.0"));
    }
}
