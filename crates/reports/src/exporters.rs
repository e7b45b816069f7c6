//! Report exporters - CSV, JSON, Markdown
//!
//! A report is a titled table plus summary pairs ([`ReportData`]); a
//! [`Workbook`] groups several of them the way a multi-sheet spreadsheet would.

use serde_json::{Map, Value};

/// Trait for exporting reports to different formats
pub trait ReportExporter {
    /// Export to the target format
    fn export(&self, report: &dyn ReportData) -> String;

    /// Export every section of a workbook into one document
    fn export_workbook(&self, workbook: &Workbook) -> String {
        workbook
            .sections()
            .iter()
            .map(|section| self.export(section.as_ref()))
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Get the file extension for this format
    fn extension(&self) -> &'static str;

    /// Get the MIME type for this format
    fn mime_type(&self) -> &'static str;
}

/// Trait for data that can be exported
pub trait ReportData {
    /// Get the report title
    fn title(&self) -> &str;

    /// Get column headers
    fn headers(&self) -> Vec<String>;

    /// Get data rows
    fn rows(&self) -> Vec<Vec<String>>;

    /// Get summary statistics as key-value pairs
    fn summary(&self) -> Vec<(String, String)>;
}

/// Several reports exported together
pub struct Workbook {
    title: String,
    sections: Vec<Box<dyn ReportData>>,
}

impl Workbook {
    pub fn new(title: &str) -> Self {
        Self {
            title: title.to_string(),
            sections: Vec::new(),
        }
    }

    pub fn with_section(mut self, section: impl ReportData + 'static) -> Self {
        self.sections.push(Box::new(section));
        self
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn sections(&self) -> &[Box<dyn ReportData>] {
        &self.sections
    }
}

// ============================================================================
// CSV Exporter
// ============================================================================

/// CSV format exporter, quoting through the `csv` writer
pub struct CsvExporter {
    delimiter: u8,
    include_header: bool,
}

impl Default for CsvExporter {
    fn default() -> Self {
        Self {
            delimiter: b',',
            include_header: true,
        }
    }
}

impl CsvExporter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_delimiter(mut self, delimiter: u8) -> Self {
        self.delimiter = delimiter;
        self
    }

    pub fn without_header(mut self) -> Self {
        self.include_header = false;
        self
    }

    fn records<I>(&self, records: I) -> csv::Result<String>
    where
        I: IntoIterator<Item = Vec<String>>,
    {
        let mut wrt = csv::WriterBuilder::new()
            .delimiter(self.delimiter)
            .flexible(true)
            .from_writer(Vec::new());
        for record in records {
            wrt.write_record(&record)?;
        }
        let bytes = wrt.into_inner().map_err(|e| e.into_error())?;
        Ok(String::from_utf8_lossy(&bytes).into_owned())
    }

    fn table(&self, report: &dyn ReportData) -> Vec<Vec<String>> {
        let mut records = Vec::new();
        if self.include_header {
            records.push(report.headers());
        }
        records.extend(report.rows());
        records
    }
}

impl ReportExporter for CsvExporter {
    fn export(&self, report: &dyn ReportData) -> String {
        self.records(self.table(report)).unwrap_or_default()
    }

    /// Sections separated by a blank line, each introduced by its title
    fn export_workbook(&self, workbook: &Workbook) -> String {
        workbook
            .sections()
            .iter()
            .map(|section| {
                let mut records = vec![vec![format!("# {}", section.title())]];
                records.extend(self.table(section.as_ref()));
                self.records(records).unwrap_or_default()
            })
            .collect::<Vec<_>>()
            .join("\n")
    }

    fn extension(&self) -> &'static str {
        "csv"
    }

    fn mime_type(&self) -> &'static str {
        "text/csv"
    }
}

// ============================================================================
// JSON Exporter
// ============================================================================

/// JSON format exporter
pub struct JsonExporter {
    pretty: bool,
}

impl Default for JsonExporter {
    fn default() -> Self {
        Self { pretty: true }
    }
}

impl JsonExporter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn compact(mut self) -> Self {
        self.pretty = false;
        self
    }

    fn to_value(report: &dyn ReportData) -> Value {
        let headers = report.headers();

        let data: Vec<Value> = report
            .rows()
            .into_iter()
            .map(|row| {
                let mut obj = Map::new();
                for (i, header) in headers.iter().enumerate() {
                    let value = row.get(i).cloned().unwrap_or_default();
                    obj.insert(header.clone(), Value::String(value));
                }
                Value::Object(obj)
            })
            .collect();

        let summary: Map<String, Value> = report
            .summary()
            .into_iter()
            .map(|(k, v)| (k, Value::String(v)))
            .collect();

        serde_json::json!({
            "title": report.title(),
            "summary": summary,
            "data": data,
        })
    }

    fn render(&self, value: &Value) -> String {
        if self.pretty {
            serde_json::to_string_pretty(value).unwrap_or_default()
        } else {
            serde_json::to_string(value).unwrap_or_default()
        }
    }
}

impl ReportExporter for JsonExporter {
    fn export(&self, report: &dyn ReportData) -> String {
        self.render(&Self::to_value(report))
    }

    fn export_workbook(&self, workbook: &Workbook) -> String {
        let sections: Vec<Value> = workbook
            .sections()
            .iter()
            .map(|section| Self::to_value(section.as_ref()))
            .collect();
        self.render(&serde_json::json!({
            "title": workbook.title(),
            "sections": sections,
        }))
    }

    fn extension(&self) -> &'static str {
        "json"
    }

    fn mime_type(&self) -> &'static str {
        "application/json"
    }
}

// ============================================================================
// Markdown Exporter
// ============================================================================

/// Markdown format exporter
pub struct MarkdownExporter {
    include_summary: bool,
    include_toc: bool,
}

impl Default for MarkdownExporter {
    fn default() -> Self {
        Self {
            include_summary: true,
            include_toc: false,
        }
    }
}

impl MarkdownExporter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn without_summary(mut self) -> Self {
        self.include_summary = false;
        self
    }

    pub fn with_toc(mut self) -> Self {
        self.include_toc = true;
        self
    }

    /// Body of one report with headings starting at `level`
    fn body(&self, report: &dyn ReportData, level: usize) -> String {
        let heading = "#".repeat(level);
        let mut output = String::new();

        let summary = report.summary();
        if self.include_summary && !summary.is_empty() {
            output.push_str(&format!("{} Summary\n\n", heading));
            for (key, value) in summary {
                output.push_str(&format!("- **{}**: {}\n", key, value));
            }
            output.push('\n');
        }

        let headers = report.headers();
        if !headers.is_empty() {
            output.push_str(&format!("{} Data\n\n", heading));

            output.push_str("| ");
            output.push_str(&headers.join(" | "));
            output.push_str(" |\n");

            output.push_str("| ");
            output.push_str(&headers.iter().map(|_| "---").collect::<Vec<_>>().join(" | "));
            output.push_str(" |\n");

            for row in report.rows() {
                let cells: Vec<String> = row.iter().map(|c| c.replace('|', "\\|")).collect();
                output.push_str("| ");
                output.push_str(&cells.join(" | "));
                output.push_str(" |\n");
            }
        }

        output
    }
}

/// Anchor GitHub generates for a heading
fn anchor(title: &str) -> String {
    title
        .to_lowercase()
        .chars()
        .filter_map(|c| match c {
            ' ' => Some('-'),
            c if c.is_alphanumeric() || c == '-' || c == '_' => Some(c),
            _ => None,
        })
        .collect()
}

impl ReportExporter for MarkdownExporter {
    fn export(&self, report: &dyn ReportData) -> String {
        let mut output = format!("# {}\n\n", report.title());

        if self.include_toc {
            output.push_str("## Table of Contents\n\n");
            if self.include_summary {
                output.push_str("- [Summary](#summary)\n");
            }
            output.push_str("- [Data](#data)\n\n");
        }

        output.push_str(&self.body(report, 2));
        output
    }

    fn export_workbook(&self, workbook: &Workbook) -> String {
        let mut output = format!("# {}\n\n", workbook.title());

        if self.include_toc {
            output.push_str("## Table of Contents\n\n");
            for section in workbook.sections() {
                output.push_str(&format!(
                    "- [{}](#{})\n",
                    section.title(),
                    anchor(section.title())
                ));
            }
            output.push('\n');
        }

        for section in workbook.sections() {
            output.push_str(&format!("## {}\n\n", section.title()));
            output.push_str(&self.body(section.as_ref(), 3));
        }
        output
    }

    fn extension(&self) -> &'static str {
        "md"
    }

    fn mime_type(&self) -> &'static str {
        "text/markdown"
    }
}
