use std::collections::BTreeMap;
use std::io::{stdout, Write};

use anyhow::{anyhow, Context, Result};
use handlebars::handlebars_helper;
use rac::summary::{ErrorCount, Summary};
use serde::Serialize;

#[derive(Debug, Clone)]
pub enum Format {
    Json,
    Text,
}

impl clap::ValueEnum for Format {
    fn value_variants<'a>() -> &'a [Self] {
        &[Self::Json, Self::Text]
    }

    fn to_possible_value(&self) -> Option<clap::builder::PossibleValue> {
        match self {
            Self::Json => Some(clap::builder::PossibleValue::new("json")),
            Self::Text => Some(clap::builder::PossibleValue::new("text")),
        }
    }
}

#[derive(Debug, Serialize)]
struct Report<'a> {
    records: usize,
    errors: usize,
    warnings: usize,
    families: &'a BTreeMap<&'static str, usize>,
    error_messages: Vec<ErrorCount>,
}

impl<'a> From<&'a Summary> for Report<'a> {
    fn from(summary: &'a Summary) -> Self {
        Report {
            records: summary.records,
            errors: summary.errors,
            warnings: summary.warnings,
            families: &summary.families,
            error_messages: summary.error_counts(),
        }
    }
}

pub fn print(summary: &Summary, format: &Format) -> Result<()> {
    let report = Report::from(summary);
    match format {
        Format::Json => {
            serde_json::to_writer_pretty(stdout(), &report).context("serializing to json")?;
            writeln!(stdout()).context("writing to stdout")
        }
        Format::Text => {
            let data = render_text(&report)?;
            stdout()
                .write_all(data.as_bytes())
                .context("writing to stdout")
        }
    }
}

fn render_text(report: &Report) -> Result<String> {
    handlebars_helper!(left_pad: |width: u64, v: Json| {
        let v = match v {
            serde_json::Value::String(s) => s.to_owned(),
            serde_json::Value::Null => String::new(),
            _ => v.to_string()
        };
        let width = usize::try_from(width).unwrap_or_default();
        format!("{v:>width$}")
    });
    let mut hb = handlebars::Handlebars::new();
    hb.register_escape_fn(handlebars::no_escape);
    hb.register_helper("lpad", Box::new(left_pad));
    hb.register_template_string("summary", TEXT_TEMPLATE)
        .map_err(|err| anyhow!("invalid summary template: {err}"))?;

    hb.render("summary", report).context("rendering text")
}

const TEXT_TEMPLATE: &str = r"
Statistics
===============================================================================
Family        Count
-------------------------------------------------------------------------------
{{ #each families }}{{ lpad 6 @key }}  {{ lpad 11 this }}
{{ /each }}-------------------------------------------------------------------------------
  Count  Error Message
-------------------------------------------------------------------------------
{{ #each error_messages }}{{ lpad 7 count }}  {{ message }}
{{ /each }}===============================================================================
Total Errors:   {{ errors }}
Total Warnings: {{ warnings }}
Total Packages: {{ records }}
";

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use hifitime::Epoch;
    use rac::aez::Stat;
    use rac::{Provenance, Record, RecordError};

    use super::*;

    #[test]
    fn text() {
        let origin = Arc::new(Provenance::new(
            "test",
            Epoch::from_gregorian_utc_at_midnight(2024, 1, 1),
        ));
        let mut stat = Record::new(origin.clone());
        stat.payload = Some(Stat::default().into());

        let mut summary = Summary::default();
        summary.add(&stat);
        summary.add(&Record::new(origin.clone()).with_error(RecordError::Orphaned));
        summary.add(&Record::new(origin.clone()).with_error(RecordError::UnhandledSid(2)));
        summary.add(&Record::new(origin).with_error(RecordError::UnhandledSid(2)));

        let text = render_text(&Report::from(&summary)).unwrap();

        assert!(text.contains("  STAT            1\n"), "{text}");
        assert!(text.contains("      2  unhandled SID 2\n"), "{text}");
        assert!(
            text.contains("      1  orphaned multi-package data without termination detected\n"),
            "{text}"
        );
        assert!(text.contains("Total Errors:   3\n"), "{text}");
        assert!(text.contains("Total Packages: 4\n"), "{text}");
        let sid = text.find("unhandled SID").unwrap();
        let orphaned = text.find("orphaned").unwrap();
        assert!(sid < orphaned, "{text}");
    }

    #[test]
    fn json() {
        let summary = Summary::default();
        let value = serde_json::to_value(Report::from(&summary)).unwrap();
        assert_eq!(value["records"], 0);
        assert!(value["error_messages"].as_array().unwrap().is_empty());
    }
}
