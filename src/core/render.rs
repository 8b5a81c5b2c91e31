use crate::domain::model::{display_upper_constraint, display_version, OutputFormat, StatusRow};
use crate::utils::error::{Result, StatusError};
use chrono::{DateTime, Utc};
use serde::Serialize;

pub struct RenderContext<'a> {
    pub release: &'a str,
    pub rows: &'a [StatusRow],
    pub include_obs: bool,
    pub generated_at: DateTime<Utc>,
}

pub fn render(ctx: &RenderContext<'_>, format: OutputFormat) -> Result<String> {
    match format {
        OutputFormat::Text => Ok(render_text(ctx)),
        OutputFormat::Html => Ok(render_html(ctx)),
        OutputFormat::Csv => render_csv(ctx),
        OutputFormat::Json => render_json(ctx),
    }
}

fn header(ctx: &RenderContext<'_>) -> Vec<String> {
    let mut fields = vec![
        "name".to_string(),
        format!("release ({})", ctx.release),
        format!("u-c ({})", ctx.release),
        format!("rpm packaging ({})", ctx.release),
    ];
    if ctx.include_obs {
        fields.push("obs".to_string());
    }
    fields.push("comment".to_string());
    fields
}

fn cells(row: &StatusRow, include_obs: bool) -> Vec<String> {
    let record = &row.record;
    let mut cells = vec![
        record.name.clone(),
        record.release.to_string(),
        display_upper_constraint(record.upper_constraint.as_deref()),
        display_version(record.rpm_packaging.as_ref()),
    ];
    if include_obs {
        cells.push(display_version(record.obs_published.as_ref()));
    }
    cells.push(row.status.to_string());
    cells
}

/// 外框表格，欄位置中
pub fn render_text(ctx: &RenderContext<'_>) -> String {
    let header = header(ctx);
    let body: Vec<Vec<String>> = ctx.rows.iter().map(|r| cells(r, ctx.include_obs)).collect();

    let widths: Vec<usize> = (0..header.len())
        .map(|i| {
            std::iter::once(&header[i])
                .chain(body.iter().map(|row| &row[i]))
                .map(|cell| cell.chars().count())
                .max()
                .unwrap_or(0)
        })
        .collect();

    let rule = format!(
        "+{}+",
        widths
            .iter()
            .map(|w| "-".repeat(w + 2))
            .collect::<Vec<_>>()
            .join("+")
    );
    let line = |row: &[String]| -> String {
        let padded: Vec<String> = row
            .iter()
            .zip(&widths)
            .map(|(cell, &width)| {
                let len = cell.chars().count();
                let left = (width - len) / 2;
                let right = width - len - left;
                format!(" {}{}{} ", " ".repeat(left), cell, " ".repeat(right))
            })
            .collect();
        format!("|{}|", padded.join("|"))
    };

    let mut out = vec![rule.clone(), line(header.as_slice()), rule.clone()];
    out.extend(body.iter().map(|row| line(row.as_slice())));
    out.push(rule);
    out.join("\n") + "\n"
}

pub fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

pub fn render_html(ctx: &RenderContext<'_>) -> String {
    const ROW_STYLE: &str = "border-bottom:1pt solid black;";
    let release = escape_html(ctx.release);
    let mut html = String::new();

    html.push_str("<!DOCTYPE html>\n<html>\n<head>\n<meta charset=\"utf-8\">\n");
    html.push_str(&format!(
        "<title>rpm-packaging status ({})</title>\n</head>\n<body>\n",
        release
    ));
    html.push_str("<table style=\"border-collapse: collapse;\">\n<thead>\n");

    html.push_str(&format!("<tr style=\"{}\">", ROW_STYLE));
    for field in header(ctx) {
        html.push_str(&format!("<th>{}</th>", escape_html(&field)));
    }
    html.push_str("</tr>\n</thead>\n<tbody>\n");

    for row in ctx.rows {
        let cells = cells(row, ctx.include_obs);
        let Some((comment, values)) = cells.split_last() else {
            continue;
        };
        html.push_str(&format!("<tr style=\"{}\">", ROW_STYLE));
        for value in values {
            html.push_str(&format!("<td>{}</td>", escape_html(value)));
        }
        html.push_str(&format!(
            "<td style=\"background-color:{}\">{}</td></tr>\n",
            row.status.html_color(),
            escape_html(comment)
        ));
    }

    html.push_str("</tbody>\n</table>\n");
    html.push_str(&format!(
        "<p>Generated at {}</p>\n</body>\n</html>\n",
        ctx.generated_at.format("%Y-%m-%d %H:%M:%S UTC")
    ));
    html
}

pub fn render_csv(ctx: &RenderContext<'_>) -> Result<String> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    writer.write_record(header(ctx))?;
    for row in ctx.rows {
        writer.write_record(cells(row, ctx.include_obs))?;
    }

    let data = writer
        .into_inner()
        .map_err(|e| StatusError::ProcessingError {
            message: format!("CSV writer flush failed: {}", e),
        })?;
    String::from_utf8(data).map_err(|e| StatusError::ProcessingError {
        message: format!("CSV output is not UTF-8: {}", e),
    })
}

#[derive(Serialize)]
struct JsonReport<'a> {
    release: &'a str,
    generated_at: String,
    include_obs: bool,
    projects: &'a [StatusRow],
}

pub fn render_json(ctx: &RenderContext<'_>) -> Result<String> {
    let report = JsonReport {
        release: ctx.release,
        generated_at: ctx.generated_at.to_rfc3339(),
        include_obs: ctx.include_obs,
        projects: ctx.rows,
    };
    Ok(serde_json::to_string_pretty(&report)? + "\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::model::ProjectRecord;
    use crate::domain::status::PackagingStatus;
    use crate::domain::version::Version;
    use chrono::TimeZone;

    fn rows() -> Vec<StatusRow> {
        let record = |name: &str, release: &str, uc: Option<&str>, rpm: Option<&str>| {
            let record = ProjectRecord {
                name: name.to_string(),
                package_name: name.to_string(),
                release: Version::parse(release).unwrap(),
                upper_constraint: uc.map(str::to_string),
                rpm_packaging: rpm.map(|v| Version::parse(v).unwrap()),
                obs_published: None,
            };
            let status = PackagingStatus::evaluate(&record);
            StatusRow { record, status }
        };
        vec![
            record("glance", "12.0.0", Some("12.0.0"), Some("12.0.0")),
            record("nova", "13.1.0", None, None),
        ]
    }

    fn ctx(rows: &[StatusRow], include_obs: bool) -> RenderContext<'_> {
        RenderContext {
            release: "mitaka",
            rows,
            include_obs,
            generated_at: Utc.with_ymd_and_hms(2016, 4, 7, 12, 0, 0).unwrap(),
        }
    }

    #[test]
    fn test_text_table_layout() {
        let rows = rows();
        let text = render_text(&ctx(&rows, false));
        let lines: Vec<&str> = text.lines().collect();

        assert_eq!(lines.len(), 6);
        assert!(lines[0].starts_with("+--------+"));
        assert_eq!(lines[0], lines[2]);
        assert_eq!(lines[0], lines[5]);
        assert!(lines[1].contains("| release (mitaka) |"));
        assert!(lines[3].starts_with("| glance |"));
        assert!(lines[4].contains("needs packaging"));
        assert!(lines[4].contains("|      -       |"));
        // 每一行等寬
        assert!(lines.iter().all(|l| l.len() == lines[0].len()));
    }

    #[test]
    fn test_obs_column_optional() {
        let rows = rows();
        assert!(!render_text(&ctx(&rows, false)).contains("| obs |"));
        assert!(render_text(&ctx(&rows, true)).contains("| obs |"));
    }

    #[test]
    fn test_html_colors_and_escaping() {
        let rows = rows();
        let mut context = ctx(&rows, false);
        context.release = "<mitaka>";
        let html = render_html(&context);

        assert!(html.contains("<table style=\"border-collapse: collapse;\">"));
        assert!(html.contains("<tr style=\"border-bottom:1pt solid black;\">"));
        assert!(html.contains("<td style=\"background-color:green\">perfect</td>"));
        assert!(html.contains("<td style=\"background-color:yellow\">needs packaging</td>"));
        assert!(html.contains("release (&lt;mitaka&gt;)"));
        assert!(html.contains("Generated at 2016-04-07 12:00:00 UTC"));
    }

    #[test]
    fn test_csv_output() {
        let rows = rows();
        let csv = render_csv(&ctx(&rows, false)).unwrap();
        let lines: Vec<&str> = csv.lines().collect();
        assert_eq!(
            lines[0],
            "name,release (mitaka),u-c (mitaka),rpm packaging (mitaka),comment"
        );
        assert_eq!(lines[2], "nova,13.1.0,-,0,needs packaging");
    }

    #[test]
    fn test_json_output() {
        let rows = rows();
        let json = render_json(&ctx(&rows, true)).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();

        assert_eq!(value["release"], "mitaka");
        assert_eq!(value["include_obs"], true);
        assert_eq!(value["projects"][0]["name"], "glance");
        assert_eq!(value["projects"][0]["status"], "perfect");
        assert_eq!(value["projects"][1]["rpm_packaging"], serde_json::Value::Null);
    }
}
