// HTML report rendering.
//
// Templates use `{{ name }}` placeholders. Values are inserted verbatim,
// so callers escape plain text and pass table fragments as-is.

use std::collections::HashMap;

use crate::output::CsvTable;
use crate::util::html_escape;

/// Values substituted into the report template.
#[derive(Debug, Clone, Default)]
pub struct ReportContext {
    pub entity_name: String,
    pub assigned_table: String,
    pub reported_table: String,
    pub work_hours_table: String,
    pub total_hours: String,
    pub total_days: String,
    pub assigned_chart: String,
    pub reported_chart: String,
    pub work_hours_chart: String,
}

impl ReportContext {
    fn values(&self) -> HashMap<&'static str, String> {
        HashMap::from([
            ("entity_name", html_escape(&self.entity_name)),
            ("assigned_table", self.assigned_table.clone()),
            ("reported_table", self.reported_table.clone()),
            ("work_hours_table", self.work_hours_table.clone()),
            ("total_hours", html_escape(&self.total_hours)),
            ("total_days", html_escape(&self.total_days)),
            ("assigned_chart", self.assigned_chart.clone()),
            ("reported_chart", self.reported_chart.clone()),
            ("work_hours_chart", self.work_hours_chart.clone()),
        ])
    }
}

/// Substitute every known `{{ key }}` (inner whitespace optional).
/// Unknown placeholders are left untouched.
pub fn render(template: &str, ctx: &ReportContext) -> String {
    let values = ctx.values();
    let mut out = String::with_capacity(template.len());
    let mut rest = template;
    while let Some(open) = rest.find("{{") {
        out.push_str(&rest[..open]);
        let after = &rest[open + 2..];
        let Some(close) = after.find("}}") else {
            out.push_str(&rest[open..]);
            return out;
        };
        let key = after[..close].trim();
        match values.get(key) {
            Some(value) => out.push_str(value),
            None => out.push_str(&rest[open..open + 2 + close + 2]),
        }
        rest = &after[close + 2..];
    }
    out.push_str(rest);
    out
}

/// `<table>` fragment with a header row and no index column.
pub fn html_table(table: &CsvTable) -> String {
    let mut html = String::from("<table border=\"1\" class=\"dataframe table\">\n  <thead>\n    <tr style=\"text-align: right;\">\n");
    for h in &table.headers {
        html.push_str(&format!("      <th>{}</th>\n", html_escape(h)));
    }
    html.push_str("    </tr>\n  </thead>\n  <tbody>\n");
    for row in &table.rows {
        html.push_str("    <tr>\n");
        for cell in row {
            html.push_str(&format!("      <td>{}</td>\n", html_escape(cell)));
        }
        html.push_str("    </tr>\n");
    }
    html.push_str("  </tbody>\n</table>");
    html
}

pub fn png_data_uri(encoded: &str) -> String {
    format!("data:image/png;base64,{}", encoded)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn substitutes_known_placeholders() {
        let ctx = ReportContext {
            entity_name: "Lee <QA>".to_string(),
            total_hours: "40.0".to_string(),
            assigned_table: "<table></table>".to_string(),
            ..Default::default()
        };
        let out = render(
            "<h1>{{ entity_name }}</h1>{{total_hours}}h {{ assigned_table }} {{ unknown }}",
            &ctx,
        );
        assert_eq!(
            out,
            "<h1>Lee &lt;QA&gt;</h1>40.0h <table></table> {{ unknown }}"
        );
    }

    #[test]
    fn unterminated_placeholder_is_kept() {
        let ctx = ReportContext::default();
        assert_eq!(render("a {{ entity_name", &ctx), "a {{ entity_name");
    }

    #[test]
    fn table_fragment_has_header_and_rows() {
        let table = CsvTable {
            headers: vec!["Status".into(), "Count".into(), "Percentage".into()],
            rows: vec![
                vec!["resolved".into(), "1".into(), "100.0%".into()],
                vec!["Total".into(), "1".into(), "100.0%".into()],
            ],
        };
        let html = html_table(&table);
        assert!(html.starts_with("<table border=\"1\" class=\"dataframe table\">"));
        assert_eq!(html.matches("<th>").count(), 3);
        assert_eq!(html.matches("<tr>").count(), 2);
        assert!(html.contains("<td>100.0%</td>"));
    }

    #[test]
    fn data_uri_prefix() {
        assert_eq!(png_data_uri("AAAA"), "data:image/png;base64,AAAA");
    }
}
