// Paginated PDF rendition of an entity report.
//
// Pages are A4 with no page margin; the content itself keeps a small inset
// the same way the HTML template pads its body. Text uses the standard
// Helvetica fonts so nothing has to be embedded besides the chart images.

use image::RgbImage;
use lopdf::{dictionary, Document, Object, ObjectId, Stream};

use crate::error::ReportError;
use crate::output::CsvTable;

pub const PAGE_WIDTH: f64 = 595.0;
pub const PAGE_HEIGHT: f64 = 842.0;
const INSET: f64 = 36.0;
const CONTENT_WIDTH: f64 = PAGE_WIDTH - 2.0 * INSET;
const CHART_WIDTH: f64 = CONTENT_WIDTH * 0.8;

pub struct PdfSection<'a> {
    pub heading: &'a str,
    pub table: &'a CsvTable,
    /// `None` when the chart file could not be read.
    pub chart: Option<RgbImage>,
}

pub struct PdfReport<'a> {
    pub title: &'a str,
    pub subtitle: String,
    pub sections: Vec<PdfSection<'a>>,
}

/// Content streams under construction, one per page. `y` is measured
/// from the top of the current page.
struct Layout {
    pages: Vec<String>,
    y: f64,
}

impl Layout {
    fn new() -> Self {
        Self {
            pages: vec![String::new()],
            y: INSET,
        }
    }

    fn current(&mut self) -> &mut String {
        // `pages` always holds at least one page.
        let last = self.pages.len() - 1;
        &mut self.pages[last]
    }

    /// Start a new page unless `height` still fits on this one.
    fn reserve(&mut self, height: f64) {
        if self.y + height > PAGE_HEIGHT - INSET && self.y > INSET {
            self.pages.push(String::new());
            self.y = INSET;
        }
    }

    fn text(&mut self, font: &str, size: f64, x: f64, line_height: f64, s: &str) {
        self.reserve(line_height);
        let baseline = PAGE_HEIGHT - self.y - size;
        let op = format!(
            "BT /{} {} Tf {:.2} {:.2} Td ({}) Tj ET\n",
            font,
            size,
            x,
            baseline,
            escape_pdf_string(s)
        );
        self.current().push_str(&op);
        self.y += line_height;
    }

    fn row(&mut self, font: &str, cells: &[String]) {
        let line_height = 15.0;
        self.reserve(line_height);
        let col_width = CONTENT_WIDTH / cells.len().max(1) as f64;
        let baseline = PAGE_HEIGHT - self.y - 10.0;
        let mut op = String::new();
        for (i, cell) in cells.iter().enumerate() {
            op.push_str(&format!(
                "BT /{} 10 Tf {:.2} {:.2} Td ({}) Tj ET\n",
                font,
                INSET + col_width * i as f64 + 4.0,
                baseline,
                escape_pdf_string(cell)
            ));
        }
        self.current().push_str(&op);
        self.y += line_height;
    }

    fn rule(&mut self) {
        let y = PAGE_HEIGHT - self.y + 2.0;
        let op = format!(
            "0.6 G 0.5 w {:.2} {:.2} m {:.2} {:.2} l S 0 G\n",
            INSET,
            y,
            INSET + CONTENT_WIDTH,
            y
        );
        self.current().push_str(&op);
        self.y += 4.0;
    }

    fn image(&mut self, name: &str, width: u32, height: u32) {
        let w = CHART_WIDTH.min(width as f64);
        let h = w * height as f64 / width.max(1) as f64;
        self.reserve(h + 8.0);
        let x = INSET + (CONTENT_WIDTH - w) / 2.0;
        let y = PAGE_HEIGHT - self.y - h;
        let op = format!("q {:.2} 0 0 {:.2} {:.2} {:.2} cm /{} Do Q\n", w, h, x, y, name);
        self.current().push_str(&op);
        self.y += h + 8.0;
    }

    fn gap(&mut self, h: f64) {
        self.y += h;
    }
}

fn image_xobject(img: &RgbImage) -> Stream {
    Stream::new(
        dictionary! {
            "Type" => "XObject",
            "Subtype" => "Image",
            "Width" => img.width() as i64,
            "Height" => img.height() as i64,
            "ColorSpace" => "DeviceRGB",
            "BitsPerComponent" => 8,
        },
        img.as_raw().clone(),
    )
}

pub fn render_pdf(report: &PdfReport<'_>) -> Result<Vec<u8>, ReportError> {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();

    let regular = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Helvetica",
        "Encoding" => "WinAnsiEncoding",
    });
    let bold = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Helvetica-Bold",
        "Encoding" => "WinAnsiEncoding",
    });

    let mut layout = Layout::new();
    layout.text("F2", 20.0, INSET, 28.0, report.title);
    layout.text("F1", 11.0, INSET, 20.0, &report.subtitle);

    let mut xobjects = lopdf::Dictionary::new();
    for (i, section) in report.sections.iter().enumerate() {
        layout.gap(10.0);
        layout.text("F2", 14.0, INSET, 22.0, section.heading);
        layout.row("F2", &section.table.headers);
        layout.rule();
        for row in &section.table.rows {
            layout.row("F1", row);
        }
        layout.gap(6.0);
        match &section.chart {
            Some(img) => {
                let name = format!("Im{}", i + 1);
                let id: ObjectId = doc.add_object(image_xobject(img));
                xobjects.set(name.as_bytes().to_vec(), Object::Reference(id));
                layout.image(&name, img.width(), img.height());
            }
            None => layout.text("F1", 10.0, INSET, 16.0, "(chart unavailable)"),
        }
    }

    let resources_id = doc.add_object(dictionary! {
        "Font" => dictionary! {
            "F1" => regular,
            "F2" => bold,
        },
        "XObject" => xobjects,
    });

    let mut kids: Vec<Object> = Vec::with_capacity(layout.pages.len());
    for content in layout.pages {
        let content_id = doc.add_object(Stream::new(dictionary! {}, content.into_bytes()));
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "MediaBox" => vec![0.into(), 0.into(), (PAGE_WIDTH as i64).into(), (PAGE_HEIGHT as i64).into()],
            "Resources" => resources_id,
            "Contents" => content_id,
        });
        kids.push(page_id.into());
    }

    let count = kids.len() as i64;
    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => count,
        }),
    );
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);
    doc.compress();

    let mut buffer = Vec::new();
    doc.save_to(&mut buffer)
        .map_err(|e| ReportError::Pdf(e.to_string()))?;
    Ok(buffer)
}

/// WinAnsiEncoding code for `c`, for the characters beyond ASCII that the
/// standard fonts can show.
fn win_ansi_code(c: char) -> Option<u8> {
    match c {
        '\u{a0}'..='\u{ff}' => Some(c as u32 as u8),
        '€' => Some(0x80),
        '‘' => Some(0x91),
        '’' => Some(0x92),
        '“' => Some(0x93),
        '”' => Some(0x94),
        '•' => Some(0x95),
        '–' => Some(0x96),
        '—' => Some(0x97),
        _ => None,
    }
}

fn escape_pdf_string(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '(' => out.push_str("\\("),
            ')' => out.push_str("\\)"),
            '\\' => out.push_str("\\\\"),
            c if c.is_ascii() && !c.is_control() => out.push(c),
            c => match win_ansi_code(c) {
                Some(code) => out.push_str(&format!("\\{:03o}", code)),
                None => out.push('?'),
            },
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table(rows: usize) -> CsvTable {
        CsvTable {
            headers: vec!["Status".into(), "Count".into(), "Percentage".into()],
            rows: (0..rows)
                .map(|i| vec![format!("s{}", i), i.to_string(), "1.0%".into()])
                .collect(),
        }
    }

    #[test]
    fn escapes_special_characters() {
        assert_eq!(escape_pdf_string("a(b)c\\"), "a\\(b\\)c\\\\");
        assert_eq!(escape_pdf_string("José"), "Jos\\351");
        assert_eq!(escape_pdf_string("5 €"), "5 \\200");
        assert_eq!(escape_pdf_string("李"), "?");
    }

    #[test]
    fn renders_a_loadable_a4_document() {
        let t = table(3);
        let report = PdfReport {
            title: "mia",
            subtitle: "Total work hours: 40.0 (5.0 days)".to_string(),
            sections: vec![
                PdfSection {
                    heading: "Assigned Tickets",
                    table: &t,
                    chart: Some(RgbImage::new(64, 48)),
                },
                PdfSection {
                    heading: "Reported Tickets",
                    table: &t,
                    chart: None,
                },
            ],
        };
        let bytes = render_pdf(&report).unwrap();
        assert!(bytes.starts_with(b"%PDF-1.5"));

        let doc = Document::load_mem(&bytes).unwrap();
        let pages = doc.get_pages();
        assert_eq!(pages.len(), 1);
        let text = doc.extract_text(&[1]).unwrap();
        assert!(text.contains("mia"));
        assert!(text.contains("chart unavailable"));
    }

    #[test]
    fn fonts_use_win_ansi_encoding() {
        let t = table(1);
        let report = PdfReport {
            title: "José",
            subtitle: String::new(),
            sections: vec![PdfSection {
                heading: "Assigned Tickets",
                table: &t,
                chart: None,
            }],
        };
        let doc = Document::load_mem(&render_pdf(&report).unwrap()).unwrap();
        let encoded_fonts = doc
            .objects
            .values()
            .filter_map(|o| o.as_dict().ok())
            .filter(|d| {
                d.get(b"Encoding").ok() == Some(&Object::Name(b"WinAnsiEncoding".to_vec()))
            })
            .count();
        assert_eq!(encoded_fonts, 2);
    }

    #[test]
    fn long_content_flows_onto_more_pages() {
        let t = table(60);
        let report = PdfReport {
            title: "ned",
            subtitle: String::new(),
            sections: vec![PdfSection {
                heading: "Assigned Tickets",
                table: &t,
                chart: Some(RgbImage::new(640, 480)),
            }],
        };
        let doc = Document::load_mem(&render_pdf(&report).unwrap()).unwrap();
        assert!(doc.get_pages().len() >= 2);
    }
}
