//! Minimal single-page PDF 1.4 writer for certificates.
//!
//! Only the standard Helvetica fonts are used, so no font data is embedded.
//! Text is encoded as WinAnsi; characters outside Latin-1 are replaced by `?`.

use std::fmt::Write;

pub const A4_LANDSCAPE: (f32, f32) = (842.0, 595.0);

/// Average Helvetica glyph width as a fraction of the font size.
const AVG_GLYPH_WIDTH: f32 = 0.5;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Font {
    Regular,
    Bold,
}

impl Font {
    fn resource(&self) -> &'static str {
        match self {
            Font::Regular => "F1",
            Font::Bold => "F2",
        }
    }
}

#[derive(Debug, Clone)]
struct TextRun {
    x: f32,
    y: f32,
    size: f32,
    font: Font,
    text: String,
}

#[derive(Debug, Clone)]
pub struct PdfPage {
    width: f32,
    height: f32,
    runs: Vec<TextRun>,
    border: bool,
}

impl PdfPage {
    pub fn new((width, height): (f32, f32)) -> Self {
        PdfPage {
            width,
            height,
            runs: Vec::new(),
            border: false,
        }
    }

    pub fn with_border(mut self) -> Self {
        self.border = true;
        self
    }

    pub fn text(&mut self, x: f32, y: f32, size: f32, font: Font, text: &str) -> &mut Self {
        self.runs.push(TextRun {
            x,
            y,
            size,
            font,
            text: text.to_string(),
        });
        self
    }

    /// Places the text horizontally centred, using an average glyph width estimate.
    pub fn centered(&mut self, y: f32, size: f32, font: Font, text: &str) -> &mut Self {
        let width = text.chars().count() as f32 * size * AVG_GLYPH_WIDTH;
        let x = ((self.width - width) / 2.0).max(0.0);
        self.text(x, y, size, font, text)
    }

    fn content_stream(&self) -> Vec<u8> {
        let mut content = Vec::new();
        if self.border {
            content.extend_from_slice(
                format!(
                    "2 w 30 30 {:.1} {:.1} re S\n",
                    self.width - 60.0,
                    self.height - 60.0
                )
                .as_bytes(),
            );
        }
        for run in &self.runs {
            content.extend_from_slice(
                format!(
                    "BT /{} {:.1} Tf {:.1} {:.1} Td (",
                    run.font.resource(),
                    run.size,
                    run.x,
                    run.y
                )
                .as_bytes(),
            );
            content.extend_from_slice(&escape_text(&run.text));
            content.extend_from_slice(b") Tj ET\n");
        }
        content
    }

    pub fn render(&self) -> Vec<u8> {
        let content = self.content_stream();
        let mut objects: Vec<Vec<u8>> = vec![
            b"<< /Type /Catalog /Pages 2 0 R >>".to_vec(),
            b"<< /Type /Pages /Kids [3 0 R] /Count 1 >>".to_vec(),
            format!(
                "<< /Type /Page /Parent 2 0 R /MediaBox [0 0 {:.0} {:.0}] \
                /Resources << /Font << /F1 4 0 R /F2 5 0 R >> >> /Contents 6 0 R >>",
                self.width, self.height
            )
            .into_bytes(),
            b"<< /Type /Font /Subtype /Type1 /BaseFont /Helvetica /Encoding /WinAnsiEncoding >>".to_vec(),
            b"<< /Type /Font /Subtype /Type1 /BaseFont /Helvetica-Bold /Encoding /WinAnsiEncoding >>".to_vec(),
        ];
        let mut stream = format!("<< /Length {} >>\nstream\n", content.len()).into_bytes();
        stream.extend_from_slice(&content);
        stream.extend_from_slice(b"\nendstream");
        objects.push(stream);

        let mut out: Vec<u8> = b"%PDF-1.4\n%\xE2\xE3\xCF\xD3\n".to_vec();
        let mut offsets = Vec::with_capacity(objects.len());
        for (index, body) in objects.iter().enumerate() {
            offsets.push(out.len());
            out.extend_from_slice(format!("{} 0 obj\n", index + 1).as_bytes());
            out.extend_from_slice(body);
            out.extend_from_slice(b"\nendobj\n");
        }

        let xref_offset = out.len();
        let mut xref = String::new();
        let _ = write!(xref, "xref\n0 {}\n0000000000 65535 f \n", objects.len() + 1);
        for offset in &offsets {
            let _ = write!(xref, "{offset:010} 00000 n \n");
        }
        let _ = write!(
            xref,
            "trailer\n<< /Size {} /Root 1 0 R >>\nstartxref\n{}\n%%EOF\n",
            objects.len() + 1,
            xref_offset
        );
        out.extend_from_slice(xref.as_bytes());
        out
    }
}

/// Escapes a string for a PDF literal, mapping Latin-1 characters to octal WinAnsi codes.
fn escape_text(text: &str) -> Vec<u8> {
    let mut out = Vec::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '(' | ')' | '\\' => {
                out.push(b'\\');
                out.push(ch as u8);
            }
            '€' => out.extend_from_slice(b"\\200"),
            ' '..='~' => out.push(ch as u8),
            '\u{a0}'..='\u{ff}' => out.extend_from_slice(format!("\\{:03o}", ch as u32).as_bytes()),
            _ => out.push(b'?'),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
        haystack.windows(needle.len()).position(|w| w == needle)
    }

    #[test]
    fn text_is_escaped() {
        assert_eq!(escape_text("a(b)c\\"), b"a\\(b\\)c\\\\".to_vec());
        assert_eq!(escape_text("é"), b"\\351".to_vec());
        assert_eq!(escape_text("€"), b"\\200".to_vec());
        assert_eq!(escape_text("漢"), b"?".to_vec());
    }

    #[test]
    fn document_has_header_and_trailer() {
        let mut page = PdfPage::new(A4_LANDSCAPE);
        page.centered(400.0, 24.0, Font::Bold, "Certificate");
        let pdf = page.render();
        assert!(pdf.starts_with(b"%PDF-1.4\n"));
        assert!(pdf.ends_with(b"%%EOF\n"));
        assert!(find(&pdf, b"/MediaBox [0 0 842 595]").is_some());
        assert!(find(&pdf, b"(Certificate) Tj").is_some());
    }

    #[test]
    fn xref_offsets_point_at_objects() {
        let mut page = PdfPage::new(A4_LANDSCAPE).with_border();
        page.text(50.0, 50.0, 12.0, Font::Regular, "Number 1");
        let pdf = page.render();

        let startxref = find(&pdf, b"startxref\n").unwrap() + "startxref\n".len();
        let tail = std::str::from_utf8(&pdf[startxref..]).unwrap();
        let xref_offset: usize = tail.lines().next().unwrap().parse().unwrap();
        assert!(pdf[xref_offset..].starts_with(b"xref\n0 7\n"));

        let table = std::str::from_utf8(&pdf[xref_offset..]).unwrap();
        for (n, line) in table.lines().skip(3).take(6).enumerate() {
            let offset: usize = line[..10].parse().unwrap();
            let expected = format!("{} 0 obj\n", n + 1);
            assert!(pdf[offset..].starts_with(expected.as_bytes()), "object {}", n + 1);
        }
    }

    #[test]
    fn stream_length_matches_content() {
        let mut page = PdfPage::new(A4_LANDSCAPE);
        page.text(10.0, 10.0, 10.0, Font::Regular, "x");
        let content_len = page.content_stream().len();
        let pdf = page.render();
        assert!(find(&pdf, format!("<< /Length {content_len} >>").as_bytes()).is_some());
    }

    #[test]
    fn centering_never_goes_negative() {
        let mut page = PdfPage::new((100.0, 100.0));
        page.centered(10.0, 40.0, Font::Regular, "a very long line of text");
        assert_eq!(page.runs[0].x, 0.0);
    }
}
