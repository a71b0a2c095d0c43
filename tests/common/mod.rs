//! Minimal PDF writer for fixtures: Helvetica text placed with absolute
//! text matrices, one content stream per page.

/// A run of text drawn at `(x, y)` in 12pt Helvetica.
pub type TextRun<'a> = (f64, f64, &'a str);

pub fn pdf_with_text(pages: &[Vec<TextRun<'_>>]) -> Vec<u8> {
    // 1 catalog, 2 page tree, 3 font, then a page and its content per page
    let kids: Vec<String> = (0..pages.len()).map(|i| format!("{} 0 R", 4 + 2 * i)).collect();
    let mut objects = vec![
        "<< /Type /Catalog /Pages 2 0 R >>".to_string(),
        format!("<< /Type /Pages /Kids [{}] /Count {} >>", kids.join(" "), pages.len()),
        "<< /Type /Font /Subtype /Type1 /BaseFont /Helvetica /Encoding /WinAnsiEncoding >>"
            .to_string(),
    ];

    for (i, runs) in pages.iter().enumerate() {
        let mut content = String::from("BT\n/F1 12 Tf\n");
        for (x, y, text) in runs {
            content.push_str(&format!("1 0 0 1 {} {} Tm ({}) Tj\n", x, y, escape(text)));
        }
        content.push_str("ET");

        objects.push(format!(
            "<< /Type /Page /Parent 2 0 R /MediaBox [0 0 612 792] \
             /Resources << /Font << /F1 3 0 R >> >> /Contents {} 0 R >>",
            5 + 2 * i
        ));
        objects.push(format!(
            "<< /Length {} >>\nstream\n{}\nendstream",
            content.len(),
            content
        ));
    }

    let mut out = b"%PDF-1.4\n".to_vec();
    let mut offsets = Vec::with_capacity(objects.len());
    for (i, object) in objects.iter().enumerate() {
        offsets.push(out.len());
        out.extend_from_slice(format!("{} 0 obj\n{}\nendobj\n", i + 1, object).as_bytes());
    }

    let xref = out.len();
    out.extend_from_slice(format!("xref\n0 {}\n0000000000 65535 f \n", objects.len() + 1).as_bytes());
    for offset in offsets {
        out.extend_from_slice(format!("{:010} 00000 n \n", offset).as_bytes());
    }
    out.extend_from_slice(
        format!(
            "trailer\n<< /Size {} /Root 1 0 R >>\nstartxref\n{}\n%%EOF\n",
            objects.len() + 1,
            xref
        )
        .as_bytes(),
    );
    out
}

/// The invoice listing used across tests: three columns at x = 72/250/400.
pub fn invoice_page(top: f64) -> Vec<TextRun<'static>> {
    let mut runs = vec![(72.0, top + 40.0, "Notas fiscais emitidas")];
    let rows = [
        ["Empresa", "Valor", "Data"],
        ["Acme Ltda", "1500", "2024-01-10"],
        ["Beta SA", "320.75", "2024-01-11"],
    ];
    for (i, row) in rows.iter().enumerate() {
        let y = top - 20.0 * i as f64;
        for (x, text) in [72.0, 250.0, 400.0].into_iter().zip(row.iter().copied()) {
            runs.push((x, y, text));
        }
    }
    runs.push((72.0, top - 80.0, "Total de notas: 2"));
    runs
}

fn escape(text: &str) -> String {
    text.replace('\\', "\\\\").replace('(', "\\(").replace(')', "\\)")
}
