//! Integration test: compare two small in-memory documents and export the
//! full HTML report.

#![allow(clippy::unwrap_used)]

use std::ops::ControlFlow;

use image::Rgb;
use pdfdiff_core::{
    Comparison, DiffSettings, InMemoryPage, InMemorySource, ReportAssembler, RgbImage,
};
use pdfdiff_export::{HtmlReport, ReportMetadata};

fn page(changed: bool, text: &str) -> InMemoryPage {
    let image = RgbImage::from_fn(240, 320, |x, y| {
        if changed && (60..140).contains(&x) && (100..130).contains(&y) {
            Rgb([0, 0, 0])
        } else {
            Rgb([255, 255, 255])
        }
    });
    InMemoryPage::new(image, text)
}

#[test]
fn comparison_to_html_report() {
    let a: InMemorySource = [page(false, "Chapter 1\nIt was a dark night."), page(false, "The end.")]
        .into_iter()
        .collect();
    let b: InMemorySource = [page(true, "Chapter 1\nIt was a stormy night."), page(false, "The end.")]
        .into_iter()
        .collect();

    let settings = DiffSettings::default();
    let metadata = ReportMetadata {
        name_a: "draft.pdf".to_owned(),
        name_b: "final.pdf".to_owned(),
        generated_at: None,
    };
    let mut html = HtmlReport::new(metadata, settings.text_similarity_warn());
    let mut assembler = ReportAssembler::new(settings.text_similarity_warn());

    let run = Comparison::new(settings, &a, &b).run(|result| {
        html.add_page(&result).unwrap();
        assembler.push(&result);
        ControlFlow::Continue(())
    });
    assert_eq!(run.pages_compared, 2);

    let summary = assembler.finish();
    assert_eq!(summary.pages[0].boxes.len(), 1);
    assert!(summary.pages[1].boxes.is_empty());
    assert_eq!(summary.low_pages, vec![1]);

    let document = html.render(&summary);
    assert_eq!(html.page_count(), 2);
    assert_eq!(document.matches("<section id=").count(), 2);
    assert_eq!(document.matches("data:image/png;base64,").count(), 2);
    assert!(document.contains("-It was a dark night."));
    assert!(document.contains("+It was a stormy night."));
    assert!(!document.contains("Generated:"));

    let json = serde_json::to_string(&summary).unwrap();
    assert!(json.contains("\"total_boxes\":1"));
}
