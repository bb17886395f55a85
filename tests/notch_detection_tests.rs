use opencv::core::{Mat, Point, Scalar, CV_8UC1};
use opencv::imgproc;
use opencv::prelude::*;
use wafer_aligner::pipeline::{Circle, NotchDetector, NotchInput, Point2};
use wafer_aligner::{NullSink, PipelineStage};

fn blank_edges(size: i32) -> Mat {
    Mat::new_rows_cols_with_default(size, size, CV_8UC1, Scalar::all(0.0)).unwrap()
}

fn draw(edges: &mut Mat, from: (i32, i32), to: (i32, i32)) {
    imgproc::line(
        edges,
        Point::new(from.0, from.1),
        Point::new(to.0, to.1),
        Scalar::all(255.0),
        1,
        imgproc::LINE_8,
        0,
    )
    .unwrap();
}

#[test]
fn test_longest_line_inside_boundary_wins() {
    let mut edges = blank_edges(500);
    draw(&mut edges, (150, 300), (350, 300));
    draw(&mut edges, (200, 150), (280, 150));
    let circle = Circle::new(Point2::new(250.0, 250.0), 180.0).unwrap();

    let estimate = NotchDetector::default()
        .execute(NotchInput { edges: &edges, circle: &circle }, &mut NullSink)
        .unwrap();

    assert!(!estimate.is_fallback());
    let segment = estimate.segment;
    assert!((segment.p1.y - 300.0).abs() <= 1.0 && (segment.p2.y - 300.0).abs() <= 1.0, "{:?}", segment);
    assert!(segment.length() > 180.0, "{:?}", segment);
}

#[test]
fn test_lines_outside_boundary_ignored() {
    let mut edges = blank_edges(500);
    // Long line in the corner, outside the disk
    draw(&mut edges, (0, 10), (480, 10));
    draw(&mut edges, (220, 260), (300, 260));
    let circle = Circle::new(Point2::new(250.0, 250.0), 150.0).unwrap();

    let estimate = NotchDetector::default()
        .execute(NotchInput { edges: &edges, circle: &circle }, &mut NullSink)
        .unwrap();

    assert!(!estimate.is_fallback());
    assert!((estimate.segment.p1.y - 260.0).abs() <= 1.0, "{:?}", estimate.segment);
}

#[test]
fn test_short_lines_fall_back_to_vertical_chord() {
    let mut edges = blank_edges(400);
    draw(&mut edges, (190, 200), (210, 200));
    let circle = Circle::new(Point2::new(200.0, 200.0), 120.0).unwrap();

    let estimate = NotchDetector::default()
        .execute(NotchInput { edges: &edges, circle: &circle }, &mut NullSink)
        .unwrap();

    assert!(estimate.is_fallback());
    assert_eq!(estimate.segment.p1, Point2::new(200.0, 320.0));
    assert_eq!(estimate.segment.p2, Point2::new(200.0, 80.0));
}
