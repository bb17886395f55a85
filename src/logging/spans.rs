//! Structured span for one alignment run
//!
//! Fields are declared up front as `Empty` and filled in as the stages
//! finish, so the closing span in the JSON log carries the whole result.

use crate::pipeline::types::{Circle, NotchEstimate, Orientation};
use std::time::Instant;
use tracing::{field, span, Level, Span};
use uuid::Uuid;

pub struct AlignmentSpan {
    span: Span,
    start_time: Instant,
    run_id: Uuid,
}

impl AlignmentSpan {
    pub fn new(run_id: Uuid, source: &str, image_size: (u32, u32)) -> Self {
        let span = span!(
            Level::INFO,
            "wafer_alignment",
            run_id = %run_id,
            source = source,
            width = image_size.0,
            height = image_size.1,
            circle_x = field::Empty,
            circle_y = field::Empty,
            circle_radius = field::Empty,
            boundary_candidates = field::Empty,
            notch_fallback = field::Empty,
            notch_length = field::Empty,
            raw_angle = field::Empty,
            correction_angle = field::Empty,
            success = field::Empty,
            execution_time_ms = field::Empty
        );

        Self {
            span,
            start_time: Instant::now(),
            run_id,
        }
    }

    pub fn run_id(&self) -> Uuid {
        self.run_id
    }

    pub fn record_boundary(&self, circle: &Circle, candidates: usize) {
        self.span.record("circle_x", circle.center.x);
        self.span.record("circle_y", circle.center.y);
        self.span.record("circle_radius", circle.radius);
        self.span.record("boundary_candidates", candidates);
        tracing::debug!(
            parent: &self.span,
            center = format!("({:.1}, {:.1})", circle.center.x, circle.center.y),
            radius = circle.radius,
            candidates = candidates,
            "Boundary selected"
        );
    }

    pub fn record_notch(&self, notch: &NotchEstimate) {
        self.span.record("notch_fallback", notch.is_fallback());
        self.span.record("notch_length", notch.segment.length());
        tracing::debug!(
            parent: &self.span,
            p1 = format!("({:.0}, {:.0})", notch.segment.p1.x, notch.segment.p1.y),
            p2 = format!("({:.0}, {:.0})", notch.segment.p2.x, notch.segment.p2.y),
            fallback = notch.is_fallback(),
            "Notch selected"
        );
    }

    pub fn record_orientation(&self, orientation: &Orientation) {
        self.span.record("raw_angle", orientation.normalized_degrees);
        self.span.record("correction_angle", orientation.correction_degrees);
    }

    /// Record the final status; call once at the end of the run
    pub fn record_result(&self, success: bool, description: &str) {
        let duration = self.start_time.elapsed();
        self.span.record("success", success);
        self.span.record("execution_time_ms", duration.as_secs_f64() * 1000.0);

        if success {
            tracing::info!(
                parent: &self.span,
                execution_time_ms = duration.as_millis(),
                description = description,
                "Wafer alignment completed"
            );
        } else {
            tracing::warn!(
                parent: &self.span,
                execution_time_ms = duration.as_millis(),
                description = description,
                "Wafer alignment did not produce an image"
            );
        }
    }

    pub fn enter(&self) -> tracing::span::Entered<'_> {
        self.span.enter()
    }
}
