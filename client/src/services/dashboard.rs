//! Analytics dashboard
//!
//! Turns the backend's [`FormAnalysis`] into per-question panels and keeps
//! the rendered charts in a [`ChartRegistry`] for bulk image export.
//! Rendering itself belongs to an external chart library, reached through
//! [`ChartRenderer`].

use crate::error::{ClientError, ClientResult};
use serde_json::Value;
use survey_shared::analytics::{present, FormAnalysis, Presentation, QuestionAnalysis};
use survey_shared::{QuestionId, QuestionType};
use tracing::{debug, info};

/// One question on the dashboard
#[derive(Debug, Clone, PartialEq)]
pub struct QuestionPanel {
    pub question_id: QuestionId,
    pub title: String,
    pub question_type: QuestionType,
    pub total_answers: u64,
    pub presentation: Presentation,
}

impl QuestionPanel {
    /// Chart option object, when the panel is charted
    pub fn chart_option(&self) -> Option<Value> {
        match &self.presentation {
            Presentation::Chart { series, .. } => Some(series.to_chart_option(&self.title)),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Dashboard {
    pub form_title: String,
    pub total_responses: u64,
    pub panels: Vec<QuestionPanel>,
}

impl Dashboard {
    pub fn charted(&self) -> impl Iterator<Item = &QuestionPanel> {
        self.panels
            .iter()
            .filter(|p| matches!(p.presentation, Presentation::Chart { .. }))
    }
}

/// Lay out a form analysis, one panel per question in backend order
pub fn build_dashboard(analysis: &FormAnalysis, sample_limit: usize) -> Dashboard {
    let panels: Vec<QuestionPanel> = analysis
        .questions_analysis
        .iter()
        .map(|q| panel(q, sample_limit))
        .collect();

    let skipped = panels
        .iter()
        .filter(|p| p.presentation == Presentation::Skipped)
        .count();
    debug!(
        form = %analysis.form_title,
        panels = panels.len(),
        skipped,
        "Dashboard built"
    );

    Dashboard {
        form_title: analysis.form_title.clone(),
        total_responses: analysis.total_responses,
        panels,
    }
}

fn panel(analysis: &QuestionAnalysis, sample_limit: usize) -> QuestionPanel {
    QuestionPanel {
        question_id: analysis.question_id.clone(),
        title: analysis.question_title.clone(),
        question_type: analysis.question_type,
        total_answers: analysis.total_answers,
        presentation: present(analysis, sample_limit),
    }
}

// ============================================================================
// Chart images
// ============================================================================

/// RGBA raster, row-major
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChartImage {
    pub width: u32,
    pub height: u32,
    pub pixels: Vec<u8>,
}

impl ChartImage {
    pub const WHITE: [u8; 4] = [255, 255, 255, 255];

    pub fn filled(width: u32, height: u32, color: [u8; 4]) -> Self {
        let pixels = color
            .iter()
            .copied()
            .cycle()
            .take(width as usize * height as usize * 4)
            .collect();
        Self {
            width,
            height,
            pixels,
        }
    }

    /// Buffer holds exactly `width * height` RGBA pixels
    pub fn is_well_formed(&self) -> bool {
        self.pixels.len() == self.width as usize * self.height as usize * 4
    }

    pub fn pixel(&self, x: u32, y: u32) -> Option<[u8; 4]> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let i = (y as usize * self.width as usize + x as usize) * 4;
        let mut px = [0u8; 4];
        px.copy_from_slice(self.pixels.get(i..i + 4)?);
        Some(px)
    }

    /// Copy `other` with its top-left corner at (0, `y`)
    fn blit_row(&mut self, other: &ChartImage, y: u32) {
        let dst_stride = self.width as usize * 4;
        let src_stride = other.width as usize * 4;
        for row in 0..other.height as usize {
            let dst = (y as usize + row) * dst_stride;
            let src = row * src_stride;
            self.pixels[dst..dst + src_stride].copy_from_slice(&other.pixels[src..src + src_stride]);
        }
    }

    /// Binary PPM (alpha dropped)
    pub fn to_ppm(&self) -> Vec<u8> {
        let mut out = format!("P6\n{} {}\n255\n", self.width, self.height).into_bytes();
        out.extend(self.pixels.chunks_exact(4).flat_map(|px| px[..3].to_vec()));
        out
    }
}

/// Rasterizes a chart option object
pub trait ChartRenderer: Send + Sync {
    fn render(&self, option: &Value) -> ClientResult<ChartImage>;
}

/// A chart kept for export
#[derive(Debug, Clone)]
pub struct RegisteredChart {
    pub id: QuestionId,
    pub title: String,
    pub image: ChartImage,
}

/// Rendered charts in registration order
pub struct ChartRegistry {
    renderer: Box<dyn ChartRenderer>,
    charts: Vec<RegisteredChart>,
}

impl ChartRegistry {
    pub fn new(renderer: Box<dyn ChartRenderer>) -> Self {
        Self {
            renderer,
            charts: Vec::new(),
        }
    }

    /// Render and register every charted panel
    pub fn register_dashboard(&mut self, dashboard: &Dashboard) -> ClientResult<usize> {
        let mut count = 0;
        for panel in dashboard.charted() {
            if let Some(option) = panel.chart_option() {
                self.register(panel.question_id.clone(), panel.title.clone(), &option)?;
                count += 1;
            }
        }
        Ok(count)
    }

    /// Render one chart; re-registering an id replaces it in place
    pub fn register(&mut self, id: QuestionId, title: String, option: &Value) -> ClientResult<()> {
        let image = self.renderer.render(option)?;
        if !image.is_well_formed() {
            return Err(ClientError::InvalidState(format!(
                "renderer returned {} bytes for a {}x{} chart",
                image.pixels.len(),
                image.width,
                image.height
            )));
        }
        let chart = RegisteredChart { id, title, image };
        match self.charts.iter_mut().find(|c| c.id == chart.id) {
            Some(existing) => *existing = chart,
            None => self.charts.push(chart),
        }
        Ok(())
    }

    pub fn unregister(&mut self, id: &QuestionId) {
        self.charts.retain(|c| &c.id != id);
    }

    pub fn len(&self) -> usize {
        self.charts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.charts.is_empty()
    }

    /// Every chart as its own image
    pub fn export_each(&self) -> Vec<RegisteredChart> {
        info!(charts = self.charts.len(), "Exporting charts individually");
        self.charts.clone()
    }

    /// All charts stacked top to bottom on a white background.
    ///
    /// Width is the widest chart, height the sum of all heights.
    pub fn export_combined(&self) -> ClientResult<ChartImage> {
        if self.charts.is_empty() {
            return Err(ClientError::InvalidState("no charts to export".to_string()));
        }
        let width = self.charts.iter().map(|c| c.image.width).max().unwrap_or(0);
        let height = self.charts.iter().map(|c| c.image.height).sum();

        let mut combined = ChartImage::filled(width, height, ChartImage::WHITE);
        let mut y = 0;
        for chart in &self.charts {
            combined.blit_row(&chart.image, y);
            y += chart.image.height;
        }
        info!(charts = self.charts.len(), width, height, "Exported combined chart image");
        Ok(combined)
    }
}
