use quill_core::artifact::ArtifactId;
use quill_core::config::{RendererKind, UiConfig};
use unicode_width::UnicodeWidthStr;

use super::{Artifact, ArtifactRegistry};
use crate::transcript::{Style, StyledLine, StyledSpan};

/// Open/closed state owned by the host layout.
///
/// The controller only reads it and asks for changes through
/// [`PanelBag::request_open`].
pub trait PanelBag {
    fn is_open(&self) -> bool;
    fn request_open(&mut self, open: bool);
}

/// Geometry of the side panel region, in terminal cells.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PanelContainer {
    pub width: u16,
    pub height: u16,
}

impl PanelContainer {
    /// Computes the side panel region for a terminal of the given size.
    ///
    /// Returns `None` when the panel is disabled or the share of the width
    /// it would get is below `min_panel_width`.
    pub fn for_terminal(width: u16, height: u16, ui: &UiConfig) -> Option<Self> {
        if !ui.side_panel {
            return None;
        }
        let ratio = u32::from(ui.panel_ratio_percent.clamp(10, 90));
        let panel_width = u16::try_from(u32::from(width) * ratio / 100).unwrap_or(width);
        if panel_width < ui.min_panel_width.max(1) {
            return None;
        }
        Some(Self {
            width: panel_width,
            height,
        })
    }

    fn is_usable(self) -> bool {
        self.width > 0 && self.height > 0
    }
}

/// The panel facility as seen by the controller for one frame.
pub enum PanelContext<'a> {
    Present {
        container: PanelContainer,
        bag: &'a mut dyn PanelBag,
    },
    Absent,
}

impl<'a> PanelContext<'a> {
    /// Builds a context; anything missing or zero-sized resolves to `Absent`.
    pub fn resolve(
        container: Option<PanelContainer>,
        bag: Option<&'a mut dyn PanelBag>,
    ) -> Self {
        match (container, bag) {
            (Some(container), Some(bag)) if container.is_usable() => {
                Self::Present { container, bag }
            }
            _ => Self::Absent,
        }
    }

    pub fn info(&self) -> PanelInfo {
        match self {
            Self::Present { container, bag } => PanelInfo::Present {
                width: container.width,
                open: bag.is_open(),
            },
            Self::Absent => PanelInfo::Absent,
        }
    }
}

/// Read-only snapshot of the panel facility, used for rendering.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PanelInfo {
    Present { width: u16, open: bool },
    Absent,
}

/// Collapsed header shown for a panel-hosted artifact.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PanelSummary {
    pub title: String,
    pub caption: &'static str,
    pub indicator: char,
}

impl PanelSummary {
    fn new(title: &str, open: bool) -> Self {
        Self {
            title: title.to_string(),
            caption: if open { "open" } else { "closed" },
            indicator: if open { '▾' } else { '▸' },
        }
    }

    pub fn to_line(&self) -> StyledLine {
        StyledLine {
            spans: vec![
                StyledSpan::new(format!("{} ", self.indicator), Style::ArtifactIndicator),
                StyledSpan::new(self.title.clone(), Style::ArtifactTitle),
                StyledSpan::new(format!(" · {}", self.caption), Style::ArtifactCaption),
            ],
        }
    }
}

/// What to draw for an artifact this frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ArtifactView {
    /// Panel-hosted: a summary row, plus the body when the panel is open.
    Panel {
        summary: PanelSummary,
        body: Option<Vec<StyledLine>>,
    },
    /// No panel facility: a bordered block inside the transcript.
    Inline {
        title: String,
        body: Vec<StyledLine>,
    },
}

/// Horizontal padding inside the panel body.
const PANEL_PADDING: u16 = 1;

/// Decides where an artifact is shown and auto-opens the panel once per
/// artifact identity.
#[derive(Debug, Clone)]
pub struct ArtifactPanelController {
    artifact_id: Option<ArtifactId>,
    auto_opened: bool,
    registry: ArtifactRegistry,
    renderer: RendererKind,
}

impl ArtifactPanelController {
    pub fn new(registry: ArtifactRegistry, renderer: RendererKind) -> Self {
        Self {
            artifact_id: None,
            auto_opened: false,
            registry,
            renderer,
        }
    }

    /// Runs every frame before rendering.
    ///
    /// A new artifact identity resets the auto-open flag. The first time the
    /// panel facility is present for an identity, a closed panel is opened;
    /// after that the user's choice sticks. Returns `true` when it asked the
    /// panel to open.
    pub fn sync(&mut self, artifact: &Artifact, ctx: PanelContext<'_>) -> bool {
        if self.artifact_id != Some(artifact.id) {
            self.artifact_id = Some(artifact.id);
            self.auto_opened = false;
        }

        let PanelContext::Present { bag, .. } = ctx else {
            return false;
        };
        if self.auto_opened {
            return false;
        }
        self.auto_opened = true;
        if bag.is_open() {
            return false;
        }
        tracing::debug!(artifact = %artifact.id, "auto-opening artifact panel");
        bag.request_open(true);
        true
    }

    /// Flips the panel. No-op without a panel facility.
    pub fn toggle(&self, ctx: PanelContext<'_>) -> bool {
        match ctx {
            PanelContext::Present { bag, .. } => {
                let open = !bag.is_open();
                bag.request_open(open);
                true
            }
            PanelContext::Absent => false,
        }
    }

    /// Builds the view for this frame. `inline_width` is the transcript
    /// width used by the fallback block.
    pub fn view(&self, artifact: &Artifact, info: PanelInfo, inline_width: usize) -> ArtifactView {
        match info {
            PanelInfo::Present { width, open } => {
                let body = open.then(|| {
                    let inner = usize::from(width.saturating_sub(2 + PANEL_PADDING * 2));
                    self.registry
                        .render_body(artifact, inner.max(1), self.renderer)
                });
                ArtifactView::Panel {
                    summary: PanelSummary::new(&artifact.title, open),
                    body,
                }
            }
            PanelInfo::Absent => {
                let inner = inline_width.saturating_sub(4).max(1);
                ArtifactView::Inline {
                    title: artifact.title.clone(),
                    body: self.registry.render_body(artifact, inner, self.renderer),
                }
            }
        }
    }
}

/// Draws the fallback block: body lines framed by a titled border.
pub fn inline_block_lines(title: &str, body: &[StyledLine], width: usize) -> Vec<StyledLine> {
    let width = width.max(6);
    let inner = width - 4;
    let mut lines = Vec::with_capacity(body.len() + 2);

    let label = crate::common::truncate_with_ellipsis(title, inner.saturating_sub(2));
    let label = format!(" {label} ");
    let fill = (width - 2).saturating_sub(label.width() + 1);
    lines.push(StyledLine {
        spans: vec![
            StyledSpan::new("╭─", Style::ArtifactBorder),
            StyledSpan::new(label, Style::ArtifactTitle),
            StyledSpan::new(format!("{}╮", "─".repeat(fill)), Style::ArtifactBorder),
        ],
    });

    for line in body {
        let used = line.text().width();
        let mut spans = vec![StyledSpan::new("│ ", Style::ArtifactBorder)];
        spans.extend(line.spans.iter().cloned());
        spans.push(StyledSpan::new(
            format!("{} │", " ".repeat(inner.saturating_sub(used))),
            Style::ArtifactBorder,
        ));
        lines.push(StyledLine { spans });
    }

    lines.push(StyledLine::plain(
        format!("╰{}╯", "─".repeat(width - 2)),
        Style::ArtifactBorder,
    ));
    lines
}
