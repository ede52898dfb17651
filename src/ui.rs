//! Drawing: world (tray, tower area, hole, blocks), toasts, sidebar.

use ratatui::Frame;
use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::style::Style;
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Paragraph, Widget};
use stacktui::block::BlockState;
use stacktui::controller::GameController;
use stacktui::geometry::{Bounds, Vec2};
use stacktui::notify::NotificationQueue;
use stacktui::theme::Theme;
use std::collections::HashMap;
use tachyonfx::{Duration as TfxDuration, Effect, EffectRenderer, Interpolation, fx};

/// Terminal cells per world unit.
pub const COLS_PER_UNIT: f32 = 4.0;
pub const ROWS_PER_UNIT: f32 = 2.0;

const SIDEBAR_WIDTH: u16 = 26;

/// Fade effects of fading toasts, by toast serial.
pub type ToastEffects = HashMap<u64, Effect>;

/// Maps world units (y up) onto a terminal rect (y down).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Projection {
    pub rect: Rect,
    pub world: Vec2,
}

impl Projection {
    pub fn new(rect: Rect, world: Vec2) -> Self {
        Self { rect, world }
    }

    /// World point at the centre of cell (`col`, `row`).
    pub fn to_world(&self, col: u16, row: u16) -> Vec2 {
        let x = (f32::from(col) - f32::from(self.rect.x) + 0.5) / COLS_PER_UNIT;
        let y = self.world.y - (f32::from(row) - f32::from(self.rect.y) + 0.5) / ROWS_PER_UNIT;
        Vec2::new(x, y)
    }

    /// Cells covered by `bounds`, clipped to the rect. `None` when nothing is visible.
    pub fn cells(&self, bounds: Bounds) -> Option<Rect> {
        let left = (bounds.min.x * COLS_PER_UNIT).round();
        let right = (bounds.max.x * COLS_PER_UNIT).round();
        let top = ((self.world.y - bounds.max.y) * ROWS_PER_UNIT).round();
        let bottom = ((self.world.y - bounds.min.y) * ROWS_PER_UNIT).round();
        let w = f32::from(self.rect.width);
        let h = f32::from(self.rect.height);
        let (left, right) = (left.clamp(0.0, w), right.clamp(0.0, w));
        let (top, bottom) = (top.clamp(0.0, h), bottom.clamp(0.0, h));
        if right <= left || bottom <= top {
            return None;
        }
        Some(Rect {
            x: self.rect.x + left as u16,
            y: self.rect.y + top as u16,
            width: (right - left) as u16,
            height: (bottom - top) as u16,
        })
    }

    /// Cell of a world point, if it lies on the rect.
    pub fn cell(&self, p: Vec2) -> Option<(u16, u16)> {
        let col = (p.x * COLS_PER_UNIT).floor();
        let row = ((self.world.y - p.y) * ROWS_PER_UNIT).floor();
        if col < 0.0 || row < 0.0 || col >= f32::from(self.rect.width) || row >= f32::from(self.rect.height) {
            return None;
        }
        Some((self.rect.x + col as u16, self.rect.y + row as u16))
    }
}

/// Split the frame into the bordered world panel and the sidebar.
fn split(area: Rect) -> (Rect, Rect) {
    let chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Fill(1), Constraint::Length(SIDEBAR_WIDTH)])
        .split(area);
    (chunks[0], chunks[1])
}

/// Largest world (in units) that fits a terminal of `cols` x `rows`.
pub fn world_fit(cols: u16, rows: u16) -> Vec2 {
    let (panel, _) = split(Rect::new(0, 0, cols, rows));
    let inner = Block::default().borders(Borders::ALL).inner(panel);
    Vec2::new(
        (f32::from(inner.width) / COLS_PER_UNIT).floor(),
        (f32::from(inner.height) / ROWS_PER_UNIT).floor(),
    )
}

/// Projection of a `world`-sized scene for a frame of size `area`.
pub fn projection(area: Rect, world: Vec2) -> Projection {
    let (panel, _) = split(area);
    let inner = Block::default().borders(Borders::ALL).inner(panel);
    let rect = Rect {
        x: inner.x,
        y: inner.y,
        width: ((world.x * COLS_PER_UNIT) as u16).min(inner.width),
        height: ((world.y * ROWS_PER_UNIT) as u16).min(inner.height),
    };
    Projection::new(rect, world)
}

pub struct View<'a> {
    pub theme: &'a Theme,
    pub controller: &'a GameController,
    pub notifications: &'a NotificationQueue,
    pub world: Vec2,
    pub animated: bool,
    pub elapsed_secs: u64,
}

pub fn draw(frame: &mut Frame, view: &View<'_>, effects: &mut ToastEffects, dt: std::time::Duration) {
    let area = frame.area();
    let (panel, sidebar) = split(area);
    let theme = view.theme;
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(theme.div_line).bg(theme.bg))
        .title(Span::styled(" stacktui ", theme.title));
    block.render(panel, frame.buffer_mut());

    let proj = projection(area, view.world);
    draw_scene(frame, view, proj);
    draw_blocks(frame, view, proj);
    draw_toasts(frame, view, proj, effects, dt);
    draw_sidebar(frame, view, sidebar);
}

fn fill(frame: &mut Frame, rect: Rect, style: Style) {
    let buf = frame.buffer_mut();
    for y in rect.top()..rect.bottom() {
        for x in rect.left()..rect.right() {
            buf[(x, y)].set_symbol(" ").set_style(style);
        }
    }
}

fn draw_scene(frame: &mut Frame, view: &View<'_>, proj: Projection) {
    let theme = view.theme;
    let layout = view.controller.layout();
    fill(frame, proj.rect, Style::default().bg(theme.bg));
    if let Some(r) = proj.cells(layout.tower_area) {
        fill(frame, r, Style::default().bg(theme.tower_area));
    }
    if let Some(r) = proj.cells(layout.hole_area) {
        fill(frame, r, Style::default().bg(theme.hole));
        let label = "hole";
        let x = r.x + r.width.saturating_sub(label.len() as u16) / 2;
        frame
            .buffer_mut()
            .set_string(x, r.y, label, Style::default().fg(theme.inactive_fg).bg(theme.hole));
    }
    if let Some(r) = proj.cells(layout.tray_band) {
        fill(frame, r, Style::default().bg(theme.div_line));
    }

    // Viewport top: dropping above this line is too high.
    let line_start = Vec2::new(layout.tower_area.min.x, layout.viewport.top);
    if let Some((col, row)) = proj.cell(line_start) {
        let width = proj.cells(layout.tower_area).map_or(0, |r| r.width);
        let line = "┄".repeat(width as usize);
        frame.buffer_mut().set_string(
            col,
            row,
            line,
            Style::default().fg(theme.inactive_fg).bg(theme.tower_area),
        );
    }
}

fn draw_blocks(frame: &mut Frame, view: &View<'_>, proj: Projection) {
    let store = view.controller.blocks().borrow();
    // Held blocks draw over everything else.
    let (held, rest): (Vec<_>, Vec<_>) = store.iter().partition(|b| b.state == BlockState::Dragging);
    for b in rest.into_iter().chain(held) {
        if b.scale <= f32::EPSILON {
            continue;
        }
        let Some(r) = proj.cells(b.bounds()) else {
            continue;
        };
        let color = view.theme.block_color(b.sprite.color);
        let style = if b.state == BlockState::Removed {
            Style::default().fg(color).bg(view.theme.bg).dim()
        } else {
            Style::default().fg(color).bg(color)
        };
        let buf = frame.buffer_mut();
        for y in r.top()..r.bottom() {
            for x in r.left()..r.right() {
                buf[(x, y)].set_symbol("█").set_style(style);
            }
        }
    }
}

fn draw_toasts(
    frame: &mut Frame,
    view: &View<'_>,
    proj: Projection,
    effects: &mut ToastEffects,
    dt: std::time::Duration,
) {
    let theme = view.theme;
    let queue = view.notifications;
    let config = queue.config();
    let layout = view.controller.layout();
    let base = Vec2::new(layout.tower_area.center().x, layout.viewport.top * 0.6);
    let tfx_delta = TfxDuration::from_millis(dt.as_millis().min(u128::from(u32::MAX)) as u32);
    let fade_ms = config.fade.as_millis().min(u128::from(u32::MAX)) as u32;

    effects.retain(|serial, _| queue.toasts().iter().any(|t| t.serial == *serial));
    for (i, toast) in queue.toasts().iter().rev().enumerate() {
        let at = base + Vec2::new(0.0, toast.rise(config) - i as f32 * 0.5);
        let Some((col, row)) = proj.cell(at) else {
            continue;
        };
        let text = format!(" {} ", toast.kind.text());
        let width = (text.chars().count() as u16).min(proj.rect.width);
        let x = col.saturating_sub(width / 2).max(proj.rect.x);
        let rect = Rect::new(x, row, width, 1);
        frame
            .buffer_mut()
            .set_string(rect.x, rect.y, &text, Style::default().fg(theme.title).bg(theme.bg).bold());
        if view.animated && toast.fading(config) {
            let effect = effects
                .entry(toast.serial)
                .or_insert_with(|| fx::fade_to(theme.bg, theme.bg, (fade_ms, Interpolation::Linear)));
            frame.render_effect(effect, rect, tfx_delta);
        }
    }
}

fn draw_sidebar(frame: &mut Frame, view: &View<'_>, area: Rect) {
    let theme = view.theme;
    let title_style = Style::default().fg(theme.title);
    let fg_style = Style::default().fg(theme.main_fg);
    let border_style = Style::default().fg(theme.div_line).bg(theme.bg);

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(7), // Stats
            Constraint::Length(1),
            Constraint::Length(9), // Keys
            Constraint::Length(1),
            Constraint::Length(3), // Colours
        ])
        .split(area);

    let ctl = view.controller;
    let height = ctl
        .tower_members()
        .map_or_else(|| "settling...".to_string(), |m| m.len().to_string());
    let blocks = ctl.blocks().borrow();
    let in_play = blocks
        .iter()
        .filter(|b| b.state != BlockState::Removed)
        .count();
    let stats = [
        ("Tower: ", height),
        ("Tray: ", ctl.tray().len().to_string()),
        ("Blocks: ", in_play.to_string()),
        ("Messages: ", view.notifications.started().to_string()),
        (
            "Time: ",
            format!("{:02}:{:02}", view.elapsed_secs / 60, view.elapsed_secs % 60),
        ),
    ];
    drop(blocks);
    let lines: Vec<Line> = stats
        .into_iter()
        .map(|(k, v)| Line::from(vec![Span::styled(k, title_style), Span::styled(v, fg_style)]))
        .collect();
    boxed(frame, chunks[0], " Stats ", border_style, title_style, lines);

    let keys = [
        ("drag", "move a block"),
        ("drop", "tower / hole"),
        ("←/h →/l", "scroll tray"),
        ("r", "restart"),
        ("q/Esc", "quit"),
    ];
    let lines: Vec<Line> = keys
        .into_iter()
        .map(|(k, v)| {
            Line::from(vec![
                Span::styled(format!("{k:<8}"), title_style),
                Span::styled(v, fg_style),
            ])
        })
        .collect();
    boxed(frame, chunks[2], " Keys ", border_style, title_style, lines);

    let colours: Vec<Span> = theme
        .blocks
        .iter()
        .map(|c| Span::styled("██ ", Style::default().fg(*c)))
        .collect();
    boxed(
        frame,
        chunks[4],
        " Colours ",
        border_style,
        title_style,
        vec![Line::from(colours)],
    );
}

fn boxed(
    frame: &mut Frame,
    area: Rect,
    title: &str,
    border_style: Style,
    title_style: Style,
    lines: Vec<Line<'_>>,
) {
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(border_style)
        .title(Span::styled(title, title_style));
    let inner = block.inner(area);
    block.render(area, frame.buffer_mut());
    Paragraph::new(lines).render(inner, frame.buffer_mut());
}

#[cfg(test)]
mod tests {
    use super::*;

    fn proj() -> Projection {
        Projection::new(Rect::new(1, 1, 80, 40), Vec2::new(20.0, 20.0))
    }

    #[test]
    fn cell_centres_round_trip_through_world() {
        let p = proj();
        let w = p.to_world(1, 1);
        assert_eq!(w, Vec2::new(0.125, 19.75));
        assert_eq!(p.cell(w), Some((1, 1)));
        assert_eq!(p.cell(Vec2::new(0.0, 0.0)), None);
        assert_eq!(p.cell(Vec2::new(19.9, 0.1)), Some((80, 40)));
    }

    #[test]
    fn bounds_cover_whole_cells_and_clip() {
        let p = proj();
        let r = p
            .cells(Bounds::new(Vec2::new(1.0, 0.0), Vec2::new(2.5, 1.0)))
            .unwrap();
        assert_eq!(r, Rect::new(5, 39, 6, 2));
        let clipped = p
            .cells(Bounds::new(Vec2::new(-3.0, 19.0), Vec2::new(1.0, 25.0)))
            .unwrap();
        assert_eq!(clipped, Rect::new(1, 1, 4, 2));
        assert_eq!(p.cells(Bounds::new(Vec2::new(30.0, 0.0), Vec2::new(31.0, 1.0))), None);
    }

    #[test]
    fn world_fit_leaves_room_for_sidebar_and_border() {
        let w = world_fit(120, 42);
        assert_eq!(w, Vec2::new(23.0, 20.0));
    }
}
