use ratatui::layout::{Constraint, Direction, Layout, Rect};

/// Top-level layout: tab bar, main view, status line, control bar, optional debug row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AppLayout {
    pub tabs: Rect,
    pub main_view: Rect,
    pub status: Rect,
    pub control_bar: Rect,
    pub debug: Option<Rect>,
}

pub fn app_layout(area: Rect, debug_enabled: bool) -> AppLayout {
    let mut constraints = vec![
        Constraint::Length(1),
        Constraint::Fill(1),
        Constraint::Length(1),
        Constraint::Length(1),
    ];
    if debug_enabled {
        constraints.push(Constraint::Length(1));
    }

    let layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints(constraints)
        .split(area);

    AppLayout {
        tabs: layout[0],
        main_view: layout[1],
        status: layout[2],
        control_bar: layout[3],
        debug: debug_enabled.then(|| layout[4]),
    }
}

/// Centered rect within `r` with given percentage width and height.
pub fn centered_rect(r: Rect, percent_x: u16, percent_y: u16) -> Rect {
    let popup_layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - percent_y) / 2),
            Constraint::Percentage(percent_y),
            Constraint::Percentage((100 - percent_y) / 2),
        ])
        .split(r);

    Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(popup_layout[1])[1]
}

/// Centered rect with fixed width and height, clamped to fit inside `r`.
pub fn centered_rect_fixed(r: Rect, width: u16, height: u16) -> Rect {
    let w = width.min(r.width);
    let h = height.min(r.height);
    Rect {
        x: r.x + r.width.saturating_sub(w) / 2,
        y: r.y + r.height.saturating_sub(h) / 2,
        width: w,
        height: h,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_app_layout_minimal() {
        let layout = app_layout(Rect::new(0, 0, 100, 50), false);
        assert_eq!(layout.tabs.height, 1);
        assert_eq!(layout.main_view.y, 1);
        assert_eq!(layout.main_view.height, 47);
        assert_eq!(layout.status.y, 48);
        assert_eq!(layout.control_bar.y, 49);
        assert_eq!(layout.debug, None);
    }

    #[test]
    fn test_app_layout_with_debug() {
        let layout = app_layout(Rect::new(0, 0, 100, 50), true);
        assert_eq!(layout.main_view.height, 46);
        assert_eq!(layout.control_bar.y, 48);
        assert_eq!(layout.debug.map(|d| d.y), Some(49));
    }

    #[test]
    fn test_centered_rect_50_50() {
        let centered = centered_rect(Rect::new(0, 0, 100, 100), 50, 50);
        assert_eq!(centered, Rect::new(25, 25, 50, 50));
    }

    #[test]
    fn test_centered_rect_fixed_clamps() {
        let r = Rect::new(0, 0, 30, 10);
        assert_eq!(centered_rect_fixed(r, 10, 4), Rect::new(10, 3, 10, 4));
        assert_eq!(centered_rect_fixed(r, 80, 40), r);
    }
}
