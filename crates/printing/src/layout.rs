/// Vertical layout registers shared by every command of a print pass.
/// 單次列印流程中所有指令共用的垂直佈局暫存器。
///
/// `current_height` is where the next row is drawn. `pending_line_offset`
/// holds the height the current row will claim once a new line commits it, so
/// several boxes drawn on one row share a single advance.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LayoutState {
    current_height: f32,
    pending_line_offset: f32,
}

impl LayoutState {
    /// Creates a state at the top of the page with the register at `baseline`.
    /// 建立位於頁首、暫存器設為 `baseline` 的狀態。
    pub const fn new(baseline: f32) -> Self {
        Self {
            current_height: 0.0,
            pending_line_offset: baseline,
        }
    }

    pub fn current_height(&self) -> f32 {
        self.current_height
    }

    pub fn pending_line_offset(&self) -> f32 {
        self.pending_line_offset
    }

    /// Keeps the tallest contribution seen on the current row.
    pub fn accumulate(&mut self, height: f32) {
        if height > self.pending_line_offset {
            self.pending_line_offset = height;
        }
    }

    /// Replaces the register outright; images claim exactly their own height.
    pub fn overwrite(&mut self, height: f32) {
        self.pending_line_offset = height;
    }

    /// Moves down immediately without touching the register.
    pub fn advance(&mut self, height: f32) {
        self.current_height += height;
    }

    /// Commits the pending row and rearms the register with `baseline`.
    /// 提交目前列的高度，並將暫存器重設為 `baseline`。
    pub fn commit_line(&mut self, baseline: f32) {
        self.current_height += self.pending_line_offset;
        self.pending_line_offset = baseline;
    }

    /// Returns to the top of a fresh page; the pending row carries over.
    /// 回到新頁面的頂端；尚未提交的列高度保留。
    pub fn start_page(&mut self) {
        self.current_height = 0.0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn commit_uses_tallest_pending_contribution() {
        let mut state = LayoutState::new(32.0);
        state.accumulate(22.4);
        state.accumulate(89.6);
        state.accumulate(44.8);
        state.commit_line(32.0);
        assert_eq!(state.current_height(), 89.6);
        assert_eq!(state.pending_line_offset(), 32.0);
    }

    #[test]
    fn smaller_contributions_keep_the_baseline() {
        let mut state = LayoutState::new(32.0);
        state.accumulate(22.4);
        state.commit_line(32.0);
        assert_eq!(state.current_height(), 32.0);
    }

    #[test]
    fn overwrite_can_lower_the_register() {
        let mut state = LayoutState::new(32.0);
        state.accumulate(64.0);
        state.overwrite(10.0);
        state.commit_line(32.0);
        assert_eq!(state.current_height(), 10.0);
    }

    #[test]
    fn advance_bypasses_the_register() {
        let mut state = LayoutState::new(32.0);
        state.accumulate(64.0);
        state.advance(3.0);
        assert_eq!(state.current_height(), 3.0);
        assert_eq!(state.pending_line_offset(), 64.0);
    }

    #[test]
    fn start_page_keeps_pending_row() {
        let mut state = LayoutState::new(32.0);
        state.accumulate(64.0);
        state.commit_line(32.0);
        state.accumulate(48.0);
        state.start_page();
        assert_eq!(state.current_height(), 0.0);
        assert_eq!(state.pending_line_offset(), 48.0);
    }
}
