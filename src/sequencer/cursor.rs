// Cursor tracking - chord grouping and active-note lookup for notation
// Pure and stateless: recomputed from scratch whenever the note list
// changes, no incremental state to corrupt

use std::ops::Range;

use super::note::NoteEvent;

/// Beat-groups shown per notation page.
pub const GROUPS_PER_PAGE: usize = 16;

/// A maximal run of consecutive events sharing one start tick (a chord).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NoteGroup {
    pub start_tick: u64,

    /// Longest member duration, used as the group's display duration
    pub duration_ticks: u64,

    /// Contiguous range of indices into the source note list
    pub indices: Range<usize>,
}

impl NoteGroup {
    pub fn contains(&self, index: usize) -> bool {
        self.indices.contains(&index)
    }

    pub fn len(&self) -> usize {
        self.indices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }
}

/// Group a tick-sorted note list into chords.
pub fn group_by_tick(notes: &[NoteEvent]) -> Vec<NoteGroup> {
    let mut groups: Vec<NoteGroup> = Vec::new();

    for (index, note) in notes.iter().enumerate() {
        match groups.last_mut() {
            Some(group) if group.start_tick == note.start_tick => {
                group.duration_ticks = group.duration_ticks.max(note.duration_ticks);
                group.indices.end = index + 1;
            }
            _ => groups.push(NoteGroup {
                start_tick: note.start_tick,
                duration_ticks: note.duration_ticks,
                indices: index..index + 1,
            }),
        }
    }

    groups
}

/// Index of the group whose note range contains `index`, if any.
pub fn find_group_containing(groups: &[NoteGroup], index: usize) -> Option<usize> {
    let candidate = groups.partition_point(|group| group.indices.end <= index);
    (candidate < groups.len() && groups[candidate].contains(index)).then_some(candidate)
}

/// Window of groups for the page containing `active_group`.
///
/// Pages are fixed-size; with no active group the first page is shown.
pub fn page_window(
    group_count: usize,
    active_group: Option<usize>,
    page_size: usize,
) -> Range<usize> {
    if page_size == 0 || group_count == 0 {
        return 0..0;
    }
    let page = active_group.unwrap_or(0) / page_size;
    let start = (page * page_size).min(group_count);
    start..group_count.min(start + page_size)
}

/// Position of the "current note" within a note list.
///
/// Advances monotonically during playback-driven highlighting; practice
/// gating advances it only on confirmed correct input, a policy that
/// lives with the caller. Only the read/set primitives live here.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CursorState {
    active: Option<usize>,
}

impl CursorState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Index of the active note, or `None` before the first note
    pub fn active_index(&self) -> Option<usize> {
        self.active
    }

    pub fn set_active_index(&mut self, index: Option<usize>) {
        self.active = index;
    }

    /// Step to the next note. The first call activates index 0.
    pub fn advance(&mut self) -> usize {
        let next = match self.active {
            Some(index) => index + 1,
            None => 0,
        };
        self.active = Some(next);
        next
    }

    pub fn reset(&mut self) {
        self.active = None;
    }

    /// Group containing the active note
    pub fn active_group(&self, groups: &[NoteGroup]) -> Option<usize> {
        self.active
            .and_then(|index| find_group_containing(groups, index))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn note(start_tick: u64, duration_ticks: u64) -> NoteEvent {
        NoteEvent::new(start_tick, duration_ticks, 60, 0.9)
    }

    #[test]
    fn test_group_boundaries_match_equal_tick_runs() {
        let notes = vec![
            note(0, 480),
            note(0, 240),
            note(480, 480),
            note(960, 120),
            note(960, 480),
            note(960, 240),
        ];
        let groups = group_by_tick(&notes);

        assert_eq!(groups.len(), 3);
        assert_eq!(groups[0].indices, 0..2);
        assert_eq!(groups[1].indices, 2..3);
        assert_eq!(groups[2].indices, 3..6);
        assert_eq!(groups[0].start_tick, 0);
        assert_eq!(groups[2].start_tick, 960);
    }

    #[test]
    fn test_group_keeps_longest_member_duration() {
        let notes = vec![note(0, 120), note(0, 960), note(0, 480)];
        let groups = group_by_tick(&notes);

        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].duration_ticks, 960);
    }

    #[test]
    fn test_empty_note_list() {
        assert!(group_by_tick(&[]).is_empty());
        assert_eq!(find_group_containing(&[], 0), None);
    }

    #[test]
    fn test_find_group_containing() {
        let notes = vec![note(0, 1), note(0, 1), note(480, 1), note(960, 1)];
        let groups = group_by_tick(&notes);

        assert_eq!(find_group_containing(&groups, 0), Some(0));
        assert_eq!(find_group_containing(&groups, 1), Some(0));
        assert_eq!(find_group_containing(&groups, 2), Some(1));
        assert_eq!(find_group_containing(&groups, 3), Some(2));
        assert_eq!(find_group_containing(&groups, 4), None);
    }

    #[test]
    fn test_page_window() {
        // Active group 0 shows the first page
        assert_eq!(page_window(40, Some(0), GROUPS_PER_PAGE), 0..16);
        // Group 15 is still on the first page, 16 flips to the second
        assert_eq!(page_window(40, Some(15), GROUPS_PER_PAGE), 0..16);
        assert_eq!(page_window(40, Some(16), GROUPS_PER_PAGE), 16..32);
        // The last page is short
        assert_eq!(page_window(40, Some(39), GROUPS_PER_PAGE), 32..40);
        // No active group falls back to the first page
        assert_eq!(page_window(10, None, GROUPS_PER_PAGE), 0..10);
        assert_eq!(page_window(0, Some(3), GROUPS_PER_PAGE), 0..0);
    }

    #[test]
    fn test_cursor_advance_is_monotonic() {
        let mut cursor = CursorState::new();
        assert_eq!(cursor.active_index(), None);

        assert_eq!(cursor.advance(), 0);
        assert_eq!(cursor.advance(), 1);
        assert_eq!(cursor.advance(), 2);
        assert_eq!(cursor.active_index(), Some(2));

        cursor.reset();
        assert_eq!(cursor.active_index(), None);
    }

    #[test]
    fn test_cursor_active_group() {
        let notes = vec![note(0, 1), note(0, 1), note(480, 1)];
        let groups = group_by_tick(&notes);

        let mut cursor = CursorState::new();
        assert_eq!(cursor.active_group(&groups), None);

        cursor.set_active_index(Some(1));
        assert_eq!(cursor.active_group(&groups), Some(0));

        cursor.advance();
        assert_eq!(cursor.active_group(&groups), Some(1));
    }
}
