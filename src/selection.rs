/// Checkbox selection over the "current tabs" snapshot, with shift-click ranges
use crate::tab_data::{CurrentTabEntry, TabInfo};

#[derive(Debug, Clone, Default, PartialEq)]
pub struct TabSelection {
    checked: Vec<bool>,
    anchor: Option<usize>,
}

impl TabSelection {
    pub fn new(len: usize) -> Self {
        TabSelection {
            checked: vec![false; len],
            anchor: None,
        }
    }

    pub fn is_checked(&self, index: usize) -> bool {
        self.checked.get(index).copied().unwrap_or(false)
    }

    pub fn count(&self) -> usize {
        self.checked.iter().filter(|&&c| c).count()
    }

    /// A click on row `index` leaving its box `checked`. With shift held,
    /// every row between the anchor and `index` takes the same state and the
    /// anchor stays put; a plain click moves the anchor.
    pub fn click(&mut self, index: usize, checked: bool, shift: bool) {
        if index >= self.checked.len() {
            return;
        }
        match self.anchor {
            Some(anchor) if shift => {
                let (start, end) = (anchor.min(index), anchor.max(index));
                for state in &mut self.checked[start..=end] {
                    *state = checked;
                }
            }
            _ => {
                self.checked[index] = checked;
                self.anchor = Some(index);
            }
        }
    }

    pub fn selected<'a>(&self, entries: &'a [CurrentTabEntry]) -> Vec<&'a CurrentTabEntry> {
        entries
            .iter()
            .zip(&self.checked)
            .filter(|(_, checked)| **checked)
            .map(|(entry, _)| entry)
            .collect()
    }
}

/// Live tabs matching the selected snapshot rows: by id when the row has one,
/// else by URL. Rows whose tab has since closed drop out.
pub fn resolve_selected(live: &[TabInfo], selected: &[&CurrentTabEntry]) -> Vec<TabInfo> {
    live.iter()
        .filter(|tab| {
            selected.iter().any(|entry| match entry.id {
                Some(id) => tab.id == id,
                None => entry.url.as_deref() == Some(tab.url.as_str()),
            })
        })
        .cloned()
        .collect()
}
