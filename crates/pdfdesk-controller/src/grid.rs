//! Page preview grid state
//!
//! Tracks the pages shown in the preview in display order, and which of
//! them are selected. Drag-and-drop and click handling live in the host;
//! it reports the results here.

use crate::error::ControllerError;
use serde::Serialize;
use std::collections::BTreeSet;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PageGrid {
    /// 1-based page numbers in display order
    order: Vec<u32>,
    selected: BTreeSet<u32>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PageTile {
    pub page_number: u32,
    pub selected: bool,
}

impl PageGrid {
    pub fn new(page_count: usize) -> Self {
        Self {
            order: (1..=page_count as u32).collect(),
            selected: BTreeSet::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    pub fn display_order(&self) -> &[u32] {
        &self.order
    }

    /// Flip the selection of a page; returns whether it is now selected.
    pub fn toggle(&mut self, page_number: u32) -> Result<bool, ControllerError> {
        if !self.order.contains(&page_number) {
            return Err(ControllerError::UnknownPage(page_number));
        }
        if self.selected.remove(&page_number) {
            Ok(false)
        } else {
            self.selected.insert(page_number);
            Ok(true)
        }
    }

    /// Move the tile at display position `from` so it ends up at `to`.
    pub fn move_page(&mut self, from: usize, to: usize) -> Result<(), ControllerError> {
        if from >= self.order.len() || to >= self.order.len() {
            return Err(ControllerError::InvalidMove { from, to });
        }
        let page = self.order.remove(from);
        self.order.insert(to, page);
        Ok(())
    }

    /// Selected page numbers in display order.
    pub fn selected_in_display_order(&self) -> Vec<u32> {
        self.order
            .iter()
            .copied()
            .filter(|page| self.selected.contains(page))
            .collect()
    }

    pub fn tiles(&self) -> Vec<PageTile> {
        self.order
            .iter()
            .map(|&page_number| PageTile {
                page_number,
                selected: self.selected.contains(&page_number),
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_new_grid_lists_every_page_unselected() {
        let grid = PageGrid::new(3);
        assert_eq!(grid.display_order(), &[1, 2, 3]);
        assert!(grid.selected_in_display_order().is_empty());
    }

    #[test]
    fn test_toggle_twice_deselects() {
        let mut grid = PageGrid::new(3);
        assert!(grid.toggle(2).unwrap());
        assert_eq!(grid.selected_in_display_order(), vec![2]);
        assert!(!grid.toggle(2).unwrap());
        assert!(grid.selected_in_display_order().is_empty());
    }

    #[test]
    fn test_toggle_unknown_page() {
        let mut grid = PageGrid::new(3);
        assert_eq!(grid.toggle(4), Err(ControllerError::UnknownPage(4)));
        assert_eq!(grid.toggle(0), Err(ControllerError::UnknownPage(0)));
    }

    #[test]
    fn test_move_page_forward_and_back() {
        let mut grid = PageGrid::new(4);
        grid.move_page(0, 2).unwrap();
        assert_eq!(grid.display_order(), &[2, 3, 1, 4]);
        grid.move_page(3, 0).unwrap();
        assert_eq!(grid.display_order(), &[4, 2, 3, 1]);
    }

    #[test]
    fn test_move_out_of_range() {
        let mut grid = PageGrid::new(2);
        assert_eq!(
            grid.move_page(0, 2),
            Err(ControllerError::InvalidMove { from: 0, to: 2 })
        );
    }

    #[test]
    fn test_selection_follows_display_order() {
        let mut grid = PageGrid::new(4);
        grid.toggle(1).unwrap();
        grid.toggle(4).unwrap();
        grid.move_page(3, 0).unwrap();
        assert_eq!(grid.selected_in_display_order(), vec![4, 1]);
        assert_eq!(
            grid.tiles()[0],
            PageTile {
                page_number: 4,
                selected: true
            }
        );
    }
}
