//! Cache-of-record for virtual controller state
//!
//! Indices arrive from platform UI code and are untrusted: out-of-range
//! reads return neutral values and out-of-range writes are ignored.

pub const MAX_VIRTUAL_BUTTONS: usize = 18;
pub const MAX_VIRTUAL_AXES: usize = 6;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShadowStateCache {
    buttons: [bool; MAX_VIRTUAL_BUTTONS],
    axes: [i16; MAX_VIRTUAL_AXES],
}

impl Default for ShadowStateCache {
    fn default() -> Self {
        Self {
            buttons: [false; MAX_VIRTUAL_BUTTONS],
            axes: [0; MAX_VIRTUAL_AXES],
        }
    }
}

impl ShadowStateCache {
    /// Returns false if `index` is out of range
    pub fn set_button(&mut self, index: i32, pressed: bool) -> bool {
        match slot(index, MAX_VIRTUAL_BUTTONS) {
            Some(i) => {
                self.buttons[i] = pressed;
                true
            }
            None => false,
        }
    }

    /// Returns false if `index` is out of range
    pub fn set_axis(&mut self, index: i32, value: i16) -> bool {
        match slot(index, MAX_VIRTUAL_AXES) {
            Some(i) => {
                self.axes[i] = value;
                true
            }
            None => false,
        }
    }

    pub fn button(&self, index: i32) -> bool {
        slot(index, MAX_VIRTUAL_BUTTONS).is_some_and(|i| self.buttons[i])
    }

    pub fn axis(&self, index: i32) -> i16 {
        slot(index, MAX_VIRTUAL_AXES).map_or(0, |i| self.axes[i])
    }

    pub fn clear(&mut self) {
        *self = Self::default();
    }
}

fn slot(index: i32, len: usize) -> Option<usize> {
    usize::try_from(index).ok().filter(|i| *i < len)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_out_of_range_is_neutral() {
        let mut cache = ShadowStateCache::default();
        assert!(!cache.set_button(MAX_VIRTUAL_BUTTONS as i32, true));
        assert!(!cache.set_button(-1, true));
        assert!(!cache.set_axis(MAX_VIRTUAL_AXES as i32, 100));
        assert!(!cache.button(i32::MAX));
        assert_eq!(cache.axis(i32::MIN), 0);
        assert_eq!(cache, ShadowStateCache::default());
    }

    #[test]
    fn test_clear_resets_everything() {
        let mut cache = ShadowStateCache::default();
        cache.set_button(0, true);
        cache.set_axis(5, -12);
        cache.clear();
        assert!(!cache.button(0));
        assert_eq!(cache.axis(5), 0);
    }
}
