//! Per-channel frame storage.

use alloc::collections::TryReserveError;
use alloc::vec::Vec;
use core::fmt;

use crate::frame::SeqFrame;

/// Channel letters `A`..=`Z`.
pub const MAX_CHANNELS: usize = 26;

/// Buffer growth failed while compiling.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GrowError;

impl fmt::Display for GrowError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("frame buffer allocation failed")
    }
}

impl From<TryReserveError> for GrowError {
    fn from(_: TryReserveError) -> Self {
        GrowError
    }
}

/// Ordered frames for one music channel.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct FrameList {
    frames: Vec<SeqFrame>,
}

impl FrameList {
    pub fn new() -> Self {
        Self { frames: Vec::new() }
    }

    /// Append a frame, reporting allocation failure instead of aborting.
    pub fn push(&mut self, frame: SeqFrame) -> Result<(), GrowError> {
        self.frames.try_reserve(1)?;
        self.frames.push(frame);
        Ok(())
    }

    pub fn last(&self) -> Option<&SeqFrame> {
        self.frames.last()
    }

    pub fn last_mut(&mut self) -> Option<&mut SeqFrame> {
        self.frames.last_mut()
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    pub fn iter(&self) -> core::slice::Iter<'_, SeqFrame> {
        self.frames.iter()
    }

    pub fn as_slice(&self) -> &[SeqFrame] {
        &self.frames
    }

    /// Sum of all frame durations, in time units.
    pub fn total_time_units(&self) -> u64 {
        self.frames.iter().map(|f| f.duration_scale as u64).sum()
    }
}

impl From<Vec<SeqFrame>> for FrameList {
    fn from(frames: Vec<SeqFrame>) -> Self {
        Self { frames }
    }
}

impl<'a> IntoIterator for &'a FrameList {
    type Item = &'a SeqFrame;
    type IntoIter = core::slice::Iter<'a, SeqFrame>;

    fn into_iter(self) -> Self::IntoIter {
        self.frames.iter()
    }
}

/// Compiled output: one frame list per referenced channel.
///
/// Channels are indexed by letter (`A` = 0). Referencing a channel grows
/// the map, creating any lower channels empty.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct FrameMap {
    channels: Vec<FrameList>,
}

impl FrameMap {
    pub fn new() -> Self {
        Self { channels: Vec::new() }
    }

    /// Number of channels, including empty ones below the highest used.
    pub fn channel_count(&self) -> usize {
        self.channels.len()
    }

    pub fn channel(&self, index: usize) -> Option<&FrameList> {
        self.channels.get(index)
    }

    /// Get a channel for writing, growing the map up to `index`.
    pub fn channel_mut(&mut self, index: usize) -> Result<&mut FrameList, GrowError> {
        if index >= self.channels.len() {
            self.channels.try_reserve(index + 1 - self.channels.len())?;
            self.channels.resize_with(index + 1, FrameList::new);
        }
        Ok(&mut self.channels[index])
    }

    pub fn channels(&self) -> &[FrameList] {
        &self.channels
    }

    pub fn into_channels(self) -> Vec<FrameList> {
        self.channels
    }

    /// Total frames over all channels.
    pub fn frame_count(&self) -> usize {
        self.channels.iter().map(FrameList::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.frame_count() == 0
    }
}

impl From<Vec<FrameList>> for FrameMap {
    fn from(channels: Vec<FrameList>) -> Self {
        Self { channels }
    }
}

/// Timing totals for one compiled channel.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct ChannelStats {
    pub channel: usize,
    /// Ideal elapsed time.
    pub seconds: f64,
    /// Emitted time units.
    pub time_units: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_map_is_empty() {
        let map = FrameMap::new();
        assert_eq!(map.channel_count(), 0);
        assert!(map.is_empty());
    }

    #[test]
    fn channel_mut_grows_lower_channels() {
        let mut map = FrameMap::new();
        map.channel_mut(2).unwrap().push(SeqFrame::note(440, 63, 4, 27)).unwrap();
        assert_eq!(map.channel_count(), 3);
        assert!(map.channel(0).unwrap().is_empty());
        assert!(map.channel(1).unwrap().is_empty());
        assert_eq!(map.channel(2).unwrap().len(), 1);
        assert_eq!(map.frame_count(), 1);
    }

    #[test]
    fn channel_mut_does_not_shrink() {
        let mut map = FrameMap::new();
        map.channel_mut(3).unwrap();
        map.channel_mut(1).unwrap();
        assert_eq!(map.channel_count(), 4);
    }

    #[test]
    fn list_keeps_push_order() {
        let mut list = FrameList::new();
        for f in [262u16, 294, 330] {
            list.push(SeqFrame::note(f, 63, 2, 27)).unwrap();
        }
        let freqs: Vec<u16> = list.iter().map(|f| f.frequency).collect();
        assert_eq!(freqs, vec![262, 294, 330]);
        assert_eq!(list.total_time_units(), 6);
    }

    #[test]
    fn last_mut_edits_in_place() {
        let mut list = FrameList::new();
        list.push(SeqFrame::note(440, 63, 2, 27)).unwrap();
        list.last_mut().unwrap().duration_scale += 3;
        assert_eq!(list.last().unwrap().duration_scale, 5);
        assert_eq!(list.len(), 1);
    }
}
