//! Multi-channel datasets: same-shaped volumes sharing one coordinate frame.

use serde::{Deserialize, Serialize};

use crate::calibration::Calibration;
use crate::error::{AlignError, Component, Result};
use crate::grid::GridShape;
use crate::volume::{Sample, Volume};

pub const COLOR_TABLE_LEN: usize = 256;

/// 256-entry RGB lookup table used to display a channel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<[u8; 3]>", into = "Vec<[u8; 3]>")]
pub struct ColorTable {
    entries: Vec<[u8; 3]>,
}

impl ColorTable {
    pub fn new(entries: Vec<[u8; 3]>) -> Result<Self> {
        if entries.len() != COLOR_TABLE_LEN {
            return Err(AlignError::ShapeMismatch {
                component: Component::ChannelSet,
                detail: format!(
                    "color table has {} entries, expected {}",
                    entries.len(),
                    COLOR_TABLE_LEN
                ),
            });
        }
        Ok(Self { entries })
    }

    pub fn grays() -> Self {
        Self::from_color(255, 255, 255)
    }

    /// Linear ramp from black to `(r, g, b)`.
    pub fn from_color(r: u8, g: u8, b: u8) -> Self {
        let ramp = |c: u8, i: usize| ((c as usize * i) / (COLOR_TABLE_LEN - 1)) as u8;
        Self {
            entries: (0..COLOR_TABLE_LEN)
                .map(|i| [ramp(r, i), ramp(g, i), ramp(b, i)])
                .collect(),
        }
    }

    pub fn entries(&self) -> &[[u8; 3]] {
        &self.entries
    }
}

impl TryFrom<Vec<[u8; 3]>> for ColorTable {
    type Error = AlignError;

    fn try_from(entries: Vec<[u8; 3]>) -> Result<Self> {
        ColorTable::new(entries)
    }
}

impl From<ColorTable> for Vec<[u8; 3]> {
    fn from(table: ColorTable) -> Self {
        table.entries
    }
}

/// Per-channel presentation metadata carried through every operation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChannelDisplay {
    pub name: String,
    pub color_table: Option<ColorTable>,
    pub display_range: Option<(f64, f64)>,
}

impl ChannelDisplay {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            color_table: None,
            display_range: None,
        }
    }

    pub fn with_color_table(mut self, table: ColorTable) -> Self {
        self.color_table = Some(table);
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AxisInfo {
    pub label: String,
    pub unit: String,
}

impl AxisInfo {
    pub fn new(label: impl Into<String>, unit: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            unit: unit.into(),
        }
    }
}

/// Order of samples in a flat multi-channel buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ChannelLayout {
    /// Whole channels one after another (channel slowest).
    Planar,
    /// All channels of a cell next to each other (channel fastest).
    Interleaved,
    /// ImageJ `XYCZ`: one plane per channel, planes grouped by z.
    Hyperstack,
}

impl ChannelLayout {
    /// Flat position of cell `cell` of channel `channel`.
    #[inline]
    fn offset(self, shape: GridShape, channel_count: usize, channel: usize, cell: usize) -> usize {
        match self {
            ChannelLayout::Planar => channel * shape.len() + cell,
            ChannelLayout::Interleaved => cell * channel_count + channel,
            ChannelLayout::Hyperstack => {
                let plane = shape.plane_len();
                let z = cell / plane;
                z * plane * channel_count + channel * plane + cell % plane
            }
        }
    }
}

/// Ordered channels of equal shape plus shared calibration and metadata.
#[derive(Debug, Clone, PartialEq)]
pub struct ChannelSet<T> {
    channels: Vec<Volume<T>>,
    calibration: Calibration,
    axes: Vec<AxisInfo>,
    display: Vec<ChannelDisplay>,
}

impl<T: Sample> ChannelSet<T> {
    pub fn new(channels: Vec<Volume<T>>, calibration: Calibration) -> Result<Self> {
        let first = channels.first().ok_or_else(|| AlignError::ShapeMismatch {
            component: Component::ChannelSet,
            detail: "a channel set needs at least one channel".to_string(),
        })?;
        let shape = first.shape();
        if let Some((index, other)) = channels
            .iter()
            .enumerate()
            .find(|(_, c)| c.shape() != shape)
        {
            return Err(AlignError::ShapeMismatch {
                component: Component::ChannelSet,
                detail: format!(
                    "channel {} has shape {}, channel 0 has {}",
                    index,
                    other.shape(),
                    shape
                ),
            });
        }
        if calibration.dims() != shape.dims() {
            return Err(AlignError::DimensionMismatch {
                component: Component::ChannelSet,
                expected: shape.dims().count(),
                actual: calibration.dims().count(),
            });
        }

        let axes = ["x", "y", "z"][..shape.dims().count()]
            .iter()
            .map(|label| AxisInfo::new(*label, "pixel"))
            .collect();
        let display = (0..channels.len())
            .map(|i| ChannelDisplay::named(format!("C{}", i + 1)))
            .collect();

        Ok(Self {
            channels,
            calibration,
            axes,
            display,
        })
    }

    /// Splits a flat buffer holding `channel_count` channels of `shape`.
    pub fn from_hyperstack(
        shape: GridShape,
        channel_count: usize,
        layout: ChannelLayout,
        data: &[T],
        calibration: Calibration,
    ) -> Result<Self> {
        if data.len() != shape.len() * channel_count {
            return Err(AlignError::ShapeMismatch {
                component: Component::ChannelSet,
                detail: format!(
                    "{} samples do not hold {} channels of {}",
                    data.len(),
                    channel_count,
                    shape
                ),
            });
        }
        let channels = (0..channel_count)
            .map(|c| {
                let samples = (0..shape.len())
                    .map(|cell| data[layout.offset(shape, channel_count, c, cell)])
                    .collect();
                Volume::new(shape, samples)
            })
            .collect::<Result<Vec<_>>>()?;
        Self::new(channels, calibration)
    }

    /// Flattens all channels into one buffer in `layout` order.
    pub fn to_hyperstack(&self, layout: ChannelLayout) -> Vec<T> {
        let shape = self.shape();
        let count = self.channel_count();
        let mut data = vec![T::zero(); shape.len() * count];
        for (c, channel) in self.channels.iter().enumerate() {
            for (cell, &value) in channel.samples().iter().enumerate() {
                data[layout.offset(shape, count, c, cell)] = value;
            }
        }
        data
    }

    pub fn with_display(mut self, display: Vec<ChannelDisplay>) -> Result<Self> {
        if display.len() != self.channels.len() {
            return Err(AlignError::ShapeMismatch {
                component: Component::ChannelSet,
                detail: format!(
                    "{} display entries for {} channels",
                    display.len(),
                    self.channels.len()
                ),
            });
        }
        self.display = display;
        Ok(self)
    }

    pub fn with_axes(mut self, axes: Vec<AxisInfo>) -> Result<Self> {
        if axes.len() != self.shape().dims().count() {
            return Err(AlignError::DimensionMismatch {
                component: Component::ChannelSet,
                expected: self.shape().dims().count(),
                actual: axes.len(),
            });
        }
        self.axes = axes;
        Ok(self)
    }

    #[inline]
    pub fn channel_count(&self) -> usize {
        self.channels.len()
    }

    #[inline]
    pub fn shape(&self) -> GridShape {
        self.channels[0].shape()
    }

    pub fn calibration(&self) -> &Calibration {
        &self.calibration
    }

    pub fn axes(&self) -> &[AxisInfo] {
        &self.axes
    }

    pub fn channels(&self) -> &[Volume<T>] {
        &self.channels
    }

    pub fn channel(&self, index: usize) -> Option<&Volume<T>> {
        self.channels.get(index)
    }

    pub fn display(&self, index: usize) -> Option<&ChannelDisplay> {
        self.display.get(index)
    }

    /// Copy of one channel's samples.
    pub fn extract_channel(&self, index: usize) -> Result<Volume<T>> {
        self.channels
            .get(index)
            .cloned()
            .ok_or(AlignError::ChannelIndexOutOfRange {
                component: Component::ChannelSet,
                index,
                channel_count: self.channels.len(),
            })
    }

    /// New set with the same metadata and `channels` in place of the current ones.
    pub(crate) fn replace_channels(&self, channels: Vec<Volume<T>>) -> Result<Self> {
        if channels.len() != self.channels.len() {
            return Err(AlignError::ShapeMismatch {
                component: Component::ChannelSet,
                detail: format!(
                    "{} channels given to replace {}",
                    channels.len(),
                    self.channels.len()
                ),
            });
        }
        let mut set = Self::new(channels, self.calibration.clone())?;
        set.axes = self.axes.clone();
        set.display = self.display.clone();
        Ok(set)
    }
}
