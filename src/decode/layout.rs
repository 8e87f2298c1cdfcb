use crate::gaussian::f32::Attribute;


pub const CHANNEL_COUNT: usize = 17;

pub const POSITION_DIVISOR: f32 = 65535.0;
pub const BYTE_DIVISOR: f32 = 255.0;

/// where one decoded attribute reads its integer code from
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct AttributeSource {
    pub attribute: Attribute,
    pub low: usize,
    /// plane holding the high byte of a 16 bit code
    pub high: Option<usize>,
}

impl AttributeSource {
    const fn byte(attribute: Attribute, plane: usize) -> Self {
        Self {
            attribute,
            low: plane,
            high: None,
        }
    }

    const fn wide(attribute: Attribute, low: usize, high: usize) -> Self {
        Self {
            attribute,
            low,
            high: Some(high),
        }
    }

    pub fn divisor(&self) -> f32 {
        if self.high.is_some() {
            POSITION_DIVISOR
        } else {
            BYTE_DIVISOR
        }
    }

    pub fn code(&self, planes: &[&[u8]; CHANNEL_COUNT], pixel: usize) -> u32 {
        let low = planes[self.low][pixel] as u32;
        match self.high {
            Some(high) => low | ((planes[high][pixel] as u32) << 8),
            None => low,
        }
    }
}

/// attribute order here is the dequantization range order
pub const CHANNEL_LAYOUT: [AttributeSource; Attribute::COUNT] = [
    AttributeSource::wide(Attribute::PositionX, 0, 1),
    AttributeSource::wide(Attribute::PositionY, 2, 3),
    AttributeSource::wide(Attribute::PositionZ, 4, 5),
    AttributeSource::byte(Attribute::ShDcR, 6),
    AttributeSource::byte(Attribute::ShDcG, 7),
    AttributeSource::byte(Attribute::ShDcB, 8),
    AttributeSource::byte(Attribute::Opacity, 9),
    AttributeSource::byte(Attribute::Scale0, 10),
    AttributeSource::byte(Attribute::Scale1, 11),
    AttributeSource::byte(Attribute::Scale2, 12),
    AttributeSource::byte(Attribute::Rotation0, 13),
    AttributeSource::byte(Attribute::Rotation1, 14),
    AttributeSource::byte(Attribute::Rotation2, 15),
    AttributeSource::byte(Attribute::Rotation3, 16),
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LayoutError {
    PlaneOutOfRange(usize),
    PlaneReused(usize),
    PlaneUnused(usize),
    WideCodeOnNonPosition(usize),
    HighByteNotSuccessor { low: usize, high: usize },
}

pub fn validate_layout(layout: &[AttributeSource]) -> Result<(), LayoutError> {
    let mut used = [false; CHANNEL_COUNT];
    let mut claim = |plane: usize| -> Result<(), LayoutError> {
        let slot = used.get_mut(plane).ok_or(LayoutError::PlaneOutOfRange(plane))?;
        if *slot {
            return Err(LayoutError::PlaneReused(plane));
        }
        *slot = true;
        Ok(())
    };

    for (index, source) in layout.iter().enumerate() {
        claim(source.low)?;

        if let Some(high) = source.high {
            if !source.attribute.is_position() {
                return Err(LayoutError::WideCodeOnNonPosition(index));
            }
            if high != source.low + 1 || high % 2 == 0 {
                return Err(LayoutError::HighByteNotSuccessor { low: source.low, high });
            }
            claim(high)?;
        }
    }

    match used.iter().position(|used| !used) {
        Some(plane) => Err(LayoutError::PlaneUnused(plane)),
        None => Ok(()),
    }
}
